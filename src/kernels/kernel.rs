use crate::{error::KernelError, instructions::operator::QuaternaryOperator, matrix::MatrixBlock};

// Numeric side of a quaternary instruction. Inputs are positional: m1..m3 are
// always present, m4 only when the operator requires a fourth input. The
// thread hint is passed through exactly as it appeared in the instruction.
// Scalar producing operators return their value at (0, 0)
pub trait QuaternaryKernel {
    fn compute(
        &self,
        op: &QuaternaryOperator,
        m1: &MatrixBlock,
        m2: &MatrixBlock,
        m3: &MatrixBlock,
        m4: Option<&MatrixBlock>,
        out: MatrixBlock,
        num_threads: i32,
    ) -> Result<MatrixBlock, KernelError>;
}

impl<K: QuaternaryKernel + ?Sized> QuaternaryKernel for &K {
    fn compute(
        &self,
        op: &QuaternaryOperator,
        m1: &MatrixBlock,
        m2: &MatrixBlock,
        m3: &MatrixBlock,
        m4: Option<&MatrixBlock>,
        out: MatrixBlock,
        num_threads: i32,
    ) -> Result<MatrixBlock, KernelError> {
        (**self).compute(op, m1, m2, m3, m4, out, num_threads)
    }
}
