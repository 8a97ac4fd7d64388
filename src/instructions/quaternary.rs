use std::fmt;

use log::{debug, trace};

use crate::{
    config::InstructionFormat,
    context::{ExecutionContext, ScalarObject},
    error::QuaternaryError,
    kernels::QuaternaryKernel,
    matrix::MatrixBlock,
};

use super::{
    instruction_utils::{check_num_fields, get_instruction_parts, parse_num_threads},
    operand::{Operand, ValueType},
    operator::{OperatorFamily, QuaternaryOperator},
};

pub fn is_quaternary_opcode(opcode: &str) -> bool {
    OperatorFamily::from_opcode(opcode).is_some()
}

// Scalar results come out of the kernel as doubles and are narrowed to the
// value type the output operand declares
fn typed_scalar(value_type: ValueType, value: f64) -> ScalarObject {
    match value_type {
        ValueType::Int => ScalarObject::Int(value.round() as i64),
        ValueType::Boolean => ScalarObject::Boolean(value != 0.0),
        _ => ScalarObject::Double(value),
    }
}

// Decoded wsloss / wdivmm / wsigmoid / wcemm / wumm instruction. Holds no
// per-call state, so executing it repeatedly is fine
#[derive(Clone, Debug, PartialEq)]
pub struct QuaternaryInstruction {
    operator: QuaternaryOperator,
    inputs: [Operand; 3],
    // Only the wsloss and wdivmm layouts carry a 4th operand
    input4: Option<Operand>,
    output: Operand,
    num_threads: i32,
    // Sub-type and thread fields as written, for re-serialization
    subtype_token: String,
    threads_token: String,
    opcode: String,
    instruction: String,
}

impl QuaternaryInstruction {
    pub fn new(
        operator: QuaternaryOperator,
        inputs: [Operand; 3],
        input4: Option<Operand>,
        output: Operand,
        num_threads: i32,
        opcode: &str,
        instruction: &str,
    ) -> Result<Self, QuaternaryError> {
        if operator.requires_four_inputs() && input4.is_none() {
            return Err(QuaternaryError::malformed(
                instruction,
                format!("{} requires a fourth input operand", operator),
            ));
        }
        Ok(Self {
            subtype_token: operator.op().subtype_name().to_string(),
            threads_token: num_threads.to_string(),
            operator,
            inputs,
            input4,
            output,
            num_threads,
            opcode: opcode.to_string(),
            instruction: instruction.to_string(),
        })
    }

    pub fn parse_instruction(instruction: &str) -> Result<Self, QuaternaryError> {
        Self::parse_instruction_with(instruction, &InstructionFormat::default())
    }

    pub fn parse_instruction_with(instruction: &str, format: &InstructionFormat) -> Result<Self, QuaternaryError> {
        let parts = get_instruction_parts(instruction, format);
        let opcode = parts[0];

        let family = OperatorFamily::from_opcode(opcode)
            .ok_or_else(|| QuaternaryError::UnrecognizedInstruction(instruction.to_string()))?;
        check_num_fields(&parts, family.num_fields(), instruction)?;

        let delim = format.value_type_delimiter;
        let operand = |idx: usize| Operand::parse_in(parts[idx], delim, instruction);

        // wumm carries its unary opcode ahead of the operands
        let (unary_op, first) = match family {
            OperatorFamily::WeightedUnaryMM => (Some(parts[1]), 2),
            _ => (None, 1),
        };

        let inputs = [operand(first)?, operand(first + 1)?, operand(first + 2)?];
        let (input4, out_idx) = if family.has_fourth_operand() {
            (Some(operand(first + 3)?), first + 4)
        } else {
            (None, first + 3)
        };
        let output = operand(out_idx)?;
        let subtype = parts[out_idx + 1];
        let threads = parts[out_idx + 2];
        let num_threads = parse_num_threads(threads, instruction)?;

        let operator = QuaternaryOperator::resolve(family, subtype, unary_op)?;
        debug!("Decoded {} into {} -> {}", instruction, operator, output.name());

        let decoded = Self::new(operator, inputs, input4, output, num_threads, opcode, instruction)?;
        Ok(Self {
            subtype_token: subtype.to_string(),
            threads_token: threads.to_string(),
            ..decoded
        })
    }

    // Acquire -> compute -> release -> publish. Any failure aborts at that
    // point; buffers pinned before it are left to the context to clean up
    pub fn process_instruction<C, K>(&self, ec: &mut C, kernel: &K) -> Result<(), QuaternaryError>
    where
        C: ExecutionContext + ?Sized,
        K: QuaternaryKernel + ?Sized,
    {
        let qop = &self.operator;
        let input4 = self.fourth_input();

        let m1 = ec.get_matrix_input(self.inputs[0].name())?;
        let m2 = ec.get_matrix_input(self.inputs[1].name())?;
        let m3 = ec.get_matrix_input(self.inputs[2].name())?;
        let m4 = match input4 {
            Some(in4) => Some(ec.get_matrix_input(in4.name())?),
            None => None,
        };

        // Kernel gets a fresh output block, its result is what gets bound
        trace!("Executing {} with {} thread(s)", qop, self.num_threads);
        let out = kernel.compute(qop, &m1, &m2, &m3, m4.as_deref(), MatrixBlock::empty(), self.num_threads)?;

        // Release exactly what was acquired above
        for input in &self.inputs {
            ec.release_matrix_input(input.name());
        }
        if let Some(in4) = input4 {
            ec.release_matrix_input(in4.name());
        }

        if qop.produces_scalar() {
            let value = typed_scalar(self.output.value_type(), out.value(0, 0));
            ec.set_scalar_output(self.output.name(), value)
        } else {
            ec.set_matrix_output(self.output.name(), out)
        }
    }

    // The 4th operand when the operator consumes it. Acquisition and release
    // both go through here so they cannot disagree
    pub fn fourth_input(&self) -> Option<&Operand> {
        if self.operator.requires_four_inputs() {
            self.input4.as_ref()
        } else {
            None
        }
    }

    // Inputs the executor acquires, in acquisition order
    pub fn acquired_inputs(&self) -> Vec<&Operand> {
        self.inputs.iter().chain(self.fourth_input()).collect()
    }

    // Re-serialize the positional layout, without any execution type prefix
    pub fn fields(&self) -> Vec<String> {
        let mut fields = Vec::with_capacity(self.operator.family().num_fields() + 1);
        fields.push(self.opcode.clone());
        if let Some(uop) = self.operator.unary_op() {
            fields.push(uop.to_string());
        }
        fields.extend(self.inputs.iter().map(|op| op.token().to_string()));
        if let Some(in4) = &self.input4 {
            fields.push(in4.token().to_string());
        }
        fields.push(self.output.token().to_string());
        fields.push(self.subtype_token.clone());
        fields.push(self.threads_token.clone());
        fields
    }

    pub fn operator(&self) -> &QuaternaryOperator {
        &self.operator
    }

    pub fn inputs(&self) -> &[Operand; 3] {
        &self.inputs
    }

    pub fn input4(&self) -> Option<&Operand> {
        self.input4.as_ref()
    }

    pub fn output(&self) -> &Operand {
        &self.output
    }

    pub fn num_threads(&self) -> i32 {
        self.num_threads
    }

    pub fn opcode(&self) -> &str {
        &self.opcode
    }

    pub fn instruction_string(&self) -> &str {
        &self.instruction
    }
}

impl fmt::Display for QuaternaryInstruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.instruction)
    }
}
