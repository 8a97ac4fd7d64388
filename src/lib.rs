//! Weighted quaternary matrix instructions: `wsloss`, `wdivmm`, `wsigmoid`,
//! `wcemm` and `wumm`.
//!
//! An instruction line is decoded into a [`QuaternaryInstruction`], which is
//! then executed against an [`ExecutionContext`] holding the operand buffers.
//! The numeric work is delegated to a [`QuaternaryKernel`]; [`CpuKernel`] is a
//! dense, optionally multi-threaded implementation.

pub mod config;
pub mod context;
pub mod error;
pub mod instructions;
pub mod kernels;
pub mod matrix;

pub use config::{InstructionFormat, RuntimeConfig};
pub use context::{Data, ExecutionContext, LocalVariableMap, ScalarObject};
pub use error::{KernelError, QuaternaryError};
pub use instructions::{QuaternaryInstruction, QuaternaryOperator};
pub use kernels::{CpuKernel, QuaternaryKernel};
pub use matrix::MatrixBlock;
