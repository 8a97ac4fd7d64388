use thiserror::Error;

#[derive(Error, Debug)]
pub enum QuaternaryError {
    // Decoding errors
    #[error("Malformed instruction '{instruction}': {reason}")]
    MalformedInstruction { instruction: String, reason: String },

    #[error("Unexpected opcode in quaternary instruction: {0}")]
    UnrecognizedInstruction(String),

    #[error("Unrecognized {opcode} operator type: {token}")]
    UnrecognizedOperator { opcode: String, token: String },

    // Execution errors
    #[error("Variable not found: {0}")]
    NameNotFound(String),

    #[error("Variable {0} is not a matrix")]
    NotAMatrix(String),

    #[error("Out of memory error: {0}")]
    OutOfMemory(String),

    #[error("Kernel error: {0}")]
    Kernel(#[from] KernelError),
}

impl QuaternaryError {
    pub fn malformed(instruction: &str, reason: impl Into<String>) -> Self {
        Self::MalformedInstruction {
            instruction: instruction.to_string(),
            reason: reason.into(),
        }
    }
}

#[derive(Error, Debug)]
pub enum KernelError {
    #[error("Dimension mismatch: {0}")]
    DimensionMismatch(String),

    #[error("Unsupported unary operation in wumm: {0}")]
    UnsupportedUnaryOp(String),

    #[error("Failed to build kernel thread pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}
