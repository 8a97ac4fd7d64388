pub mod instruction_utils;
pub mod operand;
pub mod operator;
pub mod quaternary;

#[cfg(test)]
mod tests;

pub use operand::{DataType, Operand, ValueType};
pub use operator::{
    OperatorFamily, QuaternaryOp, QuaternaryOperator, WCeMMType, WDivMMType, WSigmoidType, WUMMType, WeightsType,
};
pub use quaternary::{is_quaternary_opcode, QuaternaryInstruction};
