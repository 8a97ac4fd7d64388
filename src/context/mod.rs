pub mod execution_context;
pub mod variable_map;

pub use execution_context::{Data, ExecutionContext, ScalarObject};
pub use variable_map::LocalVariableMap;
