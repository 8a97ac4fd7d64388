use std::fmt;
use std::sync::Arc;

use crate::{error::QuaternaryError, matrix::MatrixBlock};

#[derive(Clone, Debug, PartialEq)]
pub enum ScalarObject {
    Double(f64),
    Int(i64),
    Boolean(bool),
}

impl fmt::Display for ScalarObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScalarObject::Double(v) => write!(f, "{}", v),
            ScalarObject::Int(v) => write!(f, "{}", v),
            ScalarObject::Boolean(v) => write!(f, "{}", v),
        }
    }
}

// A live value in the environment. Matrices are shared so an acquired input
// stays valid while the kernel runs, no matter what else the store does
#[derive(Clone, Debug, PartialEq)]
pub enum Data {
    Matrix(Arc<MatrixBlock>),
    Scalar(ScalarObject),
}

impl Data {
    pub fn matrix(block: MatrixBlock) -> Self {
        Data::Matrix(Arc::new(block))
    }

    pub fn as_matrix(&self) -> Option<&Arc<MatrixBlock>> {
        match self {
            Data::Matrix(m) => Some(m),
            Data::Scalar(_) => None,
        }
    }

    pub fn as_scalar(&self) -> Option<&ScalarObject> {
        match self {
            Data::Scalar(s) => Some(s),
            Data::Matrix(_) => None,
        }
    }

    pub fn size_in_bytes(&self) -> u64 {
        match self {
            Data::Matrix(m) => m.size_in_bytes(),
            Data::Scalar(_) => 8,
        }
    }
}

// The variable store an instruction runs against. It owns every buffer; an
// instruction only pins inputs for the duration of one execution
pub trait ExecutionContext {
    // Pin a matrix variable and hand out a shared reference to it
    fn get_matrix_input(&mut self, name: &str) -> Result<Arc<MatrixBlock>, QuaternaryError>;

    // Unpin a matrix variable. Must tolerate names that are not pinned
    fn release_matrix_input(&mut self, name: &str);

    // Publish a scalar or matrix result under name, replacing any previous value
    fn set_variable(&mut self, name: &str, data: Data) -> Result<(), QuaternaryError>;

    fn set_scalar_output(&mut self, name: &str, value: ScalarObject) -> Result<(), QuaternaryError> {
        self.set_variable(name, Data::Scalar(value))
    }

    fn set_matrix_output(&mut self, name: &str, block: MatrixBlock) -> Result<(), QuaternaryError> {
        self.set_variable(name, Data::matrix(block))
    }
}
