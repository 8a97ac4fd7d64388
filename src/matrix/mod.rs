pub mod matrix_block;
pub mod random;

pub use matrix_block::MatrixBlock;
pub use random::RandomSpec;
