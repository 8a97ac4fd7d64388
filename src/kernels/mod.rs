pub mod cpu_kernel;
pub mod kernel;
pub mod unary;

pub use cpu_kernel::CpuKernel;
pub use kernel::QuaternaryKernel;
pub use unary::UnaryOp;
