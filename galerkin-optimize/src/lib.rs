/// Vector function traits and numerical differentiation
pub mod calculus;
/// Newton's method with different line search strategies
pub mod newton;
