pub mod expectations;
pub mod system;
