pub mod codegen;
pub mod export;
pub mod time;
