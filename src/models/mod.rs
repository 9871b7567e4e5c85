pub mod config;
pub mod market;
pub mod sample;
pub mod signal;
