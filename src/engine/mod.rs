pub mod generator;
pub mod history;
pub mod indicators;
pub mod state;
