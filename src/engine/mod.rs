pub mod engine;
pub mod history;
pub mod plan;
pub mod state;
