pub mod chat;
pub mod config;
pub mod engine;
pub mod errors;
pub mod executor;
pub mod llm;
pub mod perception;
