pub mod config;
pub mod errors;
pub mod index;
pub mod llm;
pub mod logging;
pub mod provision;
pub mod qa;
pub mod server;
pub mod state;
pub mod vector_math;
