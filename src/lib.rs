pub mod analyzers;
pub mod config;
pub mod error;
pub mod fetch;
pub mod infra;
pub mod loader;
pub mod output;
pub mod parser;
pub mod pipeline;
pub mod router;
pub mod services;
pub mod session;
pub mod source;
pub mod table;
