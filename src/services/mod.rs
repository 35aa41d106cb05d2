//! Traits for the external collaborators the pipeline talks to.

pub mod chat_api;
pub mod file_store;
