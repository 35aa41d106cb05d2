//! Concrete adapters for the traits in [`services`](crate::services).

pub mod openai;
pub mod store;
