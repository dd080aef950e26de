//! Concrete embedding providers.

pub mod mock;
pub mod ollama;
pub mod openai;
