//! External service clients: language model and web search.

mod llm_client;
mod search;

pub use llm_client::*;
pub use search::*;
