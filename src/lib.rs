//! Conversational document Q&A over a search index
//!
//! This library implements a retrieve-then-read flow:
//! - Derive a search query from the chat history (query reformulation)
//! - Retrieve supporting documents from a search index
//! - Assemble a grounded prompt from the excerpts and the conversation
//! - Request a chat completion and return the answer with its sources
//!
//! The search index and the completion model are remote services reached
//! through thin HTTP clients; this crate only sequences the calls and
//! shapes the requests.

pub mod approach;
pub mod config;
pub mod error;
pub mod history;
pub mod integrations;
pub mod messages;
pub mod metrics;
pub mod prompts;

// Re-export common types
pub use approach::{Answer, ChatReadRetrieveRead, Overrides};
pub use config::Config;
pub use error::{Error, Result};
pub use history::ChatTurn;
pub use integrations::{CompletionClient, SearchClient};
pub use messages::ChatMessage;
