//! HTTP clients for the two remote collaborators: the search index and
//! the completion service.

pub mod completion;
pub mod search;

pub use completion::CompletionClient;
pub use search::{Caption, SearchClient, SearchDocument, SearchOptions};
