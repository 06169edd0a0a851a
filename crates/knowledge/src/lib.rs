//! Retrieval side of kbchat.
//!
//! - [`gate`]: decides which search results are usable context
//! - [`context`]: renders accepted documents into one context block
//! - [`search`]: the search collaborator trait and its OpenSearch backend
//! - [`index`]: the SQLite-backed local document index

pub mod context;
pub mod gate;
pub mod index;
pub mod search;
pub mod types;

pub use context::{format_context, Context};
pub use index::LocalIndex;
pub use search::{create_search_client, OpenSearchClient, SearchClient};
pub use types::{IngestStats, RetrievedDocument};
