pub mod complete;
pub mod discovery;
pub mod error;
pub mod provider;
pub mod search;
pub mod sql;
pub mod types;

pub use complete::CortexCompleteClient;
pub use error::CortexError;
pub use provider::{CompletionBackend, RetrievalBackend};
pub use search::CortexSearchClient;
pub use types::{
    CortexConnection, RetrievedDocument, SearchFilter, SearchRequest, ServiceDescriptor,
};
