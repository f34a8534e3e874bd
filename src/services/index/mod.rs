/// Similarity index abstraction
///
/// The vector store is an external collaborator reached through a narrow
/// upsert/query contract. Implementations are injected as `Arc<dyn SimilarityIndex>`
/// so the engine and loader never hold a process-wide client.
use crate::{
    error::AppResult,
    models::{IndexEntry, QueryRequest, QueryResponse},
};

pub mod memory;
pub mod pinecone;

pub use memory::InMemoryIndex;
pub use pinecone::PineconeIndex;

/// Keyed nearest-neighbour vector store
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait SimilarityIndex: Send + Sync {
    /// Writes one batch, overwriting entries with the same id
    ///
    /// Returns how many entries the store reports as written. Batches larger than
    /// [`max_batch_size`](Self::max_batch_size) are rejected by the store.
    async fn upsert(&self, entries: Vec<IndexEntry>) -> AppResult<usize>;

    /// Nearest neighbours, most similar first
    async fn query(&self, request: QueryRequest) -> AppResult<QueryResponse>;

    /// Hard per-call cap enforced by the store
    fn max_batch_size(&self) -> usize;

    /// Index name for logging and debugging
    fn name(&self) -> &'static str;
}
