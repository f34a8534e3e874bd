/// Brute-force cosine index held in process memory
///
/// Stands in for the hosted index in tests and local runs. Upserts overwrite by id
/// in place, so ties in a query keep first-insertion order.
use crate::{
    error::{AppError, AppResult},
    models::{IndexEntry, MovieId, QueryMatch, QueryRequest, QueryResponse, QueryTarget},
    services::index::SimilarityIndex,
};
use std::collections::HashMap;
use tokio::sync::RwLock;

const DEFAULT_MAX_BATCH: usize = 1000;

#[derive(Default)]
struct Entries {
    rows: Vec<IndexEntry>,
    positions: HashMap<MovieId, usize>,
}

pub struct InMemoryIndex {
    entries: RwLock<Entries>,
    max_batch_size: usize,
}

impl Default for InMemoryIndex {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryIndex {
    pub fn new() -> Self {
        Self::with_max_batch_size(DEFAULT_MAX_BATCH)
    }

    pub fn with_max_batch_size(max_batch_size: usize) -> Self {
        Self {
            entries: RwLock::new(Entries::default()),
            max_batch_size,
        }
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.rows.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.rows.is_empty()
    }

    pub async fn get(&self, id: MovieId) -> Option<IndexEntry> {
        let entries = self.entries.read().await;
        entries.positions.get(&id).map(|&p| entries.rows[p].clone())
    }
}

fn cosine(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a > 0.0 && norm_b > 0.0 {
        dot / (norm_a * norm_b)
    } else {
        0.0
    }
}

#[async_trait::async_trait]
impl SimilarityIndex for InMemoryIndex {
    async fn upsert(&self, entries: Vec<IndexEntry>) -> AppResult<usize> {
        if entries.len() > self.max_batch_size {
            return Err(AppError::Config(format!(
                "Batch of {} exceeds the index limit of {}",
                entries.len(),
                self.max_batch_size
            )));
        }

        let mut guard = self.entries.write().await;
        let store = &mut *guard;
        let written = entries.len();
        for entry in entries {
            match store.positions.get(&entry.id).copied() {
                Some(position) => store.rows[position] = entry,
                None => {
                    let position = store.rows.len();
                    store.positions.insert(entry.id, position);
                    store.rows.push(entry);
                }
            }
        }

        Ok(written)
    }

    async fn query(&self, request: QueryRequest) -> AppResult<QueryResponse> {
        let store = self.entries.read().await;

        let query_vector = match &request.target {
            QueryTarget::Id(id) => {
                let position = store.positions.get(id).ok_or_else(|| {
                    AppError::IndexQuery(format!("Id {} is not in the index", id))
                })?;
                store.rows[*position].values.clone()
            }
            QueryTarget::Vector(values) => values.clone(),
        };

        let mut scored: Vec<(usize, f32)> = store
            .rows
            .iter()
            .enumerate()
            .map(|(position, entry)| (position, cosine(&query_vector, &entry.values)))
            .collect();
        scored.sort_by(|a, b| b.1.total_cmp(&a.1));
        scored.truncate(request.top_k);

        let matches = scored
            .into_iter()
            .map(|(position, score)| {
                let entry = &store.rows[position];
                QueryMatch {
                    id: entry.id,
                    score: Some(score),
                    metadata: request.include_metadata.then(|| entry.metadata.clone()),
                }
            })
            .collect();

        Ok(QueryResponse { matches })
    }

    fn max_batch_size(&self) -> usize {
        self.max_batch_size
    }

    fn name(&self) -> &'static str {
        "in-memory"
    }
}
