use crate::{
    error::{AppError, AppResult},
    models::{IndexEntry, Movie, UpsertReport},
    services::{index::SimilarityIndex, reducer::ReducedVector},
};
use std::sync::Arc;

/// Writes reduced vectors and their metadata into the similarity index
///
/// Batches are sent one after another so the committed count is exact when a
/// batch fails. Retrying is left to the caller.
pub struct IndexLoader {
    index: Arc<dyn SimilarityIndex>,
}

impl IndexLoader {
    pub fn new(index: Arc<dyn SimilarityIndex>) -> Self {
        Self { index }
    }

    /// Pairs `movies[i]` with `vectors[i]` and upserts them in batches of `batch_size`
    pub async fn upsert(
        &self,
        movies: &[Movie],
        vectors: &[ReducedVector],
        batch_size: usize,
    ) -> AppResult<UpsertReport> {
        if movies.len() != vectors.len() {
            return Err(AppError::Config(format!(
                "Got {} movies but {} vectors",
                movies.len(),
                vectors.len()
            )));
        }
        if batch_size == 0 {
            return Err(AppError::Config("batch_size must be at least 1".to_string()));
        }
        if batch_size > self.index.max_batch_size() {
            return Err(AppError::Config(format!(
                "batch_size {} exceeds the {} limit of {}",
                batch_size,
                self.index.name(),
                self.index.max_batch_size()
            )));
        }

        let total = movies.len();
        let mut report = UpsertReport::default();

        for (movie_batch, vector_batch) in movies.chunks(batch_size).zip(vectors.chunks(batch_size)) {
            let entries: Vec<IndexEntry> = movie_batch
                .iter()
                .zip(vector_batch)
                .map(|(movie, values)| IndexEntry::new(movie, values.clone()))
                .collect();

            match self.index.upsert(entries).await {
                Ok(written) => {
                    report.committed += written;
                    report.batches += 1;
                    tracing::info!(
                        committed = report.committed,
                        total,
                        index = self.index.name(),
                        "Upserted batch"
                    );
                }
                Err(e) => {
                    tracing::error!(
                        error = %e,
                        committed = report.committed,
                        batch = report.batches + 1,
                        "Upsert batch failed"
                    );
                    let message = match e {
                        AppError::IndexWrite { message, .. } => message,
                        other => other.to_string(),
                    };
                    return Err(AppError::IndexWrite {
                        committed: report.committed,
                        message,
                    });
                }
            }
        }

        tracing::info!(
            committed = report.committed,
            batches = report.batches,
            "Upsert completed"
        );

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        models::MovieId,
        services::index::{InMemoryIndex, MockSimilarityIndex},
    };
    use std::sync::Mutex;

    fn movies(n: usize) -> Vec<Movie> {
        (0..n)
            .map(|i| Movie {
                id: MovieId(i as u64 + 1),
                title: format!("Movie {}", i + 1),
                genres: "Drama".to_string(),
                combined_features: None,
                imdb_id: format!("{:07}", i + 1),
            })
            .collect()
    }

    fn vectors(n: usize) -> Vec<ReducedVector> {
        (0..n).map(|i| vec![i as f32, 1.0]).collect()
    }

    #[tokio::test]
    async fn test_batches_split_at_batch_size() {
        let sizes = Arc::new(Mutex::new(Vec::new()));
        let recorded = sizes.clone();

        let mut mock = MockSimilarityIndex::new();
        mock.expect_max_batch_size().return_const(1000usize);
        mock.expect_name().return_const("mock");
        mock.expect_upsert().times(3).returning(move |entries| {
            recorded.lock().unwrap().push(entries.len());
            Ok(entries.len())
        });

        let loader = IndexLoader::new(Arc::new(mock));
        let report = loader
            .upsert(&movies(2500), &vectors(2500), 1000)
            .await
            .unwrap();

        assert_eq!(report.committed, 2500);
        assert_eq!(report.batches, 3);
        assert_eq!(*sizes.lock().unwrap(), vec![1000, 1000, 500]);
    }

    #[tokio::test]
    async fn test_failure_reports_committed_prefix() {
        let mut calls = 0;
        let mut mock = MockSimilarityIndex::new();
        mock.expect_max_batch_size().return_const(1000usize);
        mock.expect_name().return_const("mock");
        mock.expect_upsert().times(3).returning(move |entries| {
            calls += 1;
            if calls == 3 {
                Err(AppError::IndexWrite {
                    committed: 0,
                    message: "status 503".to_string(),
                })
            } else {
                Ok(entries.len())
            }
        });

        let loader = IndexLoader::new(Arc::new(mock));
        let result = loader.upsert(&movies(2500), &vectors(2500), 1000).await;

        match result {
            Err(AppError::IndexWrite { committed, message }) => {
                assert_eq!(committed, 2000);
                assert_eq!(message, "status 503");
            }
            other => panic!("expected IndexWrite, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_failure_message_names_committed_count_once() {
        let mut mock = MockSimilarityIndex::new();
        mock.expect_max_batch_size().return_const(1000usize);
        mock.expect_name().return_const("mock");
        mock.expect_upsert()
            .times(1)
            .returning(|_| Err(AppError::IndexQuery("connection reset".to_string())));

        let loader = IndexLoader::new(Arc::new(mock));
        let error = loader
            .upsert(&movies(5), &vectors(5), 1000)
            .await
            .unwrap_err();

        assert_eq!(
            error.to_string(),
            "Index write error after 0 committed entries: Index query error: connection reset"
        );
        assert_eq!(error.to_string().matches("committed entries").count(), 1);
    }

    #[tokio::test]
    async fn test_length_mismatch_is_config_error() {
        let loader = IndexLoader::new(Arc::new(InMemoryIndex::new()));
        let result = loader.upsert(&movies(3), &vectors(2), 10).await;
        assert!(matches!(result, Err(AppError::Config(_))));
    }

    #[tokio::test]
    async fn test_batch_size_limits() {
        let loader = IndexLoader::new(Arc::new(InMemoryIndex::with_max_batch_size(100)));
        assert!(matches!(
            loader.upsert(&movies(3), &vectors(3), 0).await,
            Err(AppError::Config(_))
        ));
        assert!(matches!(
            loader.upsert(&movies(3), &vectors(3), 101).await,
            Err(AppError::Config(_))
        ));
    }

    #[tokio::test]
    async fn test_reupsert_overwrites_entry() {
        let index = Arc::new(InMemoryIndex::new());
        let loader = IndexLoader::new(index.clone());
        let mut catalog = movies(2);

        loader
            .upsert(&catalog, &[vec![1.0, 0.0], vec![0.0, 1.0]], 10)
            .await
            .unwrap();

        catalog[0].title = "Movie 1 (Director's Cut)".to_string();
        loader
            .upsert(&catalog[..1], &[vec![0.5, 0.5]], 10)
            .await
            .unwrap();

        assert_eq!(index.len().await, 2);
        let entry = index.get(MovieId(1)).await.unwrap();
        assert_eq!(entry.values, vec![0.5, 0.5]);
        assert_eq!(entry.metadata.movie_name, "Movie 1 (Director's Cut)");
    }

    #[tokio::test]
    async fn test_empty_input_commits_nothing() {
        let loader = IndexLoader::new(Arc::new(InMemoryIndex::new()));
        let report = loader.upsert(&[], &[], 10).await.unwrap();
        assert_eq!(report, UpsertReport::default());
    }
}
