use crate::{
    error::{AppError, AppResult},
    models::{GenreFilter, Movie, MovieId, QueryRequest, QueryTarget, Recommendation},
    services::{catalog::Catalog, index::SimilarityIndex},
};
use std::{sync::Arc, time::Duration};

/// Content-based recommendations for a seed movie
///
/// Asks the similarity index for the seed's nearest neighbours, drops the seed,
/// resolves each candidate against the catalog and applies the genre filter,
/// keeping the index's similarity order. The catalog and index client are
/// shared read-only, so concurrent requests need no coordination.
pub struct RecommendationEngine {
    index: Arc<dyn SimilarityIndex>,
    catalog: Arc<Catalog>,
    query_timeout: Duration,
}

impl RecommendationEngine {
    pub fn new(
        index: Arc<dyn SimilarityIndex>,
        catalog: Arc<Catalog>,
        query_timeout: Duration,
    ) -> Self {
        Self {
            index,
            catalog,
            query_timeout,
        }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Resolves a title to its movie
    ///
    /// Titles are not unique; the first match in catalog order wins.
    pub fn resolve_title(&self, title: &str) -> AppResult<&Movie> {
        self.catalog
            .find_by_title(title)
            .ok_or_else(|| AppError::NotFound(format!("No movie titled {:?}", title)))
    }

    pub fn resolve_id(&self, id: MovieId) -> AppResult<&Movie> {
        self.catalog
            .get(id)
            .ok_or_else(|| AppError::NotFound(format!("No movie with id {}", id)))
    }

    /// Recommendations for the movie titled `seed_title`
    pub async fn recommend(
        &self,
        seed_title: &str,
        top_k: usize,
        genre_filter: &GenreFilter,
    ) -> AppResult<Vec<Recommendation>> {
        let seed = self.resolve_title(seed_title)?;
        self.recommend_for(seed.id, top_k, genre_filter).await
    }

    /// Recommendations for the movie with `seed_id`
    pub async fn recommend_by_id(
        &self,
        seed_id: MovieId,
        top_k: usize,
        genre_filter: &GenreFilter,
    ) -> AppResult<Vec<Recommendation>> {
        let seed = self.resolve_id(seed_id)?;
        self.recommend_for(seed.id, top_k, genre_filter).await
    }

    async fn recommend_for(
        &self,
        seed_id: MovieId,
        top_k: usize,
        genre_filter: &GenreFilter,
    ) -> AppResult<Vec<Recommendation>> {
        if top_k == 0 {
            return Err(AppError::Config("top_k must be at least 1".to_string()));
        }

        let request = QueryRequest {
            target: QueryTarget::Id(seed_id),
            // +1 because the seed normally comes back as its own nearest neighbour
            top_k: top_k + 1,
            include_metadata: false,
        };

        let response = tokio::time::timeout(self.query_timeout, self.index.query(request))
            .await
            .map_err(|_| {
                tracing::error!(
                    seed = %seed_id,
                    timeout_ms = self.query_timeout.as_millis() as u64,
                    index = self.index.name(),
                    "Index query timed out"
                );
                AppError::IndexQuery(format!(
                    "{} query timed out after {} ms",
                    self.index.name(),
                    self.query_timeout.as_millis()
                ))
            })??;

        let mut matches = response.matches.into_iter().peekable();
        if matches.peek().map(|m| m.id) == Some(seed_id) {
            matches.next();
        }

        let mut recommendations = Vec::with_capacity(top_k);
        for candidate in matches {
            if recommendations.len() == top_k {
                break;
            }
            // The index may return the seed out of first position on score ties
            if candidate.id == seed_id {
                continue;
            }

            let Some(movie) = self.catalog.get(candidate.id) else {
                tracing::warn!(
                    candidate = %candidate.id,
                    seed = %seed_id,
                    "Index returned a movie missing from the catalog, skipping"
                );
                continue;
            };

            if !genre_filter.accepts(&movie.genre_labels()) {
                continue;
            }

            recommendations.push(Recommendation::from_movie(movie, candidate.score));
        }

        tracing::info!(
            seed = %seed_id,
            top_k,
            filtered = !genre_filter.is_empty(),
            returned = recommendations.len(),
            "Recommendations computed"
        );

        Ok(recommendations)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        models::{QueryMatch, QueryResponse},
        services::index::MockSimilarityIndex,
    };

    fn movie(id: u64, title: &str, genres: &str) -> Movie {
        Movie {
            id: MovieId(id),
            title: title.to_string(),
            genres: genres.to_string(),
            combined_features: None,
            imdb_id: format!("{:07}", id),
        }
    }

    fn catalog() -> Arc<Catalog> {
        Arc::new(
            Catalog::new(vec![
                movie(1, "Toy Story (1995)", "Adventure Animation Children Comedy Fantasy"),
                movie(2, "Toy Story 2 (1999)", "Adventure Animation Children Comedy Fantasy"),
                movie(3, "Monsters, Inc. (2001)", "Adventure Animation Children Comedy Fantasy"),
                movie(4, "Finding Nemo (2003)", "Adventure Animation Children Comedy"),
                movie(5, "Antz (1998)", "Adventure Animation Children Comedy Fantasy"),
                movie(6, "Shrek (2001)", "Adventure Animation Children Comedy Fantasy Romance"),
                movie(7, "Scream (1996)", "Comedy Horror Mystery Thriller"),
            ])
            .unwrap(),
        )
    }

    fn matches(ids: &[u64]) -> QueryResponse {
        QueryResponse {
            matches: ids
                .iter()
                .enumerate()
                .map(|(rank, &id)| QueryMatch {
                    id: MovieId(id),
                    score: Some(1.0 - rank as f32 * 0.1),
                    metadata: None,
                })
                .collect(),
        }
    }

    fn engine_with(ids: &'static [u64]) -> RecommendationEngine {
        let mut mock = MockSimilarityIndex::new();
        mock.expect_name().return_const("mock");
        mock.expect_query()
            .returning(move |request| {
                assert_eq!(request.target, QueryTarget::Id(MovieId(1)));
                let k = request.top_k.min(ids.len());
                Ok(matches(&ids[..k]))
            });
        RecommendationEngine::new(Arc::new(mock), catalog(), Duration::from_secs(1))
    }

    fn ids(recommendations: &[Recommendation]) -> Vec<u64> {
        recommendations.iter().map(|r| r.movie_id.0).collect()
    }

    #[tokio::test]
    async fn test_seed_dropped_and_order_kept() {
        let engine = engine_with(&[1, 2, 3, 4, 5, 6, 7]);
        let result = engine
            .recommend("Toy Story (1995)", 5, &GenreFilter::any())
            .await
            .unwrap();

        assert_eq!(ids(&result), vec![2, 3, 4, 5, 6]);
        assert_eq!(result[0].imdb_id, "0000002");
        assert!((result[0].score.unwrap() - 0.9).abs() < 1e-6);
    }

    #[tokio::test]
    async fn test_requests_one_extra_neighbour() {
        let mut mock = MockSimilarityIndex::new();
        mock.expect_name().return_const("mock");
        mock.expect_query()
            .withf(|request| request.top_k == 6)
            .times(1)
            .returning(|_| Ok(matches(&[1, 2, 3, 4, 5, 6])));
        let engine = RecommendationEngine::new(Arc::new(mock), catalog(), Duration::from_secs(1));

        let result = engine
            .recommend("Toy Story (1995)", 5, &GenreFilter::any())
            .await
            .unwrap();
        assert_eq!(result.len(), 5);
    }

    #[tokio::test]
    async fn test_seed_not_first_is_still_excluded() {
        let engine = engine_with(&[2, 1, 3]);
        let result = engine
            .recommend("Toy Story (1995)", 5, &GenreFilter::any())
            .await
            .unwrap();
        assert_eq!(ids(&result), vec![2, 3]);
    }

    #[tokio::test]
    async fn test_genre_filter_with_no_matches_is_empty() {
        let engine = engine_with(&[1, 2, 3, 4, 5, 6, 7]);
        let horror = GenreFilter::parse("Horror").unwrap();
        let result = engine
            .recommend("Toy Story (1995)", 5, &horror)
            .await
            .unwrap();
        assert!(result.is_empty());
    }

    #[tokio::test]
    async fn test_filtered_results_are_subset_of_unfiltered() {
        let engine = engine_with(&[1, 6, 2, 7, 3, 4]);
        let all = engine
            .recommend("Toy Story (1995)", 5, &GenreFilter::any())
            .await
            .unwrap();
        let romance = engine
            .recommend("Toy Story (1995)", 5, &GenreFilter::parse("Romance,Horror").unwrap())
            .await
            .unwrap();

        assert_eq!(ids(&romance), vec![6, 7]);
        assert!(romance.iter().all(|r| all.contains(r)));
    }

    #[tokio::test]
    async fn test_candidate_missing_from_catalog_is_skipped() {
        let engine = engine_with(&[1, 99, 2]);
        let result = engine
            .recommend("Toy Story (1995)", 5, &GenreFilter::any())
            .await
            .unwrap();
        assert_eq!(ids(&result), vec![2]);
    }

    #[tokio::test]
    async fn test_unknown_title_is_not_found() {
        let mut mock = MockSimilarityIndex::new();
        mock.expect_query().never();
        let engine = RecommendationEngine::new(Arc::new(mock), catalog(), Duration::from_secs(1));

        let result = engine
            .recommend("Not A Real Movie", 5, &GenreFilter::any())
            .await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_index_failure_propagates() {
        let mut mock = MockSimilarityIndex::new();
        mock.expect_name().return_const("mock");
        mock.expect_query()
            .returning(|_| Err(AppError::IndexQuery("connection refused".to_string())));
        let engine = RecommendationEngine::new(Arc::new(mock), catalog(), Duration::from_secs(1));

        let result = engine
            .recommend("Toy Story (1995)", 5, &GenreFilter::any())
            .await;
        assert!(matches!(result, Err(AppError::IndexQuery(_))));
    }

    struct StalledIndex;

    #[async_trait::async_trait]
    impl SimilarityIndex for StalledIndex {
        async fn upsert(&self, entries: Vec<crate::models::IndexEntry>) -> AppResult<usize> {
            Ok(entries.len())
        }

        async fn query(&self, _request: QueryRequest) -> AppResult<QueryResponse> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(QueryResponse::default())
        }

        fn max_batch_size(&self) -> usize {
            1
        }

        fn name(&self) -> &'static str {
            "stalled"
        }
    }

    #[tokio::test]
    async fn test_query_timeout_is_index_error() {
        let engine = RecommendationEngine::new(
            Arc::new(StalledIndex),
            catalog(),
            Duration::from_millis(50),
        );

        let result = engine
            .recommend("Toy Story (1995)", 5, &GenreFilter::any())
            .await;
        assert!(matches!(result, Err(AppError::IndexQuery(msg)) if msg.contains("timed out")));
    }

    #[tokio::test]
    async fn test_zero_top_k_is_config_error() {
        let engine = engine_with(&[1, 2]);
        let result = engine
            .recommend("Toy Story (1995)", 0, &GenreFilter::any())
            .await;
        assert!(matches!(result, Err(AppError::Config(_))));
    }

    #[tokio::test]
    async fn test_recommend_by_id() {
        let engine = engine_with(&[1, 2, 3]);
        let result = engine
            .recommend_by_id(MovieId(1), 1, &GenreFilter::any())
            .await
            .unwrap();
        assert_eq!(ids(&result), vec![2]);

        let missing = engine
            .recommend_by_id(MovieId(404), 1, &GenreFilter::any())
            .await;
        assert!(matches!(missing, Err(AppError::NotFound(_))));
    }
}
