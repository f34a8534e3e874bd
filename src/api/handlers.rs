use axum::{
    extract::{Query, State},
    http::StatusCode,
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::{
    error::{AppError, AppResult},
    middleware::request_id::RequestId,
    models::{GenreFilter, Movie, MovieId, Recommendation, GENRES},
};

use super::AppState;

/// Upper bound on `top_k` accepted over HTTP
const MAX_TOP_K: usize = 100;

// Request/Response types

/// Query string of `GET /api/v1/recommendations`
///
/// Exactly one of `title` and `movie_id` identifies the seed; `genres` is a
/// comma-separated list.
#[derive(Debug, Deserialize)]
pub struct RecommendationQuery {
    pub title: Option<String>,
    pub movie_id: Option<u64>,
    pub top_k: Option<usize>,
    pub genres: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SeedResponse {
    pub movie_id: MovieId,
    pub title: String,
    pub genres: String,
    pub imdb_id: String,
}

impl From<&Movie> for SeedResponse {
    fn from(movie: &Movie) -> Self {
        Self {
            movie_id: movie.id,
            title: movie.title.clone(),
            genres: movie.genres.clone(),
            imdb_id: movie.imdb_id.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct RecommendationResponse {
    pub seed: SeedResponse,
    pub recommendations: Vec<Recommendation>,
}

// Handlers

/// Health check endpoint
pub async fn health_check() -> (StatusCode, Json<Value>) {
    (StatusCode::OK, Json(json!({ "status": "healthy" })))
}

/// Genre vocabulary for building filters
pub async fn get_genres() -> Json<Vec<&'static str>> {
    Json(GENRES.to_vec())
}

/// Recommendations for a seed movie, optionally filtered by genre
pub async fn recommend(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    Query(params): Query<RecommendationQuery>,
) -> AppResult<Json<RecommendationResponse>> {
    let top_k = params.top_k.unwrap_or(state.default_top_k);
    if top_k == 0 || top_k > MAX_TOP_K {
        return Err(AppError::Config(format!(
            "top_k must be between 1 and {}",
            MAX_TOP_K
        )));
    }

    let filter = match params.genres.as_deref() {
        Some(list) => GenreFilter::parse(list)?,
        None => GenreFilter::any(),
    };

    let engine = &state.engine;
    let seed = match (params.movie_id, params.title.as_deref()) {
        (Some(id), None) => engine.resolve_id(MovieId(id))?,
        (None, Some(title)) => engine.resolve_title(title)?,
        _ => {
            return Err(AppError::Config(
                "Provide exactly one of title or movie_id".to_string(),
            ))
        }
    };

    tracing::info!(
        request_id = %request_id,
        seed = %seed.id,
        top_k,
        "Processing recommendation request"
    );

    let recommendations = engine.recommend_by_id(seed.id, top_k, &filter).await?;

    Ok(Json(RecommendationResponse {
        seed: SeedResponse::from(seed),
        recommendations,
    }))
}
