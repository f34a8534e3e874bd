use serde::{Deserialize, Serialize};
use std::{fmt::Display, str::FromStr};

pub mod genre;

pub use genre::{split_genres, GenreFilter, GENRES};

/// Catalog identifier of a movie (MovieLens `movieId`)
///
/// The index stores it as its decimal string form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MovieId(pub u64);

impl Display for MovieId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for MovieId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse().map(MovieId)
    }
}

/// A catalog row
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Movie {
    #[serde(rename = "movieId")]
    pub id: MovieId,
    pub title: String,
    /// Genre labels joined by whitespace or `|`
    pub genres: String,
    /// Concatenated descriptive text used for vectorization; absent text counts as empty
    #[serde(default)]
    pub combined_features: Option<String>,
    /// Cross-reference key used by front ends for poster lookup
    #[serde(rename = "imdbId")]
    pub imdb_id: String,
}

impl Movie {
    pub fn genre_labels(&self) -> Vec<&str> {
        split_genres(&self.genres)
    }
}

/// A single recommended movie returned to the client
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Recommendation {
    pub movie_id: MovieId,
    pub title: String,
    pub genres: String,
    pub imdb_id: String,
    /// Similarity reported by the index, when it returned one
    pub score: Option<f32>,
}

impl Recommendation {
    pub fn from_movie(movie: &Movie, score: Option<f32>) -> Self {
        Self {
            movie_id: movie.id,
            title: movie.title.clone(),
            genres: movie.genres.clone(),
            imdb_id: movie.imdb_id.clone(),
            score,
        }
    }
}

// ============================================================================
// Similarity Index Types
// ============================================================================

/// Metadata stored next to each vector in the index
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EntryMetadata {
    pub movie_name: String,
    pub movie_genre: String,
}

/// The unit written to the similarity index
#[derive(Debug, Clone, PartialEq)]
pub struct IndexEntry {
    pub id: MovieId,
    pub values: Vec<f32>,
    pub metadata: EntryMetadata,
}

impl IndexEntry {
    pub fn new(movie: &Movie, values: Vec<f32>) -> Self {
        Self {
            id: movie.id,
            values,
            metadata: EntryMetadata {
                movie_name: movie.title.clone(),
                movie_genre: movie.genres.clone(),
            },
        }
    }
}

/// What a nearest-neighbour query is anchored to
#[derive(Debug, Clone, PartialEq)]
pub enum QueryTarget {
    /// An entry already stored in the index
    Id(MovieId),
    Vector(Vec<f32>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct QueryRequest {
    pub target: QueryTarget,
    pub top_k: usize,
    pub include_metadata: bool,
}

/// One neighbour, most similar first
#[derive(Debug, Clone, PartialEq)]
pub struct QueryMatch {
    pub id: MovieId,
    pub score: Option<f32>,
    pub metadata: Option<EntryMetadata>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryResponse {
    pub matches: Vec<QueryMatch>,
}

/// Outcome of a completed upsert run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct UpsertReport {
    pub committed: usize,
    pub batches: usize,
}

// ============================================================================
// Pinecone API Types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct PineconeVector<'a> {
    pub id: String,
    pub values: &'a [f32],
    pub metadata: &'a EntryMetadata,
}

#[derive(Debug, Serialize)]
pub struct PineconeUpsertRequest<'a> {
    pub vectors: Vec<PineconeVector<'a>>,
    #[serde(skip_serializing_if = "str::is_empty")]
    pub namespace: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PineconeUpsertResponse {
    pub upserted_count: usize,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PineconeQueryRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vector: Option<&'a [f32]>,
    pub top_k: usize,
    pub include_metadata: bool,
    pub include_values: bool,
    #[serde(skip_serializing_if = "str::is_empty")]
    pub namespace: &'a str,
}

#[derive(Debug, Deserialize)]
pub struct PineconeQueryResponse {
    #[serde(default)]
    pub matches: Vec<PineconeMatch>,
}

#[derive(Debug, Deserialize)]
pub struct PineconeMatch {
    pub id: String,
    #[serde(default)]
    pub score: Option<f32>,
    #[serde(default)]
    pub metadata: Option<EntryMetadata>,
}

impl TryFrom<PineconeMatch> for QueryMatch {
    type Error = String;

    fn try_from(raw: PineconeMatch) -> Result<Self, Self::Error> {
        let id = raw
            .id
            .parse()
            .map_err(|_| format!("non-numeric match id {:?}", raw.id))?;

        Ok(QueryMatch {
            id,
            score: raw.score,
            metadata: raw.metadata,
        })
    }
}
