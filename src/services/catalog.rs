use crate::{
    error::{AppError, AppResult},
    models::{Movie, MovieId},
};
use std::{collections::HashMap, path::Path};

/// Read-only movie catalog with id lookup
///
/// Shared between the offline pipeline (row order = vector order) and the
/// recommendation engine (genre and poster-key lookups for index candidates).
#[derive(Debug, Clone)]
pub struct Catalog {
    movies: Vec<Movie>,
    by_id: HashMap<MovieId, usize>,
}

impl Catalog {
    /// Builds a catalog, rejecting duplicate identifiers
    pub fn new(movies: Vec<Movie>) -> AppResult<Self> {
        let mut by_id = HashMap::with_capacity(movies.len());
        for (position, movie) in movies.iter().enumerate() {
            if by_id.insert(movie.id, position).is_some() {
                return Err(AppError::Data(format!(
                    "Duplicate movie id {} in catalog",
                    movie.id
                )));
            }
        }

        Ok(Self { movies, by_id })
    }

    /// Loads the catalog CSV (`movieId,title,genres,combined_features,imdbId`)
    pub fn load_csv(path: impl AsRef<Path>) -> AppResult<Self> {
        let path = path.as_ref();
        tracing::info!(path = %path.display(), "Loading catalog");

        if !path.exists() {
            return Err(AppError::Data(format!(
                "Catalog file {} was not found",
                path.display()
            )));
        }

        let mut reader = csv::Reader::from_path(path)
            .map_err(|e| AppError::Data(format!("Failed to open {}: {}", path.display(), e)))?;

        let movies = reader
            .deserialize::<Movie>()
            .enumerate()
            .map(|(row, record)| {
                // +2: header line and 1-based numbering
                record.map_err(|e| AppError::Data(format!("Invalid catalog row {}: {}", row + 2, e)))
            })
            .collect::<AppResult<Vec<Movie>>>()?;

        if movies.is_empty() {
            return Err(AppError::Data(format!(
                "Catalog file {} was loaded but it is empty",
                path.display()
            )));
        }

        let catalog = Self::new(movies)?;
        tracing::info!(movies = catalog.len(), "Catalog loaded");
        Ok(catalog)
    }

    pub fn movies(&self) -> &[Movie] {
        &self.movies
    }

    pub fn len(&self) -> usize {
        self.movies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.movies.is_empty()
    }

    pub fn get(&self, id: MovieId) -> Option<&Movie> {
        self.by_id.get(&id).map(|&position| &self.movies[position])
    }

    /// Exact title match; duplicate titles resolve to the first in catalog order
    pub fn find_by_title(&self, title: &str) -> Option<&Movie> {
        self.movies.iter().find(|movie| movie.title == title)
    }

    /// The vectorization corpus, one entry per movie in catalog order
    pub fn corpus(&self) -> Vec<Option<&str>> {
        self.movies
            .iter()
            .map(|movie| movie.combined_features.as_deref())
            .collect()
    }
}
