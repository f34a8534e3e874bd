use std::collections::BTreeSet;

use crate::error::{AppError, AppResult};

/// Genre vocabulary of the catalog
pub const GENRES: [&str; 18] = [
    "Action",
    "Adventure",
    "Animation",
    "Children",
    "Comedy",
    "Crime",
    "Documentary",
    "Drama",
    "Fantasy",
    "Film-Noir",
    "Horror",
    "IMAX",
    "Mystery",
    "Romance",
    "Sci-Fi",
    "Thriller",
    "War",
    "Western",
];

/// Splits a stored genre string ("Adventure Animation" or "Adventure|Animation") into labels
pub fn split_genres(genres: &str) -> Vec<&str> {
    genres
        .split(|c: char| c.is_whitespace() || c == '|')
        .filter(|label| !label.is_empty())
        .collect()
}

/// Set of genres a recommendation must intersect; empty accepts everything
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GenreFilter(BTreeSet<String>);

impl GenreFilter {
    pub fn any() -> Self {
        Self::default()
    }

    /// Builds a filter from labels, rejecting anything outside [`GENRES`]
    pub fn new<I, S>(labels: I) -> AppResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut set = BTreeSet::new();
        for label in labels {
            let label = label.as_ref().trim();
            if label.is_empty() {
                continue;
            }
            let canonical = GENRES
                .iter()
                .find(|g| g.eq_ignore_ascii_case(label))
                .ok_or_else(|| AppError::Config(format!("Unknown genre: {}", label)))?;
            set.insert(canonical.to_string());
        }
        Ok(Self(set))
    }

    /// Parses a comma-separated list such as `"Action,Sci-Fi"`
    pub fn parse(list: &str) -> AppResult<Self> {
        Self::new(list.split(','))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn accepts(&self, labels: &[&str]) -> bool {
        self.is_empty() || labels.iter().any(|label| self.0.contains(*label))
    }
}
