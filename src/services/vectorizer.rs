//! TF-IDF feature extraction over the catalog's combined feature text
//!
//! Tokens are lowercased alphanumeric runs of at least two characters with English
//! stop words removed; n-grams are formed from the surviving tokens. The vocabulary
//! keeps the `max_features` terms with the highest corpus count and rows are
//! L2-normalised, so a dot product between rows is their cosine similarity.

use rayon::prelude::*;
use std::collections::HashMap;

use crate::{
    error::{AppError, AppResult},
    services::stopwords::is_stop_word,
};

/// Sparse TF-IDF row: strictly increasing term indices with their weights
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureVector {
    indices: Vec<usize>,
    values: Vec<f64>,
    dim: usize,
}

impl FeatureVector {
    /// Builds a vector from (index, weight) pairs, sorting by index
    pub fn from_pairs(mut pairs: Vec<(usize, f64)>, dim: usize) -> Self {
        pairs.sort_unstable_by_key(|&(index, _)| index);
        debug_assert!(pairs.iter().all(|&(index, _)| index < dim));
        let (indices, values) = pairs.into_iter().unzip();
        Self {
            indices,
            values,
            dim,
        }
    }

    pub fn zeros(dim: usize) -> Self {
        Self::from_pairs(Vec::new(), dim)
    }

    /// Vocabulary size this vector lives in
    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Number of non-zero weights
    pub fn nnz(&self) -> usize {
        self.indices.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, f64)> + '_ {
        self.indices.iter().copied().zip(self.values.iter().copied())
    }

    pub fn norm(&self) -> f64 {
        self.values.iter().map(|v| v * v).sum::<f64>().sqrt()
    }

    /// Sparse dot product (merge over the sorted indices)
    pub fn dot(&self, other: &Self) -> f64 {
        let (mut i, mut j) = (0, 0);
        let mut sum = 0.0;
        while i < self.indices.len() && j < other.indices.len() {
            match self.indices[i].cmp(&other.indices[j]) {
                std::cmp::Ordering::Less => i += 1,
                std::cmp::Ordering::Greater => j += 1,
                std::cmp::Ordering::Equal => {
                    sum += self.values[i] * other.values[j];
                    i += 1;
                    j += 1;
                }
            }
        }
        sum
    }
}

/// TF-IDF vectorizer with a capped unigram/bigram vocabulary
#[derive(Debug, Clone)]
pub struct TfidfVectorizer {
    max_features: usize,
    ngram_range: (usize, usize),
    vocabulary: HashMap<String, usize>,
    idf: Vec<f64>,
}

impl TfidfVectorizer {
    pub fn new(max_features: usize, ngram_range: (usize, usize)) -> AppResult<Self> {
        if max_features == 0 {
            return Err(AppError::Config("max_features must be at least 1".to_string()));
        }
        let (min_n, max_n) = ngram_range;
        if min_n == 0 || min_n > max_n {
            return Err(AppError::Config(format!(
                "Invalid n-gram range ({}, {})",
                min_n, max_n
            )));
        }

        Ok(Self {
            max_features,
            ngram_range,
            vocabulary: HashMap::new(),
            idf: Vec::new(),
        })
    }

    pub fn vocabulary_size(&self) -> usize {
        self.vocabulary.len()
    }

    /// Index of a term in the fitted vocabulary
    pub fn term_index(&self, term: &str) -> Option<usize> {
        self.vocabulary.get(term).copied()
    }

    /// Learns vocabulary and idf weights, then vectorizes the same corpus
    ///
    /// `None` entries are records without text and vectorize to empty rows.
    pub fn fit_transform<S: AsRef<str> + Sync>(
        &mut self,
        corpus: &[Option<S>],
    ) -> AppResult<Vec<FeatureVector>> {
        if corpus.is_empty() {
            return Err(AppError::Data("The corpus is empty".to_string()));
        }
        if corpus.iter().all(Option::is_none) {
            return Err(AppError::Data(
                "No record carries feature text".to_string(),
            ));
        }

        let documents: Vec<Vec<String>> = corpus
            .par_iter()
            .map(|text| {
                text.as_ref()
                    .map(|t| self.analyze(t.as_ref()))
                    .unwrap_or_default()
            })
            .collect();

        let mut term_count: HashMap<&str, usize> = HashMap::new();
        let mut doc_freq: HashMap<&str, usize> = HashMap::new();
        for terms in &documents {
            let mut seen: Vec<&str> = Vec::with_capacity(terms.len());
            for term in terms {
                *term_count.entry(term.as_str()).or_insert(0) += 1;
                seen.push(term.as_str());
            }
            seen.sort_unstable();
            seen.dedup();
            for term in seen {
                *doc_freq.entry(term).or_insert(0) += 1;
            }
        }

        // Most frequent terms first, ties in lexicographic order
        if term_count.is_empty() {
            return Err(AppError::Data(
                "Empty vocabulary: the documents contain only stop words or no tokens".to_string(),
            ));
        }

        let mut ranked: Vec<(&str, usize)> = term_count.into_iter().collect();
        ranked.sort_unstable_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        ranked.truncate(self.max_features);

        let mut kept: Vec<&str> = ranked.into_iter().map(|(term, _)| term).collect();
        kept.sort_unstable();

        let n_docs = documents.len() as f64;
        self.idf = kept
            .iter()
            .map(|term| {
                let df = doc_freq.get(term).copied().unwrap_or(0) as f64;
                ((1.0 + n_docs) / (1.0 + df)).ln() + 1.0
            })
            .collect();
        self.vocabulary = kept
            .into_iter()
            .enumerate()
            .map(|(index, term)| (term.to_string(), index))
            .collect();

        tracing::info!(
            documents = documents.len(),
            vocabulary = self.vocabulary.len(),
            "TF-IDF vocabulary fitted"
        );

        Ok(documents
            .par_iter()
            .map(|terms| self.weigh(terms))
            .collect())
    }

    /// Vectorizes new text with the fitted vocabulary; unseen terms are ignored
    pub fn transform(&self, text: &str) -> AppResult<FeatureVector> {
        if self.vocabulary.is_empty() {
            return Err(AppError::Config(
                "Vectorizer has not been fitted".to_string(),
            ));
        }
        Ok(self.weigh(&self.analyze(text)))
    }

    fn weigh(&self, terms: &[String]) -> FeatureVector {
        let mut counts: HashMap<usize, f64> = HashMap::new();
        for term in terms {
            if let Some(&index) = self.vocabulary.get(term) {
                *counts.entry(index).or_insert(0.0) += 1.0;
            }
        }

        let mut vector = FeatureVector::from_pairs(
            counts
                .into_iter()
                .map(|(index, count)| (index, count * self.idf[index]))
                .collect(),
            self.vocabulary.len(),
        );

        // Summed in index order so identical input gives bit-identical rows
        let norm = vector.norm();
        if norm > 0.0 {
            for weight in &mut vector.values {
                *weight /= norm;
            }
        }
        vector
    }

    fn analyze(&self, text: &str) -> Vec<String> {
        let tokens: Vec<String> = tokenize(text)
            .into_iter()
            .filter(|token| !is_stop_word(token))
            .collect();

        let (min_n, max_n) = self.ngram_range;
        let mut terms = Vec::new();
        for n in min_n..=max_n {
            if n == 1 {
                terms.extend(tokens.iter().cloned());
            } else {
                terms.extend(tokens.windows(n).map(|window| window.join(" ")));
            }
        }
        terms
    }
}

/// Lowercased alphanumeric runs of two or more characters
fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !(c.is_alphanumeric() || c == '_'))
        .filter(|token| token.chars().count() >= 2)
        .map(str::to_string)
        .collect()
}

/// Fits a vectorizer on `corpus` and returns one feature vector per record
pub fn vectorize<S: AsRef<str> + Sync>(
    corpus: &[Option<S>],
    max_features: usize,
    ngram_range: (usize, usize),
) -> AppResult<Vec<FeatureVector>> {
    TfidfVectorizer::new(max_features, ngram_range)?.fit_transform(corpus)
}
