use crate::{
    error::AppResult,
    models::UpsertReport,
    services::{
        catalog::Catalog,
        index::SimilarityIndex,
        index_loader::IndexLoader,
        reducer::{fit_reduce, SvdProjection},
        similarity::{pairwise_cosine, SimilarityMatrix},
        vectorizer::TfidfVectorizer,
    },
};
use serde::Serialize;
use std::{sync::Arc, time::Instant};

/// Parameters of the offline indexing run
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub max_features: usize,
    pub ngram_range: (usize, usize),
    pub n_components: usize,
    pub batch_size: usize,
    /// Also build the dense pairwise cosine matrix (O(N²) memory)
    pub compute_similarity_matrix: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_features: 7000,
            ngram_range: (1, 2),
            n_components: 500,
            batch_size: 1000,
            compute_similarity_matrix: false,
        }
    }
}

/// Summary of a completed run
#[derive(Debug, Clone, Serialize)]
pub struct PipelineReport {
    pub documents: usize,
    pub vocabulary: usize,
    pub n_components: usize,
    pub upsert: UpsertReport,
    pub elapsed_ms: u128,
}

/// Everything a run produced, for callers that keep analysing in-process
pub struct PipelineOutput {
    pub report: PipelineReport,
    pub vectorizer: TfidfVectorizer,
    pub projection: SvdProjection,
    pub similarity: Option<SimilarityMatrix>,
}

/// Vectorizes the catalog, reduces it and upserts the result into `index`
///
/// Any vectorization or reduction failure aborts before a single entry is written.
pub async fn run(
    catalog: &Catalog,
    index: Arc<dyn SimilarityIndex>,
    config: &PipelineConfig,
) -> AppResult<PipelineOutput> {
    let start = Instant::now();
    tracing::info!(
        movies = catalog.len(),
        max_features = config.max_features,
        n_components = config.n_components,
        "Data preprocessing started"
    );

    let mut vectorizer = TfidfVectorizer::new(config.max_features, config.ngram_range)?;
    let features = vectorizer.fit_transform(&catalog.corpus())?;

    let similarity = config
        .compute_similarity_matrix
        .then(|| pairwise_cosine(&features));

    let reduction = fit_reduce(&features, config.n_components)?;

    let loader = IndexLoader::new(index);
    let upsert = loader
        .upsert(catalog.movies(), &reduction.vectors, config.batch_size)
        .await?;

    let report = PipelineReport {
        documents: features.len(),
        vocabulary: vectorizer.vocabulary_size(),
        n_components: reduction.projection.n_components(),
        upsert,
        elapsed_ms: start.elapsed().as_millis(),
    };

    tracing::info!(
        documents = report.documents,
        vocabulary = report.vocabulary,
        committed = report.upsert.committed,
        elapsed_ms = report.elapsed_ms as u64,
        "Pipeline completed"
    );

    Ok(PipelineOutput {
        report,
        vectorizer,
        projection: reduction.projection,
        similarity,
    })
}
