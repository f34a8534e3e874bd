use serde::Deserialize;

use crate::services::pipeline::PipelineConfig;

/// Application configuration loaded from environment variables
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Pinecone API key
    pub pinecone_api_key: String,

    /// Data-plane host of the Pinecone index (e.g. https://movies-abc123.svc.pinecone.io)
    pub pinecone_index_host: String,

    /// Pinecone namespace, empty for the default namespace
    #[serde(default)]
    pub pinecone_namespace: String,

    /// Path to the movie catalog CSV
    #[serde(default = "default_catalog_path")]
    pub catalog_path: String,

    /// TF-IDF vocabulary cap
    #[serde(default = "default_max_features")]
    pub max_features: usize,

    #[serde(default = "default_ngram_min")]
    pub ngram_min: usize,

    #[serde(default = "default_ngram_max")]
    pub ngram_max: usize,

    /// Dimensionality of the vectors stored in the index
    #[serde(default = "default_n_components")]
    pub n_components: usize,

    #[serde(default = "default_upsert_batch_size")]
    pub upsert_batch_size: usize,

    /// Upper bound on a single index query, in milliseconds
    #[serde(default = "default_query_timeout_ms")]
    pub query_timeout_ms: u64,

    #[serde(default = "default_top_k")]
    pub default_top_k: usize,

    /// Also build the full pairwise cosine matrix during the offline run (O(N²) memory)
    #[serde(default)]
    pub compute_similarity_matrix: bool,

    /// Server host address
    #[serde(default = "default_host")]
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_catalog_path() -> String {
    "./data/content_based_filtering_dataset.csv".to_string()
}

fn default_max_features() -> usize {
    7000
}

fn default_ngram_min() -> usize {
    1
}

fn default_ngram_max() -> usize {
    2
}

fn default_n_components() -> usize {
    500
}

fn default_upsert_batch_size() -> usize {
    1000
}

fn default_query_timeout_ms() -> u64 {
    5000
}

fn default_top_k() -> usize {
    12
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        envy::from_env::<Config>().map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))
    }

    /// Parameters of the offline vectorize → reduce → upsert run
    pub fn pipeline(&self) -> PipelineConfig {
        PipelineConfig {
            max_features: self.max_features,
            ngram_range: (self.ngram_min, self.ngram_max),
            n_components: self.n_components,
            batch_size: self.upsert_batch_size,
            compute_similarity_matrix: self.compute_similarity_matrix,
        }
    }

    pub fn query_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.query_timeout_ms)
    }
}
