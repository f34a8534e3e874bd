pub mod catalog;
pub mod index;
pub mod index_loader;
pub mod pipeline;
pub mod recommendations;
pub mod reducer;
pub mod similarity;
pub mod stopwords;
pub mod vectorizer;

pub use catalog::Catalog;
pub use index::{InMemoryIndex, PineconeIndex, SimilarityIndex};
pub use index_loader::IndexLoader;
pub use recommendations::RecommendationEngine;
