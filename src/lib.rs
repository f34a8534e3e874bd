//! Content-based movie recommendations
//!
//! Offline: catalog text → TF-IDF → truncated SVD → similarity index.
//! Online: seed movie → index neighbours → seed removal + genre filter.

pub mod api;
pub mod config;
pub mod error;
pub mod middleware;
pub mod models;
pub mod services;

/// Installs the `tracing` subscriber; `RUST_LOG` overrides the `info` default
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();
}
