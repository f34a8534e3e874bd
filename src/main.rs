use std::sync::Arc;

use movie_recs::{
    api::{create_router, AppState},
    config::Config,
    services::{Catalog, PineconeIndex, RecommendationEngine},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    movie_recs::init_tracing();
    let config = Config::from_env()?;

    let catalog = Arc::new(Catalog::load_csv(&config.catalog_path)?);

    let index = Arc::new(PineconeIndex::new(
        config.pinecone_api_key.clone(),
        config.pinecone_index_host.clone(),
        config.pinecone_namespace.clone(),
    ));

    let engine = RecommendationEngine::new(index, catalog, config.query_timeout());
    let app = create_router(AppState::new(engine, config.default_top_k));

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server running");
    axum::serve(listener, app).await?;

    Ok(())
}
