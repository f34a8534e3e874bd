use std::sync::Arc;

use movie_recs::{
    config::Config,
    services::{pipeline, Catalog, PineconeIndex},
};

/// Offline run: catalog → TF-IDF → truncated SVD → Pinecone upsert
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    movie_recs::init_tracing();
    let config = Config::from_env()?;

    let catalog = Catalog::load_csv(&config.catalog_path)?;
    let index = Arc::new(PineconeIndex::new(
        config.pinecone_api_key.clone(),
        config.pinecone_index_host.clone(),
        config.pinecone_namespace.clone(),
    ));

    let output = pipeline::run(&catalog, index, &config.pipeline()).await?;

    if let Some(similarity) = &output.similarity {
        if let Some((neighbour, score)) = similarity.most_similar(0, 1).first() {
            tracing::info!(
                movie = %catalog.movies()[0].title,
                nearest = %catalog.movies()[*neighbour].title,
                score,
                "Sample nearest neighbour from cosine matrix"
            );
        }
    }

    println!("{}", serde_json::to_string_pretty(&output.report)?);
    Ok(())
}
