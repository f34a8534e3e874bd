/// Pinecone data-plane client
///
/// API Flow:
/// 1. Upsert: POST {host}/vectors/upsert → `{"upsertedCount": n}`
/// 2. Query:  POST {host}/query (by stored id or raw vector) → `{"matches": [...]}`
///
/// Authentication is the `Api-Key` header; Pinecone caps upserts at 1000 vectors per call.
use crate::{
    error::{AppError, AppResult},
    models::{
        IndexEntry, PineconeQueryRequest, PineconeQueryResponse, PineconeUpsertRequest,
        PineconeUpsertResponse, PineconeVector, QueryMatch, QueryRequest, QueryResponse,
        QueryTarget,
    },
    services::index::SimilarityIndex,
};
use reqwest::Client as HttpClient;

const MAX_UPSERT_BATCH: usize = 1000;
const API_VERSION: &str = "2024-07";

#[derive(Clone)]
pub struct PineconeIndex {
    http_client: HttpClient,
    api_key: String,
    host: String,
    namespace: String,
}

impl PineconeIndex {
    /// Creates a client for the index served at `host`
    pub fn new(api_key: String, host: String, namespace: String) -> Self {
        let host = if host.starts_with("http://") || host.starts_with("https://") {
            host
        } else {
            format!("https://{}", host)
        };

        Self {
            http_client: HttpClient::new(),
            api_key,
            host: host.trim_end_matches('/').to_string(),
            namespace,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.host, path)
    }

    fn request(&self, path: &str) -> reqwest::RequestBuilder {
        self.http_client
            .post(self.url(path))
            .header("Api-Key", &self.api_key)
            .header("X-Pinecone-API-Version", API_VERSION)
    }
}

fn write_error(message: String) -> AppError {
    AppError::IndexWrite {
        committed: 0,
        message,
    }
}

#[async_trait::async_trait]
impl SimilarityIndex for PineconeIndex {
    async fn upsert(&self, entries: Vec<IndexEntry>) -> AppResult<usize> {
        if entries.len() > MAX_UPSERT_BATCH {
            return Err(AppError::Config(format!(
                "Pinecone accepts at most {} vectors per upsert, got {}",
                MAX_UPSERT_BATCH,
                entries.len()
            )));
        }

        let body = PineconeUpsertRequest {
            vectors: entries
                .iter()
                .map(|entry| PineconeVector {
                    id: entry.id.to_string(),
                    values: &entry.values,
                    metadata: &entry.metadata,
                })
                .collect(),
            namespace: &self.namespace,
        };

        let response = self
            .request("vectors/upsert")
            .json(&body)
            .send()
            .await
            .map_err(|e| write_error(format!("Pinecone upsert request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, body = %body, "Pinecone upsert failed");
            return Err(write_error(format!(
                "Pinecone returned status {}: {}",
                status, body
            )));
        }

        let result: PineconeUpsertResponse = response
            .json()
            .await
            .map_err(|e| write_error(format!("Failed to parse Pinecone upsert response: {}", e)))?;

        tracing::debug!(
            upserted = result.upserted_count,
            provider = "pinecone",
            "Batch upserted"
        );

        Ok(result.upserted_count)
    }

    async fn query(&self, request: QueryRequest) -> AppResult<QueryResponse> {
        let (id, vector) = match &request.target {
            QueryTarget::Id(id) => (Some(id.to_string()), None),
            QueryTarget::Vector(values) => (None, Some(values.as_slice())),
        };

        let body = PineconeQueryRequest {
            id,
            vector,
            top_k: request.top_k,
            include_metadata: request.include_metadata,
            include_values: false,
            namespace: &self.namespace,
        };

        let response = self
            .request("query")
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::IndexQuery(format!("Pinecone query request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, body = %body, "Pinecone query failed");
            return Err(AppError::IndexQuery(format!(
                "Pinecone returned status {}: {}",
                status, body
            )));
        }

        let response_text = response
            .text()
            .await
            .map_err(|e| AppError::IndexQuery(format!("Failed to read Pinecone response: {}", e)))?;

        let raw: PineconeQueryResponse = serde_json::from_str(&response_text).map_err(|e| {
            tracing::error!(
                error = %e,
                response = %response_text,
                "Failed to deserialize Pinecone response"
            );
            AppError::IndexQuery(format!("Failed to parse Pinecone response: {}", e))
        })?;

        let matches = raw
            .matches
            .into_iter()
            .map(QueryMatch::try_from)
            .collect::<Result<Vec<_>, _>>()
            .map_err(AppError::IndexQuery)?;

        tracing::debug!(
            matches = matches.len(),
            provider = "pinecone",
            "Query completed"
        );

        Ok(QueryResponse { matches })
    }

    fn max_batch_size(&self) -> usize {
        MAX_UPSERT_BATCH
    }

    fn name(&self) -> &'static str {
        "pinecone"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{EntryMetadata, MovieId};

    #[test]
    fn test_host_normalized() {
        let index = PineconeIndex::new(
            "key".to_string(),
            "movies-abc.svc.pinecone.io/".to_string(),
            String::new(),
        );
        assert_eq!(index.url("query"), "https://movies-abc.svc.pinecone.io/query");

        let local = PineconeIndex::new(
            "key".to_string(),
            "http://localhost:5080".to_string(),
            String::new(),
        );
        assert_eq!(local.url("vectors/upsert"), "http://localhost:5080/vectors/upsert");
    }

    #[tokio::test]
    async fn test_oversized_batch_rejected_before_request() {
        let index = PineconeIndex::new(
            "key".to_string(),
            "http://127.0.0.1:9".to_string(),
            String::new(),
        );
        let entries = (0..1001)
            .map(|i| IndexEntry {
                id: MovieId(i),
                values: vec![0.0; 2],
                metadata: EntryMetadata {
                    movie_name: format!("Movie {}", i),
                    movie_genre: "Drama".to_string(),
                },
            })
            .collect();

        let result = index.upsert(entries).await;
        assert!(matches!(result, Err(AppError::Config(_))));
    }

    #[tokio::test]
    async fn test_unreachable_host_is_query_error() {
        // Port 9 (discard) is not expected to serve HTTP
        let index = PineconeIndex::new(
            "key".to_string(),
            "http://127.0.0.1:9".to_string(),
            String::new(),
        );
        let result = index
            .query(QueryRequest {
                target: QueryTarget::Id(MovieId(1)),
                top_k: 5,
                include_metadata: true,
            })
            .await;
        assert!(matches!(result, Err(AppError::IndexQuery(_))));
    }

    #[test]
    fn test_upsert_body_shape() {
        let metadata = EntryMetadata {
            movie_name: "Toy Story (1995)".to_string(),
            movie_genre: "Animation".to_string(),
        };
        let values = [0.5f32, -0.25];
        let body = PineconeUpsertRequest {
            vectors: vec![PineconeVector {
                id: "1".to_string(),
                values: &values,
                metadata: &metadata,
            }],
            namespace: "movies",
        };

        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "vectors": [{
                    "id": "1",
                    "values": [0.5, -0.25],
                    "metadata": {"movie_name": "Toy Story (1995)", "movie_genre": "Animation"}
                }],
                "namespace": "movies"
            })
        );
    }
}
