use crate::models::recommendation::{EngineItem, EngineResponse};
use crate::utils::config::AppConfig;
use log::warn;
use serde::Serialize;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest {
    search_id: i64,
    limit: u32,
}

/// HTTP client for the external scoring engine. Failures are reported as
/// `None`; callers degrade to an empty result instead of erroring.
pub struct RecommendationEngineClient {
    client: Option<reqwest::Client>,
    base_url: String,
}

impl RecommendationEngineClient {
    pub fn new(config: &AppConfig) -> Self {
        let client = reqwest::Client::builder()
            .connect_timeout(config.engine_connect_timeout)
            .timeout(config.engine_read_timeout)
            .build()
            .map_err(|e| warn!("recommendation engine client not built: {e}"))
            .ok();
        RecommendationEngineClient {
            client,
            base_url: config.recommendation_engine_url.trim_end_matches('/').to_string(),
        }
    }

    pub async fn generate(&self, search_id: i64, limit: u32) -> Option<Vec<EngineItem>> {
        let client = self.client.as_ref()?;
        let url = format!("{}/recommendations/generate", self.base_url);
        let response = client
            .post(&url)
            .json(&GenerateRequest { search_id, limit })
            .send()
            .await;
        let response = match response {
            Ok(r) => r,
            Err(e) => {
                warn!("recommendation engine unreachable: {e}");
                return None;
            }
        };
        if !response.status().is_success() {
            warn!("recommendation engine returned {}", response.status());
            return None;
        }
        match response.json::<EngineResponse>().await {
            Ok(body) => Some(body.items),
            Err(e) => {
                warn!("recommendation engine sent an unreadable body: {e}");
                None
            }
        }
    }
}
