use std::time::Duration;

use serde::Deserialize;
use tracing::{debug, info};

use inviteflow_core::config::{ApiConfig, EnvironmentConfig};
use inviteflow_core::FlowError;

const TOKEN_PATH: &str = "/authentication/v2/token";
const TOKEN_SCOPE: &str = "data:read data:write account:read account:write";

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

/// Authenticated client for the construction-management platform API.
/// Every request carries the admin context headers; the bearer token is
/// obtained once per run via client credentials.
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    client_id: String,
    client_secret: String,
    user_id: String,
    region: String,
    token: Option<String>,
}

impl ApiClient {
    pub fn new(config: &ApiConfig, environment: &EnvironmentConfig) -> Result<Self, FlowError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_seconds))
            .build()
            .map_err(|e| FlowError::Transport(format!("http client build failed: {}", e)))?;
        Ok(Self {
            http,
            base_url: format!("https://{}", environment.base_url),
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
            user_id: config.user_id.clone(),
            region: environment.region.clone(),
            token: None,
        })
    }

    /// Client-credentials token exchange. Must run before any other call.
    pub async fn authenticate(&mut self) -> Result<(), FlowError> {
        let url = format!("{}{}", self.base_url, TOKEN_PATH);
        debug!(client_id = %mask(&self.client_id), "requesting access token");
        let response = self
            .http
            .post(&url)
            .form(&[
                ("grant_type", "client_credentials"),
                ("client_id", &self.client_id),
                ("client_secret", &self.client_secret),
                ("scope", TOKEN_SCOPE),
            ])
            .send()
            .await
            .map_err(|e| FlowError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(FlowError::Api(format!(
                "token request failed with {}: {}",
                status, body
            )));
        }
        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| FlowError::Api(format!("malformed token response: {}", e)))?;
        self.token = Some(token.access_token);
        info!("api authentication complete");
        Ok(())
    }

    pub async fn post_json(
        &self,
        path: &str,
        body: &serde_json::Value,
    ) -> Result<serde_json::Value, FlowError> {
        let url = format!("{}{}", self.base_url, path);
        let mut request = self
            .http
            .post(&url)
            .header("User-Id", &self.user_id)
            .header("Region", &self.region)
            .json(body);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| FlowError::Transport(e.to_string()))?;
        let status = response.status();
        let payload = response.text().await.unwrap_or_default();
        if !status.is_success() {
            return Err(FlowError::Api(format!(
                "POST {} failed with {}: {}",
                path, status, payload
            )));
        }
        if payload.is_empty() {
            return Ok(serde_json::Value::Null);
        }
        serde_json::from_str(&payload)
            .map_err(|e| FlowError::Api(format!("POST {} returned invalid json: {}", path, e)))
    }

    pub async fn get_json(&self, path: &str) -> Result<serde_json::Value, FlowError> {
        let url = format!("{}{}", self.base_url, path);
        let mut request = self
            .http
            .get(&url)
            .header("User-Id", &self.user_id)
            .header("Region", &self.region);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| FlowError::Transport(e.to_string()))?;
        let status = response.status();
        let payload = response.text().await.unwrap_or_default();
        if !status.is_success() {
            return Err(FlowError::Api(format!(
                "GET {} failed with {}: {}",
                path, status, payload
            )));
        }
        serde_json::from_str(&payload)
            .map_err(|e| FlowError::Api(format!("GET {} returned invalid json: {}", path, e)))
    }
}

fn mask(value: &str) -> String {
    if value.len() <= 4 {
        return "****".to_string();
    }
    format!("{}****", &value[..4])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn credentials_are_masked_in_logs() {
        assert_eq!(mask("abcdef123456"), "abcd****");
        assert_eq!(mask("ab"), "****");
    }
}
