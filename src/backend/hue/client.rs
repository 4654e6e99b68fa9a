use std::time::Duration;

use reqwest::{Method, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use url::Url;

use hue::legacy_api::{check_update_reply, parse_reply};

use crate::config::BridgeServer;
use crate::error::{ApiError, ApiResult};

/// Minimal client for the legacy (v1) Hue bridge api, rooted at
/// `<url>/api/<username>/`.
pub struct HueClient {
    bridge_name: String,
    base_url: Url,
    username: String,
    http: reqwest::Client,
}

impl HueClient {
    pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

    pub fn new(bridge_name: &str, server: &BridgeServer, username: String) -> ApiResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(Self::DEFAULT_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            bridge_name: bridge_name.to_string(),
            base_url: server.url.clone(),
            username,
            http,
        })
    }

    fn endpoint_url(&self, path: &str) -> ApiResult<Url> {
        let base = if self.base_url.path().ends_with('/') {
            self.base_url.to_string()
        } else {
            format!("{}/", self.base_url)
        };
        let base = Url::parse(&base)?;
        let path = path.trim_start_matches('/');
        Ok(base.join(&format!("api/{}/{path}", self.username))?)
    }

    async fn check_status(
        &self,
        response: reqwest::Response,
        action: &str,
    ) -> ApiResult<reqwest::Response> {
        if response.status().is_success() {
            return Ok(response);
        }

        let status = response.status();
        let body = response.text().await.unwrap_or_else(|_| String::new());

        let details = if body.is_empty() {
            format!("{status}")
        } else {
            format!("{status}: {body}")
        };

        let err = if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            format!(
                "[{}] Hue bridge refused {}. Verify bridge username",
                self.bridge_name, action
            )
        } else {
            format!(
                "[{}] Hue bridge error during {}: {}",
                self.bridge_name, action, details
            )
        };

        Err(ApiError::service_error(err))
    }

    /// Issue a raw request against the bridge, returning the decoded json
    /// reply.
    pub async fn request(
        &self,
        method: Method,
        path: &str,
        json: Option<&Value>,
    ) -> ApiResult<Value> {
        let url = self.endpoint_url(path)?;
        let action = format!("{method} /{}", path.trim_start_matches('/'));

        let mut req = self.http.request(method, url);
        if let Some(body) = json {
            req = req.json(body);
        }

        let response = req.send().await?;
        let response = self.check_status(response, &action).await?;
        Ok(response.json().await?)
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> ApiResult<T> {
        let value = self.request(Method::GET, path, None).await?;
        Ok(parse_reply(value)?)
    }

    pub async fn put<T: Serialize + Sync>(&self, path: &str, body: &T) -> ApiResult<()> {
        let body = serde_json::to_value(body)?;
        let value = self.request(Method::PUT, path, Some(&body)).await?;
        Ok(check_update_reply(&value)?)
    }
}
