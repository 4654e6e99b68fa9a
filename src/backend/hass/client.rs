use std::time::Duration;

use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::{Map, Value};
use url::Url;

use crate::config::HassServer;
use crate::error::{ApiError, ApiResult};

#[derive(Clone, Debug, Deserialize)]
pub struct HassState {
    pub entity_id: String,
    pub state: String,
    #[serde(default)]
    pub attributes: Map<String, Value>,
}

pub struct HassClient {
    base_url: Url,
    http: reqwest::Client,
    token: Option<String>,
}

impl HassClient {
    const DEFAULT_TOKEN_ENV: &'static str = "HASS_TOKEN";
    const DEFAULT_TIMEOUT_SECS: u64 = 10;

    pub fn new(server: &HassServer) -> ApiResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(Self::DEFAULT_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            base_url: server.url.clone(),
            http,
            token: None,
        })
    }

    pub fn load_token_from_env(&mut self, server: &HassServer) -> ApiResult<()> {
        let token_env = server
            .token_env
            .as_deref()
            .unwrap_or(Self::DEFAULT_TOKEN_ENV);
        let token = std::env::var(token_env).map_err(|_| {
            ApiError::service_error(format!(
                "[hass] Missing Home Assistant token env var {token_env}"
            ))
        })?;
        if token.trim().is_empty() {
            return Err(ApiError::service_error(format!(
                "[hass] Empty Home Assistant token in env var {token_env}"
            )));
        }
        self.token = Some(token.trim().to_string());
        Ok(())
    }

    fn endpoint_url(&self, endpoint: &str) -> ApiResult<Url> {
        let base = if self.base_url.path().ends_with('/') {
            self.base_url.to_string()
        } else {
            format!("{}/", self.base_url)
        };
        let base = Url::parse(&base)?;
        Ok(base.join(endpoint.trim_start_matches('/'))?)
    }

    fn token(&self) -> ApiResult<&str> {
        self.token.as_deref().ok_or_else(|| {
            ApiError::service_error("[hass] Home Assistant token not initialized".to_string())
        })
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

        let err = if status == StatusCode::UNAUTHORIZED {
            format!("[hass] Home Assistant unauthorized during {action}. Verify HASS_TOKEN")
        } else {
            format!("[hass] Home Assistant error during {action}: {details}")
        };

        Err(ApiError::service_error(err))
    }

    pub async fn get_state(&self, entity_id: &str) -> ApiResult<HassState> {
        let url = self.endpoint_url(&format!("/api/states/{entity_id}"))?;
        let response = self.http.get(url).bearer_auth(self.token()?).send().await?;
        let response = self
            .check_status(response, &format!("GET /api/states/{entity_id}"))
            .await?;
        Ok(response.json().await?)
    }
}

#[cfg(test)]
mod tests {
    use std::num::NonZeroU32;

    use url::Url;

    use crate::backend::hass::client::HassClient;
    use crate::config::HassServer;

    #[test]
    fn endpoint_url_joins_api_path() {
        let server = HassServer {
            url: Url::parse("http://homeassistant.local:8123").unwrap(),
            token_env: None,
            sensor: "sensor.circadian_values".to_string(),
            poll_interval_secs: NonZeroU32::new(15).unwrap(),
        };
        let client = HassClient::new(&server).unwrap();

        let url = client
            .endpoint_url("/api/states/sensor.circadian_values")
            .unwrap();
        assert_eq!(
            url.as_str(),
            "http://homeassistant.local:8123/api/states/sensor.circadian_values"
        );
    }

    #[test]
    fn token_required() {
        let server = HassServer {
            url: Url::parse("http://localhost:8123").unwrap(),
            token_env: Some("CIRCADIAN_HUE_TEST_UNSET_TOKEN".to_string()),
            sensor: "sensor.circadian_values".to_string(),
            poll_interval_secs: NonZeroU32::new(15).unwrap(),
        };
        let mut client = HassClient::new(&server).unwrap();

        assert!(client.token().is_err());
        assert!(client.load_token_from_env(&server).is_err());
    }
}
