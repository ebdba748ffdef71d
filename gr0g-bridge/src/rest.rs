//! HTTP client for the control daemon's REST surface.
//!
//! Only the fan attribute goes through REST; everything else uses the
//! control socket ([`crate::rpc`]). One request per call, no connection
//! state kept between calls, and every request carries the configured
//! timeout.

use std::time::Duration;

use gr0g_proto::Status;

#[derive(Debug, thiserror::Error)]
pub enum RestError {
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("backend returned {0}")]
    BadStatus(reqwest::StatusCode),
}

#[derive(Debug, Clone)]
pub struct RestClient {
    base: String,
    http: reqwest::Client,
}

impl RestClient {
    pub fn new(base: impl Into<String>, timeout: Duration) -> Result<Self, RestError> {
        let base = base.into().trim_end_matches('/').to_string();
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { base, http })
    }

    /// `GET {base}/status`
    pub async fn status(&self) -> Result<Status, RestError> {
        let response = self.http.get(format!("{}/status", self.base)).send().await?;
        if !response.status().is_success() {
            return Err(RestError::BadStatus(response.status()));
        }
        Ok(response.json().await?)
    }

    /// `POST {base}/status/cmds` with body `{"cmd": <cmd>}`
    pub async fn send_cmd(&self, cmd: &str) -> Result<(), RestError> {
        let response = self
            .http
            .post(format!("{}/status/cmds", self.base))
            .json(&serde_json::json!({ "cmd": cmd }))
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(RestError::BadStatus(response.status()));
        }
        Ok(())
    }
}
