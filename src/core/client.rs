//! Daemon control client - Fire-and-forget pause/resume over HTTP

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::error::ControlError;
use super::guard::{Command, PauseReason};

/// Body of `POST /pause`
#[derive(Debug, Clone, Serialize)]
pub struct PauseRequest<'a> {
    pub reason: &'a PauseReason,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finish_current_job: Option<bool>,
}

/// Daemon resource metrics reported by `GET /status`
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct DaemonMetrics {
    #[serde(default)]
    pub cpu: Option<f64>,
    #[serde(default)]
    pub ram: Option<f64>,
}

/// Response of `GET /status`, for display only
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct DaemonStatus {
    pub daemon_state: String,
    #[serde(default)]
    pub pause_reason: Option<String>,
    #[serde(default)]
    pub desired_state: Option<String>,
    #[serde(default)]
    pub metrics: Option<DaemonMetrics>,
    #[serde(default)]
    pub stall_seconds: Option<f64>,
}

/// Sends commands to the daemon. Calls never fail from the caller's view.
#[async_trait]
pub trait ControlClient: Send + Sync {
    async fn send_pause(&self, reason: &PauseReason);

    async fn send_resume(&self);

    async fn dispatch(&self, command: &Command) {
        match command {
            Command::Pause { reason } => self.send_pause(reason).await,
            Command::Resume => self.send_resume().await,
        }
    }
}

/// HTTP implementation against the daemon's local control API
pub struct HttpControlClient {
    client: reqwest::Client,
    base_url: String,
    finish_current_job: Option<bool>,
}

impl HttpControlClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ControlError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(ControlError::Client)?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            finish_current_job: None,
        })
    }

    /// Forward `finish_current_job` with every pause request
    pub fn with_finish_current_job(mut self, finish: Option<bool>) -> Self {
        self.finish_current_job = finish;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// `POST /pause`, reporting the outcome
    pub async fn try_pause(&self, reason: &PauseReason) -> Result<(), ControlError> {
        let url = self.url("/pause");
        let body = PauseRequest {
            reason,
            finish_current_job: self.finish_current_job,
        };
        let resp = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| ControlError::from_transport(&url, e))?;
        check_status(&url, resp.status())
    }

    /// `POST /resume`, reporting the outcome
    pub async fn try_resume(&self) -> Result<(), ControlError> {
        let url = self.url("/resume");
        let resp = self
            .client
            .post(&url)
            .send()
            .await
            .map_err(|e| ControlError::from_transport(&url, e))?;
        check_status(&url, resp.status())
    }

    /// `GET /status` for the status window and tray tooltip
    pub async fn fetch_status(&self) -> Result<DaemonStatus, ControlError> {
        let url = self.url("/status");
        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| ControlError::from_transport(&url, e))?;
        check_status(&url, resp.status())?;
        resp.json::<DaemonStatus>()
            .await
            .map_err(|e| ControlError::Body { url, source: e })
    }
}

fn check_status(url: &str, status: reqwest::StatusCode) -> Result<(), ControlError> {
    if status.is_success() {
        Ok(())
    } else {
        Err(ControlError::Status {
            url: url.to_string(),
            status: status.as_u16(),
        })
    }
}

/// Connection refused is the normal state while the daemon is down, so it
/// only rates a debug line
fn log_dropped(command: &str, err: &ControlError) {
    match err {
        ControlError::Unreachable { .. } => debug!("{} not delivered: {}", command, err),
        _ => warn!("{} not delivered: {}", command, err),
    }
}

#[async_trait]
impl ControlClient for HttpControlClient {
    async fn send_pause(&self, reason: &PauseReason) {
        match self.try_pause(reason).await {
            Ok(()) => debug!("Pause ({}) delivered to {}", reason, self.base_url),
            Err(e) => log_dropped("Pause", &e),
        }
    }

    async fn send_resume(&self) {
        match self.try_resume().await {
            Ok(()) => debug!("Resume delivered to {}", self.base_url),
            Err(e) => log_dropped("Resume", &e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    fn client_for(server: &mockito::ServerGuard) -> HttpControlClient {
        HttpControlClient::new(&server.url(), Duration::from_secs(2)).unwrap()
    }

    #[test]
    fn base_url_trailing_slash_trimmed() {
        let client =
            HttpControlClient::new("http://127.0.0.1:8000/", Duration::from_secs(3)).unwrap();
        assert_eq!(client.base_url(), "http://127.0.0.1:8000");
    }

    #[test]
    fn pause_body_omits_unset_fields() {
        let body = PauseRequest {
            reason: &PauseReason::Automatic,
            finish_current_job: None,
        };
        assert_eq!(
            serde_json::to_string(&body).unwrap(),
            r#"{"reason":"AUTOMATIC"}"#
        );
    }

    #[tokio::test]
    async fn pause_posts_reason() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/pause")
            .match_body(Matcher::Json(serde_json::json!({"reason": "MANUAL"})))
            .with_status(200)
            .with_body(r#"{"status":"OK"}"#)
            .expect(1)
            .create_async()
            .await;

        let client = client_for(&server);
        assert!(client.try_pause(&PauseReason::Manual).await.is_ok());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn pause_forwards_finish_current_job() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/pause")
            .match_body(Matcher::Json(serde_json::json!({
                "reason": "AUTOMATIC",
                "finish_current_job": false
            })))
            .with_status(200)
            .create_async()
            .await;

        let client = client_for(&server).with_finish_current_job(Some(false));
        client.send_pause(&PauseReason::Automatic).await;
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn resume_posts_without_body() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/resume")
            .match_body(Matcher::Exact(String::new()))
            .with_status(200)
            .create_async()
            .await;

        let client = client_for(&server);
        client.dispatch(&Command::Resume).await;
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn error_status_is_reported_by_try_and_swallowed_by_send() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/resume")
            .with_status(503)
            .expect(2)
            .create_async()
            .await;

        let client = client_for(&server);
        match client.try_resume().await {
            Err(ControlError::Status { status, .. }) => assert_eq!(status, 503),
            other => panic!("unexpected result: {:?}", other),
        }
        // No retry, no panic
        client.send_resume().await;
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn unreachable_daemon_is_swallowed() {
        // Port 9 (discard) is not expected to have an HTTP listener
        let client =
            HttpControlClient::new("http://127.0.0.1:9", Duration::from_secs(1)).unwrap();
        assert!(client.try_pause(&PauseReason::Automatic).await.is_err());
        client.send_pause(&PauseReason::Automatic).await;
        client.send_resume().await;
    }

    #[tokio::test]
    async fn status_parses_partial_payload() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/status")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"daemon_state":"PAUSED","metrics":{"cpu":12.5}}"#)
            .create_async()
            .await;

        let status = client_for(&server).fetch_status().await.unwrap();
        assert_eq!(status.daemon_state, "PAUSED");
        assert_eq!(
            status.metrics,
            Some(DaemonMetrics {
                cpu: Some(12.5),
                ram: None
            })
        );
        assert_eq!(status.pause_reason, None);
    }
}
