//! HTTP client for collaborator services

use reqwest::{
    header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE},
    Client, Response,
};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info};

use super::{
    errors::{NetError, NetResult},
    retry::{retry_with_backoff, RetryOptions},
};
use crate::session::Session;

/// Connection settings for [`ApiClient`]
#[derive(Debug, Clone)]
pub struct ApiClientOptions {
    pub base_url: String,
    pub api_token: Option<String>,
    pub timeout_seconds: u64,
    pub retry: RetryOptions,
    pub user_agent: String,
}

impl Default for ApiClientOptions {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080/api".to_string(),
            api_token: None,
            timeout_seconds: 30,
            retry: RetryOptions::default(),
            user_agent: format!("convo/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// User feedback about a conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Feedback {
    #[serde(rename = "sessionId", skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rating: Option<u8>,
    pub comment: String,
}

/// A public link to a shared session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShareLink {
    pub url: String,
}

#[derive(Serialize)]
struct ShareRequest<'a> {
    session: &'a Session,
}

/// Client for feedback, sharing and settings endpoints
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: Client,
    options: ApiClientOptions,
}

impl ApiClient {
    pub fn new(options: ApiClientOptions) -> NetResult<Self> {
        if !options.base_url.starts_with("http://") && !options.base_url.starts_with("https://") {
            return Err(NetError::ConfigError(format!(
                "Base URL must use http or https: {}",
                options.base_url
            )));
        }

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        if let Some(token) = &options.api_token {
            let auth_value = HeaderValue::from_str(&format!("Bearer {}", token))
                .map_err(|e| NetError::ConfigError(format!("Invalid API token: {}", e)))?;
            headers.insert(AUTHORIZATION, auth_value);
        }

        let client = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(options.timeout_seconds))
            .user_agent(&options.user_agent)
            .build()
            .map_err(|e| NetError::ConfigError(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client, options })
    }

    pub fn options(&self) -> &ApiClientOptions {
        &self.options
    }

    fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.options.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    /// Send feedback once
    pub async fn submit_feedback(&self, feedback: &Feedback) -> NetResult<()> {
        debug!("Submitting feedback");
        let response = self
            .client
            .post(self.endpoint("feedback"))
            .json(feedback)
            .send()
            .await?;

        ensure_success(response).await?;
        Ok(())
    }

    /// Create a share link for a session once
    pub async fn create_share_link(&self, session: &Session) -> NetResult<ShareLink> {
        debug!("Creating share link for session {}", session.id);
        let response = self
            .client
            .post(self.endpoint("share"))
            .json(&ShareRequest { session })
            .send()
            .await?;

        let response = ensure_success(response).await?;
        let body = response.text().await?;
        let link: ShareLink = serde_json::from_str(&body)?;

        if link.url.trim().is_empty() {
            return Err(NetError::InvalidResponse("share link is empty".to_string()));
        }

        info!("Created share link for session {}", session.id);
        Ok(link)
    }

    /// Save user settings once
    pub async fn save_settings(&self, settings: &serde_json::Value) -> NetResult<()> {
        debug!("Saving settings");
        let response = self
            .client
            .put(self.endpoint("settings"))
            .json(settings)
            .send()
            .await?;

        ensure_success(response).await?;
        Ok(())
    }

    pub async fn submit_feedback_with_retry(&self, feedback: &Feedback) -> NetResult<()> {
        retry_with_backoff(move || self.submit_feedback(feedback), self.options.retry).await
    }

    pub async fn create_share_link_with_retry(&self, session: &Session) -> NetResult<ShareLink> {
        retry_with_backoff(move || self.create_share_link(session), self.options.retry).await
    }

    pub async fn save_settings_with_retry(&self, settings: &serde_json::Value) -> NetResult<()> {
        retry_with_backoff(move || self.save_settings(settings), self.options.retry).await
    }
}

/// Turn a non-success status into an error carrying the server's message
async fn ensure_success(response: Response) -> NetResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let message = extract_error_message(response).await;
    Err(NetError::Status {
        status: status.as_u16(),
        message,
    })
}

/// Extract an error message from a failed response body
async fn extract_error_message(response: Response) -> String {
    let status = response.status();
    match response.text().await {
        Ok(text) if text.trim().is_empty() => status
            .canonical_reason()
            .unwrap_or("Unknown error")
            .to_string(),
        Ok(text) => {
            if let Ok(json) = serde_json::from_str::<serde_json::Value>(&text) {
                let message = json
                    .get("error")
                    .and_then(|e| e.get("message").or(Some(e)))
                    .or_else(|| json.get("message"))
                    .and_then(|m| m.as_str());
                if let Some(message) = message {
                    return message.to_string();
                }
            }
            text
        }
        Err(_) => "Failed to read error response".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};
    use tokio::{
        io::{AsyncReadExt, AsyncWriteExt},
        net::TcpListener,
        task::JoinHandle,
    };

    /// Serve one scripted response per connection, recording request heads
    async fn scripted_server(responses: Vec<String>) -> (String, Arc<Mutex<Vec<String>>>, JoinHandle<()>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let requests = Arc::new(Mutex::new(Vec::new()));
        let seen = requests.clone();

        let handle = tokio::spawn(async move {
            for response in responses {
                let (mut socket, _) = listener.accept().await.unwrap();
                let head = read_request(&mut socket).await;
                seen.lock().unwrap().push(head);
                socket.write_all(response.as_bytes()).await.unwrap();
                socket.shutdown().await.unwrap();
            }
        });

        (format!("http://{}", addr), requests, handle)
    }

    async fn read_request(socket: &mut tokio::net::TcpStream) -> String {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 1024];

        loop {
            let n = socket.read(&mut chunk).await.unwrap();
            if n == 0 {
                break;
            }
            buf.extend_from_slice(&chunk[..n]);

            let text = String::from_utf8_lossy(&buf).to_string();
            if let Some(end) = text.find("\r\n\r\n") {
                let head = &text[..end];
                let content_length = head
                    .lines()
                    .filter_map(|line| line.split_once(':'))
                    .find(|(name, _)| name.trim().eq_ignore_ascii_case("content-length"))
                    .and_then(|(_, value)| value.trim().parse::<usize>().ok())
                    .unwrap_or(0);
                if buf.len() >= end + 4 + content_length {
                    return head.to_string();
                }
            }
        }

        String::from_utf8_lossy(&buf).to_string()
    }

    fn http_response(status: &str, body: &str) -> String {
        format!(
            "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            status,
            body.len(),
            body
        )
    }

    fn client_for(base_url: String, retry: RetryOptions) -> ApiClient {
        ApiClient::new(ApiClientOptions {
            base_url,
            api_token: Some("secret".to_string()),
            timeout_seconds: 5,
            retry,
            ..Default::default()
        })
        .unwrap()
    }

    fn feedback() -> Feedback {
        Feedback {
            session_id: Some("s-1".to_string()),
            rating: Some(5),
            comment: "helpful".to_string(),
        }
    }

    #[test]
    fn test_rejects_non_http_base_url() {
        let result = ApiClient::new(ApiClientOptions {
            base_url: "ftp://example.com".to_string(),
            ..Default::default()
        });
        assert!(matches!(result, Err(NetError::ConfigError(_))));
    }

    #[test]
    fn test_endpoint_joining() {
        let client = client_for("http://localhost:9/api/".to_string(), RetryOptions::default());
        assert_eq!(client.endpoint("/share"), "http://localhost:9/api/share");
        assert_eq!(client.endpoint("feedback"), "http://localhost:9/api/feedback");
    }

    #[tokio::test]
    async fn test_feedback_retries_transient_failures() {
        let (base_url, requests, server) = scripted_server(vec![
            http_response("503 Service Unavailable", ""),
            http_response("502 Bad Gateway", ""),
            http_response("204 No Content", ""),
        ])
        .await;

        let client = client_for(base_url, RetryOptions::new(2, 1));
        client.submit_feedback_with_retry(&feedback()).await.unwrap();
        server.await.unwrap();

        let requests = requests.lock().unwrap();
        assert_eq!(requests.len(), 3);
        assert!(requests[0].starts_with("POST /feedback"));
        assert!(requests[0].to_lowercase().contains("authorization: bearer secret"));
    }

    #[tokio::test]
    async fn test_status_failure_surfaces_after_retries() {
        let (base_url, requests, server) = scripted_server(vec![
            http_response("500 Internal Server Error", r#"{"error":{"message":"boom 1"}}"#),
            http_response("500 Internal Server Error", r#"{"error":{"message":"boom 2"}}"#),
        ])
        .await;

        let client = client_for(base_url, RetryOptions::new(1, 1));
        let error = client
            .save_settings_with_retry(&serde_json::json!({"theme": "dark"}))
            .await
            .unwrap_err();
        server.await.unwrap();

        match error {
            NetError::Status { status, message } => {
                assert_eq!(status, 500);
                assert_eq!(message, "boom 2");
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(requests.lock().unwrap()[0].starts_with("PUT /settings"));
    }

    #[tokio::test]
    async fn test_share_link_parsed() {
        let (base_url, _requests, server) = scripted_server(vec![http_response(
            "200 OK",
            r#"{"url":"https://chat.example/s/abc"}"#,
        )])
        .await;

        let client = client_for(base_url, RetryOptions::new(0, 1));
        let session = Session::new("Shared");
        let link = client.create_share_link(&session).await.unwrap();
        server.await.unwrap();

        assert_eq!(link.url, "https://chat.example/s/abc");
    }
}
