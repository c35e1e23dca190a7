//! Endpoint configuration for one weaving service.
//!
//! [`ServiceEndpoints`] holds the paired HTTP and WebSocket base URLs and
//! composes the concrete URLs the upload and progress layers talk to.

/// Paired base URLs for a weaving service.
#[derive(Debug, Clone)]
pub struct ServiceEndpoints {
    api_url: String,
    ws_url: String,
}

impl ServiceEndpoints {
    /// Create endpoints from explicit HTTP and WebSocket base URLs.
    ///
    /// Trailing slashes are trimmed so path composition stays uniform.
    pub fn new(api_url: impl Into<String>, ws_url: impl Into<String>) -> Self {
        Self {
            api_url: api_url.into().trim_end_matches('/').to_string(),
            ws_url: ws_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Derive the WebSocket base URL from the HTTP base URL by swapping
    /// the scheme (`http` -> `ws`, `https` -> `wss`).
    pub fn from_api_url(api_url: impl Into<String>) -> Self {
        let api_url = api_url.into();
        let ws_url = if let Some(rest) = api_url.strip_prefix("https") {
            format!("wss{rest}")
        } else if let Some(rest) = api_url.strip_prefix("http") {
            format!("ws{rest}")
        } else {
            api_url.clone()
        };
        Self::new(api_url, ws_url)
    }

    /// HTTP base URL (e.g. `http://host:8000`).
    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    /// WebSocket base URL (e.g. `ws://host:8000`).
    pub fn ws_url(&self) -> &str {
        &self.ws_url
    }

    /// URL of the multipart upload endpoint.
    pub fn upload_url(&self) -> String {
        format!("{}/api/upload", self.api_url)
    }

    /// URL of the progress-streaming socket endpoint.
    pub fn process_socket_url(&self) -> String {
        format!("{}/ws/process", self.ws_url)
    }

    /// Resolve a service-relative result path into an absolute artifact URL.
    pub fn resolve_result(&self, result_path: &str) -> String {
        format!("{}{}", self.api_url, result_path)
    }
}
