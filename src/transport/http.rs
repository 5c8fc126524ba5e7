//! HTTP transport for management API calls

use super::{Request, Response, Transport, TransportError};
use crate::config::Config;
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use url::Url;

/// Maximum length of response body to log (to avoid logging sensitive data)
const MAX_LOG_BODY_LENGTH: usize = 200;

/// Sanitize response body for logging
/// Truncates long responses and strips non-printable characters
fn sanitize_for_log(body: &str) -> String {
    let truncated = if body.len() > MAX_LOG_BODY_LENGTH {
        let mut end = MAX_LOG_BODY_LENGTH;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}... [truncated, {} bytes total]", &body[..end], body.len())
    } else {
        body.to_string()
    };

    truncated.replace(|c: char| !c.is_ascii_graphic() && c != ' ', "")
}

/// reqwest-backed [`Transport`]
#[derive(Clone)]
pub struct HttpTransport {
    client: Client,
    base_url: Url,
    api_version: Option<String>,
    bearer_token: Option<String>,
}

impl HttpTransport {
    /// Create a new HTTP transport
    pub fn new(config: &Config) -> Result<Self> {
        let client = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(config.request_timeout)
            .build()
            .context("Failed to create HTTP client")?;

        let base_url = Url::parse(&config.base_url)
            .with_context(|| format!("Invalid base URL {:?}", config.base_url))?;

        Ok(Self {
            client,
            base_url,
            api_version: config.api_version.clone(),
            bearer_token: config.bearer_token.clone(),
        })
    }

    /// Absolute URL for a request, with the default `api-version` applied
    fn url_for(&self, request: &Request) -> Result<Url, TransportError> {
        let mut url = if request.path.starts_with("http://") || request.path.starts_with("https://") {
            Url::parse(&request.path)
        } else {
            self.base_url.join(&request.path)
        }
        .map_err(|e| TransportError::InvalidUrl {
            url: request.path.clone(),
            reason: e.to_string(),
        })?;

        let has_api_version = url.query_pairs().any(|(k, _)| k == "api-version")
            || request.query.iter().any(|(k, _)| k == "api-version");

        {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in &request.query {
                pairs.append_pair(key, value);
            }
            if let (false, Some(version)) = (has_api_version, &self.api_version) {
                pairs.append_pair("api-version", version);
            }
        }

        // query_pairs_mut leaves a dangling '?' when nothing was appended
        if url.query() == Some("") {
            url.set_query(None);
        }

        Ok(url)
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: Request) -> Result<Response, TransportError> {
        let url = self.url_for(&request)?;
        tracing::debug!("{} {}", request.method, url);

        let mut builder = self.client.request(request.method.clone(), url);
        if let Some(token) = &self.bearer_token {
            builder = builder.bearer_auth(token);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await.map_err(TransportError::connection)?;
        read_response(response).await
    }
}

async fn read_response(response: reqwest::Response) -> Result<Response, TransportError> {
    let status = response.status();
    let headers = response.headers().clone();
    let body = response
        .bytes()
        .await
        .map_err(TransportError::connection)?
        .to_vec();

    if !status.is_success() {
        // Only log sanitized/truncated error body to avoid leaking sensitive data
        tracing::warn!(
            "API error: {} - {}",
            status,
            sanitize_for_log(&String::from_utf8_lossy(&body))
        );
    }

    Ok(Response {
        status,
        headers,
        body,
    })
}

/// [`Transport`] for reachability probes against data-plane endpoints.
///
/// Requests go out as given: no credentials, no `api-version`, and only
/// absolute URLs are accepted.
#[derive(Clone)]
pub struct ProbeTransport {
    client: Client,
}

impl ProbeTransport {
    pub fn new(config: &Config) -> Result<Self> {
        let client = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(config.request_timeout)
            .build()
            .context("Failed to create HTTP client")?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Transport for ProbeTransport {
    async fn send(&self, request: Request) -> Result<Response, TransportError> {
        let url = Url::parse(&request.path).map_err(|e| TransportError::InvalidUrl {
            url: request.path.clone(),
            reason: e.to_string(),
        })?;
        tracing::debug!("probe {} {}", request.method, url);

        let response = self
            .client
            .request(request.method, url)
            .send()
            .await
            .map_err(TransportError::connection)?;
        read_response(response).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transport(api_version: Option<&str>) -> HttpTransport {
        let config = Config {
            base_url: "https://management.example.test/".to_string(),
            api_version: api_version.map(str::to_string),
            ..Default::default()
        };
        HttpTransport::new(&config).unwrap()
    }

    #[test]
    fn test_relative_path_joins_base_and_adds_api_version() {
        let t = transport(Some("2023-02-01"));
        let url = t.url_for(&Request::get("/subscriptions/s")).unwrap();
        assert_eq!(
            url.as_str(),
            "https://management.example.test/subscriptions/s?api-version=2023-02-01"
        );
    }

    #[test]
    fn test_absolute_polling_url_keeps_its_api_version() {
        let t = transport(Some("2023-02-01"));
        let request = Request::get("https://poll.example.test/operations/1?api-version=2020-01-01");
        let url = t.url_for(&request).unwrap();
        assert_eq!(
            url.as_str(),
            "https://poll.example.test/operations/1?api-version=2020-01-01"
        );
    }

    #[test]
    fn test_no_query_without_api_version() {
        let t = transport(None);
        let url = t.url_for(&Request::get("/subscriptions/s")).unwrap();
        assert_eq!(url.as_str(), "https://management.example.test/subscriptions/s");
    }

    #[tokio::test]
    async fn test_probe_rejects_relative_paths() {
        let probe = ProbeTransport::new(&Config::default()).unwrap();
        let err = probe.send(Request::get("/subscriptions/s")).await.unwrap_err();
        assert!(matches!(err, TransportError::InvalidUrl { .. }));
    }

    #[test]
    fn test_sanitize_truncates() {
        let long = "x".repeat(500);
        let sanitized = sanitize_for_log(&long);
        assert!(sanitized.contains("[truncated, 500 bytes total]"));
        assert_eq!(sanitize_for_log("a\nb"), "ab");
    }
}
