use crate::error::Result;
use crate::result::{Candidate, ProbeResult, ProbeStatus};
use async_trait::async_trait;
use reqwest::{Client, Method};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::debug;

pub const DEFAULT_USER_AGENT: &str = "Hollow/0.1 (https://github.com/trapdoorsec/hollow)";

/// Request method used for existence checks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ProbeMethod {
    /// HEAD, retried once as GET when the server rejects HEAD
    #[default]
    Head,
    /// GET whose body is never read
    Get,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("timeout")]
    Timeout,

    #[error("connection failed: {0}")]
    Connect(String),

    #[error("request failed: {0}")]
    Request(String),
}

/// The HTTP round-trip behind a probe. Implementations return the response
/// status code and must not read the response body.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn status(&self, method: ProbeMethod, url: &str) -> std::result::Result<u16, TransportError>;
}

/// reqwest backed transport
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    pub fn new(timeout: Duration) -> Result<Self> {
        Self::with_redirects(timeout, 0)
    }

    /// Build a transport that follows at most `max_redirects` redirects.
    /// With zero, 3xx responses are reported as-is.
    pub fn with_redirects(timeout: Duration, max_redirects: usize) -> Result<Self> {
        let redirect = if max_redirects == 0 {
            reqwest::redirect::Policy::none()
        } else {
            reqwest::redirect::Policy::limited(max_redirects)
        };

        let client = Client::builder()
            .user_agent(DEFAULT_USER_AGENT)
            .timeout(timeout)
            .connect_timeout(timeout)
            .pool_max_idle_per_host(50)
            .pool_idle_timeout(Duration::from_secs(90))
            .tcp_keepalive(Duration::from_secs(60))
            .redirect(redirect)
            .build()?;

        Ok(Self { client })
    }

    pub fn from_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn status(&self, method: ProbeMethod, url: &str) -> std::result::Result<u16, TransportError> {
        let method = match method {
            ProbeMethod::Head => Method::HEAD,
            ProbeMethod::Get => Method::GET,
        };

        // The response is dropped unread, so GET bodies are never transferred past the headers
        let response = self
            .client
            .request(method, url)
            .send()
            .await
            .map_err(map_reqwest_error)?;

        Ok(response.status().as_u16())
    }
}

fn map_reqwest_error(e: reqwest::Error) -> TransportError {
    if e.is_timeout() {
        TransportError::Timeout
    } else if e.is_connect() {
        let detail = std::error::Error::source(&e)
            .map(|source| source.to_string())
            .unwrap_or_else(|| e.to_string());
        TransportError::Connect(detail)
    } else {
        TransportError::Request(e.to_string())
    }
}

/// Maps status codes onto probe outcomes.
///
/// Existence is inferred from "not a 404": 2xx, 3xx and every other 4xx
/// count as found. Codes in `ignore` are always treated as not found.
#[derive(Debug, Clone, Default)]
pub struct Classifier {
    ignore: HashSet<u16>,
}

impl Classifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_ignored<I: IntoIterator<Item = u16>>(ignore: I) -> Self {
        Self {
            ignore: ignore.into_iter().collect(),
        }
    }

    pub fn classify(&self, status_code: u16) -> ProbeStatus {
        if self.ignore.contains(&status_code) {
            return ProbeStatus::NotFound;
        }

        match status_code {
            404 => ProbeStatus::NotFound,
            200..=499 => ProbeStatus::Found,
            _ => ProbeStatus::NotFound,
        }
    }
}

fn rejects_head(status_code: u16) -> bool {
    status_code == 405 || status_code == 501
}

/// Performs single existence checks
pub struct Prober {
    transport: Arc<dyn Transport>,
    timeout: Duration,
    method: ProbeMethod,
    classifier: Classifier,
}

impl Prober {
    pub fn new(transport: Arc<dyn Transport>, timeout: Duration) -> Self {
        Self {
            transport,
            timeout,
            method: ProbeMethod::Head,
            classifier: Classifier::new(),
        }
    }

    pub fn with_method(mut self, method: ProbeMethod) -> Self {
        self.method = method;
        self
    }

    pub fn with_classifier(mut self, classifier: Classifier) -> Self {
        self.classifier = classifier;
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Probe `url` once. Failures come back as `ProbeStatus::Error` results.
    pub async fn probe(&self, candidate: Candidate, url: String, cancel: &CancellationToken) -> ProbeResult {
        let start = Instant::now();

        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                debug!("Abandoned in-flight probe of {}", url);
                return ProbeResult::with_error(candidate, url, "cancelled", start.elapsed());
            }
            outcome = tokio::time::timeout(self.timeout, self.check(&url)) => outcome,
        };
        let elapsed = start.elapsed();

        match outcome {
            Ok(Ok(status_code)) => {
                let status = self.classifier.classify(status_code);
                debug!("{} -> {} ({})", url, status_code, status);
                ProbeResult::with_status(candidate, url, status, status_code, elapsed)
            }
            Ok(Err(e)) => {
                debug!("{} -> {}", url, e);
                ProbeResult::with_error(candidate, url, e.to_string(), elapsed)
            }
            Err(_) => {
                debug!("{} -> timeout after {:?}", url, self.timeout);
                ProbeResult::with_error(candidate, url, TransportError::Timeout.to_string(), elapsed)
            }
        }
    }

    async fn check(&self, url: &str) -> std::result::Result<u16, TransportError> {
        let status_code = self.transport.status(self.method, url).await?;

        if self.method == ProbeMethod::Head && rejects_head(status_code) {
            debug!("{} rejected HEAD with {}, retrying with GET", url, status_code);
            return self.transport.status(ProbeMethod::Get, url).await;
        }

        Ok(status_code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::TcpListener;
    use wiremock::{
        Mock, MockServer, ResponseTemplate,
        matchers::{method, path},
    };

    fn prober(timeout: Duration) -> Prober {
        let transport = ReqwestTransport::new(timeout).unwrap();
        Prober::new(Arc::new(transport), timeout)
    }

    async fn probe_path(prober: &Prober, server: &MockServer, word: &str) -> ProbeResult {
        let url = format!("{}/{}", server.uri(), word);
        prober
            .probe(Candidate::new(0, word), url, &CancellationToken::new())
            .await
    }

    #[test]
    fn test_classification_policy() {
        let classifier = Classifier::new();

        assert_eq!(classifier.classify(404), ProbeStatus::NotFound);
        for code in [200, 204, 301, 302, 307, 401, 403, 405, 429] {
            assert_eq!(classifier.classify(code), ProbeStatus::Found, "status {}", code);
        }
        for code in [100, 500, 502, 503] {
            assert_eq!(classifier.classify(code), ProbeStatus::NotFound, "status {}", code);
        }
    }

    #[test]
    fn test_ignored_codes_are_not_found() {
        let classifier = Classifier::with_ignored([403, 200]);

        assert_eq!(classifier.classify(403), ProbeStatus::NotFound);
        assert_eq!(classifier.classify(200), ProbeStatus::NotFound);
        assert_eq!(classifier.classify(401), ProbeStatus::Found);
    }

    #[tokio::test]
    async fn test_head_probe_classifies_statuses() {
        let server = MockServer::start().await;

        for (route, code) in [("/admin", 200), ("/old", 301), ("/private", 403)] {
            Mock::given(method("HEAD"))
                .and(path(route))
                .respond_with(ResponseTemplate::new(code))
                .expect(1)
                .mount(&server)
                .await;
        }

        let prober = prober(Duration::from_secs(5));

        let admin = probe_path(&prober, &server, "admin").await;
        assert_eq!(admin.status, ProbeStatus::Found);
        assert_eq!(admin.status_code, Some(200));

        let old = probe_path(&prober, &server, "old").await;
        assert_eq!(old.status, ProbeStatus::Found);
        assert_eq!(old.status_code, Some(301));

        let private = probe_path(&prober, &server, "private").await;
        assert_eq!(private.status, ProbeStatus::Found);
        assert_eq!(private.status_code, Some(403));

        // wiremock answers unmatched requests with 404
        let missing = probe_path(&prober, &server, "missing").await;
        assert_eq!(missing.status, ProbeStatus::NotFound);
        assert_eq!(missing.status_code, Some(404));
        assert!(missing.error.is_none());
    }

    #[tokio::test]
    async fn test_head_rejection_falls_back_to_get() {
        let server = MockServer::start().await;

        Mock::given(method("HEAD"))
            .and(path("/upload"))
            .respond_with(ResponseTemplate::new(405))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/upload"))
            .respond_with(ResponseTemplate::new(200).set_body_string("a body nobody reads"))
            .expect(1)
            .mount(&server)
            .await;

        let result = probe_path(&prober(Duration::from_secs(5)), &server, "upload").await;

        assert_eq!(result.status, ProbeStatus::Found);
        assert_eq!(result.status_code, Some(200));
    }

    #[tokio::test]
    async fn test_get_method_skips_head() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/files"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("HEAD"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let prober = prober(Duration::from_secs(5)).with_method(ProbeMethod::Get);
        let result = probe_path(&prober, &server, "files").await;

        assert_eq!(result.status, ProbeStatus::Found);
    }

    #[tokio::test]
    async fn test_slow_server_is_a_timeout_error() {
        let server = MockServer::start().await;

        Mock::given(method("HEAD"))
            .and(path("/slow"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(3)))
            .mount(&server)
            .await;

        let result = probe_path(&prober(Duration::from_millis(200)), &server, "slow").await;

        assert_eq!(result.status, ProbeStatus::Error);
        assert_eq!(result.error.as_deref(), Some("timeout"));
        assert_eq!(result.status_code, None);
        assert!(result.elapsed < Duration::from_secs(3));
    }

    #[tokio::test]
    async fn test_refused_connection_is_an_error() {
        // Grab a free port and release it so nothing is listening there
        let port = {
            let listener = TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };

        let prober = prober(Duration::from_secs(5));
        let result = prober
            .probe(
                Candidate::new(0, "admin"),
                format!("http://127.0.0.1:{}/admin", port),
                &CancellationToken::new(),
            )
            .await;

        assert_eq!(result.status, ProbeStatus::Error);
        let detail = result.error.unwrap();
        assert_ne!(detail, "timeout");
        assert!(!detail.is_empty());
    }

    #[tokio::test]
    async fn test_cancel_abandons_in_flight_probe() {
        let server = MockServer::start().await;

        Mock::given(method("HEAD"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(10)))
            .mount(&server)
            .await;

        let prober = prober(Duration::from_secs(30));
        let cancel = CancellationToken::new();
        let url = format!("{}/hang", server.uri());

        let canceller = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            canceller.cancel();
        });

        let result = prober.probe(Candidate::new(0, "hang"), url, &cancel).await;

        assert_eq!(result.status, ProbeStatus::Error);
        assert_eq!(result.error.as_deref(), Some("cancelled"));
        assert!(result.elapsed < Duration::from_secs(10));
    }
}
