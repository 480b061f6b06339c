//! reqwest-backed request client.
//!
//! Each POST runs as its own tokio task and reports back through an
//! unbounded channel of [`Completion`]s. The owner of the transport pulls
//! from that channel and feeds every completion into
//! [`HttpConnection::handle_completion`](crate::transport::HttpConnection::handle_completion),
//! which keeps all transport state on a single task.

use std::collections::HashMap;
use std::error::Error as StdError;
use std::io;
use std::time::Duration;

use reqwest::header::{CONTENT_LENGTH, CONTENT_TYPE};
use thiserror::Error;
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, trace, warn};

use crate::core::{
    Completion, FailureKind, HttpRequest, ProxyConfig, RequestClient, RequestFailure, RequestId,
};

/// Receiving end of the completion channel.
pub type Completions = mpsc::UnboundedReceiver<Completion>;

/// Errors building an [`HttpClient`].
#[derive(Debug, Error)]
pub enum ClientError {
    /// Not called from within a tokio runtime.
    #[error("no tokio runtime: {0}")]
    NoRuntime(#[from] tokio::runtime::TryCurrentError),

    /// Proxy URL rejected.
    #[error("invalid proxy {url}: {source}")]
    InvalidProxy {
        /// Proxy URL without credentials.
        url: String,
        /// Underlying error.
        source: reqwest::Error,
    },

    /// reqwest could not build the client.
    #[error("failed to build http client: {0}")]
    Build(#[from] reqwest::Error),
}

/// Client configuration.
#[derive(Debug, Clone, Default)]
pub struct HttpClientConfig {
    /// Total time allowed for one round trip. `None` waits forever.
    pub timeout: Option<Duration>,
    /// Time allowed to establish the TCP connection.
    pub connect_timeout: Option<Duration>,
    /// `User-Agent` header, reqwest's default when `None`.
    pub user_agent: Option<String>,
    /// Proxy for every request.
    pub proxy: Option<ProxyConfig>,
}

/// Builder for an [`HttpClient`].
#[derive(Debug, Clone, Default)]
pub struct HttpClientBuilder {
    config: HttpClientConfig,
}

impl HttpClientBuilder {
    /// Create a builder with default options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the per-request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = Some(timeout);
        self
    }

    /// Set the TCP connect timeout.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.config.connect_timeout = Some(timeout);
        self
    }

    /// Set the `User-Agent` header.
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.config.user_agent = Some(user_agent.into());
        self
    }

    /// Route requests through a proxy.
    pub fn proxy(mut self, proxy: ProxyConfig) -> Self {
        self.config.proxy = Some(proxy);
        self
    }

    /// Build the client on the current tokio runtime.
    pub fn build(self) -> Result<(HttpClient, Completions), ClientError> {
        let runtime = Handle::try_current()?;
        let inner = build_inner(&self.config)?;
        let (completions, completions_rx) = mpsc::unbounded_channel();

        let client = HttpClient {
            inner,
            config: self.config,
            runtime,
            next_id: 0,
            tasks: HashMap::new(),
            completions: Some(completions),
        };
        Ok((client, completions_rx))
    }
}

/// [`RequestClient`] executing POSTs with reqwest on a tokio runtime.
#[derive(Debug)]
pub struct HttpClient {
    inner: reqwest::Client,
    config: HttpClientConfig,
    runtime: Handle,
    next_id: u64,
    /// Tasks that may still be running.
    tasks: HashMap<RequestId, JoinHandle<()>>,
    /// `None` once detached.
    completions: Option<mpsc::UnboundedSender<Completion>>,
}

impl HttpClient {
    /// Start building a client.
    pub fn builder() -> HttpClientBuilder {
        HttpClientBuilder::new()
    }

    /// Current configuration.
    pub fn config(&self) -> &HttpClientConfig {
        &self.config
    }

    /// Number of request tasks not yet reaped.
    pub fn in_flight(&self) -> usize {
        self.tasks.values().filter(|task| !task.is_finished()).count()
    }
}

impl RequestClient for HttpClient {
    fn post(&mut self, request: HttpRequest) -> RequestId {
        self.next_id += 1;
        let id = RequestId::new(self.next_id);
        self.tasks.retain(|_, task| !task.is_finished());

        let Some(completions) = self.completions.clone() else {
            debug!(%id, "HTTP Info: client detached, request dropped");
            return id;
        };

        let inner = self.inner.clone();
        let task = self.runtime.spawn(async move {
            let outcome = execute(&inner, request).await;
            if completions.send(Completion { id, outcome }).is_err() {
                trace!(%id, "HTTP Info: completion receiver dropped");
            }
        });
        self.tasks.insert(id, task);
        id
    }

    fn abort(&mut self, id: RequestId) {
        if let Some(task) = self.tasks.remove(&id) {
            task.abort();
        }
    }

    fn set_proxy(&mut self, proxy: Option<ProxyConfig>) {
        let mut config = self.config.clone();
        config.proxy = proxy;

        match build_inner(&config) {
            Ok(inner) => {
                debug!(proxy = ?config.proxy, "HTTP Info: proxy override applied");
                self.inner = inner;
                self.config = config;
            },
            Err(error) => warn!(%error, "HTTP Error: proxy override rejected"),
        }
    }

    fn detach(&mut self) {
        self.completions = None;
        for (_, task) in self.tasks.drain() {
            task.abort();
        }
    }
}

impl Drop for HttpClient {
    fn drop(&mut self) {
        for task in self.tasks.values() {
            task.abort();
        }
    }
}

fn build_inner(config: &HttpClientConfig) -> Result<reqwest::Client, ClientError> {
    let mut builder = reqwest::Client::builder();

    if let Some(timeout) = config.timeout {
        builder = builder.timeout(timeout);
    }
    if let Some(timeout) = config.connect_timeout {
        builder = builder.connect_timeout(timeout);
    }
    if let Some(user_agent) = &config.user_agent {
        builder = builder.user_agent(user_agent.clone());
    }
    builder = match &config.proxy {
        Some(proxy) => builder.proxy(to_reqwest_proxy(proxy)?),
        None => builder.no_proxy(),
    };

    Ok(builder.build()?)
}

fn to_reqwest_proxy(proxy: &ProxyConfig) -> Result<reqwest::Proxy, ClientError> {
    let url = proxy.url();
    let mut result = reqwest::Proxy::all(&url)
        .map_err(|source| ClientError::InvalidProxy { url, source })?;
    if let Some(user) = &proxy.user {
        result = result.basic_auth(user, proxy.password.as_deref().unwrap_or_default());
    }
    Ok(result)
}

async fn execute(client: &reqwest::Client, request: HttpRequest) -> Result<Vec<u8>, RequestFailure> {
    let content_length = request.content_length();
    let response = client
        .post(&request.url)
        .header(CONTENT_TYPE, request.content_type)
        .header(CONTENT_LENGTH, content_length)
        .body(request.body)
        .send()
        .await
        .map_err(|error| classify(&error))?;

    let status = response.status();
    if !status.is_success() {
        let reason = status.canonical_reason().unwrap_or("unknown status");
        return Err(RequestFailure::with_status(status.as_u16(), reason));
    }

    let body = response.bytes().await.map_err(|error| classify(&error))?;
    Ok(body.to_vec())
}

/// Map a reqwest error onto the transport's failure categories.
fn classify(error: &reqwest::Error) -> RequestFailure {
    let kind = if error.is_timeout() {
        FailureKind::Timeout
    } else if error.is_connect() {
        connect_failure_kind(error)
    } else if error.is_builder() || error.is_request() || error.is_redirect() {
        FailureKind::Protocol
    } else if error.is_body() || error.is_decode() {
        FailureKind::RemoteHostClosed
    } else {
        FailureKind::Network
    };

    RequestFailure {
        kind,
        status: error.status().map(|status| status.as_u16()),
        message: error_chain(error),
    }
}

fn connect_failure_kind(error: &reqwest::Error) -> FailureKind {
    let mut source = error.source();
    while let Some(cause) = source {
        if let Some(io_error) = cause.downcast_ref::<io::Error>() {
            match io_error.kind() {
                io::ErrorKind::ConnectionRefused => return FailureKind::ConnectionRefused,
                io::ErrorKind::ConnectionReset | io::ErrorKind::ConnectionAborted => {
                    return FailureKind::RemoteHostClosed;
                },
                io::ErrorKind::HostUnreachable | io::ErrorKind::NetworkUnreachable => {
                    return FailureKind::Unreachable;
                },
                io::ErrorKind::TimedOut => return FailureKind::Timeout,
                _ => {},
            }
        }

        let text = cause.to_string().to_ascii_lowercase();
        if text.contains("dns error") || text.contains("failed to lookup address") {
            return FailureKind::HostNotFound;
        }
        if text.contains("proxy") || text.contains("socks") {
            return FailureKind::Proxy;
        }
        source = cause.source();
    }
    FailureKind::Network
}

fn error_chain(error: &reqwest::Error) -> String {
    let mut message = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ProxyKind;

    #[test]
    fn test_builder_options() {
        let builder = HttpClientBuilder::new()
            .timeout(Duration::from_secs(25))
            .connect_timeout(Duration::from_secs(5))
            .user_agent("probe/1.0")
            .proxy(ProxyConfig::new(ProxyKind::Socks5, "127.0.0.1", 1080));

        assert_eq!(builder.config.timeout, Some(Duration::from_secs(25)));
        assert_eq!(builder.config.connect_timeout, Some(Duration::from_secs(5)));
        assert_eq!(builder.config.user_agent.as_deref(), Some("probe/1.0"));
        assert_eq!(builder.config.proxy.as_ref().map(|p| p.port), Some(1080));
    }

    #[test]
    fn test_build_requires_runtime() {
        let result = HttpClient::builder().build();
        assert!(matches!(result, Err(ClientError::NoRuntime(_))));
    }

    #[tokio::test]
    async fn test_set_proxy_updates_config() {
        let (mut client, _completions) = HttpClient::builder().build().unwrap();
        assert!(client.config().proxy.is_none());

        let proxy = ProxyConfig::new(ProxyKind::Http, "10.1.2.3", 3128).with_credentials("u", "p");
        client.set_proxy(Some(proxy.clone()));
        assert_eq!(client.config().proxy, Some(proxy));

        client.set_proxy(None);
        assert!(client.config().proxy.is_none());
    }

    #[tokio::test]
    async fn test_detached_client_drops_requests() {
        let (mut client, mut completions) = HttpClient::builder().build().unwrap();
        client.detach();

        let id = client.post(HttpRequest {
            url: "http://127.0.0.1:9/api".into(),
            content_type: "application/x-www-form-urlencoded",
            body: vec![0; 8],
        });

        assert_eq!(id, RequestId::new(1));
        assert_eq!(client.in_flight(), 0);
        assert!(completions.recv().await.is_none());
    }
}
