//! Request descriptor: target URI plus named text and file parameters.
//!
//! Validation happens when a parameter is added; the first failure is kept and
//! reported by [`RequestBuilder::build`]. A built descriptor is immutable and can
//! be reused by every attempt of a retried call. Files are not re-checked on reuse.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use url::Url;

use crate::control::Interrupt;
use crate::error::TransportError;

/// Default bound on establishing the connection.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(20);

/// Immutable description of one multipart submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestDescriptor {
    server_uri: Url,
    string_params: BTreeMap<String, String>,
    path_params: BTreeMap<String, PathBuf>,
}

impl RequestDescriptor {
    /// Open a builder targeting `server_uri`.
    pub fn on(server_uri: &str) -> RequestBuilder {
        RequestBuilder::new(server_uri)
    }

    pub fn server_uri(&self) -> &Url {
        &self.server_uri
    }

    pub fn string_params(&self) -> &BTreeMap<String, String> {
        &self.string_params
    }

    pub fn path_params(&self) -> &BTreeMap<String, PathBuf> {
        &self.path_params
    }

    pub fn is_empty(&self) -> bool {
        self.string_params.is_empty() && self.path_params.is_empty()
    }
}

impl fmt::Display for RequestDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let files = self
            .path_params
            .iter()
            .map(|(k, p)| format!("{}=@{}", k, p.display()));
        let texts = self.string_params.iter().map(|(k, v)| format!("{}={}", k, v));
        let params: Vec<String> = files.chain(texts).collect();
        write!(
            f,
            "RequestDescriptor {{ server_uri: {}, params: {} }}",
            self.server_uri,
            params.join(", ")
        )
    }
}

/// Builder returned by [`RequestDescriptor::on`].
#[derive(Debug)]
pub struct RequestBuilder {
    server_uri: Result<Url, String>,
    string_params: BTreeMap<String, String>,
    path_params: BTreeMap<String, PathBuf>,
    error: Option<String>,
}

impl RequestBuilder {
    fn new(server_uri: &str) -> Self {
        Self {
            server_uri: Url::parse(server_uri)
                .map_err(|e| format!("'{}' is not a valid URI: {}", server_uri, e)),
            string_params: BTreeMap::new(),
            path_params: BTreeMap::new(),
            error: None,
        }
    }

    /// Add a text parameter.
    pub fn with_param(mut self, name: &str, value: impl Into<String>) -> Self {
        if self.check_name(name) {
            self.string_params.insert(name.to_string(), value.into());
        }
        self
    }

    /// Add a file parameter. `path` must be an existing regular file now.
    pub fn with_path_param(mut self, name: &str, path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        if !self.check_name(name) {
            return self;
        }
        if !path.is_file() {
            self.fail(format!(
                "'{}' must be an existing regular file",
                path.display()
            ));
            return self;
        }
        self.path_params.insert(name.to_string(), path.to_path_buf());
        self
    }

    /// Produce the descriptor, or the first validation failure.
    pub fn build(self) -> Result<RequestDescriptor, TransportError> {
        if let Some(msg) = self.error {
            return Err(TransportError::Invalid(msg));
        }
        let server_uri = self.server_uri.map_err(TransportError::Invalid)?;
        Ok(RequestDescriptor {
            server_uri,
            string_params: self.string_params,
            path_params: self.path_params,
        })
    }

    fn check_name(&mut self, name: &str) -> bool {
        if name.is_empty() {
            self.fail("parameter name must not be empty".to_string());
            return false;
        }
        if self.string_params.contains_key(name) || self.path_params.contains_key(name) {
            self.fail(format!("duplicate parameter name '{}'", name));
            return false;
        }
        true
    }

    fn fail(&mut self, msg: String) {
        if self.error.is_none() {
            self.error = Some(msg);
        }
    }
}

/// Per-call settings for one attempt.
#[derive(Debug, Clone)]
pub struct Config {
    /// Bound on establishing the connection; zero leaves curl's default.
    pub connect_timeout: Duration,
    /// Wall-clock bound on the whole attempt; `None` = unbounded.
    pub timeout: Option<Duration>,
    /// Caller's interrupted condition.
    pub interrupt: Interrupt,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            timeout: None,
            interrupt: Interrupt::new(),
        }
    }
}

impl Config {
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn connect_timeout_millis(self, millis: u64) -> Self {
        self.connect_timeout(Duration::from_millis(millis))
    }

    /// Overall deadline; a zero duration means unbounded.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = if timeout.is_zero() { None } else { Some(timeout) };
        self
    }

    pub fn timeout_millis(self, millis: u64) -> Self {
        self.timeout(Duration::from_millis(millis))
    }

    pub fn interrupt(mut self, interrupt: Interrupt) -> Self {
        self.interrupt = interrupt;
        self
    }
}
