//! Document byte sources
//!
//! The viewer receives a document URL from the host and needs the raw bytes.
//! Plain paths and `file://` URLs are read from disk; `http(s)://` URLs are
//! fetched with a blocking `ureq` request.

use std::io::Read;
use std::path::PathBuf;
use std::time::Duration;
use tracing::debug;

/// Upper bound on a fetched document.
const MAX_DOCUMENT_BYTES: u64 = 256 * 1024 * 1024;

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("I/O error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("HTTP {status} fetching {url}")]
    Status { url: String, status: u16 },
    #[error("transport error fetching {url}: {message}")]
    Transport { url: String, message: String },
    #[error("unsupported URL scheme in {0}")]
    UnsupportedScheme(String),
}

/// Capability: fetch the bytes behind a document URL.
pub trait ByteSource {
    fn fetch(&mut self, url: &str) -> Result<Vec<u8>, FetchError>;
}

/// Reads local files, from plain paths or `file://` URLs.
#[derive(Debug, Default, Clone)]
pub struct FileSource;

impl ByteSource for FileSource {
    fn fetch(&mut self, url: &str) -> Result<Vec<u8>, FetchError> {
        let path = PathBuf::from(url.strip_prefix("file://").unwrap_or(url));
        debug!(path = %path.display(), "reading document");
        std::fs::read(&path).map_err(|source| FetchError::Io { path, source })
    }
}

/// Fetches documents over HTTP(S).
#[derive(Clone)]
pub struct HttpSource {
    agent: ureq::Agent,
}

impl std::fmt::Debug for HttpSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpSource").finish_non_exhaustive()
    }
}

impl HttpSource {
    pub fn new() -> Self {
        Self::with_timeout(Duration::from_secs(30))
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self { agent: ureq::AgentBuilder::new().timeout(timeout).build() }
    }
}

impl Default for HttpSource {
    fn default() -> Self {
        Self::new()
    }
}

impl ByteSource for HttpSource {
    fn fetch(&mut self, url: &str) -> Result<Vec<u8>, FetchError> {
        debug!(url, "fetching document");
        let response = self.agent.get(url).call().map_err(|err| match err {
            ureq::Error::Status(status, _) => FetchError::Status { url: url.to_owned(), status },
            ureq::Error::Transport(transport) => {
                FetchError::Transport { url: url.to_owned(), message: transport.to_string() }
            }
        })?;

        let mut bytes = Vec::new();
        response
            .into_reader()
            .take(MAX_DOCUMENT_BYTES)
            .read_to_end(&mut bytes)
            .map_err(|source| FetchError::Io { path: PathBuf::from(url), source })?;

        Ok(bytes)
    }
}

/// Whether `url` is fetched over the network rather than from disk.
pub fn is_http_url(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://")
}

/// Dispatches on the URL scheme: HTTP(S) over the network, anything
/// without a scheme or with `file://` from disk.
#[derive(Debug, Default, Clone)]
pub struct AnySource {
    file: FileSource,
    http: HttpSource,
}

impl AnySource {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ByteSource for AnySource {
    fn fetch(&mut self, url: &str) -> Result<Vec<u8>, FetchError> {
        if is_http_url(url) {
            self.http.fetch(url)
        } else if url.starts_with("file://") || !url.contains("://") {
            self.file.fetch(url)
        } else {
            Err(FetchError::UnsupportedScheme(url.to_owned()))
        }
    }
}
