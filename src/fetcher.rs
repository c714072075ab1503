use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use regex::Regex;
use reqwest::blocking::Client;
use tracing::{debug, info, warn};

use crate::config::FetchSettings;
use crate::error::{FetchError, ParseError};
use crate::parser::Document;

static URL_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)^https?://").unwrap());

/// Raw HTML of one page plus where and when it came from.
#[derive(Debug, Clone)]
pub struct Page {
    pub source: String,
    pub html: String,
    /// HTTP status; `None` for pages read from disk.
    pub status: Option<u16>,
    pub fetched_at: DateTime<Utc>,
}

impl Page {
    pub fn from_html(source: impl Into<String>, html: impl Into<String>) -> Page {
        Page {
            source: source.into(),
            html: html.into(),
            status: None,
            fetched_at: Utc::now(),
        }
    }

    /// Load pre-fetched HTML saved on disk.
    pub fn from_file(path: &Path) -> Result<Page> {
        let html = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        Ok(Page::from_html(path.display().to_string(), html))
    }

    pub fn document(&self) -> Result<Document, ParseError> {
        Document::parse(&self.html)
    }
}

/// A command-line target: a URL to fetch or a saved HTML file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    Url(String),
    File(PathBuf),
}

impl Target {
    pub fn parse(arg: &str) -> Target {
        if URL_RE.is_match(arg) {
            Target::Url(arg.to_string())
        } else {
            Target::File(PathBuf::from(arg))
        }
    }
}

/// Blocking HTTP client. One GET per call, no retries.
pub struct Fetcher {
    client: Client,
}

impl Fetcher {
    pub fn new(settings: &FetchSettings) -> Result<Fetcher, FetchError> {
        Fetcher::build(settings, settings.timeout())
    }

    fn build(settings: &FetchSettings, timeout: Option<Duration>) -> Result<Fetcher, FetchError> {
        // reqwest's blocking client has its own 30s default; `None` lifts it
        let mut builder = Client::builder()
            .user_agent(settings.user_agent.as_str())
            .timeout(timeout);
        if !settings.system_proxy {
            builder = builder.no_proxy();
        }
        let client = builder.build().map_err(FetchError::Client)?;
        Ok(Fetcher { client })
    }

    pub fn fetch(&self, url: &str) -> Result<Page, FetchError> {
        let parsed = reqwest::Url::parse(url).map_err(|e| FetchError::InvalidUrl {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

        info!("Fetching {}", url);
        let start = Instant::now();
        let response = self
            .client
            .get(parsed)
            .send()
            .map_err(|e| transport_error(url, e))?;

        let status = response.status();
        if !status.is_success() {
            warn!("HTTP {} from {}", status.as_u16(), url);
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let html = response.text().map_err(|e| transport_error(url, e))?;
        debug!(
            url,
            bytes = html.len(),
            latency_ms = start.elapsed().as_millis() as u64,
            "fetched page"
        );

        Ok(Page {
            source: url.to_string(),
            html,
            status: Some(status.as_u16()),
            fetched_at: Utc::now(),
        })
    }

    /// Fetch a URL target or read a file target.
    pub fn load(&self, target: &Target) -> Result<Page> {
        match target {
            Target::Url(url) => Ok(self.fetch(url)?),
            Target::File(path) => Page::from_file(path),
        }
    }
}

/// Fetch one page with a fresh client. `timeout = None` waits indefinitely.
pub fn fetch(url: &str, timeout: Option<Duration>) -> Result<Page, FetchError> {
    Fetcher::build(&FetchSettings::default(), timeout)?.fetch(url)
}

fn transport_error(url: &str, source: reqwest::Error) -> FetchError {
    let url = url.to_string();
    if source.is_timeout() {
        FetchError::Timeout { url, source }
    } else {
        FetchError::Network { url, source }
    }
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use std::io::{Read, Write};
    use std::net::{TcpListener, TcpStream};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::thread;

    use super::*;

    /// Serve `response` to every connection; returns the URL and a hit counter.
    fn serve(response: &'static str, stall: Option<Duration>) -> (String, Arc<AtomicUsize>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hits);
        thread::spawn(move || {
            for stream in listener.incoming() {
                let Ok(mut stream) = stream else { break };
                counter.fetch_add(1, Ordering::SeqCst);
                read_request(&mut stream);
                if let Some(pause) = stall {
                    thread::sleep(pause);
                }
                let _ = stream.write_all(response.as_bytes());
            }
        });
        (format!("http://{}/accreditation/criteria/", addr), hits)
    }

    fn read_request(stream: &mut TcpStream) {
        let mut buf = [0u8; 1024];
        let mut seen = Vec::new();
        while !seen.windows(4).any(|w| w == b"\r\n\r\n") {
            match stream.read(&mut buf) {
                Ok(0) | Err(_) => break,
                Ok(n) => seen.extend_from_slice(&buf[..n]),
            }
        }
    }

    fn local_fetcher(timeout: Option<Duration>) -> Fetcher {
        let settings = FetchSettings {
            system_proxy: false,
            ..FetchSettings::default()
        };
        Fetcher::build(&settings, timeout).unwrap()
    }

    const OK: &str = "HTTP/1.1 200 OK\r\nContent-Type: text/html; charset=utf-8\r\nContent-Length: 36\r\nConnection: close\r\n\r\n<h2>A</h2><p>x</p><h2>B</h2><p>y</p>";
    const NOT_FOUND: &str = "HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\nConnection: close\r\n\r\n";

    #[test]
    fn fetches_html() {
        let (url, hits) = serve(OK, None);
        let page = local_fetcher(Some(Duration::from_secs(5))).fetch(&url).unwrap();
        assert_eq!(page.status, Some(200));
        assert_eq!(page.source, url);
        assert_eq!(page.html, "<h2>A</h2><p>x</p><h2>B</h2><p>y</p>");
        assert_eq!(hits.load(Ordering::SeqCst), 1);

        let sections = page.document().unwrap().sections(&Default::default()).unwrap();
        assert_eq!(sections.get("A"), Some("x"));
    }

    #[test]
    fn not_found_is_an_error_without_retry() {
        let (url, hits) = serve(NOT_FOUND, None);
        let err = local_fetcher(Some(Duration::from_secs(5))).fetch(&url).unwrap_err();
        assert!(matches!(err, FetchError::Status { status: 404, .. }));
        assert_eq!(err.status(), Some(404));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn timeout_fails_instead_of_hanging() {
        let (url, _) = serve(OK, Some(Duration::from_secs(3)));
        let err = local_fetcher(Some(Duration::from_millis(200))).fetch(&url).unwrap_err();
        assert!(matches!(err, FetchError::Timeout { .. }), "got {err:?}");
    }

    #[test]
    fn connection_refused_is_network_error() {
        // bind then drop to get a port nobody listens on
        let port = TcpListener::bind("127.0.0.1:0").unwrap().local_addr().unwrap().port();
        let err = local_fetcher(Some(Duration::from_secs(5)))
            .fetch(&format!("http://127.0.0.1:{}/", port))
            .unwrap_err();
        assert!(matches!(err, FetchError::Network { .. }), "got {err:?}");
        assert_eq!(err.status(), None);
    }

    #[test]
    fn malformed_url() {
        let err = fetch("not a url", None).unwrap_err();
        assert!(matches!(err, FetchError::InvalidUrl { .. }));
    }

    #[test]
    fn targets() {
        assert_eq!(
            Target::parse("https://www.abet.org/accreditation/"),
            Target::Url("https://www.abet.org/accreditation/".into())
        );
        assert_eq!(Target::parse("HTTP://example.org"), Target::Url("HTTP://example.org".into()));
        assert_eq!(
            Target::parse("saved/criteria.html"),
            Target::File(PathBuf::from("saved/criteria.html"))
        );
    }

    #[test]
    fn load_file_target() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("page.html");
        std::fs::write(&path, "<h2>Saved</h2><p>copy</p>").unwrap();

        let page = local_fetcher(None).load(&Target::File(path.clone())).unwrap();
        assert_eq!(page.status, None);
        assert_eq!(page.html, "<h2>Saved</h2><p>copy</p>");

        let missing = local_fetcher(None).load(&Target::File(dir.path().join("gone.html")));
        assert!(missing.is_err());
    }
}
