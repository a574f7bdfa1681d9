//! Best-effort Maven Central version lookups
//!
//! Results (including "nothing found") are cached per coordinate for the
//! lifetime of the client. A failed lookup is returned once as
//! `LintError::Remote` and then cached as "nothing found"; once the endpoint
//! times out or refuses connections, every later lookup is a miss without
//! touching the network.

use crate::analysis::CancellationToken;
use crate::error::{LintError, Result};
use serde::Deserialize;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering as AtomicOrdering};
use std::sync::Mutex;
use std::time::Duration;
use tracing::debug;

const SEARCH_URL: &str = "https://search.maven.org/solrsearch/select";

/// Looks up the newest published version of a library
pub trait VersionLookup: Send + Sync {
    /// Newest version of `group:artifact`; previews only with `allow_preview`
    fn latest_version(&self, group: &str, artifact: &str, allow_preview: bool) -> Result<Option<String>>;
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    response: SearchBody,
}

#[derive(Debug, Deserialize)]
struct SearchBody {
    #[serde(default)]
    docs: Vec<SearchDoc>,
}

#[derive(Debug, Deserialize)]
struct SearchDoc {
    v: String,
}

type CacheKey = (String, String, bool);

/// Maven Central search client
pub struct MavenCentralLookup {
    http: reqwest::blocking::Client,
    base_url: String,
    cache: Mutex<HashMap<CacheKey, Option<String>>>,
    cancel: Option<CancellationToken>,
    unreachable: AtomicBool,
    requests: AtomicUsize,
}

impl MavenCentralLookup {
    pub fn new(timeout: Duration) -> Result<Self> {
        let http = reqwest::blocking::Client::builder()
            .user_agent(concat!("lintscan/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .map_err(|e| LintError::Remote(e.to_string()))?;

        Ok(Self {
            http,
            base_url: SEARCH_URL.to_string(),
            cache: Mutex::new(HashMap::new()),
            cancel: None,
            unreachable: AtomicBool::new(false),
            requests: AtomicUsize::new(0),
        })
    }

    /// Point at a different search endpoint (mirrors, tests)
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = Some(cancel);
        self
    }

    /// Requests sent so far
    pub fn requests(&self) -> usize {
        self.requests.load(AtomicOrdering::Relaxed)
    }

    pub fn is_unreachable(&self) -> bool {
        self.unreachable.load(AtomicOrdering::Relaxed)
    }

    fn cached(&self, key: &CacheKey) -> Option<Option<String>> {
        self.cache.lock().ok()?.get(key).cloned()
    }

    fn store(&self, key: CacheKey, value: Option<String>) {
        if let Ok(mut cache) = self.cache.lock() {
            cache.insert(key, value);
        }
    }

    fn search(&self, group: &str, artifact: &str, first_row_only: bool) -> Result<SearchResponse> {
        if self.cancel.as_ref().is_some_and(CancellationToken::is_cancelled) {
            return Err(LintError::Cancelled);
        }

        let query = format!("g:\"{}\" AND a:\"{}\"", group, artifact);
        let mut params = vec![("q", query.as_str()), ("core", "gav"), ("wt", "json")];
        if first_row_only {
            params.push(("rows", "1"));
        }

        debug!("Querying Maven Central for {}:{}", group, artifact);
        self.requests.fetch_add(1, AtomicOrdering::Relaxed);
        let response = self
            .http
            .get(&self.base_url)
            .query(&params)
            .send()
            .map_err(|e| {
                if e.is_timeout() || e.is_connect() {
                    self.unreachable.store(true, AtomicOrdering::Relaxed);
                }
                if e.is_timeout() {
                    LintError::Remote(format!("request for {}:{} timed out", group, artifact))
                } else {
                    LintError::Remote(e.to_string())
                }
            })?;

        if !response.status().is_success() {
            return Err(LintError::Remote(format!(
                "HTTP {} for {}:{}",
                response.status().as_u16(),
                group,
                artifact
            )));
        }

        response
            .json::<SearchResponse>()
            .map_err(|e| LintError::Remote(e.to_string()))
    }

    fn lookup(&self, group: &str, artifact: &str, allow_preview: bool) -> Result<Option<String>> {
        let first = self.search(group, artifact, true)?;
        let (mut latest, found_preview) = pick_version(&first, allow_preview);
        if latest.is_none() && found_preview && !allow_preview {
            // The newest release is a preview; look further for a stable one
            let all = self.search(group, artifact, false)?;
            latest = pick_version(&all, false).0;
        }
        Ok(latest)
    }
}

impl VersionLookup for MavenCentralLookup {
    fn latest_version(&self, group: &str, artifact: &str, allow_preview: bool) -> Result<Option<String>> {
        let key = (group.to_string(), artifact.to_string(), allow_preview);
        if let Some(hit) = self.cached(&key) {
            return Ok(hit);
        }
        if self.is_unreachable() {
            return Ok(None);
        }

        match self.lookup(group, artifact, allow_preview) {
            Ok(latest) => {
                self.store(key, latest.clone());
                Ok(latest)
            }
            Err(LintError::Cancelled) => Err(LintError::Cancelled),
            Err(e) => {
                self.store(key, None);
                Err(e)
            }
        }
    }
}

/// First acceptable version in a search response, and whether a preview was
/// seen last
fn pick_version(response: &SearchResponse, allow_preview: bool) -> (Option<String>, bool) {
    let mut found_preview = false;
    for doc in &response.response.docs {
        found_preview = is_preview(&doc.v);
        if allow_preview || !found_preview {
            return (Some(doc.v.clone()), found_preview);
        }
    }
    (None, found_preview)
}

/// Whether a version string names an alpha, beta, rc or snapshot build
pub fn is_preview(version: &str) -> bool {
    let lower = version.to_ascii_lowercase();
    ["alpha", "beta", "rc", "preview", "snapshot", "-dev", "eap", "-m"]
        .iter()
        .any(|marker| lower.contains(marker))
}

/// Compare dotted versions numerically; a release sorts after its previews
pub fn compare_versions(a: &str, b: &str) -> Ordering {
    fn split(version: &str) -> (Vec<u64>, Option<&str>) {
        let (numbers, qualifier) = match version.split_once('-') {
            Some((n, q)) => (n, Some(q)),
            None => (version, None),
        };
        let parts = numbers
            .split('.')
            .map(|p| {
                p.chars()
                    .take_while(char::is_ascii_digit)
                    .collect::<String>()
                    .parse()
                    .unwrap_or(0)
            })
            .collect();
        (parts, qualifier)
    }

    let (left, left_qualifier) = split(a);
    let (right, right_qualifier) = split(b);
    let len = left.len().max(right.len());
    for i in 0..len {
        let l = left.get(i).copied().unwrap_or(0);
        let r = right.get(i).copied().unwrap_or(0);
        match l.cmp(&r) {
            Ordering::Equal => continue,
            other => return other,
        }
    }
    match (left_qualifier, right_qualifier) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Greater,
        (Some(_), None) => Ordering::Less,
        (Some(l), Some(r)) => l.cmp(r),
    }
}
