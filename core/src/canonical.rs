//! URL canonicalization: every discovered link is reduced to one stable identity string.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use url::Url;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CanonicalizationError {
    #[error("relative url `{0}` has no base to resolve against")]
    RelativeWithoutBase(String),
    #[error("unsupported scheme `{scheme}` in `{url}`")]
    UnsupportedScheme { url: String, scheme: String },
    #[error("url `{0}` has no host")]
    MissingHost(String),
    #[error("malformed url `{url}`: {source}")]
    Malformed {
        url: String,
        #[source]
        source: url::ParseError,
    },
}

/// Normalized identity of a crawlable resource. Two raw URLs that canonicalize
/// to the same string are the same document.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CanonicalUrl(String);

impl CanonicalUrl {
    /// Canonicalizes an absolute URL.
    pub fn parse(raw: &str) -> Result<Self, CanonicalizationError> {
        canonicalize(raw, None)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The canonical string always parses; `None` only for values built by hand.
    pub fn to_url(&self) -> Option<Url> {
        Url::parse(&self.0).ok()
    }

    pub fn host(&self) -> Option<String> {
        self.to_url().and_then(|u| u.host_str().map(str::to_string))
    }

    pub fn path(&self) -> String {
        self.to_url().map(|u| u.path().to_string()).unwrap_or_default()
    }
}

impl fmt::Display for CanonicalUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CanonicalUrl {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Resolve `raw` against `base` and normalize it.
///
/// Scheme and host are lowercased, the path is percent-encoded with dot
/// segments and leading `/..` escapes removed, trailing encoded spaces and
/// slashes are dropped, query parameters are stably sorted by key and the
/// fragment is discarded. The result is a fixed point:
/// `canonicalize(canonicalize(u)) == canonicalize(u)`.
pub fn canonicalize(raw: &str, base: Option<&Url>) -> Result<CanonicalUrl, CanonicalizationError> {
    let raw = raw.trim();
    let parsed = match base {
        Some(base) => base.join(raw),
        None => Url::parse(raw),
    };
    let mut url = parsed.map_err(|source| match source {
        url::ParseError::RelativeUrlWithoutBase => CanonicalizationError::RelativeWithoutBase(raw.to_string()),
        source => CanonicalizationError::Malformed { url: raw.to_string(), source },
    })?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(CanonicalizationError::UnsupportedScheme {
            url: raw.to_string(),
            scheme: url.scheme().to_string(),
        });
    }
    if url.host_str().map_or(true, str::is_empty) {
        return Err(CanonicalizationError::MissingHost(raw.to_string()));
    }

    // set_path resolves dot segments again (`/a/b/..%20` -> `/a/b/..` -> `/a/`),
    // so normalize until the path is stable
    loop {
        let path = normalize_path(url.path());
        if path == url.path() {
            break;
        }
        url.set_path(&path);
    }

    let mut pairs: Vec<(String, String)> = url
        .query_pairs()
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    if pairs.is_empty() {
        url.set_query(None);
    } else {
        // stable: equal keys keep their original relative order
        pairs.sort_by(|a, b| a.0.cmp(&b.0));
        url.query_pairs_mut().clear().extend_pairs(pairs.iter());
    }

    url.set_fragment(None);
    Ok(CanonicalUrl(url.into()))
}

fn normalize_path(path: &str) -> String {
    let mut p = path;
    loop {
        if p == "/.." {
            p = "/";
        } else if let Some(rest) = p.strip_prefix("/../") {
            p = &p[p.len() - rest.len() - 1..];
        } else {
            break;
        }
    }

    let mut out = p.to_string();
    loop {
        if out.ends_with("%20") {
            out.truncate(out.len() - 3);
        } else if out.len() > 1 && out.ends_with('/') {
            out.pop();
        } else {
            break;
        }
    }
    if out.is_empty() {
        out.push('/');
    }
    out
}
