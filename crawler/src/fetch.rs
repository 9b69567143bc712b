use crate::config::CrawlConfig;
use crate::robots::RobotsRules;
use parking_lot::RwLock;
use reqwest::{header, Client};
use search_core::CanonicalUrl;
use std::collections::HashMap;
use std::future::Future;
use std::time::Duration;
use thiserror::Error;
use tokio::time::sleep;
use url::Url;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request timed out")]
    Timeout,
    #[error("http status {0}")]
    Status(u16),
    #[error("disallowed by robots.txt")]
    Disallowed,
    #[error("body of {0} bytes exceeds the size limit")]
    TooLarge(usize),
    #[error("invalid url `{0}`")]
    InvalidUrl(String),
    #[error("transport error: {0}")]
    Transport(String),
}

impl From<reqwest::Error> for FetchError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            FetchError::Timeout
        } else {
            FetchError::Transport(e.to_string())
        }
    }
}

/// Fetched content that could not be treated as HTML.
#[derive(Debug, Error)]
#[error("not an html document (content-type `{content_type}`)")]
pub struct ParseError {
    pub content_type: String,
}

#[derive(Debug, Clone)]
pub struct FetchedPage {
    /// Where redirects ended up; relative links resolve against this.
    pub final_url: Option<Url>,
    pub content_type: Option<String>,
    pub body: Vec<u8>,
}

impl FetchedPage {
    pub fn html(body: impl Into<String>) -> Self {
        Self {
            final_url: None,
            content_type: Some("text/html; charset=utf-8".to_string()),
            body: body.into().into_bytes(),
        }
    }

    /// Markup as text. A missing content type is given the benefit of the doubt.
    pub fn markup(&self) -> Result<String, ParseError> {
        if let Some(ct) = &self.content_type {
            let mime = ct.split(';').next().unwrap_or("").trim().to_lowercase();
            if mime != "text/html" && mime != "application/xhtml+xml" {
                return Err(ParseError { content_type: ct.clone() });
            }
        }
        Ok(String::from_utf8_lossy(&self.body).into_owned())
    }
}

/// The network seam of the crawl loop.
pub trait Fetcher: Send + Sync + 'static {
    /// Politeness step (robots rules, crawl delay). Runs before `fetch` and is
    /// not covered by the per-page fetch timeout.
    fn prepare(&self, _url: &CanonicalUrl) -> impl Future<Output = Result<(), FetchError>> + Send {
        async { Ok(()) }
    }

    fn fetch(&self, url: &CanonicalUrl) -> impl Future<Output = Result<FetchedPage, FetchError>> + Send;
}

pub struct HttpFetcher {
    client: Client,
    respect_robots: bool,
    max_body_bytes: usize,
    robots: RwLock<HashMap<String, RobotsRules>>,
}

impl HttpFetcher {
    pub fn new(config: &CrawlConfig) -> anyhow::Result<Self> {
        let client = Client::builder()
            .user_agent(config.user_agent.clone())
            .redirect(reqwest::redirect::Policy::limited(5))
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            respect_robots: config.respect_robots,
            max_body_bytes: config.max_body_bytes,
            robots: RwLock::new(HashMap::new()),
        })
    }

    async fn robots_for(&self, url: &Url) -> RobotsRules {
        let origin = url.origin().ascii_serialization();
        if let Some(rules) = self.robots.read().get(&origin) {
            return rules.clone();
        }
        let robots_url = format!("{origin}/robots.txt");
        let txt = match self.client.get(&robots_url).send().await {
            Ok(resp) if resp.status().is_success() => resp.text().await.unwrap_or_default(),
            _ => String::new(),
        };
        let rules = RobotsRules::parse(&txt);
        tracing::debug!(%origin, delay = ?rules.crawl_delay, "robots.txt cached");
        self.robots.write().insert(origin, rules.clone());
        rules
    }
}

fn parse_target(url: &CanonicalUrl) -> Result<Url, FetchError> {
    Url::parse(url.as_str()).map_err(|_| FetchError::InvalidUrl(url.to_string()))
}

impl Fetcher for HttpFetcher {
    async fn prepare(&self, url: &CanonicalUrl) -> Result<(), FetchError> {
        if !self.respect_robots {
            return Ok(());
        }
        let target = parse_target(url)?;
        let rules = self.robots_for(&target).await;
        if !rules.allows(target.path()) {
            return Err(FetchError::Disallowed);
        }
        if let Some(delay) = rules.crawl_delay {
            sleep(delay).await;
        }
        Ok(())
    }

    async fn fetch(&self, url: &CanonicalUrl) -> Result<FetchedPage, FetchError> {
        let target = parse_target(url)?;
        let resp = self.client.get(target).send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }
        if let Some(len) = resp.content_length() {
            if len as usize > self.max_body_bytes {
                return Err(FetchError::TooLarge(len as usize));
            }
        }
        let content_type = resp
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let final_url = Some(resp.url().clone());
        let bytes = resp.bytes().await?;
        if bytes.len() > self.max_body_bytes {
            return Err(FetchError::TooLarge(bytes.len()));
        }
        Ok(FetchedPage { final_url, content_type, body: bytes.to_vec() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_html_is_a_parse_error() {
        let page = FetchedPage { final_url: None, content_type: Some("application/pdf".into()), body: vec![1, 2] };
        assert!(page.markup().is_err());
        let page = FetchedPage { final_url: None, content_type: None, body: b"<p>hi</p>".to_vec() };
        assert_eq!(page.markup().unwrap(), "<p>hi</p>");
        assert!(FetchedPage::html("<p>x</p>").markup().is_ok());
    }
}
