//! Marketing copy extraction from a customer's site
//!
//! Pages are fetched through the SSRF guard and reduced to the text a script writer can use:
//! title, description, top-level headings and substantial paragraphs.

use std::sync::Arc;
use std::time::Duration;

use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::dns::{Addrs, Name, Resolve, Resolving};
use serde::Serialize;
use thiserror::Error;

use crate::utils::url_validation::{UrlValidationError, resolve_public_host, validate_url};

pub const FETCH_TIMEOUT: Duration = Duration::from_secs(10);
pub const MAX_BODY_BYTES: usize = 2 * 1024 * 1024;
pub const MAX_HEADINGS: usize = 10;
pub const MAX_PARAGRAPHS: usize = 20;
pub const MIN_PARAGRAPH_CHARS: usize = 40;
const MAX_REDIRECTS: usize = 5;
const USER_AGENT: &str = concat!("PitchVoiceBot/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error(transparent)]
    InvalidUrl(#[from] UrlValidationError),

    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("site returned HTTP {0}")]
    Status(u16),

    #[error("expected an HTML page, got '{0}'")]
    NotHtml(String),

    #[error("page is larger than {MAX_BODY_BYTES} bytes")]
    TooLarge,
}

/// Text extracted from a page
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PageCopy {
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub headings: Vec<String>,
    pub paragraphs: Vec<String>,
}

impl PageCopy {
    /// Flatten into plain text for an LLM prompt
    pub fn as_site_copy(&self) -> String {
        let mut lines = Vec::new();
        lines.extend(self.title.iter().cloned());
        lines.extend(self.description.iter().cloned());
        lines.extend(self.headings.iter().cloned());
        lines.extend(self.paragraphs.iter().cloned());
        lines.join("\n")
    }
}

static SCRIPT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?is)<script\b.*?</script\s*>|<style\b.*?</style\s*>|<noscript\b.*?</noscript\s*>|<!--.*?-->",
    )
    .expect("valid script regex")
});
static TITLE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<title\b[^>]*>(.*?)</title\s*>").expect("valid title regex"));
static META_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<meta\b[^>]*>").expect("valid meta regex"));
static ATTR_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?is)([a-z:_-]+)\s*=\s*(?:"([^"]*)"|'([^']*)')"#).expect("valid attribute regex")
});
static HEADING_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)<h[12]\b[^>]*>(.*?)</h[12]\s*>").expect("valid heading regex")
});
static PARAGRAPH_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<p\b[^>]*>(.*?)</p\s*>").expect("valid paragraph regex"));
static TAG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<[^>]*>").expect("valid tag regex"));
static WS_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid whitespace regex"));

type ResolveError = Box<dyn std::error::Error + Send + Sync>;

/// Resolves host names for the scraper's client and refuses private addresses.
///
/// Runs on every connection the client opens, so redirect targets and re-resolved
/// names are checked as well as the first request.
#[derive(Debug, Default)]
struct PublicResolver;

impl Resolve for PublicResolver {
    fn resolve(&self, name: Name) -> Resolving {
        Box::pin(async move {
            let addrs = resolve_public_host(name.as_str(), 0)
                .await
                .map_err(|e| -> ResolveError { Box::new(e) })?;
            Ok::<Addrs, ResolveError>(Box::new(addrs.into_iter()))
        })
    }
}

/// Fetches pages and extracts their copy
#[derive(Debug, Clone)]
pub struct PageScraper {
    client: reqwest::Client,
    allow_loopback: bool,
}

impl PageScraper {
    pub fn new() -> Result<Self, ScrapeError> {
        Self::build(false)
    }

    /// Scraper that may fetch loopback IP literals, for local development and tests
    pub fn allowing_loopback() -> Result<Self, ScrapeError> {
        Self::build(true)
    }

    fn build(allow_loopback: bool) -> Result<Self, ScrapeError> {
        let redirects = reqwest::redirect::Policy::custom(move |attempt| {
            if attempt.previous().len() >= MAX_REDIRECTS {
                return attempt.error("too many redirects");
            }
            // Names are checked by the resolver when connecting
            match attempt.url().host() {
                Some(url::Host::Domain(_)) => attempt.follow(),
                Some(_) if allow_loopback => attempt.follow(),
                _ => attempt.stop(),
            }
        });

        let client = reqwest::Client::builder()
            .timeout(FETCH_TIMEOUT)
            .redirect(redirects)
            .dns_resolver(Arc::new(PublicResolver))
            .user_agent(USER_AGENT)
            .build()?;
        Ok(Self {
            client,
            allow_loopback,
        })
    }

    pub async fn scrape(&self, raw_url: &str) -> Result<PageCopy, ScrapeError> {
        let url = validate_url(raw_url, self.allow_loopback).await?;

        let mut response = self
            .client
            .get(url.clone())
            .header("Accept", "text/html,application/xhtml+xml")
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ScrapeError::Status(status.as_u16()));
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        if !content_type.to_ascii_lowercase().starts_with("text/html")
            && !content_type.to_ascii_lowercase().starts_with("application/xhtml")
        {
            return Err(ScrapeError::NotHtml(content_type));
        }

        if response
            .content_length()
            .is_some_and(|len| len as usize > MAX_BODY_BYTES)
        {
            return Err(ScrapeError::TooLarge);
        }

        let mut body = Vec::new();
        while let Some(chunk) = response.chunk().await? {
            if body.len() + chunk.len() > MAX_BODY_BYTES {
                return Err(ScrapeError::TooLarge);
            }
            body.extend_from_slice(&chunk);
        }

        let html = String::from_utf8_lossy(&body);
        let copy = extract_copy(response.url().as_str(), &html);
        tracing::info!(
            url = %copy.url,
            headings = copy.headings.len(),
            paragraphs = copy.paragraphs.len(),
            "Scraped page copy"
        );
        Ok(copy)
    }
}

/// Extract copy from an HTML document
pub fn extract_copy(url: &str, html: &str) -> PageCopy {
    let html = SCRIPT_RE.replace_all(html, " ");

    let mut description = None;
    let mut og_title = None;
    for meta in META_RE.find_iter(&html) {
        let mut key = None;
        let mut content = None;
        for attr in ATTR_RE.captures_iter(meta.as_str()) {
            let value = attr.get(2).or_else(|| attr.get(3)).map_or("", |m| m.as_str());
            match attr[1].to_ascii_lowercase().as_str() {
                "name" | "property" => key = Some(value.to_ascii_lowercase()),
                "content" => content = Some(clean_text(value)),
                _ => {}
            }
        }
        let (Some(key), Some(content)) = (key, content) else {
            continue;
        };
        if content.is_empty() {
            continue;
        }
        match key.as_str() {
            "description" => description = Some(content),
            "og:description" if description.is_none() => description = Some(content),
            "og:title" => og_title = Some(content),
            _ => {}
        }
    }

    let title = TITLE_RE
        .captures(&html)
        .map(|c| clean_text(&c[1]))
        .filter(|t| !t.is_empty())
        .or(og_title);

    PageCopy {
        url: url.to_string(),
        title,
        description,
        headings: collect_text(&HEADING_RE, &html, MAX_HEADINGS, 1),
        paragraphs: collect_text(&PARAGRAPH_RE, &html, MAX_PARAGRAPHS, MIN_PARAGRAPH_CHARS),
    }
}

fn collect_text(re: &Regex, html: &str, max: usize, min_chars: usize) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for caps in re.captures_iter(html) {
        let text = clean_text(&caps[1]);
        if text.chars().count() >= min_chars && !out.contains(&text) {
            out.push(text);
            if out.len() == max {
                break;
            }
        }
    }
    out
}

/// Strip tags, decode common entities and collapse whitespace
pub fn clean_text(fragment: &str) -> String {
    let text = TAG_RE.replace_all(fragment, " ");
    let text = decode_entities(&text);
    WS_RE.replace_all(&text, " ").trim().to_string()
}

fn decode_entities(text: &str) -> String {
    text.replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&#x27;", "'")
        .replace("&apos;", "'")
        // Last, so "&amp;lt;" stays "&lt;"
        .replace("&amp;", "&")
}
