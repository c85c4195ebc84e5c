//! Web page text extraction.
//!
//! A plain GET with a browser User-Agent is tried first. If it fails or the
//! page has no visible text (typical of script-rendered sites), the page is
//! requested once more through a Browserless-compatible rendering service:
//! `POST {render_endpoint}/content {"url": ...}` answering with the rendered
//! HTML.

use std::time::Duration;

use reqwest::{Client, Url};
use serde_json::json;
use tracing::{debug, info, warn};

use crate::core::config::WebConfig;
use crate::rag::RetrievalError;

pub struct WebExtractor {
    client: Client,
    render_endpoint: Option<String>,
}

impl WebExtractor {
    pub fn new(config: &WebConfig) -> Result<Self, RetrievalError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.fetch_timeout_secs))
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| RetrievalError::extraction("web client", e))?;

        let render_endpoint = config
            .render_endpoint
            .as_deref()
            .map(str::trim)
            .filter(|endpoint| !endpoint.is_empty())
            .map(|endpoint| endpoint.trim_end_matches('/').to_string());

        Ok(Self {
            client,
            render_endpoint,
        })
    }

    /// Returns the visible text of `url`, one phrase per line.
    pub async fn extract(&self, url: &str, use_browser: bool) -> Result<String, RetrievalError> {
        let url = validate_url(url)?;

        let mut primary_failure = None;
        if !use_browser {
            match self.fetch_simple(&url).await {
                Ok(text) if !text.is_empty() => return Ok(text),
                Ok(_) => warn!("No visible text at {}; trying rendered fetch", url),
                Err(e) => {
                    warn!("Simple fetch of {} failed ({}); trying rendered fetch", url, e);
                    primary_failure = Some(e);
                }
            }
        }

        let text = match (self.fetch_rendered(&url).await, primary_failure) {
            (Ok(text), _) => text,
            (Err(render), Some(fetch)) => {
                return Err(RetrievalError::extraction(
                    "web",
                    format!("{}; then {}", fetch, render),
                ))
            }
            (Err(render), None) => return Err(render),
        };
        if text.is_empty() {
            return Err(RetrievalError::extraction(
                "web",
                format!("no text content found at {}", url),
            ));
        }
        Ok(text)
    }

    async fn fetch_simple(&self, url: &Url) -> Result<String, RetrievalError> {
        let res = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| RetrievalError::extraction("web fetch", e))?;

        let res = res
            .error_for_status()
            .map_err(|e| RetrievalError::extraction("web fetch", e))?;
        let html = res
            .text()
            .await
            .map_err(|e| RetrievalError::extraction("web fetch", e))?;

        debug!("Fetched {} bytes from {}", html.len(), url);
        Ok(html_to_text(&html))
    }

    async fn fetch_rendered(&self, url: &Url) -> Result<String, RetrievalError> {
        let endpoint = self.render_endpoint.as_deref().ok_or_else(|| {
            RetrievalError::extraction("web render", "no render endpoint configured")
        })?;

        info!("Rendering {} via {}", url, endpoint);
        let res = self
            .client
            .post(format!("{}/content", endpoint))
            .json(&json!({ "url": url.as_str() }))
            .send()
            .await
            .map_err(|e| RetrievalError::extraction("web render", e))?;

        let res = res
            .error_for_status()
            .map_err(|e| RetrievalError::extraction("web render", e))?;
        let html = res
            .text()
            .await
            .map_err(|e| RetrievalError::extraction("web render", e))?;

        Ok(html_to_text(&html))
    }
}

/// Parses `raw` and accepts only `http` and `https` URLs.
pub fn validate_url(raw: &str) -> Result<Url, RetrievalError> {
    let url = Url::parse(raw.trim())
        .map_err(|e| RetrievalError::Validation(format!("invalid URL '{}': {}", raw, e)))?;

    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(RetrievalError::Validation(format!(
            "unsupported URL scheme '{}'",
            other
        ))),
    }
}

const SKIPPED_ELEMENTS: [&str; 3] = ["script", "style", "noscript"];
const BLOCK_ELEMENTS: [&str; 16] = [
    "p", "div", "br", "li", "ul", "ol", "tr", "table", "section", "article", "header",
    "footer", "h1", "h2", "h3", "title",
];

/// Converts HTML into visible text, one phrase per line.
///
/// Script and style bodies are dropped, tags removed (block elements become
/// line breaks) and entities decoded. Lines are trimmed, split on runs of two
/// spaces and blank ones discarded.
pub fn html_to_text(html: &str) -> String {
    let stripped = strip_html_tags(html);
    let decoded = decode_entities(&stripped);

    decoded
        .lines()
        .map(str::trim)
        .flat_map(|line| line.split("  "))
        .map(str::trim)
        .filter(|phrase| !phrase.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

fn strip_html_tags(html: &str) -> String {
    let mut result = String::with_capacity(html.len());
    let mut rest = html;

    while let Some(open) = rest.find('<') {
        result.push_str(&rest[..open]);
        rest = &rest[open..];

        let Some(close) = rest.find('>') else {
            // Unterminated tag: drop the remainder.
            rest = "";
            break;
        };
        let tag = &rest[1..close];
        rest = &rest[close + 1..];

        if tag.starts_with("!--") {
            if tag.len() < 5 || !tag.ends_with("--") {
                rest = rest.find("-->").map_or("", |end| &rest[end + 3..]);
            }
            continue;
        }

        let name = tag_name(tag);
        if !tag.starts_with('/') && SKIPPED_ELEMENTS.contains(&name.as_str()) {
            rest = skip_element_body(rest, &name);
            continue;
        }
        if BLOCK_ELEMENTS.contains(&name.as_str()) || (name.starts_with('h') && name.len() == 2) {
            result.push('\n');
        }
    }
    result.push_str(rest);
    result
}

fn tag_name(tag: &str) -> String {
    tag.trim_start_matches('/')
        .chars()
        .take_while(|c| c.is_ascii_alphanumeric())
        .collect::<String>()
        .to_ascii_lowercase()
}

/// Returns the input after the closing tag of `name`, or "" if unclosed.
fn skip_element_body<'a>(rest: &'a str, name: &str) -> &'a str {
    let closing = format!("</{}", name);
    let mut offset = 0;
    while let Some(pos) = rest[offset..].find("</") {
        let start = offset + pos;
        let candidate = rest.get(start..start + closing.len());
        if candidate.is_some_and(|c| c.eq_ignore_ascii_case(&closing)) {
            return match rest[start..].find('>') {
                Some(end) => &rest[start + end + 1..],
                None => "",
            };
        }
        offset = start + 2;
    }
    ""
}

fn decode_entities(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(amp) = rest.find('&') {
        result.push_str(&rest[..amp]);
        rest = &rest[amp..];

        let decoded = rest
            .find(';')
            .filter(|&semi| semi <= 10)
            .and_then(|semi| decode_entity(&rest[1..semi]).map(|c| (c, semi)));

        match decoded {
            Some((c, semi)) => {
                result.push(c);
                rest = &rest[semi + 1..];
            }
            None => {
                result.push('&');
                rest = &rest[1..];
            }
        }
    }
    result.push_str(rest);
    result
}

fn decode_entity(entity: &str) -> Option<char> {
    match entity {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        "nbsp" => Some(' '),
        _ => {
            let code = entity.strip_prefix('#')?;
            let value = match code.strip_prefix(['x', 'X']) {
                Some(hex) => u32::from_str_radix(hex, 16).ok()?,
                None => code.parse().ok()?,
            };
            char::from_u32(value)
        }
    }
}
