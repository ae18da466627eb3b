//! Boilerplate-removal client.
//!
//! The extractor is an external HTTP service: POST the raw page, get back an
//! XML envelope carrying the service version and either the cleaned text or
//! an extraction-failure marker.

use std::time::Duration;

use async_trait::async_trait;
use quick_xml::events::Event;
use quick_xml::Reader;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("Invalid extractor endpoint: {0}")]
    Endpoint(#[from] url::ParseError),
    #[error("Extractor request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("Malformed extractor response: {0}")]
    Malformed(String),
}

pub type Result<T> = std::result::Result<T, ExtractError>;

/// Outcome of one extraction call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extraction {
    /// Cleaned text, ASCII-encoded with unrepresentable characters dropped.
    /// None when the service reports an extraction failure.
    pub text: Option<String>,
    /// Service version from the envelope.
    pub version: String,
}

#[async_trait]
pub trait TextExtractor: Send + Sync {
    async fn extract(&self, content: &str) -> Result<Extraction>;
}

/// HTTP client for the extraction service.
pub struct HttpTextExtractor {
    client: reqwest::Client,
    url: String,
}

impl HttpTextExtractor {
    pub fn new(endpoint: &str, timeout: Duration) -> Result<Self> {
        let endpoint = url::Url::parse(endpoint)?;
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            url: endpoint.to_string(),
        })
    }
}

#[async_trait]
impl TextExtractor for HttpTextExtractor {
    async fn extract(&self, content: &str) -> Result<Extraction> {
        let form = [
            ("charset", "UTF-8"),
            ("content", content),
            ("method", "default"),
        ];
        let response = self
            .client
            .post(&self.url)
            .form(&form)
            .send()
            .await?
            .error_for_status()?;

        let body = response.text().await?;
        parse_response(&body)
    }
}

/// Parse the XML envelope:
/// `<ServerInfo><Version>…</Version></ServerInfo>` followed by either
/// `<ExtractionFailureResponse/>` or `<Response>…text…</Response>`.
pub fn parse_response(xml: &str) -> Result<Extraction> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(false);

    let mut version: Option<String> = None;
    let mut text: Option<String> = None;
    let mut failed = false;
    let mut path: Vec<String> = Vec::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(start)) => {
                path.push(String::from_utf8_lossy(start.name().as_ref()).into_owned());
            }
            Ok(Event::Empty(empty)) => {
                if empty.name().as_ref() == b"ExtractionFailureResponse" {
                    failed = true;
                }
            }
            Ok(Event::End(_)) => {
                path.pop();
            }
            Ok(Event::Text(event_text)) => {
                let value = event_text
                    .unescape()
                    .map_err(|e| ExtractError::Malformed(e.to_string()))?;
                match path.last().map(String::as_str) {
                    Some("Version") if path.iter().any(|p| p == "ServerInfo") => {
                        version = Some(value.trim().to_string());
                    }
                    Some("Response") => {
                        text = Some(to_ascii(&value));
                    }
                    Some("ExtractionFailureResponse") => failed = true,
                    _ => {}
                }
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => return Err(ExtractError::Malformed(e.to_string())),
        }
    }

    let version = version.ok_or_else(|| {
        ExtractError::Malformed("missing ServerInfo/Version in response".to_string())
    })?;

    if failed {
        return Ok(Extraction {
            text: None,
            version,
        });
    }

    match text {
        Some(text) => Ok(Extraction {
            text: Some(text),
            version,
        }),
        None => Err(ExtractError::Malformed(
            "neither Response nor ExtractionFailureResponse present".to_string(),
        )),
    }
}

/// Encode as ASCII, ignoring non-representable characters.
fn to_ascii(text: &str) -> String {
    text.chars().filter(char::is_ascii).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_successful_extraction() {
        let xml = "<Root><ServerInfo><Version>1.2.0</Version></ServerInfo>\
                   <Response>Hello World</Response></Root>";
        let extraction = parse_response(xml).unwrap();
        assert_eq!(extraction.version, "1.2.0");
        assert_eq!(extraction.text.as_deref(), Some("Hello World"));
    }

    #[test]
    fn parses_extraction_failure() {
        let xml = "<Root><ServerInfo><Version>1.2.0</Version></ServerInfo>\
                   <ExtractionFailureResponse/></Root>";
        let extraction = parse_response(xml).unwrap();
        assert_eq!(extraction.text, None);
    }

    #[test]
    fn missing_version_is_malformed() {
        let xml = "<Root><Response>text</Response></Root>";
        assert!(parse_response(xml).is_err());
    }

    #[test]
    fn response_text_is_ascii_filtered() {
        let xml = "<Root><ServerInfo><Version>1</Version></ServerInfo>\
                   <Response>caf\u{e9} au lait</Response></Root>";
        let extraction = parse_response(xml).unwrap();
        assert_eq!(extraction.text.as_deref(), Some("caf au lait"));
    }
}
