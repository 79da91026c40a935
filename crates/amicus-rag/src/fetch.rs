//! Official page fetching and HTML-to-text extraction

use once_cell::sync::Lazy;
use regex::Regex;
use std::time::Duration;
use thiserror::Error;

use amicus_core::Hash;

const USER_AGENT: &str = concat!("amicus/", env!("CARGO_PKG_VERSION"));
const FETCH_TIMEOUT: Duration = Duration::from_secs(40);

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP error for {url}: {message}")]
    Http { url: String, message: String },
    #[error("Status {status} for {url}")]
    Status { url: String, status: u16 },
    #[error("Invalid client configuration: {0}")]
    Client(String),
}

/// A fetched page reduced to plain text
#[derive(Debug, Clone, PartialEq)]
pub struct FetchedPage {
    pub url: String,
    pub title: String,
    pub text: String,
    /// ISO date from a "Last Reviewed/Updated" line, when present
    pub last_updated: Option<String>,
    /// SHA-256 of `text`, hex
    pub raw_hash: String,
}

impl FetchedPage {
    /// Build a page from already-extracted text (local files, tests)
    pub fn from_text(url: &str, title: &str, text: &str) -> Self {
        let text = normalize_whitespace(text);
        Self {
            url: url.to_string(),
            title: title.trim().to_string(),
            last_updated: last_updated(&text),
            raw_hash: Hash::of_text(&text).to_hex(),
            text,
        }
    }

    /// Build a page from raw HTML
    pub fn from_html(url: &str, html: &str, title_fallback: &str) -> Self {
        let title = extract_title(html)
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| title_fallback.to_string());
        Self::from_text(url, &title, &html_to_text(html))
    }
}

// The regex crate has no backreferences, so each dropped element gets its own pattern
static DROPPED_BLOCKS: Lazy<Vec<Regex>> = Lazy::new(|| {
    ["script", "style", "noscript", "header", "footer", "nav"]
        .iter()
        .map(|tag| Regex::new(&format!(r"(?is)<{tag}\b[^>]*>.*?</{tag}\s*>")).unwrap())
        .collect()
});

static COMMENT: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<!--.*?-->").unwrap());
static TITLE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?is)<title[^>]*>(.*?)</title\s*>").unwrap());
static LINE_BREAK: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)<br\s*/?>").unwrap());
static BLOCK_TAG: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)</?(p|div|li|ul|ol|h[1-6]|tr|table|section|article|main|blockquote)\b[^>]*>")
        .unwrap()
});
static ANY_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]+>").unwrap());
static NUMERIC_ENTITY: Lazy<Regex> = Lazy::new(|| Regex::new(r"&#(x?[0-9a-fA-F]+);").unwrap());
static INLINE_SPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[ \t\u{a0}]+").unwrap());
static LAST_UPDATED: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)last\s+reviewed/updated:?\s*(\d{1,2}/\d{1,2}/\d{4})").unwrap()
});

fn replace_all(re: &Regex, text: &str, with: &str) -> String {
    re.replace_all(text, with).into_owned()
}

/// Extract the `<title>` text
pub fn extract_title(html: &str) -> Option<String> {
    let caps = TITLE.captures(html)?;
    let raw = caps.get(1)?.as_str();
    Some(normalize_whitespace(&decode_entities(raw)).replace('\n', " "))
}

/// Reduce HTML to paragraph-separated plain text
pub fn html_to_text(html: &str) -> String {
    let mut text = replace_all(&COMMENT, html, "");
    for re in DROPPED_BLOCKS.iter() {
        text = re.replace_all(&text, "").into_owned();
    }
    text = replace_all(&TITLE, &text, "");
    text = replace_all(&LINE_BREAK, &text, "\n");
    text = replace_all(&BLOCK_TAG, &text, "\n\n");
    text = replace_all(&ANY_TAG, &text, "");
    normalize_whitespace(&decode_entities(&text))
}

/// Decode the handful of entities that matter for official pages
pub fn decode_entities(text: &str) -> String {
    let named = text
        .replace("&nbsp;", " ")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&apos;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&ndash;", "-")
        .replace("&mdash;", "-")
        .replace("&rsquo;", "'")
        .replace("&lsquo;", "'")
        .replace("&ldquo;", "\"")
        .replace("&rdquo;", "\"")
        .replace("&sect;", "§");

    let decoded = NUMERIC_ENTITY
        .replace_all(&named, |caps: &regex::Captures| {
            let code = &caps[1];
            let value = match code.strip_prefix('x').or_else(|| code.strip_prefix('X')) {
                Some(hex) => u32::from_str_radix(hex, 16).ok(),
                None => code.parse::<u32>().ok(),
            };
            value
                .and_then(char::from_u32)
                .map(String::from)
                .unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned();
    // Last so "&amp;lt;" stays "&lt;"
    decoded.replace("&amp;", "&")
}

/// Collapse inline whitespace, trim lines, keep at most one blank line
pub fn normalize_whitespace(text: &str) -> String {
    let collapsed = replace_all(&INLINE_SPACE, text, " ");
    let mut out: Vec<&str> = Vec::new();
    let mut blank = false;

    for line in collapsed.lines().map(str::trim) {
        if line.is_empty() {
            blank = !out.is_empty();
            continue;
        }
        if blank {
            out.push("");
            blank = false;
        }
        out.push(line);
    }
    out.join("\n")
}

/// Find a "Last Reviewed/Updated: MM/DD/YYYY" marker and return it as ISO date
pub fn last_updated(text: &str) -> Option<String> {
    let caps = LAST_UPDATED.captures(text)?;
    let date = chrono::NaiveDate::parse_from_str(caps.get(1)?.as_str(), "%m/%d/%Y").ok()?;
    Some(date.format("%Y-%m-%d").to_string())
}

/// HTTP page fetcher
#[derive(Debug, Clone)]
pub struct PageFetcher {
    client: reqwest::Client,
}

impl PageFetcher {
    pub fn new() -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(FETCH_TIMEOUT)
            .build()
            .map_err(|e| FetchError::Client(e.to_string()))?;
        Ok(Self { client })
    }

    /// Fetch a page and reduce it to text
    pub async fn fetch(&self, url: &str, title_fallback: &str) -> Result<FetchedPage, FetchError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| FetchError::Http {
                url: url.to_string(),
                message: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let html = response.text().await.map_err(|e| FetchError::Http {
            url: url.to_string(),
            message: e.to_string(),
        })?;

        let page = FetchedPage::from_html(url, &html, title_fallback);
        tracing::debug!(url, chars = page.text.len(), raw_hash = %page.raw_hash, "Fetched page");
        Ok(page)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"<html><head><title> I-907 | USCIS </title>
<style>body { color: red }</style><script>var x = "<p>";</script></head>
<body><nav><a href="/">Home</a></nav><header>Site header</header>
<main><h1>Request for Premium Processing</h1>
<p>File Form I-907 &amp; pay the fee.</p><p>Processing&nbsp;time: 15 business days.</p>
<!-- hidden --><div>Last Reviewed/Updated: 02/05/2025</div></main>
<footer>Footer links</footer></body></html>"#;

    #[test]
    fn test_html_to_text_drops_chrome() {
        let text = html_to_text(PAGE);
        assert!(text.contains("Request for Premium Processing"));
        assert!(text.contains("File Form I-907 & pay the fee."));
        assert!(text.contains("Processing time: 15 business days."));
        assert!(!text.contains("Home"));
        assert!(!text.contains("Site header"));
        assert!(!text.contains("Footer links"));
        assert!(!text.contains("color"));
        assert!(!text.contains("hidden"));
        assert!(!text.contains("I-907 | USCIS"));
    }

    #[test]
    fn test_block_tags_become_paragraphs() {
        let text = html_to_text(PAGE);
        let paragraphs: Vec<&str> = text.split("\n\n").collect();
        assert!(paragraphs.len() >= 3);
        assert!(!text.contains("\n\n\n"));
    }

    #[test]
    fn test_page_metadata() {
        let page = FetchedPage::from_html("https://www.uscis.gov/i-907", PAGE, "fallback");
        assert_eq!(page.title, "I-907 | USCIS");
        assert_eq!(page.last_updated.as_deref(), Some("2025-02-05"));
        assert_eq!(page.raw_hash, Hash::of_text(&page.text).to_hex());
    }

    #[test]
    fn test_title_fallback() {
        let page = FetchedPage::from_html("https://x", "<p>No title here</p>", "Fallback Title");
        assert_eq!(page.title, "Fallback Title");
    }

    #[test]
    fn test_numeric_entities() {
        assert_eq!(decode_entities("8 CFR &#167; 204.5"), "8 CFR § 204.5");
        assert_eq!(decode_entities("&#x41;&amp;lt;"), "A&lt;");
    }

    #[test]
    fn test_dropped_blocks_span_lines() {
        let html = "<p>Keep</p><SCRIPT type=\"text/javascript\">\nvar a = 1;\n</script >\n<noscript>No JS</noscript><p>Also keep</p>";
        let text = html_to_text(html);
        assert_eq!(text, "Keep\n\nAlso keep");
        assert_eq!(DROPPED_BLOCKS.len(), 6);
    }

    #[test]
    fn test_normalize_whitespace() {
        assert_eq!(
            normalize_whitespace("  a \t b \n\n\n\n c\n"),
            "a b\n\nc"
        );
    }
}
