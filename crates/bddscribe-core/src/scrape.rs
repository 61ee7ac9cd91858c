//! Swagger UI page scraping and operation-block chunking.
//!
//! The documentation page is fetched once; the markup is then split into one
//! HTML fragment per documented operation by locating Swagger UI's
//! `opblock opblock-<method>` containers and extracting each balanced
//! `<div>` block. Pages that render operations differently are retried with
//! a configurable list of fallback CSS classes.
//!
//! Zero chunks is not an error here — the pipeline applies the single
//! zero-endpoint fatal check after extraction and assembly.

use std::time::Duration;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{Error, Result};

/// Opening tag of a Swagger UI operation block, any HTTP method.
static OPBLOCK_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"<div[^>]*class="[^"]*\bopblock\b[^"]*\bopblock-(get|post|put|delete|patch)\b[^"]*""#)
        .expect("opblock regex must compile")
});

/// Fetch a Swagger UI page and split it into per-operation HTML chunks.
pub async fn scrape_swagger_ui(
    client: &reqwest::Client,
    url: &str,
    timeout: Duration,
    fallback_selectors: &[String],
) -> Result<Vec<String>> {
    log::info!("Fetching Swagger UI page from {}", url);

    let response = client
        .get(url)
        .timeout(timeout)
        .send()
        .await
        .map_err(|e| Error::scrape(format!("Failed to fetch Swagger UI page from {}: {}", url, e)))?;

    if !response.status().is_success() {
        return Err(Error::scrape(format!(
            "Failed to fetch Swagger UI page from {}: HTTP {}",
            url,
            response.status()
        )));
    }

    let html = response
        .text()
        .await
        .map_err(|e| Error::scrape(format!("Failed to read page body from {}: {}", url, e)))?;

    let chunks = split_operation_blocks(&html, fallback_selectors);
    if chunks.is_empty() {
        log::warn!(
            "Could not find any API operations at {}. The page might not be a Swagger UI, \
             or the selectors might need adjustment.",
            url
        );
    } else {
        log::info!("Found {} operation block(s)", chunks.len());
    }
    Ok(chunks)
}

/// Split raw markup into per-operation chunks.
///
/// Tries the standard `opblock` containers first; when none match, walks the
/// fallback class list in order and returns the hits of the first class that
/// matches anything (the page may be an older or customized Swagger UI).
pub fn split_operation_blocks(html: &str, fallback_selectors: &[String]) -> Vec<String> {
    let mut chunks: Vec<String> = OPBLOCK_RE
        .find_iter(html)
        .filter_map(|m| balanced_div_block(html, m.start()))
        .map(str::to_string)
        .collect();

    if chunks.is_empty() {
        log::warn!("No operation blocks found with standard selectors, trying fallbacks");
        for class in fallback_selectors {
            let pattern = format!(r#"<div[^>]*class="[^"]*\b{}\b[^"]*""#, regex::escape(class));
            let re = match Regex::new(&pattern) {
                Ok(re) => re,
                Err(e) => {
                    log::warn!("Skipping fallback selector '{}': {}", class, e);
                    continue;
                }
            };
            chunks = re
                .find_iter(html)
                .filter_map(|m| balanced_div_block(html, m.start()))
                .map(str::to_string)
                .collect();
            if !chunks.is_empty() {
                log::info!("Fallback selector '{}' matched {} block(s)", class, chunks.len());
                break;
            }
        }
    }

    chunks
}

/// Extract the balanced `<div>...</div>` block starting at `start`.
///
/// Scans byte-wise; `start` must sit on the `<` of an opening div tag.
/// Returns `None` for truncated markup.
fn balanced_div_block(html: &str, start: usize) -> Option<&str> {
    let bytes = html.as_bytes();
    let mut depth = 0usize;
    let mut i = start;

    while i < bytes.len() {
        let rest = &bytes[i..];
        if rest.starts_with(b"<div")
            && matches!(rest.get(4), Some(b' ' | b'>' | b'\t' | b'\n' | b'\r'))
        {
            depth += 1;
            i += 4;
        } else if rest.starts_with(b"</div>") {
            depth = depth.saturating_sub(1);
            i += 6;
            if depth == 0 {
                return Some(&html[start..i]);
            }
        } else {
            i += 1;
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fallbacks() -> Vec<String> {
        vec![
            "operation-tag-content".to_string(),
            "opblock-summary".to_string(),
        ]
    }

    #[test]
    fn test_split_standard_opblocks() {
        let html = r#"
<div id="swagger-ui">
  <div class="opblock opblock-get is-open">
    <div class="opblock-summary">GET /BookStore/v1/Books</div>
  </div>
  <div class="opblock opblock-post">
    <div class="opblock-summary">POST /Account/v1/User</div>
  </div>
</div>"#;
        let chunks = split_operation_blocks(html, &fallbacks());
        assert_eq!(chunks.len(), 2);
        assert!(chunks[0].contains("GET /BookStore/v1/Books"));
        assert!(chunks[0].ends_with("</div>"));
        assert!(chunks[1].contains("POST /Account/v1/User"));
    }

    #[test]
    fn test_fallback_selectors_used_when_no_opblocks() {
        let html = r#"
<div class="wrapper">
  <div class="opblock-summary">GET /Account/v1/User</div>
</div>"#;
        let chunks = split_operation_blocks(html, &fallbacks());
        assert_eq!(chunks.len(), 1);
        assert!(chunks[0].contains("GET /Account/v1/User"));
    }

    #[test]
    fn test_no_blocks_yields_empty() {
        let chunks = split_operation_blocks("<html><body>nothing here</body></html>", &fallbacks());
        assert!(chunks.is_empty());
    }

    #[test]
    fn test_balanced_block_handles_nesting() {
        let html = r#"<div class="opblock opblock-get"><div><div>deep</div></div></div><p>after</p>"#;
        let chunks = split_operation_blocks(html, &[]);
        assert_eq!(chunks.len(), 1);
        assert_eq!(
            chunks[0],
            r#"<div class="opblock opblock-get"><div><div>deep</div></div></div>"#
        );
    }

    #[test]
    fn test_truncated_markup_is_dropped() {
        let html = r#"<div class="opblock opblock-get"><div>never closed"#;
        let chunks = split_operation_blocks(html, &[]);
        assert!(chunks.is_empty());
    }
}
