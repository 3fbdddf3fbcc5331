// src/crawl/layout.rs
// =============================================================================
// Builds the URLs of the results API.
//
// The API has two parallel trees that share the same path structure:
//
//   listings: {base}/wilayah/pemilu/ppwp/11/1101/110101/1101012001.json
//   results:  {base}/pemilu/hhcw/ppwp/11/1101/110101/1101012001/1101012001001.json
//
// A crawl carries a "directory" prefix (always ending in '/') down the tree.
// The listing of a node is `{dir}{code}.json` and its children live under
// `{dir}{code}/`. A polling unit's result document is found by swapping the
// listing segment for the result segment in its parent's directory.
// =============================================================================

use anyhow::{bail, Context, Result};
use url::Url;

pub const DEFAULT_BASE_URL: &str = "https://sirekap-obj-data.kpu.go.id/wilayah/pemilu/ppwp/";
pub const DEFAULT_LISTING_SEGMENT: &str = "wilayah/pemilu/ppwp";
pub const DEFAULT_RESULT_SEGMENT: &str = "pemilu/hhcw/ppwp";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlLayout {
    base: String,
    listing_segment: String,
    result_segment: String,
}

impl UrlLayout {
    // Validates and builds a layout
    //
    // The base must be an absolute http(s) URL that contains the listing
    // segment, otherwise no result URL could ever be derived from it.
    pub fn new(base: &str, listing_segment: &str, result_segment: &str) -> Result<Self> {
        let parsed = Url::parse(base).with_context(|| format!("Invalid base URL '{}'", base))?;
        if parsed.scheme() != "http" && parsed.scheme() != "https" {
            bail!("Base URL must be http(s): {}", base);
        }

        let listing_segment = listing_segment.trim_matches('/');
        let result_segment = result_segment.trim_matches('/');
        if listing_segment.is_empty() || result_segment.is_empty() {
            bail!("Listing and result path segments must not be empty");
        }
        if !parsed.path().contains(listing_segment) {
            bail!(
                "Base URL '{}' does not contain the listing segment '{}'",
                base,
                listing_segment
            );
        }

        // Normalize to a trailing slash so `{dir}{code}` always works
        let mut base = parsed.to_string();
        if !base.ends_with('/') {
            base.push('/');
        }

        Ok(Self {
            base,
            listing_segment: listing_segment.to_string(),
            result_segment: result_segment.to_string(),
        })
    }

    /// Directory the root's children are listed under
    pub fn root_dir(&self) -> &str {
        &self.base
    }

    /// Listing URL of the root
    pub fn root_listing(&self, root_code: &str) -> String {
        self.listing(&self.base, root_code)
    }

    /// `{dir}{code}.json`
    pub fn listing(&self, dir: &str, code: &str) -> String {
        format!("{}{}.json", dir, code)
    }

    /// `{dir}{code}/`
    pub fn child_dir(&self, dir: &str, code: &str) -> String {
        format!("{}{}/", dir, code)
    }

    // Result document of a polling unit listed under `units_dir`
    //
    // Only the first occurrence of the listing segment is replaced.
    pub fn result(&self, units_dir: &str, code: &str) -> String {
        let result_dir = units_dir.replacen(&self.listing_segment, &self.result_segment, 1);
        format!("{}{}.json", result_dir, code)
    }
}

impl Default for UrlLayout {
    fn default() -> Self {
        Self {
            base: DEFAULT_BASE_URL.to_string(),
            listing_segment: DEFAULT_LISTING_SEGMENT.to_string(),
            result_segment: DEFAULT_RESULT_SEGMENT.to_string(),
        }
    }
}
