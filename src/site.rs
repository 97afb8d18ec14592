//! Page classification for newznab indexers and per-host opt-outs.

use crate::app::config::DetectionConfig;
use crate::store::{Store, StoreResult, keys};
use regex::Regex;
use serde::Serialize;
use std::sync::LazyLock;
use url::Url;

static HOST_KEY_RE: LazyLock<Result<Regex, regex::Error>> =
    LazyLock::new(|| Regex::new(r"([^.]+)\.\w{2,3}(?:\.\w{2})?$"));

/// What to do with a page the user opened
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PageAction {
    /// Page belongs to a configured newznab indexer
    Newznab,
    /// Unknown site; probe it for newznab markup
    AutoDetect,
    Ignore,
}

/// Registrable part of a URL's host (`www.nzb.example.co.uk` → `example.co.uk`)
pub fn host_key(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    let host = parsed.host_str()?;
    let re = HOST_KEY_RE.as_ref().ok()?;
    re.find(host).map(|m| m.as_str().to_string())
}

/// Decide how a page should be handled
pub async fn classify(url: &str, detection: &DetectionConfig, store: &Store) -> PageAction {
    if !(url.starts_with("http://") || url.starts_with("https://")) {
        return PageAction::Ignore;
    }

    let configured = detection
        .newznab_sites
        .iter()
        .map(|site| site.trim())
        .any(|site| !site.is_empty() && url.contains(site));
    if configured {
        return PageAction::Newznab;
    }

    if !detection.automatic_detection {
        return PageAction::Ignore;
    }

    let Some(host) = host_key(url) else {
        return PageAction::AutoDetect;
    };
    if store.get_flag(&keys::nab_ignore(&host)).await {
        tracing::debug!("Auto-detection disabled for {}", host);
        PageAction::Ignore
    } else {
        PageAction::AutoDetect
    }
}

/// Stop auto-detection on a host
pub async fn ignore_host(store: &Store, host: &str) -> StoreResult<()> {
    store.set(&keys::nab_ignore(host), true).await?;
    tracing::info!("Ignoring host {} for auto-detection", host);
    Ok(())
}

pub async fn unignore_host(store: &Store, host: &str) -> StoreResult<()> {
    store.remove(&keys::nab_ignore(host)).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_host_key() {
        assert_eq!(host_key("https://www.example.com/path"), Some("example.com".into()));
        assert_eq!(
            host_key("http://nzb.indexer.co.uk/browse"),
            Some("indexer.co.uk".into())
        );
        assert_eq!(host_key("http://localhost:8080/"), None);
        assert_eq!(host_key("not a url"), None);
    }

    #[tokio::test]
    async fn test_classify_configured_site() {
        let store = Store::in_memory();
        let detection = DetectionConfig {
            newznab_sites: vec![" nzb.example.org ".into(), "".into()],
            automatic_detection: false,
        };

        assert_eq!(
            classify("https://nzb.example.org/details/1", &detection, &store).await,
            PageAction::Newznab
        );
        assert_eq!(
            classify("https://other.example.net/", &detection, &store).await,
            PageAction::Ignore
        );
    }

    #[tokio::test]
    async fn test_classify_non_http_is_ignored() {
        let store = Store::in_memory();
        assert_eq!(
            classify("file:///tmp/x", &DetectionConfig::default(), &store).await,
            PageAction::Ignore
        );
    }

    #[tokio::test]
    async fn test_ignored_host_skips_auto_detection() {
        let store = Store::in_memory();
        let detection = DetectionConfig::default();
        let url = "https://www.someindexer.com/search";

        assert_eq!(classify(url, &detection, &store).await, PageAction::AutoDetect);

        ignore_host(&store, "someindexer.com").await.unwrap();
        assert_eq!(classify(url, &detection, &store).await, PageAction::Ignore);

        unignore_host(&store, "someindexer.com").await.unwrap();
        assert_eq!(classify(url, &detection, &store).await, PageAction::AutoDetect);
    }
}
