//! Story catalog cache with paged title ranges.
//!
//! The catalog is an explicit value owned by the caller: it is filled once by
//! [`StoryCatalog::load`] and only changes on [`StoryCatalog::refresh`].

use crate::client::ReasonClient;
use haicor_types::{StoryError, StoryTitle};

/// Titles per range page.
pub const PAGE_SIZE: usize = 1000;

/// One page of the title listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoryRange {
    /// Page index as a string; pass to [`StoryCatalog::titles`].
    pub key: String,
    /// `"{start} - {end}"`, end exclusive.
    pub label: String,
}

#[derive(Debug, Clone, Default)]
pub struct StoryCatalog {
    titles: Vec<StoryTitle>,
}

impl StoryCatalog {
    pub fn from_titles(titles: Vec<StoryTitle>) -> Self {
        Self { titles }
    }

    pub async fn load(client: &ReasonClient) -> Result<Self, StoryError> {
        let titles = client.list_stories().await?;
        tracing::debug!(stories = titles.len(), "story catalog loaded");
        Ok(Self { titles })
    }

    /// Re-fetch the listing, replacing the cached titles.
    pub async fn refresh(&mut self, client: &ReasonClient) -> Result<(), StoryError> {
        self.titles = client.list_stories().await?;
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.titles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.titles.is_empty()
    }

    pub fn ranges(&self) -> Vec<StoryRange> {
        let n = self.titles.len();
        (0..n.div_ceil(PAGE_SIZE))
            .map(|i| StoryRange {
                key: i.to_string(),
                label: format!("{} - {}", i * PAGE_SIZE, ((i + 1) * PAGE_SIZE).min(n)),
            })
            .collect()
    }

    /// Titles of the page keyed `range`. A page past the end is empty.
    pub fn titles(&self, range: &str) -> Result<&[StoryTitle], StoryError> {
        let page: usize = range
            .trim()
            .parse()
            .map_err(|_| StoryError::InvalidRange(range.to_string()))?;
        let start = page.saturating_mul(PAGE_SIZE).min(self.titles.len());
        let end = start.saturating_add(PAGE_SIZE).min(self.titles.len());
        Ok(&self.titles[start..end])
    }

    pub fn find(&self, uuid: &str) -> Option<&StoryTitle> {
        self.titles.iter().find(|t| t.uuid == uuid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ClientConfig;
    use crate::mock::ScriptedTransport;
    use serde_json::json;
    use std::sync::Arc;

    fn catalog(n: usize) -> StoryCatalog {
        StoryCatalog::from_titles(
            (0..n)
                .map(|i| StoryTitle {
                    uuid: format!("u{}", i),
                    title: format!("t{:05}", i),
                })
                .collect(),
        )
    }

    #[test]
    fn ranges_page_by_thousand() {
        let c = catalog(2500);
        let labels: Vec<String> = c.ranges().into_iter().map(|r| r.label).collect();
        assert_eq!(labels, vec!["0 - 1000", "1000 - 2000", "2000 - 2500"]);
        assert_eq!(c.ranges()[2].key, "2");
    }

    #[test]
    fn exact_multiple_has_no_empty_page() {
        assert_eq!(catalog(2000).ranges().len(), 2);
        assert!(catalog(0).ranges().is_empty());
    }

    #[test]
    fn titles_slice_the_page() {
        let c = catalog(2500);
        let page = c.titles("2").unwrap();
        assert_eq!(page.len(), 500);
        assert_eq!(page[0].uuid, "u2000");
        assert_eq!(c.titles("1").unwrap().len(), 1000);
        assert!(c.titles("9").unwrap().is_empty());
    }

    #[test]
    fn bad_range_key_is_rejected() {
        assert!(matches!(
            catalog(10).titles("first"),
            Err(StoryError::InvalidRange(_))
        ));
    }

    #[tokio::test]
    async fn load_and_refresh_use_the_listing() {
        let t = Arc::new(
            ScriptedTransport::new().on_get("/api/story", json!({ "stories": [["a", "Alpha"]] })),
        );
        let client = ReasonClient::new(t.clone(), ClientConfig::default());
        let mut c = StoryCatalog::load(&client).await.unwrap();
        assert_eq!(c.len(), 1);
        assert_eq!(c.find("a").unwrap().title, "Alpha");
        c.refresh(&client).await.unwrap();
        assert_eq!(t.calls().len(), 2);
    }
}
