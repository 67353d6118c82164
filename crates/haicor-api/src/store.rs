//! Story catalog storage: a built-in seed and a JSONL file store.

use async_trait::async_trait;
use haicor_types::{Story, StoryStore, StoryStoreError, StoryTitle};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// One catalog story; also the line format of the JSONL store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoryRecord {
    pub uuid: String,
    pub title: String,
    pub lines: Vec<String>,
}

impl From<StoryRecord> for Story {
    fn from(r: StoryRecord) -> Self {
        Story {
            uuid: r.uuid,
            title: Some(r.title),
            lines: Some(r.lines),
        }
    }
}

fn sorted_titles<'a>(records: impl Iterator<Item = &'a StoryRecord>) -> Vec<StoryTitle> {
    let mut titles: Vec<StoryTitle> = records
        .map(|r| StoryTitle {
            uuid: r.uuid.clone(),
            title: r.title.clone(),
        })
        .collect();
    titles.sort_by(|a, b| a.title.cmp(&b.title).then_with(|| a.uuid.cmp(&b.uuid)));
    titles
}

/// Stories held in memory (process lifetime only).
pub struct InMemoryStoryStore {
    stories: HashMap<String, StoryRecord>,
}

impl InMemoryStoryStore {
    pub fn new(records: Vec<StoryRecord>) -> Self {
        Self {
            stories: records.into_iter().map(|r| (r.uuid.clone(), r)).collect(),
        }
    }

    /// Small built-in catalog used when no story file is configured.
    pub fn seeded() -> Self {
        let story = |uuid: &str, title: &str, lines: [&str; 5]| StoryRecord {
            uuid: uuid.to_string(),
            title: title.to_string(),
            lines: lines.iter().map(|l| l.to_string()).collect(),
        };
        Self::new(vec![
            story(
                "7c1e4b52-3f0a-4d8e-9a61-2b5d8f0c9e11",
                "Late for Work",
                [
                    "Tom woke up late.",
                    "Tom missed the bus.",
                    "The bus left without Tom.",
                    "Tom walked to work.",
                    "Tom was late for work.",
                ],
            ),
            story(
                "a39d0f6e-8b27-4c15-b0d4-5e7f1a2c3b48",
                "The Lost Dog",
                [
                    "Anna's dog ran away.",
                    "Anna searched the park.",
                    "Anna put up posters.",
                    "A neighbor called Anna.",
                    "Anna found her dog.",
                ],
            ),
            story(
                "e5b82c97-1d4f-4a63-8f0e-9c6a7b2d1f35",
                "Birthday Cake",
                [
                    "Sam wanted to bake a cake.",
                    "Sam bought flour and eggs.",
                    "Sam baked the cake.",
                    "The cake burned in the oven.",
                    "Sam bought a cake instead.",
                ],
            ),
        ])
    }
}

#[async_trait]
impl StoryStore for InMemoryStoryStore {
    async fn list(&self) -> Result<Vec<StoryTitle>, StoryStoreError> {
        Ok(sorted_titles(self.stories.values()))
    }

    async fn get(&self, uuid: &str) -> Result<Option<Story>, StoryStoreError> {
        Ok(self.stories.get(uuid).cloned().map(Story::from))
    }
}

/// JSONL file-backed store: one `{uuid, title, lines}` object per line. Re-read on every
/// call; malformed lines are skipped.
pub struct JsonlStoryStore {
    path: PathBuf,
}

impl JsonlStoryStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    async fn load(&self) -> Result<Vec<StoryRecord>, StoryStoreError> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(StoryStoreError::Other(e.to_string())),
        };
        let mut out = Vec::new();
        for (n, line) in content.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            match serde_json::from_str::<StoryRecord>(line) {
                Ok(r) => out.push(r),
                Err(e) => tracing::warn!(line = n + 1, error = %e, "skipping story record"),
            }
        }
        Ok(out)
    }
}

#[async_trait]
impl StoryStore for JsonlStoryStore {
    async fn list(&self) -> Result<Vec<StoryTitle>, StoryStoreError> {
        let records = self.load().await?;
        Ok(sorted_titles(records.iter()))
    }

    async fn get(&self, uuid: &str) -> Result<Option<Story>, StoryStoreError> {
        Ok(self
            .load()
            .await?
            .into_iter()
            .find(|r| r.uuid == uuid)
            .map(Story::from))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn seed_is_sorted_by_title() {
        let store = InMemoryStoryStore::seeded();
        let titles: Vec<String> = store
            .list()
            .await
            .unwrap()
            .into_iter()
            .map(|t| t.title)
            .collect();
        assert_eq!(titles, vec!["Birthday Cake", "Late for Work", "The Lost Dog"]);
    }

    #[tokio::test]
    async fn unknown_uuid_is_none() {
        let store = InMemoryStoryStore::seeded();
        assert!(store.get("nope").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn jsonl_store_skips_bad_lines() {
        let path = std::env::temp_dir().join(format!("haicor-stories-{}.jsonl", std::process::id()));
        let content = [
            r#"{"uuid":"b","title":"Zoo","lines":["1","2","3","4","5"]}"#,
            "not json",
            "",
            r#"{"uuid":"a","title":"Attic","lines":["a","b","c","d","e"]}"#,
        ]
        .join("\n");
        tokio::fs::write(&path, content).await.unwrap();

        let store = JsonlStoryStore::new(&path);
        let list = store.list().await.unwrap();
        assert_eq!(list.len(), 2);
        assert_eq!(list[0].title, "Attic");
        let story = store.get("b").await.unwrap().unwrap();
        assert_eq!(story.title.as_deref(), Some("Zoo"));
        assert_eq!(story.lines.unwrap().len(), 5);

        tokio::fs::remove_file(&path).await.unwrap();
    }

    #[tokio::test]
    async fn missing_file_is_empty_catalog() {
        let store = JsonlStoryStore::new("/nonexistent/haicor/stories.jsonl");
        assert!(store.list().await.unwrap().is_empty());
    }
}
