//! Editable story context and result formatting.

use haicor_types::{Story, STORY_LINES};

const MODIFIED_SUFFIX: &str = " (modified)";

/// Story being edited before it is used as inference context.
///
/// A draft loaded from the catalog keeps its uuid until the first edit; editing a line of a
/// catalog story marks the title as modified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoryDraft {
    pub uuid: Option<String>,
    pub title: String,
    pub lines: Vec<String>,
}

impl Default for StoryDraft {
    fn default() -> Self {
        Self {
            uuid: None,
            title: String::new(),
            lines: vec![String::new(); STORY_LINES],
        }
    }
}

impl StoryDraft {
    /// Draft from a catalog story. Missing fields fall back to an empty draft's.
    pub fn from_story(story: Story) -> Self {
        let empty = Self::default();
        Self {
            uuid: Some(story.uuid),
            title: story.title.unwrap_or(empty.title),
            lines: story.lines.unwrap_or(empty.lines),
        }
    }

    pub fn is_catalog_story(&self) -> bool {
        self.uuid.is_some()
    }

    pub fn set_title(&mut self, title: impl Into<String>) {
        self.uuid = None;
        self.title = title.into();
    }

    /// Replace line `index`; out-of-range indices are ignored.
    pub fn set_line(&mut self, index: usize, value: impl Into<String>) {
        let Some(line) = self.lines.get_mut(index) else {
            return;
        };
        *line = value.into();
        self.mark_edited();
    }

    /// Replace every line at once; a catalog story is marked modified like [`Self::set_line`].
    pub fn replace_lines(&mut self, lines: Vec<String>) {
        self.lines = lines;
        self.mark_edited();
    }

    fn mark_edited(&mut self) {
        if self.uuid.take().is_some() {
            self.title.push_str(MODIFIED_SUFFIX);
        }
    }

    /// Lines to send as inference context.
    pub fn context(&self) -> Vec<String> {
        self.lines.clone()
    }
}

/// Score as a percentage with three decimals, e.g. `0.91234` → `"91.234"`.
pub fn format_score(score: f64) -> String {
    format!("{:.3}", score * 100.0)
}

/// Step inference text split as `subject >relation> object`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Inference<'a> {
    pub subject: &'a str,
    pub relation: &'a str,
    pub object: &'a str,
}

impl<'a> Inference<'a> {
    /// Split on the last two `>`; every part must be non-empty.
    pub fn parse(text: &'a str) -> Option<Self> {
        let mut parts = text.rsplitn(3, '>');
        let object = parts.next()?;
        let relation = parts.next()?;
        let subject = parts.next()?;
        if subject.is_empty() || relation.is_empty() || object.is_empty() {
            return None;
        }
        Some(Self {
            subject,
            relation,
            object,
        })
    }
}
