//! Request and response DTOs for the story and inference endpoints.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Number of lines in a catalog story (title excluded).
pub const STORY_LINES: usize = 5;

/// One `(uuid, title)` entry of the story listing. Serialized as a two-element array.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "(String, String)", into = "(String, String)")]
pub struct StoryTitle {
    pub uuid: String,
    pub title: String,
}

impl From<(String, String)> for StoryTitle {
    fn from((uuid, title): (String, String)) -> Self {
        Self { uuid, title }
    }
}

impl From<StoryTitle> for (String, String) {
    fn from(t: StoryTitle) -> Self {
        (t.uuid, t.title)
    }
}

/// Response of `GET /api/story`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoryList {
    #[serde(default)]
    pub stories: Vec<StoryTitle>,
}

/// Response of `GET /api/story/{uuid}`. Title and lines are `None` when the uuid is unknown.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Story {
    pub uuid: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub lines: Option<Vec<String>>,
}

impl Story {
    pub fn missing(uuid: impl Into<String>) -> Self {
        Self {
            uuid: uuid.into(),
            title: None,
            lines: None,
        }
    }

    pub fn is_found(&self) -> bool {
        self.title.is_some() && self.lines.is_some()
    }
}

/// Inference task intended by a step prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Usage {
    #[default]
    General,
    Premise,
}

impl Usage {
    pub fn as_str(self) -> &'static str {
        match self {
            Usage::General => "general",
            Usage::Premise => "premise",
        }
    }
}

/// Inference direction: deduce forward or hypothesise backward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Order {
    #[default]
    Forward,
    Backward,
}

impl Order {
    pub fn as_str(self) -> &'static str {
        match self {
            Order::Forward => "forward",
            Order::Backward => "backward",
        }
    }
}

/// Inference dimension (GLUCOSE aspects).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Aspect {
    #[default]
    Causal,
    Emotional,
    Spatial,
    Possession,
    Miscellaneous,
}

impl Aspect {
    pub fn as_str(self) -> &'static str {
        match self {
            Aspect::Causal => "causal",
            Aspect::Emotional => "emotional",
            Aspect::Spatial => "spatial",
            Aspect::Possession => "possession",
            Aspect::Miscellaneous => "miscellaneous",
        }
    }
}

/// Error for parsing one of the request enums from a string.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid {kind}: {value}")]
pub struct ParseChoiceError {
    pub kind: &'static str,
    pub value: String,
}

impl FromStr for Usage {
    type Err = ParseChoiceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "general" => Ok(Usage::General),
            "premise" => Ok(Usage::Premise),
            _ => Err(ParseChoiceError {
                kind: "usage",
                value: s.to_string(),
            }),
        }
    }
}

impl FromStr for Order {
    type Err = ParseChoiceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "forward" => Ok(Order::Forward),
            "backward" => Ok(Order::Backward),
            _ => Err(ParseChoiceError {
                kind: "order",
                value: s.to_string(),
            }),
        }
    }
}

impl FromStr for Aspect {
    type Err = ParseChoiceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "causal" => Ok(Aspect::Causal),
            "emotional" => Ok(Aspect::Emotional),
            "spatial" => Ok(Aspect::Spatial),
            "possession" => Ok(Aspect::Possession),
            "miscellaneous" => Ok(Aspect::Miscellaneous),
            _ => Err(ParseChoiceError {
                kind: "aspect",
                value: s.to_string(),
            }),
        }
    }
}

impl fmt::Display for Usage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for Order {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for Aspect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Single-step inference request (`POST /api/step`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepRequest {
    #[serde(default)]
    pub usage: Usage,
    #[serde(default)]
    pub order: Order,
    #[serde(default)]
    pub aspect: Aspect,
    #[serde(default)]
    pub context: Vec<String>,
    pub question: String,
    /// Number of inferences requested.
    #[serde(default = "default_number")]
    pub number: u32,
}

fn default_number() -> u32 {
    3
}

impl StepRequest {
    pub fn new(question: impl Into<String>, context: Vec<String>) -> Self {
        Self {
            usage: Usage::default(),
            order: Order::default(),
            aspect: Aspect::default(),
            context,
            question: question.into(),
            number: default_number(),
        }
    }

    /// Language model prompt for this request.
    pub fn prompt(&self) -> String {
        let context: Vec<&str> = self.context.iter().map(|l| l.trim()).collect();
        format!(
            "glucose: {} {} {} context: {} premise: {}",
            self.usage,
            self.order,
            self.aspect,
            context.join(" "),
            self.question.trim()
        )
    }
}

/// Path inference request (`POST /api/path`): connect `source` to `target`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathRequest {
    pub source: String,
    pub target: String,
    #[serde(default)]
    pub context: Vec<String>,
    #[serde(default = "default_length")]
    pub length: u32,
    #[serde(default = "default_branch")]
    pub branch: u32,
    #[serde(default = "default_total")]
    pub total: u32,
}

/// Graph inference request (`POST /api/graph`): every path that reaches `target`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphRequest {
    pub target: String,
    #[serde(default)]
    pub context: Vec<String>,
    #[serde(default = "default_length")]
    pub length: u32,
    #[serde(default = "default_branch")]
    pub branch: u32,
    #[serde(default = "default_total")]
    pub total: u32,
}

fn default_length() -> u32 {
    2
}

fn default_branch() -> u32 {
    2
}

fn default_total() -> u32 {
    3
}

impl PathRequest {
    pub fn new(source: impl Into<String>, target: impl Into<String>, context: Vec<String>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            context,
            length: default_length(),
            branch: default_branch(),
            total: default_total(),
        }
    }
}

impl GraphRequest {
    pub fn new(target: impl Into<String>, context: Vec<String>) -> Self {
        Self {
            target: target.into(),
            context,
            length: default_length(),
            branch: default_branch(),
            total: default_total(),
        }
    }
}

/// One step inference: `[score, text]` on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "(f64, String)", into = "(f64, String)")]
pub struct StepHit {
    pub score: f64,
    pub text: String,
}

impl From<(f64, String)> for StepHit {
    fn from((score, text): (f64, String)) -> Self {
        Self { score, text }
    }
}

impl From<StepHit> for (f64, String) {
    fn from(h: StepHit) -> Self {
        (h.score, h.text)
    }
}

/// One path or graph inference: `[score, [node, ...]]` on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "(f64, Vec<String>)", into = "(f64, Vec<String>)")]
pub struct PathHit {
    pub score: f64,
    pub path: Vec<String>,
}

impl From<(f64, Vec<String>)> for PathHit {
    fn from((score, path): (f64, Vec<String>)) -> Self {
        Self { score, path }
    }
}

impl From<PathHit> for (f64, Vec<String>) {
    fn from(h: PathHit) -> Self {
        (h.score, h.path)
    }
}

/// Opaque job identifier issued by the backend on submission.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobHandle(String);

impl JobHandle {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Response of `POST /api/{step,path,graph}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobCreated {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uuid: Option<JobHandle>,
}

/// Response of `GET /api/{step,path,graph}/{uuid}`. `result` is set only once `state` is `stopped`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobStatus<R> {
    pub state: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<R>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn hits_use_array_wire_shape() {
        let hits: Vec<StepHit> = serde_json::from_value(json!([[0.9, "a"], [0.1, "b"]])).unwrap();
        assert_eq!(hits[0].score, 0.9);
        assert_eq!(hits[1].text, "b");

        let path = PathHit {
            score: 0.5,
            path: vec!["x".into(), "y".into()],
        };
        assert_eq!(serde_json::to_value(&path).unwrap(), json!([0.5, ["x", "y"]]));
    }

    #[test]
    fn story_listing_decodes_pairs() {
        let list: StoryList =
            serde_json::from_value(json!({ "stories": [["id-1", "A day out"]] })).unwrap();
        assert_eq!(list.stories[0].uuid, "id-1");
        assert_eq!(list.stories[0].title, "A day out");
    }

    #[test]
    fn unknown_story_has_null_fields() {
        let story: Story =
            serde_json::from_value(json!({ "uuid": "nope", "title": null, "lines": null }))
                .unwrap();
        assert!(!story.is_found());
        assert_eq!(story, Story::missing("nope"));
    }

    #[test]
    fn step_request_defaults_and_prompt() {
        let req: StepRequest = serde_json::from_value(json!({
            "question": " He went home. ",
            "context": [" Tom was tired.", "He left work. "]
        }))
        .unwrap();
        assert_eq!(req.number, 3);
        assert_eq!(req.aspect, Aspect::Causal);
        assert_eq!(
            req.prompt(),
            "glucose: general forward causal context: Tom was tired. He left work. premise: He went home."
        );
    }

    #[test]
    fn path_request_defaults() {
        let req: PathRequest =
            serde_json::from_value(json!({ "source": "a", "target": "b" })).unwrap();
        assert_eq!((req.length, req.branch, req.total), (2, 2, 3));
    }

    #[test]
    fn choices_parse_from_lowercase() {
        assert_eq!("premise".parse::<Usage>().unwrap(), Usage::Premise);
        assert_eq!("backward".parse::<Order>().unwrap(), Order::Backward);
        assert_eq!("spatial".parse::<Aspect>().unwrap(), Aspect::Spatial);
        assert!("Spatial".parse::<Aspect>().is_err());
    }

    #[test]
    fn status_without_result_omits_field() {
        let s: JobStatus<Vec<StepHit>> = JobStatus {
            state: "running".into(),
            result: None,
        };
        assert_eq!(serde_json::to_value(&s).unwrap(), json!({ "state": "running" }));
    }
}
