//! Lexical stand-in reasoner: ranks story lines by word overlap instead of querying a model.
//!
//! Scores are Jaccard similarities of lowercase word sets, so they fall in `[0, 1]` like the
//! model's sequence probabilities. Search jobs report every phase a model-backed search
//! would, paced by `delay`.

use async_trait::async_trait;
use haicor_types::{
    Aspect, GraphRequest, Order, PathHit, PathRequest, PhaseSink, Reasoner, ReasonerError,
    SearchPhase, StepHit, StepRequest,
};
use std::collections::HashSet;
use std::time::Duration;

/// Longest search walked; longer requests are searched at this length.
pub const MAX_SEARCH_LENGTH: u32 = 16;

pub struct LexicalReasoner {
    delay: Duration,
}

impl LexicalReasoner {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }

    /// Pacing from `HAICOR_REASON_DELAY_MS` (default 50ms).
    pub fn from_env() -> Self {
        let ms = std::env::var("HAICOR_REASON_DELAY_MS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(50);
        Self::new(Duration::from_millis(ms))
    }

    async fn enter(&self, sink: &dyn PhaseSink, phase: SearchPhase) {
        sink.report(phase).await;
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
    }

    /// Report forward and backward steps `0..=length`, then connecting and searching.
    async fn walk_phases(&self, sink: &dyn PhaseSink, length: u32) {
        let length = length.min(MAX_SEARCH_LENGTH);
        for n in 0..=length {
            self.enter(sink, SearchPhase::Forward(n)).await;
        }
        for n in 0..=length {
            self.enter(sink, SearchPhase::Backward(n)).await;
        }
        self.enter(sink, SearchPhase::Connecting).await;
        self.enter(sink, SearchPhase::Searching).await;
    }
}

fn relation(aspect: Aspect) -> &'static str {
    match aspect {
        Aspect::Causal => "Causes/Enables",
        Aspect::Emotional => "Causes Emotion",
        Aspect::Spatial => "Enables Location",
        Aspect::Possession => "Enables Possession",
        Aspect::Miscellaneous => "Relates To",
    }
}

fn words(text: &str) -> HashSet<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(|w| w.to_lowercase())
        .collect()
}

fn similarity(a: &HashSet<String>, b: &HashSet<String>) -> f64 {
    let union = a.union(b).count();
    if union == 0 {
        return 0.0;
    }
    a.intersection(b).count() as f64 / union as f64
}

fn context_lines(context: &[String]) -> Result<Vec<&str>, ReasonerError> {
    let lines: Vec<&str> = context
        .iter()
        .map(|l| l.trim())
        .filter(|l| !l.is_empty())
        .collect();
    if lines.is_empty() {
        return Err(ReasonerError::EmptyContext);
    }
    Ok(lines)
}

fn sort_by_score<T>(items: &mut [T], score: impl Fn(&T) -> f64) {
    items.sort_by(|a, b| score(b).total_cmp(&score(a)));
}

/// Beam search over context lines. A path starts at one of `starts`, visits up to `hops`
/// distinct lines, and ends at `target`; its score is the mean similarity of its edges.
fn search_paths(
    starts: Vec<Vec<usize>>,
    nodes: &[&str],
    target: &str,
    hops: usize,
    branch: usize,
    total: usize,
) -> Vec<PathHit> {
    let bags: Vec<HashSet<String>> = nodes.iter().map(|n| words(n)).collect();
    let target_bag = words(target);
    let edge_mean = |path: &[usize]| {
        let mut sims: Vec<f64> = path
            .windows(2)
            .map(|w| similarity(&bags[w[0]], &bags[w[1]]))
            .collect();
        if let Some(&last) = path.last() {
            sims.push(similarity(&bags[last], &target_bag));
        }
        sims.iter().sum::<f64>() / sims.len().max(1) as f64
    };

    let beam = branch.max(1) * total.max(1);
    let mut beams = starts;
    let mut finished: Vec<Vec<usize>> = beams.clone();
    for _ in 0..hops {
        let mut next = Vec::new();
        for path in &beams {
            let Some(&last) = path.last() else { continue };
            let mut candidates: Vec<usize> =
                (0..nodes.len()).filter(|i| !path.contains(i)).collect();
            sort_by_score(&mut candidates, |&i| similarity(&bags[last], &bags[i]));
            for i in candidates.into_iter().take(branch.max(1)) {
                let mut extended = path.clone();
                extended.push(i);
                next.push(extended);
            }
        }
        if next.is_empty() {
            break;
        }
        sort_by_score(&mut next, |p| edge_mean(p.as_slice()));
        next.truncate(beam);
        finished.extend(next.iter().cloned());
        beams = next;
    }

    let mut hits: Vec<PathHit> = finished
        .into_iter()
        .map(|path| PathHit {
            score: edge_mean(path.as_slice()),
            path: path
                .iter()
                .map(|&i| nodes[i].to_string())
                .chain(std::iter::once(target.trim().to_string()))
                .collect(),
        })
        .collect();
    sort_by_score(&mut hits, |h| h.score);
    hits.dedup_by(|a, b| a.path == b.path);
    hits.truncate(total);
    hits
}

#[async_trait]
impl Reasoner for LexicalReasoner {
    async fn step(&self, req: &StepRequest) -> Result<Vec<StepHit>, ReasonerError> {
        tracing::debug!(prompt = %req.prompt(), "step inference");
        let lines = context_lines(&req.context)?;
        let question = req.question.trim();
        let q = words(question);
        let rel = relation(req.aspect);
        let mut hits: Vec<StepHit> = lines
            .into_iter()
            .filter(|line| *line != question)
            .map(|line| StepHit {
                score: similarity(&q, &words(line)),
                text: match req.order {
                    Order::Forward => format!("{} >{}> {}", question, rel, line),
                    Order::Backward => format!("{} >{}> {}", line, rel, question),
                },
            })
            .collect();
        sort_by_score(&mut hits, |h| h.score);
        hits.truncate(req.number as usize);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        Ok(hits)
    }

    async fn path(
        &self,
        req: &PathRequest,
        sink: &dyn PhaseSink,
    ) -> Result<Vec<PathHit>, ReasonerError> {
        let lines = context_lines(&req.context)?;
        self.walk_phases(sink, req.length).await;
        let source = req.source.trim();
        let target = req.target.trim();
        let mut nodes = vec![source];
        nodes.extend(lines.into_iter().filter(|l| *l != source && *l != target));
        Ok(search_paths(
            vec![vec![0]],
            &nodes,
            &req.target,
            req.length.min(MAX_SEARCH_LENGTH) as usize,
            req.branch as usize,
            req.total as usize,
        ))
    }

    async fn graph(
        &self,
        req: &GraphRequest,
        sink: &dyn PhaseSink,
    ) -> Result<Vec<PathHit>, ReasonerError> {
        let lines = context_lines(&req.context)?;
        self.walk_phases(sink, req.length).await;
        let starts = (0..lines.len()).map(|i| vec![i]).collect();
        let hops = (req.length.min(MAX_SEARCH_LENGTH) as usize).saturating_sub(1);
        Ok(search_paths(
            starts,
            &lines,
            &req.target,
            hops,
            req.branch as usize,
            req.total as usize,
        ))
    }
}
