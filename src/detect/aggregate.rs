//! Folding per-frame detections into per-label evidence

use std::collections::{HashSet, VecDeque};
use std::time::{Duration, Instant};

use indexmap::IndexMap;
use serde::Deserialize;

use super::Detection;

/// How per-frame counts combine across a window
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Reducer {
    /// Largest count seen in any single frame
    ///
    /// A static object re-detected every frame counts once, while several
    /// instances visible together still count as several.
    #[default]
    Max,
    /// Total across frames
    Sum,
}

/// Labels that may ever be reported
#[derive(Debug, Clone, Default)]
pub struct AllowList {
    labels: HashSet<String>,
}

impl AllowList {
    pub fn new<I, S>(labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            labels: labels
                .into_iter()
                .map(|l| l.as_ref().trim().to_lowercase())
                .filter(|l| !l.is_empty())
                .collect(),
        }
    }

    #[must_use]
    pub fn contains(&self, label: &str) -> bool {
        self.labels.contains(label)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

/// Instances per allowed label within one frame, in detector order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FrameCounts {
    counts: IndexMap<String, usize>,
}

impl FrameCounts {
    /// Count allowed labels; everything else is dropped here, not later
    #[must_use]
    pub fn from_detections(detections: &[Detection], allow: &AllowList) -> Self {
        let mut counts = IndexMap::new();
        for detection in detections.iter().filter(|d| allow.contains(&d.label)) {
            *counts.entry(detection.label.clone()).or_insert(0) += 1;
        }
        Self { counts }
    }

    #[must_use]
    pub fn get(&self, label: &str) -> usize {
        self.counts.get(label).copied().unwrap_or(0)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, usize)> {
        self.counts.iter().map(|(label, count)| (label.as_str(), *count))
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }
}

/// Per-label count over a window, in first-seen order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AggregateResult {
    counts: IndexMap<String, usize>,
}

impl AggregateResult {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one frame's counts into the result
    pub fn fold(&mut self, frame: &FrameCounts, reducer: Reducer) {
        for (label, count) in frame.iter() {
            let entry = self.counts.entry(label.to_string()).or_insert(0);
            *entry = match reducer {
                Reducer::Max => (*entry).max(count),
                Reducer::Sum => *entry + count,
            };
        }
    }

    #[must_use]
    pub fn get(&self, label: &str) -> Option<usize> {
        self.counts.get(label).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, usize)> {
        self.counts.iter().map(|(label, count)| (label.as_str(), *count))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.counts.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Start a new window
    pub fn reset(&mut self) {
        self.counts.clear();
    }
}

impl<S: Into<String>> FromIterator<(S, usize)> for AggregateResult {
    fn from_iter<T: IntoIterator<Item = (S, usize)>>(iter: T) -> Self {
        Self {
            counts: iter.into_iter().map(|(l, c)| (l.into(), c)).collect(),
        }
    }
}

/// Bounded run of per-frame counts
///
/// Holds at most `max_frames` entries (0 = unbounded) and completes once
/// either the frame budget is reached or `budget` has elapsed (zero = no
/// time limit).
#[derive(Debug)]
pub struct DetectionWindow {
    entries: VecDeque<FrameCounts>,
    max_frames: usize,
    budget: Duration,
    started: Instant,
    observed: usize,
}

impl DetectionWindow {
    #[must_use]
    pub fn new(max_frames: usize, budget: Duration) -> Self {
        Self {
            entries: VecDeque::with_capacity(max_frames),
            max_frames,
            budget,
            started: Instant::now(),
            observed: 0,
        }
    }

    /// Record one frame, evicting the oldest entry when full
    pub fn push(&mut self, counts: FrameCounts) {
        if self.max_frames > 0 && self.entries.len() >= self.max_frames {
            self.entries.pop_front();
        }
        self.entries.push_back(counts);
        self.observed += 1;
    }

    /// Whether the frame or time budget is spent
    #[must_use]
    pub fn is_complete(&self) -> bool {
        let frames_done = self.max_frames > 0 && self.observed >= self.max_frames;
        frames_done || self.is_expired()
    }

    /// Whether the wall-clock budget has elapsed
    #[must_use]
    pub fn is_expired(&self) -> bool {
        !self.budget.is_zero() && self.started.elapsed() >= self.budget
    }

    /// Time left before the wall-clock budget elapses, if there is one
    #[must_use]
    pub fn remaining(&self) -> Option<Duration> {
        if self.budget.is_zero() {
            None
        } else {
            Some(self.budget.saturating_sub(self.started.elapsed()))
        }
    }

    /// Frames currently held
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Reduce held frames in arrival order
    #[must_use]
    pub fn aggregate(&self, reducer: Reducer) -> AggregateResult {
        let mut result = AggregateResult::new();
        for counts in &self.entries {
            result.fold(counts, reducer);
        }
        result
    }
}

/// The most prominent allowed object in one frame
#[derive(Debug, Clone, PartialEq)]
pub struct Sighting {
    pub label: String,
    /// Instances of `label` in the frame
    pub count: usize,
    /// Best confidence among those instances
    pub confidence: f32,
}

/// Pick the most prominent allowed label
///
/// Ranked by instance count, then confidence; exact ties keep the label the
/// detector reported first.
#[must_use]
pub fn pick_prominent(detections: &[Detection], allow: &AllowList) -> Option<Sighting> {
    let mut grouped: IndexMap<&str, (usize, f32)> = IndexMap::new();
    for detection in detections.iter().filter(|d| allow.contains(&d.label)) {
        let entry = grouped.entry(detection.label.as_str()).or_insert((0, 0.0));
        entry.0 += 1;
        entry.1 = entry.1.max(detection.confidence);
    }

    let mut best: Option<Sighting> = None;
    for (label, (count, confidence)) in grouped {
        let better = best.as_ref().is_none_or(|b| {
            count > b.count || (count == b.count && confidence > b.confidence)
        });
        if better {
            best = Some(Sighting {
                label: label.to_string(),
                count,
                confidence,
            });
        }
    }
    best
}
