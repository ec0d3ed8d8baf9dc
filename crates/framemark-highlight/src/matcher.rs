//! Evidence phrase location.
//!
//! Finds where cited evidence phrases occur in an article body. Each phrase
//! is tried in three passes, stopping at the first that succeeds:
//!
//! 1. literal, case-insensitive substring
//! 2. the phrase's word sequence with any run of non-word characters
//!    between words (`"abuse, of power"` matches `"abuse of  power"`)
//! 3. optionally, the best-scoring window of text words whose similarity
//!    ratio to the phrase reaches the configured threshold
//!
//! Every phrase contributes at most one candidate span. Overlapping
//! candidates are resolved greedily: earliest start wins, then the longer
//! span, then the phrase listed first.

use framemark_core::{defaults, EvidencePhrase, FuzzyConfig, Span};
use once_cell::sync::Lazy;
use regex::{Regex, RegexBuilder};
use similar::TextDiff;
use tracing::{debug, trace, warn};

static WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"\w+").expect("valid word pattern"));

/// Options controlling how phrases are located.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchOptions {
    /// Fall back to approximate matching when both exact passes fail
    pub fuzzy: bool,
    /// Minimum similarity ratio for a fuzzy window to be accepted
    pub threshold: f32,
    /// Window sizes tried: phrase word count +/- `slack`
    pub slack: usize,
}

impl Default for MatchOptions {
    fn default() -> Self {
        Self {
            fuzzy: defaults::FUZZY_ENABLED,
            threshold: defaults::FUZZY_THRESHOLD,
            slack: defaults::FUZZY_SLACK_WORDS,
        }
    }
}

impl MatchOptions {
    /// Exact passes only.
    pub fn exact() -> Self {
        Self {
            fuzzy: false,
            ..Self::default()
        }
    }
}

impl From<&FuzzyConfig> for MatchOptions {
    fn from(config: &FuzzyConfig) -> Self {
        Self {
            fuzzy: config.enabled,
            threshold: config.threshold,
            slack: config.slack,
        }
    }
}

/// How a phrase was found.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MatchKind {
    Literal,
    Flexible,
    /// Approximate match with its similarity ratio
    Fuzzy(f32),
}

/// A located occurrence of one phrase.
#[derive(Debug, Clone, PartialEq)]
pub struct PhraseMatch {
    pub start: usize,
    pub end: usize,
    pub kind: MatchKind,
}

/// Locates evidence phrases in text.
#[derive(Debug, Clone, Default)]
pub struct SpanMatcher {
    options: MatchOptions,
}

impl SpanMatcher {
    pub fn new(options: MatchOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &MatchOptions {
        &self.options
    }

    /// Non-overlapping spans for `phrases` in `text`, sorted by start.
    ///
    /// Phrases that are blank after trimming, or that match nowhere, are
    /// skipped silently.
    pub fn find_spans(&self, text: &str, phrases: &[EvidencePhrase]) -> Vec<Span> {
        let mut candidates = Vec::with_capacity(phrases.len());

        for phrase in phrases {
            let needle = phrase.text.trim();
            if needle.is_empty() {
                continue;
            }
            match self.locate(text, needle) {
                Some(found) => {
                    trace!(tag = %phrase.tag, start = found.start, end = found.end, kind = ?found.kind, "Phrase located");
                    candidates.push(Span::new(found.start, found.end, phrase.tag.clone()));
                }
                None => {
                    trace!(tag = %phrase.tag, phrase = needle, "Phrase not found");
                }
            }
        }

        let spans = resolve_overlaps(candidates);
        debug!(
            phrase_count = phrases.len(),
            span_count = spans.len(),
            "Evidence spans selected"
        );
        spans
    }

    /// First acceptable occurrence of a single phrase.
    pub fn locate(&self, text: &str, phrase: &str) -> Option<PhraseMatch> {
        let phrase = phrase.trim();
        if phrase.is_empty() || text.is_empty() {
            return None;
        }

        if let Some((start, end)) = find_literal(text, phrase) {
            return Some(PhraseMatch {
                start,
                end,
                kind: MatchKind::Literal,
            });
        }

        if let Some((start, end)) = find_flexible(text, phrase) {
            return Some(PhraseMatch {
                start,
                end,
                kind: MatchKind::Flexible,
            });
        }

        if self.options.fuzzy {
            if let Some((start, end, score)) =
                find_fuzzy(text, phrase, self.options.threshold, self.options.slack)
            {
                debug!(phrase, score, "Fuzzy evidence match accepted");
                return Some(PhraseMatch {
                    start,
                    end,
                    kind: MatchKind::Fuzzy(score),
                });
            }
        }

        None
    }
}

/// Convenience wrapper around [`SpanMatcher::find_spans`].
pub fn find_spans(text: &str, phrases: &[EvidencePhrase], options: &MatchOptions) -> Vec<Span> {
    SpanMatcher::new(options.clone()).find_spans(text, phrases)
}

/// Greedy left-to-right selection of non-overlapping spans.
///
/// Sorts by start ascending, then length descending, then input order, and
/// drops every span that intersects one already kept. Empty spans are
/// dropped.
pub fn resolve_overlaps(spans: Vec<Span>) -> Vec<Span> {
    let mut ordered: Vec<(usize, Span)> = spans
        .into_iter()
        .enumerate()
        .filter(|(_, s)| !s.is_empty())
        .collect();
    ordered.sort_by(|(ia, a), (ib, b)| {
        a.start
            .cmp(&b.start)
            .then_with(|| b.len().cmp(&a.len()))
            .then_with(|| ia.cmp(ib))
    });

    let mut kept: Vec<Span> = Vec::with_capacity(ordered.len());
    for (_, span) in ordered {
        match kept.last() {
            Some(last) if span.start < last.end => {
                trace!(tag = %span.tag, start = span.start, "Dropping overlapping span");
            }
            _ => kept.push(span),
        }
    }
    kept
}

fn compile_case_insensitive(pattern: &str) -> Option<Regex> {
    match RegexBuilder::new(pattern).case_insensitive(true).build() {
        Ok(re) => Some(re),
        Err(e) => {
            warn!(error = %e, "Evidence pattern rejected");
            None
        }
    }
}

fn find_literal(text: &str, phrase: &str) -> Option<(usize, usize)> {
    let re = compile_case_insensitive(&regex::escape(phrase))?;
    re.find(text).map(|m| (m.start(), m.end()))
}

fn find_flexible(text: &str, phrase: &str) -> Option<(usize, usize)> {
    let words: Vec<String> = WORD
        .find_iter(phrase)
        .map(|m| regex::escape(m.as_str()))
        .collect();
    if words.is_empty() {
        return None;
    }
    let re = compile_case_insensitive(&words.join(r"\W+"))?;
    re.find(text).map(|m| (m.start(), m.end()))
}

/// Lowercase word sequence joined by single spaces; punctuation dropped.
pub fn normalize_for_similarity(text: &str) -> String {
    WORD.find_iter(text)
        .map(|m| m.as_str().to_lowercase())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Similarity ratio in `[0, 1]` between two normalized strings.
pub fn similarity(a: &str, b: &str) -> f32 {
    if a.is_empty() && b.is_empty() {
        return 1.0;
    }
    TextDiff::from_chars(a, b).ratio()
}

fn find_fuzzy(text: &str, phrase: &str, threshold: f32, slack: usize) -> Option<(usize, usize, f32)> {
    let target = normalize_for_similarity(phrase);
    if target.is_empty() {
        return None;
    }
    let target_chars = target.chars().count();
    let phrase_words = target.split(' ').count();

    let words: Vec<(usize, usize, String)> = WORD
        .find_iter(text)
        .map(|m| (m.start(), m.end(), m.as_str().to_lowercase()))
        .collect();
    if words.is_empty() {
        return None;
    }

    let min_len = phrase_words.saturating_sub(slack).max(1);
    let max_len = (phrase_words + slack).min(words.len());

    // (score, start, end)
    let mut best: Option<(f32, usize, usize)> = None;

    for len in min_len..=max_len {
        for window in words.windows(len) {
            let candidate = window
                .iter()
                .map(|(_, _, w)| w.as_str())
                .collect::<Vec<_>>()
                .join(" ");

            // 2*min/(a+b) bounds the ratio from above; skip hopeless windows
            let candidate_chars = candidate.chars().count();
            let bound = 2.0 * target_chars.min(candidate_chars) as f32
                / (target_chars + candidate_chars) as f32;
            if bound < threshold {
                continue;
            }

            let score = similarity(&target, &candidate);
            let start = window[0].0;
            let end = window[len - 1].1;
            let better = match best {
                None => true,
                Some((best_score, best_start, _)) => {
                    score > best_score || (score == best_score && start < best_start)
                }
            };
            if better {
                best = Some((score, start, end));
            }
        }
    }

    match best {
        Some((score, start, end)) if score >= threshold => Some((start, end, score)),
        Some((score, _, _)) => {
            trace!(phrase, score, threshold, "Best fuzzy window below threshold");
            None
        }
        None => None,
    }
}
