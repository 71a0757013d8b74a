//! # Step Parser
//!
//! Converts raw completion text into an ordered list of solution steps
//! plus an extracted final answer. Model output formatting is not
//! guaranteed, so extraction runs as a cascade of three pattern
//! strategies from most to least specific, with sentence synthesis as
//! the fallback and a single synthetic step as the last resort.
//!
//! The parser is a pure function of its input: identical text always
//! produces an identical `Solution`.

use crate::models::{Solution, Step};
use regex::Regex;

/// Returned as the final answer when no pattern extracted one
pub const FINAL_ANSWER_SENTINEL: &str = "See solution steps above";

/// Cleaned step text is capped at this many characters
const STEP_TEXT_CAP: usize = 800;
/// Cleaned step text at or below this length is treated as noise.
/// Tight enough to drop bare "ok."-style fragments while keeping
/// legitimately terse steps like "Apply F=ma."
const STEP_TEXT_MIN: usize = 10;
/// Synthesized segments must exceed this length to be kept
const SEGMENT_MIN: usize = 25;
/// Synthesis keeps at most this many segments
const MAX_SEGMENTS: usize = 6;
/// Synthesized segment text cap
const SEGMENT_CAP: usize = 600;
/// Last-resort synthetic step keeps this much of the text
const SYNTHETIC_STEP_CAP: usize = 1000;

/// A step header located in the cleaned text
struct HeaderMatch {
    /// Step number captured from the header (0 if out of range)
    number: u32,
    /// Byte offset where the header begins
    start: usize,
    /// Byte offset where the step body begins
    body_start: usize,
}

/// Heuristic parser for unstructured tutoring completions
pub struct StepParser {
    tag: Regex,
    whitespace: Regex,
    bold_header: Regex,
    loose_header: Regex,
    list_header: Regex,
    bold_terminator: Regex,
    loose_terminator: Regex,
    number_prefix: Regex,
    sentence_break: Regex,
    answer_marker: Regex,
    answer_approx: Regex,
    answer_trailing: Regex,
}

fn re(pattern: &str) -> Regex {
    Regex::new(pattern).expect("hardcoded pattern compiles")
}

impl Default for StepParser {
    fn default() -> Self {
        Self::new()
    }
}

impl StepParser {
    pub fn new() -> Self {
        Self {
            tag: re(r"<[^>]*>"),
            whitespace: re(r"\s+"),
            bold_header: re(r"(?i)\*\*step\s*(\d+):\*\*\s*"),
            loose_header: re(r"(?i)step\s*(\d+)[:.\-]?\s*"),
            list_header: re(r"(\d+)[.)]\s*"),
            bold_terminator: re(r"(?i)\*\*final"),
            loose_terminator: re(r"(?i)final|answer:"),
            number_prefix: re(r"^\d+[.)]\s*"),
            sentence_break: re(r"\.\s+"),
            answer_marker: re(
                r"(?i)(?:final answer|answer|therefore|hence|result)[:=\-]?\s*(.{5,150}?)(?:\.|$)",
            ),
            answer_approx: re(
                r"(?i)(?:approximately|about|roughly)\s+([\d.,]+(?:\s*%|\s*[a-zA-Z/\^²³⁰¹²³⁴⁵⁶⁷⁸⁹]+)?)",
            ),
            answer_trailing: re(
                r"(?i)(\d+(?:\.\d+)?(?:\s*[×*]\s*10\^[\-\d]+)?(?:\s*%|\s*[a-zA-Z/\^²³⁰¹²³⁴⁵⁶⁷⁸⁹]+)?)\s*(?:will remain|remaining|of the|is the)",
            ),
        }
    }

    /// Parse raw completion text into a structured solution.
    ///
    /// The returned steps sequence is never empty, whatever the input.
    pub fn parse(&self, raw: &str) -> Solution {
        let clean = self.normalize(raw);

        let mut steps = self.extract_steps(&clean).unwrap_or_default();
        if steps.is_empty() {
            steps = self.synthesize_steps(&clean);
        }
        if steps.is_empty() {
            steps = vec![Step::new(1, truncate_chars(&clean, SYNTHETIC_STEP_CAP))];
        }

        let final_answer = self
            .extract_final_answer(&clean)
            .unwrap_or_else(|| FINAL_ANSWER_SENTINEL.to_string());

        Solution {
            steps,
            final_answer,
            explanation: clean,
        }
    }

    /// Strip markup, decode the common HTML entities, collapse
    /// whitespace runs to single spaces, trim.
    fn normalize(&self, raw: &str) -> String {
        let stripped = self.tag.replace_all(raw.trim(), "");
        let decoded = stripped
            .replace("&lt;", "<")
            .replace("&gt;", ">")
            .replace("&amp;", "&");
        self.whitespace
            .replace_all(&decoded, " ")
            .trim()
            .to_string()
    }

    /// Run the three-tier strategy cascade.
    ///
    /// The first tier with at least two raw header matches wins;
    /// earlier tiers are strictly preferred. The winning tier is
    /// re-validated after cleaning: if fewer than two usable steps
    /// survive, the cascade yields `None` so the caller falls back to
    /// sentence synthesis instead of emitting a one-step result.
    fn extract_steps(&self, text: &str) -> Option<Vec<Step>> {
        let tiers = [
            (&self.bold_header, &self.bold_terminator),
            (&self.loose_header, &self.loose_terminator),
            (&self.list_header, &self.loose_terminator),
        ];

        for (header, terminator) in tiers {
            let headers = self.collect_headers(header, text);
            if headers.len() < 2 {
                continue;
            }
            let steps = self.build_steps(text, &headers, terminator);
            return if steps.len() >= 2 { Some(steps) } else { None };
        }
        None
    }

    fn collect_headers(&self, header: &Regex, text: &str) -> Vec<HeaderMatch> {
        header
            .captures_iter(text)
            .filter_map(|caps| {
                let whole = caps.get(0)?;
                let number = caps.get(1)?.as_str().parse().unwrap_or(0);
                Some(HeaderMatch {
                    number,
                    start: whole.start(),
                    body_start: whole.end(),
                })
            })
            .collect()
    }

    /// Slice step bodies between consecutive headers, stopping early at
    /// a final-answer marker, then clean and noise-filter each body.
    fn build_steps(&self, text: &str, headers: &[HeaderMatch], terminator: &Regex) -> Vec<Step> {
        let mut steps = Vec::with_capacity(headers.len());

        for (i, header) in headers.iter().enumerate() {
            let end = headers.get(i + 1).map(|h| h.start).unwrap_or(text.len());
            let mut body = &text[header.body_start.min(end)..end];
            if let Some(m) = terminator.find(body) {
                body = &body[..m.start()];
            }

            let cleaned = self.clean_step_text(body);
            if cleaned.chars().count() > STEP_TEXT_MIN {
                let number = if header.number == 0 {
                    (steps.len() + 1) as u32
                } else {
                    header.number
                };
                steps.push(Step::new(number, cleaned));
            }
        }
        steps
    }

    /// Strip bold markers and a leading list-number prefix, cap length
    fn clean_step_text(&self, body: &str) -> String {
        let without_bold = body.trim().replace("**", "");
        let without_prefix = self.number_prefix.replace(&without_bold, "");
        truncate_chars(without_prefix.trim(), STEP_TEXT_CAP)
    }

    /// Fallback: number up to six sufficiently long sentence segments
    fn synthesize_steps(&self, text: &str) -> Vec<Step> {
        self.split_segments(text)
            .into_iter()
            .map(|s| s.trim().to_string())
            .filter(|s| s.chars().count() > SEGMENT_MIN)
            .take(MAX_SEGMENTS)
            .enumerate()
            .map(|(i, s)| Step::new((i + 1) as u32, truncate_chars(&s, SEGMENT_CAP)))
            .collect()
    }

    /// Split on sentence boundaries: a period and whitespace followed
    /// by a capital letter. Normalization collapsed newline runs, so
    /// blank-line boundaries cannot occur here. The separator is
    /// consumed; each segment loses its trailing period except the last.
    fn split_segments(&self, text: &str) -> Vec<String> {
        let mut segments = Vec::new();
        let mut start = 0;

        for m in self.sentence_break.find_iter(text) {
            let follows_capital = text[m.end()..]
                .chars()
                .next()
                .map(|c| c.is_uppercase())
                .unwrap_or(false);
            if follows_capital && m.start() >= start {
                segments.push(text[start..m.start()].to_string());
                start = m.end();
            }
        }
        segments.push(text[start..].to_string());
        segments
    }

    /// Try the three answer patterns in order; the first pattern that
    /// matches wins even if its capture cleans to nothing.
    fn extract_final_answer(&self, text: &str) -> Option<String> {
        let patterns = [
            &self.answer_marker,
            &self.answer_approx,
            &self.answer_trailing,
        ];

        let mut answer = None;
        for pattern in patterns {
            if let Some(caps) = pattern.captures(text) {
                if let Some(group) = caps.get(1) {
                    answer = Some(clean_answer(group.as_str()));
                }
                break;
            }
        }
        answer.filter(|a| !a.is_empty())
    }
}

/// Drop marker punctuation the capture may have swallowed and the
/// trailing period
fn clean_answer(captured: &str) -> String {
    captured
        .trim()
        .trim_start_matches([':', '=', '-'])
        .trim_start()
        .trim_end_matches('.')
        .trim()
        .to_string()
}

fn truncate_chars(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}
