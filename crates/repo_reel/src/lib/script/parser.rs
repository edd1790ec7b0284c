use std::sync::LazyLock;

use regex::Regex;

use crate::{
    llm::prompt::WORDS_PER_SECOND,
    types::{DurationBounds, ScriptSection, SectionKind},
};

/// Upper bound on sections in a script
pub const MAX_SECTIONS: usize = 8;
/// Shortest time a section stays on screen
pub const MIN_SECTION_SECS: f64 = 3.0;
/// Below this many words a response is not a script
pub const MIN_SCRIPT_WORDS: usize = 15;
/// Longest marker text still read as a heading
const MAX_LABEL_WORDS: usize = 6;

static TIMING_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^\s*(?:\*\*)?[\[(]\s*(\d{1,2}):(\d{2})\s*[-–—]\s*(\d{1,2}):(\d{2})\s*[\])](?:\*\*)?\s*[:.\-–]?\s*(.*)$",
    )
    .unwrap()
});

static HEADING_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\s*#{1,4}\s+(.+)$").unwrap());

/// Stage directions such as `[Visual: logo]` or `(music fades)`
static DIRECTION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*(?:\[[^\]]*\]|\([^)]*\))\s*$").unwrap());

static BULLET_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*(?:[-*+•]|\d+[.)])\s+").unwrap());

static SENTENCE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^.!?]+[.!?]*").unwrap());

const KEYWORDS: &[(SectionKind, &[&str])] = &[
    (
        SectionKind::Title,
        &["welcome", "introduction", "intro", "hello", "today", "overview"],
    ),
    (
        SectionKind::Features,
        &["feature", "functionality", "capabilit", "includes"],
    ),
    (
        SectionKind::Technology,
        &["technolog", "tech stack", "built with", "stack"],
    ),
    (
        SectionKind::Code,
        &["code", "implementation", "architecture", "technical"],
    ),
    (
        SectionKind::Conclusion,
        &[
            "conclusion",
            "summary",
            "thank",
            "explore",
            "wrap up",
            "wrapping up",
            "outro",
        ],
    ),
];

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("response is not a usable script: {0}")]
pub struct MalformedScript(pub &'static str);

#[derive(Debug, Default)]
struct RawSection {
    label: String,
    timing: Option<(f64, f64)>,
    lines: Vec<String>,
}

impl RawSection {
    fn text(&self) -> String {
        collapse_whitespace(&self.lines.join(" "))
    }
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

pub fn word_count(s: &str) -> usize {
    s.split_whitespace().count()
}

/// Seconds needed to speak `text`, never less than [`MIN_SECTION_SECS`]
pub fn estimate_secs(text: &str) -> f64 {
    (word_count(text) as f64 / WORDS_PER_SECOND).max(MIN_SECTION_SECS)
}

fn clean_line(line: &str) -> String {
    let line = BULLET_RE.replace(line, "");
    line.replace("**", "").replace("__", "").replace('`', "")
}

fn secs(min: &str, sec: &str) -> f64 {
    let m = min.parse::<f64>().unwrap_or_default();
    let s = sec.parse::<f64>().unwrap_or_default();
    m * 60.0 + s
}

fn exact_kind(head: &str) -> Option<SectionKind> {
    match head.trim().to_lowercase().as_str() {
        "title" | "intro" | "introduction" => Some(SectionKind::Title),
        "features" | "feature" => Some(SectionKind::Features),
        "technology" | "technologies" | "tech" => Some(SectionKind::Technology),
        "code" => Some(SectionKind::Code),
        "content" => Some(SectionKind::Content),
        "conclusion" | "outro" => Some(SectionKind::Conclusion),
        _ => None,
    }
}

fn label_kind(label: &str) -> Option<SectionKind> {
    let head = label.split(':').next().unwrap_or_default();
    exact_kind(head).or_else(|| keyword_kind(label))
}

/// Short headings never end a sentence; anything else is narration
fn is_prose(text: &str) -> bool {
    word_count(text) > MAX_LABEL_WORDS || text.trim_end().ends_with(['.', '!', '?', ','])
}

/// Splits what follows a timing marker into a label and the narration
/// written on the same line, e.g. `Title: Welcome to ...` or `Welcome to ...`
fn split_marker_text(trailing: &str) -> (String, Option<String>) {
    let trailing = trailing.trim();
    let (head, rest) = match trailing.split_once(':') {
        Some((head, rest)) if exact_kind(head).is_some() => (head.trim(), rest.trim()),
        _ => ("", trailing),
    };
    if !rest.is_empty() && is_prose(rest) {
        (head.to_string(), Some(clean_line(rest)))
    } else {
        (trailing.to_string(), None)
    }
}

fn keyword_kind(text: &str) -> Option<SectionKind> {
    let lower = text.to_lowercase();
    KEYWORDS
        .iter()
        .find(|(_, words)| words.iter().any(|w| lower.contains(w)))
        .map(|(kind, _)| *kind)
}

/// Strips a leading `Kind:` from a marker label, leaving the heading
fn heading_of(label: &str, kind: SectionKind) -> String {
    let heading = match label.split_once(':') {
        Some((head, rest)) if label_kind(head).is_some() && !rest.trim().is_empty() => rest.trim(),
        _ => label.trim(),
    };
    let heading = heading.replace("**", "");
    if heading.is_empty() {
        kind.label().to_string()
    } else {
        heading
    }
}

fn split_by_markers(text: &str) -> Option<Vec<RawSection>> {
    let mut sections: Vec<RawSection> = Vec::new();

    for line in text.lines() {
        if let Some(caps) = TIMING_RE.captures(line) {
            let start = secs(&caps[1], &caps[2]);
            let end = secs(&caps[3], &caps[4]);
            let (label, narration) = split_marker_text(&caps[5]);
            sections.push(RawSection {
                label,
                timing: Some((start, end)),
                lines: narration.into_iter().collect(),
            });
        } else if let Some(caps) = HEADING_RE.captures(line) {
            sections.push(RawSection {
                label: caps[1].trim().to_string(),
                timing: None,
                lines: vec![],
            });
        } else if let Some(current) = sections.last_mut() {
            if !DIRECTION_RE.is_match(line) && !line.trim().is_empty() {
                current.lines.push(clean_line(line));
            }
        }
        // anything before the first marker is preamble
    }

    if sections.is_empty() {
        return None;
    }
    sections.retain(|s| !s.text().is_empty());
    Some(sections)
}

fn split_by_paragraphs(text: &str) -> Vec<RawSection> {
    let paragraphs = text
        .split("\n\n")
        .map(|p| {
            p.lines()
                .filter(|l| !DIRECTION_RE.is_match(l))
                .map(clean_line)
                .collect::<Vec<_>>()
        })
        .filter(|lines| !collapse_whitespace(&lines.join(" ")).is_empty())
        .collect::<Vec<_>>();

    if paragraphs.len() > 1 {
        return paragraphs
            .into_iter()
            .map(|lines| RawSection {
                lines,
                ..Default::default()
            })
            .collect();
    }

    // one block of prose: group sentences in threes
    let sentences = SENTENCE_RE
        .find_iter(text)
        .map(|m| m.as_str().trim().to_string())
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>();
    sentences
        .chunks(3)
        .map(|chunk| RawSection {
            lines: vec![chunk.join(" ")],
            ..Default::default()
        })
        .collect()
}

/// Picks durations for the raw sections: timing hints where they are
/// consistent, spoken-length estimates elsewhere.
fn assign_durations(raw: &[RawSection], had_markers: bool) -> Vec<f64> {
    if !had_markers {
        let total = raw.iter().map(|s| word_count(&s.text()) as f64).sum::<f64>() / WORDS_PER_SECOND;
        let each = (total / raw.len().max(1) as f64).max(MIN_SECTION_SECS);
        return vec![each; raw.len()];
    }

    let mut prev_end = 0.0_f64;
    raw.iter()
        .map(|section| {
            let estimate = estimate_secs(&section.text());
            match section.timing {
                Some((start, end)) if end > start && start + 1.0 >= prev_end => {
                    prev_end = end;
                    (end - start).max(MIN_SECTION_SECS)
                }
                Some(_) => {
                    tracing::debug!(label = %section.label, "Ignoring inconsistent timing hint");
                    estimate
                }
                None => estimate,
            }
        })
        .collect()
}

/// Parses free-form provider text into script sections.
///
/// The result is already normalized: at most [`MAX_SECTIONS`] sections and a
/// total duration inside `bounds`.
pub fn parse_script(text: &str, bounds: &DurationBounds) -> Result<Vec<ScriptSection>, MalformedScript> {
    if word_count(text) < MIN_SCRIPT_WORDS {
        return Err(MalformedScript("too few words"));
    }

    let (raw, had_markers) = match split_by_markers(text) {
        Some(sections) => (sections, true),
        None => (split_by_paragraphs(text), false),
    };

    let words = raw.iter().map(|s| word_count(&s.text())).sum::<usize>();
    if raw.is_empty() || words < MIN_SCRIPT_WORDS {
        return Err(MalformedScript("no narration found"));
    }

    let durations = assign_durations(&raw, had_markers);
    let last = raw.len() - 1;

    let sections = raw
        .iter()
        .zip(durations)
        .enumerate()
        .map(|(i, (section, duration_secs))| {
            let text = section.text();
            let kind = label_kind(&section.label)
                .or_else(|| keyword_kind(&text))
                .unwrap_or(if i == 0 {
                    SectionKind::Title
                } else if i == last {
                    SectionKind::Conclusion
                } else {
                    SectionKind::Content
                });
            ScriptSection {
                index: i,
                kind,
                heading: heading_of(&section.label, kind),
                text,
                duration_secs,
            }
        })
        .collect::<Vec<_>>();

    Ok(normalize(sections, bounds))
}

/// Caps the section count and rescales durations into `bounds`.
///
/// Extra middle sections are dropped so the closing section survives.
pub fn normalize(mut sections: Vec<ScriptSection>, bounds: &DurationBounds) -> Vec<ScriptSection> {
    if sections.len() > MAX_SECTIONS {
        let last = sections.pop();
        sections.truncate(MAX_SECTIONS - 1);
        sections.extend(last);
    }

    for (i, section) in sections.iter_mut().enumerate() {
        section.index = i;
        section.duration_secs = section.duration_secs.max(MIN_SECTION_SECS);
    }

    let total = sections.iter().map(|s| s.duration_secs).sum::<f64>();
    if total > 0.0 && !bounds.contains(total) {
        let factor = bounds.clamp(total) / total;
        for section in &mut sections {
            section.duration_secs *= factor;
        }
    }

    sections
}
