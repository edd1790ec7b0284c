use std::fmt;

use itertools::Itertools;

use crate::{
    error::ValidationError,
    github::analysis::language_breakdown,
    types::{DurationBounds, RepositoryAnalysis, SectionKind},
};

/// Spoken words per second assumed for the narration budget
pub const WORDS_PER_SECOND: f64 = 2.5;

const SYSTEM_PROMPT: &str = include_str!("./prompts/system_0.txt");

const MAX_TECHNOLOGIES: usize = 6;
const MAX_FEATURES: usize = 6;
const MAX_EXCERPTS: usize = 2;
const SUMMARY_CHARS: usize = 1200;

/// Provider-agnostic request for a video script
#[derive(Debug, Clone, PartialEq)]
pub struct Prompt {
    pub system: String,
    pub user: String,
    pub layout: Vec<SectionKind>,
    pub target_seconds: f64,
    pub max_tokens: u32,
}

impl Prompt {
    pub fn target_sections(&self) -> usize {
        self.layout.len()
    }
}

#[derive(Debug, Clone)]
pub struct PromptBuilder {
    target_sections: usize,
    target_seconds: f64,
    bounds: DurationBounds,
}

impl Default for PromptBuilder {
    fn default() -> Self {
        PromptBuilder::new(5, DurationBounds::default())
    }
}

/// Section kinds for a script of `n` sections (clamped to 2..=8)
pub fn section_layout(n: usize) -> Vec<SectionKind> {
    let n = n.clamp(2, 8);
    if n == SectionKind::DEFAULT_LAYOUT.len() {
        return SectionKind::DEFAULT_LAYOUT.to_vec();
    }

    let middle = [
        SectionKind::Features,
        SectionKind::Technology,
        SectionKind::Code,
    ]
    .into_iter()
    .chain(std::iter::repeat(SectionKind::Content))
    .take(n - 2);

    std::iter::once(SectionKind::Title)
        .chain(middle)
        .chain(std::iter::once(SectionKind::Conclusion))
        .collect()
}

/// Formats seconds as `m:ss`
pub fn timestamp(secs: f64) -> String {
    let total = secs.round().max(0.0) as u64;
    format!("{}:{:02}", total / 60, total % 60)
}

/// The user turn: repository facts followed by the script requirements
struct UserPrompt<'a> {
    analysis: &'a RepositoryAnalysis,
    layout: &'a [SectionKind],
    bounds: DurationBounds,
    target_seconds: f64,
    target_words: u32,
}

impl fmt::Display for UserPrompt<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let analysis = self.analysis;
        writeln!(
            f,
            "Write a video script introducing the GitHub repository '{}'.\n",
            analysis.name
        )?;
        writeln!(f, "Repository information:")?;
        writeln!(f, "- Name: {}", analysis.name)?;
        writeln!(f, "- URL: {}", analysis.url)?;
        writeln!(f, "- Description: {}", analysis.description)?;

        let technologies = analysis
            .detected_technologies()
            .take(MAX_TECHNOLOGIES)
            .join(", ");
        if !technologies.is_empty() {
            writeln!(f, "- Technologies: {technologies}")?;
        }

        let languages = language_breakdown(&analysis.stats)
            .into_iter()
            .take(4)
            .map(|(lang, n)| format!("{lang} ({n} files)"))
            .join(", ");
        if !languages.is_empty() {
            writeln!(f, "- Languages: {languages}")?;
        }

        if !analysis.features.is_empty() {
            writeln!(f, "- Key features:")?;
            for feature in analysis.features.iter().take(MAX_FEATURES) {
                writeln!(f, "  - {feature}")?;
            }
        }

        for excerpt in analysis.code_excerpts.iter().take(MAX_EXCERPTS) {
            writeln!(
                f,
                "\nCode from {} ({}):\n{}",
                excerpt.path, excerpt.language, excerpt.snippet
            )?;
        }

        if !analysis.content_summary.is_empty() {
            let summary = analysis
                .content_summary
                .chars()
                .take(SUMMARY_CHARS)
                .collect::<String>();
            writeln!(f, "\nRepository content summary:\n{summary}")?;
        }

        writeln!(
            f,
            "\nRequirements:\n\
             - Exactly {} sections, in this order: {}.\n\
             - Total length between {} and {} seconds, aiming for about {} seconds.\n\
             - About {} spoken words in total ({} words per second).\n\
             - Begin each section with a marker line like the ones below, then the narration.\n",
            self.layout.len(),
            self.layout.iter().join(", "),
            self.bounds.min_secs.round(),
            self.bounds.max_secs.round(),
            self.target_seconds.round(),
            self.target_words,
            WORDS_PER_SECOND,
        )?;

        let per_section = self.target_seconds / self.layout.len().max(1) as f64;
        for (i, kind) in self.layout.iter().enumerate() {
            writeln!(
                f,
                "[{} - {}] {}: <heading>",
                timestamp(per_section * i as f64),
                timestamp(per_section * (i + 1) as f64),
                kind
            )?;
        }
        Ok(())
    }
}

impl PromptBuilder {
    pub fn new(target_sections: usize, bounds: DurationBounds) -> Self {
        PromptBuilder {
            target_sections,
            // aim for the middle of the allowed range
            target_seconds: (bounds.min_secs + bounds.max_secs) / 2.0,
            bounds,
        }
    }

    pub fn with_target_seconds(mut self, secs: f64) -> Self {
        self.target_seconds = self.bounds.clamp(secs);
        self
    }

    pub fn build(&self, analysis: &RepositoryAnalysis) -> Result<Prompt, ValidationError> {
        analysis.validate()?;

        let layout = section_layout(self.target_sections);
        let target_seconds = self.bounds.clamp(self.target_seconds);
        let target_words = (target_seconds * WORDS_PER_SECOND).round() as u32;
        // roughly 1.4 tokens per English word plus room for the markers
        let max_tokens = (target_words as f64 * 1.4).round() as u32 + 40 * layout.len() as u32;

        let user = UserPrompt {
            analysis,
            layout: &layout,
            bounds: self.bounds,
            target_seconds,
            target_words,
        }
        .to_string();

        Ok(Prompt {
            system: SYSTEM_PROMPT.to_string(),
            user,
            layout,
            target_seconds,
            max_tokens,
        })
    }
}
