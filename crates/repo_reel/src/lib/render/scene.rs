use serde::Serialize;

use crate::types::{RepositoryAnalysis, Script, ScriptSection, SectionKind};

const MAX_BADGES: usize = 4;
const MAX_ROWS: usize = 6;
const MAX_BULLETS: usize = 5;
const MAX_CODE_LINES: usize = 14;
const MAX_LAYER_ITEMS: usize = 5;

const LANGUAGES: &[&str] = &[
    "Rust", "Python", "JavaScript", "TypeScript", "Go", "Java", "Kotlin", "Swift", "Ruby", "PHP",
    "C", "C++", "C#",
];
const INFRASTRUCTURE: &[&str] = &[
    "Docker", "Kubernetes", "PostgreSQL", "MySQL", "MongoDB", "Redis", "SQLite",
];

/// One band of the technology flowchart
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Layer {
    pub label: String,
    pub items: Vec<String>,
}

/// What a single frame shows
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "scene", rename_all = "snake_case")]
pub enum Scene {
    Title {
        name: String,
        subtitle: String,
        badges: Vec<String>,
    },
    FeatureTable {
        heading: String,
        rows: Vec<String>,
    },
    Flowchart {
        heading: String,
        layers: Vec<Layer>,
    },
    Code {
        heading: String,
        file_name: String,
        language: String,
        lines: Vec<String>,
    },
    Content {
        heading: String,
        bullets: Vec<String>,
    },
    Conclusion {
        heading: String,
        message: String,
        call_to_action: String,
    },
}

impl Scene {
    pub fn heading(&self) -> &str {
        match self {
            Scene::Title { name, .. } => name,
            Scene::FeatureTable { heading, .. }
            | Scene::Flowchart { heading, .. }
            | Scene::Code { heading, .. }
            | Scene::Content { heading, .. }
            | Scene::Conclusion { heading, .. } => heading,
        }
    }
}

/// Splits prose into trimmed sentences, keeping their terminal punctuation
pub fn sentences(text: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut current = String::new();
    let mut chars = text.chars().peekable();
    while let Some(ch) = chars.next() {
        current.push(ch);
        let at_boundary = matches!(ch, '.' | '!' | '?')
            && chars.peek().map_or(true, |next| next.is_whitespace());
        if at_boundary {
            let s = current.split_whitespace().collect::<Vec<_>>().join(" ");
            if !s.is_empty() {
                out.push(s);
            }
            current.clear();
        }
    }
    let rest = current.split_whitespace().collect::<Vec<_>>().join(" ");
    if !rest.is_empty() {
        out.push(rest);
    }
    out
}

fn layers(analysis: &RepositoryAnalysis) -> Vec<Layer> {
    let (mut languages, mut frameworks, mut infrastructure) = (vec![], vec![], vec![]);
    for tech in analysis.detected_technologies() {
        let bucket = if LANGUAGES.contains(&tech) {
            &mut languages
        } else if INFRASTRUCTURE.contains(&tech) {
            &mut infrastructure
        } else {
            &mut frameworks
        };
        if bucket.len() < MAX_LAYER_ITEMS {
            bucket.push(tech.to_string());
        }
    }

    [
        ("Languages", languages),
        ("Frameworks", frameworks),
        ("Infrastructure & Data", infrastructure),
    ]
    .into_iter()
    .filter(|(_, items)| !items.is_empty())
    .map(|(label, items)| Layer {
        label: label.to_string(),
        items,
    })
    .collect()
}

fn content(section: &ScriptSection) -> Scene {
    let mut bullets = sentences(&section.text);
    bullets.truncate(MAX_BULLETS);
    Scene::Content {
        heading: section.heading.clone(),
        bullets,
    }
}

fn code_lines(snippet: &str) -> Vec<String> {
    snippet
        .lines()
        .take(MAX_CODE_LINES)
        .map(|l| l.replace('\t', "    ").trim_end().to_string())
        .collect()
}

/// Maps each script section onto a scene, one to one and in order.
///
/// Sections whose kind has nothing to show (no technologies, no code left)
/// become content scenes built from the section's own text.
pub fn plan(script: &Script, analysis: &RepositoryAnalysis) -> Vec<Scene> {
    let mut excerpts = analysis.code_excerpts.iter();

    script
        .sections
        .iter()
        .map(|section| match section.kind {
            SectionKind::Title => Scene::Title {
                name: analysis.name.clone(),
                subtitle: if analysis.description.trim().is_empty() {
                    sentences(&section.text).into_iter().next().unwrap_or_default()
                } else {
                    analysis.description.trim().to_string()
                },
                badges: analysis
                    .detected_technologies()
                    .take(MAX_BADGES)
                    .map(String::from)
                    .collect(),
            },
            SectionKind::Features => {
                let mut rows = if analysis.features.is_empty() {
                    sentences(&section.text)
                } else {
                    analysis.features.clone()
                };
                rows.truncate(MAX_ROWS);
                Scene::FeatureTable {
                    heading: section.heading.clone(),
                    rows,
                }
            }
            SectionKind::Technology => {
                let layers = layers(analysis);
                if layers.is_empty() {
                    content(section)
                } else {
                    Scene::Flowchart {
                        heading: section.heading.clone(),
                        layers,
                    }
                }
            }
            SectionKind::Code => match excerpts.next() {
                Some(excerpt) => Scene::Code {
                    heading: section.heading.clone(),
                    file_name: excerpt.path.clone(),
                    language: excerpt.language.clone(),
                    lines: code_lines(&excerpt.snippet),
                },
                None => content(section),
            },
            SectionKind::Content => content(section),
            SectionKind::Conclusion => Scene::Conclusion {
                heading: section.heading.clone(),
                message: sentences(&section.text)
                    .into_iter()
                    .next()
                    .unwrap_or_else(|| "Thanks for watching!".to_string()),
                call_to_action: analysis.url.clone(),
            },
        })
        .collect()
}
