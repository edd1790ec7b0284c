use itertools::Itertools;

use crate::{
    error::GenerationError,
    script::parser::{estimate_secs, normalize},
    types::{
        DurationBounds, RepositoryAnalysis, Script, ScriptSection, ScriptSource, SectionKind,
    },
};

fn list(items: &[&str]) -> String {
    match items {
        [] => String::new(),
        [one] => one.to_string(),
        [init @ .., last] => format!("{} and {last}", init.join(", ")),
    }
}

fn section_text(kind: SectionKind, analysis: &RepositoryAnalysis) -> (String, String) {
    let name = &analysis.name;
    let technologies = analysis.detected_technologies().take(4).collect::<Vec<_>>();

    match kind {
        SectionKind::Title => (
            name.clone(),
            format!(
                "Welcome to this overview of {name}, a repository by {}. {}",
                analysis.owner,
                sentence(&analysis.description)
            ),
        ),
        SectionKind::Features => {
            let text = if analysis.features.is_empty() {
                format!(
                    "{name} is organised so that its purpose is easy to follow. \
                     The README and the project layout explain how the pieces fit together."
                )
            } else {
                let features = analysis
                    .features
                    .iter()
                    .take(4)
                    .map(|f| sentence(f))
                    .join(" ");
                format!("Here is what {name} offers. {features}")
            };
            ("Key Features".into(), text)
        }
        SectionKind::Technology => {
            let text = if technologies.is_empty() {
                format!(
                    "{name} keeps its tooling simple, with no specific framework detected \
                     in the files we scanned."
                )
            } else {
                format!(
                    "{name} is built with {}. These choices shape how the project is \
                     structured, built and run.",
                    list(&technologies)
                )
            };
            ("Technology Stack".into(), text)
        }
        SectionKind::Code => {
            let text = match analysis.code_excerpts.first() {
                Some(excerpt) => format!(
                    "Let's look at some code. The file {} is written in {} and gives a \
                     feel for how the project is put together.",
                    excerpt.path, excerpt.language
                ),
                None => format!(
                    "{name} spans {} files that we scanned. Its structure is easy to \
                     navigate for new contributors.",
                    analysis.stats.files_scanned
                ),
            };
            ("Code Walkthrough".into(), text)
        }
        SectionKind::Content => (
            "Project Overview".into(),
            format!(
                "{name} brings these parts together into a single project that you can \
                 clone, build and explore on your own machine."
            ),
        ),
        SectionKind::Conclusion => (
            "Thanks for Watching".into(),
            format!(
                "That wraps up our look at {name}. Explore the code at {} and consider \
                 contributing. Thank you for watching!",
                analysis.url
            ),
        ),
    }
}

fn sentence(s: &str) -> String {
    let s = s.trim();
    if s.is_empty() || s.ends_with(['.', '!', '?']) {
        s.to_string()
    } else {
        format!("{s}.")
    }
}

/// Builds a script from the analysis alone, without any network call.
///
/// Fails only when the analysis is unusable (no repository name).
pub fn local_script(
    analysis: &RepositoryAnalysis,
    layout: &[SectionKind],
    bounds: &DurationBounds,
) -> Result<Script, GenerationError> {
    analysis
        .validate()
        .inspect_err(|e| tracing::error!(error = ?e, "Cannot apply local template"))
        .map_err(|_| GenerationError::NoProvidersAvailable)?;

    let layout = if layout.is_empty() {
        &SectionKind::DEFAULT_LAYOUT[..]
    } else {
        layout
    };

    let sections = layout
        .iter()
        .enumerate()
        .map(|(index, kind)| {
            let (heading, text) = section_text(*kind, analysis);
            ScriptSection {
                index,
                kind: *kind,
                heading,
                duration_secs: estimate_secs(&text),
                text: text.trim().to_string(),
            }
        })
        .collect::<Vec<_>>();

    Ok(Script {
        sections: normalize(sections, bounds),
        source: ScriptSource::LocalTemplate,
    })
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use super::*;
    use crate::types::{CodeExcerpt, RepoStats, NO_TECHNOLOGY_DETECTED};

    fn analysis() -> RepositoryAnalysis {
        RepositoryAnalysis {
            name: "Hello-World".into(),
            owner: "octocat".into(),
            url: "https://github.com/octocat/Hello-World".into(),
            description: "My first repository on GitHub!".into(),
            technologies: BTreeSet::from(["Rust".to_string(), "Docker".to_string()]),
            features: vec!["Says hello".into()],
            code_excerpts: vec![CodeExcerpt {
                language: "Rust".into(),
                path: "src/main.rs".into(),
                snippet: "fn main() {}".into(),
            }],
            stats: RepoStats::default(),
            content_summary: String::new(),
            file_structure: vec![],
        }
    }

    #[test]
    fn test_local_script_follows_layout_within_bounds() {
        let bounds = DurationBounds::default();
        let script = local_script(&analysis(), &SectionKind::DEFAULT_LAYOUT, &bounds).unwrap();

        assert_eq!(script.source, ScriptSource::LocalTemplate);
        assert_eq!(
            script.sections.iter().map(|s| s.kind).collect::<Vec<_>>(),
            SectionKind::DEFAULT_LAYOUT.to_vec()
        );
        assert!(bounds.contains(script.total_duration_secs()));
        assert!(script.sections[2].text.contains("Docker and Rust"));
        assert!(script.sections[3].text.contains("src/main.rs"));
    }

    #[test]
    fn test_local_script_handles_sparse_analysis() {
        let mut a = analysis();
        a.technologies = BTreeSet::from([NO_TECHNOLOGY_DETECTED.to_string()]);
        a.features.clear();
        a.code_excerpts.clear();
        a.description.clear();

        let script = local_script(&a, &[], &DurationBounds::default()).unwrap();
        assert_eq!(script.sections.len(), 5);
        assert!(script.sections.iter().all(|s| !s.text.is_empty()));
        assert!(!script.sections[2].text.contains(NO_TECHNOLOGY_DETECTED));
    }

    #[test]
    fn test_local_script_fails_on_missing_name() {
        let mut a = analysis();
        a.name = String::new();
        assert!(matches!(
            local_script(&a, &SectionKind::DEFAULT_LAYOUT, &DurationBounds::default()),
            Err(GenerationError::NoProvidersAvailable)
        ));
    }

    #[test]
    fn test_list_formatting() {
        assert_eq!(list(&["Rust"]), "Rust");
        assert_eq!(list(&["Go", "Rust", "Docker"]), "Go, Rust and Docker");
    }
}
