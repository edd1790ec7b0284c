use std::{collections::BTreeSet, path::Path};

use itertools::Itertools;
use walkdir::WalkDir;

use super::RepoUrl;
use crate::{
    config::IngestLimits,
    error::IngestError,
    types::{CodeExcerpt, RepoStats, RepositoryAnalysis, NO_TECHNOLOGY_DETECTED},
};

const IGNORED_DIRS: &[&str] = &[
    "node_modules",
    "__pycache__",
    "venv",
    "env",
    "dist",
    "build",
    "target",
    "vendor",
    ".git",
    ".github",
    ".vscode",
];

const MANIFESTS: &[(&str, &str)] = &[
    ("cargo.toml", "Rust"),
    ("package.json", "JavaScript"),
    ("tsconfig.json", "TypeScript"),
    ("requirements.txt", "Python"),
    ("pyproject.toml", "Python"),
    ("setup.py", "Python"),
    ("go.mod", "Go"),
    ("pom.xml", "Java"),
    ("build.gradle", "Java"),
    ("build.gradle.kts", "Kotlin"),
    ("gemfile", "Ruby"),
    ("composer.json", "PHP"),
    ("package.swift", "Swift"),
    ("dockerfile", "Docker"),
    ("docker-compose.yml", "Docker"),
    ("docker-compose.yaml", "Docker"),
    ("makefile", ""),
];

const SOURCE_EXTENSIONS: &[(&str, &str)] = &[
    ("rs", "Rust"),
    ("py", "Python"),
    ("js", "JavaScript"),
    ("jsx", "JavaScript"),
    ("mjs", "JavaScript"),
    ("ts", "TypeScript"),
    ("tsx", "TypeScript"),
    ("go", "Go"),
    ("java", "Java"),
    ("kt", "Kotlin"),
    ("swift", "Swift"),
    ("rb", "Ruby"),
    ("php", "PHP"),
    ("c", "C"),
    ("h", "C"),
    ("cpp", "C++"),
    ("cc", "C++"),
    ("cxx", "C++"),
    ("hpp", "C++"),
    ("vue", "Vue.js"),
    ("svelte", "Svelte"),
];

const TEXT_EXTENSIONS: &[&str] = &[
    "md", "rst", "txt", "toml", "json", "yml", "yaml", "cfg", "ini", "html", "css", "sh",
];

/// Framework and service keywords searched for in manifests and the README
const KEYWORDS: &[(&str, &[&str])] = &[
    ("React", &["\"react\"", "react-dom", "create-react-app"]),
    ("Vue.js", &["\"vue\"", "vuejs", "vue.js"]),
    ("Angular", &["@angular/"]),
    ("Flask", &["flask"]),
    ("Django", &["django"]),
    ("FastAPI", &["fastapi"]),
    ("Express", &["\"express\"", "expressjs"]),
    ("Next.js", &["\"next\"", "next.js", "nextjs"]),
    ("Svelte", &["svelte"]),
    ("Kubernetes", &["kubernetes", "k8s", "kubectl"]),
    ("PostgreSQL", &["postgresql", "postgres", "psycopg", "sqlx"]),
    ("MySQL", &["mysql"]),
    ("MongoDB", &["mongodb", "mongoose"]),
    ("Redis", &["redis"]),
];

const FEATURE_HEADINGS: &[&str] = &[
    "features:",
    "functionality:",
    "## features",
    "## functionality",
    "### features",
    "what it does",
];

const SUMMARY_CHARS: usize = 2000;
const MAX_EXCERPTS: usize = 3;
const EXCERPT_LINES: usize = 15;
const EXCERPT_CHARS: usize = 600;
const MAX_STRUCTURE_ENTRIES: usize = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum FileClass {
    Readme,
    Manifest,
    Source,
    Text,
}

/// A text file taken from the extracted repository
#[derive(Debug, Clone)]
pub struct SourceFile {
    /// Path relative to the repository root, `/`-separated
    pub path: String,
    pub content: String,
    class: FileClass,
}

impl SourceFile {
    fn file_name(&self) -> &str {
        self.path.rsplit('/').next().unwrap_or(&self.path)
    }

    fn extension(&self) -> Option<&str> {
        self.file_name()
            .rsplit_once('.')
            .map(|(_, ext)| ext)
            .filter(|ext| !ext.is_empty())
    }

    fn language(&self) -> Option<&'static str> {
        let ext = self.extension()?.to_ascii_lowercase();
        SOURCE_EXTENSIONS
            .iter()
            .find(|(e, _)| *e == ext)
            .map(|(_, lang)| *lang)
    }
}

fn classify(rel_path: &str) -> Option<FileClass> {
    let name = rel_path.rsplit('/').next().unwrap_or(rel_path).to_ascii_lowercase();
    let depth = rel_path.matches('/').count();

    if depth == 0 && name.starts_with("readme") {
        return Some(FileClass::Readme);
    }
    if MANIFESTS.iter().any(|(m, _)| *m == name) {
        return Some(FileClass::Manifest);
    }

    let ext = name.rsplit_once('.').map(|(_, ext)| ext)?;
    if SOURCE_EXTENSIONS.iter().any(|(e, _)| *e == ext) {
        Some(FileClass::Source)
    } else if TEXT_EXTENSIONS.contains(&ext) {
        Some(FileClass::Text)
    } else {
        None
    }
}

pub(crate) fn is_ignored_dir(name: &str) -> bool {
    IGNORED_DIRS.contains(&name) || (name.starts_with('.') && name.len() > 1)
}

/// Walks an extracted repository and takes text files in priority order
/// (README, manifests, sources by depth then path, other text) until the
/// file or byte limit is reached.
///
/// The order only depends on relative paths, so two runs over the same
/// tree truncate at the same file.
#[tracing::instrument(skip(limits))]
pub fn collect_files(
    root: &Path,
    limits: &IngestLimits,
) -> Result<(Vec<SourceFile>, RepoStats), IngestError> {
    let candidates = WalkDir::new(root)
        .min_depth(1)
        .into_iter()
        .filter_entry(|e| {
            !(e.file_type().is_dir() && is_ignored_dir(&e.file_name().to_string_lossy()))
        })
        .filter_map(|e| {
            e.inspect_err(|e| tracing::warn!(error = ?e, "Skipping unreadable entry"))
                .ok()
        })
        .filter(|e| e.file_type().is_file())
        .filter_map(|e| {
            let rel = e.path().strip_prefix(root).ok()?;
            let rel = rel.components().map(|c| c.as_os_str().to_string_lossy()).join("/");
            let class = classify(&rel)?;
            let size = e.metadata().ok()?.len();
            (size <= limits.max_file_bytes).then_some((class, rel, e.into_path()))
        })
        .sorted_by(|(ca, pa, _), (cb, pb, _)| {
            ca.cmp(cb)
                .then_with(|| pa.matches('/').count().cmp(&pb.matches('/').count()))
                .then_with(|| pa.cmp(pb))
        })
        .collect::<Vec<_>>();

    let mut stats = RepoStats::default();
    let mut files = Vec::new();

    for (class, path, abs_path) in candidates {
        if files.len() >= limits.max_files {
            stats.truncated = true;
            break;
        }

        // binary or non-UTF-8 files are not useful to the script writer
        let Ok(content) = std::fs::read_to_string(&abs_path) else {
            continue;
        };
        let size = content.len() as u64;
        if stats.bytes_scanned + size > limits.max_total_bytes {
            stats.truncated = true;
            break;
        }

        stats.bytes_scanned += size;
        stats.files_scanned += 1;

        let file = SourceFile {
            path,
            content,
            class,
        };
        if let Some(lang) = file.language() {
            *stats.languages.entry(lang.to_string()).or_default() += 1;
        }
        files.push(file);
    }

    tracing::info!(
        files = stats.files_scanned,
        bytes = stats.bytes_scanned,
        truncated = stats.truncated,
        "Collected repository files"
    );

    Ok((files, stats))
}

/// Condenses collected files into the analysis handed to script generation
pub fn analyze(
    url: &RepoUrl,
    metadata_description: Option<String>,
    files: &[SourceFile],
    stats: RepoStats,
) -> RepositoryAnalysis {
    let readme = files
        .iter()
        .find(|f| f.class == FileClass::Readme)
        .map(|f| f.content.as_str())
        .unwrap_or_default();

    let description = metadata_description
        .map(|d| d.trim().to_string())
        .filter(|d| !d.is_empty())
        .or_else(|| readme_description(readme))
        .unwrap_or_else(|| format!("A {} project", url.repo()));

    RepositoryAnalysis {
        name: url.repo().to_string(),
        owner: url.owner().to_string(),
        url: url.canonical(),
        description,
        technologies: detect_technologies(files, readme),
        features: extract_features(readme),
        code_excerpts: code_excerpts(files),
        stats,
        content_summary: content_summary(files),
        file_structure: files
            .iter()
            .map(|f| f.path.clone())
            .take(MAX_STRUCTURE_ENTRIES)
            .collect(),
    }
}

/// First prose line following the README's top-level heading
fn readme_description(readme: &str) -> Option<String> {
    let lines = readme.lines().take(20).collect::<Vec<_>>();
    let heading = lines.iter().position(|l| l.trim().starts_with("# "))?;

    lines
        .iter()
        .skip(heading + 1)
        .take(4)
        .map(|l| l.trim())
        .find(|l| !l.is_empty() && !l.starts_with('#') && !l.starts_with("[![") && !l.starts_with('<'))
        .map(str::to_string)
}

fn detect_technologies(files: &[SourceFile], readme: &str) -> BTreeSet<String> {
    let mut technologies = BTreeSet::new();

    for file in files {
        if let Some(lang) = file.language() {
            technologies.insert(lang.to_string());
        }
        if file.class == FileClass::Manifest {
            let name = file.file_name().to_ascii_lowercase();
            if let Some((_, tech)) = MANIFESTS.iter().find(|(m, _)| *m == name) {
                if !tech.is_empty() {
                    technologies.insert(tech.to_string());
                }
            }
        }
    }

    let haystack = files
        .iter()
        .filter(|f| f.class == FileClass::Manifest)
        .map(|f| f.content.to_lowercase())
        .chain(std::iter::once(readme.to_lowercase()))
        .join("\n");

    for (tech, needles) in KEYWORDS {
        if needles.iter().any(|n| haystack.contains(n)) {
            technologies.insert(tech.to_string());
        }
    }

    if technologies.is_empty() {
        technologies.insert(NO_TECHNOLOGY_DETECTED.to_string());
    }
    technologies
}

fn strip_bullet(line: &str) -> Option<&str> {
    let line = line.trim();
    for prefix in ["- ", "* ", "+ ", "• "] {
        if let Some(rest) = line.strip_prefix(prefix) {
            return Some(rest.trim());
        }
    }

    // numbered list items, "1. foo"
    let (num, rest) = line.split_once(". ")?;
    (!num.is_empty() && num.chars().all(|c| c.is_ascii_digit())).then(|| rest.trim())
}

fn clean_feature(text: &str) -> String {
    text.replace("**", "").replace('`', "").trim().to_string()
}

/// Bullets under a README "features" heading, else general README bullets
fn extract_features(readme: &str) -> Vec<String> {
    let mut features = Vec::new();
    let mut in_section = false;

    for line in readme.lines() {
        let lower = line.trim().to_lowercase();
        if FEATURE_HEADINGS.iter().any(|h| lower.contains(h)) {
            in_section = true;
            continue;
        }
        if in_section && lower.starts_with("##") {
            break;
        }
        if in_section {
            if let Some(feature) = strip_bullet(line).map(clean_feature) {
                if (11..150).contains(&feature.chars().count()) {
                    features.push(feature);
                }
            }
            if features.len() >= 8 {
                break;
            }
        }
    }

    if features.is_empty() {
        features = readme
            .lines()
            .take(50)
            .filter_map(strip_bullet)
            .map(clean_feature)
            .filter(|f| (16..120).contains(&f.chars().count()))
            .take(6)
            .collect();
    }

    features
}

fn truncate_chars(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((idx, _)) => s[..idx].to_string(),
        None => s.to_string(),
    }
}

fn code_excerpts(files: &[SourceFile]) -> Vec<CodeExcerpt> {
    files
        .iter()
        .filter(|f| f.class == FileClass::Source)
        .filter_map(|f| {
            let snippet = f
                .content
                .lines()
                .filter(|l| !l.trim().is_empty())
                .take(EXCERPT_LINES)
                .join("\n");
            if snippet.is_empty() {
                return None;
            }
            Some(CodeExcerpt {
                language: f.language().unwrap_or("Text").to_string(),
                path: f.path.clone(),
                snippet: truncate_chars(&snippet, EXCERPT_CHARS),
            })
        })
        .take(MAX_EXCERPTS)
        .collect()
}

fn content_summary(files: &[SourceFile]) -> String {
    let mut summary = String::new();
    for file in files {
        if summary.chars().count() >= SUMMARY_CHARS {
            break;
        }
        summary.push_str(&format!("=== {} ===\n{}\n", file.path, file.content));
    }
    truncate_chars(&summary, SUMMARY_CHARS)
}

/// Per-language file counts, most common first
pub fn language_breakdown(stats: &RepoStats) -> Vec<(String, usize)> {
    stats
        .languages
        .iter()
        .map(|(lang, n)| (lang.clone(), *n))
        .sorted_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const README: &str = include_str!("../../../tests/fixtures/README.md");

    fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, content).unwrap();
    }

    fn fixture_repo() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        write(root, "README.md", README);
        write(root, "Cargo.toml", "[package]\nname = \"hello\"\n[dependencies]\nredis = \"0.23\"\n");
        write(root, "src/main.rs", "use std::io;\n\nfn main() {\n    println!(\"hello\");\n}\n");
        write(root, "src/lib/deep/util.rs", "pub fn util() {}\n");
        write(root, "scripts/greet.py", "print('hello')\n");
        write(root, "node_modules/left-pad/index.js", "module.exports = 1;\n");
        write(root, "target/debug/build.rs", "fn main() {}\n");
        write(root, "assets/logo.png", "not really a png");
        dir
    }

    fn url() -> RepoUrl {
        RepoUrl::parse("https://github.com/octocat/Hello-World").unwrap()
    }

    #[test]
    fn test_collect_orders_by_priority_and_skips_ignored_dirs() {
        let dir = fixture_repo();
        let (files, stats) = collect_files(dir.path(), &IngestLimits::default()).unwrap();
        let paths = files.iter().map(|f| f.path.as_str()).collect::<Vec<_>>();

        assert_eq!(
            paths,
            vec![
                "README.md",
                "Cargo.toml",
                "scripts/greet.py",
                "src/main.rs",
                "src/lib/deep/util.rs"
            ]
        );
        assert!(!stats.truncated);
        assert_eq!(stats.languages.get("Rust"), Some(&2));
    }

    #[test]
    fn test_truncation_is_deterministic() {
        let dir = fixture_repo();
        let limits = IngestLimits {
            max_files: 3,
            ..IngestLimits::default()
        };

        let (first, stats) = collect_files(dir.path(), &limits).unwrap();
        let (second, _) = collect_files(dir.path(), &limits).unwrap();

        assert!(stats.truncated);
        assert_eq!(first.len(), 3);
        assert_eq!(
            first.iter().map(|f| &f.path).collect::<Vec<_>>(),
            second.iter().map(|f| &f.path).collect::<Vec<_>>()
        );
    }

    #[test]
    fn test_analyze_extracts_description_features_and_technologies() {
        let dir = fixture_repo();
        let (files, stats) = collect_files(dir.path(), &IngestLimits::default()).unwrap();
        let analysis = analyze(&url(), None, &files, stats);

        assert_eq!(analysis.name, "Hello-World");
        assert_eq!(
            analysis.description,
            "A tiny demonstration repository that says hello to the world."
        );
        assert!(analysis.technologies.contains("Rust"));
        assert!(analysis.technologies.contains("Python"));
        assert!(analysis.technologies.contains("Redis"));
        assert_eq!(analysis.features.len(), 3);
        assert_eq!(analysis.features[0], "Prints a friendly greeting to stdout");
        assert_eq!(analysis.code_excerpts.len(), 3);
        assert_eq!(analysis.code_excerpts[0].path, "scripts/greet.py");
        assert!(analysis.content_summary.starts_with("=== README.md ==="));
    }

    #[test]
    fn test_metadata_description_wins() {
        let analysis = analyze(&url(), Some("From the API".into()), &[], RepoStats::default());
        assert_eq!(analysis.description, "From the API");
    }

    #[test]
    fn test_empty_repository_falls_back() {
        let analysis = analyze(&url(), None, &[], RepoStats::default());
        assert_eq!(analysis.description, "A Hello-World project");
        assert_eq!(
            analysis.technologies,
            BTreeSet::from([NO_TECHNOLOGY_DETECTED.to_string()])
        );
        assert!(analysis.features.is_empty());
        assert!(analysis.validate().is_ok());
    }

    #[test]
    fn test_general_bullets_used_without_feature_section() {
        let readme = "# Tool\n\nSome text.\n\n- Works with any POSIX shell out of the box\n- short\n";
        assert_eq!(
            extract_features(readme),
            vec!["Works with any POSIX shell out of the box".to_string()]
        );
    }

    #[test]
    fn test_excerpt_is_bounded() {
        let long = (0..40).map(|i| format!("let value_{i} = {i};")).join("\n\n");
        let file = SourceFile {
            path: "src/big.rs".into(),
            content: long,
            class: FileClass::Source,
        };
        let excerpts = code_excerpts(&[file]);
        assert_eq!(excerpts[0].snippet.lines().count(), EXCERPT_LINES);
        assert!(excerpts[0].snippet.chars().count() <= EXCERPT_CHARS);
    }
}
