use std::{
    fs::File,
    io::{self, Read},
    path::{Component, Path, PathBuf},
};

use itertools::Itertools;

use reqwest::StatusCode;
use reqwest_middleware::ClientWithMiddleware;
use tokio::io::AsyncWriteExt;
use zip::ZipArchive;

use crate::{config::IngestLimits, error::IngestError, github::analysis::is_ignored_dir};

/// Result of fetching one branch archive
#[derive(Debug)]
pub enum Download {
    Saved { bytes: u64 },
    Missing,
}

/// Streams `url` into `dest`, aborting once more than `limit_bytes` arrive.
///
/// A 404 is reported as [`Download::Missing`] so the caller can try the next
/// branch.
#[tracing::instrument(skip(client))]
pub async fn download_archive(
    client: &ClientWithMiddleware,
    url: &str,
    dest: &Path,
    limit_bytes: u64,
) -> Result<Download, IngestError> {
    let mut resp = client
        .get(url)
        .header("User-Agent", "repo-reel")
        .send()
        .await
        .inspect_err(|e| tracing::error!(error = ?e, "Failed to request archive"))?;

    if resp.status() == StatusCode::NOT_FOUND {
        return Ok(Download::Missing);
    }
    if !resp.status().is_success() {
        return Err(IngestError::Network(format!(
            "archive request failed with status {}",
            resp.status()
        )));
    }

    if let Some(len) = resp.content_length().filter(|len| *len > limit_bytes) {
        return Err(IngestError::TooLarge {
            size_bytes: len,
            limit_bytes,
        });
    }

    let mut file = tokio::fs::File::create(dest).await?;
    let mut written = 0u64;
    while let Some(chunk) = resp.chunk().await? {
        written += chunk.len() as u64;
        if written > limit_bytes {
            return Err(IngestError::TooLarge {
                size_bytes: written,
                limit_bytes,
            });
        }
        file.write_all(&chunk).await?;
    }
    file.flush().await?;

    tracing::debug!(bytes = written, "Archive downloaded");
    Ok(Download::Saved { bytes: written })
}

/// True when a directory part of `rel` (after the first `skip` components)
/// is one the analysis never reads
fn in_ignored_dir(rel: &Path, is_dir: bool, skip: usize) -> bool {
    let dirs = if is_dir { Some(rel) } else { rel.parent() };
    dirs.into_iter()
        .flat_map(Path::components)
        .skip(skip)
        .any(|c| matches!(c, Component::Normal(name) if is_ignored_dir(&name.to_string_lossy())))
}

/// Unpacks `zip_path` below `dest` and returns the repository root.
///
/// Entries whose names would escape `dest` are skipped, as are files
/// larger than `max_file_bytes` and anything inside ignored directories.
/// Extraction stops with [`IngestError::TooManyEntries`] or
/// [`IngestError::TooLarge`] once the archive exceeds `max_entries` or the
/// unpacked bytes exceed `max_extracted_bytes`. Codeload archives wrap
/// everything in a single `<repo>-<branch>/` directory; when present that
/// directory is the returned root.
pub fn extract_archive(zip_path: &Path, dest: &Path, limits: &IngestLimits) -> Result<PathBuf, IngestError> {
    let mut archive = ZipArchive::new(File::open(zip_path)?)?;
    if archive.len() > limits.max_entries {
        return Err(IngestError::TooManyEntries {
            count: archive.len(),
            limit: limits.max_entries,
        });
    }
    std::fs::create_dir_all(dest)?;

    let wrapped = archive
        .file_names()
        .map(|name| name.split('/').next().unwrap_or_default())
        .all_equal();
    let skip = usize::from(wrapped);

    let mut extracted = 0u64;
    for i in 0..archive.len() {
        let mut entry = archive.by_index(i)?;
        let Some(rel) = entry.enclosed_name() else {
            tracing::warn!(name = entry.name(), "Skipping archive entry with unsafe path");
            continue;
        };
        if in_ignored_dir(&rel, entry.is_dir(), skip) {
            continue;
        }
        let out_path = dest.join(rel);

        if entry.is_dir() {
            std::fs::create_dir_all(&out_path)?;
            continue;
        }
        if entry.size() > limits.max_file_bytes {
            continue;
        }
        if let Some(parent) = out_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut out = File::create(&out_path)?;
        // the declared size is not trusted
        extracted += io::copy(&mut (&mut entry).take(limits.max_file_bytes), &mut out)?;
        if extracted > limits.max_extracted_bytes {
            tracing::warn!(extracted, limit = limits.max_extracted_bytes, "Archive expands beyond the limit");
            return Err(IngestError::TooLarge {
                size_bytes: extracted,
                limit_bytes: limits.max_extracted_bytes,
            });
        }
    }

    let mut top_level = std::fs::read_dir(dest)?.filter_map(Result::ok);
    let root = match (top_level.next(), top_level.next()) {
        (Some(only), None) if only.path().is_dir() => only.path(),
        _ => dest.to_path_buf(),
    };
    Ok(root)
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use zip::write::SimpleFileOptions;

    use super::*;

    fn build_zip(path: &Path, entries: &[(&str, &str)]) {
        let mut writer = zip::ZipWriter::new(File::create(path).unwrap());
        for (name, content) in entries {
            writer
                .start_file(*name, SimpleFileOptions::default())
                .unwrap();
            writer.write_all(content.as_bytes()).unwrap();
        }
        writer.finish().unwrap();
    }

    fn limits(max_file_bytes: u64) -> IngestLimits {
        IngestLimits {
            max_file_bytes,
            ..IngestLimits::default()
        }
    }

    #[test]
    fn test_extract_returns_wrapped_root() {
        let dir = tempfile::tempdir().unwrap();
        let zip_path = dir.path().join("repo.zip");
        build_zip(
            &zip_path,
            &[
                ("Hello-World-main/README.md", "# Hello"),
                ("Hello-World-main/src/main.rs", "fn main() {}"),
            ],
        );

        let root = extract_archive(&zip_path, &dir.path().join("out"), &limits(1024)).unwrap();
        assert_eq!(root, dir.path().join("out").join("Hello-World-main"));
        assert!(root.join("src/main.rs").exists());
    }

    #[test]
    fn test_extract_skips_escaping_and_oversized_entries() {
        let dir = tempfile::tempdir().unwrap();
        let zip_path = dir.path().join("repo.zip");
        let big = "x".repeat(2048);
        build_zip(
            &zip_path,
            &[
                ("repo/../../evil.txt", "pwned"),
                ("repo/big.txt", &big),
                ("repo/ok.txt", "fine"),
            ],
        );

        let out = dir.path().join("out");
        let root = extract_archive(&zip_path, &out, &limits(1024)).unwrap();
        assert!(root.join("ok.txt").exists());
        assert!(!root.join("big.txt").exists());
        assert!(!dir.path().join("evil.txt").exists());
    }

    #[test]
    fn test_extract_skips_ignored_directories() {
        let dir = tempfile::tempdir().unwrap();
        let zip_path = dir.path().join("repo.zip");
        build_zip(
            &zip_path,
            &[
                ("app-main/README.md", "# App"),
                ("app-main/node_modules/left-pad/index.js", "module.exports = 1;"),
                ("app-main/src/target/notes.txt", "build output"),
                ("app-main/.git/HEAD", "ref: refs/heads/main"),
                ("app-main/src/main.rs", "fn main() {}"),
            ],
        );

        let root = extract_archive(&zip_path, &dir.path().join("out"), &limits(1024)).unwrap();
        assert_eq!(root, dir.path().join("out").join("app-main"));
        assert!(root.join("README.md").exists());
        assert!(root.join("src/main.rs").exists());
        assert!(!root.join("node_modules").exists());
        assert!(!root.join("src/target").exists());
        assert!(!root.join(".git").exists());
    }

    #[test]
    fn test_extract_stops_when_archive_expands_too_far() {
        let dir = tempfile::tempdir().unwrap();
        let zip_path = dir.path().join("repo.zip");
        let chunk = "x".repeat(600);
        build_zip(
            &zip_path,
            &[
                ("repo/a.txt", &chunk),
                ("repo/b.txt", &chunk),
                ("repo/c.txt", &chunk),
            ],
        );

        let tight = IngestLimits {
            max_file_bytes: 1024,
            max_extracted_bytes: 1000,
            ..IngestLimits::default()
        };
        let err = extract_archive(&zip_path, &dir.path().join("out"), &tight).unwrap_err();
        assert!(matches!(
            err,
            IngestError::TooLarge {
                size_bytes: 1200,
                limit_bytes: 1000
            }
        ));
    }

    #[test]
    fn test_extract_rejects_too_many_entries() {
        let dir = tempfile::tempdir().unwrap();
        let zip_path = dir.path().join("repo.zip");
        build_zip(
            &zip_path,
            &[("repo/a.txt", "a"), ("repo/b.txt", "b"), ("repo/c.txt", "c")],
        );

        let few = IngestLimits {
            max_entries: 2,
            ..IngestLimits::default()
        };
        let out = dir.path().join("out");
        let err = extract_archive(&zip_path, &out, &few).unwrap_err();
        assert!(matches!(err, IngestError::TooManyEntries { count: 3, limit: 2 }));
        assert!(!out.exists(), "nothing is unpacked");
    }
}
