use std::{fmt, str::FromStr, sync::LazyLock};

use regex::Regex;

use crate::error::ValidationError;

static HTTPS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(?:https?://)?(?:www\.)?github\.com/(?P<owner>[A-Za-z0-9][A-Za-z0-9-]*)/(?P<repo>[A-Za-z0-9._-]+?)(?:\.git)?/?$",
    )
    .expect("Failed to compile regex")
});

static SSH_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(?:ssh://)?git@github\.com[:/](?P<owner>[A-Za-z0-9][A-Za-z0-9-]*)/(?P<repo>[A-Za-z0-9._-]+?)(?:\.git)?/?$",
    )
    .expect("Failed to compile regex")
});

/// A public GitHub repository reference in canonical form
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RepoUrl {
    owner: String,
    repo: String,
}

impl RepoUrl {
    /// Accepts the usual ways of writing a GitHub repository address and
    /// normalizes them; anything pointing elsewhere is rejected.
    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        let input = input.trim();
        if input.is_empty() {
            return Err(ValidationError::EmptyUrl);
        }

        let caps = HTTPS_RE
            .captures(input)
            .or_else(|| SSH_RE.captures(input))
            .ok_or(ValidationError::InvalidUrl)?;

        let owner = &caps["owner"];
        let repo = &caps["repo"];
        if repo == "." || repo == ".." || repo.is_empty() {
            return Err(ValidationError::InvalidUrl);
        }

        Ok(RepoUrl {
            owner: owner.to_string(),
            repo: repo.to_string(),
        })
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn repo(&self) -> &str {
        &self.repo
    }

    pub fn canonical(&self) -> String {
        format!("https://github.com/{}/{}", self.owner, self.repo)
    }
}

impl FromStr for RepoUrl {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RepoUrl::parse(s)
    }
}

impl fmt::Display for RepoUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.canonical())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_equivalent_forms_normalize_to_same_url() {
        let forms = [
            "https://github.com/octocat/Hello-World",
            "http://github.com/octocat/Hello-World",
            "https://www.github.com/octocat/Hello-World",
            "https://github.com/octocat/Hello-World/",
            "https://github.com/octocat/Hello-World.git",
            "github.com/octocat/Hello-World",
            "git@github.com:octocat/Hello-World.git",
            "ssh://git@github.com/octocat/Hello-World",
            "  https://github.com/octocat/Hello-World  ",
        ];

        for form in forms {
            let url = RepoUrl::parse(form).unwrap_or_else(|e| panic!("{form}: {e}"));
            assert_eq!(url.canonical(), "https://github.com/octocat/Hello-World");
        }
    }

    #[test]
    fn test_dotted_repo_names_are_kept() {
        let url = RepoUrl::parse("https://github.com/vercel/next.js").unwrap();
        assert_eq!(url.repo(), "next.js");
    }

    #[test]
    fn test_rejects_non_github_urls() {
        let rejected = [
            "https://gitlab.com/octocat/Hello-World",
            "https://github.com/octocat",
            "https://github.com/",
            "https://github.com/octocat/Hello-World/tree/main",
            "https://github.com/octocat/..",
            "ftp://github.com/octocat/Hello-World",
            "not a url",
        ];

        for form in rejected {
            assert_eq!(
                RepoUrl::parse(form),
                Err(ValidationError::InvalidUrl),
                "{form} should be rejected"
            );
        }
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(RepoUrl::parse("   "), Err(ValidationError::EmptyUrl));
    }
}
