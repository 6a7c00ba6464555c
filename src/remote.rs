//! Remote specifiers — the `owner/repo`, URL, and path forms a plan-file
//! entry can name, and the rules for telling them apart.

use std::fmt;
use std::path::{Path, PathBuf};

/// A validated remote specifier (spec.md §3, `Remote`).
///
/// `OwnerRepo`, `HttpsGithub`, and `SshGithub` are the only forms for which
/// the Forge Client is consulted; every other form is local/opaque and
/// reconciliation skips forge interaction for it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Remote {
    OwnerRepo { owner: String, repo: String },
    FileUrl { path: PathBuf },
    AbsolutePath { path: PathBuf },
    HttpsGithub { owner: String, repo: String },
    SshGithub { owner: String, repo: String },
    OtherUrl { url: String },
}

impl Remote {
    /// Parse one `remote` token from a plan-file entry line.
    ///
    /// Grammar (spec.md §4.3):
    /// ```text
    /// remote := owner '/' repo
    ///        |  'file://' path
    ///        |  'https://' ...
    ///        |  'git@' host ':' path
    ///        |  absolute-path
    /// ```
    pub fn parse(token: &str) -> Remote {
        if let Some(path) = token.strip_prefix("file://") {
            return Remote::FileUrl {
                path: PathBuf::from(path),
            };
        }
        if let Some(rest) = token.strip_prefix("https://") {
            if let Some((owner, repo)) = github_https_owner_repo(rest) {
                return Remote::HttpsGithub { owner, repo };
            }
            return Remote::OtherUrl {
                url: token.to_string(),
            };
        }
        if token.starts_with("git@") {
            if let Some((owner, repo)) = github_ssh_owner_repo(token) {
                return Remote::SshGithub { owner, repo };
            }
            return Remote::OtherUrl {
                url: token.to_string(),
            };
        }
        if token.starts_with('/') {
            return Remote::AbsolutePath {
                path: PathBuf::from(token),
            };
        }
        // owner/repo: exactly one '/', no scheme, no leading slash.
        if let Some((owner, repo)) = token.split_once('/')
            && !owner.is_empty()
            && !repo.is_empty()
            && !repo.contains('/')
        {
            return Remote::OwnerRepo {
                owner: owner.to_string(),
                repo: repo.to_string(),
            };
        }
        Remote::OtherUrl {
            url: token.to_string(),
        }
    }

    /// Whether this remote form is valid for Forge Client operations.
    pub fn is_forge_hosted(&self) -> bool {
        self.forge_owner_repo().is_some()
    }

    /// `(owner, repo)` for the three forge-hosted variants, else `None`.
    pub fn forge_owner_repo(&self) -> Option<(&str, &str)> {
        match self {
            Remote::OwnerRepo { owner, repo }
            | Remote::HttpsGithub { owner, repo }
            | Remote::SshGithub { owner, repo } => Some((owner, repo)),
            _ => None,
        }
    }

    /// Canonical key used for Pass 1 reference counting (spec.md §4.4): the
    /// authoritative `owner/repo` for forge remotes, or the absolute path for
    /// everything else.
    pub fn canonical_key(&self) -> String {
        match self {
            Remote::OwnerRepo { owner, repo }
            | Remote::HttpsGithub { owner, repo }
            | Remote::SshGithub { owner, repo } => format!("{owner}/{repo}"),
            Remote::FileUrl { path } | Remote::AbsolutePath { path } => {
                path.to_string_lossy().into_owned()
            }
            Remote::OtherUrl { url } => url.clone(),
        }
    }

    /// The directory base name a clone of this remote would use when no
    /// explicit target is given, e.g. `acme/alpha` -> `alpha`.
    pub fn base_name(&self) -> String {
        match self {
            Remote::OwnerRepo { repo, .. }
            | Remote::HttpsGithub { repo, .. }
            | Remote::SshGithub { repo, .. } => repo.clone(),
            Remote::FileUrl { path } | Remote::AbsolutePath { path } => path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| "repo".to_string()),
            Remote::OtherUrl { url } => {
                let trimmed = url.trim_end_matches('/').trim_end_matches(".git");
                Path::new(trimmed)
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_else(|| "repo".to_string())
            }
        }
    }

    /// The URL/path `git clone` should be given for this remote.
    pub fn clone_url(&self) -> String {
        match self {
            Remote::OwnerRepo { owner, repo } => format!("https://github.com/{owner}/{repo}.git"),
            Remote::HttpsGithub { owner, repo } => format!("https://github.com/{owner}/{repo}.git"),
            Remote::SshGithub { owner, repo } => format!("git@github.com:{owner}/{repo}.git"),
            Remote::FileUrl { path } => format!("file://{}", path.display()),
            Remote::AbsolutePath { path } => path.display().to_string(),
            Remote::OtherUrl { url } => url.clone(),
        }
    }
}

impl fmt::Display for Remote {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.canonical_key())
    }
}

fn github_https_owner_repo(rest: &str) -> Option<(String, String)> {
    let rest = rest.strip_prefix("github.com/")?;
    let rest = rest.trim_end_matches('/').trim_end_matches(".git");
    let (owner, repo) = rest.split_once('/')?;
    if owner.is_empty() || repo.is_empty() || repo.contains('/') {
        return None;
    }
    Some((owner.to_string(), repo.to_string()))
}

fn github_ssh_owner_repo(token: &str) -> Option<(String, String)> {
    // git@github.com:owner/repo(.git)
    let rest = token.strip_prefix("git@github.com:")?;
    let rest = rest.trim_end_matches('/').trim_end_matches(".git");
    let (owner, repo) = rest.split_once('/')?;
    if owner.is_empty() || repo.is_empty() || repo.contains('/') {
        return None;
    }
    Some((owner.to_string(), repo.to_string()))
}

/// Replace every `/` in a branch name with `-`, producing a filesystem-safe
/// path segment. Identity when `x` contains no `/` (spec.md §8 round-trip
/// property).
pub fn sanitize(branch: &str) -> String {
    branch.replace('/', "-")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn owner_repo_parses() {
        assert_eq!(
            Remote::parse("acme/alpha"),
            Remote::OwnerRepo {
                owner: "acme".into(),
                repo: "alpha".into()
            }
        );
    }

    #[test]
    fn https_github_parses_owner_repo() {
        assert_eq!(
            Remote::parse("https://github.com/acme/alpha.git"),
            Remote::HttpsGithub {
                owner: "acme".into(),
                repo: "alpha".into()
            }
        );
    }

    #[test]
    fn ssh_github_parses_owner_repo() {
        assert_eq!(
            Remote::parse("git@github.com:acme/alpha.git"),
            Remote::SshGithub {
                owner: "acme".into(),
                repo: "alpha".into()
            }
        );
    }

    #[test]
    fn absolute_path_is_local() {
        let r = Remote::parse("/srv/repos/alpha");
        assert!(!r.is_forge_hosted());
        assert_eq!(r.base_name(), "alpha");
    }

    #[test]
    fn file_url_is_local() {
        let r = Remote::parse("file:///srv/repos/alpha");
        assert!(matches!(r, Remote::FileUrl { .. }));
        assert!(!r.is_forge_hosted());
    }

    #[test]
    fn other_url_is_opaque() {
        let r = Remote::parse("https://gitlab.com/acme/alpha.git");
        assert!(matches!(r, Remote::OtherUrl { .. }));
        assert!(!r.is_forge_hosted());
    }

    #[test]
    fn sanitize_replaces_slashes() {
        assert_eq!(sanitize("feature/x"), "feature-x");
        assert_eq!(sanitize("main"), "main");
    }

    #[rstest::rstest]
    #[case::owner_repo("acme/alpha", false)]
    #[case::https_github("https://github.com/acme/alpha.git", true)]
    #[case::ssh_github("git@github.com:acme/alpha.git", true)]
    #[case::absolute_path("/srv/repos/alpha", false)]
    #[case::file_url("file:///srv/repos/alpha", false)]
    #[case::other_forge("https://gitlab.com/acme/alpha.git", false)]
    fn forge_hosted_classification(#[case] token: &str, #[case] expect_forge_hosted: bool) {
        assert_eq!(Remote::parse(token).is_forge_hosted(), expect_forge_hosted);
    }

    #[rstest::rstest]
    #[case::no_slash("main", "main")]
    #[case::one_slash("feature/x", "feature-x")]
    #[case::nested_slashes("release/2024/q1", "release-2024-q1")]
    fn sanitize_table(#[case] branch: &str, #[case] expected: &str) {
        assert_eq!(sanitize(branch), expected);
    }
}
