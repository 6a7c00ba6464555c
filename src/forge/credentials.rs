//! Credential sourcing for the Forge Client (spec.md §4.1, "Credential
//! sourcing").

use std::io::Write;
use std::process::{Command, Stdio};

/// A token obtained from the environment or the system credential helper.
#[derive(Debug, Clone)]
pub struct Credential {
    pub token: String,
    pub username: Option<String>,
}

/// Try the environment first (`token_env` if configured via `config.toml`'s
/// `github-token-env`, then `GH_TOKEN`, then `GITHUB_TOKEN`), falling back to
/// a non-interactive probe of `git credential fill` for `host`. Returns
/// `None` when no usable credential is available — callers must then enter
/// read-only-local mode (spec.md §4.1).
pub fn source_credential(host: &str, token_env: Option<&str>) -> Option<Credential> {
    if let Some(name) = token_env
        && let Ok(token) = std::env::var(name)
        && !token.is_empty()
    {
        return Some(Credential {
            token,
            username: std::env::var("GH_USER").ok(),
        });
    }
    if let Ok(token) = std::env::var("GH_TOKEN")
        && !token.is_empty()
    {
        let username = std::env::var("GH_USER").ok();
        return Some(Credential { token, username });
    }
    if let Ok(token) = std::env::var("GITHUB_TOKEN")
        && !token.is_empty()
    {
        return Some(Credential {
            token,
            username: std::env::var("GH_USER").ok(),
        });
    }
    credential_helper_fill(host)
}

/// Invoke `git credential fill` non-interactively and parse its
/// `key=value` output. Line endings are normalized (CRLF stripped) before
/// parsing — a required interoperability behavior for credential helpers
/// that emit CRLF (spec.md §4.1, §9).
fn credential_helper_fill(host: &str) -> Option<Credential> {
    let mut child = Command::new("git")
        .args(["credential", "fill"])
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .env("GIT_TERMINAL_PROMPT", "0")
        .spawn()
        .ok()?;

    {
        let stdin = child.stdin.as_mut()?;
        writeln!(stdin, "protocol=https").ok()?;
        writeln!(stdin, "host={host}").ok()?;
        writeln!(stdin).ok()?;
    }

    let output = child.wait_with_output().ok()?;
    if !output.status.success() {
        return None;
    }

    let stdout = String::from_utf8_lossy(&output.stdout).replace("\r\n", "\n");

    let mut token = None;
    let mut username = None;
    for line in stdout.lines() {
        if let Some(v) = line.strip_prefix("password=") {
            token = Some(v.to_string());
        } else if let Some(v) = line.strip_prefix("username=") {
            username = Some(v.to_string());
        }
    }

    token.map(|token| Credential { token, username })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crlf_output_is_normalized_before_parsing() {
        let stdout = "protocol=https\r\nhost=github.com\r\nusername=alice\r\npassword=abc123\r\n";
        let normalized = stdout.replace("\r\n", "\n");
        let mut token = None;
        let mut username = None;
        for line in normalized.lines() {
            if let Some(v) = line.strip_prefix("password=") {
                token = Some(v.to_string());
            } else if let Some(v) = line.strip_prefix("username=") {
                username = Some(v.to_string());
            }
        }
        assert_eq!(token.as_deref(), Some("abc123"));
        assert_eq!(username.as_deref(), Some("alice"));
    }
}
