use std::process::Command;

use url::Url;

use crate::error::{CiWatchError, Result};

fn git(args: &[&str]) -> Result<String> {
    let output = Command::new("git").args(args).output()?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(CiWatchError::Git(format!(
            "git {} failed: {}",
            args.join(" "),
            stderr.trim()
        )));
    }
    Ok(String::from_utf8_lossy(&output.stdout).trim().to_owned())
}

/// Name of the currently checked-out branch.
pub fn current_branch() -> Result<String> {
    git(&["rev-parse", "--abbrev-ref", "HEAD"])
}

/// Namespaced project path (`group/project`) derived from a remote's URL.
pub fn remote_project_path(remote: &str) -> Result<String> {
    let url = git(&["remote", "get-url", remote])?;
    parse_project_path(&url).ok_or_else(|| {
        CiWatchError::Git(format!(
            "cannot determine project path from remote {remote} ({url})"
        ))
    })
}

/// Extracts `group/project` from ssh://, scp-like, and http(s) remote URLs.
fn parse_project_path(remote_url: &str) -> Option<String> {
    let trimmed = remote_url.trim();
    let trimmed = trimmed.strip_suffix(".git").unwrap_or(trimmed);

    let path = if trimmed.contains("://") {
        let parsed = Url::parse(trimmed).ok()?;
        parsed.path().trim_matches('/').to_owned()
    } else {
        // scp-like: git@gitlab.com:group/project
        let (_, path) = trimmed.split_once(':')?;
        path.trim_matches('/').to_owned()
    };

    if path.is_empty() {
        None
    } else {
        Some(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_scp_like_remote() {
        assert_eq!(
            parse_project_path("git@gitlab.com:group/project.git").as_deref(),
            Some("group/project")
        );
    }

    #[test]
    fn test_parse_https_remote() {
        assert_eq!(
            parse_project_path("https://gitlab.example.com/group/sub/project.git").as_deref(),
            Some("group/sub/project")
        );
    }

    #[test]
    fn test_parse_ssh_scheme_remote() {
        assert_eq!(
            parse_project_path("ssh://git@gitlab.com/group/project.git").as_deref(),
            Some("group/project")
        );
    }

    #[test]
    fn test_parse_remote_without_suffix() {
        assert_eq!(
            parse_project_path("git@gitlab.com:group/project").as_deref(),
            Some("group/project")
        );
    }

    #[test]
    fn test_parse_rejects_pathless_remote() {
        assert_eq!(parse_project_path("https://gitlab.com/"), None);
        assert_eq!(parse_project_path("not-a-remote"), None);
    }
}
