//! Security guards applied before any filesystem, subprocess, or network access.
//!
//! Every executor that accepts a path, working directory, command string, or
//! URL runs it through one of these guards first. A violation never reaches
//! the underlying OS call.

use std::path::{Component, Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use reqwest::Url;

use super::error::SecurityViolation;

/// Hosts reachable when a strategy supplies no `allowedHosts`.
pub const DEFAULT_ALLOWED_HOSTS: [&str; 2] = ["localhost", "127.0.0.1"];

/// Destructive command patterns, matched against the assembled command line.
static DANGEROUS_COMMANDS: LazyLock<Vec<(Regex, &'static str)>> = LazyLock::new(|| {
    [
        (
            concat!(
                r"\brm\s+(?:-[A-Za-z-]+\s+)*-[A-Za-z]*[rR][A-Za-z]*\s+(?:-\S+\s+)*",
                r#"["']?(?:/|~|\$\{?HOME\b|\*["']?(?:\s|$)|\.\.["']?(?:/|\s|$)|\.["']?(?:\s|$))"#,
            ),
            "recursive delete of a root-like path",
        ),
        (r"\brm\s+.*--no-preserve-root", "recursive delete of the filesystem root"),
        (
            r"\b(?:curl|wget)\b[^|;&]*\|\s*(?:sudo\s+)?(?:ba|z|da|k|fi)?sh\b",
            "remote script piped into a shell",
        ),
        (r"\bdd\b[^|;&]*\bof=/dev/", "raw device write"),
        (r">\s*/dev/(?:sd|hd|vd|xvd|nvme|disk|mmcblk)", "raw device write"),
        (r"\bmkfs(?:\.\w+)?\b", "filesystem format"),
        (r":\(\)\s*\{\s*:\s*\|\s*:\s*&\s*\}\s*;\s*:", "fork bomb"),
        (
            r"\bchmod\s+(?:-\S+\s+)*-[A-Za-z]*R[A-Za-z]*\s+\S+\s+/(?:\s|$)",
            "recursive permission change on root",
        ),
    ]
    .into_iter()
    .map(|(pattern, description)| {
        (Regex::new(pattern).expect("dangerous command pattern must compile"), description)
    })
    .collect()
});

/// Collapses `.` and `..` components without touching the filesystem.
///
/// `..` never climbs above the path's root.
#[must_use]
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                normalized.pop();
            }
            other => normalized.push(other.as_os_str()),
        }
    }
    normalized
}

/// Resolves `candidate` against `root` and ensures it stays inside `root`.
///
/// The check is lexical, so it runs before (and independently of) any
/// existence check: both `../../etc/passwd` and `/etc/passwd` are rejected
/// whether or not they exist.
///
/// # Errors
///
/// Returns [`SecurityViolation::PathEscape`] when the resolved path is not
/// the root itself or one of its descendants.
pub fn resolve_within(root: &Path, candidate: &str) -> Result<PathBuf, SecurityViolation> {
    let root = normalize_path(root);
    let resolved = normalize_path(&root.join(candidate));
    if resolved.starts_with(&root) {
        Ok(resolved)
    } else {
        Err(SecurityViolation::PathEscape { path: candidate.to_string(), root })
    }
}

/// Ensures an existing path, with symlinks resolved, stays inside `root`.
///
/// Paths that cannot be canonicalized (dangling links, races) are rejected.
///
/// # Errors
///
/// Returns [`SecurityViolation::PathEscape`] when the canonical path leaves
/// the canonical root.
pub fn ensure_contained(root: &Path, path: &Path) -> Result<(), SecurityViolation> {
    let escape = || SecurityViolation::PathEscape {
        path: path.display().to_string(),
        root: root.to_path_buf(),
    };
    let canonical_root = root.canonicalize().map_err(|_| escape())?;
    let canonical_path = path.canonicalize().map_err(|_| escape())?;
    if canonical_path.starts_with(&canonical_root) {
        Ok(())
    } else {
        Err(escape())
    }
}

/// Rejects command lines that match a known destructive pattern.
///
/// # Errors
///
/// Returns [`SecurityViolation::DangerousCommand`] naming the matched pattern.
pub fn check_command(command: &str) -> Result<(), SecurityViolation> {
    match DANGEROUS_COMMANDS.iter().find(|(pattern, _)| pattern.is_match(command)) {
        Some((_, description)) => {
            Err(SecurityViolation::DangerousCommand { command: command.to_string(), description })
        }
        None => Ok(()),
    }
}

/// Returns `true` if `host` matches an allowlist entry.
///
/// Entries are exact hostnames or `*.suffix` wildcards; a wildcard matches
/// any subdomain depth but not the bare suffix itself.
#[must_use]
pub fn host_matches(host: &str, entry: &str) -> bool {
    let host = host.trim_end_matches('.').to_ascii_lowercase();
    let entry = entry.trim().trim_end_matches('.').to_ascii_lowercase();
    match entry.strip_prefix("*.") {
        Some(suffix) => host.len() > suffix.len() + 1 && host.ends_with(&format!(".{suffix}")),
        None => host == entry,
    }
}

/// Parses `url` and checks its host against the allowlist.
///
/// Without `allowed_hosts` (or with an empty list) only `localhost` and
/// `127.0.0.1` are reachable.
///
/// # Errors
///
/// Returns a [`SecurityViolation`] for unparsable URLs, non-HTTP schemes, and
/// hosts outside the allowlist.
pub fn check_url(url: &str, allowed_hosts: Option<&[String]>) -> Result<Url, SecurityViolation> {
    let parsed = Url::parse(url).map_err(|e| SecurityViolation::InvalidUrl {
        url: url.to_string(),
        message: e.to_string(),
    })?;

    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(SecurityViolation::DisallowedScheme { scheme: parsed.scheme().to_string() });
    }

    let host = parsed.host_str().ok_or_else(|| SecurityViolation::InvalidUrl {
        url: url.to_string(),
        message: "URL has no host".to_string(),
    })?;

    let allowed = match allowed_hosts {
        Some(entries) if !entries.is_empty() => {
            entries.iter().any(|entry| host_matches(host, entry))
        }
        _ => DEFAULT_ALLOWED_HOSTS.iter().any(|entry| host_matches(host, entry)),
    };

    if allowed {
        Ok(parsed)
    } else {
        Err(SecurityViolation::DisallowedHost { host: host.to_string() })
    }
}
