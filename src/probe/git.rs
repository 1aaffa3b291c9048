use std::io::Read;
use std::path::Path;
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};

use anyhow::{bail, Context, Result};

/// Budget shared by every git invocation of one probe.
pub const PROBE_TIMEOUT: Duration = Duration::from_secs(2);

const POLL_INTERVAL: Duration = Duration::from_millis(5);

#[derive(Debug, Clone, Default, PartialEq)]
pub struct GitStatus {
    pub is_repo: bool,
    /// Branch name, or the short commit hash when detached.
    pub branch: String,
    pub detached: bool,
    pub staged: u32,
    pub modified: u32,
    pub untracked: u32,
    pub ahead: u32,
    pub behind: u32,
    pub stash: u32,
}

impl GitStatus {
    pub fn is_dirty(&self) -> bool {
        self.staged + self.modified + self.untracked > 0
    }
}

/// Inspect the working tree at `dir`. Every failure, including a missing
/// `git` binary or an exhausted time budget, reports `is_repo = false`.
pub fn probe(dir: &Path, with_stash: bool) -> GitStatus {
    if which::which("git").is_err() {
        tracing::debug!("git not found on PATH");
        return GitStatus::default();
    }
    let deadline = Instant::now() + PROBE_TIMEOUT;
    match probe_until(dir, with_stash, deadline) {
        Ok(status) => status,
        Err(e) => {
            tracing::debug!("git probe failed in {}: {:#}", dir.display(), e);
            GitStatus::default()
        }
    }
}

fn probe_until(dir: &Path, with_stash: bool, deadline: Instant) -> Result<GitStatus> {
    let inside = run_git(dir, &["rev-parse", "--is-inside-work-tree"], deadline)?;
    if inside.trim() != "true" {
        bail!("not a work tree");
    }

    let mut status = GitStatus {
        is_repo: true,
        ..Default::default()
    };

    let branch = run_git(dir, &["branch", "--show-current"], deadline)?;
    status.branch = branch.trim().to_string();
    if status.branch.is_empty() {
        let head = run_git(dir, &["rev-parse", "--short", "HEAD"], deadline)?;
        status.branch = head.trim().to_string();
        status.detached = true;
    }

    let porcelain = run_git(dir, &["status", "--porcelain"], deadline)?;
    let (staged, modified, untracked) = parse_porcelain(&porcelain);
    status.staged = staged;
    status.modified = modified;
    status.untracked = untracked;

    // No upstream is not an error; the counters just stay at zero.
    if let Ok(counts) = run_git(
        dir,
        &["rev-list", "--left-right", "--count", "@{upstream}...HEAD"],
        deadline,
    ) {
        let (behind, ahead) = parse_left_right(&counts);
        status.behind = behind;
        status.ahead = ahead;
    }

    if with_stash {
        if let Ok(list) = run_git(dir, &["stash", "list"], deadline) {
            status.stash = list.lines().filter(|l| !l.trim().is_empty()).count() as u32;
        }
    }

    Ok(status)
}

/// Run `git -C dir args...`, killing the child if `deadline` passes first.
fn run_git(dir: &Path, args: &[&str], deadline: Instant) -> Result<String> {
    let mut child = Command::new("git")
        .arg("-C")
        .arg(dir)
        .args(args)
        .env("GIT_OPTIONAL_LOCKS", "0")
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .context("failed to spawn git")?;

    // Drain stdout on a helper thread so a large status listing cannot fill
    // the pipe and stall the child.
    let mut stdout = child.stdout.take().context("git stdout not captured")?;
    let reader = std::thread::spawn(move || {
        let mut buf = String::new();
        let _ = stdout.read_to_string(&mut buf);
        buf
    });

    let status = loop {
        if let Some(status) = child.try_wait().context("failed to poll git")? {
            break status;
        }
        if Instant::now() >= deadline {
            let _ = child.kill();
            let _ = child.wait();
            bail!("git {} timed out", args.join(" "));
        }
        std::thread::sleep(POLL_INTERVAL);
    };

    let output = reader.join().unwrap_or_default();
    if !status.success() {
        bail!("git {} exited with {}", args.join(" "), status);
    }
    Ok(output)
}

/// Count (staged, modified, untracked) entries in `git status --porcelain`.
pub fn parse_porcelain(output: &str) -> (u32, u32, u32) {
    let (mut staged, mut modified, mut untracked) = (0, 0, 0);
    for line in output.lines() {
        let mut chars = line.chars();
        let (Some(x), Some(y)) = (chars.next(), chars.next()) else {
            continue;
        };
        if x == '?' && y == '?' {
            untracked += 1;
            continue;
        }
        if x != ' ' && x != '!' {
            staged += 1;
        }
        if y != ' ' && y != '!' {
            modified += 1;
        }
    }
    (staged, modified, untracked)
}

/// Parse `rev-list --left-right --count` output into (left, right).
fn parse_left_right(output: &str) -> (u32, u32) {
    let mut parts = output.split_whitespace().map(|p| p.parse::<u32>().unwrap_or(0));
    (parts.next().unwrap_or(0), parts.next().unwrap_or(0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_parse_porcelain() {
        let out = "M  staged.rs\n M modified.rs\nMM both.rs\n?? new.rs\n?? other.rs\nA  added.rs\n D gone.rs\n";
        assert_eq!(parse_porcelain(out), (3, 3, 2));
    }

    #[test]
    fn test_parse_porcelain_empty() {
        assert_eq!(parse_porcelain(""), (0, 0, 0));
        assert_eq!(parse_porcelain("\n\n"), (0, 0, 0));
    }

    #[test]
    fn test_parse_left_right() {
        assert_eq!(parse_left_right("2\t5\n"), (2, 5));
        assert_eq!(parse_left_right(""), (0, 0));
        assert_eq!(parse_left_right("x y"), (0, 0));
    }

    #[test]
    fn test_non_repo_is_not_repo() {
        let dir = TempDir::new().unwrap();
        let status = probe(&dir.path().join("missing"), true);
        assert!(!status.is_repo);
        assert_eq!(status, GitStatus::default());
    }

    #[test]
    fn test_dirty() {
        let status = GitStatus {
            untracked: 1,
            ..Default::default()
        };
        assert!(status.is_dirty());
        assert!(!GitStatus::default().is_dirty());
    }
}
