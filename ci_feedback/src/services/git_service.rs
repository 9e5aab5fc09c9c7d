//! Local git queries.

use tokio::process::Command;

/// Name of the branch checked out in the current directory.
pub async fn current_branch() -> anyhow::Result<String> {
    let output = Command::new("git")
        .args(["rev-parse", "--abbrev-ref", "HEAD"])
        .output()
        .await?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        anyhow::bail!("git rev-parse failed: {}", stderr.trim());
    }

    let branch = String::from_utf8_lossy(&output.stdout).trim().to_string();
    if branch.is_empty() || branch == "HEAD" {
        anyhow::bail!("not on a branch (detached HEAD); pass --branch or set CI_BRANCH");
    }

    Ok(branch)
}
