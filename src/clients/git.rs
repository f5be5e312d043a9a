use std::path::Path;

use anyhow::Context;
use anyhow::Result;
use anyhow::bail;
use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use tokio::process::Command;

// -----------------------------------------------------------------------------
// GitOps trait

/// Operations the pipeline needs from the version-control tool. Each call
/// runs against an explicit working directory so concurrent jobs never share
/// repository state.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait GitOps: Send + Sync {
    async fn clone_repo(&self, remote: &str, dest: &Path) -> Result<()>;
    async fn checkout(&self, dir: &Path, reference: &str) -> Result<()>;
    async fn create_branch(&self, dir: &Path, name: &str) -> Result<()>;
    async fn configure_identity(&self, dir: &Path, name: &str, email: &str) -> Result<()>;
    /// Stage `paths` and commit them with `message`.
    async fn commit(&self, dir: &Path, message: &str, paths: &[String]) -> Result<()>;
    async fn push(&self, dir: &Path, branch: &str) -> Result<()>;
}

// -----------------------------------------------------------------------------
// GitClient

/// Real implementation that calls the git CLI.
pub struct GitClient;

impl GitClient {
    async fn run(&self, dir: Option<&Path>, args: &[&str]) -> Result<String> {
        let mut command = Command::new("git");
        if let Some(dir) = dir {
            command.current_dir(dir);
        }
        let output = command
            .args(args)
            .output()
            .await
            .context("Failed to execute git command")?;

        if !output.status.success() {
            bail!(
                "git {} failed: {}",
                args.first().unwrap_or(&""),
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }

        Ok(String::from_utf8(output.stdout)?.trim().to_string())
    }
}

#[async_trait]
impl GitOps for GitClient {
    async fn clone_repo(&self, remote: &str, dest: &Path) -> Result<()> {
        let dest = dest.to_string_lossy();
        self.run(None, &["clone", remote, dest.as_ref()]).await?;
        Ok(())
    }

    async fn checkout(&self, dir: &Path, reference: &str) -> Result<()> {
        self.run(Some(dir), &["checkout", reference]).await?;
        Ok(())
    }

    async fn create_branch(&self, dir: &Path, name: &str) -> Result<()> {
        self.run(Some(dir), &["checkout", "-b", name]).await?;
        Ok(())
    }

    async fn configure_identity(&self, dir: &Path, name: &str, email: &str) -> Result<()> {
        self.run(Some(dir), &["config", "user.name", name]).await?;
        self.run(Some(dir), &["config", "user.email", email]).await?;
        Ok(())
    }

    async fn commit(&self, dir: &Path, message: &str, paths: &[String]) -> Result<()> {
        let mut add_args = vec!["add", "--"];
        add_args.extend(paths.iter().map(String::as_str));
        self.run(Some(dir), &add_args).await?;
        self.run(Some(dir), &["commit", "-m", message]).await?;
        Ok(())
    }

    async fn push(&self, dir: &Path, branch: &str) -> Result<()> {
        self.run(Some(dir), &["push", "origin", branch]).await?;
        Ok(())
    }
}
