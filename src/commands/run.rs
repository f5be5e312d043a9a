use std::time::Duration;

use anyhow::Result;
use anyhow::bail;
use colored::Colorize;

use crate::App;
use crate::job::ChangeRequest;

const POLL_INTERVAL: Duration = Duration::from_millis(300);

impl App {
    /// Submit a change request and poll the job until it reaches a terminal
    /// state, printing each status transition along the way.
    pub async fn cmd_run(
        &self,
        request: ChangeRequest,
        stdout: &mut impl std::io::Write,
    ) -> Result<()> {
        let id = self.submit(request).await;
        writeln!(stdout, "Job ID: {}", id)?;

        let mut last_status = String::new();
        let report = loop {
            let report = self.result(&id).await;
            if report.status != last_status {
                writeln!(stdout, "Status: {}", colorize_status(&report.status))?;
                last_status = report.status.clone();
            }
            if report.status == "completed" || report.status == "failed" {
                break report;
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        };

        let result = report.result.as_deref().unwrap_or("(no result recorded)");
        writeln!(stdout, "{}", result)?;

        if report.status == "failed" {
            bail!("job {} failed", id);
        }
        Ok(())
    }

    pub fn cmd_health(&self, stdout: &mut impl std::io::Write) -> Result<()> {
        writeln!(stdout, "{}", self.health())?;
        Ok(())
    }
}

fn colorize_status(status: &str) -> colored::ColoredString {
    match status {
        "completed" => status.green(),
        "failed" => status.red(),
        "running" => status.yellow(),
        _ => status.normal(),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use anyhow::anyhow;

    use super::*;
    use crate::clients::git::MockGitOps;
    use crate::clients::github::MockRepoHostOps;
    use crate::config::Config;
    use crate::store::MemoryStore;

    fn happy_git_mock() -> MockGitOps {
        let mut git = MockGitOps::new();
        git.expect_clone_repo().returning(|_, dest| {
            std::fs::create_dir_all(dest).unwrap();
            Ok(())
        });
        git.expect_checkout().returning(|_, _| Ok(()));
        git.expect_configure_identity().returning(|_, _, _| Ok(()));
        git.expect_create_branch().returning(|_, _| Ok(()));
        git.expect_commit().returning(|_, _, _| Ok(()));
        git.expect_push().returning(|_, _| Ok(()));
        git
    }

    fn request() -> ChangeRequest {
        ChangeRequest {
            description: "Describe the new flag".to_string(),
            repo_url: "https://github.com/octo/widgets.git".to_string(),
            base_branch: "main".to_string(),
            gate_command: None,
        }
    }

    #[tokio::test]
    async fn test_cmd_run_reports_completion_and_link() {
        let root = tempfile::tempdir().unwrap();
        let mut host = MockRepoHostOps::new();
        host.expect_create_change_request()
            .returning(|_, _, _, _, _, _| Ok("https://github.com/octo/widgets/pull/4".to_string()));
        let app = App::new(
            Config::default_for_tests(root.path().to_path_buf()),
            Arc::new(MemoryStore::new()),
            Arc::new(happy_git_mock()),
            Arc::new(host),
        );

        let mut stdout = Vec::new();
        app.cmd_run(request(), &mut stdout).await.unwrap();

        let out = String::from_utf8(stdout).unwrap();
        assert!(out.contains("Job ID: "));
        assert!(out.contains("completed"));
        assert!(out.contains("Pull request created: https://github.com/octo/widgets/pull/4"));
    }

    #[tokio::test]
    async fn test_cmd_run_fails_with_diagnostic_on_pipeline_error() {
        let root = tempfile::tempdir().unwrap();
        let mut git = MockGitOps::new();
        git.expect_clone_repo()
            .returning(|_, _| Err(anyhow!("git clone failed: repository not found")));
        let app = App::new(
            Config::default_for_tests(root.path().to_path_buf()),
            Arc::new(MemoryStore::new()),
            Arc::new(git),
            Arc::new(MockRepoHostOps::new()),
        );

        let mut stdout = Vec::new();
        let result = app.cmd_run(request(), &mut stdout).await;

        assert!(result.is_err());
        let out = String::from_utf8(stdout).unwrap();
        assert!(out.contains("failed"));
        assert!(out.contains("clone"));
    }

    #[tokio::test]
    async fn test_cmd_health_prints_ok() {
        let root = tempfile::tempdir().unwrap();
        let app = App::new(
            Config::default_for_tests(root.path().to_path_buf()),
            Arc::new(MemoryStore::new()),
            Arc::new(MockGitOps::new()),
            Arc::new(MockRepoHostOps::new()),
        );

        let mut stdout = Vec::new();
        app.cmd_health(&mut stdout).unwrap();
        assert_eq!(String::from_utf8(stdout).unwrap(), "ok\n");
    }
}
