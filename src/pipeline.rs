use std::path::Path;
use std::sync::Arc;

use tokio::io::AsyncWriteExt;
use tracing::info;
use tracing::warn;

use crate::clients::git::GitOps;
use crate::clients::github::RepoHostOps;
use crate::config::Config;
use crate::error::PipelineError;
use crate::job::ChangeRequest;
use crate::job::JobId;
use crate::workspace::Workspace;

/// Committer identity for pipeline commits. The underlying tool refuses to
/// commit without one, and workspaces are fresh clones with no config.
const COMMITTER_NAME: &str = "prbot";
const COMMITTER_EMAIL: &str = "prbot@localhost";

/// The documentation file the reference change appends to.
const CHANGE_LOG_FILE: &str = "README.md";

/// Characters of the description carried into the change-request title.
const TITLE_LIMIT: usize = 50;

// -----------------------------------------------------------------------------
// ChangePipeline

/// The ordered sequence of steps that turns an accepted [`ChangeRequest`]
/// into a pull request, or an error describing the first step that failed.
/// Every step is a hard gate; nothing after a failure runs, except the
/// workspace cleanup which runs on every outcome.
pub struct ChangePipeline {
    config: Config,
    git: Arc<dyn GitOps>,
    host: Arc<dyn RepoHostOps>,
}

impl ChangePipeline {
    pub fn new(config: Config, git: Arc<dyn GitOps>, host: Arc<dyn RepoHostOps>) -> Self {
        Self { config, git, host }
    }

    /// Execute the pipeline for one job. On success the returned message
    /// embeds the created change request's link.
    pub async fn run(&self, id: &JobId, request: &ChangeRequest) -> Result<String, PipelineError> {
        // Credential check comes before anything else so a misconfigured
        // service fails without creating a workspace.
        let token = self
            .config
            .token
            .clone()
            .ok_or_else(|| PipelineError::Configuration("GITHUB_TOKEN is not set".to_string()))?;

        let workspace = Workspace::provision(&self.config.workspace_root, id).await?;
        let outcome = self.execute(&workspace, &token, id, request).await;
        workspace.cleanup().await;
        outcome
    }

    async fn execute(
        &self,
        workspace: &Workspace,
        token: &str,
        id: &JobId,
        request: &ChangeRequest,
    ) -> Result<String, PipelineError> {
        let repo_dir = workspace.repo_dir();
        let fetch_url = authenticated_url(&request.repo_url, token);

        info!("job {}: cloning {}", id, request.repo_url);
        self.git.clone_repo(&fetch_url, &repo_dir).await.map_err(vcs)?;
        self.git
            .checkout(&repo_dir, &request.base_branch)
            .await
            .map_err(vcs)?;
        self.git
            .configure_identity(&repo_dir, COMMITTER_NAME, COMMITTER_EMAIL)
            .await
            .map_err(vcs)?;

        let branch = format!("{}{}", self.config.branch_prefix, id.short());
        self.git.create_branch(&repo_dir, &branch).await.map_err(vcs)?;

        info!("job {}: applying change to {}", id, CHANGE_LOG_FILE);
        apply_change(&repo_dir, &request.description).await?;

        if let Some(gate) = &request.gate_command {
            self.run_gate(&repo_dir, gate).await?;
        }

        info!("job {}: committing and pushing {}", id, branch);
        self.git
            .commit(
                &repo_dir,
                &commit_message(&request.description),
                &[CHANGE_LOG_FILE.to_string()],
            )
            .await
            .map_err(vcs)?;
        self.git.push(&repo_dir, &branch).await.map_err(vcs)?;

        let title = change_title(&request.description);
        let body = format!("Change proposed by prbot:\n\n{}", request.description);
        let link = self
            .host
            .create_change_request(
                &request.repo_url,
                &title,
                &branch,
                &request.base_branch,
                &body,
                token,
            )
            .await
            .map_err(|err| PipelineError::HostApi(format!("{:#}", err)))?;

        Ok(format!("Pull request created: {}", link))
    }

    /// Run the optional gate command in the workspace. An unresolvable
    /// executable skips the gate instead of failing the job; a resolvable
    /// one that exits non-zero aborts the pipeline before anything is
    /// committed or pushed.
    async fn run_gate(&self, dir: &Path, command: &str) -> Result<(), PipelineError> {
        let Some(argv) = resolve_gate_command(command) else {
            warn!("gate command '{}' not found, skipping verification", command);
            return Ok(());
        };

        info!("running gate command: {}", command);
        let status = tokio::process::Command::new(&argv[0])
            .args(&argv[1..])
            .current_dir(dir)
            .status()
            .await
            .map_err(|err| PipelineError::Workspace(format!("failed to run gate command: {}", err)))?;

        if !status.success() {
            return Err(PipelineError::GateFailed);
        }

        Ok(())
    }
}

fn vcs(err: anyhow::Error) -> PipelineError {
    PipelineError::VersionControl(format!("{:#}", err))
}

// -----------------------------------------------------------------------------
// Step helpers

/// Embed the access token into an https fetch address. Other address forms
/// (ssh remotes, local paths) are used as-is.
fn authenticated_url(repo_url: &str, token: &str) -> String {
    match repo_url.strip_prefix("https://") {
        Some(rest) => format!("https://{}@{}", token, rest),
        None => repo_url.to_string(),
    }
}

/// Append a timestamped note describing the change to the documentation
/// file, creating it if the repository has none.
async fn apply_change(repo_dir: &Path, description: &str) -> Result<(), PipelineError> {
    let path = repo_dir.join(CHANGE_LOG_FILE);
    let timestamp = chrono::Utc::now().format("%Y-%m-%d %H:%M:%S UTC");
    let note = format!("\n\n## Proposed change ({})\n\n{}\n", timestamp, description);

    let mut file = tokio::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .await
        .map_err(|err| PipelineError::Workspace(format!("failed to open {}: {}", path.display(), err)))?;
    file.write_all(note.as_bytes())
        .await
        .map_err(|err| PipelineError::Workspace(format!("failed to write {}: {}", path.display(), err)))?;

    Ok(())
}

fn commit_message(description: &str) -> String {
    format!("prbot: {}", description)
}

fn change_title(description: &str) -> String {
    let truncated: String = description.chars().take(TITLE_LIMIT).collect();
    format!("prbot: {}", truncated)
}

/// Split the gate command and resolve its executable. Returns `None` when
/// the command is empty or the executable cannot be found, in which case
/// the gate is skipped rather than failed.
fn resolve_gate_command(command: &str) -> Option<Vec<String>> {
    let argv: Vec<String> = command.split_whitespace().map(str::to_string).collect();
    let program = argv.first()?.clone();

    if program.contains(std::path::MAIN_SEPARATOR) {
        if Path::new(&program).is_file() {
            return Some(argv);
        }
        return None;
    }

    let path_var = std::env::var_os("PATH")?;
    for dir in std::env::split_paths(&path_var) {
        if dir.join(&program).is_file() {
            return Some(argv);
        }
    }
    None
}
