use anyhow::Context;
use anyhow::Result;
use anyhow::bail;
use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use serde::Deserialize;
use serde::Serialize;
use tokio::process::Command;

// -----------------------------------------------------------------------------
// RepoHostOps trait

/// The one call the pipeline needs from the hosting service: open a change
/// request from `head` onto `base` and return a link to it.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait RepoHostOps: Send + Sync {
    async fn create_change_request(
        &self,
        repo_url: &str,
        title: &str,
        head: &str,
        base: &str,
        body: &str,
        token: &str,
    ) -> Result<String>;
}

// -----------------------------------------------------------------------------
// Types

#[derive(Debug, Deserialize)]
struct GitHubError {
    message: String,
    #[serde(default)]
    #[allow(dead_code)]
    documentation_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PullRequest {
    html_url: String,
}

#[derive(Debug, Serialize)]
struct CreatePullRequest {
    title: String,
    body: String,
    head: String,
    base: String,
}

// -----------------------------------------------------------------------------
// GithubClient

/// Real implementation that calls the GitHub REST API through curl.
pub struct GithubClient;

impl GithubClient {
    /// Make an authenticated POST request, surfacing the API's own error
    /// message on a non-success response.
    async fn post(&self, url: &str, json_data: &str, token: &str) -> Result<String> {
        let output = Command::new("curl")
            .args([
                "-s",
                "-w",
                "\n%{http_code}",
                "-X",
                "POST",
                "-H",
                &format!("Authorization: Bearer {}", token),
                "-H",
                "Accept: application/vnd.github+json",
                "-H",
                "Content-Type: application/json",
                "-H",
                "User-Agent: prbot",
                "-d",
                json_data,
                url,
            ])
            .output()
            .await
            .context("Failed to execute curl command")?;

        if !output.status.success() {
            bail!(
                "curl command failed: {}",
                String::from_utf8_lossy(&output.stderr)
            );
        }

        parse_response(output.stdout)
    }
}

#[async_trait]
impl RepoHostOps for GithubClient {
    async fn create_change_request(
        &self,
        repo_url: &str,
        title: &str,
        head: &str,
        base: &str,
        body: &str,
        token: &str,
    ) -> Result<String> {
        let (owner, repo) = parse_owner_repo(repo_url)?;
        let url = format!("https://api.github.com/repos/{}/{}/pulls", owner, repo);

        let request_body = CreatePullRequest {
            title: title.to_string(),
            body: body.to_string(),
            head: head.to_string(),
            base: base.to_string(),
        };

        let json_data = serde_json::to_string(&request_body)?;
        let response = self.post(&url, &json_data, token).await?;
        let pr: PullRequest = serde_json::from_str(&response)?;
        Ok(pr.html_url)
    }
}

/// Parse curl response with status code appended
fn parse_response(stdout: Vec<u8>) -> Result<String> {
    let output_str = String::from_utf8(stdout)?;
    let mut lines: Vec<&str> = output_str.rsplitn(2, '\n').collect();
    lines.reverse();

    let response = lines.first().unwrap_or(&"").to_string();
    let status_code = lines
        .get(1)
        .and_then(|s| s.parse::<u16>().ok())
        .unwrap_or(0);

    if status_code >= 400 {
        if let Ok(error) = serde_json::from_str::<GitHubError>(&response) {
            bail!("GitHub API error: {}", error.message);
        }
        bail!(
            "GitHub API request failed with status {}: {}",
            status_code,
            response
        );
    }

    Ok(response)
}

/// Derive owner and repository from a GitHub remote address.
///
/// Accepts:
/// - git@github.com:owner/repo.git
/// - https://github.com/owner/repo.git
pub fn parse_owner_repo(url: &str) -> Result<(String, String)> {
    let parts = if url.starts_with("git@github.com:") {
        url.strip_prefix("git@github.com:")
            .context("Invalid GitHub URL format")?
    } else if url.starts_with("https://github.com/") {
        url.strip_prefix("https://github.com/")
            .context("Invalid GitHub URL format")?
    } else {
        bail!("Repository address is not a GitHub URL: {}", url);
    };

    let parts = parts.strip_suffix(".git").unwrap_or(parts);
    let mut split = parts.split('/');
    let owner = split
        .next()
        .filter(|s| !s.is_empty())
        .context("Could not parse owner from GitHub URL")?
        .to_string();
    let repo = split
        .next()
        .filter(|s| !s.is_empty())
        .context("Could not parse repo from GitHub URL")?
        .to_string();

    Ok((owner, repo))
}
