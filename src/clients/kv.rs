use anyhow::Context;
use anyhow::Result;
use anyhow::bail;
use tokio::process::Command;

/// HTTP client using curl for talking to an external key-value service.
///
/// The service is expected to expose `GET`/`PUT {base}/kv/{key}` where the
/// request/response body is the raw value.
pub struct KvClient {
    base_url: String,
}

impl KvClient {
    pub fn new(base_url: String) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn key_url(&self, key: &str) -> String {
        format!("{}/kv/{}", self.base_url, key)
    }

    /// Fetch a value. Returns `None` when the key does not exist.
    pub async fn get(&self, key: &str) -> Result<Option<String>> {
        let output = Command::new("curl")
            .args([
                "-s",
                "-w",
                "\n%{http_code}",
                "-H",
                "Accept: application/octet-stream",
                &self.key_url(key),
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

        let (status_code, body) = parse_response(output.stdout)?;
        match status_code {
            200..=299 => Ok(Some(body)),
            404 => Ok(None),
            _ => bail!(
                "key-value service returned status {}: {}",
                status_code,
                body
            ),
        }
    }

    /// Store a value under a key, overwriting any previous value.
    pub async fn put(&self, key: &str, value: &str) -> Result<()> {
        let output = Command::new("curl")
            .args([
                "-s",
                "-w",
                "\n%{http_code}",
                "-X",
                "PUT",
                "-H",
                "Content-Type: application/octet-stream",
                "--data-binary",
                value,
                &self.key_url(key),
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

        let (status_code, body) = parse_response(output.stdout)?;
        if !(200..=299).contains(&status_code) {
            bail!(
                "key-value service returned status {}: {}",
                status_code,
                body
            );
        }

        Ok(())
    }

    /// Probe the service. Used at startup to decide whether the kv backend
    /// is usable at all.
    pub async fn ping(&self, key: &str) -> Result<()> {
        self.get(key).await.map(|_| ())
    }
}

/// Split a curl response with `-w "\n%{http_code}"` into status and body.
fn parse_response(stdout: Vec<u8>) -> Result<(u16, String)> {
    let output_str = String::from_utf8(stdout)?;
    let mut lines: Vec<&str> = output_str.rsplitn(2, '\n').collect();
    lines.reverse();

    let body = lines.first().unwrap_or(&"").to_string();
    let status_code = lines
        .get(1)
        .and_then(|s| s.parse::<u16>().ok())
        .unwrap_or(0);

    Ok((status_code, body))
}
