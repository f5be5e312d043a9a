use std::path::Path;
use std::path::PathBuf;

use tokio::process::Command;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::Layer as _;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::layer::SubscriberExt as _;
use tracing_subscriber::util::SubscriberInitExt as _;

/// Run a git command in `dir`, returning stdout on success.
pub async fn run_git(dir: &Path, args: &[&str]) -> anyhow::Result<String> {
    let output = Command::new("git")
        .current_dir(dir)
        .args(args)
        .output()
        .await?;
    anyhow::ensure!(
        output.status.success(),
        "git {:?} failed: {}",
        args,
        String::from_utf8_lossy(&output.stderr)
    );
    Ok(String::from_utf8(output.stdout)?.trim().to_string())
}

/// Create a bare repository seeded with one commit on `main`, suitable as a
/// clone/push target for pipeline runs. Returns the bare repository path.
pub async fn create_seed_remote(root: &Path) -> anyhow::Result<PathBuf> {
    let bare = root.join("origin.git");
    let seed = root.join("seed");
    tokio::fs::create_dir_all(&bare).await?;
    tokio::fs::create_dir_all(&seed).await?;

    run_git(&bare, &["init", "--bare"]).await?;
    run_git(&bare, &["symbolic-ref", "HEAD", "refs/heads/main"]).await?;

    run_git(&seed, &["init"]).await?;
    run_git(&seed, &["config", "user.name", "Test User"]).await?;
    run_git(&seed, &["config", "user.email", "test@example.com"]).await?;
    run_git(&seed, &["remote", "add", "origin", &bare.to_string_lossy()]).await?;

    tokio::fs::write(seed.join("README.md"), "# Widgets\n\nSeed repository.\n").await?;
    run_git(&seed, &["add", "README.md"]).await?;
    run_git(&seed, &["commit", "-m", "Initial commit"]).await?;
    run_git(&seed, &["branch", "-M", "main"]).await?;
    run_git(&seed, &["push", "origin", "main"]).await?;

    Ok(bare)
}

/// Whether `branch` exists in the given (bare) repository.
pub async fn branch_exists(repo: &Path, branch: &str) -> bool {
    run_git(repo, &["rev-parse", "--verify", &format!("refs/heads/{}", branch)])
        .await
        .is_ok()
}

/// Contents of `path` on `branch` in the given (bare) repository.
pub async fn show_file(repo: &Path, branch: &str, path: &str) -> anyhow::Result<String> {
    run_git(repo, &["show", &format!("{}:{}", branch, path)]).await
}

pub fn setup_logging() -> anyhow::Result<()> {
    let timer = tracing_subscriber::fmt::time::ChronoLocal::new("%H:%M:%S%.3f".into());
    let format = tracing_subscriber::fmt::format().with_timer(timer);
    let filter = tracing_subscriber::EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env()?;
    let subscriber = tracing_subscriber::fmt::layer()
        .event_format(format)
        .with_span_events(FmtSpan::NEW | FmtSpan::CLOSE)
        .with_filter(filter);
    tracing_subscriber::registry().with(subscriber).init();
    Ok(())
}

pub enum TestDir {
    Temp(tempfile::TempDir),
    Kept(std::path::PathBuf),
}

impl TestDir {
    pub fn new() -> std::io::Result<Self> {
        let temp_dir = tempfile::tempdir()?;

        if std::env::var("DEBUG_TESTS").is_ok() {
            let path = temp_dir.keep();
            eprintln!("Test directory kept at: {}", path.display());
            Ok(TestDir::Kept(path))
        } else {
            Ok(TestDir::Temp(temp_dir))
        }
    }

    pub fn path(&self) -> &std::path::Path {
        match self {
            TestDir::Temp(t) => t.path(),
            TestDir::Kept(p) => p.as_path(),
        }
    }
}
