use anyhow::Result;
use clap::Parser;
use clap::Subcommand;
use prbot::App;
use prbot::job::ChangeRequest;
use tracing::level_filters::LevelFilter;

#[derive(Parser)]
#[command(name = "prbot")]
#[command(about = "Propose automated changes to a repository as trackable background jobs", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Submit a change request and poll the job until it finishes
    Run {
        /// Repository to propose the change to
        #[arg(long)]
        repo: String,
        /// Branch to base the change on
        #[arg(long, default_value = "main")]
        branch: String,
        /// Description of the change
        #[arg(short, long)]
        message: String,
        /// Optional verification command; a non-zero exit aborts the push
        #[arg(long)]
        gate: Option<String>,
    },
    /// Report service health
    Health,
}

fn setup_logging() -> Result<()> {
    let timer = tracing_subscriber::fmt::time::ChronoLocal::new("%H:%M:%S%.3f".into());
    let filter = tracing_subscriber::EnvFilter::builder()
        .with_default_directive(LevelFilter::WARN.into())
        .from_env()?;
    tracing_subscriber::fmt()
        .with_timer(timer)
        .with_env_filter(filter)
        .init();
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    setup_logging()?;

    let app = App::from_env().await?;
    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            repo,
            branch,
            message,
            gate,
        } => {
            let request = ChangeRequest {
                description: message,
                repo_url: repo,
                base_branch: branch,
                gate_command: gate,
            };
            app.cmd_run(request, &mut std::io::stdout()).await?
        }
        Commands::Health => app.cmd_health(&mut std::io::stdout())?,
    }

    Ok(())
}
