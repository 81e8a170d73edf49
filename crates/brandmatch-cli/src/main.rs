mod generate;
mod normalize;
mod recommend;

use std::path::PathBuf;

use anyhow::Context;
use brandmatch_core::{AppConfig, RecommendOptions, TaskType};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "brandmatch-cli")]
#[command(about = "Campaign brief, recommendation and AI-assist tooling")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Print the normalized brief for a campaign JSON file
    Normalize {
        path: PathBuf,

        /// List the fields that fell back to defaults on stderr
        #[arg(long)]
        report: bool,
    },
    /// Request influencer recommendations for a campaign
    Recommend {
        /// Stored campaign to read the brief from
        #[arg(long, conflicts_with = "file", required_unless_present = "file")]
        campaign: Option<String>,

        /// Campaign JSON file to read the brief from
        #[arg(long)]
        file: Option<PathBuf>,

        /// Disable adaptive scoring weights
        #[arg(long)]
        no_adaptive_weights: bool,

        /// Skip per-influencer insight text
        #[arg(long)]
        no_insights: bool,

        /// Store the response as the campaign's recommendation data
        #[arg(long, requires = "campaign")]
        save: bool,
    },
    /// Generate strategies and insights for a stored campaign
    Generate {
        campaign: String,

        /// Only generate for this influencer
        #[arg(long)]
        influencer: Option<String>,

        /// Only run this task (strategy, comment, caption, score, performance)
        #[arg(long, requires = "influencer", value_parser = parse_task)]
        task: Option<TaskType>,
    },
    /// Probe the recommendation service
    Status,
    /// Apply pending database migrations
    Migrate,
}

fn parse_task(raw: &str) -> Result<TaskType, String> {
    raw.parse().map_err(|e| format!("{e}"))
}

fn load_config() -> anyhow::Result<AppConfig> {
    brandmatch_core::load_app_config().context("loading configuration")
}

async fn connect(config: &AppConfig) -> anyhow::Result<sqlx::PgPool> {
    let pool_config = brandmatch_db::PoolConfig::from_app_config(config);
    let pool = brandmatch_db::connect_pool(&config.database_url, pool_config)
        .await
        .context("connecting to the database")?;
    Ok(pool)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let log_level = std::env::var("BRANDMATCH_LOG_LEVEL").unwrap_or_else(|_| "info".into());
    let env_filter =
        EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(log_level))?;
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Normalize { path, report } => normalize::run_normalize(&path, report)?,
        Commands::Recommend {
            campaign,
            file,
            no_adaptive_weights,
            no_insights,
            save,
        } => {
            let config = load_config()?;
            let options = RecommendOptions {
                adaptive_weights: !no_adaptive_weights,
                include_insights: !no_insights,
            };
            let source = match (campaign, file) {
                (Some(id), _) => recommend::BriefSource::Campaign(id),
                (None, Some(path)) => recommend::BriefSource::File(path),
                (None, None) => anyhow::bail!("either --campaign or --file is required"),
            };
            recommend::run_recommend(&config, source, options, save).await?;
        }
        Commands::Generate {
            campaign,
            influencer,
            task,
        } => {
            let config = load_config()?;
            generate::run_generate(&config, &campaign, influencer.as_deref(), task).await?;
        }
        Commands::Status => {
            let config = load_config()?;
            recommend::run_status(&config).await?;
        }
        Commands::Migrate => {
            let config = load_config()?;
            let pool = connect(&config).await?;
            let applied = brandmatch_db::run_migrations(&pool).await?;
            println!("migrations up to date ({applied} applied)");
        }
    }

    Ok(())
}
