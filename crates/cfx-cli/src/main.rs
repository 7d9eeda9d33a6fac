use anyhow::{Context, Result};
use cfx_config::AppConfig;
use cfx_daemon::state::{open_store, AppState};
use cfx_db::QueryService;
use clap::{Parser, Subcommand};
use tracing::info;

#[derive(Parser)]
#[command(name = "cfx")]
#[command(about = "Country FX desk CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Database commands
    Db {
        #[command(subcommand)]
        cmd: DbCmd,
    },

    /// Run one full refresh against the configured feeds and print the outcome
    Refresh,

    /// Print stored country count and last refresh time
    Status,
}

#[derive(Subcommand)]
enum DbCmd {
    /// Connectivity and schema presence
    Status,

    /// Apply embedded SQL migrations
    Migrate,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let cfg = AppConfig::from_env()?;
    init_tracing();

    match cli.cmd {
        Commands::Db { cmd } => {
            let pool = cfx_db::connect(cfg.database_url()?).await?;
            match cmd {
                DbCmd::Status => {
                    let s = cfx_db::status(&pool).await?;
                    println!("db_ok={} has_countries_table={}", s.ok, s.has_countries_table);
                }
                DbCmd::Migrate => {
                    cfx_db::migrate(&pool).await?;
                    info!("migrations applied");
                    println!("migrations_applied=true");
                }
            }
        }

        Commands::Refresh => {
            let st = AppState::from_config(&cfg).await?;
            info!(countries_url = %cfg.countries_url, "refresh starting");
            let out = st.reconciler.reconcile().await.context("refresh failed")?;
            info!(
                created = out.created,
                updated = out.updated,
                skipped = out.skipped,
                "refresh done"
            );
            println!("{}", serde_json::to_string_pretty(&out)?);
        }

        Commands::Status => {
            let query = QueryService::new(open_store(&cfg.store).await?);
            let s = query.status().await.context("status query failed")?;
            println!("{}", serde_json::to_string_pretty(&s)?);
        }
    }

    Ok(())
}

/// Logs go to stderr; stdout carries only command output.
fn init_tracing() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()),
        )
        .init();
}
