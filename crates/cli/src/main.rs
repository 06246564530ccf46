use anyhow::Context;
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "folio", about = "FOLIO book catalog service", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP server
    Serve,
    /// Apply pending database migrations and exit
    Migrate,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let settings = folio_kernel::settings::Settings::load()
        .with_context(|| "failed to load FOLIO settings")?;

    folio_telemetry::init(&settings.telemetry)?;

    match cli.command {
        Command::Serve => {
            let (registry, state) = folio_app::build(&settings).await?;

            let migrations = registry.collect_migrations();
            folio_db::run_migrations(&state.db, &migrations).await?;

            let ctx = folio_kernel::InitCtx {
                settings: &settings,
                db: &state.db,
            };
            registry.init_all(&ctx).await?;
            registry.start_all(&ctx).await?;

            folio_http::start_server(&registry, &settings).await?;

            registry.stop_all().await?;
        }
        Command::Migrate => {
            let (registry, state) = folio_app::build(&settings).await?;

            let migrations = registry.collect_migrations();
            folio_db::run_migrations(&state.db, &migrations).await?;

            tracing::info!(count = migrations.len(), "migrations complete");
        }
    }

    Ok(())
}
