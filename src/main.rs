use anyhow::Context;

use folio_kernel::settings::Settings;
use folio_kernel::InitCtx;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = Settings::load().with_context(|| "failed to load FOLIO settings")?;

    folio_telemetry::init(&settings.telemetry)?;

    tracing::info!(
        env = ?settings.environment,
        db = %settings.database.endpoint,
        "folio-app bootstrap starting"
    );

    let (registry, state) = folio_app::build(&settings).await?;

    let migrations = registry.collect_migrations();
    folio_db::run_migrations(&state.db, &migrations).await?;

    let ctx = InitCtx {
        settings: &settings,
        db: &state.db,
    };
    registry.init_all(&ctx).await?;
    registry.start_all(&ctx).await?;

    folio_http::start_server(&registry, &settings).await?;

    registry.stop_all().await?;

    Ok(())
}
