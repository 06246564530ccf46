//! FOLIO Application Library
//!
//! Book catalog and review service assembled from FOLIO framework modules.

pub mod modules;
pub mod state;

pub use state::AppState;

use folio_kernel::settings::Settings;
use folio_kernel::ModuleRegistry;

use modules::auth::service::AuthService;
use modules::books::catalog::CatalogService;
use modules::books::reviews::ReviewPolicy;

/// Connect to the database, build the shared state, and register all modules.
pub async fn build(settings: &Settings) -> anyhow::Result<(ModuleRegistry, AppState)> {
    let db = folio_db::connect(&settings.database).await?;

    let auth = AuthService::new(db.clone(), &settings.auth);
    let catalog = CatalogService::new(db.clone());
    let reviews = ReviewPolicy::new(catalog.clone());

    let state = AppState {
        db,
        auth,
        catalog,
        reviews,
    };

    let mut registry = ModuleRegistry::new();
    modules::register_all(&mut registry, &state);

    Ok((registry, state))
}
