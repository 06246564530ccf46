use surrealdb::engine::any::Any;
use surrealdb::Surreal;

use crate::modules::auth::service::AuthService;
use crate::modules::books::catalog::CatalogService;
use crate::modules::books::reviews::ReviewPolicy;

/// Shared application state handed to every module's routes.
#[derive(Clone)]
pub struct AppState {
    pub db: Surreal<Any>,
    pub auth: AuthService,
    pub catalog: CatalogService,
    pub reviews: ReviewPolicy,
}
