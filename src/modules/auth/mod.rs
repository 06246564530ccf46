pub mod extract;
pub mod models;
pub mod service;

use async_trait::async_trait;
use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use serde_json::json;

use folio_http::AppError;
use folio_kernel::{InitCtx, Migration, Module};

use crate::state::AppState;
use models::{CredentialsRequest, TokenResponse};

/// Auth module wiring signup and login into the application router.
pub struct AuthModule {
    state: AppState,
}

#[async_trait]
impl Module for AuthModule {
    fn name(&self) -> &'static str {
        "auth"
    }

    async fn init(&self, ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        tracing::info!(
            module = self.name(),
            environment = ?ctx.settings.environment,
            "auth module initialized"
        );
        Ok(())
    }

    fn routes(&self) -> Router {
        Router::new()
            .route("/signup", post(signup))
            .route("/login", post(login))
            .with_state(self.state.clone())
    }

    fn openapi(&self) -> Option<serde_json::Value> {
        Some(json!({
            "paths": {
                "/signup": {
                    "post": {
                        "summary": "Register a new user",
                        "tags": ["Auth"],
                        "requestBody": {
                            "content": {
                                "application/json": {
                                    "schema": { "$ref": "#/components/schemas/Credentials" }
                                }
                            }
                        },
                        "responses": {
                            "200": {
                                "description": "Bearer token for the new user",
                                "content": {
                                    "application/json": {
                                        "schema": { "$ref": "#/components/schemas/Token" }
                                    }
                                }
                            },
                            "400": {
                                "description": "Validation error or user already exists",
                                "content": {
                                    "application/json": {
                                        "schema": { "$ref": "#/components/schemas/ErrorResponse" }
                                    }
                                }
                            }
                        }
                    }
                },
                "/login": {
                    "post": {
                        "summary": "Authenticate and obtain a token",
                        "tags": ["Auth"],
                        "requestBody": {
                            "content": {
                                "application/json": {
                                    "schema": { "$ref": "#/components/schemas/Credentials" }
                                }
                            }
                        },
                        "responses": {
                            "200": {
                                "description": "Bearer token",
                                "content": {
                                    "application/json": {
                                        "schema": { "$ref": "#/components/schemas/Token" }
                                    }
                                }
                            },
                            "400": {
                                "description": "Invalid credentials",
                                "content": {
                                    "application/json": {
                                        "schema": { "$ref": "#/components/schemas/ErrorResponse" }
                                    }
                                }
                            }
                        }
                    }
                }
            },
            "components": {
                "schemas": {
                    "Credentials": {
                        "type": "object",
                        "properties": {
                            "username": { "type": "string" },
                            "password": { "type": "string" }
                        },
                        "required": ["username", "password"]
                    },
                    "Token": {
                        "type": "object",
                        "properties": {
                            "token": { "type": "string" }
                        },
                        "required": ["token"]
                    }
                }
            }
        }))
    }

    fn migrations(&self) -> Vec<Migration> {
        vec![Migration {
            id: "001_init",
            up: r#"
                DEFINE TABLE IF NOT EXISTS user SCHEMAFULL;
                DEFINE FIELD IF NOT EXISTS username ON user TYPE string ASSERT $value != "";
                DEFINE FIELD IF NOT EXISTS passwordHash ON user TYPE string;
                DEFINE FIELD IF NOT EXISTS createdAt ON user TYPE datetime;
                DEFINE FIELD IF NOT EXISTS updatedAt ON user TYPE datetime;
                DEFINE INDEX IF NOT EXISTS user_username_unique ON user FIELDS username UNIQUE;
                "#,
        }]
    }

    async fn start(&self, _ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        tracing::info!(module = self.name(), "auth module started");
        Ok(())
    }

    async fn stop(&self) -> anyhow::Result<()> {
        tracing::info!(module = self.name(), "auth module stopped");
        Ok(())
    }
}

fn validate_credentials(body: &CredentialsRequest) -> Result<(), AppError> {
    let mut details = Vec::new();
    if body.username.trim().is_empty() {
        details.push(json!({"field": "username", "error": "required"}));
    }
    if body.password.trim().is_empty() {
        details.push(json!({"field": "password", "error": "required"}));
    }

    if details.is_empty() {
        Ok(())
    } else {
        Err(AppError::validation(details, "Validation failed"))
    }
}

async fn signup(
    State(state): State<AppState>,
    Json(body): Json<CredentialsRequest>,
) -> Result<Json<TokenResponse>, AppError> {
    validate_credentials(&body)?;

    let token = state.auth.signup(body.username, body.password).await?;

    Ok(Json(TokenResponse { token }))
}

async fn login(
    State(state): State<AppState>,
    Json(body): Json<CredentialsRequest>,
) -> Result<Json<TokenResponse>, AppError> {
    validate_credentials(&body)?;

    let token = state.auth.login(body.username, body.password).await?;

    Ok(Json(TokenResponse { token }))
}

/// Create a new instance of the auth module
pub fn create_module(state: AppState) -> std::sync::Arc<dyn Module> {
    std::sync::Arc::new(AuthModule { state })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_fail_validation() {
        let body = CredentialsRequest {
            username: String::new(),
            password: "secret".to_string(),
        };

        let err = validate_credentials(&body).unwrap_err();
        match err {
            AppError::Validation { details, .. } => assert_eq!(details.len(), 1),
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn complete_credentials_pass_validation() {
        let body = CredentialsRequest {
            username: "alice".to_string(),
            password: "secret".to_string(),
        };

        assert!(validate_credentials(&body).is_ok());
    }
}
