pub mod catalog;
pub mod models;
pub mod reviews;

use async_trait::async_trait;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post, put};
use axum::{Json, Router};
use serde_json::json;

use folio_http::AppError;
use folio_kernel::{InitCtx, Migration, Module};

use crate::modules::auth::extract::AuthUser;
use crate::state::AppState;
use models::{
    Book, BookView, CreateBookRequest, ListQuery, PageQuery, ReviewPayload, SearchQuery,
};
use reviews::{parse_page_param, ReviewPolicy};

const DEFAULT_PAGE: u64 = 1;
const DEFAULT_LIMIT: u64 = 10;

/// Books module: catalog CRUD, keyword search, and review management.
pub struct BooksModule {
    state: AppState,
}

#[async_trait]
impl Module for BooksModule {
    fn name(&self) -> &'static str {
        "books"
    }

    async fn init(&self, ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        tracing::info!(
            module = self.name(),
            environment = ?ctx.settings.environment,
            "books module initialized"
        );
        Ok(())
    }

    fn routes(&self) -> Router {
        Router::new()
            .route("/books", post(create_book).get(list_books))
            .route("/books/{id}", get(get_book))
            .route("/books/{id}/reviews", post(add_review))
            .route("/reviews/{id}", put(update_review).delete(delete_review))
            .route("/search", get(search_books))
            .with_state(self.state.clone())
    }

    fn openapi(&self) -> Option<serde_json::Value> {
        Some(json!({
            "paths": {
                "/books": {
                    "post": {
                        "summary": "Create a book",
                        "tags": ["Books"],
                        "responses": {
                            "201": {
                                "description": "Created book",
                                "content": {
                                    "application/json": {
                                        "schema": { "$ref": "#/components/schemas/Book" }
                                    }
                                }
                            },
                            "400": {
                                "description": "Validation error",
                                "content": {
                                    "application/json": {
                                        "schema": { "$ref": "#/components/schemas/ErrorResponse" }
                                    }
                                }
                            }
                        }
                    },
                    "get": {
                        "summary": "List books with optional genre and author filters",
                        "tags": ["Books"],
                        "responses": {
                            "200": {
                                "description": "Books matching the filters",
                                "content": {
                                    "application/json": {
                                        "schema": {
                                            "type": "array",
                                            "items": { "$ref": "#/components/schemas/Book" }
                                        }
                                    }
                                }
                            }
                        }
                    }
                },
                "/books/{id}": {
                    "get": {
                        "summary": "Get a book with rating summary and paginated reviews",
                        "tags": ["Books"],
                        "responses": {
                            "200": {
                                "description": "Book detail",
                                "content": {
                                    "application/json": {
                                        "schema": { "$ref": "#/components/schemas/BookView" }
                                    }
                                }
                            },
                            "404": {
                                "description": "Book not found",
                                "content": {
                                    "application/json": {
                                        "schema": { "$ref": "#/components/schemas/ErrorResponse" }
                                    }
                                }
                            }
                        }
                    }
                },
                "/books/{id}/reviews": {
                    "post": {
                        "summary": "Add a review to a book",
                        "tags": ["Reviews"],
                        "responses": {
                            "200": {
                                "description": "Book with the new review",
                                "content": {
                                    "application/json": {
                                        "schema": { "$ref": "#/components/schemas/Book" }
                                    }
                                }
                            }
                        }
                    }
                },
                "/reviews/{id}": {
                    "put": {
                        "summary": "Update a review",
                        "tags": ["Reviews"],
                        "responses": {
                            "200": {
                                "description": "Book with the updated review",
                                "content": {
                                    "application/json": {
                                        "schema": { "$ref": "#/components/schemas/Book" }
                                    }
                                }
                            }
                        }
                    },
                    "delete": {
                        "summary": "Delete a review",
                        "tags": ["Reviews"],
                        "responses": {
                            "200": {
                                "description": "Confirmation message"
                            }
                        }
                    }
                },
                "/search": {
                    "get": {
                        "summary": "Keyword search over titles and authors",
                        "tags": ["Books"],
                        "responses": {
                            "200": {
                                "description": "Matching books",
                                "content": {
                                    "application/json": {
                                        "schema": {
                                            "type": "array",
                                            "items": { "$ref": "#/components/schemas/Book" }
                                        }
                                    }
                                }
                            }
                        }
                    }
                }
            },
            "components": {
                "schemas": {
                    "Review": {
                        "type": "object",
                        "properties": {
                            "id": { "type": "string" },
                            "userId": { "type": "string" },
                            "rating": { "type": "integer", "minimum": 1, "maximum": 5 },
                            "comment": { "type": "string" },
                            "createdAt": { "type": "string", "format": "date-time" }
                        },
                        "required": ["id", "userId", "rating", "comment", "createdAt"]
                    },
                    "Book": {
                        "type": "object",
                        "properties": {
                            "id": { "type": "string" },
                            "title": { "type": "string" },
                            "author": { "type": "string" },
                            "genre": { "type": "string" },
                            "reviews": {
                                "type": "array",
                                "items": { "$ref": "#/components/schemas/Review" }
                            },
                            "createdAt": { "type": "string", "format": "date-time" },
                            "updatedAt": { "type": "string", "format": "date-time" }
                        },
                        "required": ["id", "title", "author", "genre", "reviews"]
                    },
                    "BookView": {
                        "type": "object",
                        "properties": {
                            "id": { "type": "string" },
                            "title": { "type": "string" },
                            "author": { "type": "string" },
                            "genre": { "type": "string" },
                            "avgRating": { "type": "number" },
                            "reviews": {
                                "type": "array",
                                "items": { "$ref": "#/components/schemas/Review" }
                            },
                            "totalReviews": { "type": "integer" },
                            "currentPage": { "type": "integer" },
                            "totalPages": { "type": "integer" },
                            "createdAt": { "type": "string", "format": "date-time" },
                            "updatedAt": { "type": "string", "format": "date-time" }
                        },
                        "required": ["id", "title", "author", "genre", "avgRating", "reviews"]
                    }
                }
            }
        }))
    }

    fn migrations(&self) -> Vec<Migration> {
        vec![Migration {
            id: "001_init",
            up: r#"
                DEFINE TABLE IF NOT EXISTS book SCHEMALESS;
                DEFINE INDEX IF NOT EXISTS book_created_at ON book FIELDS createdAt;
                "#,
        }]
    }

    async fn start(&self, _ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        tracing::info!(module = self.name(), "books module started");
        Ok(())
    }

    async fn stop(&self) -> anyhow::Result<()> {
        tracing::info!(module = self.name(), "books module stopped");
        Ok(())
    }
}

async fn create_book(
    State(state): State<AppState>,
    _user: AuthUser,
    Json(body): Json<CreateBookRequest>,
) -> Result<(StatusCode, Json<Book>), AppError> {
    let mut details = Vec::new();
    for (field, value) in [
        ("title", &body.title),
        ("author", &body.author),
        ("genre", &body.genre),
    ] {
        if value.trim().is_empty() {
            details.push(json!({"field": field, "error": "required"}));
        }
    }
    if !details.is_empty() {
        return Err(AppError::validation(details, "Validation failed"));
    }

    let book = state
        .catalog
        .create_book(body.title, body.author, body.genre)
        .await?;

    Ok((StatusCode::CREATED, Json(book)))
}

async fn list_books(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<Book>>, AppError> {
    let page = parse_page_param(query.page.as_deref(), DEFAULT_PAGE);
    let limit = parse_page_param(query.limit.as_deref(), DEFAULT_LIMIT);

    let books = state
        .catalog
        .list_books(query.genre, query.author, page, limit)
        .await?;

    Ok(Json(books))
}

async fn get_book(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<PageQuery>,
) -> Result<Json<BookView>, AppError> {
    let page = parse_page_param(query.page.as_deref(), DEFAULT_PAGE);
    let limit = parse_page_param(query.limit.as_deref(), DEFAULT_LIMIT);

    let book = state.catalog.get_book(&id).await?;

    let total = book.reviews.len();
    let avg_rating = ReviewPolicy::average_rating(&book.reviews);
    let slice = ReviewPolicy::paginate(total, page, limit);

    Ok(Json(BookView {
        id: book.id,
        title: book.title,
        author: book.author,
        genre: book.genre,
        avg_rating,
        reviews: book.reviews[slice.start..slice.end].to_vec(),
        total_reviews: total,
        current_page: page,
        total_pages: slice.total_pages,
        created_at: book.created_at,
        updated_at: book.updated_at,
    }))
}

async fn search_books(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<Vec<Book>>, AppError> {
    let page = parse_page_param(query.page.as_deref(), DEFAULT_PAGE);
    let limit = parse_page_param(query.limit.as_deref(), DEFAULT_LIMIT);

    let books = state.catalog.search_books(query.q, page, limit).await?;

    Ok(Json(books))
}

async fn add_review(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
    Json(body): Json<ReviewPayload>,
) -> Result<Json<Book>, AppError> {
    let book = state.reviews.add_review(&id, &user.user_id, body).await?;

    Ok(Json(book))
}

async fn update_review(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
    Json(body): Json<ReviewPayload>,
) -> Result<Json<Book>, AppError> {
    let book = state
        .reviews
        .update_review(&id, &user.user_id, body)
        .await?;

    Ok(Json(book))
}

async fn delete_review(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    state.reviews.delete_review(&id, &user.user_id).await?;

    Ok(Json(json!({"message": "Review removed"})))
}

/// Create a new instance of the books module
pub fn create_module(state: AppState) -> std::sync::Arc<dyn Module> {
    std::sync::Arc::new(BooksModule { state })
}
