use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single review embedded in a book record.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    pub id: String,
    /// Id of the user who wrote the review.
    pub user_id: String,
    pub rating: u8,
    pub comment: String,
    pub created_at: DateTime<Utc>,
}

/// Book record with its embedded reviews.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Book {
    pub id: String,
    pub title: String,
    pub author: String,
    pub genre: String,
    pub reviews: Vec<Review>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Request model for creating a new book.
///
/// Fields default to empty strings so missing keys surface as validation
/// errors rather than body rejections.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateBookRequest {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub genre: String,
}

/// Request body for adding or updating a review.
#[derive(Debug, Clone, Deserialize)]
pub struct ReviewPayload {
    #[serde(default)]
    pub rating: Option<i64>,
    #[serde(default)]
    pub comment: String,
}

/// Query parameters for listing books.
#[derive(Debug, Clone, Deserialize)]
pub struct ListQuery {
    pub genre: Option<String>,
    pub author: Option<String>,
    pub page: Option<String>,
    pub limit: Option<String>,
}

/// Query parameters for keyword search.
#[derive(Debug, Clone, Deserialize)]
pub struct SearchQuery {
    pub q: Option<String>,
    pub page: Option<String>,
    pub limit: Option<String>,
}

/// Query parameters for paginating a book's reviews.
#[derive(Debug, Clone, Deserialize)]
pub struct PageQuery {
    pub page: Option<String>,
    pub limit: Option<String>,
}

/// Detail view of a book with its rating summary and one page of reviews.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookView {
    pub id: String,
    pub title: String,
    pub author: String,
    pub genre: String,
    pub avg_rating: f64,
    pub reviews: Vec<Review>,
    pub total_reviews: usize,
    pub current_page: u64,
    pub total_pages: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
