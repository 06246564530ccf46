use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::Utc;
use serde_json::json;
use uuid::Uuid;

use folio_http::AppError;

use super::catalog::CatalogService;
use super::models::{Book, Review, ReviewPayload};

/// Rules for adding, updating, and deleting reviews.
///
/// Review mutations are read-modify-write cycles over a book's embedded
/// review list, so each book gets its own async lock to serialize them.
#[derive(Clone)]
pub struct ReviewPolicy {
    catalog: CatalogService,
    locks: Arc<Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>>,
}

/// One page of a review listing.
pub struct PageSlice {
    pub start: usize,
    pub end: usize,
    pub total_pages: u64,
}

impl ReviewPolicy {
    pub fn new(catalog: CatalogService) -> Self {
        Self {
            catalog,
            locks: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    fn lock_for(&self, book_id: &str) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self.locks.lock().expect("lock registry poisoned");
        locks
            .entry(book_id.to_string())
            .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
            .clone()
    }

    /// Add a review to a book. Each user may review a book at most once.
    pub async fn add_review(
        &self,
        book_id: &str,
        user_id: &str,
        payload: ReviewPayload,
    ) -> Result<Book, AppError> {
        let rating = validate_rating(payload.rating)?;
        let comment = validate_comment(&payload.comment)?;

        let lock = self.lock_for(book_id);
        let _guard = lock.lock().await;

        let mut book = self.catalog.get_book(book_id).await?;

        if book.reviews.iter().any(|r| r.user_id == user_id) {
            return Err(AppError::conflict("You have already reviewed this book"));
        }

        book.reviews.push(Review {
            id: Uuid::now_v7().to_string(),
            user_id: user_id.to_string(),
            rating,
            comment,
            created_at: Utc::now(),
        });

        self.catalog.save_reviews(&book.id, &book.reviews).await?;

        Ok(book)
    }

    /// Update a review's rating and comment. Only the author may update it.
    pub async fn update_review(
        &self,
        review_id: &str,
        user_id: &str,
        payload: ReviewPayload,
    ) -> Result<Book, AppError> {
        let book = self
            .catalog
            .find_by_review_id(review_id)
            .await?
            .ok_or_else(|| AppError::not_found("Review not found"))?;

        let lock = self.lock_for(&book.id);
        let _guard = lock.lock().await;

        // Re-read under the lock; the review list may have changed.
        let mut book = self.catalog.get_book(&book.id).await?;

        let review = book
            .reviews
            .iter_mut()
            .find(|r| r.id == review_id)
            .ok_or_else(|| AppError::not_found("Review not found"))?;

        if review.user_id != user_id {
            return Err(AppError::unauthorized("Not authorized"));
        }

        if payload.rating.is_some() {
            review.rating = validate_rating(payload.rating)?;
        }
        if !payload.comment.trim().is_empty() {
            review.comment = payload.comment;
        }

        self.catalog.save_reviews(&book.id, &book.reviews).await?;

        Ok(book)
    }

    /// Delete a review. Only the author may delete it.
    pub async fn delete_review(&self, review_id: &str, user_id: &str) -> Result<(), AppError> {
        let book = self
            .catalog
            .find_by_review_id(review_id)
            .await?
            .ok_or_else(|| AppError::not_found("Review not found"))?;

        let lock = self.lock_for(&book.id);
        let _guard = lock.lock().await;

        let mut book = self.catalog.get_book(&book.id).await?;

        let index = book
            .reviews
            .iter()
            .position(|r| r.id == review_id)
            .ok_or_else(|| AppError::not_found("Review not found"))?;

        if book.reviews[index].user_id != user_id {
            return Err(AppError::unauthorized("Not authorized"));
        }

        book.reviews.remove(index);

        self.catalog.save_reviews(&book.id, &book.reviews).await?;

        Ok(())
    }

    /// Mean rating over a review list, `0.0` when there are none.
    pub fn average_rating(reviews: &[Review]) -> f64 {
        if reviews.is_empty() {
            return 0.0;
        }

        let sum: u64 = reviews.iter().map(|r| r.rating as u64).sum();
        sum as f64 / reviews.len() as f64
    }

    /// Compute the slice bounds for one page of a review listing.
    pub fn paginate(total: usize, page: u64, limit: u64) -> PageSlice {
        let start = (page.saturating_sub(1) * limit) as usize;
        let end = (start + limit as usize).min(total);
        let start = start.min(total);
        // At least one page even for an empty review list.
        let total_pages = (total as u64).div_ceil(limit.max(1)).max(1);

        PageSlice {
            start,
            end,
            total_pages,
        }
    }
}

/// Parse a page or limit query parameter, falling back to a default on
/// absent, non-numeric, or non-positive input.
pub fn parse_page_param(value: Option<&str>, default: u64) -> u64 {
    value
        .and_then(|v| v.parse::<u64>().ok())
        .filter(|v| *v > 0)
        .unwrap_or(default)
}

fn validate_rating(rating: Option<i64>) -> Result<u8, AppError> {
    match rating {
        Some(r) if (1..=5).contains(&r) => Ok(r as u8),
        _ => Err(AppError::validation(
            vec![json!({"field": "rating", "error": "must be an integer between 1 and 5"})],
            "Validation failed",
        )),
    }
}

fn validate_comment(comment: &str) -> Result<String, AppError> {
    if comment.trim().is_empty() {
        return Err(AppError::validation(
            vec![json!({"field": "comment", "error": "required"})],
            "Validation failed",
        ));
    }

    Ok(comment.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn test_policy() -> (ReviewPolicy, CatalogService) {
        let db = surrealdb::engine::any::connect("mem://").await.unwrap();
        db.use_ns("folio").use_db("test").await.unwrap();
        let catalog = CatalogService::new(db);
        (ReviewPolicy::new(catalog.clone()), catalog)
    }

    fn payload(rating: i64, comment: &str) -> ReviewPayload {
        ReviewPayload {
            rating: Some(rating),
            comment: comment.to_string(),
        }
    }

    #[tokio::test]
    async fn one_review_per_user_per_book() {
        let (policy, catalog) = test_policy().await;
        let book = catalog
            .create_book("Dune".into(), "Frank Herbert".into(), "Sci-Fi".into())
            .await
            .unwrap();

        policy
            .add_review(&book.id, "user-1", payload(5, "great"))
            .await
            .unwrap();

        let err = policy
            .add_review(&book.id, "user-1", payload(3, "again"))
            .await
            .unwrap_err();
        match err {
            AppError::Conflict { message } => {
                assert_eq!(message, "You have already reviewed this book")
            }
            other => panic!("expected conflict, got {:?}", other),
        }

        let updated = policy
            .add_review(&book.id, "user-2", payload(3, "fine"))
            .await
            .unwrap();
        assert_eq!(updated.reviews.len(), 2);
    }

    #[tokio::test]
    async fn rating_bounds_are_enforced() {
        let (policy, catalog) = test_policy().await;
        let book = catalog
            .create_book("Dune".into(), "Frank Herbert".into(), "Sci-Fi".into())
            .await
            .unwrap();

        for bad in [0, 6, -1] {
            let err = policy
                .add_review(&book.id, "user-1", payload(bad, "hm"))
                .await
                .unwrap_err();
            assert!(matches!(err, AppError::Validation { .. }));
        }

        let err = policy
            .add_review(
                &book.id,
                "user-1",
                ReviewPayload {
                    rating: None,
                    comment: "hm".to_string(),
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation { .. }));
    }

    #[tokio::test]
    async fn only_the_author_may_update_or_delete() {
        let (policy, catalog) = test_policy().await;
        let book = catalog
            .create_book("Dune".into(), "Frank Herbert".into(), "Sci-Fi".into())
            .await
            .unwrap();

        let book = policy
            .add_review(&book.id, "user-1", payload(5, "great"))
            .await
            .unwrap();
        let review_id = book.reviews[0].id.clone();

        let err = policy
            .update_review(&review_id, "user-2", payload(1, "bad"))
            .await
            .unwrap_err();
        match err {
            AppError::Unauthorized { message } => assert_eq!(message, "Not authorized"),
            other => panic!("expected unauthorized, got {:?}", other),
        }

        let err = policy.delete_review(&review_id, "user-2").await.unwrap_err();
        assert!(matches!(err, AppError::Unauthorized { .. }));

        let updated = policy
            .update_review(&review_id, "user-1", payload(2, "changed my mind"))
            .await
            .unwrap();
        assert_eq!(updated.reviews[0].rating, 2);
        assert_eq!(updated.reviews[0].comment, "changed my mind");

        policy.delete_review(&review_id, "user-1").await.unwrap();
        let book = catalog.get_book(&book.id).await.unwrap();
        assert!(book.reviews.is_empty());
    }

    #[tokio::test]
    async fn unknown_review_is_not_found() {
        let (policy, _catalog) = test_policy().await;

        let err = policy
            .update_review("missing", "user-1", payload(3, "hm"))
            .await
            .unwrap_err();
        match err {
            AppError::NotFound { message } => assert_eq!(message, "Review not found"),
            other => panic!("expected not found, got {:?}", other),
        }
    }

    #[test]
    fn average_rating_is_the_mean() {
        let reviews: Vec<Review> = [5, 3, 4]
            .iter()
            .map(|&rating| Review {
                id: Uuid::now_v7().to_string(),
                user_id: format!("user-{}", rating),
                rating,
                comment: "x".to_string(),
                created_at: Utc::now(),
            })
            .collect();

        assert_eq!(ReviewPolicy::average_rating(&reviews), 4.0);
        assert_eq!(ReviewPolicy::average_rating(&[]), 0.0);
    }

    #[test]
    fn pagination_bounds_are_clamped() {
        let slice = ReviewPolicy::paginate(25, 2, 10);
        assert_eq!((slice.start, slice.end, slice.total_pages), (10, 20, 3));

        let slice = ReviewPolicy::paginate(5, 1, 2);
        assert_eq!((slice.start, slice.end, slice.total_pages), (0, 2, 3));

        let slice = ReviewPolicy::paginate(5, 3, 2);
        assert_eq!((slice.start, slice.end, slice.total_pages), (4, 5, 3));

        // Past the end yields an empty slice, not a panic.
        let slice = ReviewPolicy::paginate(5, 9, 2);
        assert_eq!((slice.start, slice.end), (5, 5));

        let slice = ReviewPolicy::paginate(0, 1, 10);
        assert_eq!((slice.start, slice.end, slice.total_pages), (0, 0, 1));
    }

    #[test]
    fn page_params_fall_back_to_defaults() {
        assert_eq!(parse_page_param(None, 1), 1);
        assert_eq!(parse_page_param(Some("3"), 1), 3);
        assert_eq!(parse_page_param(Some("abc"), 1), 1);
        assert_eq!(parse_page_param(Some("0"), 1), 1);
        assert_eq!(parse_page_param(Some("-2"), 10), 10);
    }
}
