use anyhow::Context;
use chrono::Utc;
use surrealdb::engine::any::Any;
use surrealdb::Surreal;
use uuid::Uuid;

use folio_http::AppError;

use super::models::{Book, Review};

/// Projection used everywhere a book is read back, so record ids come out
/// as plain strings.
const BOOK_FIELDS: &str =
    "record::id(id) AS id, title, author, genre, reviews, createdAt, updatedAt";

/// Persistence layer for books and their embedded reviews.
#[derive(Clone)]
pub struct CatalogService {
    db: Surreal<Any>,
}

impl CatalogService {
    pub fn new(db: Surreal<Any>) -> Self {
        Self { db }
    }

    /// Insert a new book with an empty review list.
    pub async fn create_book(
        &self,
        title: String,
        author: String,
        genre: String,
    ) -> Result<Book, AppError> {
        let now = Utc::now();
        let book = Book {
            id: Uuid::now_v7().to_string(),
            title,
            author,
            genre,
            reviews: Vec::new(),
            created_at: now,
            updated_at: now,
        };

        self.db
            .query(
                "CREATE type::thing('book', $id) CONTENT {
                    title: $title,
                    author: $author,
                    genre: $genre,
                    reviews: [],
                    createdAt: $createdAt,
                    updatedAt: $updatedAt
                } RETURN NONE;",
            )
            .bind(("id", book.id.clone()))
            .bind(("title", book.title.clone()))
            .bind(("author", book.author.clone()))
            .bind(("genre", book.genre.clone()))
            .bind(("createdAt", book.created_at))
            .bind(("updatedAt", book.updated_at))
            .await
            .context("failed to create book")?
            .check()
            .context("failed to create book")?;

        Ok(book)
    }

    /// Fetch a book by id, or `None` when it does not exist.
    pub async fn fetch(&self, id: &str) -> Result<Option<Book>, AppError> {
        let mut response = self
            .db
            .query(format!(
                "SELECT {BOOK_FIELDS} FROM type::thing('book', $id);"
            ))
            .bind(("id", id.to_string()))
            .await
            .context("failed to query book")?;

        let book: Option<Book> = response.take(0).context("failed to decode book")?;

        Ok(book)
    }

    /// Fetch a book by id, mapping absence to a not-found error.
    pub async fn get_book(&self, id: &str) -> Result<Book, AppError> {
        self.fetch(id)
            .await?
            .ok_or_else(|| AppError::not_found("Book not found"))
    }

    /// List books with optional case-insensitive genre and author filters.
    pub async fn list_books(
        &self,
        genre: Option<String>,
        author: Option<String>,
        page: u64,
        limit: u64,
    ) -> Result<Vec<Book>, AppError> {
        let mut clauses = Vec::new();
        if genre.is_some() {
            clauses.push("string::contains(string::lowercase(genre), $genre)");
        }
        if author.is_some() {
            clauses.push("string::contains(string::lowercase(author), $author)");
        }

        let mut sql = format!("SELECT {BOOK_FIELDS} FROM book");
        if !clauses.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&clauses.join(" AND "));
        }
        // LIMIT and START are computed integers, safe to inline.
        sql.push_str(&format!(
            " ORDER BY createdAt ASC LIMIT {} START {};",
            limit,
            page.saturating_sub(1) * limit
        ));

        let mut query = self.db.query(sql);
        if let Some(genre) = genre {
            query = query.bind(("genre", genre.to_lowercase()));
        }
        if let Some(author) = author {
            query = query.bind(("author", author.to_lowercase()));
        }

        let mut response = query.await.context("failed to list books")?;
        let books: Vec<Book> = response.take(0).context("failed to decode books")?;

        Ok(books)
    }

    /// Case-insensitive keyword search over title and author.
    ///
    /// An empty query matches every book.
    pub async fn search_books(
        &self,
        q: Option<String>,
        page: u64,
        limit: u64,
    ) -> Result<Vec<Book>, AppError> {
        let term = q.map(|q| q.to_lowercase()).filter(|q| !q.is_empty());

        let mut sql = format!("SELECT {BOOK_FIELDS} FROM book");
        if term.is_some() {
            sql.push_str(
                " WHERE string::contains(string::lowercase(title), $q)
                   OR string::contains(string::lowercase(author), $q)",
            );
        }
        sql.push_str(&format!(
            " ORDER BY createdAt ASC LIMIT {} START {};",
            limit,
            page.saturating_sub(1) * limit
        ));

        let mut query = self.db.query(sql);
        if let Some(term) = term {
            query = query.bind(("q", term));
        }

        let mut response = query.await.context("failed to search books")?;
        let books: Vec<Book> = response.take(0).context("failed to decode books")?;

        Ok(books)
    }

    /// Find the book containing the given review id.
    pub async fn find_by_review_id(&self, review_id: &str) -> Result<Option<Book>, AppError> {
        let mut response = self
            .db
            .query(format!(
                "SELECT {BOOK_FIELDS} FROM book WHERE $reviewId INSIDE reviews.id;"
            ))
            .bind(("reviewId", review_id.to_string()))
            .await
            .context("failed to query book by review")?;

        let book: Option<Book> = response.take(0).context("failed to decode book")?;

        Ok(book)
    }

    /// Persist a book's review list, bumping its update timestamp.
    pub async fn save_reviews(&self, book_id: &str, reviews: &[Review]) -> Result<(), AppError> {
        self.db
            .query(
                "UPDATE type::thing('book', $id)
                 SET reviews = $reviews, updatedAt = $now RETURN NONE;",
            )
            .bind(("id", book_id.to_string()))
            .bind(("reviews", reviews.to_vec()))
            .bind(("now", Utc::now()))
            .await
            .context("failed to save reviews")?
            .check()
            .context("failed to save reviews")?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn test_catalog() -> CatalogService {
        let db = surrealdb::engine::any::connect("mem://").await.unwrap();
        db.use_ns("folio").use_db("test").await.unwrap();
        CatalogService::new(db)
    }

    #[tokio::test]
    async fn create_then_fetch_round_trips() {
        let catalog = test_catalog().await;

        let created = catalog
            .create_book(
                "Dune".to_string(),
                "Frank Herbert".to_string(),
                "Sci-Fi".to_string(),
            )
            .await
            .unwrap();

        let fetched = catalog.get_book(&created.id).await.unwrap();
        assert_eq!(fetched.id, created.id);
        assert_eq!(fetched.title, "Dune");
        assert!(fetched.reviews.is_empty());
    }

    #[tokio::test]
    async fn missing_book_is_not_found() {
        let catalog = test_catalog().await;

        let err = catalog.get_book("nope").await.unwrap_err();
        match err {
            AppError::NotFound { message } => assert_eq!(message, "Book not found"),
            other => panic!("expected not found, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn list_filters_are_case_insensitive() {
        let catalog = test_catalog().await;

        catalog
            .create_book(
                "Dune".to_string(),
                "Frank Herbert".to_string(),
                "Sci-Fi".to_string(),
            )
            .await
            .unwrap();
        catalog
            .create_book(
                "Emma".to_string(),
                "Jane Austen".to_string(),
                "Romance".to_string(),
            )
            .await
            .unwrap();

        let hits = catalog
            .list_books(Some("sci".to_string()), None, 1, 10)
            .await
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].title, "Dune");

        let hits = catalog
            .list_books(None, Some("AUSTEN".to_string()), 1, 10)
            .await
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].title, "Emma");
    }

    #[tokio::test]
    async fn search_matches_title_and_author() {
        let catalog = test_catalog().await;

        catalog
            .create_book(
                "Dune".to_string(),
                "Frank Herbert".to_string(),
                "Sci-Fi".to_string(),
            )
            .await
            .unwrap();
        catalog
            .create_book(
                "Emma".to_string(),
                "Jane Austen".to_string(),
                "Romance".to_string(),
            )
            .await
            .unwrap();

        let by_title = catalog
            .search_books(Some("dune".to_string()), 1, 10)
            .await
            .unwrap();
        assert_eq!(by_title.len(), 1);

        let by_author = catalog
            .search_books(Some("austen".to_string()), 1, 10)
            .await
            .unwrap();
        assert_eq!(by_author.len(), 1);

        let all = catalog.search_books(None, 1, 10).await.unwrap();
        assert_eq!(all.len(), 2);
    }

    #[tokio::test]
    async fn pagination_slices_the_listing() {
        let catalog = test_catalog().await;

        for i in 0..3 {
            catalog
                .create_book(
                    format!("Book {}", i),
                    "Author".to_string(),
                    "Genre".to_string(),
                )
                .await
                .unwrap();
        }

        let first = catalog.list_books(None, None, 1, 2).await.unwrap();
        assert_eq!(first.len(), 2);

        let second = catalog.list_books(None, None, 2, 2).await.unwrap();
        assert_eq!(second.len(), 1);
    }
}
