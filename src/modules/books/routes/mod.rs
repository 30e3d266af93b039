//! HTTP handlers for the books module.

use std::sync::Arc;

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use shelf_catalog::{
    Book, BookEdit, BookId, BookQuery, Dashboard, Library, LibraryStats, NewBook,
};
use shelf_http::error::AppError;

use super::models::{BorrowRequest, RecentParams};

/// Shared state behind every books route.
#[derive(Clone)]
pub struct BooksState {
    pub library: Arc<Library>,
    pub recent_limit: usize,
    pub top_limit: usize,
}

pub fn router(state: BooksState) -> Router {
    Router::new()
        .route("/", get(list_books).post(create_book))
        .route("/health", get(health_check))
        .route("/stats", get(get_stats))
        .route("/dashboard", get(dashboard))
        .route("/recent", get(recently_added))
        .route("/borrowed", get(borrowed_books))
        .route("/genres", get(genres))
        .route("/{id}", get(get_book).patch(update_book).delete(delete_book))
        .route("/{id}/borrow", post(borrow_book))
        .route("/{id}/return", post(return_book))
        .with_state(state)
}

/// Health check endpoint
async fn health_check() -> &'static str {
    "books module is healthy"
}

async fn list_books(
    State(state): State<BooksState>,
    query: Result<Query<BookQuery>, QueryRejection>,
) -> Result<Json<Vec<Book>>, AppError> {
    let Query(query) = query?;
    Ok(Json(state.library.list_books(&query).await))
}

async fn create_book(
    State(state): State<BooksState>,
    input: Result<Json<NewBook>, JsonRejection>,
) -> Result<(StatusCode, Json<Book>), AppError> {
    let Json(input) = input?;
    let book = state.library.create_book(input).await?;
    Ok((StatusCode::CREATED, Json(book)))
}

async fn get_book(
    State(state): State<BooksState>,
    Path(id): Path<BookId>,
) -> Result<Json<Book>, AppError> {
    Ok(Json(state.library.get_book(&id).await?))
}

async fn update_book(
    State(state): State<BooksState>,
    Path(id): Path<BookId>,
    patch: Result<Json<BookEdit>, JsonRejection>,
) -> Result<Json<Book>, AppError> {
    let Json(patch) = patch?;
    Ok(Json(state.library.update_book(&id, patch).await?))
}

async fn delete_book(
    State(state): State<BooksState>,
    Path(id): Path<BookId>,
) -> Result<StatusCode, AppError> {
    state.library.delete_book(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn borrow_book(
    State(state): State<BooksState>,
    Path(id): Path<BookId>,
    request: Result<Json<BorrowRequest>, JsonRejection>,
) -> Result<Json<Book>, AppError> {
    let Json(request) = request?;
    Ok(Json(
        state.library.borrow_book(&id, &request.borrower).await?,
    ))
}

async fn return_book(
    State(state): State<BooksState>,
    Path(id): Path<BookId>,
) -> Result<Json<Book>, AppError> {
    Ok(Json(state.library.return_book(&id).await?))
}

async fn get_stats(State(state): State<BooksState>) -> Json<LibraryStats> {
    Json(state.library.get_stats().await)
}

async fn dashboard(State(state): State<BooksState>) -> Json<Dashboard> {
    Json(
        state
            .library
            .dashboard(state.top_limit, state.recent_limit)
            .await,
    )
}

async fn recently_added(
    State(state): State<BooksState>,
    params: Result<Query<RecentParams>, QueryRejection>,
) -> Result<Json<Vec<Book>>, AppError> {
    let Query(params) = params?;
    let limit = params.limit.unwrap_or(state.recent_limit);
    Ok(Json(state.library.recently_added(limit).await))
}

async fn borrowed_books(State(state): State<BooksState>) -> Json<Vec<Book>> {
    Json(state.library.borrowed_books().await)
}

async fn genres(State(state): State<BooksState>) -> Json<Vec<String>> {
    Json(state.library.genres().await)
}
