//! Catalog browsing endpoints

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use books_domain::{Book, CategoryCount, PageRequest, PriceRange, SearchQuery};

use crate::context::AppState;
use crate::error::ApiResult;
use crate::extract::{ApiPath, ApiQuery};
use crate::schema::{
    BookListResponse, PaginationParams, PriceRangeParams, SearchParams, TopRatedParams,
};

pub fn book_routes() -> Router<AppState> {
    Router::new()
        .route("/books", get(list_books))
        .route("/books/search", get(search_books))
        .route("/books/top-rated", get(top_rated_books))
        .route("/books/price-range", get(books_by_price_range))
        .route("/books/{book_id}", get(get_book))
        .route("/categories", get(list_categories))
}

async fn list_books(
    State(state): State<AppState>,
    ApiQuery(params): ApiQuery<PaginationParams>,
) -> ApiResult<Json<BookListResponse>> {
    let request = PageRequest::try_from(params)?;
    let page = state.books.list(request).await?;
    Ok(Json(page.into()))
}

async fn search_books(
    State(state): State<AppState>,
    ApiQuery(params): ApiQuery<SearchParams>,
) -> ApiResult<Json<Vec<Book>>> {
    let query = SearchQuery::try_from(params)?;
    Ok(Json(state.books.search(&query).await?))
}

async fn top_rated_books(
    State(state): State<AppState>,
    ApiQuery(params): ApiQuery<TopRatedParams>,
) -> ApiResult<Json<Vec<Book>>> {
    let limit = params.limit()?;
    Ok(Json(state.books.top_rated(limit).await?))
}

async fn books_by_price_range(
    State(state): State<AppState>,
    ApiQuery(params): ApiQuery<PriceRangeParams>,
) -> ApiResult<Json<Vec<Book>>> {
    let range = PriceRange::try_from(params)?;
    Ok(Json(state.books.by_price_range(range).await?))
}

async fn get_book(
    State(state): State<AppState>,
    ApiPath(book_id): ApiPath<i64>,
) -> ApiResult<Json<Book>> {
    Ok(Json(state.books.get(book_id).await?))
}

async fn list_categories(State(state): State<AppState>) -> ApiResult<Json<Vec<CategoryCount>>> {
    Ok(Json(state.books.categories().await?))
}
