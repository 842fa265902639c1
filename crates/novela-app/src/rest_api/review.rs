use axum::{extract::State, response::IntoResponse, routing::get, Json};
use garde::Validate;
use http::StatusCode;
use novela_dal::review::{Review, ReviewRepository, ReviewTarget};
use serde::Deserialize;

use crate::{
    catalog::not_blank,
    error::ApiResult,
    repository_from_request,
    rest_api::{Page, Paging},
    state::AppState,
    validate::ApiPath,
};

repository_from_request!(ReviewRepository);

pub const MAX_REVIEW_LEN: usize = 5000;

/// Review text, author is always the authenticated user
#[derive(Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct ReviewInput {
    #[serde(alias = "body")]
    #[garde(custom(not_blank), length(chars, max = MAX_REVIEW_LEN))]
    pub text: String,
}

pub(crate) async fn reviews_page(
    repository: &ReviewRepository,
    state: &AppState,
    paging: Paging,
    target: ReviewTarget,
) -> ApiResult<Page<Review>> {
    let default_page_size = state.config().default_page_size;
    let limit = paging.limit(default_page_size);
    let listing_params = paging.into_listing_params(default_page_size)?;
    let batch = repository.list_for_target(target, listing_params).await?;
    Ok(Page::from_batch(batch, limit))
}

pub async fn get_review(
    ApiPath(id): ApiPath<i64>,
    repository: ReviewRepository,
) -> ApiResult<impl IntoResponse> {
    let review = repository.get(id).await?;
    Ok((StatusCode::OK, Json(review)))
}

pub fn router() -> axum::Router<AppState> {
    axum::Router::new().route("/get/{id}", get(get_review))
}
