use axum::{
    extract::{Query, State},
    response::IntoResponse,
    routing::{delete, get, post},
    Json,
};
use garde::Validate;
use http::StatusCode;
use novela_dal::{
    engagement::{EngagementRepository, ViewTarget, MAX_RATING},
    novel::{NovelFilter, NovelRepository, NovelSummary},
    review::{ReviewRepository, ReviewTarget},
};
use serde::Deserialize;
use tracing::debug;

use crate::{
    auth::{CurrentUser, ModeratorUser},
    catalog::NovelInput,
    error::ApiResult,
    repository_from_request,
    rest_api::{review::ReviewInput, Page, Paging},
    state::AppState,
    validate::{ApiPath, Garde},
};

repository_from_request!(NovelRepository);
repository_from_request!(EngagementRepository);

#[derive(Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct RatingInput {
    #[garde(range(max = MAX_RATING))]
    pub rating: u8,
}

/// One page of novels matching filter, shared with genre and user listings
pub(crate) async fn novels_page(
    repository: &NovelRepository,
    state: &AppState,
    paging: Paging,
    filter: NovelFilter,
) -> ApiResult<Page<NovelSummary>> {
    let default_page_size = state.config().default_page_size;
    let limit = paging.limit(default_page_size);
    let listing_params = paging.into_listing_params(default_page_size)?;
    let batch = repository.list(filter, listing_params).await?;
    Ok(Page::from_batch(batch, limit))
}

pub async fn list(
    repository: NovelRepository,
    State(state): State<AppState>,
    Garde(Query(paging)): Garde<Query<Paging>>,
) -> ApiResult<impl IntoResponse> {
    let page = novels_page(&repository, &state, paging, NovelFilter::All).await?;
    Ok((StatusCode::OK, Json(page)))
}

pub async fn list_all(repository: NovelRepository) -> ApiResult<impl IntoResponse> {
    let novels = repository.list_all().await?;
    Ok((StatusCode::OK, Json(novels)))
}

pub async fn count(repository: NovelRepository) -> ApiResult<impl IntoResponse> {
    let count = repository.count(NovelFilter::All).await?;
    Ok((StatusCode::OK, Json(count)))
}

pub async fn get_novel(
    ApiPath(id): ApiPath<i64>,
    repository: NovelRepository,
) -> ApiResult<impl IntoResponse> {
    let novel = repository.get(id).await?;
    Ok((StatusCode::OK, Json(novel)))
}

pub async fn search(
    ApiPath(query): ApiPath<String>,
    repository: NovelRepository,
    State(state): State<AppState>,
    Garde(Query(paging)): Garde<Query<Paging>>,
) -> ApiResult<impl IntoResponse> {
    debug!("Searching novels for {query:?}");
    let page = novels_page(&repository, &state, paging, NovelFilter::Title(query)).await?;
    Ok((StatusCode::OK, Json(page)))
}

pub async fn by_author(
    ApiPath(author): ApiPath<String>,
    repository: NovelRepository,
    State(state): State<AppState>,
    Garde(Query(paging)): Garde<Query<Paging>>,
) -> ApiResult<impl IntoResponse> {
    let page = novels_page(&repository, &state, paging, NovelFilter::Author(author)).await?;
    Ok((StatusCode::OK, Json(page)))
}

pub async fn count_by_author(
    ApiPath(author): ApiPath<String>,
    repository: NovelRepository,
) -> ApiResult<impl IntoResponse> {
    let count = repository.count(NovelFilter::Author(author)).await?;
    Ok((StatusCode::OK, Json(count)))
}

pub async fn by_year(
    ApiPath(year): ApiPath<String>,
    repository: NovelRepository,
    State(state): State<AppState>,
    Garde(Query(paging)): Garde<Query<Paging>>,
) -> ApiResult<impl IntoResponse> {
    let page = novels_page(&repository, &state, paging, NovelFilter::Year(year)).await?;
    Ok((StatusCode::OK, Json(page)))
}

pub async fn count_by_year(
    ApiPath(year): ApiPath<String>,
    repository: NovelRepository,
) -> ApiResult<impl IntoResponse> {
    let count = repository.count(NovelFilter::Year(year)).await?;
    Ok((StatusCode::OK, Json(count)))
}

pub async fn genres(
    ApiPath(id): ApiPath<i64>,
    repository: NovelRepository,
) -> ApiResult<impl IntoResponse> {
    let genres = repository.genres(id).await?;
    Ok((StatusCode::OK, Json(genres)))
}

pub async fn reviews(
    ApiPath(id): ApiPath<i64>,
    repository: ReviewRepository,
    State(state): State<AppState>,
    Garde(Query(paging)): Garde<Query<Paging>>,
) -> ApiResult<impl IntoResponse> {
    let page =
        super::review::reviews_page(&repository, &state, paging, ReviewTarget::Novel(id)).await?;
    Ok((StatusCode::OK, Json(page)))
}

pub async fn create(
    ModeratorUser(moderator): ModeratorUser,
    State(state): State<AppState>,
    Garde(Json(payload)): Garde<Json<NovelInput>>,
) -> ApiResult<impl IntoResponse> {
    let novel = state.catalog().create_novel(payload).await?;
    debug!("Novel {} created by {}", novel.id, moderator.username);
    Ok((StatusCode::CREATED, Json(novel)))
}

pub async fn update(
    ApiPath(id): ApiPath<i64>,
    ModeratorUser(_moderator): ModeratorUser,
    State(state): State<AppState>,
    Garde(Json(payload)): Garde<Json<NovelInput>>,
) -> ApiResult<impl IntoResponse> {
    let novel = state.catalog().update_novel(id, payload).await?;
    Ok((StatusCode::OK, Json(novel)))
}

pub async fn delete_novel(
    ApiPath(id): ApiPath<i64>,
    ModeratorUser(_moderator): ModeratorUser,
    State(state): State<AppState>,
) -> ApiResult<impl IntoResponse> {
    state.catalog().delete_novel(id).await?;
    Ok((StatusCode::NO_CONTENT, ()))
}

pub async fn add_view_count(
    ApiPath(id): ApiPath<i64>,
    repository: EngagementRepository,
) -> ApiResult<impl IntoResponse> {
    let views_count = repository.increment_view(ViewTarget::Novel(id)).await?;
    Ok((
        StatusCode::OK,
        Json(serde_json::json!({"viewsCount": views_count})),
    ))
}

pub async fn rate(
    ApiPath(id): ApiPath<i64>,
    CurrentUser(user): CurrentUser,
    repository: EngagementRepository,
    Garde(Json(payload)): Garde<Json<RatingInput>>,
) -> ApiResult<impl IntoResponse> {
    let summary = repository.rate(id, user.id, payload.rating).await?;
    Ok((StatusCode::OK, Json(summary)))
}

pub async fn toggle_save(
    ApiPath(id): ApiPath<i64>,
    CurrentUser(user): CurrentUser,
    repository: EngagementRepository,
) -> ApiResult<impl IntoResponse> {
    let state = repository.toggle_save(id, user.id).await?;
    Ok((StatusCode::OK, Json(state)))
}

pub async fn unsave(
    ApiPath(id): ApiPath<i64>,
    CurrentUser(user): CurrentUser,
    repository: EngagementRepository,
) -> ApiResult<impl IntoResponse> {
    let state = repository.unsave(id, user.id).await?;
    Ok((StatusCode::OK, Json(state)))
}

pub async fn review(
    ApiPath(id): ApiPath<i64>,
    CurrentUser(user): CurrentUser,
    repository: ReviewRepository,
    Garde(Json(payload)): Garde<Json<ReviewInput>>,
) -> ApiResult<impl IntoResponse> {
    let review = repository
        .add(ReviewTarget::Novel(id), user.id, payload.text.trim())
        .await?;
    Ok((StatusCode::CREATED, Json(review)))
}

pub fn router() -> axum::Router<AppState> {
    axum::Router::new()
        .route("/all", get(list_all))
        .route("/count", get(count))
        .route("/novels", get(list))
        .route("/get/{id}", get(get_novel))
        .route("/search/{query}", get(search))
        .route("/author/{author}", get(by_author))
        .route("/countByAuthor/{author}", get(count_by_author))
        .route("/year/{year}", get(by_year))
        .route("/countByYear/{year}", get(count_by_year))
        .route("/genres/{id}", get(genres))
        .route("/reviews/{id}", get(reviews))
        .route("/create", post(create))
        .route("/update/{id}", post(update))
        .route("/{id}", delete(delete_novel))
        .route("/addViewCount/{id}", post(add_view_count))
        .route("/rating/{id}", post(rate))
        .route("/save/{id}", post(toggle_save))
        .route("/unsave/{id}", post(unsave))
        .route("/review/{id}", post(review))
}
