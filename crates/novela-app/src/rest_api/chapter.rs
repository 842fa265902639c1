use axum::{
    extract::{Query, State},
    response::IntoResponse,
    routing::{get, post},
    Json,
};
use garde::Validate;
use http::StatusCode;
use novela_dal::{
    chapter::ChapterRepository,
    engagement::{EngagementRepository, ViewTarget},
    review::{ReviewRepository, ReviewTarget},
};
use serde::Deserialize;

use crate::{
    auth::{CurrentUser, ModeratorUser},
    catalog::ChapterInput,
    error::ApiResult,
    repository_from_request,
    rest_api::{review::ReviewInput, Paging},
    state::AppState,
    validate::{ApiPath, Garde},
};

repository_from_request!(ChapterRepository);

#[derive(Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct NewChapterInput {
    #[garde(range(min = 1))]
    pub novel_id: i64,
    #[serde(alias = "chapterTitle", default)]
    #[garde(length(max = 255))]
    pub title: String,
    #[serde(alias = "chapterBody", default)]
    #[garde(length(max = 500000))]
    pub body: String,
}

pub async fn get_chapter(
    ApiPath(id): ApiPath<i64>,
    repository: ChapterRepository,
) -> ApiResult<impl IntoResponse> {
    let chapter = repository.get(id).await?;
    Ok((StatusCode::OK, Json(chapter)))
}

pub async fn next(
    ApiPath(id): ApiPath<i64>,
    repository: ChapterRepository,
) -> ApiResult<impl IntoResponse> {
    let chapter = repository.next(id).await?;
    Ok((StatusCode::OK, Json(chapter)))
}

pub async fn previous(
    ApiPath(id): ApiPath<i64>,
    repository: ChapterRepository,
) -> ApiResult<impl IntoResponse> {
    let chapter = repository.previous(id).await?;
    Ok((StatusCode::OK, Json(chapter)))
}

pub async fn novel_chapters(
    ApiPath(novel_id): ApiPath<i64>,
    repository: ChapterRepository,
) -> ApiResult<impl IntoResponse> {
    let chapters = repository.list_for_novel(novel_id).await?;
    Ok((StatusCode::OK, Json(chapters)))
}

pub async fn reviews(
    ApiPath(id): ApiPath<i64>,
    repository: ReviewRepository,
    State(state): State<AppState>,
    Garde(Query(paging)): Garde<Query<Paging>>,
) -> ApiResult<impl IntoResponse> {
    let page =
        super::review::reviews_page(&repository, &state, paging, ReviewTarget::Chapter(id)).await?;
    Ok((StatusCode::OK, Json(page)))
}

pub async fn add(
    ModeratorUser(_moderator): ModeratorUser,
    State(state): State<AppState>,
    Garde(Json(payload)): Garde<Json<NewChapterInput>>,
) -> ApiResult<impl IntoResponse> {
    let input = ChapterInput {
        title: payload.title,
        body: payload.body,
    };
    let chapter = state.catalog().add_chapter(payload.novel_id, input).await?;
    Ok((StatusCode::CREATED, Json(chapter)))
}

pub async fn update(
    ApiPath(id): ApiPath<i64>,
    ModeratorUser(_moderator): ModeratorUser,
    State(state): State<AppState>,
    Garde(Json(payload)): Garde<Json<ChapterInput>>,
) -> ApiResult<impl IntoResponse> {
    let chapter = state.catalog().update_chapter(id, payload).await?;
    Ok((StatusCode::OK, Json(chapter)))
}

pub async fn review(
    ApiPath(id): ApiPath<i64>,
    CurrentUser(user): CurrentUser,
    repository: ReviewRepository,
    Garde(Json(payload)): Garde<Json<ReviewInput>>,
) -> ApiResult<impl IntoResponse> {
    let review = repository
        .add(ReviewTarget::Chapter(id), user.id, payload.text.trim())
        .await?;
    Ok((StatusCode::CREATED, Json(review)))
}

pub async fn add_view_count(
    ApiPath(id): ApiPath<i64>,
    repository: EngagementRepository,
) -> ApiResult<impl IntoResponse> {
    let views_count = repository.increment_view(ViewTarget::Chapter(id)).await?;
    Ok((
        StatusCode::OK,
        Json(serde_json::json!({"viewsCount": views_count})),
    ))
}

pub fn router() -> axum::Router<AppState> {
    axum::Router::new()
        .route("/get/{id}", get(get_chapter))
        .route("/next/{id}", get(next))
        .route("/next-chapter/{id}", get(next))
        .route("/prev/{id}", get(previous))
        .route("/prev-chapter/{id}", get(previous))
        .route("/novel/{id}", get(novel_chapters))
        .route("/reviews/{id}", get(reviews))
        .route("/add", post(add))
        .route("/update/{id}", post(update))
        .route("/review/{id}", post(review))
        .route("/addViewCount/{id}", post(add_view_count))
}
