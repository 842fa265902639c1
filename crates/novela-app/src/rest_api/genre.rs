use axum::{
    extract::{Query, State},
    response::IntoResponse,
    routing::get,
    Json,
};
use http::StatusCode;
use novela_dal::{genre::GenreRepository, novel::NovelFilter, novel::NovelRepository};

use crate::{
    error::ApiResult,
    repository_from_request,
    rest_api::{novel::novels_page, Paging},
    state::AppState,
    validate::{ApiPath, Garde},
};

repository_from_request!(GenreRepository);

pub async fn list_all(repository: GenreRepository) -> ApiResult<impl IntoResponse> {
    let genres = repository.list_all().await?;
    Ok((StatusCode::OK, Json(genres)))
}

pub async fn get_genre(
    ApiPath(id): ApiPath<i64>,
    repository: GenreRepository,
) -> ApiResult<impl IntoResponse> {
    let genre = repository.get(id).await?;
    Ok((StatusCode::OK, Json(genre)))
}

pub async fn count_novels(
    ApiPath(id): ApiPath<i64>,
    repository: GenreRepository,
) -> ApiResult<impl IntoResponse> {
    let count = repository.count_novels(id).await?;
    Ok((StatusCode::OK, Json(count)))
}

pub async fn novels(
    ApiPath(id): ApiPath<i64>,
    repository: NovelRepository,
    State(state): State<AppState>,
    Garde(Query(paging)): Garde<Query<Paging>>,
) -> ApiResult<impl IntoResponse> {
    let page = novels_page(&repository, &state, paging, NovelFilter::Genre(id)).await?;
    Ok((StatusCode::OK, Json(page)))
}

pub fn router() -> axum::Router<AppState> {
    axum::Router::new()
        .route("/all", get(list_all))
        .route("/{id}", get(get_genre))
        .route("/countNovels/{id}", get(count_novels))
        .route("/novels/{id}", get(novels))
}
