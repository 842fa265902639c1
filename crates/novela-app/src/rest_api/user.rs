use axum::{
    extract::{Query, State},
    response::IntoResponse,
    routing::{get, post},
    Json,
};
use http::StatusCode;
use novela_dal::{
    novel::{NovelFilter, NovelRepository},
    review::ReviewRepository,
    user::UserRepository,
};

use crate::{
    auth::{require_self, CurrentUser},
    catalog::ProfileInput,
    error::ApiResult,
    rest_api::{novel::novels_page, Page, Paging},
    state::AppState,
    validate::{ApiPath, Garde},
};

pub async fn list_users(
    repository: UserRepository,
    State(state): State<AppState>,
    Garde(Query(paging)): Garde<Query<Paging>>,
) -> ApiResult<impl IntoResponse> {
    let default_page_size = state.config().default_page_size;
    let limit = paging.limit(default_page_size);
    let batch = repository
        .list(paging.into_listing_params(default_page_size)?)
        .await?;
    Ok((StatusCode::OK, Json(Page::from_batch(batch, limit))))
}

pub async fn get_user(
    ApiPath(id): ApiPath<i64>,
    repository: UserRepository,
) -> ApiResult<impl IntoResponse> {
    let user = repository.get(id).await?;
    Ok((StatusCode::OK, Json(user)))
}

pub async fn get_by_review(
    ApiPath(review_id): ApiPath<i64>,
    repository: UserRepository,
) -> ApiResult<impl IntoResponse> {
    let user = repository.find_by_review(review_id).await?;
    Ok((StatusCode::OK, Json(user)))
}

pub async fn reviews(
    ApiPath(id): ApiPath<i64>,
    repository: ReviewRepository,
    State(state): State<AppState>,
    Garde(Query(paging)): Garde<Query<Paging>>,
) -> ApiResult<impl IntoResponse> {
    let default_page_size = state.config().default_page_size;
    let limit = paging.limit(default_page_size);
    let batch = repository
        .list_by_user(id, paging.into_listing_params(default_page_size)?)
        .await?;
    Ok((StatusCode::OK, Json(Page::from_batch(batch, limit))))
}

pub async fn saves(
    ApiPath(id): ApiPath<i64>,
    CurrentUser(user): CurrentUser,
    repository: NovelRepository,
    State(state): State<AppState>,
    Garde(Query(paging)): Garde<Query<Paging>>,
) -> ApiResult<impl IntoResponse> {
    require_self(&user, id)?;
    let page = novels_page(&repository, &state, paging, NovelFilter::SavedBy(id)).await?;
    Ok((StatusCode::OK, Json(page)))
}

pub async fn profile(
    ApiPath(username): ApiPath<String>,
    CurrentUser(_user): CurrentUser,
    repository: UserRepository,
) -> ApiResult<impl IntoResponse> {
    let user = repository.find_by_username(&username).await?;
    Ok((StatusCode::OK, Json(user)))
}

pub async fn update(
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
    Garde(Json(payload)): Garde<Json<ProfileInput>>,
) -> ApiResult<impl IntoResponse> {
    let updated = state.catalog().update_profile(user.id, payload).await?;
    Ok((StatusCode::OK, Json(updated)))
}

pub fn router() -> axum::Router<AppState> {
    axum::Router::new()
        .route("/users", get(list_users))
        .route("/get/{id}", get(get_user))
        .route("/get-by-review/{id}", get(get_by_review))
        .route("/reviews/{id}", get(reviews))
        .route("/saves/{id}", get(saves))
        .route("/profile/{username}", get(profile))
        .route("/update", post(update))
}

#[cfg(test)]
mod tests {
    use http::Method;
    use serde_json::json;
    use tower::ServiceExt as _;

    use super::*;
    use crate::test_utils::{
        create_user, get_request, json_body, json_request, png_data_url, test_app,
    };

    #[tokio::test]
    async fn test_saves_are_private() {
        let app = test_app().await;
        let alice = create_user(app.state.pool(), "alice1", false).await;
        let bob = create_user(app.state.pool(), "bobby1", false).await;

        let response = app
            .router
            .clone()
            .oneshot(get_request(&format!("/api/user/saves/{alice}"), None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let response = app
            .router
            .clone()
            .oneshot(get_request(&format!("/api/user/saves/{alice}"), Some(&app.bearer(bob))))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        let response = app
            .router
            .clone()
            .oneshot(get_request(&format!("/api/user/saves/{alice}"), Some(&app.bearer(alice))))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["pageData"], json!([]));
    }

    #[tokio::test]
    async fn test_public_user_views() {
        let app = test_app().await;
        let alice = create_user(app.state.pool(), "alice1", false).await;
        create_user(app.state.pool(), "bobby1", false).await;

        let response = app
            .router
            .clone()
            .oneshot(get_request("/api/user/users?limit=1", None))
            .await
            .unwrap();
        let page = json_body(response).await;
        assert_eq!(page["totalCount"], 2);
        assert_eq!(page["totalPages"], 2);
        assert!(page["pageData"][0].get("password").is_none());

        let response = app
            .router
            .clone()
            .oneshot(get_request(&format!("/api/user/get/{alice}"), None))
            .await
            .unwrap();
        let user = json_body(response).await;
        assert_eq!(user["username"], "alice1");
        assert!(user.get("password").is_none());

        let response = app
            .router
            .clone()
            .oneshot(get_request("/api/user/get/9999", None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let response = app
            .router
            .clone()
            .oneshot(get_request("/api/user/profile/alice1", None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let response = app
            .router
            .clone()
            .oneshot(get_request("/api/user/profile/alice1", Some(&app.bearer(alice))))
            .await
            .unwrap();
        assert_eq!(json_body(response).await["id"], alice);

        let response = app
            .router
            .clone()
            .oneshot(get_request(&format!("/api/user/reviews/{alice}"), None))
            .await
            .unwrap();
        assert_eq!(json_body(response).await["totalCount"], 0);
    }

    #[tokio::test]
    async fn test_update_profile() {
        let app = test_app().await;
        let alice = create_user(app.state.pool(), "alice1", false).await;
        create_user(app.state.pool(), "bobby1", false).await;
        let auth = app.bearer(alice);

        let response = app
            .router
            .clone()
            .oneshot(json_request(
                Method::POST,
                "/api/user/update",
                Some(&auth),
                json!({"about": "Reader of fantasy", "profileImg": png_data_url()}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let user = json_body(response).await;
        assert_eq!(user["about"], "Reader of fantasy");
        assert!(user["profileImg"]
            .as_str()
            .unwrap()
            .starts_with("/media/profiles/"));

        for (body, status) in [
            (json!({"username": "bobby1"}), StatusCode::BAD_REQUEST),
            (json!({"username": "has space"}), StatusCode::BAD_REQUEST),
            (json!({"isModerator": true}), StatusCode::BAD_REQUEST),
        ] {
            let response = app
                .router
                .clone()
                .oneshot(json_request(Method::POST, "/api/user/update", Some(&auth), body))
                .await
                .unwrap();
            assert_eq!(response.status(), status);
        }

        let response = app
            .router
            .clone()
            .oneshot(json_request(
                Method::POST,
                "/api/user/update",
                Some(&auth),
                json!({"username": "alice2"}),
            ))
            .await
            .unwrap();
        assert_eq!(json_body(response).await["username"], "alice2");
    }
}
