use novela_dal::user::{CreateUser, UserRepository};
use novela_e2e_tests::{
    login, prepare_env, register,
    rest::{create_novel, get_novel, post_json},
    session_client, spawn_server,
};
use reqwest::StatusCode;
use serde_json::json;
use tracing::info;
use tracing_test::traced_test;

async fn create_moderator(database_url: &str) {
    let pool = novela_dal::new_pool(database_url).await.unwrap();
    UserRepository::new(pool.clone())
        .create(
            CreateUser {
                username: "moderator".parse().unwrap(),
                email: "moderator@example.com".parse().unwrap(),
                password: "password1".to_string(),
            },
            true,
        )
        .await
        .unwrap();
    pool.close().await;
}

#[tokio::test]
#[traced_test]
async fn test_moderated_creation() {
    let (args, _config_guard) = prepare_env("test_moderated_creation").await.unwrap();
    create_moderator(&args.backend.database_url()).await;
    let base_url = args.base_url.clone();
    spawn_server(args).await.unwrap();

    let moderator = session_client().unwrap();
    login(&moderator, &base_url, "moderator", "password1")
        .await
        .unwrap();
    let (status, novel) = create_novel(&moderator, &base_url, "The First Tale")
        .await
        .unwrap();
    info!("Created novel: {novel:#?}");
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(novel["genres"][0]["name"], "fantasy");

    let reader = session_client().unwrap();
    register(&reader, &base_url, "reader", "password1")
        .await
        .unwrap();
    let (status, body) = create_novel(&reader, &base_url, "Not Allowed")
        .await
        .unwrap();
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert!(body["error"].is_string());

    let response = reader
        .get(base_url.join("api/novel/count").unwrap())
        .send()
        .await
        .unwrap();
    let count: serde_json::Value = response.json().await.unwrap();
    assert_eq!(count, json!(1));
}

#[tokio::test]
#[traced_test]
async fn test_rating_and_saving() {
    let (args, _config_guard) = prepare_env("test_rating_and_saving").await.unwrap();
    create_moderator(&args.backend.database_url()).await;
    let base_url = args.base_url.clone();
    spawn_server(args).await.unwrap();

    let moderator = session_client().unwrap();
    login(&moderator, &base_url, "moderator", "password1")
        .await
        .unwrap();
    let (_, novel) = create_novel(&moderator, &base_url, "Rated Tale")
        .await
        .unwrap();
    let id = novel["id"].as_i64().unwrap();

    let reader = session_client().unwrap();
    let response = register(&reader, &base_url, "reader", "password1")
        .await
        .unwrap();
    let reader_id = response.json::<serde_json::Value>().await.unwrap()["id"]
        .as_i64()
        .unwrap();

    for rating in [3, 5] {
        let (status, _) = post_json(
            &reader,
            &base_url,
            &format!("api/novel/rating/{id}"),
            json!({"rating": rating}),
        )
        .await
        .unwrap();
        assert_eq!(status, StatusCode::OK);
    }
    let novel = get_novel(&reader, &base_url, id).await.unwrap();
    assert_eq!(
        novel["starRatings"],
        json!([{"userId": reader_id, "rating": 5}])
    );
    assert_eq!(novel["averageRating"], json!(5.0));

    let before = novel["savedBy"].clone();
    for expected in [json!([reader_id]), before.clone()] {
        let path = format!("api/novel/save/{id}");
        let (status, state) = post_json(&reader, &base_url, &path, json!({})).await.unwrap();
        assert_eq!(status, StatusCode::OK);
        assert_eq!(state["savedBy"], expected);
    }
    let novel = get_novel(&reader, &base_url, id).await.unwrap();
    assert_eq!(novel["savedBy"], before);

    let response = reader
        .get(base_url.join(&format!("api/user/saves/{reader_id}")).unwrap())
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let saves: serde_json::Value = response.json().await.unwrap();
    assert_eq!(saves["totalCount"], json!(0));
}

#[tokio::test]
#[traced_test]
async fn test_cover_is_served() {
    use base64::{Engine as _, engine::general_purpose::STANDARD};

    let (args, _config_guard) = prepare_env("test_cover_is_served").await.unwrap();
    create_moderator(&args.backend.database_url()).await;
    let base_url = args.base_url.clone();
    spawn_server(args).await.unwrap();

    let moderator = session_client().unwrap();
    login(&moderator, &base_url, "moderator", "password1")
        .await
        .unwrap();
    let image: Vec<u8> = (0..128u8).collect();
    let mut payload = novela_e2e_tests::rest::novel_payload("Covered Tale");
    payload["coverImg"] = json!(format!("data:image/png;base64,{}", STANDARD.encode(&image)));
    let (status, novel) = post_json(&moderator, &base_url, "api/novel/create", payload)
        .await
        .unwrap();
    assert_eq!(status, StatusCode::CREATED);
    let cover_url = novel["coverImg"].as_str().unwrap();
    assert!(cover_url.starts_with("/media/covers/"));

    let response = reqwest::get(base_url.join(cover_url).unwrap()).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.bytes().await.unwrap().as_ref(), image.as_slice());
}
