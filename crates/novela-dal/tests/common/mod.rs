#![allow(dead_code)]

use futures::TryStreamExt as _;
use novela_dal::{
    Pool,
    novel::{NovelData, NovelRepositoryImpl, Status},
    user::{CreateUser, UserRepositoryImpl},
};
use sqlx::Executor;

const TEST_DATA: &str = r#"
INSERT INTO genre (id, name) VALUES (1, 'fantasy');
INSERT INTO genre (id, name) VALUES (2, 'romance');
INSERT INTO genre (id, name) VALUES (3, 'sci-fi');
"#;

pub async fn init_db() -> Pool {
    let conn = sqlx::sqlite::SqlitePoolOptions::new()
        .max_connections(1)
        .min_connections(1)
        .connect("sqlite::memory:")
        .await
        .unwrap();
    conn.execute("PRAGMA foreign_keys = ON").await.unwrap();
    novela_dal::migrate(&conn).await.unwrap();

    conn.execute_many(TEST_DATA)
        .try_collect::<Vec<_>>()
        .await
        .unwrap();

    conn
}

/// File backed database with full connection pool, for tests with concurrent writers
pub async fn init_file_db() -> (Pool, tempfile::TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let url = format!("sqlite://{}", dir.path().join("novela.db").display());
    let pool = novela_dal::new_pool(&url).await.unwrap();
    novela_dal::migrate(&pool).await.unwrap();
    pool.execute_many(TEST_DATA)
        .try_collect::<Vec<_>>()
        .await
        .unwrap();
    (pool, dir)
}

pub async fn create_user(pool: &Pool, username: &str) -> i64 {
    let repo = UserRepositoryImpl::new(pool.clone());
    let user = repo
        .register(CreateUser {
            username: username.parse().unwrap(),
            email: format!("{username}@example.com").parse().unwrap(),
            password: "password123".to_string(),
        })
        .await
        .unwrap();
    user.id
}

pub fn novel_data(title: &str) -> NovelData {
    NovelData {
        title: title.to_string(),
        description: format!("Story of {title}"),
        status: Status::InProgress,
        year: "2021".to_string(),
        author: "Jane Writer".to_string(),
        genres: vec![1],
    }
}

pub async fn create_novel(pool: &Pool, title: &str) -> i64 {
    let repo = NovelRepositoryImpl::new(pool.clone());
    repo.create(novel_data(title), None).await.unwrap().id
}
