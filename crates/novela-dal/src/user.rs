use std::sync::LazyLock;

use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{Result as HashResult, SaltString, rand_core::OsRng},
};
use futures::TryStreamExt as _;
use garde::Validate;
use novela_types::general::{Username, ValidEmail};
use serde::{Deserialize, Serialize};
use sqlx::{Acquire, Executor, Pool};
use tracing::debug;

use crate::{
    Batch, ChosenConnection, ChosenDB, Error, ListingParams, SortField, begin_write, error::Result,
};

fn hash_password(password: &str) -> HashResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    let password_hash = argon2
        .hash_password(password.as_bytes(), &salt)?
        .to_string();
    Ok(password_hash)
}

fn verify_password(password: &str, password_hash: &str) -> HashResult<bool> {
    let parsed_hash = PasswordHash::new(password_hash)?;
    let res = Argon2::default().verify_password(password.as_bytes(), &parsed_hash);
    if let Err(e) = res {
        debug!("Invalid password, error {e}");
    }
    Ok(res.is_ok())
}

// verified when username is unknown, so that both failure paths take the same time
static DUMMY_HASH: LazyLock<String> =
    LazyLock::new(|| hash_password("not-a-real-password").unwrap_or_default());

#[derive(Debug, Serialize, Deserialize, Clone, Validate)]
#[serde(deny_unknown_fields)]
pub struct CreateUser {
    #[garde(dive)]
    pub username: Username,
    #[garde(dive)]
    pub email: ValidEmail,
    #[garde(length(min = 8, max = 255))]
    pub password: String,
}

/// Public view of a user, there is intentionally no password field
#[derive(Debug, Serialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub is_moderator: bool,
    pub profile_img: Option<String>,
    pub about: String,
    /// ids of reviews written by user, oldest first
    pub reviews: Vec<i64>,
    /// ids of saved novels
    pub saves: Vec<i64>,
    pub created: time::PrimitiveDateTime,
}

#[derive(Debug, Serialize, Clone, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct UserShort {
    pub id: i64,
    pub username: String,
    pub is_moderator: bool,
    pub profile_img: Option<String>,
    pub about: String,
}

#[derive(Debug, sqlx::FromRow)]
struct UserRow {
    id: i64,
    username: String,
    email: String,
    is_moderator: bool,
    profile_img: Option<String>,
    about: String,
    created: time::PrimitiveDateTime,
}

/// Who is making the request, loaded fresh from the database for each request
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct UserIdentity {
    pub id: i64,
    pub username: String,
    pub is_moderator: bool,
}

/// Profile changes, `None` leaves the value unchanged
#[derive(Debug, Clone, Default)]
pub struct ProfileChanges {
    pub username: Option<Username>,
    pub about: Option<String>,
    /// `Some(None)` clears profile image
    pub profile_img: Option<Option<String>>,
}

const USER_FIELDS: &str = "id, username, email, is_moderator, profile_img, about, created";

const VALID_ORDER_FIELDS: &[SortField] = &[("username", "username"), ("created", "created")];

pub type UserRepository = UserRepositoryImpl<Pool<ChosenDB>>;

pub struct UserRepositoryImpl<E> {
    executor: E,
}

impl<'c, E> UserRepositoryImpl<E>
where
    for<'a> &'a E: Executor<'c, Database = ChosenDB> + Acquire<'c, Database = ChosenDB>,
{
    pub fn new(executor: E) -> Self {
        Self { executor }
    }

    pub async fn register(&self, payload: CreateUser) -> Result<User> {
        self.create(payload, false).await
    }

    pub async fn create(&self, payload: CreateUser, is_moderator: bool) -> Result<User> {
        let taken: Option<(String, String)> =
            sqlx::query_as("SELECT username, email FROM users WHERE username = ? OR email = ?")
                .bind(payload.username.as_ref())
                .bind(payload.email.as_ref())
                .fetch_optional(&self.executor)
                .await?;
        if let Some((username, _)) = taken {
            return Err(if username == payload.username.as_ref() {
                Error::Conflict("Username already taken".into())
            } else {
                Error::Conflict("Email already registered".into())
            });
        }

        let password = hash_password(&payload.password)?;
        let result = sqlx::query(
            "INSERT INTO users (username, email, password, is_moderator) VALUES (?, ?, ?, ?)",
        )
        .bind(payload.username.as_ref())
        .bind(payload.email.as_ref())
        .bind(password)
        .bind(is_moderator)
        .execute(&self.executor)
        .await
        .map_err(|e| Error::on_unique(e, "Username or email already taken"))?;

        let id = result.last_insert_rowid();
        debug!("Created user {} with id {id}", payload.username);
        self.get(id).await
    }

    pub async fn check_password(&self, username: &str, password: &str) -> Result<User> {
        let record: Option<(i64, String)> =
            sqlx::query_as("SELECT id, password FROM users WHERE username = ?")
                .bind(username)
                .fetch_optional(&self.executor)
                .await?;
        match record {
            Some((id, hashed_password)) => {
                if verify_password(password, &hashed_password).unwrap_or(false) {
                    return self.get(id).await;
                }
            }
            None => {
                debug!("Unknown user {username}");
                let _ = verify_password(password, &DUMMY_HASH);
            }
        }
        Err(Error::InvalidCredentials)
    }

    pub async fn get(&self, id: i64) -> Result<User> {
        let mut conn = self.executor.acquire().await?;
        get(id, &mut conn).await
    }

    pub async fn find_by_username(&self, username: &str) -> Result<User> {
        let id: i64 = sqlx::query_scalar("SELECT id FROM users WHERE username = ?")
            .bind(username)
            .fetch_optional(&self.executor)
            .await?
            .ok_or_else(|| Error::not_found("User"))?;
        self.get(id).await
    }

    pub async fn find_by_review(&self, review_id: i64) -> Result<User> {
        let id: i64 = sqlx::query_scalar("SELECT user_id FROM review WHERE id = ?")
            .bind(review_id)
            .fetch_optional(&self.executor)
            .await?
            .ok_or_else(|| Error::not_found("Review"))?;
        self.get(id).await
    }

    pub async fn identity(&self, id: i64) -> Result<UserIdentity> {
        sqlx::query_as("SELECT id, username, is_moderator FROM users WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.executor)
            .await?
            .ok_or_else(|| Error::not_found("User"))
    }

    pub async fn list(&self, params: ListingParams) -> Result<Batch<UserShort>> {
        let order = params.ordering(VALID_ORDER_FIELDS, "id")?;
        let rows = sqlx::query_as::<_, UserShort>(&format!(
            "SELECT id, username, is_moderator, profile_img, about FROM users {order} LIMIT ? OFFSET ?"
        ))
        .bind(params.limit)
        .bind(params.offset)
        .fetch(&self.executor)
        .try_collect::<Vec<_>>()
        .await?;
        let total: u64 = sqlx::query_scalar("SELECT count(*) FROM users")
            .fetch_one(&self.executor)
            .await?;
        Ok(Batch::new(&params, rows, total))
    }

    /// Applies profile changes, returns updated user and previous profile image
    pub async fn update_profile(
        &self,
        id: i64,
        changes: ProfileChanges,
    ) -> Result<(User, Option<String>)> {
        let mut conn = self.executor.acquire().await?;
        let mut tx = begin_write(&mut conn).await?;
        let (username, about, profile_img): (String, String, Option<String>) =
            sqlx::query_as("SELECT username, about, profile_img FROM users WHERE id = ?")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?
                .ok_or_else(|| Error::not_found("User"))?;

        let new_username = changes
            .username
            .map(|u| u.as_ref().to_string())
            .unwrap_or(username);
        let new_about = changes.about.unwrap_or(about);
        let new_profile_img = changes.profile_img.unwrap_or_else(|| profile_img.clone());

        sqlx::query(
            "UPDATE users SET username = ?, about = ?, profile_img = ?, modified = CURRENT_TIMESTAMP WHERE id = ?",
        )
        .bind(&new_username)
        .bind(&new_about)
        .bind(&new_profile_img)
        .bind(id)
        .execute(&mut *tx)
        .await
        .map_err(|e| Error::on_unique(e, "Username already taken"))?;

        let user = get(id, &mut *tx).await?;
        tx.commit().await?;
        Ok((user, profile_img))
    }
}

pub(crate) async fn get(id: i64, conn: &mut ChosenConnection) -> Result<User> {
    let row: UserRow = sqlx::query_as(&format!("SELECT {USER_FIELDS} FROM users WHERE id = ?"))
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| Error::not_found("User"))?;
    let reviews: Vec<i64> =
        sqlx::query_scalar("SELECT id FROM review WHERE user_id = ? ORDER BY created, id")
            .bind(id)
            .fetch_all(&mut *conn)
            .await?;
    let saves: Vec<i64> = sqlx::query_scalar(
        "SELECT novel_id FROM novel_saves WHERE user_id = ? ORDER BY created, novel_id",
    )
    .bind(id)
    .fetch_all(&mut *conn)
    .await?;
    Ok(User {
        id: row.id,
        username: row.username,
        email: row.email,
        is_moderator: row.is_moderator,
        profile_img: row.profile_img,
        about: row.about,
        reviews,
        saves,
        created: row.created,
    })
}

pub(crate) async fn exists<'c, E>(id: i64, executor: E) -> Result<bool>
where
    E: Executor<'c, Database = ChosenDB>,
{
    let found: Option<i64> = sqlx::query_scalar("SELECT id FROM users WHERE id = ?")
        .bind(id)
        .fetch_optional(executor)
        .await?;
    Ok(found.is_some())
}
