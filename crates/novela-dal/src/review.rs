use serde::Serialize;
use sqlx::{Acquire, Executor, Pool};
use tracing::debug;

use crate::{
    Batch, ChosenConnection, ChosenDB, Error, ListingParams, begin_write, chapter, error::Result,
    novel, user,
};

#[derive(Debug, Serialize, Clone, PartialEq, Eq, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    pub id: i64,
    pub user_id: i64,
    pub username: String,
    pub novel_id: Option<i64>,
    pub chapter_id: Option<i64>,
    pub body: String,
    pub created: time::PrimitiveDateTime,
}

/// What is reviewed - always exactly one novel or one chapter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReviewTarget {
    Novel(i64),
    Chapter(i64),
}

impl ReviewTarget {
    fn column(&self) -> &'static str {
        match self {
            ReviewTarget::Novel(_) => "novel_id",
            ReviewTarget::Chapter(_) => "chapter_id",
        }
    }

    fn id(&self) -> i64 {
        match self {
            ReviewTarget::Novel(id) | ReviewTarget::Chapter(id) => *id,
        }
    }

    async fn check_exists(&self, conn: &mut ChosenConnection) -> Result<()> {
        let (found, what) = match self {
            ReviewTarget::Novel(id) => (novel::exists(*id, &mut *conn).await?, "Novel"),
            ReviewTarget::Chapter(id) => (chapter::exists(*id, &mut *conn).await?, "Chapter"),
        };
        if found {
            Ok(())
        } else {
            Err(Error::not_found(what))
        }
    }
}

const REVIEW_SELECT: &str = "SELECT r.id, r.user_id, u.username, r.novel_id, r.chapter_id, r.body, r.created FROM review r JOIN users u ON u.id = r.user_id";

// newest first, ties broken by id so paging is stable
const REVIEW_ORDER: &str = "ORDER BY r.created DESC, r.id DESC";

pub type ReviewRepository = ReviewRepositoryImpl<Pool<ChosenDB>>;

pub struct ReviewRepositoryImpl<E> {
    executor: E,
}

impl<'c, E> ReviewRepositoryImpl<E>
where
    for<'a> &'a E: Executor<'c, Database = ChosenDB> + Acquire<'c, Database = ChosenDB>,
{
    pub fn new(executor: E) -> Self {
        Self { executor }
    }

    pub async fn add(&self, target: ReviewTarget, user_id: i64, body: &str) -> Result<Review> {
        let mut conn = self.executor.acquire().await?;
        let mut tx = begin_write(&mut conn).await?;
        target.check_exists(&mut tx).await?;
        if !user::exists(user_id, &mut *tx).await? {
            return Err(Error::not_found("User"));
        }
        let result = sqlx::query(&format!(
            "INSERT INTO review (user_id, {}, body) VALUES (?, ?, ?)",
            target.column()
        ))
        .bind(user_id)
        .bind(target.id())
        .bind(body)
        .execute(&mut *tx)
        .await?;
        let id = result.last_insert_rowid();
        let review = get(id, &mut tx).await?;
        tx.commit().await?;
        debug!("User {user_id} added review {id} to {target:?}");
        Ok(review)
    }

    pub async fn get(&self, id: i64) -> Result<Review> {
        let mut conn = self.executor.acquire().await?;
        get(id, &mut conn).await
    }

    pub async fn list_for_target(
        &self,
        target: ReviewTarget,
        params: ListingParams,
    ) -> Result<Batch<Review>> {
        let mut conn = self.executor.acquire().await?;
        target.check_exists(&mut conn).await?;
        let column = target.column();
        let rows = sqlx::query_as(&format!(
            "{REVIEW_SELECT} WHERE r.{column} = ? {REVIEW_ORDER} LIMIT ? OFFSET ?"
        ))
        .bind(target.id())
        .bind(params.limit)
        .bind(params.offset)
        .fetch_all(&mut *conn)
        .await?;
        let total: u64 = sqlx::query_scalar(&format!(
            "SELECT count(*) FROM review WHERE {column} = ?"
        ))
        .bind(target.id())
        .fetch_one(&mut *conn)
        .await?;
        Ok(Batch::new(&params, rows, total))
    }

    pub async fn list_by_user(&self, user_id: i64, params: ListingParams) -> Result<Batch<Review>> {
        let mut conn = self.executor.acquire().await?;
        if !user::exists(user_id, &mut *conn).await? {
            return Err(Error::not_found("User"));
        }
        let rows = sqlx::query_as(&format!(
            "{REVIEW_SELECT} WHERE r.user_id = ? {REVIEW_ORDER} LIMIT ? OFFSET ?"
        ))
        .bind(user_id)
        .bind(params.limit)
        .bind(params.offset)
        .fetch_all(&mut *conn)
        .await?;
        let total: u64 = sqlx::query_scalar("SELECT count(*) FROM review WHERE user_id = ?")
            .bind(user_id)
            .fetch_one(&mut *conn)
            .await?;
        Ok(Batch::new(&params, rows, total))
    }
}

async fn get(id: i64, conn: &mut ChosenConnection) -> Result<Review> {
    sqlx::query_as(&format!("{REVIEW_SELECT} WHERE r.id = ?"))
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| Error::not_found("Review"))
}
