use serde::{Deserialize, Serialize};
use sqlx::{Acquire, Executor, Pool};
use tracing::debug;

use crate::{ChosenConnection, ChosenDB, Error, begin_write, error::Result, novel, user};

pub const MAX_RATING: u8 = 5;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct StarRating {
    pub user_id: i64,
    pub rating: u8,
}

#[derive(Debug, Serialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RatingSummary {
    pub novel_id: i64,
    pub ratings: Vec<StarRating>,
    pub count: u64,
    /// 0 when there are no ratings
    pub average: f64,
}

#[derive(Debug, Serialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SaveState {
    pub novel_id: i64,
    /// whether the novel is saved by the user after the operation
    pub saved: bool,
    pub saved_by: Vec<i64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewTarget {
    Novel(i64),
    Chapter(i64),
}

pub type EngagementRepository = EngagementRepositoryImpl<Pool<ChosenDB>>;

pub struct EngagementRepositoryImpl<E> {
    executor: E,
}

impl<'c, E> EngagementRepositoryImpl<E>
where
    for<'a> &'a E: Executor<'c, Database = ChosenDB> + Acquire<'c, Database = ChosenDB>,
{
    pub fn new(executor: E) -> Self {
        Self { executor }
    }

    /// Sets user's rating of novel, replacing any previous one
    pub async fn rate(&self, novel_id: i64, user_id: i64, rating: u8) -> Result<RatingSummary> {
        let mut conn = self.executor.acquire().await?;
        if !novel::exists(novel_id, &mut *conn).await? {
            return Err(Error::not_found("Novel"));
        }
        if !user::exists(user_id, &mut *conn).await? {
            return Err(Error::not_found("User"));
        }
        sqlx::query(
            "INSERT INTO star_rating (novel_id, user_id, rating) VALUES (?, ?, ?)
            ON CONFLICT (novel_id, user_id) DO UPDATE SET rating = excluded.rating",
        )
        .bind(novel_id)
        .bind(user_id)
        .bind(rating.min(MAX_RATING))
        .execute(&mut *conn)
        .await?;
        debug!("User {user_id} rated novel {novel_id} with {rating}");
        rating_summary(novel_id, &mut conn).await
    }

    pub async fn ratings(&self, novel_id: i64) -> Result<RatingSummary> {
        let mut conn = self.executor.acquire().await?;
        if !novel::exists(novel_id, &mut *conn).await? {
            return Err(Error::not_found("Novel"));
        }
        rating_summary(novel_id, &mut conn).await
    }

    /// Saves novel for user if not saved yet, otherwise removes the bookmark
    pub async fn toggle_save(&self, novel_id: i64, user_id: i64) -> Result<SaveState> {
        let mut conn = self.executor.acquire().await?;
        let mut tx = begin_write(&mut conn).await?;
        check_pair(novel_id, user_id, &mut tx).await?;
        let removed = sqlx::query("DELETE FROM novel_saves WHERE novel_id = ? AND user_id = ?")
            .bind(novel_id)
            .bind(user_id)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        if removed == 0 {
            sqlx::query("INSERT INTO novel_saves (novel_id, user_id) VALUES (?, ?)")
                .bind(novel_id)
                .bind(user_id)
                .execute(&mut *tx)
                .await?;
        }
        let saved_by = saved_by(novel_id, &mut tx).await?;
        tx.commit().await?;
        Ok(SaveState {
            novel_id,
            saved: removed == 0,
            saved_by,
        })
    }

    /// Removes bookmark, does nothing if novel is not saved
    pub async fn unsave(&self, novel_id: i64, user_id: i64) -> Result<SaveState> {
        let mut conn = self.executor.acquire().await?;
        let mut tx = begin_write(&mut conn).await?;
        check_pair(novel_id, user_id, &mut tx).await?;
        sqlx::query("DELETE FROM novel_saves WHERE novel_id = ? AND user_id = ?")
            .bind(novel_id)
            .bind(user_id)
            .execute(&mut *tx)
            .await?;
        let saved_by = saved_by(novel_id, &mut tx).await?;
        tx.commit().await?;
        Ok(SaveState {
            novel_id,
            saved: false,
            saved_by,
        })
    }

    /// Increments view counter, returns new value
    pub async fn increment_view(&self, target: ViewTarget) -> Result<i64> {
        let (sql, id, what) = match target {
            ViewTarget::Novel(id) => (
                "UPDATE novel SET views_count = views_count + 1 WHERE id = ? RETURNING views_count",
                id,
                "Novel",
            ),
            ViewTarget::Chapter(id) => (
                "UPDATE chapter SET views_count = views_count + 1 WHERE id = ? RETURNING views_count",
                id,
                "Chapter",
            ),
        };
        sqlx::query_scalar(sql)
            .bind(id)
            .fetch_optional(&self.executor)
            .await?
            .ok_or_else(|| Error::not_found(what))
    }
}

async fn check_pair(novel_id: i64, user_id: i64, conn: &mut ChosenConnection) -> Result<()> {
    if !novel::exists(novel_id, &mut *conn).await? {
        return Err(Error::not_found("Novel"));
    }
    if !user::exists(user_id, &mut *conn).await? {
        return Err(Error::not_found("User"));
    }
    Ok(())
}

async fn saved_by(novel_id: i64, conn: &mut ChosenConnection) -> Result<Vec<i64>> {
    let users = sqlx::query_scalar(
        "SELECT user_id FROM novel_saves WHERE novel_id = ? ORDER BY created, user_id",
    )
    .bind(novel_id)
    .fetch_all(&mut *conn)
    .await?;
    Ok(users)
}

pub(crate) async fn rating_summary(
    novel_id: i64,
    conn: &mut ChosenConnection,
) -> Result<RatingSummary> {
    let ratings: Vec<StarRating> = sqlx::query_as(
        "SELECT user_id, rating FROM star_rating WHERE novel_id = ? ORDER BY rowid",
    )
    .bind(novel_id)
    .fetch_all(&mut *conn)
    .await?;
    Ok(summarize(novel_id, ratings))
}

fn summarize(novel_id: i64, ratings: Vec<StarRating>) -> RatingSummary {
    let count = ratings.len() as u64;
    let sum: u64 = ratings.iter().map(|r| r.rating as u64).sum();
    let average = if count == 0 {
        0.0
    } else {
        sum as f64 / count as f64
    };
    RatingSummary {
        novel_id,
        ratings,
        count,
        average,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rating(user_id: i64, rating: u8) -> StarRating {
        StarRating { user_id, rating }
    }

    #[test]
    fn test_empty_average() {
        let summary = summarize(1, vec![]);
        assert_eq!(summary.count, 0);
        assert_eq!(summary.average, 0.0);
    }

    #[test]
    fn test_average() {
        let summary = summarize(1, vec![rating(1, 5), rating(2, 2), rating(3, 4)]);
        assert_eq!(summary.count, 3);
        assert!((summary.average - 11.0 / 3.0).abs() < f64::EPSILON);
    }
}
