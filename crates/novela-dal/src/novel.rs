use std::{fmt::Display, str::FromStr};

use serde::{Deserialize, Serialize};
use sqlx::{Acquire, Executor, Pool, QueryBuilder};
use tracing::{debug, info};

use crate::{
    Batch, ChosenConnection, ChosenDB, Error, ListingParams, MAX_LIMIT, SortField, begin_write,
    engagement::{StarRating, rating_summary},
    error::Result,
    genre::{Genre, genres_of_novel},
    like_pattern,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "camelCase")]
#[sqlx(rename_all = "camelCase")]
pub enum Status {
    InProgress,
    Hiatus,
    Ended,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::InProgress => "inProgress",
            Status::Hiatus => "hiatus",
            Status::Ended => "ended",
        }
    }
}

impl FromStr for Status {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "inProgress" => Ok(Status::InProgress),
            "hiatus" => Ok(Status::Hiatus),
            "ended" => Ok(Status::Ended),
            other => Err(format!("Invalid novel status: {other}")),
        }
    }
}

impl Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Novel with all its relations resolved
#[derive(Debug, Serialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Novel {
    pub id: i64,
    pub title: String,
    pub cover_img: Option<String>,
    pub description: String,
    pub status: Status,
    pub year: String,
    pub author: String,
    pub views_count: i64,
    pub genres: Vec<Genre>,
    /// chapter ids in reading order
    pub chapters: Vec<i64>,
    /// ids of reviews of the novel itself (not its chapters)
    pub reviews: Vec<i64>,
    pub saved_by: Vec<i64>,
    pub star_ratings: Vec<StarRating>,
    pub average_rating: f64,
    pub created: time::PrimitiveDateTime,
    pub modified: time::PrimitiveDateTime,
}

#[derive(Debug, Serialize, Clone, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct NovelSummary {
    pub id: i64,
    pub title: String,
    pub cover_img: Option<String>,
    pub description: String,
    pub status: Status,
    pub year: String,
    pub author: String,
    pub views_count: i64,
    pub created: time::PrimitiveDateTime,
}

#[derive(Debug, sqlx::FromRow)]
struct NovelRow {
    id: i64,
    title: String,
    cover_img: Option<String>,
    description: String,
    status: Status,
    year: String,
    author: String,
    views_count: i64,
    created: time::PrimitiveDateTime,
    modified: time::PrimitiveDateTime,
}

/// Values of a novel as stored, genres are already resolved to ids
#[derive(Debug, Clone)]
pub struct NovelData {
    pub title: String,
    pub description: String,
    pub status: Status,
    pub year: String,
    pub author: String,
    pub genres: Vec<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoverChange {
    Keep,
    Set(String),
    Clear,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DeleteReport {
    pub novel_id: i64,
    pub chapters_deleted: u64,
    pub bookmarks_removed: u64,
    pub reviews_deleted: u64,
    pub ratings_deleted: u64,
    /// cover of deleted novel, to be released from blob store
    #[serde(skip)]
    pub cover_img: Option<String>,
}

#[derive(Debug, Clone)]
pub enum NovelFilter {
    All,
    /// case insensitive substring of title
    Title(String),
    Author(String),
    Year(String),
    Genre(i64),
    SavedBy(i64),
}

impl NovelFilter {
    fn push_where(&self, qb: &mut QueryBuilder<'_, ChosenDB>) {
        match self {
            NovelFilter::All => {}
            NovelFilter::Title(fragment) => {
                qb.push(" WHERE n.title LIKE ")
                    .push_bind(like_pattern(fragment))
                    .push(" ESCAPE '\\'");
            }
            NovelFilter::Author(author) => {
                qb.push(" WHERE n.author = ").push_bind(author.clone());
            }
            NovelFilter::Year(year) => {
                qb.push(" WHERE n.year = ").push_bind(year.clone());
            }
            NovelFilter::Genre(genre_id) => {
                qb.push(" WHERE n.id IN (SELECT novel_id FROM novel_genres WHERE genre_id = ")
                    .push_bind(*genre_id)
                    .push(")");
            }
            NovelFilter::SavedBy(user_id) => {
                qb.push(" WHERE n.id IN (SELECT novel_id FROM novel_saves WHERE user_id = ")
                    .push_bind(*user_id)
                    .push(")");
            }
        }
    }
}

const SUMMARY_FIELDS: &str = "n.id, n.title, n.cover_img, n.description, n.status, n.year, n.author, n.views_count, n.created";

const VALID_ORDER_FIELDS: &[SortField] = &[
    ("title", "n.title"),
    ("author", "n.author"),
    ("year", "n.year"),
    ("viewsCount", "n.views_count"),
    ("created", "n.created"),
    ("modified", "n.modified"),
];

pub type NovelRepository = NovelRepositoryImpl<Pool<ChosenDB>>;

pub struct NovelRepositoryImpl<E> {
    executor: E,
}

impl<'c, E> NovelRepositoryImpl<E>
where
    for<'a> &'a E: Executor<'c, Database = ChosenDB> + Acquire<'c, Database = ChosenDB>,
{
    pub fn new(executor: E) -> Self {
        Self { executor }
    }

    pub async fn create(&self, data: NovelData, cover_img: Option<String>) -> Result<Novel> {
        let mut conn = self.executor.acquire().await?;
        let mut tx = begin_write(&mut conn).await?;
        let result = sqlx::query(
            "INSERT INTO novel (title, cover_img, description, status, year, author) VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(&data.title)
        .bind(&cover_img)
        .bind(&data.description)
        .bind(data.status)
        .bind(&data.year)
        .bind(&data.author)
        .execute(&mut *tx)
        .await?;
        let id = result.last_insert_rowid();
        link_genres(id, &data.genres, &mut tx).await?;
        let novel = get(id, &mut tx).await?;
        tx.commit().await?;
        debug!("Created novel {id}");
        Ok(novel)
    }

    /// Updates novel, returns it together with cover it replaced (if any)
    pub async fn update(
        &self,
        id: i64,
        data: NovelData,
        cover: CoverChange,
    ) -> Result<(Novel, Option<String>)> {
        let mut conn = self.executor.acquire().await?;
        let mut tx = begin_write(&mut conn).await?;
        let old_cover: Option<String> =
            sqlx::query_scalar("SELECT cover_img FROM novel WHERE id = ?")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?
                .ok_or_else(|| Error::not_found("Novel"))?;
        let new_cover = match &cover {
            CoverChange::Keep => old_cover.clone(),
            CoverChange::Set(url) => Some(url.clone()),
            CoverChange::Clear => None,
        };
        sqlx::query(
            "UPDATE novel SET title = ?, cover_img = ?, description = ?, status = ?, year = ?, author = ?, modified = CURRENT_TIMESTAMP WHERE id = ?",
        )
        .bind(&data.title)
        .bind(&new_cover)
        .bind(&data.description)
        .bind(data.status)
        .bind(&data.year)
        .bind(&data.author)
        .bind(id)
        .execute(&mut *tx)
        .await?;
        sqlx::query("DELETE FROM novel_genres WHERE novel_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        link_genres(id, &data.genres, &mut tx).await?;
        let novel = get(id, &mut tx).await?;
        tx.commit().await?;

        let replaced = old_cover.filter(|old| new_cover.as_ref() != Some(old));
        Ok((novel, replaced))
    }

    pub async fn get(&self, id: i64) -> Result<Novel> {
        let mut conn = self.executor.acquire().await?;
        get(id, &mut conn).await
    }

    pub async fn list(
        &self,
        filter: NovelFilter,
        params: ListingParams,
    ) -> Result<Batch<NovelSummary>> {
        self.check_filter(&filter).await?;
        let order = params.ordering(VALID_ORDER_FIELDS, "n.id")?;
        let mut qb = QueryBuilder::new(format!("SELECT {SUMMARY_FIELDS} FROM novel n"));
        filter.push_where(&mut qb);
        qb.push(format!(" {order} LIMIT "))
            .push_bind(params.limit)
            .push(" OFFSET ")
            .push_bind(params.offset);
        let rows = qb
            .build_query_as::<NovelSummary>()
            .fetch_all(&self.executor)
            .await?;
        let total = self.count(filter).await?;
        Ok(Batch::new(&params, rows, total))
    }

    /// All novels without paging, capped at [`MAX_LIMIT`]
    pub async fn list_all(&self) -> Result<Vec<NovelSummary>> {
        let rows = sqlx::query_as(&format!(
            "SELECT {SUMMARY_FIELDS} FROM novel n ORDER BY n.id LIMIT ?"
        ))
        .bind(MAX_LIMIT as i64)
        .fetch_all(&self.executor)
        .await?;
        Ok(rows)
    }

    pub async fn count(&self, filter: NovelFilter) -> Result<u64> {
        let mut qb = QueryBuilder::new("SELECT count(*) FROM novel n");
        filter.push_where(&mut qb);
        let count = qb
            .build_query_scalar::<u64>()
            .fetch_one(&self.executor)
            .await?;
        Ok(count)
    }

    pub async fn genres(&self, id: i64) -> Result<Vec<Genre>> {
        let mut conn = self.executor.acquire().await?;
        if !exists(id, &mut *conn).await? {
            return Err(Error::not_found("Novel"));
        }
        genres_of_novel(id, &mut conn).await
    }

    /// Deletes novel with everything that belongs to it - chapters, reviews, ratings, bookmarks
    pub async fn delete(&self, id: i64) -> Result<DeleteReport> {
        let mut conn = self.executor.acquire().await?;
        let mut tx = begin_write(&mut conn).await?;
        let cover_img: Option<String> =
            sqlx::query_scalar("SELECT cover_img FROM novel WHERE id = ?")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?
                .ok_or_else(|| Error::not_found("Novel"))?;

        let reviews_deleted = sqlx::query(
            "DELETE FROM review WHERE novel_id = ? OR chapter_id IN (SELECT id FROM chapter WHERE novel_id = ?)",
        )
        .bind(id)
        .bind(id)
        .execute(&mut *tx)
        .await?
        .rows_affected();
        let ratings_deleted = sqlx::query("DELETE FROM star_rating WHERE novel_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        let bookmarks_removed = sqlx::query("DELETE FROM novel_saves WHERE novel_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        sqlx::query("DELETE FROM novel_genres WHERE novel_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        let chapters_deleted = sqlx::query("DELETE FROM chapter WHERE novel_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        sqlx::query("DELETE FROM novel WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        let remaining: u64 = sqlx::query_scalar("SELECT count(*) FROM chapter WHERE novel_id = ?")
            .bind(id)
            .fetch_one(&mut *tx)
            .await?;
        if remaining > 0 {
            // dropping transaction rolls back
            return Err(Error::InconsistentDelete {
                novel_id: id,
                remaining,
            });
        }
        tx.commit().await?;

        let report = DeleteReport {
            novel_id: id,
            chapters_deleted,
            bookmarks_removed,
            reviews_deleted,
            ratings_deleted,
            cover_img,
        };
        info!("Deleted novel {id}: {report:?}");
        Ok(report)
    }

    async fn check_filter(&self, filter: &NovelFilter) -> Result<()> {
        match filter {
            NovelFilter::Genre(genre_id) => {
                let found: Option<i64> = sqlx::query_scalar("SELECT id FROM genre WHERE id = ?")
                    .bind(genre_id)
                    .fetch_optional(&self.executor)
                    .await?;
                found.map(|_| ()).ok_or_else(|| Error::not_found("Genre"))
            }
            NovelFilter::SavedBy(user_id) => {
                if crate::user::exists(*user_id, &self.executor).await? {
                    Ok(())
                } else {
                    Err(Error::not_found("User"))
                }
            }
            _ => Ok(()),
        }
    }
}

async fn link_genres(novel_id: i64, genres: &[i64], conn: &mut ChosenConnection) -> Result<()> {
    for genre_id in genres {
        let found: Option<i64> = sqlx::query_scalar("SELECT id FROM genre WHERE id = ?")
            .bind(genre_id)
            .fetch_optional(&mut *conn)
            .await?;
        if found.is_none() {
            return Err(Error::not_found(format!("Genre {genre_id}")));
        }
        sqlx::query(
            "INSERT INTO novel_genres (novel_id, genre_id) VALUES (?, ?) ON CONFLICT DO NOTHING",
        )
        .bind(novel_id)
        .bind(genre_id)
        .execute(&mut *conn)
        .await?;
    }
    Ok(())
}

pub(crate) async fn exists<'c, E>(id: i64, executor: E) -> Result<bool>
where
    E: Executor<'c, Database = ChosenDB>,
{
    let found: Option<i64> = sqlx::query_scalar("SELECT id FROM novel WHERE id = ?")
        .bind(id)
        .fetch_optional(executor)
        .await?;
    Ok(found.is_some())
}

pub(crate) async fn get(id: i64, conn: &mut ChosenConnection) -> Result<Novel> {
    let row: NovelRow = sqlx::query_as(
        "SELECT id, title, cover_img, description, status, year, author, views_count, created, modified FROM novel WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or_else(|| Error::not_found("Novel"))?;

    let genres = genres_of_novel(id, conn).await?;
    let chapters: Vec<i64> =
        sqlx::query_scalar("SELECT id FROM chapter WHERE novel_id = ? ORDER BY chapter_number")
            .bind(id)
            .fetch_all(&mut *conn)
            .await?;
    let reviews: Vec<i64> =
        sqlx::query_scalar("SELECT id FROM review WHERE novel_id = ? ORDER BY created, id")
            .bind(id)
            .fetch_all(&mut *conn)
            .await?;
    let saved_by: Vec<i64> = sqlx::query_scalar(
        "SELECT user_id FROM novel_saves WHERE novel_id = ? ORDER BY created, user_id",
    )
    .bind(id)
    .fetch_all(&mut *conn)
    .await?;
    let rating = rating_summary(id, conn).await?;

    Ok(Novel {
        id: row.id,
        title: row.title,
        cover_img: row.cover_img,
        description: row.description,
        status: row.status,
        year: row.year,
        author: row.author,
        views_count: row.views_count,
        genres,
        chapters,
        reviews,
        saved_by,
        star_ratings: rating.ratings,
        average_rating: rating.average,
        created: row.created,
        modified: row.modified,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status() {
        for status in [Status::InProgress, Status::Hiatus, Status::Ended] {
            assert_eq!(status.as_str().parse::<Status>().unwrap(), status);
            assert_eq!(
                serde_json::to_string(&status).unwrap(),
                format!("\"{status}\"")
            );
        }
        assert!("finished".parse::<Status>().is_err());
        assert!("InProgress".parse::<Status>().is_err());
    }
}
