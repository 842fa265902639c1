use serde::Serialize;
use sqlx::{Acquire, Executor, Pool};
use tracing::debug;

use crate::{ChosenConnection, ChosenDB, Error, error::Result, novel};

#[derive(Debug, Serialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Chapter {
    pub id: i64,
    pub novel_id: i64,
    pub chapter_number: i64,
    pub title: String,
    pub body: String,
    pub views_count: i64,
    pub reviews: Vec<i64>,
    pub created: time::PrimitiveDateTime,
    pub modified: time::PrimitiveDateTime,
}

#[derive(Debug, sqlx::FromRow)]
struct ChapterRow {
    id: i64,
    novel_id: i64,
    chapter_number: i64,
    title: String,
    body: String,
    views_count: i64,
    created: time::PrimitiveDateTime,
    modified: time::PrimitiveDateTime,
}

/// Chapter without its text, for tables of contents
#[derive(Debug, Serialize, Clone, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ChapterSummary {
    pub id: i64,
    pub novel_id: i64,
    pub chapter_number: i64,
    pub title: String,
    pub views_count: i64,
    pub created: time::PrimitiveDateTime,
}

#[derive(Debug, Clone)]
pub struct ChapterData {
    pub title: String,
    pub body: String,
}

pub type ChapterRepository = ChapterRepositoryImpl<Pool<ChosenDB>>;

pub struct ChapterRepositoryImpl<E> {
    executor: E,
}

impl<'c, E> ChapterRepositoryImpl<E>
where
    for<'a> &'a E: Executor<'c, Database = ChosenDB> + Acquire<'c, Database = ChosenDB>,
{
    pub fn new(executor: E) -> Self {
        Self { executor }
    }

    /// Appends chapter to novel, chapter number is next in sequence
    pub async fn add(&self, novel_id: i64, data: ChapterData) -> Result<Chapter> {
        // number is computed in the same statement, so concurrent adds cannot get the same one
        let result = sqlx::query(
            "INSERT INTO chapter (novel_id, chapter_number, title, body)
            SELECT n.id, (SELECT count(*) FROM chapter c WHERE c.novel_id = n.id) + 1, ?, ?
            FROM novel n WHERE n.id = ?",
        )
        .bind(&data.title)
        .bind(&data.body)
        .bind(novel_id)
        .execute(&self.executor)
        .await
        .map_err(|e| Error::on_unique(e, "Chapter number already used"))?;
        if result.rows_affected() == 0 {
            return Err(Error::not_found("Novel"));
        }
        let id = result.last_insert_rowid();
        debug!("Added chapter {id} to novel {novel_id}");
        self.get(id).await
    }

    pub async fn update(&self, id: i64, data: ChapterData) -> Result<Chapter> {
        let result = sqlx::query(
            "UPDATE chapter SET title = ?, body = ?, modified = CURRENT_TIMESTAMP WHERE id = ?",
        )
        .bind(&data.title)
        .bind(&data.body)
        .bind(id)
        .execute(&self.executor)
        .await?;
        if result.rows_affected() == 0 {
            return Err(Error::not_found("Chapter"));
        }
        self.get(id).await
    }

    pub async fn get(&self, id: i64) -> Result<Chapter> {
        let mut conn = self.executor.acquire().await?;
        get(id, &mut conn).await
    }

    pub async fn next(&self, id: i64) -> Result<Chapter> {
        self.neighbour(id, 1).await
    }

    pub async fn previous(&self, id: i64) -> Result<Chapter> {
        self.neighbour(id, -1).await
    }

    async fn neighbour(&self, id: i64, step: i64) -> Result<Chapter> {
        let mut conn = self.executor.acquire().await?;
        let (novel_id, number): (i64, i64) =
            sqlx::query_as("SELECT novel_id, chapter_number FROM chapter WHERE id = ?")
                .bind(id)
                .fetch_optional(&mut *conn)
                .await?
                .ok_or_else(|| Error::not_found("Chapter"))?;
        let neighbour_id: i64 =
            sqlx::query_scalar("SELECT id FROM chapter WHERE novel_id = ? AND chapter_number = ?")
                .bind(novel_id)
                .bind(number + step)
                .fetch_optional(&mut *conn)
                .await?
                .ok_or_else(|| {
                    Error::not_found(if step > 0 {
                        "Next chapter"
                    } else {
                        "Previous chapter"
                    })
                })?;
        get(neighbour_id, &mut conn).await
    }

    /// Table of contents of novel
    pub async fn list_for_novel(&self, novel_id: i64) -> Result<Vec<ChapterSummary>> {
        let mut conn = self.executor.acquire().await?;
        if !novel::exists(novel_id, &mut *conn).await? {
            return Err(Error::not_found("Novel"));
        }
        let chapters = sqlx::query_as(
            "SELECT id, novel_id, chapter_number, title, views_count, created FROM chapter WHERE novel_id = ? ORDER BY chapter_number",
        )
        .bind(novel_id)
        .fetch_all(&mut *conn)
        .await?;
        Ok(chapters)
    }
}

pub(crate) async fn exists<'c, E>(id: i64, executor: E) -> Result<bool>
where
    E: Executor<'c, Database = ChosenDB>,
{
    let found: Option<i64> = sqlx::query_scalar("SELECT id FROM chapter WHERE id = ?")
        .bind(id)
        .fetch_optional(executor)
        .await?;
    Ok(found.is_some())
}

async fn get(id: i64, conn: &mut ChosenConnection) -> Result<Chapter> {
    let row: ChapterRow = sqlx::query_as(
        "SELECT id, novel_id, chapter_number, title, body, views_count, created, modified FROM chapter WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or_else(|| Error::not_found("Chapter"))?;
    let reviews: Vec<i64> =
        sqlx::query_scalar("SELECT id FROM review WHERE chapter_id = ? ORDER BY created, id")
            .bind(id)
            .fetch_all(&mut *conn)
            .await?;
    Ok(Chapter {
        id: row.id,
        novel_id: row.novel_id,
        chapter_number: row.chapter_number,
        title: row.title,
        body: row.body,
        views_count: row.views_count,
        reviews,
        created: row.created,
        modified: row.modified,
    })
}
