use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use sqlx::{Acquire, Executor, Pool};
use tracing::debug;

use crate::{ChosenConnection, ChosenDB, Error, error::Result};

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct Genre {
    pub id: i64,
    pub name: String,
}

/// Genre can be referenced either by its id or by its name
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(untagged)]
pub enum GenreRef {
    Id(i64),
    Name(String),
}

pub type GenreRepository = GenreRepositoryImpl<Pool<ChosenDB>>;

pub struct GenreRepositoryImpl<E> {
    executor: E,
}

impl<'c, E> GenreRepositoryImpl<E>
where
    for<'a> &'a E: Executor<'c, Database = ChosenDB> + Acquire<'c, Database = ChosenDB>,
{
    pub fn new(executor: E) -> Self {
        Self { executor }
    }

    pub async fn list_all(&self) -> Result<Vec<Genre>> {
        let genres = sqlx::query_as("SELECT id, name FROM genre ORDER BY name, id")
            .fetch_all(&self.executor)
            .await?;
        Ok(genres)
    }

    pub async fn get(&self, id: i64) -> Result<Genre> {
        sqlx::query_as("SELECT id, name FROM genre WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.executor)
            .await?
            .ok_or_else(|| Error::not_found("Genre"))
    }

    /// Creates genre unless it already exists
    pub async fn ensure(&self, name: &str) -> Result<Genre> {
        let name = name.trim();
        sqlx::query("INSERT INTO genre (name) VALUES (?) ON CONFLICT (name) DO NOTHING")
            .bind(name)
            .execute(&self.executor)
            .await?;
        let genre = sqlx::query_as("SELECT id, name FROM genre WHERE name = ?")
            .bind(name)
            .fetch_one(&self.executor)
            .await?;
        Ok(genre)
    }

    pub async fn count_novels(&self, id: i64) -> Result<u64> {
        self.get(id).await?;
        let count = sqlx::query_scalar("SELECT count(*) FROM novel_genres WHERE genre_id = ?")
            .bind(id)
            .fetch_one(&self.executor)
            .await?;
        Ok(count)
    }

    pub async fn resolve(&self, refs: &[GenreRef]) -> Result<Vec<i64>> {
        let mut conn = self.executor.acquire().await?;
        resolve(refs, &mut conn).await
    }
}

/// Resolves references to ids, any unknown reference fails whole resolution
pub(crate) async fn resolve(refs: &[GenreRef], conn: &mut ChosenConnection) -> Result<Vec<i64>> {
    let mut ids = BTreeSet::new();
    for r in refs {
        let found: Option<i64> = match r {
            GenreRef::Id(id) => {
                sqlx::query_scalar("SELECT id FROM genre WHERE id = ?")
                    .bind(id)
                    .fetch_optional(&mut *conn)
                    .await?
            }
            GenreRef::Name(name) => {
                sqlx::query_scalar("SELECT id FROM genre WHERE name = ?")
                    .bind(name.trim())
                    .fetch_optional(&mut *conn)
                    .await?
            }
        };
        match found {
            Some(id) => {
                ids.insert(id);
            }
            None => {
                debug!("Unresolved genre {r:?}");
                return Err(Error::not_found(match r {
                    GenreRef::Id(id) => format!("Genre {id}"),
                    GenreRef::Name(name) => format!("Genre {name}"),
                }));
            }
        }
    }
    Ok(ids.into_iter().collect())
}

pub(crate) async fn genres_of_novel(
    novel_id: i64,
    conn: &mut ChosenConnection,
) -> Result<Vec<Genre>> {
    let genres = sqlx::query_as(
        "SELECT g.id, g.name FROM genre g JOIN novel_genres ng ON ng.genre_id = g.id WHERE ng.novel_id = ? ORDER BY g.name, g.id",
    )
    .bind(novel_id)
    .fetch_all(&mut *conn)
    .await?;
    Ok(genres)
}
