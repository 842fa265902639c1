use garde::Validate;
use novela_blob::{BlobKind, BlobStore};
use novela_dal::{
    chapter::{Chapter, ChapterData, ChapterRepository},
    genre::{GenreRef, GenreRepository},
    novel::{CoverChange, DeleteReport, Novel, NovelData, NovelRepository, Status},
    user::{ProfileChanges, User, UserRepository},
    Pool,
};
use novela_types::general::Username;
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::error::{ApiError, ApiResult};

pub(crate) fn not_blank(value: &str, _ctx: &()) -> garde::Result {
    if value.trim().is_empty() {
        Err(garde::Error::new("must not be empty"))
    } else {
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct NovelInput {
    #[garde(custom(not_blank), length(max = 255))]
    pub title: String,
    #[garde(custom(not_blank), length(max = 20000))]
    pub description: String,
    #[garde(skip)]
    pub status: Status,
    #[garde(custom(not_blank), length(max = 16))]
    pub year: String,
    #[garde(custom(not_blank), length(max = 255))]
    pub author: String,
    #[garde(length(min = 1, max = 32))]
    pub genres: Vec<GenreRef>,
    /// `data:` URL of new cover, on update also the current cover URL (no change) or empty string (removes cover)
    #[serde(default)]
    #[garde(skip)]
    pub cover_img: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct ChapterInput {
    #[serde(alias = "chapterTitle", default)]
    #[garde(length(max = 255))]
    pub title: String,
    #[serde(alias = "chapterBody", default)]
    #[garde(length(max = 500000))]
    pub body: String,
}

impl ChapterInput {
    fn into_data(self) -> ApiResult<ChapterData> {
        if self.title.trim().is_empty() && self.body.trim().is_empty() {
            return Err(ApiError::Validation(
                "Chapter title and body cannot be both empty".to_string(),
            ));
        }
        Ok(ChapterData {
            title: self.title,
            body: self.body,
        })
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct ProfileInput {
    #[garde(dive)]
    pub username: Option<Username>,
    #[garde(length(max = 2000))]
    pub about: Option<String>,
    /// `data:` URL of new image, current image URL or empty string
    #[garde(skip)]
    pub profile_img: Option<String>,
}

enum ImageChange {
    Keep,
    Upload(String),
    Clear,
}

fn image_change(requested: Option<String>, current: Option<&str>) -> ImageChange {
    match requested {
        None => ImageChange::Keep,
        Some(img) if img.trim().is_empty() => ImageChange::Clear,
        Some(img) if Some(img.as_str()) == current => ImageChange::Keep,
        Some(img) => ImageChange::Upload(img),
    }
}

/// Operations on catalog, which touch both database and image store.
///
/// Images are always uploaded before database change is committed and old images are released
/// only after successful commit. If commit fails the new image is released.
pub struct CatalogService<B> {
    pool: Pool,
    blobs: B,
}

impl<B: BlobStore> CatalogService<B> {
    pub fn new(pool: Pool, blobs: B) -> Self {
        Self { pool, blobs }
    }

    async fn release(&self, url: &str) {
        match self.blobs.destroy(url).await {
            Ok(()) => debug!("Released image {url}"),
            Err(e) => warn!("Failed to release image {url}: {e}"),
        }
    }

    async fn upload(&self, change: ImageChange, kind: BlobKind) -> ApiResult<Option<String>> {
        match change {
            ImageChange::Upload(payload) => Ok(Some(self.blobs.upload(kind, &payload).await?)),
            ImageChange::Keep | ImageChange::Clear => Ok(None),
        }
    }

    async fn novel_data(&self, input: &NovelInput) -> ApiResult<NovelData> {
        let genres = GenreRepository::new(self.pool.clone())
            .resolve(&input.genres)
            .await?;
        Ok(NovelData {
            title: input.title.trim().to_string(),
            description: input.description.clone(),
            status: input.status,
            year: input.year.trim().to_string(),
            author: input.author.trim().to_string(),
            genres,
        })
    }

    pub async fn create_novel(&self, input: NovelInput) -> ApiResult<Novel> {
        let data = self.novel_data(&input).await?;
        let cover = self
            .upload(image_change(input.cover_img, None), BlobKind::Cover)
            .await?;
        match NovelRepository::new(self.pool.clone())
            .create(data, cover.clone())
            .await
        {
            Ok(novel) => {
                info!("Created novel {} ({})", novel.title, novel.id);
                Ok(novel)
            }
            Err(e) => {
                if let Some(url) = cover {
                    self.release(&url).await;
                }
                Err(e.into())
            }
        }
    }

    pub async fn update_novel(&self, id: i64, input: NovelInput) -> ApiResult<Novel> {
        let repository = NovelRepository::new(self.pool.clone());
        let current = repository.get(id).await?;
        let data = self.novel_data(&input).await?;
        let change = image_change(input.cover_img, current.cover_img.as_deref());
        let cover_change = match change {
            ImageChange::Keep => CoverChange::Keep,
            ImageChange::Clear => CoverChange::Clear,
            upload @ ImageChange::Upload(_) => match self.upload(upload, BlobKind::Cover).await? {
                Some(url) => CoverChange::Set(url),
                None => CoverChange::Keep,
            },
        };
        let uploaded = match &cover_change {
            CoverChange::Set(url) => Some(url.clone()),
            _ => None,
        };
        match repository.update(id, data, cover_change).await {
            Ok((novel, replaced)) => {
                if let Some(old) = replaced {
                    self.release(&old).await;
                }
                debug!("Updated novel {id}");
                Ok(novel)
            }
            Err(e) => {
                if let Some(url) = uploaded {
                    self.release(&url).await;
                }
                Err(e.into())
            }
        }
    }

    pub async fn delete_novel(&self, id: i64) -> ApiResult<DeleteReport> {
        let report = NovelRepository::new(self.pool.clone()).delete(id).await?;
        if let Some(cover) = &report.cover_img {
            self.release(cover).await;
        }
        info!(
            "Deleted novel {id} with {} chapters, removed from {} bookmarks",
            report.chapters_deleted, report.bookmarks_removed
        );
        Ok(report)
    }

    pub async fn add_chapter(&self, novel_id: i64, input: ChapterInput) -> ApiResult<Chapter> {
        let data = input.into_data()?;
        let chapter = ChapterRepository::new(self.pool.clone())
            .add(novel_id, data)
            .await?;
        debug!(
            "Added chapter {} to novel {novel_id}",
            chapter.chapter_number
        );
        Ok(chapter)
    }

    pub async fn update_chapter(&self, id: i64, input: ChapterInput) -> ApiResult<Chapter> {
        let data = input.into_data()?;
        let chapter = ChapterRepository::new(self.pool.clone())
            .update(id, data)
            .await?;
        Ok(chapter)
    }

    pub async fn update_profile(&self, user_id: i64, input: ProfileInput) -> ApiResult<User> {
        let repository = UserRepository::new(self.pool.clone());
        let current = repository.get(user_id).await?;
        let change = image_change(input.profile_img, current.profile_img.as_deref());
        let profile_img = match change {
            ImageChange::Keep => None,
            ImageChange::Clear => Some(None),
            upload @ ImageChange::Upload(_) => {
                self.upload(upload, BlobKind::Profile).await?.map(Some)
            }
        };
        let uploaded = profile_img.clone().flatten();
        let changes = ProfileChanges {
            username: input.username,
            about: input.about,
            profile_img: profile_img.clone(),
        };
        match repository.update_profile(user_id, changes).await {
            Ok((user, previous)) => {
                if let (Some(old), Some(_)) = (previous, profile_img) {
                    if user.profile_img.as_deref() != Some(old.as_str()) {
                        self.release(&old).await;
                    }
                }
                Ok(user)
            }
            Err(e) => {
                if let Some(url) = uploaded {
                    self.release(&url).await;
                }
                Err(e.into())
            }
        }
    }
}
