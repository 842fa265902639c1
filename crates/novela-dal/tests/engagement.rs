mod common;

use std::collections::BTreeSet;

use common::{create_novel, create_user, init_db};
use novela_dal::{
    Error, ListingParams,
    chapter::{ChapterData, ChapterRepositoryImpl},
    engagement::{EngagementRepositoryImpl, ViewTarget},
    novel::{NovelFilter, NovelRepositoryImpl},
    review::{ReviewRepositoryImpl, ReviewTarget},
    user::UserRepositoryImpl,
};

#[tokio::test]
async fn test_rating_upsert_and_average() {
    let pool = init_db().await;
    let novel = create_novel(&pool, "Rated").await;
    let alice = create_user(&pool, "alice1").await;
    let bob = create_user(&pool, "bobby1").await;
    let repo = EngagementRepositoryImpl::new(pool.clone());

    let summary = repo.rate(novel, alice, 3).await.unwrap();
    assert_eq!(summary.count, 1);
    assert_eq!(summary.average, 3.0);

    let summary = repo.rate(novel, alice, 5).await.unwrap();
    assert_eq!(summary.count, 1);
    assert_eq!(summary.ratings.len(), 1);
    assert_eq!(summary.ratings[0].rating, 5);
    assert_eq!(summary.average, 5.0);

    let summary = repo.rate(novel, bob, 2).await.unwrap();
    assert_eq!(summary.count, 2);
    assert_eq!(summary.average, 3.5);

    let novel_view = NovelRepositoryImpl::new(pool.clone()).get(novel).await.unwrap();
    assert_eq!(novel_view.average_rating, 3.5);
    assert_eq!(novel_view.star_ratings.len(), 2);

    assert!(matches!(
        repo.rate(9999, alice, 1).await,
        Err(Error::RecordNotFound(_))
    ));
    assert_eq!(repo.ratings(novel).await.unwrap().count, 2);
}

#[tokio::test]
async fn test_toggle_save_keeps_both_views_equal() {
    let pool = init_db().await;
    let users = [
        create_user(&pool, "reader1").await,
        create_user(&pool, "reader2").await,
        create_user(&pool, "reader3").await,
    ];
    let novels = [
        create_novel(&pool, "One").await,
        create_novel(&pool, "Two").await,
    ];
    let repo = EngagementRepositoryImpl::new(pool.clone());
    let user_repo = UserRepositoryImpl::new(pool.clone());
    let novel_repo = NovelRepositoryImpl::new(pool.clone());

    let sequence = [
        (0, 0),
        (1, 0),
        (0, 1),
        (0, 0),
        (2, 1),
        (1, 1),
        (2, 1),
        (1, 0),
    ];
    for (u, n) in sequence {
        repo.toggle_save(novels[n], users[u]).await.unwrap();

        let mut from_novels = BTreeSet::new();
        for novel in novels {
            for user in novel_repo.get(novel).await.unwrap().saved_by {
                from_novels.insert((novel, user));
            }
        }
        let mut from_users = BTreeSet::new();
        for user in users {
            for novel in user_repo.get(user).await.unwrap().saves {
                from_users.insert((novel, user));
            }
        }
        assert_eq!(from_novels, from_users);
    }

    let saved = novel_repo
        .list(NovelFilter::SavedBy(users[0]), ListingParams::default())
        .await
        .unwrap();
    assert_eq!(saved.total, 1);
    assert_eq!(saved.rows[0].id, novels[1]);
}

#[tokio::test]
async fn test_toggle_twice_restores_membership() {
    let pool = init_db().await;
    let user = create_user(&pool, "toggler").await;
    let novel = create_novel(&pool, "Bookmarked").await;
    let repo = EngagementRepositoryImpl::new(pool.clone());

    let state = repo.toggle_save(novel, user).await.unwrap();
    assert!(state.saved);
    assert_eq!(state.saved_by, vec![user]);
    let state = repo.toggle_save(novel, user).await.unwrap();
    assert!(!state.saved);
    assert!(state.saved_by.is_empty());

    let state = repo.unsave(novel, user).await.unwrap();
    assert!(!state.saved);
    assert!(state.saved_by.is_empty());

    assert!(matches!(
        repo.toggle_save(9999, user).await,
        Err(Error::RecordNotFound(_))
    ));
}

#[tokio::test]
async fn test_view_counters() {
    let pool = init_db().await;
    let novel = create_novel(&pool, "Viewed").await;
    let chapter = ChapterRepositoryImpl::new(pool.clone())
        .add(
            novel,
            ChapterData {
                title: "Prologue".into(),
                body: String::new(),
            },
        )
        .await
        .unwrap();
    let repo = EngagementRepositoryImpl::new(pool.clone());
    assert_eq!(repo.increment_view(ViewTarget::Novel(novel)).await.unwrap(), 1);
    assert_eq!(repo.increment_view(ViewTarget::Novel(novel)).await.unwrap(), 2);
    assert_eq!(
        repo.increment_view(ViewTarget::Chapter(chapter.id))
            .await
            .unwrap(),
        1
    );
    assert!(matches!(
        repo.increment_view(ViewTarget::Chapter(9999)).await,
        Err(Error::RecordNotFound(_))
    ));
}

#[tokio::test]
async fn test_reviews() {
    let pool = init_db().await;
    let novel = create_novel(&pool, "Reviewed").await;
    let author = create_user(&pool, "critic").await;
    let chapter = ChapterRepositoryImpl::new(pool.clone())
        .add(
            novel,
            ChapterData {
                title: "One".into(),
                body: "Body".into(),
            },
        )
        .await
        .unwrap();
    let repo = ReviewRepositoryImpl::new(pool.clone());

    let mut ids = Vec::new();
    for i in 0..5 {
        let review = repo
            .add(ReviewTarget::Novel(novel), author, &format!("Review {i}"))
            .await
            .unwrap();
        assert_eq!(review.novel_id, Some(novel));
        assert_eq!(review.chapter_id, None);
        assert_eq!(review.username, "critic");
        ids.push(review.id);
    }
    let on_chapter = repo
        .add(ReviewTarget::Chapter(chapter.id), author, "Chapter review")
        .await
        .unwrap();
    assert_eq!(on_chapter.novel_id, None);
    assert_eq!(on_chapter.chapter_id, Some(chapter.id));

    // newest first
    let page = repo
        .list_for_target(ReviewTarget::Novel(novel), ListingParams::new(0, 3))
        .await
        .unwrap();
    assert_eq!(page.total, 5);
    assert_eq!(
        page.rows.iter().map(|r| r.id).collect::<Vec<_>>(),
        vec![ids[4], ids[3], ids[2]]
    );
    let page = repo
        .list_for_target(ReviewTarget::Novel(novel), ListingParams::new(3, 3))
        .await
        .unwrap();
    assert_eq!(
        page.rows.iter().map(|r| r.id).collect::<Vec<_>>(),
        vec![ids[1], ids[0]]
    );

    let by_user = repo
        .list_by_user(author, ListingParams::default())
        .await
        .unwrap();
    assert_eq!(by_user.total, 6);

    assert!(matches!(
        repo.add(ReviewTarget::Chapter(9999), author, "x").await,
        Err(Error::RecordNotFound(_))
    ));
    assert!(matches!(
        repo.add(ReviewTarget::Novel(novel), 9999, "x").await,
        Err(Error::RecordNotFound(_))
    ));
    assert!(matches!(
        repo.list_for_target(ReviewTarget::Novel(9999), ListingParams::default())
            .await,
        Err(Error::RecordNotFound(_))
    ));

    let users = UserRepositoryImpl::new(pool.clone());
    assert_eq!(users.find_by_review(on_chapter.id).await.unwrap().id, author);
    assert_eq!(users.get(author).await.unwrap().reviews.len(), 6);
}
