mod common;

use blog_feed::{
    core::PostId,
    error::AppError,
    forms::{CommentForm, GroupForm, PostForm, SignupForm},
    infrastructure::database::PostFilter,
    models::{Post, User},
    pagination::PageRequest,
    services::{
        CommentOutcome, CreatePostOutcome, EditFormOutcome, EditPostOutcome, FollowOutcome,
        FormOutcome, UnfollowOutcome, GLOBAL_FEED_TITLE,
    },
    app_state::AppState,
};

async fn publish(state: &AppState, author: &User, text: &str, group: Option<blog_feed::core::GroupId>) -> Post {
    let form = PostForm {
        text: text.to_string(),
        group,
        image: None,
    };
    match state.posts.create_post(author, form).await.unwrap() {
        CreatePostOutcome::Created(post) => post,
        CreatePostOutcome::Invalid(view) => panic!("unexpected form errors: {:?}", view.errors),
    }
}

#[tokio::test]
async fn test_group_with_thirteen_posts_pages_ten_three_zero() {
    let state = common::state().await;
    let author = common::user(&state, "auth").await;
    let group = common::group(&state, "test").await;
    for i in 0..13 {
        publish(&state, &author, &format!("Post number {}", i), Some(group.id)).await;
    }

    let sizes: Vec<usize> = {
        let mut sizes = Vec::new();
        for page in 1..=3 {
            let view = state
                .feeds
                .group_feed("test", PageRequest::number(page))
                .await
                .unwrap();
            sizes.push(view.page.len());
        }
        sizes
    };
    assert_eq!(sizes, vec![10, 3, 0]);

    let first = state.feeds.group_feed("test", PageRequest::first()).await.unwrap();
    assert_eq!(first.title, "Group test");
    assert_eq!(first.page.num_pages, 2);
    assert_eq!(first.page.items[0].text, "Post number 12");
}

#[tokio::test]
async fn test_global_feed_is_newest_first() {
    let state = common::state().await;
    let author = common::user(&state, "auth").await;
    let first = publish(&state, &author, "first", None).await;
    let second = publish(&state, &author, "second", None).await;

    let view = state.feeds.global_feed(PageRequest::first()).await.unwrap();
    assert_eq!(view.title, GLOBAL_FEED_TITLE);
    let ids: Vec<PostId> = view.page.items.iter().map(|p| p.id).collect();
    assert_eq!(ids, vec![second.id, first.id]);
}

#[tokio::test]
async fn test_post_appears_only_in_its_group() {
    let state = common::state().await;
    let author = common::user(&state, "auth").await;
    let cats = common::group(&state, "cats").await;
    common::group(&state, "dogs").await;
    let post = publish(&state, &author, "meow", Some(cats.id)).await;

    let cats_feed = state.feeds.group_feed("cats", PageRequest::first()).await.unwrap();
    assert_eq!(cats_feed.page.items[0].id, post.id);

    let dogs_feed = state.feeds.group_feed("dogs", PageRequest::first()).await.unwrap();
    assert!(dogs_feed.page.is_empty());

    let global = state.feeds.global_feed(PageRequest::first()).await.unwrap();
    assert_eq!(global.page.items[0].id, post.id);

    let profile = state
        .feeds
        .profile_feed("auth", None, PageRequest::first())
        .await
        .unwrap();
    assert_eq!(profile.page.items[0].id, post.id);
    assert_eq!(profile.post_count, 1);
}

#[tokio::test]
async fn test_unknown_group_user_and_post_are_not_found() {
    let state = common::state().await;

    let group = state.feeds.group_feed("missing", PageRequest::first()).await;
    assert!(matches!(group, Err(AppError::NotFound(_))));

    let profile = state
        .feeds
        .profile_feed("nobody", None, PageRequest::first())
        .await;
    assert!(matches!(profile, Err(AppError::NotFound(_))));

    let detail = state.feeds.post_detail(PostId::new(999)).await;
    assert!(matches!(detail, Err(AppError::NotFound(_))));
}

#[tokio::test]
async fn test_following_feed_shows_followed_authors_only() {
    let state = common::state().await;
    let u = common::user(&state, "u").await;
    let u2 = common::user(&state, "u2").await;
    let u3 = common::user(&state, "u3").await;

    assert_eq!(state.posts.follow(&u, "u2").await.unwrap(), FollowOutcome::Followed);
    let post = publish(&state, &u2, "from u2", None).await;

    let feed = state.feeds.following_feed(&u, PageRequest::first()).await.unwrap();
    assert_eq!(feed.page.len(), 1);
    assert_eq!(feed.page.items[0].id, post.id);

    let other = state.feeds.following_feed(&u3, PageRequest::first()).await.unwrap();
    assert!(other.page.is_empty());
}

#[tokio::test]
async fn test_follow_is_idempotent_and_never_self() {
    let state = common::state().await;
    let u = common::user(&state, "u").await;
    let u2 = common::user(&state, "u2").await;

    assert_eq!(state.posts.follow(&u, "u2").await.unwrap(), FollowOutcome::Followed);
    assert_eq!(
        state.posts.follow(&u, "u2").await.unwrap(),
        FollowOutcome::AlreadyFollowing
    );
    assert_eq!(state.db.count_follows(u.id, u2.id).await.unwrap(), 1);

    assert_eq!(state.posts.follow(&u, "u").await.unwrap(), FollowOutcome::SelfFollow);
    assert_eq!(state.db.count_follows(u.id, u.id).await.unwrap(), 0);

    let missing = state.posts.follow(&u, "ghost").await;
    assert!(matches!(missing, Err(AppError::NotFound(_))));
}

#[tokio::test]
async fn test_unfollow_removes_row_and_is_a_noop_when_absent() {
    let state = common::state().await;
    let u = common::user(&state, "u").await;
    let u2 = common::user(&state, "u2").await;
    state.posts.follow(&u, "u2").await.unwrap();

    assert_eq!(
        state.posts.unfollow(&u, "u2").await.unwrap(),
        UnfollowOutcome::Unfollowed
    );
    assert!(!state.db.follow_exists(u.id, u2.id).await.unwrap());
    assert_eq!(
        state.posts.unfollow(&u, "u2").await.unwrap(),
        UnfollowOutcome::NotFollowing
    );
}

#[tokio::test]
async fn test_profile_following_flag() {
    let state = common::state().await;
    let reader = common::user(&state, "reader").await;
    common::user(&state, "writer").await;

    let anonymous = state
        .feeds
        .profile_feed("writer", None, PageRequest::first())
        .await
        .unwrap();
    assert!(!anonymous.following);

    state.posts.follow(&reader, "writer").await.unwrap();
    let signed_in = state
        .feeds
        .profile_feed("writer", Some(&reader), PageRequest::first())
        .await
        .unwrap();
    assert!(signed_in.following);
}

#[tokio::test]
async fn test_invalid_create_leaves_storage_untouched() {
    let state = common::state().await;
    let author = common::user(&state, "auth").await;

    let blank = PostForm {
        text: "   ".to_string(),
        group: None,
        image: None,
    };
    match state.posts.create_post(&author, blank).await.unwrap() {
        CreatePostOutcome::Invalid(view) => assert!(view.errors.has("text")),
        CreatePostOutcome::Created(_) => panic!("blank post was stored"),
    }

    let bad_group = PostForm {
        text: "valid text".to_string(),
        group: Some(blog_feed::core::GroupId::new(42)),
        image: None,
    };
    match state.posts.create_post(&author, bad_group).await.unwrap() {
        CreatePostOutcome::Invalid(view) => {
            assert!(view.errors.has("group"));
            assert_eq!(view.form.text, "valid text");
        }
        CreatePostOutcome::Created(_) => panic!("post with unknown group was stored"),
    }

    assert_eq!(state.db.count_posts(&PostFilter::All).await.unwrap(), 0);
}

#[tokio::test]
async fn test_author_edit_keeps_pub_date() {
    let state = common::state().await;
    let author = common::user(&state, "auth").await;
    let group = common::group(&state, "test").await;
    let post = publish(&state, &author, "before", None).await;

    let form = PostForm {
        text: "after".to_string(),
        group: Some(group.id),
        image: None,
    };
    let updated = match state.posts.edit_post(&author, post.id, form).await.unwrap() {
        EditPostOutcome::Updated(updated) => updated,
        other => panic!("unexpected outcome {:?}", other),
    };
    assert_eq!(updated.text, "after");
    assert_eq!(updated.group.unwrap().slug, "test");
    assert_eq!(updated.pub_date, post.pub_date);
    assert_eq!(updated.author, post.author);
}

#[tokio::test]
async fn test_non_author_gets_read_only_detail() {
    let state = common::state().await;
    let author = common::user(&state, "auth").await;
    let intruder = common::user(&state, "intruder").await;
    let post = publish(&state, &author, "mine", None).await;

    match state.posts.edit_form(&intruder, post.id).await.unwrap() {
        EditFormOutcome::ReadOnly(detail) => assert_eq!(detail.post.id, post.id),
        EditFormOutcome::Form(_) => panic!("non-author received the edit form"),
    }

    let form = PostForm {
        text: "hijacked".to_string(),
        group: None,
        image: None,
    };
    assert!(matches!(
        state.posts.edit_post(&intruder, post.id, form).await.unwrap(),
        EditPostOutcome::ReadOnly(_)
    ));

    let stored = state.db.get_post(post.id).await.unwrap().unwrap();
    assert_eq!(stored, post);

    match state.posts.edit_form(&author, post.id).await.unwrap() {
        EditFormOutcome::Form(view) => {
            assert!(view.is_edit);
            assert_eq!(view.form.text, "mine");
        }
        EditFormOutcome::ReadOnly(_) => panic!("author did not receive the edit form"),
    }
}

#[tokio::test]
async fn test_blank_comment_is_dropped() {
    let state = common::state().await;
    let author = common::user(&state, "auth").await;
    let post = publish(&state, &author, "discuss", None).await;

    let dropped = state
        .posts
        .add_comment(&author, post.id, CommentForm { text: "  ".into() })
        .await
        .unwrap();
    assert!(matches!(dropped, CommentOutcome::Dropped));
    assert_eq!(state.db.count_comments(post.id).await.unwrap(), 0);

    let added = state
        .posts
        .add_comment(&author, post.id, CommentForm { text: "Great".into() })
        .await
        .unwrap();
    assert!(matches!(added, CommentOutcome::Added(_)));

    let detail = state.feeds.post_detail(post.id).await.unwrap();
    assert_eq!(detail.comments.len(), 1);
    assert_eq!(detail.comments[0].text, "Great");
    assert_eq!(detail.comments[0].author.username, "auth");
}

#[tokio::test]
async fn test_post_and_comment_text_are_stored_trimmed() {
    let state = common::state().await;
    let author = common::user(&state, "auth").await;
    let post = publish(&state, &author, "  padded post  ", None).await;
    assert_eq!(post.text, "padded post");

    let added = state
        .posts
        .add_comment(&author, post.id, CommentForm { text: "\n nice \t".into() })
        .await
        .unwrap();
    assert!(matches!(added, CommentOutcome::Added(_)));

    let detail = state.feeds.post_detail(post.id).await.unwrap();
    assert_eq!(detail.post.text, "padded post");
    assert_eq!(detail.comments[0].text, "nice");
}

#[tokio::test]
async fn test_post_detail_context() {
    let state = common::state().await;
    let author = common::user(&state, "auth").await;
    publish(&state, &author, "short one", None).await;
    let post = publish(
        &state,
        &author,
        "A post whose text runs well past thirty characters",
        None,
    )
    .await;

    let detail = state.feeds.post_detail(post.id).await.unwrap();
    assert_eq!(detail.title, "A post whose text runs well pa");
    assert_eq!(detail.title.chars().count(), 30);
    assert_eq!(detail.author_post_count, 2);
    assert!(detail.form.text.is_empty());
}

#[tokio::test]
async fn test_cached_global_feed_hides_new_post_until_expiry() {
    let state = common::cached_state().await;
    let author = common::user(&state, "auth").await;
    publish(&state, &author, "first", None).await;

    let before = state.feeds.global_feed(PageRequest::first()).await.unwrap();
    assert_eq!(before.page.len(), 1);

    publish(&state, &author, "second", None).await;
    let cached = state.feeds.global_feed(PageRequest::first()).await.unwrap();
    assert_eq!(cached.page.len(), 1);
    assert_eq!(cached.page.items[0].text, "first");

    // Group and profile feeds are never cached
    let profile = state
        .feeds
        .profile_feed("auth", None, PageRequest::first())
        .await
        .unwrap();
    assert_eq!(profile.page.len(), 2);
}

#[tokio::test]
async fn test_disabled_cache_shows_new_post_immediately() {
    let state = common::state().await;
    let author = common::user(&state, "auth").await;
    publish(&state, &author, "first", None).await;
    state.feeds.global_feed(PageRequest::first()).await.unwrap();

    publish(&state, &author, "second", None).await;
    let fresh = state.feeds.global_feed(PageRequest::first()).await.unwrap();
    assert_eq!(fresh.page.len(), 2);
    assert_eq!(fresh.page.items[0].text, "second");
}

#[tokio::test]
async fn test_admin_group_lifecycle_detaches_posts() {
    let state = common::state().await;
    let author = common::user(&state, "auth").await;

    let created = state
        .admin
        .create_group(GroupForm {
            title: "Cats".into(),
            slug: "cats".into(),
            description: "All about cats".into(),
        })
        .await
        .unwrap();
    let cats = match created {
        FormOutcome::Saved(group) => group,
        FormOutcome::Invalid(errors) => panic!("unexpected errors {:?}", errors),
    };

    let duplicate = state
        .admin
        .create_group(GroupForm {
            title: "More cats".into(),
            slug: "cats".into(),
            description: String::new(),
        })
        .await
        .unwrap();
    assert!(matches!(duplicate, FormOutcome::Invalid(ref errors) if errors.has("slug")));

    let post = publish(&state, &author, "meow", Some(cats.id)).await;
    state.admin.delete_group("cats").await.unwrap();

    let stored = state.db.get_post(post.id).await.unwrap().unwrap();
    assert!(stored.group.is_none());
    assert!(state.admin.list_groups().await.unwrap().is_empty());
    assert!(matches!(
        state.admin.delete_group("cats").await,
        Err(AppError::NotFound(_))
    ));
}

#[tokio::test]
async fn test_admin_search_and_delete_post() {
    let state = common::state().await;
    let author = common::user(&state, "auth").await;
    let keep = publish(&state, &author, "Rust is fun", None).await;
    let drop = publish(&state, &author, "rust never sleeps", None).await;
    publish(&state, &author, "unrelated", None).await;

    let hits = state.admin.search_posts("RUST", PageRequest::first()).await.unwrap();
    let ids: Vec<PostId> = hits.items.iter().map(|p| p.id).collect();
    assert_eq!(ids, vec![drop.id, keep.id]);

    state.admin.delete_post(drop.id).await.unwrap();
    assert!(state.db.get_post(drop.id).await.unwrap().is_none());
    assert!(matches!(
        state.admin.delete_post(drop.id).await,
        Err(AppError::NotFound(_))
    ));

    let everything = state.admin.search_posts("  ", PageRequest::first()).await.unwrap();
    assert_eq!(everything.total_count, 2);
}

#[tokio::test]
async fn test_signup_and_user_removal_cascade() {
    let state = common::state().await;

    let registered = state
        .admin
        .register_user(SignupForm { username: "newbie".into() })
        .await
        .unwrap();
    let newbie = match registered {
        FormOutcome::Saved(user) => user,
        FormOutcome::Invalid(errors) => panic!("unexpected errors {:?}", errors),
    };
    let again = state
        .admin
        .register_user(SignupForm { username: "newbie".into() })
        .await
        .unwrap();
    assert!(matches!(again, FormOutcome::Invalid(ref errors) if errors.has("username")));

    let post = publish(&state, &newbie, "hello", None).await;
    state.admin.remove_user("newbie").await.unwrap();

    assert!(state.db.get_post(post.id).await.unwrap().is_none());
    assert!(matches!(
        state
            .feeds
            .profile_feed("newbie", None, PageRequest::first())
            .await,
        Err(AppError::NotFound(_))
    ));
}
