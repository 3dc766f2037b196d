// Data Seeder - demo users, groups, posts, comments and follows

use chrono::{Duration, Utc};
use tracing::info;

use crate::{
    error::{AppError, AppResult},
    infrastructure::database::{DatabaseInterface, Inserted},
    models::{Group, NewComment, NewGroup, NewPost, User},
};

const SAMPLE_USERS: [&str; 5] = ["alice", "bob", "carol", "dave", "erin"];

const SAMPLE_GROUPS: [(&str, &str, &str); 3] = [
    ("Rust", "rust", "Ownership, lifetimes and the borrow checker"),
    ("Gardening", "gardening", "Seeds, soil and patience"),
    ("Travel", "travel", "Trip reports and photos"),
];

const SAMPLE_POSTS: [(usize, Option<usize>, &str); 12] = [
    (0, Some(0), "Finally understood why my iterator needed a lifetime parameter."),
    (1, Some(1), "Tomatoes are in. Planted them two weeks late but they look fine."),
    (2, Some(2), "Spent a rainy afternoon in Porto. The bookshop queue was worth it."),
    (3, None, "First post here, hello everyone!"),
    (0, Some(0), "Switched the config loader to environment variables only."),
    (4, Some(1), "Does anyone compost coffee grounds? Mine keep going mouldy."),
    (1, None, "Quiet week. Reading more than writing."),
    (2, Some(2), "Night train from Vienna to Venice: small cabins, great views."),
    (3, Some(0), "Async traits finally clicked after rewriting the store layer."),
    (4, None, "Testing the new image upload on the feed."),
    (0, None, "Ten posts a page feels about right."),
    (1, Some(1), "Basil survived the heatwave. Rosemary did not."),
];

/// Follow edges as (follower, author) indexes into `SAMPLE_USERS`
const SAMPLE_FOLLOWS: [(usize, usize); 6] = [(0, 1), (0, 2), (1, 0), (2, 0), (3, 4), (4, 2)];

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SeedStats {
    pub users: usize,
    pub groups: usize,
    pub posts: usize,
    pub comments: usize,
    pub follows: usize,
}

/// Fill the store with a small, deterministic data set. Users and groups that
/// already exist are reused; posts and comments are always added.
pub async fn seed_sample_data(db: &dyn DatabaseInterface) -> AppResult<SeedStats> {
    let mut stats = SeedStats::default();

    let mut users: Vec<User> = Vec::with_capacity(SAMPLE_USERS.len());
    for username in SAMPLE_USERS {
        let user = match db.create_user(username).await? {
            Inserted::Created(user) => {
                stats.users += 1;
                user
            }
            Inserted::Duplicate => db
                .get_user_by_username(username)
                .await?
                .ok_or_else(|| AppError::Internal(format!("User {} vanished", username)))?,
        };
        users.push(user);
    }
    info!("Seeded {} users", stats.users);

    let mut groups: Vec<Group> = Vec::with_capacity(SAMPLE_GROUPS.len());
    for (title, slug, description) in SAMPLE_GROUPS {
        let new_group = NewGroup {
            title: title.to_string(),
            slug: slug.to_string(),
            description: description.to_string(),
        };
        let group = match db.create_group(new_group).await? {
            Inserted::Created(group) => {
                stats.groups += 1;
                group
            }
            Inserted::Duplicate => db
                .get_group_by_slug(slug)
                .await?
                .ok_or_else(|| AppError::Internal(format!("Group {} vanished", slug)))?,
        };
        groups.push(group);
    }
    info!("Seeded {} groups", stats.groups);

    // Spread posts an hour apart, oldest first
    let start = Utc::now() - Duration::hours(SAMPLE_POSTS.len() as i64);
    for (i, (author, group, text)) in SAMPLE_POSTS.iter().enumerate() {
        let post = db
            .create_post(NewPost {
                author: users[*author].id,
                text: text.to_string(),
                group: group.map(|g| groups[g].id),
                image: None,
                pub_date: start + Duration::hours(i as i64),
            })
            .await?;
        stats.posts += 1;

        // Every other post gets comments from the next users round the list
        for j in 0..(i % 2) * 2 {
            let commenter = &users[(author + j + 1) % users.len()];
            db.create_comment(NewComment {
                post: post.id,
                author: commenter.id,
                text: format!("{} agrees with {}", commenter.username, users[*author].username),
                created: post.pub_date + Duration::minutes(10 * (j as i64 + 1)),
            })
            .await?;
            stats.comments += 1;
        }
    }
    info!("Seeded {} posts and {} comments", stats.posts, stats.comments);

    for (follower, author) in SAMPLE_FOLLOWS {
        if db.create_follow(users[follower].id, users[author].id).await? {
            stats.follows += 1;
        }
    }
    info!("Seeded {} follows", stats.follows);

    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::database::PostFilter;
    use crate::infrastructure::sqlite_database::SqliteDatabase;

    #[tokio::test]
    async fn test_seed_counts() {
        let db = SqliteDatabase::new_in_memory().await.unwrap();
        let stats = seed_sample_data(&db).await.unwrap();

        assert_eq!(stats.users, 5);
        assert_eq!(stats.groups, 3);
        assert_eq!(stats.posts, 12);
        assert_eq!(stats.comments, 12);
        assert_eq!(stats.follows, 6);
        assert_eq!(db.count_posts(&PostFilter::All).await.unwrap(), 12);
    }

    #[tokio::test]
    async fn test_reseeding_reuses_users_and_groups() {
        let db = SqliteDatabase::new_in_memory().await.unwrap();
        seed_sample_data(&db).await.unwrap();
        let again = seed_sample_data(&db).await.unwrap();

        assert_eq!(again.users, 0);
        assert_eq!(again.groups, 0);
        assert_eq!(again.follows, 0);
        assert_eq!(db.count_posts(&PostFilter::All).await.unwrap(), 24);
    }
}
