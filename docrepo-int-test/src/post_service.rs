use crate::test_util::{Counter, Post};
use docrepo::common::DOC_ID;
use docrepo::connection::DatabaseConnection;
use docrepo::errors::DocRepoResult;
use docrepo::filter::field;
use docrepo::query::Grouping;
use docrepo::repository::{EntityId, Repository};
use docrepo::update::UpdateDefinition;

/// A small blog service on top of the repositories, used by the demo binary
/// and the integration tests.
#[derive(Clone)]
pub struct PostService {
    connection: DatabaseConnection,
    posts: Repository<Post>,
    counters: Repository<Counter>,
}

impl PostService {
    pub fn new(connection: DatabaseConnection) -> Self {
        PostService {
            posts: Repository::new(connection.clone()),
            counters: Repository::new(connection.clone()),
            connection,
        }
    }

    pub fn posts(&self) -> &Repository<Post> {
        &self.posts
    }

    pub async fn publish(&self, post: &mut Post) -> DocRepoResult<()> {
        self.posts.add_one(post, None).await?;
        self.counters
            .find_one_and_update(
                field("name").eq("published"),
                UpdateDefinition::new(),
                "hits",
                None,
            )
            .await?;
        log::info!("Published post {} ({})", post.title, post.id);
        Ok(())
    }

    pub async fn published_count(&self) -> DocRepoResult<i64> {
        let counter = self
            .counters
            .query()?
            .where_(field("name").eq("published"))
            .first_or_default()
            .await?;
        Ok(counter.map(|c| c.hits).unwrap_or_default())
    }

    /// Adds one like to the post and returns the new total, `None` when there is
    /// no such post.
    pub async fn like(&self, id: &str) -> DocRepoResult<Option<i64>> {
        let id = id.to_string();
        if !self.posts.exists_by_id(&id).await? {
            log::warn!("No post {} to like", id);
            return Ok(None);
        }
        let post = self
            .posts
            .find_one_and_update(
                field(DOC_ID).eq(id.to_id_value()?),
                UpdateDefinition::new(),
                "likes",
                None,
            )
            .await?;
        Ok(Some(post.likes))
    }

    /// Titles of the posts with at least `min_likes`, most liked first.
    pub async fn popular_titles(&self, min_likes: i64, limit: u64) -> DocRepoResult<Vec<String>> {
        self.posts
            .query()?
            .where_(field("likes").gte(min_likes))
            .order_by_descending("likes")
            .then_by("title")?
            .take(limit)
            .select(|post: Post| post.title)
            .to_list()
            .await
    }

    pub async fn likes_in(&self, category: &str) -> DocRepoResult<i64> {
        self.posts
            .query()?
            .where_(field("category").eq(category))
            .sum_i64("likes")
            .await
    }

    pub async fn by_category(&self) -> DocRepoResult<Vec<Grouping<String, Post>>> {
        self.posts
            .query()?
            .order_by("category")
            .group_by::<String>("category")
            .to_list()
            .await
    }

    /// Moves every post of `from` into `to` inside one transaction.
    pub async fn merge_categories(&self, from: &str, to: &str) -> DocRepoResult<u64> {
        let mut scope = self.connection.begin_transaction_scope_async().await?;
        scope.begin_transaction()?;

        let result = self
            .posts
            .update_many_field(field("category").eq(from), "category", to, Some(&scope))
            .await;

        match result {
            Ok(result) => {
                scope.commit_transaction().await?;
                log::info!(
                    "Merged {} posts from {} into {}",
                    result.modified_count,
                    from,
                    to
                );
                Ok(result.modified_count)
            }
            Err(e) => {
                scope.dispose().await?;
                Err(e)
            }
        }
    }
}
