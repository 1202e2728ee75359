use chrono::{DateTime, Duration, SubsecRound, Utc};
use docrepo::connection::DatabaseConnection;
use docrepo::errors::DocRepoResult;
use docrepo::repository::Repository;
use docrepo::store::memory::{MemoryStore, MemoryStoreConfig};
use docrepo_derive::{Convertible, Entity};
use fake::faker::lorem::en::{Paragraph, Sentence, Word};
use fake::Fake;
use futures::FutureExt;
use rand::Rng;
use std::backtrace::Backtrace;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::time::Instant;

pub const TEST_DATABASE: &str = "blog";
pub const CATEGORIES: [&str; 3] = ["rust", "databases", "travel"];

#[derive(Entity, Convertible, Debug, Clone, PartialEq, Default)]
#[entity(name = "Post", id(field = "id"))]
pub struct Post {
    pub id: String,
    pub post_date_time: DateTime<Utc>,
    pub title: String,
    pub content: String,
    pub category: String,
    pub tags: Vec<String>,
    pub likes: i64,
}

impl Post {
    pub fn new(title: &str, content: &str) -> Self {
        Post {
            id: String::new(),
            post_date_time: now(),
            title: title.to_string(),
            content: content.to_string(),
            category: CATEGORIES[0].to_string(),
            tags: vec![],
            likes: 0,
        }
    }

    pub fn with_category(mut self, category: &str) -> Self {
        self.category = category.to_string();
        self
    }

    pub fn with_likes(mut self, likes: i64) -> Self {
        self.likes = likes;
        self
    }

    pub fn with_tags(mut self, tags: &[&str]) -> Self {
        self.tags = tags.iter().map(|t| t.to_string()).collect();
        self
    }
}

/// A named counter, bumped through `find_one_and_update`.
#[derive(Entity, Convertible, Debug, Clone, PartialEq, Default)]
#[entity(id(field = "id"))]
pub struct Counter {
    pub id: String,
    pub name: String,
    pub hits: i64,
}

/// Projection target for `select` and `of_type` tests.
#[derive(Convertible, Debug, Clone, PartialEq, Default)]
pub struct PostSummary {
    pub title: String,
    pub likes: i64,
}

#[derive(Clone)]
pub struct TestContext {
    connection: DatabaseConnection,
    posts: Repository<Post>,
}

impl TestContext {
    pub fn new(connection: DatabaseConnection) -> Self {
        let posts = Repository::new(connection.clone());
        TestContext { connection, posts }
    }

    pub fn connection(&self) -> DatabaseConnection {
        self.connection.clone()
    }

    pub fn posts(&self) -> Repository<Post> {
        self.posts.clone()
    }
}

/// A connection to a fresh in-memory replica set, so transactions are available.
pub fn replica_connection() -> DocRepoResult<DatabaseConnection> {
    DatabaseConnection::builder()
        .connection_string("memory://localhost/?replicaSet=rs0")
        .database(TEST_DATABASE)
        .connect()
}

/// A connection to a fresh standalone in-memory store, without transactions.
pub fn standalone_connection() -> DocRepoResult<DatabaseConnection> {
    DatabaseConnection::with_store(
        MemoryStore::new(MemoryStoreConfig::new()),
        TEST_DATABASE,
    )
}

pub async fn create_test_context() -> DocRepoResult<TestContext> {
    let ctx = TestContext::new(replica_connection()?);
    ctx.posts().create_collection().await?;
    Ok(ctx)
}

pub async fn create_standalone_context() -> DocRepoResult<TestContext> {
    let ctx = TestContext::new(standalone_connection()?);
    ctx.posts().create_collection().await?;
    Ok(ctx)
}

pub async fn cleanup(ctx: TestContext) -> DocRepoResult<()> {
    ctx.posts().drop_collection().await?;
    Ok(())
}

/// Runs `test` between `before` and `after`. `after` runs even when the test
/// fails or panics; the failure is re-raised once it is done.
pub async fn run_test<B, BF, T, TF, A, AF>(before: B, test: T, after: A)
where
    B: FnOnce() -> BF,
    BF: Future<Output = DocRepoResult<TestContext>>,
    T: FnOnce(TestContext) -> TF,
    TF: Future<Output = DocRepoResult<()>>,
    A: FnOnce(TestContext) -> AF,
    AF: Future<Output = DocRepoResult<()>>,
{
    let ctx = match before().await {
        Ok(ctx) => ctx,
        Err(e) => panic!("Before run failed: {:?}", e),
    };

    let start_time = Instant::now();
    let outcome = AssertUnwindSafe(test(ctx.clone())).catch_unwind().await;
    let elapsed = start_time.elapsed();
    let after_result = after(ctx).await;

    match outcome {
        Ok(Ok(())) => log::debug!("Test passed in {:?}", elapsed),
        Ok(Err(e)) => panic!(
            "Test failed after {:?}: {:?}\n{}",
            elapsed,
            e,
            Backtrace::capture()
        ),
        Err(panic) => std::panic::resume_unwind(panic),
    }

    if let Err(e) = after_result {
        panic!("After run failed: {:?}", e);
    }
}

/// Current time truncated to milliseconds.
pub fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(3)
}

pub fn generate_post() -> Post {
    let mut rng = rand::rng();
    let category = CATEGORIES[rng.random_range(0..CATEGORIES.len())];
    let tags: Vec<String> = (0..rng.random_range(1..4))
        .map(|_| Word().fake::<String>())
        .collect();

    Post {
        id: String::new(),
        post_date_time: now() - Duration::minutes(rng.random_range(0..10_000)),
        title: Sentence(3..6).fake(),
        content: Paragraph(2..4).fake(),
        category: category.to_string(),
        tags,
        likes: rng.random_range(0..500),
    }
}

pub fn generate_posts(count: usize) -> Vec<Post> {
    (0..count).map(|_| generate_post()).collect()
}

pub fn is_sorted<T: Ord>(iterable: impl IntoIterator<Item = T>, ascending: bool) -> bool {
    let items: Vec<T> = iterable.into_iter().collect();
    items.windows(2).all(|pair| {
        if ascending {
            pair[0] <= pair[1]
        } else {
            pair[0] >= pair[1]
        }
    })
}
