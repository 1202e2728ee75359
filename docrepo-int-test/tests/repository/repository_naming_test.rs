use docrepo::errors::ErrorKind;
use docrepo::repository::{Pluralizer, Repository};
use docrepo_derive::{Convertible, Entity};
use docrepo_int_test::test_util::{
    cleanup, create_test_context, generate_post, replica_connection, run_test, Counter, Post,
    TEST_DATABASE,
};

#[derive(Entity, Convertible, Debug, Clone, PartialEq, Default)]
#[entity(name = "Person", id(field = "id"))]
struct StaffMember {
    id: String,
    name: String,
}

#[derive(Entity, Convertible, Debug, Clone, PartialEq, Default)]
#[entity(id(field = "id"))]
struct BlogCategory {
    id: String,
    label: String,
}

struct PrefixPluralizer;

impl Pluralizer for PrefixPluralizer {
    fn pluralize(&self, word: &str) -> String {
        format!("All{}", word)
    }
}

#[tokio::test]
async fn test_default_collection_names() {
    let connection = replica_connection().unwrap();
    assert_eq!(Repository::<Post>::new(connection.clone()).collection_name(), "posts");
    assert_eq!(Repository::<Counter>::new(connection.clone()).collection_name(), "counters");
    assert_eq!(Repository::<StaffMember>::new(connection.clone()).collection_name(), "people");
    assert_eq!(
        Repository::<BlogCategory>::new(connection).collection_name(),
        "blogCategories"
    );
}

#[tokio::test]
async fn test_custom_collection_name_before_first_use() {
    let connection = replica_connection().unwrap();
    let posts: Repository<Post> = Repository::new(connection.clone());
    posts.set_collection_name("articles").unwrap();
    assert!(!posts.is_resolved());

    let mut post = generate_post();
    posts.add_one(&mut post, None).await.unwrap();
    assert!(posts.is_resolved());
    assert_eq!(posts.collection().unwrap().name(), "articles");

    let names = connection
        .store()
        .list_collection_names(TEST_DATABASE)
        .await
        .unwrap();
    assert_eq!(names, vec!["articles".to_string()]);
}

#[tokio::test]
async fn test_rename_after_resolution_fails() {
    run_test(
        create_test_context,
        |ctx| async move {
            let posts = ctx.posts();
            assert_eq!(posts.get_by_id(&posts.generate_string_id()).await?, None);

            let err = posts.set_collection_name("articles").unwrap_err();
            assert_eq!(err.kind(), &ErrorKind::CollectionAlreadyResolved);
            assert_eq!(posts.collection_name(), "posts");
            Ok(())
        },
        cleanup,
    )
    .await
}

#[tokio::test]
async fn test_empty_collection_name_is_rejected() {
    let posts: Repository<Post> = Repository::new(replica_connection().unwrap());
    let err = posts.set_collection_name("").unwrap_err();
    assert_eq!(err.kind(), &ErrorKind::InvalidOperation);
    assert_eq!(posts.collection_name(), "posts");
}

#[tokio::test]
async fn test_clones_share_binding() {
    let posts: Repository<Post> = Repository::new(replica_connection().unwrap());
    let copy = posts.clone();
    posts.set_collection_name("shared").unwrap();
    assert_eq!(copy.collection_name(), "shared");

    copy.collection().unwrap();
    assert!(posts.is_resolved());
    assert!(posts.set_collection_name("other").is_err());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_first_use_binds_once() {
    let posts: Repository<Post> = Repository::new(replica_connection().unwrap());
    assert!(!posts.is_resolved());

    let mut handles = Vec::new();
    for _ in 0..16 {
        let repo = posts.clone();
        handles.push(tokio::spawn(async move {
            let mut post = generate_post();
            repo.add_one(&mut post, None).await.map(|_| post.id)
        }));
    }

    let mut ids = Vec::new();
    for handle in handles {
        ids.push(handle.await.unwrap().unwrap());
    }
    ids.sort();
    ids.dedup();
    assert_eq!(ids.len(), 16);
    assert_eq!(posts.count().await.unwrap(), 16);
    assert_eq!(posts.collection_name(), "posts");
}

#[tokio::test]
async fn test_pluralizer_from_connection_and_repository() {
    let connection = docrepo::connection::DatabaseConnection::builder()
        .connection_string("memory://localhost/?replicaSet=rs0")
        .database(TEST_DATABASE)
        .pluralizer(PrefixPluralizer)
        .connect()
        .unwrap();
    assert_eq!(Repository::<Post>::new(connection.clone()).collection_name(), "allPost");

    let posts: Repository<Post> =
        Repository::with_pluralizer(replica_connection().unwrap(), PrefixPluralizer);
    assert_eq!(posts.collection_name(), "allPost");
}
