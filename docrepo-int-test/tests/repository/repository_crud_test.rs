use docrepo::common::Value;
use docrepo::doc;
use docrepo::errors::ErrorKind;
use docrepo::filter::{all, field};
use docrepo::repository::Repository;
use docrepo_int_test::test_util::{
    cleanup, create_test_context, generate_post, generate_posts, now, replica_connection,
    run_test, Post,
};

#[tokio::test]
async fn test_add_one_assigns_generated_id() {
    run_test(
        create_test_context,
        |ctx| async move {
            let posts = ctx.posts();
            let mut post = Post::new("A", "x");
            assert!(post.id.is_empty());

            posts.add_one(&mut post, None).await?;
            assert!(!post.id.is_empty());

            let all_posts = posts.get_all().await?;
            assert_eq!(all_posts.len(), 1);
            assert_eq!(all_posts[0].id, post.id);
            assert_eq!(all_posts[0].title, "A");

            let listed = posts.query()?.to_list().await?;
            assert_eq!(listed, all_posts);
            Ok(())
        },
        cleanup,
    )
    .await
}

#[tokio::test]
async fn test_get_by_id_returns_equal_entity() {
    run_test(
        create_test_context,
        |ctx| async move {
            let posts = ctx.posts();
            let mut inserted = generate_posts(10);
            posts.add_many(&mut inserted, None).await?;

            for post in &inserted {
                let found = posts.get_by_id(&post.id).await?;
                assert_eq!(found.as_ref(), Some(post));
            }
            Ok(())
        },
        cleanup,
    )
    .await
}

#[tokio::test]
async fn test_add_one_keeps_caller_id() {
    run_test(
        create_test_context,
        |ctx| async move {
            let posts = ctx.posts();
            let id = posts.generate_string_id();
            let mut post = Post::new("Preset", "id given by the caller");
            post.id = id.clone();

            posts.add_one(&mut post, None).await?;
            assert_eq!(post.id, id);
            assert!(posts.exists_by_id(&id).await?);
            Ok(())
        },
        cleanup,
    )
    .await
}

#[tokio::test]
async fn test_add_one_with_duplicate_id_fails() {
    run_test(
        create_test_context,
        |ctx| async move {
            let posts = ctx.posts();
            let mut first = generate_post();
            posts.add_one(&mut first, None).await?;

            let mut second = generate_post();
            second.id = first.id.clone();
            let err = posts.add_one(&mut second, None).await.unwrap_err();
            assert_eq!(err.kind(), &ErrorKind::WriteFailed);
            assert_eq!(posts.count().await?, 1);
            Ok(())
        },
        cleanup,
    )
    .await
}

#[tokio::test]
async fn test_create_collection_is_idempotent() {
    run_test(
        create_test_context,
        |ctx| async move {
            let posts = ctx.posts();
            assert!(posts.collection_exists().await?);

            let mut post = generate_post();
            posts.add_one(&mut post, None).await?;

            assert!(!posts.create_collection().await?);
            assert_eq!(posts.get_all().await?, vec![post]);
            Ok(())
        },
        cleanup,
    )
    .await
}

#[tokio::test]
async fn test_drop_collection() {
    run_test(
        create_test_context,
        |ctx| async move {
            let posts = ctx.posts();
            let mut batch = generate_posts(3);
            posts.add_many(&mut batch, None).await?;

            assert!(posts.drop_collection().await?);
            assert!(!posts.collection_exists().await?);
            assert!(!posts.drop_collection().await?);
            assert_eq!(posts.count().await?, 0);

            posts.create_collection().await?;
            Ok(())
        },
        cleanup,
    )
    .await
}

#[tokio::test]
async fn test_delete_then_get_by_id_is_none() {
    run_test(
        create_test_context,
        |ctx| async move {
            let posts = ctx.posts();
            let mut post = generate_post();
            posts.add_one(&mut post, None).await?;

            posts.delete(&post.id, None).await?;
            assert_eq!(posts.get_by_id(&post.id).await?, None);
            assert!(!posts.exists_by_id(&post.id).await?);

            // deleting again matches nothing and is still fine
            posts.delete(&post.id, None).await?;
            Ok(())
        },
        cleanup,
    )
    .await
}

#[tokio::test]
async fn test_delete_many() {
    run_test(
        create_test_context,
        |ctx| async move {
            let posts = ctx.posts();
            let mut batch = vec![
                Post::new("one", "1").with_category("rust"),
                Post::new("two", "2").with_category("travel"),
                Post::new("three", "3").with_category("travel"),
                Post::new("four", "4").with_category("databases"),
            ];
            posts.add_many(&mut batch, None).await?;

            let ids = vec![batch[0].id.clone(), batch[3].id.clone()];
            assert_eq!(posts.delete_many_by_ids(&ids, None).await?, 2);
            assert_eq!(posts.count().await?, 2);

            assert_eq!(
                posts.delete_many(field("category").eq("travel"), None).await?,
                2
            );
            assert_eq!(posts.count().await?, 0);
            assert_eq!(posts.delete_many(all(), None).await?, 0);
            Ok(())
        },
        cleanup,
    )
    .await
}

#[tokio::test]
async fn test_find_by_filter() {
    run_test(
        create_test_context,
        |ctx| async move {
            let posts = ctx.posts();
            let mut batch = vec![
                Post::new("low", "x").with_likes(3),
                Post::new("mid", "x").with_likes(30),
                Post::new("high", "x").with_likes(300),
            ];
            posts.add_many(&mut batch, None).await?;

            let mut found: Vec<String> = posts
                .find(field("likes").gte(30i64))
                .await?
                .into_iter()
                .map(|p| p.title)
                .collect();
            found.sort();
            assert_eq!(found, vec!["high".to_string(), "mid".to_string()]);

            let none = posts.find(field("title").eq("absent")).await?;
            assert!(none.is_empty());
            Ok(())
        },
        cleanup,
    )
    .await
}

#[tokio::test]
async fn test_unique_index_rejects_duplicates() {
    run_test(
        create_test_context,
        |ctx| async move {
            let posts = ctx.posts();
            let name = posts.create_index("title", true).await?;
            assert_eq!(name, "title_1");

            let mut first = Post::new("same", "a");
            posts.add_one(&mut first, None).await?;

            let mut second = Post::new("same", "b");
            let err = posts.add_one(&mut second, None).await.unwrap_err();
            assert_eq!(err.kind(), &ErrorKind::WriteFailed);
            Ok(())
        },
        cleanup,
    )
    .await
}

#[tokio::test]
async fn test_unknown_stored_fields_are_ignored() {
    run_test(
        create_test_context,
        |ctx| async move {
            let posts = ctx.posts();
            let collection = posts.collection()?;
            let stored = doc! {
                "title": "legacy",
                "content": "imported",
                "category": "rust",
                "tags": ["old"],
                "likes": 7i64,
                "post_date_time": (now()),
                "legacy_author": { "name": "Ann" },
            };
            collection
                .store()
                .insert_many(collection.namespace(), vec![stored], None)
                .await?;

            let found = posts.get_all().await?;
            assert_eq!(found.len(), 1);
            assert_eq!(found[0].title, "legacy");
            assert_eq!(found[0].tags, vec!["old".to_string()]);
            assert!(!found[0].id.is_empty());
            Ok(())
        },
        cleanup,
    )
    .await
}

#[tokio::test]
async fn test_id_is_stored_as_object_id() {
    run_test(
        create_test_context,
        |ctx| async move {
            let posts = ctx.posts();
            let mut post = generate_post();
            posts.add_one(&mut post, None).await?;

            let raw = posts.query()?.of_type::<Value>().to_list().await?;
            let stored_id = raw[0].as_document().map(|d| d.get("_id"));
            match stored_id {
                Some(Value::ObjectId(id)) => assert_eq!(id.to_hex(), post.id),
                other => panic!("unexpected stored id {:?}", other),
            }
            Ok(())
        },
        cleanup,
    )
    .await
}

#[test]
fn test_blocking_surface() {
    let posts: Repository<Post> = Repository::new(replica_connection().unwrap());
    assert!(posts.create_collection_blocking().unwrap());

    let mut post = generate_post();
    posts.add_one_blocking(&mut post, None).unwrap();
    assert_eq!(posts.count_blocking().unwrap(), 1);
    assert_eq!(posts.get_by_id_blocking(&post.id).unwrap(), Some(post.clone()));

    post.title = "edited".to_string();
    posts.update_blocking(&post, None).unwrap();
    assert_eq!(posts.get_all_blocking().unwrap()[0].title, "edited");

    posts.delete_blocking(&post.id, None).unwrap();
    assert!(!posts.exists_by_id_blocking(&post.id).unwrap());
    assert!(posts.drop_collection_blocking().unwrap());
}
