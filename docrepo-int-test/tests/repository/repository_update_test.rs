use docrepo::common::Value;
use docrepo::filter::field;
use docrepo::repository::Repository;
use docrepo::update::UpdateDefinition;
use docrepo_int_test::post_service::PostService;
use docrepo_int_test::test_util::{
    cleanup, create_test_context, generate_post, replica_connection, run_test, Counter, Post,
};

#[tokio::test]
async fn test_update_replaces_document() {
    run_test(
        create_test_context,
        |ctx| async move {
            let posts = ctx.posts();
            let mut post = generate_post();
            posts.add_one(&mut post, None).await?;

            post.title = "Rewritten".to_string();
            post.tags = vec!["edited".to_string()];
            posts.update(&post, None).await?;

            assert_eq!(posts.get_by_id(&post.id).await?, Some(post));
            assert_eq!(posts.count().await?, 1);
            Ok(())
        },
        cleanup,
    )
    .await
}

#[tokio::test]
async fn test_update_without_match_is_silent() {
    run_test(
        create_test_context,
        |ctx| async move {
            let posts = ctx.posts();
            let mut ghost = generate_post();
            ghost.id = posts.generate_string_id();

            posts.update(&ghost, None).await?;
            assert_eq!(posts.count().await?, 0);
            Ok(())
        },
        cleanup,
    )
    .await
}

#[tokio::test]
async fn test_upsert_inserts_then_replaces() {
    run_test(
        create_test_context,
        |ctx| async move {
            let posts = ctx.posts();
            let mut post = Post::new("Draft", "v1");

            posts.upsert(&mut post, None).await?;
            assert!(!post.id.is_empty());
            assert_eq!(posts.count().await?, 1);

            post.content = "v2".to_string();
            posts.upsert(&mut post, None).await?;
            assert_eq!(posts.count().await?, 1);
            assert_eq!(posts.get_by_id(&post.id).await?.map(|p| p.content), Some("v2".to_string()));
            Ok(())
        },
        cleanup,
    )
    .await
}

#[tokio::test]
async fn test_update_many_field() {
    run_test(
        create_test_context,
        |ctx| async move {
            let posts = ctx.posts();
            let mut batch = vec![
                Post::new("a", "x").with_category("travel"),
                Post::new("b", "x").with_category("travel"),
                Post::new("c", "x").with_category("rust"),
            ];
            posts.add_many(&mut batch, None).await?;

            let result = posts
                .update_many_field(field("category").eq("travel"), "category", "journeys", None)
                .await?;
            assert_eq!(result.matched_count, 2);
            assert_eq!(result.modified_count, 2);
            assert_eq!(result.upserted_id, None);

            assert_eq!(posts.find(field("category").eq("journeys")).await?.len(), 2);
            assert_eq!(posts.find(field("category").eq("travel")).await?.len(), 0);
            Ok(())
        },
        cleanup,
    )
    .await
}

#[tokio::test]
async fn test_update_many_with_mixed_value_types() {
    run_test(
        create_test_context,
        |ctx| async move {
            let posts = ctx.posts();
            let mut batch = vec![
                Post::new("a", "x").with_category("rust"),
                Post::new("b", "x").with_category("rust"),
            ];
            posts.add_many(&mut batch, None).await?;

            let updates = UpdateDefinition::from_pairs(vec![
                ("likes", Value::I64(10)),
                ("content", Value::from("reviewed")),
                ("tags", Value::from(vec!["checked"])),
            ]);
            let result = posts
                .update_many(field("category").eq("rust"), updates, None)
                .await?;
            assert_eq!(result.modified_count, 2);

            for post in posts.get_all().await? {
                assert_eq!(post.likes, 10);
                assert_eq!(post.content, "reviewed");
                assert_eq!(post.tags, vec!["checked".to_string()]);
            }

            // applying the same values again changes nothing
            let again = posts
                .update_many(
                    field("category").eq("rust"),
                    UpdateDefinition::new().set("likes", 10i64),
                    None,
                )
                .await?;
            assert_eq!(again.matched_count, 2);
            assert_eq!(again.modified_count, 0);
            Ok(())
        },
        cleanup,
    )
    .await
}

#[tokio::test]
async fn test_upsert_one_by_filter() {
    run_test(
        create_test_context,
        |ctx| async move {
            let counters: Repository<Counter> = Repository::new(ctx.connection());

            let inserted = counters
                .upsert_one_by_filter(
                    field("name").eq("visits"),
                    UpdateDefinition::new().set("hits", 5i64),
                    None,
                )
                .await?;
            assert_eq!(inserted.matched_count, 0);
            assert!(inserted.upserted_id.is_some());

            let updated = counters
                .upsert_one_by_filter(
                    field("name").eq("visits"),
                    UpdateDefinition::new().set("hits", 6i64),
                    None,
                )
                .await?;
            assert_eq!(updated.matched_count, 1);
            assert_eq!(updated.modified_count, 1);
            assert_eq!(updated.upserted_id, None);

            let all = counters.get_all().await?;
            assert_eq!(all.len(), 1);
            assert_eq!(all[0].name, "visits");
            assert_eq!(all[0].hits, 6);

            counters.drop_collection().await?;
            Ok(())
        },
        cleanup,
    )
    .await
}

#[tokio::test]
async fn test_find_one_and_update_increments_and_upserts() {
    run_test(
        create_test_context,
        |ctx| async move {
            let counters: Repository<Counter> = Repository::new(ctx.connection());

            let first = counters
                .find_one_and_update(field("name").eq("page"), UpdateDefinition::new(), "hits", None)
                .await?;
            assert_eq!(first.hits, 1);
            assert_eq!(first.name, "page");
            assert!(!first.id.is_empty());

            let second = counters
                .find_one_and_update(field("name").eq("page"), UpdateDefinition::new(), "hits", None)
                .await?;
            assert_eq!(second.hits, 2);
            assert_eq!(second.id, first.id);
            assert_eq!(counters.count().await?, 1);

            counters.drop_collection().await?;
            Ok(())
        },
        cleanup,
    )
    .await
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn test_concurrent_find_one_and_update_is_atomic() {
    let counters: Repository<Counter> = Repository::new(replica_connection().unwrap());
    let n = 200;

    let mut handles = Vec::with_capacity(n);
    for _ in 0..n {
        let repo = counters.clone();
        handles.push(tokio::spawn(async move {
            repo.find_one_and_update(
                field("name").eq("shared"),
                UpdateDefinition::new(),
                "hits",
                None,
            )
            .await
        }));
    }

    let mut observed = Vec::with_capacity(n);
    for handle in handles {
        observed.push(handle.await.unwrap().unwrap().hits);
    }
    observed.sort();
    assert_eq!(observed, (1..=n as i64).collect::<Vec<_>>());

    let all = counters.get_all().await.unwrap();
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].hits, n as i64);
}

#[tokio::test]
async fn test_post_service_likes() {
    run_test(
        create_test_context,
        |ctx| async move {
            let service = PostService::new(ctx.connection());
            let mut post = generate_post().with_likes(0);
            service.publish(&mut post).await?;

            assert_eq!(service.like(&post.id).await?, Some(1));
            assert_eq!(service.like(&post.id).await?, Some(2));
            assert_eq!(service.like(&ctx.posts().generate_string_id()).await?, None);
            assert_eq!(service.published_count().await?, 1);
            Ok(())
        },
        cleanup,
    )
    .await
}
