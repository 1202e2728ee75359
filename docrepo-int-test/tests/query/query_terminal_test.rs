use docrepo::errors::ErrorKind;
use docrepo::filter::{all, field};
use docrepo::repository::Repository;
use docrepo_int_test::post_service::PostService;
use docrepo_int_test::test_util::{
    cleanup, create_test_context, generate_posts, replica_connection, run_test, Post,
};

#[tokio::test]
async fn test_first_or_default() {
    run_test(
        create_test_context,
        |ctx| async move {
            let query = ctx.posts().query()?.order_by_descending("likes");
            assert_eq!(query.first_or_default().await?, None);

            let mut batch = vec![
                Post::new("quiet", "x").with_likes(1),
                Post::new("loud", "x").with_likes(99),
            ];
            ctx.posts().add_many(&mut batch, None).await?;

            let top = query.first_or_default().await?;
            assert_eq!(top.map(|p| p.title), Some("loud".to_string()));
            Ok(())
        },
        cleanup,
    )
    .await
}

#[tokio::test]
async fn test_any_and_long_count() {
    run_test(
        create_test_context,
        |ctx| async move {
            let query = ctx.posts().query()?.where_(field("category").eq("travel"));
            assert!(!query.any(all()).await?);
            assert_eq!(query.long_count().await?, 0);

            let mut batch = vec![
                Post::new("Porto", "x").with_category("travel").with_likes(12),
                Post::new("Kyoto", "x").with_category("travel").with_likes(3),
                Post::new("Macros", "x").with_category("rust"),
            ];
            ctx.posts().add_many(&mut batch, None).await?;

            assert!(query.any(all()).await?);
            assert!(query.any(field("likes").gt(10i64)).await?);
            assert!(!query.any(field("likes").gt(100i64)).await?);
            assert_eq!(query.long_count().await?, 2);
            assert_eq!(ctx.posts().query()?.long_count().await?, 3);
            Ok(())
        },
        cleanup,
    )
    .await
}

#[tokio::test]
async fn test_sums() {
    run_test(
        create_test_context,
        |ctx| async move {
            let mut batch = generate_posts(25);
            ctx.posts().add_many(&mut batch, None).await?;

            let expected: i64 = batch.iter().map(|p| p.likes).sum();
            assert_eq!(ctx.posts().query()?.sum_i64("likes").await?, expected);
            assert_eq!(ctx.posts().query()?.sum_f64("likes").await?, expected as f64);

            let projected = ctx
                .posts()
                .query()?
                .select(|p: Post| p.likes)
                .sum_i64("")
                .await?;
            assert_eq!(projected, expected);

            let empty = ctx
                .posts()
                .query()?
                .where_(field("category").eq("none"))
                .sum_i64("likes")
                .await?;
            assert_eq!(empty, 0);
            Ok(())
        },
        cleanup,
    )
    .await
}

#[tokio::test]
async fn test_sum_rejects_text_and_overflow() {
    run_test(
        create_test_context,
        |ctx| async move {
            let mut batch = vec![
                Post::new("big", "x").with_likes(i64::MAX),
                Post::new("one more", "x").with_likes(1),
            ];
            ctx.posts().add_many(&mut batch, None).await?;

            let err = ctx.posts().query()?.sum_i64("likes").await.unwrap_err();
            assert_eq!(err.kind(), &ErrorKind::InvalidOperation);

            let err = ctx.posts().query()?.sum_i64("title").await.unwrap_err();
            assert_eq!(err.kind(), &ErrorKind::InvalidOperation);

            // the float sum does not overflow
            let total = ctx.posts().query()?.sum_f64("likes").await?;
            assert!(total > 9.0e18);
            Ok(())
        },
        cleanup,
    )
    .await
}

#[tokio::test]
async fn test_post_service_queries() {
    run_test(
        create_test_context,
        |ctx| async move {
            let service = PostService::new(ctx.connection());
            let mut posts = vec![
                Post::new("B", "x").with_category("rust").with_likes(50),
                Post::new("A", "x").with_category("rust").with_likes(50),
                Post::new("C", "x").with_category("travel").with_likes(80),
                Post::new("D", "x").with_category("travel").with_likes(2),
            ];
            for post in posts.iter_mut() {
                service.publish(post).await?;
            }

            assert_eq!(service.popular_titles(10, 2).await?, vec!["C", "A"]);
            assert_eq!(service.likes_in("rust").await?, 100);
            assert_eq!(service.likes_in("travel").await?, 82);
            assert_eq!(service.published_count().await?, 4);
            Ok(())
        },
        cleanup,
    )
    .await
}

#[test]
fn test_blocking_terminals() {
    let posts: Repository<Post> = Repository::new(replica_connection().unwrap());
    let mut batch = vec![
        Post::new("x", "x").with_likes(2),
        Post::new("y", "x").with_likes(3),
    ];
    posts.add_many_blocking(&mut batch, None).unwrap();

    let query = posts.query().unwrap().order_by("likes");
    assert_eq!(query.to_list_blocking().unwrap().len(), 2);
    assert_eq!(
        query.first_or_default_blocking().unwrap().map(|p| p.title),
        Some("x".to_string())
    );
    assert!(query.any_blocking(field("likes").eq(3i64)).unwrap());
    assert_eq!(query.long_count_blocking().unwrap(), 2);
    assert_eq!(query.sum_i64_blocking("likes").unwrap(), 5);
    assert_eq!(query.sum_f64_blocking("likes").unwrap(), 5.0);
}
