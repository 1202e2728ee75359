use docrepo::errors::ErrorKind;
use docrepo::filter::{and, field};
use docrepo::query::Grouping;
use docrepo_int_test::post_service::PostService;
use docrepo_int_test::test_util::{
    cleanup, create_test_context, generate_posts, is_sorted, run_test, Post, PostSummary,
    TestContext,
};
use docrepo::errors::DocRepoResult;

async fn seed(ctx: &TestContext) -> DocRepoResult<Vec<Post>> {
    let mut batch = vec![
        Post::new("Borrowing", "a").with_category("rust").with_likes(40).with_tags(&["ownership", "lifetimes"]),
        Post::new("Traits", "b").with_category("rust").with_likes(25).with_tags(&["generics"]),
        Post::new("Indexes", "c").with_category("databases").with_likes(40).with_tags(&["btree"]),
        Post::new("Lisbon", "d").with_category("travel").with_likes(5),
        Post::new("Async", "e").with_category("rust").with_likes(60).with_tags(&["futures", "tokio"]),
    ];
    ctx.posts().add_many(&mut batch, None).await?;
    Ok(batch)
}

#[tokio::test]
async fn test_consecutive_where_equals_combined_filter() {
    run_test(
        create_test_context,
        |ctx| async move {
            let mut batch = generate_posts(40);
            ctx.posts().add_many(&mut batch, None).await?;

            let chained = ctx
                .posts()
                .query()?
                .where_(field("category").eq("rust"))
                .where_(field("likes").gt(100i64))
                .to_list()
                .await?;
            let combined = ctx
                .posts()
                .query()?
                .where_(and(vec![field("category").eq("rust"), field("likes").gt(100i64)]))
                .to_list()
                .await?;
            assert_eq!(chained, combined);

            let expected = batch
                .iter()
                .filter(|p| p.category == "rust" && p.likes > 100)
                .count();
            assert_eq!(chained.len(), expected);
            Ok(())
        },
        cleanup,
    )
    .await
}

#[tokio::test]
async fn test_builders_are_reusable() {
    run_test(
        create_test_context,
        |ctx| async move {
            seed(&ctx).await?;
            let rust = ctx.posts().query()?.where_(field("category").eq("rust"));
            let popular = rust.clone().where_(field("likes").gte(40i64));

            assert_eq!(rust.long_count().await?, 3);
            assert_eq!(popular.long_count().await?, 2);
            // running the narrower query left the base untouched
            assert_eq!(rust.to_list().await?.len(), 3);
            Ok(())
        },
        cleanup,
    )
    .await
}

#[tokio::test]
async fn test_order_by_descending_then_by() {
    run_test(
        create_test_context,
        |ctx| async move {
            seed(&ctx).await?;
            let titles: Vec<String> = ctx
                .posts()
                .query()?
                .order_by_descending("likes")
                .then_by("title")?
                .select(|p: Post| p.title)
                .to_list()
                .await?;
            assert_eq!(titles, vec!["Async", "Borrowing", "Indexes", "Traits", "Lisbon"]);

            let dates: Vec<_> = ctx
                .posts()
                .query()?
                .order_by("post_date_time")
                .to_list()
                .await?
                .into_iter()
                .map(|p| p.post_date_time)
                .collect();
            assert!(is_sorted(dates, true));
            Ok(())
        },
        cleanup,
    )
    .await
}

#[tokio::test]
async fn test_then_by_without_ordering_fails() {
    run_test(
        create_test_context,
        |ctx| async move {
            let err = ctx.posts().query()?.then_by("title").err().unwrap();
            assert_eq!(err.kind(), &ErrorKind::OrderingRequired);

            let err = ctx
                .posts()
                .query()?
                .order_by("likes")
                .take(2)
                .then_by_descending("title")
                .err().unwrap();
            assert_eq!(err.kind(), &ErrorKind::OrderingRequired);
            Ok(())
        },
        cleanup,
    )
    .await
}

#[tokio::test]
async fn test_skip_take_and_distinct() {
    run_test(
        create_test_context,
        |ctx| async move {
            seed(&ctx).await?;
            let page: Vec<String> = ctx
                .posts()
                .query()?
                .order_by("title")
                .skip(1)
                .take(2)
                .select(|p: Post| p.title)
                .to_list()
                .await?;
            assert_eq!(page, vec!["Borrowing", "Indexes"]);

            let categories: Vec<String> = ctx
                .posts()
                .query()?
                .order_by("category")
                .select(|p: Post| p.category)
                .distinct()
                .to_list()
                .await?;
            assert_eq!(categories, vec!["databases", "rust", "travel"]);
            Ok(())
        },
        cleanup,
    )
    .await
}

#[tokio::test]
async fn test_select_into_struct_and_of_type() {
    run_test(
        create_test_context,
        |ctx| async move {
            seed(&ctx).await?;
            let summaries = ctx
                .posts()
                .query()?
                .where_(field("category").eq("rust"))
                .order_by("likes")
                .select(|p: Post| PostSummary {
                    title: p.title,
                    likes: p.likes,
                })
                .to_list()
                .await?;
            assert_eq!(
                summaries.iter().map(|s| s.likes).collect::<Vec<_>>(),
                vec![25, 40, 60]
            );

            // a full post also decodes as a summary, extra fields are ignored
            let as_summaries = ctx.posts().query()?.of_type::<PostSummary>().long_count().await?;
            assert_eq!(as_summaries, 5);
            Ok(())
        },
        cleanup,
    )
    .await
}

#[tokio::test]
async fn test_select_many() {
    run_test(
        create_test_context,
        |ctx| async move {
            seed(&ctx).await?;
            let mut tags: Vec<String> = ctx
                .posts()
                .query()?
                .where_(field("category").eq("rust"))
                .select_many(|p: Post| p.tags)
                .to_list()
                .await?;
            tags.sort();
            assert_eq!(tags, vec!["futures", "generics", "lifetimes", "ownership", "tokio"]);

            let pairs: Vec<String> = ctx
                .posts()
                .query()?
                .where_(field("title").eq("Async"))
                .select_many_with(|p: &Post| p.tags.clone(), |p: &Post, tag: String| {
                    format!("{}#{}", p.title, tag)
                })
                .to_list()
                .await?;
            assert_eq!(pairs, vec!["Async#futures", "Async#tokio"]);
            Ok(())
        },
        cleanup,
    )
    .await
}

#[tokio::test]
async fn test_group_by() {
    run_test(
        create_test_context,
        |ctx| async move {
            seed(&ctx).await?;
            let groups: Vec<Grouping<String, Post>> = ctx
                .posts()
                .query()?
                .order_by("category")
                .group_by::<String>("category")
                .to_list()
                .await?;

            let summary: Vec<(String, usize)> =
                groups.iter().map(|g| (g.key.clone(), g.len())).collect();
            assert_eq!(
                summary,
                vec![
                    ("databases".to_string(), 1),
                    ("rust".to_string(), 3),
                    ("travel".to_string(), 1)
                ]
            );

            let service = PostService::new(ctx.connection());
            assert_eq!(service.by_category().await?.len(), 3);
            Ok(())
        },
        cleanup,
    )
    .await
}

#[tokio::test]
async fn test_composition_does_not_touch_the_store() {
    run_test(
        create_test_context,
        |ctx| async move {
            let query = ctx
                .posts()
                .query()?
                .where_(field("likes").gt(10i64))
                .order_by("title")
                .skip(1);
            assert_eq!(query.pipeline().len(), 3);

            // rows added after composition are seen at execution
            seed(&ctx).await?;
            assert_eq!(query.long_count().await?, 3);
            Ok(())
        },
        cleanup,
    )
    .await
}
