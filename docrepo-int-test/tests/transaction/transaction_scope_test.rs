use docrepo::errors::ErrorKind;
use docrepo::filter::field;
use docrepo::repository::Repository;
use docrepo::transaction::ScopeState;
use docrepo_int_test::post_service::PostService;
use docrepo_int_test::test_util::{
    cleanup, create_standalone_context, create_test_context, generate_post, replica_connection,
    run_test, Post,
};

#[tokio::test]
async fn test_dispose_without_commit_discards_insert() {
    run_test(
        create_test_context,
        |ctx| async move {
            let posts = ctx.posts();
            let mut scope = ctx.connection().begin_transaction_scope_async().await?;
            scope.begin_transaction()?;
            assert!(scope.is_in_transaction());

            let mut post = generate_post();
            posts.add_one(&mut post, Some(&scope)).await?;
            assert!(!post.id.is_empty());

            scope.dispose().await?;
            assert_eq!(scope.state(), ScopeState::Disposed);
            assert_eq!(posts.get_by_id(&post.id).await?, None);
            assert_eq!(posts.count().await?, 0);
            Ok(())
        },
        cleanup,
    )
    .await
}

#[tokio::test]
async fn test_dropping_scope_aborts() {
    run_test(
        create_test_context,
        |ctx| async move {
            let posts = ctx.posts();
            let mut post = generate_post();
            {
                let mut scope = ctx.connection().begin_transaction_scope_async().await?;
                scope.begin_transaction()?;
                posts.add_one(&mut post, Some(&scope)).await?;
            }
            assert!(!posts.exists_by_id(&post.id).await?);
            Ok(())
        },
        cleanup,
    )
    .await
}

#[tokio::test]
async fn test_commit_publishes_all_writes() {
    run_test(
        create_test_context,
        |ctx| async move {
            let posts = ctx.posts();
            let mut existing = generate_post();
            posts.add_one(&mut existing, None).await?;

            let mut scope = ctx.connection().begin_transaction_scope_async().await?;
            scope.begin_transaction()?;

            let mut fresh = generate_post();
            posts.add_one(&mut fresh, Some(&scope)).await?;
            existing.title = "changed in transaction".to_string();
            posts.update(&existing, Some(&scope)).await?;

            // nothing is visible outside the transaction yet
            assert_eq!(posts.count().await?, 1);
            assert_ne!(
                posts.get_by_id(&existing.id).await?.map(|p| p.title),
                Some("changed in transaction".to_string())
            );

            scope.commit_transaction().await?;
            assert_eq!(scope.state(), ScopeState::Committed);
            assert!(!scope.is_in_transaction());

            assert_eq!(posts.count().await?, 2);
            assert_eq!(posts.get_by_id(&existing.id).await?, Some(existing));
            assert_eq!(posts.get_by_id(&fresh.id).await?, Some(fresh));
            scope.dispose().await?;
            Ok(())
        },
        cleanup,
    )
    .await
}

#[tokio::test]
async fn test_abort_discards_delete() {
    run_test(
        create_test_context,
        |ctx| async move {
            let posts = ctx.posts();
            let mut post = generate_post();
            posts.add_one(&mut post, None).await?;

            let mut scope = ctx.connection().begin_transaction_scope_async().await?;
            scope.begin_transaction()?;
            posts.delete(&post.id, Some(&scope)).await?;
            scope.abort_transaction().await?;
            assert_eq!(scope.state(), ScopeState::Aborted);

            assert!(posts.exists_by_id(&post.id).await?);

            let err = posts.delete(&post.id, Some(&scope)).await.unwrap_err();
            assert_eq!(err.kind(), &ErrorKind::InvalidOperation);
            Ok(())
        },
        cleanup,
    )
    .await
}

#[tokio::test]
async fn test_scope_without_transaction_writes_directly() {
    run_test(
        create_test_context,
        |ctx| async move {
            let posts = ctx.posts();
            let scope = ctx.connection().begin_transaction_scope_async().await?;
            assert_eq!(scope.state(), ScopeState::Created);

            let mut post = generate_post();
            posts.add_one(&mut post, Some(&scope)).await?;
            assert!(posts.exists_by_id(&post.id).await?);
            Ok(())
        },
        cleanup,
    )
    .await
}

#[tokio::test]
async fn test_state_machine_misuse() {
    run_test(
        create_test_context,
        |ctx| async move {
            let mut scope = ctx.connection().begin_transaction_scope_async().await?;

            let err = scope.commit_transaction().await.unwrap_err();
            assert_eq!(err.kind(), &ErrorKind::InvalidOperation);
            let err = scope.abort_transaction().await.unwrap_err();
            assert_eq!(err.kind(), &ErrorKind::InvalidOperation);

            scope.begin_transaction()?;
            let err = scope.begin_transaction().unwrap_err();
            assert_eq!(err.kind(), &ErrorKind::InvalidOperation);

            scope.commit_transaction().await?;
            let err = scope.commit_transaction().await.unwrap_err();
            assert_eq!(err.kind(), &ErrorKind::InvalidOperation);

            scope.dispose().await?;
            scope.dispose().await?;
            let err = scope.begin_transaction().unwrap_err();
            assert_eq!(err.kind(), &ErrorKind::InvalidOperation);
            Ok(())
        },
        cleanup,
    )
    .await
}

#[tokio::test]
async fn test_concurrent_commit_conflict() {
    run_test(
        create_test_context,
        |ctx| async move {
            let posts = ctx.posts();
            let mut post = generate_post();
            posts.add_one(&mut post, None).await?;

            let mut first = ctx.connection().begin_transaction_scope_async().await?;
            let mut second = ctx.connection().begin_transaction_scope_async().await?;
            first.begin_transaction()?;
            second.begin_transaction()?;

            let mut from_first = post.clone();
            from_first.title = "first".to_string();
            posts.update(&from_first, Some(&first)).await?;

            let mut from_second = post.clone();
            from_second.title = "second".to_string();
            posts.update(&from_second, Some(&second)).await?;

            first.commit_transaction().await?;
            let err = second.commit_transaction().await.unwrap_err();
            assert_eq!(err.kind(), &ErrorKind::TransactionFailed);
            assert_eq!(second.state(), ScopeState::Aborted);

            assert_eq!(posts.get_by_id(&post.id).await?.map(|p| p.title), Some("first".to_string()));
            Ok(())
        },
        cleanup,
    )
    .await
}

#[tokio::test]
async fn test_rewriting_a_concurrently_changed_post_fails() {
    run_test(
        create_test_context,
        |ctx| async move {
            let posts = ctx.posts();
            let mut post = generate_post();
            posts.add_one(&mut post, None).await?;

            let mut scope = ctx.connection().begin_transaction_scope_async().await?;
            scope.begin_transaction()?;

            let mut changed = post.clone();
            changed.title = "changed outside".to_string();
            posts.update(&changed, None).await?;

            // same content as the committed post, still a conflict
            let err = posts.update(&changed, Some(&scope)).await.unwrap_err();
            assert_eq!(err.kind(), &ErrorKind::TransactionFailed);

            let err = scope.commit_transaction().await.unwrap_err();
            assert_eq!(err.kind(), &ErrorKind::TransactionFailed);
            assert_eq!(scope.state(), ScopeState::Aborted);
            Ok(())
        },
        cleanup,
    )
    .await
}

#[tokio::test]
async fn test_standalone_store_has_no_transactions() {
    run_test(
        create_standalone_context,
        |ctx| async move {
            let err = ctx
                .connection()
                .begin_transaction_scope_async()
                .await
                .err().unwrap();
            assert_eq!(err.kind(), &ErrorKind::NotSupportedByBackend);

            // plain writes still work
            let mut post = generate_post();
            ctx.posts().add_one(&mut post, None).await?;
            assert_eq!(ctx.posts().count().await?, 1);
            Ok(())
        },
        cleanup,
    )
    .await
}

#[tokio::test]
async fn test_scope_from_another_store_is_rejected() {
    run_test(
        create_test_context,
        |ctx| async move {
            let other = replica_connection()?;
            let mut foreign = other.begin_transaction_scope_async().await?;
            foreign.begin_transaction()?;

            let mut post = generate_post();
            let err = ctx.posts().add_one(&mut post, Some(&foreign)).await.unwrap_err();
            assert_eq!(err.kind(), &ErrorKind::IncompatibleTransactionScope);

            let err = ctx
                .posts()
                .delete_many(field("title").eq("x"), Some(&foreign))
                .await
                .unwrap_err();
            assert_eq!(err.kind(), &ErrorKind::IncompatibleTransactionScope);
            foreign.dispose().await?;
            Ok(())
        },
        cleanup,
    )
    .await
}

#[tokio::test]
async fn test_merge_categories_in_transaction() {
    run_test(
        create_test_context,
        |ctx| async move {
            let service = PostService::new(ctx.connection());
            let mut batch = vec![
                Post::new("a", "x").with_category("travel"),
                Post::new("b", "x").with_category("travel"),
                Post::new("c", "x").with_category("rust"),
            ];
            ctx.posts().add_many(&mut batch, None).await?;

            assert_eq!(service.merge_categories("travel", "rust").await?, 2);
            assert_eq!(ctx.posts().find(field("category").eq("rust")).await?.len(), 3);
            Ok(())
        },
        cleanup,
    )
    .await
}

#[test]
fn test_blocking_transaction_surface() {
    let connection = replica_connection().unwrap();
    let posts: Repository<Post> = Repository::new(connection.clone());

    let mut scope = connection.begin_transaction_scope().unwrap();
    scope.begin_transaction().unwrap();
    let mut kept = generate_post();
    posts.add_one_blocking(&mut kept, Some(&scope)).unwrap();
    scope.commit_transaction_blocking().unwrap();
    scope.dispose_blocking().unwrap();

    let mut scope = connection.begin_transaction_scope().unwrap();
    scope.begin_transaction().unwrap();
    let mut dropped = generate_post();
    posts.add_one_blocking(&mut dropped, Some(&scope)).unwrap();
    scope.abort_transaction_blocking().unwrap();
    scope.dispose_blocking().unwrap();

    assert_eq!(posts.get_all_blocking().unwrap(), vec![kept]);
}
