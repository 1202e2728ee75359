use docrepo::errors::DocRepoResult;
use docrepo_int_test::post_service::PostService;
use docrepo_int_test::test_util::{generate_posts, replica_connection};

#[tokio::main]
async fn main() -> DocRepoResult<()> {
    colog::init();
    println!("Starting post service demo...");

    let service = PostService::new(replica_connection()?);
    service.posts().create_collection().await?;

    let count = 1000;
    let start = std::time::Instant::now();
    for mut post in generate_posts(count) {
        service.publish(&mut post).await?;
    }
    println!("Published {} posts in {:?}", service.published_count().await?, start.elapsed());

    let start = std::time::Instant::now();
    let popular = service.popular_titles(400, 5).await?;
    println!("Top {} popular posts in {:?}", popular.len(), start.elapsed());
    for title in popular {
        println!("  {}", title);
    }

    for group in service.by_category().await? {
        let likes: i64 = group.items.iter().map(|p| p.likes).sum();
        println!("{}: {} posts, {} likes", group.key, group.len(), likes);
    }

    let start = std::time::Instant::now();
    let merged = service.merge_categories("travel", "rust").await?;
    println!("Merged {} posts in {:?}", merged, start.elapsed());
    println!("Likes in rust: {}", service.likes_in("rust").await?);

    service.posts().drop_collection().await?;
    Ok(())
}
