use anyhow::Result;
use feedbot::config::DEFAULT_RSS_INTERVAL;
use feedbot::database::{connection::DatabaseManager, models::*};
use tempfile::{tempdir, TempDir};

async fn setup_test_db() -> Result<(DatabaseManager, TempDir)> {
    let temp_dir = tempdir()?;
    let db_path = temp_dir.path().join("test.db");
    let database_url = format!("sqlite:{}", db_path.display());

    let db_manager = DatabaseManager::new(&database_url).await?;
    db_manager.run_migrations().await?;

    Ok((db_manager, temp_dir))
}

#[tokio::test]
async fn test_feed_creation_and_retrieval() -> Result<()> {
    let (db, _temp_dir) = setup_test_db().await?;

    let feed = RssFeed::create(&db.pool, 1, 100, "https://example.com/feed.xml", Some("Example")).await?;
    assert_eq!(feed.user_id, 1);
    assert_eq!(feed.chat_id, 100);
    assert_eq!(feed.title.as_deref(), Some("Example"));
    assert_eq!(feed.last_item_id, None);
    assert!(feed.created_at > 0);

    let found = RssFeed::find_by_url(&db.pool, "https://example.com/feed.xml").await?;
    assert_eq!(found, Some(feed.clone()));

    let by_id = RssFeed::find_by_id(&db.pool, feed.id).await?;
    assert_eq!(by_id, Some(feed));

    Ok(())
}

#[tokio::test]
async fn test_feed_url_is_unique() -> Result<()> {
    let (db, _temp_dir) = setup_test_db().await?;

    RssFeed::create(&db.pool, 1, 100, "https://example.com/feed.xml", None).await?;
    let duplicate = RssFeed::create(&db.pool, 2, 200, "https://example.com/feed.xml", None).await;
    assert!(duplicate.is_err());

    assert_eq!(RssFeed::list_all(&db.pool).await?.len(), 1);
    Ok(())
}

#[tokio::test]
async fn test_feed_listing_by_owner() -> Result<()> {
    let (db, _temp_dir) = setup_test_db().await?;

    RssFeed::create(&db.pool, 1, 100, "https://a.example/feed", None).await?;
    RssFeed::create(&db.pool, 2, 200, "https://b.example/feed", None).await?;
    RssFeed::create(&db.pool, 1, 100, "https://c.example/feed", None).await?;

    let mine = RssFeed::list_by_owner(&db.pool, 1).await?;
    let urls: Vec<&str> = mine.iter().map(|f| f.url.as_str()).collect();
    assert_eq!(urls, vec!["https://a.example/feed", "https://c.example/feed"]);
    assert_eq!(RssFeed::list_all(&db.pool).await?.len(), 3);

    Ok(())
}

#[tokio::test]
async fn test_feed_cursor_update() -> Result<()> {
    let (db, _temp_dir) = setup_test_db().await?;
    let feed = RssFeed::create(&db.pool, 1, 100, "https://example.com/feed.xml", None).await?;

    RssFeed::update_cursor(&db.pool, feed.id, "guid-1").await?;
    RssFeed::update_cursor(&db.pool, feed.id, "guid-2").await?;

    let stored = RssFeed::find_by_id(&db.pool, feed.id).await?.unwrap();
    assert_eq!(stored.last_item_id.as_deref(), Some("guid-2"));
    Ok(())
}

#[tokio::test]
async fn test_feed_deletion_is_owner_scoped() -> Result<()> {
    let (db, _temp_dir) = setup_test_db().await?;
    let feed = RssFeed::create(&db.pool, 1, 100, "https://example.com/feed.xml", None).await?;

    assert_eq!(RssFeed::delete_owned(&db.pool, feed.id, 2).await?, 0);
    assert!(RssFeed::find_by_id(&db.pool, feed.id).await?.is_some());

    assert_eq!(RssFeed::delete_owned(&db.pool, feed.id, 1).await?, 1);
    assert!(RssFeed::find_by_id(&db.pool, feed.id).await?.is_none());

    let other = RssFeed::create(&db.pool, 3, 300, "https://other.example/feed", None).await?;
    assert_eq!(RssFeed::delete_by_id(&db.pool, other.id).await?, 1);
    assert_eq!(RssFeed::delete_by_id(&db.pool, other.id).await?, 0);

    Ok(())
}

#[tokio::test]
async fn test_keyword_add_and_delete_report_changes() -> Result<()> {
    let (db, _temp_dir) = setup_test_db().await?;

    assert_eq!(RssKeyword::add(&db.pool, "rust", KeywordKind::Include).await?, 1);
    assert_eq!(RssKeyword::add(&db.pool, "rust", KeywordKind::Include).await?, 0);
    // Same word under the other type is a different row
    assert_eq!(RssKeyword::add(&db.pool, "rust", KeywordKind::Exclude).await?, 1);

    assert_eq!(RssKeyword::words(&db.pool, KeywordKind::Include).await?, vec!["rust"]);
    let excludes = RssKeyword::list(&db.pool, KeywordKind::Exclude).await?;
    assert_eq!(excludes.len(), 1);
    assert_eq!(excludes[0].kind, "exclude");

    assert_eq!(RssKeyword::delete(&db.pool, "rust", KeywordKind::Include).await?, 1);
    assert_eq!(RssKeyword::delete(&db.pool, "rust", KeywordKind::Include).await?, 0);
    assert_eq!(RssKeyword::delete(&db.pool, "missing", KeywordKind::Exclude).await?, 0);

    Ok(())
}

#[tokio::test]
async fn test_rss_interval_setting() -> Result<()> {
    let (db, _temp_dir) = setup_test_db().await?;

    assert_eq!(Setting::rss_interval(&db.pool).await?, None);
    assert_eq!(Setting::effective_rss_interval(&db.pool, 45).await?, 45);
    assert_eq!(Setting::effective_rss_interval(&db.pool, 0).await?, DEFAULT_RSS_INTERVAL);

    Setting::set_rss_interval(&db.pool, 10).await?;
    assert_eq!(Setting::rss_interval(&db.pool).await?, Some(10));
    assert_eq!(Setting::effective_rss_interval(&db.pool, 45).await?, 10);

    // Out-of-range or garbage values are ignored
    Setting::set(&db.pool, "rss_interval", "5000").await?;
    assert_eq!(Setting::rss_interval(&db.pool).await?, None);
    Setting::set(&db.pool, "rss_interval", "soon").await?;
    assert_eq!(Setting::effective_rss_interval(&db.pool, 45).await?, 45);

    Ok(())
}

#[tokio::test]
async fn test_settings_upsert() -> Result<()> {
    let (db, _temp_dir) = setup_test_db().await?;

    assert_eq!(Setting::get(&db.pool, "theme").await?, None);
    Setting::set(&db.pool, "theme", "dark").await?;
    Setting::set(&db.pool, "theme", "light").await?;
    assert_eq!(Setting::get(&db.pool, "theme").await?.as_deref(), Some("light"));

    Ok(())
}

#[tokio::test]
async fn test_cookie_upsert_and_lookup() -> Result<()> {
    let (db, _temp_dir) = setup_test_db().await?;

    RssCookie::set(&db.pool, "Example.com", "a=1", "").await?;
    RssCookie::set(&db.pool, "example.com", "a=2; b=3", "UA/1.0").await?;

    let stored = RssCookie::get(&db.pool, "example.com").await?.unwrap();
    assert_eq!(stored.cookie_string, "a=2; b=3");
    assert_eq!(stored.user_agent, "UA/1.0");
    assert_eq!(
        stored.pairs(),
        vec![("a".to_string(), "2".to_string()), ("b".to_string(), "3".to_string())]
    );
    assert_eq!(RssCookie::list(&db.pool).await?.len(), 1);

    assert_eq!(RssCookie::delete(&db.pool, "EXAMPLE.com").await?, 1);
    assert_eq!(RssCookie::delete(&db.pool, "example.com").await?, 0);

    Ok(())
}

#[tokio::test]
async fn test_cookie_lookup_for_feed_urls() -> Result<()> {
    let (db, _temp_dir) = setup_test_db().await?;

    RssCookie::set(&db.pool, "news.example.com", "exact=1", "").await?;
    RssCookie::set(&db.pool, "blog.org", "bare=1", "").await?;
    RssCookie::set(&db.pool, "cdn.site.net", "sub=1", "").await?;

    let exact = RssCookie::find_for_url(&db.pool, "https://news.example.com/rss").await?.unwrap();
    assert_eq!(exact.domain, "news.example.com");

    let www = RssCookie::find_for_url(&db.pool, "https://www.blog.org/feed").await?.unwrap();
    assert_eq!(www.domain, "blog.org");

    let root = RssCookie::find_for_url(&db.pool, "https://feeds.blog.org/atom").await?.unwrap();
    assert_eq!(root.domain, "blog.org");

    let sibling = RssCookie::find_for_url(&db.pool, "https://www.site.net/rss").await?.unwrap();
    assert_eq!(sibling.domain, "cdn.site.net");

    assert!(RssCookie::find_for_url(&db.pool, "https://unknown.dev/feed").await?.is_none());
    assert!(RssCookie::find_for_url(&db.pool, "not a url").await?.is_none());

    Ok(())
}
