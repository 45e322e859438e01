//! Library API integration tests
use std::sync::Arc;

use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};
use xtractor_core::*;

const PNG: &[u8] = &[0x89, b'P', b'N', b'G', b'\r', b'\n', 0x1a, b'\n', 0, 0, 0, 13];

fn get_fixture_path(name: &str) -> String {
    format!("../../tests/fixtures/{}", name)
}

fn fixture(name: &str) -> String {
    std::fs::read_to_string(get_fixture_path(name)).unwrap()
}

/// Forces the selector heuristic.
struct UnavailableReader;

impl ArticleReader for UnavailableReader {
    fn parse(&self, _doc: &Document) -> Result<Option<ReadableArticle>> {
        Err(XtractorError::ReadabilityUnavailable("engine not loaded".to_string()))
    }
}

fn network_images() -> Arc<dyn ImageSource> {
    Arc::new(NetworkImageSource::new(&FetchConfig::default()).unwrap())
}

fn session() -> MemorySessionStore {
    MemorySessionStore::with_cookies(SessionCookies::from_json(&fixture("cookies.json")).unwrap())
}

async fn png_server(expected_hits: u64) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/a.png"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(PNG).insert_header("content-type", "image/png"))
        .expect(expected_hits)
        .mount(&server)
        .await;
    server
}

#[tokio::test]
async fn test_generic_heuristic_inlines_each_image_once() {
    let server = png_server(1).await;
    let image = format!("{}/a.png", server.uri());
    let html = format!(
        r#"<html><head><meta property="og:title" content="Foo"><title>Ignored</title></head>
        <body><nav>Menu</nav><article><p>First paragraph.</p><img src="{image}"><p>Second.</p><img src="{image}"></article></body></html>"#
    );
    let mut page = StaticPage::new(html);

    let extraction = Extractor::default()
        .with_reader(Arc::new(UnavailableReader))
        .run("https://blog.example.com/foo", &mut page, &MemorySessionStore::new(), network_images())
        .await
        .unwrap();

    assert_eq!(extraction.source, SourceKind::Generic);
    assert_eq!(extraction.title, "Foo");
    assert!(extraction.artifact.contains("<title>Foo - blog.example.com</title>"));
    assert!(!extraction.artifact.contains(&image));
    assert_eq!(extraction.artifact.matches("data:image/png;base64,").count(), 2);
    assert!(!extraction.artifact.contains("Menu"));
    assert_eq!(extraction.images, InlineReport { found: 1, converted: 1, failures: vec![] });
}

#[tokio::test]
async fn test_generic_main_with_one_image() {
    let server = png_server(1).await;
    let image = format!("{}/a.png", server.uri());
    let html = format!(
        r#"<html><head><meta property="og:title" content="Foo"></head>
        <body><main><p>The first paragraph of the story.</p><p>The second paragraph of the story.</p><img src="{image}"></main></body></html>"#
    );
    let page = StaticPage::new(html).landing_at("https://blog.example.com/foo");

    let extraction = Extractor::default().run_snapshot(&page, network_images()).await.unwrap();

    assert_eq!(extraction.title, "Foo");
    assert!(extraction.artifact.contains("The first paragraph of the story."));
    assert!(extraction.artifact.contains("The second paragraph of the story."));
    assert_eq!(extraction.artifact.matches(&image).count(), 0);
    assert_eq!(extraction.artifact.matches("data:").count(), 1);
}

#[tokio::test]
async fn test_failed_image_keeps_url_and_run_succeeds() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/missing.png"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;
    let image = format!("{}/missing.png", server.uri());
    let html = format!(r#"<html><body><main><p>Text.</p><img src="{image}"></main></body></html>"#);
    let page = StaticPage::new(html).landing_at("https://blog.example.com/post");

    let extraction = Extractor::default()
        .with_reader(Arc::new(UnavailableReader))
        .run_snapshot(&page, network_images())
        .await
        .unwrap();

    assert!(extraction.artifact.contains(&image));
    assert_eq!(extraction.images.found, 1);
    assert_eq!(extraction.images.converted, 0);
    assert_eq!(extraction.images.failures.len(), 1);
    assert_eq!(extraction.images.failures[0].url, image);
    assert!(extraction.images.failures[0].reason.contains("404"));
}

#[tokio::test]
async fn test_inlining_is_idempotent() {
    let server = png_server(1).await;
    let html = format!(r#"<p><img src="{}/a.png"></p>"#, server.uri());
    let inliner = ImageInliner::new(network_images());

    let first = inliner.inline(&html, "").await;
    let second = inliner.inline(&first.html, &first.styles).await;

    assert_eq!(first.report.converted, 1);
    assert_eq!(second.report.found, 0);
    assert_eq!(second.html, first.html);
}

#[tokio::test]
async fn test_medium_without_article_fails() {
    let html = r#"<html><head><meta property="og:title" content="Gone"></head><body><div class="error">Page not found</div></body></html>"#;
    let mut page = StaticPage::new(html);

    let err = Extractor::default()
        .run("https://medium.com/@ada/gone", &mut page, &MemorySessionStore::new(), network_images())
        .await
        .unwrap_err();

    assert!(matches!(err, XtractorError::NoArticleFound { kind: SourceKind::Medium }));
    assert!(err.is_fatal());
}

#[tokio::test]
async fn test_x_without_tweet_container_captures_article() {
    let html = r#"<html><head><title>Post / X</title></head><body><main><article><div data-testid="User-Name">Ada</div><div data-testid="tweetText">Hello from the article root</div><button data-testid="like">1</button></article></main></body></html>"#;
    let mut page = StaticPage::new(html);

    let extraction = Extractor::default()
        .run("https://x.com/ada/status/42", &mut page, &session(), network_images())
        .await
        .unwrap();

    assert_eq!(extraction.source, SourceKind::X);
    assert_eq!(extraction.byline, "Ada");
    assert!(extraction.artifact.contains("Hello from the article root"));
    assert!(!extraction.artifact.contains("data-testid=\"like\""));
    assert!(page.cookies().is_some_and(|cookies| cookies.len() == 2));
}

#[tokio::test]
async fn test_x_requires_session() {
    let mut page = StaticPage::new(fixture("x_status.html"));

    let err = Extractor::default()
        .run("https://twitter.com/linus/status/1", &mut page, &MemorySessionStore::new(), network_images())
        .await
        .unwrap_err();

    assert!(matches!(err, XtractorError::SessionRequired { .. }));
    assert!(err.to_string().contains("SESSION_REQUIRED"));
}

#[tokio::test]
async fn test_x_expired_session() {
    let mut page = StaticPage::new(fixture("x_status.html")).landing_at("https://x.com/login?redirect_after_login=%2F");

    let err = Extractor::default()
        .run("https://x.com/linus/status/1", &mut page, &session(), network_images())
        .await
        .unwrap_err();

    assert!(matches!(err, XtractorError::SessionExpired { .. }));
}

#[tokio::test]
async fn test_x_fixture_snapshot() {
    let page = StaticPage::new(fixture("x_status.html")).landing_at("https://x.com/linus/status/1");
    let config = ExtractorConfig::builder().inline_images(false).build();

    let extraction = Extractor::new(config).run_snapshot(&page, network_images()).await.unwrap();

    assert_eq!(extraction.source, SourceKind::X);
    assert!(extraction.artifact.contains("Shipping the release today"));
    assert!(extraction.artifact.contains("background-color: rgb(0, 0, 0)"));
    assert!(extraction.artifact.contains(".r-1 { color: rgb(231, 233, 234); }"));
    assert!(!extraction.artifact.contains("role=\"group\""));
}

#[tokio::test]
async fn test_medium_fixture_markdown() {
    let page = StaticPage::new(fixture("medium_post.html")).landing_at("https://blog.example.com/writing-parsers");
    let config = ExtractorConfig::builder().format(OutputFormat::Markdown).inline_images(false).build();

    let extraction = Extractor::new(config).run_snapshot(&page, network_images()).await.unwrap();

    assert_eq!(extraction.source, SourceKind::Medium);
    assert_eq!(extraction.format, "markdown");
    assert!(extraction.artifact.starts_with("# Writing Parsers by Hand\n"));
    assert!(extraction.artifact.contains("**Author** : Ada Lovelace | **Source** : Medium"));
    assert!(extraction.artifact.contains("_Grammar rules as functions_"));
    assert!(!extraction.artifact.contains("Sign in"));
}

#[tokio::test]
async fn test_generic_fixture_with_readability() {
    let page = StaticPage::new(fixture("generic_article.html")).landing_at("https://notes.example.com/ownership");
    let config = ExtractorConfig::builder().inline_images(false).build();

    let extraction = Extractor::new(config).run_snapshot(&page, network_images()).await.unwrap();

    assert_eq!(extraction.source, SourceKind::Generic);
    assert_eq!(extraction.title, "Ownership in Practice");
    assert_eq!(extraction.byline, "Grace Hopper");
    assert_eq!(extraction.site_name, "Field Notes");
    assert!(extraction.artifact.contains("Lifetimes tie these borrows together"));
    assert!(extraction.artifact.contains("https://images.example.com/diagrams/borrow.png"));
    assert!(!extraction.artifact.contains("Copyright Field Notes"));
}

#[test]
fn test_classification() {
    assert_eq!(classify_url("https://x.com/a/status/1"), SourceKind::X);
    assert_eq!(classify_url("https://mobile.twitter.com/a"), SourceKind::X);
    assert_eq!(classify_url("https://ada.medium.com/post"), SourceKind::Medium);
    assert_eq!(classify_url("https://notmedium.com/post"), SourceKind::Generic);

    let doc = Document::parse(&fixture("medium_post.html")).unwrap();
    assert_eq!(classify("https://blog.example.com/post", Some(&doc)), SourceKind::Medium);
}

#[test]
fn test_collect_image_urls_from_markup_and_css() {
    let html = r#"<img src="https://a.test/1.png"><img src="/relative.png"><img src="data:image/png;base64,AA=="><img src="https://a.test/1.png">"#;
    let styles = r#".hero { background: url("https://a.test/bg.jpg") }"#;

    assert_eq!(collect_image_urls(html, styles), vec!["https://a.test/1.png", "https://a.test/bg.jpg"]);
}
