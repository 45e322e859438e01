use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use xtractor_core::{Document, Readability, SourceKind, Strategy, classify, classify_url, collect_image_urls};

fn fixture(name: &str) -> String {
    std::fs::read_to_string(format!("../../tests/fixtures/{}", name)).unwrap()
}

fn bench_classify(c: &mut Criterion) {
    let medium = fixture("medium_post.html");
    let doc = Document::parse(&medium).unwrap();

    let mut group = c.benchmark_group("classify");

    for url in ["https://x.com/a/status/1", "https://ada.medium.com/post", "https://blog.example.com/post"] {
        group.bench_with_input(BenchmarkId::new("url", url), url, |b, url| b.iter(|| classify_url(black_box(url))));
    }

    group.bench_function("dom_refinement", |b| {
        b.iter(|| classify(black_box("https://blog.example.com/post"), Some(&doc)))
    });

    group.finish();
}

fn bench_generic_extraction(c: &mut Criterion) {
    let html = fixture("generic_article.html");
    let doc = Document::parse_with_url(&html, "https://notes.example.com/ownership").unwrap();
    let strategy = Strategy::for_source(SourceKind::Generic, None);

    c.bench_function("generic_extraction", |b| b.iter(|| strategy.extract(black_box(&doc))));
}

fn bench_readability(c: &mut Criterion) {
    use xtractor_core::ArticleReader;

    let html = fixture("generic_article.html");
    let doc = Document::parse(&html).unwrap();
    let reader = Readability::new();

    c.bench_function("readability", |b| b.iter(|| reader.parse(black_box(&doc))));
}

fn bench_image_scan(c: &mut Criterion) {
    let mut html = fixture("generic_article.html");
    for i in 0..200 {
        html.push_str(&format!(r#"<img src="https://cdn.example.com/img/{i}.png?w=800&amp;h=600">"#));
    }
    let styles = ".hero { background-image: url(\"https://cdn.example.com/hero.jpg\") }".repeat(20);

    c.bench_function("collect_image_urls", |b| {
        b.iter(|| collect_image_urls(black_box(&html), black_box(&styles)))
    });
}

criterion_group!(benches, bench_classify, bench_generic_extraction, bench_readability, bench_image_scan);
criterion_main!(benches);
