mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{product_page, tracker, ScriptedFetcher, Step};
use pricewatch_lib::pricewatch_fetch::{FetchOptions, HttpFetcher, PageBody};
use pricewatch_lib::{
    DomainSelectorCache, DomainSelectorEntry, ResolveMode, ResolveSource, SelectorResolver,
};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const SALE_PAGE: &str = r#"<html><head><title>Lamp</title></head><body>
<div class="product"><h1>Desk lamp</h1>
<span class="price">Was <s>$49.99</s> Now $39.99</span></div>
</body></html>"#;

fn resolver(cache: Arc<DomainSelectorCache>) -> SelectorResolver {
    let options = FetchOptions {
        timeout: Duration::from_secs(5),
        ..FetchOptions::default()
    };
    SelectorResolver::new(Arc::new(HttpFetcher::new(&options).unwrap()), cache)
}

async fn serve(server: &MockServer, route: &str, body: &str) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(server)
        .await;
}

#[tokio::test]
async fn auto_detect_finds_live_price_and_caches_domain() {
    let server = MockServer::start().await;
    serve(&server, "/lamp", SALE_PAGE).await;
    serve(
        &server,
        "/bulb",
        r#"<html><body><span class="price">$15.00</span></body></html>"#,
    )
    .await;

    let cache = Arc::new(DomainSelectorCache::new());
    let resolver = resolver(cache.clone());

    let lamp = tracker(1, &format!("{}/lamp", server.uri()), &[]);
    let hit = resolver.resolve(&lamp).await.unwrap();
    assert_eq!(hit.price, "39.99");
    assert_eq!(hit.selector, "span.price");
    assert_eq!(hit.source, ResolveSource::Heuristic);
    assert!(!hit.render_required);

    let entry = cache.get("127.0.0.1").unwrap();
    assert_eq!(entry.selectors, vec!["span.price"]);

    let bulb = tracker(2, &format!("{}/bulb", server.uri()), &[]);
    let hit = resolver.resolve(&bulb).await.unwrap();
    assert_eq!(hit.price, "15.00");
    assert_eq!(hit.source, ResolveSource::Domain);
    assert_eq!(cache.len(), 1);
}

#[tokio::test]
async fn tracked_mode_never_guesses() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/lamp"))
        .respond_with(ResponseTemplate::new(200).set_body_string(SALE_PAGE))
        .expect(1)
        .mount(&server)
        .await;

    let cache = Arc::new(DomainSelectorCache::new());
    let resolver = resolver(cache.clone());
    let lamp = tracker(1, &format!("{}/lamp", server.uri()), &["span.gone"]);

    assert_eq!(ResolveMode::for_tracker(&lamp), ResolveMode::Tracked);
    assert!(resolver.resolve(&lamp).await.is_none());
    assert!(cache.is_empty());
}

#[tokio::test]
async fn tracked_mode_falls_back_to_domain_cache() {
    let server = MockServer::start().await;
    serve(&server, "/lamp", SALE_PAGE).await;

    let cache = Arc::new(DomainSelectorCache::from_entries([DomainSelectorEntry {
        domain: "127.0.0.1".to_string(),
        selectors: vec!["div.product > span".to_string()],
        render_required: false,
    }]));
    let resolver = resolver(cache.clone());
    let lamp = tracker(1, &format!("{}/lamp", server.uri()), &["span.gone"]);

    let hit = resolver.resolve(&lamp).await.unwrap();
    assert_eq!(hit.price, "39.99");
    assert_eq!(hit.selector, "div.product > span");
    assert_eq!(hit.source, ResolveSource::Domain);
}

#[tokio::test]
async fn active_selector_is_tried_first() {
    let server = MockServer::start().await;
    serve(
        &server,
        "/mug",
        r#"<html><body><b class="old">9,00 €</b><b class="new">7,50 €</b></body></html>"#,
    )
    .await;

    let resolver = resolver(Arc::new(DomainSelectorCache::new()));
    let mut mug = tracker(1, &format!("{}/mug", server.uri()), &["b.old", "b.new"]);
    mug.active_selector = Some("b.new".to_string());

    let hit = resolver.resolve(&mug).await.unwrap();
    assert_eq!(hit.selector, "b.new");
    assert_eq!(hit.price, "7,50");
    assert_eq!(hit.source, ResolveSource::Tracker);
}

#[tokio::test]
async fn server_errors_resolve_to_nothing() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/down"))
        .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
        .mount(&server)
        .await;

    let cache = Arc::new(DomainSelectorCache::new());
    let resolver = resolver(cache.clone());
    let down = tracker(1, &format!("{}/down", server.uri()), &[]);

    assert!(resolver.resolve(&down).await.is_none());
    assert!(cache.is_empty());
}

#[tokio::test]
async fn auto_detect_renders_when_static_page_has_no_price() {
    let url = "https://spa.example/lamp";
    let fetcher = Arc::new(
        ScriptedFetcher::new()
            .page(url, r#"<html><body><div id="app">Loading</div></body></html>"#)
            .script(
                url,
                true,
                vec![Step::Page(PageBody::Document(product_page(
                    r#"<span class="price">$19.99</span>"#,
                )))],
            ),
    );
    let cache = Arc::new(DomainSelectorCache::new());
    let resolver = SelectorResolver::new(fetcher.clone(), cache.clone());

    let hit = resolver.resolve(&tracker(1, url, &[])).await.unwrap();

    assert_eq!(hit.price, "19.99");
    assert_eq!(hit.selector, "span.price");
    assert!(hit.render_required);
    assert_eq!(hit.source, ResolveSource::Heuristic);
    let calls = fetcher.calls();
    assert_eq!(calls.len(), 2);
    assert!(!calls[0].render);
    assert!(calls[1].render);
    assert!(cache.get("spa.example").unwrap().render_required);
}

#[tokio::test]
async fn tracked_mode_does_not_render_for_heuristics() {
    let url = "https://spa.example/mug";
    let fetcher = Arc::new(ScriptedFetcher::new().page(
        url,
        r#"<html><body><span class="price">$9.99</span></body></html>"#,
    ));
    let resolver = SelectorResolver::new(fetcher.clone(), Arc::new(DomainSelectorCache::new()));

    assert!(resolver.resolve(&tracker(1, url, &["span.cost"])).await.is_none());
    assert!(fetcher.calls().iter().all(|c| !c.render));
}
