mod common;

use common::{ScriptedFetcher, Step};
use pricewatch_lib::pricewatch_fetch::PageBody;
use pricewatch_lib::probe_render_required;

const URL: &str = "https://shop.example/item";

#[tokio::test]
async fn static_text_needs_no_render() {
    let fetcher = ScriptedFetcher::new().page(URL, r#"<span class="price">12,00</span>"#);
    assert_eq!(probe_render_required(&fetcher, URL, "span.price").await, Some(false));
    assert!(fetcher.calls().iter().all(|c| !c.render));
}

#[tokio::test]
async fn text_only_after_render() {
    let fetcher = ScriptedFetcher::new()
        .page(URL, r#"<div id="app"></div>"#)
        .script(
            URL,
            true,
            vec![Step::Page(PageBody::Fragment(
                r#"<span class="price">12,00</span>"#.to_string(),
            ))],
        );
    assert_eq!(probe_render_required(&fetcher, URL, "span.price").await, Some(true));
    let calls = fetcher.calls();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[1].wait_for.as_deref(), Some("span.price"));
}

#[tokio::test]
async fn undetermined_when_nothing_matches() {
    let fetcher = ScriptedFetcher::new()
        .page(URL, r#"<div id="app"></div>"#)
        .script(
            URL,
            true,
            vec![Step::Page(PageBody::Document(r#"<div id="app">loaded</div>"#.to_string()))],
        );
    assert_eq!(probe_render_required(&fetcher, URL, "span.price").await, None);
}

#[tokio::test]
async fn render_failure_is_undetermined() {
    let fetcher = ScriptedFetcher::new().script(URL, true, vec![Step::Fail]);
    assert_eq!(probe_render_required(&fetcher, URL, "span.price").await, None);
}
