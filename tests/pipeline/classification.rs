use futures_util::TryStreamExt;
use serde_json::{Value, json};
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, ResponseTemplate};

use feedwarden::audit::ActionKind;
use feedwarden::scheduler::judge_sweep_at;

use crate::harness::{DID, Harness, instant, post_uri};

const MODERATION_ROUTE: &str = "/v1/moderations";

#[tokio::test]
async fn flagged_post_is_deleted_with_category_breakdown() {
    let harness = Harness::start().await;
    harness
        .mount_feed(&[&[
            ("p2", "2024-01-02T00:00:00Z"),
            ("p1", "2023-12-31T00:00:00Z"),
        ]])
        .await;
    Mock::given(method("POST"))
        .and(path(MODERATION_ROUTE))
        .and(header("authorization", "Bearer sk-harness"))
        .and(body_partial_json(json!({
            "model": "harness-model",
            "input": "post p2"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "modr-1",
            "model": "harness-model",
            "results": [{
                "flagged": true,
                "categories": { "harassment": true, "violence": false },
                "category_scores": { "harassment": 0.97, "violence": 0.02 }
            }]
        })))
        .expect(1)
        .mount(&harness.server)
        .await;
    Mock::given(method("POST"))
        .and(path("/xrpc/com.atproto.repo.deleteRecord"))
        .and(header("authorization", "Bearer access"))
        .and(body_partial_json(json!({
            "repo": DID,
            "collection": "app.bsky.feed.post",
            "rkey": "p2"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&harness.server)
        .await;
    harness.link(MODERATION_ROUTE, "2024-01-01T00:00:00Z").await;

    let report = judge_sweep_at(&harness.ctx, instant("2024-06-01T00:00:00Z"))
        .await
        .unwrap();
    assert_eq!(report.processed, 1);

    let log = harness.ctx.store.audit_log(&harness.key).unwrap();
    let entries: Vec<_> = log.read().try_collect().await.unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].kind, ActionKind::Delete);
    assert_eq!(entries[0].uri, post_uri("p2"));

    let cause: Value = serde_json::from_str(&entries[0].cause).unwrap();
    assert_eq!(cause["categories"]["harassment"], json!(true));
    assert_eq!(cause["category_scores"]["violence"], json!(0.02));
}

#[tokio::test]
async fn unflagged_post_only_advances_watermark() {
    let harness = Harness::start().await;
    harness
        .mount_feed(&[&[
            ("p2", "2024-01-02T00:00:00Z"),
            ("p1", "2023-12-31T00:00:00Z"),
        ]])
        .await;
    Mock::given(method("POST"))
        .and(path(MODERATION_ROUTE))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "results": [{ "flagged": false, "categories": {}, "category_scores": {} }]
        })))
        .mount(&harness.server)
        .await;
    Mock::given(method("POST"))
        .and(path("/xrpc/com.atproto.repo.deleteRecord"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&harness.server)
        .await;
    harness.link(MODERATION_ROUTE, "2024-01-01T00:00:00Z").await;

    judge_sweep_at(&harness.ctx, instant("2024-06-01T00:00:00Z"))
        .await
        .unwrap();

    let state = harness.state().await;
    assert_eq!(state.judge_since, Some(instant("2024-01-02T00:00:00.001Z")));
    let log = harness.ctx.store.audit_log(&harness.key).unwrap();
    assert!(log.recent(10).await.unwrap().is_empty());
}
