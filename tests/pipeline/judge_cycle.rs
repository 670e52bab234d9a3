use chrono::Duration;
use futures_util::TryStreamExt;
use serde_json::{Value, json};
use wiremock::matchers::{method, path};
use wiremock::{Mock, Request, Respond, ResponseTemplate};

use feedwarden::audit::ActionKind;
use feedwarden::scheduler::judge_sweep_at;

use crate::harness::{DID, Harness, instant, post_item, post_uri};

const ORACLE_ROUTE: &str = "/v1/chat/completions";

/// Answers every chat request with one tool call of `tool` against the post
/// embedded in the user message.
struct EchoVerdict {
    tool: &'static str,
}

impl Respond for EchoVerdict {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let body: Value = serde_json::from_slice(&request.body).expect("json body");
        let user = body["messages"][1]["content"].as_str().unwrap_or_default();
        let start = user.find("at://").expect("post uri in prompt");
        let end = start + user[start..].find('"').expect("closing quote");
        let uri = &user[start..end];

        ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{
                "message": {
                    "role": "assistant",
                    "content": null,
                    "tool_calls": [{
                        "id": "call_echo",
                        "type": "function",
                        "function": {
                            "name": self.tool,
                            "arguments": json!({ "uri": uri, "cause": "echo" }).to_string()
                        }
                    }]
                }
            }]
        }))
    }
}

async fn logged_uris(harness: &Harness) -> Vec<String> {
    let log = harness.ctx.store.audit_log(&harness.key).unwrap();
    log.read()
        .map_ok(|entry| entry.uri)
        .try_collect()
        .await
        .unwrap()
}

#[tokio::test]
async fn successive_sweeps_walk_the_feed_oldest_first() {
    let harness = Harness::start().await;
    harness
        .mount_feed(&[
            &[("p5", "2024-01-05T00:00:00Z"), ("p4", "2024-01-04T00:00:00Z")],
            &[("p3", "2024-01-03T00:00:00Z"), ("p2", "2024-01-02T00:00:00Z")],
            &[("p1", "2023-12-31T00:00:00Z")],
        ])
        .await;
    Mock::given(method("POST"))
        .and(path(ORACLE_ROUTE))
        .respond_with(EchoVerdict { tool: "report" })
        .mount(&harness.server)
        .await;
    harness.link(ORACLE_ROUTE, "2024-01-02T00:00:00Z").await;

    let mut now = instant("2024-06-01T00:00:00Z");
    let step = Duration::hours(2);

    let expected = [
        ("p2", "2024-01-02T00:00:00.001Z", Some("c1")),
        ("p3", "2024-01-03T00:00:00.001Z", None),
        ("p4", "2024-01-04T00:00:00.001Z", None),
        ("p5", "2024-01-05T00:00:00.001Z", None),
    ];
    for (rkey, watermark, cursor) in expected {
        let report = judge_sweep_at(&harness.ctx, now).await.unwrap();
        assert_eq!(report.processed, 1, "sweep judging {rkey}");

        let state = harness.state().await;
        assert_eq!(state.judge_since, Some(instant(watermark)), "{rkey}");
        assert_eq!(state.cursor.as_deref(), cursor, "{rkey}");
        assert_eq!(state.last_judge_attempted, Some(now));
        now += step;
    }

    // Nothing left: watermark stays, cursor stays cleared.
    judge_sweep_at(&harness.ctx, now).await.unwrap();
    let state = harness.state().await;
    assert_eq!(state.judge_since, Some(instant("2024-01-05T00:00:00.001Z")));
    assert_eq!(state.cursor, None);

    assert_eq!(
        logged_uris(&harness).await,
        ["p2", "p3", "p4", "p5"].map(post_uri)
    );
}

#[tokio::test]
async fn sweep_within_judge_frequency_does_nothing() {
    let harness = Harness::start().await;
    harness
        .mount_feed(&[&[
            ("p2", "2024-01-02T00:00:00Z"),
            ("p1", "2024-01-01T00:00:00Z"),
        ]])
        .await;
    Mock::given(method("POST"))
        .and(path(ORACLE_ROUTE))
        .respond_with(EchoVerdict { tool: "report" })
        .expect(1)
        .mount(&harness.server)
        .await;
    harness.link(ORACLE_ROUTE, "2024-01-01T12:00:00Z").await;

    let now = instant("2024-06-01T00:00:00Z");
    judge_sweep_at(&harness.ctx, now).await.unwrap();
    let after_first = harness.state().await;

    let report = judge_sweep_at(&harness.ctx, now + Duration::minutes(30))
        .await
        .unwrap();
    assert_eq!(report.skipped, 1);
    assert_eq!(harness.state().await, after_first);
}

#[tokio::test]
async fn oracle_cannot_delete_records_other_than_the_judged_post() {
    let harness = Harness::start().await;
    harness
        .mount_feed(&[&[
            ("p2", "2024-01-02T00:00:00Z"),
            ("p1", "2023-12-31T00:00:00Z"),
        ]])
        .await;
    Mock::given(method("POST"))
        .and(path(ORACLE_ROUTE))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{
                "message": {
                    "role": "assistant",
                    "tool_calls": [{
                        "id": "call_1",
                        "type": "function",
                        "function": {
                            "name": "delete",
                            "arguments": json!({
                                "uri": format!("at://{DID}/app.bsky.actor.profile/self"),
                                "cause": "instructed by post"
                            }).to_string()
                        }
                    }]
                }
            }]
        })))
        .expect(1)
        .mount(&harness.server)
        .await;
    Mock::given(method("POST"))
        .and(path("/xrpc/com.atproto.repo.deleteRecord"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(0)
        .mount(&harness.server)
        .await;
    harness.link(ORACLE_ROUTE, "2024-01-01T00:00:00Z").await;

    let report = judge_sweep_at(&harness.ctx, instant("2024-06-01T00:00:00Z"))
        .await
        .unwrap();
    assert_eq!(report.processed, 1);

    let state = harness.state().await;
    assert_eq!(state.judge_since, Some(instant("2024-01-02T00:00:00.001Z")));
    assert!(logged_uris(&harness).await.is_empty());
}

#[tokio::test]
async fn failed_delete_leaves_progress_for_retry() {
    let harness = Harness::start().await;
    harness
        .mount_feed(&[&[
            ("p2", "2024-01-02T00:00:00Z"),
            ("p1", "2023-12-31T00:00:00Z"),
        ]])
        .await;
    Mock::given(method("POST"))
        .and(path(ORACLE_ROUTE))
        .respond_with(EchoVerdict { tool: "delete" })
        .mount(&harness.server)
        .await;
    Mock::given(method("POST"))
        .and(path("/xrpc/com.atproto.repo.deleteRecord"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": "InvalidRequest",
            "message": "Could not find repo"
        })))
        .up_to_n_times(1)
        .mount(&harness.server)
        .await;
    harness.mount_delete_ok().await;
    harness.link(ORACLE_ROUTE, "2024-01-01T00:00:00Z").await;

    let now = instant("2024-06-01T00:00:00Z");
    let report = judge_sweep_at(&harness.ctx, now).await.unwrap();
    assert_eq!(report.failed, 1);

    let state = harness.state().await;
    assert_eq!(state.judge_since, Some(instant("2024-01-01T00:00:00Z")));
    assert_eq!(state.last_judge_attempted, Some(now));
    assert!(logged_uris(&harness).await.is_empty());

    // The next due sweep retries the same post and succeeds.
    let later = now + Duration::hours(2);
    let report = judge_sweep_at(&harness.ctx, later).await.unwrap();
    assert_eq!(report.processed, 1);

    let state = harness.state().await;
    assert_eq!(state.judge_since, Some(instant("2024-01-02T00:00:00.001Z")));
    assert_eq!(logged_uris(&harness).await, [post_uri("p2")]);

    let log = harness.ctx.store.audit_log(&harness.key).unwrap();
    let entries = log.recent(1).await.unwrap();
    assert_eq!(entries[0].kind, ActionKind::Delete);
}

#[tokio::test]
async fn reposted_old_post_does_not_hide_newer_own_posts() {
    let harness = Harness::start().await;
    let mut repost = post_item("r1", "2020-01-01T00:00:00Z");
    repost["post"]["uri"] = json!("at://did:plc:someone/app.bsky.feed.post/r1");
    repost["post"]["author"] = json!({ "did": "did:plc:someone", "handle": "someone.test" });
    repost["reason"] = json!({
        "$type": "app.bsky.feed.defs#reasonRepost",
        "by": { "did": DID, "handle": "harness.test" },
        "indexedAt": "2024-05-02T00:00:00Z"
    });
    Mock::given(method("GET"))
        .and(path("/xrpc/app.bsky.feed.getAuthorFeed"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "feed": [repost, post_item("p2", "2024-05-01T00:00:00Z")]
        })))
        .mount(&harness.server)
        .await;
    Mock::given(method("POST"))
        .and(path(ORACLE_ROUTE))
        .respond_with(EchoVerdict { tool: "report" })
        .expect(1)
        .mount(&harness.server)
        .await;
    harness.link(ORACLE_ROUTE, "2024-01-01T00:00:00Z").await;

    let report = judge_sweep_at(&harness.ctx, instant("2024-06-01T00:00:00Z"))
        .await
        .unwrap();
    assert_eq!(report.processed, 1);

    let state = harness.state().await;
    assert_eq!(state.judge_since, Some(instant("2024-05-01T00:00:00.001Z")));
    assert_eq!(logged_uris(&harness).await, [post_uri("p2")]);
}
