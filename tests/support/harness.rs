#![allow(dead_code)]

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde_json::{Value, json};
use tempfile::TempDir;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use feedwarden::Config;
use feedwarden::oracle::OracleEndpoint;
use feedwarden::scheduler::SweepContext;
use feedwarden::session::{JudgeConfig, JudgeState, OracleSettings, SocialProfile, session_key};
use feedwarden::social::{Profile, SocialSession, TokenPair};

pub const DID: &str = "did:plc:harness";
pub const SALT: &str = "harness-salt";

/// A provider + oracle double on one mock server and a session root in a
/// temporary directory.
pub struct Harness {
    pub server: MockServer,
    pub ctx: SweepContext,
    pub key: String,
    _tmp: TempDir,
}

impl Harness {
    pub async fn start() -> Self {
        let server = MockServer::start().await;
        let tmp = TempDir::new().expect("tempdir");
        let mut config = Config {
            salt: SALT.into(),
            session_dir: tmp.path().join("sessions"),
            feed_page_limit: 2,
            audit_max_records: 4,
            ..Config::default()
        };
        config.finish().expect("valid config");

        Self {
            server,
            ctx: SweepContext::new(Arc::new(config)),
            key: session_key(DID, SALT),
            _tmp: tmp,
        }
    }

    pub fn oracle_url(&self, route: &str) -> String {
        format!("{}{route}", self.server.uri())
    }

    pub async fn link(&self, oracle_route: &str, judge_since: &str) {
        let social = SocialProfile::new(
            self.server.uri(),
            SocialSession {
                did: DID.into(),
                handle: "harness.test".into(),
                tokens: TokenPair {
                    access_jwt: "access".into(),
                    refresh_jwt: "refresh".into(),
                },
                did_doc: None,
                active: Some(true),
                status: None,
            },
            Profile {
                did: DID.into(),
                handle: "harness.test".into(),
                display_name: None,
                extra: serde_json::Map::new(),
            },
        );
        let config = JudgeConfig {
            genai: OracleSettings {
                endpoint: OracleEndpoint::new(self.oracle_url(oracle_route)),
                api_key: "sk-harness".into(),
                model: "harness-model".into(),
            },
            instruction_prompt: None,
        };
        let state = JudgeState {
            judge_since: Some(instant(judge_since)),
            ..JudgeState::default()
        };

        let store = &self.ctx.store;
        store.save_social(&self.key, &social).await.expect("social");
        store.save_config(&self.key, &config).await.expect("config");
        store.save_state(&self.key, &state).await.expect("state");
    }

    /// Serve `pages` as the author feed. Page `i` is requested with cursor
    /// `c{i}` (the first without a cursor) and points at `c{i+1}`.
    pub async fn mount_feed(&self, pages: &[&[(&str, &str)]]) {
        for (i, page) in pages.iter().enumerate() {
            let feed: Vec<Value> = page
                .iter()
                .map(|(rkey, created_at)| post_item(rkey, created_at))
                .collect();
            let mut body = json!({ "feed": feed });
            if i + 1 < pages.len() {
                body["cursor"] = json!(format!("c{}", i + 1));
            }

            let mock = Mock::given(method("GET"))
                .and(path("/xrpc/app.bsky.feed.getAuthorFeed"))
                .and(query_param("actor", DID));
            let mock = if i == 0 {
                mock.and(NoCursor)
            } else {
                mock.and(query_param("cursor", format!("c{i}")))
            };
            mock.respond_with(ResponseTemplate::new(200).set_body_json(body))
                .mount(&self.server)
                .await;
        }
    }

    pub async fn mount_delete_ok(&self) {
        Mock::given(method("POST"))
            .and(path("/xrpc/com.atproto.repo.deleteRecord"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .mount(&self.server)
            .await;
    }

    pub async fn state(&self) -> JudgeState {
        self.ctx.store.load(&self.key).await.expect("load").state
    }
}

/// Matches requests that carry no `cursor` query parameter.
struct NoCursor;

impl wiremock::Match for NoCursor {
    fn matches(&self, request: &wiremock::Request) -> bool {
        !request.url.query_pairs().any(|(k, _)| k == "cursor")
    }
}

pub fn post_uri(rkey: &str) -> String {
    format!("at://{DID}/app.bsky.feed.post/{rkey}")
}

pub fn post_item(rkey: &str, created_at: &str) -> Value {
    json!({
        "post": {
            "uri": post_uri(rkey),
            "cid": format!("cid-{rkey}"),
            "author": { "did": DID, "handle": "harness.test" },
            "record": {
                "$type": "app.bsky.feed.post",
                "text": format!("post {rkey}"),
                "createdAt": created_at
            },
            "indexedAt": created_at
        }
    })
}

pub fn instant(s: &str) -> DateTime<Utc> {
    s.parse().expect("timestamp")
}
