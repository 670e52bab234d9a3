use crate::error::MalformedResponseError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

/// Access / refresh credential pair issued by the provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
    pub access_jwt: String,
    pub refresh_jwt: String,
}

/// Body of `createSession` / `refreshSession`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SocialSession {
    pub did: String,
    pub handle: String,
    #[serde(flatten)]
    pub tokens: TokenPair,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub did_doc: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

/// `app.bsky.actor.getProfile` snapshot. Unknown fields are kept so the
/// cached copy round-trips.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub did: String,
    pub handle: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Author {
    pub did: String,
    pub handle: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostRecord {
    #[serde(default)]
    pub text: String,
    pub created_at: DateTime<Utc>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A post as listed by the author feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub uri: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cid: Option<String>,
    pub author: Author,
    pub record: PostRecord,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Post {
    pub fn created_at(&self) -> DateTime<Utc> {
        self.record.created_at
    }

    pub fn text(&self) -> &str {
        &self.record.text
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedItem {
    pub post: Post,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<Value>,
}

impl FeedItem {
    /// A post `did` wrote itself. Reposts carry a `reason` and keep the
    /// original author and `createdAt`.
    pub fn is_original_by(&self, did: &str) -> bool {
        self.reason.is_none() && self.post.author.did == did
    }
}

/// One page of `app.bsky.feed.getAuthorFeed`, newest first.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeedPage {
    #[serde(default, deserialize_with = "decodable_items")]
    pub feed: Vec<FeedItem>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cursor: Option<String>,
}

/// Decode feed entries one at a time, dropping the ones that do not fit
/// [`FeedItem`] (e.g. a record with an unparseable `createdAt`) so a single
/// bad entry does not sink the page.
fn decodable_items<'de, D>(deserializer: D) -> Result<Vec<FeedItem>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Vec::<Value>::deserialize(deserializer)?;
    Ok(raw
        .into_iter()
        .filter_map(|entry| {
            let uri = entry
                .pointer("/post/uri")
                .and_then(Value::as_str)
                .unwrap_or("<unknown>")
                .to_string();
            serde_json::from_value(entry)
                .inspect_err(|e| tracing::warn!(%uri, "skipping feed item: {e}"))
                .ok()
        })
        .collect())
}

/// `scheme://repo/collection/rkey`, the address of a single record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordUri {
    pub repo: String,
    pub collection: String,
    pub rkey: String,
}

impl FromStr for RecordUri {
    type Err = MalformedResponseError;

    fn from_str(uri: &str) -> Result<Self, Self::Err> {
        let invalid = |reason| MalformedResponseError::RecordUri {
            uri: uri.to_string(),
            reason,
        };

        let (_, rest) = uri.split_once("://").ok_or_else(|| invalid("missing scheme"))?;
        let mut parts = rest.split('/');
        let (Some(repo), Some(collection), Some(rkey), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(invalid("expected repo/collection/rkey"));
        };
        if repo.is_empty() || collection.is_empty() || rkey.is_empty() {
            return Err(invalid("empty path segment"));
        }

        Ok(Self {
            repo: repo.to_string(),
            collection: collection.to_string(),
            rkey: rkey.to_string(),
        })
    }
}

impl fmt::Display for RecordUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "at://{}/{}/{}", self.repo, self.collection, self.rkey)
    }
}
