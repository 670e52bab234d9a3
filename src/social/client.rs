use super::types::{FeedPage, Profile, RecordUri, SocialSession};
use crate::error::MalformedResponseError;
use crate::http::{build_http_client, upstream_error};
use anyhow::{Context, Result};
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde_json::json;
use url::Url;

const SERVICE: &str = "social";

const NSID_CREATE_SESSION: &str = "com.atproto.server.createSession";
const NSID_REFRESH_SESSION: &str = "com.atproto.server.refreshSession";
const NSID_GET_PROFILE: &str = "app.bsky.actor.getProfile";
const NSID_GET_AUTHOR_FEED: &str = "app.bsky.feed.getAuthorFeed";
const NSID_DELETE_RECORD: &str = "com.atproto.repo.deleteRecord";

/// Thin XRPC client for the social provider.
///
/// The client is stateless with respect to accounts: every call takes the
/// provider base URL and the credential to present, so one instance serves
/// all sessions.
#[derive(Debug, Clone)]
pub struct SocialClient {
    client: Client,
}

impl Default for SocialClient {
    fn default() -> Self {
        Self::new(build_http_client())
    }
}

impl SocialClient {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn xrpc_url(provider: &str, nsid: &str) -> Result<Url> {
        let base = Url::parse(provider)
            .with_context(|| format!("invalid provider URL {provider:?}"))?;
        base.join(&format!("/xrpc/{nsid}"))
            .with_context(|| format!("invalid XRPC endpoint for {nsid}"))
    }

    async fn send<T: DeserializeOwned>(
        &self,
        nsid: &'static str,
        request: RequestBuilder,
    ) -> Result<T> {
        let response = request
            .send()
            .await
            .with_context(|| format!("{nsid} request failed"))?;

        if !response.status().is_success() {
            let err = upstream_error(SERVICE, response).await;
            return Err(anyhow::Error::new(err).context(format!("{nsid} rejected")));
        }

        let body = response
            .text()
            .await
            .with_context(|| format!("{nsid} response body unreadable"))?;
        serde_json::from_str(&body).map_err(|e| {
            anyhow::Error::new(MalformedResponseError::Decode {
                service: SERVICE,
                message: format!("{nsid}: {e}"),
            })
        })
    }

    async fn send_empty(&self, nsid: &'static str, request: RequestBuilder) -> Result<()> {
        let response = request
            .send()
            .await
            .with_context(|| format!("{nsid} request failed"))?;

        if !response.status().is_success() {
            let err = upstream_error(SERVICE, response).await;
            return Err(anyhow::Error::new(err).context(format!("{nsid} rejected")));
        }
        Ok(())
    }

    pub async fn create_session(
        &self,
        provider: &str,
        identifier: &str,
        password: &str,
    ) -> Result<SocialSession> {
        let url = Self::xrpc_url(provider, NSID_CREATE_SESSION)?;
        let request = self
            .client
            .post(url)
            .json(&json!({ "identifier": identifier, "password": password }));
        self.send(NSID_CREATE_SESSION, request).await
    }

    pub async fn refresh_session(
        &self,
        provider: &str,
        refresh_jwt: &str,
    ) -> Result<SocialSession> {
        let url = Self::xrpc_url(provider, NSID_REFRESH_SESSION)?;
        let request = self.client.post(url).bearer_auth(refresh_jwt);
        self.send(NSID_REFRESH_SESSION, request).await
    }

    pub async fn get_profile(
        &self,
        provider: &str,
        access_jwt: &str,
        actor: &str,
    ) -> Result<Profile> {
        let url = Self::xrpc_url(provider, NSID_GET_PROFILE)?;
        let request = self
            .client
            .get(url)
            .bearer_auth(access_jwt)
            .query(&[("actor", actor)]);
        self.send(NSID_GET_PROFILE, request).await
    }

    /// One page of the actor's own feed, newest first.
    pub async fn get_author_feed(
        &self,
        provider: &str,
        access_jwt: &str,
        actor: &str,
        cursor: Option<&str>,
        limit: u32,
    ) -> Result<FeedPage> {
        let url = Self::xrpc_url(provider, NSID_GET_AUTHOR_FEED)?;
        let limit = limit.to_string();
        let mut query = vec![("actor", actor), ("limit", limit.as_str())];
        if let Some(cursor) = cursor {
            query.push(("cursor", cursor));
        }
        let request = self.client.get(url).bearer_auth(access_jwt).query(&query);
        self.send(NSID_GET_AUTHOR_FEED, request).await
    }

    pub async fn delete_record(
        &self,
        provider: &str,
        access_jwt: &str,
        record: &RecordUri,
    ) -> Result<()> {
        let url = Self::xrpc_url(provider, NSID_DELETE_RECORD)?;
        let request = self.client.post(url).bearer_auth(access_jwt).json(&json!({
            "repo": record.repo,
            "collection": record.collection,
            "rkey": record.rkey,
        }));
        self.send_empty(NSID_DELETE_RECORD, request).await
    }
}
