mod resolver;

pub use resolver::{Resolution, resolve};

use crate::session::SocialProfile;
use crate::social::{FeedPage, SocialClient};
use anyhow::Result;
use std::future::Future;
use std::pin::Pin;

/// A paginated feed, newest post first.
pub trait FeedSource: Send + Sync {
    /// DID of the account whose feed this is.
    fn author(&self) -> &str;

    /// Fetch the page that starts at `cursor`, or the newest page when
    /// `cursor` is `None`.
    fn page<'a>(
        &'a self,
        cursor: Option<&'a str>,
    ) -> Pin<Box<dyn Future<Output = Result<FeedPage>> + Send + 'a>>;
}

/// The linked account's own posts, read through `getAuthorFeed`.
pub struct AuthorFeed<'a> {
    client: &'a SocialClient,
    social: &'a SocialProfile,
    limit: u32,
}

impl<'a> AuthorFeed<'a> {
    pub fn new(client: &'a SocialClient, social: &'a SocialProfile, limit: u32) -> Self {
        Self {
            client,
            social,
            limit,
        }
    }
}

impl FeedSource for AuthorFeed<'_> {
    fn author(&self) -> &str {
        &self.social.profile.did
    }

    fn page<'a>(
        &'a self,
        cursor: Option<&'a str>,
    ) -> Pin<Box<dyn Future<Output = Result<FeedPage>> + Send + 'a>> {
        Box::pin(async move {
            self.client
                .get_author_feed(
                    &self.social.provider,
                    self.social.access_jwt(),
                    &self.social.profile.did,
                    cursor,
                    self.limit,
                )
                .await
        })
    }
}
