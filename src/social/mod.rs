mod client;
mod types;

pub use client::SocialClient;
pub use types::{
    Author, FeedItem, FeedPage, Post, PostRecord, Profile, RecordUri, SocialSession, TokenPair,
};
