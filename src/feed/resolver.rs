use super::FeedSource;
use crate::social::Post;
use anyhow::Result;
use chrono::{DateTime, Utc};

/// What a walk of the feed found.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    /// The feed holds none of its author's own posts.
    Empty,
    /// Every post at or after the watermark has been judged.
    UpToDate,
    /// The oldest unjudged post, and the cursor to resume from once it has
    /// been judged.
    Target { post: Post, cursor: Option<String> },
}

/// A candidate post and the request cursor of the page it was listed on.
struct Contender {
    post: Post,
    cursor: Option<String>,
}

/// Find the oldest post created at or after `judge_since`.
///
/// Only posts the feed's author wrote count; reposts and other authors'
/// items are passed over since their `createdAt` breaks the newest-first
/// order. Pages are walked newest first starting at `cursor`. Two contenders are
/// kept: the last post seen that is still not older than the watermark, and
/// the one seen before it. When a post older than the watermark shows up,
/// or the feed runs out, the first contender is the target and the page
/// cursor of the second is where the next walk should start.
pub async fn resolve(
    source: &dyn FeedSource,
    judge_since: DateTime<Utc>,
    cursor: Option<&str>,
) -> Result<Resolution> {
    let mut request_cursor = cursor.map(str::to_string);
    let mut newer: Option<Contender> = None;
    let mut latest: Option<Contender> = None;
    let mut seen_any = false;

    loop {
        let page = source.page(request_cursor.as_deref()).await?;
        if page.feed.is_empty() {
            break;
        }

        for item in page.feed {
            if !item.is_original_by(source.author()) {
                continue;
            }
            seen_any = true;
            if item.post.created_at() < judge_since {
                return Ok(settle(latest, newer));
            }
            newer = latest.take();
            latest = Some(Contender {
                post: item.post,
                cursor: request_cursor.clone(),
            });
        }

        match page.cursor {
            Some(next) if !next.is_empty() && request_cursor.as_deref() != Some(next.as_str()) => {
                request_cursor = Some(next);
            }
            _ => break,
        }
    }

    if !seen_any {
        return Ok(Resolution::Empty);
    }
    Ok(settle(latest, newer))
}

fn settle(latest: Option<Contender>, newer: Option<Contender>) -> Resolution {
    match latest {
        None => Resolution::UpToDate,
        Some(target) => Resolution::Target {
            post: target.post,
            cursor: newer.and_then(|c| c.cursor),
        },
    }
}
