//! Minimal wrapper around the Twitter/X v1.1 REST API.
//!
//! Handles signing, request parameter shaping, and id clamping before
//! delegating to the shared HTTP client. Calls carry a zero retry budget:
//! the pruning engine treats any failure as fatal for the run, and a
//! deletion pass should never hammer a rate-limited endpoint.
use std::borrow::Cow;

use ebb_common::{EbbError, Result};
use ebb_http::{Auth, HttpClient, OAuth1Token, RequestOpts};

use crate::twitter::types::{TimelineQuery, Tweet};

const TWITTER_API_BASE: &str = "https://api.twitter.com";
/// Hard cap on `count` for `statuses/user_timeline`.
const MAX_PAGE_SIZE: u32 = 200;

#[derive(Clone, Debug)]
pub struct TwitterApi {
    http: HttpClient,
    token: OAuth1Token,
}

impl TwitterApi {
    pub fn new(token: OAuth1Token) -> Self {
        let http = HttpClient::new(TWITTER_API_BASE).expect("twitter base url");
        Self { http, token }
    }

    /// Point the client at a different host. Tests aim this at a local
    /// mock server.
    pub fn with_base_url(token: OAuth1Token, base: impl AsRef<str>) -> Result<Self> {
        let http = HttpClient::new(base).map_err(http_to_ebb)?;
        Ok(Self { http, token })
    }

    /// Fetch one page of the account's timeline, newest first.
    ///
    /// `max_id` is inclusive on the wire, so callers stepping through
    /// history pass `oldest_seen - 1` to avoid refetching the boundary
    /// status.
    pub async fn user_timeline(
        &self,
        screen_name: &str,
        query: &TimelineQuery,
    ) -> Result<Vec<Tweet>> {
        let count = query.count.clamp(1, MAX_PAGE_SIZE);
        let mut params: Vec<(&str, Cow<'_, str>)> = vec![
            ("screen_name", screen_name.into()),
            ("count", count.to_string().into()),
            (
                "include_rts",
                if query.include_rts { "true" } else { "false" }.into(),
            ),
        ];
        if let Some(max_id) = query.max_id {
            params.push(("max_id", max_id.to_string().into()));
        }

        let tweets: Vec<Tweet> = self
            .http
            .get_json(
                "1.1/statuses/user_timeline.json",
                RequestOpts {
                    auth: Auth::OAuth1(&self.token),
                    query: Some(params),
                    retries: Some(0),
                    ..Default::default()
                },
            )
            .await
            .map_err(http_to_ebb)?;

        tracing::debug!(
            event = "twitter.timeline.page",
            screen_name,
            returned = tweets.len(),
            max_id = ?query.max_id,
            "fetched timeline page"
        );
        Ok(tweets)
    }

    /// Delete one status. The API echoes the deleted status back.
    pub async fn destroy_status(&self, id: u64) -> Result<Tweet> {
        let path = format!("1.1/statuses/destroy/{id}.json");
        let deleted: Tweet = self
            .http
            .post_json(
                &path,
                RequestOpts {
                    auth: Auth::OAuth1(&self.token),
                    retries: Some(0),
                    ..Default::default()
                },
            )
            .await
            .map_err(http_to_ebb)?;

        tracing::info!(event = "twitter.status.destroyed", id, "deleted status");
        Ok(deleted)
    }

    /// Delete the given statuses in order, stopping at the first failure.
    pub async fn destroy_all(&self, tweets: &[Tweet]) -> Result<()> {
        for tweet in tweets {
            self.destroy_status(tweet.id).await?;
        }
        Ok(())
    }
}

fn http_to_ebb(err: ebb_http::HttpError) -> EbbError {
    EbbError::Api(anyhow::Error::new(err))
}
