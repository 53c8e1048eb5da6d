//! Typed models for the slice of the v1.1 REST API this workspace touches.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One status as the v1.1 timeline renders it. Only the fields pruning
/// needs are modeled; everything else in the payload is ignored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tweet {
    pub id: u64,
    /// Decimal form of `id`. v1.1 sends both because `id` overflows
    /// double-precision JSON consumers; prefer this for display.
    pub id_str: String,
    pub text: String,
    #[serde(with = "created_at_format")]
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub user: Option<TweetUser>,
    /// Present when the status is a retweet; holds the original.
    #[serde(default)]
    pub retweeted_status: Option<Box<Tweet>>,
    #[serde(default)]
    pub retweet_count: Option<u64>,
    #[serde(default)]
    pub favorite_count: Option<u64>,
}

impl Tweet {
    pub fn is_retweet(&self) -> bool {
        self.retweeted_status.is_some()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TweetUser {
    pub id: u64,
    pub screen_name: String,
    #[serde(default)]
    pub name: Option<String>,
}

impl ebb_prune::Prunable for Tweet {
    fn id(&self) -> u64 {
        self.id
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

/// Options for one timeline page request.
#[derive(Debug, Clone)]
pub struct TimelineQuery {
    /// Page size; the API caps this at 200.
    pub count: u32,
    /// Ask for retweets to come back as full statuses instead of being
    /// silently dropped from the page.
    pub include_rts: bool,
    /// Only return statuses with an id at or below this value.
    pub max_id: Option<u64>,
}

impl Default for TimelineQuery {
    fn default() -> Self {
        Self {
            count: 200,
            include_rts: true,
            max_id: None,
        }
    }
}

/// v1.1 timestamps look like `Wed Aug 27 13:08:45 +0000 2008`.
pub(crate) mod created_at_format {
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    const FORMAT: &str = "%a %b %d %H:%M:%S %z %Y";

    pub fn serialize<S>(date: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&date.format(FORMAT).to_string())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        DateTime::parse_from_str(&s, FORMAT)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn parses_a_v1_timeline_status() {
        let body = r#"{
            "created_at": "Wed Aug 27 13:08:45 +0000 2008",
            "id": 893574965,
            "id_str": "893574965",
            "text": "testing",
            "user": {"id": 12, "screen_name": "whomever", "name": "Whom Ever"},
            "retweet_count": 3,
            "favorite_count": 7
        }"#;
        let tweet: Tweet = serde_json::from_str(body).unwrap();
        assert_eq!(tweet.id, 893574965);
        assert_eq!(tweet.id_str, "893574965");
        assert_eq!(
            tweet.created_at,
            Utc.with_ymd_and_hms(2008, 8, 27, 13, 8, 45).unwrap()
        );
        assert_eq!(tweet.user.as_ref().unwrap().screen_name, "whomever");
        assert!(!tweet.is_retweet());
    }

    #[test]
    fn nested_retweets_mark_the_status() {
        let body = r#"{
            "created_at": "Mon Jan 06 10:00:00 +0000 2020",
            "id": 2,
            "id_str": "2",
            "text": "RT @someone: original",
            "retweeted_status": {
                "created_at": "Sun Jan 05 09:00:00 +0000 2020",
                "id": 1,
                "id_str": "1",
                "text": "original"
            }
        }"#;
        let tweet: Tweet = serde_json::from_str(body).unwrap();
        assert!(tweet.is_retweet());
        assert_eq!(tweet.retweeted_status.unwrap().id, 1);
    }

    #[test]
    fn offset_timestamps_normalize_to_utc() {
        let body = r#"{
            "created_at": "Wed Aug 27 13:08:45 +0200 2008",
            "id": 1,
            "id_str": "1",
            "text": "offset"
        }"#;
        let tweet: Tweet = serde_json::from_str(body).unwrap();
        assert_eq!(
            tweet.created_at,
            Utc.with_ymd_and_hms(2008, 8, 27, 11, 8, 45).unwrap()
        );
    }

    #[test]
    fn created_at_round_trips_through_the_wire_format() {
        let original = r#"{"created_at":"Wed Aug 27 13:08:45 +0000 2008","id":1,"id_str":"1","text":"x"}"#;
        let tweet: Tweet = serde_json::from_str(original).unwrap();
        let serialized = serde_json::to_string(&tweet).unwrap();
        assert!(serialized.contains("Wed Aug 27 13:08:45 +0000 2008"));
    }

    #[test]
    fn malformed_timestamps_are_decode_errors() {
        let body = r#"{"created_at":"2008-08-27T13:08:45Z","id":1,"id_str":"1","text":"x"}"#;
        assert!(serde_json::from_str::<Tweet>(body).is_err());
    }
}
