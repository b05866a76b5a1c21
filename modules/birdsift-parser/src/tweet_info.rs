// Lossy extraction used by the search API responses. Unlike the batch
// normalizer this is total: anything malformed leaves the defaults in place
// and there is no error-record fallback.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Tweet summary returned by the search API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TweetInfo {
    pub tweet_id: String,
    pub text: String,
    pub user_name: Option<String>,
    pub user_screen_name: Option<String>,
    /// Raw upstream timestamp, not reformatted.
    pub created_at: Option<String>,
    pub retweet_count: Option<i64>,
    pub favorite_count: Option<i64>,
}

impl Default for TweetInfo {
    fn default() -> Self {
        Self {
            tweet_id: "unknown".to_string(),
            text: String::new(),
            user_name: None,
            user_screen_name: None,
            created_at: None,
            retweet_count: None,
            favorite_count: None,
        }
    }
}

/// Extract a `TweetInfo` from one raw timeline entry. Entries that are not
/// tweets (cursors, ads, junk) come back with the `"unknown"` id so callers
/// can drop them.
pub fn extract_tweet_info(entry: &Value) -> TweetInfo {
    let mut info = TweetInfo::default();

    let result = entry
        .get("content")
        .and_then(|c| c.get("itemContent"))
        .and_then(|c| c.get("tweet_results"))
        .and_then(|r| r.get("result"));
    let Some(result) = result else {
        return info;
    };

    if let Some(rest_id) = result.get("rest_id") {
        match rest_id {
            Value::String(id) => info.tweet_id = id.clone(),
            Value::Number(id) => info.tweet_id = id.to_string(),
            _ => {}
        }
    }

    if let Some(legacy) = result.get("legacy") {
        info.text = legacy
            .get("full_text")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        info.created_at = legacy
            .get("created_at")
            .and_then(Value::as_str)
            .map(str::to_string);
        info.retweet_count = legacy.get("retweet_count").and_then(Value::as_i64);
        info.favorite_count = legacy.get("favorite_count").and_then(Value::as_i64);

        if let Some(user_legacy) = result
            .get("core")
            .and_then(|c| c.get("user_results"))
            .and_then(|u| u.get("result"))
            .and_then(|r| r.get("legacy"))
        {
            info.user_name = user_legacy
                .get("name")
                .and_then(Value::as_str)
                .map(str::to_string);
            info.user_screen_name = user_legacy
                .get("screen_name")
                .and_then(Value::as_str)
                .map(str::to_string);
        }
    }

    info
}
