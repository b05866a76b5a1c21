// Normalization of raw search-timeline entries into flat tweet records.
// One entry in, one record out: a malformed entry becomes an error record
// instead of aborting the batch.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// Timestamp format used by the upstream timeline payloads.
const SOURCE_DATE_FORMAT: &str = "%a %b %d %H:%M:%S +0000 %Y";
const OUTPUT_DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

type JsonObject = Map<String, Value>;

/// Structural fault while descending into an entry. Missing keys are fine
/// (they resolve to defaults); a present node of the wrong JSON type is not.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("expected an object at {0}")]
    NotAnObject(String),
    #[error("expected an array at {0}")]
    NotAnArray(String),
}

/// A media attachment with both its type and URL present.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaItem {
    #[serde(rename = "type")]
    pub media_type: String,
    pub url: String,
}

/// Flat record extracted from one timeline entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedTweet {
    /// `null` when the source entry carries no legacy id.
    pub tweet_id: Option<String>,
    pub username: String,
    pub display_name: String,
    /// `YYYY-MM-DD HH:MM:SS` when the source timestamp parses, otherwise the
    /// raw source string, otherwise empty.
    pub date: String,
    pub text: String,
    pub likes: i64,
    pub retweets: i64,
    pub replies: i64,
    pub media: Vec<MediaItem>,
    pub hashtags: Vec<String>,
    pub urls: Vec<String>,
}

/// Output unit of the batch pipeline: either a tweet or an error marker.
/// Partial records are never emitted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParsedRecord {
    Tweet(ParsedTweet),
    Error { error: String },
}

/// Normalize one raw timeline entry. Never fails: extraction faults collapse
/// the whole record into `ParsedRecord::Error`.
pub fn parse_tweet_entry(entry: &Value) -> ParsedRecord {
    match extract_tweet(entry) {
        Ok(tweet) => ParsedRecord::Tweet(tweet),
        Err(e) => ParsedRecord::Error {
            error: e.to_string(),
        },
    }
}

fn extract_tweet(entry: &Value) -> Result<ParsedTweet, ExtractError> {
    let entry = match entry.as_object() {
        Some(obj) => obj,
        None => return Err(ExtractError::NotAnObject("entry".into())),
    };

    let content = child_object(Some(entry), "content", "content")?;
    let item_content = child_object(content, "itemContent", "content.itemContent")?;
    let tweet_results = child_object(
        item_content,
        "tweet_results",
        "content.itemContent.tweet_results",
    )?;
    let result = child_object(tweet_results, "result", "tweet_results.result")?;
    let legacy = child_object(result, "legacy", "result.legacy")?;

    let tweet_id = opt_string(legacy, "id_str");
    let text = string_or_empty(legacy, "full_text");
    let date = format_date(&string_or_empty(legacy, "created_at"));

    let core = child_object(result, "core", "result.core")?;
    let user_results = child_object(core, "user_results", "core.user_results")?;
    let user_result = child_object(user_results, "result", "core.user_results.result")?;
    let user_legacy = child_object(user_result, "legacy", "user_results.result.legacy")?;
    let username = string_or_empty(user_legacy, "screen_name");
    let display_name = string_or_empty(user_legacy, "name");

    let likes = int_or_zero(legacy, "favorite_count");
    let retweets = int_or_zero(legacy, "retweet_count");
    let replies = int_or_zero(legacy, "reply_count");

    // Media items need both fields; incomplete ones are dropped, not defaulted.
    let extended = child_object(legacy, "extended_entities", "legacy.extended_entities")?;
    let mut media = Vec::new();
    for item in child_array(extended, "media", "extended_entities.media")? {
        let item = item
            .as_object()
            .ok_or_else(|| ExtractError::NotAnObject("extended_entities.media item".into()))?;
        let media_type = string_or_empty(Some(item), "type");
        let url = string_or_empty(Some(item), "media_url_https");
        if !media_type.is_empty() && !url.is_empty() {
            media.push(MediaItem { media_type, url });
        }
    }

    // Hashtags and URLs keep a per-item empty default instead.
    let entities = child_object(legacy, "entities", "legacy.entities")?;
    let mut hashtags = Vec::new();
    for tag in child_array(entities, "hashtags", "entities.hashtags")? {
        let tag = tag
            .as_object()
            .ok_or_else(|| ExtractError::NotAnObject("entities.hashtags item".into()))?;
        hashtags.push(string_or_empty(Some(tag), "text"));
    }
    let mut urls = Vec::new();
    for url in child_array(entities, "urls", "entities.urls")? {
        let url = url
            .as_object()
            .ok_or_else(|| ExtractError::NotAnObject("entities.urls item".into()))?;
        urls.push(string_or_empty(Some(url), "expanded_url"));
    }

    Ok(ParsedTweet {
        tweet_id,
        username,
        display_name,
        date,
        text,
        likes,
        retweets,
        replies,
        media,
        hashtags,
        urls,
    })
}

/// Descend one level. An absent parent or key yields `None`; a present value
/// that is not an object is a structural fault.
fn child_object<'a>(
    parent: Option<&'a JsonObject>,
    key: &str,
    path: &str,
) -> Result<Option<&'a JsonObject>, ExtractError> {
    match parent.and_then(|p| p.get(key)) {
        None => Ok(None),
        Some(Value::Object(obj)) => Ok(Some(obj)),
        Some(_) => Err(ExtractError::NotAnObject(path.into())),
    }
}

fn child_array<'a>(
    parent: Option<&'a JsonObject>,
    key: &str,
    path: &str,
) -> Result<&'a [Value], ExtractError> {
    match parent.and_then(|p| p.get(key)) {
        None => Ok(&[]),
        Some(Value::Array(items)) => Ok(items),
        Some(_) => Err(ExtractError::NotAnArray(path.into())),
    }
}

fn string_or_empty(parent: Option<&JsonObject>, key: &str) -> String {
    parent
        .and_then(|p| p.get(key))
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

fn opt_string(parent: Option<&JsonObject>, key: &str) -> Option<String> {
    parent
        .and_then(|p| p.get(key))
        .and_then(Value::as_str)
        .map(str::to_string)
}

fn int_or_zero(parent: Option<&JsonObject>, key: &str) -> i64 {
    parent
        .and_then(|p| p.get(key))
        .and_then(Value::as_i64)
        .unwrap_or(0)
}

fn format_date(created_at: &str) -> String {
    match NaiveDateTime::parse_from_str(created_at, SOURCE_DATE_FORMAT) {
        Ok(parsed) => parsed.format(OUTPUT_DATE_FORMAT).to_string(),
        Err(_) => created_at.to_string(),
    }
}
