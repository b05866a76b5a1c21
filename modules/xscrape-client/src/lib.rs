pub mod error;
pub mod session;
pub mod types;

pub use error::{Result, ScrapeError};
pub use session::{
    select_provider, LoginProvider, SeededCookieProvider, Session, SessionFileProvider,
    SessionProvider, BROWSER_COOKIE_FILE, SESSION_FILE,
};
pub use types::{Credentials, SearchInput};

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use reqwest::header;
use serde_json::{json, Value};
use tracing::{debug, info, warn};

/// Public web-app bearer token; the search endpoint rejects requests
/// without it.
pub(crate) const BEARER_TOKEN: &str = "AAAAAAAAAAAAAAAAAAAAANRILgAAAAAAnNwIzUejRCOuH5E6I8xnZz4puTs%3D1Zv7ttfk8LF81IUq16cHjhLTvJu4FA33AGWWjCpTnA";
pub(crate) const USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

const SEARCH_ENDPOINT: &str = "https://x.com/i/api/graphql/nK1dw4oV3k4w5TdtcAdSww/SearchTimeline";
const PAGE_SIZE: u32 = 20;

/// Feature flags the GraphQL endpoint insists on receiving.
const SEARCH_FEATURES: &str = r#"{"rweb_tipjar_consumption_enabled":true,"responsive_web_graphql_exclude_directive_enabled":true,"verified_phone_label_enabled":false,"creator_subscriptions_tweet_preview_api_enabled":true,"responsive_web_graphql_timeline_navigation_enabled":true,"responsive_web_graphql_skip_user_profile_image_extensions_enabled":false,"communities_web_enable_tweet_community_results_fetch":true,"c9s_tweet_anatomy_moderator_badge_enabled":true,"articles_preview_enabled":true,"tweet_awards_web_tipping_enabled":false,"creator_subscriptions_quote_tweet_preview_enabled":false,"freedom_of_speech_not_reach_fetch_enabled":true,"standardized_nudges_misinfo":true,"tweet_with_visibility_results_prefer_gql_limited_actions_policy_enabled":true,"rweb_video_timestamps_enabled":true,"longform_notetweets_consumption_enabled":true,"longform_notetweets_rich_text_read_enabled":true,"longform_notetweets_inline_media_enabled":true,"responsive_web_enhance_cards_enabled":false,"responsive_web_twitter_article_tweet_consumption_enabled":true}"#;

/// Blocking search client over an authenticated session.
pub struct SearchClient {
    client: reqwest::blocking::Client,
    session: Session,
    save_dir: Option<PathBuf>,
}

impl SearchClient {
    /// Build a client from a session. The session must carry auth cookies;
    /// a guest session cannot query the search timeline.
    pub fn new(session: Session) -> Result<Self> {
        if !session.is_authenticated() {
            return Err(ScrapeError::Session(
                "session is missing auth_token/ct0 cookies".into(),
            ));
        }
        let client = reqwest::blocking::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self {
            client,
            session,
            save_dir: None,
        })
    }

    /// Also write each query's raw entries to `<dir>/<query>.json`.
    pub fn with_save_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.save_dir = Some(dir.into());
        self
    }

    /// Run every query and return one batch of raw timeline entries per
    /// query, in input order. `limit` caps tweet entries per query;
    /// `retries` bounds repeat attempts on failed and empty pages.
    pub fn run(
        &self,
        queries: &[SearchInput],
        limit: u32,
        retries: u32,
    ) -> Result<Vec<Vec<Value>>> {
        let mut batches = Vec::with_capacity(queries.len());
        for query in queries {
            info!(query = %query.query, category = %query.category, limit, "search: running query");
            let entries = self.run_query(query, limit, retries)?;
            info!(query = %query.query, entries = entries.len(), "search: query finished");
            if let Some(dir) = &self.save_dir {
                save_batch(dir, &query.query, &entries)?;
            }
            batches.push(entries);
        }
        Ok(batches)
    }

    fn run_query(&self, query: &SearchInput, limit: u32, retries: u32) -> Result<Vec<Value>> {
        let mut entries: Vec<Value> = Vec::new();
        let mut cursor: Option<String> = None;
        let mut tweets_seen = 0u32;
        let mut attempts = 0u32;

        while tweets_seen < limit {
            let page = match self.fetch_page(query, cursor.as_deref()) {
                Ok(page) => page,
                Err(e) => {
                    attempts += 1;
                    if attempts > retries {
                        return Err(e);
                    }
                    warn!(query = %query.query, attempt = attempts, error = %e, "search: page failed, retrying");
                    std::thread::sleep(backoff(attempts));
                    continue;
                }
            };

            let (page_entries, next_cursor) = collect_entries(&page);
            let new_tweets = page_entries.iter().filter(|e| is_tweet_entry(e)).count() as u32;
            tweets_seen += new_tweets;
            entries.extend(page_entries);

            match next_cursor {
                Some(next) if cursor.as_deref() != Some(next.as_str()) => cursor = Some(next),
                _ => {
                    debug!(query = %query.query, "search: pagination exhausted");
                    break;
                }
            }

            if new_tweets == 0 {
                attempts += 1;
                if attempts > retries {
                    debug!(query = %query.query, "search: no new results, giving up");
                    break;
                }
                std::thread::sleep(backoff(attempts));
            }
        }

        Ok(entries)
    }

    fn fetch_page(&self, query: &SearchInput, cursor: Option<&str>) -> Result<Value> {
        let mut variables = json!({
            "rawQuery": query.query,
            "count": PAGE_SIZE,
            "querySource": "typed_query",
            "product": query.category,
        });
        if let Some(cursor) = cursor {
            variables["cursor"] = Value::String(cursor.to_string());
        }

        let resp = self
            .client
            .get(SEARCH_ENDPOINT)
            .bearer_auth(BEARER_TOKEN)
            .header(header::COOKIE, self.session.cookie_header())
            .header("x-csrf-token", self.session.csrf_token().unwrap_or_default())
            .query(&[
                ("variables", serde_json::to_string(&variables)?),
                ("features", SEARCH_FEATURES.to_string()),
            ])
            .send()?;

        let status = resp.status();
        if !status.is_success() {
            return Err(ScrapeError::Api {
                status: status.as_u16(),
                message: resp.text().unwrap_or_default(),
            });
        }
        Ok(resp.json()?)
    }
}

/// Pull timeline entries and the bottom cursor out of one search response.
/// Cursor entries stay in the batch; downstream extraction skips them.
pub(crate) fn collect_entries(response: &Value) -> (Vec<Value>, Option<String>) {
    let mut entries = Vec::new();
    let mut cursor = None;

    let instructions = response
        .pointer("/data/search_by_raw_query/search_timeline/timeline/instructions")
        .and_then(Value::as_array);
    let Some(instructions) = instructions else {
        return (entries, cursor);
    };

    for instruction in instructions {
        match instruction.get("type").and_then(Value::as_str) {
            Some("TimelineAddEntries") => {
                for entry in instruction
                    .get("entries")
                    .and_then(Value::as_array)
                    .into_iter()
                    .flatten()
                {
                    if let Some(value) = bottom_cursor(entry) {
                        cursor = Some(value);
                    }
                    entries.push(entry.clone());
                }
            }
            Some("TimelineReplaceEntry") => {
                if let Some(value) = instruction.get("entry").and_then(bottom_cursor) {
                    cursor = Some(value);
                }
            }
            _ => {}
        }
    }

    (entries, cursor)
}

fn bottom_cursor(entry: &Value) -> Option<String> {
    let content = entry.get("content")?;
    if content.get("entryType").and_then(Value::as_str) != Some("TimelineTimelineCursor") {
        return None;
    }
    if content.get("cursorType").and_then(Value::as_str) != Some("Bottom") {
        return None;
    }
    content.get("value").and_then(Value::as_str).map(str::to_string)
}

fn is_tweet_entry(entry: &Value) -> bool {
    entry
        .get("entryId")
        .and_then(Value::as_str)
        .map(|id| id.starts_with("tweet-"))
        .unwrap_or(false)
}

fn save_batch(dir: &Path, query: &str, entries: &[Value]) -> Result<()> {
    fs::create_dir_all(dir)?;
    let path = dir.join(format!("{}.json", sanitize_file_name(query)));
    fs::write(&path, serde_json::to_string_pretty(entries)?)?;
    info!(path = %path.display(), "search: saved raw results");
    Ok(())
}

fn sanitize_file_name(query: &str) -> String {
    let cleaned: String = query
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    if cleaned.is_empty() {
        "query".to_string()
    } else {
        cleaned
    }
}

fn backoff(attempt: u32) -> Duration {
    Duration::from_secs(2u64.saturating_pow(attempt.min(5)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn timeline_response(entries: Value) -> Value {
        json!({
            "data": { "search_by_raw_query": { "search_timeline": { "timeline": {
                "instructions": [
                    { "type": "TimelineAddEntries", "entries": entries }
                ]
            }}}}
        })
    }

    #[test]
    fn collects_entries_and_bottom_cursor() {
        let response = timeline_response(json!([
            { "entryId": "tweet-1", "content": { "entryType": "TimelineTimelineItem" } },
            { "entryId": "tweet-2", "content": { "entryType": "TimelineTimelineItem" } },
            { "entryId": "cursor-top-0", "content": {
                "entryType": "TimelineTimelineCursor", "cursorType": "Top", "value": "TOP"
            }},
            { "entryId": "cursor-bottom-0", "content": {
                "entryType": "TimelineTimelineCursor", "cursorType": "Bottom", "value": "NEXT"
            }}
        ]));

        let (entries, cursor) = collect_entries(&response);
        assert_eq!(entries.len(), 4);
        assert_eq!(cursor.as_deref(), Some("NEXT"));
    }

    #[test]
    fn replace_entry_instruction_updates_the_cursor() {
        let response = json!({
            "data": { "search_by_raw_query": { "search_timeline": { "timeline": {
                "instructions": [
                    { "type": "TimelineReplaceEntry", "entry": {
                        "entryId": "cursor-bottom-0",
                        "content": {
                            "entryType": "TimelineTimelineCursor",
                            "cursorType": "Bottom",
                            "value": "REPLACED"
                        }
                    }}
                ]
            }}}}
        });

        let (entries, cursor) = collect_entries(&response);
        assert!(entries.is_empty());
        assert_eq!(cursor.as_deref(), Some("REPLACED"));
    }

    #[test]
    fn malformed_response_yields_nothing() {
        let (entries, cursor) = collect_entries(&json!({ "data": {} }));
        assert!(entries.is_empty());
        assert!(cursor.is_none());
    }

    #[test]
    fn tweet_entries_are_identified_by_id_prefix() {
        assert!(is_tweet_entry(&json!({ "entryId": "tweet-123" })));
        assert!(!is_tweet_entry(&json!({ "entryId": "cursor-bottom-0" })));
        assert!(!is_tweet_entry(&json!({ "entryId": "promoted-tweet-1" })));
        assert!(!is_tweet_entry(&json!({})));
    }

    #[test]
    fn unauthenticated_session_is_rejected() {
        let session = Session::from_json(r#"{"guest_id": "g"}"#).unwrap();
        assert!(matches!(
            SearchClient::new(session),
            Err(ScrapeError::Session(_))
        ));
    }

    #[test]
    fn file_names_are_sanitized() {
        assert_eq!(sanitize_file_name("#Rust lang!"), "_Rust_lang_");
        assert_eq!(sanitize_file_name("plain"), "plain");
        assert_eq!(sanitize_file_name("???"), "___");
    }
}
