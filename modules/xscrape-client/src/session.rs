// Session acquisition for the X/Twitter private API. Three cookie sources,
// tried in a fixed order by `select_provider`: an exported browser cookie
// file, a previously saved session file, credential login.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use reqwest::header;
use serde_json::{json, Value};
use tracing::{debug, info};

use crate::error::{Result, ScrapeError};
use crate::types::Credentials;
use crate::{BEARER_TOKEN, USER_AGENT};

/// Cookie file exported from a logged-in browser.
pub const BROWSER_COOKIE_FILE: &str = "twitter_browser_cookies.json";
/// Session file written after a successful credential login.
pub const SESSION_FILE: &str = "twitter_session.cookies";

const AUTH_API_BASE: &str = "https://api.x.com/1.1";
const MAX_LOGIN_STEPS: usize = 10;

/// A cookie set for x.com, authenticated or not.
#[derive(Debug, Clone, Default)]
pub struct Session {
    cookies: BTreeMap<String, String>,
}

impl Session {
    pub fn from_cookies(cookies: BTreeMap<String, String>) -> Self {
        Self { cookies }
    }

    /// Parse the JSON cookie-map format shared by both on-disk artifacts.
    pub fn from_json(raw: &str) -> Result<Self> {
        let map: BTreeMap<String, Value> = serde_json::from_str(raw)?;
        let cookies = map
            .into_iter()
            .map(|(name, value)| {
                let value = match value {
                    Value::String(s) => s,
                    other => other.to_string(),
                };
                (name, value)
            })
            .collect();
        Ok(Self { cookies })
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.cookies)?)
    }

    /// Value for the `Cookie` request header.
    pub fn cookie_header(&self) -> String {
        self.cookies
            .iter()
            .map(|(name, value)| format!("{name}={value}"))
            .collect::<Vec<_>>()
            .join("; ")
    }

    /// CSRF token. The API requires the `x-csrf-token` header to mirror the
    /// `ct0` cookie.
    pub fn csrf_token(&self) -> Option<&str> {
        self.cookies.get("ct0").map(String::as_str)
    }

    pub fn is_authenticated(&self) -> bool {
        self.cookies.contains_key("auth_token") && self.cookies.contains_key("ct0")
    }

    pub fn is_empty(&self) -> bool {
        self.cookies.is_empty()
    }

    fn absorb_response_cookies(&mut self, response: &reqwest::blocking::Response) {
        for value in response.headers().get_all(header::SET_COOKIE) {
            let Ok(raw) = value.to_str() else { continue };
            let Some(pair) = raw.split(';').next() else { continue };
            if let Some((name, value)) = pair.split_once('=') {
                self.cookies
                    .insert(name.trim().to_string(), value.trim().to_string());
            }
        }
    }
}

/// Source of a session. Implementations differ only in where the cookies
/// come from, which keeps callers mockable and the selection testable.
pub trait SessionProvider: Send + Sync {
    fn acquire(&self) -> Result<Session>;

    /// Short label for logs.
    fn describe(&self) -> &'static str;
}

/// Reads a browser-exported cookie file.
pub struct SeededCookieProvider {
    path: PathBuf,
}

impl SeededCookieProvider {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

impl SessionProvider for SeededCookieProvider {
    fn acquire(&self) -> Result<Session> {
        info!(path = %self.path.display(), "using browser-generated cookies");
        Session::from_json(&fs::read_to_string(&self.path)?)
    }

    fn describe(&self) -> &'static str {
        "browser cookie file"
    }
}

/// Reads a session file saved by a previous login.
pub struct SessionFileProvider {
    path: PathBuf,
}

impl SessionFileProvider {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

impl SessionProvider for SessionFileProvider {
    fn acquire(&self) -> Result<Session> {
        info!(path = %self.path.display(), "using existing session file");
        Session::from_json(&fs::read_to_string(&self.path)?)
    }

    fn describe(&self) -> &'static str {
        "session file"
    }
}

/// Logs in with account credentials and saves the session for next time.
pub struct LoginProvider {
    credentials: Credentials,
    session_path: PathBuf,
}

impl LoginProvider {
    pub fn new(credentials: Credentials, session_path: PathBuf) -> Self {
        Self {
            credentials,
            session_path,
        }
    }
}

impl SessionProvider for LoginProvider {
    fn acquire(&self) -> Result<Session> {
        info!("no session file found, using direct login");
        let session = login(&self.credentials)?;
        fs::write(&self.session_path, session.to_json()?)?;
        info!(path = %self.session_path.display(), "session saved for future use");
        Ok(session)
    }

    fn describe(&self) -> &'static str {
        "credential login"
    }
}

/// Pick the session source: browser cookie export first, then a saved
/// session, then credential login.
pub fn select_provider(dir: &Path, credentials: Credentials) -> Box<dyn SessionProvider> {
    let browser = dir.join(BROWSER_COOKIE_FILE);
    if browser.is_file() {
        return Box::new(SeededCookieProvider::new(browser));
    }
    let session = dir.join(SESSION_FILE);
    if session.is_file() {
        return Box::new(SessionFileProvider::new(session));
    }
    Box::new(LoginProvider::new(credentials, session))
}

struct FlowState {
    flow_token: String,
    subtasks: Vec<String>,
}

/// Credential login against the onboarding flow: activate a guest token,
/// then answer subtasks until the flow reports success. Auth cookies arrive
/// via Set-Cookie along the way.
fn login(credentials: &Credentials) -> Result<Session> {
    let client = reqwest::blocking::Client::builder()
        .user_agent(USER_AGENT)
        .build()?;
    let mut session = Session::default();

    let resp = client
        .post(format!("{AUTH_API_BASE}/guest/activate.json"))
        .bearer_auth(BEARER_TOKEN)
        .send()?;
    session.absorb_response_cookies(&resp);
    let status = resp.status();
    if !status.is_success() {
        return Err(ScrapeError::Api {
            status: status.as_u16(),
            message: resp.text().unwrap_or_default(),
        });
    }
    let body: Value = resp.json()?;
    let guest_token = body
        .get("guest_token")
        .and_then(Value::as_str)
        .ok_or_else(|| ScrapeError::Login("guest token missing from activate response".into()))?
        .to_string();

    let flow_url = format!("{AUTH_API_BASE}/onboarding/task.json");
    let init = json!({
        "input_flow_data": {
            "flow_context": {
                "debug_overrides": {},
                "start_location": { "location": "splash_screen" }
            }
        },
        "subtask_versions": {}
    });
    let resp = client
        .post(format!("{flow_url}?flow_name=login"))
        .bearer_auth(BEARER_TOKEN)
        .header("x-guest-token", &guest_token)
        .json(&init)
        .send()?;
    let mut state = flow_response(&mut session, resp)?;

    for _ in 0..MAX_LOGIN_STEPS {
        if state.subtasks.iter().any(|s| s == "DenyLoginSubtask") {
            return Err(ScrapeError::Login("login denied by the service".into()));
        }
        if state.subtasks.iter().any(|s| s == "LoginSuccessSubtask") {
            if session.is_authenticated() {
                return Ok(session);
            }
            return Err(ScrapeError::Login(
                "flow succeeded but auth cookies are missing".into(),
            ));
        }

        let (subtask_id, input) = state
            .subtasks
            .iter()
            .find_map(|s| subtask_input(s, credentials).map(|input| (s.clone(), input)))
            .ok_or_else(|| {
                ScrapeError::Login(format!("unsupported login subtasks: {:?}", state.subtasks))
            })?;
        debug!(subtask = %subtask_id, "answering login subtask");

        let payload = json!({
            "flow_token": state.flow_token,
            "subtask_inputs": [input]
        });
        let mut request = client
            .post(&flow_url)
            .bearer_auth(BEARER_TOKEN)
            .header("x-guest-token", &guest_token)
            .json(&payload);
        if !session.is_empty() {
            request = request.header(header::COOKIE, session.cookie_header());
        }
        state = flow_response(&mut session, request.send()?)?;
    }

    Err(ScrapeError::Login("login flow did not converge".into()))
}

fn flow_response(session: &mut Session, resp: reqwest::blocking::Response) -> Result<FlowState> {
    session.absorb_response_cookies(&resp);
    let status = resp.status();
    if !status.is_success() {
        return Err(ScrapeError::Api {
            status: status.as_u16(),
            message: resp.text().unwrap_or_default(),
        });
    }
    let body: Value = resp.json()?;
    let flow_token = body
        .get("flow_token")
        .and_then(Value::as_str)
        .ok_or_else(|| ScrapeError::Login("flow token missing from response".into()))?
        .to_string();
    let subtasks = body
        .get("subtasks")
        .and_then(Value::as_array)
        .map(|list| {
            list.iter()
                .filter_map(|s| s.get("subtask_id").and_then(Value::as_str))
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();
    Ok(FlowState { flow_token, subtasks })
}

/// Canned answer for one login subtask, or `None` for subtasks this client
/// cannot handle (two-factor challenges among them).
fn subtask_input(subtask_id: &str, credentials: &Credentials) -> Option<Value> {
    let input = match subtask_id {
        "LoginJsInstrumentationSubtask" => json!({
            "subtask_id": subtask_id,
            "js_instrumentation": { "response": "{}", "link": "next_link" }
        }),
        "LoginEnterUserIdentifierSSO" => json!({
            "subtask_id": subtask_id,
            "settings_list": {
                "setting_responses": [{
                    "key": "user_identifier",
                    "response_data": { "text_data": { "result": credentials.username } }
                }],
                "link": "next_link"
            }
        }),
        "LoginEnterAlternateIdentifierSubtask" | "LoginAcid" => json!({
            "subtask_id": subtask_id,
            "enter_text": { "text": credentials.email, "link": "next_link" }
        }),
        "LoginEnterPassword" => json!({
            "subtask_id": subtask_id,
            "enter_password": { "password": credentials.password, "link": "next_link" }
        }),
        "AccountDuplicationCheck" => json!({
            "subtask_id": subtask_id,
            "check_logged_in_account": { "link": "AccountDuplicationCheck_false" }
        }),
        _ => return None,
    };
    Some(input)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn credentials() -> Credentials {
        Credentials {
            email: "account@example.com".to_string(),
            username: "account".to_string(),
            password: "hunter2".to_string(),
        }
    }

    #[test]
    fn browser_cookie_file_wins() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(BROWSER_COOKIE_FILE), "{}").unwrap();
        fs::write(dir.path().join(SESSION_FILE), "{}").unwrap();

        let provider = select_provider(dir.path(), credentials());
        assert_eq!(provider.describe(), "browser cookie file");
    }

    #[test]
    fn session_file_beats_login() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(SESSION_FILE), "{}").unwrap();

        let provider = select_provider(dir.path(), credentials());
        assert_eq!(provider.describe(), "session file");
    }

    #[test]
    fn login_is_the_last_resort() {
        let dir = TempDir::new().unwrap();
        let provider = select_provider(dir.path(), credentials());
        assert_eq!(provider.describe(), "credential login");
    }

    #[test]
    fn cookie_file_round_trips() {
        let session =
            Session::from_json(r#"{"auth_token": "abc", "ct0": "csrf", "guest_id": "g1"}"#)
                .unwrap();
        assert!(session.is_authenticated());
        assert_eq!(session.csrf_token(), Some("csrf"));

        let reparsed = Session::from_json(&session.to_json().unwrap()).unwrap();
        assert_eq!(reparsed.cookie_header(), session.cookie_header());
    }

    #[test]
    fn cookie_header_contains_every_pair() {
        let mut cookies = BTreeMap::new();
        cookies.insert("a".to_string(), "1".to_string());
        cookies.insert("b".to_string(), "2".to_string());
        let session = Session::from_cookies(cookies);

        let header = session.cookie_header();
        assert!(header.contains("a=1"));
        assert!(header.contains("b=2"));
    }

    #[test]
    fn non_string_cookie_values_are_stringified() {
        let session = Session::from_json(r#"{"n": 7, "flag": true}"#).unwrap();
        let header = session.cookie_header();
        assert!(header.contains("n=7"));
        assert!(header.contains("flag=true"));
    }

    #[test]
    fn authentication_needs_both_cookies() {
        let only_auth = Session::from_json(r#"{"auth_token": "abc"}"#).unwrap();
        assert!(!only_auth.is_authenticated());
        let only_csrf = Session::from_json(r#"{"ct0": "csrf"}"#).unwrap();
        assert!(!only_csrf.is_authenticated());
    }

    #[test]
    fn file_provider_reads_cookies() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(SESSION_FILE);
        fs::write(&path, r#"{"auth_token": "abc", "ct0": "csrf"}"#).unwrap();

        let session = SessionFileProvider::new(path).acquire().unwrap();
        assert!(session.is_authenticated());
    }

    #[test]
    fn unknown_subtasks_have_no_answer() {
        assert!(subtask_input("LoginTwoFactorAuthChallenge", &credentials()).is_none());
        assert!(subtask_input("SomethingNew", &credentials()).is_none());
    }

    #[test]
    fn password_subtask_carries_the_password() {
        let input = subtask_input("LoginEnterPassword", &credentials()).unwrap();
        assert_eq!(input["enter_password"]["password"], "hunter2");
    }
}
