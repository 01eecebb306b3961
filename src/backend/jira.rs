//! Jira REST client.
//!
//! Uses the blocking `reqwest` client with basic auth (email + API token).
//! Board filter queries are read through the documented agile and filter
//! endpoints only.
//!
//! Search starts on the offset-paged `/rest/api/2/search`. Sites that have
//! retired it answer `410 Gone`; the client then switches to the token-paged
//! `/rest/api/3/search/jql` for the rest of its life and keeps a cursor so
//! callers can go on asking for offset pages.

use super::{BoardRef, ProjectRef, Session, Tracker, select_board, select_project};
use crate::config::Credentials;
use crate::error::{BulkError, Result, ResultExt};
use crate::model::{Priority, Ticket, TicketSummary, Transition};
use chrono::NaiveDate;
use reqwest::StatusCode;
use reqwest::blocking::{Client, RequestBuilder, Response};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use std::cell::{Cell, RefCell};
use std::time::Duration;
use tracing::{debug, info};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const TICKET_FIELDS: &str = "status,priority,labels,duedate,created";
const BODY_EXCERPT_LEN: usize = 300;
const LEGACY_SEARCH_PATH: &str = "/rest/api/2/search";
const ENHANCED_SEARCH_PATH: &str = "/rest/api/3/search/jql";

/// Blocking client for a single Jira site.
pub struct JiraClient {
    base_url: String,
    credentials: Credentials,
    http: Client,
    search_api: Cell<SearchApi>,
    cursor: RefCell<Option<TokenCursor>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SearchApi {
    /// `GET /rest/api/2/search` with `startAt`
    Legacy,
    /// `GET /rest/api/3/search/jql` with `nextPageToken`
    Enhanced,
}

/// Where the last token-paged search stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
struct TokenCursor {
    query: String,
    next_start: usize,
    /// `None` once the backend reported the last page.
    token: Option<String>,
}

#[derive(Debug, PartialEq, Eq)]
enum PageStart {
    First,
    Token(String),
    Exhausted,
}

/// Map an offset request onto the token cursor. Only offset 0 or the exact
/// continuation of the previous page of the same query can be served.
fn page_start(
    cursor: Option<&TokenCursor>,
    query: &str,
    start_at: usize,
) -> std::result::Result<PageStart, String> {
    if start_at == 0 {
        return Ok(PageStart::First);
    }
    match cursor {
        Some(cursor) if cursor.query == query && cursor.next_start == start_at => {
            Ok(cursor
                .token
                .clone()
                .map_or(PageStart::Exhausted, PageStart::Token))
        }
        _ => Err(format!(
            "token-paged search cannot resume at offset {start_at}"
        )),
    }
}

impl std::fmt::Debug for JiraClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JiraClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

// === Wire types ===

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct MyselfResponse {
    #[serde(default, alias = "name", alias = "key")]
    account_id: String,
    #[serde(default)]
    display_name: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct BoardPage {
    #[serde(default)]
    values: Vec<BoardEntry>,
    #[serde(default = "default_true")]
    is_last: bool,
}

#[derive(Deserialize)]
struct BoardEntry {
    id: u64,
    name: String,
}

#[derive(Deserialize)]
struct BoardConfiguration {
    filter: FilterRef,
}

#[derive(Deserialize)]
struct FilterRef {
    id: Value,
}

#[derive(Deserialize)]
struct FilterResponse {
    jql: String,
}

#[derive(Deserialize)]
struct ProjectEntry {
    key: String,
    name: String,
}

#[derive(Deserialize)]
struct SearchResponse {
    #[serde(default)]
    issues: Vec<IssueRef>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct EnhancedSearchResponse {
    #[serde(default)]
    issues: Vec<IssueRef>,
    next_page_token: Option<String>,
    #[serde(default)]
    is_last: bool,
}

impl EnhancedSearchResponse {
    /// Hits on this page and the token for the next one, if any.
    fn into_parts(self) -> (Vec<TicketSummary>, Option<String>) {
        let token = if self.is_last { None } else { self.next_page_token };
        let hits = self.issues.into_iter().map(IssueRef::into_summary).collect();
        (hits, token)
    }
}

#[derive(Deserialize)]
struct IssueRef {
    id: String,
    key: String,
}

impl IssueRef {
    fn into_summary(self) -> TicketSummary {
        TicketSummary {
            id: self.id,
            key: self.key,
        }
    }
}

#[derive(Deserialize)]
struct IssueResponse {
    key: String,
    fields: IssueFields,
}

#[derive(Deserialize)]
struct IssueFields {
    status: Option<Named>,
    priority: Option<Named>,
    #[serde(default)]
    labels: Vec<String>,
    duedate: Option<String>,
    created: Option<String>,
}

#[derive(Deserialize)]
struct Named {
    name: String,
}

#[derive(Deserialize)]
struct TransitionsResponse {
    #[serde(default)]
    transitions: Vec<TransitionEntry>,
}

#[derive(Deserialize)]
struct TransitionEntry {
    id: String,
    name: String,
}

const fn default_true() -> bool {
    true
}

impl JiraClient {
    /// Build a client for the site named in the credentials.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn new(credentials: &Credentials) -> Result<Self> {
        let http = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(concat!("jbulk/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            base_url: credentials.backend_url.trim_end_matches('/').to_string(),
            credentials: credentials.clone(),
            http,
            search_api: Cell::new(SearchApi::Legacy),
            cursor: RefCell::new(None),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    fn request(&self, builder: RequestBuilder) -> RequestBuilder {
        builder
            .basic_auth(&self.credentials.email, Some(&self.credentials.api_token))
            .header(reqwest::header::ACCEPT, "application/json")
    }

    fn send_get(&self, path: &str, query: &[(&str, String)]) -> Result<Response> {
        debug!(path, ?query, "GET");
        Ok(self.request(self.http.get(self.url(path)).query(query)).send()?)
    }

    fn get_json<T: DeserializeOwned>(&self, path: &str, query: &[(&str, String)]) -> Result<T> {
        let response = self.send_get(path, query)?;
        decode(path, ensure_success(path, response)?)
    }

    /// Token-paged search served as offset pages. Tokens are followed until
    /// `max_results` hits are collected or the results end, so a short page
    /// still means the last one.
    fn search_enhanced(
        &self,
        query: &str,
        start_at: usize,
        max_results: usize,
    ) -> Result<Vec<TicketSummary>> {
        let start = page_start(self.cursor.borrow().as_ref(), query, start_at)
            .map_err(|reason| BulkError::Other(anyhow::anyhow!(reason)))?;
        let mut token = match start {
            PageStart::First => None,
            PageStart::Token(token) => Some(token),
            PageStart::Exhausted => return Ok(Vec::new()),
        };

        let mut hits = Vec::new();
        loop {
            let mut params = vec![
                ("jql", query.to_string()),
                ("maxResults", max_results.saturating_sub(hits.len()).to_string()),
                ("fields", "key".to_string()),
            ];
            if let Some(token) = &token {
                params.push(("nextPageToken", token.clone()));
            }
            let page: EnhancedSearchResponse = self.get_json(ENHANCED_SEARCH_PATH, &params)?;
            let (page_hits, next) = page.into_parts();
            let fetched = page_hits.len();
            hits.extend(page_hits);
            token = next;
            if token.is_none() || fetched == 0 || hits.len() >= max_results {
                break;
            }
        }

        *self.cursor.borrow_mut() = Some(TokenCursor {
            query: query.to_string(),
            next_start: start_at + hits.len(),
            token,
        });
        Ok(hits)
    }

    /// Send a write and collapse every failure into a reason string.
    fn send_write(&self, path: &str, builder: RequestBuilder) -> std::result::Result<(), String> {
        debug!(path, "write");
        let response = self.request(builder).send().map_err(|e| e.to_string())?;
        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let body = response.text().unwrap_or_default();
        Err(format!("{status}: {}", error_excerpt(&body)))
    }
}

impl Tracker for JiraClient {
    fn authenticate(&self) -> Result<Session> {
        let path = "/rest/api/2/myself";
        let response = self
            .request(self.http.get(self.url(path)))
            .send()
            .map_err(|e| BulkError::Auth {
                reason: format!("could not reach {}: {e}", self.base_url),
            })?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(BulkError::Auth {
                reason: format!("{status} from {}", self.base_url),
            });
        }
        let me: MyselfResponse = decode(path, ensure_success(path, response)?)?;
        info!(account = %me.display_name, "Authenticated");
        Ok(Session {
            account_id: me.account_id,
            display_name: me.display_name,
        })
    }

    fn find_board_by_name(&self, name: &str) -> Result<BoardRef> {
        let mut boards = Vec::new();
        loop {
            let page: BoardPage =
                self.get_json("/rest/agile/1.0/board", &board_page_query(boards.len()))?;
            let fetched = page.values.len();
            boards.extend(page.values.into_iter().map(|entry| BoardRef {
                id: entry.id,
                name: entry.name,
            }));
            if page.is_last || fetched == 0 {
                break;
            }
        }
        select_board(&boards, name)
    }

    fn board_filter_query(&self, board: &BoardRef) -> Result<String> {
        let config: BoardConfiguration = self.get_json(
            &format!("/rest/agile/1.0/board/{}/configuration", board.id),
            &[],
        )?;
        let filter_id = match config.filter.id {
            Value::String(id) => id,
            other => other.to_string(),
        };
        let filter: FilterResponse =
            self.get_json(&format!("/rest/api/2/filter/{filter_id}"), &[])?;
        debug!(board = %board.name, filter_id = %filter_id, jql = %filter.jql, "Read board filter");
        Ok(filter.jql)
    }

    fn find_project_by_name(&self, name: &str) -> Result<String> {
        let entries: Vec<ProjectEntry> = self.get_json("/rest/api/2/project", &[])?;
        let projects: Vec<ProjectRef> = entries
            .into_iter()
            .map(|entry| ProjectRef {
                key: entry.key,
                name: entry.name,
            })
            .collect();
        select_project(&projects, name)
    }

    fn search(&self, query: &str, start_at: usize, max_results: usize) -> Result<Vec<TicketSummary>> {
        if self.search_api.get() == SearchApi::Legacy {
            let response = self.send_get(
                LEGACY_SEARCH_PATH,
                &[
                    ("jql", query.to_string()),
                    ("startAt", start_at.to_string()),
                    ("maxResults", max_results.to_string()),
                    ("fields", "key".to_string()),
                ],
            )?;
            if response.status() != StatusCode::GONE {
                let page: SearchResponse =
                    decode(LEGACY_SEARCH_PATH, ensure_success(LEGACY_SEARCH_PATH, response)?)?;
                return Ok(page.issues.into_iter().map(IssueRef::into_summary).collect());
            }
            info!("{LEGACY_SEARCH_PATH} is gone on this site; using {ENHANCED_SEARCH_PATH}");
            self.search_api.set(SearchApi::Enhanced);
        }
        self.search_enhanced(query, start_at, max_results)
    }

    fn get_ticket(&self, key: &str) -> Result<Ticket> {
        let issue: IssueResponse = self.get_json(
            &format!("/rest/api/2/issue/{key}"),
            &[("fields", TICKET_FIELDS.to_string())],
        )?;
        let fields = issue.fields;
        Ok(Ticket {
            key: issue.key,
            status: fields.status.map(|s| s.name).unwrap_or_default(),
            priority: Priority::from_name(fields.priority.as_ref().map(|p| p.name.as_str())),
            labels: fields.labels,
            due_date: fields.duedate.as_deref().and_then(parse_leading_date),
            created: fields.created.as_deref().and_then(parse_leading_date),
        })
    }

    fn list_transitions(&self, key: &str) -> Result<Vec<Transition>> {
        let response: TransitionsResponse =
            self.get_json(&format!("/rest/api/2/issue/{key}/transitions"), &[])?;
        Ok(response
            .transitions
            .into_iter()
            .map(|t| Transition::new(t.id, t.name))
            .collect())
    }

    fn apply_transition(&self, key: &str, transition_id: &str) -> Result<()> {
        let path = format!("/rest/api/2/issue/{key}/transitions");
        let body = json!({ "transition": { "id": transition_id } });
        self.send_write(&path, self.http.post(self.url(&path)).json(&body))
            .map_err(|reason| BulkError::Transition {
                ticket: key.to_string(),
                reason,
            })
    }

    fn set_label(&self, key: &str, label: &str) -> Result<()> {
        let path = format!("/rest/api/2/issue/{key}");
        let body = json!({ "update": { "labels": [{ "add": label }] } });
        self.send_write(&path, self.http.put(self.url(&path)).json(&body))
            .map_err(|reason| BulkError::Write {
                ticket: key.to_string(),
                reason,
            })
    }

    fn set_due_date(&self, key: &str, date: NaiveDate) -> Result<()> {
        let path = format!("/rest/api/2/issue/{key}");
        let body = json!({ "fields": { "duedate": date.format("%Y-%m-%d").to_string() } });
        self.send_write(&path, self.http.put(self.url(&path)).json(&body))
            .map_err(|reason| BulkError::Write {
                ticket: key.to_string(),
                reason,
            })
    }
}

/// Board list page parameters. No `name` filter: the full list feeds the
/// near-miss suggestions when nothing matches exactly.
fn board_page_query(start_at: usize) -> [(&'static str, String); 1] {
    [("startAt", start_at.to_string())]
}

fn decode<T: DeserializeOwned>(path: &str, response: Response) -> Result<T> {
    response
        .json::<T>()
        .with_context(|| format!("decoding response from {path}"))
}

fn ensure_success(endpoint: &str, response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().unwrap_or_default();
    Err(BulkError::Backend {
        endpoint: endpoint.to_string(),
        status: status.as_u16(),
        body: error_excerpt(&body),
    })
}

/// Pull Jira's `errorMessages` / `errors` out of a response body, falling
/// back to a truncated copy of the raw text.
fn error_excerpt(body: &str) -> String {
    if let Ok(value) = serde_json::from_str::<Value>(body) {
        let mut messages: Vec<String> = value["errorMessages"]
            .as_array()
            .map(|items| {
                items
                    .iter()
                    .filter_map(|m| m.as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default();
        if let Some(errors) = value["errors"].as_object() {
            messages.extend(
                errors
                    .iter()
                    .map(|(field, msg)| format!("{field}: {}", msg.as_str().unwrap_or_default())),
            );
        }
        if !messages.is_empty() {
            return messages.join("; ");
        }
    }
    body.chars().take(BODY_EXCERPT_LEN).collect()
}

/// Parse the `YYYY-MM-DD` prefix of a Jira date or timestamp.
fn parse_leading_date(value: &str) -> Option<NaiveDate> {
    value
        .get(..10)
        .and_then(|prefix| NaiveDate::parse_from_str(prefix, "%Y-%m-%d").ok())
}
