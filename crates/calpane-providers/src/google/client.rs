//! Google Calendar API v3 client.

use serde::Deserialize;
use tracing::{debug, instrument};

use crate::error::{ProviderError, ProviderErrorCode, ProviderResult};
use crate::raw_event::RawEvent;
use crate::source::{BoxFuture, CalendarInfo, EventQuery, EventSourceClient};

use super::config::GoogleConfig;

/// Google Calendar events source.
#[derive(Debug)]
pub struct GoogleCalendarClient {
    http_client: reqwest::Client,
    config: GoogleConfig,
}

impl GoogleCalendarClient {
    /// Creates a client from a validated configuration.
    pub fn new(config: GoogleConfig) -> ProviderResult<Self> {
        config.validate().map_err(ProviderError::configuration)?;

        let http_client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| {
                ProviderError::internal("failed to create HTTP client").with_source(e)
            })?;

        Ok(Self {
            http_client,
            config,
        })
    }

    #[instrument(skip(self), fields(calendar = %query.calendar_id))]
    async fn list_events(&self, query: EventQuery) -> ProviderResult<Vec<RawEvent>> {
        let url = format!(
            "{}/calendars/{}/events",
            self.config.base_url,
            urlencoding::encode(&query.calendar_id)
        );

        let mut all_events = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut request = self
                .http_client
                .get(&url)
                .bearer_auth(&self.config.access_token)
                .query(&[
                    ("timeMin", query.window.start.to_rfc3339()),
                    ("timeMax", query.window.end.to_rfc3339()),
                    ("singleEvents", "true".to_string()),
                    ("orderBy", "startTime".to_string()),
                    ("maxResults", self.config.page_size.to_string()),
                ]);

            if let Some(ref token) = page_token {
                request = request.query(&[("pageToken", token.as_str())]);
            }

            let response = request.send().await.map_err(map_transport_error)?;
            let body = read_success_body(response).await?;

            let page: EventListResponse = serde_json::from_str(&body).map_err(|e| {
                ProviderError::invalid_response(format!("failed to parse events page: {}", e))
            })?;

            all_events.extend(page.items);

            match page.next_page_token {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        debug!(count = all_events.len(), "fetched events");
        Ok(all_events)
    }

    async fn calendar_list(&self) -> ProviderResult<Vec<CalendarInfo>> {
        let url = format!("{}/users/me/calendarList", self.config.base_url);

        let mut calendars = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut request = self
                .http_client
                .get(&url)
                .bearer_auth(&self.config.access_token);
            if let Some(ref token) = page_token {
                request = request.query(&[("pageToken", token.as_str())]);
            }

            let response = request.send().await.map_err(map_transport_error)?;
            let body = read_success_body(response).await?;

            let page: CalendarListResponse = serde_json::from_str(&body).map_err(|e| {
                ProviderError::invalid_response(format!("failed to parse calendar list: {}", e))
            })?;

            calendars.extend(page.items.into_iter().map(CalendarListEntry::into_info));

            match page.next_page_token {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        debug!(count = calendars.len(), "listed calendars");
        Ok(calendars)
    }

    async fn remove_event(&self, calendar_id: &str, event_id: &str) -> ProviderResult<()> {
        let url = format!(
            "{}/calendars/{}/events/{}",
            self.config.base_url,
            urlencoding::encode(calendar_id),
            urlencoding::encode(event_id)
        );

        let response = self
            .http_client
            .delete(&url)
            .bearer_auth(&self.config.access_token)
            .send()
            .await
            .map_err(map_transport_error)?;

        // already deleted on the server
        if response.status() == reqwest::StatusCode::GONE {
            debug!(calendar = %calendar_id, event = %event_id, "event already gone");
            return Ok(());
        }

        read_success_body(response).await.map(|_| ())
    }
}

impl EventSourceClient for GoogleCalendarClient {
    fn name(&self) -> &str {
        "google"
    }

    fn fetch_events(&self, query: EventQuery) -> BoxFuture<'_, ProviderResult<Vec<RawEvent>>> {
        Box::pin(async move {
            self.list_events(query)
                .await
                .map_err(|e| e.with_provider("google"))
        })
    }

    fn list_calendars(&self) -> BoxFuture<'_, ProviderResult<Vec<CalendarInfo>>> {
        Box::pin(async move {
            self.calendar_list()
                .await
                .map_err(|e| e.with_provider("google"))
        })
    }

    fn delete_event(&self, calendar_id: &str, event_id: &str) -> BoxFuture<'_, ProviderResult<()>> {
        let calendar_id = calendar_id.to_string();
        let event_id = event_id.to_string();
        Box::pin(async move {
            self.remove_event(&calendar_id, &event_id)
                .await
                .map_err(|e| e.with_provider("google"))
        })
    }
}

fn map_transport_error(e: reqwest::Error) -> ProviderError {
    if e.is_timeout() {
        ProviderError::timeout("request timed out")
    } else if e.is_connect() {
        ProviderError::network(format!("connection failed: {}", e))
    } else {
        ProviderError::network(format!("request failed: {}", e))
    }
}

/// Returns the body of a 2xx answer, or the matching error.
async fn read_success_body(response: reqwest::Response) -> ProviderResult<String> {
    let status = response.status();

    if status.is_success() {
        return response
            .text()
            .await
            .map_err(|e| ProviderError::network(format!("failed to read response: {}", e)));
    }

    let retry_after = response
        .headers()
        .get(reqwest::header::RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.parse::<u64>().ok());
    let body = response.text().await.unwrap_or_default();

    let code = status_code(status);
    let mut error = ProviderError::from_status(code, status.as_u16(), &body);
    if let Some(secs) = retry_after {
        error = ProviderError::new(
            code,
            format!("{} (retry after {} seconds)", error.message(), secs),
        );
    }
    Err(error)
}

fn status_code(status: reqwest::StatusCode) -> ProviderErrorCode {
    use reqwest::StatusCode;
    match status {
        StatusCode::UNAUTHORIZED => ProviderErrorCode::AuthenticationFailed,
        StatusCode::FORBIDDEN => ProviderErrorCode::AuthorizationFailed,
        StatusCode::NOT_FOUND | StatusCode::GONE => ProviderErrorCode::NotFound,
        StatusCode::TOO_MANY_REQUESTS => ProviderErrorCode::RateLimited,
        s if s.is_server_error() => ProviderErrorCode::ServerError,
        _ => ProviderErrorCode::InvalidResponse,
    }
}

/// Response from the events.list endpoint.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EventListResponse {
    #[serde(default)]
    items: Vec<RawEvent>,
    next_page_token: Option<String>,
}

/// Response from the calendarList endpoint.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CalendarListResponse {
    #[serde(default)]
    items: Vec<CalendarListEntry>,
    next_page_token: Option<String>,
}

/// One calendar from the calendar list.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CalendarListEntry {
    id: String,
    summary: Option<String>,
    summary_override: Option<String>,
    #[serde(default)]
    primary: bool,
    selected: Option<bool>,
    access_role: Option<String>,
    background_color: Option<String>,
    foreground_color: Option<String>,
}

impl CalendarListEntry {
    fn into_info(self) -> CalendarInfo {
        let name = self
            .summary_override
            .or(self.summary)
            .unwrap_or_else(|| self.id.clone());
        // the API omits `selected` for hidden calendars
        let selected = self.selected.unwrap_or(self.primary);

        CalendarInfo {
            id: self.id,
            name,
            is_primary: self.primary,
            selected,
            access_role: self.access_role,
            background_color: self.background_color,
            foreground_color: self.foreground_color,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_event_list_page() {
        let json = r#"{
            "kind": "calendar#events",
            "items": [
                {
                    "id": "event1",
                    "summary": "Test Meeting",
                    "start": {"dateTime": "2024-03-15T10:00:00Z"},
                    "end": {"dateTime": "2024-03-15T11:00:00Z"},
                    "status": "confirmed"
                },
                {
                    "id": "event2",
                    "start": {"date": "2024-03-16"},
                    "end": {"date": "2024-03-17"}
                }
            ],
            "nextPageToken": "page-2"
        }"#;

        let page: EventListResponse = serde_json::from_str(json).unwrap();
        assert_eq!(page.items.len(), 2);
        assert_eq!(page.items[0].summary.as_deref(), Some("Test Meeting"));
        assert_eq!(
            page.items[1].start.as_ref().and_then(|s| s.date.as_deref()),
            Some("2024-03-16")
        );
        assert_eq!(page.next_page_token.as_deref(), Some("page-2"));
    }

    #[test]
    fn parse_calendar_list() {
        let json = r##"{
            "items": [
                {
                    "id": "me@example.com",
                    "summary": "Me",
                    "primary": true,
                    "accessRole": "owner",
                    "backgroundColor": "#9fe1e7",
                    "foregroundColor": "#000000"
                },
                {
                    "id": "team@group.calendar.google.com",
                    "summary": "Team",
                    "summaryOverride": "My Team",
                    "selected": true,
                    "accessRole": "reader"
                },
                {
                    "id": "holidays@group.v.calendar.google.com",
                    "accessRole": "reader"
                }
            ]
        }"##;

        let page: CalendarListResponse = serde_json::from_str(json).unwrap();
        let infos: Vec<_> = page.items.into_iter().map(CalendarListEntry::into_info).collect();

        assert!(infos[0].is_primary);
        assert!(infos[0].selected);
        assert!(infos[0].is_writable());
        assert_eq!(infos[1].name, "My Team");
        assert!(infos[1].selected);
        assert!(!infos[1].is_writable());
        assert_eq!(infos[2].name, "holidays@group.v.calendar.google.com");
        assert!(!infos[2].selected);
    }

    #[test]
    fn status_mapping() {
        use reqwest::StatusCode;
        assert_eq!(
            status_code(StatusCode::UNAUTHORIZED),
            ProviderErrorCode::AuthenticationFailed
        );
        assert_eq!(status_code(StatusCode::GONE), ProviderErrorCode::NotFound);
        assert_eq!(
            status_code(StatusCode::BAD_GATEWAY),
            ProviderErrorCode::ServerError
        );
        assert_eq!(
            status_code(StatusCode::BAD_REQUEST),
            ProviderErrorCode::InvalidResponse
        );
    }

    #[test]
    fn new_rejects_invalid_config() {
        let err = GoogleCalendarClient::new(GoogleConfig::new("")).unwrap_err();
        assert_eq!(err.code(), ProviderErrorCode::ConfigurationError);

        let client = GoogleCalendarClient::new(GoogleConfig::new("token")).unwrap();
        assert_eq!(client.name(), "google");
    }
}
