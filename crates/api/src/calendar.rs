//! Calendar v3 surface: calendar list and event CRUD.

use std::sync::Arc;

use {
    chrono::{DateTime, FixedOffset, NaiveDate},
    serde::{Deserialize, Serialize},
    serde_json::{Value, json},
};

use crate::{
    error::{Error, Result},
    gateway::Gateway,
    names::path_segment,
    page::ListPage,
    request::{GatewayRequest, Provider},
};

pub const MAX_EVENT_RESULTS: u32 = 2500;
const DEFAULT_CALENDAR: &str = "primary";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarListEntry {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_zone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_role: Option<String>,
    #[serde(default)]
    pub primary: bool,
}

/// Either a timed instant (`dateTime`) or an all-day `date`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventDateTime {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_zone: Option<String>,
}

impl EventDateTime {
    #[must_use]
    pub fn at(date_time: impl Into<String>) -> Self {
        Self {
            date_time: Some(date_time.into()),
            ..Default::default()
        }
    }

    fn validate(&self, field: &str) -> Result<()> {
        match (&self.date_time, &self.date) {
            (Some(dt), None) => parse_instant(field, dt).map(|_| ()),
            (None, Some(d)) => NaiveDate::parse_from_str(d, "%Y-%m-%d")
                .map(|_| ())
                .map_err(|_| Error::validation(format!("{field}: '{d}' is not a YYYY-MM-DD date"))),
            (Some(_), Some(_)) => Err(Error::validation(format!(
                "{field}: give either dateTime or date, not both"
            ))),
            (None, None) => Err(Error::validation(format!("{field}: dateTime or date is required"))),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attendee {
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub optional: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    #[serde(default)]
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<EventDateTime>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<EventDateTime>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attendees: Vec<Attendee>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub html_link: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hangout_link: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conference_data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated: Option<String>,
}

/// Filters for `list_events`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EventQuery {
    pub calendar_id: Option<String>,
    /// RFC 3339 lower bound (exclusive on event end).
    pub time_min: Option<String>,
    /// RFC 3339 upper bound (exclusive on event start).
    pub time_max: Option<String>,
    /// Free-text search.
    pub q: Option<String>,
    pub max_results: Option<u32>,
    pub single_events: Option<bool>,
    /// `startTime` or `updated`.
    pub order_by: Option<String>,
    pub page_token: Option<String>,
}

impl EventQuery {
    pub fn validate(&self) -> Result<()> {
        if let Some(n) = self.max_results
            && !(1..=MAX_EVENT_RESULTS).contains(&n)
        {
            return Err(Error::validation(format!(
                "maxResults must be between 1 and {MAX_EVENT_RESULTS}, got {n}"
            )));
        }
        let min = self
            .time_min
            .as_deref()
            .map(|v| parse_instant("timeMin", v))
            .transpose()?;
        let max = self
            .time_max
            .as_deref()
            .map(|v| parse_instant("timeMax", v))
            .transpose()?;
        if let (Some(min), Some(max)) = (min, max)
            && min >= max
        {
            return Err(Error::validation("timeMin must be before timeMax"));
        }
        match self.order_by.as_deref() {
            None | Some("updated") => {},
            Some("startTime") if self.single_events == Some(true) => {},
            Some("startTime") => {
                return Err(Error::validation(
                    "orderBy=startTime requires singleEvents=true",
                ));
            },
            Some(other) => {
                return Err(Error::validation(format!(
                    "orderBy must be 'startTime' or 'updated', got '{other}'"
                )));
            },
        }
        Ok(())
    }
}

/// Fields for `create_event`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NewEvent {
    pub calendar_id: Option<String>,
    pub summary: String,
    pub description: Option<String>,
    pub location: Option<String>,
    pub start: EventDateTime,
    pub end: EventDateTime,
    /// Attendee email addresses.
    pub attendees: Vec<String>,
    /// Attach a new video meeting to the event.
    pub create_conference: bool,
}

impl NewEvent {
    pub fn validate(&self) -> Result<()> {
        if self.summary.trim().is_empty() {
            return Err(Error::validation("summary is required"));
        }
        self.start.validate("start")?;
        self.end.validate("end")?;
        check_order(&self.start, &self.end)?;
        validate_emails(&self.attendees)
    }

    fn body(&self) -> Value {
        let mut body = json!({
            "summary": self.summary,
            "start": self.start,
            "end": self.end,
        });
        if let Some(d) = &self.description {
            body["description"] = json!(d);
        }
        if let Some(l) = &self.location {
            body["location"] = json!(l);
        }
        if !self.attendees.is_empty() {
            body["attendees"] = attendee_list(&self.attendees);
        }
        if self.create_conference {
            body["conferenceData"] = json!({
                "createRequest": {
                    "requestId": uuid::Uuid::new_v4().to_string(),
                    "conferenceSolutionKey": { "type": "hangoutsMeet" },
                }
            });
        }
        body
    }
}

/// Fields for `update_event`. Only set fields are sent.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EventPatch {
    pub summary: Option<String>,
    pub description: Option<String>,
    pub location: Option<String>,
    pub start: Option<EventDateTime>,
    pub end: Option<EventDateTime>,
    pub attendees: Option<Vec<String>>,
}

impl EventPatch {
    pub fn validate(&self) -> Result<()> {
        if self.summary.is_none()
            && self.description.is_none()
            && self.location.is_none()
            && self.start.is_none()
            && self.end.is_none()
            && self.attendees.is_none()
        {
            return Err(Error::validation("update needs at least one field to change"));
        }
        if let Some(start) = &self.start {
            start.validate("start")?;
        }
        if let Some(end) = &self.end {
            end.validate("end")?;
        }
        if let (Some(start), Some(end)) = (&self.start, &self.end) {
            check_order(start, end)?;
        }
        if let Some(attendees) = &self.attendees {
            validate_emails(attendees)?;
        }
        Ok(())
    }

    fn body(&self) -> Value {
        let mut body = json!({});
        if let Some(v) = &self.summary {
            body["summary"] = json!(v);
        }
        if let Some(v) = &self.description {
            body["description"] = json!(v);
        }
        if let Some(v) = &self.location {
            body["location"] = json!(v);
        }
        if let Some(v) = &self.start {
            body["start"] = json!(v);
        }
        if let Some(v) = &self.end {
            body["end"] = json!(v);
        }
        if let Some(v) = &self.attendees {
            body["attendees"] = attendee_list(v);
        }
        body
    }
}

fn parse_instant(field: &str, value: &str) -> Result<DateTime<FixedOffset>> {
    DateTime::parse_from_rfc3339(value).map_err(|_| {
        Error::validation(format!(
            "{field}: '{value}' is not an RFC 3339 timestamp (e.g. 2025-03-01T10:00:00Z)"
        ))
    })
}

fn check_order(start: &EventDateTime, end: &EventDateTime) -> Result<()> {
    if let (Some(s), Some(e)) = (&start.date_time, &end.date_time)
        && parse_instant("start", s)? >= parse_instant("end", e)?
    {
        return Err(Error::validation("event end must be after its start"));
    }
    if let (Some(s), Some(e)) = (&start.date, &end.date)
        && s >= e
    {
        return Err(Error::validation("all-day event end date must be after its start date"));
    }
    Ok(())
}

pub(crate) fn validate_email(email: &str) -> Result<()> {
    let trimmed = email.trim();
    match trimmed.split_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() => Ok(()),
        _ => Err(Error::validation(format!("'{email}' is not an email address"))),
    }
}

fn validate_emails(emails: &[String]) -> Result<()> {
    emails.iter().try_for_each(|e| validate_email(e))
}

fn attendee_list(emails: &[String]) -> Value {
    Value::Array(
        emails
            .iter()
            .map(|e| json!({ "email": e.trim() }))
            .collect(),
    )
}

fn calendar_segment(calendar_id: Option<&str>) -> Result<String> {
    path_segment("calendar id", calendar_id.unwrap_or(DEFAULT_CALENDAR))
}

/// Typed client for the calendar surface.
#[derive(Clone)]
pub struct CalendarApi {
    gateway: Arc<dyn Gateway>,
}

impl CalendarApi {
    pub fn new(gateway: Arc<dyn Gateway>) -> Self {
        Self { gateway }
    }

    pub async fn list_calendars(
        &self,
        max_results: Option<u32>,
        page_token: Option<String>,
    ) -> Result<ListPage<CalendarListEntry>> {
        if let Some(n) = max_results
            && !(1..=250).contains(&n)
        {
            return Err(Error::validation(format!(
                "maxResults must be between 1 and 250, got {n}"
            )));
        }
        let req = GatewayRequest::get(Provider::Calendar, "list_calendars", "users/me/calendarList")
            .query_opt("maxResults", max_results)
            .query_opt("pageToken", page_token);
        let resp = self.gateway.call(req).await?;
        ListPage::from_response(resp, "items", "list_calendars")
    }

    pub async fn list_events(&self, query: &EventQuery) -> Result<ListPage<Event>> {
        query.validate()?;
        let calendar = calendar_segment(query.calendar_id.as_deref())?;
        let req = GatewayRequest::get(
            Provider::Calendar,
            "list_events",
            format!("calendars/{calendar}/events"),
        )
        .query_opt("timeMin", query.time_min.as_deref())
        .query_opt("timeMax", query.time_max.as_deref())
        .query_opt("q", query.q.as_deref())
        .query_opt("maxResults", query.max_results)
        .query_opt("singleEvents", query.single_events)
        .query_opt("orderBy", query.order_by.as_deref())
        .query_opt("pageToken", query.page_token.as_deref());
        let resp = self.gateway.call(req).await?;
        ListPage::from_response(resp, "items", "list_events")
    }

    pub async fn get_event(&self, calendar_id: Option<&str>, event_id: &str) -> Result<Event> {
        let calendar = calendar_segment(calendar_id)?;
        let event = path_segment("event id", event_id)?;
        let req = GatewayRequest::get(
            Provider::Calendar,
            "get_event",
            format!("calendars/{calendar}/events/{event}"),
        );
        self.gateway.call(req).await?.json("get_event")
    }

    pub async fn create_event(&self, event: &NewEvent) -> Result<Event> {
        event.validate()?;
        let calendar = calendar_segment(event.calendar_id.as_deref())?;
        let mut req = GatewayRequest::post(
            Provider::Calendar,
            "create_event",
            format!("calendars/{calendar}/events"),
        )
        .json_body(event.body());
        if event.create_conference {
            req = req.query("conferenceDataVersion", 1);
        }
        self.gateway.call(req).await?.json("create_event")
    }

    pub async fn update_event(
        &self,
        calendar_id: Option<&str>,
        event_id: &str,
        patch: &EventPatch,
    ) -> Result<Event> {
        patch.validate()?;
        let calendar = calendar_segment(calendar_id)?;
        let event = path_segment("event id", event_id)?;
        let req = GatewayRequest::patch(
            Provider::Calendar,
            "update_event",
            format!("calendars/{calendar}/events/{event}"),
        )
        .json_body(patch.body());
        self.gateway.call(req).await?.json("update_event")
    }

    pub async fn delete_event(&self, calendar_id: Option<&str>, event_id: &str) -> Result<()> {
        let calendar = calendar_segment(calendar_id)?;
        let event = path_segment("event id", event_id)?;
        let req = GatewayRequest::delete(
            Provider::Calendar,
            "delete_event",
            format!("calendars/{calendar}/events/{event}"),
        );
        self.gateway.call(req).await?;
        Ok(())
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, rstest::rstest};

    fn query() -> EventQuery {
        EventQuery {
            time_min: Some("2025-03-01T00:00:00Z".into()),
            time_max: Some("2025-03-02T00:00:00Z".into()),
            ..Default::default()
        }
    }

    #[rstest]
    #[case::zero(EventQuery { max_results: Some(0), ..query() })]
    #[case::too_many(EventQuery { max_results: Some(2501), ..query() })]
    #[case::inverted(EventQuery {
        time_min: Some("2025-03-02T00:00:00Z".into()),
        time_max: Some("2025-03-01T00:00:00Z".into()),
        ..Default::default()
    })]
    #[case::not_rfc3339(EventQuery { time_min: Some("yesterday".into()), ..Default::default() })]
    #[case::start_time_without_single(EventQuery { order_by: Some("startTime".into()), ..query() })]
    #[case::unknown_order(EventQuery { order_by: Some("title".into()), ..query() })]
    fn bad_queries_are_rejected(#[case] q: EventQuery) {
        assert!(matches!(q.validate(), Err(Error::Validation(_))));
    }

    #[test]
    fn ordered_single_events_are_accepted() {
        let q = EventQuery {
            order_by: Some("startTime".into()),
            single_events: Some(true),
            max_results: Some(2500),
            ..query()
        };
        q.validate().unwrap();
    }

    #[test]
    fn new_event_needs_ordered_times() {
        let mut event = NewEvent {
            summary: "Standup".into(),
            start: EventDateTime::at("2025-03-01T10:00:00Z"),
            end: EventDateTime::at("2025-03-01T09:00:00Z"),
            ..Default::default()
        };
        assert!(event.validate().is_err());
        event.end = EventDateTime::at("2025-03-01T10:15:00Z");
        event.validate().unwrap();
        event.attendees = vec!["not-an-email".into()];
        assert!(event.validate().is_err());
    }

    #[test]
    fn conference_request_is_attached() {
        let event = NewEvent {
            summary: "Sync".into(),
            start: EventDateTime::at("2025-03-01T10:00:00Z"),
            end: EventDateTime::at("2025-03-01T11:00:00Z"),
            attendees: vec!["a@example.com".into()],
            create_conference: true,
            ..Default::default()
        };
        let body = event.body();
        assert_eq!(
            body["conferenceData"]["createRequest"]["conferenceSolutionKey"]["type"],
            "hangoutsMeet"
        );
        assert_eq!(body["attendees"][0]["email"], "a@example.com");
        assert!(body.get("description").is_none());
    }

    #[test]
    fn empty_patch_is_rejected() {
        assert!(EventPatch::default().validate().is_err());
        let patch = EventPatch {
            summary: Some("Renamed".into()),
            ..Default::default()
        };
        patch.validate().unwrap();
        assert_eq!(patch.body(), json!({"summary": "Renamed"}));
    }
}
