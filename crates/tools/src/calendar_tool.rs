//! `calendar` tool: calendar list and event management.

use {
    async_trait::async_trait,
    meetbridge_api::{CalendarApi, EventPatch, EventQuery, NewEvent},
    meetbridge_common::Result,
    serde_json::{Value, json},
};

use crate::{
    args::{self, api_error, invalid, to_json},
    registry::AgentTool,
};

pub const OPERATIONS: &[&str] = &[
    "list_calendars",
    "list_events",
    "get_event",
    "create_event",
    "update_event",
    "delete_event",
];

pub struct CalendarTool {
    api: CalendarApi,
}

impl CalendarTool {
    pub fn new(api: CalendarApi) -> Self {
        Self { api }
    }
}

fn date_time_schema(description: &str) -> Value {
    json!({
        "type": "object",
        "description": description,
        "properties": {
            "dateTime": { "type": "string", "description": "RFC 3339 timestamp" },
            "date": { "type": "string", "description": "YYYY-MM-DD for all-day events" },
            "timeZone": { "type": "string", "description": "IANA time zone, e.g. Europe/Berlin" }
        }
    })
}

#[async_trait]
impl AgentTool for CalendarTool {
    fn name(&self) -> &str {
        "calendar"
    }

    fn description(&self) -> &str {
        "Read and manage calendar events.\n\
         \n\
         Operations:\n\
         - list_calendars: calendars visible to the account\n\
         - list_events: events in a time range (timeMin/timeMax, q, maxResults, singleEvents, orderBy)\n\
         - get_event / delete_event: by eventId\n\
         - create_event: summary, start, end, optional attendees; set createConference to attach a video meeting\n\
         - update_event: eventId plus the fields to change\n\
         \n\
         calendarId defaults to \"primary\"."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "operation": { "type": "string", "enum": OPERATIONS },
                "calendarId": { "type": "string", "description": "Calendar id (default \"primary\")" },
                "eventId": { "type": "string", "description": "Event id (get/update/delete)" },
                "timeMin": { "type": "string", "description": "RFC 3339 lower bound (list_events)" },
                "timeMax": { "type": "string", "description": "RFC 3339 upper bound (list_events)" },
                "q": { "type": "string", "description": "Free-text search (list_events)" },
                "maxResults": { "type": "integer", "minimum": 1, "maximum": 2500 },
                "singleEvents": { "type": "boolean", "description": "Expand recurring events" },
                "orderBy": { "type": "string", "enum": ["startTime", "updated"] },
                "pageToken": { "type": "string" },
                "summary": { "type": "string" },
                "description": { "type": "string" },
                "location": { "type": "string" },
                "start": date_time_schema("Event start"),
                "end": date_time_schema("Event end"),
                "attendees": {
                    "type": "array",
                    "items": { "type": "string" },
                    "description": "Attendee email addresses"
                },
                "createConference": {
                    "type": "boolean",
                    "description": "Attach a new video meeting (create_event)"
                }
            },
            "required": ["operation"]
        })
    }

    async fn execute(&self, params: Value) -> Result<Value> {
        let operation = args::operation(&params)?;
        let calendar_id = args::optional_str(&params, "calendarId")?;

        match operation {
            "list_calendars" => {
                let page = self
                    .api
                    .list_calendars(
                        args::optional_u32(&params, "maxResults")?,
                        args::optional_str(&params, "pageToken")?.map(ToString::to_string),
                    )
                    .await
                    .map_err(api_error)?;
                to_json(&page)
            },
            "list_events" => {
                let query: EventQuery = args::parse(&params)?;
                let page = self.api.list_events(&query).await.map_err(api_error)?;
                to_json(&page)
            },
            "get_event" => {
                let event_id = args::required_str(&params, "eventId")?;
                let event = self
                    .api
                    .get_event(calendar_id, event_id)
                    .await
                    .map_err(api_error)?;
                to_json(&event)
            },
            "create_event" => {
                let event: NewEvent = args::parse(&params)?;
                let created = self.api.create_event(&event).await.map_err(api_error)?;
                to_json(&created)
            },
            "update_event" => {
                let event_id = args::required_str(&params, "eventId")?;
                let patch: EventPatch = args::parse(&params)?;
                let updated = self
                    .api
                    .update_event(calendar_id, event_id, &patch)
                    .await
                    .map_err(api_error)?;
                to_json(&updated)
            },
            "delete_event" => {
                let event_id = args::required_str(&params, "eventId")?;
                self.api
                    .delete_event(calendar_id, event_id)
                    .await
                    .map_err(api_error)?;
                Ok(json!({ "deleted": event_id }))
            },
            other => Err(invalid(format!(
                "unknown calendar operation '{other}', expected one of: {}",
                OPERATIONS.join(", ")
            ))),
        }
    }
}
