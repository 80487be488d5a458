//! `meet` tool: meeting spaces and conference artifacts on the stable tier.

use {
    async_trait::async_trait,
    meetbridge_api::{MeetApi, SpaceConfig},
    meetbridge_common::Result,
    serde_json::{Value, json},
};

use crate::{
    args::{self, api_error, invalid, to_json},
    registry::AgentTool,
};

pub const OPERATIONS: &[&str] = &[
    "create_space",
    "get_space",
    "update_space",
    "end_active_conference",
    "list_conference_records",
    "get_conference_record",
    "list_recordings",
    "get_recording",
    "list_transcripts",
    "get_transcript",
    "list_transcript_entries",
    "list_participants",
    "get_participant",
    "list_participant_sessions",
];

pub struct MeetTool {
    api: MeetApi,
}

impl MeetTool {
    pub fn new(api: MeetApi) -> Self {
        Self { api }
    }

    fn space_config(params: &Value) -> Result<SpaceConfig> {
        Ok(SpaceConfig {
            access_type: args::optional_str(params, "accessType")?.map(ToString::to_string),
            entry_point_access: args::optional_str(params, "entryPointAccess")?
                .map(ToString::to_string),
        })
    }
}

#[async_trait]
impl AgentTool for MeetTool {
    fn name(&self) -> &str {
        "meet"
    }

    fn description(&self) -> &str {
        "Create and inspect video meeting spaces and their history.\n\
         \n\
         Spaces: create_space, get_space (name may be a bare meeting code like \
         abc-defg-hij), update_space (accessType / entryPointAccess), \
         end_active_conference.\n\
         Records: list_conference_records (optional filter), get_conference_record, \
         list_recordings / get_recording, list_transcripts / get_transcript / \
         list_transcript_entries, list_participants / get_participant / \
         list_participant_sessions.\n\
         \n\
         `name` is the full resource name of the target; `parent` is the record, \
         transcript or participant that owns a listed collection."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "operation": { "type": "string", "enum": OPERATIONS },
                "name": {
                    "type": "string",
                    "description": "Resource name, e.g. spaces/abc or conferenceRecords/r1/recordings/x"
                },
                "parent": {
                    "type": "string",
                    "description": "Owning resource for list operations"
                },
                "accessType": { "type": "string", "enum": ["OPEN", "TRUSTED", "RESTRICTED"] },
                "entryPointAccess": { "type": "string", "enum": ["ALL", "CREATOR_APP_ONLY"] },
                "filter": { "type": "string", "description": "List filter expression" },
                "pageSize": { "type": "integer", "minimum": 1, "maximum": 100 },
                "pageToken": { "type": "string" }
            },
            "required": ["operation"]
        })
    }

    async fn execute(&self, params: Value) -> Result<Value> {
        let operation = args::operation(&params)?;
        let name = || args::required_str(&params, "name");
        let parent = || args::required_str(&params, "parent");
        let filter = args::optional_str(&params, "filter")?;

        let value = match operation {
            "create_space" => {
                let config = Self::space_config(&params)?;
                to_json(&self.api.create_space(Some(&config)).await.map_err(api_error)?)?
            },
            "get_space" => to_json(&self.api.get_space(name()?).await.map_err(api_error)?)?,
            "update_space" => {
                let config = Self::space_config(&params)?;
                to_json(
                    &self
                        .api
                        .update_space(name()?, &config)
                        .await
                        .map_err(api_error)?,
                )?
            },
            "end_active_conference" => {
                let space = name()?;
                self.api
                    .end_active_conference(space)
                    .await
                    .map_err(api_error)?;
                json!({ "ended": space })
            },
            "list_conference_records" => {
                let page = args::page(&params)?;
                to_json(
                    &self
                        .api
                        .list_conference_records(filter, &page)
                        .await
                        .map_err(api_error)?,
                )?
            },
            "get_conference_record" => to_json(
                &self
                    .api
                    .get_conference_record(name()?)
                    .await
                    .map_err(api_error)?,
            )?,
            "list_recordings" => {
                let page = args::page(&params)?;
                to_json(
                    &self
                        .api
                        .list_recordings(parent()?, &page)
                        .await
                        .map_err(api_error)?,
                )?
            },
            "get_recording" => {
                to_json(&self.api.get_recording(name()?).await.map_err(api_error)?)?
            },
            "list_transcripts" => {
                let page = args::page(&params)?;
                to_json(
                    &self
                        .api
                        .list_transcripts(parent()?, &page)
                        .await
                        .map_err(api_error)?,
                )?
            },
            "get_transcript" => {
                to_json(&self.api.get_transcript(name()?).await.map_err(api_error)?)?
            },
            "list_transcript_entries" => {
                let page = args::page(&params)?;
                to_json(
                    &self
                        .api
                        .list_transcript_entries(parent()?, &page)
                        .await
                        .map_err(api_error)?,
                )?
            },
            "list_participants" => {
                let page = args::page(&params)?;
                to_json(
                    &self
                        .api
                        .list_participants(parent()?, filter, &page)
                        .await
                        .map_err(api_error)?,
                )?
            },
            "get_participant" => {
                to_json(&self.api.get_participant(name()?).await.map_err(api_error)?)?
            },
            "list_participant_sessions" => {
                let page = args::page(&params)?;
                to_json(
                    &self
                        .api
                        .list_participant_sessions(parent()?, &page)
                        .await
                        .map_err(api_error)?,
                )?
            },
            other => {
                return Err(invalid(format!(
                    "unknown meet operation '{other}', expected one of: {}",
                    OPERATIONS.join(", ")
                )));
            },
        };
        Ok(value)
    }
}
