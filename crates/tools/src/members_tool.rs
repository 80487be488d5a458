//! `meet_members` tool: space membership on the preview tier.

use {
    async_trait::async_trait,
    meetbridge_api::MeetApi,
    meetbridge_common::Result,
    serde_json::{Value, json},
};

use crate::{
    args::{self, api_error, invalid, to_json},
    registry::AgentTool,
};

pub const OPERATIONS: &[&str] = &["list_members", "get_member", "create_member", "delete_member"];

pub struct MeetMembersTool {
    api: MeetApi,
}

impl MeetMembersTool {
    pub fn new(api: MeetApi) -> Self {
        Self { api }
    }
}

#[async_trait]
impl AgentTool for MeetMembersTool {
    fn name(&self) -> &str {
        "meet_members"
    }

    fn description(&self) -> &str {
        "Manage who belongs to a meeting space (preview API; requires \
         api.enable_preview). Operations: list_members (space), get_member (name), \
         create_member (space, email, optional role COHOST), delete_member (name)."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "operation": { "type": "string", "enum": OPERATIONS },
                "space": { "type": "string", "description": "Space name or meeting code" },
                "name": { "type": "string", "description": "Member name: spaces/{space}/members/{member}" },
                "email": { "type": "string" },
                "role": { "type": "string", "enum": ["COHOST", "ROLE_UNSPECIFIED"] },
                "pageSize": { "type": "integer", "minimum": 1, "maximum": 100 },
                "pageToken": { "type": "string" }
            },
            "required": ["operation"]
        })
    }

    async fn execute(&self, params: Value) -> Result<Value> {
        match args::operation(&params)? {
            "list_members" => {
                let space = args::required_str(&params, "space")?;
                let page = args::page(&params)?;
                let members = self
                    .api
                    .list_members(space, &page)
                    .await
                    .map_err(api_error)?;
                to_json(&members)
            },
            "get_member" => {
                let name = args::required_str(&params, "name")?;
                to_json(&self.api.get_member(name).await.map_err(api_error)?)
            },
            "create_member" => {
                let space = args::required_str(&params, "space")?;
                let email = args::required_str(&params, "email")?;
                let role = args::optional_str(&params, "role")?;
                let member = self
                    .api
                    .create_member(space, email, role)
                    .await
                    .map_err(api_error)?;
                to_json(&member)
            },
            "delete_member" => {
                let name = args::required_str(&params, "name")?;
                self.api.delete_member(name).await.map_err(api_error)?;
                Ok(json!({ "deleted": name }))
            },
            other => Err(invalid(format!(
                "unknown meet_members operation '{other}', expected one of: {}",
                OPERATIONS.join(", ")
            ))),
        }
    }
}
