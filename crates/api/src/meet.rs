//! Meeting-space surface.
//!
//! Stable operations (`v2`) cover spaces, conference records and their
//! artifacts. Member management lives on the preview tier (`v2beta`) and only
//! runs when `api.enable_preview` is set; otherwise the gateway rejects it
//! before any network call.

use std::sync::Arc;

use {
    serde::{Deserialize, Serialize},
    serde_json::{Value, json},
};

use crate::{
    calendar::validate_email,
    error::{Error, Result},
    gateway::Gateway,
    names::{self, ResourceKind},
    page::ListPage,
    request::{GatewayRequest, Provider},
};

pub const MAX_PAGE_SIZE: u32 = 100;

const ACCESS_TYPES: &[&str] = &["OPEN", "TRUSTED", "RESTRICTED"];
const ENTRY_POINT_ACCESS: &[&str] = &["ALL", "CREATOR_APP_ONLY"];
const MEMBER_ROLES: &[&str] = &["COHOST", "ROLE_UNSPECIFIED"];

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpaceConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entry_point_access: Option<String>,
}

impl SpaceConfig {
    pub fn validate(&self) -> Result<()> {
        check_enum("accessType", self.access_type.as_deref(), ACCESS_TYPES)?;
        check_enum(
            "entryPointAccess",
            self.entry_point_access.as_deref(),
            ENTRY_POINT_ACCESS,
        )
    }

    fn is_empty(&self) -> bool {
        self.access_type.is_none() && self.entry_point_access.is_none()
    }

    /// `updateMask` covering exactly the fields that are set.
    fn update_mask(&self) -> String {
        let mut fields = Vec::new();
        if self.access_type.is_some() {
            fields.push("config.accessType");
        }
        if self.entry_point_access.is_some() {
            fields.push("config.entryPointAccess");
        }
        fields.join(",")
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActiveConference {
    #[serde(default)]
    pub conference_record: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Space {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meeting_uri: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meeting_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<SpaceConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_conference: Option<ActiveConference>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConferenceRecord {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expire_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub space: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recording {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub drive_destination: Option<Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transcript {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub docs_destination: Option<Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranscriptEntry {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub participant: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Participant {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub earliest_start_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latest_end_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signedin_user: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub anonymous_user: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone_user: Option<Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantSession {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<String>,
}

/// Space member (preview tier).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Member {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
}

/// Paging arguments shared by every list call.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PageRequest {
    pub page_size: Option<u32>,
    pub page_token: Option<String>,
}

impl PageRequest {
    pub fn validate(&self) -> Result<()> {
        match self.page_size {
            Some(n) if !(1..=MAX_PAGE_SIZE).contains(&n) => Err(Error::validation(format!(
                "pageSize must be between 1 and {MAX_PAGE_SIZE}, got {n}"
            ))),
            _ => Ok(()),
        }
    }

    fn apply(&self, req: GatewayRequest) -> GatewayRequest {
        req.query_opt("pageSize", self.page_size)
            .query_opt("pageToken", self.page_token.as_deref())
    }
}

fn check_enum(field: &str, value: Option<&str>, allowed: &[&str]) -> Result<()> {
    match value {
        Some(v) if !allowed.contains(&v) => Err(Error::validation(format!(
            "{field} must be one of {}, got '{v}'",
            allowed.join(", ")
        ))),
        _ => Ok(()),
    }
}

/// Typed client for the meeting surface.
#[derive(Clone)]
pub struct MeetApi {
    gateway: Arc<dyn Gateway>,
}

impl MeetApi {
    pub fn new(gateway: Arc<dyn Gateway>) -> Self {
        Self { gateway }
    }

    async fn list<T: serde::de::DeserializeOwned>(
        &self,
        operation: &str,
        path: String,
        page: &PageRequest,
        key: &str,
        filter: Option<&str>,
    ) -> Result<ListPage<T>> {
        page.validate()?;
        let req = page
            .apply(GatewayRequest::get(Provider::Meet, operation, path))
            .query_opt("filter", filter.filter(|f| !f.trim().is_empty()));
        let resp = self.gateway.call(req).await?;
        ListPage::from_response(resp, key, operation)
    }

    async fn get<T: serde::de::DeserializeOwned>(&self, operation: &str, name: String) -> Result<T> {
        let req = GatewayRequest::get(Provider::Meet, operation, name);
        self.gateway.call(req).await?.json(operation)
    }

    // ── Spaces ──────────────────────────────────────────────────────────────

    pub async fn create_space(&self, config: Option<&SpaceConfig>) -> Result<Space> {
        let mut body = json!({});
        if let Some(config) = config.filter(|c| !c.is_empty()) {
            config.validate()?;
            body["config"] = json!(config);
        }
        let req = GatewayRequest::post(Provider::Meet, "create_space", "spaces").json_body(body);
        self.gateway.call(req).await?.json("create_space")
    }

    /// Accepts `spaces/{id}` or a bare meeting code.
    pub async fn get_space(&self, name: &str) -> Result<Space> {
        self.get("get_space", names::space(name)?).await
    }

    pub async fn update_space(&self, name: &str, config: &SpaceConfig) -> Result<Space> {
        let name = names::space(name)?;
        if config.is_empty() {
            return Err(Error::validation(
                "update_space needs accessType or entryPointAccess",
            ));
        }
        config.validate()?;
        let req = GatewayRequest::patch(Provider::Meet, "update_space", name)
            .query("updateMask", config.update_mask())
            .json_body(json!({ "config": config }));
        self.gateway.call(req).await?.json("update_space")
    }

    pub async fn end_active_conference(&self, name: &str) -> Result<()> {
        let name = names::space(name)?;
        let req = GatewayRequest::post(
            Provider::Meet,
            "end_active_conference",
            format!("{name}:endActiveConference"),
        )
        .json_body(json!({}));
        self.gateway.call(req).await?;
        Ok(())
    }

    // ── Conference records ──────────────────────────────────────────────────

    pub async fn list_conference_records(
        &self,
        filter: Option<&str>,
        page: &PageRequest,
    ) -> Result<ListPage<ConferenceRecord>> {
        self.list(
            "list_conference_records",
            "conferenceRecords".into(),
            page,
            "conferenceRecords",
            filter,
        )
        .await
    }

    pub async fn get_conference_record(&self, name: &str) -> Result<ConferenceRecord> {
        self.get("get_conference_record", names::conference_record(name)?)
            .await
    }

    pub async fn list_recordings(
        &self,
        record: &str,
        page: &PageRequest,
    ) -> Result<ListPage<Recording>> {
        let parent = names::conference_record(record)?;
        self.list(
            "list_recordings",
            format!("{parent}/recordings"),
            page,
            "recordings",
            None,
        )
        .await
    }

    pub async fn get_recording(&self, name: &str) -> Result<Recording> {
        self.get(
            "get_recording",
            names::normalize(ResourceKind::Recording, name)?,
        )
        .await
    }

    pub async fn list_transcripts(
        &self,
        record: &str,
        page: &PageRequest,
    ) -> Result<ListPage<Transcript>> {
        let parent = names::conference_record(record)?;
        self.list(
            "list_transcripts",
            format!("{parent}/transcripts"),
            page,
            "transcripts",
            None,
        )
        .await
    }

    pub async fn get_transcript(&self, name: &str) -> Result<Transcript> {
        self.get(
            "get_transcript",
            names::normalize(ResourceKind::Transcript, name)?,
        )
        .await
    }

    pub async fn list_transcript_entries(
        &self,
        transcript: &str,
        page: &PageRequest,
    ) -> Result<ListPage<TranscriptEntry>> {
        let parent = names::normalize(ResourceKind::Transcript, transcript)?;
        self.list(
            "list_transcript_entries",
            format!("{parent}/entries"),
            page,
            "transcriptEntries",
            None,
        )
        .await
    }

    pub async fn list_participants(
        &self,
        record: &str,
        filter: Option<&str>,
        page: &PageRequest,
    ) -> Result<ListPage<Participant>> {
        let parent = names::conference_record(record)?;
        self.list(
            "list_participants",
            format!("{parent}/participants"),
            page,
            "participants",
            filter,
        )
        .await
    }

    pub async fn get_participant(&self, name: &str) -> Result<Participant> {
        self.get(
            "get_participant",
            names::normalize(ResourceKind::Participant, name)?,
        )
        .await
    }

    pub async fn list_participant_sessions(
        &self,
        participant: &str,
        page: &PageRequest,
    ) -> Result<ListPage<ParticipantSession>> {
        let parent = names::normalize(ResourceKind::Participant, participant)?;
        self.list(
            "list_participant_sessions",
            format!("{parent}/participantSessions"),
            page,
            "participantSessions",
            None,
        )
        .await
    }

    // ── Members (preview) ───────────────────────────────────────────────────

    pub async fn list_members(&self, space: &str, page: &PageRequest) -> Result<ListPage<Member>> {
        let parent = names::space(space)?;
        page.validate()?;
        let req = page
            .apply(GatewayRequest::get(
                Provider::Meet,
                "list_members",
                format!("{parent}/members"),
            ))
            .preview();
        let resp = self.gateway.call(req).await?;
        ListPage::from_response(resp, "members", "list_members")
    }

    pub async fn get_member(&self, name: &str) -> Result<Member> {
        let name = names::normalize(ResourceKind::Member, name)?;
        let req = GatewayRequest::get(Provider::Meet, "get_member", name).preview();
        self.gateway.call(req).await?.json("get_member")
    }

    pub async fn create_member(
        &self,
        space: &str,
        email: &str,
        role: Option<&str>,
    ) -> Result<Member> {
        let parent = names::space(space)?;
        validate_email(email)?;
        check_enum("role", role, MEMBER_ROLES)?;
        let mut body = json!({ "email": email.trim() });
        if let Some(role) = role {
            body["role"] = json!(role);
        }
        let req = GatewayRequest::post(Provider::Meet, "create_member", format!("{parent}/members"))
            .json_body(body)
            .preview();
        self.gateway.call(req).await?.json("create_member")
    }

    pub async fn delete_member(&self, name: &str) -> Result<()> {
        let name = names::normalize(ResourceKind::Member, name)?;
        let req = GatewayRequest::delete(Provider::Meet, "delete_member", name).preview();
        self.gateway.call(req).await?;
        Ok(())
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn update_mask_lists_set_fields() {
        let config = SpaceConfig {
            access_type: Some("TRUSTED".into()),
            entry_point_access: Some("ALL".into()),
        };
        assert_eq!(
            config.update_mask(),
            "config.accessType,config.entryPointAccess"
        );
        config.validate().unwrap();
    }

    #[test]
    fn unknown_access_type_is_rejected() {
        let config = SpaceConfig {
            access_type: Some("PUBLIC".into()),
            ..Default::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("OPEN, TRUSTED, RESTRICTED"), "{err}");
    }

    #[test]
    fn page_size_bounds() {
        assert!(
            PageRequest {
                page_size: Some(0),
                ..Default::default()
            }
            .validate()
            .is_err()
        );
        assert!(
            PageRequest {
                page_size: Some(101),
                ..Default::default()
            }
            .validate()
            .is_err()
        );
        PageRequest {
            page_size: Some(100),
            ..Default::default()
        }
        .validate()
        .unwrap();
    }

    #[test]
    fn space_deserializes_from_api_shape() {
        let space: Space = serde_json::from_value(json!({
            "name": "spaces/jQCFfuBOdN5z",
            "meetingUri": "https://meet.google.com/abc-mnop-xyz",
            "meetingCode": "abc-mnop-xyz",
            "config": { "accessType": "TRUSTED", "entryPointAccess": "ALL" },
            "activeConference": { "conferenceRecord": "conferenceRecords/r1" }
        }))
        .unwrap();
        assert_eq!(space.meeting_code.as_deref(), Some("abc-mnop-xyz"));
        assert_eq!(
            space.active_conference.unwrap().conference_record,
            "conferenceRecords/r1"
        );
    }
}
