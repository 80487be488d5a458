//! Resource-name normalization and validation.
//!
//! Top-level names may be given bare (`abc-defg-hij`) or prefixed
//! (`spaces/abc-defg-hij`); the prefix is added only when missing. Nested
//! names must be given in full. Every name is checked against its pattern
//! before a request is built.

use std::sync::LazyLock;

use regex::Regex;

use crate::error::{Error, Result};

const SEGMENT: &str = "[A-Za-z0-9_-]+";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    Space,
    ConferenceRecord,
    Recording,
    Transcript,
    TranscriptEntry,
    Participant,
    ParticipantSession,
    Member,
}

impl ResourceKind {
    fn label(self) -> &'static str {
        match self {
            Self::Space => "space",
            Self::ConferenceRecord => "conference record",
            Self::Recording => "recording",
            Self::Transcript => "transcript",
            Self::TranscriptEntry => "transcript entry",
            Self::Participant => "participant",
            Self::ParticipantSession => "participant session",
            Self::Member => "member",
        }
    }

    /// Collection prefix for top-level kinds.
    fn prefix(self) -> Option<&'static str> {
        match self {
            Self::Space => Some("spaces"),
            Self::ConferenceRecord => Some("conferenceRecords"),
            _ => None,
        }
    }

    fn example(self) -> &'static str {
        match self {
            Self::Space => "spaces/{space} or a meeting code like abc-defg-hij",
            Self::ConferenceRecord => "conferenceRecords/{record}",
            Self::Recording => "conferenceRecords/{record}/recordings/{recording}",
            Self::Transcript => "conferenceRecords/{record}/transcripts/{transcript}",
            Self::TranscriptEntry => {
                "conferenceRecords/{record}/transcripts/{transcript}/entries/{entry}"
            },
            Self::Participant => "conferenceRecords/{record}/participants/{participant}",
            Self::ParticipantSession => {
                "conferenceRecords/{record}/participants/{participant}/participantSessions/{session}"
            },
            Self::Member => "spaces/{space}/members/{member}",
        }
    }

    fn collections(self) -> &'static [&'static str] {
        match self {
            Self::Space => &["spaces"],
            Self::ConferenceRecord => &["conferenceRecords"],
            Self::Recording => &["conferenceRecords", "recordings"],
            Self::Transcript => &["conferenceRecords", "transcripts"],
            Self::TranscriptEntry => &["conferenceRecords", "transcripts", "entries"],
            Self::Participant => &["conferenceRecords", "participants"],
            Self::ParticipantSession => {
                &["conferenceRecords", "participants", "participantSessions"]
            },
            Self::Member => &["spaces", "members"],
        }
    }

    fn pattern(self) -> Option<&'static Regex> {
        static PATTERNS: LazyLock<Vec<(ResourceKind, Regex)>> = LazyLock::new(|| {
            ALL_KINDS
                .iter()
                .filter_map(|kind| {
                    let body = kind
                        .collections()
                        .iter()
                        .map(|c| format!("{c}/{SEGMENT}"))
                        .collect::<Vec<_>>()
                        .join("/");
                    Regex::new(&format!("^{body}$")).ok().map(|re| (*kind, re))
                })
                .collect()
        });

        PATTERNS.iter().find(|(k, _)| *k == self).map(|(_, re)| re)
    }
}

const ALL_KINDS: [ResourceKind; 8] = [
    ResourceKind::Space,
    ResourceKind::ConferenceRecord,
    ResourceKind::Recording,
    ResourceKind::Transcript,
    ResourceKind::TranscriptEntry,
    ResourceKind::Participant,
    ResourceKind::ParticipantSession,
    ResourceKind::Member,
];

/// Normalize and validate a resource name.
pub fn normalize(kind: ResourceKind, raw: &str) -> Result<String> {
    let raw = raw.trim().trim_matches('/');
    if raw.is_empty() {
        return Err(Error::validation(format!("{} name is empty", kind.label())));
    }

    let full = match kind.prefix() {
        Some(prefix) if !raw.contains('/') => format!("{prefix}/{raw}"),
        _ => raw.to_string(),
    };

    if kind.pattern().is_some_and(|re| re.is_match(&full)) {
        Ok(full)
    } else {
        Err(Error::validation(format!(
            "invalid {} name '{raw}': expected {}",
            kind.label(),
            kind.example()
        )))
    }
}

pub fn space(raw: &str) -> Result<String> {
    normalize(ResourceKind::Space, raw)
}

pub fn conference_record(raw: &str) -> Result<String> {
    normalize(ResourceKind::ConferenceRecord, raw)
}

/// Validate a single path segment supplied by a caller (calendar or event id).
pub fn path_segment(label: &str, raw: &str) -> Result<String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(Error::validation(format!("{label} is empty")));
    }
    if raw.contains('/') {
        return Err(Error::validation(format!("{label} must not contain '/'")));
    }
    Ok(urlencoding::encode(raw).into_owned())
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, rstest::rstest};

    #[rstest]
    #[case::bare_code(ResourceKind::Space, "abc-defg-hij", "spaces/abc-defg-hij")]
    #[case::prefixed(ResourceKind::Space, "spaces/jQCFfuBOdN5z", "spaces/jQCFfuBOdN5z")]
    #[case::slashes(ResourceKind::Space, " /spaces/x1/ ", "spaces/x1")]
    #[case::record(ResourceKind::ConferenceRecord, "rec_1", "conferenceRecords/rec_1")]
    #[case::recording(
        ResourceKind::Recording,
        "conferenceRecords/r1/recordings/a2",
        "conferenceRecords/r1/recordings/a2"
    )]
    #[case::member(ResourceKind::Member, "spaces/s1/members/m1", "spaces/s1/members/m1")]
    fn accepted(#[case] kind: ResourceKind, #[case] raw: &str, #[case] expected: &str) {
        assert_eq!(normalize(kind, raw).unwrap(), expected);
    }

    #[rstest]
    #[case::empty(ResourceKind::Space, "")]
    #[case::wrong_collection(ResourceKind::Space, "conferenceRecords/x")]
    #[case::bad_chars(ResourceKind::Space, "abc def")]
    #[case::nested_bare(ResourceKind::Recording, "a2")]
    #[case::partial(ResourceKind::Participant, "conferenceRecords/r1/participants")]
    #[case::traversal(ResourceKind::Space, "spaces/../x")]
    fn rejected(#[case] kind: ResourceKind, #[case] raw: &str) {
        let err = normalize(kind, raw).unwrap_err();
        assert!(matches!(err, Error::Validation(_)), "{err}");
    }

    #[test]
    fn segment_is_encoded() {
        assert_eq!(
            path_segment("calendar id", "team@group.calendar.google.com").unwrap(),
            "team%40group.calendar.google.com"
        );
        assert!(path_segment("event id", "a/b").is_err());
    }
}
