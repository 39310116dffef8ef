//! Other-party resolution.
//!
//! A conversation record names its participants in several redundant ways
//! (sender/receiver ids, candidate/recruiter ids, assorted name and avatar
//! fields). Given the current user, these functions decide which participant
//! is "the other party" and pick the best display name and avatar available
//! for them. Resolution is a pure function of its inputs; issuing follow-up
//! detail fetches is the caller's job.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::payload::{string_field, RawConversation};

const DETAIL_NAME_KEYS: &[&str] = &[
    "name",
    "full_name",
    "fullName",
    "display_name",
    "displayName",
    "company_name",
    "companyName",
];
const DETAIL_AVATAR_KEYS: &[&str] = &[
    "avatar",
    "avatar_url",
    "avatarUrl",
    "photo",
    "image",
    "profile_image",
    "profileImage",
    "logo",
];

/// Which side of the marketplace the current user is on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PartyRole {
    Candidate,
    Recruiter,
}

/// The signed-in user, as far as resolution needs to know them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrentUser {
    pub id: String,
    pub display_name: Option<String>,
    pub role: PartyRole,
}

impl CurrentUser {
    pub fn new(id: impl Into<String>, role: PartyRole) -> Self {
        Self {
            id: id.into(),
            display_name: None,
            role,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }
}

/// How trustworthy a resolved name is. Ranks are ordered so a later,
/// lower-quality result can be rejected instead of overwriting an
/// established better one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum NameConfidence {
    /// Synthesized `conv-<id>` filler, no real data behind it.
    Placeholder,
    /// Chosen by the role heuristic without an id match.
    Heuristic,
    /// Backed by an explicit id match on the record.
    Explicit,
    /// Backed by a participant-detail fetch.
    Verified,
}

/// Resolution result: the other party's id (when determinable), the best
/// known name/avatar, and how much to trust the name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedParty {
    pub party_id: Option<String>,
    pub name: Option<String>,
    pub avatar: Option<String>,
    pub confidence: NameConfidence,
}

/// Participant detail record (candidate or recruiter lookup response).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParticipantDetail {
    pub id: String,
    pub name: Option<String>,
    pub avatar: Option<String>,
}

impl ParticipantDetail {
    pub fn from_value(id: impl Into<String>, value: &Value) -> Self {
        Self {
            id: id.into(),
            name: string_field(value, DETAIL_NAME_KEYS),
            avatar: string_field(value, DETAIL_AVATAR_KEYS),
        }
    }
}

#[derive(Debug, Clone, Default)]
struct SideFields {
    id: Option<String>,
    name: Option<String>,
    avatar: Option<String>,
}

fn candidate_side(raw: &RawConversation) -> SideFields {
    SideFields {
        id: raw.candidate_id.clone(),
        name: raw.candidate_name.clone(),
        avatar: raw.candidate_avatar.clone(),
    }
}

fn recruiter_side(raw: &RawConversation) -> SideFields {
    SideFields {
        id: raw.recruiter_id.clone(),
        name: raw.recruiter_name.clone(),
        avatar: raw.recruiter_avatar.clone(),
    }
}

/// Sender/receiver sides carry no avatar of their own; when their id lines
/// up with a candidate/recruiter id, borrow that side's name and avatar.
fn enrich(mut side: SideFields, raw: &RawConversation) -> SideFields {
    if side.id.is_some() && side.id == raw.candidate_id {
        let role_side = candidate_side(raw);
        side.name = side.name.or(role_side.name);
        side.avatar = side.avatar.or(role_side.avatar);
    } else if side.id.is_some() && side.id == raw.recruiter_id {
        let role_side = recruiter_side(raw);
        side.name = side.name.or(role_side.name);
        side.avatar = side.avatar.or(role_side.avatar);
    }
    side
}

fn sender_side(raw: &RawConversation) -> SideFields {
    enrich(
        SideFields {
            id: raw.sender_id.clone(),
            name: raw.sender_name.clone(),
            avatar: None,
        },
        raw,
    )
}

fn receiver_side(raw: &RawConversation) -> SideFields {
    enrich(
        SideFields {
            id: raw.receiver_id.clone(),
            name: raw.receiver_name.clone(),
            avatar: None,
        },
        raw,
    )
}

/// Rule 1: explicit sender/receiver ids where the user is one of them.
fn explicit_pair(raw: &RawConversation, user: &CurrentUser) -> Option<(SideFields, SideFields)> {
    let sender = raw.sender_id.as_deref()?;
    let receiver = raw.receiver_id.as_deref()?;
    if user.id == sender {
        Some((receiver_side(raw), sender_side(raw)))
    } else if user.id == receiver {
        Some((sender_side(raw), receiver_side(raw)))
    } else {
        None
    }
}

/// Rule 2: candidate/recruiter ids where the user matches one role.
fn role_pair(raw: &RawConversation, user: &CurrentUser) -> Option<(SideFields, SideFields)> {
    if raw.candidate_id.as_deref() == Some(user.id.as_str()) {
        Some((recruiter_side(raw), candidate_side(raw)))
    } else if raw.recruiter_id.as_deref() == Some(user.id.as_str()) {
        Some((candidate_side(raw), recruiter_side(raw)))
    } else {
        None
    }
}

/// Rule 3: no id matched; fall back on which side of the marketplace the
/// user is on.
fn heuristic_pair(raw: &RawConversation, user: &CurrentUser) -> (SideFields, SideFields) {
    match user.role {
        PartyRole::Recruiter => (candidate_side(raw), recruiter_side(raw)),
        PartyRole::Candidate => (recruiter_side(raw), candidate_side(raw)),
    }
}

/// Determine the other party and select their display name and avatar.
///
/// Rules are tried in order, first match wins; missing fields fall through
/// silently. When a `detail` record for the resolved party is supplied, its
/// name and avatar take precedence and the result is [`NameConfidence::Verified`].
pub fn resolve_other_party(
    raw: &RawConversation,
    user: &CurrentUser,
    detail: Option<&ParticipantDetail>,
) -> ResolvedParty {
    let (mut other, own, rule_confidence) = match explicit_pair(raw, user).or_else(|| role_pair(raw, user)) {
        Some((other, own)) => (other, own, NameConfidence::Explicit),
        None => {
            let (other, own) = heuristic_pair(raw, user);
            (other, own, NameConfidence::Heuristic)
        }
    };

    // A name that matches the user's own is a misresolution; flip to the
    // opposite side's name when one exists.
    if let (Some(name), Some(own_name)) = (other.name.as_deref(), user.display_name.as_deref()) {
        if name == own_name {
            if let Some(flipped) = own.name.clone().filter(|n| n != own_name) {
                other.name = Some(flipped);
            }
        }
    }

    let mut resolved = ResolvedParty {
        confidence: if other.name.is_some() {
            rule_confidence
        } else {
            NameConfidence::Placeholder
        },
        party_id: other.id,
        name: other.name,
        avatar: other.avatar,
    };

    if let Some(detail) = detail {
        let describes_party = resolved.party_id.as_deref() == Some(detail.id.as_str())
            || resolved.party_id.is_none();
        if describes_party && detail.name.is_some() {
            resolved.party_id = Some(detail.id.clone());
            resolved.name = detail.name.clone();
            resolved.avatar = detail.avatar.clone().or(resolved.avatar);
            resolved.confidence = NameConfidence::Verified;
        }
    }

    resolved
}
