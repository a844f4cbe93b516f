// SPDX-License-Identifier: MIT OR Apache-2.0

//! Identifiers of submissions, comments and the actors working on them.
use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

use crate::types::impl_wire_str;

/// Number of random bytes used for locally generated comment ids.
const COMMENT_ID_LEN: usize = 16;

/// Opaque identifier of a submission as assigned by the backend.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubmissionId(String);

impl SubmissionId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for SubmissionId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SubmissionId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for SubmissionId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Identifier of a comment.
///
/// Comments are created locally before they are persisted, the id is generated on this side so the
/// echo of our own insert can be recognised when it comes back through a subscription.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CommentId(String);

impl CommentId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn random() -> Self {
        let bytes: [u8; COMMENT_ID_LEN] = rand::random();
        Self(hex::encode(bytes))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for CommentId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CommentId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Identifier of an authenticated user.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActorId(String);

impl ActorId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for ActorId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ActorId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Someone (or something) a write can be attributed to.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Actor {
    pub id: ActorId,
    pub name: String,
}

impl Actor {
    pub fn new(id: impl Into<ActorId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }

    /// Author of comments which are generated by the workflow itself, for example escalation
    /// notes or automated approvals.
    pub fn system() -> Self {
        Self::new("system", "Approval System")
    }

    pub fn is_system(&self) -> bool {
        self.id.as_str() == "system"
    }
}

impl Display for Actor {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.name)
    }
}

/// Role of the dashboard user, decides how their comments are classified.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    #[default]
    Steward,
    Producer,
    Consumer,
}

impl Role {
    pub const ALL: [Role; 3] = [Role::Steward, Role::Producer, Role::Consumer];

    pub const fn as_str(&self) -> &'static str {
        match self {
            Role::Steward => "steward",
            Role::Producer => "producer",
            Role::Consumer => "consumer",
        }
    }
}

impl_wire_str!(Role, "role");
