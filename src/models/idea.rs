//! Idea, tag and idea-tag link models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ids::{IdeaId, ProjectId, TagId};

/// A captured idea, optionally attached to a project
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Idea {
    pub id: IdeaId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_id: Option<ProjectId>,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Idea {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            id: IdeaId::new(),
            project_id: None,
            title: title.into(),
            body: None,
            created_at: Utc::now(),
        }
    }
}

/// A label that can be attached to ideas
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tag {
    pub id: TagId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

impl Tag {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: TagId::new(),
            name: name.into(),
            color: None,
        }
    }
}

/// Many-to-many link between an idea and a tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdeaTagLink {
    pub idea_id: IdeaId,
    pub tag_id: TagId,
}
