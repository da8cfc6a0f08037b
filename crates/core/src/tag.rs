//! Tag identifiers, records and field validation.

use serde::{Deserialize, Serialize};
use std::fmt;
use time::OffsetDateTime;
use uuid::Uuid;

/// Color assigned to tags created without one.
pub const DEFAULT_TAG_COLOR: &str = "#3b82f6";

/// Unique identifier for a tag.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TagId(Uuid);

impl TagId {
    /// Generate a new random tag ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parse from a string.
    pub fn parse(s: &str) -> crate::Result<Self> {
        Uuid::parse_str(s)
            .map(Self)
            .map_err(|e| crate::Error::InvalidId(format!("invalid tag ID: {e}")))
    }

    /// Get the underlying UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for TagId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Uuid> for TagId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

impl fmt::Debug for TagId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TagId({})", self.0)
    }
}

impl fmt::Display for TagId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A named, colored label attachable to assets.
///
/// Names are not required to be unique. A tag may exist with no assets.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub id: TagId,
    pub name: String,
    /// Display attribute, opaque to the catalog.
    pub color: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// Fields supplied when creating a tag.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewTag {
    pub name: String,
    #[serde(default)]
    pub color: Option<String>,
}

impl NewTag {
    /// Validate the request and materialize the tag record.
    pub fn into_tag(self) -> crate::Result<Tag> {
        let name = validate_tag_name(&self.name)?;
        let color = match self.color {
            Some(color) => validate_color(&color)?,
            None => DEFAULT_TAG_COLOR.to_string(),
        };
        Ok(Tag {
            id: TagId::new(),
            name,
            color,
            created_at: OffsetDateTime::now_utc(),
        })
    }
}

/// Editable tag fields. `None` leaves a field unchanged.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagPatch {
    pub name: Option<String>,
    pub color: Option<String>,
}

impl TagPatch {
    /// Validate and normalize the patch.
    pub fn validated(self) -> crate::Result<Self> {
        Ok(Self {
            name: self.name.as_deref().map(validate_tag_name).transpose()?,
            color: self.color.as_deref().map(validate_color).transpose()?,
        })
    }

    /// Check whether the patch changes nothing.
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.color.is_none()
    }
}

/// Validate a tag name, returning it trimmed.
pub fn validate_tag_name(name: &str) -> crate::Result<String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(crate::Error::Validation(
            "tag name must not be empty".to_string(),
        ));
    }
    if trimmed.len() > crate::MAX_TAG_NAME_LEN {
        return Err(crate::Error::Validation(format!(
            "tag name exceeds {} bytes",
            crate::MAX_TAG_NAME_LEN
        )));
    }
    Ok(trimmed.to_string())
}

/// Validate a tag color. The value is otherwise opaque.
pub fn validate_color(color: &str) -> crate::Result<String> {
    let trimmed = color.trim();
    if trimmed.is_empty() {
        return Err(crate::Error::Validation(
            "tag color must not be empty".to_string(),
        ));
    }
    if trimmed.len() > crate::MAX_TAG_COLOR_LEN {
        return Err(crate::Error::Validation(format!(
            "tag color exceeds {} bytes",
            crate::MAX_TAG_COLOR_LEN
        )));
    }
    Ok(trimmed.to_string())
}
