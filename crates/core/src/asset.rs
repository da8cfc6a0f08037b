//! Asset identifiers, records and field validation.

use crate::tag::Tag;
use serde::{Deserialize, Serialize};
use std::fmt;
use time::OffsetDateTime;
use uuid::Uuid;

/// Unique identifier for an asset.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AssetId(Uuid);

impl AssetId {
    /// Generate a new random asset ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parse from a string.
    pub fn parse(s: &str) -> crate::Result<Self> {
        Uuid::parse_str(s)
            .map(Self)
            .map_err(|e| crate::Error::InvalidId(format!("invalid asset ID: {e}")))
    }

    /// Get the underlying UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for AssetId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Uuid> for AssetId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

impl fmt::Debug for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AssetId({})", self.0)
    }
}

impl fmt::Display for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A catalogued file plus its metadata.
///
/// `blob_key` is assigned once at creation and never reassigned; re-uploading
/// a file produces a new asset with a new key.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Asset {
    pub id: AssetId,
    /// Display name (mutable).
    pub filename: String,
    /// Key of the asset's bytes in the blob store.
    pub blob_key: String,
    /// Declared content type, as supplied by the uploader.
    pub content_type: String,
    pub size_bytes: u64,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub duration_secs: Option<f64>,
    /// Free-text description (mutable).
    pub description: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    /// Updated on any mutation of the record.
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
    pub owner_id: Option<Uuid>,
    /// Current tag set, attached at read time.
    #[serde(default)]
    pub tags: Vec<Tag>,
}

impl Asset {
    /// Classify the declared content type.
    pub fn kind(&self) -> ContentKind {
        ContentKind::from_content_type(&self.content_type)
    }
}

/// Fields supplied when creating an asset record.
#[derive(Clone, Debug)]
pub struct NewAsset {
    pub id: AssetId,
    pub filename: String,
    pub blob_key: String,
    pub content_type: String,
    pub size_bytes: u64,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub duration_secs: Option<f64>,
    pub description: Option<String>,
    pub owner_id: Option<Uuid>,
    pub created_at: OffsetDateTime,
}

impl NewAsset {
    /// Build the record an upload will persist once its blob is written.
    pub fn from_upload(
        filename: &str,
        content_type: &str,
        size_bytes: u64,
    ) -> crate::Result<Self> {
        let filename = validate_filename(filename)?;
        let id = AssetId::new();
        let content_type = match content_type.trim() {
            "" => "application/octet-stream".to_string(),
            ct => ct.to_string(),
        };
        Ok(Self {
            blob_key: blob_key_for(id, &filename),
            id,
            filename,
            content_type,
            size_bytes,
            width: None,
            height: None,
            duration_secs: None,
            description: None,
            owner_id: None,
            created_at: OffsetDateTime::now_utc(),
        })
    }

    /// Materialize the record as an untagged asset.
    pub fn into_asset(self) -> Asset {
        Asset {
            id: self.id,
            filename: self.filename,
            blob_key: self.blob_key,
            content_type: self.content_type,
            size_bytes: self.size_bytes,
            width: self.width,
            height: self.height,
            duration_secs: self.duration_secs,
            description: self.description,
            created_at: self.created_at,
            updated_at: self.created_at,
            owner_id: self.owner_id,
            tags: Vec::new(),
        }
    }
}

/// Editable asset fields. `None` leaves a field unchanged.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct AssetPatch {
    pub filename: Option<String>,
    /// `Some("")` clears the description.
    pub description: Option<String>,
}

impl AssetPatch {
    /// Validate and normalize the patch.
    pub fn validated(self) -> crate::Result<Self> {
        let filename = self.filename.as_deref().map(validate_filename).transpose()?;
        Ok(Self {
            filename,
            description: self.description.map(|d| d.trim().to_string()),
        })
    }

    /// Check whether the patch changes nothing.
    pub fn is_empty(&self) -> bool {
        self.filename.is_none() && self.description.is_none()
    }
}

/// Validate a filename, returning it trimmed.
pub fn validate_filename(filename: &str) -> crate::Result<String> {
    let trimmed = filename.trim();
    if trimmed.is_empty() {
        return Err(crate::Error::Validation(
            "filename must not be empty".to_string(),
        ));
    }
    if trimmed.len() > crate::MAX_FILENAME_LEN {
        return Err(crate::Error::Validation(format!(
            "filename exceeds {} bytes",
            crate::MAX_FILENAME_LEN
        )));
    }
    Ok(trimmed.to_string())
}

/// Derive the blob key for a new asset.
///
/// The key embeds the asset ID, so two uploads never share a blob even when
/// their filenames collide.
pub fn blob_key_for(id: AssetId, filename: &str) -> String {
    let mut name: String = filename
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .take(128)
        .collect();
    // Leading dots would produce hidden files (and ".." components) on disk.
    while name.starts_with('.') {
        name.remove(0);
    }
    if name.is_empty() {
        name.push_str("blob");
    }
    format!("assets/{}/{}", id, name)
}

/// Coarse media classification of a declared content type.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentKind {
    Image,
    Video,
    Audio,
    Document,
    Other,
}

impl ContentKind {
    /// Classify a content type by its declared prefix. No byte sniffing.
    pub fn from_content_type(content_type: &str) -> Self {
        let ct = content_type.trim().to_ascii_lowercase();
        if ct.starts_with("image/") {
            Self::Image
        } else if ct.starts_with("video/") {
            Self::Video
        } else if ct.starts_with("audio/") {
            Self::Audio
        } else if ct.starts_with("text/")
            || ct == "application/pdf"
            || ct.starts_with("application/msword")
            || ct.starts_with("application/vnd.openxmlformats-officedocument")
        {
            Self::Document
        } else {
            Self::Other
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_asset_id_parse_roundtrip() {
        let id = AssetId::new();
        let parsed = AssetId::parse(&id.to_string()).unwrap();
        assert_eq!(id, parsed);
        assert!(AssetId::parse("not-a-uuid").is_err());
    }

    #[test]
    fn test_validate_filename_rejects_blank() {
        assert!(validate_filename("").is_err());
        assert!(validate_filename("   ").is_err());
        assert_eq!(validate_filename("  report.pdf ").unwrap(), "report.pdf");
    }

    #[test]
    fn test_validate_filename_rejects_oversized() {
        let long = "a".repeat(crate::MAX_FILENAME_LEN + 1);
        assert!(validate_filename(&long).is_err());
    }

    #[test]
    fn test_blob_key_is_scoped_by_asset_id() {
        let a = AssetId::new();
        let b = AssetId::new();
        let ka = blob_key_for(a, "photo.jpg");
        let kb = blob_key_for(b, "photo.jpg");
        assert_ne!(ka, kb);
        assert_eq!(ka, format!("assets/{a}/photo.jpg"));
    }

    #[test]
    fn test_blob_key_sanitizes_traversal() {
        let id = AssetId::new();
        let key = blob_key_for(id, "../../etc/passwd");
        assert!(!key.contains(".."));
        assert!(key.starts_with(&format!("assets/{id}/")));
        assert_eq!(key.matches('/').count(), 2);

        let key = blob_key_for(id, "...");
        assert_eq!(key, format!("assets/{id}/blob"));
    }

    #[test]
    fn test_new_asset_defaults_content_type() {
        let asset = NewAsset::from_upload("data.bin", "  ", 3).unwrap();
        assert_eq!(asset.content_type, "application/octet-stream");
        assert!(asset.blob_key.ends_with("/data.bin"));
    }

    #[test]
    fn test_patch_validation() {
        let patch = AssetPatch {
            filename: Some(" new.png ".to_string()),
            description: Some("  ".to_string()),
        }
        .validated()
        .unwrap();
        assert_eq!(patch.filename.as_deref(), Some("new.png"));
        assert_eq!(patch.description.as_deref(), Some(""));

        let bad = AssetPatch {
            filename: Some("".to_string()),
            description: None,
        };
        assert!(bad.validated().is_err());
        assert!(AssetPatch::default().is_empty());
    }

    #[test]
    fn test_content_kind() {
        assert_eq!(ContentKind::from_content_type("image/png"), ContentKind::Image);
        assert_eq!(ContentKind::from_content_type("VIDEO/mp4"), ContentKind::Video);
        assert_eq!(ContentKind::from_content_type("audio/ogg"), ContentKind::Audio);
        assert_eq!(
            ContentKind::from_content_type("application/pdf"),
            ContentKind::Document
        );
        assert_eq!(
            ContentKind::from_content_type("application/zip"),
            ContentKind::Other
        );
    }
}
