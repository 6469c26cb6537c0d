//! Export format detection and migration to the canonical format.
//!
//! Four export shapes have been written over time. Only the two newest carry
//! an explicit `version`; the older ones are recognised by their structure.
//! Detection is a single classifier with a fixed priority order, followed by
//! a typed parse of the matching variant.

use serde::Deserialize;
use serde_json::Value;

use crate::domain::{
    AppError, Conversation, ExportData, Folder, FolderType, Result, CURRENT_EXPORT_VERSION,
};

use super::cleaner::clean_history;

/// Export format generations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatVersion {
    /// Bare array of conversations.
    V1,
    /// `{history, folders}` without a version.
    V2,
    /// `{version: 3, history, folders}`.
    V3,
    /// `{version: 4, history, folders, prompts}`.
    V4,
}

impl std::fmt::Display for FormatVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::V1 => write!(f, "v1"),
            Self::V2 => write!(f, "v2"),
            Self::V3 => write!(f, "v3"),
            Self::V4 => write!(f, "v4"),
        }
    }
}

/// Folder as written by the version 2 exporter (ids were often numbers).
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LegacyFolder {
    pub id: LegacyId,
    pub name: String,
}

/// An identifier that may be a string or a number.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum LegacyId {
    Text(String),
    Number(serde_json::Number),
}

impl std::fmt::Display for LegacyId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Text(s) => write!(f, "{s}"),
            Self::Number(n) => write!(f, "{n}"),
        }
    }
}

/// Version 2 payload.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ExportV2 {
    #[serde(default)]
    pub history: Option<Vec<Value>>,
    #[serde(default)]
    pub folders: Option<Vec<LegacyFolder>>,
}

/// Version 3 payload.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ExportV3 {
    #[serde(default)]
    pub history: Vec<Conversation>,
    #[serde(default)]
    pub folders: Vec<Folder>,
}

/// Any export payload this tool accepts.
#[derive(Debug, Clone, PartialEq)]
pub enum SupportedExport {
    V1(Vec<Value>),
    V2(ExportV2),
    V3(ExportV3),
    V4(ExportData),
}

impl SupportedExport {
    /// Classifies a JSON value and parses it as the matching variant.
    ///
    /// # Errors
    /// Returns `UnsupportedFormat` if the value matches no known shape or
    /// its body does not fit the detected shape.
    pub fn from_value(value: Value) -> Result<Self> {
        let version = classify(&value)?;
        tracing::debug!(%version, "Detected export format");

        match version {
            FormatVersion::V1 => match value {
                Value::Array(items) => Ok(Self::V1(items)),
                _ => Err(AppError::unsupported("expected an array")),
            },
            FormatVersion::V2 => parse_variant(value, version).map(Self::V2),
            FormatVersion::V3 => parse_variant(value, version).map(Self::V3),
            FormatVersion::V4 => {
                let mut value = value;
                if let Some(fields) = value.as_object_mut() {
                    fields.insert("version".to_string(), CURRENT_EXPORT_VERSION.into());
                }
                parse_variant(value, version).map(Self::V4)
            }
        }
    }

    /// Parses raw JSON text.
    ///
    /// # Errors
    /// Returns a JSON error for malformed text, `UnsupportedFormat` for
    /// well-formed JSON of an unknown shape.
    pub fn from_json(text: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(text).map_err(AppError::json_parse)?;
        Self::from_value(value)
    }

    /// Format generation of this payload.
    #[must_use]
    pub const fn version(&self) -> FormatVersion {
        match self {
            Self::V1(_) => FormatVersion::V1,
            Self::V2(_) => FormatVersion::V2,
            Self::V3(_) => FormatVersion::V3,
            Self::V4(_) => FormatVersion::V4,
        }
    }
}

impl From<ExportData> for SupportedExport {
    fn from(data: ExportData) -> Self {
        Self::V4(data)
    }
}

/// Determines the format generation of a value.
///
/// Checks run in order V1, V2, V3, V4 and the first match wins.
///
/// # Errors
/// Returns `UnsupportedFormat` if no check matches.
pub fn classify(value: &Value) -> Result<FormatVersion> {
    if value.is_array() {
        return Ok(FormatVersion::V1);
    }

    let Some(fields) = value.as_object() else {
        return Err(AppError::unsupported("expected an array or an object"));
    };

    if !fields.contains_key("version")
        && fields.contains_key("folders")
        && fields.contains_key("history")
    {
        return Ok(FormatVersion::V2);
    }

    match fields.get("version").and_then(declared_version) {
        Some(3) => Ok(FormatVersion::V3),
        Some(4) => Ok(FormatVersion::V4),
        _ => Err(AppError::unsupported(match fields.get("version") {
            Some(version) => format!("unknown version {version}"),
            None => "object has no version and is not a version 2 export".to_string(),
        })),
    }
}

/// Migrates any supported payload to the canonical format.
///
/// The canonical format is a fixed point: cleaning a `V4` payload returns it
/// unchanged.
#[must_use]
pub fn clean_data(data: SupportedExport) -> ExportData {
    match data {
        SupportedExport::V1(history) => {
            ExportData::new(clean_history(history), Vec::new(), Vec::new())
        }
        SupportedExport::V2(export) => {
            let folders = export
                .folders
                .unwrap_or_default()
                .into_iter()
                .map(|folder| Folder::new(folder.id.to_string(), folder.name, FolderType::Chat))
                .collect();

            ExportData::new(
                clean_history(export.history.unwrap_or_default()),
                folders,
                Vec::new(),
            )
        }
        SupportedExport::V3(export) => ExportData {
            version: CURRENT_EXPORT_VERSION,
            history: export.history,
            folders: export.folders,
            prompts: Vec::new(),
        },
        SupportedExport::V4(export) => export,
    }
}

/// Reads a whole-number version, so `3` and `3.0` are the same version.
fn declared_version(value: &Value) -> Option<u64> {
    value.as_u64().or_else(|| {
        value
            .as_f64()
            .filter(|v| v.fract() == 0.0 && *v >= 0.0 && *v <= f64::from(u32::MAX))
            .map(|v| v as u64)
    })
}

fn parse_variant<T: serde::de::DeserializeOwned>(value: Value, version: FormatVersion) -> Result<T> {
    serde_json::from_value(value)
        .map_err(|e| AppError::unsupported(format!("invalid {version} export: {e}")))
}
