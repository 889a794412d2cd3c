//! Inbound request context: archive source and temporal semantics.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{OstrichError, OstrichResult};
use crate::types::QuadPattern;

/// Version number meaning "the latest version of the archive".
pub const LATEST_VERSION: i64 = -1;

/// Source type that identifies a versioned archive path.
pub const ARCHIVE_SOURCE_TYPE: &str = "ostrichFile";

/// Temporal semantics of one query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum TemporalContext {
    /// Triples valid at one version.
    #[serde(rename_all = "camelCase")]
    VersionMaterialization { version: i64 },
    /// Triples added (or removed) between two versions.
    #[serde(rename_all = "camelCase")]
    DeltaMaterialization {
        version_start: i64,
        version_end: i64,
        query_additions: bool,
    },
    /// Every triple ever present, annotated with its versions.
    VersionQuery,
}

impl TemporalContext {
    /// Materialize the given version.
    pub fn version(version: i64) -> Self {
        Self::VersionMaterialization { version }
    }

    /// Materialize additions (`query_additions = true`) or deletions between two versions.
    pub fn delta(version_start: i64, version_end: i64, query_additions: bool) -> Self {
        Self::DeltaMaterialization {
            version_start,
            version_end,
            query_additions,
        }
    }

    /// Short name used in logs.
    pub fn mode_name(&self) -> &'static str {
        match self {
            Self::VersionMaterialization { .. } => "version-materialization",
            Self::DeltaMaterialization { .. } => "delta-materialization",
            Self::VersionQuery => "version-query",
        }
    }
}

impl Default for TemporalContext {
    fn default() -> Self {
        Self::VersionMaterialization {
            version: LATEST_VERSION,
        }
    }
}

/// One data source named by the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceDescriptor {
    #[serde(rename = "type")]
    pub source_type: String,
    pub value: String,
}

impl SourceDescriptor {
    /// Describe a versioned archive at `path`.
    pub fn archive(path: impl AsRef<Path>) -> Self {
        Self {
            source_type: ARCHIVE_SOURCE_TYPE.to_string(),
            value: path.as_ref().display().to_string(),
        }
    }

    /// Describe a source of any other type.
    pub fn new(source_type: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            source_type: source_type.into(),
            value: value.into(),
        }
    }

    /// Whether this source is a versioned archive.
    pub fn is_archive(&self) -> bool {
        self.source_type == ARCHIVE_SOURCE_TYPE
    }
}

/// Context supplied by the surrounding query engine.
///
/// The temporal context is kept as the raw value the host handed over; it is
/// only interpreted by [`QueryContext::temporal_context`], which is where
/// unrecognized shapes get rejected.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryContext {
    #[serde(default)]
    pub sources: Vec<SourceDescriptor>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<serde_json::Value>,
}

impl QueryContext {
    /// Create an empty context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Context with a single archive source.
    pub fn for_archive(path: impl AsRef<Path>) -> Self {
        Self::new().with_source(SourceDescriptor::archive(path))
    }

    /// Add a source.
    pub fn with_source(mut self, source: SourceDescriptor) -> Self {
        self.sources.push(source);
        self
    }

    /// Set a typed temporal context.
    pub fn with_version(mut self, version: TemporalContext) -> Self {
        self.version = serde_json::to_value(version).ok();
        self
    }

    /// Set the temporal context exactly as the host provided it.
    pub fn with_raw_version(mut self, version: serde_json::Value) -> Self {
        self.version = Some(version);
        self
    }

    /// The archive path when the context names exactly one archive source.
    pub fn single_archive_source(&self) -> Option<&str> {
        match self.sources.as_slice() {
            [source] if source.is_archive() => Some(source.value.as_str()),
            _ => None,
        }
    }

    /// Interpret the temporal context, defaulting to the latest version.
    pub fn temporal_context(&self) -> OstrichResult<TemporalContext> {
        match &self.version {
            None => Ok(TemporalContext::default()),
            Some(raw) => serde_json::from_value(raw.clone()).map_err(|e| {
                OstrichError::invalid_version_context(format!(
                    "unrecognized temporal context {raw}: {e}"
                ))
            }),
        }
    }
}

/// One resolve request: the pattern plus the context it runs in.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolveAction {
    pub pattern: QuadPattern,
    pub context: QueryContext,
}

impl ResolveAction {
    /// Create a resolve request.
    pub fn new(pattern: QuadPattern, context: QueryContext) -> Self {
        Self { pattern, context }
    }
}
