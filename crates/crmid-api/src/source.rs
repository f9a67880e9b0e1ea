// ── Backend schema versions and the record-fetch contract ──
//
// The three schema generations are mutually incompatible on the wire.
// `NativeRecord` / `NativeMetadata` carry a response in whichever shape
// the connected backend speaks; `crmid-core` adapts them into the
// canonical attribute model.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use uuid::Uuid;

use crate::error::ApiError;
use crate::{v3, v4, v2011};

/// The three supported backend schema generations.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum SchemaVersion {
    /// Classic typed-wrapper schema (field list, `{"Value": …}` payloads).
    V3,
    /// Property-bag schema with explicit `IsNull` markers.
    V4,
    /// Loosely-typed attribute schema with a formatted-values side table.
    V2011,
}

/// A record in whichever native shape the connected backend returned.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "version", rename_all = "lowercase")]
pub enum NativeRecord {
    V3(v3::RecordV3),
    V4(v4::RecordV4),
    V2011(v2011::RecordV2011),
}

impl NativeRecord {
    pub fn version(&self) -> SchemaVersion {
        match self {
            Self::V3(_) => SchemaVersion::V3,
            Self::V4(_) => SchemaVersion::V4,
            Self::V2011(_) => SchemaVersion::V2011,
        }
    }
}

/// Entity-type metadata in whichever native shape the backend returned.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "version", rename_all = "lowercase")]
pub enum NativeMetadata {
    V3(v3::EntityMetadataV3),
    V4(v4::EntityMetadataV4),
    V2011(v2011::EntityMetadataV2011),
}

/// Contract for the collaborator that talks to the remote backend.
///
/// The core never initiates transport itself: it hands a logical name and
/// id to a `RecordSource` and adapts whatever native shape comes back.
/// Implementations are expected to perform their own retries, if any.
pub trait RecordSource: Send + Sync {
    /// The schema generation this source speaks.
    fn version(&self) -> SchemaVersion;

    /// Fetch a single record with its full field list.
    fn fetch_record(&self, logical_name: &str, id: Uuid) -> Result<NativeRecord, ApiError>;

    /// Fetch the entity-type description for `logical_name`.
    fn fetch_metadata(&self, logical_name: &str) -> Result<NativeMetadata, ApiError>;

    /// Write a record back to the backend.
    fn save_record(&self, record: &NativeRecord) -> Result<(), ApiError>;
}
