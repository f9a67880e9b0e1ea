//! Native-to-canonical adapters.
//!
//! One module per backend schema generation. Each maps native field
//! classes onto [`AttributeKind`](crate::attribute::AttributeKind) (a
//! total function — anything unrecognized becomes `Unsupported`), decodes
//! native fields into canonical attributes, and encodes an entity back
//! into its native record shape, preserving field identity.
//!
//! The adapters are pure: no I/O, no errors. Malformed native payloads
//! decode to absent values, never failures.

pub mod v3;
pub mod v4;
pub mod v2011;

use crmid_api::{NativeRecord, SchemaVersion};

use crate::entity::CrmEntity;

/// Adapt a native record, whatever its version, into an entity.
pub fn entity_from_native(record: &NativeRecord) -> CrmEntity {
    match record {
        NativeRecord::V3(rec) => v3::entity_from_record(rec),
        NativeRecord::V4(rec) => v4::entity_from_record(rec),
        NativeRecord::V2011(rec) => v2011::entity_from_record(rec),
    }
}

/// Encode an entity into the native record shape of `version`.
pub fn entity_to_native(entity: &CrmEntity, version: SchemaVersion) -> NativeRecord {
    match version {
        SchemaVersion::V3 => NativeRecord::V3(v3::record_from_entity(entity)),
        SchemaVersion::V4 => NativeRecord::V4(v4::record_from_entity(entity)),
        SchemaVersion::V2011 => NativeRecord::V2011(v2011::record_from_entity(entity)),
    }
}

/// The entity id recovered from a decoded attribute collection: the
/// first primary-key attribute, if any. V2011 carries the id on the
/// record envelope instead; its adapter prefers that.
pub(crate) fn id_from_attributes(
    attributes: &crate::collection::AttributeCollection,
) -> Option<uuid::Uuid> {
    attributes.iter().find_map(|(_, attr)| {
        if let crate::attribute::AttributeValue::Key(Some(id)) = attr.value() {
            Some(*id)
        } else {
            None
        }
    })
}
