// crmid-api: native record and metadata models for the three CRM backend
// schema generations, plus the collaborator contract used to fetch them.
//
// Nothing in this crate performs I/O. Implementations of [`RecordSource`]
// own the transport; this crate only shapes what travels over it.

pub mod error;
pub mod source;
pub mod v3;
pub mod v4;
pub mod v2011;

pub use error::ApiError;
pub use source::{NativeMetadata, NativeRecord, RecordSource, SchemaVersion};
