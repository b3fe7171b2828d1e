//! A11y Autofix Gateway: external collaborators of the remediation engine
//!
//! This crate owns every boundary the engine talks across:
//!
//! - `SpacecatDirectory`: read-only site / opportunity / suggestion catalog
//! - `S3ObjectStore`: blob storage for source-tree snapshots
//! - `SqsWorkQueue`: delivery channel to the remediation worker
//! - `TarGzArchiveBuilder`: snapshot compression and tree fingerprinting
//!
//! Each boundary is a trait in [`traits`] with an in-memory fake in
//! [`fakes`]. The wire records ([`records`]) and the outbound payload
//! ([`payload`]) are defined here because they are contracts with those
//! external systems.

mod archive;
mod aws;
mod error;
pub mod fakes;
pub mod payload;
pub mod records;
mod s3;
mod spacecat;
mod sqs;
pub mod traits;

pub use archive::TarGzArchiveBuilder;
pub use aws::{AwsSettings, DEFAULT_AWS_REGION};
pub use error::GatewayError;
pub use payload::{IssueEntry, OutboundMessage, SnapshotReference, REMEDIATION_MESSAGE_TYPE};
pub use records::{
    issue_type_of, Ineligibility, Opportunity, Site, Suggestion, SuggestionRecord,
    ACCESSIBILITY_OPPORTUNITY,
};
pub use s3::{S3ObjectStore, DEFAULT_SNAPSHOT_BUCKET};
pub use spacecat::{SpacecatAuth, SpacecatConfig, SpacecatDirectory, DEFAULT_SPACECAT_API_BASE};
pub use sqs::SqsWorkQueue;
pub use traits::{Archive, ArchiveBuilder, Directory, ObjectStore, WorkQueue};

/// Result type for gateway operations
pub type Result<T> = std::result::Result<T, GatewayError>;
