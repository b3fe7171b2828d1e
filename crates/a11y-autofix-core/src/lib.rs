//! A11y Autofix Core: selection resolution and message batching
//!
//! Turns an operator's selector into the work items a remediation worker
//! consumes:
//!
//! - `selector`: flag compatibility table and [`Selection`] building
//! - `resolver`: site / opportunity / eligible-suggestion lookup
//! - `picker`: interactive choice of suggestion, issue type or key
//! - `grouping`: partition into message groups by batch policy
//! - `snapshot`: fingerprinted source archive in the object store
//! - `message`: outbound payload per group
//! - `dispatch`: preview, single confirmation, sequential publish
//! - `pipeline`: the run, in order, with its side-effect guarantees

pub mod dispatch;
pub mod error;
pub mod grouping;
pub mod message;
pub mod obs;
pub mod picker;
pub mod pipeline;
pub mod prompt;
pub mod resolver;
pub mod selector;
pub mod snapshot;
pub mod telemetry;

pub use dispatch::{DispatchConfirmer, DispatchRecord, DispatchReport, DispatchState, PublishOutcome};
pub use error::{AutofixError, Result};
pub use grouping::{group, BatchPolicy, MessageGroup};
pub use message::MessageBuilder;
pub use picker::{plan_grouping, GroupingPlan};
pub use pipeline::{Collaborators, RemediationPipeline, RunReport};
pub use prompt::{Prompter, ScriptedPrompter};
pub use resolver::{Resolution, ResolutionWarning, ResolvedSuggestion, SuggestionResolver};
pub use selector::{
    parse_suggestion_ids, validate_selection, BatchMode, Flag, FlagRule, FlagViolation, PickBy,
    Selection, Selector, SelectorFlags, COMPATIBILITY,
};
pub use snapshot::{SnapshotPlan, SnapshotSource, SnapshotStager, SNAPSHOT_PREFIX};
