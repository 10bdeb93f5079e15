//! Decides which storage-change events the CSV parser acts on.

use crate::models::{
    event::{STORAGE_EVENT_SOURCE, StorageEvent},
    object::ObjectState,
};

/// Event sources whose records are accepted.
const ACCEPTED_SOURCES: [&str; 2] = [STORAGE_EVENT_SOURCE, "aws:s3"];

/// Why an event was passed over. Skipping is routine, not a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    ForeignSource,
    NotObjectCreated,
    /// The key is in the parsed folder; re-triggering it is a no-op.
    AlreadyParsed,
    OutsideIntake,
    NotCsv,
}

/// Return why `event` should be ignored, or `None` if it should be parsed.
pub fn skip_reason(
    event: &StorageEvent,
    intake_prefix: &str,
    parsed_prefix: &str,
) -> Option<SkipReason> {
    if !ACCEPTED_SOURCES.contains(&event.event_source.as_str()) {
        return Some(SkipReason::ForeignSource);
    }
    if !event.is_object_created() {
        return Some(SkipReason::NotObjectCreated);
    }
    match ObjectState::from_key(&event.key, intake_prefix, parsed_prefix) {
        Some(ObjectState::Intake) => {}
        Some(ObjectState::Parsed) => return Some(SkipReason::AlreadyParsed),
        None => return Some(SkipReason::OutsideIntake),
    }
    if !event.key.to_ascii_lowercase().ends_with(".csv") {
        return Some(SkipReason::NotCsv);
    }
    None
}
