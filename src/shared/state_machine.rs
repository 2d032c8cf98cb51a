//! Progress State Machine
//!
//! The two operations that mutate a [`ProgressRecord`]: a generic update
//! ([`apply_update`]) and the stage-progression transition
//! ([`complete_room`]). Both are pure: they take the current record and
//! return a new one, with the clock passed in explicitly.
//!
//! ## Rules
//!
//! - `startTime`, `endTime` and every stage entry time are first-write-wins.
//!   Once set, no update changes them, not even to another non-null value.
//! - `endTime` is only accepted once the terminal stage is complete.
//! - Every completed stage has an entry time.
//! - `roomsCompleted` only grows and never holds a stage twice.
//! - `currentRoom` never decreases.
//!
//! ## States
//!
//! ```text
//! NotStarted --begin--> AwaitingStage(1) --complete(1)--> AwaitingStage(2) ... --complete(N)--> Finished
//! ```
//!
//! Out-of-order and repeated completions are accepted; they never corrupt
//! history that is already recorded.

use crate::shared::error::ProgressError;
use crate::shared::progress::{is_reserved_key, ProgressPatch, ProgressRecord, StageLayout};
use chrono::{DateTime, Utc};

/// Position of a record in the stage sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageStatus {
    /// No identity chosen yet
    NotStarted,
    /// The lowest stage not yet completed
    AwaitingStage(u32),
    /// The terminal stage is complete
    Finished,
}

/// Fresh record for a newly chosen identity, started at `now`
pub fn begin(identity: &str, now: DateTime<Utc>) -> Result<ProgressRecord, ProgressError> {
    let identity = identity.trim();
    if identity.is_empty() {
        return Err(ProgressError::validation("teamName", "team name cannot be empty"));
    }
    Ok(ProgressRecord {
        start_time: Some(now),
        ..ProgressRecord::with_identity(identity)
    })
}

/// Shallow-merge `patch` onto `current`, then restore every fixed value.
pub fn apply_update(
    current: &ProgressRecord,
    patch: &ProgressPatch,
    layout: StageLayout,
    now: DateTime<Utc>,
) -> ProgressRecord {
    let mut next = current.clone();

    if next.identity.is_empty() {
        if let Some(identity) = &patch.identity {
            next.identity = identity.trim().to_string();
        }
    }

    if let Some(room) = patch.current_room {
        next.current_room = next.current_room.max(room);
    }

    if let Some(rooms) = &patch.rooms_completed {
        for &stage in rooms {
            if !next.rooms_completed.contains(&stage) {
                next.rooms_completed.push(stage);
            }
        }
    }

    if next.start_time.is_none() {
        next.start_time = patch.start_time;
    }
    if next.end_time.is_none() && next.is_room_completed(layout.terminal_stage()) {
        next.end_time = patch.end_time;
    }
    for (stage, at) in &patch.stage_entry_times {
        next.stage_entry_times.entry(*stage).or_insert(*at);
    }

    for (key, value) in &patch.extra {
        if !is_reserved_key(key) {
            next.extra.insert(key.clone(), value.clone());
        }
    }

    // A stage completed through a patch still needs its entry time.
    next.backfill_entry_times(now);

    next
}

/// Record `stage` as completed.
///
/// Completing an already-completed stage leaves its entry untouched and
/// only lets `currentRoom` catch up. Completing the terminal stage sets
/// `endTime` once.
pub fn complete_room(
    current: &ProgressRecord,
    stage: u32,
    layout: StageLayout,
    now: DateTime<Utc>,
) -> Result<ProgressRecord, ProgressError> {
    if !layout.contains(stage) {
        return Err(ProgressError::stage_out_of_range(stage, layout.stage_count()));
    }

    let mut next = current.clone();
    next.current_room = next.current_room.max(stage);
    if !next.rooms_completed.contains(&stage) {
        next.rooms_completed.push(stage);
    }
    next.stage_entry_times.entry(stage).or_insert(now);

    if layout.is_terminal(stage) && next.end_time.is_none() {
        next.end_time = Some(now);
    }

    Ok(next)
}

/// Where `record` currently sits in the stage sequence
pub fn stage_status(record: &ProgressRecord, layout: StageLayout) -> StageStatus {
    if !record.is_started() {
        return StageStatus::NotStarted;
    }
    if record.is_finished() || record.is_room_completed(layout.terminal_stage()) {
        return StageStatus::Finished;
    }
    layout
        .stages()
        .find(|stage| !record.is_room_completed(*stage))
        .map_or(StageStatus::Finished, StageStatus::AwaitingStage)
}
