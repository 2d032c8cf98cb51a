//! # Merge Engine
//!
//! Reconciles the local snapshot with the record fetched from the remote
//! store when a session loads.
//!
//! The remote record is authoritative, with one exception: anything the
//! local side has already observed and the remote side has not is kept.
//! The remote store may have been written by an earlier, less complete
//! version of the session, so a timestamp that is set locally but missing
//! remotely comes from local, and completed stages are unioned.
//!
//! A local record that belongs to another participant is never merged.
//! Completed stages that neither side timed get the merge time as their
//! entry time, so the reconciled record is always complete.

use crate::shared::progress::{is_reserved_key, ProgressRecord};
use chrono::{DateTime, Utc};

/// Merge `local` and `remote` into the record for `identity`.
///
/// - `remote` absent: `local` unchanged, or an empty record for `identity`.
/// - `remote` present: remote fields win, except that `startTime`, `endTime`
///   and stage entry times only known locally are preserved, local
///   completions the remote lacks are appended, `currentRoom` takes the
///   higher value and local-only puzzle fields are kept.
/// - completed stages still missing an entry time get `now`.
pub fn merge(
    local: Option<ProgressRecord>,
    remote: Option<ProgressRecord>,
    identity: &str,
    now: DateTime<Utc>,
) -> ProgressRecord {
    let local = local.filter(|record| record.identity == identity);

    let Some(mut merged) = remote else {
        let mut record = local.unwrap_or_else(|| ProgressRecord::with_identity(identity));
        record.is_loading = false;
        record.backfill_entry_times(now);
        return record;
    };

    if !merged.identity.is_empty() && merged.identity != identity {
        tracing::warn!(
            "Remote record for '{}' carries team name '{}'; keeping the requested one",
            identity,
            merged.identity
        );
    }
    merged.identity = identity.to_string();
    merged.is_loading = false;
    dedup_in_order(&mut merged.rooms_completed);

    if let Some(local) = local {
        merged.start_time = merged.start_time.or(local.start_time);
        merged.end_time = merged.end_time.or(local.end_time);
        for (stage, at) in local.stage_entry_times {
            merged.stage_entry_times.entry(stage).or_insert(at);
        }
        for stage in local.rooms_completed {
            if !merged.rooms_completed.contains(&stage) {
                merged.rooms_completed.push(stage);
            }
        }
        merged.current_room = merged.current_room.max(local.current_room);
        for (key, value) in local.extra {
            merged.extra.entry(key).or_insert(value);
        }
    }

    merged.extra.retain(|key, _| !is_reserved_key(key));
    merged.backfill_entry_times(now);
    merged
}

fn dedup_in_order(stages: &mut Vec<u32>) {
    let mut seen = Vec::with_capacity(stages.len());
    stages.retain(|stage| {
        if seen.contains(stage) {
            false
        } else {
            seen.push(*stage);
            true
        }
    });
}
