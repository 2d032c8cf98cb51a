//! Property-based tests for the stage-progression operations

use super::strategies::{instant, op, record, stage, Op, STAGES};
use escape_progress::shared::{apply_update, complete_room, ProgressRecord, StageLayout};
use proptest::prelude::*;

fn step(record: &ProgressRecord, op: &Op) -> ProgressRecord {
    let layout = StageLayout::new(STAGES);
    match op {
        Op::Complete(stage, now) => complete_room(record, *stage, layout, *now).unwrap(),
        Op::Update(patch, now) => apply_update(record, patch, layout, *now),
    }
}

proptest! {
    #[test]
    fn test_complete_room_is_idempotent(
        current in record(),
        target in stage(),
        first in instant(),
        second in instant(),
    ) {
        let layout = StageLayout::new(STAGES);
        let once = complete_room(&current, target, layout, first).unwrap();
        let twice = complete_room(&once, target, layout, second).unwrap();
        prop_assert_eq!(once, twice);
    }

    #[test]
    fn test_completions_only_grow(start in record(), ops in prop::collection::vec(op(), 1..20)) {
        let mut current = start;
        for op in &ops {
            let next = step(&current, op);

            prop_assert!(next.rooms_completed.starts_with(&current.rooms_completed));
            let mut unique = next.rooms_completed.clone();
            unique.sort_unstable();
            unique.dedup();
            prop_assert_eq!(unique.len(), next.rooms_completed.len());

            current = next;
        }
    }

    #[test]
    fn test_timestamps_are_fixed_once_set(start in record(), ops in prop::collection::vec(op(), 1..20)) {
        let mut current = start;
        for op in &ops {
            let next = step(&current, op);

            if current.start_time.is_some() {
                prop_assert_eq!(next.start_time, current.start_time);
            }
            if current.end_time.is_some() {
                prop_assert_eq!(next.end_time, current.end_time);
            }
            for (stage, at) in &current.stage_entry_times {
                prop_assert_eq!(next.stage_entry_times.get(stage), Some(at));
            }

            current = next;
        }
    }

    #[test]
    fn test_current_room_never_decreases(start in record(), ops in prop::collection::vec(op(), 1..20)) {
        let mut current = start;
        for op in &ops {
            let next = step(&current, op);
            prop_assert!(next.current_room >= current.current_room);
            current = next;
        }
    }

    #[test]
    fn test_completed_stages_have_entry_times(start in record(), ops in prop::collection::vec(op(), 1..20)) {
        let mut current = start;
        for op in &ops {
            current = step(&current, op);
            if let Op::Complete(stage, _) = op {
                prop_assert!(current.stage_entry_time(*stage).is_some());
                prop_assert!(current.current_room >= *stage);
            }
        }
    }

    #[test]
    fn test_out_of_range_stage_rejected(current in record(), beyond in (STAGES + 1)..1000, now in instant()) {
        prop_assert!(complete_room(&current, beyond, StageLayout::new(STAGES), now).is_err());
        prop_assert!(complete_room(&current, 0, StageLayout::new(STAGES), now).is_err());
    }
}
