//! Custom assertion macros
//!
//! Progress-specific checks with descriptive failure messages.

/// Assert that a list of stages holds no duplicates
#[macro_export]
macro_rules! assert_no_duplicates {
    ($stages:expr) => {
        let stages = &$stages;
        for (i, stage) in stages.iter().enumerate() {
            assert!(
                !stages[..i].contains(stage),
                "Stage {} appears more than once in {:?}",
                stage,
                stages
            );
        }
    };
}

/// Assert that `$before` is a prefix of `$after`
#[macro_export]
macro_rules! assert_prefix {
    ($before:expr, $after:expr) => {
        let before = &$before;
        let after = &$after;
        assert!(
            after.len() >= before.len() && after[..before.len()] == before[..],
            "Expected {:?} to extend {:?}",
            after,
            before
        );
    };
}
