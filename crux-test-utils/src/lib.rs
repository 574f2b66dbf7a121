//! Crux Test Utilities
//!
//! Shared test infrastructure for the Crux workspace:
//! - Proptest generators for records and whole boards
//! - Fixtures for the worked scoring and tie-break scenarios
//! - A brute-force reference scorer to check engine output against
//! - Assertions for Crux error variants and ranking order

pub use crux_storage::{MemoryStore, StoreSnapshot};

pub use crux_core::{
    ClimbStyle, ClimberId, CruxError, CruxResult, EntityType, LockStatus, Log, LogKey, Route,
    RouteId, StorageError, User, ValidationError,
};

use std::collections::BTreeMap;
use std::sync::Arc;

// ============================================================================
// GENERATORS
// ============================================================================

pub mod generators {
    //! Proptest strategies for Crux records.

    use super::*;
    use proptest::prelude::*;

    pub fn arb_climb_style() -> impl Strategy<Value = ClimbStyle> {
        prop_oneof![
            2 => Just(ClimbStyle::None),
            1 => Just(ClimbStyle::Onsight),
            1 => Just(ClimbStyle::Flash),
            2 => Just(ClimbStyle::Redpoint),
            1 => Just(ClimbStyle::Toprope),
        ]
    }

    pub fn arb_lock_status() -> impl Strategy<Value = Option<LockStatus>> {
        prop_oneof![
            Just(None),
            Just(Some(LockStatus::Editable)),
            Just(Some(LockStatus::Locked)),
        ]
    }

    /// Whole-number points keep shares exactly comparable in most cases.
    pub fn arb_points() -> impl Strategy<Value = f64> {
        (0u32..=200).prop_map(f64::from)
    }

    /// A consistent board: `routes` routes, `climbers` users, and at most
    /// one log per climber per route. Completion counts start at zero.
    pub fn arb_board(routes: usize, climbers: usize) -> impl Strategy<Value = StoreSnapshot> {
        let route_points = prop::collection::vec(arb_points(), routes);
        let cells = prop::collection::vec(
            prop::option::weighted(0.6, (arb_climb_style(), arb_lock_status())),
            routes * climbers,
        );

        (route_points, cells).prop_map(move |(points, cells)| {
            let routes_out: Vec<Route> = points
                .iter()
                .enumerate()
                .map(|(i, p)| Route::new(route_id(i), format!("Route {}", i), *p))
                .collect();

            let users: Vec<User> = (0..climbers)
                .map(|c| User::new(climber_id(c), format!("Climber {}", c)))
                .collect();

            let logs = cells
                .into_iter()
                .enumerate()
                .filter_map(|(cell, entry)| {
                    entry.map(|(style, lock)| {
                        let log = Log::new(route_id(cell / climbers), climber_id(cell % climbers), style);
                        match lock {
                            Some(lock) => log.with_lock_status(lock),
                            None => log,
                        }
                    })
                })
                .collect();

            StoreSnapshot {
                routes: routes_out,
                logs,
                users,
            }
        })
    }

    /// A sequence of log writes against routes `r0..r{routes}`, where
    /// `None` deletes the climber's log.
    pub fn arb_log_writes(
        routes: usize,
        climbers: usize,
        len: usize,
    ) -> impl Strategy<Value = Vec<(RouteId, ClimberId, Option<ClimbStyle>)>> {
        prop::collection::vec(
            (0..routes, 0..climbers, prop::option::weighted(0.8, arb_climb_style())),
            1..=len,
        )
        .prop_map(|writes| {
            writes
                .into_iter()
                .map(|(r, c, style)| (route_id(r), climber_id(c), style))
                .collect()
        })
    }

    pub fn route_id(index: usize) -> RouteId {
        RouteId::new(format!("r{}", index))
    }

    pub fn climber_id(index: usize) -> ClimberId {
        ClimberId::new(format!("c{:02}", index))
    }
}

// ============================================================================
// FIXTURES
// ============================================================================

pub mod fixtures {
    //! Pre-built boards for the worked scenarios.

    use super::*;

    pub fn route(id: &str, points: f64) -> Route {
        Route::new(RouteId::new(id), id.to_uppercase(), points)
    }

    pub fn log(route: &str, climber: &str, style: ClimbStyle) -> Log {
        Log::new(RouteId::new(route), ClimberId::new(climber), style)
    }

    pub fn user(id: &str) -> User {
        User::new(ClimberId::new(id), id.to_uppercase())
    }

    /// Route `a` (60 points) completed by c1, c2, c3; route `b` (40 points)
    /// completed by c1 only; c4 attempted `b` without completing it.
    ///
    /// After counters settle: c1 has 60 points over 2 climbs, c2 and c3 have
    /// 20 each, c4 has nothing.
    pub fn two_route_board() -> StoreSnapshot {
        StoreSnapshot {
            routes: vec![route("a", 60.0), route("b", 40.0)],
            logs: vec![
                log("a", "c1", ClimbStyle::Redpoint),
                log("a", "c2", ClimbStyle::Flash),
                log("a", "c3", ClimbStyle::Onsight),
                log("b", "c1", ClimbStyle::Toprope),
                log("b", "c4", ClimbStyle::None),
            ],
            users: vec![user("c1"), user("c2"), user("c3"), user("c4")],
        }
    }

    /// Climbers end at y = (60 points, 1 climb), x = (60, 2), z = (40, 1)
    /// and w = (30, 1). Expected order: y, x, z, w.
    pub fn tie_break_board() -> StoreSnapshot {
        StoreSnapshot {
            routes: vec![
                route("solo", 60.0),
                route("pair", 60.0),
                route("side", 30.0),
                route("slab", 40.0),
            ],
            logs: vec![
                log("solo", "y", ClimbStyle::Onsight),
                log("pair", "x", ClimbStyle::Flash),
                log("pair", "w", ClimbStyle::Redpoint),
                log("side", "x", ClimbStyle::Redpoint),
                log("slab", "z", ClimbStyle::Toprope),
            ],
            users: vec![user("w"), user("x"), user("y"), user("z")],
        }
    }

    /// Store preloaded with `snapshot`.
    pub fn store(snapshot: StoreSnapshot) -> Arc<MemoryStore> {
        match MemoryStore::from_snapshot(snapshot) {
            Ok(store) => Arc::new(store),
            Err(e) => panic!("fixture snapshot rejected: {}", e),
        }
    }
}

// ============================================================================
// REFERENCE MODEL
// ============================================================================

pub mod reference {
    //! Straightforward recomputation from a snapshot, independent of the
    //! store and the engine.

    use super::*;

    /// Completed-log count per route.
    pub fn completion_counts(snapshot: &StoreSnapshot) -> BTreeMap<RouteId, i64> {
        let mut counts: BTreeMap<RouteId, i64> = snapshot
            .routes
            .iter()
            .map(|r| (r.route_id.clone(), 0))
            .collect();
        for log in snapshot.logs.iter().filter(|l| l.style != ClimbStyle::None) {
            *counts.entry(log.route_id.clone()).or_insert(0) += 1;
        }
        counts
    }

    /// `(climbed, points)` per user, with counters at their settled values.
    pub fn settled_scores(snapshot: &StoreSnapshot) -> BTreeMap<ClimberId, (u32, f64)> {
        let counts = completion_counts(snapshot);
        let points: BTreeMap<&RouteId, f64> = snapshot
            .routes
            .iter()
            .map(|r| (&r.route_id, r.points))
            .collect();

        let mut scores: BTreeMap<ClimberId, (u32, f64)> = snapshot
            .users
            .iter()
            .map(|u| (u.climber_id.clone(), (0, 0.0)))
            .collect();

        let mut completed: Vec<&Log> = snapshot
            .logs
            .iter()
            .filter(|l| l.style != ClimbStyle::None)
            .collect();
        completed.sort_by(|a, b| a.route_id.cmp(&b.route_id));

        for log in completed {
            let Some(entry) = scores.get_mut(&log.climber_id) else {
                continue;
            };
            let route_points = points.get(&log.route_id).copied().unwrap_or(0.0);
            let count = counts.get(&log.route_id).copied().unwrap_or(0);
            let share = if count == 0 {
                route_points
            } else {
                route_points / count as f64
            };
            entry.0 += 1;
            entry.1 += share;
        }
        scores
    }
}

// ============================================================================
// ASSERTIONS
// ============================================================================

pub mod assertions {
    //! Assertions for Crux-specific results.

    use super::*;

    #[track_caller]
    pub fn assert_not_found<T: std::fmt::Debug>(result: &CruxResult<T>, entity_type: EntityType) {
        match result {
            Err(CruxError::Storage(StorageError::NotFound {
                entity_type: et, ..
            })) => {
                assert_eq!(*et, entity_type, "Wrong entity type in NotFound error");
            }
            other => panic!("Expected NotFound error for {:?}, got: {:?}", entity_type, other),
        }
    }

    #[track_caller]
    pub fn assert_conflict<T: std::fmt::Debug>(result: &CruxResult<T>) {
        match result {
            Err(e) if e.is_conflict() => {}
            other => panic!("Expected Conflict error, got: {:?}", other),
        }
    }

    #[track_caller]
    pub fn assert_validation_error<T: std::fmt::Debug>(result: &CruxResult<T>) {
        match result {
            Err(CruxError::Validation(_)) => {}
            other => panic!("Expected Validation error, got: {:?}", other),
        }
    }

    /// Users sorted by position must have positions 0..n and respect
    /// points descending, then climbed ascending.
    #[track_caller]
    pub fn assert_ranking_ordered(users: &[User]) {
        let mut sorted: Vec<&User> = users.iter().collect();
        sorted.sort_by_key(|u| u.position);

        for (index, user) in sorted.iter().enumerate() {
            assert_eq!(
                user.position as usize, index,
                "Positions must be dense, {} has {}",
                user.climber_id, user.position
            );
        }
        for pair in sorted.windows(2) {
            let (a, b) = (pair[0], pair[1]);
            assert!(
                a.points > b.points || (a.points == b.points && a.climbed <= b.climbed),
                "{} ({} pts, {} climbed) ranked above {} ({} pts, {} climbed)",
                a.climber_id,
                a.points,
                a.climbed,
                b.climber_id,
                b.points,
                b.climbed
            );
        }
    }

    #[track_caller]
    pub fn assert_points_close(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() < 1e-9,
            "Expected {} points, got {}",
            expected,
            actual
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_two_route_board_reference_scores() {
        let scores = reference::settled_scores(&fixtures::two_route_board());
        assert_eq!(scores[&ClimberId::new("c1")], (2, 60.0));
        assert_eq!(scores[&ClimberId::new("c2")], (1, 20.0));
        assert_eq!(scores[&ClimberId::new("c4")], (0, 0.0));
    }

    #[test]
    fn test_tie_break_board_reference_scores() {
        let scores = reference::settled_scores(&fixtures::tie_break_board());
        assert_eq!(scores[&ClimberId::new("y")], (1, 60.0));
        assert_eq!(scores[&ClimberId::new("x")], (2, 60.0));
        assert_eq!(scores[&ClimberId::new("z")], (1, 40.0));
        assert_eq!(scores[&ClimberId::new("w")], (1, 30.0));
    }

    #[test]
    fn test_assertion_not_found() {
        let result: CruxResult<()> = Err(CruxError::Storage(StorageError::NotFound {
            entity_type: EntityType::Route,
            id: "r1".to_string(),
        }));
        assertions::assert_not_found(&result, EntityType::Route);
    }

    #[test]
    fn test_fixture_store_loads() {
        let store = fixtures::store(fixtures::two_route_board());
        let snapshot = store.snapshot().unwrap();
        assert_eq!(snapshot.logs.len(), 5);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(50))]

        #[test]
        fn prop_generated_board_loads(board in generators::arb_board(4, 5)) {
            prop_assert!(MemoryStore::from_snapshot(board).is_ok());
        }

        #[test]
        fn prop_reference_counts_match_completed_logs(board in generators::arb_board(3, 6)) {
            let counts = reference::completion_counts(&board);
            let total: i64 = counts.values().sum();
            let completed = board.logs.iter().filter(|l| l.style != ClimbStyle::None).count();
            prop_assert_eq!(total as usize, completed);
        }
    }
}
