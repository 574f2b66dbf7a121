//! Rarity-weighted scoring primitive
//!
//! A completed route's points are split evenly among everyone who completed
//! it, so the fewer completers a route has the more each of them earns.
//! Shared by the scheduled ranking run and the on-demand ranking query.

use crate::{ClimbStyle, CruxResult, EntityType, Log, Route, RouteId, ValidationError};
use serde::{Deserialize, Serialize};

/// Points one completer earns from a route.
///
/// A zero completion count awards the full value: the counter has not yet
/// caught up with the first completion, and dividing by zero is not an option.
pub fn route_share(points: f64, completion_count: i64) -> f64 {
    if completion_count == 0 {
        points
    } else {
        points / completion_count as f64
    }
}

/// A log joined with its parent route's current scoring fields.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredLog {
    pub route_id: RouteId,
    pub style: ClimbStyle,
    pub route_points: f64,
    pub completion_count: i64,
}

impl ScoredLog {
    /// Join a log with its parent route, rejecting malformed route data.
    pub fn join(log: &Log, route: &Route) -> CruxResult<Self> {
        if log.route_id != route.route_id {
            return Err(ValidationError::DanglingReference {
                entity_type: EntityType::Route,
                id: log.route_id.to_string(),
                referenced_by: log.key().to_string(),
            }
            .into());
        }
        route.validate()?;

        Ok(Self {
            route_id: route.route_id.clone(),
            style: log.style,
            route_points: route.points,
            completion_count: route.completion_count,
        })
    }

    pub fn share(&self) -> f64 {
        route_share(self.route_points, self.completion_count)
    }
}

/// A climber's aggregate over all of their logs.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct ClimberScore {
    pub climbed: u32,
    pub points: f64,
}

/// Score a climber's logs.
///
/// Logs styled `none` are skipped entirely. Shares are summed in route-id
/// order so the same inputs always produce the same float.
pub fn score_climber(logs: &[ScoredLog]) -> ClimberScore {
    let mut completed: Vec<&ScoredLog> = logs.iter().filter(|l| l.style.is_completed()).collect();
    completed.sort_by(|a, b| a.route_id.cmp(&b.route_id));

    completed
        .into_iter()
        .fold(ClimberScore::default(), |mut acc, log| {
            acc.climbed += 1;
            acc.points += log.share();
            acc
        })
}


#[cfg(test)]
mod prop_tests {
    use super::*;
    use proptest::prelude::*;

    fn style_strategy() -> impl Strategy<Value = ClimbStyle> {
        prop_oneof![
            Just(ClimbStyle::None),
            Just(ClimbStyle::Onsight),
            Just(ClimbStyle::Flash),
            Just(ClimbStyle::Redpoint),
            Just(ClimbStyle::Toprope),
        ]
    }

    fn scored_strategy() -> impl Strategy<Value = ScoredLog> {
        ("[a-z]{1,6}", style_strategy(), 0.0f64..1000.0, 0i64..50).prop_map(
            |(route, style, points, count)| ScoredLog {
                route_id: RouteId::new(route),
                style,
                route_points: points,
                completion_count: count,
            },
        )
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(200))]

        /// Climbed count equals the number of completed logs.
        #[test]
        fn prop_climbed_counts_completed_logs(logs in prop::collection::vec(scored_strategy(), 0..20)) {
            let expected = logs.iter().filter(|l| l.style.is_completed()).count() as u32;
            prop_assert_eq!(score_climber(&logs).climbed, expected);
        }

        /// Points are finite, non-negative, and never exceed the sum of full route values.
        #[test]
        fn prop_points_are_bounded(logs in prop::collection::vec(scored_strategy(), 0..20)) {
            let score = score_climber(&logs);
            let ceiling: f64 = logs
                .iter()
                .filter(|l| l.style.is_completed())
                .map(|l| l.route_points)
                .sum();
            prop_assert!(score.points.is_finite());
            prop_assert!(score.points >= 0.0);
            prop_assert!(score.points <= ceiling + 1e-9);
        }

        /// Input order does not change the result.
        #[test]
        fn prop_order_independent(logs in prop::collection::vec(scored_strategy(), 0..20)) {
            let mut reversed = logs.clone();
            reversed.reverse();
            prop_assert_eq!(score_climber(&logs), score_climber(&reversed));
        }
    }
}
