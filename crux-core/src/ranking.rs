//! Leaderboard total order

use crate::{ClimberId, ClimberScore};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// One climber's computed score, before positions are assigned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct Standing {
    pub climber_id: ClimberId,
    #[serde(default)]
    pub name: String,
    pub climbed: u32,
    pub points: f64,
}

impl Standing {
    pub fn new(climber_id: ClimberId, name: impl Into<String>, score: ClimberScore) -> Self {
        Self {
            climber_id,
            name: name.into(),
            climbed: score.climbed,
            points: score.points,
        }
    }
}

/// A standing with its 0-based leaderboard position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct RankedStanding {
    pub position: u32,
    #[serde(flatten)]
    pub standing: Standing,
}

/// Points descending, then climbed ascending (fewer climbs for the same
/// points ranks higher), then climber id ascending.
///
/// The id key makes the order total so repeated runs over the same data
/// assign identical positions.
pub fn compare_standings(a: &Standing, b: &Standing) -> Ordering {
    b.points
        .total_cmp(&a.points)
        .then_with(|| a.climbed.cmp(&b.climbed))
        .then_with(|| a.climber_id.cmp(&b.climber_id))
}

/// Sort standings into leaderboard order and assign positions.
pub fn rank_standings(mut standings: Vec<Standing>) -> Vec<RankedStanding> {
    standings.sort_by(compare_standings);
    standings
        .into_iter()
        .enumerate()
        .map(|(index, standing)| RankedStanding {
            position: index as u32,
            standing,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn standing(id: &str, points: f64, climbed: u32) -> Standing {
        Standing {
            climber_id: ClimberId::new(id),
            name: id.to_uppercase(),
            climbed,
            points,
        }
    }

    #[test]
    fn test_fewer_climbs_wins_points_tie() {
        let ranked = rank_standings(vec![
            standing("x", 60.0, 2),
            standing("y", 60.0, 1),
            standing("z", 40.0, 1),
        ]);
        let order: Vec<_> = ranked
            .iter()
            .map(|r| (r.standing.climber_id.as_str(), r.position))
            .collect();
        assert_eq!(order, vec![("y", 0), ("x", 1), ("z", 2)]);
    }

    #[test]
    fn test_full_tie_breaks_by_id() {
        let ranked = rank_standings(vec![standing("b", 10.0, 1), standing("a", 10.0, 1)]);
        assert_eq!(ranked[0].standing.climber_id.as_str(), "a");
        assert_eq!(ranked[1].standing.climber_id.as_str(), "b");
    }

    #[test]
    fn test_empty_ranking() {
        assert!(rank_standings(Vec::new()).is_empty());
    }

    #[test]
    fn test_ranked_standing_flattens_on_the_wire() {
        let ranked = rank_standings(vec![standing("y", 60.0, 1)]);
        let json = serde_json::to_value(&ranked[0]).unwrap();
        assert_eq!(json["position"], 0);
        assert_eq!(json["climber_id"], "y");
        assert_eq!(json["climbed"], 1);
    }
}
