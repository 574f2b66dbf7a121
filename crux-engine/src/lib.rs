//! Crux Engine - Completion Counters and Ranking Runs
//!
//! Two independently triggered operations that talk to each other only
//! through the store:
//!
//! - the **completion counter maintainer** recounts a route whenever one of
//!   its logs changes ([`CompletionCounter`], [`spawn_trigger_listener`]);
//! - the **ranking engine** periodically rescores every climber against the
//!   current counters and commits the new leaderboard atomically
//!   ([`RankingEngine`], [`ranking_job`]).
//!
//! [`RankingQueryService`] runs the same pass on demand without writing.

pub mod counter;
pub mod engine;
pub mod job;
pub mod metrics;
pub mod query;
pub mod trigger;
pub mod views;

pub use counter::{CompletionCounter, RecountOutcome, RecountSummary};
pub use engine::{GapPolicy, RankingEngine, RankingGap, RankingReport};
pub use job::ranking_job;
pub use metrics::{EngineMetrics, EngineMetricsSnapshot};
pub use query::RankingQueryService;
pub use trigger::spawn_trigger_listener;
pub use views::{leaderboard, route_overlay, LeaderboardEntry, RouteOverlay};
