//! Scoring & Ranking Engine
//!
//! A run enumerates every user, scores each one concurrently (bounded by
//! `max_concurrency`), orders the results, and commits every user's new
//! standing in a single transaction. Either the whole ranking lands or
//! none of it does.

use crate::EngineMetrics;
use crux_core::{
    rank_standings, score_climber, ClimberId, ClimberScore, CruxError, CruxResult, EngineConfig,
    EntityType, RankedStanding, ScoredLog, Standing, StorageError, Timestamp, User,
    ValidationError,
};
use crux_storage::{retry_on_conflict, LogFilter, SharedStore, StandingMerge, Transaction};
use futures_util::future::join_all;
use serde::Serialize;
use std::collections::HashSet;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;
use uuid::Uuid;

/// What to do with a climber whose logs could not be scored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GapPolicy {
    /// Keep the climber at their previously persisted score and carry on.
    Tolerate,
    /// Fail the whole computation.
    Fail,
}

/// A climber left unscored by a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct RankingGap {
    pub climber_id: ClimberId,
    pub reason: String,
}

/// Outcome of a committed ranking run.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct RankingReport {
    pub run_id: Uuid,
    #[cfg_attr(feature = "openapi", schema(value_type = String, format = "date-time"))]
    pub ranked_at: Timestamp,
    /// Users given a position.
    pub ranked: usize,
    pub gaps: Vec<RankingGap>,
    pub duration_ms: u64,
    pub standings: Vec<RankedStanding>,
}

/// Ordered standings plus the climbers that could not be scored.
#[derive(Debug, Clone, Default)]
pub(crate) struct ComputedRanking {
    pub standings: Vec<RankedStanding>,
    pub gaps: Vec<RankingGap>,
}

/// Score one climber from their logs and the current route counters.
///
/// Logs styled `none` never touch their route, so a malformed route only
/// affects climbers who completed it.
pub(crate) async fn score_one(store: &SharedStore, climber_id: &ClimberId) -> CruxResult<ClimberScore> {
    let logs = store
        .log_query_group(&LogFilter::by_climber(climber_id.clone()))
        .await?;

    let mut scored = Vec::with_capacity(logs.len());
    for log in logs.iter().filter(|log| log.is_completed()) {
        let route = store.route_get(&log.route_id).await?.ok_or_else(|| {
            ValidationError::DanglingReference {
                entity_type: EntityType::Route,
                id: log.route_id.to_string(),
                referenced_by: log.key().to_string(),
            }
        })?;
        scored.push(ScoredLog::join(log, &route)?);
    }

    Ok(score_climber(&scored))
}

/// Steps shared by the scheduled run and the on-demand query: enumerate,
/// score concurrently, order.
pub(crate) async fn compute_ranking(
    store: &SharedStore,
    max_concurrency: usize,
    policy: GapPolicy,
) -> CruxResult<ComputedRanking> {
    let users = store.user_list().await?;
    let semaphore = Arc::new(Semaphore::new(max_concurrency.clamp(1, Semaphore::MAX_PERMITS)));

    let tasks = users.iter().map(|user| {
        let store = Arc::clone(store);
        let semaphore = Arc::clone(&semaphore);
        let climber_id = user.climber_id.clone();
        tokio::spawn(async move {
            let _permit = semaphore.acquire_owned().await.map_err(|_| {
                CruxError::from(StorageError::Unavailable {
                    reason: "ranking fan-out closed".to_string(),
                })
            })?;
            score_one(&store, &climber_id).await
        })
    });
    let results = join_all(tasks).await;

    let mut standings = Vec::with_capacity(users.len());
    let mut gaps = Vec::new();

    for (user, result) in users.into_iter().zip(results) {
        let outcome = match result {
            Ok(score) => score,
            Err(join_error) => Err(StorageError::TransactionFailed {
                reason: format!("scoring task aborted: {}", join_error),
            }
            .into()),
        };

        match outcome {
            Ok(score) => standings.push(Standing::new(user.climber_id, user.name, score)),
            Err(e) if policy == GapPolicy::Fail => {
                tracing::warn!(climber_id = %user.climber_id, error = %e, "Climber could not be scored");
                return Err(e);
            }
            Err(e) => {
                gaps.push(RankingGap {
                    climber_id: user.climber_id.clone(),
                    reason: e.to_string(),
                });
                standings.push(previous_standing(user));
            }
        }
    }

    Ok(ComputedRanking {
        standings: rank_standings(standings),
        gaps,
    })
}

/// A gap climber still occupies a slot, ordered by what was last persisted.
fn previous_standing(user: User) -> Standing {
    Standing {
        climber_id: user.climber_id,
        name: user.name,
        climbed: user.climbed,
        points: user.points,
    }
}

#[derive(Clone)]
pub struct RankingEngine {
    store: SharedStore,
    config: EngineConfig,
    metrics: Arc<EngineMetrics>,
}

impl RankingEngine {
    pub fn new(store: SharedStore, config: EngineConfig) -> Self {
        Self::with_metrics(store, config, Arc::new(EngineMetrics::new()))
    }

    pub fn with_metrics(
        store: SharedStore,
        config: EngineConfig,
        metrics: Arc<EngineMetrics>,
    ) -> Self {
        Self {
            store,
            config,
            metrics,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn metrics(&self) -> &Arc<EngineMetrics> {
        &self.metrics
    }

    /// Run one full pass and commit it.
    ///
    /// Climbers whose logs cannot be fetched or scored keep their previous
    /// points and climbed count and only have their position rewritten, so
    /// positions always form a dense 0..n sequence. A failed commit leaves
    /// the previous ranking in place and is returned as an error.
    pub async fn run(&self) -> CruxResult<RankingReport> {
        let started = Instant::now();
        let run_id = Uuid::now_v7();
        tracing::debug!(%run_id, "Ranking run started");

        let computed =
            match compute_ranking(&self.store, self.config.max_concurrency, GapPolicy::Tolerate)
                .await
            {
                Ok(computed) => computed,
                Err(e) => {
                    EngineMetrics::incr(&self.metrics.ranking_runs_failed);
                    tracing::error!(%run_id, error = %e, "Ranking run could not enumerate users");
                    return Err(e);
                }
            };

        for gap in &computed.gaps {
            tracing::warn!(
                %run_id,
                climber_id = %gap.climber_id,
                reason = %gap.reason,
                "Climber left unscored, previous standing kept"
            );
        }

        let ranked_at = chrono::Utc::now();
        let gap_ids: HashSet<ClimberId> = computed.gaps.iter().map(|g| g.climber_id.clone()).collect();

        let attempts = AtomicU32::new(0);
        let committed = retry_on_conflict(&self.config.retry, || {
            attempts.fetch_add(1, Ordering::Relaxed);
            let mut tx = Transaction::new();
            for ranked in &computed.standings {
                let standing = &ranked.standing;
                let merge = if gap_ids.contains(&standing.climber_id) {
                    StandingMerge::position_only(ranked.position)
                } else {
                    StandingMerge::scored(standing.climbed, standing.points, ranked.position, ranked_at)
                };
                tx.merge_user(standing.climber_id.clone(), merge);
            }
            self.store.commit(tx)
        })
        .await;

        let attempts = attempts.load(Ordering::Relaxed);
        if attempts > 1 {
            self.metrics
                .transaction_retries
                .fetch_add(u64::from(attempts - 1), Ordering::Relaxed);
        }

        let duration_ms = started.elapsed().as_millis() as u64;
        self.metrics
            .last_run_duration_ms
            .store(duration_ms, Ordering::Relaxed);

        if let Err(e) = committed {
            EngineMetrics::incr(&self.metrics.ranking_runs_failed);
            tracing::error!(%run_id, attempts, error = %e, "Ranking commit failed, previous ranking kept");
            return Err(e);
        }

        EngineMetrics::incr(&self.metrics.ranking_runs_committed);
        self.metrics
            .ranking_gaps
            .fetch_add(computed.gaps.len() as u64, Ordering::Relaxed);

        let report = RankingReport {
            run_id,
            ranked_at,
            ranked: computed.standings.len(),
            gaps: computed.gaps,
            duration_ms,
            standings: computed.standings,
        };
        tracing::info!(
            %run_id,
            ranked = report.ranked,
            gaps = report.gaps.len(),
            duration_ms,
            "Ranking run committed"
        );
        Ok(report)
    }
}
