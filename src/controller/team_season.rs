use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use sql_middleware::middleware::ConfigAndPool;
use tracing::{debug, info, warn};

use crate::error::EngineError;
use crate::model::{
    Freshness, SinceDayStart, Team, TeamFixtureRow, aggregate_team_fixture_cache,
    cached_fixture_ids, is_terminal_status, newest_success_ts, reference_day,
    reference_day_start_utc, team_season_row, upsert_team_fixture_cache, upsert_team_season_stats,
    write_marker,
};

use super::provider::{FootballApi, ProviderFixture};

/// Season schedules longer than this are truncated; it also defines when an
/// aggregate row counts as complete and is never recomputed.
pub const MAX_SEASON_FIXTURES: usize = 38;
pub const FULL_SEASON_MINUTES: i64 = MAX_SEASON_FIXTURES as i64 * 90;

/// Pause between successive per-fixture statistics calls, the provider's
/// rate budget being per-minute.
pub const STATS_CALL_DELAY_MS: u64 = 250;

/// What one invocation of the aggregator reports back to its driver.
/// `done: false` is not a failure; it means "call me again".
#[derive(Debug, Clone, Serialize)]
pub struct SeasonProgress {
    pub done: bool,
    pub calls_used: u32,
}

impl SeasonProgress {
    #[must_use]
    fn done(calls_used: u32) -> Self {
        Self {
            done: true,
            calls_used,
        }
    }

    #[must_use]
    fn pending(calls_used: u32) -> Self {
        Self {
            done: false,
            calls_used,
        }
    }
}

#[must_use]
pub fn season_resource(team_external_id: i64, season: i32, competition_id: i64) -> String {
    format!("teamSeason:{team_external_id}:{season}:{competition_id}")
}

/// Incrementally builds a team's season aggregate. One cheap bulk call
/// lists the season's finished fixtures with goals; each fixture then needs
/// one expensive statistics call, checkpointed in `team_fixture_cache` so a
/// later invocation picks up exactly where the budget cut this one off.
///
/// # Errors
///
/// Will return `Err` if the store is unreachable or the bulk season call
/// fails; individual statistics calls are retried on the next invocation
/// instead
pub async fn ensure_team_season(
    provider: &Arc<dyn FootballApi>,
    config_and_pool: &ConfigAndPool,
    team: &Team,
    season: i32,
    competition_id: i64,
    call_budget: Option<u32>,
    now: DateTime<Utc>,
) -> Result<SeasonProgress, EngineError> {
    let resource = season_resource(team.external_id, season, competition_id);

    if let Some(row) = team_season_row(config_and_pool, team.team_id, season, competition_id).await?
        && row.minutes_played >= FULL_SEASON_MINUTES
    {
        return Ok(SeasonProgress::done(0));
    }
    let day_start = reference_day_start_utc(reference_day(now));
    if let Some(marker_ts) = newest_success_ts(config_and_pool, &resource).await?
        && SinceDayStart(day_start).is_fresh(marker_ts, now.naive_utc())
    {
        return Ok(SeasonProgress::done(0));
    }

    let mut fixtures: Vec<ProviderFixture> = provider
        .fixtures_by_team(team.external_id, season, competition_id)
        .await?
        .into_iter()
        .filter(|f| is_terminal_status(&f.status_short))
        .collect();
    fixtures.sort_by_key(|f| f.kickoff_utc);
    fixtures.truncate(MAX_SEASON_FIXTURES);

    if fixtures.is_empty() {
        debug!(team = team.external_id, season, "no finished fixtures yet");
        return Ok(SeasonProgress::done(0));
    }

    let cached =
        cached_fixture_ids(config_and_pool, team.team_id, season, competition_id).await?;
    let mut calls_used = 0u32;

    for fixture in &fixtures {
        if cached.contains(&fixture.external_id) {
            continue;
        }
        if let Some(budget) = call_budget
            && calls_used >= budget
        {
            debug!(
                team = team.external_id,
                calls_used, "call budget exhausted, yielding"
            );
            return Ok(SeasonProgress::pending(calls_used));
        }
        if calls_used > 0 {
            tokio::time::sleep(Duration::from_millis(STATS_CALL_DELAY_MS)).await;
        }
        calls_used += 1;

        let stats = match provider
            .fixture_statistics(fixture.external_id, team.external_id)
            .await
        {
            // Plan-limited or absent statistics still checkpoint the fixture;
            // the goals from the bulk call are the valuable part.
            Ok(maybe_stats) => maybe_stats.unwrap_or_default(),
            Err(e) => {
                // No row written: this fixture is retried next invocation.
                warn!(fixture = fixture.external_id, error = %e, "statistics call failed");
                continue;
            }
        };

        let (goals_for, goals_against) = goals_for_team(fixture, team.external_id);
        let row = TeamFixtureRow {
            team_id: team.team_id,
            season,
            competition_id,
            external_fixture_id: fixture.external_id,
            kickoff_ts: fixture.kickoff_utc,
            goals_for,
            goals_against,
            corners: stats.corners,
            yellow_cards: stats.yellow_cards,
            red_cards: stats.red_cards,
            expected_goals: stats.expected_goals,
        };
        if let Err(e) = upsert_team_fixture_cache(config_and_pool, &row).await {
            warn!(fixture = fixture.external_id, error = %e, "checkpoint write failed");
        }
    }

    let cached =
        cached_fixture_ids(config_and_pool, team.team_id, season, competition_id).await?;
    if fixtures.iter().any(|f| !cached.contains(&f.external_id)) {
        return Ok(SeasonProgress::pending(calls_used));
    }

    if let Some(aggregate) =
        aggregate_team_fixture_cache(config_and_pool, team.team_id, season, competition_id).await?
    {
        upsert_team_season_stats(config_and_pool, &aggregate).await?;
    }
    write_marker(config_and_pool, &resource, true, now.naive_utc()).await?;
    info!(
        team = team.external_id,
        season, competition_id, calls_used, "season aggregate complete"
    );
    Ok(SeasonProgress::done(calls_used))
}

fn goals_for_team(fixture: &ProviderFixture, team_external_id: i64) -> (i64, i64) {
    let home_goals = fixture.home_goals.unwrap_or(0);
    let away_goals = fixture.away_goals.unwrap_or(0);
    if fixture.home.external_id == team_external_id {
        (home_goals, away_goals)
    } else {
        (away_goals, home_goals)
    }
}
