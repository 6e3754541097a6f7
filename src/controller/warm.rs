use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use sql_middleware::middleware::ConfigAndPool;
use tracing::warn;

use crate::error::EngineError;
use crate::model::{get_team, reference_day};

use super::fixtures::{FixtureFlights, ensure_today};
use super::lineup::ensure_lineup;
use super::player_stats::ensure_player_stats;
use super::provider::FootballApi;
use super::team_season::ensure_team_season;

pub const DEFAULT_WARM_BUDGET: u32 = 30;

/// One bounded chunk of the warm-up. The driver outside this process calls
/// it repeatedly until `done` turns true; each chunk advances whatever the
/// remaining budget allows and leaves the store valid in between.
#[derive(Debug, Clone, Serialize)]
pub struct WarmReport {
    pub day: NaiveDate,
    pub fixtures: usize,
    pub teams_done: usize,
    pub teams_pending: usize,
    pub calls_used: u32,
    pub done: bool,
}

/// # Errors
///
/// Will return `Err` only if the fixture list itself cannot be ensured;
/// everything below that degrades per team
pub async fn warm_today(
    provider: &Arc<dyn FootballApi>,
    config_and_pool: &ConfigAndPool,
    flights: &FixtureFlights,
    now: DateTime<Utc>,
    call_budget: u32,
) -> Result<WarmReport, EngineError> {
    let day = reference_day(now);
    let fixtures = ensure_today(provider, config_and_pool, flights, now).await?;

    for fixture in &fixtures {
        if let Err(e) = ensure_lineup(provider, config_and_pool, fixture, now).await {
            warn!(fixture = fixture.external_id, error = %e, "lineup ensure failed");
        }
    }

    // Teams in kickoff order, home before away, each at most once.
    let mut seen = HashSet::new();
    let mut jobs = Vec::new();
    for fixture in &fixtures {
        for team_id in [fixture.home_team_id, fixture.away_team_id] {
            if seen.insert((team_id, fixture.season, fixture.competition_id)) {
                jobs.push((team_id, fixture.season, fixture.competition_id));
            }
        }
    }

    let mut calls_used = 0u32;
    let mut teams_done = 0usize;
    let mut teams_pending = 0usize;

    for (team_id, season, competition_id) in jobs {
        if calls_used >= call_budget {
            teams_pending += 1;
            continue;
        }
        let Some(team) = get_team(config_and_pool, team_id).await? else {
            warn!(team_id, "team row missing during warm");
            continue;
        };
        let remaining = call_budget - calls_used;
        match ensure_team_season(
            provider,
            config_and_pool,
            &team,
            season,
            competition_id,
            Some(remaining),
            now,
        )
        .await
        {
            Ok(progress) => {
                calls_used += progress.calls_used;
                if progress.done {
                    teams_done += 1;
                    if let Err(e) = ensure_player_stats(
                        provider,
                        config_and_pool,
                        &team,
                        season,
                        competition_id,
                        now,
                    )
                    .await
                    {
                        warn!(team = team.external_id, error = %e, "player stats ensure failed");
                    }
                } else {
                    teams_pending += 1;
                }
            }
            Err(e) => {
                warn!(team = team.external_id, error = %e, "season ensure failed");
                teams_pending += 1;
            }
        }
    }

    Ok(WarmReport {
        day,
        fixtures: fixtures.len(),
        teams_done,
        teams_pending,
        calls_used,
        done: teams_pending == 0,
    })
}
