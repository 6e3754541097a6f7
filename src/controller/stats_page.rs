use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use sql_middleware::middleware::ConfigAndPool;
use tracing::warn;

use crate::error::EngineError;
use crate::model::{
    Fixture, LineupEntry, LiveResult, NamedPlayerLine, Team, TeamFixtureRow, TeamSeasonStats,
    get_fixture_by_external, get_team, lineup_entries, recent_form, team_season_row,
    top_players_by_goals, upsert_team,
};

use super::fixtures::{FixtureFlights, ensure_today};
use super::lineup::ensure_lineup;
use super::live::get_live;
use super::player_stats::ensure_player_stats;
use super::provider::FootballApi;
use super::team_season::ensure_team_season;

/// How many statistics calls one reader request may spend per team before
/// serving whatever the store already holds.
pub const PAGE_CALL_BUDGET: u32 = 6;

const FORM_FIXTURES: i64 = 5;
const TOP_PLAYERS: i64 = 5;

#[derive(Debug, Clone, Serialize)]
pub struct TeamPanel {
    pub team: Team,
    pub season_stats: Option<TeamSeasonStats>,
    pub season_complete: bool,
    pub recent_form: Vec<TeamFixtureRow>,
    pub top_players: Vec<NamedPlayerLine>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FixtureStatsPage {
    pub fixture: Fixture,
    pub home: TeamPanel,
    pub away: TeamPanel,
    pub lineups: Vec<LineupEntry>,
    pub live: LiveResult,
}

/// The reader path: ensure every stale category for one fixture, then
/// compose the page from the store. A category that fails to refresh is
/// served from whatever the store already holds; only a missing fixture is
/// a hard error.
///
/// # Errors
///
/// Will return `Err` if the fixture is unknown or the store is unreachable
pub async fn get_data_for_fixture_page(
    provider: &Arc<dyn FootballApi>,
    config_and_pool: &ConfigAndPool,
    flights: &FixtureFlights,
    fixture_external_id: i64,
    now: DateTime<Utc>,
) -> Result<FixtureStatsPage, EngineError> {
    if let Err(e) = ensure_today(provider, config_and_pool, flights, now).await {
        warn!(error = %e, "fixture-day ensure failed, serving stored data");
    }

    let fixture = get_fixture_by_external(config_and_pool, fixture_external_id)
        .await?
        .ok_or_else(|| EngineError::NotFound(format!("fixture {fixture_external_id}")))?;

    if let Err(e) = ensure_lineup(provider, config_and_pool, &fixture, now).await {
        warn!(fixture = fixture.external_id, error = %e, "lineup ensure failed");
    }

    let home = team_panel(provider, config_and_pool, &fixture, fixture.home_team_id, now).await?;
    let away = team_panel(provider, config_and_pool, &fixture, fixture.away_team_id, now).await?;

    let lineups = lineup_entries(config_and_pool, fixture.fixture_id).await?;
    let live = get_live(provider, config_and_pool, &fixture, now).await?;

    Ok(FixtureStatsPage {
        fixture,
        home,
        away,
        lineups,
        live,
    })
}

async fn team_panel(
    provider: &Arc<dyn FootballApi>,
    config_and_pool: &ConfigAndPool,
    fixture: &Fixture,
    team_id: i64,
    now: DateTime<Utc>,
) -> Result<TeamPanel, EngineError> {
    let team = get_team(config_and_pool, team_id)
        .await?
        .ok_or_else(|| EngineError::NotFound(format!("team {team_id}")))?;
    let team = backfill_team(provider, config_and_pool, team).await;

    let mut season_complete = false;
    match ensure_team_season(
        provider,
        config_and_pool,
        &team,
        fixture.season,
        fixture.competition_id,
        Some(PAGE_CALL_BUDGET),
        now,
    )
    .await
    {
        Ok(progress) => season_complete = progress.done,
        Err(e) => warn!(team = team.external_id, error = %e, "season ensure failed"),
    }
    if let Err(e) = ensure_player_stats(
        provider,
        config_and_pool,
        &team,
        fixture.season,
        fixture.competition_id,
        now,
    )
    .await
    {
        warn!(team = team.external_id, error = %e, "player stats ensure failed");
    }

    let season_stats =
        team_season_row(config_and_pool, team_id, fixture.season, fixture.competition_id).await?;
    let recent_form = recent_form(
        config_and_pool,
        team_id,
        fixture.season,
        fixture.competition_id,
        FORM_FIXTURES,
    )
    .await?;
    let top_players = top_players_by_goals(
        config_and_pool,
        team_id,
        fixture.season,
        fixture.competition_id,
        TOP_PLAYERS,
    )
    .await?;

    Ok(TeamPanel {
        team,
        season_stats,
        season_complete,
        recent_form,
        top_players,
    })
}

/// Fixture payloads embed teams with sparse metadata on some provider
/// plans. Once crest and country are known the teams endpoint is never
/// asked again; a failed backfill serves the sparse row as-is.
async fn backfill_team(
    provider: &Arc<dyn FootballApi>,
    config_and_pool: &ConfigAndPool,
    team: Team,
) -> Team {
    if team.crest_url.is_some() && team.country.is_some() {
        return team;
    }
    let remote = match provider.team_by_id(team.external_id).await {
        Ok(Some(remote)) => remote,
        Ok(None) => return team,
        Err(e) => {
            warn!(team = team.external_id, error = %e, "team backfill fetch failed");
            return team;
        }
    };
    if let Err(e) = upsert_team(config_and_pool, &remote).await {
        warn!(team = team.external_id, error = %e, "team backfill write failed");
        return team;
    }
    match get_team(config_and_pool, team.team_id).await {
        Ok(Some(updated)) => updated,
        Ok(None) => team,
        Err(e) => {
            warn!(team = team.external_id, error = %e, "team re-read failed");
            team
        }
    }
}
