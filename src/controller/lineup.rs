use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use sql_middleware::middleware::ConfigAndPool;
use tracing::{debug, info, warn};

use crate::error::EngineError;
use crate::model::{
    Fixture, LineupRole, LineupRow, get_team_by_external, insert_lineup_rows, lineup_count,
    upsert_player,
};

use super::provider::{FootballApi, LineupPlayer, LineupSheet};

/// Lineups publish shortly before kickoff; outside `[kickoff - window,
/// kickoff]` there is nothing to fetch.
pub const LINEUP_WINDOW_MINUTES: i64 = 60;

/// Fetches a fixture's lineup exactly once, only inside the pre-kickoff
/// window. Existing rows mean "already fetched" and win unconditionally. A
/// provider failure is swallowed; the next call inside the window retries.
///
/// # Errors
///
/// Will return `Err` if the store is unreachable
pub async fn ensure_lineup(
    provider: &Arc<dyn FootballApi>,
    config_and_pool: &ConfigAndPool,
    fixture: &Fixture,
    now: DateTime<Utc>,
) -> Result<(), EngineError> {
    if lineup_count(config_and_pool, fixture.fixture_id).await? > 0 {
        return Ok(());
    }

    let until_kickoff = fixture.kickoff_ts.signed_duration_since(now.naive_utc());
    if until_kickoff < Duration::zero() || until_kickoff > Duration::minutes(LINEUP_WINDOW_MINUTES)
    {
        debug!(
            fixture = fixture.external_id,
            "outside lineup window, skipping"
        );
        return Ok(());
    }

    let sheets = match provider.fixture_lineups(fixture.external_id).await {
        Ok(sheets) => sheets,
        Err(e) => {
            warn!(fixture = fixture.external_id, error = %e, "lineup fetch failed");
            return Ok(());
        }
    };

    let mut rows = Vec::new();
    for sheet in &sheets {
        let Some(team_id) = resolve_side(config_and_pool, fixture, sheet).await? else {
            warn!(
                fixture = fixture.external_id,
                team = sheet.team_external_id,
                "lineup sheet for a team not on this fixture"
            );
            continue;
        };
        collect_rows(
            config_and_pool,
            fixture.fixture_id,
            team_id,
            &sheet.starting,
            LineupRole::Starting,
            &mut rows,
        )
        .await;
        collect_rows(
            config_and_pool,
            fixture.fixture_id,
            team_id,
            &sheet.substitutes,
            LineupRole::Substitute,
            &mut rows,
        )
        .await;
    }

    if rows.is_empty() {
        return Ok(());
    }
    insert_lineup_rows(config_and_pool, &rows).await?;
    info!(
        fixture = fixture.external_id,
        players = rows.len(),
        "lineup stored"
    );
    Ok(())
}

/// Maps a sheet's external team id onto the fixture's home or away side.
async fn resolve_side(
    config_and_pool: &ConfigAndPool,
    fixture: &Fixture,
    sheet: &LineupSheet,
) -> Result<Option<i64>, EngineError> {
    if let Some(team) = get_team_by_external(config_and_pool, sheet.team_external_id).await?
        && (team.team_id == fixture.home_team_id || team.team_id == fixture.away_team_id)
    {
        return Ok(Some(team.team_id));
    }
    Ok(None)
}

async fn collect_rows(
    config_and_pool: &ConfigAndPool,
    fixture_id: i64,
    team_id: i64,
    players: &[LineupPlayer],
    role: LineupRole,
    rows: &mut Vec<LineupRow>,
) {
    for player in players {
        match upsert_player(config_and_pool, player.external_id, &player.name).await {
            Ok(player_id) => rows.push(LineupRow {
                fixture_id,
                team_id,
                player_id,
                role,
            }),
            Err(e) => warn!(player = player.external_id, error = %e, "player upsert failed"),
        }
    }
}
