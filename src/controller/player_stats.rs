use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use futures::future::join_all;
use sql_middleware::middleware::ConfigAndPool;
use tracing::{debug, info, warn};

use crate::error::EngineError;
use crate::model::{
    Freshness, MaxAge, PlayerSeasonLine, Team, newest_player_stats_ts, upsert_player,
    upsert_player_season_stats,
};

use super::provider::{FootballApi, ProviderPlayer};

pub const PLAYER_STATS_COOLDOWN_HOURS: i64 = 24;

/// Upserts run in small concurrent batches; one bad record must not take
/// the rest of the squad down with it.
const UPSERT_BATCH: usize = 5;

/// Refreshes a team's season player statistics unless the newest stored row
/// is still inside the cooldown. Idempotent and cheap to call repeatedly.
///
/// # Errors
///
/// Will return `Err` if the store is unreachable or the provider fetch
/// fails outright; per-player failures are logged and skipped
pub async fn ensure_player_stats(
    provider: &Arc<dyn FootballApi>,
    config_and_pool: &ConfigAndPool,
    team: &Team,
    season: i32,
    competition_id: i64,
    now: DateTime<Utc>,
) -> Result<(), EngineError> {
    if let Some(newest) =
        newest_player_stats_ts(config_and_pool, team.team_id, season, competition_id).await?
        && MaxAge(Duration::hours(PLAYER_STATS_COOLDOWN_HOURS)).is_fresh(newest, now.naive_utc())
    {
        debug!(team = team.external_id, "player stats inside cooldown");
        return Ok(());
    }

    let players: Vec<ProviderPlayer> = provider
        .players_by_team(team.external_id, season, competition_id)
        .await?
        .into_iter()
        .filter(|p| !p.is_all_zero())
        .collect();

    let mut stored = 0usize;
    for batch in players.chunks(UPSERT_BATCH) {
        let writes = batch.iter().map(|player| async {
            store_player_line(config_and_pool, team, season, competition_id, player, now).await
        });
        for (player, outcome) in batch.iter().zip(join_all(writes).await) {
            match outcome {
                Ok(()) => stored += 1,
                Err(e) => {
                    warn!(player = player.external_id, error = %e, "player upsert failed");
                }
            }
        }
    }

    info!(
        team = team.external_id,
        season, competition_id, stored, "player stats refreshed"
    );
    Ok(())
}

async fn store_player_line(
    config_and_pool: &ConfigAndPool,
    team: &Team,
    season: i32,
    competition_id: i64,
    player: &ProviderPlayer,
    now: DateTime<Utc>,
) -> Result<(), EngineError> {
    let player_id = upsert_player(config_and_pool, player.external_id, &player.name).await?;
    let line = PlayerSeasonLine {
        player_id,
        team_id: team.team_id,
        season,
        competition_id,
        appearances: player.appearances,
        minutes: player.minutes,
        goals: player.goals,
        assists: player.assists,
        fouls: player.fouls,
        shots: player.shots,
        shots_on_target: player.shots_on_target,
        tackles: player.tackles,
        yellow_cards: player.yellow_cards,
        red_cards: player.red_cards,
    };
    upsert_player_season_stats(config_and_pool, &line, now.naive_utc()).await?;
    Ok(())
}
