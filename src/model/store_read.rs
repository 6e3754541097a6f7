use std::collections::HashSet;

use chrono::{NaiveDate, NaiveDateTime};
use sql_middleware::SqlMiddlewareDbError;
use sql_middleware::middleware::{
    AsyncDatabaseExecutor, ConfigAndPool, CustomDbRow, MiddlewarePool, RowValues,
};

use crate::model::types::{
    Fixture, LineupEntry, LiveScoreRow, NamedPlayerLine, Team, TeamFixtureRow, TeamSeasonStats,
};
use crate::model::utils::reference_day_bounds_utc;

fn row_int(row: &CustomDbRow, col: &str) -> i64 {
    row.get(col).and_then(|v| v.as_int()).copied().unwrap_or(0)
}

fn row_opt_int(row: &CustomDbRow, col: &str) -> Option<i64> {
    row.get(col).and_then(|v| v.as_int()).copied()
}

fn row_text(row: &CustomDbRow, col: &str) -> String {
    row.get(col)
        .and_then(|v| v.as_text())
        .unwrap_or_default()
        .to_string()
}

fn row_opt_text(row: &CustomDbRow, col: &str) -> Option<String> {
    row.get(col)
        .and_then(|v| v.as_text())
        .map(ToString::to_string)
}

fn row_opt_float(row: &CustomDbRow, col: &str) -> Option<f64> {
    row.get(col).and_then(|v| v.as_float())
}

fn row_timestamp(row: &CustomDbRow, col: &str) -> NaiveDateTime {
    row.get(col)
        .and_then(|v| v.as_timestamp())
        .unwrap_or_else(|| chrono::Utc::now().naive_utc())
}

fn team_from_row(row: &CustomDbRow) -> Team {
    Team {
        team_id: row_int(row, "team_id"),
        external_id: row_int(row, "external_id"),
        name: row_text(row, "name"),
        short_name: row_opt_text(row, "short_name"),
        country: row_opt_text(row, "country"),
        crest_url: row_opt_text(row, "crest_url"),
    }
}

fn fixture_from_row(row: &CustomDbRow) -> Fixture {
    Fixture {
        fixture_id: row_int(row, "fixture_id"),
        external_id: row_int(row, "external_id"),
        kickoff_ts: row_timestamp(row, "kickoff_ts"),
        competition_id: row_int(row, "competition_id"),
        competition_name: row_text(row, "competition_name"),
        season: i32::try_from(row_int(row, "season")).unwrap_or(0),
        status_short: row_text(row, "status_short"),
        home_team_id: row_int(row, "home_team_id"),
        away_team_id: row_int(row, "away_team_id"),
    }
}

/// # Errors
///
/// Will return `Err` if the database query fails
pub async fn get_team(
    config_and_pool: &ConfigAndPool,
    team_id: i64,
) -> Result<Option<Team>, SqlMiddlewareDbError> {
    let mut conn = MiddlewarePool::get_connection(&config_and_pool.pool).await?;
    let res = conn
        .execute_select(
            "SELECT team_id, external_id, name, short_name, country, crest_url FROM team WHERE team_id = ?1;",
            &[RowValues::Int(team_id)],
        )
        .await?;
    Ok(res.results.first().map(team_from_row))
}

/// # Errors
///
/// Will return `Err` if the database query fails
pub async fn get_team_by_external(
    config_and_pool: &ConfigAndPool,
    external_id: i64,
) -> Result<Option<Team>, SqlMiddlewareDbError> {
    let mut conn = MiddlewarePool::get_connection(&config_and_pool.pool).await?;
    let res = conn
        .execute_select(
            "SELECT team_id, external_id, name, short_name, country, crest_url FROM team WHERE external_id = ?1;",
            &[RowValues::Int(external_id)],
        )
        .await?;
    Ok(res.results.first().map(team_from_row))
}

/// All fixtures whose kickoff lands inside the given reference-offset day.
///
/// # Errors
///
/// Will return `Err` if the database query fails
pub async fn fixtures_for_day(
    config_and_pool: &ConfigAndPool,
    day: NaiveDate,
) -> Result<Vec<Fixture>, SqlMiddlewareDbError> {
    let (start, end) = reference_day_bounds_utc(day);
    let mut conn = MiddlewarePool::get_connection(&config_and_pool.pool).await?;
    let res = conn
        .execute_select(
            "SELECT fixture_id, external_id, kickoff_ts, competition_id, competition_name, season, status_short, home_team_id, away_team_id \
             FROM fixture WHERE kickoff_ts >= ?1 AND kickoff_ts < ?2 ORDER BY kickoff_ts, external_id;",
            &[RowValues::Timestamp(start), RowValues::Timestamp(end)],
        )
        .await?;
    Ok(res.results.iter().map(fixture_from_row).collect())
}

/// # Errors
///
/// Will return `Err` if the database query fails
pub async fn get_fixture_by_external(
    config_and_pool: &ConfigAndPool,
    external_id: i64,
) -> Result<Option<Fixture>, SqlMiddlewareDbError> {
    let mut conn = MiddlewarePool::get_connection(&config_and_pool.pool).await?;
    let res = conn
        .execute_select(
            "SELECT fixture_id, external_id, kickoff_ts, competition_id, competition_name, season, status_short, home_team_id, away_team_id \
             FROM fixture WHERE external_id = ?1;",
            &[RowValues::Int(external_id)],
        )
        .await?;
    Ok(res.results.first().map(fixture_from_row))
}

/// # Errors
///
/// Will return `Err` if the database query fails
pub async fn team_season_row(
    config_and_pool: &ConfigAndPool,
    team_id: i64,
    season: i32,
    competition_id: i64,
) -> Result<Option<TeamSeasonStats>, SqlMiddlewareDbError> {
    let mut conn = MiddlewarePool::get_connection(&config_and_pool.pool).await?;
    let res = conn
        .execute_select(
            "SELECT team_id, season, competition_id, minutes_played, goals_for, goals_against, corners, yellow_cards, red_cards, expected_goals \
             FROM team_season_stats WHERE team_id = ?1 AND season = ?2 AND competition_id = ?3;",
            &[
                RowValues::Int(team_id),
                RowValues::Int(i64::from(season)),
                RowValues::Int(competition_id),
            ],
        )
        .await?;
    Ok(res.results.first().map(|row| TeamSeasonStats {
        team_id: row_int(row, "team_id"),
        season: i32::try_from(row_int(row, "season")).unwrap_or(0),
        competition_id: row_int(row, "competition_id"),
        minutes_played: row_int(row, "minutes_played"),
        goals_for: row_int(row, "goals_for"),
        goals_against: row_int(row, "goals_against"),
        corners: row_int(row, "corners"),
        yellow_cards: row_int(row, "yellow_cards"),
        red_cards: row_int(row, "red_cards"),
        expected_goals: row_opt_float(row, "expected_goals"),
    }))
}

/// External fixture ids already checkpointed for this (team, season,
/// competition) key. This is what makes the aggregator resumable.
///
/// # Errors
///
/// Will return `Err` if the database query fails
pub async fn cached_fixture_ids(
    config_and_pool: &ConfigAndPool,
    team_id: i64,
    season: i32,
    competition_id: i64,
) -> Result<HashSet<i64>, SqlMiddlewareDbError> {
    let mut conn = MiddlewarePool::get_connection(&config_and_pool.pool).await?;
    let res = conn
        .execute_select(
            "SELECT external_fixture_id FROM team_fixture_cache \
             WHERE team_id = ?1 AND season = ?2 AND competition_id = ?3;",
            &[
                RowValues::Int(team_id),
                RowValues::Int(i64::from(season)),
                RowValues::Int(competition_id),
            ],
        )
        .await?;
    Ok(res
        .results
        .iter()
        .map(|row| row_int(row, "external_fixture_id"))
        .collect())
}

/// Folds every checkpoint row for the key into one season aggregate.
/// Expected-goals sums only the fixtures that reported a value and stays
/// `None` when none did.
///
/// # Errors
///
/// Will return `Err` if the database query fails
pub async fn aggregate_team_fixture_cache(
    config_and_pool: &ConfigAndPool,
    team_id: i64,
    season: i32,
    competition_id: i64,
) -> Result<Option<TeamSeasonStats>, SqlMiddlewareDbError> {
    let mut conn = MiddlewarePool::get_connection(&config_and_pool.pool).await?;
    let res = conn
        .execute_select(
            "SELECT COUNT(*) AS played, \
                    COALESCE(SUM(goals_for), 0) AS goals_for, \
                    COALESCE(SUM(goals_against), 0) AS goals_against, \
                    COALESCE(SUM(corners), 0) AS corners, \
                    COALESCE(SUM(yellow_cards), 0) AS yellow_cards, \
                    COALESCE(SUM(red_cards), 0) AS red_cards, \
                    SUM(expected_goals) AS expected_goals \
             FROM team_fixture_cache \
             WHERE team_id = ?1 AND season = ?2 AND competition_id = ?3;",
            &[
                RowValues::Int(team_id),
                RowValues::Int(i64::from(season)),
                RowValues::Int(competition_id),
            ],
        )
        .await?;

    let Some(row) = res.results.first() else {
        return Ok(None);
    };
    let played = row_int(row, "played");
    if played == 0 {
        return Ok(None);
    }
    Ok(Some(TeamSeasonStats {
        team_id,
        season,
        competition_id,
        minutes_played: played * 90,
        goals_for: row_int(row, "goals_for"),
        goals_against: row_int(row, "goals_against"),
        corners: row_int(row, "corners"),
        yellow_cards: row_int(row, "yellow_cards"),
        red_cards: row_int(row, "red_cards"),
        expected_goals: row_opt_float(row, "expected_goals"),
    }))
}

/// Last `limit` checkpointed fixtures, newest first. Feeds the rolling form.
///
/// # Errors
///
/// Will return `Err` if the database query fails
pub async fn recent_form(
    config_and_pool: &ConfigAndPool,
    team_id: i64,
    season: i32,
    competition_id: i64,
    limit: i64,
) -> Result<Vec<TeamFixtureRow>, SqlMiddlewareDbError> {
    let mut conn = MiddlewarePool::get_connection(&config_and_pool.pool).await?;
    let res = conn
        .execute_select(
            "SELECT team_id, season, competition_id, external_fixture_id, kickoff_ts, goals_for, goals_against, corners, yellow_cards, red_cards, expected_goals \
             FROM team_fixture_cache \
             WHERE team_id = ?1 AND season = ?2 AND competition_id = ?3 \
             ORDER BY kickoff_ts DESC LIMIT ?4;",
            &[
                RowValues::Int(team_id),
                RowValues::Int(i64::from(season)),
                RowValues::Int(competition_id),
                RowValues::Int(limit),
            ],
        )
        .await?;
    Ok(res
        .results
        .iter()
        .map(|row| TeamFixtureRow {
            team_id: row_int(row, "team_id"),
            season: i32::try_from(row_int(row, "season")).unwrap_or(0),
            competition_id: row_int(row, "competition_id"),
            external_fixture_id: row_int(row, "external_fixture_id"),
            kickoff_ts: row_timestamp(row, "kickoff_ts"),
            goals_for: row_int(row, "goals_for"),
            goals_against: row_int(row, "goals_against"),
            corners: row_int(row, "corners"),
            yellow_cards: row_int(row, "yellow_cards"),
            red_cards: row_int(row, "red_cards"),
            expected_goals: row_opt_float(row, "expected_goals"),
        })
        .collect())
}

/// # Errors
///
/// Will return `Err` if the database query fails
pub async fn newest_player_stats_ts(
    config_and_pool: &ConfigAndPool,
    team_id: i64,
    season: i32,
    competition_id: i64,
) -> Result<Option<NaiveDateTime>, SqlMiddlewareDbError> {
    let mut conn = MiddlewarePool::get_connection(&config_and_pool.pool).await?;
    let res = conn
        .execute_select(
            "SELECT MAX(updated_ts) AS updated_ts FROM player_season_stats \
             WHERE team_id = ?1 AND season = ?2 AND competition_id = ?3;",
            &[
                RowValues::Int(team_id),
                RowValues::Int(i64::from(season)),
                RowValues::Int(competition_id),
            ],
        )
        .await?;
    Ok(res
        .results
        .first()
        .and_then(|row| row.get("updated_ts").and_then(|v| v.as_timestamp())))
}

/// # Errors
///
/// Will return `Err` if the database query fails
pub async fn top_players_by_goals(
    config_and_pool: &ConfigAndPool,
    team_id: i64,
    season: i32,
    competition_id: i64,
    limit: i64,
) -> Result<Vec<NamedPlayerLine>, SqlMiddlewareDbError> {
    let mut conn = MiddlewarePool::get_connection(&config_and_pool.pool).await?;
    let res = conn
        .execute_select(
            "SELECT p.name AS player_name, s.appearances, s.minutes, s.goals, s.assists, s.yellow_cards, s.red_cards \
             FROM player_season_stats s JOIN player p ON p.player_id = s.player_id \
             WHERE s.team_id = ?1 AND s.season = ?2 AND s.competition_id = ?3 \
             ORDER BY s.goals DESC, s.assists DESC, p.name LIMIT ?4;",
            &[
                RowValues::Int(team_id),
                RowValues::Int(i64::from(season)),
                RowValues::Int(competition_id),
                RowValues::Int(limit),
            ],
        )
        .await?;
    Ok(res
        .results
        .iter()
        .map(|row| NamedPlayerLine {
            player_name: row_text(row, "player_name"),
            appearances: row_int(row, "appearances"),
            minutes: row_int(row, "minutes"),
            goals: row_int(row, "goals"),
            assists: row_int(row, "assists"),
            yellow_cards: row_int(row, "yellow_cards"),
            red_cards: row_int(row, "red_cards"),
        })
        .collect())
}

/// # Errors
///
/// Will return `Err` if the database query fails
pub async fn lineup_count(
    config_and_pool: &ConfigAndPool,
    fixture_id: i64,
) -> Result<i64, SqlMiddlewareDbError> {
    let mut conn = MiddlewarePool::get_connection(&config_and_pool.pool).await?;
    let res = conn
        .execute_select(
            "SELECT COUNT(*) AS n FROM fixture_lineup WHERE fixture_id = ?1;",
            &[RowValues::Int(fixture_id)],
        )
        .await?;
    Ok(res.results.first().map(|row| row_int(row, "n")).unwrap_or(0))
}

/// # Errors
///
/// Will return `Err` if the database query fails
pub async fn lineup_entries(
    config_and_pool: &ConfigAndPool,
    fixture_id: i64,
) -> Result<Vec<LineupEntry>, SqlMiddlewareDbError> {
    let mut conn = MiddlewarePool::get_connection(&config_and_pool.pool).await?;
    let res = conn
        .execute_select(
            "SELECT l.team_id, p.name AS player_name, l.role \
             FROM fixture_lineup l JOIN player p ON p.player_id = l.player_id \
             WHERE l.fixture_id = ?1 ORDER BY l.team_id, l.role, p.name;",
            &[RowValues::Int(fixture_id)],
        )
        .await?;
    Ok(res
        .results
        .iter()
        .map(|row| LineupEntry {
            team_id: row_int(row, "team_id"),
            player_name: row_text(row, "player_name"),
            role: row_text(row, "role"),
        })
        .collect())
}

/// # Errors
///
/// Will return `Err` if the database query fails
pub async fn live_row(
    config_and_pool: &ConfigAndPool,
    fixture_id: i64,
) -> Result<Option<LiveScoreRow>, SqlMiddlewareDbError> {
    let mut conn = MiddlewarePool::get_connection(&config_and_pool.pool).await?;
    let res = conn
        .execute_select(
            "SELECT fixture_id, home_goals, away_goals, elapsed_minutes, status_short, cached_ts \
             FROM live_score_cache WHERE fixture_id = ?1;",
            &[RowValues::Int(fixture_id)],
        )
        .await?;
    Ok(res.results.first().map(|row| LiveScoreRow {
        fixture_id: row_int(row, "fixture_id"),
        home_goals: row_int(row, "home_goals"),
        away_goals: row_int(row, "away_goals"),
        elapsed_minutes: row_opt_int(row, "elapsed_minutes"),
        status_short: row_text(row, "status_short"),
        cached_ts: row_timestamp(row, "cached_ts"),
    }))
}
