use chrono::{NaiveDateTime, Utc};
use sql_middleware::SqlMiddlewareDbError;
use sql_middleware::middleware::{AsyncDatabaseExecutor, ConfigAndPool, MiddlewarePool, RowValues};

use crate::controller::provider::{ProviderFixture, ProviderTeam};
use crate::model::types::{LineupRow, LiveScoreRow, PlayerSeasonLine, TeamFixtureRow, TeamSeasonStats};

/// Upserts the team by external id and returns its internal id. The store
/// never auto-deletes teams; first sighting creates, later sightings update.
///
/// # Errors
///
/// Will return `Err` if the database query fails
pub async fn upsert_team(
    config_and_pool: &ConfigAndPool,
    team: &ProviderTeam,
) -> Result<i64, SqlMiddlewareDbError> {
    let mut conn = MiddlewarePool::get_connection(&config_and_pool.pool).await?;
    // Missing metadata binds as '' and NULLIF turns it back into NULL, so a
    // sparse re-sighting never erases a known value.
    conn.execute_dml(
        "INSERT INTO team (external_id, name, short_name, country, crest_url) \
         VALUES (?1, ?2, NULLIF(?3, ''), NULLIF(?4, ''), NULLIF(?5, '')) \
         ON CONFLICT (external_id) DO UPDATE SET \
             name = excluded.name, \
             short_name = COALESCE(excluded.short_name, team.short_name), \
             country = COALESCE(excluded.country, team.country), \
             crest_url = COALESCE(excluded.crest_url, team.crest_url);",
        &[
            RowValues::Int(team.external_id),
            RowValues::Text(team.name.clone()),
            RowValues::Text(team.short_name.clone().unwrap_or_default()),
            RowValues::Text(team.country.clone().unwrap_or_default()),
            RowValues::Text(team.crest_url.clone().unwrap_or_default()),
        ],
    )
    .await?;

    let res = conn
        .execute_select(
            "SELECT team_id FROM team WHERE external_id = ?1;",
            &[RowValues::Int(team.external_id)],
        )
        .await?;
    res.results
        .first()
        .and_then(|row| row.get("team_id").and_then(|v| v.as_int()).copied())
        .ok_or_else(|| SqlMiddlewareDbError::Other("team upsert left no row".to_string()))
}

/// Teams must already exist; the fixture row references them.
///
/// # Errors
///
/// Will return `Err` if the database query fails
pub async fn upsert_fixture(
    config_and_pool: &ConfigAndPool,
    fixture: &ProviderFixture,
    home_team_id: i64,
    away_team_id: i64,
) -> Result<(), SqlMiddlewareDbError> {
    let mut conn = MiddlewarePool::get_connection(&config_and_pool.pool).await?;
    conn.execute_dml(
        "INSERT INTO fixture (external_id, kickoff_ts, competition_id, competition_name, season, status_short, home_team_id, away_team_id) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8) \
         ON CONFLICT (external_id) DO UPDATE SET \
             kickoff_ts = excluded.kickoff_ts, \
             competition_id = excluded.competition_id, \
             competition_name = excluded.competition_name, \
             season = excluded.season, \
             status_short = excluded.status_short, \
             home_team_id = excluded.home_team_id, \
             away_team_id = excluded.away_team_id;",
        &[
            RowValues::Int(fixture.external_id),
            RowValues::Timestamp(fixture.kickoff_utc),
            RowValues::Int(fixture.competition_id),
            RowValues::Text(fixture.competition_name.clone()),
            RowValues::Int(i64::from(fixture.season)),
            RowValues::Text(fixture.status_short.clone()),
            RowValues::Int(home_team_id),
            RowValues::Int(away_team_id),
        ],
    )
    .await?;
    Ok(())
}

/// Deletes fixtures from fully-passed days, along with their lineup and
/// live-score rows. Checkpoint and aggregate tables persist.
///
/// # Errors
///
/// Will return `Err` if the database query fails
pub async fn prune_fixtures_before(
    config_and_pool: &ConfigAndPool,
    day_start_utc: NaiveDateTime,
) -> Result<(), SqlMiddlewareDbError> {
    let mut conn = MiddlewarePool::get_connection(&config_and_pool.pool).await?;
    let stale = [
        "DELETE FROM fixture_lineup WHERE fixture_id IN (SELECT fixture_id FROM fixture WHERE kickoff_ts < ?1);",
        "DELETE FROM live_score_cache WHERE fixture_id IN (SELECT fixture_id FROM fixture WHERE kickoff_ts < ?1);",
        "DELETE FROM fixture WHERE kickoff_ts < ?1;",
    ];
    for query in stale {
        conn.execute_dml(query, &[RowValues::Timestamp(day_start_utc)])
            .await?;
    }
    Ok(())
}

/// # Errors
///
/// Will return `Err` if the database query fails
pub async fn upsert_team_season_stats(
    config_and_pool: &ConfigAndPool,
    stats: &TeamSeasonStats,
) -> Result<(), SqlMiddlewareDbError> {
    let mut conn = MiddlewarePool::get_connection(&config_and_pool.pool).await?;
    // No NULL bind in the middleware's value set, so the nullable
    // expected-goals column gets its own statement variant.
    match stats.expected_goals {
        Some(xg) => {
            conn.execute_dml(
                "INSERT INTO team_season_stats (team_id, season, competition_id, minutes_played, goals_for, goals_against, corners, yellow_cards, red_cards, expected_goals, ins_ts) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11) \
                 ON CONFLICT (team_id, season, competition_id) DO UPDATE SET \
                     minutes_played = excluded.minutes_played, \
                     goals_for = excluded.goals_for, \
                     goals_against = excluded.goals_against, \
                     corners = excluded.corners, \
                     yellow_cards = excluded.yellow_cards, \
                     red_cards = excluded.red_cards, \
                     expected_goals = excluded.expected_goals, \
                     ins_ts = excluded.ins_ts;",
                &[
                    RowValues::Int(stats.team_id),
                    RowValues::Int(i64::from(stats.season)),
                    RowValues::Int(stats.competition_id),
                    RowValues::Int(stats.minutes_played),
                    RowValues::Int(stats.goals_for),
                    RowValues::Int(stats.goals_against),
                    RowValues::Int(stats.corners),
                    RowValues::Int(stats.yellow_cards),
                    RowValues::Int(stats.red_cards),
                    RowValues::Float(xg),
                    RowValues::Timestamp(Utc::now().naive_utc()),
                ],
            )
            .await?;
        }
        None => {
            conn.execute_dml(
                "INSERT INTO team_season_stats (team_id, season, competition_id, minutes_played, goals_for, goals_against, corners, yellow_cards, red_cards, expected_goals, ins_ts) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, NULL, ?10) \
                 ON CONFLICT (team_id, season, competition_id) DO UPDATE SET \
                     minutes_played = excluded.minutes_played, \
                     goals_for = excluded.goals_for, \
                     goals_against = excluded.goals_against, \
                     corners = excluded.corners, \
                     yellow_cards = excluded.yellow_cards, \
                     red_cards = excluded.red_cards, \
                     expected_goals = NULL, \
                     ins_ts = excluded.ins_ts;",
                &[
                    RowValues::Int(stats.team_id),
                    RowValues::Int(i64::from(stats.season)),
                    RowValues::Int(stats.competition_id),
                    RowValues::Int(stats.minutes_played),
                    RowValues::Int(stats.goals_for),
                    RowValues::Int(stats.goals_against),
                    RowValues::Int(stats.corners),
                    RowValues::Int(stats.yellow_cards),
                    RowValues::Int(stats.red_cards),
                    RowValues::Timestamp(Utc::now().naive_utc()),
                ],
            )
            .await?;
        }
    }
    Ok(())
}

/// Writes one checkpoint row. Idempotent: re-running an invocation that was
/// cut off mid-job lands on the same unique key.
///
/// # Errors
///
/// Will return `Err` if the database query fails
pub async fn upsert_team_fixture_cache(
    config_and_pool: &ConfigAndPool,
    row: &TeamFixtureRow,
) -> Result<(), SqlMiddlewareDbError> {
    let mut conn = MiddlewarePool::get_connection(&config_and_pool.pool).await?;
    let base = [
        RowValues::Int(row.team_id),
        RowValues::Int(i64::from(row.season)),
        RowValues::Int(row.competition_id),
        RowValues::Int(row.external_fixture_id),
        RowValues::Timestamp(row.kickoff_ts),
        RowValues::Int(row.goals_for),
        RowValues::Int(row.goals_against),
        RowValues::Int(row.corners),
        RowValues::Int(row.yellow_cards),
        RowValues::Int(row.red_cards),
    ];
    match row.expected_goals {
        Some(xg) => {
            let mut params = base.to_vec();
            params.push(RowValues::Float(xg));
            conn.execute_dml(
                "INSERT INTO team_fixture_cache (team_id, season, competition_id, external_fixture_id, kickoff_ts, goals_for, goals_against, corners, yellow_cards, red_cards, expected_goals) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11) \
                 ON CONFLICT (team_id, season, competition_id, external_fixture_id) DO UPDATE SET \
                     kickoff_ts = excluded.kickoff_ts, \
                     goals_for = excluded.goals_for, \
                     goals_against = excluded.goals_against, \
                     corners = excluded.corners, \
                     yellow_cards = excluded.yellow_cards, \
                     red_cards = excluded.red_cards, \
                     expected_goals = excluded.expected_goals;",
                &params,
            )
            .await?;
        }
        None => {
            conn.execute_dml(
                "INSERT INTO team_fixture_cache (team_id, season, competition_id, external_fixture_id, kickoff_ts, goals_for, goals_against, corners, yellow_cards, red_cards, expected_goals) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, NULL) \
                 ON CONFLICT (team_id, season, competition_id, external_fixture_id) DO UPDATE SET \
                     kickoff_ts = excluded.kickoff_ts, \
                     goals_for = excluded.goals_for, \
                     goals_against = excluded.goals_against, \
                     corners = excluded.corners, \
                     yellow_cards = excluded.yellow_cards, \
                     red_cards = excluded.red_cards;",
                &base,
            )
            .await?;
        }
    }
    Ok(())
}

/// # Errors
///
/// Will return `Err` if the database query fails
pub async fn upsert_player(
    config_and_pool: &ConfigAndPool,
    external_id: i64,
    name: &str,
) -> Result<i64, SqlMiddlewareDbError> {
    let mut conn = MiddlewarePool::get_connection(&config_and_pool.pool).await?;
    conn.execute_dml(
        "INSERT INTO player (external_id, name) VALUES (?1, ?2) \
         ON CONFLICT (external_id) DO UPDATE SET name = excluded.name;",
        &[RowValues::Int(external_id), RowValues::Text(name.to_string())],
    )
    .await?;
    let res = conn
        .execute_select(
            "SELECT player_id FROM player WHERE external_id = ?1;",
            &[RowValues::Int(external_id)],
        )
        .await?;
    res.results
        .first()
        .and_then(|row| row.get("player_id").and_then(|v| v.as_int()).copied())
        .ok_or_else(|| SqlMiddlewareDbError::Other("player upsert left no row".to_string()))
}

/// # Errors
///
/// Will return `Err` if the database query fails
pub async fn upsert_player_season_stats(
    config_and_pool: &ConfigAndPool,
    line: &PlayerSeasonLine,
    updated_ts: NaiveDateTime,
) -> Result<(), SqlMiddlewareDbError> {
    let mut conn = MiddlewarePool::get_connection(&config_and_pool.pool).await?;
    conn.execute_dml(
        "INSERT INTO player_season_stats (player_id, team_id, season, competition_id, appearances, minutes, goals, assists, fouls, shots, shots_on_target, tackles, yellow_cards, red_cards, updated_ts) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15) \
         ON CONFLICT (player_id, team_id, season, competition_id) DO UPDATE SET \
             appearances = excluded.appearances, \
             minutes = excluded.minutes, \
             goals = excluded.goals, \
             assists = excluded.assists, \
             fouls = excluded.fouls, \
             shots = excluded.shots, \
             shots_on_target = excluded.shots_on_target, \
             tackles = excluded.tackles, \
             yellow_cards = excluded.yellow_cards, \
             red_cards = excluded.red_cards, \
             updated_ts = excluded.updated_ts;",
        &[
            RowValues::Int(line.player_id),
            RowValues::Int(line.team_id),
            RowValues::Int(i64::from(line.season)),
            RowValues::Int(line.competition_id),
            RowValues::Int(line.appearances),
            RowValues::Int(line.minutes),
            RowValues::Int(line.goals),
            RowValues::Int(line.assists),
            RowValues::Int(line.fouls),
            RowValues::Int(line.shots),
            RowValues::Int(line.shots_on_target),
            RowValues::Int(line.tackles),
            RowValues::Int(line.yellow_cards),
            RowValues::Int(line.red_cards),
            RowValues::Timestamp(updated_ts),
        ],
    )
    .await?;
    Ok(())
}

/// Lineups are insert-only with duplicate skip; once any row exists the
/// fetcher never runs again for that fixture.
///
/// # Errors
///
/// Will return `Err` if the database query fails
pub async fn insert_lineup_rows(
    config_and_pool: &ConfigAndPool,
    rows: &[LineupRow],
) -> Result<(), SqlMiddlewareDbError> {
    let mut conn = MiddlewarePool::get_connection(&config_and_pool.pool).await?;
    for row in rows {
        conn.execute_dml(
            "INSERT OR IGNORE INTO fixture_lineup (fixture_id, team_id, player_id, role) \
             VALUES (?1, ?2, ?3, ?4);",
            &[
                RowValues::Int(row.fixture_id),
                RowValues::Int(row.team_id),
                RowValues::Int(row.player_id),
                RowValues::Text(row.role.as_str().to_string()),
            ],
        )
        .await?;
    }
    Ok(())
}

/// # Errors
///
/// Will return `Err` if the database query fails
pub async fn upsert_live_score(
    config_and_pool: &ConfigAndPool,
    row: &LiveScoreRow,
) -> Result<(), SqlMiddlewareDbError> {
    let mut conn = MiddlewarePool::get_connection(&config_and_pool.pool).await?;
    match row.elapsed_minutes {
        Some(elapsed) => {
            conn.execute_dml(
                "INSERT INTO live_score_cache (fixture_id, home_goals, away_goals, elapsed_minutes, status_short, cached_ts) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6) \
                 ON CONFLICT (fixture_id) DO UPDATE SET \
                     home_goals = excluded.home_goals, \
                     away_goals = excluded.away_goals, \
                     elapsed_minutes = excluded.elapsed_minutes, \
                     status_short = excluded.status_short, \
                     cached_ts = excluded.cached_ts;",
                &[
                    RowValues::Int(row.fixture_id),
                    RowValues::Int(row.home_goals),
                    RowValues::Int(row.away_goals),
                    RowValues::Int(elapsed),
                    RowValues::Text(row.status_short.clone()),
                    RowValues::Timestamp(row.cached_ts),
                ],
            )
            .await?;
        }
        None => {
            conn.execute_dml(
                "INSERT INTO live_score_cache (fixture_id, home_goals, away_goals, elapsed_minutes, status_short, cached_ts) \
                 VALUES (?1, ?2, ?3, NULL, ?4, ?5) \
                 ON CONFLICT (fixture_id) DO UPDATE SET \
                     home_goals = excluded.home_goals, \
                     away_goals = excluded.away_goals, \
                     elapsed_minutes = NULL, \
                     status_short = excluded.status_short, \
                     cached_ts = excluded.cached_ts;",
                &[
                    RowValues::Int(row.fixture_id),
                    RowValues::Int(row.home_goals),
                    RowValues::Int(row.away_goals),
                    RowValues::Text(row.status_short.clone()),
                    RowValues::Timestamp(row.cached_ts),
                ],
            )
            .await?;
        }
    }
    Ok(())
}
