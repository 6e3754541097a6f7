use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};

use matchday::EngineError;
use matchday::controller::provider::{
    FixtureTeamStats, FootballApi, LineupPlayer, LineupSheet, ProviderFixture, ProviderPlayer,
    ProviderTeam,
};
use matchday::model::store_read::get_fixture_by_external;
use matchday::model::store_write::{upsert_fixture, upsert_team};
use matchday::model::types::Fixture;
use sql_middleware::SqlMiddlewareDbError;
use sql_middleware::middleware::{AsyncDatabaseExecutor, ConfigAndPool, MiddlewarePool};

pub struct TestContext {
    pub config_and_pool: ConfigAndPool,
}

pub async fn setup_test_context() -> Result<TestContext, SqlMiddlewareDbError> {
    let db_name = format!(
        "file:test_db_{}?mode=memory&cache=shared",
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("system time went backwards")
            .as_nanos()
    );

    let config_and_pool = ConfigAndPool::new_sqlite(db_name).await?;

    let schema = [
        include_str!("../../src/sql/schema/sqlite/00_table_drop.sql"),
        include_str!("../../src/sql/schema/sqlite/01_team.sql"),
        include_str!("../../src/sql/schema/sqlite/02_fixture.sql"),
        include_str!("../../src/sql/schema/sqlite/03_team_season_stats.sql"),
        include_str!("../../src/sql/schema/sqlite/04_team_fixture_cache.sql"),
        include_str!("../../src/sql/schema/sqlite/05_player.sql"),
        include_str!("../../src/sql/schema/sqlite/06_player_season_stats.sql"),
        include_str!("../../src/sql/schema/sqlite/07_fixture_lineup.sql"),
        include_str!("../../src/sql/schema/sqlite/08_live_score_cache.sql"),
        include_str!("../../src/sql/schema/sqlite/09_api_fetch_log.sql"),
    ]
    .join("\n");

    let mut conn = MiddlewarePool::get_connection(&config_and_pool.pool).await?;
    conn.execute_batch(&schema).await?;

    Ok(TestContext { config_and_pool })
}

/// Scripted stand-in for the HTTP provider. Every endpoint counts its calls
/// and serves whatever the test loaded; tests mutate the fields between calls
/// to play out a scenario.
#[derive(Default)]
pub struct ScriptedApi {
    pub fixtures_by_date_calls: AtomicUsize,
    pub fixtures_by_team_calls: AtomicUsize,
    pub fixture_statistics_calls: AtomicUsize,
    pub fixture_by_id_calls: AtomicUsize,
    pub players_by_team_calls: AtomicUsize,
    pub team_by_id_calls: AtomicUsize,
    pub fixture_lineups_calls: AtomicUsize,

    pub day_fixtures: Mutex<Vec<ProviderFixture>>,
    pub season_fixtures: Mutex<Vec<ProviderFixture>>,
    pub statistics: Mutex<HashMap<i64, FixtureTeamStats>>,
    /// Fixture ids whose next statistics call fails, once.
    pub failing_statistics: Mutex<HashSet<i64>>,
    pub live_fixture: Mutex<Option<ProviderFixture>>,
    pub players: Mutex<Vec<ProviderPlayer>>,
    pub lineups: Mutex<Vec<LineupSheet>>,
    pub teams: Mutex<HashMap<i64, ProviderTeam>>,
}

impl ScriptedApi {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl FootballApi for ScriptedApi {
    async fn fixtures_by_date(
        &self,
        competition_id: i64,
        _season: i32,
        _day: NaiveDate,
    ) -> Result<Vec<ProviderFixture>, EngineError> {
        self.fixtures_by_date_calls.fetch_add(1, Ordering::SeqCst);
        let fixtures = self.day_fixtures.lock().expect("lock poisoned");
        Ok(fixtures
            .iter()
            .filter(|f| f.competition_id == competition_id)
            .cloned()
            .collect())
    }

    async fn fixtures_by_team(
        &self,
        _team_external_id: i64,
        _season: i32,
        _competition_id: i64,
    ) -> Result<Vec<ProviderFixture>, EngineError> {
        self.fixtures_by_team_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.season_fixtures.lock().expect("lock poisoned").clone())
    }

    async fn fixture_statistics(
        &self,
        fixture_external_id: i64,
        _team_external_id: i64,
    ) -> Result<Option<FixtureTeamStats>, EngineError> {
        self.fixture_statistics_calls.fetch_add(1, Ordering::SeqCst);
        if self
            .failing_statistics
            .lock()
            .expect("lock poisoned")
            .remove(&fixture_external_id)
        {
            return Err(EngineError::Network("scripted failure".to_string()));
        }
        Ok(self
            .statistics
            .lock()
            .expect("lock poisoned")
            .get(&fixture_external_id)
            .cloned())
    }

    async fn fixture_by_id(
        &self,
        _fixture_external_id: i64,
    ) -> Result<Option<ProviderFixture>, EngineError> {
        self.fixture_by_id_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.live_fixture.lock().expect("lock poisoned").clone())
    }

    async fn players_by_team(
        &self,
        _team_external_id: i64,
        _season: i32,
        _competition_id: i64,
    ) -> Result<Vec<ProviderPlayer>, EngineError> {
        self.players_by_team_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.players.lock().expect("lock poisoned").clone())
    }

    async fn team_by_id(
        &self,
        team_external_id: i64,
    ) -> Result<Option<ProviderTeam>, EngineError> {
        self.team_by_id_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .teams
            .lock()
            .expect("lock poisoned")
            .get(&team_external_id)
            .cloned())
    }

    async fn fixture_lineups(
        &self,
        _fixture_external_id: i64,
    ) -> Result<Vec<LineupSheet>, EngineError> {
        self.fixture_lineups_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.lineups.lock().expect("lock poisoned").clone())
    }
}

pub fn provider_team(external_id: i64, name: &str) -> ProviderTeam {
    ProviderTeam {
        external_id,
        name: name.to_string(),
        short_name: None,
        country: None,
        crest_url: None,
    }
}

#[allow(clippy::too_many_arguments)]
pub fn provider_fixture(
    external_id: i64,
    kickoff_utc: NaiveDateTime,
    competition_id: i64,
    season: i32,
    status_short: &str,
    home: ProviderTeam,
    away: ProviderTeam,
    home_goals: Option<i64>,
    away_goals: Option<i64>,
) -> ProviderFixture {
    ProviderFixture {
        external_id,
        kickoff_utc,
        competition_id,
        competition_name: "Test League".to_string(),
        season,
        status_short: status_short.to_string(),
        elapsed_minutes: None,
        home,
        away,
        home_goals,
        away_goals,
    }
}

pub fn player(external_id: i64, name: &str, goals: i64, minutes: i64) -> ProviderPlayer {
    ProviderPlayer {
        external_id,
        name: name.to_string(),
        appearances: if minutes > 0 { 1 } else { 0 },
        minutes,
        goals,
        assists: 0,
        fouls: 0,
        shots: goals,
        shots_on_target: goals,
        tackles: 0,
        yellow_cards: 0,
        red_cards: 0,
    }
}

pub fn lineup_sheet(team_external_id: i64, starting: &[(i64, &str)], subs: &[(i64, &str)]) -> LineupSheet {
    let to_players = |list: &[(i64, &str)]| {
        list.iter()
            .map(|(id, name)| LineupPlayer {
                external_id: *id,
                name: (*name).to_string(),
            })
            .collect()
    };
    LineupSheet {
        team_external_id,
        starting: to_players(starting),
        substitutes: to_players(subs),
    }
}

/// Writes a fixture and both teams straight into the store and reads the
/// stored row back, bypassing the sync path.
pub async fn seed_fixture(
    config_and_pool: &ConfigAndPool,
    fixture: &ProviderFixture,
) -> Result<Fixture, Box<dyn std::error::Error>> {
    let home_id = upsert_team(config_and_pool, &fixture.home).await?;
    let away_id = upsert_team(config_and_pool, &fixture.away).await?;
    upsert_fixture(config_and_pool, fixture, home_id, away_id).await?;
    get_fixture_by_external(config_and_pool, fixture.external_id)
        .await?
        .ok_or_else(|| "seeded fixture not found".into())
}
