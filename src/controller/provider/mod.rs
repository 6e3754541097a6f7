pub mod client;
pub mod normalize;

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::error::EngineError;

pub use client::HttpFootballApi;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderTeam {
    pub external_id: i64,
    pub name: String,
    pub short_name: Option<String>,
    pub country: Option<String>,
    pub crest_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderFixture {
    pub external_id: i64,
    pub kickoff_utc: NaiveDateTime,
    pub competition_id: i64,
    pub competition_name: String,
    pub season: i32,
    pub status_short: String,
    pub elapsed_minutes: Option<i64>,
    pub home: ProviderTeam,
    pub away: ProviderTeam,
    pub home_goals: Option<i64>,
    pub away_goals: Option<i64>,
}

/// One team's statistics for one fixture, already normalized to canonical
/// fields; the rest of the engine never sees provider labels.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FixtureTeamStats {
    pub corners: i64,
    pub yellow_cards: i64,
    pub red_cards: i64,
    pub expected_goals: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderPlayer {
    pub external_id: i64,
    pub name: String,
    pub appearances: i64,
    pub minutes: i64,
    pub goals: i64,
    pub assists: i64,
    pub fouls: i64,
    pub shots: i64,
    pub shots_on_target: i64,
    pub tackles: i64,
    pub yellow_cards: i64,
    pub red_cards: i64,
}

impl ProviderPlayer {
    /// Rows where the provider reports a player with no observed activity at
    /// all are noise and get filtered before they reach the store.
    #[must_use]
    pub fn is_all_zero(&self) -> bool {
        self.appearances == 0
            && self.minutes == 0
            && self.goals == 0
            && self.assists == 0
            && self.shots == 0
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineupPlayer {
    pub external_id: i64,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineupSheet {
    pub team_external_id: i64,
    pub starting: Vec<LineupPlayer>,
    pub substitutes: Vec<LineupPlayer>,
}

/// The provider seam. The HTTP client is one implementation; tests script
/// another. Plan-limitation responses surface as empty results on every
/// endpoint, never as errors.
#[async_trait]
pub trait FootballApi: Send + Sync {
    async fn fixtures_by_date(
        &self,
        competition_id: i64,
        season: i32,
        day: NaiveDate,
    ) -> Result<Vec<ProviderFixture>, EngineError>;

    async fn fixtures_by_team(
        &self,
        team_external_id: i64,
        season: i32,
        competition_id: i64,
    ) -> Result<Vec<ProviderFixture>, EngineError>;

    async fn fixture_statistics(
        &self,
        fixture_external_id: i64,
        team_external_id: i64,
    ) -> Result<Option<FixtureTeamStats>, EngineError>;

    async fn fixture_by_id(
        &self,
        fixture_external_id: i64,
    ) -> Result<Option<ProviderFixture>, EngineError>;

    async fn players_by_team(
        &self,
        team_external_id: i64,
        season: i32,
        competition_id: i64,
    ) -> Result<Vec<ProviderPlayer>, EngineError>;

    async fn team_by_id(
        &self,
        team_external_id: i64,
    ) -> Result<Option<ProviderTeam>, EngineError>;

    async fn fixture_lineups(
        &self,
        fixture_external_id: i64,
    ) -> Result<Vec<LineupSheet>, EngineError>;
}
