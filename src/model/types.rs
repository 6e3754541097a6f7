use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Short status codes after which a score can never change again.
pub const TERMINAL_STATUSES: &[&str] = &["FT", "AET", "PEN", "AWD", "WO", "CANC", "ABD"];

pub const STATUS_NOT_STARTED: &str = "NS";
pub const STATUS_PRE_MATCH: &str = "PRE";
pub const STATUS_FULL_TIME: &str = "FT";
pub const STATUS_UNKNOWN: &str = "TBD";

#[must_use]
pub fn is_terminal_status(status: &str) -> bool {
    TERMINAL_STATUSES.contains(&status)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Team {
    pub team_id: i64,
    pub external_id: i64,
    pub name: String,
    pub short_name: Option<String>,
    pub country: Option<String>,
    pub crest_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Fixture {
    pub fixture_id: i64,
    pub external_id: i64,
    pub kickoff_ts: NaiveDateTime,
    pub competition_id: i64,
    pub competition_name: String,
    pub season: i32,
    pub status_short: String,
    pub home_team_id: i64,
    pub away_team_id: i64,
}

/// One row per (team, season, competition); the season aggregate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TeamSeasonStats {
    pub team_id: i64,
    pub season: i32,
    pub competition_id: i64,
    pub minutes_played: i64,
    pub goals_for: i64,
    pub goals_against: i64,
    pub corners: i64,
    pub yellow_cards: i64,
    pub red_cards: i64,
    pub expected_goals: Option<f64>,
}

/// The per-fixture checkpoint row. Its presence means "statistics for this
/// fixture were already fetched"; resumed invocations skip it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TeamFixtureRow {
    pub team_id: i64,
    pub season: i32,
    pub competition_id: i64,
    pub external_fixture_id: i64,
    pub kickoff_ts: NaiveDateTime,
    pub goals_for: i64,
    pub goals_against: i64,
    pub corners: i64,
    pub yellow_cards: i64,
    pub red_cards: i64,
    pub expected_goals: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerSeasonLine {
    pub player_id: i64,
    pub team_id: i64,
    pub season: i32,
    pub competition_id: i64,
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

/// Reader-facing player line joined with the player's name.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NamedPlayerLine {
    pub player_name: String,
    pub appearances: i64,
    pub minutes: i64,
    pub goals: i64,
    pub assists: i64,
    pub yellow_cards: i64,
    pub red_cards: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LineupRole {
    Starting,
    Substitute,
}

impl LineupRole {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Starting => "starting",
            Self::Substitute => "substitute",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineupRow {
    pub fixture_id: i64,
    pub team_id: i64,
    pub player_id: i64,
    pub role: LineupRole,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineupEntry {
    pub team_id: i64,
    pub player_name: String,
    pub role: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LiveScoreRow {
    pub fixture_id: i64,
    pub home_goals: i64,
    pub away_goals: i64,
    pub elapsed_minutes: Option<i64>,
    pub status_short: String,
    pub cached_ts: NaiveDateTime,
}

/// What `get_live` serves to readers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LiveResult {
    pub home_goals: i64,
    pub away_goals: i64,
    pub elapsed_minutes: Option<i64>,
    pub status_short: String,
}

impl LiveResult {
    #[must_use]
    pub fn not_started() -> Self {
        Self {
            home_goals: 0,
            away_goals: 0,
            elapsed_minutes: None,
            status_short: STATUS_NOT_STARTED.to_string(),
        }
    }

    #[must_use]
    pub fn pre_match() -> Self {
        Self {
            home_goals: 0,
            away_goals: 0,
            elapsed_minutes: None,
            status_short: STATUS_PRE_MATCH.to_string(),
        }
    }

    #[must_use]
    pub fn unknown() -> Self {
        Self {
            home_goals: 0,
            away_goals: 0,
            elapsed_minutes: None,
            status_short: STATUS_UNKNOWN.to_string(),
        }
    }
}

impl From<&LiveScoreRow> for LiveResult {
    fn from(row: &LiveScoreRow) -> Self {
        Self {
            home_goals: row.home_goals,
            away_goals: row.away_goals,
            elapsed_minutes: row.elapsed_minutes,
            status_short: row.status_short.clone(),
        }
    }
}
