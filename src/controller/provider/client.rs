use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate};
use serde_json::Value;
use tracing::warn;

use crate::error::EngineError;

use super::normalize::{int_at, opt_int_at, statistics_from_pairs, str_at};
use super::{
    FixtureTeamStats, FootballApi, LineupPlayer, LineupSheet, ProviderFixture, ProviderPlayer,
    ProviderTeam,
};

pub const API_BASE_URL: &str = "https://v3.football.api-sports.io";
pub const API_KEY_ENV: &str = "MATCHDAY_API_KEY";
const REQUEST_TIMEOUT_SECS: u64 = 10;

/// reqwest-backed provider client. Every endpoint returns the envelope's
/// `response` array; a non-empty `errors` field (the plan-limitation shape
/// included) is logged and mapped to an empty array, not a failure.
pub struct HttpFootballApi {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl HttpFootballApi {
    /// # Errors
    ///
    /// Will return `Err` if the API key env var is missing or the client
    /// cannot be built
    pub fn from_env() -> Result<Self, EngineError> {
        let api_key = std::env::var(API_KEY_ENV)
            .map_err(|_| EngineError::Config(format!("{API_KEY_ENV} is not set")))?;
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;
        Ok(Self {
            client,
            base_url: API_BASE_URL.to_string(),
            api_key,
        })
    }

    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    async fn get_envelope(
        &self,
        path: &str,
        params: &[(&str, String)],
    ) -> Result<Value, EngineError> {
        let url = format!("{}/{}", self.base_url, path);
        let resp = self
            .client
            .get(&url)
            .header("x-apisports-key", &self.api_key)
            .query(params)
            .send()
            .await?;
        let envelope: Value = resp.json().await?;
        Ok(envelope)
    }

    /// One page of an endpoint: the `response` array plus paging info.
    async fn get_page(
        &self,
        path: &str,
        params: &[(&str, String)],
    ) -> Result<(Vec<Value>, i64, i64), EngineError> {
        let envelope = self.get_envelope(path, params).await?;

        if has_provider_errors(&envelope) {
            warn!(
                path,
                errors = %envelope.get("errors").cloned().unwrap_or(serde_json::Value::Null),
                "provider reported errors; treating as empty result"
            );
            return Ok((Vec::new(), 1, 1));
        }

        let items = envelope
            .get("response")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();
        let current = opt_int_at(&envelope, &["paging", "current"]).unwrap_or(1);
        let total = opt_int_at(&envelope, &["paging", "total"]).unwrap_or(1);
        Ok((items, current, total))
    }

    async fn get_response(
        &self,
        path: &str,
        params: &[(&str, String)],
    ) -> Result<Vec<Value>, EngineError> {
        let (items, _, _) = self.get_page(path, params).await?;
        Ok(items)
    }
}

fn has_provider_errors(envelope: &Value) -> bool {
    match envelope.get("errors") {
        Some(Value::Object(map)) => !map.is_empty(),
        Some(Value::Array(arr)) => !arr.is_empty(),
        _ => false,
    }
}

fn parse_embedded_team(value: &Value) -> Option<ProviderTeam> {
    Some(ProviderTeam {
        external_id: opt_int_at(value, &["id"])?,
        name: str_at(value, &["name"]).unwrap_or_default().to_string(),
        short_name: str_at(value, &["code"]).map(ToString::to_string),
        country: str_at(value, &["country"]).map(ToString::to_string),
        crest_url: str_at(value, &["logo"]).map(ToString::to_string),
    })
}

fn parse_fixture(value: &Value) -> Option<ProviderFixture> {
    let external_id = opt_int_at(value, &["fixture", "id"])?;
    let kickoff = str_at(value, &["fixture", "date"])?;
    let kickoff_utc = DateTime::parse_from_rfc3339(kickoff).ok()?.naive_utc();
    let home = parse_embedded_team(value.get("teams")?.get("home")?)?;
    let away = parse_embedded_team(value.get("teams")?.get("away")?)?;
    Some(ProviderFixture {
        external_id,
        kickoff_utc,
        competition_id: int_at(value, &["league", "id"]),
        competition_name: str_at(value, &["league", "name"])
            .unwrap_or_default()
            .to_string(),
        season: i32::try_from(opt_int_at(value, &["league", "season"]).unwrap_or(0)).unwrap_or(0),
        status_short: str_at(value, &["fixture", "status", "short"])
            .unwrap_or("NS")
            .to_string(),
        elapsed_minutes: opt_int_at(value, &["fixture", "status", "elapsed"]),
        home,
        away,
        home_goals: opt_int_at(value, &["goals", "home"]),
        away_goals: opt_int_at(value, &["goals", "away"]),
    })
}

fn parse_player(value: &Value, competition_id: i64) -> Option<ProviderPlayer> {
    let external_id = opt_int_at(value, &["player", "id"])?;
    let name = str_at(value, &["player", "name"])?.to_string();

    let stats = value.get("statistics").and_then(Value::as_array)?;
    // Prefer the line for the requested competition; some plans only ship one.
    let line = stats
        .iter()
        .find(|s| opt_int_at(s, &["league", "id"]) == Some(competition_id))
        .or_else(|| stats.first())?;

    Some(ProviderPlayer {
        external_id,
        name,
        appearances: super::normalize::games_appearances(line.get("games").unwrap_or(&Value::Null)),
        minutes: int_at(line, &["games", "minutes"]),
        goals: int_at(line, &["goals", "total"]),
        assists: int_at(line, &["goals", "assists"]),
        fouls: int_at(line, &["fouls", "committed"]),
        shots: int_at(line, &["shots", "total"]),
        shots_on_target: int_at(line, &["shots", "on"]),
        tackles: int_at(line, &["tackles", "total"]),
        yellow_cards: int_at(line, &["cards", "yellow"]),
        red_cards: int_at(line, &["cards", "red"]),
    })
}

fn parse_lineup_players(value: Option<&Value>) -> Vec<LineupPlayer> {
    value
        .and_then(Value::as_array)
        .map(|entries| {
            entries
                .iter()
                .filter_map(|entry| {
                    Some(LineupPlayer {
                        external_id: opt_int_at(entry, &["player", "id"])?,
                        name: str_at(entry, &["player", "name"])?.to_string(),
                    })
                })
                .collect()
        })
        .unwrap_or_default()
}

#[async_trait]
impl FootballApi for HttpFootballApi {
    async fn fixtures_by_date(
        &self,
        competition_id: i64,
        season: i32,
        day: NaiveDate,
    ) -> Result<Vec<ProviderFixture>, EngineError> {
        let items = self
            .get_response(
                "fixtures",
                &[
                    ("league", competition_id.to_string()),
                    ("season", season.to_string()),
                    ("date", day.format("%Y-%m-%d").to_string()),
                ],
            )
            .await?;
        Ok(items.iter().filter_map(parse_fixture).collect())
    }

    async fn fixtures_by_team(
        &self,
        team_external_id: i64,
        season: i32,
        competition_id: i64,
    ) -> Result<Vec<ProviderFixture>, EngineError> {
        let items = self
            .get_response(
                "fixtures",
                &[
                    ("team", team_external_id.to_string()),
                    ("season", season.to_string()),
                    ("league", competition_id.to_string()),
                ],
            )
            .await?;
        Ok(items.iter().filter_map(parse_fixture).collect())
    }

    async fn fixture_statistics(
        &self,
        fixture_external_id: i64,
        team_external_id: i64,
    ) -> Result<Option<FixtureTeamStats>, EngineError> {
        let items = self
            .get_response(
                "fixtures/statistics",
                &[
                    ("fixture", fixture_external_id.to_string()),
                    ("team", team_external_id.to_string()),
                ],
            )
            .await?;
        let Some(entry) = items.first() else {
            return Ok(None);
        };
        let pairs = entry
            .get("statistics")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();
        Ok(Some(statistics_from_pairs(&pairs)))
    }

    async fn fixture_by_id(
        &self,
        fixture_external_id: i64,
    ) -> Result<Option<ProviderFixture>, EngineError> {
        let items = self
            .get_response("fixtures", &[("id", fixture_external_id.to_string())])
            .await?;
        Ok(items.first().and_then(parse_fixture))
    }

    async fn players_by_team(
        &self,
        team_external_id: i64,
        season: i32,
        competition_id: i64,
    ) -> Result<Vec<ProviderPlayer>, EngineError> {
        let mut players = Vec::new();
        let mut page = 1i64;
        loop {
            let (items, current, total) = self
                .get_page(
                    "players",
                    &[
                        ("team", team_external_id.to_string()),
                        ("season", season.to_string()),
                        ("league", competition_id.to_string()),
                        ("page", page.to_string()),
                    ],
                )
                .await?;
            players.extend(items.iter().filter_map(|v| parse_player(v, competition_id)));
            if current >= total || items.is_empty() {
                break;
            }
            page = current + 1;
        }
        Ok(players)
    }

    async fn team_by_id(
        &self,
        team_external_id: i64,
    ) -> Result<Option<ProviderTeam>, EngineError> {
        let items = self
            .get_response("teams", &[("id", team_external_id.to_string())])
            .await?;
        Ok(items
            .first()
            .and_then(|entry| entry.get("team"))
            .and_then(parse_embedded_team))
    }

    async fn fixture_lineups(
        &self,
        fixture_external_id: i64,
    ) -> Result<Vec<LineupSheet>, EngineError> {
        let items = self
            .get_response(
                "fixtures/lineups",
                &[("fixture", fixture_external_id.to_string())],
            )
            .await?;
        Ok(items
            .iter()
            .filter_map(|entry| {
                Some(LineupSheet {
                    team_external_id: opt_int_at(entry, &["team", "id"])?,
                    starting: parse_lineup_players(entry.get("startXI")),
                    substitutes: parse_lineup_players(entry.get("substitutes")),
                })
            })
            .collect())
    }
}
