mod common;

use std::sync::Arc;
use std::sync::atomic::Ordering;

use chrono::{NaiveDate, NaiveDateTime, TimeZone, Utc};

use common::{
    ScriptedApi, lineup_sheet, player, provider_fixture, provider_team, setup_test_context,
};
use matchday::EngineError;
use matchday::controller::fixtures::FixtureFlights;
use matchday::controller::provider::{FixtureTeamStats, FootballApi};
use matchday::controller::stats_page::get_data_for_fixture_page;

const SEASON: i32 = 2025;
const COMPETITION: i64 = 39;

fn past_kickoff(day: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2025, 8, day)
        .unwrap()
        .and_hms_opt(15, 0, 0)
        .unwrap()
}

fn scripted_world(api: &ScriptedApi) {
    *api.day_fixtures.lock().unwrap() = vec![provider_fixture(
        1001,
        NaiveDate::from_ymd_opt(2026, 3, 14)
            .unwrap()
            .and_hms_opt(15, 0, 0)
            .unwrap(),
        COMPETITION,
        SEASON,
        "NS",
        provider_team(10, "Arsenal"),
        provider_team(11, "Chelsea"),
        None,
        None,
    )];

    let mut season = Vec::new();
    let mut stats = api.statistics.lock().unwrap();
    for n in 1..=2u32 {
        let external_id = 2000 + i64::from(n);
        season.push(provider_fixture(
            external_id,
            past_kickoff(n),
            COMPETITION,
            SEASON,
            "FT",
            provider_team(10, "Arsenal"),
            provider_team(11, "Chelsea"),
            Some(2),
            Some(0),
        ));
        stats.insert(
            external_id,
            FixtureTeamStats {
                corners: 4,
                yellow_cards: 2,
                red_cards: 0,
                expected_goals: Some(1.1),
            },
        );
    }
    drop(stats);
    *api.season_fixtures.lock().unwrap() = season;

    // Full team records live behind the teams endpoint; the fixture
    // payloads above embed only id and name.
    let mut teams = api.teams.lock().unwrap();
    for (id, name, crest) in [(10, "Arsenal", "ars.png"), (11, "Chelsea", "che.png")] {
        let mut team = provider_team(id, name);
        team.country = Some("England".to_string());
        team.crest_url = Some(format!("https://media.example/{crest}"));
        teams.insert(id, team);
    }
    drop(teams);

    *api.players.lock().unwrap() = vec![player(501, "Saka", 9, 1800), player(502, "Havertz", 12, 2000)];
    *api.lineups.lock().unwrap() = vec![
        lineup_sheet(10, &[(501, "Saka"), (502, "Havertz")], &[]),
        lineup_sheet(11, &[(601, "Palmer")], &[(602, "Jackson")]),
    ];
}

#[tokio::test]
async fn test7_page_composes_all_panels() -> Result<(), Box<dyn std::error::Error>> {
    let ctx = setup_test_context().await?;
    let api = Arc::new(ScriptedApi::new());
    scripted_world(&api);
    let provider: Arc<dyn FootballApi> = api.clone();
    let flights = FixtureFlights::new();
    // Ten minutes before kickoff: inside the lineup window and inside the
    // pre-match buffer.
    let now = Utc.with_ymd_and_hms(2026, 3, 14, 14, 50, 0).unwrap();

    let page =
        get_data_for_fixture_page(&provider, &ctx.config_and_pool, &flights, 1001, now).await?;

    assert_eq!(page.fixture.external_id, 1001);
    assert_eq!(page.home.team.name, "Arsenal");
    assert_eq!(page.away.team.name, "Chelsea");

    // The embedded fixture teams were sparse; both panels were backfilled
    // from the teams endpoint.
    assert_eq!(
        page.home.team.crest_url.as_deref(),
        Some("https://media.example/ars.png")
    );
    assert_eq!(page.home.team.country.as_deref(), Some("England"));
    assert_eq!(
        page.away.team.crest_url.as_deref(),
        Some("https://media.example/che.png")
    );
    assert_eq!(api.team_by_id_calls.load(Ordering::SeqCst), 2);

    // Two finished meetings fit well under the page budget, so both season
    // aggregates closed in-line.
    assert!(page.home.season_complete);
    assert!(page.away.season_complete);
    let home_stats = page.home.season_stats.as_ref().ok_or("home stats missing")?;
    assert_eq!(home_stats.goals_for, 4);
    assert_eq!(home_stats.goals_against, 0);
    assert_eq!(home_stats.corners, 8);
    let away_stats = page.away.season_stats.as_ref().ok_or("away stats missing")?;
    assert_eq!(away_stats.goals_for, 0);
    assert_eq!(away_stats.goals_against, 4);

    assert_eq!(page.home.recent_form.len(), 2);
    assert_eq!(page.home.top_players[0].player_name, "Havertz");

    assert_eq!(page.lineups.len(), 4);
    assert_eq!(page.live.status_short, "PRE");

    // Crest and country are stored now; a second page view asks the teams
    // endpoint nothing.
    let page =
        get_data_for_fixture_page(&provider, &ctx.config_and_pool, &flights, 1001, now).await?;
    assert_eq!(
        page.home.team.crest_url.as_deref(),
        Some("https://media.example/ars.png")
    );
    assert_eq!(api.team_by_id_calls.load(Ordering::SeqCst), 2);
    Ok(())
}

#[tokio::test]
async fn test7_unknown_fixture_is_not_found() -> Result<(), Box<dyn std::error::Error>> {
    let ctx = setup_test_context().await?;
    let api = Arc::new(ScriptedApi::new());
    scripted_world(&api);
    let provider: Arc<dyn FootballApi> = api.clone();
    let flights = FixtureFlights::new();
    let now = Utc.with_ymd_and_hms(2026, 3, 14, 14, 30, 0).unwrap();

    let err = get_data_for_fixture_page(&provider, &ctx.config_and_pool, &flights, 9999, now)
        .await
        .expect_err("missing fixture must not resolve");
    assert!(matches!(err, EngineError::NotFound(_)));
    Ok(())
}
