mod common;

use std::sync::Arc;
use std::sync::atomic::Ordering;

use chrono::{NaiveDate, NaiveDateTime, TimeZone, Utc};

use common::{ScriptedApi, provider_fixture, provider_team, setup_test_context};
use matchday::controller::provider::{FixtureTeamStats, FootballApi};
use matchday::controller::team_season::ensure_team_season;
use matchday::model::store_read::team_season_row;
use matchday::model::store_write::upsert_team;
use matchday::model::types::Team;
use sql_middleware::middleware::ConfigAndPool;

const SEASON: i32 = 2025;
const COMPETITION: i64 = 39;

fn kickoff(matchday_no: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2025, 8, matchday_no)
        .unwrap()
        .and_hms_opt(15, 0, 0)
        .unwrap()
}

fn scripted_season(api: &ScriptedApi, fixture_count: u32) {
    let mut fixtures = Vec::new();
    let mut stats = api.statistics.lock().unwrap();
    for n in 1..=fixture_count {
        let external_id = 2000 + i64::from(n);
        fixtures.push(provider_fixture(
            external_id,
            kickoff(n),
            COMPETITION,
            SEASON,
            "FT",
            provider_team(10, "Arsenal"),
            provider_team(100 + i64::from(n), "Opponent"),
            Some(2),
            Some(1),
        ));
        stats.insert(
            external_id,
            FixtureTeamStats {
                corners: 2,
                yellow_cards: 1,
                red_cards: 0,
                expected_goals: Some(0.5),
            },
        );
    }
    drop(stats);
    *api.season_fixtures.lock().unwrap() = fixtures;
}

async fn seed_team(config_and_pool: &ConfigAndPool) -> Result<Team, Box<dyn std::error::Error>> {
    let team_id = upsert_team(config_and_pool, &provider_team(10, "Arsenal")).await?;
    Ok(Team {
        team_id,
        external_id: 10,
        name: "Arsenal".to_string(),
        short_name: None,
        country: None,
        crest_url: None,
    })
}

#[tokio::test]
async fn test2_budget_resumes_across_invocations() -> Result<(), Box<dyn std::error::Error>> {
    let ctx = setup_test_context().await?;
    let api = Arc::new(ScriptedApi::new());
    scripted_season(&api, 10);
    let provider: Arc<dyn FootballApi> = api.clone();
    let team = seed_team(&ctx.config_and_pool).await?;
    let now = Utc.with_ymd_and_hms(2026, 3, 14, 12, 0, 0).unwrap();

    // Three capped invocations cover nine fixtures, the fourth finishes.
    for _ in 0..3 {
        let progress = ensure_team_season(
            &provider,
            &ctx.config_and_pool,
            &team,
            SEASON,
            COMPETITION,
            Some(3),
            now,
        )
        .await?;
        assert!(!progress.done);
        assert_eq!(progress.calls_used, 3);
    }
    let progress = ensure_team_season(
        &provider,
        &ctx.config_and_pool,
        &team,
        SEASON,
        COMPETITION,
        Some(3),
        now,
    )
    .await?;
    assert!(progress.done);
    assert_eq!(progress.calls_used, 1);

    // Each fixture cost exactly one statistics call overall; the cheap bulk
    // listing ran once per invocation and never counted against the budget.
    assert_eq!(api.fixture_statistics_calls.load(Ordering::SeqCst), 10);
    assert_eq!(api.fixtures_by_team_calls.load(Ordering::SeqCst), 4);

    let row = team_season_row(&ctx.config_and_pool, team.team_id, SEASON, COMPETITION)
        .await?
        .ok_or("aggregate row missing")?;
    assert_eq!(row.minutes_played, 900);
    assert_eq!(row.goals_for, 20);
    assert_eq!(row.goals_against, 10);
    assert_eq!(row.corners, 20);
    assert_eq!(row.yellow_cards, 10);
    assert_eq!(row.red_cards, 0);
    let xg = row.expected_goals.ok_or("expected goals missing")?;
    assert!((xg - 5.0).abs() < 1e-9);

    // Same-day marker: the next invocation touches nothing.
    let progress = ensure_team_season(
        &provider,
        &ctx.config_and_pool,
        &team,
        SEASON,
        COMPETITION,
        Some(3),
        now,
    )
    .await?;
    assert!(progress.done);
    assert_eq!(progress.calls_used, 0);
    assert_eq!(api.fixtures_by_team_calls.load(Ordering::SeqCst), 4);
    Ok(())
}

#[tokio::test]
async fn test2_failed_statistics_call_is_retried_next_time()
-> Result<(), Box<dyn std::error::Error>> {
    let ctx = setup_test_context().await?;
    let api = Arc::new(ScriptedApi::new());
    scripted_season(&api, 6);
    api.failing_statistics.lock().unwrap().insert(2003);
    let provider: Arc<dyn FootballApi> = api.clone();
    let team = seed_team(&ctx.config_and_pool).await?;
    let now = Utc.with_ymd_and_hms(2026, 3, 14, 12, 0, 0).unwrap();

    let progress = ensure_team_season(
        &provider,
        &ctx.config_and_pool,
        &team,
        SEASON,
        COMPETITION,
        None,
        now,
    )
    .await?;
    // The failed fixture left no checkpoint, so the invocation cannot close.
    assert!(!progress.done);
    assert_eq!(progress.calls_used, 6);

    let progress = ensure_team_season(
        &provider,
        &ctx.config_and_pool,
        &team,
        SEASON,
        COMPETITION,
        None,
        now,
    )
    .await?;
    assert!(progress.done);
    assert_eq!(progress.calls_used, 1);
    assert_eq!(api.fixture_statistics_calls.load(Ordering::SeqCst), 7);
    Ok(())
}

#[tokio::test]
async fn test2_no_finished_fixtures_is_a_clean_done() -> Result<(), Box<dyn std::error::Error>> {
    let ctx = setup_test_context().await?;
    let api = Arc::new(ScriptedApi::new());
    // One scheduled fixture only; nothing terminal to aggregate.
    *api.season_fixtures.lock().unwrap() = vec![provider_fixture(
        2999,
        kickoff(20),
        COMPETITION,
        SEASON,
        "NS",
        provider_team(10, "Arsenal"),
        provider_team(11, "Chelsea"),
        None,
        None,
    )];
    let provider: Arc<dyn FootballApi> = api.clone();
    let team = seed_team(&ctx.config_and_pool).await?;
    let now = Utc.with_ymd_and_hms(2025, 8, 1, 12, 0, 0).unwrap();

    let progress = ensure_team_season(
        &provider,
        &ctx.config_and_pool,
        &team,
        SEASON,
        COMPETITION,
        Some(3),
        now,
    )
    .await?;
    assert!(progress.done);
    assert_eq!(progress.calls_used, 0);
    assert_eq!(api.fixture_statistics_calls.load(Ordering::SeqCst), 0);
    assert!(
        team_season_row(&ctx.config_and_pool, team.team_id, SEASON, COMPETITION)
            .await?
            .is_none()
    );
    Ok(())
}
