mod common;

use std::sync::Arc;
use std::sync::atomic::Ordering;

use chrono::{Duration, TimeZone, Utc};

use common::{ScriptedApi, lineup_sheet, provider_fixture, provider_team, seed_fixture, setup_test_context};
use matchday::controller::lineup::ensure_lineup;
use matchday::controller::provider::FootballApi;
use matchday::model::store_read::{lineup_count, lineup_entries};

fn scripted_lineups(api: &ScriptedApi) {
    *api.lineups.lock().unwrap() = vec![
        lineup_sheet(10, &[(501, "Saka"), (502, "Havertz")], &[(503, "Nketiah")]),
        lineup_sheet(11, &[(601, "Palmer"), (602, "Jackson")], &[(603, "Madueke")]),
    ];
}

#[tokio::test]
async fn test4_fetch_inside_window_then_never_again() -> Result<(), Box<dyn std::error::Error>> {
    let ctx = setup_test_context().await?;
    let api = Arc::new(ScriptedApi::new());
    scripted_lineups(&api);
    let provider: Arc<dyn FootballApi> = api.clone();

    let now = Utc.with_ymd_and_hms(2026, 3, 14, 14, 30, 0).unwrap();
    let fixture = seed_fixture(
        &ctx.config_and_pool,
        &provider_fixture(
            1001,
            (now + Duration::minutes(30)).naive_utc(),
            39,
            2025,
            "NS",
            provider_team(10, "Arsenal"),
            provider_team(11, "Chelsea"),
            None,
            None,
        ),
    )
    .await?;

    ensure_lineup(&provider, &ctx.config_and_pool, &fixture, now).await?;
    assert_eq!(api.fixture_lineups_calls.load(Ordering::SeqCst), 1);
    assert_eq!(lineup_count(&ctx.config_and_pool, fixture.fixture_id).await?, 6);

    let entries = lineup_entries(&ctx.config_and_pool, fixture.fixture_id).await?;
    assert_eq!(entries.len(), 6);
    assert_eq!(entries.iter().filter(|e| e.role == "starting").count(), 4);
    assert_eq!(entries.iter().filter(|e| e.role == "substitute").count(), 2);
    assert_eq!(
        entries.iter().filter(|e| e.team_id == fixture.home_team_id).count(),
        3
    );

    // Lineups are final once stored; later calls cost nothing.
    ensure_lineup(&provider, &ctx.config_and_pool, &fixture, now).await?;
    assert_eq!(api.fixture_lineups_calls.load(Ordering::SeqCst), 1);
    Ok(())
}

#[tokio::test]
async fn test4_outside_window_never_fetches() -> Result<(), Box<dyn std::error::Error>> {
    let ctx = setup_test_context().await?;
    let api = Arc::new(ScriptedApi::new());
    scripted_lineups(&api);
    let provider: Arc<dyn FootballApi> = api.clone();
    let now = Utc.with_ymd_and_hms(2026, 3, 14, 14, 30, 0).unwrap();

    // Two hours before kickoff: too early.
    let early = seed_fixture(
        &ctx.config_and_pool,
        &provider_fixture(
            1001,
            (now + Duration::hours(2)).naive_utc(),
            39,
            2025,
            "NS",
            provider_team(10, "Arsenal"),
            provider_team(11, "Chelsea"),
            None,
            None,
        ),
    )
    .await?;
    ensure_lineup(&provider, &ctx.config_and_pool, &early, now).await?;

    // Ten minutes after kickoff: too late, the window closed.
    let late = seed_fixture(
        &ctx.config_and_pool,
        &provider_fixture(
            1002,
            (now - Duration::minutes(10)).naive_utc(),
            39,
            2025,
            "1H",
            provider_team(12, "Liverpool"),
            provider_team(13, "Everton"),
            Some(0),
            Some(0),
        ),
    )
    .await?;
    ensure_lineup(&provider, &ctx.config_and_pool, &late, now).await?;

    assert_eq!(api.fixture_lineups_calls.load(Ordering::SeqCst), 0);
    assert_eq!(lineup_count(&ctx.config_and_pool, early.fixture_id).await?, 0);
    assert_eq!(lineup_count(&ctx.config_and_pool, late.fixture_id).await?, 0);
    Ok(())
}

#[tokio::test]
async fn test4_provider_failure_is_swallowed_and_retried()
-> Result<(), Box<dyn std::error::Error>> {
    let ctx = setup_test_context().await?;
    let api = Arc::new(ScriptedApi::new());
    // First call answers with no sheets at all.
    let provider: Arc<dyn FootballApi> = api.clone();
    let now = Utc.with_ymd_and_hms(2026, 3, 14, 14, 30, 0).unwrap();

    let fixture = seed_fixture(
        &ctx.config_and_pool,
        &provider_fixture(
            1001,
            (now + Duration::minutes(45)).naive_utc(),
            39,
            2025,
            "NS",
            provider_team(10, "Arsenal"),
            provider_team(11, "Chelsea"),
            None,
            None,
        ),
    )
    .await?;

    ensure_lineup(&provider, &ctx.config_and_pool, &fixture, now).await?;
    assert_eq!(api.fixture_lineups_calls.load(Ordering::SeqCst), 1);
    assert_eq!(lineup_count(&ctx.config_and_pool, fixture.fixture_id).await?, 0);

    // Sheets appear a little later, still inside the window.
    scripted_lineups(&api);
    let retry = now + Duration::minutes(10);
    ensure_lineup(&provider, &ctx.config_and_pool, &fixture, retry).await?;
    assert_eq!(api.fixture_lineups_calls.load(Ordering::SeqCst), 2);
    assert_eq!(lineup_count(&ctx.config_and_pool, fixture.fixture_id).await?, 6);
    Ok(())
}
