use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, NaiveDate, Utc};
use futures::FutureExt;
use futures::future::{BoxFuture, Shared, join_all};
use sql_middleware::middleware::ConfigAndPool;
use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::error::EngineError;
use crate::model::{
    Fixture, Freshness, SinceDayStart, clear_success_markers, fixtures_for_day, newest_success_ts,
    prune_fixtures_before, reference_day, reference_day_start_utc, season_for_day, upsert_fixture,
    upsert_team, write_marker,
};

use super::provider::FootballApi;

/// Competitions whose fixtures are mirrored every day.
pub const WARM_COMPETITIONS: &[i64] = &[39, 61, 78, 135, 140, 2];

type SharedRefresh = Shared<BoxFuture<'static, Result<Vec<Fixture>, EngineError>>>;

struct Flight {
    id: u64,
    fut: SharedRefresh,
}

/// Keyed in-flight-refresh registry. Concurrent callers for the same day
/// join one shared future instead of each hitting the provider. Entries are
/// id-stamped: only the caller that created a flight removes it, and only if
/// its own entry is still the one in the map.
pub struct FixtureFlights {
    next_id: AtomicU64,
    map: RwLock<HashMap<String, Flight>>,
}

impl FixtureFlights {
    #[must_use]
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(0),
            map: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for FixtureFlights {
    fn default() -> Self {
        Self::new()
    }
}

#[must_use]
pub fn fixtures_resource(day: NaiveDate) -> String {
    format!("fixtures:{}", day.format("%Y-%m-%d"))
}

/// Ensures today's fixture list is present and fresh, returning the stored
/// rows. Cache hit when rows exist and a success marker postdates the start
/// of the reference day; otherwise one shared refresh runs no matter how
/// many callers arrive.
///
/// # Errors
///
/// Will return `Err` if the store is unreachable or the refresh fails
/// without leaving any rows behind
pub async fn ensure_today(
    provider: &Arc<dyn FootballApi>,
    config_and_pool: &ConfigAndPool,
    flights: &FixtureFlights,
    now: DateTime<Utc>,
) -> Result<Vec<Fixture>, EngineError> {
    let day = reference_day(now);
    let resource = fixtures_resource(day);

    let existing = fixtures_for_day(config_and_pool, day).await?;
    if !existing.is_empty()
        && let Some(marker_ts) = newest_success_ts(config_and_pool, &resource).await?
        && SinceDayStart(reference_day_start_utc(day)).is_fresh(marker_ts, now.naive_utc())
    {
        return Ok(existing);
    }

    let (fut, created_id) = {
        let mut map = flights.map.write().await;
        if let Some(flight) = map.get(&resource) {
            (flight.fut.clone(), None)
        } else {
            let id = flights.next_id.fetch_add(1, Ordering::Relaxed);
            let fut = refresh_day(provider.clone(), config_and_pool.clone(), day, now)
                .boxed()
                .shared();
            map.insert(
                resource.clone(),
                Flight {
                    id,
                    fut: fut.clone(),
                },
            );
            (fut, Some(id))
        }
    };

    let result = fut.await;

    if let Some(id) = created_id {
        let mut map = flights.map.write().await;
        if map.get(&resource).is_some_and(|flight| flight.id == id) {
            map.remove(&resource);
        }
    }

    result
}

/// One full refresh of a day: fetch per competition, de-duplicate by
/// external id, upsert teams before the fixtures that reference them, write
/// the marker, re-read. Individual fixture failures are contained.
async fn refresh_day(
    provider: Arc<dyn FootballApi>,
    config_and_pool: ConfigAndPool,
    day: NaiveDate,
    now: DateTime<Utc>,
) -> Result<Vec<Fixture>, EngineError> {
    let season = season_for_day(day);

    let calls = WARM_COMPETITIONS.iter().map(|&competition_id| {
        let provider = provider.clone();
        async move {
            (
                competition_id,
                provider.fixtures_by_date(competition_id, season, day).await,
            )
        }
    });

    let mut fetched = HashMap::new();
    for (competition_id, outcome) in join_all(calls).await {
        match outcome {
            Ok(list) => {
                for fixture in list {
                    fetched.entry(fixture.external_id).or_insert(fixture);
                }
            }
            Err(e) => warn!(competition_id, error = %e, "fixtures-by-date call failed"),
        }
    }

    if let Err(e) = prune_fixtures_before(&config_and_pool, reference_day_start_utc(day)).await {
        warn!(error = %e, "pruning past fixtures failed");
    }

    for fixture in fetched.values() {
        // Home and away team rows carry no ordering dependency on each other.
        let (home, away) = tokio::join!(
            upsert_team(&config_and_pool, &fixture.home),
            upsert_team(&config_and_pool, &fixture.away)
        );
        match (home, away) {
            (Ok(home_team_id), Ok(away_team_id)) => {
                if let Err(e) =
                    upsert_fixture(&config_and_pool, fixture, home_team_id, away_team_id).await
                {
                    warn!(external_id = fixture.external_id, error = %e, "fixture upsert failed");
                }
            }
            (home, away) => {
                for err in [home.err(), away.err()].into_iter().flatten() {
                    warn!(external_id = fixture.external_id, error = %err, "team upsert failed");
                }
            }
        }
    }

    let resource = fixtures_resource(day);
    if fetched.is_empty() {
        // An empty day must not coast on an old success marker.
        clear_success_markers(&config_and_pool, &resource).await?;
        write_marker(&config_and_pool, &resource, false, now.naive_utc()).await?;
    } else {
        write_marker(&config_and_pool, &resource, true, now.naive_utc()).await?;
    }

    let rows = fixtures_for_day(&config_and_pool, day).await?;
    info!(day = %day, fixtures = rows.len(), "fixture day refreshed");
    Ok(rows)
}
