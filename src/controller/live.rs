use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use sql_middleware::middleware::ConfigAndPool;
use tracing::{debug, warn};

use crate::error::EngineError;
use crate::model::{
    Fixture, Freshness, LiveResult, LiveScoreRow, MaxAge, STATUS_FULL_TIME, is_terminal_status,
    live_row, upsert_live_score,
};

use super::provider::FootballApi;

pub const LIVE_TTL_SECONDS: i64 = 90;
pub const PRE_MATCH_BUFFER_MINUTES: i64 = 15;

/// Upper bound on how long after kickoff a match can plausibly still be
/// running (full time, half time, stoppage, short delays).
pub const MATCH_WINDOW_MINUTES: i64 = 130;

/// Serves the near-real-time score for a fixture. State machine over time
/// relative to kickoff; a terminal cached status freezes the row forever.
///
/// # Errors
///
/// Will return `Err` if the store is unreachable
pub async fn get_live(
    provider: &Arc<dyn FootballApi>,
    config_and_pool: &ConfigAndPool,
    fixture: &Fixture,
    now: DateTime<Utc>,
) -> Result<LiveResult, EngineError> {
    let now_naive = now.naive_utc();
    let past_window = now_naive
        > fixture.kickoff_ts + Duration::minutes(MATCH_WINDOW_MINUTES);

    let cached = live_row(config_and_pool, fixture.fixture_id).await?;

    // A finished match's score never changes; infinite effective TTL. The
    // minutes field is blanked once the match window has elapsed so a stale
    // elapsed value is never shown against a final score.
    if let Some(row) = &cached
        && is_terminal_status(&row.status_short)
    {
        let mut result = LiveResult::from(row);
        if past_window {
            result.elapsed_minutes = None;
        }
        return Ok(result);
    }

    let until_kickoff = fixture.kickoff_ts.signed_duration_since(now_naive);
    if until_kickoff > Duration::minutes(PRE_MATCH_BUFFER_MINUTES) {
        return Ok(LiveResult::not_started());
    }
    if until_kickoff > Duration::zero() {
        return Ok(LiveResult::pre_match());
    }

    if !past_window {
        if let Some(row) = &cached
            && MaxAge(Duration::seconds(LIVE_TTL_SECONDS)).is_fresh(row.cached_ts, now_naive)
        {
            return Ok(LiveResult::from(row));
        }
        return match fetch_and_store(provider, config_and_pool, fixture, now_naive).await {
            Ok(Some(result)) => Ok(result),
            Ok(None) => Ok(cached
                .as_ref()
                .map(LiveResult::from)
                .unwrap_or_else(LiveResult::unknown)),
            Err(e) => {
                warn!(fixture = fixture.external_id, error = %e, "live fetch failed");
                Ok(cached
                    .as_ref()
                    .map(LiveResult::from)
                    .unwrap_or_else(LiveResult::unknown))
            }
        };
    }

    // Past the plausible window with a non-terminal (or no) cached status:
    // one more attempt at the true terminal result, then force full time so
    // stale in-progress minutes are never served indefinitely.
    let fetched = match fetch_and_store(provider, config_and_pool, fixture, now_naive).await {
        Ok(result) => result,
        Err(e) => {
            warn!(fixture = fixture.external_id, error = %e, "post-window live fetch failed");
            None
        }
    };
    if let Some(result) = &fetched
        && is_terminal_status(&result.status_short)
    {
        return Ok(result.clone());
    }

    let (home_goals, away_goals) = fetched
        .as_ref()
        .map(|r| (r.home_goals, r.away_goals))
        .or_else(|| cached.as_ref().map(|r| (r.home_goals, r.away_goals)))
        .unwrap_or((0, 0));
    let forced = LiveScoreRow {
        fixture_id: fixture.fixture_id,
        home_goals,
        away_goals,
        elapsed_minutes: None,
        status_short: STATUS_FULL_TIME.to_string(),
        cached_ts: now_naive,
    };
    debug!(
        fixture = fixture.external_id,
        "forcing terminal status past match window"
    );
    upsert_live_score(config_and_pool, &forced).await?;
    Ok(LiveResult::from(&forced))
}

/// One provider round trip; the result is written through the cache before
/// it is served. `None` means the provider had nothing for the fixture.
async fn fetch_and_store(
    provider: &Arc<dyn FootballApi>,
    config_and_pool: &ConfigAndPool,
    fixture: &Fixture,
    now_naive: chrono::NaiveDateTime,
) -> Result<Option<LiveResult>, EngineError> {
    let Some(remote) = provider.fixture_by_id(fixture.external_id).await? else {
        return Ok(None);
    };
    let row = LiveScoreRow {
        fixture_id: fixture.fixture_id,
        home_goals: remote.home_goals.unwrap_or(0),
        away_goals: remote.away_goals.unwrap_or(0),
        elapsed_minutes: remote.elapsed_minutes,
        status_short: remote.status_short.clone(),
        cached_ts: now_naive,
    };
    upsert_live_score(config_and_pool, &row).await?;
    Ok(Some(LiveResult::from(&row)))
}
