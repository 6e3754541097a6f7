use chrono::NaiveDateTime;
use sql_middleware::SqlMiddlewareDbError;
use sql_middleware::middleware::{AsyncDatabaseExecutor, ConfigAndPool, MiddlewarePool, RowValues};

/// Append-only idempotency ledger for data categories that have no more
/// specific cache entity. Rows are keyed by an opaque resource string such as
/// `fixtures:2026-08-26` or `teamSeason:42:2026:39`.
///
/// # Errors
///
/// Will return `Err` if the database query fails
pub async fn write_marker(
    config_and_pool: &ConfigAndPool,
    resource: &str,
    success: bool,
    now: NaiveDateTime,
) -> Result<(), SqlMiddlewareDbError> {
    let mut conn = MiddlewarePool::get_connection(&config_and_pool.pool).await?;
    conn.execute_dml(
        "INSERT INTO api_fetch_log (resource, success, ins_ts) VALUES (?1, ?2, ?3);",
        &[
            RowValues::Text(resource.to_string()),
            RowValues::Bool(success),
            RowValues::Timestamp(now),
        ],
    )
    .await?;
    Ok(())
}

/// # Errors
///
/// Will return `Err` if the database query fails
pub async fn newest_success_ts(
    config_and_pool: &ConfigAndPool,
    resource: &str,
) -> Result<Option<NaiveDateTime>, SqlMiddlewareDbError> {
    let mut conn = MiddlewarePool::get_connection(&config_and_pool.pool).await?;
    let res = conn
        .execute_select(
            "SELECT MAX(ins_ts) AS ins_ts FROM api_fetch_log WHERE resource = ?1 AND success = 1;",
            &[RowValues::Text(resource.to_string())],
        )
        .await?;
    Ok(res
        .results
        .first()
        .and_then(|row| row.get("ins_ts").and_then(|v| v.as_timestamp())))
}

/// Removes the success rows for a resource so the next freshness check
/// forces a refetch. Used when a refresh comes back empty and the existing
/// marker can no longer be trusted.
///
/// # Errors
///
/// Will return `Err` if the database query fails
pub async fn clear_success_markers(
    config_and_pool: &ConfigAndPool,
    resource: &str,
) -> Result<(), SqlMiddlewareDbError> {
    let mut conn = MiddlewarePool::get_connection(&config_and_pool.pool).await?;
    conn.execute_dml(
        "DELETE FROM api_fetch_log WHERE resource = ?1 AND success = 1;",
        &[RowValues::Text(resource.to_string())],
    )
    .await?;
    Ok(())
}
