use std::collections::HashMap;
use std::sync::Arc;

use actix_web::web::{self, Data};
use actix_web::{HttpResponse, Responder};
use chrono::Utc;
use serde_json::json;
use sql_middleware::middleware::ConfigAndPool;

use crate::error::EngineError;
use crate::view::fixtures::render_fixtures_table;

use super::fixtures::{FixtureFlights, ensure_today};
use super::live::get_live;
use super::provider::FootballApi;
use super::stats_page::get_data_for_fixture_page;
use super::warm::{DEFAULT_WARM_BUDGET, warm_today};

fn get_param_str<'a>(query: &'a HashMap<String, String>, key: &str) -> &'a str {
    query.get(key).map(String::as_str).unwrap_or("")
}

fn wants_json(query: &HashMap<String, String>) -> bool {
    match get_param_str(query, "json") {
        "1" => true,
        "0" => false,
        other => other.parse().unwrap_or(false),
    }
}

fn error_response(e: &EngineError) -> HttpResponse {
    match e {
        EngineError::NotFound(_) => HttpResponse::NotFound().json(json!({"error": e.to_string()})),
        _ => HttpResponse::InternalServerError().json(json!({"error": e.to_string()})),
    }
}

pub async fn fixtures(
    query: web::Query<HashMap<String, String>>,
    config_and_pool: Data<ConfigAndPool>,
    provider: Data<Arc<dyn FootballApi>>,
    flights: Data<FixtureFlights>,
) -> impl Responder {
    let result = ensure_today(
        provider.get_ref(),
        config_and_pool.get_ref(),
        flights.get_ref(),
        Utc::now(),
    )
    .await;

    match result {
        Ok(rows) => {
            if wants_json(&query) {
                HttpResponse::Ok().json(rows)
            } else {
                let markup = render_fixtures_table(&rows);
                HttpResponse::Ok()
                    .content_type("text/html")
                    .body(markup.into_string())
            }
        }
        Err(e) => error_response(&e),
    }
}

pub async fn fixture_stats(
    query: web::Query<HashMap<String, String>>,
    config_and_pool: Data<ConfigAndPool>,
    provider: Data<Arc<dyn FootballApi>>,
    flights: Data<FixtureFlights>,
) -> impl Responder {
    let Ok(fixture_external_id) = get_param_str(&query, "id").trim().parse::<i64>() else {
        return HttpResponse::BadRequest().json(json!({"error": "id parameter is required"}));
    };

    let result = get_data_for_fixture_page(
        provider.get_ref(),
        config_and_pool.get_ref(),
        flights.get_ref(),
        fixture_external_id,
        Utc::now(),
    )
    .await;

    match result {
        Ok(page) => HttpResponse::Ok().json(page),
        Err(e) => error_response(&e),
    }
}

pub async fn live(
    query: web::Query<HashMap<String, String>>,
    config_and_pool: Data<ConfigAndPool>,
    provider: Data<Arc<dyn FootballApi>>,
) -> impl Responder {
    let Ok(fixture_external_id) = get_param_str(&query, "id").trim().parse::<i64>() else {
        return HttpResponse::BadRequest().json(json!({"error": "id parameter is required"}));
    };

    let fixture =
        match crate::model::get_fixture_by_external(config_and_pool.get_ref(), fixture_external_id)
            .await
        {
            Ok(Some(fixture)) => fixture,
            Ok(None) => {
                return HttpResponse::NotFound()
                    .json(json!({"error": format!("fixture {fixture_external_id}")}));
            }
            Err(e) => return error_response(&EngineError::from(e)),
        };

    match get_live(
        provider.get_ref(),
        config_and_pool.get_ref(),
        &fixture,
        Utc::now(),
    )
    .await
    {
        Ok(result) => HttpResponse::Ok().json(result),
        Err(e) => error_response(&e),
    }
}

/// One warm chunk per request; the external driver loops on `done == false`.
pub async fn warm(
    query: web::Query<HashMap<String, String>>,
    config_and_pool: Data<ConfigAndPool>,
    provider: Data<Arc<dyn FootballApi>>,
    flights: Data<FixtureFlights>,
) -> impl Responder {
    let budget = get_param_str(&query, "budget")
        .parse::<u32>()
        .unwrap_or(DEFAULT_WARM_BUDGET);

    match warm_today(
        provider.get_ref(),
        config_and_pool.get_ref(),
        flights.get_ref(),
        Utc::now(),
        budget,
    )
    .await
    {
        Ok(report) => HttpResponse::Ok().json(report),
        Err(e) => error_response(&e),
    }
}
