use deadpool_postgres::{ManagerConfig, RecyclingMethod};
use matchday::args;
use matchday::controller::fixtures::FixtureFlights;
use matchday::controller::http_handlers::{fixture_stats, fixtures, live, warm};
use matchday::controller::provider::client::HttpFootballApi;
use matchday::controller::provider::FootballApi;
use sql_middleware::middleware::{AsyncDatabaseExecutor, ConfigAndPool, DatabaseType, MiddlewarePool};

use actix_files::Files;
use actix_web::web::Data;
use actix_web::{web, App, HttpResponse, HttpServer, Responder};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

const SCHEMA_SQL: &[&str] = &[
    include_str!("sql/schema/sqlite/01_team.sql"),
    include_str!("sql/schema/sqlite/02_fixture.sql"),
    include_str!("sql/schema/sqlite/03_team_season_stats.sql"),
    include_str!("sql/schema/sqlite/04_team_fixture_cache.sql"),
    include_str!("sql/schema/sqlite/05_player.sql"),
    include_str!("sql/schema/sqlite/06_player_season_stats.sql"),
    include_str!("sql/schema/sqlite/07_fixture_lineup.sql"),
    include_str!("sql/schema/sqlite/08_live_score_cache.sql"),
    include_str!("sql/schema/sqlite/09_api_fetch_log.sql"),
];

#[actix_web::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = args::args_checks()?;

    let config_and_pool = if args.db_type == DatabaseType::Postgres {
        let mut postgres_config = deadpool_postgres::Config::new();
        postgres_config.dbname = Some(args.db_name.clone());
        postgres_config.host = args.db_host.clone();
        postgres_config.port = args.db_port;
        postgres_config.user = args.db_user.clone();
        postgres_config.password = args.db_password.clone();
        postgres_config.manager = Some(ManagerConfig {
            recycling_method: RecyclingMethod::Fast,
        });
        ConfigAndPool::new_postgres(postgres_config).await?
    } else {
        ConfigAndPool::new_sqlite(args.db_name.clone()).await?
    };

    {
        let mut conn = MiddlewarePool::get_connection(&config_and_pool.pool).await?;
        for ddl in SCHEMA_SQL {
            conn.execute_batch(ddl).await?;
        }
        if args.db_startup_script.is_some() {
            conn.execute_batch(&args.combined_sql_script).await?;
        }
    }

    let provider: Arc<dyn FootballApi> = Arc::new(HttpFootballApi::from_env()?);
    let flights = Data::new(FixtureFlights::new());

    HttpServer::new(move || {
        App::new()
            .app_data(Data::new(config_and_pool.clone()))
            .app_data(Data::new(provider.clone()))
            .app_data(flights.clone())
            .route("/", web::get().to(index))
            .route("/fixtures", web::get().to(fixtures))
            .route("/fixture", web::get().to(fixture_stats))
            .route("/live", web::get().to(live))
            .route("/warm", web::get().to(warm))
            .route("/health", web::get().to(HttpResponse::Ok))
            .service(Files::new("/static", "./static").show_files_listing())
    })
    .bind("0.0.0.0:8081")?
    .run()
    .await?;
    Ok(())
}

async fn index() -> impl Responder {
    let markup = matchday::view::index::render_index_template("Matchday");
    HttpResponse::Ok()
        .content_type("text/html")
        .body(markup.into_string())
}
