mod app_state;
mod audit;
mod models;
mod repo;
mod routes;

use crate::app_state::AppState;
use crate::audit::{
    AuditLogger, CompositeLogger, DbAuditSink, HttpMetricsClient, MetricsAuditSink, RequestContext,
};
use crate::repo::db::{setup_database, Db};
use anyhow::{Context, Result};
use clap::Parser;
use log::info;
use std::sync::Arc;

#[macro_use]
extern crate rocket;

#[derive(Parser)]
#[command(name = "geav-api")]
#[command(about = "CRUD backend for the GEAV scouting group website", long_about = None)]
struct Cli {
    #[arg(long = "db-file", default_value = "geav.db", env = "DB_FILE")]
    db_file: String,

    #[arg(long = "service-name", default_value = "geav-api", env = "SERVICE_NAME")]
    service_name: String,

    #[arg(long = "audit-table", default_value = "api_logs", env = "AUDIT_TABLE")]
    audit_table: String,

    #[arg(
        long = "metrics-namespace",
        default_value = "Geav/Api",
        env = "METRICS_NAMESPACE"
    )]
    metrics_namespace: String,

    #[arg(
        long = "metrics-endpoint",
        default_value = "http://127.0.0.1:9091/metrics",
        env = "METRICS_ENDPOINT"
    )]
    metrics_endpoint: String,

    #[arg(long = "log-level", default_value = "info", env = "LOG_LEVEL")]
    log_level: String,
}

fn build_audit_logger(args: &Cli, db: Db) -> Result<Arc<dyn AuditLogger>> {
    let metrics_client = HttpMetricsClient::new(&args.metrics_endpoint)
        .context("failed to build metrics client")?;

    let logger = CompositeLogger::new(vec![
        Box::new(MetricsAuditSink::new(
            Box::new(metrics_client),
            &args.service_name,
            &args.metrics_namespace,
        )),
        Box::new(DbAuditSink::new(
            db,
            &args.service_name,
            &args.audit_table,
        )),
    ]);
    Ok(Arc::new(logger))
}

fn build_rocket(args: &Cli) -> Result<rocket::Rocket<rocket::Build>> {
    let db = Db::connect(&args.db_file).context("failed to open database")?;
    setup_database(&db).context("failed to set up database schema")?;

    let audit = build_audit_logger(args, db.clone())?;
    audit.info(
        &RequestContext::empty(),
        "Service starting",
        None,
    );

    let state = AppState::new(db, audit);

    Ok(rocket::build().manage(state).mount(
        "/",
        routes![
            routes::users::list_users,
            routes::users::get_user,
            routes::users::create_user,
            routes::users::update_user,
            routes::users::delete_user,
            routes::lugares::list_lugares,
            routes::lugares::get_lugar,
            routes::lugares::create_lugar,
            routes::lugares::update_lugar,
            routes::lugares::delete_lugar,
            routes::lugares::add_image,
            routes::lugares::delete_image,
            routes::lugares::add_tag,
            routes::lugares::remove_tag,
            routes::lugares::add_ramo,
            routes::lugares::remove_ramo,
            routes::lugares::get_ratings,
            routes::lugares::add_rating,
            routes::lugares::update_rating,
            routes::lugares::delete_rating,
            routes::cancoes::list_cancoes,
            routes::cancoes::get_cancao,
            routes::cancoes::create_cancao,
            routes::cancoes::update_cancao,
            routes::cancoes::delete_cancao,
            routes::cancoes::add_tag,
            routes::cancoes::remove_tag,
            routes::cancoes::add_ramo,
            routes::cancoes::remove_ramo,
            routes::tags::list_lugar_tags,
            routes::tags::list_cancao_tags,
            routes::tags::create_lugar_tag,
            routes::tags::create_cancao_tag,
            routes::tags::delete_lugar_tag,
            routes::tags::delete_cancao_tag,
            routes::ramos::list_ramos,
            routes::ramos::create_ramo,
            routes::ramos::delete_ramo,
        ],
    ))
}

#[rocket::main]
async fn main() -> Result<()> {
    let args = Cli::parse();

    let log_level = match args.log_level.to_lowercase().as_str() {
        "trace" => log::LevelFilter::Trace,
        "debug" => log::LevelFilter::Debug,
        "info" => log::LevelFilter::Info,
        "warn" => log::LevelFilter::Warn,
        "error" => log::LevelFilter::Error,
        _ => log::LevelFilter::Info,
    };
    env_logger::Builder::from_default_env()
        .filter_level(log_level)
        .format_timestamp_secs()
        .init();

    info!("Starting {} with database {}", args.service_name, args.db_file);

    build_rocket(&args)?.launch().await?;
    Ok(())
}
