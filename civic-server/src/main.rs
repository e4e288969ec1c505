use anyhow::Context;
use axum::{
    routing::{get, post, put},
    Router,
};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use std::{net::SocketAddr, str::FromStr, time::Duration};
use structopt::StructOpt;
use tower_http::trace::TraceLayer;

mod db;
mod error;
mod extractors;
mod handlers;

use error::Error;
use extractors::*;

pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!();

#[derive(Debug, structopt::StructOpt)]
#[structopt(
    name = "civic-server",
    about = "HTTP server for civic issues and their comment threads"
)]
struct Opt {
    /// Address to listen on
    #[structopt(long, env = "LISTEN_ADDR", default_value = "127.0.0.1:3000")]
    listen: SocketAddr,

    /// SQLite database to use, created if missing
    #[structopt(long, env = "DATABASE_URL", default_value = "sqlite:civic.db?mode=rwc")]
    database_url: String,

    #[structopt(long, env = "DATABASE_MAX_CONNECTIONS", default_value = "8")]
    max_connections: u32,
}

async fn create_sqlx_pool(db_url: &str, max_connections: u32) -> anyhow::Result<sqlx::SqlitePool> {
    let options = SqliteConnectOptions::from_str(db_url)
        .with_context(|| format!("parsing database url {:?}", db_url))?
        .create_if_missing(true)
        .foreign_keys(true);
    // an in-memory database lives exactly as long as its connection
    let pool = SqlitePoolOptions::new()
        .max_connections(max_connections)
        .idle_timeout(None::<Duration>)
        .max_lifetime(None::<Duration>)
        .connect_with(options)
        .await
        .with_context(|| format!("Error opening database {:?}", db_url))?;
    Ok(pool)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let opt = Opt::from_args();

    let db = create_sqlx_pool(&opt.database_url, opt.max_connections).await?;
    MIGRATOR
        .run(&db)
        .await
        .context("running pending migrations")?;

    let app = app(db).await;

    tracing::info!("listening on {}", opt.listen);
    axum::Server::bind(&opt.listen)
        .serve(app.into_make_service())
        .await
        .context("serving axum webserver")
}

pub async fn app(db: sqlx::SqlitePool) -> Router {
    let state = AppState {
        db: DbPool::new(db),
    };
    Router::new()
        .route(
            "/api/users",
            get(handlers::fetch_users).post(handlers::create_user),
        )
        .route("/api/users/:id/issues", get(handlers::fetch_user_issues))
        .route(
            "/api/issues",
            get(handlers::fetch_issues).post(handlers::create_issue),
        )
        .route("/api/issues/:id", get(handlers::fetch_issue))
        .route("/api/issues/:id/status", put(handlers::set_status))
        .route("/api/issues/:id/upvote", post(handlers::toggle_upvote))
        .route(
            "/api/issues/:id/comments",
            get(handlers::fetch_comments).post(handlers::append_comment),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
