//! TradePress — automation controller for the trading dashboard
//!
//! Usage:
//!   tradepress serve --port 3001        — Launch the admin JSON endpoint
//!   tradepress status                   — Print component status table
//!   tradepress start signals            — Flip a component to running

use axum::{
    extract::{rejection::JsonRejection, State},
    http::{header, HeaderMap},
    response::Json,
    routing::{get, post},
    Router,
};
use clap::{Parser, Subcommand};
use engine::{
    handle_request, AccessPolicy, AjaxResponse, AutomationController, AutomationError, Component,
    Scheduler, SqliteStore, StateStore, Toggle, ACTIONS,
};
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info, warn};

const APP_VERSION: &str = concat!(env!("CARGO_PKG_VERSION"), "-", env!("GIT_HASH"));

#[derive(Parser)]
#[command(name = "tradepress")]
#[command(about = "Automation controller for the TradePress trading dashboard", long_about = None)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// SQLite database path
    #[arg(long, global = true, env = "TRADEPRESS_DB_PATH", default_value = "data/tradepress.db")]
    db_path: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Launch the admin JSON endpoint and the iteration scheduler
    Serve {
        /// Host to bind to
        #[arg(long, default_value = "127.0.0.1")]
        host: String,
        /// Port to listen on
        #[arg(short, long, default_value_t = 3001)]
        port: u16,
        /// Seconds between scheduled iterations
        #[arg(long, default_value_t = 5)]
        interval_secs: u64,
        /// Bearer token granting the administrator role
        #[arg(long, env = "TRADEPRESS_API_TOKEN", hide_env_values = true)]
        api_token: String,
        /// Secret used to mint per-action nonces
        #[arg(long, env = "TRADEPRESS_NONCE_SECRET", hide_env_values = true)]
        nonce_secret: String,
    },
    /// Print the status of every component
    Status,
    /// Mark a component as running (a live server picks it up within one interval)
    Start { component: String },
    /// Mark a component as stopped
    Stop { component: String },
    /// Print data-import / scoring health and the overall score
    Health,
    /// Print the nonce for an action
    Nonce {
        action: String,
        #[arg(long, env = "TRADEPRESS_NONCE_SECRET", hide_env_values = true)]
        nonce_secret: String,
    },
}

#[derive(Clone)]
struct AppState {
    controller: AutomationController,
    policy: Arc<AccessPolicy>,
}

fn init_logging(verbose: bool) {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = if verbose {
        EnvFilter::new("debug,engine=debug,persistence=debug,tradepress=debug,sqlx=warn")
    } else {
        EnvFilter::new("info,engine=info,tradepress=info,sqlx=warn")
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).compact())
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Serve {
            host,
            port,
            interval_secs,
            api_token,
            nonce_secret,
        } => {
            if api_token.is_empty() || nonce_secret.is_empty() {
                anyhow::bail!("TRADEPRESS_API_TOKEN and TRADEPRESS_NONCE_SECRET must be non-empty");
            }
            let policy = AccessPolicy::new(api_token, nonce_secret);
            cmd_serve(&cli.db_path, &host, port, interval_secs, policy).await?;
        }
        Commands::Status => cmd_status(&cli.db_path).await?,
        Commands::Start { component } => cmd_toggle(&cli.db_path, &component, Toggle::Start).await?,
        Commands::Stop { component } => cmd_toggle(&cli.db_path, &component, Toggle::Stop).await?,
        Commands::Health => cmd_health(&cli.db_path).await?,
        Commands::Nonce {
            action,
            nonce_secret,
        } => cmd_nonce(&action, &nonce_secret)?,
    }

    Ok(())
}

async fn open_store(db_path: &str) -> anyhow::Result<Arc<dyn StateStore>> {
    let db = persistence::Database::new(db_path).await.map_err(|e| {
        error!("Failed to initialize database: {}", e);
        anyhow::anyhow!("Database initialization failed: {}", e)
    })?;
    info!("Database initialized: {}", db_path);
    Ok(Arc::new(SqliteStore::new(db.pool_clone())))
}

// ============================================================================
// Serve command — Axum web server
// ============================================================================

async fn cmd_serve(
    db_path: &str,
    host: &str,
    port: u16,
    interval_secs: u64,
    policy: AccessPolicy,
) -> anyhow::Result<()> {
    info!("TradePress v{} starting...", APP_VERSION);

    if interval_secs == 0 {
        anyhow::bail!("--interval-secs must be at least 1");
    }

    let store = open_store(db_path).await?;
    let scheduler = Arc::new(Scheduler::new(Duration::from_secs(interval_secs)));
    let controller = AutomationController::new(store).with_scheduler(scheduler.clone());
    controller.resume_running().await?;

    // Pick up components flipped to running by the CLI while we serve
    let reconcile = {
        let controller = controller.clone();
        let interval = Duration::from_secs(interval_secs);
        tokio::spawn(async move {
            loop {
                tokio::time::sleep(interval).await;
                if let Err(e) = controller.resume_running().await {
                    error!("Failed to resume running components: {}", e);
                }
            }
        })
    };

    let app = build_router(AppState {
        controller,
        policy: Arc::new(policy),
    });

    let addr: std::net::SocketAddr = format!("{}:{}", host, port).parse()?;
    println!("\n=== TradePress v{} ===", APP_VERSION);
    println!("Automation Controller");
    println!("Listening on http://{}", addr);
    println!("\nEndpoints:");
    println!("  GET  /api/health   - Liveness check");
    println!("  POST /api/ajax     - Authorized actions ({})", ACTIONS.join(", "));
    println!("\n  Database: {}", db_path);
    println!("  Iteration interval: {}s", interval_secs);
    println!("\nPress Ctrl+C to stop\n");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c().await.ok();
            info!("Ctrl+C received, shutting down...");
        })
        .await?;

    reconcile.abort();
    scheduler.shutdown();
    Ok(())
}

fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_routes = Router::new()
        .route("/health", get(api_health))
        .route("/ajax", post(api_ajax))
        .with_state(state);

    Router::new().nest("/api", api_routes).layer(cors)
}

/// GET /api/health
async fn api_health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "service": "tradepress",
        "version": APP_VERSION,
    }))
}

/// POST /api/ajax — single entry point for every dashboard action
async fn api_ajax(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<serde_json::Value>, JsonRejection>,
) -> Json<AjaxResponse> {
    // Unreadable bodies still get the envelope, not axum's plain-text rejection
    let body = match payload {
        Ok(Json(body)) => body,
        Err(rejection) => {
            warn!("Rejected request body: {}", rejection.body_text());
            return Json(AjaxResponse::from(AutomationError::InvalidAction(
                "malformed request".into(),
            )));
        }
    };

    let bearer = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));

    Json(handle_request(&state.controller, &state.policy, bearer, body).await)
}

// ============================================================================
// CLI commands
// ============================================================================

async fn cmd_status(db_path: &str) -> anyhow::Result<()> {
    let controller = AutomationController::new(open_store(db_path).await?);
    let statuses = controller.all_statuses().await?;

    println!(
        "\n  {:<12} {:<8} {:>10} {:>10} {:>7} {:>7}",
        "Component", "Status", "Runtime", "Iter", "Errors", "Health"
    );
    println!("  {}", "-".repeat(60));
    for s in &statuses {
        println!(
            "  {:<12} {:<8} {:>10} {:>10} {:>7} {:>7}",
            s.component.as_str(),
            s.status.as_str(),
            s.runtime,
            s.iterations,
            s.error_count,
            s.health_score,
        );
    }
    if controller.is_coordinated().await? {
        println!("\n  Process coordination: data_import and scoring both running");
    }
    Ok(())
}

async fn cmd_toggle(db_path: &str, component: &str, toggle: Toggle) -> anyhow::Result<()> {
    let component: Component = component.parse()?;
    let controller = AutomationController::new(open_store(db_path).await?);
    let state = controller.toggle(component, toggle).await?;
    println!("{} is now {}", component, state.status.as_str());
    Ok(())
}

async fn cmd_health(db_path: &str) -> anyhow::Result<()> {
    let controller = AutomationController::new(open_store(db_path).await?);

    for component in [Component::DataImport, Component::Scoring] {
        let snap = controller.health_snapshot(component).await?;
        println!(
            "  {:<12} score {:>3}  errors {:>2}  last_run {}",
            component.as_str(),
            snap.health_score,
            snap.errors.len(),
            if snap.last_run == 0 {
                "never".to_string()
            } else {
                chrono::DateTime::from_timestamp(snap.last_run, 0)
                    .map(|t| t.to_rfc3339())
                    .unwrap_or_else(|| snap.last_run.to_string())
            }
        );
    }

    let overall = controller.overall_health().await?;
    println!("\n  Overall: {} ({})", overall.score, overall.status.as_str());
    Ok(())
}

fn cmd_nonce(action: &str, nonce_secret: &str) -> anyhow::Result<()> {
    if !ACTIONS.contains(&action) {
        anyhow::bail!("Unknown action {:?}; expected one of {}", action, ACTIONS.join(", "));
    }
    println!("{}", engine::create_nonce(nonce_secret, action));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{Method, Request, StatusCode},
    };
    use engine::MemoryStore;
    use tower::ServiceExt;

    fn app() -> Router {
        build_router(AppState {
            controller: AutomationController::new(Arc::new(MemoryStore::new())),
            policy: Arc::new(AccessPolicy::new("admin-token", "secret")),
        })
    }

    async fn post_ajax(content_type: &str, body: &str) -> (StatusCode, AjaxResponse) {
        let request = Request::builder()
            .method(Method::POST)
            .uri("/api/ajax")
            .header(header::CONTENT_TYPE, content_type)
            .header(header::AUTHORIZATION, "Bearer admin-token")
            .body(Body::from(body.to_string()))
            .unwrap();

        let response = app().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_truncated_json_gets_error_envelope() {
        let (status, resp) =
            post_ajax("application/json", r#"{"action": "get_process_health""#).await;
        assert_eq!(status, StatusCode::OK);
        assert!(!resp.success);
        assert_eq!(resp.data["message"], "Invalid action: malformed request");
    }

    #[tokio::test]
    async fn test_form_body_gets_error_envelope() {
        let (status, resp) = post_ajax(
            "application/x-www-form-urlencoded",
            "action=get_process_health&nonce=abc",
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert!(!resp.success);
        assert_eq!(resp.data["message"], "Invalid action: malformed request");
    }

    #[tokio::test]
    async fn test_json_body_is_dispatched() {
        let policy = AccessPolicy::new("admin-token", "secret");
        let body = serde_json::json!({
            "action": "get_process_health",
            "nonce": policy.nonce_for("get_process_health"),
        });
        let (status, resp) = post_ajax("application/json", &body.to_string()).await;
        assert_eq!(status, StatusCode::OK);
        assert!(resp.success, "{:?}", resp.data);
        assert_eq!(resp.data["overall"]["score"], 60);
    }
}
