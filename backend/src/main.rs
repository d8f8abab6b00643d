use axum::{
    Router,
    routing::{get, post},
    middleware as axum_middleware,
};
use anyhow::Context;
use dotenvy as dotenv;
use sqlx::postgres::PgPoolOptions;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod api;
mod classifier;
mod config;
mod db;
mod error;
mod geocode;
mod middleware;
mod points;
mod rewards;
mod ws;

use classifier::GeminiClient;
use config::Config;
use db::Store;
use geocode::NominatimClient;
use middleware::{RateLimitLayer, RateLimiterBackend};
use rewards::RewardsManager;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // trying multiple .env locations since working directory differs between dev and prod
    let _ = dotenv::from_filename_override(".env");
    let _ = dotenv::from_filename_override(concat!(env!("CARGO_MANIFEST_DIR"), "/.env"));
    let _ = dotenv::dotenv_override();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,waste_rewards_backend=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Waste Rewards backend");

    tracing::info!("Loading configuration from environment");
    let config = Config::from_env().context("error with configuration")?;
    tracing::info!("Configuration loaded successfully");

    let store = match config.database_url.as_deref() {
        Some(database_url) => {
            tracing::info!("Connecting to database...");
            let db_pool = PgPoolOptions::new()
                .max_connections(config.database_max_connections)
                .connect(database_url)
                .await
                .context("Failed to connect to database")?;

            sqlx::migrate!("./migrations")
                .run(&db_pool)
                .await
                .context("Failed to run database migrations")?;

            tracing::info!("Database connected successfully");
            Store::postgres(db_pool)
        }
        None => {
            tracing::warn!("DATABASE_URL not set, keeping everything in memory");
            Store::memory()
        }
    };

    if config.seed_demo_tasks {
        db::seed::seed_demo_tasks(&store, config.demo_task_count)
            .await
            .context("Failed to seed collection tasks")?;
    }

    let classifier = GeminiClient::new(&config).context("Failed to initialize Gemini client")?;
    if !classifier.is_configured() {
        tracing::warn!("GEMINI_API_KEY not set, image classification will be unavailable");
    }
    let geocoder = NominatimClient::new(&config).context("Failed to initialize geocoder")?;

    let rewards = Arc::new(RewardsManager::new(store, classifier));

    tracing::info!("Initializing rate limiting...");
    let limiter_backend = RateLimiterBackend::connect(config.redis_url.as_deref()).await;
    tracing::info!("Rate limiting initialized ({} backend)", limiter_backend.name());

    let bind_host: IpAddr = config
        .host
        .parse()
        .with_context(|| format!("HOST is not an IP address: {}", config.host))?;
    let start_port = config.port;

    let app_state = Arc::new(AppState {
        rewards,
        geocoder,
        config,
    });

    let app = build_router(app_state, limiter_backend);

    // in case the configured port is taken, try a few more before giving up
    let mut port = start_port;
    let mut listener = None;

    for _ in 0..10u16 {
        let addr = SocketAddr::new(bind_host, port);
        match tokio::net::TcpListener::bind(&addr).await {
            Ok(l) => {
                listener = Some((addr, l));
                break;
            }
            Err(e) => {
                tracing::warn!("Failed to bind to {}: {} (trying next port)", addr, e);
                port = port.saturating_add(1);
            }
        }
    }

    let (addr, listener) = listener.ok_or_else(|| anyhow::anyhow!(
        "Failed to bind to any port in range {}..{}",
        start_port,
        start_port.saturating_add(9)
    ))?;

    tracing::info!("Listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}

fn build_router(app_state: Arc<AppState>, limiter_backend: RateLimiterBackend) -> Router {
    let principal_header = app_state.config.auth_email_header.clone();

    let rate_limit_read = Arc::new(RateLimitLayer::read_heavy(limiter_backend.clone(), &principal_header));
    let rate_limit_write = Arc::new(RateLimitLayer::write_heavy(limiter_backend.clone(), &principal_header));
    let rate_limit_expensive = Arc::new(RateLimitLayer::expensive(limiter_backend, &principal_header));

    // the user lookup runs after the limiter so floods never reach the store
    let auth = || axum_middleware::from_fn_with_state(app_state.clone(), middleware::require_user);

    // every route here calls the model
    let expensive_routes = Router::new()
        .route("/report/classify", post(api::report::classify_image))
        .route("/collect/tasks/:id/verify", post(api::collect::verify_collection))
        .route("/verify", post(api::verify::verify_image))
        .route_layer(auth())
        .route_layer({
            let limiter = rate_limit_expensive.clone();
            axum_middleware::from_fn(move |headers, req, next| {
                let limiter = limiter.clone();
                async move { limiter.middleware(headers, req, next).await }
            })
        });

    let write_routes = Router::new()
        .route("/report", post(api::report::create_report))
        .route("/collect/tasks/:id/claim", post(api::collect::claim_task))
        .route("/rewards/redeem", post(api::rewards::redeem))
        .route("/settings/notifications/:id/read", post(api::settings::mark_notification_read))
        .route_layer(auth())
        .route_layer({
            let limiter = rate_limit_write.clone();
            axum_middleware::from_fn(move |headers, req, next| {
                let limiter = limiter.clone();
                async move { limiter.middleware(headers, req, next).await }
            })
        });

    // the websocket pushes on its own schedule, only the upgrade is counted
    let read_routes = Router::new()
        .route("/report/recent", get(api::report::recent_reports))
        .route("/report/locations", get(api::report::search_locations))
        .route("/collect/tasks", get(api::collect::list_tasks))
        .route("/rewards", get(api::rewards::get_summary))
        .route("/rewards/catalog", get(api::rewards::get_catalog))
        .route("/leaderboard", get(api::leaderboard::get_leaderboard))
        .route("/leaderboard/live", get(ws::handler::leaderboard_live))
        .route("/settings", get(api::settings::get_settings))
        .route("/settings/notifications", get(api::settings::get_notifications))
        .route_layer(auth())
        .route_layer({
            let limiter = rate_limit_read.clone();
            axum_middleware::from_fn(move |headers, req, next| {
                let limiter = limiter.clone();
                async move { limiter.middleware(headers, req, next).await }
            })
        });

    Router::new()
        .route("/health", get(api::health::health_check))
        .route("/config/public", get(api::health::public_config))
        .route("/impact", get(api::health::get_impact))
        .merge(expensive_routes)
        .merge(write_routes)
        .merge(read_routes)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(app_state)
}

pub struct AppState {
    pub rewards: Arc<RewardsManager>,
    pub geocoder: NominatimClient,
    pub config: Config,
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{header, Method, Request, StatusCode};
    use tower::ServiceExt;

    fn test_router() -> Router {
        let config = Config::for_tests();
        let rewards = RewardsManager::new(Store::memory(), GeminiClient::new(&config).unwrap());
        let state = Arc::new(AppState {
            rewards: Arc::new(rewards),
            geocoder: NominatimClient::new(&config).unwrap(),
            config,
        });
        build_router(state, RateLimiterBackend::memory())
    }

    fn protected_routes() -> Vec<(Method, &'static str)> {
        vec![
            (Method::POST, "/report/classify"),
            (Method::POST, "/report"),
            (Method::GET, "/report/recent"),
            (Method::GET, "/report/locations?q=Berlin"),
            (Method::GET, "/collect/tasks"),
            (Method::POST, "/collect/tasks/1/claim"),
            (Method::POST, "/collect/tasks/1/verify"),
            (Method::POST, "/verify"),
            (Method::GET, "/rewards"),
            (Method::GET, "/rewards/catalog"),
            (Method::POST, "/rewards/redeem"),
            (Method::GET, "/leaderboard"),
            (Method::GET, "/leaderboard/live"),
            (Method::GET, "/settings"),
            (Method::GET, "/settings/notifications"),
            (Method::POST, "/settings/notifications/1/read"),
        ]
    }

    #[tokio::test]
    async fn protected_routes_reject_anonymous_api_calls() {
        let app = test_router();

        for (method, uri) in protected_routes() {
            let request = Request::builder()
                .method(method.clone())
                .uri(uri)
                .header(header::ACCEPT, "application/json")
                .body(Body::empty())
                .unwrap();
            let response = app.clone().oneshot(request).await.unwrap();
            assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "{method} {uri}");
        }
    }

    #[tokio::test]
    async fn protected_routes_redirect_browsers() {
        let app = test_router();

        for (method, uri) in protected_routes() {
            let request = Request::builder()
                .method(method.clone())
                .uri(uri)
                .header(header::ACCEPT, "text/html")
                .body(Body::empty())
                .unwrap();
            let response = app.clone().oneshot(request).await.unwrap();
            assert_eq!(response.status(), StatusCode::SEE_OTHER, "{method} {uri}");

            let location = response.headers()[header::LOCATION].to_str().unwrap();
            assert!(location.starts_with("/api/auth/login?returnTo="), "{location}");
        }
    }

    #[tokio::test]
    async fn protected_routes_carry_rate_limit_headers() {
        let app = test_router();

        let request = Request::builder()
            .uri("/leaderboard/live")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert!(response.headers().contains_key("x-ratelimit-limit"));
    }

    #[tokio::test]
    async fn public_routes_need_no_identity() {
        let app = test_router();

        for uri in ["/health", "/config/public", "/impact"] {
            let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
            let response = app.clone().oneshot(request).await.unwrap();
            assert_eq!(response.status(), StatusCode::OK, "{uri}");
        }
    }

    #[tokio::test]
    async fn identified_caller_reaches_the_handler() {
        let app = test_router();

        let request = Request::builder()
            .uri("/rewards")
            .header("x-auth-email", "fay@example.com")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
