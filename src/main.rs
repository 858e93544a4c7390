use axum::Router;
use clap::Parser;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use payrail::config::Config;
use payrail::db::{create_pool, init_db, queries, AppState};
use payrail::gateway::MidtransClient;
use payrail::handlers;
use payrail::models::CreatePackage;

#[derive(Parser, Debug)]
#[command(name = "payrail")]
#[command(about = "Payment reconciliation service for subscription checkout")]
struct Cli {
    /// Seed the database with dev packages
    #[arg(long)]
    seed: bool,

    /// Delete the database on exit (dev mode only, useful for fresh starts)
    #[arg(long)]
    ephemeral: bool,
}

/// Seeds the database with dev packages for testing.
/// Only runs in dev mode and when the database is empty.
fn seed_dev_data(state: &AppState) {
    let conn = state.db.get().expect("Failed to get db connection for seeding");

    let count = queries::count_packages(&conn).expect("Failed to count packages");
    if count > 0 {
        tracing::info!("Database already has data, skipping seed");
        return;
    }

    tracing::info!("============================================");
    tracing::info!("SEEDING DEV PACKAGES");
    tracing::info!("============================================");

    let tiers = serde_json::json!({
        "monthly": {
            "USD": { "regular_price": 2900 },
            "IDR": { "regular_price": 450_000, "promo_price": 399_000 }
        },
        "annually": {
            "USD": { "regular_price": 29_000 },
            "IDR": { "regular_price": 4_500_000 }
        }
    })
    .to_string();

    let pro = queries::create_package(
        &conn,
        &CreatePackage {
            name: "professional".to_string(),
            active: true,
            base_price_cents: 2900,
            pricing_tiers: Some(tiers),
        },
    )
    .expect("Failed to create dev package");

    let starter = queries::create_package(
        &conn,
        &CreatePackage {
            name: "starter".to_string(),
            active: true,
            base_price_cents: 900,
            pricing_tiers: None,
        },
    )
    .expect("Failed to create dev package");

    tracing::info!("Package: {} (id: {})", pro.name, pro.id);
    tracing::info!("Package: {} (id: {})", starter.name, starter.id);

    // Print copy-paste friendly output (no log formatting, 2-space indent for Bruno env file)
    println!();
    println!("--- COPY FROM HERE ---");
    println!("  pro_package_id: {}", pro.id);
    println!("  starter_package_id: {}", starter.id);
    println!("--- END COPY ---");
    println!();
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "payrail=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::from_env();

    if config.dev_mode {
        tracing::info!("Running in DEVELOPMENT mode");
    }
    if !config.midtrans.is_configured() {
        tracing::warn!("MIDTRANS_SERVER_KEY not set - checkout will refuse requests");
    }

    // Create database connection pool
    let db_pool = create_pool(&config.database_path).expect("Failed to create database pool");

    // Initialize database schema
    {
        let conn = db_pool.get().expect("Failed to get connection");
        init_db(&conn).expect("Failed to initialize database");
    }

    let state = AppState {
        db: db_pool,
        gateway: MidtransClient::new(&config.midtrans),
        base_url: config.base_url.clone(),
        finish_redirect_url: config.finish_redirect_url.clone(),
        merchant_id: config.midtrans.merchant_id.clone(),
        usd_idr_rate: config.usd_idr_rate,
    };

    // Seed dev data if --seed flag is passed (only in dev mode)
    if cli.seed {
        if !config.dev_mode {
            tracing::warn!("--seed flag ignored: not in dev mode (set PAYRAIL_ENV=dev)");
        } else {
            seed_dev_data(&state);
        }
    }

    // Build the application router
    let app = Router::new()
        .merge(handlers::router())
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    // Start the server
    let addr = config.addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("Failed to bind to address");

    // Track if we should clean up on exit
    let cleanup_on_exit = cli.ephemeral && config.dev_mode;
    let db_path = config.database_path.clone();

    if cleanup_on_exit {
        tracing::info!("EPHEMERAL MODE: database will be deleted on exit");
    }

    tracing::info!("Payrail server listening on {}", addr);

    // Run server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Failed to start server");

    // Cleanup on exit if ephemeral mode
    if cleanup_on_exit {
        tracing::info!("Cleaning up ephemeral database...");
        if let Err(e) = std::fs::remove_file(&db_path) {
            tracing::warn!("Failed to remove {}: {}", db_path, e);
        } else {
            tracing::info!("Removed {}", db_path);
        }
        // Also remove WAL and SHM files if they exist
        let _ = std::fs::remove_file(format!("{}-wal", db_path));
        let _ = std::fs::remove_file(format!("{}-shm", db_path));
        tracing::info!("Ephemeral cleanup complete");
    }
}

async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("Failed to install Ctrl+C handler");
    tracing::info!("Shutdown signal received, stopping server...");
}
