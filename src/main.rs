// Cebu Jeepney Tracker server with embedded live map UI

use actix_cors::Cors;
use actix_web::{middleware, web, App, HttpServer};
use jeepney_tracker::api::{self, AppState};
use jeepney_tracker::config::TrackerConfig;
use jeepney_tracker::jeepney_models::JeepneyModels;
use log::{error, info, warn};
use std::time::Duration;
use tokio::time;

// ============================================================================
// Background Task
// ============================================================================

async fn data_refresh_task(state: AppState, every: Duration) {
    let mut interval = time::interval(every);
    // First tick fires immediately; the snapshot was just loaded.
    interval.tick().await;

    loop {
        interval.tick().await;

        info!("🔄 Auto-refreshing fleet data...");

        let app_state = state.clone();
        match tokio::task::spawn_blocking(move || api::reload_fleet(&app_state)).await {
            Ok(Ok(Some(count))) => {
                info!("✓ Auto-refresh completed at {} ({} vehicles)",
                      JeepneyModels::format_timestamp_full(JeepneyModels::get_current_timestamp()),
                      count);
            }
            Ok(Ok(None)) => {}
            Ok(Err(e)) => {
                warn!("⚠️  Auto-refresh failed, keeping previous snapshot: {}", e);
            }
            Err(e) => {
                error!("❌ Auto-refresh task panicked: {}", e);
            }
        }
    }
}

// ============================================================================
// Server Setup
// ============================================================================

async fn run_server(state: AppState) -> std::io::Result<()> {
    let refresh_secs = state.config.fleet.refresh_interval_secs;
    if state.config.fleet.data_dir.is_some() && refresh_secs > 0 {
        let refresh_state = state.clone();
        tokio::spawn(async move {
            data_refresh_task(refresh_state, Duration::from_secs(refresh_secs)).await;
        });
    }

    let (host, port) = state.config.bind_address();

    println!("\n╔════════════════════════════════════════════════════════════╗");
    println!("║   🚌 Cebu Jeepney Tracker (Embedded UI)                    ║");
    println!("╚════════════════════════════════════════════════════════════╝\n");
    println!("🌐 Server running on: http://{}:{}", host, port);
    println!("📱 Live map available at: http://localhost:{}", port);
    println!("📡 API available at: http://localhost:{}/api/jeepney\n", port);

    println!("📍 Available Routes:");
    println!("┌─────────────────────────────────────────────────────────────┐");
    println!("│ Frontend:                                                   │");
    println!("│   GET    /                         - Live map (embedded)    │");
    println!("│   GET    /live-map.js              - JavaScript (embedded)  │");
    println!("├─────────────────────────────────────────────────────────────┤");
    println!("│ API - Fleet:                                                │");
    println!("│   GET    /api/jeepney/fleet?code=  - Vehicles + routes      │");
    println!("│   GET    /api/jeepney/vehicles     - Vehicles (code,status) │");
    println!("│   GET    /api/jeepney/routes       - Routes (code)          │");
    println!("│   GET    /api/jeepney/vehicle/:id  - Vehicle details        │");
    println!("│   GET    /api/jeepney/route/:code  - Route + its jeepneys   │");
    println!("│   GET    /api/jeepney/stats        - Fleet statistics       │");
    println!("│   GET    /api/jeepney/map-config   - Map widget settings    │");
    println!("│   POST   /api/jeepney/refresh      - Reload fleet data      │");
    println!("├─────────────────────────────────────────────────────────────┤");
    println!("│ API - Live map views:                                       │");
    println!("│   POST   /api/jeepney/views              - Mount a view     │");
    println!("│   GET    /api/jeepney/views/:id          - View state       │");
    println!("│   POST   /api/jeepney/views/:id/actions  - Dispatch action  │");
    println!("│   POST   /api/jeepney/views/:id/surface  - Map status       │");
    println!("│   DELETE /api/jeepney/views/:id          - Unmount          │");
    println!("├─────────────────────────────────────────────────────────────┤");
    println!("│ API - Driver console:                                       │");
    println!("│   POST   /api/jeepney/drivers            - Open console     │");
    println!("│   GET    /api/jeepney/drivers/:id        - Console state    │");
    println!("│   POST   /api/jeepney/drivers/:id/actions- Board/alight/... │");
    println!("│   DELETE /api/jeepney/drivers/:id        - Close console    │");
    println!("│   GET    /health                         - Health check     │");
    println!("└─────────────────────────────────────────────────────────────┘\n");

    HttpServer::new(move || {
        let cors = Cors::permissive();

        App::new()
            .app_data(web::Data::new(state.clone()))
            .wrap(cors)
            .wrap(middleware::Logger::default())
            .wrap(middleware::Compress::default())
            .configure(api::config)
    })
        .bind((host.as_str(), port))?
        .run()
        .await
}

// ============================================================================
// Main Entry Point
// ============================================================================

fn main() -> std::io::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    println!("\n╔════════════════════════════════════════════════════════════╗");
    println!("║                                                            ║");
    println!("║    🚌 Cebu Jeepney Tracker                                 ║");
    println!("║       Live map server with embedded web UI                 ║");
    println!("║                                                            ║");
    println!("║    Version: {:<47}║", env!("CARGO_PKG_VERSION"));
    println!("║                                                            ║");
    println!("╚════════════════════════════════════════════════════════════╝\n");

    let config = match TrackerConfig::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("\n❌ Failed to load configuration: {}", e);
            eprintln!("\n💡 Check JEEPNEY_CONFIG, your config.toml and the JEEPNEY_* environment variables.\n");
            std::process::exit(1);
        }
    };
    println!("{}\n", config);

    let snapshot = match JeepneyModels::initialize_snapshot(config.fleet.data_dir.as_deref()) {
        Ok(snapshot) => {
            println!("╔════════════════════════════════════════════════════════════╗");
            println!("║  ✅ Fleet Loaded Successfully!                             ║");
            println!("╚════════════════════════════════════════════════════════════╝");
            println!("{}\n", JeepneyModels::get_snapshot_stats(&snapshot));
            snapshot
        }
        Err(e) => {
            eprintln!("\n╔════════════════════════════════════════════════════════════╗");
            eprintln!("║  ❌ INITIALIZATION FAILED                                  ║");
            eprintln!("╚════════════════════════════════════════════════════════════╝");
            eprintln!("\n❌ Failed to load fleet data: {}", e);
            eprintln!("Server cannot start without initial data.");
            eprintln!("\n💡 Troubleshooting:");
            eprintln!("   1. Check that the data directory contains vehicles.csv and routes.csv");
            eprintln!("   2. Check the CSV headers against the documented columns");
            eprintln!("   3. Available seats must not exceed total seats");
            eprintln!("   4. Unset JEEPNEY_DATA_DIR to fall back to the built-in sample fleet\n");
            std::process::exit(1);
        }
    };

    actix_web::rt::System::new().block_on(run_server(AppState::new(snapshot, config)))
}
