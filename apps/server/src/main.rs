#![deny(clippy::wildcard_imports)]

use actix_cors::Cors;
use actix_web::{web, App, HttpServer};
use tracing::{error, info};

use eldorado_server::routes;
use eldorado_server::AppState;
use eldorado_server::ServerConfig;

mod telemetry;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    let config = match ServerConfig::from_env() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("configuration error: {err}");
            std::process::exit(1);
        }
    };
    telemetry::init_tracing(config.log_level.as_deref());

    let bind = (config.host.clone(), config.port);
    let app_state = match AppState::build(config).await {
        Ok(state) => web::Data::new(state),
        Err(err) => {
            error!(error = %err, "failed to build application state");
            std::process::exit(1);
        }
    };

    info!(host = %bind.0, port = bind.1, "starting El Dorado game server");

    let state_for_shutdown = app_state.clone();
    let server = HttpServer::new(move || {
        App::new()
            .wrap(Cors::permissive())
            .app_data(app_state.clone())
            .app_data(routes::json_config())
            .configure(routes::configure)
    })
    .workers(num_cpus::get().min(8))
    .bind(bind)?
    .run();

    let result = server.await;

    // Let every room flush, say goodbye, and unregister.
    state_for_shutdown.registry.shutdown_all().await;
    result
}
