use actix_cors::Cors;
use actix_web::{App, HttpServer, web};

use server::config::Config;
use server::model::manager::ModelManager;
use server::model::onnx::OnnxProvider;
use server::routes::configure_routes;

fn main() -> std::io::Result<()> {
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));
    dotenv::dotenv().ok();

    let config = Config::from_env();
    log::info!(
        "Model source {}, cache {}",
        config.model.source,
        config.model.cache_dir.display()
    );

    // Load before accepting traffic; the first request must never race an
    // uninitialized manager.
    let manager = ModelManager::new(config.model.clone(), Box::new(OnnxProvider::new()));
    if let Err(e) = manager.ensure_loaded() {
        log::error!("Failed to preload model at startup: {}", e);
        return Err(std::io::Error::other(format!("Model loading failed: {}", e)));
    }

    let manager = web::Data::new(manager);
    let server = config.server;
    log::info!("Starting liveness detection server on {}", server.bind_address);

    actix_web::rt::System::new().block_on(async move {
        HttpServer::new(move || {
            App::new()
                .wrap(
                    Cors::default()
                        .allow_any_origin()
                        .allowed_methods(vec!["GET", "POST", "OPTIONS"])
                        .allowed_headers(vec![
                            actix_web::http::header::ACCEPT,
                            actix_web::http::header::CONTENT_TYPE,
                        ])
                        .max_age(3600),
                )
                .app_data(manager.clone())
                .configure(configure_routes)
        })
        .workers(server.workers)
        .keep_alive(server.keepalive_interval)
        .client_request_timeout(server.keepalive_timeout)
        .bind(&server.bind_address)?
        .run()
        .await
    })
}
