use std::fs;

use actix_cors::Cors;
use actix_web::{web, App, HttpServer};
use log::{error, info, warn};

use lesionscan::classifier::Classifier;
use lesionscan::config::Config;
use lesionscan::handlers::{routes, AppState};
use lesionscan::labels::LabelTable;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    env_logger::init();

    let config = Config::from_env();
    fs::create_dir_all(&config.upload_dir)?;

    let labels = match &config.labels_path {
        Some(path) => match LabelTable::from_path(path) {
            Ok(table) => {
                info!("loaded label table from {}", path.display());
                table
            }
            Err(e) => {
                warn!(
                    "failed to load label table from {}: {e}; using built-in table",
                    path.display()
                );
                LabelTable::builtin()
            }
        },
        None => LabelTable::builtin(),
    };

    // The model is loaded exactly once. On failure the service still
    // serves, but every prediction renders the fallback result.
    let classifier = match Classifier::load(&config.model_path) {
        Ok(classifier) => {
            info!("model loaded from {}", config.model_path.display());
            Some(classifier)
        }
        Err(e) => {
            error!(
                "failed to load model from {}: {e}; inference disabled",
                config.model_path.display()
            );
            None
        }
    };

    let state = web::Data::new(AppState {
        classifier,
        labels,
        upload_dir: config.upload_dir.clone(),
        body_limit: config.body_limit_bytes,
    });

    info!("server running at http://{}:{}", config.bind_addr, config.port);

    HttpServer::new(move || {
        let cors = Cors::default()
            .allow_any_origin()
            .allow_any_method()
            .allow_any_header();

        App::new()
            .wrap(cors)
            .app_data(state.clone())
            .configure(routes)
    })
    .bind((config.bind_addr.as_str(), config.port))?
    .run()
    .await
}
