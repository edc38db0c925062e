pub mod config;
pub mod database;
pub mod error;
pub mod fairings;
pub mod models;
pub mod routes;
pub mod schema;
pub mod services;
pub mod state;
pub mod version;

use rocket::Config;
use rocket_cors::{AllowedOrigins, CorsOptions};

pub use config::AppConfig;
pub use error::{ApiError, RegistryError, RegistryResult};
pub use fairings::{DownloadFlusher, RequestLogger};
pub use state::AppState;

pub fn create_rocket() -> rocket::Rocket<rocket::Build> {
    create_rocket_with_config(AppConfig::from_env())
}

pub fn create_rocket_with_config(config: AppConfig) -> rocket::Rocket<rocket::Build> {
    let state = AppState::new(config).expect("Failed to initialize registry state");

    let cors = CorsOptions::default()
        .allowed_origins(AllowedOrigins::all())
        .to_cors()
        .expect("Failed to create CORS configuration");

    let rocket_config = Config {
        port: state.config.port,
        address: state.config.host.parse().expect("Invalid host address"),
        ..Config::default()
    };

    rocket::custom(&rocket_config)
        .manage(state)
        .attach(cors)
        .attach(RequestLogger)
        .attach(DownloadFlusher)
        .mount("/", routes::get_routes())
}
