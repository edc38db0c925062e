use crate::state::AppState;
use log::{error, info};
use rocket::fairing::{Fairing, Info, Kind};
use rocket::{Data, Orbit, Request, Rocket};
use std::time::Duration;

pub struct RequestLogger;

#[rocket::async_trait]
impl Fairing for RequestLogger {
    fn info(&self) -> Info {
        Info {
            name: "Request Logger",
            kind: Kind::Request,
        }
    }

    async fn on_request(&self, req: &mut Request<'_>, _: &mut Data<'_>) {
        info!(
            "{} {} {}",
            req.method(),
            req.uri(),
            req.headers().get_one("User-Agent").unwrap_or("Unknown")
        );
    }
}

/// Persists the in-memory download counters on an interval and at shutdown
pub struct DownloadFlusher;

fn flush_downloads(state: &AppState) {
    let today = chrono::Utc::now().date_naive();
    if let Err(e) = state.downloads.flush(&state.database, today) {
        error!("Failed to flush download counters: {e}");
    }
}

#[rocket::async_trait]
impl Fairing for DownloadFlusher {
    fn info(&self) -> Info {
        Info {
            name: "Download Counter Flusher",
            kind: Kind::Liftoff | Kind::Shutdown,
        }
    }

    async fn on_liftoff(&self, rocket: &Rocket<Orbit>) {
        let Some(state) = rocket.state::<AppState>() else {
            return;
        };
        let downloads = std::sync::Arc::clone(&state.downloads);
        let database = std::sync::Arc::clone(&state.database);
        let period = Duration::from_secs(state.config.download_flush_secs.max(1));

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            // the first tick fires immediately
            interval.tick().await;
            loop {
                interval.tick().await;
                let downloads = std::sync::Arc::clone(&downloads);
                let database = std::sync::Arc::clone(&database);
                let flushed = tokio::task::spawn_blocking(move || {
                    downloads.flush(&database, chrono::Utc::now().date_naive())
                })
                .await;
                match flushed {
                    Ok(Ok(_)) => {}
                    Ok(Err(e)) => error!("Failed to flush download counters: {e}"),
                    Err(e) => error!("Download flush task panicked: {e}"),
                }
            }
        });
        info!("Flushing download counters every {}s", period.as_secs());
    }

    async fn on_shutdown(&self, rocket: &Rocket<Orbit>) {
        if let Some(state) = rocket.state::<AppState>() {
            flush_downloads(state);
        }
    }
}
