use crate::models::CacheStats;
use crate::state::AppState;
use rocket::serde::json::Json;
use rocket::serde::Serialize;
use rocket::{State, get};

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub cache: CacheStats,
}

#[get("/")]
pub async fn health_check(state: &State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        cache: state.cache.get_stats(),
    })
}
