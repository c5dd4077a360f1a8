use actix_web::{web, HttpRequest, HttpResponse};
use farmstore::{Document, DocumentStore, FarmStoreError, NewUser};
use serde::Deserialize;

use crate::AppState;

/// Header naming the user on whose behalf a replace is made.
pub const ACTOR_HEADER: &str = "X-Actor-Id";

/// Whole documents are posted back on every write.
const MAX_DOCUMENT_BYTES: usize = 8 * 1024 * 1024;

/// Configure all API routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::JsonConfig::default().limit(MAX_DOCUMENT_BYTES))
        .service(
            web::scope("/api")
                .route("/status", web::get().to(status))
                .route("/data", web::get().to(get_data))
                .route("/data", web::post().to(replace_data))
                .route("/login", web::post().to(login))
                .route("/signup", web::post().to(signup)),
        );
}

// ── Helpers ─────────────────────────────────────────────────────────

fn err_response(e: FarmStoreError) -> HttpResponse {
    match &e {
        FarmStoreError::AuthenticationFailed => {
            HttpResponse::Unauthorized().json(serde_json::json!({
                "success": false,
                "error": e.to_string()
            }))
        }
        FarmStoreError::DuplicateEmail { .. } => {
            HttpResponse::BadRequest().json(serde_json::json!({
                "success": false,
                "error": "Email already registered"
            }))
        }
        FarmStoreError::Validation(_) => HttpResponse::BadRequest().json(serde_json::json!({
            "success": false,
            "error": e.to_string()
        })),
        FarmStoreError::Forbidden(_) => HttpResponse::Forbidden().json(serde_json::json!({
            "success": false,
            "error": e.to_string()
        })),
        FarmStoreError::VersionConflict { expected, actual } => {
            HttpResponse::Conflict().json(serde_json::json!({
                "success": false,
                "error": e.to_string(),
                "expected": expected,
                "actual": actual
            }))
        }
        FarmStoreError::NotFound { .. } => HttpResponse::NotFound().json(serde_json::json!({
            "success": false,
            "error": e.to_string()
        })),
        _ => {
            log::error!("Internal error: {e}");
            HttpResponse::InternalServerError().json(serde_json::json!({
                "success": false,
                "error": "Internal server error"
            }))
        }
    }
}

fn actor_id(req: &HttpRequest) -> Option<&str> {
    req.headers()
        .get(ACTOR_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

// ── Handlers ────────────────────────────────────────────────────────

async fn status(state: web::Data<AppState>) -> HttpResponse {
    match state.store.status() {
        Ok(v) => HttpResponse::Ok().json(v),
        Err(e) => err_response(e),
    }
}

async fn get_data(state: web::Data<AppState>) -> HttpResponse {
    match state.store.get() {
        Ok(doc) => HttpResponse::Ok().json(doc),
        Err(e) => err_response(e),
    }
}

async fn replace_data(
    state: web::Data<AppState>,
    req: HttpRequest,
    body: web::Json<Document>,
) -> HttpResponse {
    match state.store.replace(body.into_inner(), actor_id(&req)) {
        Ok(version) => HttpResponse::Ok().json(serde_json::json!({
            "success": true,
            "version": version
        })),
        Err(e) => err_response(e),
    }
}

#[derive(Deserialize)]
struct LoginRequest {
    email: String,
    password: String,
}

async fn login(state: web::Data<AppState>, body: web::Json<LoginRequest>) -> HttpResponse {
    match state.store.authenticate(&body.email, &body.password) {
        Ok(user) => HttpResponse::Ok().json(serde_json::json!({
            "success": true,
            "user": user
        })),
        Err(e) => err_response(e),
    }
}

async fn signup(state: web::Data<AppState>, body: web::Json<NewUser>) -> HttpResponse {
    match state.store.register(body.into_inner()) {
        Ok(user) => HttpResponse::Ok().json(serde_json::json!({
            "success": true,
            "user": user
        })),
        Err(e) => err_response(e),
    }
}
