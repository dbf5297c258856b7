//! HTTP API server
//!
//! tiny_http with a small (method, path) router. Worker threads share the
//! listener; per-(user, challenge) serialization is the engine's job, not
//! the router's. All `/api/*` routes resolve the bearer token to a user row
//! before dispatch.

use std::io::Read;
use std::sync::Arc;
use std::thread;

use anyhow::anyhow;
use tiny_http::{Response, Server};
use tracing::{error, info};

use crate::config::Config;
use crate::db::{self, GameDb};
use crate::domain::{ChallengeId, UserRecord};
use crate::engine::ProgressEngine;
use crate::recommend::{Recommender, RemoteRecommender, Unranked};

pub mod handlers;

const MAX_BODY_BYTES: usize = 64 * 1024;

/// Shared state for the API worker threads.
#[derive(Clone)]
pub struct ApiState {
    pub db: GameDb,
    pub engine: Arc<ProgressEngine>,
    pub recommender: Arc<dyn Recommender>,
}

impl ApiState {
    pub fn new(config: &Config, db: GameDb) -> Self {
        let engine = Arc::new(ProgressEngine::new(db.clone(), config.engine.max_retries));
        let recommender: Arc<dyn Recommender> = match &config.recommender.url {
            Some(url) => Arc::new(RemoteRecommender::new(
                url.clone(),
                config.recommender.timeout_ms,
            )),
            None => Arc::new(Unranked),
        };
        Self {
            db,
            engine,
            recommender,
        }
    }
}

/// Run the server until the process exits.
pub fn run(config: &Config, state: ApiState) -> anyhow::Result<()> {
    let addr = config.listen_addr();
    let server =
        Server::http(&addr).map_err(|e| anyhow!("failed to bind {}: {}", addr, e))?;
    let server = Arc::new(server);
    info!("[vitaquest:http] listening on http://{}", addr);

    let workers = config.server.workers.max(1);
    let mut handles = Vec::with_capacity(workers);
    for _ in 0..workers {
        let server = Arc::clone(&server);
        let state = state.clone();
        handles.push(thread::spawn(move || {
            for request in server.incoming_requests() {
                dispatch(&state, request);
            }
        }));
    }
    for handle in handles {
        let _ = handle.join();
    }
    Ok(())
}

fn dispatch(state: &ApiState, mut request: tiny_http::Request) {
    let method = request.method().to_string();
    let url = request.url().to_string();
    let path = url.split('?').next().unwrap_or(url.as_str()).to_string();

    if method == "GET" && path == "/health" {
        respond_json(
            request,
            200,
            serde_json::json!({
                "status": "ok",
                "version": env!("CARGO_PKG_VERSION"),
            }),
        );
        return;
    }

    let Some(user) = authenticate(state, &request) else {
        respond_json(request, 401, serde_json::json!({ "error": "unauthorized" }));
        return;
    };

    match (method.as_str(), path.as_str()) {
        ("GET", "/api/me") => handlers::me(&user, request),
        ("GET", "/api/challenges") => handlers::list_challenges(state, &user, request),
        ("GET", "/api/challenges/mine") => handlers::my_challenges(state, &user, request),
        ("GET", "/api/achievements") => handlers::list_achievements(state, &user, request),
        ("GET", "/api/activity") => handlers::activity_feed(state, &user, request),

        ("POST", p) if p.starts_with("/api/challenges/") && p.ends_with("/join") => {
            match parse_challenge_id(p, "join") {
                Ok(id) => handlers::join_challenge(state, &user, id, request),
                Err(err) => respond_json(request, 400, serde_json::json!({ "error": err })),
            }
        }
        ("POST", p) if p.starts_with("/api/challenges/") && p.ends_with("/progress") => {
            let id = match parse_challenge_id(p, "progress") {
                Ok(id) => id,
                Err(err) => {
                    respond_json(request, 400, serde_json::json!({ "error": err }));
                    return;
                }
            };
            let body = match read_request_body(&mut request) {
                Ok(body) => body,
                Err(response) => {
                    let _ = request.respond(response);
                    return;
                }
            };
            handlers::update_progress(state, &user, id, &body, request);
        }

        _ => {
            respond_json(request, 404, serde_json::json!({ "error": "not_found" }));
        }
    }
}

/// Resolve the bearer token to a user. Auth mechanics beyond this lookup
/// live outside this service.
fn authenticate(state: &ApiState, request: &tiny_http::Request) -> Option<UserRecord> {
    let token = request
        .headers()
        .iter()
        .find(|h| h.field.equiv("Authorization"))
        .map(|h| h.value.as_str().trim())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)?;

    match db::user_by_token(&state.db.conn(), token) {
        Ok(user) => user,
        Err(e) => {
            error!("[vitaquest:http] token lookup failed: {e}");
            None
        }
    }
}

fn json_content_type() -> tiny_http::Header {
    tiny_http::Header::from_bytes(&b"Content-Type"[..], &b"application/json"[..]).unwrap()
}

pub(crate) fn respond_json(request: tiny_http::Request, status_code: u16, value: serde_json::Value) {
    let body =
        serde_json::to_string(&value).unwrap_or_else(|_| "{\"error\":\"serialize\"}".to_string());
    let response = Response::from_string(body)
        .with_status_code(status_code)
        .with_header(json_content_type());
    let _ = request.respond(response);
}

fn read_request_body(
    request: &mut tiny_http::Request,
) -> Result<String, Response<std::io::Cursor<Vec<u8>>>> {
    let mut body = String::new();
    let mut reader = request.as_reader().take((MAX_BODY_BYTES + 1) as u64);
    if let Err(e) = reader.read_to_string(&mut body) {
        error!("[vitaquest:http] failed to read body: {e}");
        let response = Response::from_string("{\"error\":\"bad_request\"}")
            .with_status_code(400)
            .with_header(json_content_type());
        return Err(response);
    }

    if body.len() > MAX_BODY_BYTES {
        let response = Response::from_string("{\"error\":\"payload_too_large\"}")
            .with_status_code(413)
            .with_header(json_content_type());
        return Err(response);
    }

    Ok(body)
}

/// Pull the challenge id out of `/api/challenges/{id}/{suffix}`.
fn parse_challenge_id(path: &str, suffix: &str) -> Result<ChallengeId, &'static str> {
    let trimmed = path.trim_end_matches('/');
    let trimmed = trimmed
        .strip_suffix(&format!("/{suffix}"))
        .ok_or("bad_path")?;
    let id_str = trimmed.rsplit('/').next().ok_or("bad_path")?;
    id_str.parse::<ChallengeId>().map_err(|_| "bad_challenge_id")
}
