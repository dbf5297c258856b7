//! Per-endpoint request handlers

use tracing::{error, info};

use super::{respond_json, ApiState};
use crate::db;
use crate::domain::{ChallengeId, ProgressStatus, ProgressUpdate, UserRecord};
use crate::engine::{achievements, levels};
use crate::error::EngineError;
use crate::{feed, recommend};

/// POST /api/challenges/{id}/progress - the core pipeline.
pub fn update_progress(
    state: &ApiState,
    user: &UserRecord,
    challenge_id: ChallengeId,
    body: &str,
    request: tiny_http::Request,
) {
    let update: ProgressUpdate = match serde_json::from_str(body) {
        Ok(update) => update,
        Err(e) => {
            respond_json(
                request,
                400,
                serde_json::json!({ "error": "invalid_json", "details": e.to_string() }),
            );
            return;
        }
    };

    match state.engine.update_progress(user.id, challenge_id, &update) {
        Ok(outcome) => {
            if outcome.completed {
                info!(
                    "[vitaquest:http] user={} completed challenge={} (+{} points)",
                    user.id, challenge_id, outcome.points_earned
                );
            }
            respond_json(
                request,
                200,
                serde_json::json!({
                    "message": outcome.message,
                    "progress": outcome.progress,
                    "completed": outcome.completed,
                    "points_earned": outcome.points_earned,
                    "xp_earned": outcome.xp_earned,
                    "level_up": outcome.level_up,
                    "achievements_unlocked": outcome.unlocked,
                }),
            );
        }
        Err(err) => respond_engine_error(request, err),
    }
}

/// POST /api/challenges/{id}/join
pub fn join_challenge(
    state: &ApiState,
    user: &UserRecord,
    challenge_id: ChallengeId,
    request: tiny_http::Request,
) {
    match state.engine.join_challenge(user.id, challenge_id) {
        Ok(progress) => respond_json(
            request,
            200,
            serde_json::json!({ "message": "Challenge joined", "progress": progress }),
        ),
        Err(err) => respond_engine_error(request, err),
    }
}

/// GET /api/challenges - active catalog with the caller's progress, ordered
/// by the ranking collaborator (stored order if it fails).
pub fn list_challenges(state: &ApiState, user: &UserRecord, request: tiny_http::Request) {
    let challenges = match db::active_challenges(&state.db.conn()) {
        Ok(challenges) => challenges,
        Err(e) => {
            error!("[vitaquest:http] challenge list failed: {e}");
            respond_json(request, 500, serde_json::json!({ "error": "storage_error" }));
            return;
        }
    };

    // Ranking happens without the db lock held; the call may go out to the
    // network and must never block the write path.
    let ranking = state.recommender.rank(user.id, &challenges);
    let challenges = recommend::apply_ranking(challenges, &ranking);

    let conn = state.db.conn();
    let mut items = Vec::with_capacity(challenges.len());
    for challenge in challenges {
        let progress = match db::progress_for(&conn, user.id, challenge.id) {
            Ok(progress) => progress,
            Err(e) => {
                error!("[vitaquest:http] progress lookup failed: {e}");
                respond_json(request, 500, serde_json::json!({ "error": "storage_error" }));
                return;
            }
        };
        items.push(serde_json::json!({
            "challenge": challenge,
            "user_progress": progress,
        }));
    }

    respond_json(request, 200, serde_json::json!({ "challenges": items }));
}

/// GET /api/challenges/mine - the caller's active progress rows.
pub fn my_challenges(state: &ApiState, user: &UserRecord, request: tiny_http::Request) {
    let conn = state.db.conn();
    let rows = match db::progress_for_user(&conn, user.id, Some(ProgressStatus::Active)) {
        Ok(rows) => rows,
        Err(e) => {
            error!("[vitaquest:http] my-challenges failed: {e}");
            respond_json(request, 500, serde_json::json!({ "error": "storage_error" }));
            return;
        }
    };

    let mut items = Vec::with_capacity(rows.len());
    for progress in rows {
        let challenge = db::challenge_by_id(&conn, progress.challenge_id).ok().flatten();
        items.push(serde_json::json!({
            "progress": progress,
            "challenge": challenge,
        }));
    }

    respond_json(request, 200, serde_json::json!({ "challenges": items }));
}

/// GET /api/achievements - catalog with per-user unlock state.
pub fn list_achievements(state: &ApiState, user: &UserRecord, request: tiny_http::Request) {
    let conn = state.db.conn();
    let catalog = match achievements::catalog(&conn) {
        Ok(catalog) => catalog,
        Err(e) => {
            error!("[vitaquest:http] achievement list failed: {e}");
            respond_json(request, 500, serde_json::json!({ "error": "storage_error" }));
            return;
        }
    };
    let unlocks = match achievements::unlocks_for(&conn, user.id) {
        Ok(unlocks) => unlocks,
        Err(e) => {
            error!("[vitaquest:http] unlock list failed: {e}");
            respond_json(request, 500, serde_json::json!({ "error": "storage_error" }));
            return;
        }
    };

    let items: Vec<_> = catalog
        .into_iter()
        .map(|achievement| {
            let unlocked_at = unlocks
                .iter()
                .find(|(id, _)| *id == achievement.id)
                .map(|(_, at)| *at);
            serde_json::json!({
                "achievement": achievement,
                "unlocked": unlocked_at.is_some(),
                "unlocked_at": unlocked_at,
            })
        })
        .collect();

    respond_json(request, 200, serde_json::json!({ "achievements": items }));
}

/// GET /api/activity - the caller's recent feed entries.
pub fn activity_feed(state: &ApiState, user: &UserRecord, request: tiny_http::Request) {
    match feed::recent(&state.db.conn(), user.id, 50) {
        Ok(entries) => respond_json(request, 200, serde_json::json!({ "activity": entries })),
        Err(e) => {
            error!("[vitaquest:http] activity feed failed: {e}");
            respond_json(request, 500, serde_json::json!({ "error": "storage_error" }));
        }
    }
}

/// GET /api/me - profile counters.
pub fn me(user: &UserRecord, request: tiny_http::Request) {
    respond_json(
        request,
        200,
        serde_json::json!({
            "user": user,
            "xp_to_next_level": levels::xp_to_next_level(user.xp),
        }),
    );
}

/// Map an engine error to a response. Validation and state errors carry
/// their explanation (plus the allowed set or ceiling); conflict and
/// storage errors are logged here and surfaced generically.
fn respond_engine_error(request: tiny_http::Request, err: EngineError) {
    let status = err.http_status();
    let mut body = serde_json::json!({
        "error": err.code(),
        "message": err.to_string(),
    });

    match &err {
        EngineError::ActivityNotAllowed { allowed, .. } => {
            body["allowed"] = serde_json::json!(allowed);
        }
        EngineError::AmountOverCeiling { ceiling, .. } => {
            body["ceiling"] = serde_json::json!(ceiling);
        }
        EngineError::Conflict => {
            error!("[vitaquest:http] conflict retries exhausted: {err}");
        }
        EngineError::Persistence(_) | EngineError::BadCatalog { .. } => {
            error!("[vitaquest:http] {err}");
            body["message"] = serde_json::json!("internal error");
        }
        _ => {}
    }

    respond_json(request, status, body);
}
