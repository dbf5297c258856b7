//! Challenge ranking collaborator
//!
//! The challenge list can be ordered by an external scoring service. The
//! service is strictly best-effort: any failure falls back to the stored
//! order, and ranking never touches the progress path.

use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::warn;

use crate::domain::{ChallengeId, ChallengeRecord, UserId};

pub trait Recommender: Send + Sync {
    /// Order candidate challenge ids for a user, most relevant first.
    fn rank(&self, user_id: UserId, candidates: &[ChallengeRecord]) -> Vec<ChallengeId>;
}

/// Stored order, no external calls.
pub struct Unranked;

impl Recommender for Unranked {
    fn rank(&self, _user_id: UserId, candidates: &[ChallengeRecord]) -> Vec<ChallengeId> {
        candidates.iter().map(|c| c.id).collect()
    }
}

/// Ranking via an external HTTP scoring service.
pub struct RemoteRecommender {
    url: String,
    agent: ureq::Agent,
}

#[derive(Deserialize)]
struct RankResponse {
    ranked: Vec<ChallengeId>,
}

impl RemoteRecommender {
    pub fn new(url: String, timeout_ms: u64) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(Duration::from_millis(timeout_ms))
            .build();
        Self { url, agent }
    }

    fn call(&self, user_id: UserId, ids: &[ChallengeId]) -> Result<Vec<ChallengeId>> {
        let response: RankResponse = self
            .agent
            .post(&self.url)
            .send_json(serde_json::json!({
                "user_id": user_id,
                "challenge_ids": ids,
            }))
            .context("Failed to reach ranking service")?
            .into_json()
            .context("Failed to parse ranking response")?;
        Ok(response.ranked)
    }
}

impl Recommender for RemoteRecommender {
    fn rank(&self, user_id: UserId, candidates: &[ChallengeRecord]) -> Vec<ChallengeId> {
        let ids: Vec<ChallengeId> = candidates.iter().map(|c| c.id).collect();

        match self.call(user_id, &ids) {
            Ok(ranked) => {
                // Only trust ids we actually offered; anything the service
                // dropped goes to the back in stored order.
                let mut ordered: Vec<ChallengeId> =
                    ranked.into_iter().filter(|id| ids.contains(id)).collect();
                for id in &ids {
                    if !ordered.contains(id) {
                        ordered.push(*id);
                    }
                }
                ordered
            }
            Err(e) => {
                warn!("[vitaquest:recommend] ranking service failed, using stored order: {e}");
                ids
            }
        }
    }
}

/// Reorder challenge records to match a ranking.
pub fn apply_ranking(
    mut candidates: Vec<ChallengeRecord>,
    ranked: &[ChallengeId],
) -> Vec<ChallengeRecord> {
    candidates.sort_by_key(|c| {
        ranked
            .iter()
            .position(|id| *id == c.id)
            .unwrap_or(usize::MAX)
    });
    candidates
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Category, ChallengeKind, Difficulty};

    fn challenge(id: ChallengeId) -> ChallengeRecord {
        ChallengeRecord {
            id,
            title: format!("c{id}"),
            description: String::new(),
            category: Category::Health,
            kind: ChallengeKind::Daily,
            difficulty: Difficulty::Easy,
            points: 10,
            xp_reward: 10,
            target: 1.0,
            unit: "count".to_string(),
            icon: String::new(),
            is_active: true,
        }
    }

    #[test]
    fn test_unranked_keeps_stored_order() {
        let candidates = vec![challenge(3), challenge(1), challenge(2)];
        assert_eq!(Unranked.rank(1, &candidates), vec![3, 1, 2]);
    }

    #[test]
    fn test_apply_ranking_reorders_and_keeps_unranked_tail() {
        let candidates = vec![challenge(1), challenge(2), challenge(3)];
        let ordered = apply_ranking(candidates, &[2, 1]);
        let ids: Vec<_> = ordered.iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![2, 1, 3]);
    }
}
