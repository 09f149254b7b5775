//! Peer Benchmark Comparator: ranks a user's proficiency scores against a
//! cohort of peers with empirical percentiles, plus a domain-level rollup.
//! Peer comparison is advisory: a missing cohort degrades to a neutral
//! default instead of failing.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::types::{ProficiencyRecord, SkillInfo};

/// Default percentile when no peer data is available.
pub const NEUTRAL_PERCENTILE: u8 = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComparisonStatus {
    Success,
    InsufficientData,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkillComparison {
    pub skill_id: String,
    pub skill_name: String,
    pub user_score: f64,
    pub peer_average: f64,
    pub percentile: u8,
    pub differential: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DomainComparison {
    pub domain_id: String,
    pub user_average: f64,
    pub peer_average: f64,
    pub percentile: u8,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PeerComparison {
    pub status: ComparisonStatus,
    /// User's mean score ranked against each peer's mean score.
    pub percentile: u8,
    pub peer_count: usize,
    pub skills: Vec<SkillComparison>,
    pub domains: Vec<DomainComparison>,
}

impl PeerComparison {
    pub fn insufficient_data() -> Self {
        Self {
            status: ComparisonStatus::InsufficientData,
            percentile: NEUTRAL_PERCENTILE,
            peer_count: 0,
            skills: Vec::new(),
            domains: Vec::new(),
        }
    }
}

/// Empirical percentile: share of peer scores strictly below the user's,
/// rounded to the nearest integer.
pub fn empirical_percentile(user_score: f64, peer_scores: &[f64]) -> u8 {
    if peer_scores.is_empty() {
        return NEUTRAL_PERCENTILE;
    }
    let below = peer_scores.iter().filter(|score| **score < user_score).count();
    let pct = 100.0 * below as f64 / peer_scores.len() as f64;
    pct.round() as u8
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Compare a user's records to one record set per peer. The skill map is
/// metadata only (names and domain grouping), never scoring input.
pub fn compare(
    user_records: &[ProficiencyRecord],
    peer_records: &[Vec<ProficiencyRecord>],
    skills: &HashMap<String, SkillInfo>,
) -> PeerComparison {
    if user_records.is_empty() || peer_records.is_empty() {
        return PeerComparison::insufficient_data();
    }

    let mut skill_comparisons = Vec::with_capacity(user_records.len());
    for record in user_records {
        let peer_scores: Vec<f64> = peer_records
            .iter()
            .filter_map(|records| {
                records
                    .iter()
                    .find(|r| r.skill_id == record.skill_id)
                    .map(|r| r.score)
            })
            .collect();

        let peer_average = mean(&peer_scores);
        let percentile = empirical_percentile(record.score, &peer_scores);
        let skill_name = skills
            .get(&record.skill_id)
            .map(|info| info.name.clone())
            .unwrap_or_else(|| record.skill_id.clone());

        skill_comparisons.push(SkillComparison {
            skill_id: record.skill_id.clone(),
            skill_name,
            user_score: record.score,
            peer_average,
            percentile,
            differential: record.score - peer_average,
        });
    }

    let user_mean = mean(&user_records.iter().map(|r| r.score).collect::<Vec<_>>());
    let peer_means: Vec<f64> = peer_records
        .iter()
        .filter(|records| !records.is_empty())
        .map(|records| mean(&records.iter().map(|r| r.score).collect::<Vec<_>>()))
        .collect();
    let aggregate_percentile = empirical_percentile(user_mean, &peer_means);

    PeerComparison {
        status: ComparisonStatus::Success,
        percentile: aggregate_percentile,
        peer_count: peer_records.len(),
        skills: skill_comparisons,
        domains: domain_comparisons(user_records, peer_records, skills),
    }
}

/// Group scores by the skill's parent domain and average them. A domain with
/// one skill behaves identically to that skill's score.
fn domain_comparisons(
    user_records: &[ProficiencyRecord],
    peer_records: &[Vec<ProficiencyRecord>],
    skills: &HashMap<String, SkillInfo>,
) -> Vec<DomainComparison> {
    // BTreeMap for a stable output order.
    let mut by_domain: BTreeMap<String, Vec<f64>> = BTreeMap::new();
    for record in user_records {
        let Some(info) = skills.get(&record.skill_id) else {
            continue;
        };
        by_domain.entry(info.domain_id.clone()).or_default().push(record.score);
    }

    by_domain
        .into_iter()
        .map(|(domain_id, user_scores)| {
            let user_average = mean(&user_scores);

            let peer_domain_means: Vec<f64> = peer_records
                .iter()
                .filter_map(|records| {
                    let scores: Vec<f64> = records
                        .iter()
                        .filter(|r| {
                            skills
                                .get(&r.skill_id)
                                .map(|info| info.domain_id == domain_id)
                                .unwrap_or(false)
                        })
                        .map(|r| r.score)
                        .collect();
                    if scores.is_empty() {
                        None
                    } else {
                        Some(mean(&scores))
                    }
                })
                .collect();

            DomainComparison {
                domain_id,
                user_average,
                peer_average: mean(&peer_domain_means),
                percentile: empirical_percentile(user_average, &peer_domain_means),
            }
        })
        .collect()
}
