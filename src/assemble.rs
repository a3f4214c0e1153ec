use std::collections::BTreeMap;

use itertools::Itertools;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::linker::Linker;
use crate::matcher::MatcherKind;
use crate::model::{MatchPair, Restaurant};

/// Whether one candidate may be linked to several driving records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum CandidatePolicy {
    /// First driving record to claim a candidate keeps it; later driving
    /// records never see it.
    #[default]
    Exclusive,
    /// Candidates stay in the pool and can appear in any number of pairs.
    Shared,
}

impl CandidatePolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            CandidatePolicy::Exclusive => "exclusive",
            CandidatePolicy::Shared => "shared",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LinkStats {
    pub driving: usize,
    pub candidates: usize,
    pub matched: usize,
    pub unmatched: usize,
    pub by_matcher: BTreeMap<MatcherKind, usize>,
}

/// Output of a linkage run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Linkage {
    pub pairs: Vec<MatchPair>,
    /// Driving records with no counterpart, in driving order.
    pub unmatched: Vec<Restaurant>,
    pub stats: LinkStats,
}

pub fn assemble(
    driving: &[Restaurant],
    candidates: &[Restaurant],
    linker: &Linker<'_>,
    policy: CandidatePolicy,
) -> Linkage {
    assemble_with(driving, candidates, linker, policy, |_| {})
}

/// Same as [`assemble`], calling `on_record` after each driving record.
pub fn assemble_with<F>(
    driving: &[Restaurant],
    candidates: &[Restaurant],
    linker: &Linker<'_>,
    policy: CandidatePolicy,
    mut on_record: F,
) -> Linkage
where
    F: FnMut(usize),
{
    let mut claimed = vec![false; candidates.len()];
    let mut pairs = Vec::new();
    let mut unmatched = Vec::new();

    for (i, record) in driving.iter().enumerate() {
        let resolution = {
            let available = |idx: usize| policy == CandidatePolicy::Shared || !claimed[idx];
            linker.resolve_index(record, candidates, &available)
        };

        match resolution {
            Some(r) => {
                let candidate = &candidates[r.index];
                debug!(
                    driving = %record.name,
                    candidate = %candidate.name,
                    matcher = %r.matched_by,
                    "linked"
                );
                claimed[r.index] = true;
                pairs.push(MatchPair {
                    driving: record.clone(),
                    candidate: candidate.clone(),
                    matched_by: r.matched_by,
                });
            }
            None => unmatched.push(record.clone()),
        }
        on_record(i);
    }

    let by_matcher = pairs
        .iter()
        .map(|p| p.matched_by)
        .counts()
        .into_iter()
        .collect();

    let stats = LinkStats {
        driving: driving.len(),
        candidates: candidates.len(),
        matched: pairs.len(),
        unmatched: unmatched.len(),
        by_matcher,
    };
    info!(
        driving = stats.driving,
        candidates = stats.candidates,
        matched = stats.matched,
        unmatched = stats.unmatched,
        policy = policy.as_str(),
        "linkage complete"
    );

    Linkage {
        pairs,
        unmatched,
        stats,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::linker::Strategy;
    use crate::matcher::MatcherRegistry;

    fn michelin() -> Vec<Restaurant> {
        vec![
            Restaurant::new("Le Petit Bistro").with_phone("+33 1 11 11 11 11"),
            Restaurant::new("Chez Paul").with_phone("+33 1 22 22 22 22"),
        ]
    }

    #[test]
    fn pairs_and_unmatched() {
        let registry = MatcherRegistry::default();
        let linker = Linker::new(&registry, Strategy::Single(MatcherKind::Phone));
        let maitre = vec![
            Restaurant::new("Chez Paul").with_phone("1 22 22 22 22"),
            Restaurant::new("Nowhere").with_phone("+33 4 00 00 00 00"),
            Restaurant::new("No phone"),
        ];
        let out = assemble(&maitre, &michelin(), &linker, CandidatePolicy::Exclusive);
        assert_eq!(out.pairs.len(), 1);
        assert_eq!(out.pairs[0].driving.name, "Chez Paul");
        assert_eq!(out.pairs[0].candidate.name, "Chez Paul");
        let names: Vec<_> = out.unmatched.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["Nowhere", "No phone"]);
        assert_eq!(out.stats.matched, 1);
        assert_eq!(out.stats.unmatched, 2);
        assert_eq!(out.stats.by_matcher.get(&MatcherKind::Phone), Some(&1));
    }

    #[test]
    fn exclusive_removes_claimed_candidate() {
        let registry = MatcherRegistry::default();
        let linker = Linker::new(&registry, Strategy::Single(MatcherKind::Phone));
        let maitre = vec![
            Restaurant::new("first").with_phone("22 22 22 22"),
            Restaurant::new("second").with_phone("22 22 22 22"),
        ];
        let out = assemble(&maitre, &michelin(), &linker, CandidatePolicy::Exclusive);
        assert_eq!(out.pairs.len(), 1);
        assert_eq!(out.pairs[0].driving.name, "first");
        assert_eq!(out.unmatched[0].name, "second");
    }

    #[test]
    fn shared_reuses_candidate() {
        let registry = MatcherRegistry::default();
        let linker = Linker::new(&registry, Strategy::Single(MatcherKind::Phone));
        let maitre = vec![
            Restaurant::new("first").with_phone("22 22 22 22"),
            Restaurant::new("second").with_phone("22 22 22 22"),
        ];
        let out = assemble(&maitre, &michelin(), &linker, CandidatePolicy::Shared);
        assert_eq!(out.pairs.len(), 2);
        assert!(out.pairs.iter().all(|p| p.candidate.name == "Chez Paul"));
    }

    #[test]
    fn empty_inputs() {
        let registry = MatcherRegistry::default();
        let linker = Linker::new(&registry, Strategy::Chain);
        let out = assemble(&[], &michelin(), &linker, CandidatePolicy::Exclusive);
        assert!(out.pairs.is_empty());
        assert!(out.unmatched.is_empty());
        let lonely = vec![Restaurant::new("x").with_phone("1")];
        let out = assemble(&lonely, &[], &linker, CandidatePolicy::Exclusive);
        assert_eq!(out.unmatched.len(), 1);
    }

    #[test]
    fn progress_callback_sees_every_record() {
        let registry = MatcherRegistry::default();
        let linker = Linker::new(&registry, Strategy::Chain);
        let maitre = vec![Restaurant::new("a"), Restaurant::new("b"), Restaurant::new("c")];
        let mut seen = Vec::new();
        assemble_with(&maitre, &michelin(), &linker, CandidatePolicy::Exclusive, |i| {
            seen.push(i)
        });
        assert_eq!(seen, vec![0, 1, 2]);
    }
}
