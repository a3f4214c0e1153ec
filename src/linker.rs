//! Candidate search for a single driving record.
//!
//! Every search is a linear scan over the candidate slice in its original
//! order and stops at the first candidate that matches. When several
//! candidates satisfy the same matcher the earliest one wins; this is
//! deterministic but says nothing about which candidate is the "true" one.

use tracing::trace;

use crate::matcher::{FieldMatcher, MatcherKind, MatcherRegistry, Outcome};
use crate::model::Restaurant;

/// Which matchers a resolution tries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// One matcher only.
    Single(MatcherKind),
    /// phone, website, reference, address; first success wins.
    Chain,
}

/// A successful resolution: position in the candidate slice and the matcher
/// that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolution {
    pub index: usize,
    pub matched_by: MatcherKind,
}

pub struct Linker<'r> {
    registry: &'r MatcherRegistry,
    strategy: Strategy,
}

impl<'r> Linker<'r> {
    pub fn new(registry: &'r MatcherRegistry, strategy: Strategy) -> Self {
        Linker { registry, strategy }
    }

    pub fn strategy(&self) -> Strategy {
        self.strategy
    }

    /// First candidate matching `driving` under `kind`.
    ///
    /// `None` when nothing matches or when `driving` lacks the field.
    pub fn resolve<'c>(
        &self,
        driving: &Restaurant,
        candidates: &'c [Restaurant],
        kind: MatcherKind,
    ) -> Option<&'c Restaurant> {
        let matcher = self.registry.get(kind);
        first_match(matcher, driving, candidates, &|_| true).map(|i| &candidates[i])
    }

    /// Try each matcher in chain order and return the first hit.
    pub fn resolve_chain<'c>(
        &self,
        driving: &Restaurant,
        candidates: &'c [Restaurant],
    ) -> Option<(&'c Restaurant, MatcherKind)> {
        self.chain_index(driving, candidates, &|_| true)
            .map(|r| (&candidates[r.index], r.matched_by))
    }

    /// Resolve according to the configured strategy, skipping candidates for
    /// which `available` returns false.
    pub fn resolve_index(
        &self,
        driving: &Restaurant,
        candidates: &[Restaurant],
        available: &dyn Fn(usize) -> bool,
    ) -> Option<Resolution> {
        match self.strategy {
            Strategy::Single(kind) => {
                first_match(self.registry.get(kind), driving, candidates, available).map(|index| {
                    Resolution {
                        index,
                        matched_by: kind,
                    }
                })
            }
            Strategy::Chain => self.chain_index(driving, candidates, available),
        }
    }

    fn chain_index(
        &self,
        driving: &Restaurant,
        candidates: &[Restaurant],
        available: &dyn Fn(usize) -> bool,
    ) -> Option<Resolution> {
        self.registry.chain().find_map(|matcher| {
            let index = first_match(matcher, driving, candidates, available)?;
            Some(Resolution {
                index,
                matched_by: matcher.kind(),
            })
        })
    }
}

fn first_match(
    matcher: &FieldMatcher,
    driving: &Restaurant,
    candidates: &[Restaurant],
    available: &dyn Fn(usize) -> bool,
) -> Option<usize> {
    if !matcher.applies(driving) {
        trace!(name = %driving.name, matcher = %matcher.kind(), "driving record not applicable");
        return None;
    }
    candidates
        .iter()
        .enumerate()
        .filter(|(i, _)| available(*i))
        .find(|(_, candidate)| matcher.compare(driving, candidate) == Outcome::Match)
        .map(|(i, _)| i)
}
