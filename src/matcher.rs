use std::fmt;

use serde::{Deserialize, Serialize};

use crate::model::Restaurant;
use crate::similarity::{edit_similarity, jaccard, token_set};

pub const DEFAULT_REFERENCE_THRESHOLD: f64 = 0.7;
pub const DEFAULT_ADDRESS_THRESHOLD: f64 = 0.9;

/// The closed set of field matchers, in chain priority order.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum MatcherKind {
    Phone,
    Website,
    Reference,
    Address,
}

impl MatcherKind {
    /// Chain order: near-unambiguous identifiers first, heuristics last.
    pub const CHAIN: [MatcherKind; 4] = [
        MatcherKind::Phone,
        MatcherKind::Website,
        MatcherKind::Reference,
        MatcherKind::Address,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MatcherKind::Phone => "phone",
            MatcherKind::Website => "website",
            MatcherKind::Reference => "reference",
            MatcherKind::Address => "address",
        }
    }
}

impl fmt::Display for MatcherKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of applying one matcher to a (driving, candidate) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// One of the records lacks the field the matcher needs.
    Inapplicable,
    Match,
    NoMatch,
}

/// A field matcher with its rule and threshold.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldMatcher {
    /// Candidate phone string contains one of the driving record's numbers.
    Phone,
    /// Exact, case-sensitive website equality.
    Website,
    /// Jaccard over `-` tokens, strictly above `threshold`.
    Reference { threshold: f64 },
    /// Edit similarity of street, city and zip, each strictly above `threshold`.
    Address { threshold: f64 },
}

impl FieldMatcher {
    pub fn kind(&self) -> MatcherKind {
        match self {
            FieldMatcher::Phone => MatcherKind::Phone,
            FieldMatcher::Website => MatcherKind::Website,
            FieldMatcher::Reference { .. } => MatcherKind::Reference,
            FieldMatcher::Address { .. } => MatcherKind::Address,
        }
    }

    pub fn threshold(&self) -> Option<f64> {
        match self {
            FieldMatcher::Phone | FieldMatcher::Website => None,
            FieldMatcher::Reference { threshold } | FieldMatcher::Address { threshold } => {
                Some(*threshold)
            }
        }
    }

    /// Whether a single record carries what this matcher needs.
    pub fn applies(&self, record: &Restaurant) -> bool {
        match self {
            FieldMatcher::Phone => record.phone().is_some(),
            FieldMatcher::Website => record.website().is_some(),
            FieldMatcher::Reference { .. } => record.reference().is_some(),
            FieldMatcher::Address { .. } => record
                .address
                .as_ref()
                .is_some_and(|a| a.street().is_some() && a.city().is_some() && a.zip().is_some()),
        }
    }

    /// Raw similarity between the two records, `None` when inapplicable.
    ///
    /// Phone and website score 1.0 or 0.0. Address scores the weakest of its
    /// three parts, so "all parts above threshold" is "score above threshold".
    pub fn score(&self, driving: &Restaurant, candidate: &Restaurant) -> Option<f64> {
        match self {
            FieldMatcher::Phone => {
                driving.phone()?;
                let c = candidate.phone()?;
                Some(indicator(driving.phones().any(|d| c.contains(d))))
            }
            FieldMatcher::Website => {
                let (d, c) = (driving.website()?, candidate.website()?);
                Some(indicator(d == c))
            }
            FieldMatcher::Reference { .. } => {
                let (d, c) = (driving.reference()?, candidate.reference()?);
                Some(jaccard(&token_set(d), &token_set(c)))
            }
            FieldMatcher::Address { .. } => {
                let (d, c) = (driving.address.as_ref()?, candidate.address.as_ref()?);
                let street = edit_similarity(d.street()?, c.street()?);
                let city = edit_similarity(d.city()?, c.city()?);
                let zip = edit_similarity(d.zip()?, c.zip()?);
                Some(street.min(city).min(zip))
            }
        }
    }

    fn accepts(&self, score: f64) -> bool {
        match self {
            FieldMatcher::Phone | FieldMatcher::Website => score >= 1.0,
            FieldMatcher::Reference { threshold } | FieldMatcher::Address { threshold } => {
                score > *threshold
            }
        }
    }

    pub fn compare(&self, driving: &Restaurant, candidate: &Restaurant) -> Outcome {
        match self.score(driving, candidate) {
            None => Outcome::Inapplicable,
            Some(score) if self.accepts(score) => Outcome::Match,
            Some(_) => Outcome::NoMatch,
        }
    }

    pub fn matches(&self, driving: &Restaurant, candidate: &Restaurant) -> bool {
        self.compare(driving, candidate) == Outcome::Match
    }
}

fn indicator(hit: bool) -> f64 {
    if hit {
        1.0
    } else {
        0.0
    }
}

/// The four matchers with their configured thresholds.
#[derive(Debug, Clone, PartialEq)]
pub struct MatcherRegistry {
    phone: FieldMatcher,
    website: FieldMatcher,
    reference: FieldMatcher,
    address: FieldMatcher,
}

impl MatcherRegistry {
    pub fn new(reference_threshold: f64, address_threshold: f64) -> Self {
        MatcherRegistry {
            phone: FieldMatcher::Phone,
            website: FieldMatcher::Website,
            reference: FieldMatcher::Reference {
                threshold: reference_threshold,
            },
            address: FieldMatcher::Address {
                threshold: address_threshold,
            },
        }
    }

    pub fn get(&self, kind: MatcherKind) -> &FieldMatcher {
        match kind {
            MatcherKind::Phone => &self.phone,
            MatcherKind::Website => &self.website,
            MatcherKind::Reference => &self.reference,
            MatcherKind::Address => &self.address,
        }
    }

    /// Matchers in chain priority order.
    pub fn chain(&self) -> impl Iterator<Item = &FieldMatcher> {
        MatcherKind::CHAIN.into_iter().map(move |k| self.get(k))
    }
}

impl Default for MatcherRegistry {
    fn default() -> Self {
        MatcherRegistry::new(DEFAULT_REFERENCE_THRESHOLD, DEFAULT_ADDRESS_THRESHOLD)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> MatcherRegistry {
        MatcherRegistry::default()
    }

    #[test]
    fn phone_containment_is_directional() {
        let m = registry();
        let phone = m.get(MatcherKind::Phone);
        let full = Restaurant::new("a").with_phone("+33 1 42 60 00 00");
        let partial = Restaurant::new("b").with_phone("42 60 00 00");
        assert_eq!(phone.compare(&partial, &full), Outcome::Match);
        assert_eq!(phone.compare(&full, &partial), Outcome::NoMatch);
    }

    #[test]
    fn phone_any_driving_number_matches() {
        let m = registry();
        let phone = m.get(MatcherKind::Phone);
        let single = Restaurant::new("a").with_phone("+33 1 42 60 00 00");
        let several = Restaurant::new("b").with_phone("+33 6 11 22 33 44, +33 1 42 60 00 00");
        let other = Restaurant::new("c").with_phone("+33 4 78 00 00 03");
        assert_eq!(phone.compare(&several, &single), Outcome::Match);
        assert_eq!(phone.compare(&single, &several), Outcome::Match);
        assert_eq!(phone.compare(&several, &other), Outcome::NoMatch);
    }

    #[test]
    fn phone_missing_is_inapplicable() {
        let m = registry();
        let with = Restaurant::new("a").with_phone("+33 1");
        let without = Restaurant::new("b");
        let empty = Restaurant::new("c").with_phone("");
        let phone = m.get(MatcherKind::Phone);
        assert_eq!(phone.compare(&with, &without), Outcome::Inapplicable);
        assert_eq!(phone.compare(&without, &with), Outcome::Inapplicable);
        assert_eq!(phone.compare(&empty, &with), Outcome::Inapplicable);
        assert!(!phone.applies(&empty));
    }

    #[test]
    fn website_exact_case_sensitive() {
        let m = registry();
        let w = m.get(MatcherKind::Website);
        let a = Restaurant::new("a").with_website("https://bistro.fr");
        let b = Restaurant::new("b").with_website("https://bistro.fr");
        let c = Restaurant::new("c").with_website("https://Bistro.fr");
        assert!(w.matches(&a, &b));
        assert_eq!(w.compare(&a, &c), Outcome::NoMatch);
    }

    #[test]
    fn reference_same_tokens_any_order() {
        let m = registry();
        let a = Restaurant::new("a").with_reference("le-petit-bistro");
        let b = Restaurant::new("b").with_reference("petit-bistro-le");
        let r = m.get(MatcherKind::Reference);
        assert_eq!(r.score(&a, &b), Some(1.0));
        assert!(r.matches(&a, &b));
    }

    #[test]
    fn reference_disjoint_no_match() {
        let m = registry();
        let a = Restaurant::new("a").with_reference("chez-paul");
        let b = Restaurant::new("b").with_reference("la-tour-d-argent");
        assert_eq!(m.get(MatcherKind::Reference).compare(&a, &b), Outcome::NoMatch);
    }

    #[test]
    fn reference_threshold_is_strict() {
        let m = registry();
        // 7 shared tokens out of 10 distinct: exactly 0.7
        let a = Restaurant::new("a").with_reference("a-b-c-d-e-f-g-x-y-z");
        let b = Restaurant::new("b").with_reference("a-b-c-d-e-f-g");
        let r = m.get(MatcherKind::Reference);
        assert_eq!(r.score(&a, &b), Some(0.7));
        assert_eq!(r.compare(&a, &b), Outcome::NoMatch);

        // 8 out of 10 clears it
        let c = Restaurant::new("c").with_reference("a-b-c-d-e-f-g-x");
        assert_eq!(r.compare(&a, &c), Outcome::Match);
    }

    #[test]
    fn reference_of_only_hyphens_never_matches() {
        let m = registry();
        let a = Restaurant::new("a").with_reference("--");
        let b = Restaurant::new("b").with_reference("-");
        assert_eq!(m.get(MatcherKind::Reference).compare(&a, &b), Outcome::NoMatch);
    }

    #[test]
    fn address_requires_all_three_parts() {
        let m = registry();
        let addr = m.get(MatcherKind::Address);
        let a = Restaurant::new("a").with_address("15 rue Cassette", "Paris", "75006");
        let b = Restaurant::new("b").with_address("15 rue Cassette", "Paris", "75016");
        // street and city identical, zip only 0.8 similar
        assert_eq!(addr.compare(&a, &b), Outcome::NoMatch);

        let c = Restaurant::new("c").with_address("15 rue Cassette", "Paris", "75006");
        assert_eq!(addr.compare(&a, &c), Outcome::Match);
    }

    #[test]
    fn address_tolerates_small_typos() {
        let m = registry();
        let a = Restaurant::new("a").with_address("15 rue de la Cassette", "Paris", "75006");
        let b = Restaurant::new("b").with_address("15 rue de la Casette", "Paris", "75006");
        assert!(m.get(MatcherKind::Address).matches(&a, &b));
    }

    #[test]
    fn address_ignores_country() {
        let m = registry();
        let mut a = Restaurant::new("a").with_address("1 place X", "Lyon", "69001");
        let mut b = a.clone();
        a.address.as_mut().unwrap().country = Some("France".into());
        b.address.as_mut().unwrap().country = Some("FR".into());
        assert!(m.get(MatcherKind::Address).matches(&a, &b));
    }

    #[test]
    fn address_partial_is_inapplicable() {
        let m = registry();
        let a = Restaurant::new("a").with_address("1 place X", "Lyon", "");
        let b = Restaurant::new("b").with_address("1 place X", "Lyon", "69001");
        assert_eq!(m.get(MatcherKind::Address).compare(&a, &b), Outcome::Inapplicable);
    }

    #[test]
    fn chain_order() {
        let m = registry();
        let kinds: Vec<_> = m.chain().map(|f| f.kind()).collect();
        assert_eq!(kinds, MatcherKind::CHAIN.to_vec());
    }

    #[test]
    fn custom_thresholds() {
        let m = MatcherRegistry::new(0.4, 0.5);
        assert_eq!(m.get(MatcherKind::Reference).threshold(), Some(0.4));
        assert_eq!(m.get(MatcherKind::Address).threshold(), Some(0.5));
        assert_eq!(m.get(MatcherKind::Phone).threshold(), None);
        let a = Restaurant::new("a").with_reference("a-b-c");
        let b = Restaurant::new("b").with_reference("a-b-d");
        assert!(m.get(MatcherKind::Reference).matches(&a, &b));
    }
}
