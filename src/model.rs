use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::matcher::MatcherKind;

/// Separator between numbers when a record lists several phones.
pub const PHONE_SEPARATOR: &str = ", ";

/// Postal address as scraped. Any part may be missing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Address {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub street: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub zip: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
}

impl Address {
    pub fn street(&self) -> Option<&str> {
        present(&self.street)
    }

    pub fn city(&self) -> Option<&str> {
        present(&self.city)
    }

    pub fn zip(&self) -> Option<&str> {
        present(&self.zip)
    }
}

/// One restaurant listing from either directory.
///
/// Only the fields used for linkage are typed. Everything else the scraper
/// emitted (services, rating, price, ...) is kept in `extra` and written back
/// unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Restaurant {
    #[serde(default, deserialize_with = "name_field")]
    pub name: String,
    #[serde(
        default,
        deserialize_with = "phone_field",
        skip_serializing_if = "Option::is_none"
    )]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<Address>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Restaurant {
    pub fn new(name: impl Into<String>) -> Self {
        Restaurant {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_phone(mut self, phone: impl Into<String>) -> Self {
        self.phone = Some(phone.into());
        self
    }

    pub fn with_website(mut self, website: impl Into<String>) -> Self {
        self.website = Some(website.into());
        self
    }

    pub fn with_reference(mut self, reference: impl Into<String>) -> Self {
        self.reference = Some(reference.into());
        self
    }

    pub fn with_address(mut self, street: &str, city: &str, zip: &str) -> Self {
        self.address = Some(Address {
            street: Some(street.to_string()),
            city: Some(city.to_string()),
            zip: Some(zip.to_string()),
            country: None,
        });
        self
    }

    pub fn phone(&self) -> Option<&str> {
        present(&self.phone)
    }

    /// Each non-empty number in `phone`.
    pub fn phones(&self) -> impl Iterator<Item = &str> {
        self.phone()
            .into_iter()
            .flat_map(|p| p.split(PHONE_SEPARATOR))
            .map(str::trim)
            .filter(|p| !p.is_empty())
    }

    pub fn website(&self) -> Option<&str> {
        present(&self.website)
    }

    pub fn reference(&self) -> Option<&str> {
        present(&self.reference)
    }
}

/// A hypothesized identity between a driving record and a candidate record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchPair {
    pub driving: Restaurant,
    pub candidate: Restaurant,
    pub matched_by: MatcherKind,
}

/// Empty strings count as missing.
fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

/// Scrapers write `null` for blank text.
fn name_field<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Deserialize)]
#[serde(untagged)]
enum PhoneValue {
    One(String),
    Many(Vec<Option<String>>),
}

/// Accepts `"01 23"`, `["+33 1 23", "+33 4 56"]` or `null`.
/// Lists are joined with `", "` so containment still works on the joined string.
fn phone_field<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<PhoneValue>::deserialize(deserializer)?;
    Ok(match value {
        None => None,
        Some(PhoneValue::One(s)) => Some(s),
        Some(PhoneValue::Many(list)) => {
            let joined = list
                .into_iter()
                .flatten()
                .filter(|p| !p.is_empty())
                .collect::<Vec<_>>()
                .join(PHONE_SEPARATOR);
            if joined.is_empty() {
                None
            } else {
                Some(joined)
            }
        }
    })
}
