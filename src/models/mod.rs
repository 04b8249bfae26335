mod job;

pub use job::{JobId, JobRequest, JobStatus, ScrapeJob};

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Identifier assigned by the record store
pub type PropertyId = u64;

/// Source of the property listing
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    Rightmove,
    OnTheMarket,
    Zoopla,
}

impl Source {
    pub const ALL: [Source; 3] = [Source::Rightmove, Source::OnTheMarket, Source::Zoopla];

    pub fn as_str(&self) -> &'static str {
        match self {
            Source::Rightmove => "rightmove",
            Source::OnTheMarket => "onthemarket",
            Source::Zoopla => "zoopla",
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Source {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Source::ALL
            .into_iter()
            .find(|source| source.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown source: {s}"))
    }
}

/// Field values pulled from a rendered listing before normalization.
///
/// Every field is independently optional; a rule that finds nothing leaves
/// its field empty.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawFieldBag {
    pub address: Option<String>,
    pub price: Option<String>,
    pub bedrooms: Option<String>,
    pub bathrooms: Option<String>,
    pub size: Option<String>,
    pub house_type: Option<String>,
    pub agent: Option<String>,
    pub description: Option<String>,
    pub features: Vec<String>,
    pub images: Vec<String>,
    pub floorplans: Vec<String>,
}

/// Canonical property record, unique by `url`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyRecord {
    pub source: Source,
    pub url: String,
    pub address: String,
    pub price: Decimal,
    pub bedrooms: Option<u32>,
    pub bathrooms: Option<u32>,
    pub size: Option<String>,
    pub house_type: Option<String>,
    pub agent: Option<String>,
    pub description: Option<String>,
    pub features: Vec<String>,
    pub images: Vec<String>,
    pub floorplans: Vec<String>,
}

/// A record as held by the store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredProperty {
    pub id: PropertyId,
    #[serde(flatten)]
    pub record: PropertyRecord,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
