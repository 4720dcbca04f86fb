// Request and response types for the Secure Connect sites endpoints.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::error::Error;

// ── RegionType ───────────────────────────────────────────────────────

/// Where an enrolled site terminates its tunnels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RegionType {
    /// Cloud Network Hub Edge.
    #[serde(rename = "CNHE")]
    Cnhe,
    /// Cisco-hosted cloud hub.
    #[serde(rename = "CloudHub")]
    CloudHub,
}

impl RegionType {
    /// Wire representation.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Cnhe => "CNHE",
            Self::CloudHub => "CloudHub",
        }
    }
}

impl fmt::Display for RegionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RegionType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "CNHE" => Ok(Self::Cnhe),
            "CloudHub" => Ok(Self::CloudHub),
            other => Err(format!("expected 'CNHE' or 'CloudHub', got '{other}'")),
        }
    }
}

// ── Enrollment requests ──────────────────────────────────────────────

/// One site to enroll. The organization is the path scope, not a field.
///
/// `region_id` and `region_name` are independent; the server decides what
/// their combination means. Empty strings are treated as absent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SiteEnrollment {
    pub site_id: String,
    pub region_type: RegionType,
    #[serde(default, skip_serializing_if = "is_blank")]
    pub region_id: Option<String>,
    #[serde(default, skip_serializing_if = "is_blank")]
    pub region_name: Option<String>,
}

impl SiteEnrollment {
    pub fn new(site_id: impl Into<String>, region_type: RegionType) -> Self {
        Self {
            site_id: site_id.into(),
            region_type,
            region_id: None,
            region_name: None,
        }
    }

    #[must_use]
    pub fn region_id(mut self, region_id: impl Into<String>) -> Self {
        self.region_id = Some(region_id.into());
        self
    }

    #[must_use]
    pub fn region_name(mut self, region_name: impl Into<String>) -> Self {
        self.region_name = Some(region_name.into());
        self
    }
}

#[allow(clippy::ref_option)]
fn is_blank(value: &Option<String>) -> bool {
    value.as_deref().is_none_or(str::is_empty)
}

/// `POST .../secureConnect/sites` body.
#[derive(Debug, Serialize)]
pub(crate) struct EnrollmentBatch<'a> {
    pub enrollments: [&'a SiteEnrollment; 1],
}

/// `DELETE .../secureConnect/sites` body.
#[derive(Debug, Serialize)]
pub(crate) struct RemovalBatch<'a> {
    pub sites: [&'a str; 1],
}

// ── SiteRecord ───────────────────────────────────────────────────────

/// An enrolled site as reported by the list endpoint.
///
/// Only `id` is mandatory. `name` and `region` default when missing so that
/// one sparse record doesn't sink an otherwise valid page. Everything else
/// the server sends lands in `extra`, so nothing is silently dropped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SiteRecord {
    pub id: String,

    #[serde(default)]
    pub name: String,

    /// Region designation. A plain string on most endpoints, an object
    /// (`{"id", "name", "type"}`) on some; see [`SiteRecord::region_label`].
    #[serde(default)]
    pub region: serde_json::Value,

    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl SiteRecord {
    /// Human-readable region, whichever shape the server used.
    pub fn region_label(&self) -> Option<&str> {
        match &self.region {
            serde_json::Value::String(s) if !s.is_empty() => Some(s),
            serde_json::Value::Object(map) => map
                .get("name")
                .or_else(|| map.get("id"))
                .and_then(serde_json::Value::as_str),
            _ => None,
        }
    }
}

// ── Page decoding ────────────────────────────────────────────────────

#[derive(Deserialize)]
struct Wrapped {
    data: Vec<SiteRecord>,
}

/// Which of the two accepted list-page layouts a body matched.
#[derive(Debug, Clone, PartialEq)]
pub enum PageShape {
    /// Documented layout: `{"data": [...], ...}`.
    Wrapped(Vec<SiteRecord>),
    /// Older layout: a bare JSON array.
    Bare(Vec<SiteRecord>),
}

impl PageShape {
    /// Try the wrapped layout first, then the bare array.
    ///
    /// A wrapped body must actually carry `data`; an object without it is
    /// not silently read as an empty page.
    pub fn decode(body: &str) -> Result<Self, Error> {
        match serde_json::from_str::<Wrapped>(body) {
            Ok(wrapped) => return Ok(Self::Wrapped(wrapped.data)),
            Err(e) => trace!(error = %e, "page is not the wrapped layout"),
        }

        match serde_json::from_str::<Vec<SiteRecord>>(body) {
            Ok(records) => Ok(Self::Bare(records)),
            Err(e) => {
                trace!(error = %e, "page is not a bare array either");
                Err(Error::UnexpectedFormat {
                    body: body.to_owned(),
                })
            }
        }
    }

    pub fn records(&self) -> &[SiteRecord] {
        match self {
            Self::Wrapped(records) | Self::Bare(records) => records,
        }
    }

    pub fn into_records(self) -> Vec<SiteRecord> {
        match self {
            Self::Wrapped(records) | Self::Bare(records) => records,
        }
    }
}
