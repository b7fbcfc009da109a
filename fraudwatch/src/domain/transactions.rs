use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use super::null_as_default;

/// Mail domain used to derive the default alert recipient of a card holder.
pub const ALERT_EMAIL_DOMAIN: &str = "anomalyse.bank";

/// Naive layouts the backend and the CSV imports emit, read as UTC.
const NAIVE_LAYOUTS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

/// Domain model for a card transaction as returned by the backend.
///
/// `user_id` and `timestamp` are optional on the wire: records missing
/// either one are still accepted here and only rejected when ordering.
///
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct Transaction {
    #[serde(default, deserialize_with = "null_as_default")]
    pub id: String,
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub amount: f64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub city: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub category: String,
    #[serde(rename = "riskScore", default, skip_serializing_if = "Option::is_none")]
    pub risk_score: Option<f64>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub status: Status,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flag_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flag_reason: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub flags: Vec<Flag>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub notification_sent: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_since_last_txn: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distance_km: Option<f64>,
}

/// A single rule hit explaining why a transaction was flagged.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct Flag {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub reason: String,
}

impl Transaction {
    /// Creates a simple mock transaction with random values.
    ///
    /// Used by the `demo` command and by tests that need bulk data.
    ///
    pub fn simple_mock() -> Self {
        let risk = rand::random_range(0.0..100.0_f64);
        let tier = RiskTier::from_score(risk);
        Self {
            id: uuid::Uuid::new_v4().to_string().replace("-", ""),
            timestamp: Some(
                (Utc::now() - chrono::Duration::seconds(rand::random_range(0..10_000_000)))
                    .to_rfc3339(),
            ),
            user_id: Some(format!("user_{}", rand::random_range(0..100))),
            amount: (rand::random::<u64>() % 1_000_000) as f64 / 100.0,
            city: "San Francisco".to_string(),
            category: "Grocery".to_string(),
            risk_score: Some(risk),
            status: match tier {
                RiskTier::High => Status::Suspicious,
                RiskTier::Medium => Status::ReviewRequired,
                RiskTier::Low => Status::Safe,
            },
            flag_type: None,
            flag_reason: None,
            flags: Vec::new(),
            notification_sent: false,
            time_since_last_txn: None,
            distance_km: None,
        }
    }

    pub fn user_id(&self) -> &str {
        self.user_id.as_deref().unwrap_or_default()
    }

    pub fn timestamp(&self) -> &str {
        self.timestamp.as_deref().unwrap_or_default()
    }

    /// The timestamp as an absolute instant, if it parses.
    pub fn instant(&self) -> Option<DateTime<Utc>> {
        self.timestamp.as_deref().and_then(parse_timestamp)
    }

    pub fn risk_tier(&self) -> Option<RiskTier> {
        self.risk_score.map(RiskTier::from_score)
    }

    /// Shortened id for table display, e.g. `3f2a9c...e81b`.
    pub fn short_id(&self) -> String {
        if self.id.chars().count() <= 12 {
            return self.id.clone();
        }
        let head: String = self.id.chars().take(6).collect();
        let tail: String = self
            .id
            .chars()
            .rev()
            .take(4)
            .collect::<Vec<_>>()
            .into_iter()
            .rev()
            .collect();
        format!("{head}...{tail}")
    }

    /// Recipient suggested when raising an alert for this transaction.
    pub fn default_alert_recipient(&self) -> String {
        format!("user{}@{}", self.user_id(), ALERT_EMAIL_DOMAIN)
    }

    /// Case-insensitive match against id, user id and city.
    pub fn matches(&self, term: &str) -> bool {
        let term = term.to_lowercase();
        self.id.to_lowercase().contains(&term)
            || self.user_id().to_lowercase().contains(&term)
            || self.city.to_lowercase().contains(&term)
    }
}

/// Parses a backend timestamp into an absolute instant.
///
/// Accepts RFC 3339, naive ISO-8601 with either `T` or a space as separator
/// (read as UTC) and bare dates (UTC midnight).
///
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(&Utc));
    }
    for layout in NAIVE_LAYOUTS {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(raw, layout) {
            return Some(parsed.and_utc());
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|parsed| parsed.and_utc())
}

/// Review status of a transaction.
///
/// The backend and older clients used several spellings for the same state
/// (`Fake/Suspicious`, `Review`); they all collapse into one variant here.
/// Anything unrecognised is kept verbatim in `Unknown`.
///
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq, Hash)]
#[serde(from = "String", into = "String")]
pub enum Status {
    Safe,
    Suspicious,
    ReviewRequired,
    Approved,
    ConfirmedFraud,
    Escalated,
    Unknown(String),
}

impl Status {
    pub fn label(&self) -> &str {
        match self {
            Self::Safe => "Safe",
            Self::Suspicious => "Suspicious",
            Self::ReviewRequired => "Review Required",
            Self::Approved => "Approved",
            Self::ConfirmedFraud => "Confirmed Fraud",
            Self::Escalated => "Escalated",
            Self::Unknown(raw) => raw,
        }
    }

    /// True for the states that belong in the fraud queue.
    pub fn is_fraud(&self) -> bool {
        matches!(self, Self::Suspicious | Self::ConfirmedFraud)
    }
}

impl Default for Status {
    fn default() -> Self {
        Self::Unknown(String::new())
    }
}

impl From<String> for Status {
    fn from(raw: String) -> Self {
        match raw.trim() {
            "Safe" => Self::Safe,
            "Suspicious" | "Fake/Suspicious" => Self::Suspicious,
            "Review" | "Review Required" => Self::ReviewRequired,
            "Approved" => Self::Approved,
            "Confirmed Fraud" => Self::ConfirmedFraud,
            "Escalated" => Self::Escalated,
            _ => Self::Unknown(raw),
        }
    }
}

impl From<Status> for String {
    fn from(status: Status) -> Self {
        match status {
            Status::Unknown(raw) => raw,
            other => other.label().to_string(),
        }
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.label())
    }
}

/// Display tier derived from a 0-100 risk score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RiskTier {
    Low,
    Medium,
    High,
}

impl RiskTier {
    pub const HIGH_ABOVE: f64 = 70.0;
    pub const MEDIUM_ABOVE: f64 = 40.0;

    pub fn from_score(score: f64) -> Self {
        if !score.is_finite() {
            return Self::Low;
        }
        if score > Self::HIGH_ABOVE {
            Self::High
        } else if score > Self::MEDIUM_ABOVE {
            Self::Medium
        } else {
            Self::Low
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::High => "Fake / Suspicious",
            Self::Medium => "Review Required",
            Self::Low => "Safe",
        }
    }
}
