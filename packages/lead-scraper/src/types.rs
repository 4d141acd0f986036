//! Core data types: raw scraped records, qualified leads, dedup
//! identity, and session bookkeeping.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

/// Placeholder for listing fields absent from the markup.
pub const UNKNOWN_FIELD: &str = "Unknown";

/// Placeholder for a missing phone number.
pub const MISSING_PHONE: &str = "N/A";

// ============================================================================
// RAW RECORDS (ephemeral, produced by the extractor)
// ============================================================================

/// One candidate business listing pulled off a rendered page.
///
/// Always shape-complete: missing sub-fields carry placeholders so
/// downstream stages never deal with absent fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRecord {
    pub name: String,
    pub phone: String,
    pub address: String,
    pub source_url: String,
}

impl RawRecord {
    /// Whether a real phone number was scraped (not the placeholder).
    pub fn has_phone(&self) -> bool {
        self.phone != MISSING_PHONE && !self.phone.trim().is_empty()
    }
}

// ============================================================================
// QUALIFIED LEADS (persisted)
// ============================================================================

/// Lead lifecycle status. Creation through the gate is always
/// `Uncontacted`; every later transition belongs to the CRUD layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeadStatus {
    Uncontacted,
    Contacted,
    Qualified,
    Converted,
    Rejected,
}

impl LeadStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LeadStatus::Uncontacted => "uncontacted",
            LeadStatus::Contacted => "contacted",
            LeadStatus::Qualified => "qualified",
            LeadStatus::Converted => "converted",
            LeadStatus::Rejected => "rejected",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "uncontacted" => Some(LeadStatus::Uncontacted),
            "contacted" => Some(LeadStatus::Contacted),
            "qualified" => Some(LeadStatus::Qualified),
            "converted" => Some(LeadStatus::Converted),
            "rejected" => Some(LeadStatus::Rejected),
            _ => None,
        }
    }
}

/// A lead that passed intent qualification and the dedup gate.
///
/// Raw phone numbers are never persisted; only `phone_hash` leaves
/// the scrape pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QualifiedLead {
    pub id: Uuid,
    pub name: String,
    pub phone_hash: Option<String>,
    pub address: String,
    pub source: String,
    pub keywords: Vec<String>,
    pub status: LeadStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Insert payload for the lead store. Built only by the dedup gate,
/// which is the single write path into the store from this core.
#[derive(Debug, Clone)]
pub struct NewLead {
    pub id: Uuid,
    pub name: String,
    pub phone_hash: Option<String>,
    pub address: String,
    pub source: String,
    pub keywords: Vec<String>,
    pub status: LeadStatus,
    pub identity_key: String,
}

// ============================================================================
// DEDUP IDENTITY
// ============================================================================

/// The tuple deciding whether two records refer to the same physical
/// lead: `(phone_hash, normalized_address)` when a real phone was
/// scraped, `(normalized_name, normalized_address)` otherwise.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum LeadIdentity {
    Phone {
        phone_hash: String,
        address: String,
    },
    NameAddress {
        name: String,
        address: String,
    },
}

impl LeadIdentity {
    /// Derive the identity for a raw record.
    pub fn of(record: &RawRecord) -> Self {
        let address = normalize_text(&record.address);
        if record.has_phone() {
            Self::Phone {
                phone_hash: hash_phone(&record.phone),
                address,
            }
        } else {
            Self::NameAddress {
                name: normalize_text(&record.name),
                address,
            }
        }
    }

    /// Stable string form, stored in the `identity_key` column so a
    /// single unique index enforces the uniqueness invariant.
    pub fn as_key(&self) -> String {
        match self {
            Self::Phone { phone_hash, address } => format!("p:{}|a:{}", phone_hash, address),
            Self::NameAddress { name, address } => format!("n:{}|a:{}", name, address),
        }
    }
}

/// One-way digest of a phone number. Digits are normalized first so
/// formatting variants ("01 23 45 67 89" vs "0123456789") collide.
pub fn hash_phone(phone: &str) -> String {
    let digits: String = phone.chars().filter(|c| c.is_ascii_digit()).collect();
    let mut hasher = Sha256::new();
    hasher.update(digits.as_bytes());
    hex::encode(hasher.finalize())
}

/// Lowercase, collapse whitespace. Used for address and name halves
/// of the identity key.
pub fn normalize_text(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

// ============================================================================
// SESSIONS
// ============================================================================

/// Validated parameters of one scrape run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScrapeRequest {
    pub keyword: String,
    pub city: String,
    pub max_pages: u32,
}

/// Session state machine states. Terminal states are final; a new
/// start command creates a new session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Idle,
    PolicyCheck,
    Fetching,
    Extracting,
    Classifying,
    Persisting,
    Completed,
    Cancelled,
    Failed,
}

impl SessionState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SessionState::Completed | SessionState::Cancelled | SessionState::Failed
        )
    }
}

/// Counters accumulated over one session, reported with status events.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct SessionStats {
    pub pages_visited: u32,
    pub pages_skipped: u32,
    pub records_seen: u32,
    pub records_qualified: u32,
    pub duplicates_skipped: u32,
    pub classifier_failures: u32,
    pub commit_failures: u32,
}

/// Cached per-host crawl policy decision. At most one robots.txt
/// fetch per host per session.
#[derive(Debug, Clone)]
pub struct CrawlDecision {
    pub host: String,
    pub allowed: bool,
    pub checked_at: DateTime<Utc>,
}

/// A rendered page as returned by the browser driver.
#[derive(Debug, Clone)]
pub struct RenderedPage {
    pub url: String,
    pub html: String,
}
