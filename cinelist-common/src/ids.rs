//! Identifier helpers
//!
//! - Internal ids: 6 lowercase hex characters, generated by the committer and
//!   shown to users as `#xxxxxx`
//! - Correlation ids: 8 uppercase hex characters attached to technical errors

use rand::Rng;
use uuid::Uuid;

/// Length of a generated internal id
pub const INTERNAL_ID_LEN: usize = 6;

/// Generate a fresh internal catalog id
pub fn generate_internal_id() -> String {
    let value: u32 = rand::thread_rng().gen_range(0..0x0100_0000);
    format!("{:06x}", value)
}

/// Render an internal id for display: `#` followed by at most 6 characters
pub fn to_short_id(id: &str) -> String {
    let short: String = id.chars().take(INTERNAL_ID_LEN).collect();
    format!("#{}", short)
}

/// Normalize a user-supplied id or id prefix: trims, drops a leading `#`, lowercases
pub fn normalize_id_prefix(raw: &str) -> String {
    raw.trim().trim_start_matches('#').trim().to_lowercase()
}

/// Short correlation id for technical errors
pub fn correlation_id() -> String {
    Uuid::new_v4().simple().to_string()[..8].to_uppercase()
}
