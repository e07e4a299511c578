// ==========================================
// Transformer Dispatch - team model
// ==========================================
// A team owns dispatches (team_id) and contributes its code to the
// document-number suffix of provisional and lab paperwork.
// ==========================================

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Team {
    pub id: String,
    /// Short code, stored upper-cased (e.g. "ĐTB")
    pub code: String,
    pub name: String,
    pub created_at: NaiveDateTime,
}

/// Normalise a team code the way it is stored
pub fn normalize_team_code(code: &str) -> String {
    code.trim().to_uppercase()
}
