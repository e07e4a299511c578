// ==========================================
// Transformer Dispatch - domain type definitions
// ==========================================
// Stored values are SCREAMING_SNAKE_CASE text, identical to the
// serde representation.
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// Direction
// ==========================================
// INTAKE: units entering custody (received from the warehouse)
// RETURN: units leaving custody (handed back)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Direction {
    Intake,
    Return,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}

impl Direction {
    /// Parse the stored representation; unknown text yields None
    pub fn from_db_str(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "INTAKE" => Some(Direction::Intake),
            "RETURN" => Some(Direction::Return),
            _ => None,
        }
    }

    pub fn to_db_str(&self) -> &'static str {
        match self {
            Direction::Intake => "INTAKE",
            Direction::Return => "RETURN",
        }
    }

    /// The other direction of the custody cycle
    pub fn opposite(&self) -> Self {
        match self {
            Direction::Intake => Direction::Return,
            Direction::Return => Direction::Intake,
        }
    }
}

// ==========================================
// DocumentKind
// ==========================================
// PROVISIONAL paperwork is temporary and later superseded by an
// OFFICIAL document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DocumentKind {
    Official,
    Provisional,
}

impl fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}

impl DocumentKind {
    pub fn from_db_str(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "OFFICIAL" => Some(DocumentKind::Official),
            "PROVISIONAL" => Some(DocumentKind::Provisional),
            _ => None,
        }
    }

    pub fn to_db_str(&self) -> &'static str {
        match self {
            DocumentKind::Official => "OFFICIAL",
            DocumentKind::Provisional => "PROVISIONAL",
        }
    }
}

impl Default for DocumentKind {
    fn default() -> Self {
        DocumentKind::Official
    }
}

// ==========================================
// LabTestResult
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LabTestResult {
    Pass,
    Fail,
}

impl fmt::Display for LabTestResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}

impl LabTestResult {
    pub fn from_db_str(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "PASS" => Some(LabTestResult::Pass),
            "FAIL" => Some(LabTestResult::Fail),
            _ => None,
        }
    }

    pub fn to_db_str(&self) -> &'static str {
        match self {
            LabTestResult::Pass => "PASS",
            LabTestResult::Fail => "FAIL",
        }
    }
}

// ==========================================
// TeamScope
// ==========================================
// Administrative callers see every team; everyone else is restricted to
// their own team id. `All` omits the team predicate entirely, it never
// matches on NULL.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "scope", content = "team_id", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TeamScope {
    All,
    Team(String),
}

impl TeamScope {
    /// Build the scope for a caller
    ///
    /// An administrator always gets `All`. A non-admin caller without a
    /// team is scoped to the empty team id, which matches nothing.
    pub fn for_caller(is_admin: bool, team_id: Option<&str>) -> Self {
        if is_admin {
            TeamScope::All
        } else {
            TeamScope::Team(team_id.unwrap_or_default().to_string())
        }
    }

    pub fn team_id(&self) -> Option<&str> {
        match self {
            TeamScope::All => None,
            TeamScope::Team(id) => Some(id.as_str()),
        }
    }
}

impl Default for TeamScope {
    fn default() -> Self {
        TeamScope::All
    }
}

impl fmt::Display for TeamScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TeamScope::All => write!(f, "ALL"),
            TeamScope::Team(id) => write!(f, "TEAM({})", id),
        }
    }
}
