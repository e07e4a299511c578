// ==========================================
// Transformer Dispatch - document-number suffixes
// ==========================================
// OFFICIAL paperwork carries one fixed suffix; PROVISIONAL and lab
// paperwork carry the issuing team's code. The team is always passed
// in by the caller, never read from ambient state.
// ==========================================

use serde::{Deserialize, Serialize};

use crate::domain::types::DocumentKind;

/// Placeholder replaced by the team code inside a suffix template
pub const TEAM_PLACEHOLDER: &str = "{team}";

/// Suffix templates, loaded from configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuffixTemplates {
    pub official: String,
    pub provisional: String,
    pub lab: String,
}

impl Default for SuffixTemplates {
    fn default() -> Self {
        Self {
            official: "/PCĐT-KT+KHVT".to_string(),
            provisional: "/TTr-{team}".to_string(),
            lab: "/{team}-KT".to_string(),
        }
    }
}

impl SuffixTemplates {
    /// Suffix for a document, or None when the template needs a team
    /// and none was given
    pub fn suffix_for(
        &self,
        kind: DocumentKind,
        is_lab_round_trip: bool,
        team_code: Option<&str>,
    ) -> Option<String> {
        let template = if is_lab_round_trip {
            &self.lab
        } else {
            match kind {
                DocumentKind::Official => &self.official,
                DocumentKind::Provisional => &self.provisional,
            }
        };

        if !template.contains(TEAM_PLACEHOLDER) {
            return Some(template.clone());
        }
        let code = team_code.map(str::trim).filter(|c| !c.is_empty())?;
        Some(template.replace(TEAM_PLACEHOLDER, &code.to_uppercase()))
    }

    /// Append the matching suffix to `base` unless it is already there
    pub fn compose(
        &self,
        base: &str,
        kind: DocumentKind,
        is_lab_round_trip: bool,
        team_code: Option<&str>,
    ) -> Option<String> {
        let base = base.trim();
        let suffix = self.suffix_for(kind, is_lab_round_trip, team_code)?;
        if base.ends_with(&suffix) {
            Some(base.to_string())
        } else {
            Some(format!("{}{}", base, suffix))
        }
    }
}
