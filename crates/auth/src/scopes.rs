//! Consent scopes carried on a caller's claims.

use core::str::FromStr;
use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A purpose-limited grant to view a category of sensitive data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConsentScope {
    DvView,
    LegalView,
    MedicalView,
    HmisExport,
    ResearchView,
    CourtTestimony,
}

impl ConsentScope {
    pub fn as_str(self) -> &'static str {
        match self {
            ConsentScope::DvView => "DV_VIEW",
            ConsentScope::LegalView => "LEGAL_VIEW",
            ConsentScope::MedicalView => "MEDICAL_VIEW",
            ConsentScope::HmisExport => "HMIS_EXPORT",
            ConsentScope::ResearchView => "RESEARCH_VIEW",
            ConsentScope::CourtTestimony => "COURT_TESTIMONY",
        }
    }
}

impl core::fmt::Display for ConsentScope {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unrecognized consent scope '{0}'")]
pub struct UnknownScope(pub String);

impl FromStr for ConsentScope {
    type Err = UnknownScope;

    /// Canonical names only; surrounding whitespace and ASCII case are ignored.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let scope = match s.trim().to_ascii_uppercase().as_str() {
            "DV_VIEW" => ConsentScope::DvView,
            "LEGAL_VIEW" => ConsentScope::LegalView,
            "MEDICAL_VIEW" => ConsentScope::MedicalView,
            "HMIS_EXPORT" => ConsentScope::HmisExport,
            "RESEARCH_VIEW" => ConsentScope::ResearchView,
            "COURT_TESTIMONY" => ConsentScope::CourtTestimony,
            _ => return Err(UnknownScope(s.to_string())),
        };
        Ok(scope)
    }
}

/// Result of parsing raw scope strings: what was understood, and what was not.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedScopes {
    pub scopes: BTreeSet<ConsentScope>,
    pub unrecognized: Vec<String>,
}

/// Parse every raw scope; unknown strings are kept (in input order) for
/// reporting and grant nothing.
pub fn parse_scopes<S>(raw: impl IntoIterator<Item = S>) -> ParsedScopes
where
    S: AsRef<str>,
{
    let mut parsed = ParsedScopes::default();
    for s in raw {
        match s.as_ref().parse::<ConsentScope>() {
            Ok(scope) => {
                parsed.scopes.insert(scope);
            }
            Err(UnknownScope(raw)) => parsed.unrecognized.push(raw),
        }
    }
    parsed
}
