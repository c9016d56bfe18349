//! NCM code handling: normalisation, monophasic heading extraction and
//! restriction-list matching.

use std::collections::BTreeSet;

use regex::Regex;

use crate::PricingError;
use crate::config::ConfigError;
use crate::models::NcmRestrictionSet;

const NCM_SEPARATORS: [char; 3] = ['.', '-', ' '];

/// Drops the `.`, `-` and space separators NCM codes are written with.
pub(crate) fn strip_separators(raw: &str) -> String {
    raw.trim()
        .chars()
        .filter(|c| !NCM_SEPARATORS.contains(c))
        .collect()
}

/// Normalises an NCM code to its bare digits (`"8471.30.12"` → `"84713012"`).
///
/// # Errors
///
/// - [`PricingError::MissingField`] when the code is blank
/// - [`PricingError::InvalidType`] when it has non-digits or fewer than 4 /
///   more than 8 digits
pub fn normalize_ncm(
    field: &str,
    raw: &str,
) -> Result<String, PricingError> {
    let digits = strip_separators(raw);
    if digits.is_empty() {
        return Err(PricingError::MissingField(field.to_string()));
    }
    if !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err(PricingError::invalid(
            field,
            format!("NCM '{raw}' must contain only digits"),
        ));
    }
    if !(4..=8).contains(&digits.len()) {
        return Err(PricingError::invalid(
            field,
            format!("NCM '{raw}' must have between 4 and 8 digits"),
        ));
    }
    Ok(digits)
}

/// The 4-digit heading (posição) of a normalised NCM.
pub fn ncm_heading(ncm: &str) -> &str {
    &ncm[..ncm.len().min(4)]
}

/// Compiles a wildcard pattern (`*` = any run of characters) into an anchored
/// regular expression.
///
/// `8471*` becomes a prefix match, `*3012` a suffix match and `*30*` a
/// substring match.
pub fn wildcard_regex(pattern: &str) -> Result<Regex, regex::Error> {
    let body = pattern
        .split('*')
        .map(regex::escape)
        .collect::<Vec<_>>()
        .join(".*");
    Regex::new(&format!("^{body}$"))
}

#[derive(Debug, Clone)]
struct WildcardPattern {
    source: String,
    regex: Regex,
}

/// Compiled negative list of one incentive program.
#[derive(Debug, Clone, Default)]
pub struct NcmMatcher {
    exact: BTreeSet<String>,
    patterns: Vec<WildcardPattern>,
}

impl NcmMatcher {
    /// Compiles a program's restriction set.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidPattern`] when an entry is blank or
    /// contains characters other than digits and `*`.
    pub fn compile(set: &NcmRestrictionSet) -> Result<Self, ConfigError> {
        let invalid = |entry: &String, reason: String| ConfigError::InvalidPattern {
            program: set.program_code.clone(),
            pattern: entry.clone(),
            reason,
        };

        let mut exact = BTreeSet::new();
        for entry in &set.exact {
            let ncm = strip_separators(entry);
            if ncm.is_empty() || !ncm.chars().all(|c| c.is_ascii_digit()) {
                return Err(invalid(entry, "exact entries must be digits".to_string()));
            }
            exact.insert(ncm);
        }

        let mut patterns = Vec::with_capacity(set.patterns.len());
        for entry in &set.patterns {
            let source = strip_separators(entry);
            if source.is_empty() || !source.chars().all(|c| c.is_ascii_digit() || c == '*') {
                return Err(invalid(
                    entry,
                    "patterns may only contain digits and '*'".to_string(),
                ));
            }
            let regex = wildcard_regex(&source).map_err(|e| invalid(entry, e.to_string()))?;
            patterns.push(WildcardPattern { source, regex });
        }

        Ok(Self { exact, patterns })
    }

    pub fn is_empty(&self) -> bool {
        self.exact.is_empty() && self.patterns.is_empty()
    }

    /// Whether `ncm` (normalised) is on the exact-match list.
    pub fn matches_exact(
        &self,
        ncm: &str,
    ) -> bool {
        self.exact.contains(ncm)
    }

    /// The first wildcard pattern matching `ncm` (normalised), if any.
    pub fn matching_pattern(
        &self,
        ncm: &str,
    ) -> Option<&str> {
        self.patterns
            .iter()
            .find(|p| p.regex.is_match(ncm))
            .map(|p| p.source.as_str())
    }

    pub fn is_restricted(
        &self,
        ncm: &str,
    ) -> bool {
        self.matches_exact(ncm) || self.matching_pattern(ncm).is_some()
    }
}
