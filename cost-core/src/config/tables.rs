//! Validated, lookup-ready forms of the configuration tables.

use std::collections::{BTreeMap, BTreeSet};

use rust_decimal::Decimal;

use super::ConfigError;
use crate::calculations::ncm::{NcmMatcher, ncm_heading, strip_separators};
use crate::models::{IncentiveProgram, NcmRestrictionSet, ReformEntry};

/// Set of 4-digit NCM headings whose goods are taxed monophasically.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MonophasicTable {
    headings: BTreeSet<String>,
}

impl MonophasicTable {
    /// Builds the table from heading strings such as `"3004"` or `"30.04"`.
    /// Separators are dropped the same way as for full NCM codes.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidMonophasicPrefix`] for anything that is
    /// not exactly four digits.
    pub fn new<I, S>(prefixes: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut headings = BTreeSet::new();
        for prefix in prefixes {
            let raw = prefix.as_ref();
            let heading = strip_separators(raw);
            if heading.len() != 4 || !heading.chars().all(|c| c.is_ascii_digit()) {
                return Err(ConfigError::InvalidMonophasicPrefix(raw.to_string()));
            }
            headings.insert(heading);
        }
        Ok(Self { headings })
    }

    /// Whether the heading of `ncm` (normalised) is monophasic.
    pub fn contains_heading(
        &self,
        ncm: &str,
    ) -> bool {
        self.headings.contains(ncm_heading(ncm))
    }

    pub fn len(&self) -> usize {
        self.headings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.headings.is_empty()
    }
}

/// A program together with its compiled NCM negative list.
#[derive(Debug, Clone)]
pub struct RegisteredProgram {
    pub program: IncentiveProgram,
    pub restrictions: NcmMatcher,
}

/// All incentive programs, keyed by code.
#[derive(Debug, Clone, Default)]
pub struct ProgramRegistry {
    programs: BTreeMap<String, RegisteredProgram>,
}

impl ProgramRegistry {
    /// Validates the programs and attaches their restriction lists.
    ///
    /// Several restriction sets may target the same program; their entries
    /// are merged.
    ///
    /// # Errors
    ///
    /// - [`ConfigError::InvalidProgram`] when a definition fails validation
    /// - [`ConfigError::DuplicateProgram`] for repeated codes
    /// - [`ConfigError::UnknownRestrictionProgram`] for restrictions on
    ///   undefined programs
    /// - [`ConfigError::InvalidPattern`] for malformed restriction entries
    pub fn new(
        programs: Vec<IncentiveProgram>,
        restrictions: Vec<NcmRestrictionSet>,
    ) -> Result<Self, ConfigError> {
        let mut merged: BTreeMap<String, NcmRestrictionSet> = BTreeMap::new();
        for set in restrictions {
            let entry = merged
                .entry(set.program_code.clone())
                .or_insert_with(|| NcmRestrictionSet {
                    program_code: set.program_code.clone(),
                    ..Default::default()
                });
            entry.exact.extend(set.exact);
            entry.patterns.extend(set.patterns);
        }

        let mut registry = BTreeMap::new();
        for mut program in programs {
            program.validate().map_err(|e| ConfigError::InvalidProgram {
                code: program.code.clone(),
                reason: e.to_string(),
            })?;
            for state in &mut program.eligible_states {
                *state = state.trim().to_ascii_uppercase();
            }
            if registry.contains_key(&program.code) {
                return Err(ConfigError::DuplicateProgram(program.code));
            }
            let restrictions = match merged.remove(&program.code) {
                Some(set) => NcmMatcher::compile(&set)?,
                None => NcmMatcher::default(),
            };
            registry.insert(
                program.code.clone(),
                RegisteredProgram {
                    program,
                    restrictions,
                },
            );
        }

        if let Some(code) = merged.into_keys().next() {
            return Err(ConfigError::UnknownRestrictionProgram(code));
        }

        Ok(Self { programs: registry })
    }

    pub fn get(
        &self,
        code: &str,
    ) -> Option<&RegisteredProgram> {
        self.programs.get(code)
    }

    /// Codes of every program available in `state`, sorted.
    pub fn codes_for_state(
        &self,
        state: &str,
    ) -> Vec<String> {
        self.programs
            .values()
            .filter(|p| p.program.covers_state(state))
            .map(|p| p.program.code.clone())
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &RegisteredProgram> {
        self.programs.values()
    }

    pub fn len(&self) -> usize {
        self.programs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.programs.is_empty()
    }
}

/// Year-indexed tax-reform transition schedule.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReformSchedule {
    entries: BTreeMap<i32, ReformEntry>,
}

impl ReformSchedule {
    /// # Errors
    ///
    /// - [`ConfigError::InvalidReformEntry`] when `retained` is outside [0, 1]
    /// - [`ConfigError::DuplicateReformYear`] for repeated years
    pub fn new(entries: Vec<ReformEntry>) -> Result<Self, ConfigError> {
        let mut by_year = BTreeMap::new();
        for entry in entries {
            if entry.retained < Decimal::ZERO || entry.retained > Decimal::ONE {
                return Err(ConfigError::InvalidReformEntry {
                    year: entry.year,
                    reason: format!("retained must be between 0 and 1, got {}", entry.retained),
                });
            }
            if by_year.contains_key(&entry.year) {
                return Err(ConfigError::DuplicateReformYear(entry.year));
            }
            by_year.insert(entry.year, entry);
        }
        Ok(Self { entries: by_year })
    }

    pub fn get(
        &self,
        year: i32,
    ) -> Option<&ReformEntry> {
        self.entries.get(&year)
    }

    pub fn first_year(&self) -> Option<i32> {
        self.entries.keys().next().copied()
    }

    /// Last configured year; benefits are extinguished after it.
    pub fn terminal_year(&self) -> Option<i32> {
        self.entries.keys().next_back().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ReformEntry> {
        self.entries.values()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    use super::*;
    use crate::models::{BenefitPhase, BenefitType};

    fn program(
        code: &str,
        states: &[&str],
    ) -> IncentiveProgram {
        IncentiveProgram {
            code: code.to_string(),
            name: code.to_string(),
            eligible_states: states.iter().map(|s| s.to_string()).collect(),
            benefit_type: BenefitType::PartialDeferral,
            booking_rate: dec!(0.04),
            calculation_rate: Some(dec!(0.04)),
            phases: vec![BenefitPhase {
                label: "Fase 1".to_string(),
                anticipation_rate: dec!(0.026),
            }],
            nf_config: None,
        }
    }

    fn restriction(code: &str) -> NcmRestrictionSet {
        NcmRestrictionSet {
            program_code: code.to_string(),
            exact: vec!["22030000".to_string()],
            patterns: Vec::new(),
        }
    }

    // =========================================================================
    // MonophasicTable tests
    // =========================================================================

    #[test]
    fn monophasic_table_accepts_dotted_headings() {
        let table = MonophasicTable::new(["30.04", "3303"]).expect("valid headings");

        assert_eq!(table.len(), 2);
        assert!(table.contains_heading("30049099"));
        assert!(table.contains_heading("33030010"));
        assert!(!table.contains_heading("84713012"));
    }

    #[test]
    fn monophasic_table_accepts_any_ncm_separator() {
        let table = MonophasicTable::new(["30 04", "30-04", " 33.03 "]).expect("valid headings");

        assert_eq!(table.len(), 2);
        assert!(table.contains_heading("30049099"));
        assert!(table.contains_heading("33030010"));
    }

    #[test]
    fn monophasic_table_rejects_six_digit_prefix() {
        assert_eq!(
            MonophasicTable::new(["300490"]),
            Err(ConfigError::InvalidMonophasicPrefix("300490".to_string()))
        );
    }

    // =========================================================================
    // ProgramRegistry tests
    // =========================================================================

    #[test]
    fn registry_normalises_state_codes() {
        let registry =
            ProgramRegistry::new(vec![program("TTD_409", &[" sc "])], Vec::new()).unwrap();

        assert_eq!(registry.codes_for_state("SC"), vec!["TTD_409".to_string()]);
    }

    #[test]
    fn registry_rejects_duplicate_codes() {
        let result = ProgramRegistry::new(
            vec![program("TTD_409", &["SC"]), program("TTD_409", &["SC"])],
            Vec::new(),
        );

        assert!(matches!(result, Err(ConfigError::DuplicateProgram(ref c)) if c == "TTD_409"));
    }

    #[test]
    fn registry_rejects_restrictions_for_unknown_program() {
        let result =
            ProgramRegistry::new(vec![program("TTD_409", &["SC"])], vec![restriction("FUNDAP")]);

        assert!(matches!(
            result,
            Err(ConfigError::UnknownRestrictionProgram(ref c)) if c == "FUNDAP"
        ));
    }

    #[test]
    fn registry_merges_restriction_sets_for_same_program() {
        let second = NcmRestrictionSet {
            program_code: "TTD_409".to_string(),
            exact: Vec::new(),
            patterns: vec!["8703*".to_string()],
        };
        let registry = ProgramRegistry::new(
            vec![program("TTD_409", &["SC"])],
            vec![restriction("TTD_409"), second],
        )
        .unwrap();

        let registered = registry.get("TTD_409").unwrap();
        assert!(registered.restrictions.matches_exact("22030000"));
        assert!(registered.restrictions.is_restricted("87032310"));
    }

    #[test]
    fn registry_reports_invalid_program_definition() {
        let mut broken = program("TTD_409", &["SC"]);
        broken.phases.clear();

        let result = ProgramRegistry::new(vec![broken], Vec::new());

        assert!(matches!(
            result,
            Err(ConfigError::InvalidProgram { ref code, .. }) if code == "TTD_409"
        ));
    }

    // =========================================================================
    // ReformSchedule tests
    // =========================================================================

    #[test]
    fn reform_schedule_reports_first_and_terminal_years() {
        let schedule = ReformSchedule::new(vec![
            ReformEntry {
                year: 2033,
                retained: dec!(0),
                phase_label: "Extinção".to_string(),
            },
            ReformEntry {
                year: 2025,
                retained: dec!(1),
                phase_label: "Vigência plena".to_string(),
            },
        ])
        .unwrap();

        assert_eq!(schedule.first_year(), Some(2025));
        assert_eq!(schedule.terminal_year(), Some(2033));
    }

    #[test]
    fn reform_schedule_rejects_retained_above_one() {
        let result = ReformSchedule::new(vec![ReformEntry {
            year: 2029,
            retained: dec!(1.1),
            phase_label: "Transição".to_string(),
        }]);

        assert!(matches!(
            result,
            Err(ConfigError::InvalidReformEntry { year: 2029, .. })
        ));
    }

    #[test]
    fn reform_schedule_rejects_duplicate_years() {
        let entry = ReformEntry {
            year: 2030,
            retained: dec!(0.8),
            phase_label: "Transição".to_string(),
        };

        assert_eq!(
            ReformSchedule::new(vec![entry.clone(), entry]),
            Err(ConfigError::DuplicateReformYear(2030))
        );
    }
}
