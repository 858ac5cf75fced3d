// Node Sensor - Node-resident telemetry collector
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Counter kind registry
//!
//! Static bidirectional mapping between counter kind codes and their
//! canonical names. Lookups never fail loudly: out-of-range input yields
//! [`INVALID_KIND_NAME`] or [`INVALID_KIND_CODE`], which callers must check.

use std::fmt;

/// Name returned for an unknown counter kind code
pub const INVALID_KIND_NAME: &str = "[invalid]";

/// Code returned for an unknown counter kind name
pub const INVALID_KIND_CODE: i32 = -1;

/// Canonical names, indexed by code
const KIND_NAMES: [&str; 3] = ["summation", "average", "latest"];

/// How a counter aggregates samples over its collection interval
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(i32)]
pub enum CounterKind {
    /// Sum over the interval
    Summation = 0,
    /// Mean over the interval
    Average = 1,
    /// Last observed value
    Latest = 2,
}

impl CounterKind {
    /// All kinds, in code order
    pub const ALL: [CounterKind; 3] = [Self::Summation, Self::Average, Self::Latest];

    /// Numeric code of this kind
    pub fn code(self) -> i32 {
        self as i32
    }

    /// Canonical name of this kind
    pub fn name(self) -> &'static str {
        KIND_NAMES[self as usize]
    }

    /// Kind for a numeric code
    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            0 => Some(Self::Summation),
            1 => Some(Self::Average),
            2 => Some(Self::Latest),
            _ => None,
        }
    }

    /// Kind for a canonical name (exact match)
    pub fn from_name(name: &str) -> Option<Self> {
        KIND_NAMES
            .iter()
            .position(|n| *n == name)
            .and_then(|i| Self::from_code(i as i32))
    }
}

impl fmt::Display for CounterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Canonical name for a counter kind code, or [`INVALID_KIND_NAME`]
pub fn name_from_kind(code: i32) -> &'static str {
    CounterKind::from_code(code)
        .map(CounterKind::name)
        .unwrap_or(INVALID_KIND_NAME)
}

/// Counter kind code for a canonical name, or [`INVALID_KIND_CODE`]
pub fn kind_from_name(name: &str) -> i32 {
    match CounterKind::from_name(name) {
        Some(kind) => kind.code(),
        None => {
            log::error!("unknown sensor counter kind '{}'", name);
            INVALID_KIND_CODE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mutual_inverse() {
        for kind in CounterKind::ALL {
            let name = name_from_kind(kind.code());
            assert_eq!(kind_from_name(name), kind.code());
        }
        for code in 0..KIND_NAMES.len() as i32 {
            assert_eq!(kind_from_name(name_from_kind(code)), code);
        }
    }

    #[test]
    fn test_invalid_code() {
        assert_eq!(name_from_kind(-1), INVALID_KIND_NAME);
        assert_eq!(name_from_kind(3), INVALID_KIND_NAME);
        assert_eq!(name_from_kind(i32::MAX), INVALID_KIND_NAME);
        assert_eq!(name_from_kind(i32::MIN), INVALID_KIND_NAME);
    }

    #[test]
    fn test_invalid_name() {
        assert_eq!(kind_from_name("median"), INVALID_KIND_CODE);
        assert_eq!(kind_from_name(""), INVALID_KIND_CODE);
        // Lookup is case-sensitive
        assert_eq!(kind_from_name("AVERAGE"), INVALID_KIND_CODE);
        assert_eq!(kind_from_name(INVALID_KIND_NAME), INVALID_KIND_CODE);
    }

    #[test]
    fn test_display() {
        assert_eq!(CounterKind::Average.to_string(), "average");
        assert_eq!(CounterKind::Summation.name(), "summation");
    }
}
