//! City name resolution over the built-in airport tables.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use strsim::jaro_winkler;
use thiserror::Error;

use super::tables::{AIRPORT_NAMES, CITY_AIRPORTS};

/// Minimum Jaro-Winkler similarity for a city key to be offered as a suggestion
pub const SUGGESTION_THRESHOLD: f64 = 0.8;
const MAX_SUGGESTIONS: usize = 3;

/// A successful lookup: ordered airport codes and the display name of the first one.
/// Only the directory builds these, always with at least one code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    codes: Vec<String>,
    display_name: String,
}

impl Resolution {
    pub fn codes(&self) -> &[String] {
        &self.codes
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    /// Preferred airport of the resolved city
    pub fn primary_code(&self) -> &str {
        self.codes.first().map_or("", String::as_str)
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ResolveError {
    #[error("city '{query}' not found")]
    UnresolvedCity {
        query: String,
        suggestions: Vec<String>,
    },
}

/// Static city -> airports directory.
///
/// Keys live in a `BTreeMap` so the substring fallback scans them in sorted
/// order and the same input always lands on the same entry.
#[derive(Debug, Clone)]
pub struct AirportDirectory {
    cities: BTreeMap<String, Vec<String>>,
    names: HashMap<String, String>,
}

impl Default for AirportDirectory {
    fn default() -> Self {
        Self::builtin()
    }
}

impl AirportDirectory {
    /// Directory backed by the built-in tables
    pub fn builtin() -> Self {
        Self::from_entries(
            CITY_AIRPORTS
                .iter()
                .map(|(city, codes)| (city.to_string(), codes.iter().map(|c| c.to_string()).collect())),
            AIRPORT_NAMES
                .iter()
                .map(|(code, name)| (code.to_string(), name.to_string())),
        )
    }

    /// Build a directory from arbitrary entries. City keys are normalized and
    /// entries with an empty code list are skipped.
    pub fn from_entries(
        cities: impl IntoIterator<Item = (String, Vec<String>)>,
        names: impl IntoIterator<Item = (String, String)>,
    ) -> Self {
        let cities = cities
            .into_iter()
            .filter(|(_, codes)| !codes.is_empty())
            .map(|(city, codes)| {
                let codes = codes.into_iter().map(|c| c.to_uppercase()).collect();
                (normalize(&city), codes)
            })
            .collect();
        let names = names
            .into_iter()
            .map(|(code, name)| (code.to_uppercase(), name))
            .collect();

        Self { cities, names }
    }

    /// Resolve a destination city.
    ///
    /// # Search Priority
    /// 1. Exact match on the normalized key
    /// 2. First key (in sorted order) that is a substring of the input, or
    ///    that contains the input
    pub fn resolve(&self, input: &str) -> Result<Resolution, ResolveError> {
        let normalized = normalize(input);
        if normalized.is_empty() {
            return Err(self.unresolved(input));
        }

        if let Some(codes) = self.cities.get(&normalized) {
            return Ok(self.resolution(codes));
        }

        self.cities
            .iter()
            .find(|(city, _)| normalized.contains(city.as_str()) || city.contains(&normalized))
            .map(|(city, codes)| {
                tracing::debug!("'{}' resolved by partial match on '{}'", normalized, city);
                self.resolution(codes)
            })
            .ok_or_else(|| self.unresolved(input))
    }

    /// Resolve a departure city. Exact key match only.
    pub fn resolve_origin(&self, input: &str) -> Result<Resolution, ResolveError> {
        self.cities
            .get(&normalize(input))
            .map(|codes| self.resolution(codes))
            .ok_or_else(|| self.unresolved(input))
    }

    /// Accept a known IATA code typed directly, in any case. Known means named
    /// or listed under some city.
    pub fn lookup_code(&self, input: &str) -> Option<Resolution> {
        let code = input.trim().to_uppercase();
        if code.len() != 3 || !code.chars().all(|c| c.is_ascii_alphabetic()) {
            return None;
        }

        let known = self.names.contains_key(&code)
            || self.cities.values().any(|codes| codes.contains(&code));
        known.then(|| Resolution {
            display_name: self.display_name(&code),
            codes: vec![code],
        })
    }

    /// Human-readable name for a code, or the code itself if unknown
    pub fn display_name(&self, code: &str) -> String {
        self.names
            .get(&code.to_uppercase())
            .cloned()
            .unwrap_or_else(|| code.to_string())
    }

    /// One "CODE - Name" line per distinct preferred airport, sorted
    pub fn city_list(&self) -> Vec<String> {
        let primaries: BTreeSet<&str> = self
            .cities
            .values()
            .filter_map(|codes| codes.first())
            .map(String::as_str)
            .collect();
        primaries
            .into_iter()
            .map(|code| format!("{} - {}", code, self.display_name(code)))
            .collect()
    }

    /// City keys that look similar to the input, best first
    pub fn suggest(&self, input: &str) -> Vec<String> {
        let normalized = normalize(input);
        if normalized.is_empty() {
            return Vec::new();
        }

        let mut scored: Vec<(f64, &String)> = self
            .cities
            .keys()
            .map(|city| (jaro_winkler(&normalized, city), city))
            .filter(|(score, _)| *score >= SUGGESTION_THRESHOLD)
            .collect();

        // Sort by score descending
        scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));

        scored
            .into_iter()
            .take(MAX_SUGGESTIONS)
            .map(|(_, city)| city.clone())
            .collect()
    }

    fn resolution(&self, codes: &[String]) -> Resolution {
        let display_name = codes.first().map(|code| self.display_name(code)).unwrap_or_default();
        Resolution {
            codes: codes.to_vec(),
            display_name,
        }
    }

    fn unresolved(&self, input: &str) -> ResolveError {
        ResolveError::UnresolvedCity {
            query: input.trim().to_string(),
            suggestions: self.suggest(input),
        }
    }
}

fn normalize(s: &str) -> String {
    s.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn codes(list: &[&str]) -> Vec<String> {
        list.iter().map(|c| c.to_string()).collect()
    }

    #[test]
    fn test_exact_match() {
        let directory = AirportDirectory::builtin();
        let resolution = directory.resolve("бангкок").unwrap();
        assert_eq!(resolution.codes, codes(&["BKK"]));
        assert_eq!(resolution.display_name, "Бангкок");
    }

    #[test]
    fn test_exact_match_is_stable() {
        let directory = AirportDirectory::builtin();
        let first = directory.resolve("москва").unwrap();
        for _ in 0..5 {
            assert_eq!(directory.resolve("москва").unwrap(), first);
        }
        assert_eq!(first.codes, codes(&["SVO", "DME", "VKO"]));
        assert_eq!(first.display_name, "Москва (Шереметьево)");
    }

    #[test]
    fn test_case_and_whitespace() {
        let directory = AirportDirectory::builtin();
        let resolution = directory.resolve("  ПАРИЖ ").unwrap();
        assert_eq!(resolution.primary_code(), "CDG");
        assert_eq!(resolution.display_name, "Париж (Шарль-де-Голль)");
    }

    #[test]
    fn test_typo_key_for_tokyo() {
        let directory = AirportDirectory::builtin();
        let resolution = directory.resolve("той").unwrap();
        assert_eq!(resolution.codes, codes(&["NRT", "HND"]));
        assert_eq!(resolution.display_name, "Токио (Наррита)");
    }

    #[test]
    fn test_tokyo_is_not_reached_by_partial_match() {
        // "той" is neither contained in "токио" nor contains it
        let directory = AirportDirectory::builtin();
        let err = directory.resolve("токио").unwrap_err();
        assert!(matches!(err, ResolveError::UnresolvedCity { ref query, .. } if query == "токио"));
    }

    #[test]
    fn test_partial_match_key_inside_input() {
        let directory = AirportDirectory::builtin();
        // "дели" has no key of its own; the short "дел" key is contained in it
        let resolution = directory.resolve("дели").unwrap();
        assert_eq!(resolution.codes, codes(&["DEL"]));
        assert_eq!(resolution.display_name, "Дели");
    }

    #[test]
    fn test_partial_match_input_inside_key() {
        let directory = AirportDirectory::builtin();
        let resolution = directory.resolve("сингап").unwrap();
        assert_eq!(resolution.codes, codes(&["SIN"]));
    }

    #[test]
    fn test_partial_match_takes_first_sorted_key() {
        let directory = AirportDirectory::builtin();
        // both "бали" and "бангкок" contain "ба"; "бали" sorts first
        let resolution = directory.resolve("ба").unwrap();
        assert_eq!(resolution.codes, codes(&["DPS"]));
    }

    #[test]
    fn test_partial_match_order_in_custom_directory() {
        let directory = AirportDirectory::from_entries(
            vec![
                ("зеленоград".to_string(), codes(&["ZZB"])),
                ("град".to_string(), codes(&["ZZA"])),
            ],
            Vec::new(),
        );
        let resolution = directory.resolve("град").unwrap();
        assert_eq!(resolution.codes, codes(&["ZZA"]));
        let resolution = directory.resolve("новоград").unwrap();
        assert_eq!(resolution.codes, codes(&["ZZA"]));
        assert_eq!(resolution.display_name, "ZZA");
    }

    #[test]
    fn test_not_found() {
        let directory = AirportDirectory::builtin();
        assert!(directory.resolve("атлантида").is_err());
        assert!(directory.resolve("   ").is_err());
    }

    #[test]
    fn test_resolve_origin_exact_only() {
        let directory = AirportDirectory::builtin();
        assert_eq!(directory.resolve_origin("Новосибирск").unwrap().codes, codes(&["OVB"]));
        // destination lookup would accept this through "дел"
        assert!(directory.resolve_origin("дели").is_err());
    }

    #[test]
    fn test_lookup_code() {
        let directory = AirportDirectory::builtin();
        let resolution = directory.lookup_code("bkk").unwrap();
        assert_eq!(resolution.codes, codes(&["BKK"]));
        assert_eq!(resolution.display_name, "Бангкок");
        assert!(directory.lookup_code("XYZ").is_none());
        assert!(directory.lookup_code("бкк").is_none());
        assert!(directory.lookup_code("BKKK").is_none());
    }

    #[test]
    fn test_lookup_code_without_display_name() {
        let directory = AirportDirectory::from_entries(
            vec![("город".to_string(), codes(&["ZZA", "ZZB"]))],
            Vec::new(),
        );
        let resolution = directory.lookup_code("zzb").unwrap();
        assert_eq!(resolution.codes, codes(&["ZZB"]));
        assert_eq!(resolution.display_name, "ZZB");
    }

    #[test]
    fn test_every_listed_code_can_be_looked_up() {
        let directory = AirportDirectory::builtin();
        for line in directory.city_list() {
            let (code, name) = line.split_once(" - ").unwrap();
            let resolution = directory.lookup_code(code).unwrap_or_else(|| panic!("{} not accepted", code));
            assert_eq!(resolution.primary_code(), code);
            assert_ne!(name, code, "{} has no display name", code);
        }
    }

    #[test]
    fn test_display_name_fallback() {
        let directory = AirportDirectory::builtin();
        assert_eq!(directory.display_name("OVB"), "Новосибирск");
        assert_eq!(directory.display_name("SXF"), "Берлин (Шёнефельд)");
        assert_eq!(directory.display_name("XYZ"), "XYZ");
    }

    #[test]
    fn test_city_list() {
        let directory = AirportDirectory::builtin();
        let list = directory.city_list();
        assert!(list.contains(&"BKK - Бангкок".to_string()));
        assert!(list.contains(&"DAD - Дананг".to_string()));
        // one line per preferred airport even when several keys share it
        assert_eq!(list.iter().filter(|l| l.starts_with("PRG ")).count(), 1);
        let mut sorted = list.clone();
        sorted.sort();
        assert_eq!(list, sorted);
    }

    #[test]
    fn test_suggestions() {
        let directory = AirportDirectory::builtin();
        let suggestions = directory.suggest("бангкох");
        assert_eq!(suggestions.first().map(String::as_str), Some("бангкок"));
        assert!(suggestions.len() <= MAX_SUGGESTIONS);
    }
}
