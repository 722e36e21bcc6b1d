//! City search over the static directory.
//!
//! Matching is substring containment on a normalized form of the name:
//! hyphens become spaces, `é` and `è` become `e`, and everything is
//! lower-cased. Longer unrelated names can therefore match a short query.

use regex::Regex;
use std::{collections::HashSet, sync::LazyLock};

use crate::{error::ValidationError, model::CityDirectoryEntry};

static CITY_INPUT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z éèà-]*$").expect("city input pattern is valid"));

/// Result of a search, keeping "nothing typed" apart from "nothing found".
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchOutcome {
    NoQuery,
    NoMatches,
    Matches(Vec<CityDirectoryEntry>),
}

impl SearchOutcome {
    pub fn matches(&self) -> &[CityDirectoryEntry] {
        match self {
            SearchOutcome::Matches(list) => list,
            _ => &[],
        }
    }
}

/// Check raw user input against the allowed character set.
pub fn validate_city_input(input: &str) -> Result<&str, ValidationError> {
    if input.is_empty() {
        return Err(ValidationError::Empty);
    }
    if !CITY_INPUT.is_match(input) {
        return Err(ValidationError::InvalidCharacters(input.to_string()));
    }
    Ok(input)
}

/// Lower-case first so that `É` folds the same way as `é`.
pub fn normalize(text: &str) -> String {
    text.to_lowercase().replace('-', " ").replace(['é', 'è'], "e")
}

/// Filter, de-duplicate and sort directory entries matching `query`.
pub fn search(query: &str, directory: &[CityDirectoryEntry]) -> SearchOutcome {
    if query.is_empty() {
        return SearchOutcome::NoQuery;
    }

    let needle = normalize(query);
    let mut seen: HashSet<(&str, Option<&str>, &str)> = HashSet::new();
    let mut found: Vec<CityDirectoryEntry> = Vec::new();

    for city in directory {
        if !normalize(&city.name).contains(&needle) {
            continue;
        }

        // The directory lists some cities several times under different ids.
        let key = (city.name.as_str(), city.state.as_deref(), city.country.as_str());
        if seen.insert(key) {
            found.push(city.clone());
        }
    }

    if found.is_empty() {
        return SearchOutcome::NoMatches;
    }

    found.sort_by(|a, b| a.name.cmp(&b.name));
    SearchOutcome::Matches(found)
}

/// `"name (country)"` or `"name, state (country)"`.
pub fn display_name(city: &CityDirectoryEntry) -> String {
    match city.state.as_deref() {
        Some(state) if !state.is_empty() => {
            format!("{}, {} ({})", city.name, state, city.country)
        }
        _ => format!("{} ({})", city.name, city.country),
    }
}
