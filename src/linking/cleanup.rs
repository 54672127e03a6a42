// src/linking/cleanup.rs
//! Text fixes applied to scraped values before they reach the matchers.
//!
//! These belong to the extraction side: the matching engine itself only
//! normalizes case, punctuation and whitespace.

use chrono::NaiveDate;
use log::debug;
use once_cell::sync::Lazy;
use regex::Regex;

static CITY_PREFIX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^([\w\s]+),").expect("valid city regex"));

const DATE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%m/%d/%Y", "%m/%d/%y"];
const LOWERCASE_WORDS: [(&str, &str); 4] = [(" Of ", " of "), (" And ", " and "), (" In ", " in "), (" To ", " to ")];

/// Spells out "UNIV" as "UNIVERSITY" unless the full word is already present.
pub fn spell_out_university(name: &str) -> String {
    if name.contains("UNIV") && !name.contains("UNIVERSITY") {
        name.replace("UNIV", "UNIVERSITY")
    } else {
        name.to_string()
    }
}

pub fn decode_ampersands(text: &str) -> String {
    text.replace("&amp;", "&")
}

/// Institution name prepared for matching.
pub fn clean_institution_name(name: &str) -> String {
    decode_ampersands(&spell_out_university(name.trim()))
}

/// Drops a trailing ", ." left where a middle initial is missing.
pub fn trim_missing_initial(name: &str) -> &str {
    name.strip_suffix(", .").unwrap_or(name)
}

/// Splits a semicolon separated list of investigator names.
pub fn split_investigators(names: &str) -> Vec<String> {
    names
        .split(';')
        .map(|name| trim_missing_initial(name.trim()).trim().to_string())
        .filter(|name| !name.is_empty())
        .collect()
}

/// City from the last line of an address (`"Ithaca, NY 14853"` -> `"Ithaca"`).
pub fn city_from_address(lines: &[String]) -> Option<String> {
    let last = lines.last()?;
    CITY_PREFIX
        .captures(last.trim())
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|city| !city.is_empty())
}

fn is_all_caps(text: &str) -> bool {
    text.chars().any(|c| c.is_alphabetic()) && !text.chars().any(|c| c.is_lowercase())
}

/// Title-cases all-uppercase strings, leaving short joining words lowercase.
/// Mixed-case input is returned unchanged.
pub fn fix_capitalization(text: &str) -> String {
    if !is_all_caps(text) {
        return text.to_string();
    }
    let mut out = String::with_capacity(text.len());
    let mut at_word_start = true;
    for c in text.to_lowercase().chars() {
        if at_word_start {
            out.extend(c.to_uppercase());
        } else {
            out.push(c);
        }
        at_word_start = c.is_whitespace();
    }
    for (from, to) in LOWERCASE_WORDS {
        out = out.replace(from, to);
    }
    out
}

pub fn parse_project_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    let parsed = DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(raw, format).ok());
    if parsed.is_none() {
        debug!("Dropping unparseable project date {:?}", raw);
    }
    parsed
}
