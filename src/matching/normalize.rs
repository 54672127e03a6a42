// src/matching/normalize.rs

const STRIPPED_CHARS: [char; 3] = ['.', ',', '-'];

/// Canonical form shared by stored and queried names: lowercase, periods,
/// commas and hyphens removed, whitespace runs collapsed and trimmed.
pub fn normalize(name: &str) -> String {
    let lowered: String = name
        .to_lowercase()
        .chars()
        .filter(|c| !STRIPPED_CHARS.contains(c))
        .collect();
    lowered.split_whitespace().collect::<Vec<_>>().join(" ")
}
