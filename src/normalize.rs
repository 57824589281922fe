use std::collections::HashMap;

use once_cell::sync::Lazy;

/// Leading tokens that carry no identity ("FC Utrecht" is "utrecht").
const GENERIC_PREFIXES: &[&str] = &["fc", "sc", "sv", "afc", "sbv", "vv"];

/// The separator between the two sides of a match label, "Ajax - PSV".
const LABEL_SEPARATOR: &str = " - ";

/// Cleaned spelling -> canonical key. Keys are already in cleaned form and
/// every target is a fixed point of the normalizer.
static TEAM_ALIASES: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        ("ajax amsterdam", "ajax"),
        ("amsterdamsche", "ajax"),
        ("twente enschede", "twente"),
        ("psv eindhoven", "psv"),
        ("philips sport vereniging", "psv"),
        ("feyenoord rotterdam", "feyenoord"),
        ("az alkmaar", "az"),
        ("alkmaar zaanstreek", "az"),
        ("nec nijmegen", "nec"),
        ("n e c", "nec"),
        ("go ahead eagles deventer", "go ahead eagles"),
        ("ga eagles", "go ahead eagles"),
        ("sparta rotterdam", "sparta"),
        ("willem ii tilburg", "willem ii"),
        ("nac breda", "nac"),
        ("zwolle", "pec zwolle"),
        ("heracles almelo", "heracles"),
        ("rkc waalwijk", "rkc"),
        ("excelsior rotterdam", "excelsior"),
        ("almere city fc", "almere city"),
        ("groningen fc", "groningen"),
        ("heerenveen sc", "heerenveen"),
        ("utrecht fc", "utrecht"),
        ("fortuna", "fortuna sittard"),
        ("telstar 1963", "telstar"),
        ("olympique marseille", "marseille"),
        ("olympique de marseille", "marseille"),
        ("galatasaray istanbul", "galatasaray"),
        ("besiktas istanbul", "besiktas"),
        ("fenerbahce istanbul", "fenerbahce"),
        ("inter milan", "inter"),
        ("internazionale", "inter"),
        ("internazionale milano", "inter"),
        ("borussia dortmund", "dortmund"),
        ("bvb", "dortmund"),
        ("slavia praag", "slavia praha"),
        ("slavia prague", "slavia praha"),
        ("qarabag agdam", "qarabag"),
        ("panathinaikos athene", "panathinaikos"),
        ("chelsea london", "chelsea"),
    ])
});

/// Canonical key for a free-text team name. Lowercases, drops punctuation,
/// collapses whitespace, strips generic club prefixes and resolves aliases.
/// Empty input yields an empty key; the function never fails.
pub fn normalize_team_name(name: &str) -> String {
    let lower = name.trim().to_lowercase();
    let spaced: String = lower
        .chars()
        .filter(|ch| !matches!(ch, '.' | '\'' | '’'))
        .map(|ch| {
            if ch.is_alphanumeric() || ch.is_whitespace() {
                ch
            } else {
                ' '
            }
        })
        .collect();

    let mut tokens: Vec<&str> = spaced.split_whitespace().collect();
    // Prefix stripping always leaves at least one token, and repeating it keeps
    // the function idempotent on inputs such as "fc sc twente".
    while tokens.len() > 1 && GENERIC_PREFIXES.contains(&tokens[0]) {
        tokens.remove(0);
    }
    let cleaned = tokens.join(" ");

    match TEAM_ALIASES.get(cleaned.as_str()) {
        Some(target) => (*target).to_string(),
        None => cleaned,
    }
}

/// Split "Home - Away" into its two trimmed sides. Dashes of any width are
/// accepted; anything other than exactly two non-empty sides is `None`.
pub fn split_match_label(label: &str) -> Option<(String, String)> {
    let unified = label.replace(['–', '—'], "-");
    let parts: Vec<&str> = unified.split(LABEL_SEPARATOR).map(str::trim).collect();
    if parts.len() != 2 || parts.iter().any(|p| p.is_empty()) {
        return None;
    }
    Some((parts[0].to_string(), parts[1].to_string()))
}

/// Which side of the label the subject team is on: `Some(true)` for the left
/// (home) side, `Some(false)` for the right. Ambiguous labels are `None`.
pub fn subject_on_left(label: &str, subject_key: &str) -> Option<bool> {
    let (left, right) = split_match_label(label)?;
    let subject_key = normalize_team_name(subject_key);
    if subject_key.is_empty() {
        return None;
    }
    let left_hit = normalize_team_name(&left).contains(&subject_key);
    let right_hit = normalize_team_name(&right).contains(&subject_key);
    match (left_hit, right_hit) {
        (true, false) => Some(true),
        (false, true) => Some(false),
        _ => None,
    }
}

/// The opponent's name exactly as written in the label, when the subject team
/// can be placed on exactly one side.
pub fn extract_opponent(label: &str, subject_key: &str) -> Option<String> {
    let (left, right) = split_match_label(label)?;
    match subject_on_left(label, subject_key)? {
        true => Some(right),
        false => Some(left),
    }
}
