//! Pure normalizers for the raw strings read off the page.

use chrono::{DateTime, NaiveDateTime, Utc};
use regex::Regex;

/// Class marker of a fully filled star.
const STAR_FULL: &str = "_full";
/// Class marker of a half-filled star.
const STAR_HALF: &str = "_half";

/// Tally a star widget from the class attribute of each star element.
pub fn count_stars<S: AsRef<str>>(classes: &[S]) -> f64 {
    classes
        .iter()
        .map(|class| {
            let class = class.as_ref();
            if class.contains(STAR_FULL) {
                1.0
            } else if class.contains(STAR_HALF) {
                0.5
            } else {
                0.0
            }
        })
        .sum()
}

/// Parse the summary rating, which the page renders as separate fragments
/// (`"4"`, `","`, `"7"`) or as one string (`"4,7"`).
pub fn parse_rating<S: AsRef<str>>(parts: &[S]) -> f64 {
    let joined: String = parts
        .iter()
        .flat_map(|p| p.as_ref().chars())
        .filter(|c| c.is_ascii_digit() || *c == ',' || *c == '.')
        .map(|c| if c == ',' { '.' } else { c })
        .collect();
    joined.parse().unwrap_or(0.0)
}

/// Digits-only integer from text such as `"1 234 оценки"`.
pub fn parse_count(text: &str) -> u64 {
    let digits: String = text.chars().filter(char::is_ascii_digit).collect();
    digits.parse().unwrap_or(0)
}

/// Normalize the `datePublished` meta content into a UTC timestamp.
pub fn normalize_date(content: &str) -> Option<DateTime<Utc>> {
    let content = content.trim();
    if content.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(content) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(content, "%Y-%m-%dT%H:%M:%S%.fZ")
        .ok()
        .map(|naive| naive.and_utc())
}

/// First double-quoted token of an inline style, i.e. the URL in
/// `background-image: url("https://...")`.
pub fn avatar_from_style(style: &str) -> Option<String> {
    let mut pieces = style.split('"');
    pieces.next()?;
    let quoted = pieces.next()?;
    // An unterminated quote has no closing piece.
    pieces.next()?;
    if quoted.is_empty() {
        None
    } else {
        Some(quoted.to_string())
    }
}

/// Digits following `key=` in a request URL.
pub fn business_id_from_url(url: &str, key: &str) -> Option<String> {
    let pattern = format!(r"[?&]{}=(\d+)", regex::escape(key));
    let re = Regex::new(&pattern).ok()?;
    re.captures(url)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// Trim surrounding whitespace; empty text counts as absent.
pub fn clean_text(text: Option<String>) -> Option<String> {
    let text = text?;
    let trimmed = text.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
