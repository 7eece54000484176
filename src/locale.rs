use serde::{Deserialize, Serialize};
use ts_rs::TS;
use utoipa::ToSchema;

/// Name of the cookie holding the visitor's preferred locale.
pub const LOCALE_COOKIE: &str = "locale";

/// Locale
///
/// Supported UI locales. French is the default and the final fallback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum Locale {
    #[default]
    Fr,
    Ar,
    En,
}

pub const SUPPORTED_LOCALES: &[Locale] = &[Locale::Fr, Locale::Ar, Locale::En];

impl Locale {
    pub const fn as_str(self) -> &'static str {
        match self {
            Locale::Fr => "fr",
            Locale::Ar => "ar",
            Locale::En => "en",
        }
    }

    /// Parses a locale tag, case-insensitively and ignoring region subtags (`en-GB`, `ar_MA`).
    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim().to_ascii_lowercase();
        let lang = value.split(['-', '_']).next().unwrap_or("");
        match lang {
            "fr" => Some(Locale::Fr),
            "ar" => Some(Locale::Ar),
            "en" => Some(Locale::En),
            _ => None,
        }
    }

    /// Exact match of a path segment (`fr`, `ar`, `en`); stricter than [`Locale::parse`].
    pub fn from_segment(segment: &str) -> Option<Self> {
        SUPPORTED_LOCALES
            .iter()
            .copied()
            .find(|locale| locale.as_str() == segment)
    }

    /// Text direction for the renderer.
    pub const fn direction(self) -> &'static str {
        match self {
            Locale::Ar => "rtl",
            Locale::Fr | Locale::En => "ltr",
        }
    }
}

/// negotiate
///
/// Picks the locale for a request without one in its path: the preference cookie first,
/// then the highest-quality supported `Accept-Language` entry, then the default.
pub fn negotiate(cookie: Option<&str>, accept_language: Option<&str>) -> Locale {
    if let Some(locale) = cookie.and_then(Locale::parse) {
        return locale;
    }

    accept_language
        .and_then(best_accept_language)
        .unwrap_or_default()
}

fn best_accept_language(header: &str) -> Option<Locale> {
    let mut candidates: Vec<(Locale, f32, usize)> = header
        .split(',')
        .enumerate()
        .filter_map(|(position, entry)| {
            let mut parts = entry.split(';');
            let tag = parts.next()?.trim();
            // A q-value must be a number in (0, 1]; anything else drops the entry.
            let quality = match parts.find_map(|p| p.trim().strip_prefix("q=")) {
                Some(q) => q.trim().parse::<f32>().ok()?,
                None => 1.0,
            };
            if !(quality > 0.0 && quality <= 1.0) {
                return None;
            }
            Locale::parse(tag).map(|locale| (locale, quality, position))
        })
        .collect();

    // Highest quality first; header order breaks ties.
    candidates.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.2.cmp(&b.2)));
    candidates.first().map(|(locale, _, _)| *locale)
}

/// split_locale
///
/// Splits `/fr/cars/1` into `(Some("fr"), "/cars/1")`. The first segment is returned
/// verbatim, whether or not it names a supported locale.
pub fn split_locale(path: &str) -> (Option<&str>, &str) {
    let trimmed = path.strip_prefix('/').unwrap_or(path);
    if trimmed.is_empty() {
        return (None, "");
    }
    match trimmed.find('/') {
        Some(idx) => (Some(&trimmed[..idx]), &trimmed[idx..]),
        None => (Some(trimmed), ""),
    }
}

/// Whether a path segment has the shape of a locale code (two ASCII letters).
pub fn looks_like_locale(segment: &str) -> bool {
    segment.len() == 2 && segment.chars().all(|c| c.is_ascii_alphabetic())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_tolerates_case_and_regions() {
        assert_eq!(Locale::parse("FR"), Some(Locale::Fr));
        assert_eq!(Locale::parse("en-US"), Some(Locale::En));
        assert_eq!(Locale::parse("ar_MA"), Some(Locale::Ar));
        assert_eq!(Locale::parse("de"), None);
        assert_eq!(Locale::parse(""), None);
    }

    #[test]
    fn arabic_is_right_to_left() {
        assert_eq!(Locale::Ar.direction(), "rtl");
        assert_eq!(Locale::Fr.direction(), "ltr");
    }

    #[test]
    fn cookie_beats_accept_language() {
        assert_eq!(negotiate(Some("ar"), Some("en-US,en;q=0.9")), Locale::Ar);
    }

    #[test]
    fn invalid_cookie_falls_through() {
        assert_eq!(negotiate(Some("xx"), Some("en")), Locale::En);
    }

    #[test]
    fn accept_language_respects_quality() {
        assert_eq!(
            negotiate(None, Some("de-DE,en;q=0.5,ar;q=0.8")),
            Locale::Ar
        );
        assert_eq!(negotiate(None, Some("en;q=0,fr;q=0.1")), Locale::Fr);
    }

    #[test]
    fn out_of_range_quality_values_are_ignored() {
        assert_eq!(negotiate(None, Some("ar;q=nan, en;q=0.5")), Locale::En);
        assert_eq!(negotiate(None, Some("ar;q=2, en;q=0.5")), Locale::En);
        assert_eq!(negotiate(None, Some("ar;q=inf, en;q=0.1")), Locale::En);
        assert_eq!(negotiate(None, Some("ar;q=high, en;q=0.1")), Locale::En);
        assert_eq!(negotiate(None, Some("en, ar")), Locale::En);
    }

    #[test]
    fn default_is_french() {
        assert_eq!(negotiate(None, None), Locale::Fr);
        assert_eq!(negotiate(None, Some("de, ja")), Locale::Fr);
    }

    #[test]
    fn split_locale_segments() {
        assert_eq!(split_locale("/fr/cars/1"), (Some("fr"), "/cars/1"));
        assert_eq!(split_locale("/en"), (Some("en"), ""));
        assert_eq!(split_locale("/"), (None, ""));
        assert_eq!(split_locale("/cars"), (Some("cars"), ""));
    }

    #[test]
    fn segments_must_match_exactly() {
        assert_eq!(Locale::from_segment("ar"), Some(Locale::Ar));
        assert_eq!(Locale::from_segment("AR"), None);
        assert_eq!(Locale::from_segment("en-US"), None);
    }

    #[test]
    fn locale_shape() {
        assert!(looks_like_locale("de"));
        assert!(!looks_like_locale("cars"));
        assert!(!looks_like_locale("f1"));
    }
}
