//! Mapping from the app's language preference codes to the tags the voice
//! agent backend understands.

/// Language used when a preference is not in the table.
pub const FALLBACK_LANGUAGE: &str = "en";

const LANGUAGE_TABLE: &[(&str, &str)] = &[
    ("en", "en"),
    ("zh", "zh"),
    ("zh-Hans", "zh"),
    ("zh-Hant", "zh"),
    ("es", "es"),
    ("fr", "fr"),
    ("de", "de"),
    ("ja", "ja"),
    ("ko", "ko"),
];

/// Normalizes a user language preference to a canonical 2-letter code.
///
/// Matching is exact: locale variants have to be listed explicitly.
/// Anything unknown maps to [`FALLBACK_LANGUAGE`].
pub fn language_for_livekit(preference: &str) -> &'static str {
    LANGUAGE_TABLE
        .iter()
        .find(|(code, _)| *code == preference)
        .map(|(_, canonical)| *canonical)
        .unwrap_or(FALLBACK_LANGUAGE)
}
