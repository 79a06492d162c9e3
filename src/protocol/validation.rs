use crate::config::ProtocolConfig;

use super::types::Preferences;

/// Validate and trim a display name. Returns the cleaned name on success and
/// a user-facing message on failure.
pub fn validate_username_with_config(
    username: &str,
    config: &ProtocolConfig,
) -> Result<String, String> {
    let trimmed = username.trim();
    if trimmed.len() < config.min_username_length || trimmed.len() > config.max_username_length {
        return Err(format!(
            "Username must be between {} and {} characters",
            config.min_username_length, config.max_username_length
        ));
    }

    if !trimmed
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, ' ' | '.' | '_' | '-'))
    {
        return Err(
            "Username can only contain letters, numbers, spaces, dots, underscores, or hyphens"
                .to_string(),
        );
    }

    let lowered = trimmed.to_lowercase();
    if config
        .restricted_words
        .iter()
        .any(|word| lowered.contains(word.as_str()))
    {
        return Err("Username contains restricted words (e.g., admin, moderator)".to_string());
    }

    Ok(trimmed.to_string())
}

/// Validate a display name against the default protocol limits.
pub fn validate_username(username: &str) -> Result<String, String> {
    validate_username_with_config(username, &ProtocolConfig::default())
}

/// Shape arbitrary client-supplied preference JSON into normalized
/// [`Preferences`]. Malformed or out-of-policy fields are dropped silently;
/// this never fails.
pub fn sanitize_preferences_with_config(
    raw: Option<&serde_json::Value>,
    config: &ProtocolConfig,
) -> Preferences {
    let Some(map) = raw.and_then(|value| value.as_object()) else {
        return Preferences::default();
    };

    let mut prefs = Preferences::default();

    if let Some(language) = map.get("language").and_then(|v| v.as_str()) {
        let language = truncate(language.trim(), config.max_language_length).to_lowercase();
        if !language.is_empty() {
            prefs.language = Some(language);
        }
    }

    if let Some(interests) = map.get("interests").and_then(|v| v.as_array()) {
        prefs.interests = interests
            .iter()
            .filter_map(|v| v.as_str())
            .map(|s| s.trim().to_lowercase())
            .filter(|s| !s.is_empty() && s.len() <= config.max_interest_length)
            .take(config.max_interests)
            .collect();
    }

    if let Some(region) = map.get("region").and_then(|v| v.as_str()) {
        let region = truncate(region.trim(), config.max_region_length).to_lowercase();
        if !region.is_empty() {
            prefs.region = Some(region);
        }
    }

    if let Some(age_group) = map.get("ageGroup").and_then(|v| v.as_str()) {
        let age_group = truncate(age_group.trim(), config.max_region_length).to_lowercase();
        if !age_group.is_empty() {
            prefs.age_group = Some(age_group);
        }
    }

    prefs
}

/// Sanitize preferences against the default protocol limits.
pub fn sanitize_preferences(raw: Option<&serde_json::Value>) -> Preferences {
    sanitize_preferences_with_config(raw, &ProtocolConfig::default())
}

/// Scrub free-form text (report reasons, rejection reasons): drop control
/// characters, collapse whitespace runs, cap the length.
pub fn sanitize_text(input: &str, max_len: usize) -> String {
    let mut out = String::with_capacity(input.len().min(max_len));
    let mut last_was_space = true;
    for ch in input.chars() {
        if ch.is_control() {
            continue;
        }
        if ch.is_whitespace() {
            if !last_was_space {
                out.push(' ');
                last_was_space = true;
            }
            continue;
        }
        out.push(ch);
        last_was_space = false;
        if out.len() >= max_len {
            break;
        }
    }
    out.trim_end().to_string()
}

fn truncate(s: &str, max_len: usize) -> &str {
    match s.char_indices().nth(max_len) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn username_length_bounds() {
        assert!(validate_username("A").is_err());
        assert!(validate_username("Al").is_ok());
        assert!(validate_username(&"x".repeat(20)).is_ok());
        assert!(validate_username(&"x".repeat(21)).is_err());
    }

    #[test]
    fn username_is_trimmed() {
        assert_eq!(validate_username("  Alice  ").unwrap(), "Alice");
    }

    #[test]
    fn username_charset_enforced() {
        assert!(validate_username("Alice_99.x-y z").is_ok());
        assert!(validate_username("Alice<script>").is_err());
        assert!(validate_username("Bob!").is_err());
    }

    #[test]
    fn restricted_words_rejected_case_insensitively() {
        for name in ["admin", "The Admin", "MODERATOR1", "support rep", "system", "root2"] {
            assert!(validate_username(name).is_err(), "{name} should be rejected");
        }
    }

    #[test]
    fn preferences_normalized_and_capped() {
        let raw = json!({
            "language": "  EN-us-extended ",
            "interests": ["Music", "  GAMES ", "", 42, "a-very-long-interest-over-twenty-chars",
                          "art", "film", "books", "cooking"],
            "region": "EUROPE-WEST-EXTRA",
            "ageGroup": "18-25"
        });
        let prefs = sanitize_preferences(Some(&raw));
        assert_eq!(prefs.language.as_deref(), Some("en-us"));
        // 5 kept at most, non-strings and empties dropped, oversized dropped
        assert_eq!(prefs.interests, vec!["music", "games", "art", "film", "books"]);
        assert_eq!(prefs.region.as_deref(), Some("europe-wes"));
        assert_eq!(prefs.age_group.as_deref(), Some("18-25"));
    }

    #[test]
    fn malformed_preferences_become_empty() {
        assert!(sanitize_preferences(None).is_empty());
        assert!(sanitize_preferences(Some(&json!("not-an-object"))).is_empty());
        assert!(sanitize_preferences(Some(&json!([1, 2, 3]))).is_empty());
        assert!(sanitize_preferences(Some(&json!({"language": 7}))).is_empty());
    }

    #[test]
    fn text_sanitization_strips_control_and_collapses_whitespace() {
        assert_eq!(sanitize_text("  hello\t\n  world\u{0007} ", 64), "hello world");
        assert_eq!(sanitize_text("aaaaa", 3), "aaa");
        assert_eq!(sanitize_text("\u{0000}\u{0001}", 16), "");
    }
}
