//! Protocol settings: username rules and preference normalization limits.

use super::defaults::{
    default_max_interest_length, default_max_interests, default_max_language_length,
    default_max_reason_length, default_max_region_length, default_max_username_length,
    default_min_username_length, default_restricted_words,
};
use serde::{Deserialize, Serialize};

/// Validation limits applied to untrusted client input.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ProtocolConfig {
    #[serde(default = "default_min_username_length")]
    pub min_username_length: usize,
    #[serde(default = "default_max_username_length")]
    pub max_username_length: usize,
    /// Case-insensitive substring denylist for display names
    #[serde(default = "default_restricted_words")]
    pub restricted_words: Vec<String>,
    /// Maximum number of interest tags kept per session
    #[serde(default = "default_max_interests")]
    pub max_interests: usize,
    /// Maximum length of a single interest tag
    #[serde(default = "default_max_interest_length")]
    pub max_interest_length: usize,
    /// Maximum length of the language code
    #[serde(default = "default_max_language_length")]
    pub max_language_length: usize,
    /// Maximum length of region and age-group values
    #[serde(default = "default_max_region_length")]
    pub max_region_length: usize,
    /// Cap on free-text report/rejection reasons after sanitization
    #[serde(default = "default_max_reason_length")]
    pub max_reason_length: usize,
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        Self {
            min_username_length: default_min_username_length(),
            max_username_length: default_max_username_length(),
            restricted_words: default_restricted_words(),
            max_interests: default_max_interests(),
            max_interest_length: default_max_interest_length(),
            max_language_length: default_max_language_length(),
            max_region_length: default_max_region_length(),
            max_reason_length: default_max_reason_length(),
        }
    }
}
