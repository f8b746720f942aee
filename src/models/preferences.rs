//! User preferences carried inside snapshots

use serde::{Deserialize, Serialize};

/// The small fixed set of scalar preferences exported with the dataset
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserPreferences {
    /// ISO 4217 currency code
    #[serde(default = "default_currency_code")]
    pub currency_code: String,

    /// BCP 47 language code
    #[serde(default = "default_language_code")]
    pub language_code: String,

    /// `light`, `dark` or `system`
    #[serde(default = "default_color_scheme")]
    pub color_scheme_code: String,
}

fn default_currency_code() -> String {
    "USD".to_string()
}

fn default_language_code() -> String {
    "en".to_string()
}

fn default_color_scheme() -> String {
    "system".to_string()
}

impl Default for UserPreferences {
    fn default() -> Self {
        Self {
            currency_code: default_currency_code(),
            language_code: default_language_code(),
            color_scheme_code: default_color_scheme(),
        }
    }
}
