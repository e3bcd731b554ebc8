//! Cross-origin configuration stored for a bucket.
//!
//! Only the configuration lives here; enforcement belongs to the HTTP edge.

use serde::{Deserialize, Serialize};

/// CORS rules attached to a bucket. An unset config reads back as all-empty.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct CorsConfig {
    pub allowed_origins: Vec<String>,
    pub allowed_methods: Vec<String>,
    pub allowed_headers: Vec<String>,
    pub expose_headers: Vec<String>,
}

impl CorsConfig {
    /// Returns the name of the first list holding a blank entry, if any.
    pub fn blank_entry(&self) -> Option<&'static str> {
        [
            ("allowed_origins", &self.allowed_origins),
            ("allowed_methods", &self.allowed_methods),
            ("allowed_headers", &self.allowed_headers),
            ("expose_headers", &self.expose_headers),
        ]
        .into_iter()
        .find(|(_, values)| values.iter().any(|v| v.trim().is_empty()))
        .map(|(field, _)| field)
    }
}
