//! Runtime mode selection for the movie catalog.

use serde::{Deserialize, Serialize};

/// Which catalog backs searches and detail lookups.
///
/// Production talks to the remote HTTP catalog. Development serves a small
/// built-in catalog so the application works offline and without an API key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
pub enum RuntimeMode {
    /// Remote catalog over HTTP
    Production,
    /// Built-in offline catalog
    Development,
}

impl RuntimeMode {
    /// Check if running against the offline catalog.
    pub fn is_development(self) -> bool {
        matches!(self, Self::Development)
    }

}

impl Default for RuntimeMode {
    fn default() -> Self {
        // No API key is needed offline
        Self::Development
    }
}

impl std::fmt::Display for RuntimeMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Production => write!(f, "PRODUCTION"),
            Self::Development => write!(f, "DEVELOPMENT"),
        }
    }
}

impl std::str::FromStr for RuntimeMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "production" | "prod" => Ok(Self::Production),
            "development" | "dev" | "offline" => Ok(Self::Development),
            _ => Err(format!(
                "Invalid runtime mode: '{s}'. Valid options are: production, development"
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_aliases() {
        assert_eq!("prod".parse::<RuntimeMode>(), Ok(RuntimeMode::Production));
        assert_eq!("Offline".parse::<RuntimeMode>(), Ok(RuntimeMode::Development));
        assert!("staging".parse::<RuntimeMode>().is_err());
    }
}
