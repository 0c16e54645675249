// Copyright (c) 2025, The Ruskit Authors
// MIT License
// All rights reserved.

//! # Exchange Registry Configuration
//!
//! Declares which exchanges exist when the registry starts. Loaded from JSON:
//!
//! ```json
//! {
//!   "standard_exchanges": true,
//!   "exchanges": [{ "name": "events", "type": "topic" }]
//! }
//! ```

use crate::{errors::ExchangeError, exchange::ExchangeKind};
use serde::{Deserialize, Serialize};
use tracing::error;

/// The standard exchange instances every broker provides.
pub const STANDARD_EXCHANGES: [(&str, ExchangeKind); 4] = [
    ("amq.direct", ExchangeKind::Direct),
    ("amq.fanout", ExchangeKind::Fanout),
    ("amq.topic", ExchangeKind::Topic),
    ("amq.match", ExchangeKind::Headers),
];

/// An exchange declared when the registry starts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExchangeDeclaration {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: ExchangeKind,
}

/// Exchanges the registry declares at start.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// Declare `amq.direct`, `amq.fanout`, `amq.topic` and `amq.match`
    #[serde(default = "default_standard_exchanges")]
    pub standard_exchanges: bool,
    #[serde(default)]
    pub exchanges: Vec<ExchangeDeclaration>,
}

fn default_standard_exchanges() -> bool {
    true
}

impl Default for RegistryConfig {
    fn default() -> Self {
        RegistryConfig {
            standard_exchanges: default_standard_exchanges(),
            exchanges: vec![],
        }
    }
}

impl RegistryConfig {
    /// Parses the configuration from a JSON document.
    ///
    /// # Returns
    /// The configuration or `InvalidConfig`
    pub fn from_json(raw: &str) -> Result<RegistryConfig, ExchangeError> {
        serde_json::from_str(raw).map_err(|err| {
            error!(error = err.to_string(), "failure to parse exchange configuration");
            ExchangeError::InvalidConfig(err.to_string())
        })
    }

    /// Every exchange to declare, standard instances first.
    pub fn declarations(&self) -> Vec<ExchangeDeclaration> {
        let standard = STANDARD_EXCHANGES
            .iter()
            .filter(|_| self.standard_exchanges)
            .map(|(name, kind)| ExchangeDeclaration {
                name: (*name).to_owned(),
                kind: *kind,
            });

        standard.chain(self.exchanges.iter().cloned()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_uses_defaults() {
        let cfg = RegistryConfig::from_json("{}").unwrap();
        assert_eq!(cfg, RegistryConfig::default());
        assert_eq!(cfg.declarations().len(), 4);
    }

    #[test]
    fn declares_configured_exchanges_after_standard_ones() {
        let cfg = RegistryConfig::from_json(
            r#"{"standard_exchanges": false, "exchanges": [{"name": "events", "type": "topic"}]}"#,
        )
        .unwrap();

        assert_eq!(
            cfg.declarations(),
            vec![ExchangeDeclaration {
                name: "events".to_owned(),
                kind: ExchangeKind::Topic,
            }]
        );
    }

    #[test]
    fn unknown_exchange_type_is_rejected() {
        let res = RegistryConfig::from_json(r#"{"exchanges": [{"name": "d", "type": "x-delayed"}]}"#);
        assert!(matches!(res, Err(ExchangeError::InvalidConfig(_))));
    }
}
