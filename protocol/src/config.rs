//! # Ledger Configuration & Constants
//!
//! Every magic number in the ledger lives here. If you're hardcoding a
//! constant somewhere else, move it here first.
//!
//! The fixed-point base and the default rate define how fast balances grow.
//! Changing them after deployment changes every holder's displayed balance,
//! so treat them as part of the ledger's identity.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::{Amount, RatePerSecond};

// ---------------------------------------------------------------------------
// Fixed-Point Parameters
// ---------------------------------------------------------------------------

/// The fixed-point "1.0". An accrual factor equal to this means no growth.
pub const PRECISION_FACTOR: u128 = 1_000_000_000_000_000_000;

/// Default global rate for a fresh deployment: 5e10 / 1e18 = 5e-8 per
/// second, roughly 158% a year of simple interest.
pub const DEFAULT_INTEREST_RATE: RatePerSecond = 50_000_000_000;

/// Amount sentinel meaning "the caller's entire current balance".
///
/// Accepted by `transfer`, `transfer_from`, `burn`, vault `redeem` and the
/// bridge pool. It is resolved to the settled displayed balance before any
/// validation, never rejected.
pub const FULL_BALANCE: Amount = u128::MAX;

/// Allowance value treated as unlimited. `transfer_from` does not decrease it.
pub const UNLIMITED_ALLOWANCE: Amount = u128::MAX;

// ---------------------------------------------------------------------------
// Token Metadata
// ---------------------------------------------------------------------------

/// Default token name.
pub const TOKEN_NAME: &str = "Rebase Token";

/// Default ticker.
pub const TOKEN_SYMBOL: &str = "RBT";

/// Display decimals. The ledger never divides by this.
pub const TOKEN_DECIMALS: u8 = 18;

/// Upper bound on display decimals accepted by [`LedgerConfig::validate`].
/// `10^36` is the largest power of ten that still leaves headroom in a `u128`.
pub const MAX_DECIMALS: u8 = 36;

// ---------------------------------------------------------------------------
// Well-Known Addresses
// ---------------------------------------------------------------------------

/// Address the deployment assigns to the ledger contract.
pub const TOKEN_ADDRESS: &str = "rebase-token";

/// Address the deployment assigns to the custodian vault.
pub const VAULT_ADDRESS: &str = "rebase-vault";

/// Address the deployment assigns to the bridge pool.
pub const POOL_ADDRESS: &str = "rebase-token-pool";

/// Chain selector used when none is configured.
pub const DEFAULT_CHAIN_SELECTOR: u64 = 1;

// ---------------------------------------------------------------------------
// LedgerConfig
// ---------------------------------------------------------------------------

/// Errors raised while loading or validating a [`LedgerConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    /// The config file is not valid TOML for this schema.
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    /// A field failed validation.
    #[error("invalid config field `{field}`: {reason}")]
    Invalid {
        /// Name of the offending field.
        field: &'static str,
        /// Why it was rejected.
        reason: String,
    },
}

/// Deployment-time parameters of a ledger.
///
/// Loadable from TOML; every field is optional in the file and falls back to
/// the constants above.
///
/// ```toml
/// name = "Rebase Token"
/// symbol = "RBT"
/// decimals = 18
/// initial_interest_rate = 50000000000
/// chain_selector = 1
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    /// Token name.
    pub name: String,
    /// Token ticker.
    pub symbol: String,
    /// Display decimals.
    pub decimals: u8,
    /// Global rate at deployment. Can only go down afterwards.
    ///
    /// TOML integers are 64-bit, so larger values are written as decimal
    /// strings.
    #[serde(with = "wide_integer")]
    pub initial_interest_rate: RatePerSecond,
    /// Selector identifying this chain to the bridge pool.
    pub chain_selector: u64,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            name: TOKEN_NAME.to_string(),
            symbol: TOKEN_SYMBOL.to_string(),
            decimals: TOKEN_DECIMALS,
            initial_interest_rate: DEFAULT_INTEREST_RATE,
            chain_selector: DEFAULT_CHAIN_SELECTOR,
        }
    }
}

impl LedgerConfig {
    /// Parses and validates a config from a TOML string.
    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        let config: LedgerConfig = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_toml_str(&raw)
    }

    /// Checks field invariants.
    ///
    /// A rate at or above `PRECISION_FACTOR` would double balances every
    /// second, which is never a sane deployment.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.name.trim().is_empty() {
            return Err(ConfigError::Invalid {
                field: "name",
                reason: "must not be empty".into(),
            });
        }
        if self.symbol.trim().is_empty() {
            return Err(ConfigError::Invalid {
                field: "symbol",
                reason: "must not be empty".into(),
            });
        }
        if self.decimals > MAX_DECIMALS {
            return Err(ConfigError::Invalid {
                field: "decimals",
                reason: format!("{} exceeds maximum of {}", self.decimals, MAX_DECIMALS),
            });
        }
        if self.initial_interest_rate >= PRECISION_FACTOR {
            return Err(ConfigError::Invalid {
                field: "initial_interest_rate",
                reason: format!(
                    "{} must be below the precision factor {}",
                    self.initial_interest_rate, PRECISION_FACTOR
                ),
            });
        }
        Ok(())
    }
}

/// Serde adapter for `u128` fields in formats limited to 64-bit integers.
///
/// Accepts a non-negative integer or a decimal string; writes an integer
/// when the value fits in an `i64` and a string otherwise.
mod wide_integer {
    use std::fmt;

    use serde::de::{self, Visitor};
    use serde::{Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &u128, serializer: S) -> Result<S::Ok, S::Error> {
        match i64::try_from(*value) {
            Ok(narrow) => serializer.serialize_i64(narrow),
            Err(_) => serializer.serialize_str(&value.to_string()),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u128, D::Error> {
        deserializer.deserialize_any(WideIntegerVisitor)
    }

    struct WideIntegerVisitor;

    impl<'de> Visitor<'de> for WideIntegerVisitor {
        type Value = u128;

        fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
            f.write_str("a non-negative integer or a decimal string")
        }

        fn visit_u64<E: de::Error>(self, v: u64) -> Result<u128, E> {
            Ok(u128::from(v))
        }

        fn visit_i64<E: de::Error>(self, v: i64) -> Result<u128, E> {
            u128::try_from(v).map_err(|_| E::invalid_value(de::Unexpected::Signed(v), &self))
        }

        fn visit_u128<E: de::Error>(self, v: u128) -> Result<u128, E> {
            Ok(v)
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<u128, E> {
            v.trim()
                .replace('_', "")
                .parse()
                .map_err(|_| E::invalid_value(de::Unexpected::Str(v), &self))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = LedgerConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.initial_interest_rate, DEFAULT_INTEREST_RATE);
    }

    #[test]
    fn partial_toml_falls_back_to_defaults() {
        let config = LedgerConfig::from_toml_str("symbol = \"XRB\"\n").unwrap();
        assert_eq!(config.symbol, "XRB");
        assert_eq!(config.name, TOKEN_NAME);
        assert_eq!(config.decimals, TOKEN_DECIMALS);
    }

    #[test]
    fn rate_at_precision_factor_rejected() {
        let raw = format!("initial_interest_rate = {}\n", PRECISION_FACTOR);
        let err = LedgerConfig::from_toml_str(&raw).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid {
                field: "initial_interest_rate",
                ..
            }
        ));
    }

    #[test]
    fn custom_rate_loads_from_toml() {
        let config = LedgerConfig::from_toml_str("initial_interest_rate = 40000000000\n").unwrap();
        assert_eq!(config.initial_interest_rate, 40_000_000_000);
    }

    #[test]
    fn rate_beyond_i64_accepted_as_string() {
        let raw = format!("initial_interest_rate = \"{}\"\n", u128::from(u64::MAX) + 1);
        let err = LedgerConfig::from_toml_str(&raw).unwrap_err();
        // Parsed fine, then rejected by validation.
        assert!(matches!(
            err,
            ConfigError::Invalid {
                field: "initial_interest_rate",
                ..
            }
        ));
        let config = LedgerConfig::from_toml_str("initial_interest_rate = \"1_000\"\n").unwrap();
        assert_eq!(config.initial_interest_rate, 1_000);
    }

    #[test]
    fn negative_rate_is_a_parse_error() {
        let err = LedgerConfig::from_toml_str("initial_interest_rate = -1\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn config_round_trips_through_toml() {
        let config = LedgerConfig {
            initial_interest_rate: 12_345,
            ..LedgerConfig::default()
        };
        let raw = toml::to_string(&config).unwrap();
        assert_eq!(LedgerConfig::from_toml_str(&raw).unwrap(), config);
    }

    #[test]
    fn empty_name_rejected() {
        let err = LedgerConfig::from_toml_str("name = \"  \"\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { field: "name", .. }));
    }

    #[test]
    fn garbage_toml_is_a_parse_error() {
        let err = LedgerConfig::from_toml_str("decimals = \"many\"").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn load_reads_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.toml");
        std::fs::write(&path, "decimals = 6\ninitial_interest_rate = 25000000000\n").unwrap();
        let config = LedgerConfig::load(&path).unwrap();
        assert_eq!(config.decimals, 6);
        assert_eq!(config.initial_interest_rate, 25_000_000_000);
    }

    #[test]
    fn sentinels_are_distinct_from_realistic_amounts() {
        assert_eq!(FULL_BALANCE, u128::MAX);
        assert!(DEFAULT_INTEREST_RATE < PRECISION_FACTOR);
    }
}
