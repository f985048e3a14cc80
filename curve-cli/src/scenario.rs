//! Scenario files
//!
//! A scenario is a TOML list of steps replayed on a fresh ledger:
//!
//! ```toml
//! [[steps]]
//! action = "fund"
//! to = "alice"
//! amount = "20000000000000000"
//!
//! [[steps]]
//! action = "create"
//! pair = "song"
//! creator = "bob"
//! name = "Bob's Song"
//! symbol = "SONG"
//! supply = 1000000
//!
//! [[steps]]
//! action = "buy"
//! pair = "song"
//! buyer = "alice"
//! amount = 100
//! payment = "10000000000000000"
//! ```
//!
//! Accounts are labels or hex addresses. Amounts may be TOML integers or
//! decimal strings (for values beyond `i64`).

use serde::{Deserialize, Deserializer};
use std::path::Path;

use lib_curve::CurveConfig;
use lib_types::Amount;

use crate::error::{CliError, CliResult};

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Scenario {
    /// Overrides the `--config` file when present
    #[serde(default)]
    pub config: Option<CurveConfig>,
    #[serde(default)]
    pub steps: Vec<Step>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Step {
    Fund {
        to: String,
        #[serde(deserialize_with = "amount")]
        amount: Amount,
    },
    Create {
        /// Name later steps use to refer to this pair
        pair: String,
        creator: String,
        name: String,
        symbol: String,
        #[serde(deserialize_with = "amount")]
        supply: Amount,
        #[serde(default = "default_decimals")]
        decimals: u8,
    },
    Approve {
        pair: String,
        owner: String,
        #[serde(deserialize_with = "amount")]
        amount: Amount,
    },
    Buy {
        pair: String,
        buyer: String,
        #[serde(deserialize_with = "amount")]
        amount: Amount,
        #[serde(deserialize_with = "amount")]
        payment: Amount,
    },
    Sell {
        pair: String,
        seller: String,
        #[serde(deserialize_with = "amount")]
        amount: Amount,
    },
    Deposit {
        pair: String,
        from: String,
        #[serde(deserialize_with = "amount")]
        amount: Amount,
    },
    UpdateAdmin {
        caller: String,
        new_admin: String,
    },
    AdvanceBlock,
}

impl Step {
    pub fn action(&self) -> &'static str {
        match self {
            Step::Fund { .. } => "fund",
            Step::Create { .. } => "create",
            Step::Approve { .. } => "approve",
            Step::Buy { .. } => "buy",
            Step::Sell { .. } => "sell",
            Step::Deposit { .. } => "deposit",
            Step::UpdateAdmin { .. } => "update_admin",
            Step::AdvanceBlock => "advance_block",
        }
    }
}

impl Scenario {
    pub fn load(path: &Path) -> CliResult<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_toml_str(&raw)
    }

    pub fn from_toml_str(raw: &str) -> CliResult<Self> {
        let scenario: Scenario =
            toml::from_str(raw).map_err(|e| CliError::ScenarioError(e.to_string()))?;
        if let Some(config) = &scenario.config {
            config.validate()?;
        }
        Ok(scenario)
    }
}

fn default_decimals() -> u8 {
    lib_curve::DEFAULT_DECIMALS
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawAmount {
    Number(u64),
    Text(String),
}

fn amount<'de, D>(deserializer: D) -> Result<Amount, D::Error>
where
    D: Deserializer<'de>,
{
    match RawAmount::deserialize(deserializer)? {
        RawAmount::Number(n) => Ok(Amount::from(n)),
        RawAmount::Text(s) => s
            .trim()
            .replace('_', "")
            .parse::<Amount>()
            .map_err(|e| serde::de::Error::custom(format!("invalid amount '{}': {}", s, e))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_all_actions() {
        let raw = r#"
            [[steps]]
            action = "fund"
            to = "alice"
            amount = "200_000_000_000_000_000_000"

            [[steps]]
            action = "create"
            pair = "song"
            creator = "bob"
            name = "Song"
            symbol = "SNG"
            supply = 1000

            [[steps]]
            action = "approve"
            pair = "song"
            owner = "alice"
            amount = 10

            [[steps]]
            action = "buy"
            pair = "song"
            buyer = "alice"
            amount = 10
            payment = 1000

            [[steps]]
            action = "sell"
            pair = "song"
            seller = "alice"
            amount = 5

            [[steps]]
            action = "deposit"
            pair = "song"
            from = "alice"
            amount = 7

            [[steps]]
            action = "advance_block"

            [[steps]]
            action = "update_admin"
            caller = "admin"
            new_admin = "carol"
        "#;
        let scenario = Scenario::from_toml_str(raw).unwrap();
        assert_eq!(scenario.steps.len(), 8);
        assert!(scenario.config.is_none());
        assert_eq!(
            scenario.steps[0],
            Step::Fund { to: "alice".to_string(), amount: 200_000_000_000_000_000_000 }
        );
        match &scenario.steps[1] {
            Step::Create { supply, decimals, .. } => {
                assert_eq!(*supply, 1_000);
                assert_eq!(*decimals, 18);
            }
            other => panic!("unexpected step {:?}", other),
        }
        assert_eq!(scenario.steps[7].action(), "update_admin");
    }

    #[test]
    fn test_embedded_config() {
        let raw = r#"
            [config]
            admin = "treasury"
            default_k = 50

            [[steps]]
            action = "advance_block"
        "#;
        let scenario = Scenario::from_toml_str(raw).unwrap();
        assert_eq!(scenario.config.unwrap().default_k, 50);
    }

    #[test]
    fn test_invalid_scenarios() {
        assert!(matches!(
            Scenario::from_toml_str("[[steps]]\naction = \"launch\""),
            Err(CliError::ScenarioError(_))
        ));
        assert!(matches!(
            Scenario::from_toml_str("[[steps]]\naction = \"fund\"\nto = \"a\"\namount = \"lots\""),
            Err(CliError::ScenarioError(_))
        ));
        assert!(matches!(
            Scenario::from_toml_str("[config]\ndefault_k = 0"),
            Err(CliError::ConfigError(_))
        ));
    }
}
