//! Pair Factory
//!
//! Deploys token + exchange pairs and keeps the two-level registry
//! `creator -> token -> exchange`. A creator may own any number of pairs;
//! each (creator, token) key maps to exactly one exchange.
//!
//! The factory's admin and default curve are copied into each exchange's
//! [`ExchangeConfig`] at deployment. Changing the admin later only affects
//! pairs deployed afterwards.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use lib_types::{Address, Amount};

use crate::errors::{ExchangeError, ExchangeResult};
use crate::exchange::ExchangeConfig;
use crate::fees::FeeSchedule;
use crate::pricing::QuadraticCurve;

/// Domain separator for the factory address
pub const FACTORY_DOMAIN: &[u8] = b"CURVE_FACTORY_V1";
/// Domain separator for token addresses
pub const TOKEN_DOMAIN: &[u8] = b"CURVE_TOKEN_V1";
/// Domain separator for exchange addresses
pub const EXCHANGE_DOMAIN: &[u8] = b"CURVE_EXCHANGE_V1";

/// Construction parameters for a [`Factory`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FactorySettings {
    /// Admin fee recipient for new pairs
    pub admin: Address,
    /// Curve constant for new pairs
    pub default_k: Amount,
    /// Fee schedule for new pairs
    pub fees: FeeSchedule,
}

/// Pair factory and registry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Factory {
    /// Factory address (owner of every token it deploys)
    pub address: Address,
    admin: Address,
    default_curve: QuadraticCurve,
    fees: FeeSchedule,
    /// creator -> token -> exchange
    registry: HashMap<Address, HashMap<Address, Address>>,
    /// Deployment nonce, also the total number of pairs
    deployments: u64,
}

impl Factory {
    /// Create a factory; its address is derived from the initial admin
    pub fn new(settings: FactorySettings) -> ExchangeResult<Self> {
        if settings.admin.is_zero() {
            return Err(ExchangeError::ZeroAddress);
        }
        let default_curve = QuadraticCurve::new(settings.default_k)?;
        settings.fees.validate()?;

        Ok(Self {
            address: Address::derive(FACTORY_DOMAIN, &[settings.admin.as_bytes()]),
            admin: settings.admin,
            default_curve,
            fees: settings.fees,
            registry: HashMap::new(),
            deployments: 0,
        })
    }

    /// Admin captured by the next deployment
    pub fn admin(&self) -> Address {
        self.admin
    }

    pub fn default_k(&self) -> Amount {
        self.default_curve.k()
    }

    pub fn fees(&self) -> FeeSchedule {
        self.fees
    }

    /// Exchange for (creator, token), if deployed
    pub fn get_curve(&self, creator: &Address, token: &Address) -> Option<Address> {
        self.registry
            .get(creator)
            .and_then(|tokens| tokens.get(token))
            .copied()
    }

    /// All (token, exchange) pairs of a creator, ordered by token address
    pub fn pairs_of(&self, creator: &Address) -> Vec<(Address, Address)> {
        let mut pairs: Vec<(Address, Address)> = self
            .registry
            .get(creator)
            .map(|tokens| tokens.iter().map(|(t, e)| (*t, *e)).collect())
            .unwrap_or_default();
        pairs.sort();
        pairs
    }

    /// Total number of deployed pairs
    pub fn pair_count(&self) -> u64 {
        self.deployments
    }

    /// Addresses the next deployment will use: (token, exchange)
    pub fn next_addresses(&self) -> (Address, Address) {
        let nonce = self.deployments.to_be_bytes();
        (
            Address::derive(TOKEN_DOMAIN, &[self.address.as_bytes(), &nonce]),
            Address::derive(EXCHANGE_DOMAIN, &[self.address.as_bytes(), &nonce]),
        )
    }

    /// Frozen configuration for a new exchange
    pub fn exchange_config(&self, token: Address, creator: Address) -> ExchangeConfig {
        ExchangeConfig {
            token,
            creator,
            admin: self.admin,
            curve: self.default_curve,
            fees: self.fees,
        }
    }

    /// Record a deployed pair; each (creator, token) key may be used once
    pub fn register(
        &mut self,
        creator: Address,
        token: Address,
        exchange: Address,
    ) -> ExchangeResult<()> {
        if self.get_curve(&creator, &token).is_some() {
            return Err(ExchangeError::PairAlreadyExists { creator, token });
        }

        self.registry.entry(creator).or_default().insert(token, exchange);
        self.deployments = self.deployments.checked_add(1).ok_or(ExchangeError::Overflow)?;
        Ok(())
    }

    /// Replace the admin for future deployments; returns the previous admin
    pub fn set_admin(&mut self, caller: Address, new_admin: Address) -> ExchangeResult<Address> {
        if caller != self.admin {
            return Err(ExchangeError::Unauthorized(format!(
                "{} is not the factory admin",
                caller
            )));
        }
        if new_admin.is_zero() {
            return Err(ExchangeError::ZeroAddress);
        }

        let previous = self.admin;
        self.admin = new_admin;
        Ok(previous)
    }

    /// Undo a [`Factory::register`]
    pub(crate) fn unregister(&mut self, creator: &Address, token: &Address) {
        let removed = match self.registry.get_mut(creator) {
            Some(tokens) => {
                let removed = tokens.remove(token).is_some();
                if tokens.is_empty() {
                    self.registry.remove(creator);
                }
                removed
            }
            None => false,
        };
        if removed {
            self.deployments = self.deployments.saturating_sub(1);
        }
    }

    /// Undo a [`Factory::set_admin`]
    pub(crate) fn restore_admin(&mut self, admin: Address) {
        self.admin = admin;
    }
}
