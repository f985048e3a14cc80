//! CreatorToken
//!
//! Fixed-supply fungible asset issued per piece of creator content.
//! The full supply is minted to the token's own address at construction and
//! handed once, by its owner, into the custody of the paired exchange.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use lib_types::{Address, Amount};

use crate::errors::{TokenError, TokenResult};

/// Default display decimals for creator tokens
pub const DEFAULT_DECIMALS: u8 = 18;

// =============================================================================
// STATE ENTRIES
// =============================================================================

/// Value of one piece of mutable token state
///
/// Captured before a write so the write can be undone with
/// [`CreatorToken::restore`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenEntry {
    Balance { holder: Address, amount: Amount },
    Allowance { owner: Address, spender: Address, amount: Amount },
    Withdrawn(bool),
}

// =============================================================================
// TOKEN CONTRACT
// =============================================================================

/// Creator token state
///
/// `total_supply` is fixed at construction; only balances and allowances
/// change afterwards. The sum of all balances always equals `total_supply`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatorToken {
    // =========================================================================
    // Identity
    // =========================================================================
    /// Token contract address
    pub address: Address,
    /// Entity allowed to perform the one-time supply withdrawal
    pub owner: Address,

    // =========================================================================
    // Metadata
    // =========================================================================
    /// Human-readable token name
    pub name: String,
    /// Token symbol
    pub symbol: String,
    /// Number of decimal places (display only)
    pub decimals: u8,

    // =========================================================================
    // Ledger State
    // =========================================================================
    total_supply: Amount,
    balances: HashMap<Address, Amount>,
    /// owner -> spender -> remaining allowance
    allowances: HashMap<Address, HashMap<Address, Amount>>,
    /// Set once the owner has moved the minted supply out
    withdrawn: bool,
}

impl CreatorToken {
    /// Create a token and mint the entire supply to its own address
    pub fn new(
        address: Address,
        owner: Address,
        name: String,
        symbol: String,
        total_supply: Amount,
        decimals: u8,
    ) -> TokenResult<Self> {
        if address.is_zero() || owner.is_zero() {
            return Err(TokenError::ZeroAddress);
        }
        if total_supply == 0 {
            return Err(TokenError::ZeroSupply);
        }
        if name.is_empty() {
            return Err(TokenError::InvalidParameters("Name cannot be empty".to_string()));
        }
        if symbol.is_empty() {
            return Err(TokenError::InvalidParameters("Symbol cannot be empty".to_string()));
        }

        let mut balances = HashMap::new();
        balances.insert(address, total_supply);

        Ok(Self {
            address,
            owner,
            name,
            symbol,
            decimals,
            total_supply,
            balances,
            allowances: HashMap::new(),
            withdrawn: false,
        })
    }

    /// Fixed total supply
    pub fn total_supply(&self) -> Amount {
        self.total_supply
    }

    /// Balance of an address (zero if never credited)
    pub fn balance_of(&self, holder: &Address) -> Amount {
        self.balances.get(holder).copied().unwrap_or(0)
    }

    /// Remaining amount `spender` may move out of `owner`'s balance
    pub fn allowance(&self, owner: &Address, spender: &Address) -> Amount {
        self.allowances
            .get(owner)
            .and_then(|spenders| spenders.get(spender))
            .copied()
            .unwrap_or(0)
    }

    /// Whether the one-time supply withdrawal has happened
    pub fn is_withdrawn(&self) -> bool {
        self.withdrawn
    }

    /// Number of addresses holding a non-zero balance
    pub fn holder_count(&self) -> usize {
        self.balances.values().filter(|b| **b > 0).count()
    }

    /// Check Σ balances == total_supply
    pub fn is_conserved(&self) -> bool {
        self.balances
            .values()
            .try_fold(0 as Amount, |acc, b| acc.checked_add(*b))
            .map(|sum| sum == self.total_supply)
            .unwrap_or(false)
    }

    /// Current balance of `holder` as a restorable entry
    pub fn balance_entry(&self, holder: Address) -> TokenEntry {
        TokenEntry::Balance {
            holder,
            amount: self.balance_of(&holder),
        }
    }

    /// Current allowance of `spender` over `owner` as a restorable entry
    pub fn allowance_entry(&self, owner: Address, spender: Address) -> TokenEntry {
        TokenEntry::Allowance {
            owner,
            spender,
            amount: self.allowance(&owner, &spender),
        }
    }

    pub fn withdrawn_entry(&self) -> TokenEntry {
        TokenEntry::Withdrawn(self.withdrawn)
    }

    /// Write a previously captured entry back
    pub fn restore(&mut self, entry: TokenEntry) {
        match entry {
            TokenEntry::Balance { holder, amount } => self.set_balance(holder, amount),
            TokenEntry::Allowance { owner, spender, amount } => {
                if amount == 0 {
                    if let Some(spenders) = self.allowances.get_mut(&owner) {
                        spenders.remove(&spender);
                        if spenders.is_empty() {
                            self.allowances.remove(&owner);
                        }
                    }
                } else {
                    self.set_allowance(owner, spender, amount);
                }
            }
            TokenEntry::Withdrawn(withdrawn) => self.withdrawn = withdrawn,
        }
    }

    pub(crate) fn set_balance(&mut self, holder: Address, amount: Amount) {
        if amount == 0 {
            self.balances.remove(&holder);
        } else {
            self.balances.insert(holder, amount);
        }
    }

    pub(crate) fn set_allowance(&mut self, owner: Address, spender: Address, amount: Amount) {
        self.allowances.entry(owner).or_default().insert(spender, amount);
    }

    pub(crate) fn mark_withdrawn(&mut self) {
        self.withdrawn = true;
    }
}
