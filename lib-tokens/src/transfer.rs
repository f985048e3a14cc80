//! Token Transfer Execution
//!
//! Balance-moving operations on [`CreatorToken`]. Every path goes through
//! `move_balance`, which validates before it writes, so a failed call leaves
//! balances and allowances untouched.

use lib_types::{Address, Amount};

use crate::contract::CreatorToken;
use crate::errors::{TokenError, TokenResult};

impl CreatorToken {
    /// Move `amount` from `from` to `to`
    pub fn transfer(&mut self, from: Address, to: Address, amount: Amount) -> TokenResult<()> {
        self.move_balance(from, to, amount)
    }

    /// Set the allowance of `spender` over `owner`'s balance (overwrites)
    pub fn approve(&mut self, owner: Address, spender: Address, amount: Amount) -> TokenResult<()> {
        if owner.is_zero() || spender.is_zero() {
            return Err(TokenError::ZeroAddress);
        }
        self.set_allowance(owner, spender, amount);
        Ok(())
    }

    /// Move `amount` from `from` to `to` on behalf of `spender`
    ///
    /// Consumes allowance; an allowance of `Amount::MAX` is treated as
    /// unlimited and is not decremented.
    pub fn transfer_from(
        &mut self,
        spender: Address,
        from: Address,
        to: Address,
        amount: Amount,
    ) -> TokenResult<()> {
        let allowed = self.allowance(&from, &spender);
        if allowed < amount {
            return Err(TokenError::InsufficientAllowance {
                have: allowed,
                need: amount,
            });
        }

        self.move_balance(from, to, amount)?;

        if allowed != Amount::MAX {
            self.set_allowance(from, spender, allowed - amount);
        }
        Ok(())
    }

    /// One-time, owner-only withdrawal of the self-held minted supply
    ///
    /// The factory uses this exactly once to move the full supply into the
    /// paired exchange's vault.
    pub fn withdraw_to(&mut self, caller: Address, dest: Address, amount: Amount) -> TokenResult<()> {
        if caller != self.owner {
            return Err(TokenError::Unauthorized { caller });
        }
        if self.is_withdrawn() {
            return Err(TokenError::AlreadyWithdrawn);
        }

        let token_address = self.address;
        self.move_balance(token_address, dest, amount)?;
        self.mark_withdrawn();
        Ok(())
    }

    fn move_balance(&mut self, from: Address, to: Address, amount: Amount) -> TokenResult<()> {
        if to.is_zero() {
            return Err(TokenError::ZeroAddress);
        }

        let from_balance = self.balance_of(&from);
        if from_balance < amount {
            return Err(TokenError::InsufficientBalance {
                have: from_balance,
                need: amount,
            });
        }
        if from == to || amount == 0 {
            return Ok(());
        }

        let new_from = from_balance - amount;
        let new_to = self
            .balance_of(&to)
            .checked_add(amount)
            .ok_or(TokenError::Overflow)?;

        self.set_balance(from, new_from);
        self.set_balance(to, new_to);

        // Full holder scan; debug builds only
        debug_assert!(self.is_conserved(), "token {} balances diverged from supply", self.address);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn addr(id: u8) -> Address {
        Address::new([id; 32])
    }

    const TOKEN: u8 = 10;
    const OWNER: u8 = 1;

    fn create_test_token(supply: Amount) -> CreatorToken {
        CreatorToken::new(
            addr(TOKEN),
            addr(OWNER),
            "Test".to_string(),
            "TST".to_string(),
            supply,
            18,
        )
        .unwrap()
    }

    /// Token whose supply has been handed to `vault`
    fn vaulted_token(supply: Amount, vault: Address) -> CreatorToken {
        let mut token = create_test_token(supply);
        token.withdraw_to(addr(OWNER), vault, supply).unwrap();
        token
    }

    #[test]
    fn test_withdraw_to_moves_full_supply_once() {
        let mut token = create_test_token(1_000);
        let vault = addr(20);

        token.withdraw_to(addr(OWNER), vault, 1_000).unwrap();
        assert_eq!(token.balance_of(&vault), 1_000);
        assert_eq!(token.balance_of(&addr(TOKEN)), 0);
        assert!(token.is_withdrawn());

        let again = token.withdraw_to(addr(OWNER), vault, 0);
        assert_eq!(again.unwrap_err(), TokenError::AlreadyWithdrawn);
    }

    #[test]
    fn test_withdraw_to_owner_only() {
        let mut token = create_test_token(1_000);
        let result = token.withdraw_to(addr(2), addr(2), 1_000);
        assert_eq!(result.unwrap_err(), TokenError::Unauthorized { caller: addr(2) });
        assert_eq!(token.balance_of(&addr(TOKEN)), 1_000);
        assert!(!token.is_withdrawn());
    }

    #[test]
    fn test_basic_transfer() {
        let vault = addr(20);
        let mut token = vaulted_token(10_000, vault);

        token.transfer(vault, addr(2), 1_000).unwrap();
        assert_eq!(token.balance_of(&vault), 9_000);
        assert_eq!(token.balance_of(&addr(2)), 1_000);
        assert!(token.is_conserved());
    }

    #[test]
    fn test_transfer_insufficient_balance() {
        let vault = addr(20);
        let mut token = vaulted_token(500, vault);

        let result = token.transfer(vault, addr(2), 1_000);
        assert_eq!(
            result.unwrap_err(),
            TokenError::InsufficientBalance { have: 500, need: 1_000 }
        );
        assert_eq!(token.balance_of(&vault), 500);
    }

    #[test]
    fn test_transfer_to_zero_address() {
        let vault = addr(20);
        let mut token = vaulted_token(500, vault);
        assert_eq!(
            token.transfer(vault, Address::zero(), 1).unwrap_err(),
            TokenError::ZeroAddress
        );
    }

    #[test]
    fn test_zero_amount_transfer_is_noop() {
        let vault = addr(20);
        let mut token = vaulted_token(500, vault);
        token.transfer(addr(3), addr(4), 0).unwrap();
        assert_eq!(token.balance_of(&addr(4)), 0);
        assert_eq!(token.holder_count(), 1);
    }

    #[test]
    fn test_transfer_from_consumes_allowance() {
        let vault = addr(20);
        let holder = addr(2);
        let spender = addr(3);
        let mut token = vaulted_token(1_000, vault);
        token.transfer(vault, holder, 300).unwrap();

        token.approve(holder, spender, 200).unwrap();
        token.transfer_from(spender, holder, vault, 150).unwrap();

        assert_eq!(token.balance_of(&holder), 150);
        assert_eq!(token.balance_of(&vault), 850);
        assert_eq!(token.allowance(&holder, &spender), 50);

        let result = token.transfer_from(spender, holder, vault, 100);
        assert_eq!(
            result.unwrap_err(),
            TokenError::InsufficientAllowance { have: 50, need: 100 }
        );
        assert_eq!(token.balance_of(&holder), 150);
    }

    #[test]
    fn test_transfer_from_failed_balance_keeps_allowance() {
        let vault = addr(20);
        let holder = addr(2);
        let spender = addr(3);
        let mut token = vaulted_token(1_000, vault);
        token.transfer(vault, holder, 10).unwrap();
        token.approve(holder, spender, 500).unwrap();

        let result = token.transfer_from(spender, holder, vault, 100);
        assert!(matches!(result, Err(TokenError::InsufficientBalance { .. })));
        assert_eq!(token.allowance(&holder, &spender), 500);
    }

    #[test]
    fn test_unlimited_allowance_not_decremented() {
        let vault = addr(20);
        let holder = addr(2);
        let spender = addr(3);
        let mut token = vaulted_token(1_000, vault);
        token.transfer(vault, holder, 300).unwrap();

        token.approve(holder, spender, Amount::MAX).unwrap();
        token.transfer_from(spender, holder, vault, 300).unwrap();
        assert_eq!(token.allowance(&holder, &spender), Amount::MAX);
    }

    proptest! {
        #[test]
        fn prop_transfers_conserve_supply(
            supply in 1u128..1_000_000_000_000u128,
            moves in proptest::collection::vec((0u8..5, 0u8..5, 0u128..1_000_000_000u128), 1..40),
        ) {
            let vault = addr(20);
            let mut token = vaulted_token(supply, vault);
            let holders = [vault, addr(2), addr(3), addr(4), addr(5)];

            for (from, to, amount) in moves {
                let from = holders[from as usize];
                let to = holders[to as usize];
                let before_from = token.balance_of(&from);
                match token.transfer(from, to, amount) {
                    Ok(()) => prop_assert!(before_from >= amount),
                    Err(_) => prop_assert_eq!(token.balance_of(&from), before_from),
                }
                prop_assert!(token.is_conserved());
                prop_assert_eq!(token.total_supply(), supply);
            }
        }
    }
}
