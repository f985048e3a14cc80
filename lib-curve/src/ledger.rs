//! Ledger
//!
//! World state shared by the factory, every exchange and every token:
//! native currency balances, token contracts, exchanges, the event log and
//! the current block height.
//!
//! Each public mutating call runs inside [`Ledger::atomic`]. While a call is
//! open every write records the prior value of the entry it touches in an
//! undo journal; if the call returns an error the journal is replayed
//! backwards to its starting mark, so a failed call leaves no partial
//! effects (including emitted events). The cost of a rollback is
//! proportional to what the call wrote, not to the size of the ledger.
//!
//! Addresses may register a [`TransferHook`]. Hooks run synchronously when
//! an exchange pays currency or delivers tokens to that address, receive the
//! ledger mutably and may call back into it. A hook error fails the
//! surrounding call.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::warn;

use lib_tokens::{CreatorToken, TokenEntry, TokenResult};
use lib_types::{Address, Amount, BlockHeight};

use crate::errors::{ExchangeError, ExchangeResult};
use crate::events::{CurveEvent, EventIndexer};
use crate::exchange::Exchange;
use crate::factory::{Factory, FactorySettings};

/// Callback run when an address receives currency or tokens from an exchange
pub trait TransferHook: Send + Sync {
    /// Currency credited to the hooked address
    fn on_native_received(
        &self,
        _ledger: &mut Ledger,
        _from: Address,
        _amount: Amount,
    ) -> Result<(), String> {
        Ok(())
    }

    /// Tokens credited to the hooked address
    fn on_tokens_received(
        &self,
        _ledger: &mut Ledger,
        _token: Address,
        _from: Address,
        _amount: Amount,
    ) -> Result<(), String> {
        Ok(())
    }
}

/// Point-in-time view of one exchange
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExchangeStats {
    pub exchange: Address,
    pub token: Address,
    pub creator: Address,
    pub admin: Address,
    pub k: Amount,
    pub total_supply: Amount,
    pub reserve_balance: Amount,
    /// Currency actually held by the exchange (reserve plus fee remainders
    /// and anything credited outside the curve)
    pub native_balance: Amount,
    /// Paired tokens still in the vault
    pub vault_balance: Amount,
    pub price_per_token: Amount,
    /// `price_per_token × total_supply`, saturating
    pub market_cap: Amount,
}

/// Rollback-able part of the ledger
#[derive(Debug)]
struct LedgerState {
    native: HashMap<Address, Amount>,
    tokens: HashMap<Address, CreatorToken>,
    exchanges: HashMap<Address, Exchange>,
    factory: Factory,
    events: Vec<CurveEvent>,
    block_height: BlockHeight,
}

/// Prior value of one entry written inside an open [`Ledger::atomic`] call
#[derive(Debug)]
enum Undo {
    Native(Address, Option<Amount>),
    Token(Address, TokenEntry),
    TokenInserted(Address, Option<Box<CreatorToken>>),
    Exchange(Address, Option<Box<Exchange>>),
    PairRegistered { creator: Address, token: Address },
    FactoryAdmin(Address),
    EventEmitted,
    EventsDrained(Vec<CurveEvent>),
    BlockHeight(BlockHeight),
}

/// Shared world state
pub struct Ledger {
    state: LedgerState,
    hooks: HashMap<Address, Arc<dyn TransferHook>>,
    journal: Vec<Undo>,
    /// Number of open `atomic` calls
    depth: usize,
}

impl std::fmt::Debug for Ledger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ledger")
            .field("state", &self.state)
            .field("hooks", &self.hooks.len())
            .field("depth", &self.depth)
            .finish()
    }
}

impl Ledger {
    /// Create an empty ledger with a single factory
    pub fn new(settings: FactorySettings) -> ExchangeResult<Self> {
        Ok(Self {
            state: LedgerState {
                native: HashMap::new(),
                tokens: HashMap::new(),
                exchanges: HashMap::new(),
                factory: Factory::new(settings)?,
                events: Vec::new(),
                block_height: 0,
            },
            hooks: HashMap::new(),
            journal: Vec::new(),
            depth: 0,
        })
    }

    /// Run `op` with all-or-nothing semantics
    ///
    /// Calls nest: a failing inner call undoes only its own writes, a failing
    /// outer call undoes everything written since it started.
    pub fn atomic<T>(
        &mut self,
        label: &str,
        op: impl FnOnce(&mut Self) -> ExchangeResult<T>,
    ) -> ExchangeResult<T> {
        let mark = self.journal.len();
        self.depth += 1;
        let result = op(self);
        self.depth -= 1;

        if let Err(e) = &result {
            warn!("{} rolled back: {}", label, e);
            self.rollback_to(mark);
        }
        if self.depth == 0 {
            self.journal.clear();
        }
        result
    }

    fn record(&mut self, undo: Undo) {
        if self.depth > 0 {
            self.journal.push(undo);
        }
    }

    fn rollback_to(&mut self, mark: usize) {
        while self.journal.len() > mark {
            let Some(undo) = self.journal.pop() else {
                break;
            };
            match undo {
                Undo::Native(holder, Some(amount)) => {
                    self.state.native.insert(holder, amount);
                }
                Undo::Native(holder, None) => {
                    self.state.native.remove(&holder);
                }
                Undo::Token(address, entry) => {
                    if let Some(token) = self.state.tokens.get_mut(&address) {
                        token.restore(entry);
                    }
                }
                Undo::TokenInserted(address, previous) => match previous {
                    Some(token) => {
                        self.state.tokens.insert(address, *token);
                    }
                    None => {
                        self.state.tokens.remove(&address);
                    }
                },
                Undo::Exchange(address, previous) => match previous {
                    Some(exchange) => {
                        self.state.exchanges.insert(address, *exchange);
                    }
                    None => {
                        self.state.exchanges.remove(&address);
                    }
                },
                Undo::PairRegistered { creator, token } => {
                    self.state.factory.unregister(&creator, &token);
                }
                Undo::FactoryAdmin(admin) => self.state.factory.restore_admin(admin),
                Undo::EventEmitted => {
                    self.state.events.pop();
                }
                Undo::EventsDrained(events) => self.state.events = events,
                Undo::BlockHeight(height) => self.state.block_height = height,
            }
        }
    }

    // =========================================================================
    // Views
    // =========================================================================

    pub fn factory(&self) -> &Factory {
        &self.state.factory
    }

    pub fn block_height(&self) -> BlockHeight {
        self.state.block_height
    }

    pub fn native_balance_of(&self, holder: &Address) -> Amount {
        self.state.native.get(holder).copied().unwrap_or(0)
    }

    pub fn exchange(&self, address: &Address) -> Option<&Exchange> {
        self.state.exchanges.get(address)
    }

    pub fn token(&self, address: &Address) -> Option<&CreatorToken> {
        self.state.tokens.get(address)
    }

    /// Token balance, zero for unknown tokens
    pub fn token_balance_of(&self, token: &Address, holder: &Address) -> Amount {
        self.token(token).map(|t| t.balance_of(holder)).unwrap_or(0)
    }

    /// Exchange for (creator, token) from the factory registry
    pub fn get_curve(&self, creator: &Address, token: &Address) -> Option<Address> {
        self.state.factory.get_curve(creator, token)
    }

    /// Events emitted so far and not yet drained
    pub fn events(&self) -> &[CurveEvent] {
        &self.state.events
    }

    /// Summary of one exchange
    pub fn exchange_stats(&self, address: &Address) -> ExchangeResult<ExchangeStats> {
        let exchange = self.exchange_ref(address)?;
        let price_per_token = exchange.current_price_per_token()?;

        Ok(ExchangeStats {
            exchange: *address,
            token: exchange.token(),
            creator: exchange.creator(),
            admin: exchange.admin(),
            k: exchange.k(),
            total_supply: exchange.total_supply(),
            reserve_balance: exchange.reserve_balance(),
            native_balance: self.native_balance_of(address),
            vault_balance: self.token_balance_of(&exchange.token(), address),
            price_per_token,
            market_cap: price_per_token.saturating_mul(exchange.total_supply()),
        })
    }

    // =========================================================================
    // Environment
    // =========================================================================

    /// Credit currency out of thin air (genesis / test funding)
    pub fn mint_native(&mut self, to: Address, amount: Amount) -> ExchangeResult<()> {
        if to.is_zero() {
            return Err(ExchangeError::ZeroAddress);
        }
        let balance = self.native_balance_of(&to);
        let updated = balance.checked_add(amount).ok_or(ExchangeError::Overflow)?;
        self.set_native(to, updated);
        Ok(())
    }

    /// Attach a transfer hook to an address, replacing any previous one
    pub fn register_hook(&mut self, address: Address, hook: Arc<dyn TransferHook>) {
        self.hooks.insert(address, hook);
    }

    pub fn remove_hook(&mut self, address: &Address) -> Option<Arc<dyn TransferHook>> {
        self.hooks.remove(address)
    }

    /// Move to the next block; returns the new height
    pub fn advance_block(&mut self) -> BlockHeight {
        self.record(Undo::BlockHeight(self.state.block_height));
        self.state.block_height = self.state.block_height.saturating_add(1);
        self.state.block_height
    }

    /// Take every pending event
    pub fn drain_events(&mut self) -> Vec<CurveEvent> {
        let events = std::mem::take(&mut self.state.events);
        if self.depth > 0 {
            self.record(Undo::EventsDrained(events.clone()));
        }
        events
    }

    /// Drain pending events into an indexer; returns how many were sent
    pub fn publish_events(&mut self, indexer: &mut dyn EventIndexer) -> usize {
        let events = self.drain_events();
        let count = events.len();
        for event in events {
            indexer.index_event(event);
        }
        count
    }

    // =========================================================================
    // Direct token operations
    // =========================================================================

    pub fn token_transfer(
        &mut self,
        token: Address,
        from: Address,
        to: Address,
        amount: Amount,
    ) -> ExchangeResult<()> {
        self.atomic("token transfer", |ledger| {
            ledger.move_tokens(token, from, to, amount)?;
            Ok(())
        })
    }

    pub fn token_approve(
        &mut self,
        token: Address,
        owner: Address,
        spender: Address,
        amount: Amount,
    ) -> ExchangeResult<()> {
        self.atomic("token approve", |ledger| {
            ledger.with_token(
                token,
                |t| vec![t.allowance_entry(owner, spender)],
                |t| t.approve(owner, spender, amount),
            )?;
            Ok(())
        })
    }

    pub fn token_transfer_from(
        &mut self,
        token: Address,
        spender: Address,
        from: Address,
        to: Address,
        amount: Amount,
    ) -> ExchangeResult<()> {
        self.atomic("token transfer_from", |ledger| {
            ledger.spend_tokens(token, spender, from, to, amount)?;
            Ok(())
        })
    }

    // =========================================================================
    // Internal plumbing
    // =========================================================================

    pub(crate) fn exchange_ref(&self, address: &Address) -> ExchangeResult<&Exchange> {
        self.state
            .exchanges
            .get(address)
            .ok_or(ExchangeError::ExchangeNotFound(*address))
    }

    /// Mutable exchange; its current value is journalled first
    pub(crate) fn exchange_mut(&mut self, address: &Address) -> ExchangeResult<&mut Exchange> {
        let previous = self.exchange_ref(address)?.clone();
        self.record(Undo::Exchange(*address, Some(Box::new(previous))));
        self.state
            .exchanges
            .get_mut(address)
            .ok_or(ExchangeError::ExchangeNotFound(*address))
    }

    /// Run a token operation after journalling the entries it may write
    pub(crate) fn with_token<T>(
        &mut self,
        address: Address,
        touched: impl FnOnce(&CreatorToken) -> Vec<TokenEntry>,
        op: impl FnOnce(&mut CreatorToken) -> TokenResult<T>,
    ) -> ExchangeResult<T> {
        let token = self
            .state
            .tokens
            .get(&address)
            .ok_or(ExchangeError::TokenNotFound(address))?;
        for entry in touched(token) {
            self.record(Undo::Token(address, entry));
        }
        let token = self
            .state
            .tokens
            .get_mut(&address)
            .ok_or(ExchangeError::TokenNotFound(address))?;
        op(token).map_err(ExchangeError::from)
    }

    /// Plain token transfer, no hooks
    pub(crate) fn move_tokens(
        &mut self,
        token: Address,
        from: Address,
        to: Address,
        amount: Amount,
    ) -> ExchangeResult<()> {
        self.with_token(
            token,
            |t| vec![t.balance_entry(from), t.balance_entry(to)],
            |t| t.transfer(from, to, amount),
        )
    }

    /// Allowance-checked token transfer, no hooks
    pub(crate) fn spend_tokens(
        &mut self,
        token: Address,
        spender: Address,
        from: Address,
        to: Address,
        amount: Amount,
    ) -> ExchangeResult<()> {
        self.with_token(
            token,
            |t| {
                vec![
                    t.balance_entry(from),
                    t.balance_entry(to),
                    t.allowance_entry(from, spender),
                ]
            },
            |t| t.transfer_from(spender, from, to, amount),
        )
    }

    pub(crate) fn insert_token(&mut self, token: CreatorToken) {
        let address = token.address;
        let previous = self.state.tokens.insert(address, token);
        self.record(Undo::TokenInserted(address, previous.map(Box::new)));
    }

    pub(crate) fn insert_exchange(&mut self, exchange: Exchange) {
        let address = exchange.address;
        let previous = self.state.exchanges.insert(address, exchange);
        self.record(Undo::Exchange(address, previous.map(Box::new)));
    }

    pub(crate) fn register_pair(
        &mut self,
        creator: Address,
        token: Address,
        exchange: Address,
    ) -> ExchangeResult<()> {
        self.state.factory.register(creator, token, exchange)?;
        self.record(Undo::PairRegistered { creator, token });
        Ok(())
    }

    /// Returns the previous admin
    pub(crate) fn set_factory_admin(
        &mut self,
        caller: Address,
        new_admin: Address,
    ) -> ExchangeResult<Address> {
        let previous = self.state.factory.set_admin(caller, new_admin)?;
        self.record(Undo::FactoryAdmin(previous));
        Ok(previous)
    }

    pub(crate) fn emit(&mut self, event: CurveEvent) {
        self.state.events.push(event);
        self.record(Undo::EventEmitted);
    }

    fn set_native(&mut self, holder: Address, amount: Amount) {
        let previous = self.state.native.insert(holder, amount);
        self.record(Undo::Native(holder, previous));
    }

    /// Move currency without running hooks
    pub(crate) fn move_native(
        &mut self,
        from: Address,
        to: Address,
        amount: Amount,
    ) -> ExchangeResult<()> {
        if to.is_zero() {
            return Err(ExchangeError::ZeroAddress);
        }
        let have = self.native_balance_of(&from);
        if have < amount {
            return Err(ExchangeError::InsufficientFunds { have, need: amount });
        }
        if from == to || amount == 0 {
            return Ok(());
        }

        let credited = self
            .native_balance_of(&to)
            .checked_add(amount)
            .ok_or(ExchangeError::Overflow)?;
        self.set_native(from, have - amount);
        self.set_native(to, credited);
        Ok(())
    }

    /// Pay currency and run the recipient's hook; the caller decides how a
    /// failure is reported
    pub(crate) fn send_native(
        &mut self,
        from: Address,
        to: Address,
        amount: Amount,
    ) -> Result<(), String> {
        self.move_native(from, to, amount).map_err(|e| e.to_string())?;
        if let Some(hook) = self.hooks.get(&to).cloned() {
            hook.on_native_received(self, from, amount)?;
        }
        Ok(())
    }

    /// Transfer tokens and run the recipient's hook
    pub(crate) fn send_tokens(
        &mut self,
        token: Address,
        from: Address,
        to: Address,
        amount: Amount,
    ) -> Result<(), String> {
        self.move_tokens(token, from, to, amount)
            .map_err(|e| e.to_string())?;
        if let Some(hook) = self.hooks.get(&to).cloned() {
            hook.on_tokens_received(self, token, from, amount)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fees::FeeSchedule;
    use std::sync::Mutex;

    fn addr(id: u8) -> Address {
        Address::new([id; 32])
    }

    fn test_ledger() -> Ledger {
        Ledger::new(FactorySettings {
            admin: addr(1),
            default_k: 1_000,
            fees: FeeSchedule::default(),
        })
        .unwrap()
    }

    #[test]
    fn test_mint_and_move_native() {
        let mut ledger = test_ledger();
        ledger.mint_native(addr(2), 100).unwrap();
        ledger.move_native(addr(2), addr(3), 40).unwrap();

        assert_eq!(ledger.native_balance_of(&addr(2)), 60);
        assert_eq!(ledger.native_balance_of(&addr(3)), 40);
        assert_eq!(
            ledger.move_native(addr(2), addr(3), 61).unwrap_err(),
            ExchangeError::InsufficientFunds { have: 60, need: 61 }
        );
        assert_eq!(ledger.mint_native(Address::zero(), 1).unwrap_err(), ExchangeError::ZeroAddress);
    }

    #[test]
    fn test_mint_overflow() {
        let mut ledger = test_ledger();
        ledger.mint_native(addr(2), Amount::MAX).unwrap();
        assert_eq!(ledger.mint_native(addr(2), 1).unwrap_err(), ExchangeError::Overflow);
    }

    #[test]
    fn test_atomic_rolls_back_on_error() {
        let mut ledger = test_ledger();
        ledger.mint_native(addr(2), 100).unwrap();

        let result: ExchangeResult<()> = ledger.atomic("test", |l| {
            l.move_native(addr(2), addr(3), 50)?;
            l.emit(CurveEvent::AdminUpdated {
                previous: addr(1),
                new_admin: addr(4),
                block_height: 0,
            });
            Err(ExchangeError::Overflow)
        });

        assert_eq!(result.unwrap_err(), ExchangeError::Overflow);
        assert_eq!(ledger.native_balance_of(&addr(2)), 100);
        assert_eq!(ledger.native_balance_of(&addr(3)), 0);
        assert!(ledger.events().is_empty());
    }

    #[test]
    fn test_atomic_keeps_successful_effects() {
        let mut ledger = test_ledger();
        ledger.mint_native(addr(2), 100).unwrap();

        ledger
            .atomic("test", |l| l.move_native(addr(2), addr(3), 50))
            .unwrap();
        assert_eq!(ledger.native_balance_of(&addr(3)), 50);
    }

    #[test]
    fn test_journal_holds_only_written_entries() {
        let mut ledger = test_ledger();
        // Unrelated accounts never enter the journal
        for id in 0..=255u8 {
            let mut bytes = [7u8; 32];
            bytes[0] = id;
            ledger.mint_native(Address::new(bytes), 1).unwrap();
        }
        ledger.mint_native(addr(2), 100).unwrap();

        let result: ExchangeResult<()> = ledger.atomic("test", |l| {
            l.move_native(addr(2), addr(3), 50)?;
            assert_eq!(l.journal.len(), 2);
            Err(ExchangeError::Overflow)
        });

        assert!(result.is_err());
        assert!(ledger.journal.is_empty());
        assert_eq!(ledger.depth, 0);
        assert_eq!(ledger.native_balance_of(&addr(2)), 100);
        assert_eq!(ledger.native_balance_of(&addr(3)), 0);
        assert_eq!(ledger.state.native.len(), 257);
    }

    #[test]
    fn test_nested_failure_undoes_only_inner_writes() {
        let mut ledger = test_ledger();
        ledger.mint_native(addr(2), 100).unwrap();

        ledger
            .atomic("outer", |l| {
                l.move_native(addr(2), addr(3), 10)?;
                let inner: ExchangeResult<()> = l.atomic("inner", |l| {
                    l.move_native(addr(2), addr(4), 20)?;
                    l.advance_block();
                    Err(ExchangeError::ReentrancyRejected)
                });
                assert!(inner.is_err());
                assert_eq!(l.native_balance_of(&addr(4)), 0);
                assert_eq!(l.block_height(), 0);
                Ok(())
            })
            .unwrap();

        assert_eq!(ledger.native_balance_of(&addr(2)), 90);
        assert_eq!(ledger.native_balance_of(&addr(3)), 10);
        assert!(ledger.journal.is_empty());
    }

    #[test]
    fn test_rollback_restores_drained_events() {
        let mut ledger = test_ledger();
        let event = CurveEvent::AdminUpdated {
            previous: addr(1),
            new_admin: addr(4),
            block_height: 0,
        };
        ledger.emit(event.clone());

        let result: ExchangeResult<()> = ledger.atomic("test", |l| {
            l.emit(event.clone());
            assert_eq!(l.drain_events().len(), 2);
            Err(ExchangeError::Overflow)
        });

        assert!(result.is_err());
        assert_eq!(ledger.events(), &[event][..]);
    }

    struct Recorder {
        seen: Mutex<Vec<(Address, Amount)>>,
    }

    impl TransferHook for Recorder {
        fn on_native_received(
            &self,
            _ledger: &mut Ledger,
            from: Address,
            amount: Amount,
        ) -> Result<(), String> {
            self.seen.lock().unwrap().push((from, amount));
            Ok(())
        }
    }

    struct Rejecting;

    impl TransferHook for Rejecting {
        fn on_native_received(&self, _: &mut Ledger, _: Address, _: Amount) -> Result<(), String> {
            Err("not accepting".to_string())
        }
    }

    #[test]
    fn test_send_native_runs_hook() {
        let mut ledger = test_ledger();
        let recorder = Arc::new(Recorder { seen: Mutex::new(Vec::new()) });
        ledger.register_hook(addr(3), recorder.clone());
        ledger.mint_native(addr(2), 10).unwrap();

        ledger.send_native(addr(2), addr(3), 10).unwrap();
        assert_eq!(*recorder.seen.lock().unwrap(), vec![(addr(2), 10)]);

        // Plain moves skip hooks
        ledger.mint_native(addr(2), 5).unwrap();
        ledger.move_native(addr(2), addr(3), 5).unwrap();
        assert_eq!(recorder.seen.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_rejecting_hook_fails_send() {
        let mut ledger = test_ledger();
        ledger.register_hook(addr(3), Arc::new(Rejecting));
        ledger.mint_native(addr(2), 10).unwrap();

        assert_eq!(ledger.send_native(addr(2), addr(3), 10).unwrap_err(), "not accepting");

        // Direct sends are not transactional; the rejected amount already moved
        assert_eq!(ledger.native_balance_of(&addr(3)), 10);

        ledger.remove_hook(&addr(3));
        ledger.mint_native(addr(2), 10).unwrap();
        assert!(ledger.send_native(addr(2), addr(3), 10).is_ok());
    }

    #[test]
    fn test_advance_block_and_drain() {
        let mut ledger = test_ledger();
        assert_eq!(ledger.advance_block(), 1);
        assert_eq!(ledger.block_height(), 1);

        ledger.emit(CurveEvent::AdminUpdated {
            previous: addr(1),
            new_admin: addr(4),
            block_height: 1,
        });
        let mut indexer = crate::events::InMemoryEventIndexer::new();
        assert_eq!(ledger.publish_events(&mut indexer), 1);
        assert_eq!(indexer.event_count(), 1);
        assert!(ledger.drain_events().is_empty());
    }

    #[test]
    fn test_unknown_exchange() {
        let ledger = test_ledger();
        assert_eq!(
            ledger.exchange_stats(&addr(9)).unwrap_err(),
            ExchangeError::ExchangeNotFound(addr(9))
        );
    }
}
