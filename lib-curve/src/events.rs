//! Exchange Events
//!
//! Every committed state change emits an event. Off-chain consumers build
//! price history and market-cap series from `Bought`/`Sold`, which carry the
//! post-trade supply, reserve and price.

use serde::{Deserialize, Serialize};

use lib_types::{Address, Amount, BlockHeight};

/// Factory and exchange events
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum CurveEvent {
    /// Token + exchange pair deployed
    PairCreated {
        creator: Address,
        token: Address,
        exchange: Address,
        /// Fixed token supply moved into the exchange vault
        initial_supply: Amount,
        block_height: BlockHeight,
    },

    /// Units bought from the curve
    Bought {
        exchange: Address,
        buyer: Address,
        tokens_out: Amount,
        /// Curve cost charged (excess payment was refunded)
        amount_paid: Amount,
        creator_fee: Amount,
        admin_fee: Amount,
        /// Circulating supply after the trade
        total_supply: Amount,
        /// Reserve after the trade
        reserve_balance: Amount,
        /// Price of the next unit after the trade
        price: Amount,
        block_height: BlockHeight,
    },

    /// Units sold back to the curve
    Sold {
        exchange: Address,
        seller: Address,
        tokens_in: Amount,
        /// Currency paid to the seller after fees
        amount_paid: Amount,
        creator_fee: Amount,
        admin_fee: Amount,
        total_supply: Amount,
        reserve_balance: Amount,
        price: Amount,
        block_height: BlockHeight,
    },

    /// Currency sent to an exchange without a trade
    ReserveDeposited {
        exchange: Address,
        from: Address,
        amount: Amount,
        reserve_balance: Amount,
        block_height: BlockHeight,
    },

    /// Factory admin changed (future deployments only)
    AdminUpdated {
        previous: Address,
        new_admin: Address,
        block_height: BlockHeight,
    },
}

impl CurveEvent {
    /// Exchange this event belongs to (`None` for factory-level events)
    pub fn exchange(&self) -> Option<&Address> {
        match self {
            CurveEvent::PairCreated { exchange, .. } => Some(exchange),
            CurveEvent::Bought { exchange, .. } => Some(exchange),
            CurveEvent::Sold { exchange, .. } => Some(exchange),
            CurveEvent::ReserveDeposited { exchange, .. } => Some(exchange),
            CurveEvent::AdminUpdated { .. } => None,
        }
    }

    /// Block height for this event
    pub fn block_height(&self) -> BlockHeight {
        match self {
            CurveEvent::PairCreated { block_height, .. } => *block_height,
            CurveEvent::Bought { block_height, .. } => *block_height,
            CurveEvent::Sold { block_height, .. } => *block_height,
            CurveEvent::ReserveDeposited { block_height, .. } => *block_height,
            CurveEvent::AdminUpdated { block_height, .. } => *block_height,
        }
    }

    /// Event type name
    pub fn event_type(&self) -> &'static str {
        match self {
            CurveEvent::PairCreated { .. } => "pair_created",
            CurveEvent::Bought { .. } => "bought",
            CurveEvent::Sold { .. } => "sold",
            CurveEvent::ReserveDeposited { .. } => "reserve_deposited",
            CurveEvent::AdminUpdated { .. } => "admin_updated",
        }
    }

    /// Whether this is a `Bought` or `Sold`
    pub fn is_trade(&self) -> bool {
        matches!(self, CurveEvent::Bought { .. } | CurveEvent::Sold { .. })
    }

    /// Price/market-cap sample carried by a trade event
    pub fn price_point(&self) -> Option<PricePoint> {
        match *self {
            CurveEvent::Bought { total_supply, reserve_balance, price, block_height, .. }
            | CurveEvent::Sold { total_supply, reserve_balance, price, block_height, .. } => {
                Some(PricePoint {
                    block_height,
                    price,
                    total_supply,
                    reserve_balance,
                    market_cap: price.saturating_mul(total_supply),
                })
            }
            _ => None,
        }
    }
}

/// One sample of an exchange's price series
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricePoint {
    pub block_height: BlockHeight,
    /// Price of the next unit
    pub price: Amount,
    pub total_supply: Amount,
    pub reserve_balance: Amount,
    /// `price × total_supply`, saturating
    pub market_cap: Amount,
}

/// Event indexer interface
///
/// Implement this to serve event queries for API consumers.
pub trait EventIndexer {
    /// Index a new event
    fn index_event(&mut self, event: CurveEvent);

    /// All events for an exchange, oldest first
    fn exchange_events(&self, exchange: Address) -> Vec<CurveEvent>;

    /// `Bought`/`Sold` events for an exchange, oldest first
    fn trade_events(&self, exchange: Address) -> Vec<CurveEvent>;

    /// Events with `start_block <= height <= end_block`
    fn events_in_range(&self, start_block: BlockHeight, end_block: BlockHeight) -> Vec<CurveEvent>;

    /// Most recent event for an exchange
    fn latest_event(&self, exchange: Address) -> Option<CurveEvent> {
        self.exchange_events(exchange).into_iter().last()
    }

    /// Price series built from trade events
    fn price_history(&self, exchange: Address) -> Vec<PricePoint> {
        self.trade_events(exchange)
            .iter()
            .filter_map(CurveEvent::price_point)
            .collect()
    }
}

/// In-memory event indexer for testing
#[derive(Debug, Clone, Default)]
pub struct InMemoryEventIndexer {
    events: Vec<CurveEvent>,
}

impl InMemoryEventIndexer {
    pub fn new() -> Self {
        Self { events: Vec::new() }
    }

    pub fn event_count(&self) -> usize {
        self.events.len()
    }
}

impl EventIndexer for InMemoryEventIndexer {
    fn index_event(&mut self, event: CurveEvent) {
        self.events.push(event);
    }

    fn exchange_events(&self, exchange: Address) -> Vec<CurveEvent> {
        self.events
            .iter()
            .filter(|e| e.exchange() == Some(&exchange))
            .cloned()
            .collect()
    }

    fn trade_events(&self, exchange: Address) -> Vec<CurveEvent> {
        self.events
            .iter()
            .filter(|e| e.is_trade() && e.exchange() == Some(&exchange))
            .cloned()
            .collect()
    }

    fn events_in_range(&self, start_block: BlockHeight, end_block: BlockHeight) -> Vec<CurveEvent> {
        self.events
            .iter()
            .filter(|e| {
                let height = e.block_height();
                height >= start_block && height <= end_block
            })
            .cloned()
            .collect()
    }
}
