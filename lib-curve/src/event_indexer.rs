//! Sled-backed Persistent Event Indexer

use std::sync::atomic::{AtomicU64, Ordering};

use lib_types::{Address, BlockHeight};

use crate::events::{CurveEvent, EventIndexer};

/// Sled-backed persistent event indexer
///
/// Events are stored once under a sequence key; the exchange, block and type
/// trees map secondary keys back to it. Sequence keys are fixed-width hex, so
/// iteration order is insertion order.
#[derive(Debug)]
pub struct SledEventIndexer {
    db: sled::Db,
    events: sled::Tree,
    exchange_index: sled::Tree,
    block_index: sled::Tree,
    type_index: sled::Tree,
    event_counter: AtomicU64,
}

const TREE_EVENTS: &str = "curve_events";
const TREE_EXCHANGE_INDEX: &str = "curve_events_exchange_idx";
const TREE_BLOCK_INDEX: &str = "curve_events_block_idx";
const TREE_TYPE_INDEX: &str = "curve_events_type_idx";
const KEY_COUNTER: &str = "meta:counter";

impl SledEventIndexer {
    pub fn open<P: AsRef<std::path::Path>>(path: P) -> Result<Self, sled::Error> {
        let db = sled::open(path)?;
        Self::from_db(db)
    }

    pub fn from_db(db: sled::Db) -> Result<Self, sled::Error> {
        let events = db.open_tree(TREE_EVENTS)?;
        let exchange_index = db.open_tree(TREE_EXCHANGE_INDEX)?;
        let block_index = db.open_tree(TREE_BLOCK_INDEX)?;
        let type_index = db.open_tree(TREE_TYPE_INDEX)?;

        let counter = events
            .get(KEY_COUNTER)?
            .map(|v| {
                let bytes: [u8; 8] = v.as_ref().try_into().unwrap_or([0u8; 8]);
                u64::from_be_bytes(bytes)
            })
            .unwrap_or(0);

        Ok(Self {
            db,
            events,
            exchange_index,
            block_index,
            type_index,
            event_counter: AtomicU64::new(counter),
        })
    }

    fn next_event_key(&self) -> String {
        let counter = self.event_counter.fetch_add(1, Ordering::SeqCst);
        format!("{:016x}", counter)
    }

    fn save_counter(&self) -> Result<(), sled::Error> {
        let counter = self.event_counter.load(Ordering::SeqCst);
        self.events.insert(KEY_COUNTER, &counter.to_be_bytes())?;
        Ok(())
    }

    /// Number of stored events
    pub fn event_count(&self) -> usize {
        let has_counter = self.events.contains_key(KEY_COUNTER).unwrap_or(false);
        self.events.len().saturating_sub(usize::from(has_counter))
    }

    pub fn flush(&self) -> Result<(), sled::Error> {
        self.events.flush()?;
        self.exchange_index.flush()?;
        self.block_index.flush()?;
        self.type_index.flush()?;
        self.db.flush()?;
        Ok(())
    }

    /// Store one event and its secondary index entries
    pub fn index_event_owned(&mut self, event: CurveEvent) {
        let event_key = self.next_event_key();

        let serialized = match bincode::serialize(&event) {
            Ok(data) => data,
            Err(e) => {
                tracing::error!("Failed to serialize event: {}", e);
                return;
            }
        };

        if let Err(e) = self.events.insert(event_key.as_bytes(), serialized) {
            tracing::error!("Failed to store event: {}", e);
            return;
        }
        if let Err(e) = self.save_counter() {
            tracing::error!("Failed to persist event counter: {}", e);
        }

        if let Some(exchange) = event.exchange() {
            let exchange_idx_key = format!("{}/{}", hex::encode(exchange.as_bytes()), &event_key);
            if let Err(e) = self
                .exchange_index
                .insert(exchange_idx_key.as_bytes(), event_key.as_bytes())
            {
                tracing::error!("Failed to update exchange index: {}", e);
            }
        }

        let block_idx_key = format!("{}/{}", block_prefix(event.block_height()), &event_key);
        if let Err(e) = self.block_index.insert(block_idx_key.as_bytes(), event_key.as_bytes()) {
            tracing::error!("Failed to update block index: {}", e);
        }

        let type_idx_key = format!("{}/{}", event.event_type(), &event_key);
        if let Err(e) = self.type_index.insert(type_idx_key.as_bytes(), event_key.as_bytes()) {
            tracing::error!("Failed to update type index: {}", e);
        }
    }

    /// Events of one type across all exchanges, oldest first
    pub fn events_by_type(&self, event_type: &str) -> Vec<CurveEvent> {
        let prefix = format!("{}/", event_type);
        self.collect(self.type_index.scan_prefix(prefix.as_bytes()), "type")
    }

    fn collect<I>(&self, entries: I, index_name: &str) -> Vec<CurveEvent>
    where
        I: Iterator<Item = sled::Result<(sled::IVec, sled::IVec)>>,
    {
        let mut events = Vec::new();

        for result in entries {
            match result {
                Ok((_, event_key)) => match self.events.get(&event_key) {
                    Ok(Some(data)) => match bincode::deserialize::<CurveEvent>(&data) {
                        Ok(event) => events.push(event),
                        Err(e) => tracing::error!("Failed to decode event: {}", e),
                    },
                    Ok(None) => {
                        tracing::warn!("Dangling {} index entry", index_name);
                    }
                    Err(e) => tracing::error!("Failed to load event: {}", e),
                },
                Err(e) => {
                    tracing::error!("Error reading {} index: {}", index_name, e);
                }
            }
        }

        events
    }
}

/// Zero-padded so lexicographic order matches numeric order
fn block_prefix(height: BlockHeight) -> String {
    format!("{:020}", height)
}

impl EventIndexer for SledEventIndexer {
    fn index_event(&mut self, event: CurveEvent) {
        self.index_event_owned(event);
    }

    fn exchange_events(&self, exchange: Address) -> Vec<CurveEvent> {
        let prefix = format!("{}/", hex::encode(exchange.as_bytes()));
        self.collect(self.exchange_index.scan_prefix(prefix.as_bytes()), "exchange")
    }

    fn trade_events(&self, exchange: Address) -> Vec<CurveEvent> {
        self.exchange_events(exchange)
            .into_iter()
            .filter(CurveEvent::is_trade)
            .collect()
    }

    fn events_in_range(&self, start_block: BlockHeight, end_block: BlockHeight) -> Vec<CurveEvent> {
        if start_block > end_block {
            return Vec::new();
        }
        // '/' sorts before '0', so "<end>0" bounds every "<end>/..." key
        let lower = format!("{}/", block_prefix(start_block));
        let upper = format!("{}0", block_prefix(end_block));
        self.collect(
            self.block_index.range(lower.as_bytes()..upper.as_bytes()),
            "block",
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lib_types::Amount;
    use tempfile::TempDir;

    fn addr(id: u8) -> Address {
        Address::new([id; 32])
    }

    fn trade(exchange: Address, block_height: u64, buy: bool) -> CurveEvent {
        let supply: Amount = 100;
        if buy {
            CurveEvent::Bought {
                exchange,
                buyer: addr(2),
                tokens_out: 10,
                amount_paid: 1_000,
                creator_fee: 0,
                admin_fee: 0,
                total_supply: supply,
                reserve_balance: 1_000,
                price: 201,
                block_height,
            }
        } else {
            CurveEvent::Sold {
                exchange,
                seller: addr(3),
                tokens_in: 5,
                amount_paid: 500,
                creator_fee: 0,
                admin_fee: 0,
                total_supply: supply - 5,
                reserve_balance: 500,
                price: 191,
                block_height,
            }
        }
    }

    #[test]
    fn test_sled_event_indexer_basic() {
        let temp_dir = TempDir::new().unwrap();
        let mut indexer = SledEventIndexer::open(temp_dir.path()).unwrap();

        let ex1 = addr(1);
        let ex2 = addr(4);

        indexer.index_event_owned(trade(ex1, 100, true));
        indexer.index_event_owned(trade(ex1, 101, true));
        indexer.index_event_owned(CurveEvent::ReserveDeposited {
            exchange: ex2,
            from: addr(3),
            amount: 7,
            reserve_balance: 7,
            block_height: 150,
        });
        indexer.index_event_owned(CurveEvent::AdminUpdated {
            previous: addr(8),
            new_admin: addr(9),
            block_height: 151,
        });
        indexer.flush().unwrap();

        assert_eq!(indexer.event_count(), 4);
        assert_eq!(indexer.exchange_events(ex1).len(), 2);
        assert_eq!(indexer.exchange_events(ex2).len(), 1);
        assert!(indexer.trade_events(ex2).is_empty());
        assert_eq!(indexer.events_by_type("admin_updated").len(), 1);
    }

    #[test]
    fn test_sled_event_persistence() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().to_path_buf();
        let ex1 = addr(1);

        {
            let mut indexer = SledEventIndexer::open(&path).unwrap();
            indexer.index_event_owned(trade(ex1, 100, true));
            indexer.index_event_owned(trade(ex1, 101, false));
            indexer.flush().unwrap();
        }

        {
            let mut indexer = SledEventIndexer::open(&path).unwrap();
            assert_eq!(indexer.exchange_events(ex1).len(), 2);
            assert_eq!(indexer.events_by_type("bought").len(), 1);
            assert_eq!(indexer.events_by_type("sold").len(), 1);

            // Counter resumes; new events do not overwrite old ones
            indexer.index_event_owned(trade(ex1, 102, true));
            assert_eq!(indexer.event_count(), 3);
            assert_eq!(indexer.latest_event(ex1).unwrap().block_height(), 102);
        }
    }

    #[test]
    fn test_sled_event_range_query() {
        let temp_dir = TempDir::new().unwrap();
        let mut indexer = SledEventIndexer::open(temp_dir.path()).unwrap();
        let ex1 = addr(1);

        for block in 95..=110 {
            indexer.index_event_owned(trade(ex1, block, true));
        }
        indexer.flush().unwrap();

        let events = indexer.events_in_range(99, 102);
        let heights: Vec<u64> = events.iter().map(CurveEvent::block_height).collect();
        assert_eq!(heights, vec![99, 100, 101, 102]);

        assert!(indexer.events_in_range(102, 99).is_empty());
        assert_eq!(indexer.events_in_range(110, 500).len(), 1);
    }

    #[test]
    fn test_sled_price_history() {
        let temp_dir = TempDir::new().unwrap();
        let mut indexer = SledEventIndexer::open(temp_dir.path()).unwrap();
        let ex1 = addr(1);

        indexer.index_event_owned(CurveEvent::PairCreated {
            creator: addr(5),
            token: addr(6),
            exchange: ex1,
            initial_supply: 1_000,
            block_height: 1,
        });
        indexer.index_event_owned(trade(ex1, 2, true));
        indexer.index_event_owned(trade(ex1, 3, false));

        let history = indexer.price_history(ex1);
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].market_cap, 201 * 100);
        assert_eq!(history[1].total_supply, 95);
    }
}
