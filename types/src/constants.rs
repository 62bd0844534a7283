/// Cash granted to a team the first time it logs in
pub const INITIAL_CASH: f64 = 10_000.0;

/// Well-known key of the round/event singleton
pub const EVENT_ID: &str = "event1";

/// Capacity of the ledger change broadcast channel
pub const DEFAULT_FEED_BUFFER: usize = 1024;
