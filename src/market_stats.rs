// market_stats.rs - Rolling 24h ticker statistics per symbol

use crate::core_types::{SymbolId, TimestampMs};
use crate::models::Fill;
use rustc_hash::FxHashMap;

const WINDOW_MS: i64 = 24 * 60 * 60 * 1000;
const TRIM_EVERY: usize = 100;

#[derive(Debug, Clone, Copy)]
struct TradeRecord {
    price: u64,
    qty: u64,
    quote: u64,
    timestamp: TimestampMs,
}

/// Snapshot of 24h statistics for one symbol.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MarketStats {
    pub open_24h: u64,
    pub high_24h: u64,
    pub low_24h: u64,
    pub volume_24h: u64,
    pub quote_volume_24h: u64,
    pub last_price: u64,
    pub trade_count: u64,
}

#[derive(Debug, Default)]
struct SymbolStats {
    trades: Vec<TradeRecord>,
    open_24h: u64,
    last_price: u64,
    inserts: usize,
}

/// Rolling 24h stats, recomputed from a trade history that is trimmed
/// lazily. Trimming runs every `TRIM_EVERY` inserts rather than on each
/// trade, so a burst of fills costs O(1) amortized.
#[derive(Debug, Default)]
pub struct StatsManager {
    symbols: FxHashMap<SymbolId, SymbolStats>,
}

impl StatsManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold the fills of one execution into the symbol's history.
    /// `qty_unit` converts base qty to quote volume (price x qty / unit).
    pub fn record_fills(
        &mut self,
        symbol_id: SymbolId,
        fills: &[Fill],
        qty_unit: u64,
        now_ms: TimestampMs,
    ) {
        let stats = self.symbols.entry(symbol_id).or_default();
        for fill in fills {
            let quote = ((fill.price as u128 * fill.qty as u128) / qty_unit as u128) as u64;
            if stats.open_24h == 0 {
                // First trade ever establishes the session open.
                stats.open_24h = fill.price;
            }
            stats.last_price = fill.price;
            stats.trades.push(TradeRecord {
                price: fill.price,
                qty: fill.qty,
                quote,
                timestamp: now_ms,
            });
            stats.inserts += 1;
            if stats.inserts % TRIM_EVERY == 0 {
                let cutoff = now_ms - WINDOW_MS;
                stats.trades.retain(|t| t.timestamp >= cutoff);
            }
        }
    }

    /// Current 24h snapshot. Zero stats when the symbol has never
    /// traded; `last_price` survives even when the 24h window is empty.
    pub fn snapshot(&self, symbol_id: SymbolId, now_ms: TimestampMs) -> MarketStats {
        let Some(stats) = self.symbols.get(&symbol_id) else {
            return MarketStats::default();
        };
        let cutoff = now_ms - WINDOW_MS;
        let mut out = MarketStats {
            open_24h: stats.open_24h,
            last_price: stats.last_price,
            ..Default::default()
        };
        for t in stats.trades.iter().filter(|t| t.timestamp >= cutoff) {
            if out.trade_count == 0 {
                out.high_24h = t.price;
                out.low_24h = t.price;
            } else {
                out.high_24h = out.high_24h.max(t.price);
                out.low_24h = out.low_24h.min(t.price);
            }
            out.volume_24h += t.qty;
            out.quote_volume_24h += t.quote;
            out.trade_count += 1;
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    const SYM: SymbolId = 0;
    const UNIT: u64 = 100; // base qty scale of 2 for readable numbers

    fn fill(price: u64, qty: u64) -> Fill {
        Fill {
            price,
            qty,
            trade_id: 1,
            maker_user_id: "m".to_string(),
            maker_order_id: Uuid::new_v4(),
        }
    }

    #[test]
    fn never_traded_symbol_is_all_zero() {
        let mgr = StatsManager::new();
        assert_eq!(mgr.snapshot(SYM, 1_000_000), MarketStats::default());
    }

    #[test]
    fn folds_high_low_volume() {
        let mut mgr = StatsManager::new();
        mgr.record_fills(SYM, &[fill(100, 200), fill(120, 100), fill(90, 50)], UNIT, 1_000);
        let s = mgr.snapshot(SYM, 1_000);
        assert_eq!(s.open_24h, 100);
        assert_eq!(s.high_24h, 120);
        assert_eq!(s.low_24h, 90);
        assert_eq!(s.last_price, 90);
        assert_eq!(s.volume_24h, 350);
        // 100*200/100 + 120*100/100 + 90*50/100
        assert_eq!(s.quote_volume_24h, 200 + 120 + 45);
        assert_eq!(s.trade_count, 3);
    }

    #[test]
    fn trades_age_out_of_window() {
        let mut mgr = StatsManager::new();
        mgr.record_fills(SYM, &[fill(100, 10)], UNIT, 0);
        mgr.record_fills(SYM, &[fill(200, 20)], UNIT, WINDOW_MS / 2);

        let s = mgr.snapshot(SYM, WINDOW_MS + 1_000);
        // Only the second trade remains inside the window.
        assert_eq!(s.high_24h, 200);
        assert_eq!(s.low_24h, 200);
        assert_eq!(s.volume_24h, 20);
        assert_eq!(s.trade_count, 1);
        // Open and last are sticky.
        assert_eq!(s.open_24h, 100);
        assert_eq!(s.last_price, 200);
    }

    #[test]
    fn last_price_survives_empty_window() {
        let mut mgr = StatsManager::new();
        mgr.record_fills(SYM, &[fill(150, 10)], UNIT, 0);
        let s = mgr.snapshot(SYM, 10 * WINDOW_MS);
        assert_eq!(s.trade_count, 0);
        assert_eq!(s.volume_24h, 0);
        assert_eq!(s.last_price, 150);
    }

    #[test]
    fn history_trims_amortized() {
        let mut mgr = StatsManager::new();
        // 150 stale inserts, then one fresh; trim fires at insert 100
        // and 200 boundaries.
        for i in 0..150 {
            mgr.record_fills(SYM, &[fill(100, 1)], UNIT, i);
        }
        for i in 0..60 {
            mgr.record_fills(SYM, &[fill(100, 1)], UNIT, 2 * WINDOW_MS + i);
        }
        let stats = mgr.symbols.get(&SYM).unwrap();
        assert!(stats.trades.len() < 150);
    }
}
