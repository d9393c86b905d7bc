// kline.rs - OHLCV candlestick aggregation across six intervals

use crate::core_types::{SymbolId, TimestampMs};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;
use std::str::FromStr;

/// Candlestick interval. Windows are aligned to the Unix epoch by
/// flooring the trade timestamp to a multiple of the duration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Interval {
    #[serde(rename = "1m")]
    M1,
    #[serde(rename = "5m")]
    M5,
    #[serde(rename = "15m")]
    M15,
    #[serde(rename = "1h")]
    H1,
    #[serde(rename = "4h")]
    H4,
    #[serde(rename = "1d")]
    D1,
}

impl Interval {
    pub const ALL: [Interval; 6] = [
        Interval::M1,
        Interval::M5,
        Interval::M15,
        Interval::H1,
        Interval::H4,
        Interval::D1,
    ];

    pub fn duration_ms(&self) -> i64 {
        match self {
            Interval::M1 => 60_000,
            Interval::M5 => 300_000,
            Interval::M15 => 900_000,
            Interval::H1 => 3_600_000,
            Interval::H4 => 14_400_000,
            Interval::D1 => 86_400_000,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Interval::M1 => "1m",
            Interval::M5 => "5m",
            Interval::M15 => "15m",
            Interval::H1 => "1h",
            Interval::H4 => "4h",
            Interval::D1 => "1d",
        }
    }

    /// Window open time for a trade at `ts`.
    pub fn floor(&self, ts: TimestampMs) -> TimestampMs {
        ts - ts.rem_euclid(self.duration_ms())
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Interval {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "1m" => Ok(Interval::M1),
            "5m" => Ok(Interval::M5),
            "15m" => Ok(Interval::M15),
            "1h" => Ok(Interval::H1),
            "4h" => Ok(Interval::H4),
            "1d" => Ok(Interval::D1),
            _ => Err(()),
        }
    }
}

/// One OHLCV candle. Amounts are scaled u64s in the symbol's quote
/// (prices) and base (volume) scales.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Kline {
    pub open_time: TimestampMs,
    pub close_time: TimestampMs,
    pub open: u64,
    pub high: u64,
    pub low: u64,
    pub close: u64,
    pub volume: u64,
    pub trade_count: u64,
    pub is_closed: bool,
}

impl Kline {
    fn open_at(open_time: TimestampMs, interval: Interval, price: u64, qty: u64) -> Self {
        Self {
            open_time,
            close_time: open_time + interval.duration_ms() - 1,
            open: price,
            high: price,
            low: price,
            close: price,
            volume: qty,
            trade_count: 1,
            is_closed: false,
        }
    }

    fn apply(&mut self, price: u64, qty: u64) {
        self.high = self.high.max(price);
        self.low = self.low.min(price);
        self.close = price;
        self.volume += qty;
        self.trade_count += 1;
    }
}

#[derive(Debug, Default)]
struct Series {
    current: Option<Kline>,
    history: VecDeque<Kline>,
}

/// Candle state for every (symbol, interval) pair.
///
/// Each series keeps one open candle plus up to `history_cap` closed
/// candles, oldest evicted first. Candles close lazily: when the next
/// trade lands in a later window the open candle is sealed and pushed
/// to history. Windows with no trades produce no candle at all.
#[derive(Debug)]
pub struct KlineManager {
    series: FxHashMap<(SymbolId, Interval), Series>,
    history_cap: usize,
}

impl KlineManager {
    pub fn new(history_cap: usize) -> Self {
        Self {
            series: FxHashMap::default(),
            history_cap,
        }
    }

    /// Fold one trade into the candle for `interval`. Returns the
    /// updated open candle plus the candle that closed, if rolling into
    /// a new window sealed one.
    pub fn update(
        &mut self,
        symbol_id: SymbolId,
        interval: Interval,
        price: u64,
        qty: u64,
        ts: TimestampMs,
    ) -> (Kline, Option<Kline>) {
        let open_time = interval.floor(ts);
        let series = self.series.entry((symbol_id, interval)).or_default();

        let mut closed = None;
        match &mut series.current {
            Some(current) if current.open_time == open_time => {
                current.apply(price, qty);
            }
            Some(current) => {
                current.is_closed = true;
                closed = Some(*current);
                series.history.push_back(*current);
                if series.history.len() > self.history_cap {
                    series.history.pop_front();
                }
                series.current = Some(Kline::open_at(open_time, interval, price, qty));
            }
            None => {
                series.current = Some(Kline::open_at(open_time, interval, price, qty));
            }
        }

        let current = series
            .current
            .unwrap_or_else(|| unreachable!("current candle set above"));
        (current, closed)
    }

    /// Most recent candles, oldest first, the still-open candle last.
    /// At most `limit` candles are returned.
    pub fn history(&self, symbol_id: SymbolId, interval: Interval, limit: usize) -> Vec<Kline> {
        let Some(series) = self.series.get(&(symbol_id, interval)) else {
            return Vec::new();
        };
        let mut out: Vec<Kline> = series.history.iter().copied().collect();
        if let Some(current) = series.current {
            out.push(current);
        }
        if out.len() > limit {
            out.drain(..out.len() - limit);
        }
        out
    }

    pub fn current(&self, symbol_id: SymbolId, interval: Interval) -> Option<Kline> {
        self.series
            .get(&(symbol_id, interval))
            .and_then(|s| s.current)
    }
}
