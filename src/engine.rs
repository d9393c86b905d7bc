// engine.rs - Command processing: order entry, settlement, market data

use crate::config::EngineConfig;
use crate::core_types::{SymbolId, TimestampMs};
use crate::kline::{Interval, Kline, KlineManager};
use crate::ledger::Ledger;
use crate::market_stats::StatsManager;
use crate::messages::{
    CandlePayload, Command, CommandOutput, DepthPayload, FillData, MarketEvent, PersistenceRecord,
    Response, TickerPayload,
};
use crate::models::{Order, Side};
use crate::money;
use crate::orderbook::OrderBook;
use crate::symbol_manager::{SymbolInfo, SymbolManager};
use anyhow::Context;
use rustc_hash::FxHashMap;
use tracing::{error, info, warn};
use uuid::Uuid;

const DEFAULT_KLINE_LIMIT: usize = 500;
const MAX_KLINE_LIMIT: usize = 1000;

/// The exchange engine: one instance owns every book, the ledger, and
/// all market analytics. Commands go in one at a time; each returns its
/// response together with the market events and persistence records it
/// produced, leaving delivery to the caller.
pub struct Engine {
    symbols: SymbolManager,
    books: FxHashMap<SymbolId, OrderBook>,
    ledger: Ledger,
    klines: KlineManager,
    stats: StatsManager,
    /// Last depth emitted per symbol; events fire only on change.
    last_depth: FxHashMap<SymbolId, (Vec<(u64, u64)>, Vec<(u64, u64)>)>,
    depth_limit: usize,
}

impl Engine {
    pub fn new(cfg: &EngineConfig) -> anyhow::Result<Self> {
        let symbols = SymbolManager::from_config(cfg)?;

        let mut books = FxHashMap::default();
        for info in symbols.iter_symbols() {
            books.insert(info.symbol_id, OrderBook::new());
        }

        // First-seen users are granted quote currency plus a stake of
        // every other configured asset.
        let mut grants = Vec::new();
        for asset in symbols.iter_assets() {
            let amount = if asset.name == cfg.quote_asset {
                &cfg.initial_quote_grant
            } else {
                &cfg.initial_base_grant
            };
            let scaled = asset
                .parse_amount(amount)
                .with_context(|| format!("invalid initial grant for asset {}", asset.name))?;
            grants.push((asset.asset_id, scaled));
        }
        grants.sort_by_key(|&(id, _)| id);

        info!(
            markets = symbols.symbol_count(),
            assets = grants.len(),
            "engine.started"
        );

        Ok(Self {
            symbols,
            books,
            ledger: Ledger::new(grants),
            klines: KlineManager::new(cfg.kline_history_cap),
            stats: StatsManager::new(),
            last_depth: FxHashMap::default(),
            depth_limit: cfg.depth_limit,
        })
    }

    /// Process one command at `now_ms`.
    pub fn process(&mut self, cmd: Command, now_ms: TimestampMs) -> CommandOutput {
        match cmd {
            Command::CreateOrder {
                market,
                price,
                quantity,
                side,
                user_id,
            } => self.create_order(&market, &price, &quantity, side, &user_id, now_ms),
            Command::CancelOrder { order_id, market } => {
                self.cancel_order(&order_id, &market, now_ms)
            }
            Command::GetDepth { market } => {
                CommandOutput::response_only(Response::Depth(self.depth_snapshot(&market, now_ms)))
            }
            Command::GetTicker { market } => {
                CommandOutput::response_only(Response::Ticker(self.ticker(&market, now_ms)))
            }
            Command::GetKline {
                market,
                interval,
                limit,
            } => CommandOutput::response_only(self.kline_history(
                &market,
                interval.as_deref(),
                limit,
            )),
        }
    }

    fn create_order(
        &mut self,
        market: &str,
        price_str: &str,
        qty_str: &str,
        side: Side,
        user_id: &str,
        now_ms: TimestampMs,
    ) -> CommandOutput {
        let order_id = Uuid::new_v4();
        let rejected = |order_id: Uuid| {
            CommandOutput::response_only(Response::OrderCancelled {
                order_id: order_id.to_string(),
                executed_quantity: "0".to_string(),
                remaining_quantity: "0".to_string(),
            })
        };

        // Resolve the market's asset pair from its "BASE_QUOTE" name.
        // The pair must resolve before anything is parsed or locked.
        let Some((base_name, quote_name)) = market.split_once('_') else {
            warn!(market, "engine.malformed_market");
            return rejected(order_id);
        };
        let Some(base) = self.symbols.get_asset(base_name).cloned() else {
            warn!(market, asset = base_name, "engine.unknown_base_asset");
            return rejected(order_id);
        };
        let Some(quote) = self.symbols.get_asset(quote_name).cloned() else {
            warn!(market, asset = quote_name, "engine.unknown_quote_asset");
            return rejected(order_id);
        };

        if user_id.trim().is_empty() {
            warn!(market, "engine.empty_user_id");
            return rejected(order_id);
        }

        let price = match quote.parse_amount(price_str) {
            Ok(p) => p,
            Err(e) => {
                warn!(market, price = price_str, %e, "engine.invalid_price");
                return rejected(order_id);
            }
        };
        let qty = match base.parse_amount(qty_str) {
            Ok(q) => q,
            Err(e) => {
                warn!(market, quantity = qty_str, %e, "engine.invalid_quantity");
                return rejected(order_id);
            }
        };

        let qty_unit = money::unit_amount(base.decimals);
        let (lock_asset, lock_amount) = match side {
            Side::Buy => {
                let cost = match money::quote_amount(price, qty, qty_unit) {
                    Ok(c) => c,
                    Err(e) => {
                        warn!(market, %e, "engine.order_cost_overflow");
                        return rejected(order_id);
                    }
                };
                (quote.asset_id, cost)
            }
            Side::Sell => (base.asset_id, qty),
        };

        self.ledger.ensure_account(user_id);
        if let Err(e) = self.ledger.lock(user_id, lock_asset, lock_amount) {
            warn!(user = user_id, market, %e, "engine.insufficient_funds");
            return rejected(order_id);
        }
        info!(
            user = user_id,
            market,
            asset = lock_asset,
            amount = lock_amount,
            "engine.funds_locked"
        );

        // Anything failing past this point must release the lock in
        // full before responding.
        let Some(info) = self.symbols.get_symbol_info(market).cloned() else {
            if let Err(e) = self.ledger.unlock(user_id, lock_asset, lock_amount) {
                error!(user = user_id, market, %e, "engine.rollback_failed");
            }
            warn!(market, "engine.no_order_book_rollback");
            return rejected(order_id);
        };

        let mut order = Order::new(order_id, user_id.to_string(), price, qty, side);
        let exec = match self.books.get_mut(&info.symbol_id) {
            Some(book) => book.add_order(&mut order),
            None => {
                if let Err(e) = self.ledger.unlock(user_id, lock_asset, lock_amount) {
                    error!(user = user_id, market, %e, "engine.rollback_failed");
                }
                warn!(market, "engine.no_order_book_rollback");
                return rejected(order_id);
            }
        };

        // Settle every fill. Funds were locked when each order entered
        // the book, so settlement cannot legitimately fail; a failure
        // here indicates ledger corruption and is logged loudly.
        let mut fill_data = Vec::with_capacity(exec.fills.len());
        for fill in &exec.fills {
            let cost = match info.quote_amount(fill.price, fill.qty) {
                Ok(c) => c,
                Err(e) => {
                    error!(market, %e, "engine.settlement_overflow");
                    continue;
                }
            };
            // Buy taker locked at their limit; the maker price may be
            // better, and the surplus goes straight back to available.
            let refund = if side == Side::Buy {
                match info.quote_amount(order.price - fill.price, fill.qty) {
                    Ok(r) => r,
                    Err(e) => {
                        error!(market, %e, "engine.settlement_overflow");
                        continue;
                    }
                }
            } else {
                0
            };
            if let Err(e) = self.ledger.settle_fill(
                user_id,
                &fill.maker_user_id,
                side,
                info.base_asset_id,
                info.quote_asset_id,
                cost,
                fill.qty,
                refund,
            ) {
                error!(
                    market,
                    trade_id = fill.trade_id,
                    %e,
                    "engine.settlement_failed"
                );
                continue;
            }

            fill_data.push(FillData {
                price: quote.format_amount(fill.price),
                qty: base.format_amount(fill.qty),
                trade_id: fill.trade_id,
                other_user_id: fill.maker_user_id.clone(),
                maker_order_id: fill.maker_order_id,
            });
        }

        info!(
            user = user_id,
            market,
            order = %order_id,
            executed = exec.executed_qty,
            fill_count = exec.fills.len(),
            "engine.order_placed"
        );

        let mut output = CommandOutput::response_only(Response::OrderPlaced {
            order_id,
            executed_quantity: base.format_amount(exec.executed_qty),
            fills: fill_data,
        });

        output.persistence.push(PersistenceRecord::OrderNew {
            order_id,
            user_id: user_id.to_string(),
            market: market.to_string(),
            price: quote.format_amount(price),
            quantity: base.format_amount(qty),
            side,
            timestamp: now_ms,
        });

        for fill in &exec.fills {
            let (buyer, seller) = match side {
                Side::Buy => (user_id, fill.maker_user_id.as_str()),
                Side::Sell => (fill.maker_user_id.as_str(), user_id),
            };
            output.market_events.push(MarketEvent::Trade {
                symbol: info.symbol.clone(),
                trade_id: fill.trade_id,
                price: quote.format_amount(fill.price),
                quantity: base.format_amount(fill.qty),
                side,
                timestamp: now_ms,
            });
            output.persistence.push(PersistenceRecord::Trade {
                trade_id: fill.trade_id,
                market: info.symbol.clone(),
                price: quote.format_amount(fill.price),
                quantity: base.format_amount(fill.qty),
                buyer_user_id: buyer.to_string(),
                seller_user_id: seller.to_string(),
                timestamp: now_ms,
            });
        }

        if !exec.fills.is_empty() {
            // Candles across every interval, one update per fill.
            for fill in &exec.fills {
                for interval in Interval::ALL {
                    let (kline, _closed) =
                        self.klines
                            .update(info.symbol_id, interval, fill.price, fill.qty, now_ms);
                    let payload = self.candle_payload(&info, &kline);
                    output.market_events.push(MarketEvent::Kline {
                        symbol: info.symbol.clone(),
                        interval: interval.as_str().to_string(),
                        kline: payload.clone(),
                    });
                    output.persistence.push(PersistenceRecord::KlineUpdate {
                        market: info.symbol.clone(),
                        interval: interval.as_str().to_string(),
                        kline: payload,
                    });
                }
            }

            self.stats
                .record_fills(info.symbol_id, &exec.fills, info.qty_unit(), now_ms);
            output
                .market_events
                .push(MarketEvent::Ticker(self.ticker(market, now_ms)));
        }

        self.emit_depth_if_changed(&info, now_ms, &mut output);
        output
    }

    fn cancel_order(&mut self, order_id: &str, market: &str, now_ms: TimestampMs) -> CommandOutput {
        let zero = || {
            CommandOutput::response_only(Response::OrderCancelled {
                order_id: order_id.to_string(),
                executed_quantity: "0".to_string(),
                remaining_quantity: "0".to_string(),
            })
        };

        // Unknown ids, malformed ids, and already-gone orders are all
        // benign: cancel is idempotent and never an error.
        let Ok(uuid) = Uuid::parse_str(order_id) else {
            return zero();
        };
        let Some(info) = self.symbols.get_symbol_info(market).cloned() else {
            return zero();
        };
        let Some(book) = self.books.get_mut(&info.symbol_id) else {
            return zero();
        };
        let Some(order) = book.cancel(uuid) else {
            return zero();
        };

        let remaining = order.remaining_qty();
        let (unlock_asset, unlock_amount) = match order.side {
            Side::Buy => match info.quote_amount(order.price, remaining) {
                Ok(c) => (info.quote_asset_id, c),
                Err(e) => {
                    error!(market, order = %uuid, %e, "engine.unlock_overflow");
                    return zero();
                }
            },
            Side::Sell => (info.base_asset_id, remaining),
        };
        if unlock_amount > 0 {
            if let Err(e) = self
                .ledger
                .unlock(&order.user_id, unlock_asset, unlock_amount)
            {
                error!(market, order = %uuid, %e, "engine.unlock_failed");
            }
        }

        info!(
            user = %order.user_id,
            market,
            order = %uuid,
            remaining,
            "engine.order_cancelled"
        );

        // The response shape carries zero quantities whether or not an
        // order was removed; callers observe success through the
        // released funds and the cancel record.
        let mut output = zero();
        output.persistence.push(PersistenceRecord::OrderCancel {
            order_id: uuid,
            market: market.to_string(),
            timestamp: now_ms,
        });
        self.emit_depth_if_changed(&info, now_ms, &mut output);
        output
    }

    /// Aggregated depth for a market. Unknown markets get an empty
    /// snapshot rather than an error.
    pub fn depth_snapshot(&self, market: &str, now_ms: TimestampMs) -> DepthPayload {
        let Some(info) = self.symbols.get_symbol_info(market) else {
            return DepthPayload {
                symbol: market.to_string(),
                bids: Vec::new(),
                asks: Vec::new(),
                timestamp: now_ms,
            };
        };
        let (bids, asks) = match self.books.get(&info.symbol_id) {
            Some(book) => book.depth(self.depth_limit),
            None => (Vec::new(), Vec::new()),
        };
        DepthPayload {
            symbol: info.symbol.clone(),
            bids: self.format_levels(info, &bids),
            asks: self.format_levels(info, &asks),
            timestamp: now_ms,
        }
    }

    /// 24h ticker for a market. A market that has never traded returns
    /// an all-zero ticker, never an error.
    pub fn ticker(&self, market: &str, now_ms: TimestampMs) -> TickerPayload {
        let zero_price = "0".to_string();
        let Some(info) = self.symbols.get_symbol_info(market) else {
            return TickerPayload {
                symbol: market.to_string(),
                price: zero_price.clone(),
                price_change: zero_price.clone(),
                price_change_percent: "0.00".to_string(),
                high_24h: zero_price.clone(),
                low_24h: zero_price.clone(),
                volume_24h: zero_price.clone(),
                quote_volume_24h: zero_price,
                timestamp: now_ms,
            };
        };

        let stats = self.stats.snapshot(info.symbol_id, now_ms);
        let fmt_price = |v: u64| {
            money::format_amount(v, info.price_decimals, info.price_display_decimals)
        };
        let change = stats.last_price as i128 - stats.open_24h as i128;
        let percent = if stats.open_24h == 0 {
            "0.00".to_string()
        } else {
            format_percent(change, stats.open_24h)
        };

        TickerPayload {
            symbol: info.symbol.clone(),
            price: fmt_price(stats.last_price),
            price_change: format_signed(change, info.price_decimals, info.price_display_decimals),
            price_change_percent: percent,
            high_24h: fmt_price(stats.high_24h),
            low_24h: fmt_price(stats.low_24h),
            volume_24h: money::format_amount(
                stats.volume_24h,
                info.base_decimals,
                self.symbols
                    .get_asset_by_id(info.base_asset_id)
                    .map(|a| a.display_decimals)
                    .unwrap_or(0),
            ),
            quote_volume_24h: fmt_price(stats.quote_volume_24h),
            timestamp: now_ms,
        }
    }

    /// Candle history for a market, oldest first with the open candle
    /// last. Unknown markets yield an empty list.
    pub fn klines(&self, market: &str, interval: Interval, limit: usize) -> Vec<CandlePayload> {
        let limit = limit.min(MAX_KLINE_LIMIT);
        match self.symbols.get_symbol_info(market) {
            Some(info) => self
                .klines
                .history(info.symbol_id, interval, limit)
                .iter()
                .map(|k| self.candle_payload(info, k))
                .collect(),
            None => Vec::new(),
        }
    }

    fn kline_history(
        &self,
        market: &str,
        interval_str: Option<&str>,
        limit: Option<usize>,
    ) -> Response {
        let interval_str = interval_str.unwrap_or("1m");
        let limit = limit.unwrap_or(DEFAULT_KLINE_LIMIT);

        let candles = match interval_str.parse::<Interval>() {
            Ok(interval) => self.klines(market, interval, limit),
            Err(()) => Vec::new(),
        };

        Response::Kline {
            symbol: market.to_string(),
            interval: interval_str.to_string(),
            candles,
        }
    }

    /// Balance of one asset for one user, (available, locked) as
    /// display strings. `None` when the asset is not configured.
    pub fn balance(&self, user_id: &str, asset_name: &str) -> Option<(String, String)> {
        let asset = self.symbols.get_asset(asset_name)?;
        let bal = self.ledger.balance(user_id, asset.asset_id);
        Some((
            asset.format_amount(bal.available()),
            asset.format_amount(bal.locked()),
        ))
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    pub fn symbols(&self) -> &SymbolManager {
        &self.symbols
    }

    fn emit_depth_if_changed(
        &mut self,
        info: &SymbolInfo,
        now_ms: TimestampMs,
        output: &mut CommandOutput,
    ) {
        let Some(book) = self.books.get(&info.symbol_id) else {
            return;
        };
        let depth = book.depth(self.depth_limit);
        if self.last_depth.get(&info.symbol_id) == Some(&depth) {
            return;
        }

        let payload = DepthPayload {
            symbol: info.symbol.clone(),
            bids: self.format_levels(info, &depth.0),
            asks: self.format_levels(info, &depth.1),
            timestamp: now_ms,
        };
        output.market_events.push(MarketEvent::Depth(payload.clone()));
        output
            .persistence
            .push(PersistenceRecord::DepthSnapshot(payload));
        self.last_depth.insert(info.symbol_id, depth);
    }

    fn format_levels(&self, info: &SymbolInfo, levels: &[(u64, u64)]) -> Vec<(String, String)> {
        levels
            .iter()
            .map(|&(price, qty)| {
                (
                    money::format_amount(price, info.price_decimals, info.price_display_decimals),
                    self.symbols
                        .format_qty(qty, info.symbol_id)
                        .unwrap_or_else(|| "0".to_string()),
                )
            })
            .collect()
    }

    fn candle_payload(&self, info: &SymbolInfo, kline: &Kline) -> CandlePayload {
        let fmt_price = |v: u64| {
            money::format_amount(v, info.price_decimals, info.price_display_decimals)
        };
        CandlePayload {
            open_time: kline.open_time,
            close_time: kline.close_time,
            open: fmt_price(kline.open),
            high: fmt_price(kline.high),
            low: fmt_price(kline.low),
            close: fmt_price(kline.close),
            volume: self
                .symbols
                .format_qty(kline.volume, info.symbol_id)
                .unwrap_or_else(|| "0".to_string()),
            trades: kline.trade_count,
            is_closed: kline.is_closed,
        }
    }
}

/// Format a signed scaled amount for display.
fn format_signed(value: i128, decimals: u32, display_decimals: u32) -> String {
    if value < 0 {
        format!(
            "-{}",
            money::format_amount(value.unsigned_abs() as u64, decimals, display_decimals)
        )
    } else {
        money::format_amount(value as u64, decimals, display_decimals)
    }
}

/// Percent change with two decimals: `change / open * 100`.
fn format_percent(change: i128, open: u64) -> String {
    let scaled = change * 10_000 / open as i128;
    let sign = if scaled < 0 { "-" } else { "" };
    let abs = scaled.unsigned_abs();
    format!("{sign}{}.{:02}", abs / 100, abs % 100)
}
