// orderbook.rs - Price-time priority limit order book for one market

use crate::core_types::TradeId;
use crate::models::{Execution, Fill, Order, Side};
use tracing::debug;
use uuid::Uuid;

/// Limit order book for a single symbol.
///
/// Bids are kept sorted by price descending, asks ascending; within a
/// price level, earlier orders come first (price-time priority). Orders
/// are stored inline and located by scanning, which keeps the common
/// operations branch-light at the depths this book runs at.
#[derive(Debug, Default)]
pub struct OrderBook {
    bids: Vec<Order>,
    asks: Vec<Order>,
    next_trade_id: TradeId,
}

impl OrderBook {
    pub fn new() -> Self {
        Self {
            bids: Vec::new(),
            asks: Vec::new(),
            next_trade_id: 0,
        }
    }

    /// Add a limit order, matching it against the opposite side first.
    ///
    /// Matching walks the opposite side in priority order. A maker whose
    /// price is no longer eligible ends the walk (everything behind it is
    /// worse). A maker owned by the taker's own user is skipped and left
    /// resting. Fills execute at the maker's price. Any unfilled
    /// remainder rests on the book at the taker's limit price.
    pub fn add_order(&mut self, order: &mut Order) -> Execution {
        let mut fills = Vec::new();
        let mut executed_qty: u64 = 0;

        let (makers, price_ok): (&mut Vec<Order>, fn(u64, u64) -> bool) = match order.side {
            Side::Buy => (&mut self.asks, |maker, taker| maker <= taker),
            Side::Sell => (&mut self.bids, |maker, taker| maker >= taker),
        };

        let mut i = 0;
        while i < makers.len() && !order.is_filled() {
            let maker = &mut makers[i];
            if !price_ok(maker.price, order.price) {
                break;
            }
            if maker.user_id == order.user_id {
                // Self-trade prevention: never match own orders, keep
                // the resting order untouched.
                i += 1;
                continue;
            }

            let fill_qty = order.remaining_qty().min(maker.remaining_qty());
            let fill_price = maker.price;
            maker.filled += fill_qty;
            order.filled += fill_qty;
            executed_qty += fill_qty;
            self.next_trade_id += 1;

            debug!(
                target: "orderbook",
                trade_id = self.next_trade_id,
                price = fill_price,
                qty = fill_qty,
                maker_order = %maker.order_id,
                taker_order = %order.order_id,
                "orderbook.fill"
            );

            fills.push(Fill {
                price: fill_price,
                qty: fill_qty,
                trade_id: self.next_trade_id,
                maker_user_id: maker.user_id.clone(),
                maker_order_id: maker.order_id,
            });

            if maker.is_filled() {
                makers.remove(i);
            } else {
                i += 1;
            }
        }

        if !order.is_filled() {
            self.insert(order.clone());
        }

        Execution {
            executed_qty,
            fills,
        }
    }

    /// Insert a resting order at its price-time position.
    fn insert(&mut self, order: Order) {
        match order.side {
            Side::Buy => {
                // Strictly-greater keeps FIFO order among equal prices.
                let pos = self.bids.partition_point(|o| o.price >= order.price);
                self.bids.insert(pos, order);
            }
            Side::Sell => {
                let pos = self.asks.partition_point(|o| o.price <= order.price);
                self.asks.insert(pos, order);
            }
        }
    }

    /// Remove an order by id. Returns the order (with its fill state) so
    /// the caller can release the funds still locked for the remainder.
    pub fn cancel(&mut self, order_id: Uuid) -> Option<Order> {
        if let Some(pos) = self.bids.iter().position(|o| o.order_id == order_id) {
            return Some(self.bids.remove(pos));
        }
        if let Some(pos) = self.asks.iter().position(|o| o.order_id == order_id) {
            return Some(self.asks.remove(pos));
        }
        None
    }

    /// Aggregated depth: up to `limit` price levels per side, each level
    /// summing the remaining quantity of consecutive equal-price orders.
    /// Bids best-first (descending), asks best-first (ascending).
    pub fn depth(&self, limit: usize) -> (Vec<(u64, u64)>, Vec<(u64, u64)>) {
        (aggregate(&self.bids, limit), aggregate(&self.asks, limit))
    }

    pub fn best_bid(&self) -> Option<u64> {
        self.bids.first().map(|o| o.price)
    }

    pub fn best_ask(&self) -> Option<u64> {
        self.asks.first().map(|o| o.price)
    }

    pub fn order_count(&self) -> usize {
        self.bids.len() + self.asks.len()
    }
}

fn aggregate(orders: &[Order], limit: usize) -> Vec<(u64, u64)> {
    let mut levels: Vec<(u64, u64)> = Vec::new();
    for order in orders {
        match levels.last_mut() {
            Some(level) if level.0 == order.price => level.1 += order.remaining_qty(),
            _ => {
                if levels.len() == limit {
                    break;
                }
                levels.push((order.price, order.remaining_qty()));
            }
        }
    }
    levels
}
