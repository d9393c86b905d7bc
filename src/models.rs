// models.rs - Core order and fill types

use crate::core_types::{TradeId, UserId};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Order side: Buy or Sell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    #[inline]
    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Buy => "buy",
            Side::Sell => "sell",
        }
    }
}

/// A limit order. Identity (`order_id`) is immutable for its lifetime;
/// `filled` accrues in place as the book matches it.
///
/// Price and quantity are scaled u64 amounts (see `money`): price in the
/// quote asset's scale, quantity in the base asset's scale.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    pub order_id: Uuid,
    pub user_id: UserId,
    pub price: u64,
    pub qty: u64,
    pub filled: u64,
    pub side: Side,
}

impl Order {
    pub fn new(order_id: Uuid, user_id: UserId, price: u64, qty: u64, side: Side) -> Self {
        Self {
            order_id,
            user_id,
            price,
            qty,
            filled: 0,
            side,
        }
    }

    /// Remaining quantity to fill
    #[inline]
    pub fn remaining_qty(&self) -> u64 {
        self.qty - self.filled
    }

    /// Check if order is fully filled
    #[inline]
    pub fn is_filled(&self) -> bool {
        self.filled >= self.qty
    }
}

/// One match against a resting (maker) order.
///
/// Produced transiently by a single `add_order` call; reported, never
/// stored. The price is the maker's price.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fill {
    pub price: u64,
    pub qty: u64,
    pub trade_id: TradeId,
    pub maker_user_id: UserId,
    pub maker_order_id: Uuid,
}

/// Result of adding an order to the book.
#[derive(Debug, Clone, Default)]
pub struct Execution {
    pub executed_qty: u64,
    pub fills: Vec<Fill>,
}
