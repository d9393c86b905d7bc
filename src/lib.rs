//! spotx - Simulated Spot Exchange Engine
//!
//! A single-threaded spot exchange: limit order matching with
//! price-time priority, a funds-locking ledger, OHLCV candle
//! aggregation, and rolling 24h market statistics.
//!
//! # Modules
//!
//! - [`core_types`] - Core type aliases (AssetId, UserId, etc.)
//! - [`config`] - YAML application and market configuration
//! - [`money`] - Scaled-u64 amount parsing and formatting
//! - [`symbol_manager`] - Asset and trading-symbol registry
//! - [`models`] - Order and fill types
//! - [`orderbook`] - Price-time priority order book
//! - [`balance`] - Enforced per-asset balance with locking
//! - [`user_account`] - Per-user balances and settlement legs
//! - [`ledger`] - All accounts, grants, fill settlement
//! - [`kline`] - OHLCV candle aggregation
//! - [`market_stats`] - Rolling 24h ticker statistics
//! - [`messages`] - Wire commands, responses, outbound events
//! - [`engine`] - Command processing over all of the above

pub mod core_types;

pub mod config;
pub mod logging;
pub mod money;
pub mod symbol_manager;

pub mod balance;
pub mod engine;
pub mod kline;
pub mod ledger;
pub mod market_stats;
pub mod messages;
pub mod models;
pub mod orderbook;
pub mod user_account;
