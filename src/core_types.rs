//! Core types used throughout the engine
//!
//! Fundamental type aliases shared by all modules. They carry semantic
//! meaning and keep the door open for future type evolution.

/// Asset ID - unique identifier for a tradable asset.
///
/// Assigned sequentially from the config (0, 1, 2, ...), which lets
/// [`crate::user_account::UserAccount`] index balances by asset id
/// directly instead of hashing.
pub type AssetId = u32;

/// Symbol ID - unique identifier for a trading pair (e.g. CR7_USD).
pub type SymbolId = u32;

/// Trade ID - monotonically increasing per symbol, assigned by the book.
pub type TradeId = u64;

/// User ID - opaque string key chosen by the caller.
///
/// Accounts are created lazily on first sight, so any non-empty string is
/// a valid user.
pub type UserId = String;

/// Millisecond UNIX timestamp.
pub type TimestampMs = i64;
