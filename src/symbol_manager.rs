use crate::config::EngineConfig;
use crate::core_types::{AssetId, SymbolId};
use crate::money::{self, MoneyError};
use rustc_hash::FxHashMap;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SymbolError {
    #[error("asset {0} referenced by market {1} is not configured")]
    UnknownAsset(String, String),
    #[error("duplicate asset name {0}")]
    DuplicateAsset(String),
    #[error("duplicate market symbol {0}")]
    DuplicateSymbol(String),
    #[error("invalid initial price for market {0}: {1}")]
    InvalidInitialPrice(String, MoneyError),
}

#[derive(Debug, Clone)]
pub struct AssetInfo {
    pub asset_id: AssetId,
    pub name: String,
    /// Internal scale (e.g. 8 = amounts stored in 10^-8 units)
    pub decimals: u32,
    /// Max allowed decimals for input/display
    pub display_decimals: u32,
}

impl AssetInfo {
    /// Parse a client amount string into the internal scaled u64.
    pub fn parse_amount(&self, s: &str) -> Result<u64, MoneyError> {
        money::parse_amount(s, self.decimals, self.display_decimals)
    }

    /// Format an internal scaled u64 for display.
    pub fn format_amount(&self, value: u64) -> String {
        money::format_amount(value, self.decimals, self.display_decimals)
    }
}

#[derive(Debug, Clone)]
pub struct SymbolInfo {
    pub symbol: String,
    pub symbol_id: SymbolId,
    pub base_asset_id: AssetId,
    pub quote_asset_id: AssetId,
    /// Prices carry the quote asset's scale.
    pub price_decimals: u32,
    pub price_display_decimals: u32,
    /// Base asset decimals, cached here for quote-amount math.
    pub base_decimals: u32,
    /// Configured reference price (scaled), used before any trade exists.
    pub initial_price: u64,
}

impl SymbolInfo {
    /// Base asset unit: 10^base_decimals.
    #[inline]
    pub fn qty_unit(&self) -> u64 {
        money::unit_amount(self.base_decimals)
    }

    /// Quote value of (price, qty): `price * qty / qty_unit`, u128 guarded.
    #[inline]
    pub fn quote_amount(&self, price: u64, qty: u64) -> Result<u64, MoneyError> {
        money::quote_amount(price, qty, self.qty_unit())
    }
}

/// Registry of configured assets and trading symbols.
///
/// Built once from [`EngineConfig`]; the engine never adds markets at
/// runtime.
#[derive(Debug, Clone, Default)]
pub struct SymbolManager {
    symbol_to_id: FxHashMap<String, SymbolId>,
    symbol_info: FxHashMap<SymbolId, SymbolInfo>,
    asset_to_id: FxHashMap<String, AssetId>,
    assets: FxHashMap<AssetId, AssetInfo>,
}

impl SymbolManager {
    pub fn from_config(cfg: &EngineConfig) -> Result<Self, SymbolError> {
        let mut mgr = SymbolManager::default();

        for (idx, asset) in cfg.assets.iter().enumerate() {
            if mgr.asset_to_id.contains_key(&asset.name) {
                return Err(SymbolError::DuplicateAsset(asset.name.clone()));
            }
            mgr.add_asset(idx as AssetId, &asset.name, asset.decimals, asset.display_decimals);
        }

        for (idx, market) in cfg.markets.iter().enumerate() {
            if mgr.symbol_to_id.contains_key(&market.symbol) {
                return Err(SymbolError::DuplicateSymbol(market.symbol.clone()));
            }
            let base = mgr.get_asset(&market.base_asset).cloned().ok_or_else(|| {
                SymbolError::UnknownAsset(market.base_asset.clone(), market.symbol.clone())
            })?;
            let quote = mgr.get_asset(&market.quote_asset).cloned().ok_or_else(|| {
                SymbolError::UnknownAsset(market.quote_asset.clone(), market.symbol.clone())
            })?;
            let initial_price = quote
                .parse_amount(&market.initial_price)
                .map_err(|e| SymbolError::InvalidInitialPrice(market.symbol.clone(), e))?;

            mgr.insert_symbol(
                &market.symbol,
                idx as SymbolId,
                base.asset_id,
                quote.asset_id,
                quote.decimals,
                quote.display_decimals,
                base.decimals,
                initial_price,
            );
        }

        Ok(mgr)
    }

    pub fn add_asset(&mut self, asset_id: AssetId, name: &str, decimals: u32, display_decimals: u32) {
        self.asset_to_id.insert(name.to_string(), asset_id);
        self.assets.insert(
            asset_id,
            AssetInfo {
                asset_id,
                name: name.to_string(),
                decimals,
                display_decimals,
            },
        );
    }

    #[allow(clippy::too_many_arguments)]
    pub fn insert_symbol(
        &mut self,
        symbol: &str,
        symbol_id: SymbolId,
        base_asset_id: AssetId,
        quote_asset_id: AssetId,
        price_decimals: u32,
        price_display_decimals: u32,
        base_decimals: u32,
        initial_price: u64,
    ) {
        self.symbol_to_id.insert(symbol.to_string(), symbol_id);
        self.symbol_info.insert(
            symbol_id,
            SymbolInfo {
                symbol: symbol.to_string(),
                symbol_id,
                base_asset_id,
                quote_asset_id,
                price_decimals,
                price_display_decimals,
                base_decimals,
                initial_price,
            },
        );
    }

    pub fn get_symbol_info(&self, symbol: &str) -> Option<&SymbolInfo> {
        let id = self.symbol_to_id.get(symbol)?;
        self.symbol_info.get(id)
    }

    pub fn get_symbol_info_by_id(&self, id: SymbolId) -> Option<&SymbolInfo> {
        self.symbol_info.get(&id)
    }

    pub fn get_asset(&self, name: &str) -> Option<&AssetInfo> {
        let id = self.asset_to_id.get(name)?;
        self.assets.get(id)
    }

    pub fn get_asset_by_id(&self, id: AssetId) -> Option<&AssetInfo> {
        self.assets.get(&id)
    }

    pub fn symbol_count(&self) -> usize {
        self.symbol_info.len()
    }

    pub fn iter_symbols(&self) -> impl Iterator<Item = &SymbolInfo> {
        self.symbol_info.values()
    }

    pub fn iter_assets(&self) -> impl Iterator<Item = &AssetInfo> {
        self.assets.values()
    }

    /// Format a scaled price for display (quote asset scale).
    pub fn format_price(&self, price: u64, symbol_id: SymbolId) -> Option<String> {
        let info = self.symbol_info.get(&symbol_id)?;
        Some(money::format_amount(
            price,
            info.price_decimals,
            info.price_display_decimals,
        ))
    }

    /// Format a scaled quantity for display (base asset scale).
    pub fn format_qty(&self, qty: u64, symbol_id: SymbolId) -> Option<String> {
        let info = self.symbol_info.get(&symbol_id)?;
        let base = self.assets.get(&info.base_asset_id)?;
        Some(base.format_amount(qty))
    }
}
