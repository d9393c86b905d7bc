// user_account.rs - Per-user balances across all assets

use crate::balance::{Balance, BalanceError};
use crate::core_types::{AssetId, UserId};

/// All balances for one user, indexed densely by `AssetId`.
///
/// Asset ids are small sequential integers assigned at startup, so a Vec
/// beats a map here; the vec grows on first touch of a new asset.
#[derive(Debug, Clone)]
pub struct UserAccount {
    pub user_id: UserId,
    assets: Vec<Balance>,
}

impl UserAccount {
    pub fn new(user_id: UserId) -> Self {
        Self {
            user_id,
            assets: Vec::new(),
        }
    }

    fn slot(&mut self, asset_id: AssetId) -> &mut Balance {
        let idx = asset_id as usize;
        if idx >= self.assets.len() {
            self.assets.resize(idx + 1, Balance::new());
        }
        &mut self.assets[idx]
    }

    pub fn balance(&self, asset_id: AssetId) -> Balance {
        self.assets
            .get(asset_id as usize)
            .copied()
            .unwrap_or_default()
    }

    pub fn deposit(&mut self, asset_id: AssetId, amount: u64) -> Result<(), BalanceError> {
        self.slot(asset_id).deposit(amount)
    }

    pub fn lock(&mut self, asset_id: AssetId, amount: u64) -> Result<(), BalanceError> {
        self.slot(asset_id).lock(amount)
    }

    pub fn unlock(&mut self, asset_id: AssetId, amount: u64) -> Result<(), BalanceError> {
        self.slot(asset_id).unlock(amount)
    }

    /// Buyer leg of a fill settlement: spend locked quote, receive base,
    /// and release any price-improvement refund back to available quote.
    ///
    /// All three amounts are checked against current state before any
    /// mutation, so a failure leaves the account unchanged.
    pub fn settle_as_buyer(
        &mut self,
        quote_asset: AssetId,
        base_asset: AssetId,
        spend_quote: u64,
        gain_base: u64,
        refund_quote: u64,
    ) -> Result<(), BalanceError> {
        let need = spend_quote
            .checked_add(refund_quote)
            .ok_or(BalanceError::Overflow)?;
        let quote = self.balance(quote_asset);
        if quote.locked() < need {
            return Err(BalanceError::InsufficientLocked {
                need,
                have: quote.locked(),
            });
        }
        let base = self.balance(base_asset);
        base.available()
            .checked_add(gain_base)
            .ok_or(BalanceError::Overflow)?;

        self.slot(quote_asset).spend_locked(spend_quote)?;
        if refund_quote > 0 {
            self.slot(quote_asset).unlock(refund_quote)?;
        }
        self.slot(base_asset).deposit(gain_base)?;
        Ok(())
    }

    /// Seller leg of a fill settlement: spend locked base, receive quote.
    pub fn settle_as_seller(
        &mut self,
        base_asset: AssetId,
        quote_asset: AssetId,
        spend_base: u64,
        gain_quote: u64,
    ) -> Result<(), BalanceError> {
        let base = self.balance(base_asset);
        if base.locked() < spend_base {
            return Err(BalanceError::InsufficientLocked {
                need: spend_base,
                have: base.locked(),
            });
        }
        let quote = self.balance(quote_asset);
        quote
            .available()
            .checked_add(gain_quote)
            .ok_or(BalanceError::Overflow)?;

        self.slot(base_asset).spend_locked(spend_base)?;
        self.slot(quote_asset).deposit(gain_quote)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const USD: AssetId = 0;
    const CR7: AssetId = 1;

    #[test]
    fn balances_grow_on_demand() {
        let mut acct = UserAccount::new("u1".to_string());
        assert_eq!(acct.balance(CR7).total(), 0);
        acct.deposit(CR7, 500).unwrap();
        assert_eq!(acct.balance(CR7).available(), 500);
        assert_eq!(acct.balance(USD).total(), 0);
    }

    #[test]
    fn buyer_settlement_with_refund() {
        let mut acct = UserAccount::new("u1".to_string());
        acct.deposit(USD, 1_000_000).unwrap();
        acct.lock(USD, 500_000).unwrap();

        // Locked 500_000, actual cost 475_000, refund 25_000.
        acct.settle_as_buyer(USD, CR7, 475_000, 50_000, 25_000)
            .unwrap();
        assert_eq!(acct.balance(USD).available(), 525_000);
        assert_eq!(acct.balance(USD).locked(), 0);
        assert_eq!(acct.balance(CR7).available(), 50_000);
    }

    #[test]
    fn buyer_settlement_atomic_on_failure() {
        let mut acct = UserAccount::new("u1".to_string());
        acct.deposit(USD, 100).unwrap();
        acct.lock(USD, 100).unwrap();

        let err = acct.settle_as_buyer(USD, CR7, 90, 10, 20).unwrap_err();
        assert!(matches!(err, BalanceError::InsufficientLocked { .. }));
        assert_eq!(acct.balance(USD).locked(), 100);
        assert_eq!(acct.balance(CR7).total(), 0);
    }

    #[test]
    fn seller_settlement() {
        let mut acct = UserAccount::new("u2".to_string());
        acct.deposit(CR7, 10_000).unwrap();
        acct.lock(CR7, 10_000).unwrap();

        acct.settle_as_seller(CR7, USD, 10_000, 475_000).unwrap();
        assert_eq!(acct.balance(CR7).total(), 0);
        assert_eq!(acct.balance(USD).available(), 475_000);
    }
}
