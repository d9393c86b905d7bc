// ledger.rs - All user accounts, grants, and fill settlement

use crate::balance::{Balance, BalanceError};
use crate::core_types::{AssetId, UserId};
use crate::models::Side;
use crate::user_account::UserAccount;
use rustc_hash::FxHashMap;
use tracing::info;

/// The funds ledger: every user account, plus the first-touch grant
/// schedule applied when a user id is seen for the first time.
#[derive(Debug)]
pub struct Ledger {
    accounts: FxHashMap<UserId, UserAccount>,
    grants: Vec<(AssetId, u64)>,
}

impl Ledger {
    pub fn new(grants: Vec<(AssetId, u64)>) -> Self {
        Self {
            accounts: FxHashMap::default(),
            grants,
        }
    }

    /// Look up an account, creating and granting it on first sight.
    pub fn ensure_account(&mut self, user_id: &str) -> &mut UserAccount {
        if !self.accounts.contains_key(user_id) {
            let mut acct = UserAccount::new(user_id.to_string());
            for &(asset_id, amount) in &self.grants {
                // Grants are config-bounded, deposit into a fresh
                // account cannot overflow.
                let _ = acct.deposit(asset_id, amount);
            }
            info!(user = user_id, "ledger.account_created");
            self.accounts.insert(user_id.to_string(), acct);
        }
        self.accounts
            .get_mut(user_id)
            .unwrap_or_else(|| unreachable!("account inserted above"))
    }

    pub fn balance(&self, user_id: &str, asset_id: AssetId) -> Balance {
        self.accounts
            .get(user_id)
            .map(|a| a.balance(asset_id))
            .unwrap_or_default()
    }

    pub fn lock(
        &mut self,
        user_id: &str,
        asset_id: AssetId,
        amount: u64,
    ) -> Result<(), BalanceError> {
        self.ensure_account(user_id).lock(asset_id, amount)
    }

    pub fn unlock(
        &mut self,
        user_id: &str,
        asset_id: AssetId,
        amount: u64,
    ) -> Result<(), BalanceError> {
        self.accounts
            .get_mut(user_id)
            .ok_or(BalanceError::InsufficientLocked { need: amount, have: 0 })?
            .unlock(asset_id, amount)
    }

    /// Settle one fill between taker and maker.
    ///
    /// `cost` is the quote amount exchanged (maker price x qty), `qty`
    /// the base amount. `refund` applies only to a buy-side taker whose
    /// limit locked more quote than the maker price required.
    #[allow(clippy::too_many_arguments)]
    pub fn settle_fill(
        &mut self,
        taker_user: &str,
        maker_user: &str,
        taker_side: Side,
        base_asset: AssetId,
        quote_asset: AssetId,
        cost: u64,
        qty: u64,
        refund: u64,
    ) -> Result<(), BalanceError> {
        let (buyer, seller, buyer_refund) = match taker_side {
            Side::Buy => (taker_user, maker_user, refund),
            Side::Sell => (maker_user, taker_user, 0),
        };

        // Both legs spend from funds locked when the orders were placed,
        // so neither leg can come up short here.
        let buyer_acct = self
            .accounts
            .get_mut(buyer)
            .ok_or(BalanceError::InsufficientLocked { need: cost, have: 0 })?;
        buyer_acct.settle_as_buyer(quote_asset, base_asset, cost, qty, buyer_refund)?;

        let seller_acct = self
            .accounts
            .get_mut(seller)
            .ok_or(BalanceError::InsufficientLocked { need: qty, have: 0 })?;
        seller_acct.settle_as_seller(base_asset, quote_asset, qty, cost)
    }

    /// Sum of a single asset across every account, available + locked.
    /// Used to verify conservation in tests and audits.
    pub fn asset_total(&self, asset_id: AssetId) -> u64 {
        self.accounts
            .values()
            .map(|a| a.balance(asset_id).total())
            .sum()
    }

    pub fn account_count(&self) -> usize {
        self.accounts.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const USD: AssetId = 0;
    const CR7: AssetId = 1;

    fn ledger() -> Ledger {
        Ledger::new(vec![(USD, 100_000_000_000), (CR7, 100_000_000_000)])
    }

    #[test]
    fn first_touch_applies_grants() {
        let mut l = ledger();
        l.ensure_account("alice");
        assert_eq!(l.balance("alice", USD).available(), 100_000_000_000);
        assert_eq!(l.balance("alice", CR7).available(), 100_000_000_000);
        assert_eq!(l.account_count(), 1);

        // Second touch does not re-grant.
        l.ensure_account("alice");
        assert_eq!(l.balance("alice", USD).available(), 100_000_000_000);
    }

    #[test]
    fn settle_buy_taker_with_refund() {
        let mut l = ledger();
        l.ensure_account("buyer");
        l.ensure_account("seller");
        l.lock("buyer", USD, 1_050).unwrap();
        l.lock("seller", CR7, 10).unwrap();

        // Maker price cost 1_000, buyer locked 1_050 at their limit.
        l.settle_fill("buyer", "seller", Side::Buy, CR7, USD, 1_000, 10, 50)
            .unwrap();

        assert_eq!(l.balance("buyer", USD).locked(), 0);
        assert_eq!(l.balance("buyer", USD).available(), 100_000_000_000 - 1_000);
        assert_eq!(l.balance("buyer", CR7).available(), 100_000_000_000 + 10);
        assert_eq!(l.balance("seller", CR7).locked(), 0);
        assert_eq!(
            l.balance("seller", USD).available(),
            100_000_000_000 + 1_000
        );
    }

    #[test]
    fn settle_sell_taker_no_refund() {
        let mut l = ledger();
        l.ensure_account("buyer");
        l.ensure_account("seller");
        l.lock("buyer", USD, 1_000).unwrap();
        l.lock("seller", CR7, 10).unwrap();

        l.settle_fill("seller", "buyer", Side::Sell, CR7, USD, 1_000, 10, 0)
            .unwrap();
        assert_eq!(l.balance("seller", USD).available(), 100_000_000_000 + 1_000);
        assert_eq!(l.balance("buyer", CR7).available(), 100_000_000_000 + 10);
    }

    #[test]
    fn conservation_across_settlement() {
        let mut l = ledger();
        l.ensure_account("a");
        l.ensure_account("b");
        let usd_before = l.asset_total(USD);
        let cr7_before = l.asset_total(CR7);

        l.lock("a", USD, 2_000).unwrap();
        l.lock("b", CR7, 20).unwrap();
        l.settle_fill("a", "b", Side::Buy, CR7, USD, 1_900, 20, 100)
            .unwrap();

        assert_eq!(l.asset_total(USD), usd_before);
        assert_eq!(l.asset_total(CR7), cr7_before);
    }
}
