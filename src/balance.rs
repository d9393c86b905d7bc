// balance.rs - Single-asset balance with funds locking

use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum BalanceError {
    #[error("insufficient available funds: need {need}, have {have}")]
    InsufficientAvailable { need: u64, have: u64 },

    #[error("insufficient locked funds: need {need}, have {have}")]
    InsufficientLocked { need: u64, have: u64 },

    #[error("balance arithmetic overflow")]
    Overflow,

    #[error("unknown asset id: {0}")]
    UnknownAsset(u32),
}

/// Funds for one asset, split into spendable and order-locked parts.
///
/// Fields are private; every mutation goes through checked operations so
/// the invariant `available + locked == total deposited - total spent`
/// cannot be violated by a stray assignment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Balance {
    available: u64,
    locked: u64,
}

impl Balance {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn available(&self) -> u64 {
        self.available
    }

    #[inline]
    pub fn locked(&self) -> u64 {
        self.locked
    }

    #[inline]
    pub fn total(&self) -> u64 {
        self.available + self.locked
    }

    /// Credit `amount` to available funds.
    pub fn deposit(&mut self, amount: u64) -> Result<(), BalanceError> {
        self.available = self
            .available
            .checked_add(amount)
            .ok_or(BalanceError::Overflow)?;
        Ok(())
    }

    /// Move `amount` from available to locked, failing if short.
    pub fn lock(&mut self, amount: u64) -> Result<(), BalanceError> {
        if self.available < amount {
            return Err(BalanceError::InsufficientAvailable {
                need: amount,
                have: self.available,
            });
        }
        self.available -= amount;
        self.locked = self
            .locked
            .checked_add(amount)
            .ok_or(BalanceError::Overflow)?;
        Ok(())
    }

    /// Move `amount` from locked back to available.
    pub fn unlock(&mut self, amount: u64) -> Result<(), BalanceError> {
        if self.locked < amount {
            return Err(BalanceError::InsufficientLocked {
                need: amount,
                have: self.locked,
            });
        }
        self.locked -= amount;
        self.available = self
            .available
            .checked_add(amount)
            .ok_or(BalanceError::Overflow)?;
        Ok(())
    }

    /// Consume `amount` out of locked funds (settlement debit).
    pub fn spend_locked(&mut self, amount: u64) -> Result<(), BalanceError> {
        if self.locked < amount {
            return Err(BalanceError::InsufficientLocked {
                need: amount,
                have: self.locked,
            });
        }
        self.locked -= amount;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lock_unlock_round_trip() {
        let mut b = Balance::new();
        b.deposit(1000).unwrap();
        b.lock(400).unwrap();
        assert_eq!(b.available(), 600);
        assert_eq!(b.locked(), 400);
        assert_eq!(b.total(), 1000);

        b.unlock(400).unwrap();
        assert_eq!(b.available(), 1000);
        assert_eq!(b.locked(), 0);
    }

    #[test]
    fn lock_rejects_insufficient_available() {
        let mut b = Balance::new();
        b.deposit(100).unwrap();
        let err = b.lock(101).unwrap_err();
        assert_eq!(
            err,
            BalanceError::InsufficientAvailable {
                need: 101,
                have: 100
            }
        );
        // Untouched on failure.
        assert_eq!(b.available(), 100);
        assert_eq!(b.locked(), 0);
    }

    #[test]
    fn spend_locked_debits_locked_only() {
        let mut b = Balance::new();
        b.deposit(500).unwrap();
        b.lock(300).unwrap();
        b.spend_locked(200).unwrap();
        assert_eq!(b.available(), 200);
        assert_eq!(b.locked(), 100);

        let err = b.spend_locked(101).unwrap_err();
        assert_eq!(
            err,
            BalanceError::InsufficientLocked {
                need: 101,
                have: 100
            }
        );
    }

    #[test]
    fn deposit_overflow_detected() {
        let mut b = Balance::new();
        b.deposit(u64::MAX).unwrap();
        assert_eq!(b.deposit(1).unwrap_err(), BalanceError::Overflow);
    }
}
