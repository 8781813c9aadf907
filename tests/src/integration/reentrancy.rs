//! # Reentrancy Through Module Callbacks
//!
//! ```text
//! user ──withdraw(5, attacker.reenter)──→ [Guard: withdraw in progress]
//!                                              │
//!                                              ↓ callback
//!                                       attacker.reenter
//!                                              │
//!                                              ↓ forward
//!                                       vault.withdraw  ──→ Reentrant
//! ```
//!
//! The nested withdraw must be rejected and the outer call rolled back, so
//! the vault total and the guard flag are exactly as before.

#[cfg(test)]
mod tests {
    use crate::fixtures::{amount, harness, withdraw_via, NOTIFY, REENTER, WITHDRAW};
    use shared_types::U256;
    use ur_01_storage_facade::SlotValue;
    use ur_runtime::RuntimeError;

    #[test]
    fn test_reentrant_withdraw_rejected_and_rolled_back() {
        let h = harness();
        h.deposit(h.user, 10);
        h.sink.clear();

        let err = h
            .runtime
            .invoke(h.user, WITHDRAW, withdraw_via(5, &REENTER))
            .unwrap_err();

        assert_eq!(err, RuntimeError::Reentrant(WITHDRAW));
        assert_eq!(h.total(), Some(SlotValue::UInt(U256::from(10))));
        assert!(!h.runtime.is_in_progress(&WITHDRAW).unwrap());
        assert!(h.sink.is_empty());
    }

    #[test]
    fn test_benign_callback_completes() {
        let h = harness();
        h.deposit(h.user, 10);

        let out = h
            .runtime
            .invoke(h.user, WITHDRAW, withdraw_via(4, &NOTIFY))
            .unwrap();

        assert_eq!(out, amount(6));
        assert_eq!(h.total(), Some(SlotValue::UInt(U256::from(6))));
    }

    #[test]
    fn test_guard_released_after_rejection() {
        let h = harness();
        h.deposit(h.user, 10);
        let _ = h.runtime.invoke(h.user, WITHDRAW, withdraw_via(5, &REENTER));

        // A plain withdraw afterwards is not mistaken for reentry.
        let out = h.runtime.invoke(h.user, WITHDRAW, amount(5)).unwrap();
        assert_eq!(out, amount(5));
    }

    #[test]
    fn test_direct_attacker_call_is_not_reentrant() {
        let h = harness();
        h.deposit(h.user, 10);

        // attacker.reenter on its own is a single withdraw hop.
        let out = h.runtime.invoke(h.user, REENTER, amount(3)).unwrap();
        assert_eq!(out, amount(7));
    }
}
