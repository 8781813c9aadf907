//! # Lifecycle Phases and Commit-Reveal
//!
//! ```text
//! [commit] ──after 10, automatic──→ [reveal] ──after 5, draw.settle──→ [settled]
//!  draw.commit                       draw.reveal                        (terminal)
//!  vault.deposit
//! ```
//!
//! Phase gating applies both to dispatched module calls and to the phased
//! oracle `draw`; the unphased `lottery` oracle is always open.

#[cfg(test)]
mod tests {
    use crate::fixtures::{amount, harness, harness_with, Harness, DEPOSIT, LOTTERY};
    use shared_types::{EntropySource, OperationId, Principal, SeededEntropy, Tick};
    use ur_04_phase_machine::{PhaseDefinition, PhaseError, PhaseId, TransitionRule};
    use ur_05_commit_reveal::{derive_output, seal, OracleError};
    use ur_runtime::{RuntimeBuilder, RuntimeError};

    const DRAW: &str = "draw";
    const SETTLE: OperationId = OperationId::from_static("draw.settle");

    fn draw_harness() -> Harness {
        let definition = PhaseDefinition::builder("draw")
            .phase("commit")
            .phase("reveal")
            .terminal("settled")
            .initial("commit")
            .permit("commit", OperationId::from_static("draw.commit"))
            .permit("commit", DEPOSIT)
            .permit("reveal", OperationId::from_static("draw.reveal"))
            .transition(TransitionRule::new("commit", "reveal").after(10).automatic())
            .transition(
                TransitionRule::new("reveal", "settled")
                    .after(5)
                    .authorized_by(SETTLE),
            )
            .build()
            .unwrap();
        harness_with(
            RuntimeBuilder::default()
                .phases(definition)
                .phased_oracle(DRAW, None),
        )
    }

    #[test]
    fn test_operations_follow_the_phase() {
        let h = draw_harness();
        h.deposit(h.user, 1);

        h.clock.set(Tick(10));
        assert!(matches!(
            h.runtime.invoke(h.user, DEPOSIT, amount(1)),
            Err(RuntimeError::Phase(PhaseError::OperationNotPermitted { .. }))
        ));
        assert_eq!(
            h.runtime.phase_state().unwrap().current,
            PhaseId::from_static("reveal")
        );
    }

    #[test]
    fn test_advance_persists_automatic_transition() {
        let h = draw_harness();
        assert!(h.runtime.advance_phases().unwrap().is_empty());

        h.clock.set(Tick(12));
        let hops = h.runtime.advance_phases().unwrap();
        assert_eq!(hops.len(), 1);
        assert!(hops[0].automatic);
        assert_eq!(hops[0].to, PhaseId::from_static("reveal"));
    }

    #[test]
    fn test_manual_settlement_is_authorized_and_final() {
        let h = draw_harness();
        let settled = PhaseId::from_static("settled");

        h.clock.set(Tick(11));
        assert!(matches!(
            h.runtime.transition_phase(h.owner, &settled),
            Err(RuntimeError::Phase(PhaseError::TooEarly { .. }))
        ));

        h.clock.set(Tick(30));
        assert!(h
            .runtime
            .transition_phase(h.user, &settled)
            .unwrap_err()
            .is_unauthorized());
        let state = h.runtime.transition_phase(h.owner, &settled).unwrap();
        assert_eq!(state.current, settled);

        assert!(matches!(
            h.runtime
                .transition_phase(h.owner, &PhaseId::from_static("reveal")),
            Err(RuntimeError::Phase(PhaseError::InvalidTransition { .. }))
        ));
        assert!(!h.runtime.can_execute(&DEPOSIT).unwrap());
    }

    #[test]
    fn test_phased_draw() {
        let h = draw_harness();
        let alice = Principal::from_label("alice");
        let bob = Principal::from_label("bob");

        h.clock.set(Tick(2));
        h.runtime
            .commit(DRAW, alice, seal(b"alice-pick", b"alice-salt"))
            .unwrap();
        h.runtime
            .commit(DRAW, bob, seal(b"bob-pick", b"bob-salt"))
            .unwrap();

        // Still in the commit phase: reveals are closed.
        h.clock.set(Tick(5));
        assert!(matches!(
            h.runtime.reveal(DRAW, alice, b"alice-pick", b"alice-salt"),
            Err(RuntimeError::Oracle(OracleError::Phase(_)))
        ));

        h.clock.set(Tick(12));
        let late = Principal::from_label("late");
        assert!(matches!(
            h.runtime.commit(DRAW, late, seal(b"x", b"y")),
            Err(RuntimeError::Oracle(OracleError::Phase(_)))
        ));

        let a = h
            .runtime
            .reveal(DRAW, alice, b"alice-pick", b"alice-salt")
            .unwrap();
        let b = h.runtime.reveal(DRAW, bob, b"bob-pick", b"bob-salt").unwrap();
        assert_ne!(a, b);
        assert_eq!(
            h.runtime.commit_record(DRAW, alice).unwrap().unwrap().output,
            Some(a)
        );
    }

    #[test]
    fn test_commit_reveal_round_trip() {
        let h = harness();
        assert_eq!(h.runtime.config().oracle.min_reveal_delay, 1);
        assert_eq!(h.runtime.config().oracle.reveal_window, 100);

        h.clock.set(Tick(10));
        h.runtime
            .commit(LOTTERY, h.user, seal(b"7", b"abc"))
            .unwrap();

        h.clock.set(Tick(5));
        assert!(matches!(
            h.runtime.reveal(LOTTERY, h.user, b"7", b"abc"),
            Err(RuntimeError::Oracle(OracleError::TooEarly { .. }))
        ));

        h.clock.set(Tick(11));
        let output = h.runtime.reveal(LOTTERY, h.user, b"7", b"abc").unwrap();
        let entropy = SeededEntropy::new(b"ur-tests".to_vec())
            .entropy_at(Tick(11))
            .unwrap();
        assert_eq!(output, derive_output(b"7", &entropy.value));

        h.clock.set(Tick(12));
        assert!(matches!(
            h.runtime.reveal(LOTTERY, h.user, b"7", b"abc"),
            Err(RuntimeError::Oracle(OracleError::AlreadyRevealed(_)))
        ));
        assert_eq!(
            h.runtime.commit_record(LOTTERY, h.user).unwrap().unwrap().output,
            Some(output)
        );
    }

    #[test]
    fn test_wrong_preimage_then_correct_reveal() {
        let h = harness();
        h.runtime
            .commit(LOTTERY, h.user, seal(b"pick", b"salt"))
            .unwrap();
        h.clock.set(Tick(1));

        assert!(matches!(
            h.runtime.reveal(LOTTERY, h.user, b"pick", b"pepper"),
            Err(RuntimeError::Oracle(OracleError::InvalidPreimage))
        ));
        h.runtime.reveal(LOTTERY, h.user, b"pick", b"salt").unwrap();
        assert!(matches!(
            h.runtime.reveal(LOTTERY, h.user, b"pick", b"salt"),
            Err(RuntimeError::Oracle(OracleError::AlreadyRevealed(_)))
        ));
    }

    #[test]
    fn test_unrevealed_commitment_forfeits() {
        let h = harness();
        h.runtime
            .commit(LOTTERY, h.user, seal(b"pick", b"salt"))
            .unwrap();
        let window = h.runtime.config().oracle.reveal_window;

        assert!(matches!(
            h.runtime.forfeit(LOTTERY, h.user),
            Err(RuntimeError::Oracle(OracleError::NotExpired { .. }))
        ));
        h.clock.set(Tick(window));
        let record = h.runtime.forfeit(LOTTERY, h.user).unwrap();
        assert!(record.forfeited);
        assert!(matches!(
            h.runtime.reveal(LOTTERY, h.user, b"pick", b"salt"),
            Err(RuntimeError::Oracle(OracleError::Expired { .. }))
        ));
    }
}
