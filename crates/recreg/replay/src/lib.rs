//! Record Registry Replay Guard.
//!
//! Each provider owns a counter holding its last accepted nonce. A submission
//! is accepted only when its nonce is exactly `counter + 1`, which rejects
//! replays (`nonce <= counter`) and gaps (`nonce > counter + 1`) alike. A
//! caller that sees `InvalidNonce` asks for [`ReplayGuard::next_expected`] and
//! resubmits.

#![deny(unsafe_code)]

use recreg_types::{Address, Nonce, RegistryError};
use std::collections::HashMap;
use tracing::warn;

#[derive(Clone, Debug, Default)]
pub struct ReplayGuard {
    counters: HashMap<Address, Nonce>,
}

impl ReplayGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Last accepted nonce; zero for a provider that never submitted.
    pub fn last_accepted(&self, provider: &Address) -> Nonce {
        self.counters.get(provider).copied().unwrap_or(0)
    }

    pub fn next_expected(&self, provider: &Address) -> Nonce {
        self.last_accepted(provider) + 1
    }

    /// Validate without consuming.
    pub fn check(&self, provider: &Address, nonce: Nonce) -> Result<(), RegistryError> {
        let expected = self.next_expected(provider);
        if nonce == expected {
            Ok(())
        } else {
            Err(RegistryError::InvalidNonce {
                provider: provider.clone(),
                expected,
                submitted: nonce,
            })
        }
    }

    /// Compare-and-increment. State is untouched on failure.
    pub fn accept(&mut self, provider: &Address, nonce: Nonce) -> Result<(), RegistryError> {
        self.check(provider, nonce)?;
        self.counters.insert(provider.clone(), nonce);
        Ok(())
    }

    /// Restart the provider's counter at zero and return the discarded value.
    ///
    /// Provider registration calls this unconditionally, so re-registering an
    /// active provider reopens nonces it already used.
    pub fn reset(&mut self, provider: &Address) -> Nonce {
        let previous = self.counters.insert(provider.clone(), 0).unwrap_or(0);
        if previous > 0 {
            warn!(
                provider = %provider,
                discarded = previous,
                "Nonce counter reset on re-registration"
            );
        }
        previous
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn provider() -> Address {
        Address::new("clinic-a")
    }

    #[test]
    fn fresh_provider_expects_one() {
        let guard = ReplayGuard::new();
        assert_eq!(guard.last_accepted(&provider()), 0);
        assert_eq!(guard.next_expected(&provider()), 1);
    }

    #[test]
    fn sequential_acceptance() {
        let mut guard = ReplayGuard::new();
        for nonce in 1..=5 {
            guard.accept(&provider(), nonce).unwrap();
        }
        assert_eq!(guard.next_expected(&provider()), 6);
    }

    #[test]
    fn replay_is_rejected() {
        let mut guard = ReplayGuard::new();
        guard.accept(&provider(), 1).unwrap();

        let err = guard.accept(&provider(), 1).unwrap_err();
        assert_eq!(
            err,
            RegistryError::InvalidNonce {
                provider: provider(),
                expected: 2,
                submitted: 1,
            }
        );
        assert_eq!(guard.next_expected(&provider()), 2);
    }

    #[test]
    fn gap_is_rejected_and_counter_unchanged() {
        let mut guard = ReplayGuard::new();
        guard.accept(&provider(), 1).unwrap();

        assert!(guard.accept(&provider(), 3).is_err());
        assert_eq!(guard.last_accepted(&provider()), 1);
    }

    #[test]
    fn counters_are_per_provider() {
        let mut guard = ReplayGuard::new();
        guard.accept(&provider(), 1).unwrap();
        guard.accept(&Address::new("lab-b"), 1).unwrap();
        assert_eq!(guard.next_expected(&provider()), 2);
        assert_eq!(guard.next_expected(&Address::new("lab-b")), 2);
    }

    #[test]
    fn reset_reopens_used_nonces() {
        let mut guard = ReplayGuard::new();
        for nonce in 1..=5 {
            guard.accept(&provider(), nonce).unwrap();
        }

        assert_eq!(guard.reset(&provider()), 5);
        assert_eq!(guard.next_expected(&provider()), 1);
        guard.accept(&provider(), 1).unwrap();
    }

    #[test]
    fn check_does_not_consume() {
        let guard = ReplayGuard::new();
        guard.check(&provider(), 1).unwrap();
        guard.check(&provider(), 1).unwrap();
        assert_eq!(guard.next_expected(&provider()), 1);
    }

    proptest! {
        #[test]
        fn counter_equals_number_of_accepted(submissions in proptest::collection::vec(0u64..8, 0..40)) {
            let mut guard = ReplayGuard::new();
            let mut accepted = 0u64;
            for nonce in submissions {
                let before = guard.last_accepted(&provider());
                match guard.accept(&provider(), nonce) {
                    Ok(()) => {
                        prop_assert_eq!(nonce, before + 1);
                        accepted += 1;
                    }
                    Err(_) => prop_assert_eq!(guard.last_accepted(&provider()), before),
                }
            }
            prop_assert_eq!(guard.last_accepted(&provider()), accepted);
        }
    }
}
