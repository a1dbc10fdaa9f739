/// Outcome of [`CounterGuard::check`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CounterVerdict {
    /// The counter moved forward, or the authenticator does not implement one.
    Accepted,
    /// The counter did not increase. Another authenticator may hold a copy of the credential.
    CloneDetected,
}

/// Signature counter policy.
///
/// An authenticator that implements a counter increments it on every assertion. A counter that
/// stands still or goes back means two authenticators share the credential's private key.
/// Authenticators that never implement a counter always report `0`, which is accepted.
///
/// <https://w3c.github.io/webauthn/#sctn-sign-counter>
#[derive(Debug, Default, Clone, Copy)]
pub struct CounterGuard;

impl CounterGuard {
    /// Compare the counter stored for a credential with the one an assertion reports.
    pub fn check(previous: u32, received: u32) -> CounterVerdict {
        if received == 0 || received > previous {
            CounterVerdict::Accepted
        } else {
            log::warn!(
                "signature counter did not increase: stored {previous}, received {received}"
            );
            CounterVerdict::CloneDetected
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLES: [u32; 7] = [0, 1, 2, 5, 1000, u32::MAX - 1, u32::MAX];

    #[test]
    fn increasing_counter_is_accepted() {
        for previous in SAMPLES {
            for received in SAMPLES.into_iter().filter(|r| *r > previous) {
                assert_eq!(
                    CounterGuard::check(previous, received),
                    CounterVerdict::Accepted,
                    "{previous} -> {received}"
                );
            }
        }
    }

    #[test]
    fn stalled_or_decreasing_counter_is_a_clone() {
        for previous in SAMPLES.into_iter().filter(|p| *p > 0) {
            for received in SAMPLES.into_iter().filter(|r| *r != 0 && *r <= previous) {
                assert_eq!(
                    CounterGuard::check(previous, received),
                    CounterVerdict::CloneDetected,
                    "{previous} -> {received}"
                );
            }
        }
    }

    #[test]
    fn zero_is_always_accepted() {
        for previous in SAMPLES {
            assert_eq!(CounterGuard::check(previous, 0), CounterVerdict::Accepted);
        }
    }
}
