//! Role-aware host selection.
//!
//! Applies the single-writer rule to one round of probe results. In primary
//! mode exactly one writable host must exist; zero and several writers are
//! the same failure, and the selector never breaks the tie. In replica mode
//! any read-only host will do and one is drawn uniformly at random.

use std::fmt;

use rand::rngs::StdRng;
use rand::{Rng, RngCore, SeedableRng};

use crate::domain::host::{HostSpec, RoleMode};

/// Outcome of probing one reachable candidate.
#[derive(Debug)]
pub struct ProbeResult<C> {
    /// The probed host
    pub host: HostSpec,
    /// Live connection opened by the probe
    pub connection: C,
    /// `true` when the server reported read-only = off
    pub writable: bool,
}

impl<C> ProbeResult<C> {
    /// Bundle a probe outcome.
    pub fn new(host: HostSpec, connection: C, writable: bool) -> Self {
        Self {
            host,
            connection,
            writable,
        }
    }

    /// Whether this host currently plays the role `mode` is looking for.
    pub fn plays(&self, mode: RoleMode) -> bool {
        mode.accepts(self.writable)
    }
}

/// The result of one selection round.
///
/// Every input result ends up either in `chosen` or in `rejected`, so the
/// caller can close each connection that was not adopted.
#[derive(Debug)]
pub struct Selection<C> {
    /// The adopted host, if the round produced a valid one
    pub chosen: Option<ProbeResult<C>>,
    /// Everything else, to be closed by the caller
    pub rejected: Vec<ProbeResult<C>>,
    /// How many candidates reported the sought role
    pub matching: usize,
}

impl<C> Selection<C> {
    /// Primary-mode ambiguity: more than one host claims to be writable.
    pub fn is_ambiguous(&self) -> bool {
        self.chosen.is_none() && self.matching > 1
    }
}

/// Chooses one host from a round of probe results.
///
/// The random source is injectable so replica selection can be made
/// deterministic in tests.
pub struct RoleSelector {
    mode: RoleMode,
    rng: Box<dyn RngCore + Send>,
}

impl RoleSelector {
    /// Create a selector seeded from OS entropy.
    pub fn new(mode: RoleMode) -> Self {
        Self::with_rng(mode, StdRng::from_entropy())
    }

    /// Create a selector drawing replica choices from `rng`.
    pub fn with_rng<R>(mode: RoleMode, rng: R) -> Self
    where
        R: RngCore + Send + 'static,
    {
        Self {
            mode,
            rng: Box::new(rng),
        }
    }

    /// The role this selector looks for.
    pub fn mode(&self) -> RoleMode {
        self.mode
    }

    /// Apply the selection policy to one round of results.
    pub fn select<C>(&mut self, results: Vec<ProbeResult<C>>) -> Selection<C> {
        let mode = self.mode;
        let (mut matching, mut rejected): (Vec<_>, Vec<_>) =
            results.into_iter().partition(|result| result.plays(mode));
        let count = matching.len();

        let chosen = match mode {
            RoleMode::Primary if count == 1 => matching.pop(),
            RoleMode::Primary => None,
            RoleMode::Replica if count == 0 => None,
            RoleMode::Replica => {
                let index = self.rng.gen_range(0..count);
                Some(matching.swap_remove(index))
            }
        };

        rejected.extend(matching);

        Selection {
            chosen,
            rejected,
            matching: count,
        }
    }
}

impl fmt::Debug for RoleSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RoleSelector")
            .field("mode", &self.mode)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn round(flags: &[bool]) -> Vec<ProbeResult<usize>> {
        flags
            .iter()
            .enumerate()
            .map(|(i, &writable)| {
                ProbeResult::new(HostSpec::new(format!("h{i}"), Some(3306)), i, writable)
            })
            .collect()
    }

    fn seeded(mode: RoleMode, seed: u64) -> RoleSelector {
        RoleSelector::with_rng(mode, StdRng::seed_from_u64(seed))
    }

    #[test]
    fn test_single_writer_is_selected() {
        let mut selector = seeded(RoleMode::Primary, 1);
        let selection = selector.select(round(&[false, true, false]));

        let chosen = selection.chosen.unwrap();
        assert_eq!(chosen.host.host, "h1");
        assert_eq!(selection.rejected.len(), 2);
        assert_eq!(selection.matching, 1);
    }

    #[test]
    fn test_no_writer_selects_nothing() {
        let mut selector = seeded(RoleMode::Primary, 1);
        let selection = selector.select(round(&[false, false]));

        assert!(selection.chosen.is_none());
        assert!(!selection.is_ambiguous());
        assert_eq!(selection.rejected.len(), 2);
    }

    #[test]
    fn test_two_writers_are_ambiguous() {
        let mut selector = seeded(RoleMode::Primary, 1);
        let selection = selector.select(round(&[true, true]));

        assert!(selection.chosen.is_none());
        assert!(selection.is_ambiguous());
        assert_eq!(selection.rejected.len(), 2);
    }

    #[test]
    fn test_replica_mode_never_returns_the_writer() {
        for seed in 0..64 {
            let mut selector = seeded(RoleMode::Replica, seed);
            // A and B are replicas, C is the primary
            let chosen = selector.select(round(&[false, false, true])).chosen.unwrap();
            assert_ne!(chosen.host.host, "h2");
        }
    }

    #[test]
    fn test_replica_mode_spreads_choices() {
        let mut selector = seeded(RoleMode::Replica, 7);
        let mut seen = [0usize; 3];
        for _ in 0..300 {
            let chosen = selector.select(round(&[false, false, false])).chosen.unwrap();
            seen[chosen.connection] += 1;
        }
        assert!(seen.iter().all(|&n| n > 0), "all replicas should be picked: {seen:?}");
    }

    #[test]
    fn test_replica_mode_fixed_seed_is_deterministic() {
        let picks = |seed| {
            let mut selector = seeded(RoleMode::Replica, seed);
            (0..10)
                .map(|_| selector.select(round(&[false, false, false])).chosen.unwrap().connection)
                .collect::<Vec<_>>()
        };
        assert_eq!(picks(42), picks(42));
    }

    proptest! {
        #[test]
        fn prop_primary_selects_iff_exactly_one_writer(flags in prop::collection::vec(any::<bool>(), 0..8)) {
            let writers = flags.iter().filter(|&&w| w).count();
            let mut selector = seeded(RoleMode::Primary, 0);
            let selection = selector.select(round(&flags));

            prop_assert_eq!(selection.chosen.is_some(), writers == 1);
            if let Some(chosen) = &selection.chosen {
                prop_assert!(chosen.writable);
            }
            let returned = selection.rejected.len() + usize::from(selection.chosen.is_some());
            prop_assert_eq!(returned, flags.len());
        }

        #[test]
        fn prop_replica_only_returns_read_only_hosts(
            flags in prop::collection::vec(any::<bool>(), 0..8),
            seed in any::<u64>(),
        ) {
            let readers = flags.iter().filter(|&&w| !w).count();
            let mut selector = seeded(RoleMode::Replica, seed);
            let selection = selector.select(round(&flags));

            prop_assert_eq!(selection.chosen.is_some(), readers > 0);
            if let Some(chosen) = &selection.chosen {
                prop_assert!(!chosen.writable);
            }
            let returned = selection.rejected.len() + usize::from(selection.chosen.is_some());
            prop_assert_eq!(returned, flags.len());
        }
    }
}
