//! `spec.md` §4.3 Network: samples propagation delays from configured
//! distributions. No real network I/O happens here (a Non-goal); this is a
//! pure sampling utility threaded the seeded RNG the rest of the simulator
//! shares.

use rand::Rng;
use rand_distr::{Distribution as _, Exp, Uniform};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum NetworkError {
    #[error("invalid distribution parameters: {0}")]
    InvalidParameters(String),
}

/// The shape of a configured delay distribution. `spec.md` §4.3 calls the
/// exponential case "typical"; `Uniform` and `Fixed` are additional shapes
/// a `Config` may select, per the "configured distributions" wording.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum DelayDistribution {
    Exponential { mean: f64 },
    Uniform { min: f64, max: f64 },
    Fixed(f64),
}

impl DelayDistribution {
    pub fn sample(&self, rng: &mut impl Rng) -> f64 {
        match *self {
            DelayDistribution::Exponential { mean } => {
                let lambda = 1.0 / mean.max(f64::EPSILON);
                Exp::new(lambda).expect("positive lambda").sample(rng)
            }
            DelayDistribution::Uniform { min, max } => {
                if (max - min).abs() < f64::EPSILON {
                    min
                } else {
                    Uniform::new(min, max).sample(rng)
                }
            }
            DelayDistribution::Fixed(v) => v,
        }
    }
}

/// `spec.md` §4.3: `Bdelay=0.42s`, `Tdelay=5.1s` are the typical means.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NetworkConfig {
    pub block_delay: DelayDistribution,
    pub tx_delay: DelayDistribution,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        NetworkConfig {
            block_delay: DelayDistribution::Exponential { mean: 0.42 },
            tx_delay: DelayDistribution::Exponential { mean: 5.1 },
        }
    }
}

/// Draws independent, non-negative propagation delays. Each call draws a
/// fresh sample (`spec.md` §4.3: "Independent draws per call").
#[derive(Debug, Clone, Copy)]
pub struct Network {
    config: NetworkConfig,
}

impl Network {
    pub fn new(config: NetworkConfig) -> Self {
        Network { config }
    }

    pub fn block_prop_delay(&self, rng: &mut impl Rng) -> f64 {
        let delay = self.config.block_delay.sample(rng).max(0.0);
        log::trace!("sampled block propagation delay: {delay}");
        delay
    }

    pub fn tx_prop_delay(&self, rng: &mut impl Rng) -> f64 {
        let delay = self.config.tx_delay.sample(rng).max(0.0);
        log::trace!("sampled tx propagation delay: {delay}");
        delay
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ledgerlab_test_suite::seeded_rng;

    #[test]
    fn delays_are_non_negative_and_independent() {
        let net = Network::new(NetworkConfig::default());
        let mut rng = seeded_rng(5);
        let a = net.block_prop_delay(&mut rng);
        let b = net.block_prop_delay(&mut rng);
        assert!(a >= 0.0);
        assert!(b >= 0.0);
        assert_ne!(a, b, "independent draws should (almost surely) differ");
    }

    #[test]
    fn fixed_distribution_is_deterministic() {
        let net = Network::new(NetworkConfig {
            block_delay: DelayDistribution::Fixed(1.5),
            tx_delay: DelayDistribution::Fixed(2.5),
        });
        let mut rng = seeded_rng(1);
        assert_eq!(net.block_prop_delay(&mut rng), 1.5);
        assert_eq!(net.tx_prop_delay(&mut rng), 2.5);
    }
}
