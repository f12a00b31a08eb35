// Machine constants consumed by the series, continued fractions and root finder.
// Built once per process; evaluators take it by reference so tests can inject their own.

use std::sync::OnceLock;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Precision {
    /// radix^(-mantissa digits), i.e. 2^-53 for f64.
    pub epsilon: f64,
    pub log_epsilon: f64,
    /// Smallest positive normalized value.
    pub tiny: f64,
    pub log_tiny: f64,
}

static MACHINE: OnceLock<Precision> = OnceLock::new();

impl Precision {
    pub fn machine() -> Self {
        let epsilon = (f64::RADIX as f64).powi(-(f64::MANTISSA_DIGITS as i32));
        let tiny = f64::MIN_POSITIVE;
        Self {
            epsilon,
            log_epsilon: epsilon.ln(),
            tiny,
            log_tiny: tiny.ln(),
        }
    }

    pub fn global() -> &'static Precision {
        MACHINE.get_or_init(Self::machine)
    }

    // Floor for Lentz denominators; keeps 1/d finite without disturbing convergence.
    pub(crate) fn lentz_floor(&self) -> f64 {
        self.tiny / self.epsilon
    }

    // True when two bracket ends agree to working precision.
    pub(crate) fn collapsed(&self, lo: f64, hi: f64) -> bool {
        hi - lo <= 2.0 * self.epsilon * lo.abs().max(hi.abs()).max(self.tiny)
    }
}

impl Default for Precision {
    fn default() -> Self {
        *Self::global()
    }
}
