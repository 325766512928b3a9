pub mod cbbc;
pub mod rsi;

pub use cbbc::CbbcStrategy;
pub use rsi::RsiStrategy;

use crate::config::StrategySettings;
use crate::Strategy;

/// Build the strategy variant for already-validated settings.
pub fn build(settings: StrategySettings) -> Box<dyn Strategy> {
    match settings {
        StrategySettings::Rsi(s) => Box::new(RsiStrategy::new(s)),
        StrategySettings::Cbbc(s) => Box::new(CbbcStrategy::new(s)),
    }
}
