use async_trait::async_trait;

use crate::{EffectRequest, Fill, Result};

/// The collaborator that carries out effects yielded by the strategy core.
///
/// `PaperHost` implements this for simulation. Only `EffectExecutor` in
/// `crates/engine` should hold a `dyn ExecutionHost`; strategies never call it.
#[async_trait]
pub trait ExecutionHost: Send + Sync {
    /// Execute one effect. Entry effects return the resulting fill;
    /// cancellations return `None`.
    async fn execute(&self, request: &EffectRequest) -> Result<Option<Fill>>;

    /// Latest close seen for a symbol. Hosts that price fills need this.
    async fn update_price(&self, symbol: &str, price: f64);
}
