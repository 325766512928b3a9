pub mod executor;
pub mod feed;
pub mod history;
pub mod lifecycle;

pub use executor::{EffectExecutor, ExecutorMessage, ExecutorReport};
pub use feed::CandleFeed;
pub use history::CandleHistory;
pub use lifecycle::{Engine, EngineHandle, EngineInput};
