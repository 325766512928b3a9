use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::warn;

use common::LifecyclePhase;

use crate::trend::TrendState;

/// Everything a bot carries between invocations.
///
/// The host owns and persists this record; the controller only mutates the
/// instance it is handed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BotState {
    #[serde(default)]
    pub phase: LifecyclePhase,
    /// Created lazily on the first evaluated tick.
    #[serde(default)]
    pub trend: Option<TrendState>,
}

impl BotState {
    /// Rebuild state persisted by the host. Phase and trend are read
    /// independently: an unreadable part falls back to its default without
    /// touching the other, so a valid advised trend survives a bad phase.
    pub fn restore(bot: &str, value: serde_json::Value) -> Self {
        let mut record = match value {
            serde_json::Value::Object(record) => record,
            serde_json::Value::Null => return Self::default(),
            _ => {
                warn!(bot, "Persisted bot state is not an object, starting fresh");
                return Self::default();
            }
        };
        Self {
            phase: restore_field(bot, "phase", record.remove("phase")),
            trend: restore_field(bot, "trend", record.remove("trend")),
        }
    }

    /// Trend state, initialized on first use.
    pub fn trend_mut(&mut self) -> &mut TrendState {
        self.trend.get_or_insert_with(TrendState::default)
    }

    pub fn is_running(&self) -> bool {
        self.phase == LifecyclePhase::Running
    }
}

fn restore_field<T>(bot: &str, field: &str, value: Option<serde_json::Value>) -> T
where
    T: DeserializeOwned + Default,
{
    let Some(value) = value else {
        return T::default();
    };
    serde_json::from_value(value).unwrap_or_else(|e| {
        warn!(bot, field, error = %e, "Persisted bot state field is malformed, reinitializing");
        T::default()
    })
}
