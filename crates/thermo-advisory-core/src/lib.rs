//! ThermoSense advisory core: wire types, scenario form state, the response
//! normalizer and the small formatting helpers shared by every surface.

pub mod config;
pub mod health;
pub mod input;
pub mod normalizer;
pub mod timefmt;
pub mod types;


pub use config::{
    AdvisoryConfig, ConfigError, CPU_TEMP_OFFSET_C, DEFAULT_BASE_URL, DEFAULT_BATTERY_LEVEL,
    HISTORY_PAGE_SIZE,
};
pub use health::{AlertLevel, HealthData, SystemAnalysis};
pub use input::{InputError, ScenarioField, ScenarioInput, UsageState};
pub use normalizer::{normalize_advice, ActionField};
pub use timefmt::{format_timestamp, format_timestamp_in};
pub use types::{
    AdvisoryRequest, AdvisoryResult, HistoryEntry, HistoryId, HistoryResponse, LiveAdviceParams,
    LiveSnapshot, RiskLevel,
};
