pub mod config;
pub mod diagnostics;
pub mod field_mapper;
pub mod harvester;
pub mod lazy_load;
pub mod models;
pub mod normalizer;
pub mod row_extractor;
pub mod session;
pub mod sink;
pub mod slate_discovery;
pub mod slate_iterator;
pub mod utils;

// Re-export commonly used types
pub use config::AppConfig;
pub use harvester::{HarvestReport, Harvester, RunOutcome};
pub use models::{PlayerPerformanceRecord, RawRow, RunKey, Slate, Weekday};
pub use session::{ChromeSession, PageSession, SimulatedSession, SimulatedSlate};
pub use utils::error::AppError;

pub type Result<T> = std::result::Result<T, AppError>;
