//! Built-in passes.

pub mod schedule;
pub mod statistics;

pub use schedule::SchedulePassDef;
pub use statistics::StatisticsPassDef;
