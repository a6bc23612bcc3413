pub mod alerts;
pub mod analytics;
pub mod baseline;
pub mod official;
pub mod reports;

pub use baseline::BaselineTracker;
pub use reports::ReportService;
