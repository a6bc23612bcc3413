pub mod alerts;
pub mod baseline;
pub mod official;
pub mod report;
