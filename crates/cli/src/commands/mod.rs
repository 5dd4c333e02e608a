pub mod experiments;
pub mod reports;
