pub mod absence;
pub mod config;
pub mod db;
pub mod enrich;
pub mod error;
pub mod guidance;
pub mod models;
pub mod output;
pub mod participation;
pub mod policy;
pub mod preprocess;
pub mod reasons;
pub mod report;
pub mod risk;
pub mod telemetry;
