pub mod analysis;
pub mod config;
pub mod detect;
pub mod error;
pub mod report;
pub mod video;
