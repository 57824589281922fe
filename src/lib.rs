pub mod aggregate;
pub mod categories;
pub mod config;
pub mod export;
pub mod features;
pub mod fetch;
pub mod http;
pub mod merge;
pub mod normalize;
pub mod persist;
pub mod pipeline;
pub mod predictor;
pub mod record;
pub mod regression;
pub mod sources;
pub mod views;
