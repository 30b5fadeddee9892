pub mod aggregate;
pub mod bot;
pub mod config;
pub mod geo;
pub mod observability;
pub mod output;
pub mod pipeline;
pub mod record;
pub mod source;
pub mod storage;
