pub mod analysis;
pub mod classify;
pub mod config;
pub mod context;
pub mod db;
pub mod error;
pub mod generate;
pub mod ingest;
pub mod model;
pub mod output;
pub mod qa;
pub mod search;

pub use error::{Error, Result};
