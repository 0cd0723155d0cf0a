//! Fetch helpers and upsert generation for official COVID dashboards.
//!
//! Data flows one way: a concrete scraper pulls rows through the ArcGIS or
//! SODA helper, normalizes them into a [`models::Table`], and
//! [`sql::SqlUpsertBuilder`] produces the statement that moves the staged rows
//! into the warehouse.

pub mod config;
pub mod error;
pub mod export;
pub mod models;
pub mod scrapers;
pub mod sql;

pub use error::{Result, ScrapeError};
