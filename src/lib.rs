//! Poverty Atlas Library
//!
//! Combines World Bank poverty data with poverty-focused nonprofits from
//! Every.org into one document per country, served from a 24-hour freshness
//! cache.

pub mod aggregate;
pub mod cache;
pub mod cli;
pub mod config;
pub mod data;
pub mod logging;
pub mod pipeline;
pub mod secrets;
pub mod web;
