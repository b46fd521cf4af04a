//! Vetrina: a promotional campaign listing service.
//!
//! Campaign reads are served through a read-through cache that is evicted
//! wholesale when a campaign is written. The mobile listing joins campaign
//! rows with per-product image and variant metadata fetched concurrently.

pub mod application;
pub mod cache;
pub mod config;
pub mod domain;
pub mod infra;
