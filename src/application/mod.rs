//! Application services layer.

pub mod campaigns;
pub mod error;
pub mod repos;
