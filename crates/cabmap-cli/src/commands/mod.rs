//! Command handlers

pub mod build;
pub mod inspect;
pub mod query;
