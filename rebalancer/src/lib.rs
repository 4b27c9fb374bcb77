// Allow our dollar.cents digit grouping convention (e.g., 100_00 = $100.00)
#![allow(clippy::inconsistent_digit_grouping)]

//! sleevebook-rebalancer: command-line planner around the sleevebook engine.
//!
//! Reads engine defaults from a TOML config and a portfolio snapshot from
//! JSON, computes the trade plan, prints it with a sleeve drift report,
//! and appends every run to a JSONL audit trail.

pub mod audit;
pub mod config;
pub mod drift;
pub mod error;
pub mod execution;
