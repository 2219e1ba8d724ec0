//! Core library for the freight-billing command line application.
//!
//! Shipment-invoice rows from several brokerage sub-accounts are attributed to
//! a canonical account, charged according to that account's markup, and rolled
//! up into per-account workbooks plus a cross-account summary. Account
//! resolution lives in [`resolve`] on top of the [`registry`], charge rules in
//! [`billing`], roll-ups in [`aggregate`], table assembly in [`report`], and
//! file adapters under [`io`]. [`pipeline`] wires the stages together for the
//! two supported input flows.

pub mod aggregate;
pub mod billing;
pub mod config;
pub mod error;
pub mod io;
pub mod model;
pub mod pipeline;
pub mod registry;
pub mod report;
pub mod resolve;

pub use error::{BillingError, Result};
