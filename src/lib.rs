//! pingdumb - network test dashboard
//!
//! Keeps a bounded, live-updating window of probe results from the
//! monitoring backend and derives the dashboard's charts and tables from it.

pub mod api;
pub mod channel;
pub mod config;
pub mod dashboard;
pub mod model;
pub mod telemetry;
pub mod web;
