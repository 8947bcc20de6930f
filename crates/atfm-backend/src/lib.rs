//! ATFM Backend - analytics service client
//!
//! Handles all communication with the external analytics service that computes
//! occupancy, hotspots, rankings, slack, flows and plan simulations.

pub mod client;

pub use client::{AnalyticsClient, HotspotsResponse, TvFlights};
