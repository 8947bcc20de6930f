//! Background loops for continuous processing.

pub mod hotspot_loop;
pub mod tick_loop;
