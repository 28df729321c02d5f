//! The discrete-time simulation core
//!
//! `events` holds the forward-looking shipment/production calendars and the
//! per-day event bucket; `stepper` drives the day loop itself.

pub mod events;
pub mod stepper;

pub use events::{DayBook, ItemFlows, ProductionOrder, Shipment};
pub use stepper::{ShortageItem, Simulation, SimulationSummary};
