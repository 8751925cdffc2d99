//! # sensor-simulator
//!
//! A simulated phone for driving the beacon engine without hardware:
//! [`motion`] generates the readings, [`scenarios`] injects disaster
//! conditions, [`adapter`] exposes both as a [`beacon_engine::SensorAdapter`].

pub mod adapter;
pub mod motion;
pub mod scenarios;

pub use adapter::SimulatedAdapter;
pub use motion::{PhoneSim, SimConfig};
pub use scenarios::{ScenarioConfig, ScenarioType};
