//! # beacon-engine
//!
//! Signal fusion and emergency decision engine for the LifeBeacon personal
//! emergency beacon.
//!
//! Data flows one way: a [`SensorAdapter`] pushes raw events, [`normalize`]
//! turns them into sample slices, the derivation modules ([`seismic`],
//! [`survival`], [`environment`], [`physics`], [`simulation`]) compute
//! metrics, [`status`] decides the system status, [`ranking`] orders
//! victims and resources, and the [`Session`] packs everything into one
//! [`BeaconSnapshot`](beacon_types::BeaconSnapshot) per tick.
//! [`BeaconRuntime`] drives a session on tokio.

pub mod adapter;
pub mod config;
pub mod environment;
pub mod error;
pub mod journal;
pub mod normalize;
pub mod physics;
pub mod ranking;
pub mod runtime;
pub mod seismic;
pub mod session;
pub mod simulation;
pub mod status;
pub mod survival;

pub use adapter::{acquire_location, LocationAccuracy, SensorAdapter};
pub use config::EngineConfig;
pub use error::{BeaconError, BeaconResult};
pub use journal::{Journal, JournalBlock, JournalKind};
pub use runtime::{BeaconRuntime, SharedSession};
pub use session::{IngestOutcome, Session};
pub use status::{StatusMachine, Transition};
