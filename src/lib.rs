//! CLIPS driver - step-wise execution controller for a rule engine
//!
//! Runs an inference engine on a dedicated worker thread under one of
//! three cadences (`RUN`, `RUN_ONE`, `STEP`), consults a pluggable
//! [`TurnProtocol`] between turns and reports the lifecycle to any
//! number of [`Subscriber`]s.

pub mod config;
pub mod domain;
pub mod engine;
pub mod runtime;
pub mod state_machine;

pub use config::DriverConfig;
pub use domain::{QuiescenceDomain, RunReport};
pub use engine::{Engine, EngineError, EngineLoader, EnginePath, ProcessLoader};
pub use runtime::{
    ChannelSubscriber, Controller, ControllerError, DomainError, Subscriber, TurnProtocol,
};
pub use state_machine::{CadenceMode, ControllerState, Notification};
