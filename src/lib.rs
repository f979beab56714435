//! Network time synchronization for a device whose battery-backed clock is
//! owned by a separate time-authority processor.

#![cfg_attr(not(any(feature = "std", test)), no_std)]

mod firmware;

pub use firmware::{
    commit, config, engine, orchestrator, runtime, sync_state, telemetry, time_convert, transport,
    types, tz_input,
};
