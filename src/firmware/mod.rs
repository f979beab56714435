pub mod commit;
pub mod config;
pub mod engine;
pub mod orchestrator;
pub mod runtime;
pub mod sync_state;
pub mod telemetry;
#[cfg(test)]
pub(crate) mod testing;
pub mod time_convert;
pub mod transport;
pub mod types;
pub mod tz_input;
