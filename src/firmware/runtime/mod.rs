mod authority_task;
mod frame;
mod network_task;
#[cfg(test)]
mod tests;

pub use authority_task::run_time_authority;
pub use frame::{FrameSync, TickerFrameSync};
pub use network_task::{DeviceNetworkTask, NetworkTask};
