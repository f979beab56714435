use core::future::Future;

use embassy_time::{Duration, Ticker};

/// Per-frame synchronization point of the network loop. Every wait outside
/// the bounded UDP polls goes through here.
pub trait FrameSync {
    fn wait_frame(&mut self) -> impl Future<Output = ()>;

    /// Set once a cancel or exit was observed at a frame boundary.
    fn stop_requested(&self) -> bool {
        false
    }
}

/// Frame pacing from an embassy-time ticker, standing in for the display
/// refresh signal.
pub struct TickerFrameSync {
    ticker: Ticker,
}

impl TickerFrameSync {
    pub fn new(frame_ms: u32) -> Self {
        Self {
            ticker: Ticker::every(Duration::from_millis(frame_ms.max(1) as u64)),
        }
    }
}

impl FrameSync for TickerFrameSync {
    async fn wait_frame(&mut self) {
        self.ticker.next().await;
    }
}
