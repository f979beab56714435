use embassy_futures::select::{select, Either};
use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_time::{Duration, Ticker};
use log::info;

use super::super::commit::{next_message, RtcRegisters, TimeAuthority};

/// Time-authority loop: serves commit requests and advances the cached view
/// once per second. Never returns.
pub async fn run_time_authority<R: RtcRegisters, M: RawMutex>(
    authority: &mut TimeAuthority<'_, R, M>,
) {
    let channels = authority.channels();
    let mut ticker = Ticker::every(Duration::from_secs(1));
    info!("rtc: authority_started cached={:?}", authority.cached());

    loop {
        match select(ticker.next(), next_message(channels)).await {
            Either::First(()) => authority.on_second_tick(),
            Either::Second(message) => {
                authority.handle(message);
            }
        }
    }
}
