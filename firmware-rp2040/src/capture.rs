//! Edge listeners for the ESC lines and the external throttle input.

use cll_core::{CastleLink, Level, Platform, Uptime};
use embedded_hal::digital::InputPin;
use embedded_hal_async::digital::Wait;

use crate::timer::TimerState;

/// Report each falling edge on one ESC line to the link.
///
/// Edges are dropped while the lines are driven or capture is muted.
pub async fn run_capture<W, P, U>(
    mut line: W,
    index: usize,
    link: &CastleLink<'_, P, U>,
    timer: &TimerState,
) -> !
where
    W: Wait,
    P: Platform,
    U: Uptime,
{
    loop {
        if line.wait_for_falling_edge().await.is_err() {
            defmt::warn!("ESC {} edge wait failed", index);
            continue;
        }
        if timer.is_capturing() {
            link.on_capture(index);
        }
    }
}

/// Forward every edge of a servo signal to the link.
pub async fn run_throttle_input<W, P, U>(mut input: W, link: &CastleLink<'_, P, U>) -> !
where
    W: Wait + InputPin,
    P: Platform,
    U: Uptime,
{
    loop {
        if input.wait_for_any_edge().await.is_err() {
            continue;
        }
        match input.is_high() {
            Ok(high) => link.on_throttle_edge(Level::from(high)),
            Err(_) => defmt::warn!("throttle input read failed"),
        }
    }
}
