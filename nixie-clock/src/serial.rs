//! Serial link: boot-time Bluetooth negotiation, then the command pump.
//!
//! The buffered UART's interrupt handler keeps the receive and transmit
//! rings fed; this module drains them from the main task. At boot the
//! power-save handshake runs to completion (or times out per step and
//! degrades), after which [`command_pump`] owns the link forever:
//! assemble 6-byte frames, execute them against the shared state, queue
//! replies, and flush a stalled partial frame after two idle seconds.

use embassy_stm32::usart::{BufferedUartRx, BufferedUartTx};
use embassy_time::{Duration, with_timeout};
use embedded_io_async::{Read, Write};
use heapless::Vec;

use nixie_core::negotiator::{BtAction, BtNegotiator, REPLY_TIMEOUT_SECS};
use nixie_core::protocol::{FrameAssembler, RxIdleWatchdog, execute};

use crate::state;

/// How often the pump wakes to check the idle watchdog when the line is
/// quiet.
const IDLE_POLL: Duration = Duration::from_millis(250);

/// Longest reply line the negotiator cares about.
const REPLY_LINE_MAX: usize = 16;

/// Runs the power-save handshake against the Bluetooth module.
///
/// Sends each configuration command and waits up to the reply window for a
/// line-terminated acknowledgement; the state machine downgrades to a bare
/// command-mode exit on any miss, so an absent module costs a few seconds
/// of boot time and nothing else. Leftover reply bytes are drained before
/// returning the link to frame traffic.
pub async fn negotiate_power_save(tx: &mut BufferedUartTx<'_>, rx: &mut BufferedUartRx<'_>) {
    let mut negotiator = BtNegotiator::new();

    loop {
        match negotiator.poll() {
            BtAction::Send(command) => {
                if tx.write_all(command).await.is_err() || tx.flush().await.is_err() {
                    negotiator.on_timeout();
                    continue;
                }

                let mut line: Vec<u8, REPLY_LINE_MAX> = Vec::new();
                match with_timeout(
                    Duration::from_secs(REPLY_TIMEOUT_SECS),
                    read_line(rx, &mut line),
                )
                .await
                {
                    Ok(Ok(())) => negotiator.on_reply(&line),
                    _ => negotiator.on_timeout(),
                }
            }
            BtAction::Finished => break,
        }
    }

    #[cfg(feature = "debug-mode")]
    defmt::info!("bluetooth negotiation finished");

    drain(rx).await;
}

/// Frame pump; never returns.
pub async fn command_pump(mut tx: BufferedUartTx<'static>, mut rx: BufferedUartRx<'static>) -> ! {
    let mut assembler = FrameAssembler::new();
    let mut watchdog = RxIdleWatchdog::new();
    let mut chunk = [0u8; 16];

    loop {
        match with_timeout(IDLE_POLL, rx.read(&mut chunk)).await {
            Ok(Ok(count)) if count > 0 => {
                watchdog.note_activity(state::with(|s| s.time.timestamp()));

                for &byte in &chunk[..count] {
                    let Some(frame) = assembler.push(byte) else {
                        continue;
                    };
                    let reply = state::with(|s| {
                        let state::Shared { time, user, .. } = s;
                        execute(&frame, time, user)
                    });
                    if let Some(reply) = reply {
                        // Best effort; a full ring drops the reply, the
                        // link recovers on the host's next request.
                        let _ = tx.write_all(&reply).await;
                        let _ = tx.flush().await;
                    }
                }
            }
            Ok(_) => {}
            Err(_) => {
                // Quiet line: throw away a frame that stalled mid-way.
                if !assembler.is_empty()
                    && watchdog.expired(state::with(|s| s.time.timestamp()))
                {
                    assembler.clear();
                    #[cfg(feature = "debug-mode")]
                    defmt::info!("flushed stalled partial frame");
                }
            }
        }
    }
}

/// Reads bytes until a newline lands in `line`. On overflow the buffer
/// restarts; a flooded line then simply fails to match any acknowledgement.
async fn read_line<const N: usize>(
    rx: &mut BufferedUartRx<'_>,
    line: &mut Vec<u8, N>,
) -> Result<(), ()> {
    let mut byte = [0u8; 1];
    loop {
        rx.read_exact(&mut byte).await.map_err(|_| ())?;
        if line.push(byte[0]).is_err() {
            line.clear();
            let _ = line.push(byte[0]);
        }
        if byte[0] == b'\n' {
            return Ok(());
        }
    }
}

/// Discards whatever is sitting in the receive ring.
async fn drain(rx: &mut BufferedUartRx<'_>) {
    let mut sink = [0u8; 16];
    while let Ok(Ok(count)) = with_timeout(Duration::from_millis(50), rx.read(&mut sink)).await {
        if count == 0 {
            break;
        }
    }
}
