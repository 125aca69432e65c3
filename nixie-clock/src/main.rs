//! Firmware for a six-tube nixie clock with a Bluetooth serial link.
//!
//! # Overview
//!
//! This firmware drives a multiplexed high-voltage nixie display and keeps
//! calendar time:
//! - Six tubes scanned at 1 kHz with 100 µs blanking windows
//! - Rolling odometer animation when the display switches between the
//!   time and date views
//! - Two-button setting flow with press-and-hold auto-repeat
//! - 6-byte binary command protocol over the serial link
//! - One-time power-save negotiation with the RN42 Bluetooth module
//!
//! # Hardware
//!
//! - **MCU**: STM32L031G6U6 (Cortex-M0+)
//! - **Tubes**: 6x IN-14 behind a 74141 BCD cathode decoder
//! - **Anode switches**: one high-voltage transistor pair per tube
//! - **Buttons**: 2x momentary to ground, RC filtered
//! - **Bluetooth**: RN42 module on USART2 at 115200 8N1
//!
//! # Task Layout
//!
//! - **tick_task**: 1 Hz; advances the calendar, blinks the tubes while
//!   setting, rotates the time/date views, runs the setting idle exit
//! - **mux_task**: 1 kHz; tube scanning and blanking
//! - **roll_task**: 15 Hz; the view-switch animation
//! - **buttons_task**: button gestures and the setting auto-repeat
//! - **main**: Bluetooth negotiation once, then the serial command pump
//!
//! # Module Organization
//!
//! - [`hardware`] - Pin mappings and peripheral initialization
//! - [`state`] - Shared clock state behind a critical-section mutex
//! - [`mux`] - Multiplex scan and roll cadence
//! - [`buttons`] - Gesture driver for the set-mode controller
//! - [`serial`] - Bluetooth negotiation and the command pump

#![no_std]
#![no_main]

mod buttons;
mod hardware;
mod mux;
mod serial;
mod state;

use embassy_executor::Spawner;
use embassy_stm32::Config;
use embassy_time::{Duration, Ticker, Timer};
use {defmt_rtt as _, panic_probe as _};

use nixie_core::setmode::TickAction;

use hardware::Board;

/// Startup time granted to the Bluetooth module before the power-save
/// negotiation begins.
const BT_STARTUP_SECS: u64 = 1;

/// Creates the clock configuration for the STM32L031.
///
/// # Clock Settings
///
/// - **HSI16**: 16 MHz internal oscillator as system clock (no PLL)
/// - **LSE/LSI**: off, timekeeping runs from the scheduler tick
/// - **Voltage scale**: Range 1
///
/// The multiplex blanking windows are 100 µs, so the time driver needs
/// microsecond resolution; HSI16 gives it plenty of margin, and next to
/// the tubes' high-voltage supply the core draw is noise.
fn create_clock_config() -> embassy_stm32::rcc::Config {
    embassy_stm32::rcc::Config {
        msi: None,
        hsi: true,
        hse: None,
        pll: None,
        sys: embassy_stm32::rcc::Sysclk::HSI,
        ahb_pre: embassy_stm32::rcc::AHBPrescaler::DIV1,
        apb1_pre: embassy_stm32::rcc::APBPrescaler::DIV1,
        apb2_pre: embassy_stm32::rcc::APBPrescaler::DIV1,
        ls: embassy_stm32::rcc::LsConfig::off(),
        voltage_scale: embassy_stm32::rcc::VoltageScale::RANGE1,
        mux: embassy_stm32::rcc::mux::ClockMux::default(),
    }
}

/// System tick: one second.
///
/// Everything that happens "once per second" funnels through the set-mode
/// controller so the setting states decide whether seconds advance, blink
/// toggles and the view rotation runs. An idle exit from setting is
/// signalled over to the button task.
#[embassy_executor::task]
async fn tick_task() {
    let mut ticker = Ticker::every(Duration::from_secs(1));
    loop {
        ticker.next().await;

        let action = state::with(|s| {
            let state::Shared { time, set, .. } = s;
            set.on_tick(time)
        });

        if action == TickAction::LeftSetMode {
            state::SET_MODE_EXITED.signal(());
        }
    }
}

/// Main entry point for the nixie clock firmware.
///
/// # Initialization Sequence
///
/// 1. Configure clocks (HSI16 system clock)
/// 2. Initialize STM32 peripherals and the board pin map
/// 3. Spawn the tick, multiplex, roll and button tasks
/// 4. Give the Bluetooth module a second to start, then run the
///    power-save negotiation to completion
/// 5. Enter the serial command pump
#[embassy_executor::main]
async fn main(spawner: Spawner) {
    let mut config = Config::default();
    config.rcc = create_clock_config();

    let p = embassy_stm32::init(config);

    #[cfg(feature = "debug-mode")]
    defmt::info!("nixie clock firmware starting...");

    let board = Board::new(p);

    spawner.spawn(tick_task()).unwrap();
    spawner.spawn(mux::mux_task(board.display)).unwrap();
    spawner.spawn(mux::roll_task()).unwrap();
    spawner
        .spawn(buttons::buttons_task(board.button_down, board.button_up))
        .unwrap();

    let (mut tx, mut rx) = board.uart.split();

    // The module ignores its escape sequence while still booting.
    Timer::after_secs(BT_STARTUP_SECS).await;

    #[cfg(feature = "debug-mode")]
    defmt::info!("negotiating bluetooth power save...");

    serial::negotiate_power_save(&mut tx, &mut rx).await;

    #[cfg(feature = "debug-mode")]
    defmt::info!("entering command pump");

    serial::command_pump(tx, rx).await
}
