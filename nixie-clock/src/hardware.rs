//! Hardware abstraction and peripheral initialization.
//!
//! This module defines the pin mappings and peripheral initialization
//! for the nixie clock board.
//!
//! # Pin Assignments
//!
//! ## Anode drivers (one high-voltage switch per tube)
//! - **PA0**: ANODE_SEC - seconds, ones tube
//! - **PA1**: ANODE_SEC_TENS - seconds, tens tube
//! - **PA4**: ANODE_MIN - minutes, ones tube
//! - **PA5**: ANODE_MIN_TENS - minutes, tens tube
//! - **PA6**: ANODE_HOUR - hours, ones tube
//! - **PA7**: ANODE_HOUR_TENS - hours, tens tube
//!
//! ## Cathode decoder (74141 BCD inputs, shared by all tubes)
//! - **PB3**: BCD_A
//! - **PB4**: BCD_B
//! - **PB5**: BCD_C
//! - **PB6**: BCD_D
//!
//! ## Buttons (active low, external RC + glitch filter on the board)
//! - **PB0**: SW1 - decrement / toggle pair
//! - **PB1**: SW2 - increment / toggle pair
//!
//! ## Serial (RN42 Bluetooth module)
//! - **PA2**: USART2_TX
//! - **PA3**: USART2_RX
//!
//! ## Debug (SWD)
//! - **PA13**: SWDIO
//! - **PA14**: SWCLK

use embassy_stm32::bind_interrupts;
use embassy_stm32::exti::ExtiInput;
use embassy_stm32::gpio::{Level, Output, Pull, Speed};
use embassy_stm32::peripherals;
use embassy_stm32::usart::{self, BufferedUart};
use static_cell::StaticCell;

use nixie_core::display::PHASE_COUNT;

bind_interrupts!(struct Irqs {
    USART2 => usart::BufferedInterruptHandler<peripherals::USART2>;
});

/// Baud rate of the Bluetooth module link.
const UART_BAUD: u32 = 115_200;

/// Interrupt-driven ring buffers behind the UART; a ring comfortably holds
/// a few 6-byte frames or one reply line.
const UART_RING_SIZE: usize = 32;

static UART_TX_BUF: StaticCell<[u8; UART_RING_SIZE]> = StaticCell::new();
static UART_RX_BUF: StaticCell<[u8; UART_RING_SIZE]> = StaticCell::new();

/// Drive lines for the multiplexed display.
///
/// One anode switch per tube and the four shared BCD cathode lines. All
/// methods are plain GPIO writes; the multiplex task owns the timing.
pub struct DisplayPins {
    anodes: [Output<'static>; PHASE_COUNT as usize],
    bcd: [Output<'static>; 4],
}

impl DisplayPins {
    /// Starts the blanking window: every tube off.
    pub fn blank_all(&mut self) {
        for anode in &mut self.anodes {
            anode.set_low();
        }
    }

    /// Puts `digit` on the BCD cathode lines, LSB on BCD_A.
    pub fn set_cathodes(&mut self, digit: u8) {
        for (bit, line) in self.bcd.iter_mut().enumerate() {
            if digit & (1 << bit) != 0 {
                line.set_high();
            } else {
                line.set_low();
            }
        }
    }

    /// Lights the tube for `phase` with whatever the cathode lines hold.
    pub fn light_anode(&mut self, phase: u8) {
        self.anodes[(phase % PHASE_COUNT) as usize].set_high();
    }
}

/// Top-level peripheral container for the clock board.
///
/// Owns the display drive lines, the two buttons and the Bluetooth UART.
pub struct Board {
    pub display: DisplayPins,
    /// SW1, decrement while setting.
    pub button_down: ExtiInput<'static>,
    /// SW2, increment while setting.
    pub button_up: ExtiInput<'static>,
    pub uart: BufferedUart<'static>,
}

impl Board {
    /// Initializes all peripherals from the STM32 peripheral singleton.
    ///
    /// Anodes and cathode lines come up low, so the tubes stay dark until
    /// the multiplex task starts scanning. Buttons are pull-up inputs on
    /// EXTI lines 0 and 1.
    pub fn new(p: embassy_stm32::Peripherals) -> Self {
        let tx_buf = UART_TX_BUF.init([0; UART_RING_SIZE]);
        let rx_buf = UART_RX_BUF.init([0; UART_RING_SIZE]);

        let mut uart_config = usart::Config::default();
        uart_config.baudrate = UART_BAUD;

        let uart = BufferedUart::new(
            p.USART2, p.PA3, p.PA2, tx_buf, rx_buf, Irqs, uart_config,
        )
        .unwrap();

        Self {
            display: DisplayPins {
                anodes: [
                    Output::new(p.PA0, Level::Low, Speed::Low),
                    Output::new(p.PA1, Level::Low, Speed::Low),
                    Output::new(p.PA4, Level::Low, Speed::Low),
                    Output::new(p.PA5, Level::Low, Speed::Low),
                    Output::new(p.PA6, Level::Low, Speed::Low),
                    Output::new(p.PA7, Level::Low, Speed::Low),
                ],
                bcd: [
                    Output::new(p.PB3, Level::Low, Speed::Low),
                    Output::new(p.PB4, Level::Low, Speed::Low),
                    Output::new(p.PB5, Level::Low, Speed::Low),
                    Output::new(p.PB6, Level::Low, Speed::Low),
                ],
            },
            button_down: ExtiInput::new(p.PB0, p.EXTI0, Pull::Up),
            button_up: ExtiInput::new(p.PB1, p.EXTI1, Pull::Up),
            uart,
        }
    }
}
