//! Red user LED (LD3, PD5) used to signal fatal errors.

use core::convert::Infallible;

use embedded_hal::digital::{ErrorType, OutputPin};

use crate::mmio::{rcc, RegisterBlock};

const GPIOD_BASE: usize = 0x4002_0C00;
const GPIOD_EN: u32 = 1 << 3;
const MODER: usize = 0x00;
const BSRR: usize = 0x18;
const PIN: u32 = 5;

pub struct ErrorLed {
    port: RegisterBlock,
}

impl ErrorLed {
    pub fn new() -> Self {
        rcc::enable(rcc::AHB1ENR, GPIOD_EN);
        // SAFETY: only PD5 is driven through this block, and only from here.
        let port = unsafe { RegisterBlock::new(GPIOD_BASE) };
        port.modify(MODER, |v| (v & !(0b11 << (PIN * 2))) | (0b01 << (PIN * 2)));
        Self { port }
    }
}

impl ErrorType for ErrorLed {
    type Error = Infallible;
}

impl OutputPin for ErrorLed {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.port.write(BSRR, 1 << (PIN + 16));
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.port.write(BSRR, 1 << PIN);
        Ok(())
    }
}
