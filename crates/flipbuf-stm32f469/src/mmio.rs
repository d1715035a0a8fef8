//! Volatile access to memory-mapped peripheral register blocks.

use core::ptr::{read_volatile, write_volatile};

/// Base address of one peripheral's register block.
#[derive(Clone, Copy)]
pub struct RegisterBlock(usize);

impl RegisterBlock {
    /// # Safety
    ///
    /// `base` must be the address of a peripheral register block, and the
    /// caller must be the only code driving that peripheral.
    pub const unsafe fn new(base: usize) -> Self {
        Self(base)
    }

    #[inline]
    pub fn read(self, offset: usize) -> u32 {
        // SAFETY: `new` guarantees a device register block at `self.0`.
        unsafe { read_volatile((self.0 + offset) as *const u32) }
    }

    #[inline]
    pub fn write(self, offset: usize, value: u32) {
        // SAFETY: as in `read`.
        unsafe { write_volatile((self.0 + offset) as *mut u32, value) }
    }

    #[inline]
    pub fn modify(self, offset: usize, f: impl FnOnce(u32) -> u32) {
        self.write(offset, f(self.read(offset)));
    }
}

/// RCC registers touched by this firmware.
pub mod rcc {
    use super::RegisterBlock;

    pub const BASE: usize = 0x4002_3800;
    pub const AHB1ENR: usize = 0x30;
    pub const AHB3ENR: usize = 0x38;
    pub const APB2ENR: usize = 0x44;

    pub const AHB1ENR_DMA2DEN: u32 = 1 << 23;
    pub const AHB3ENR_FMCEN: u32 = 1 << 0;
    pub const APB2ENR_LTDCEN: u32 = 1 << 26;

    /// Set `bits` in an enable register and read it back so the clock is
    /// running before the peripheral is accessed.
    pub fn enable(offset: usize, bits: u32) {
        // SAFETY: RCC enable bits are only ever set, never cleared, by this
        // firmware.
        let rcc = unsafe { RegisterBlock::new(BASE) };
        rcc.modify(offset, |v| v | bits);
        let _ = rcc.read(offset);
    }
}
