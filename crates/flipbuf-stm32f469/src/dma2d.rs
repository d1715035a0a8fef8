//! DMA2D (Chrom-ART) as the block-copy engine: memory-to-memory RGB565
//! transfers, completion polled against the DWT cycle counter.

use cortex_m::peripheral::DWT;
use flipbuf_hal::{BlockCopyEngine, BlockTransfer, PollStatus, TransferHandle};
use fugit::{HertzU32, MillisDurationU32};

use crate::mmio::{rcc, RegisterBlock};

const BASE: usize = 0x4002_B000;

const CR: usize = 0x00;
const ISR: usize = 0x04;
const IFCR: usize = 0x08;
const FGMAR: usize = 0x0C;
const FGOR: usize = 0x10;
const FGPFCCR: usize = 0x1C;
const OPFCCR: usize = 0x34;
const OMAR: usize = 0x3C;
const OOR: usize = 0x40;
const NLR: usize = 0x44;

const CR_START: u32 = 1 << 0;
const CR_ABORT: u32 = 1 << 2;
/// Mode 00 in CR[17:16].
const CR_MODE_M2M: u32 = 0;

const ISR_TEIF: u32 = 1 << 0;
const ISR_TCIF: u32 = 1 << 1;
const ISR_CEIF: u32 = 1 << 5;
const IFCR_ALL: u32 = 0x3F;

const CM_RGB565: u32 = 0b0010;

/// How long a new transfer waits for an aborted one to wind down.
const SETTLE: MillisDurationU32 = MillisDurationU32::millis(1);

/// Line offset and pixels-per-line fields are 14 bits wide.
const MAX_OFFSET: u16 = 0x3FFF;

#[derive(Debug, Clone, Copy, PartialEq, Eq, defmt::Format)]
pub enum Dma2dError {
    /// A transfer was started while the previous one is still running.
    Busy,
    /// Bus error while reading or writing pixels (TEIF).
    Transfer,
    /// Register setup rejected by the hardware (CEIF).
    Configuration,
    /// Block geometry does not fit the DMA2D register fields.
    Geometry,
}

pub struct Dma2d {
    regs: RegisterBlock,
    core_clock: HertzU32,
    next_id: u32,
    in_flight: Option<TransferHandle>,
}

impl Dma2d {
    /// Enable the DMA2D clock and take ownership of the peripheral.
    ///
    /// The DWT cycle counter must already be running.
    ///
    /// # Safety
    ///
    /// Call once; nothing else may drive the DMA2D.
    pub unsafe fn new(core_clock: HertzU32) -> Self {
        rcc::enable(rcc::AHB1ENR, rcc::AHB1ENR_DMA2DEN);
        Self {
            regs: unsafe { RegisterBlock::new(BASE) },
            core_clock,
            next_id: 0,
            in_flight: None,
        }
    }

    fn timeout_cycles(&self, timeout: MillisDurationU32) -> u64 {
        u64::from(self.core_clock.to_Hz()) * u64::from(timeout.to_millis()) / 1000
    }

    fn abort(&mut self) {
        self.regs.modify(CR, |v| v | CR_ABORT);
        self.in_flight = None;
    }

    /// Spin until START and ABORT are both clear, at most `SETTLE`.
    fn wait_idle(&self) -> bool {
        let budget = self.timeout_cycles(SETTLE);
        let mut elapsed: u64 = 0;
        let mut last = DWT::cycle_count();
        while self.regs.read(CR) & (CR_START | CR_ABORT) != 0 {
            let now = DWT::cycle_count();
            elapsed += u64::from(now.wrapping_sub(last));
            last = now;
            if elapsed > budget {
                return false;
            }
        }
        true
    }
}

impl BlockCopyEngine for Dma2d {
    type Error = Dma2dError;

    unsafe fn begin_block_copy(
        &mut self,
        xfer: &BlockTransfer,
    ) -> Result<TransferHandle, Self::Error> {
        // An abort after a timeout takes a few bus cycles to clear START.
        if !self.wait_idle() {
            return Err(Dma2dError::Busy);
        }
        if xfer.width == 0
            || xfer.width > MAX_OFFSET
            || xfer.src_line_offset > MAX_OFFSET
            || xfer.dst_line_offset > MAX_OFFSET
        {
            return Err(Dma2dError::Geometry);
        }

        self.regs.write(IFCR, IFCR_ALL);
        self.regs.write(CR, CR_MODE_M2M);
        self.regs.write(FGPFCCR, CM_RGB565);
        self.regs.write(OPFCCR, CM_RGB565);
        self.regs.write(FGMAR, xfer.src as u32);
        self.regs.write(FGOR, u32::from(xfer.src_line_offset));
        self.regs.write(OMAR, xfer.dst as u32);
        self.regs.write(OOR, u32::from(xfer.dst_line_offset));
        self.regs
            .write(NLR, (u32::from(xfer.width) << 16) | u32::from(xfer.height));
        self.regs.modify(CR, |v| v | CR_START);

        self.next_id = self.next_id.wrapping_add(1);
        let handle = TransferHandle(self.next_id);
        self.in_flight = Some(handle);
        Ok(handle)
    }

    fn poll_done(
        &mut self,
        handle: TransferHandle,
        timeout_ms: u32,
    ) -> Result<PollStatus, Self::Error> {
        if self.in_flight != Some(handle) {
            return Ok(PollStatus::Done);
        }

        let budget = self.timeout_cycles(MillisDurationU32::millis(timeout_ms));
        let mut elapsed: u64 = 0;
        let mut last = DWT::cycle_count();

        loop {
            let isr = self.regs.read(ISR);
            if isr & ISR_CEIF != 0 {
                self.regs.write(IFCR, IFCR_ALL);
                self.in_flight = None;
                return Err(Dma2dError::Configuration);
            }
            if isr & ISR_TEIF != 0 {
                self.regs.write(IFCR, IFCR_ALL);
                self.in_flight = None;
                return Err(Dma2dError::Transfer);
            }
            if isr & ISR_TCIF != 0 || self.regs.read(CR) & CR_START == 0 {
                self.regs.write(IFCR, IFCR_ALL);
                self.in_flight = None;
                return Ok(PollStatus::Done);
            }

            // Accumulate in 64 bits; CYCCNT wraps every ~24 s at 180 MHz.
            let now = DWT::cycle_count();
            elapsed += u64::from(now.wrapping_sub(last));
            last = now;
            if elapsed > budget {
                defmt::error!(
                    "dma2d: transfer {} still running after {} ms",
                    handle.0,
                    timeout_ms
                );
                self.abort();
                return Ok(PollStatus::TimedOut);
            }
        }
    }
}
