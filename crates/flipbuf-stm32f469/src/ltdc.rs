//! LTDC layer 1 as the timing generator, plus the LTDC side of panel
//! bring-up.
//!
//! Layer registers are shadowed: writes land in the shadow copy and only
//! reach the active copy on a reload, either immediately (`SRCR.IMR`) or at
//! the start of the next vertical blanking (`SRCR.VBR`).

use flipbuf_hal::{FrameAddress, PanelBringUp, ReloadMode, TimingGenerator};

use crate::mmio::{rcc, RegisterBlock};

const BASE: usize = 0x4001_6800;

const SSCR: usize = 0x08;
const BPCR: usize = 0x0C;
const AWCR: usize = 0x10;
const TWCR: usize = 0x14;
const GCR: usize = 0x18;
const SRCR: usize = 0x24;
const BCCR: usize = 0x2C;

const L1CR: usize = 0x84;
const L1WHPCR: usize = 0x88;
const L1WVPCR: usize = 0x8C;
const L1PFCR: usize = 0x94;
const L1CACR: usize = 0x98;
const L1BFCR: usize = 0xA0;
const L1CFBAR: usize = 0xAC;
const L1CFBLR: usize = 0xB0;
const L1CFBLNR: usize = 0xB4;

const GCR_LTDCEN: u32 = 1 << 0;
const SRCR_IMR: u32 = 1 << 0;
const SRCR_VBR: u32 = 1 << 1;
const LXCR_LEN: u32 = 1 << 0;
const PF_RGB565: u32 = 0b010;

/// Accumulated width/height fields are 12 and 11 bits wide.
const MAX_WIDTH: u16 = 2048;
const MAX_HEIGHT: u16 = 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq, defmt::Format)]
pub enum LtdcError {
    /// The controller is not enabled, so a reload would never happen.
    NotEnabled,
    /// Frame buffers must be halfword aligned for RGB565.
    MisalignedFrame(u32),
    UnsupportedResolution { width: u16, height: u16 },
}

/// Sync and porch widths in pixel clocks (horizontal) and lines (vertical).
#[derive(Debug, Clone, Copy)]
pub struct PanelTiming {
    pub hsync: u16,
    pub hbp: u16,
    pub hfp: u16,
    pub vsync: u16,
    pub vbp: u16,
    pub vfp: u16,
}

impl PanelTiming {
    /// OTM8009A in landscape video mode.
    pub const OTM8009A: Self = Self {
        hsync: 2,
        hbp: 34,
        hfp: 34,
        vsync: 1,
        vbp: 15,
        vfp: 16,
    };
}

fn ltdc() -> RegisterBlock {
    // SAFETY: the LTDC is split between `LtdcPanel` (bring-up only) and
    // `LtdcTimingGenerator` (layer 1 address and reload only).
    unsafe { RegisterBlock::new(BASE) }
}

/// Programs the LTDC timings and layer 1 for the panel resolution.
///
/// The DSI host and the OTM8009A command sequence are driven by the board's
/// boot code; this only covers the controller that feeds them.
pub struct LtdcPanel {
    timing: PanelTiming,
}

impl LtdcPanel {
    pub fn new(timing: PanelTiming) -> Self {
        Self { timing }
    }
}

impl PanelBringUp for LtdcPanel {
    type Error = LtdcError;

    fn bring_up(&mut self, width: u16, height: u16) -> Result<(), Self::Error> {
        if width == 0 || height == 0 || width > MAX_WIDTH || height > MAX_HEIGHT {
            return Err(LtdcError::UnsupportedResolution { width, height });
        }
        rcc::enable(rcc::APB2ENR, rcc::APB2ENR_LTDCEN);

        let t = self.timing;
        let regs = ltdc();
        let (w, h) = (u32::from(width), u32::from(height));
        let hsa = u32::from(t.hsync) - 1;
        let vsa = u32::from(t.vsync) - 1;
        let ahbp = hsa + u32::from(t.hbp);
        let avbp = vsa + u32::from(t.vbp);
        let aaw = ahbp + w;
        let aah = avbp + h;

        regs.write(SSCR, (hsa << 16) | vsa);
        regs.write(BPCR, (ahbp << 16) | avbp);
        regs.write(AWCR, (aaw << 16) | aah);
        regs.write(
            TWCR,
            ((aaw + u32::from(t.hfp)) << 16) | (aah + u32::from(t.vfp)),
        );
        regs.write(BCCR, 0);

        // Layer 1 covers the whole active area.
        regs.write(L1WHPCR, (aaw << 16) | (ahbp + 1));
        regs.write(L1WVPCR, (aah << 16) | (avbp + 1));
        regs.write(L1PFCR, PF_RGB565);
        regs.write(L1CACR, 0xFF);
        // Constant alpha for both blending factors.
        regs.write(L1BFCR, (4 << 8) | 5);
        let pitch = w * 2;
        regs.write(L1CFBLR, (pitch << 16) | (pitch + 3));
        regs.write(L1CFBLNR, h);
        // Takes effect with the first reload, together with the frame
        // address staged by `initialize`.
        regs.modify(L1CR, |v| v | LXCR_LEN);

        regs.modify(GCR, |v| v | GCR_LTDCEN);
        defmt::info!("ltdc: {}x{} RGB565 layer configured", width, height);
        Ok(())
    }
}

/// Switches layer 1 between the two surfaces.
pub struct LtdcTimingGenerator {
    regs: RegisterBlock,
}

impl LtdcTimingGenerator {
    pub fn new() -> Self {
        Self { regs: ltdc() }
    }

    /// A vertical-blanking reload is still waiting for the next frame.
    pub fn reload_pending(&self) -> bool {
        self.regs.read(SRCR) & SRCR_VBR != 0
    }
}

impl Default for LtdcTimingGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl TimingGenerator for LtdcTimingGenerator {
    type Error = LtdcError;

    fn set_next_frame_source(&mut self, addr: FrameAddress) -> Result<(), Self::Error> {
        let addr = addr as u32;
        if addr % 2 != 0 {
            return Err(LtdcError::MisalignedFrame(addr));
        }
        self.regs.write(L1CFBAR, addr);
        Ok(())
    }

    fn request_flip(&mut self, at: ReloadMode) -> Result<(), Self::Error> {
        if self.regs.read(GCR) & GCR_LTDCEN == 0 {
            return Err(LtdcError::NotEnabled);
        }
        let bit = match at {
            ReloadMode::Immediate => SRCR_IMR,
            ReloadMode::VerticalBlanking => SRCR_VBR,
        };
        self.regs.write(SRCR, bit);
        Ok(())
    }
}
