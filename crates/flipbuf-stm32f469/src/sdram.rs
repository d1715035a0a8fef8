//! FMC bring-up for the 16 MiB IS42S32400F SDRAM that holds both surfaces.

use fugit::HertzU32;

use crate::mmio::{rcc, RegisterBlock};

const FMC_BASE: usize = 0xA000_0000;
const SDCR1: usize = 0x140;
const SDTR1: usize = 0x148;
const SDCMR: usize = 0x150;
const SDRTR: usize = 0x154;
const SDSR: usize = 0x158;

const SDSR_BUSY: u32 = 1 << 5;

const CMD_CLOCK_ENABLE: u32 = 0b001;
const CMD_PRECHARGE_ALL: u32 = 0b010;
const CMD_AUTO_REFRESH: u32 = 0b011;
const CMD_LOAD_MODE: u32 = 0b100;
const CMD_TARGET_BANK1: u32 = 1 << 4;

/// Burst length 1, sequential, CAS latency 3, single-location write burst.
const MODE_REGISTER: u32 = 0x0230;

const GPIO_BASE: usize = 0x4002_0000;
const GPIO_STRIDE: usize = 0x400;
const AF_FMC: u32 = 12;

/// (port index, pin mask) for every FMC line routed to the SDRAM.
const FMC_PINS: [(usize, u16); 7] = [
    (2, 0x0001), // PC0
    (3, 0xC703), // PD0-1, 8-10, 14-15
    (4, 0xFF83), // PE0-1, 7-15
    (5, 0xF83F), // PF0-5, 11-15
    (6, 0x8133), // PG0-1, 4-5, 8, 15
    (7, 0xFFEC), // PH2-3, 5-15
    (8, 0x06FF), // PI0-7, 9-10
];

const BUSY_SPINS: u32 = 100_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, defmt::Format)]
pub enum SdramError {
    /// The controller never cleared its busy flag after a command.
    ControllerBusy,
}

fn configure_pins() {
    for (port, mask) in FMC_PINS {
        rcc::enable(rcc::AHB1ENR, 1 << port);
        // SAFETY: GPIO ports C..I are only configured here.
        let gpio = unsafe { RegisterBlock::new(GPIO_BASE + port * GPIO_STRIDE) };
        for pin in (0..16u32).filter(|p| mask & (1 << p) != 0) {
            let two = pin * 2;
            gpio.modify(0x00, |v| (v & !(0b11 << two)) | (0b10 << two)); // MODER: AF
            gpio.modify(0x04, |v| v & !(1 << pin)); // OTYPER: push-pull
            gpio.modify(0x08, |v| v | (0b11 << two)); // OSPEEDR: very high
            let (afr, shift) = if pin < 8 { (0x20, pin * 4) } else { (0x24, (pin - 8) * 4) };
            gpio.modify(afr, |v| (v & !(0xF << shift)) | (AF_FMC << shift));
        }
    }
}

fn command(fmc: RegisterBlock, word: u32) -> Result<(), SdramError> {
    fmc.write(SDCMR, word | CMD_TARGET_BANK1);
    for _ in 0..BUSY_SPINS {
        if fmc.read(SDSR) & SDSR_BUSY == 0 {
            return Ok(());
        }
    }
    Err(SdramError::ControllerBusy)
}

/// Refresh timer count for a 64 ms / 4096-row refresh at SDCLK = HCLK / 2.
fn refresh_count(hclk: HertzU32) -> u32 {
    let sdclk = u64::from(hclk.to_Hz() / 2);
    let per_row_cycles = (sdclk * 15_620 / 1_000_000_000) as u32;
    per_row_cycles.saturating_sub(20).max(41)
}

/// Route the FMC pins, program bank 1 timings and run the JEDEC power-up
/// sequence. Call once before touching anything in `.framebuffer`.
pub fn init(hclk: HertzU32) -> Result<(), SdramError> {
    rcc::enable(rcc::AHB3ENR, rcc::AHB3ENR_FMCEN);
    configure_pins();

    // SAFETY: the FMC is owned by this module.
    let fmc = unsafe { RegisterBlock::new(FMC_BASE) };

    // 8 column bits, 12 row bits, 32-bit bus, 4 banks, CAS 3,
    // SDCLK = HCLK/2, read burst on.
    fmc.write(
        SDCR1,
        (0b01 << 2) | (0b10 << 4) | (1 << 6) | (0b11 << 7) | (0b10 << 10) | (1 << 12),
    );
    // TMRD 2, TXSR 7, TRAS 4, TRC 7, TWR 3, TRP 2, TRCD 2 (cycles, minus one).
    fmc.write(
        SDTR1,
        1 | (6 << 4) | (3 << 8) | (6 << 12) | (2 << 16) | (1 << 20) | (1 << 24),
    );

    command(fmc, CMD_CLOCK_ENABLE)?;
    // At least 100 us of stable clock before the first precharge.
    cortex_m::asm::delay(hclk.to_Hz() / 10_000 + 1);
    command(fmc, CMD_PRECHARGE_ALL)?;
    command(fmc, CMD_AUTO_REFRESH | ((8 - 1) << 5))?;
    command(fmc, CMD_LOAD_MODE | (MODE_REGISTER << 9))?;

    fmc.write(SDRTR, refresh_count(hclk) << 1);

    defmt::info!("sdram: bank 1 ready, refresh count {}", refresh_count(hclk));
    Ok(())
}
