//! STM32F469 discovery firmware for the double-buffered flush pipeline.
//!
//! Both 800x480 RGB565 surfaces live in external SDRAM. The bouncing-box
//! scene redraws one unmerged dirty area per render pass; the last pass of
//! each frame flips the LTDC to the new surface at vertical blanking and
//! copies the dirty areas into the old one with the DMA2D.

#![no_std]
#![no_main]

mod dma2d;
mod led;
mod ltdc;
mod mmio;
mod sdram;

use core::mem::MaybeUninit;
use core::ptr::addr_of_mut;

use cortex_m::delay::Delay;
use cortex_m::peripheral::DWT;
use cortex_m_rt::entry;
use defmt_rtt as _;
use embedded_hal::digital::OutputPin;
use fugit::HertzU32;
use panic_probe as _;

use flipbuf_core::config::PERF_LOG_INTERVAL;
use flipbuf_core::hal::Pixel;
use flipbuf_core::scene::BouncingBox;
use flipbuf_core::{
    DirtyRegionSet, DisplayConfig, DisplayDriver, FlushError, FlushFlag, Rect, RenderPass,
    Surface, MAX_DIRTY_AREAS,
};

use dma2d::{Dma2d, Dma2dError};
use led::ErrorLed;
use ltdc::{LtdcPanel, LtdcTimingGenerator, PanelTiming};

/// HSI after reset; no PLL is configured.
const CORE_CLOCK: HertzU32 = HertzU32::MHz(16);

const DISPLAY: DisplayConfig = DisplayConfig::OTM8009A;
const FRAMEBUFFER_LEN: usize = DISPLAY.framebuffer_len();

const BOX_SIZE: u16 = 64;

#[link_section = ".framebuffer"]
static mut FRAMEBUFFER_A: MaybeUninit<[Pixel; FRAMEBUFFER_LEN]> = MaybeUninit::uninit();
#[link_section = ".framebuffer"]
static mut FRAMEBUFFER_B: MaybeUninit<[Pixel; FRAMEBUFFER_LEN]> = MaybeUninit::uninit();

/// Set by the flush pipeline when the renderer may draw again.
static FLUSH_DONE: FlushFlag = FlushFlag::new();

type Display = DisplayDriver<'static, Dma2d, LtdcTimingGenerator, &'static FlushFlag>;

/// Clear both surfaces and hand them out as slices.
///
/// # Safety
///
/// Call once, after the SDRAM controller is up.
unsafe fn take_framebuffers() -> (&'static mut [Pixel], &'static mut [Pixel]) {
    let a = addr_of_mut!(FRAMEBUFFER_A).cast::<Pixel>();
    let b = addr_of_mut!(FRAMEBUFFER_B).cast::<Pixel>();
    unsafe {
        core::ptr::write_bytes(a, 0, FRAMEBUFFER_LEN);
        core::ptr::write_bytes(b, 0, FRAMEBUFFER_LEN);
        (
            core::slice::from_raw_parts_mut(a, FRAMEBUFFER_LEN),
            core::slice::from_raw_parts_mut(b, FRAMEBUFFER_LEN),
        )
    }
}

/// Blink the error LED forever.
fn halt(led: &mut ErrorLed, delay: &mut Delay, period_ms: u32) -> ! {
    loop {
        let _ = led.set_high();
        delay.delay_ms(period_ms);
        let _ = led.set_low();
        delay.delay_ms(period_ms);
    }
}

fn bring_up_display(led: &mut ErrorLed, delay: &mut Delay) -> Display {
    if let Err(e) = sdram::init(CORE_CLOCK) {
        defmt::error!("SDRAM init failed: {}", e);
        halt(led, delay, 500);
    }

    // SAFETY: called once, SDRAM is up.
    let (buf_a, buf_b) = unsafe { take_framebuffers() };
    let surfaces = Surface::new(buf_a, DISPLAY.width, DISPLAY.height).and_then(|a| {
        Surface::new(buf_b, DISPLAY.width, DISPLAY.height).map(|b| (a, b))
    });
    let (surface_a, surface_b) = match surfaces {
        Ok(pair) => pair,
        Err(e) => {
            defmt::error!("surface setup failed: {:?}", defmt::Debug2Format(&e));
            halt(led, delay, 250);
        }
    };

    let mut panel = LtdcPanel::new(PanelTiming::OTM8009A);
    // SAFETY: the DMA2D is only driven through this engine.
    let engine = unsafe { Dma2d::new(CORE_CLOCK) };

    match DisplayDriver::initialize(
        DISPLAY,
        surface_a,
        surface_b,
        &mut panel,
        LtdcTimingGenerator::new(),
        engine,
        &FLUSH_DONE,
    ) {
        Ok(display) => display,
        Err(e) => {
            defmt::error!("display init failed: {}", defmt::Display2Format(&e));
            halt(led, delay, 100);
        }
    }
}

#[entry]
fn main() -> ! {
    defmt::info!("flipbuf-stm32f469: starting");

    let mut core = defmt::unwrap!(cortex_m::Peripherals::take());
    core.DCB.enable_trace();
    core.DWT.enable_cycle_counter();

    let mut led = ErrorLed::new();
    let mut delay = Delay::new(core.SYST, CORE_CLOCK.to_Hz());

    let mut display = bring_up_display(&mut led, &mut delay);
    let bufs = display.draw_buffers();
    defmt::info!(
        "draw buffers {=usize:#x} / {=usize:#x}, {} px each, direct={}",
        bufs.buf1,
        bufs.buf2,
        bufs.size_px,
        bufs.direct_mode
    );

    let mut scene = BouncingBox::new(DISPLAY.width, DISPLAY.height, BOX_SIZE);
    let mut dirty = DirtyRegionSet::new();
    let mut frame_cycles: u32 = 0;
    let mut dropped: u32 = 0;
    let mut last_logged: u32 = 0;

    loop {
        // The old front may still be on screen until the last flip latches.
        while display.timing().reload_pending() {
            cortex_m::asm::nop();
        }

        let start = DWT::cycle_count();
        scene.begin_frame(&mut dirty);
        let target = display.draw_target();
        let areas: heapless::Vec<Rect, MAX_DIRTY_AREAS> = dirty.unmerged().collect();
        let passes = areas.len().max(1);

        for pass in 0..passes {
            if let Some(area) = areas.get(pass) {
                scene.render_area(display.surface_mut(target), *area);
            }
            let result = display.flush(&RenderPass {
                target,
                dirty: &dirty,
                last: pass + 1 == passes,
            });
            match result {
                Ok(()) => {
                    let ready = FLUSH_DONE.take();
                    debug_assert!(ready);
                }
                Err(FlushError::AcceleratorTimeout(r)) => {
                    defmt::error!(
                        "frame dropped: DMA2D timeout on ({}, {})-({}, {})",
                        r.x1,
                        r.y1,
                        r.x2,
                        r.y2
                    );
                    dropped += 1;
                    scene.redraw_all();
                    break;
                }
                Err(FlushError::Accelerator(Dma2dError::Busy)) => {
                    // Still winding down from an aborted transfer.
                    defmt::warn!("frame dropped: DMA2D busy");
                    dropped += 1;
                    scene.redraw_all();
                    break;
                }
                Err(e) => {
                    defmt::error!("flush failed: {}", defmt::Display2Format(&e));
                    halt(&mut led, &mut delay, 50);
                }
            }
        }
        frame_cycles = frame_cycles.wrapping_add(DWT::cycle_count().wrapping_sub(start));

        let stats = display.stats();
        if stats.frames != last_logged && stats.frames % PERF_LOG_INTERVAL == 0 {
            let avg_us = frame_cycles / PERF_LOG_INTERVAL / (CORE_CLOCK.to_Hz() / 1_000_000);
            last_logged = stats.frames;
            defmt::info!(
                "frame={}, avg render+flush={}us, copied={}, skipped={}, dropped={}",
                stats.frames,
                avg_us,
                stats.areas_copied,
                stats.areas_skipped,
                dropped
            );
            frame_cycles = 0;
        }
    }
}
