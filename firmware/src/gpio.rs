#![allow(dead_code)]

use stm32ral::{gpio, write_reg};

use ws2812_octo::hal::GpioBank;

/// GPIOB bank driver: pins 0-7 are the eight WS2812 data lines, one per
/// string, matching [`ws2812_octo::config::CHANNEL_GPIO_MAP`].
pub struct Pins {
    bsrr: u32,
}

/// Configure GPIOB0-7 as push-pull outputs at very high speed, idling low.
///
/// Very high speed is required so the SET/CLEAR-0/CLEAR-ALL edges land
/// within the WS2812's nanosecond-scale T0H/T1H tolerances.
pub fn setup(gpiob: gpio::Instance) -> Pins {
    write_reg!(gpio, gpiob, ODR, 0);
    write_reg!(gpio, gpiob, MODER,
        MODER0: Output, MODER1: Output, MODER2: Output, MODER3: Output,
        MODER4: Output, MODER5: Output, MODER6: Output, MODER7: Output);
    write_reg!(gpio, gpiob, OSPEEDR,
        OSPEEDR0: VeryHighSpeed, OSPEEDR1: VeryHighSpeed, OSPEEDR2: VeryHighSpeed,
        OSPEEDR3: VeryHighSpeed, OSPEEDR4: VeryHighSpeed, OSPEEDR5: VeryHighSpeed,
        OSPEEDR6: VeryHighSpeed, OSPEEDR7: VeryHighSpeed);
    write_reg!(gpio, gpiob, OTYPER,
        OT0: PushPull, OT1: PushPull, OT2: PushPull, OT3: PushPull,
        OT4: PushPull, OT5: PushPull, OT6: PushPull, OT7: PushPull);

    Pins { bsrr: &gpiob.BSRR as *const _ as u32 }
}

impl GpioBank for Pins {
    /// Force the given pins low via the upper (reset) half of BSRR. This is
    /// the same register DMA2 Stream2 (CLEAR-ALL) writes through; doing it
    /// directly from software is only used for the idle clamp and the
    /// streaming-to-latching transition, both of which run with the DMA
    /// streams already disabled.
    fn force_low(&mut self, mask: u16) {
        // NOTE(unsafe): Write-only access to an atomic bit-set/reset
        // NOTE(unsafe): register; no other code writes these bits while the
        // NOTE(unsafe): engine owns this bank.
        unsafe {
            core::ptr::write_volatile(self.bsrr as *mut u32, (mask as u32) << 16);
        }
    }
}
