use stm32ral::{modify_reg, write_reg};
use stm32ral::tim1;

use ws2812_octo::config::RESET_LATCH_BIT_PERIODS;
use ws2812_octo::hal::BitTimer;

/// TIM1 driver for WS2812 bit timing.
///
/// Channel 1 compares at T0H (the point at which a zero bit's pin should
/// already be low), channel 2 compares at T1H (the point at which every
/// active pin goes low regardless of data). Neither channel's output is
/// routed to a physical pin: DMA writes GPIOB's BSRR directly on each
/// update/CC event, so CC1E/CC2E here only gate the *DMA requests*, not an
/// AF-routed waveform.
pub struct Tim {
    tim: tim1::Instance,
    tim_ck: u32,
}

/// WS2812 bit period, 1.25us, rounded to the nearest tick at 168MHz.
const BIT_PERIOD_NS: u32 = 1250;
/// T0H: time high for a logical zero, 0.40us.
const T0H_NS: u32 = 400;
/// T1H: time high for a logical one, 0.80us.
const T1H_NS: u32 = 800;

impl Tim {
    pub fn new(tim: tim1::Instance, tim_ck: u32) -> Self {
        write_reg!(tim1, tim, CR1, 0);
        write_reg!(tim1, tim, CR2, 0);
        write_reg!(tim1, tim, SMCR, 0);
        write_reg!(tim1, tim, DIER, 0);
        write_reg!(tim1, tim, SR, 0);
        write_reg!(tim1, tim, PSC, 0);

        write_reg!(tim1, tim, CCMR1, OC1M: PwmMode1, CC1S: Output, OC2M: PwmMode1, CC2S: Output);
        write_reg!(tim1, tim, CCER, CC1E: 1, CC2E: 1);
        write_reg!(tim1, tim, BDTR, MOE: 1);

        Tim { tim, tim_ck }
    }

    fn ticks(&self, ns: u32) -> u32 {
        ((self.tim_ck as u64 * ns as u64) / 1_000_000_000) as u32
    }
}

impl BitTimer for Tim {
    fn stop(&mut self) {
        modify_reg!(tim1, self.tim, CR1, CEN: Disabled);
        write_reg!(tim1, self.tim, CNT, 0);
    }

    fn start(&mut self) {
        modify_reg!(tim1, self.tim, CR1, CEN: Enabled);
    }

    fn set_bit_period(&mut self) {
        let period = self.ticks(BIT_PERIOD_NS);
        write_reg!(tim1, self.tim, CR1, OPM: Disabled, URS: CounterOverflow);
        write_reg!(tim1, self.tim, ARR, period - 1);
        write_reg!(tim1, self.tim, CCR1, self.ticks(T0H_NS));
        write_reg!(tim1, self.tim, CCR2, self.ticks(T1H_NS));
        write_reg!(tim1, self.tim, EGR, UG: Update);
        // Prime the counter at the top of its period so the first update
        // event, and hence the first DMA request, fires immediately once
        // started. Only done here, not in `start`: the latch timer also
        // goes through `start` and must count up from 0 for the full
        // reset-latch gap instead of firing on the very next tick.
        write_reg!(tim1, self.tim, CNT, period - 1);
        write_reg!(tim1, self.tim, SR, 0);
    }

    fn set_latch_period(&mut self) {
        let period = self.ticks(BIT_PERIOD_NS) * RESET_LATCH_BIT_PERIODS;
        write_reg!(tim1, self.tim, CR1, OPM: Enabled, URS: CounterOverflow);
        write_reg!(tim1, self.tim, ARR, period - 1);
        write_reg!(tim1, self.tim, EGR, UG: Update);
        write_reg!(tim1, self.tim, SR, 0);
    }

    fn enable_compare_outputs(&mut self) {
        modify_reg!(tim1, self.tim, CCER, CC1E: 1, CC2E: 1);
    }

    fn disable_compare_outputs(&mut self) {
        modify_reg!(tim1, self.tim, CCER, CC1E: 0, CC2E: 0);
    }

    fn enable_dma_requests(&mut self) {
        modify_reg!(tim1, self.tim, DIER, UDE: Enabled, CC1DE: Enabled, CC2DE: Enabled);
    }

    fn disable_dma_requests(&mut self) {
        modify_reg!(tim1, self.tim, DIER, UDE: Disabled, CC1DE: Disabled, CC2DE: Disabled);
    }

    fn enable_update_interrupt(&mut self) {
        modify_reg!(tim1, self.tim, DIER, UIE: Enabled);
    }

    fn disable_update_interrupt(&mut self) {
        modify_reg!(tim1, self.tim, DIER, UIE: Disabled);
    }

    fn clear_update_flag(&mut self) {
        write_reg!(tim1, self.tim, SR, UIF: Clear);
    }
}
