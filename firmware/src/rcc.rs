use stm32ral::{rcc, pwr, flash, read_reg, write_reg, modify_reg};

/// Frequencies for each clock in the system, in Hz.
#[derive(Copy, Clone, Debug)]
pub struct Clocks {
    pub sys_ck: u32,
    pub ahb_ck: u32,
    pub apb1_ck: u32,
    pub apb2_ck: u32,
    pub tim1_ck: u32,
}

/// Configure device clocks.
///
/// Uses an 8MHz HSE crystal, PLL'd up to 168MHz sysclk. APB2 runs at 84MHz
/// with the x2 timer-clock multiplier in effect (APB2 prescaler != 1), so
/// TIM1 is clocked at 168MHz: one tick is ~5.95ns, giving enough resolution
/// to place T0H/T1H within a few nanoseconds of the WS2812 datasheet values.
pub fn setup(rcc: rcc::Instance, pwr: pwr::Instance, flash: flash::Instance) -> Clocks {
    // Enable power interface clock and select scale 1 voltage regulator
    // output, required to reach 168MHz.
    modify_reg!(rcc, rcc, APB1ENR, PWREN: Enabled);
    write_reg!(pwr, pwr, CR, VOS: Scale1);

    // Enable HSE and wait for it to stabilise.
    modify_reg!(rcc, rcc, CR, HSEON: On);
    while read_reg!(rcc, rcc, CR, HSERDY != Ready) {}

    // Configure main PLL: HSE(8MHz)/PLLM(8) = 1MHz VCO input,
    // *PLLN(336) = 336MHz VCO, /PLLP(2) = 168MHz sysclk,
    // /PLLQ(7) = 48MHz for USB/SDIO/RNG (unused here but left valid).
    write_reg!(rcc, rcc, PLLCFGR,
        PLLSRC: HSE, PLLM: 8, PLLN: 336, PLLP: Div2, PLLQ: 7);
    modify_reg!(rcc, rcc, CR, PLLON: On);
    while read_reg!(rcc, rcc, CR, PLLRDY != Ready) {}

    // Set flash latency for 168MHz at scale 1 (5 wait states) and enable the
    // prefetch/caches.
    write_reg!(flash, flash, ACR, LATENCY: 5, PRFTEN: Enabled, ICEN: Enabled, DCEN: Enabled);

    // AHB = sysclk/1 = 168MHz. APB1 = AHB/4 = 42MHz (max 42MHz).
    // APB2 = AHB/2 = 84MHz (max 84MHz); TIM1 on APB2 is clocked at 2x this
    // (168MHz) because the APB2 prescaler is not 1.
    write_reg!(rcc, rcc, CFGR, HPRE: Div1, PPRE1: Div4, PPRE2: Div2);

    // Switch system clock to the PLL and wait for the switch to take.
    modify_reg!(rcc, rcc, CFGR, SW: PLL);
    while read_reg!(rcc, rcc, CFGR, SWS != PLL) {}

    // Enable peripheral clocks: GPIOB for the LED bank, DMA2 for the three
    // waveform streams, TIM1 for bit timing.
    write_reg!(rcc, rcc, AHB1ENR, GPIOBEN: Enabled, DMA2EN: Enabled);
    write_reg!(rcc, rcc, APB2ENR, TIM1EN: Enabled);

    Clocks {
        sys_ck: 168_000_000,
        ahb_ck: 168_000_000,
        apb1_ck: 42_000_000,
        apb2_ck: 84_000_000,
        tim1_ck: 168_000_000,
    }
}
