#![no_std]
#![no_main]

use panic_rtt_target as _;
mod dma;
mod gpio;
mod rcc;
mod tim;

#[rtic::app(device=stm32ral::stm32f4::stm32f429, dispatchers=[])]
mod app {
    use crate::{dma::Ws2812Dma, gpio, rcc, tim::Tim};
    use rtt_target::{rtt_init_print, rprintln, rprint};
    use ws2812_octo::config::DMA_BUFFER_SIZE;
    use ws2812_octo::Engine;

    /// Ring buffer DMA2 Stream1 (CLEAR-0) reads from. Must outlive every
    /// refresh, so it is a `'static` allocation rather than stack memory.
    static mut RING: [u16; DMA_BUFFER_SIZE] = [0; DMA_BUFFER_SIZE];

    type Hal = Engine<Tim, Ws2812Dma, gpio::Pins, ()>;

    #[shared]
    struct Shared {
        engine: Hal,
    }

    #[local]
    struct Local {}

    #[init]
    fn init(cx: init::Context) -> (Shared, Local, init::Monotonics) {
        rtt_init_print!();
        rprintln!("ws2812_octo initialising...");

        rprint!("  RCC...      ");
        let clocks = rcc::setup(cx.device.RCC, cx.device.PWR, cx.device.FLASH);
        rprintln!("OK");

        rprint!("  GPIO...     ");
        let pins = gpio::setup(cx.device.GPIOB);
        rprintln!("OK");

        rprint!("  TIM...      ");
        let mut tim = Tim::new(cx.device.TIM1, clocks.tim1_ck);
        tim.set_bit_period();
        rprintln!("OK");

        rprint!("  DMA...      ");
        let bsrr = &cx.device.GPIOB.BSRR as *const _ as u32;
        let dma = Ws2812Dma::new(cx.device.DMA2, bsrr, bsrr + 2);
        rprintln!("OK");

        // NOTE(unsafe): The engine is the only thing that ever touches
        // NOTE(unsafe): RING after this point, and it only does so from
        // NOTE(unsafe): interrupt context or while constructing a refresh.
        let ring = unsafe { &mut RING };
        let engine = Engine::new(tim, dma, pins, (), ring);

        rprintln!("Initialisation complete.");

        (Shared { engine }, Local {}, init::Monotonics {})
    }

    #[idle]
    fn idle(_: idle::Context) -> ! {
        loop {
            cortex_m::asm::wfi();
        }
    }

    /// Data DMA stream (CLEAR-0, DMA2 Stream1) interrupt: half-transfer,
    /// transfer-complete and transfer-error all route here.
    #[task(binds=DMA2_STR1, priority=5, shared=[engine])]
    fn dma_isr(mut cx: dma_isr::Context) {
        cx.shared.engine.lock(|engine| engine.dma_isr());
    }

    /// Bit-period timer (TIM1) update interrupt: fires once after the
    /// reset-latch gap to return the engine to idle.
    #[task(binds=TIM1_UP_TIM10, priority=5, shared=[engine])]
    fn timer_isr(mut cx: timer_isr::Context) {
        cx.shared.engine.lock(|engine| engine.timer_isr());
    }

}
