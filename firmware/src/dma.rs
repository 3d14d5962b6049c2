use stm32ral::{dma2, write_reg, modify_reg, read_reg};

use ws2812_octo::config::DMA_BUFFER_SIZE;
use ws2812_octo::hal::{BitDmaStreams, DmaEvents};

/// DMA2 channel carrying TIM1_CH1/CH2/UP requests on the F429's request map.
const CHSEL: u32 = 6;

/// Driver for a single DMA2 stream, addressed via pointer offset from a
/// shared `dma2::Instance` the same way the upstream DMA driver remaps one
/// stream's registers onto stream-0-shaped field names.
struct Stream {
    dma2: dma2::Instance,
    stream: usize,
}

impl Stream {
    /// # Safety
    /// Must only create one instance per physical stream.
    unsafe fn new(dma2: &dma2::Instance, stream: usize) -> Self {
        // NOTE(unsafe): Make a copy of `dma2` which we will only modify in
        // NOTE(unsafe): ways relating exclusively to our stream.
        let dma2 = core::mem::transmute_copy(dma2);
        Stream { dma2, stream }
    }

    /// Return a special dma2::Instance where the 0th stream's registers
    /// map to our specific stream. Do not access LISR/HISR/LIFCR/HIFCR
    /// through this instance.
    fn regs(&self) -> dma2::Instance {
        let ptr = &*self.dma2 as *const _ as *const u32;
        // NOTE(unsafe): Each stream occupies 6 consecutive words (CR, NDTR,
        // NOTE(unsafe): PAR, M0AR, M1AR, FCR) starting after the two shared
        // NOTE(unsafe): status registers.
        unsafe { core::mem::transmute(ptr.offset(6 * self.stream as isize)) }
    }

    /// Configure this stream to move 16-bit words memory-to-peripheral in
    /// circular mode, from `par` to a fixed or incrementing source.
    fn setup(&self, par: u32, m0ar: u32, minc: bool) {
        let r = self.regs();
        write_reg!(dma2, r, CR0, EN: Disabled);
        while read_reg!(dma2, r, CR0, EN != Disabled) {}
        write_reg!(dma2, r, PAR0, par);
        write_reg!(dma2, r, M0AR0, m0ar);
        write_reg!(dma2, r, NDTR0, DMA_BUFFER_SIZE as u32);
        if minc {
            write_reg!(dma2, r, CR0,
                CHSEL: CHSEL, PL: VeryHigh, MSIZE: Bits16, PSIZE: Bits16,
                DIR: MemoryToPeripheral, CIRC: Enabled, MINC: Incremented,
                TCIE: Enabled, HTIE: Enabled, TEIE: Enabled, EN: Disabled);
        } else {
            write_reg!(dma2, r, CR0,
                CHSEL: CHSEL, PL: VeryHigh, MSIZE: Bits16, PSIZE: Bits16,
                DIR: MemoryToPeripheral, CIRC: Enabled, MINC: Fixed, EN: Disabled);
        }
    }

    fn set_m0ar(&self, m0ar: u32) {
        write_reg!(dma2, self.regs(), M0AR0, m0ar);
    }

    fn enable(&self) {
        modify_reg!(dma2, self.regs(), CR0, EN: Enabled);
    }

    fn disable(&self) {
        let r = self.regs();
        modify_reg!(dma2, r, CR0, EN: Disabled);
        while read_reg!(dma2, r, CR0, EN != Disabled) {}
    }
}

/// The three DMA2 streams chained to TIM1's update/CC1/CC2 events.
///
/// - Stream5 (TIM1_UP): writes the fixed active-mask word to BSRR's lower
///   (set) half every bit period, raising every active pin.
/// - Stream1 (TIM1_CH1): writes the ring buffer, one word per bit period,
///   to BSRR's upper (reset) half, lowering the pins whose bit is zero.
///   The only stream with memory-increment, and the one this driver takes
///   its half-transfer/transfer-complete/error interrupts from: deliberately
///   different from the reference board support package, which wires those
///   flags to the CLEAR-ALL stream purely because both streams share
///   identical NDTR/CIRC timing and either works; tying them to the stream
///   whose buffer is actually being consumed is simpler to reason about.
/// - Stream2 (TIM1_CH2): writes the fixed active-mask word to BSRR's upper
///   half every bit period, unconditionally lowering every active pin by
///   T1H.
pub struct Ws2812Dma {
    set: Stream,
    clear0: Stream,
    clear_all: Stream,
    active_mask_word: u16,
}

impl Ws2812Dma {
    /// `bsrr_set` and `bsrr_clear` are the addresses of GPIOB's BSRR
    /// register's lower (set) and upper (reset) halves.
    pub fn new(dma2: dma2::Instance, bsrr_set: u32, bsrr_clear: u32) -> Self {
        // NOTE(unsafe): Each Stream below only ever touches its own
        // NOTE(unsafe): stream's registers.
        let (set, clear0, clear_all) = unsafe {
            (Stream::new(&dma2, 5), Stream::new(&dma2, 1), Stream::new(&dma2, 2))
        };

        let mut this = Ws2812Dma { set, clear0, clear_all, active_mask_word: 0 };
        let mask_ptr = &this.active_mask_word as *const u16 as u32;

        this.set.setup(bsrr_set, mask_ptr, false);
        this.clear0.setup(bsrr_clear, 0, true);
        this.clear_all.setup(bsrr_clear, mask_ptr, false);

        this
    }
}

impl BitDmaStreams for Ws2812Dma {
    fn arm(&mut self, active_mask: u16, ring: &[u16; DMA_BUFFER_SIZE]) {
        self.active_mask_word = active_mask;
        // NOTE(unsafe): `ring` outlives this call under the Engine::refresh
        // NOTE(unsafe): contract; DMA only needs its address, not a retained
        // NOTE(unsafe): Rust reference.
        self.clear0.set_m0ar(ring.as_ptr() as u32);

        self.set.enable();
        self.clear0.enable();
        self.clear_all.enable();
    }

    fn disable(&mut self) {
        self.set.disable();
        self.clear0.disable();
        self.clear_all.disable();
    }

    fn clear_flags(&mut self) {
        write_reg!(dma2, self.clear0.dma2, LIFCR, 0x0000_0F40); // stream1 (CLEAR-0)
        write_reg!(dma2, self.clear0.dma2, LIFCR, 0x003D_0000); // stream2 (CLEAR-ALL)
        write_reg!(dma2, self.clear0.dma2, HIFCR, 0x0000_0F40); // stream5 (SET)
    }

    fn take_events(&mut self) -> DmaEvents {
        let half_transfer = read_reg!(dma2, self.clear0.dma2, LISR, HTIF1 == Complete);
        let transfer_complete = read_reg!(dma2, self.clear0.dma2, LISR, TCIF1 == Complete);
        let transfer_error = read_reg!(dma2, self.clear0.dma2, LISR, TEIF1 == Error);

        write_reg!(dma2, self.clear0.dma2, LIFCR, 0x0000_0F40);

        DmaEvents { half_transfer, transfer_complete, transfer_error }
    }
}
