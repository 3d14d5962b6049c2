//! Host-side trace-recording implementations of the [`crate::hal`] traits.
//!
//! These stand in for real STM32 peripherals in the unit tests under
//! [`crate::engine`]. Each mock records what the engine asked of it (or lets
//! a test pre-arm a pending event) rather than doing anything with real
//! hardware, so tests can assert on the sequence of calls instead of on
//! waveform timing they have no way to observe.

extern crate std;

use std::vec::Vec;

use crate::config::DMA_BUFFER_SIZE;
use crate::hal::{BitDmaStreams, BitTimer, DmaEvents, GpioBank};

#[derive(Default)]
pub struct MockTimer {
    pub running: bool,
    pub bit_period_loaded: bool,
    pub latch_period_loaded: bool,
    pub compare_outputs_enabled: bool,
    pub dma_requests_enabled: bool,
    pub update_interrupt_enabled: bool,
}

impl BitTimer for MockTimer {
    fn stop(&mut self) {
        self.running = false;
    }

    fn start(&mut self) {
        self.running = true;
    }

    fn set_bit_period(&mut self) {
        self.bit_period_loaded = true;
        self.latch_period_loaded = false;
    }

    fn set_latch_period(&mut self) {
        self.latch_period_loaded = true;
        self.bit_period_loaded = false;
    }

    fn enable_compare_outputs(&mut self) {
        self.compare_outputs_enabled = true;
    }

    fn disable_compare_outputs(&mut self) {
        self.compare_outputs_enabled = false;
    }

    fn enable_dma_requests(&mut self) {
        self.dma_requests_enabled = true;
    }

    fn disable_dma_requests(&mut self) {
        self.dma_requests_enabled = false;
    }

    fn enable_update_interrupt(&mut self) {
        self.update_interrupt_enabled = true;
    }

    fn disable_update_interrupt(&mut self) {
        self.update_interrupt_enabled = false;
    }

    fn clear_update_flag(&mut self) {}
}

#[derive(Default)]
pub struct MockDma {
    pub disabled: bool,
    pub armed: Option<(u16, [u16; DMA_BUFFER_SIZE])>,
    pub pending: DmaEvents,
}

impl BitDmaStreams for MockDma {
    fn arm(&mut self, active_mask: u16, ring: &[u16; DMA_BUFFER_SIZE]) {
        self.armed = Some((active_mask, *ring));
        self.disabled = false;
    }

    fn disable(&mut self) {
        self.disabled = true;
    }

    fn clear_flags(&mut self) {
        self.pending = DmaEvents::default();
    }

    fn take_events(&mut self) -> DmaEvents {
        let events = self.pending;
        self.pending = DmaEvents::default();
        events
    }
}

#[derive(Default)]
pub struct MockGpio {
    /// Every mask passed to `force_low`, in call order.
    pub trace: Vec<u16>,
}

impl GpioBank for MockGpio {
    fn force_low(&mut self, mask: u16) {
        self.trace.push(mask);
    }
}
