//! Hardware abstraction traits the waveform engine is generic over.
//!
//! The reference firmware wires the engine directly to STM32 peripheral
//! registers (see the `firmware` crate's `tim`/`dma`/`gpio` modules). For
//! host-side testing there is no microcontroller, so the engine's state
//! machine in [`crate::engine`] is written against these three small traits
//! instead of concrete register types, and [`crate::mock`] provides an
//! in-memory trace-recording implementation used by the test suite.

use crate::config::DMA_BUFFER_SIZE;

/// The data DMA stream's pending event flags, as read and cleared together by
/// [`BitDmaStreams::take_events`].
#[derive(Clone, Copy, Default, Debug, PartialEq, Eq)]
pub struct DmaEvents {
    pub half_transfer: bool,
    pub transfer_complete: bool,
    pub transfer_error: bool,
}

/// The single bit-period timer: one up-counter with two compare outputs (T0H
/// and T1H) used during streaming, reconfigured as a one-shot for the
/// reset-latch gap afterwards.
pub trait BitTimer {
    /// Stop counting and reset the counter to zero.
    fn stop(&mut self);
    /// Start counting from the current auto-reload/compare configuration.
    fn start(&mut self);
    /// Load the 1.25us WS2812 bit period and T0H/T1H compare values.
    fn set_bit_period(&mut self);
    /// Load the ~300us reset-latch period as a one-shot.
    fn set_latch_period(&mut self);
    /// Physically enable the two PWM compare outputs (T0H/T1H edges).
    fn enable_compare_outputs(&mut self);
    /// Physically disable the two PWM compare outputs, so no waveform is
    /// emitted while latching or idle.
    fn disable_compare_outputs(&mut self);
    /// Enable the three DMA requests (update, CC-A, CC-B).
    fn enable_dma_requests(&mut self);
    /// Disable the three DMA requests.
    fn disable_dma_requests(&mut self);
    fn enable_update_interrupt(&mut self);
    fn disable_update_interrupt(&mut self);
    fn clear_update_flag(&mut self);
}

/// The three DMA streams chained to the timer's update/CC-A/CC-B events.
pub trait BitDmaStreams {
    /// Arm all three streams for one refresh: SET and CLEAR-ALL source the
    /// fixed `active_mask` word, CLEAR-0 sources `ring` with memory-increment
    /// and circular wraparound.
    fn arm(&mut self, active_mask: u16, ring: &[u16; DMA_BUFFER_SIZE]);
    /// Disable all three streams.
    fn disable(&mut self);
    /// Clear any pending status flags on all three streams.
    fn clear_flags(&mut self);
    /// Read and clear the CLEAR-0 stream's half-transfer, transfer-complete
    /// and transfer-error flags.
    fn take_events(&mut self) -> DmaEvents;
}

/// Direct (non-DMA) access to the GPIO bank's bit-reset register. Used for
/// the defensive idle clamp once the cursor has run past `max_length`, and to
/// force pins low at the streaming-to-latching transition.
pub trait GpioBank {
    fn force_low(&mut self, mask: u16);
}

/// Optional instrumentation pins pulsed on refresh and ISR entry, with no
/// effect on waveform generation. Default methods are no-ops so `()` can
/// stand in wherever debug instrumentation isn't wired up.
pub trait DebugPins {
    fn pulse_refresh(&mut self) {}
    fn pulse_isr(&mut self) {}
}

impl DebugPins for () {}
