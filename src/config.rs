//! Compile-time configuration for the waveform engine.
//!
//! These are the numbers that are true of every WS2812 string regardless of
//! which microcontroller drives them; target-specific tick conversions (ticks
//! per microsecond) live in the `firmware` crate's `tim` module instead.

/// Number of independently addressable LED strings, and hence GPIO bits, the
/// engine drives at once.
pub const NUM_CHANNELS: usize = 8;

/// Depth of the ring buffer, in 16-bit slots. Split into two halves of
/// [`DMA_BUFFER_FILL_SIZE`] slots each for the half/full refill scheme.
pub const DMA_BUFFER_SIZE: usize = 16;

/// Number of slots regenerated by a single half-transfer or transfer-complete
/// event: one byte (eight bits) across all channels.
pub const DMA_BUFFER_FILL_SIZE: usize = DMA_BUFFER_SIZE / 2;

/// Extra bytes of drain time appended to `max_length` so the hardware can
/// finish clocking out the ring buffer after the last real byte is
/// transposed, expressed in bytes (`DMA_BUFFER_SIZE / 8`).
pub const DRAIN_BYTES: u32 = (DMA_BUFFER_SIZE / 8) as u32;

/// Extra bytes of all-ones padding appended after the drain bytes so every
/// string, regardless of its own length, sees enough trailing low time to be
/// read as quiescent before the reset latch. Chosen for the case where
/// per-channel lengths differ; see DESIGN.md for the Open Question this
/// resolves.
pub const TERMINATOR_BYTES: u32 = 3;

/// Reset-latch gap, expressed as a whole number of bit periods (1.25 us
/// each), giving ~300 us.
pub const RESET_LATCH_BIT_PERIODS: u32 = 240;

/// Channel index (as carried by [`crate::channel::Channel::index`]) to GPIO
/// bit position within the bank. This table is the one place a port to a
/// different pin assignment needs to change.
pub const CHANNEL_GPIO_MAP: [u8; NUM_CHANNELS] = [0, 1, 2, 3, 4, 5, 6, 7];
