//! Channel descriptors: the caller-facing view of one LED string's frame, and
//! the engine-owned, lifetime-erased record of it kept across a refresh.

use crate::transpose::ChannelView;

/// A borrowed view of one LED string's frame for a single [`refresh`] call.
///
/// [`refresh`]: crate::engine::Engine::refresh
#[derive(Clone, Copy)]
pub struct Channel<'a> {
    /// Frame bytes, MSB-first, one byte per color channel in whatever order
    /// the downstream LED expects. An empty slice marks the channel inactive
    /// for this refresh.
    pub frame: &'a [u8],
    /// Index 0..7 selecting which GPIO bit in the bank this channel uses, via
    /// [`crate::config::CHANNEL_GPIO_MAP`]. `refresh` looks up the pin by this
    /// field, not by the channel's position in the array passed to it, so two
    /// entries may carry the same index only by caller error (the second
    /// silently overwrites the first's pin mapping).
    pub index: u8,
}

/// Engine-owned record of a channel's frame, valid for the duration of one
/// refresh.
///
/// Stores a raw pointer/length pair rather than a borrow because the engine
/// must hold onto it across the lifetime of ISR calls, which Rust cannot
/// express as a borrow without threading a lifetime through every interrupt
/// handler. The caller's contract (see crate docs) is that the frame buffer
/// remains valid and unmodified until the refresh completes; violating it is
/// undefined behavior by design, exactly as in the C original this engine is
/// modeled on.
#[derive(Clone, Copy)]
pub(crate) struct StoredChannel {
    frame_ptr: *const u8,
    length_in_bytes: u32,
    gpio_bit: u8,
}

impl StoredChannel {
    pub(crate) const EMPTY: StoredChannel =
        StoredChannel { frame_ptr: core::ptr::null(), length_in_bytes: 0, gpio_bit: 0 };

    pub(crate) fn new(channel: &Channel, gpio_bit: u8) -> Self {
        StoredChannel {
            frame_ptr: channel.frame.as_ptr(),
            length_in_bytes: channel.frame.len() as u32,
            gpio_bit,
        }
    }

    pub(crate) fn length_in_bytes(&self) -> u32 {
        self.length_in_bytes
    }

    pub(crate) fn gpio_bit(&self) -> u8 {
        self.gpio_bit
    }

    /// Reconstruct a slice view of this channel's frame.
    ///
    /// # Safety
    /// The caller must ensure the original frame buffer is still alive and
    /// has not been mutated, per the `refresh` contract.
    pub(crate) unsafe fn view(&self) -> ChannelView<'static> {
        // NOTE(unsafe): valid for the duration of one refresh under the
        // NOTE(unsafe): caller's contract; see struct docs.
        let bytes = if self.length_in_bytes == 0 {
            &[]
        } else {
            core::slice::from_raw_parts(self.frame_ptr, self.length_in_bytes as usize)
        };
        ChannelView { bytes, gpio_bit: self.gpio_bit }
    }
}
