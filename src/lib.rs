//! Bit-parallel WS2812 waveform engine: drives up to eight independent LED
//! strings from one timer and three DMA streams feeding a shared GPIO bank.
//!
//! # Concept of operation
//!
//! A single timer tick is one WS2812 bit period (1.25us). Its update event
//! raises every active string's pin; its two compare events lower the pins
//! that should already have gone low for a zero bit (T0H) and then lower
//! every active pin unconditionally (T1H), producing the waveform for all
//! eight strings at once without per-pin software intervention. The only
//! stream that reads from memory is the T0H clear stream, fed from a small
//! ring buffer that [`engine::Engine`] keeps refilled from interrupt context;
//! [`transpose::transpose`] is the function that turns each channel's next
//! frame byte into that stream's eight clear words.
//!
//! This crate is `no_std` and contains no peripheral access code: the state
//! machine in [`engine`] is written against the traits in [`hal`], so it
//! builds and its tests run on the host. The `firmware` workspace member
//! wires it to real STM32 registers.

#![no_std]

pub mod channel;
pub mod config;
pub mod engine;
pub mod hal;
pub mod transpose;

#[cfg(test)]
mod mock;

pub use channel::Channel;
pub use engine::Engine;
