//! Publisher trait for a unified publish interface
//!
//! This module provides a common trait for anything that can deliver a
//! [`PublishMessage`], enabling both the real MQTT client and in-memory
//! publishers for testing.

use crate::error::Result;
use crate::types::PublishMessage;

/// Delivers one message to the broker with at-least-once semantics.
///
/// Implementations block until the broker acknowledged the message or the
/// attempt failed. They report failures; they never retry on their own.
#[cfg_attr(test, mockall::automock)]
pub trait Publisher: Send {
    fn publish(&mut self, message: &PublishMessage) -> Result<()>;
}

impl<P: Publisher + ?Sized> Publisher for Box<P> {
    fn publish(&mut self, message: &PublishMessage) -> Result<()> {
        (**self).publish(message)
    }
}
