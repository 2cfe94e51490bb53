use crate::domain::model::InputEvent;
use crate::utils::error::Result;
use async_trait::async_trait;

/// Byte link to the rover's driver board.
#[async_trait]
pub trait Transport: Send {
    async fn write_all(&mut self, data: &[u8]) -> Result<()>;

    /// Returns whatever bytes have arrived, waiting no longer than a short
    /// idle gap. An empty buffer means nothing was pending.
    async fn read_available(&mut self) -> Result<Vec<u8>>;

    async fn close(&mut self) -> Result<()>;
}

#[async_trait]
pub trait InputSource: Send {
    /// `None` once the device has gone away.
    ///
    /// Must be cancel safe: the session drops this future whenever another
    /// branch wins, and to check whether an event is already queued.
    async fn next_event(&mut self) -> Result<Option<InputEvent>>;
}
