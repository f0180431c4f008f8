//! Network link trait

use crate::config::Endpoint;

/// Short-lived TCP link to the authorization server
///
/// One connection is opened per sync session and closed at its end.
/// `open` and `send` may take as long as the underlying transport needs;
/// `try_recv` must never block.
pub trait NetLink {
    /// Transport error type
    type Error;

    /// Check whether a whole session can be queued right now
    ///
    /// Links that hand work to another task return false while that task
    /// is backed up. The caller keeps its request and tries again later.
    fn is_ready(&self) -> bool {
        true
    }

    /// Connect to `endpoint`
    fn open(&mut self, endpoint: &Endpoint) -> Result<(), Self::Error>;

    /// Write all of `data` to the open connection
    fn send(&mut self, data: &[u8]) -> Result<(), Self::Error>;

    /// Copy any received bytes into `buf`
    ///
    /// Returns `Ok(0)` when nothing has arrived yet. A closed or failed
    /// connection is an error.
    fn try_recv(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error>;

    /// Close the connection, if one is open
    fn close(&mut self);
}
