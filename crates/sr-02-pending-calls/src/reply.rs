//! Awaitable side of a pending call.

use std::future::Future;
use std::pin::Pin;
use std::rc::Weak;
use std::task::{Context, Poll};

use shared_types::{CorrelationId, DispatchError};
use tokio::sync::oneshot;

use crate::domain::call::Settlement;
use crate::domain::CallResult;
use crate::table::{PendingCallTable, TableShared};

/// Resolves to the reply, or to the error that ended the call.
///
/// Dropping it before it resolves deregisters the call and cancels its
/// timer; a reply arriving afterwards is discarded as stale.
#[must_use = "dropping a PendingReply cancels the call"]
pub struct PendingReply {
    correlation_id: CorrelationId,
    receiver: oneshot::Receiver<Settlement>,
    table: Weak<TableShared>,
    settled: bool,
    expired: bool,
}

impl PendingReply {
    pub(crate) fn new(
        correlation_id: CorrelationId,
        receiver: oneshot::Receiver<Settlement>,
        table: Weak<TableShared>,
    ) -> Self {
        Self {
            correlation_id,
            receiver,
            table,
            settled: false,
            expired: false,
        }
    }

    pub fn correlation_id(&self) -> CorrelationId {
        self.correlation_id
    }

    /// True once the call has failed because its own deadline passed.
    ///
    /// A `Timeout` relayed in the peer's error reply leaves this false.
    pub fn expired(&self) -> bool {
        self.expired
    }
}

impl Future for PendingReply {
    type Output = CallResult;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = &mut *self;
        match Pin::new(&mut this.receiver).poll(cx) {
            Poll::Ready(Ok(settlement)) => {
                this.settled = true;
                this.expired = settlement.expired;
                Poll::Ready(settlement.result)
            }
            // Sender dropped without a value: the entry was cancelled.
            Poll::Ready(Err(_)) => {
                this.settled = true;
                Poll::Ready(Err(DispatchError::Cancelled))
            }
            Poll::Pending => Poll::Pending,
        }
    }
}

impl Drop for PendingReply {
    fn drop(&mut self) {
        if self.settled {
            return;
        }
        if let Some(shared) = self.table.upgrade() {
            PendingCallTable::from_shared(shared).abandon(self.correlation_id);
        }
    }
}

impl std::fmt::Debug for PendingReply {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PendingReply")
            .field("correlation_id", &self.correlation_id)
            .field("settled", &self.settled)
            .field("expired", &self.expired)
            .finish()
    }
}
