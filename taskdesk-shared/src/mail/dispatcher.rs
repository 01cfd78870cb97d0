/// Background mail queue
///
/// [`MailDispatcher::spawn`] starts one worker task that drains an unbounded
/// channel and hands each message to the configured [`Mailer`]. Enqueueing
/// never blocks and never fails the caller.
///
/// On shutdown the worker delivers whatever is already queued and exits.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::{MailError, Mailer, OutboundEmail};

/// Handle for queueing outbound mail
#[derive(Clone)]
pub struct MailDispatcher {
    tx: mpsc::UnboundedSender<OutboundEmail>,
}

impl MailDispatcher {
    /// Starts the delivery worker
    pub fn spawn(mailer: Arc<dyn Mailer>, shutdown: CancellationToken) -> (Self, JoinHandle<()>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let handle = tokio::spawn(run_worker(mailer, rx, shutdown));
        (Self { tx }, handle)
    }

    /// Queues a message for delivery
    pub fn enqueue(&self, email: OutboundEmail) {
        if let Err(e) = self.try_enqueue(email) {
            tracing::warn!(error = %e, "Dropping outbound mail");
        }
    }

    fn try_enqueue(&self, email: OutboundEmail) -> Result<(), MailError> {
        self.tx.send(email).map_err(|_| MailError::QueueClosed)
    }
}

async fn run_worker(
    mailer: Arc<dyn Mailer>,
    mut rx: mpsc::UnboundedReceiver<OutboundEmail>,
    shutdown: CancellationToken,
) {
    tracing::debug!("Mail worker started");

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => {
                rx.close();
                while let Some(email) = rx.recv().await {
                    deliver(mailer.as_ref(), &email).await;
                }
                break;
            }
            next = rx.recv() => {
                match next {
                    Some(email) => deliver(mailer.as_ref(), &email).await,
                    None => break,
                }
            }
        }
    }

    tracing::debug!("Mail worker stopped");
}

async fn deliver(mailer: &dyn Mailer, email: &OutboundEmail) {
    if let Err(e) = mailer.send(email).await {
        tracing::warn!(
            to = %email.to,
            subject = %email.subject,
            error = %e,
            "Failed to deliver mail"
        );
    }
}
