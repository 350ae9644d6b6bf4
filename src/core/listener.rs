use crate::domain::model::{BusMessage, ExceptionPhase};
use crate::domain::ports::{MessageHandler, SubscriptionReceiver};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

const RECEIVE_RETRY_DELAY: Duration = Duration::from_secs(1);

/// Background task pumping a subscription into a message handler.
///
/// Messages are peek-locked, handed to the handler, then completed on
/// success or abandoned on failure so the broker redelivers them.
pub struct SubscriptionListener {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl SubscriptionListener {
    pub fn register(
        receiver: Arc<dyn SubscriptionReceiver>,
        handler: Arc<dyn MessageHandler>,
    ) -> Self {
        let (shutdown, shutdown_rx) = watch::channel(false);
        let task = tokio::spawn(listen(receiver, handler, shutdown_rx));
        Self { shutdown, task }
    }

    /// Stops receiving and waits for an in-flight message to finish.
    pub async fn close(self) {
        let _ = self.shutdown.send(true);
        if let Err(e) = self.task.await {
            tracing::warn!("Subscription listener ended abnormally: {}", e);
        }
    }
}

async fn listen(
    receiver: Arc<dyn SubscriptionReceiver>,
    handler: Arc<dyn MessageHandler>,
    mut shutdown: watch::Receiver<bool>,
) {
    tracing::debug!("Subscription listener started");
    loop {
        let received = tokio::select! {
            _ = shutdown.changed() => break,
            received = receiver.receive() => received,
        };

        match received {
            Ok(Some(message)) => process(receiver.as_ref(), handler.as_ref(), message).await,
            Ok(None) => continue,
            Err(e) => {
                handler.notify_exception(&e, ExceptionPhase::Receive);
                tokio::select! {
                    _ = shutdown.changed() => break,
                    _ = tokio::time::sleep(RECEIVE_RETRY_DELAY) => {}
                }
            }
        }
    }
    tracing::debug!("Subscription listener stopped");
}

async fn process(
    receiver: &dyn SubscriptionReceiver,
    handler: &dyn MessageHandler,
    message: BusMessage,
) {
    match handler.on_message(&message).await {
        Ok(()) => {
            if let Err(e) = receiver.complete(&message).await {
                handler.notify_exception(&e, ExceptionPhase::Complete);
            }
        }
        Err(e) => {
            handler.notify_exception(&e, ExceptionPhase::UserCallback);
            if let Err(e) = receiver.abandon(&message).await {
                handler.notify_exception(&e, ExceptionPhase::Abandon);
            }
        }
    }
}
