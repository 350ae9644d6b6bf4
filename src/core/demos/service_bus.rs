use crate::core::listener::SubscriptionListener;
use crate::domain::model::{BusMessage, ExceptionPhase};
use crate::domain::ports::{Demo, MessageHandler, SubscriptionReceiver, TopicPublisher};
use crate::utils::error::{Result, ShowcaseError};
use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

/// Logs every message received on the subscription.
pub struct LoggingMessageHandler;

#[async_trait]
impl MessageHandler for LoggingMessageHandler {
    async fn on_message(&self, message: &BusMessage) -> Result<()> {
        tracing::info!(
            "new message having body '{}' and id '{}'",
            message.body_text(),
            message.message_id
        );
        Ok(())
    }

    fn notify_exception(&self, error: &ShowcaseError, phase: ExceptionPhase) {
        tracing::error!(phase = %phase, "eek! {}", error);
    }
}

pub fn greeting_message() -> BusMessage {
    BusMessage::text(format!(
        "Hello @ {}",
        Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
    ))
}

/// Registers a subscription handler, waits, then publishes one message.
pub struct ServiceBusDemo {
    publisher: Arc<dyn TopicPublisher>,
    receiver: Arc<dyn SubscriptionReceiver>,
    handler: Arc<dyn MessageHandler>,
    publish_delay: Duration,
    listener: Mutex<Option<SubscriptionListener>>,
}

impl ServiceBusDemo {
    pub fn new(
        publisher: Arc<dyn TopicPublisher>,
        receiver: Arc<dyn SubscriptionReceiver>,
        publish_delay: Duration,
    ) -> Self {
        Self::with_handler(publisher, receiver, Arc::new(LoggingMessageHandler), publish_delay)
    }

    pub fn with_handler(
        publisher: Arc<dyn TopicPublisher>,
        receiver: Arc<dyn SubscriptionReceiver>,
        handler: Arc<dyn MessageHandler>,
        publish_delay: Duration,
    ) -> Self {
        Self {
            publisher,
            receiver,
            handler,
            publish_delay,
            listener: Mutex::new(None),
        }
    }
}

#[async_trait]
impl Demo for ServiceBusDemo {
    fn name(&self) -> &str {
        "service-bus"
    }

    async fn run(&self) -> Result<()> {
        {
            let mut listener = self.listener.lock().await;
            if listener.is_none() {
                *listener = Some(SubscriptionListener::register(
                    Arc::clone(&self.receiver),
                    Arc::clone(&self.handler),
                ));
            }
        }

        tokio::time::sleep(self.publish_delay).await;

        let message = greeting_message();
        tracing::debug!("Publishing '{}'", message.body_text());
        self.publisher.send(message).await
    }

    async fn shutdown(&self) {
        if let Some(listener) = self.listener.lock().await.take() {
            listener.close().await;
        }
    }
}
