use crate::domain::model::{BusMessage, Customer, ExceptionPhase, Reservation, UploadedBlob};
use crate::utils::error::{Result, ShowcaseError};
use async_trait::async_trait;

#[async_trait]
pub trait CustomerRepository: Send + Sync {
    async fn first_customers(&self, limit: usize) -> Result<Vec<Customer>>;
}

#[async_trait]
pub trait TopicPublisher: Send + Sync {
    async fn send(&self, message: BusMessage) -> Result<()>;
}

/// Peek-lock receiver for a topic subscription.
#[async_trait]
pub trait SubscriptionReceiver: Send + Sync {
    /// Waits up to the receiver's poll timeout; `None` when nothing arrived.
    async fn receive(&self) -> Result<Option<BusMessage>>;
    async fn complete(&self, message: &BusMessage) -> Result<()>;
    async fn abandon(&self, message: &BusMessage) -> Result<()>;
}

#[async_trait]
pub trait MessageHandler: Send + Sync {
    async fn on_message(&self, message: &BusMessage) -> Result<()>;
    fn notify_exception(&self, error: &ShowcaseError, phase: ExceptionPhase);
}

pub trait BlobStore: Send + Sync {
    fn ensure_container(&self) -> impl std::future::Future<Output = Result<()>> + Send;
    fn upload(
        &self,
        name: &str,
        data: Vec<u8>,
        content_type: &str,
    ) -> impl std::future::Future<Output = Result<UploadedBlob>> + Send;
}

#[async_trait]
pub trait ReservationRepository: Send + Sync {
    async fn ensure_collection(&self) -> Result<()>;
    /// Returns the number of deleted documents.
    async fn delete_all(&self) -> Result<usize>;
    async fn save(&self, reservation: Reservation) -> Result<Reservation>;
}

/// A component that runs one scripted action when the application is ready.
#[async_trait]
pub trait Demo: Send + Sync {
    fn name(&self) -> &str;
    async fn run(&self) -> Result<()>;

    /// Releases background resources started by `run`.
    async fn shutdown(&self) {}
}
