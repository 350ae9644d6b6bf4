pub mod demos;
pub mod listener;
pub mod runner;

pub use crate::domain::model::{BusMessage, Customer, ExceptionPhase, Reservation, UploadedBlob};
pub use crate::domain::ports::{
    BlobStore, CustomerRepository, Demo, MessageHandler, ReservationRepository,
    SubscriptionReceiver, TopicPublisher,
};
pub use crate::utils::error::Result;
