use anyhow::Result;
use async_trait::async_trait;
use azure_showcase::adapters::service_bus::ServiceBusClient;
use azure_showcase::config::connection_string::ServiceBusConnection;
use azure_showcase::core::demos::ServiceBusDemo;
use azure_showcase::domain::model::{BusMessage, ExceptionPhase};
use azure_showcase::domain::ports::{Demo, MessageHandler, SubscriptionReceiver, TopicPublisher};
use azure_showcase::ShowcaseError;
use httpmock::prelude::*;
use std::sync::{Arc, Mutex};
use std::time::Duration;

fn bus(server: &MockServer) -> ServiceBusClient {
    ServiceBusClient::new(ServiceBusConnection {
        endpoint: server.base_url(),
        key_name: "RootManageSharedAccessKey".to_string(),
        key: "c2VjcmV0".to_string(),
    })
}

#[tokio::test]
async fn test_send_posts_body_with_message_id() -> Result<()> {
    let server = MockServer::start();
    let send_mock = server.mock(|when, then| {
        when.method(POST)
            .path("/messages/messages")
            .header_exists("authorization")
            .header_exists("brokerproperties")
            .body("Hello @ now");
        then.status(201);
    });

    let topic = bus(&server).topic_client("messages");
    topic.send(BusMessage::text("Hello @ now")).await?;

    send_mock.assert();
    Ok(())
}

#[tokio::test]
async fn test_receive_reads_broker_properties() -> Result<()> {
    let server = MockServer::start();
    let head_mock = server.mock(|when, then| {
        when.method(POST)
            .path("/messages/subscriptions/messages-subscription/messages/head")
            .query_param("timeout", "1");
        then.status(201)
            .header(
                "BrokerProperties",
                r#"{"MessageId":"m-1","LockToken":"lock-1","SequenceNumber":7,"DeliveryCount":1}"#,
            )
            .body("Hello @ then");
    });

    let subscription = bus(&server).subscription_client(
        "messages",
        "messages-subscription",
        Duration::from_secs(1),
    );
    let message = subscription.receive().await?.expect("a message");

    head_mock.assert();
    assert_eq!(message.message_id, "m-1");
    assert_eq!(message.lock_token.as_deref(), Some("lock-1"));
    assert_eq!(message.sequence_number, Some(7));
    assert_eq!(message.delivery_count, Some(1));
    assert_eq!(message.body_text(), "Hello @ then");
    Ok(())
}

#[tokio::test]
async fn test_receive_returns_none_on_no_content() -> Result<()> {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST)
            .path("/messages/subscriptions/messages-subscription/messages/head");
        then.status(204);
    });

    let subscription = bus(&server).subscription_client(
        "messages",
        "messages-subscription",
        Duration::from_secs(1),
    );
    assert!(subscription.receive().await?.is_none());
    Ok(())
}

#[tokio::test]
async fn test_complete_and_abandon_target_the_lock() -> Result<()> {
    let server = MockServer::start();
    let lock_path = "/messages/subscriptions/messages-subscription/messages/m-1/lock-1";
    let complete_mock = server.mock(|when, then| {
        when.method(DELETE).path(lock_path);
        then.status(200);
    });
    let abandon_mock = server.mock(|when, then| {
        when.method(PUT).path(lock_path);
        then.status(200);
    });

    let subscription = bus(&server).subscription_client(
        "messages",
        "messages-subscription",
        Duration::from_secs(1),
    );
    let message = BusMessage {
        message_id: "m-1".to_string(),
        body: b"hi".to_vec(),
        lock_token: Some("lock-1".to_string()),
        sequence_number: None,
        delivery_count: None,
    };

    subscription.complete(&message).await?;
    subscription.abandon(&message).await?;

    complete_mock.assert();
    abandon_mock.assert();
    Ok(())
}

#[tokio::test]
async fn test_complete_requires_lock_token() {
    let server = MockServer::start();
    let subscription = bus(&server).subscription_client(
        "messages",
        "messages-subscription",
        Duration::from_secs(1),
    );

    let result = subscription.complete(&BusMessage::text("unlocked")).await;
    assert!(matches!(result, Err(ShowcaseError::ProcessingError { .. })));
}

#[tokio::test]
async fn test_unauthorized_send_is_service_error() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path("/messages/messages");
        then.status(401).body("InvalidSignature");
    });

    let result = bus(&server)
        .topic_client("messages")
        .send(BusMessage::text("Hello"))
        .await;

    match result {
        Err(ShowcaseError::ServiceError {
            service,
            status: 401,
            message,
        }) => {
            assert_eq!(service, "Service Bus");
            assert_eq!(message, "InvalidSignature");
        }
        other => panic!("expected a 401 service error, got {:?}", other),
    }
}

#[derive(Default)]
struct CollectingHandler {
    bodies: Mutex<Vec<String>>,
}

#[async_trait]
impl MessageHandler for CollectingHandler {
    async fn on_message(&self, message: &BusMessage) -> azure_showcase::Result<()> {
        self.bodies.lock().unwrap().push(message.body_text());
        Ok(())
    }

    fn notify_exception(&self, _error: &ShowcaseError, _phase: ExceptionPhase) {}
}

/// Publishes through the mock and sees the handler complete what comes back.
#[tokio::test]
async fn test_demo_publishes_and_handles_messages() -> Result<()> {
    let server = MockServer::start();
    let send_mock = server.mock(|when, then| {
        when.method(POST)
            .path("/messages/messages")
            .body_contains("Hello @ ");
        then.status(201);
    });
    server.mock(|when, then| {
        when.method(POST)
            .path("/messages/subscriptions/messages-subscription/messages/head");
        then.status(201)
            .header("BrokerProperties", r#"{"MessageId":"m-9","LockToken":"lock-9"}"#)
            .body("Hello @ earlier");
    });
    let complete_mock = server.mock(|when, then| {
        when.method(DELETE)
            .path("/messages/subscriptions/messages-subscription/messages/m-9/lock-9");
        then.status(200);
    });

    let client = bus(&server);
    let handler = Arc::new(CollectingHandler::default());
    let demo = ServiceBusDemo::with_handler(
        Arc::new(client.topic_client("messages")),
        Arc::new(client.subscription_client(
            "messages",
            "messages-subscription",
            Duration::from_secs(1),
        )),
        handler.clone(),
        Duration::from_millis(10),
    );

    demo.run().await?;
    for _ in 0..400 {
        if !handler.bodies.lock().unwrap().is_empty() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    demo.shutdown().await;

    send_mock.assert();
    assert!(complete_mock.hits() >= 1);
    assert_eq!(handler.bodies.lock().unwrap()[0], "Hello @ earlier");
    Ok(())
}
