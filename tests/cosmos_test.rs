use anyhow::Result;
use azure_showcase::adapters::cosmos::CosmosCollectionClient;
use azure_showcase::core::demos::CosmosDbDemo;
use azure_showcase::domain::model::Reservation;
use azure_showcase::domain::ports::{Demo, ReservationRepository};
use azure_showcase::ShowcaseError;
use httpmock::prelude::*;
use serde_json::json;

const DOCS_PATH: &str = "/dbs/bootiful/colls/reservations/docs";

fn collection(server: &MockServer) -> CosmosCollectionClient {
    CosmosCollectionClient::new(&server.base_url(), "a2V5", "bootiful", "reservations")
}

#[tokio::test]
async fn test_ensure_collection_tolerates_existing_database() -> Result<()> {
    let server = MockServer::start();
    let db_mock = server.mock(|when, then| {
        when.method(POST)
            .path("/dbs")
            .header_exists("authorization")
            .header("x-ms-version", "2018-12-31")
            .json_body(json!({ "id": "bootiful" }));
        then.status(409).body("Resource with specified id already exists");
    });
    let coll_mock = server.mock(|when, then| {
        when.method(POST)
            .path("/dbs/bootiful/colls")
            .json_body_partial(r#"{ "id": "reservations", "partitionKey": { "paths": ["/id"] } }"#);
        then.status(201).json_body(json!({ "id": "reservations" }));
    });

    collection(&server).ensure_collection().await?;

    db_mock.assert();
    coll_mock.assert();
    Ok(())
}

#[tokio::test]
async fn test_delete_all_removes_every_listed_document() -> Result<()> {
    let server = MockServer::start();
    let list_mock = server.mock(|when, then| {
        when.method(GET).path(DOCS_PATH);
        then.status(200).json_body(json!({
            "_rid": "abc",
            "Documents": [
                { "id": "r-1", "reservationName": "A" },
                { "id": "r-2", "reservationName": "B" }
            ],
            "_count": 2
        }));
    });
    let delete_one = server.mock(|when, then| {
        when.method(DELETE)
            .path(format!("{}/r-1", DOCS_PATH))
            .header("x-ms-documentdb-partitionkey", r#"["r-1"]"#);
        then.status(204);
    });
    let delete_two = server.mock(|when, then| {
        when.method(DELETE)
            .path(format!("{}/r-2", DOCS_PATH))
            .header("x-ms-documentdb-partitionkey", r#"["r-2"]"#);
        then.status(204);
    });

    let deleted = collection(&server).delete_all().await?;

    assert_eq!(deleted, 2);
    list_mock.assert();
    delete_one.assert();
    delete_two.assert();
    Ok(())
}

#[tokio::test]
async fn test_delete_all_follows_continuation_pages() -> Result<()> {
    let server = MockServer::start();
    // Registered before the first-page mock so the continued request matches it.
    let second_page = server.mock(|when, then| {
        when.method(GET)
            .path(DOCS_PATH)
            .header("x-ms-continuation", "tok");
        then.status(200)
            .json_body(json!({ "Documents": [{ "id": "r-3", "reservationName": "C" }] }));
    });
    let first_page = server.mock(|when, then| {
        when.method(GET).path(DOCS_PATH);
        then.status(200)
            .header("x-ms-continuation", "tok")
            .json_body(json!({
                "Documents": [
                    { "id": "r-1", "reservationName": "A" },
                    { "id": "r-2", "reservationName": "B" }
                ]
            }));
    });
    let deletes: Vec<_> = ["r-1", "r-2", "r-3"]
        .iter()
        .map(|id| {
            server.mock(|when, then| {
                when.method(DELETE)
                    .path(format!("{}/{}", DOCS_PATH, id))
                    .header("x-ms-documentdb-partitionkey", format!(r#"["{}"]"#, id));
                then.status(204);
            })
        })
        .collect();

    let deleted = collection(&server).delete_all().await?;

    assert_eq!(deleted, 3);
    first_page.assert();
    second_page.assert();
    for delete in &deletes {
        delete.assert();
    }
    Ok(())
}

#[tokio::test]
async fn test_delete_all_on_empty_collection() -> Result<()> {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path(DOCS_PATH);
        then.status(200).json_body(json!({ "Documents": [], "_count": 0 }));
    });

    assert_eq!(collection(&server).delete_all().await?, 0);
    Ok(())
}

#[tokio::test]
async fn test_save_upserts_and_assigns_id() -> Result<()> {
    let server = MockServer::start();
    let save_mock = server.mock(|when, then| {
        when.method(POST)
            .path(DOCS_PATH)
            .header("x-ms-documentdb-is-upsert", "True")
            .header_exists("x-ms-documentdb-partitionkey")
            .body_contains(r#""reservationName":"A""#)
            .body_contains(r#""id":""#);
        then.status(201).json_body(json!({
            "id": "generated",
            "reservationName": "A",
            "_rid": "xyz",
            "_etag": "\"0000\""
        }));
    });

    let saved = collection(&server).save(Reservation::named("A")).await?;

    save_mock.assert();
    assert_eq!(saved.id.as_deref(), Some("generated"));
    assert_eq!(saved.reservation_name, "A");
    Ok(())
}

#[tokio::test]
async fn test_demo_replaces_reservations() -> Result<()> {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path(DOCS_PATH);
        then.status(200)
            .json_body(json!({ "Documents": [{ "id": "old", "reservationName": "Z" }] }));
    });
    let delete_mock = server.mock(|when, then| {
        when.method(DELETE).path(format!("{}/old", DOCS_PATH));
        then.status(204);
    });
    let save_mock = server.mock(|when, then| {
        when.method(POST).path(DOCS_PATH);
        then.status(201)
            .json_body(json!({ "id": "new", "reservationName": "A" }));
    });

    CosmosDbDemo::new(collection(&server), false).run().await?;

    delete_mock.assert();
    save_mock.assert_hits(3);
    Ok(())
}

#[tokio::test]
async fn test_demo_stops_when_listing_fails() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path(DOCS_PATH);
        then.status(401).body("The input authorization token can't serve the request");
    });
    let save_mock = server.mock(|when, then| {
        when.method(POST).path(DOCS_PATH);
        then.status(201);
    });

    let result = CosmosDbDemo::new(collection(&server), false).run().await;

    assert!(matches!(
        result,
        Err(ShowcaseError::ServiceError { status: 401, .. })
    ));
    assert_eq!(save_mock.hits(), 0);
}
