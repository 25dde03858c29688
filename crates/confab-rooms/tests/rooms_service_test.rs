//! Room service round-trips against a mock HTTP endpoint.

use std::sync::Arc;

use serde_json::json;
use wiremock::matchers::{body_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use confab_core::{ApiClient, Error, MockCryptoService};
use confab_rooms::{NewRoom, Room, RoomType, RoomsService};

fn service(server: &MockServer) -> RoomsService {
    RoomsService::new(
        ApiClient::new(server.uri()),
        Arc::new(MockCryptoService::new()),
    )
}

#[tokio::test]
async fn create_posts_the_room_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/rooms"))
        .and(body_json(json!({"title": "Launch planning"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "r1",
            "title": "Launch planning",
            "type": "group",
            "created": "2026-08-01T12:00:00Z",
        })))
        .mount(&server)
        .await;

    let room = service(&server)
        .create(&NewRoom {
            title: "Launch planning".to_string(),
            team_id: None,
        })
        .await
        .unwrap();

    assert_eq!(room.id.as_deref(), Some("r1"));
    assert_eq!(room.room_type, Some(RoomType::Group));
}

#[tokio::test]
async fn list_passes_the_max_parameter() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rooms"))
        .and(query_param("max", "3"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": [
                {"id": "r1", "title": "one"},
                {"id": "r2", "title": "two"},
                {"id": "r3", "title": "three"},
            ],
        })))
        .mount(&server)
        .await;

    let rooms = service(&server).list(Some(3)).await.unwrap();
    assert_eq!(rooms.len(), 3);
}

#[tokio::test]
async fn update_requires_an_id() {
    let server = MockServer::start().await;
    let err = service(&server)
        .update(&Room {
            title: Some("no id".to_string()),
            ..Room::default()
        })
        .await
        .unwrap_err();
    assert!(matches!(err, Error::InvalidInput(_)));
}

#[tokio::test]
async fn remove_accepts_no_content() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/rooms/r1"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;

    service(&server).remove("r1").await.unwrap();
}

#[tokio::test]
async fn read_status_listing_sorts_most_recent_first() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/conversations"))
        .and(query_param("activitiesLimit", "0"))
        .and(query_param("isActive", "true"))
        .and(query_param("computeTitleIfEmpty", "true"))
        .and(query_param("conversationsLimit", "1000"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": [
                {
                    "id": "older",
                    "encryptionKeyUrl": "kms://keys/1",
                    "displayName": MockCryptoService::seal("older room"),
                    "lastReadableActivityDate": "2026-07-01T08:00:00Z",
                    "lastSeenActivityDate": "2026-07-02T08:00:00Z",
                },
                {
                    "id": "newer",
                    "encryptionKeyUrl": "kms://keys/1",
                    "displayName": MockCryptoService::seal("newer room"),
                    "lastReadableActivityDate": "2026-08-01T08:00:00Z",
                },
                {
                    "id": "direct",
                    "tags": ["ONE_ON_ONE"],
                    "computedTitle": "Alice",
                },
            ],
        })))
        .mount(&server)
        .await;

    let rooms = service(&server).list_with_read_status(0).await.unwrap();

    assert_eq!(rooms.len(), 3);
    assert_eq!(rooms[0].id, "newer");
    assert_eq!(rooms[0].title.as_deref(), Some("newer room"));
    assert!(rooms[0].is_unread(), "never-seen room with activity is unread");
    assert_eq!(rooms[1].id, "older");
    assert!(!rooms[1].is_unread(), "seen after last activity");
    // No activity date sorts last.
    assert_eq!(rooms[2].id, "direct");
    assert_eq!(rooms[2].room_type, RoomType::Direct);
    assert_eq!(rooms[2].title.as_deref(), Some("Alice"));
}

#[tokio::test]
async fn bounded_read_status_listing_sends_a_since_date() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/conversations"))
        .and(query_param("conversationsLimit", "30"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "items": [] })))
        .expect(1)
        .mount(&server)
        .await;

    let rooms = service(&server).list_with_read_status(30).await.unwrap();
    assert!(rooms.is_empty());

    let request = &server.received_requests().await.unwrap()[0];
    let query = request.url.query().unwrap_or_default();
    assert!(query.contains("sinceDate="), "recent window must be bounded");
}

#[tokio::test]
async fn read_status_rejects_out_of_range_max_recent() {
    let server = MockServer::start().await;
    let err = service(&server)
        .list_with_read_status(101)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::InvalidInput(_)));
}

#[tokio::test]
async fn single_room_read_status_is_fetched_just_in_time() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/conversations/c9"))
        .and(query_param("activitiesLimit", "0"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "c9",
            "encryptionKeyUrl": "kms://keys/1",
            "displayName": MockCryptoService::seal("ops"),
            "lastReadableActivityDate": "2026-08-05T08:00:00Z",
        })))
        .mount(&server)
        .await;

    let info = service(&server).get_with_read_status("c9").await.unwrap();
    assert_eq!(info.id, "c9");
    assert_eq!(info.title.as_deref(), Some("ops"));
    assert!(info.is_unread());
}
