//! Conversation service round-trips against a mock HTTP endpoint.

use std::sync::Arc;

use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use confab_conversation::{ConversationQueryOptions, ConversationService, Object};
use confab_core::{ApiClient, Error, MockCryptoService};

const KEY: &str = "kms://keys/1";

fn service(server: &MockServer) -> ConversationService {
    ConversationService::new(
        ApiClient::new(server.uri()),
        Arc::new(MockCryptoService::new()),
    )
}

fn conversation_body(id: &str) -> serde_json::Value {
    json!({
        "id": id,
        "encryptionKeyUrl": KEY,
        "displayName": MockCryptoService::seal("release planning"),
        "activities": {
            "items": [{
                "objectType": "activity",
                "encryptionKeyUrl": KEY,
                "object": {
                    "objectType": "comment",
                    "content": MockCryptoService::seal("ship it"),
                },
            }],
        },
    })
}

#[tokio::test]
async fn get_fetches_and_decrypts_a_conversation() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/conversations/c1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(conversation_body("c1")))
        .mount(&server)
        .await;

    let conversation = service(&server)
        .get("c1", &ConversationQueryOptions::default())
        .await
        .unwrap();

    assert_eq!(conversation.display_name.as_deref(), Some("release planning"));
    let Object::Activity(activity) = &conversation.activities.as_ref().unwrap().items[0] else {
        panic!("expected activity");
    };
    let Object::Comment(comment) = activity.object.as_deref().unwrap() else {
        panic!("expected comment");
    };
    assert_eq!(comment.content.as_deref(), Some("ship it"));
}

#[tokio::test]
async fn list_passes_query_options_and_decrypts_every_conversation() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/conversations"))
        .and(query_param("conversationsLimit", "30"))
        .and(query_param("activitiesLimit", "0"))
        .and(query_param("isActive", "true"))
        .and(query_param("computeTitleIfEmpty", "true"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": [conversation_body("c1"), conversation_body("c2")],
        })))
        .mount(&server)
        .await;

    let options = ConversationQueryOptions {
        conversations_limit: Some(30),
        activities_limit: Some(0),
        is_active: Some(true),
        compute_title_if_empty: true,
        ..ConversationQueryOptions::default()
    };
    let conversations = service(&server).list(&options).await.unwrap();

    assert_eq!(conversations.len(), 2);
    for conversation in conversations {
        assert_eq!(conversation.display_name.as_deref(), Some("release planning"));
    }
}

#[tokio::test]
async fn get_surfaces_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/conversations/missing"))
        .respond_with(ResponseTemplate::new(404).set_body_string("no such conversation"))
        .mount(&server)
        .await;

    let err = service(&server)
        .get("missing", &ConversationQueryOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));
}

#[tokio::test]
async fn push_activities_decrypt_out_of_band() {
    let server = MockServer::start().await;
    let service = service(&server);

    let mut object: Object = serde_json::from_value(json!({
        "objectType": "activity",
        "encryptionKeyUrl": KEY,
        "object": {
            "objectType": "comment",
            "content": MockCryptoService::seal("delivered over the socket"),
        },
    }))
    .unwrap();

    let stats = service.decrypt_activity_event(&mut object).await;
    assert_eq!(stats.decrypted, 1);
}
