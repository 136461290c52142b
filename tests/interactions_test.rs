use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use ed25519_dalek::{Signer, SigningKey};
use serde_json::{json, Value as JsonValue};
use tower::ServiceExt;

use recruitment_bot::{
    app,
    config::Config,
    dto::discord_dto::{CreateChannel, GuildChannel, GuildRole, OutgoingMessage},
    error::{Error, Result},
    services::{
        application_store::InMemoryApplicationStore,
        discord_service::ChatPlatform,
        message_service::{MSG_HANDLE_INVALID, MSG_TICKET_GUILD_ONLY},
        profile_service::{parse_profile, ProfileFetcher, ProfilePage},
    },
    AppState,
};

const GUILD: &str = "guild-1";
const ORIGIN: &str = "https://robertsspaceindustries.com";

/// Guild without channels or roles; remembers deferred-response edits.
#[derive(Default)]
struct RecordingPlatform {
    edits: Mutex<Vec<(String, OutgoingMessage)>>,
    channels: Mutex<Vec<GuildChannel>>,
}

#[async_trait]
impl ChatPlatform for RecordingPlatform {
    async fn list_channels(&self) -> Result<Vec<GuildChannel>> {
        Ok(self.channels.lock().unwrap().clone())
    }

    async fn list_roles(&self) -> Result<Vec<GuildRole>> {
        Ok(Vec::new())
    }

    async fn create_channel(&self, request: CreateChannel) -> Result<GuildChannel> {
        let mut channels = self.channels.lock().unwrap();
        let channel = GuildChannel {
            id: format!("{}", 100 + channels.len()),
            kind: request.kind,
            name: request.name,
            parent_id: request.parent_id,
        };
        channels.push(channel.clone());
        Ok(channel)
    }

    async fn send_message(&self, _channel_id: &str, _message: &OutgoingMessage) -> Result<()> {
        Ok(())
    }

    async fn recent_message_ids(&self, _channel_id: &str, _limit: u8) -> Result<Vec<String>> {
        Ok(Vec::new())
    }

    async fn delete_messages(&self, _channel_id: &str, _message_ids: &[String]) -> Result<()> {
        Ok(())
    }

    async fn create_role(&self, name: &str) -> Result<GuildRole> {
        Ok(GuildRole {
            id: "role-1".to_string(),
            name: name.to_string(),
        })
    }

    async fn add_member_role(&self, _user_id: &str, _role_id: &str) -> Result<()> {
        Ok(())
    }

    async fn edit_original_response(
        &self,
        interaction_token: &str,
        message: &OutgoingMessage,
    ) -> Result<()> {
        self.edits
            .lock()
            .unwrap()
            .push((interaction_token.to_string(), message.clone()));
        Ok(())
    }
}

/// Serves whatever bio the test last set.
#[derive(Default)]
struct StubProfiles {
    bio: Mutex<Option<String>>,
}

#[async_trait]
impl ProfileFetcher for StubProfiles {
    async fn fetch_profile(&self, _handle: &str) -> Result<ProfilePage> {
        let bio = self.bio.lock().unwrap().clone();
        match bio {
            Some(bio) => Ok(parse_profile(
                &format!(r#"<div class="bio"><div class="value">{}</div></div>"#, bio),
                ORIGIN,
            )),
            None => Err(Error::Fetch("profile unavailable".to_string())),
        }
    }
}

struct TestApp {
    router: Router,
    key: SigningKey,
    platform: Arc<RecordingPlatform>,
    profiles: Arc<StubProfiles>,
}

fn setup_app() -> TestApp {
    let key = SigningKey::from_bytes(&[42u8; 32]);
    let public_key = hex::encode(key.verifying_key().to_bytes());
    let platform = Arc::new(RecordingPlatform::default());
    let profiles = Arc::new(StubProfiles::default());

    let state = AppState::from_parts(
        Config::for_guild(GUILD, &public_key),
        Arc::new(InMemoryApplicationStore::new()),
        profiles.clone(),
        platform.clone(),
    );

    TestApp {
        router: app(state),
        key,
        platform,
        profiles,
    }
}

impl TestApp {
    async fn send(&self, payload: &JsonValue) -> (StatusCode, JsonValue) {
        let body = payload.to_string();
        let timestamp = "1700000000";
        let signature = self.key.sign(format!("{}{}", timestamp, body).as_bytes());
        let request = Request::builder()
            .method("POST")
            .uri("/api/interactions")
            .header("content-type", "application/json")
            .header("x-signature-ed25519", hex::encode(signature.to_bytes()))
            .header("x-signature-timestamp", timestamp)
            .body(Body::from(body))
            .unwrap();
        self.call(request).await
    }

    async fn call(&self, request: Request<Body>) -> (StatusCode, JsonValue) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(JsonValue::Null);
        (status, body)
    }

    async fn wait_for_edit(&self, token: &str) -> OutgoingMessage {
        for _ in 0..100 {
            let found = self
                .platform
                .edits
                .lock()
                .unwrap()
                .iter()
                .find(|(t, _)| t == token)
                .map(|(_, msg)| msg.clone());
            if let Some(message) = found {
                return message;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("no follow-up edit for interaction {}", token);
    }
}

fn guild_interaction(kind: u8, token: &str, data: JsonValue) -> JsonValue {
    json!({
        "id": "9001",
        "application_id": "0",
        "type": kind,
        "token": token,
        "guild_id": GUILD,
        "member": { "user": { "id": "u1", "username": "alice", "global_name": null } },
        "data": data,
    })
}

fn button(token: &str, custom_id: &str) -> JsonValue {
    guild_interaction(3, token, json!({ "custom_id": custom_id, "component_type": 2 }))
}

fn handle_modal(handle: &str) -> JsonValue {
    guild_interaction(
        5,
        "modal-token",
        json!({
            "custom_id": "handle_input_modal",
            "components": [{
                "type": 1,
                "components": [{ "type": 4, "custom_id": "handle_input", "value": handle }]
            }]
        }),
    )
}

#[tokio::test]
async fn signed_ping_is_answered_with_pong() {
    let app = setup_app();
    let (status, body) = app
        .send(&json!({ "id": "1", "application_id": "0", "type": 1 }))
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "type": 1 }));
}

#[tokio::test]
async fn bad_or_missing_signature_is_rejected() {
    let app = setup_app();
    let body = json!({ "id": "1", "application_id": "0", "type": 1 }).to_string();

    let forged = Request::builder()
        .method("POST")
        .uri("/api/interactions")
        .header("x-signature-ed25519", hex::encode([0u8; 64]))
        .header("x-signature-timestamp", "1700000000")
        .body(Body::from(body.clone()))
        .unwrap();
    let (status, _) = app.call(forged).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let unsigned = Request::builder()
        .method("POST")
        .uri("/api/interactions")
        .body(Body::from(body))
        .unwrap();
    let (status, _) = app.call(unsigned).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn handle_button_opens_modal() {
    let app = setup_app();
    let (status, body) = app.send(&button("t1", "open_handle_modal")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["type"], 9);
    assert_eq!(body["data"]["custom_id"], "handle_input_modal");
    assert_eq!(
        body["data"]["components"][0]["components"][0]["custom_id"],
        "handle_input"
    );
}

#[tokio::test]
async fn handle_submission_then_validation() {
    let app = setup_app();

    let (status, body) = app.send(&handle_modal("Foo_Bar")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["type"], 4);
    assert_eq!(body["data"]["flags"], 64);

    let content = body["data"]["content"].as_str().unwrap();
    let code = content
        .split('`')
        .nth(1)
        .expect("code is wrapped in backticks")
        .to_string();
    assert!(code.starts_with("HMB-"));
    assert_eq!(code.len(), 12);

    let validate_id = body["data"]["components"][0]["components"][0]["custom_id"]
        .as_str()
        .unwrap()
        .to_string();
    assert!(validate_id.starts_with("validate_recruit_"));

    *app.profiles.bio.lock().unwrap() = Some(format!("Hi recruiters ... {} ... o7", code));
    let (status, body) = app.send(&button("validate-token", &validate_id)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "type": 5, "data": { "flags": 64 } }));

    let reply = app.wait_for_edit("validate-token").await;
    assert!(reply
        .content
        .as_deref()
        .unwrap()
        .starts_with("Validation successful!"));
    let start = serde_json::to_value(&reply).unwrap();
    let start_id = start["components"][0]["components"][0]["custom_id"]
        .as_str()
        .unwrap()
        .to_string();
    assert!(start_id.starts_with("start_recruitment_"));

    app.send(&button("start-token", &start_id)).await;
    let reply = app.wait_for_edit("start-token").await;
    assert!(reply
        .content
        .as_deref()
        .unwrap()
        .starts_with("Your recruitment channel has been created!"));
    assert_eq!(app.platform.channels.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn short_handle_gets_an_ephemeral_error() {
    let app = setup_app();
    let (status, body) = app.send(&handle_modal("ab")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["type"], 4);
    assert_eq!(body["data"]["content"], MSG_HANDLE_INVALID);
}

#[tokio::test]
async fn validating_unknown_application_reports_not_found() {
    let app = setup_app();
    let (status, _) = app
        .send(&button("t2", &format!("validate_recruit_{}", uuid::Uuid::new_v4())))
        .await;
    assert_eq!(status, StatusCode::OK);

    let reply = app.wait_for_edit("t2").await;
    assert!(reply
        .content
        .as_deref()
        .unwrap()
        .starts_with("Could not find a pending validation"));
}

#[tokio::test]
async fn recruit_command_outside_guild_is_refused() {
    let app = setup_app();
    let payload = json!({
        "id": "1",
        "application_id": "0",
        "type": 2,
        "token": "dm-token",
        "user": { "id": "boss", "username": "boss", "global_name": null },
        "data": { "name": "recruit", "options": [] },
    });
    let (status, body) = app.send(&payload).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["content"], MSG_TICKET_GUILD_ONLY);
}

#[tokio::test]
async fn health_reports_ok() {
    let app = setup_app();
    let request = Request::builder().uri("/health").body(Body::empty()).unwrap();
    let (status, body) = app.call(request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}
