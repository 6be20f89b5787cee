//! Video consultation tokens, built directly with jsonwebtoken.
//!
//! LiveKit access tokens are HS256 JWTs whose `video` claim carries the
//! room grant; Jitsi (JaaS) tokens are RS256 JWTs with a `kid` header of
//! `appId/apiKey` and a feature/user context claim.

use jsonwebtoken::{Algorithm, EncodingKey, Header};
use pillsure_core::PillsureError;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::config::{JitsiSettings, LiveKitSettings};

const TOKEN_TTL_SECS: i64 = 60 * 60;

/// Participant identity attached to issued tokens.
pub struct Participant<'a> {
    pub user_id: &'a str,
    pub email: &'a str,
    pub first_name: &'a str,
    pub last_name: &'a str,
}

impl Participant<'_> {
    fn display_name(&self) -> String {
        let name = format!("{} {}", self.first_name, self.last_name);
        let name = name.trim();
        if name.is_empty() {
            self.email.to_string()
        } else {
            name.to_string()
        }
    }
}

/// Rooms are plain alphanumeric; anything else is stripped.
fn sanitize_room(room: &str) -> String {
    let clean: String = room.chars().filter(|c| c.is_ascii_alphanumeric()).collect();
    if clean.is_empty() {
        "PillsureRoom".to_string()
    } else {
        clean
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VideoGrant {
    room: String,
    room_join: bool,
    can_publish: bool,
    can_subscribe: bool,
    can_publish_data: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    can_update_own_metadata: Option<bool>,
}

#[derive(Debug, Serialize, Deserialize)]
struct LiveKitClaims {
    iss: String,
    sub: String,
    name: String,
    nbf: i64,
    exp: i64,
    video: VideoGrant,
}

/// Issue a LiveKit access token for the given room.
pub fn livekit_token(
    settings: &LiveKitSettings,
    participant: &Participant<'_>,
    room: &str,
    is_moderator: bool,
) -> Result<String, PillsureError> {
    let (Some(api_key), Some(api_secret)) = (&settings.api_key, &settings.api_secret) else {
        return Err(PillsureError::Storage(
            "LiveKit configuration missing: api_key and api_secret must be set".to_string(),
        ));
    };

    let now = chrono::Utc::now().timestamp();
    let claims = LiveKitClaims {
        iss: api_key.clone(),
        sub: participant.user_id.to_string(),
        name: participant.display_name(),
        nbf: now - 5,
        exp: now + TOKEN_TTL_SECS,
        video: VideoGrant {
            room: sanitize_room(room),
            room_join: true,
            can_publish: true,
            can_subscribe: true,
            can_publish_data: true,
            can_update_own_metadata: is_moderator.then_some(true),
        },
    };

    jsonwebtoken::encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(api_secret.as_bytes()),
    )
    .map_err(|e| PillsureError::Storage(format!("Failed to sign LiveKit token: {}", e)))
}

/// Issue a Jitsi (JaaS) meeting token for the given room.
pub fn jitsi_token(
    settings: &JitsiSettings,
    participant: &Participant<'_>,
    room: &str,
    is_moderator: bool,
) -> Result<String, PillsureError> {
    let (Some(app_id), Some(api_key)) = (&settings.app_id, &settings.api_key) else {
        return Err(PillsureError::Storage(
            "Jitsi configuration missing: app_id and api_key must be set".to_string(),
        ));
    };
    let Some(key_file) = &settings.private_key_file else {
        return Err(PillsureError::Storage(
            "Jitsi configuration missing: private_key_file must be set".to_string(),
        ));
    };

    let pem = std::fs::read(key_file).map_err(|e| {
        PillsureError::Storage(format!("Failed to read Jitsi private key: {}", e))
    })?;
    let encoding_key = EncodingKey::from_rsa_pem(&pem)
        .map_err(|e| PillsureError::Storage(format!("Invalid Jitsi private key: {}", e)))?;

    let room = if room == "*" { "*".to_string() } else { sanitize_room(room) };
    let now = chrono::Utc::now().timestamp();
    let claims = json!({
        "aud": "jitsi",
        "iss": "chat",
        "iat": now,
        "exp": now + TOKEN_TTL_SECS,
        "nbf": now - 5,
        "sub": app_id,
        "room": room,
        "context": {
            "features": {
                "livestreaming": false,
                "file-upload": false,
                "outbound-call": false,
                "transcription": false,
                "recording": false,
            },
            "user": {
                "moderator": is_moderator,
                "name": participant.display_name(),
                "id": participant.user_id,
                "email": participant.email,
                "avatar": "",
            },
        },
    });

    let mut header = Header::new(Algorithm::RS256);
    header.kid = Some(format!("{}/{}", app_id, api_key));

    jsonwebtoken::encode(&header, &claims, &encoding_key)
        .map_err(|e| PillsureError::Storage(format!("Failed to sign Jitsi token: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{DecodingKey, Validation};

    fn participant() -> Participant<'static> {
        Participant {
            user_id: "u1",
            email: "pat@example.com",
            first_name: "Pat",
            last_name: "Malik",
        }
    }

    #[test]
    fn test_sanitize_room() {
        assert_eq!(sanitize_room("Consult Room #4!"), "ConsultRoom4");
        assert_eq!(sanitize_room("---"), "PillsureRoom");
        assert_eq!(sanitize_room(""), "PillsureRoom");
    }

    #[test]
    fn test_display_name_falls_back_to_email() {
        let p = Participant {
            user_id: "u1",
            email: "pat@example.com",
            first_name: "",
            last_name: "",
        };
        assert_eq!(p.display_name(), "pat@example.com");
        assert_eq!(participant().display_name(), "Pat Malik");
    }

    #[test]
    fn test_livekit_token_carries_grant() {
        let settings = LiveKitSettings {
            api_key: Some("lk-key".to_string()),
            api_secret: Some("lk-secret-0123456789".to_string()),
        };
        let token = livekit_token(&settings, &participant(), "room 1", true).unwrap();

        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_aud = false;
        let decoded = jsonwebtoken::decode::<LiveKitClaims>(
            &token,
            &DecodingKey::from_secret("lk-secret-0123456789".as_bytes()),
            &validation,
        )
        .unwrap();
        assert_eq!(decoded.claims.iss, "lk-key");
        assert_eq!(decoded.claims.sub, "u1");
        assert_eq!(decoded.claims.video.room, "room1");
        assert!(decoded.claims.video.room_join);
        assert_eq!(decoded.claims.video.can_update_own_metadata, Some(true));
    }

    #[test]
    fn test_livekit_token_requires_configuration() {
        let err = livekit_token(&LiveKitSettings::default(), &participant(), "r", false)
            .unwrap_err();
        assert!(err.to_string().contains("configuration missing"));
    }

    #[test]
    fn test_jitsi_token_requires_configuration() {
        let err = jitsi_token(&JitsiSettings::default(), &participant(), "r", false).unwrap_err();
        assert!(err.to_string().contains("configuration missing"));
    }
}
