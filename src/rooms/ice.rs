//! ICE server list handed to clients on create and join.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use chrono::Utc;
use hmac::{Hmac, Mac};
use sha1::Sha1;

use crate::config::Config;
use crate::models::IceServer;

type HmacSha1 = Hmac<Sha1>;

#[derive(Debug, Clone)]
pub struct IceServerProvider {
    stun_server: String,
    turn_server: Option<String>,
    turn_username: Option<String>,
    turn_credential: Option<String>,
    turn_shared_secret: Option<String>,
    turn_credential_ttl_seconds: u64,
}

impl IceServerProvider {
    pub fn new(config: &Config) -> Self {
        Self {
            stun_server: config.stun_server.clone(),
            turn_server: config.turn_server.clone(),
            turn_username: config.turn_username.clone(),
            turn_credential: config.turn_credential.clone(),
            turn_shared_secret: config.turn_shared_secret.clone(),
            turn_credential_ttl_seconds: config.turn_credential_ttl_seconds,
        }
    }

    pub fn for_room(&self, room_id: &str) -> Vec<IceServer> {
        let mut ice_servers = vec![IceServer {
            urls: vec![self.stun_server.clone()],
            username: None,
            credential: None,
        }];

        let Some(turn_server) = &self.turn_server else {
            return ice_servers;
        };

        match &self.turn_shared_secret {
            Some(secret) => {
                let expiry = Utc::now().timestamp() + self.turn_credential_ttl_seconds as i64;
                let username = format!("{}:{}", expiry, room_id);
                match turn_rest_credential(secret, &username) {
                    Some(credential) => ice_servers.push(IceServer {
                        urls: vec![turn_server.clone()],
                        username: Some(username),
                        credential: Some(credential),
                    }),
                    None => tracing::warn!("Could not derive TURN credential, omitting TURN"),
                }
            }
            None => ice_servers.push(IceServer {
                urls: vec![turn_server.clone()],
                username: self.turn_username.clone(),
                credential: self.turn_credential.clone(),
            }),
        }

        ice_servers
    }
}

/// base64(HMAC-SHA1(secret, username)), the TURN REST API credential.
fn turn_rest_credential(secret: &str, username: &str) -> Option<String> {
    let mut mac = <HmacSha1 as Mac>::new_from_slice(secret.as_bytes()).ok()?;
    mac.update(username.as_bytes());
    Some(BASE64.encode(mac.finalize().into_bytes()))
}
