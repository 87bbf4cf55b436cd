//! Wire protocol spoken between game clients and the dedicated server.
//!
//! The game channel is TCP carrying one JSON object per line, tagged by a
//! `type` field. LAN discovery is a single-line UDP request/response.

use crate::vector::Vec3;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

/// Opaque identifier for sessions and projectiles.
///
/// Generated server-side as 32 lowercase hex characters.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(String);

impl EntityId {
    /// Draws a fresh random 128-bit identifier.
    pub fn generate() -> Self {
        Self(format!("{:032x}", rand::random::<u128>()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for EntityId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for EntityId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Messages sent by a client over its game connection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    Join {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        name: Option<String>,
    },
    /// Latest locally simulated state; absent fields are left untouched.
    State {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        position: Option<Vec3>,
        #[serde(
            default,
            deserialize_with = "finite_angle",
            skip_serializing_if = "Option::is_none"
        )]
        rotation_y: Option<f32>,
        #[serde(
            default,
            deserialize_with = "whole_number",
            skip_serializing_if = "Option::is_none"
        )]
        health: Option<i32>,
    },
    Shoot {
        #[serde(default)]
        origin: Option<Vec3>,
        #[serde(default)]
        direction: Option<Vec3>,
    },
}

/// Rejects angles that are infinite, NaN, or too large for `f32`.
fn finite_angle<'de, D>(deserializer: D) -> Result<Option<f32>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<f32>::deserialize(deserializer)? {
        Some(angle) if !angle.is_finite() => Err(D::Error::custom("non-finite rotation_y")),
        angle => Ok(angle),
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Number {
    Integer(i64),
    Float(f64),
}

/// Accepts `80` and `80.0` alike; fractional or out-of-range values are rejected.
fn whole_number<'de, D>(deserializer: D) -> Result<Option<i32>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = match Option::<Number>::deserialize(deserializer)? {
        None => return Ok(None),
        Some(Number::Integer(value)) => value,
        // Saturates; anything beyond i32 is rejected below.
        Some(Number::Float(value)) if value.is_finite() && value.fract() == 0.0 => value as i64,
        Some(Number::Float(value)) => {
            return Err(D::Error::custom(format!("health must be whole, got {}", value)))
        }
    };
    i32::try_from(value)
        .map(Some)
        .map_err(|_| D::Error::custom("health out of range"))
}

impl ClientMessage {
    /// Decodes one line. Trailing whitespace (including the newline) is accepted.
    pub fn decode(line: &[u8]) -> serde_json::Result<Self> {
        serde_json::from_slice(line)
    }

    pub fn encode(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

/// Messages sent by the server to a client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    Welcome {
        player_id: EntityId,
    },
    Error {
        message: String,
    },
    Damage {
        amount: i32,
    },
    WorldState {
        players: Vec<PlayerView>,
        projectiles: Vec<ProjectileView>,
    },
}

impl ServerMessage {
    pub fn decode(line: &[u8]) -> serde_json::Result<Self> {
        serde_json::from_slice(line)
    }

    /// Encodes without the trailing newline; the transport adds the line break.
    pub fn encode(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

/// One player as seen in a world snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerView {
    pub id: EntityId,
    pub name: String,
    pub position: Vec3,
    pub rotation_y: f32,
    pub health: i32,
}

/// One in-flight projectile as seen in a world snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectileView {
    pub id: EntityId,
    pub position: Vec3,
}

/// Literal request line a client broadcasts to find servers.
pub const DISCOVERY_PROBE: &str = "DISCOVER";

const DISCOVERY_REPLY_TAG: &str = "SERVER";

/// Returns true when a datagram is exactly the discovery probe,
/// ignoring surrounding whitespace.
pub fn is_discovery_probe(datagram: &[u8]) -> bool {
    std::str::from_utf8(datagram)
        .map(|text| text.trim() == DISCOVERY_PROBE)
        .unwrap_or(false)
}

/// Server advertisement sent in answer to a discovery probe.
///
/// Rendered as `SERVER <name> <port> <player_count> <max_players>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveryReply {
    pub name: String,
    pub port: u16,
    pub players: usize,
    pub max_players: usize,
}

impl DiscoveryReply {
    /// Builds a reply, replacing whitespace in the name so the line keeps exactly five fields.
    pub fn new(name: &str, port: u16, players: usize, max_players: usize) -> Self {
        let name: String = name
            .trim()
            .chars()
            .map(|c| if c.is_whitespace() { '_' } else { c })
            .collect();
        Self {
            name,
            port,
            players,
            max_players,
        }
    }
}

impl fmt::Display for DiscoveryReply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} {} {}",
            DISCOVERY_REPLY_TAG, self.name, self.port, self.players, self.max_players
        )
    }
}

/// Error returned when a discovery reply line is malformed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseReplyError(String);

impl fmt::Display for ParseReplyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "malformed discovery reply: {}", self.0)
    }
}

impl std::error::Error for ParseReplyError {}

impl FromStr for DiscoveryReply {
    type Err = ParseReplyError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = line.split_whitespace().collect();
        let [tag, name, port, players, max_players] = parts.as_slice() else {
            return Err(ParseReplyError(line.trim().to_string()));
        };
        if *tag != DISCOVERY_REPLY_TAG {
            return Err(ParseReplyError(line.trim().to_string()));
        }
        let number_err = |_| ParseReplyError(line.trim().to_string());
        Ok(DiscoveryReply {
            name: name.to_string(),
            port: port.parse().map_err(number_err)?,
            players: players.parse().map_err(number_err)?,
            max_players: max_players.parse().map_err(number_err)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_defaults_name() {
        let msg = ClientMessage::decode(br#"{"type":"join"}"#).unwrap();
        assert_eq!(msg, ClientMessage::Join { name: None });

        let msg = ClientMessage::decode(b"{\"type\":\"join\",\"name\":\"Ann\"}\n").unwrap();
        assert_eq!(
            msg,
            ClientMessage::Join {
                name: Some("Ann".to_string())
            }
        );
    }

    #[test]
    fn test_state_partial_fields() {
        let msg = ClientMessage::decode(br#"{"type":"state","rotation_y":1.5}"#).unwrap();
        assert_eq!(
            msg,
            ClientMessage::State {
                position: None,
                rotation_y: Some(1.5),
                health: None,
            }
        );

        let msg =
            ClientMessage::decode(br#"{"type":"state","position":[1,2,3],"health":40}"#).unwrap();
        match msg {
            ClientMessage::State {
                position, health, ..
            } => {
                assert_eq!(position, Some(Vec3::new(1.0, 2.0, 3.0)));
                assert_eq!(health, Some(40));
            }
            _ => panic!("Wrong message type"),
        }
    }

    #[test]
    fn test_state_rejects_non_finite_numbers() {
        assert!(
            ClientMessage::decode(br#"{"type":"state","position":[1e39,0,0]}"#).is_err()
        );
        assert!(ClientMessage::decode(br#"{"type":"state","rotation_y":-1e39}"#).is_err());
        assert!(ClientMessage::decode(
            br#"{"type":"shoot","origin":[0,0,0],"direction":[1e39,0,0]}"#
        )
        .is_err());
    }

    #[test]
    fn test_state_health_accepts_whole_floats() {
        let msg = ClientMessage::decode(br#"{"type":"state","health":80.0}"#).unwrap();
        assert_eq!(
            msg,
            ClientMessage::State {
                position: None,
                rotation_y: None,
                health: Some(80),
            }
        );

        assert!(ClientMessage::decode(br#"{"type":"state","health":80.5}"#).is_err());
        assert!(ClientMessage::decode(br#"{"type":"state","health":1e12}"#).is_err());
        assert!(ClientMessage::decode(br#"{"type":"state","health":"80"}"#).is_err());
    }

    #[test]
    fn test_shoot_missing_fields_still_decodes() {
        let msg = ClientMessage::decode(br#"{"type":"shoot","origin":[0,1,0]}"#).unwrap();
        assert_eq!(
            msg,
            ClientMessage::Shoot {
                origin: Some(Vec3::new(0.0, 1.0, 0.0)),
                direction: None,
            }
        );
    }

    #[test]
    fn test_rejects_malformed_lines() {
        assert!(ClientMessage::decode(b"").is_err());
        assert!(ClientMessage::decode(b"not json").is_err());
        assert!(ClientMessage::decode(br#"{"type":"dance"}"#).is_err());
        assert!(ClientMessage::decode(br#"{"name":"no type"}"#).is_err());
        assert!(ClientMessage::decode(&[0xff, 0xfe, b'\n']).is_err());
    }

    #[test]
    fn test_server_message_wire_shape() {
        let welcome = ServerMessage::Welcome {
            player_id: EntityId::from("abc"),
        };
        assert_eq!(
            welcome.encode().unwrap(),
            r#"{"type":"welcome","player_id":"abc"}"#
        );

        let damage = ServerMessage::Damage { amount: 25 };
        assert_eq!(damage.encode().unwrap(), r#"{"type":"damage","amount":25}"#);

        let state = ServerMessage::WorldState {
            players: vec![PlayerView {
                id: EntityId::from("p1"),
                name: "Player".to_string(),
                position: Vec3::new(0.0, 3.0, 0.0),
                rotation_y: 0.0,
                health: 100,
            }],
            projectiles: vec![ProjectileView {
                id: EntityId::from("b1"),
                position: Vec3::new(1.0, 0.0, 0.0),
            }],
        };
        let value: serde_json::Value = serde_json::from_str(&state.encode().unwrap()).unwrap();
        assert_eq!(value["type"], "world_state");
        assert_eq!(value["players"][0]["id"], "p1");
        assert_eq!(value["players"][0]["position"][1], 3.0);
        assert_eq!(value["players"][0]["health"], 100);
        assert_eq!(value["projectiles"][0]["id"], "b1");
    }

    #[test]
    fn test_generated_ids_are_hex_and_distinct() {
        let a = EntityId::generate();
        let b = EntityId::generate();
        assert_eq!(a.as_str().len(), 32);
        assert!(a.as_str().chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(a, b);
    }

    #[test]
    fn test_discovery_probe_matching() {
        assert!(is_discovery_probe(b"DISCOVER"));
        assert!(is_discovery_probe(b"DISCOVER\n"));
        assert!(is_discovery_probe(b"  DISCOVER\r\n"));
        assert!(!is_discovery_probe(b"DISCOVERY"));
        assert!(!is_discovery_probe(b"discover"));
        assert!(!is_discovery_probe(b""));
        assert!(!is_discovery_probe(&[0xff, 0x00]));
    }

    #[test]
    fn test_discovery_reply_format_and_parse() {
        let reply = DiscoveryReply::new("Friday Night", 50000, 3, 8);
        let line = reply.to_string();
        assert_eq!(line, "SERVER Friday_Night 50000 3 8");

        let parsed: DiscoveryReply = line.parse().unwrap();
        assert_eq!(parsed, reply);
    }

    #[test]
    fn test_discovery_reply_rejects_garbage() {
        assert!("SERVER a b c".parse::<DiscoveryReply>().is_err());
        assert!("HELLO name 1 2 3".parse::<DiscoveryReply>().is_err());
        assert!("SERVER name port 2 3".parse::<DiscoveryReply>().is_err());
        assert!("SERVER name 1 2 3 4".parse::<DiscoveryReply>().is_err());
    }
}
