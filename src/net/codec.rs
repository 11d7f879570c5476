use crate::net::messages::{
    ClientEnvelope, ClientMessage, ServerEnvelope, ServerMessage, PROTOCOL_VERSION,
};

#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("bincode: {0}")]
    Bin(#[from] bincode::Error),
    #[error("unsupported protocol version {0}")]
    Version(u8),
}

pub fn encode_server_json(msg: ServerMessage) -> Result<Vec<u8>, CodecError> {
    let env = ServerEnvelope {
        v: PROTOCOL_VERSION,
        msg,
    };
    Ok(serde_json::to_vec(&env)?)
}

pub fn encode_client_json(msg: ClientMessage) -> Result<Vec<u8>, CodecError> {
    let env = ClientEnvelope {
        v: PROTOCOL_VERSION,
        msg,
    };
    Ok(serde_json::to_vec(&env)?)
}

pub fn decode_client_json(bytes: &[u8]) -> Result<ClientMessage, CodecError> {
    let env: ClientEnvelope = serde_json::from_slice(bytes)?;
    check_version(env.v)?;
    Ok(env.msg)
}

pub fn decode_server_json(bytes: &[u8]) -> Result<ServerMessage, CodecError> {
    let env: ServerEnvelope = serde_json::from_slice(bytes)?;
    check_version(env.v)?;
    Ok(env.msg)
}

pub fn encode_server_bin(msg: ServerMessage) -> Result<Vec<u8>, CodecError> {
    let env = ServerEnvelope {
        v: PROTOCOL_VERSION,
        msg,
    };
    Ok(bincode::serialize(&env)?)
}

pub fn encode_client_bin(msg: ClientMessage) -> Result<Vec<u8>, CodecError> {
    let env = ClientEnvelope {
        v: PROTOCOL_VERSION,
        msg,
    };
    Ok(bincode::serialize(&env)?)
}

pub fn decode_client_bin(bytes: &[u8]) -> Result<ClientMessage, CodecError> {
    let env: ClientEnvelope = bincode::deserialize(bytes)?;
    check_version(env.v)?;
    Ok(env.msg)
}

pub fn decode_server_bin(bytes: &[u8]) -> Result<ServerMessage, CodecError> {
    let env: ServerEnvelope = bincode::deserialize(bytes)?;
    check_version(env.v)?;
    Ok(env.msg)
}

fn check_version(v: u8) -> Result<(), CodecError> {
    if v == PROTOCOL_VERSION {
        Ok(())
    } else {
        Err(CodecError::Version(v))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::grid::Position;
    use crate::net::messages::{PlayerRecord, PlayersSnapshot, Topic};

    #[test]
    fn player_snapshot_survives_binary_frames() {
        let mut players = PlayersSnapshot::new();
        players.insert(
            "a1".to_owned(),
            PlayerRecord {
                name: "NEO".to_owned(),
                snake: vec![Position::new(1, 2), Position::new(1, 3)],
                score: 30,
                color: "#39ff14".to_owned(),
                updated_at: Some(1_700_000_000_000),
            },
        );
        let msg = ServerMessage::Players { players };
        let bytes = encode_server_bin(msg.clone()).unwrap();
        assert_eq!(decode_server_bin(&bytes).unwrap(), msg);
    }

    #[test]
    fn json_client_frames_use_snake_case_tags() {
        let bytes = encode_client_json(ClientMessage::Subscribe {
            topic: Topic::KillFeed,
            limit: 5,
        })
        .unwrap();
        let text = String::from_utf8(bytes.clone()).unwrap();
        assert!(text.contains("\"subscribe\""), "{text}");
        assert!(text.contains("\"kill_feed\""), "{text}");
        assert!(matches!(
            decode_client_json(&bytes).unwrap(),
            ClientMessage::Subscribe { limit: 5, .. }
        ));
    }

    #[test]
    fn player_record_tolerates_missing_fields() {
        let raw = br#"{"v":1,"msg":{"players":{"players":{"x":{"name":"GHOST"}}}}}"#;
        match decode_server_json(raw).unwrap() {
            ServerMessage::Players { players } => {
                let ghost = &players["x"];
                assert_eq!(ghost.name, "GHOST");
                assert!(ghost.snake.is_empty());
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn rejects_future_versions() {
        let raw = br#"{"v":9,"msg":{"error":{"message":"x"}}}"#;
        assert!(matches!(decode_server_json(raw), Err(CodecError::Version(9))));
    }
}
