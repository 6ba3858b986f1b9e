//! JSON messages exchanged with streaming clients. Every frame carries a
//! `type` tag; snapshots travel in a `data` field.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{
    error::{ControlError, ProtocolError},
    snapshot::WorldSnapshot,
};

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    RequestState,
    Control { action: String },
    Ping,
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage<'a> {
    InitialState {
        data: &'a WorldSnapshot,
    },
    StateUpdate {
        data: &'a WorldSnapshot,
    },
    ControlAck {
        action: String,
        success: bool,
        message: String,
        running: bool,
        ended: bool,
    },
    Error {
        message: String,
    },
    Pong,
}

impl ServerMessage<'_> {
    pub fn error(message: impl Into<String>) -> Self {
        ServerMessage::Error {
            message: message.into(),
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ControlAction {
    Start,
    Pause,
    Reset,
}

impl ControlAction {
    pub fn as_str(self) -> &'static str {
        match self {
            ControlAction::Start => "start",
            ControlAction::Pause => "pause",
            ControlAction::Reset => "reset",
        }
    }
}

impl FromStr for ControlAction {
    type Err = ControlError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "start" | "resume" => Ok(ControlAction::Start),
            "pause" | "stop" => Ok(ControlAction::Pause),
            "reset" => Ok(ControlAction::Reset),
            other => Err(ControlError::UnknownAction(other.to_string())),
        }
    }
}

pub fn parse_client_message(text: &str) -> Result<ClientMessage, ProtocolError> {
    Ok(serde_json::from_str(text)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_tagged_messages() {
        assert_eq!(
            parse_client_message(r#"{"type":"request_state"}"#).unwrap(),
            ClientMessage::RequestState
        );
        assert_eq!(
            parse_client_message(r#"{"type":"control","action":"pause"}"#).unwrap(),
            ClientMessage::Control {
                action: "pause".into()
            }
        );
    }

    #[test]
    fn rejects_unknown_types_and_garbage() {
        assert!(parse_client_message(r#"{"type":"teleport"}"#).is_err());
        assert!(parse_client_message("not json").is_err());
        assert!(parse_client_message(r#"{"type":"control"}"#).is_err());
    }

    #[test]
    fn control_actions_parse_case_insensitively() {
        assert_eq!("START".parse::<ControlAction>().unwrap(), ControlAction::Start);
        assert_eq!("stop".parse::<ControlAction>().unwrap(), ControlAction::Pause);
        assert_eq!(
            "launch".parse::<ControlAction>(),
            Err(ControlError::UnknownAction("launch".into()))
        );
    }

    #[test]
    fn error_frames_are_tagged() {
        let json = ServerMessage::error("bad").to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["type"], "error");
        assert_eq!(value["message"], "bad");
        let pong: serde_json::Value =
            serde_json::from_str(&ServerMessage::Pong.to_json().unwrap()).unwrap();
        assert_eq!(pong["type"], "pong");
    }
}
