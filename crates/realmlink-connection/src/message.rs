//! Protocol messages that travel after the handshake.
//!
//! Function application and return are not value types, so they are sent
//! as `["functionApply", {..}]` and `["functionReturn", {..}]` beside the
//! encoded values. Anything else that arrives is decoded as a value.

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use serde_json::Value as Json;

use crate::error::{ConnectionError, Result};

/// Message tag for a call into an exported function.
pub const FUNCTION_APPLY: &str = "functionApply";
/// Message tag for the outcome of a call.
pub const FUNCTION_RETURN: &str = "functionReturn";

/// Request to call the exported function behind `function_key`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FunctionApply {
    pub function_key: String,
    /// Encoded array of arguments.
    pub args: Json,
    pub return_value_key: String,
}

/// Outcome of a call. Exactly one of `value` and `reason` is present;
/// a `reason` means the call failed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FunctionReturn {
    pub return_value_key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Json>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<Json>,
}

impl FunctionReturn {
    /// Successful return.
    pub fn value(return_value_key: impl Into<String>, value: Json) -> Self {
        Self {
            return_value_key: return_value_key.into(),
            value: Some(value),
            reason: None,
        }
    }

    /// Failed return.
    pub fn reason(return_value_key: impl Into<String>, reason: Json) -> Self {
        Self {
            return_value_key: return_value_key.into(),
            value: None,
            reason: Some(reason),
        }
    }

    /// The encoded value, or the encoded reason as the error.
    pub fn into_outcome(self) -> Result<std::result::Result<Json, Json>> {
        match (self.value, self.reason) {
            (_, Some(reason)) => Ok(Err(reason)),
            (Some(value), None) => Ok(Ok(value)),
            (None, None) => Err(ConnectionError::MalformedMessage(format!(
                "return for {} carries neither value nor reason",
                self.return_value_key
            ))),
        }
    }
}

/// Any message a connection posts or receives.
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    Apply(FunctionApply),
    Return(FunctionReturn),
    /// An encoded value, such as the exports sent during the handshake.
    Value(Json),
}

impl Message {
    /// Classify a received JSON message.
    pub fn parse(json: Json) -> Result<Self> {
        if let Some([Json::String(tag), payload]) = json.as_array().map(Vec::as_slice) {
            match tag.as_str() {
                FUNCTION_APPLY => return Ok(Message::Apply(serde_json::from_value(payload.clone())?)),
                FUNCTION_RETURN => {
                    return Ok(Message::Return(serde_json::from_value(payload.clone())?))
                }
                _ => {}
            }
        }
        Ok(Message::Value(json))
    }

    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        Self::parse(serde_json::from_slice(bytes)?)
    }

    pub fn to_bytes(&self) -> Result<Bytes> {
        let bytes = match self {
            Message::Apply(apply) => serde_json::to_vec(&(FUNCTION_APPLY, apply))?,
            Message::Return(ret) => serde_json::to_vec(&(FUNCTION_RETURN, ret))?,
            Message::Value(code) => serde_json::to_vec(code)?,
        };
        Ok(Bytes::from(bytes))
    }

    /// Short name for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Message::Apply(_) => FUNCTION_APPLY,
            Message::Return(_) => FUNCTION_RETURN,
            Message::Value(_) => "value",
        }
    }
}
