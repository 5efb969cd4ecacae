use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::VerifyError;
use crate::models::chat::ChatContext;
use crate::models::user::Identity;
use crate::utils::query::FieldMap;
use crate::utils::time::from_unix;

pub const USER_FIELD: &str = "user";
pub const CHAT_FIELD: &str = "chat";

/// Session details sent alongside the identity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SessionInfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chat_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chat_instance: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_param: Option<String>,
}

/// A launch payload that passed signature and freshness checks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VerifiedLaunch {
    pub user: Identity,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chat: Option<ChatContext>,
    pub session: SessionInfo,
}

impl VerifiedLaunch {
    /// Decodes the embedded JSON sub-fields of an already verified payload.
    pub fn from_fields(fields: &FieldMap, auth_date: i64) -> Result<Self, VerifyError> {
        let raw_user = fields
            .get(USER_FIELD)
            .ok_or_else(|| VerifyError::InvalidUserPayload("user field is missing".into()))?;
        let mut user: Identity = decode_json(USER_FIELD, raw_user)?;
        user.auth_date = auth_date;

        let chat = fields
            .get(CHAT_FIELD)
            .map(|raw| decode_json::<ChatContext>(CHAT_FIELD, raw))
            .transpose()?;

        let session = SessionInfo {
            query_id: owned(fields, "query_id"),
            chat_type: owned(fields, "chat_type"),
            chat_instance: owned(fields, "chat_instance"),
            start_param: owned(fields, "start_param"),
        };

        Ok(Self {
            user,
            chat,
            session,
        })
    }

    pub fn user_id(&self) -> i64 {
        self.user.id
    }

    pub fn auth_date(&self) -> i64 {
        self.user.auth_date
    }

    pub fn issued_at(&self) -> Option<DateTime<Utc>> {
        from_unix(self.user.auth_date)
    }
}

fn decode_json<T: DeserializeOwned>(field: &str, raw: &str) -> Result<T, VerifyError> {
    serde_json::from_str(raw)
        .map_err(|e| VerifyError::InvalidUserPayload(format!("{} field: {}", field, e)))
}

fn owned(fields: &FieldMap, key: &str) -> Option<String> {
    fields.get(key).map(str::to_string)
}
