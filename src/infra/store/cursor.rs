use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

use super::StoreError;

/// Keyset position: the `(createdAt, id)` of the last record on a page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cursor {
    pub created_at: OffsetDateTime,
    pub id: String,
}

impl Cursor {
    pub fn new(created_at: OffsetDateTime, id: impl Into<String>) -> Self {
        Self {
            created_at,
            id: id.into(),
        }
    }

    pub fn encode(&self) -> Result<String, StoreError> {
        let raw = format!("{}/{}", format_timestamp(self.created_at)?, self.id);
        Ok(URL_SAFE_NO_PAD.encode(raw.as_bytes()))
    }

    pub fn decode(token: &str) -> Result<Self, StoreError> {
        let bytes = URL_SAFE_NO_PAD
            .decode(token.as_bytes())
            .map_err(|_| StoreError::InvalidToken)?;
        let raw = String::from_utf8(bytes).map_err(|_| StoreError::InvalidToken)?;

        let mut parts = raw.splitn(2, '/');
        let timestamp = parts.next().ok_or(StoreError::InvalidToken)?;
        let id = parts.next().ok_or(StoreError::InvalidToken)?;
        if id.is_empty() {
            return Err(StoreError::InvalidToken);
        }

        let created_at = parse_timestamp(timestamp).ok_or(StoreError::InvalidToken)?;
        Ok(Self::new(created_at, id))
    }

    /// True when a record at `(created_at, id)` sorts after this cursor in
    /// `createdAt DESC, id DESC` order.
    pub fn precedes(&self, created_at: OffsetDateTime, id: &str) -> bool {
        created_at < self.created_at || (created_at == self.created_at && id < self.id.as_str())
    }
}

pub fn parse_timestamp(raw: &str) -> Option<OffsetDateTime> {
    OffsetDateTime::parse(raw, &Rfc3339).ok()
}

pub fn format_timestamp(value: OffsetDateTime) -> Result<String, StoreError> {
    value
        .format(&Rfc3339)
        .map_err(|err| StoreError::InvalidRecord(format!("unformattable timestamp: {}", err)))
}
