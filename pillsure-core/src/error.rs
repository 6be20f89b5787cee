use thiserror::Error;

#[derive(Error, Debug)]
pub enum PillsureError {
    #[error("{0}")]
    BadRequest(String),

    #[error("Missing required fields: {}", .fields.join(", "))]
    MissingFields { fields: Vec<String> },

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("Upstream service error: {0}")]
    Upstream(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Invalid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),
}

impl PillsureError {
    /// HTTP status the error maps to. The response layer in the server owns
    /// the actual conversion; keeping the numbers here keeps the taxonomy in
    /// one place.
    pub fn status_code(&self) -> u16 {
        match self {
            PillsureError::BadRequest(_) => 400,
            PillsureError::MissingFields { .. } => 422,
            PillsureError::Unauthorized(_) => 401,
            PillsureError::Forbidden(_) => 403,
            PillsureError::NotFound(_) => 404,
            PillsureError::Conflict(_) => 409,
            PillsureError::Upstream(_) => 502,
            PillsureError::Storage(_) | PillsureError::InvalidJson(_) => 500,
        }
    }

    pub fn missing_fields<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        PillsureError::MissingFields {
            fields: fields.into_iter().map(Into::into).collect(),
        }
    }
}

pub type Result<T> = std::result::Result<T, PillsureError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(PillsureError::BadRequest("x".into()).status_code(), 400);
        assert_eq!(PillsureError::Unauthorized("x".into()).status_code(), 401);
        assert_eq!(PillsureError::Forbidden("x".into()).status_code(), 403);
        assert_eq!(PillsureError::NotFound("x".into()).status_code(), 404);
        assert_eq!(PillsureError::Conflict("x".into()).status_code(), 409);
        assert_eq!(PillsureError::Upstream("x".into()).status_code(), 502);
        assert_eq!(PillsureError::Storage("x".into()).status_code(), 500);
        assert_eq!(PillsureError::missing_fields(["mobile"]).status_code(), 422);
    }

    #[test]
    fn test_missing_fields_message_lists_names() {
        let err = PillsureError::missing_fields(["gender", "mobile"]);
        let msg = err.to_string();
        assert!(msg.contains("gender"));
        assert!(msg.contains("mobile"));
    }
}
