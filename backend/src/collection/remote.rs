//! HTTP-backed record collection.
//!
//! Records are created with `POST {base_url}/{entity}` and listed with
//! `GET {base_url}/{entity}`. The update group, when set, travels in the
//! `X-Update-Group` header.

use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::Value;

use super::RecordCollection;
use crate::config::Config;
use crate::error::{CreateError, CreateResult};
use crate::models::{BatchMode, EntitySchema, Record};

/// Header carrying [`BatchMode::Group`] ids.
pub const UPDATE_GROUP_HEADER: &str = "X-Update-Group";

/// Error body some services return.
#[derive(Debug, Deserialize)]
struct RemoteError {
    error: RemoteErrorDetail,
}

#[derive(Debug, Deserialize)]
struct RemoteErrorDetail {
    message: String,
}

/// Listing envelope used by OData-style services.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Listing {
    Wrapped { value: Vec<Record> },
    Bare(Vec<Record>),
}

/// Remote collection for one entity.
#[derive(Clone)]
pub struct HttpCollection {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpCollection {
    /// Collection at `{base_url}/{entity}`.
    pub fn new(base_url: &str, entity: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: format!("{}/{}", base_url.trim_end_matches('/'), entity),
        }
    }

    /// Collection for `schema` at the configured remote URL, if any.
    pub fn from_config(config: &Config, schema: &EntitySchema) -> Option<Self> {
        config
            .remote_url
            .as_deref()
            .map(|url| Self::new(url, schema.file_stem))
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

/// Map a non-success status and body to a [`CreateError`].
fn status_error(status: StatusCode, body: &str) -> CreateError {
    let message = serde_json::from_str::<RemoteError>(body)
        .map(|e| e.error.message)
        .unwrap_or_else(|_| body.to_string());

    match status {
        StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => CreateError::Validation(message),
        StatusCode::CONFLICT => CreateError::Conflict(message),
        _ => CreateError::Remote {
            status: status.as_u16(),
            message,
        },
    }
}

impl RecordCollection for HttpCollection {
    async fn create(&self, payload: Record, mode: &BatchMode) -> CreateResult<Record> {
        let mut request = self.client.post(&self.endpoint).json(&payload);
        if let Some(group) = mode.group_id() {
            request = request.header(UPDATE_GROUP_HEADER, group);
        }

        let response = request
            .send()
            .await
            .map_err(|e| CreateError::Transport(e.to_string()))?;
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| CreateError::Transport(e.to_string()))?;

        if !status.is_success() {
            return Err(status_error(status, &body));
        }

        // Some services answer 201/204 without echoing the record.
        match serde_json::from_str::<Value>(&body) {
            Ok(Value::Object(created)) => Ok(created),
            _ => Ok(payload),
        }
    }

    async fn list(&self) -> CreateResult<Vec<Record>> {
        let response = self
            .client
            .get(&self.endpoint)
            .send()
            .await
            .map_err(|e| CreateError::Transport(e.to_string()))?;
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| CreateError::Transport(e.to_string()))?;

        if !status.is_success() {
            return Err(status_error(status, &body));
        }

        match serde_json::from_str::<Listing>(&body) {
            Ok(Listing::Wrapped { value }) | Ok(Listing::Bare(value)) => Ok(value),
            Err(e) => Err(CreateError::Remote {
                status: status.as_u16(),
                message: format!("Invalid listing: {}", e),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_joining() {
        assert_eq!(
            HttpCollection::new("http://localhost:4004/odata/", "suppliers").endpoint(),
            "http://localhost:4004/odata/suppliers"
        );
    }

    #[test]
    fn test_status_mapping() {
        let body = r#"{"error": {"message": "email invalid"}}"#;
        match status_error(StatusCode::BAD_REQUEST, body) {
            CreateError::Validation(m) => assert_eq!(m, "email invalid"),
            other => panic!("unexpected: {:?}", other),
        }
        assert!(matches!(
            status_error(StatusCode::CONFLICT, "dup"),
            CreateError::Conflict(_)
        ));
        assert!(matches!(
            status_error(StatusCode::BAD_GATEWAY, "oops"),
            CreateError::Remote { status: 502, .. }
        ));
    }

    #[test]
    fn test_listing_shapes() {
        let wrapped: Listing = serde_json::from_str(r#"{"value": [{"name": "A"}]}"#).unwrap();
        assert!(matches!(wrapped, Listing::Wrapped { ref value } if value.len() == 1));
        let bare: Listing = serde_json::from_str(r#"[{"name": "A"}, {"name": "B"}]"#).unwrap();
        assert!(matches!(bare, Listing::Bare(ref v) if v.len() == 2));
    }

    #[tokio::test]
    async fn test_unreachable_remote_is_transport_error() {
        let c = HttpCollection::new("http://127.0.0.1:9", "suppliers");
        let err = c.create(Record::new(), &BatchMode::Direct).await.unwrap_err();
        assert!(matches!(err, CreateError::Transport(_)));
    }
}
