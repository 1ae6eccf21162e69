use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use crate::config::ClientConfig;
use crate::error::{ApiError, ApiResult};
use crate::session::Session;

/// Longest plain-text error body that is shown to the user as-is
const MAX_PLAIN_ERROR_LEN: usize = 200;

/// Thin HTTP wrapper: base URL, bearer header, error mapping.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
}

impl HttpTransport {
    pub fn new(config: &ClientConfig) -> ApiResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;
        Ok(Self::with_client(client, &config.api_base_url))
    }

    pub fn with_client(client: reqwest::Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Start an authenticated request. A session without a token is
    /// rejected here, before anything goes on the wire.
    pub fn request(&self, session: &Session, method: Method, path: &str) -> ApiResult<RequestBuilder> {
        if session.token().trim().is_empty() {
            return Err(ApiError::Unauthorized("No access token".to_string()));
        }
        let url = self.url(path);
        debug!(%method, %url, "api request");
        Ok(self
            .client
            .request(method, url)
            .bearer_auth(session.token()))
    }

    pub async fn get_json<T: DeserializeOwned>(
        &self,
        session: &Session,
        path: &str,
        query: &[(&str, String)],
    ) -> ApiResult<T> {
        let builder = self.request(session, Method::GET, path)?.query(query);
        let response = self.send(builder).await?;
        decode_json(response).await
    }

    pub async fn post_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        session: &Session,
        path: &str,
        body: &B,
    ) -> ApiResult<T> {
        let builder = self.request(session, Method::POST, path)?.json(body);
        let response = self.send(builder).await?;
        decode_json(response).await
    }

    /// PUT without a request body; the response body is optional.
    pub async fn put_optional<T: DeserializeOwned>(
        &self,
        session: &Session,
        path: &str,
        query: &[(&str, String)],
    ) -> ApiResult<Option<T>> {
        let builder = self.request(session, Method::PUT, path)?.query(query);
        let response = self.send(builder).await?;
        decode_optional_json(response).await
    }

    pub async fn put_empty(
        &self,
        session: &Session,
        path: &str,
        query: &[(&str, String)],
    ) -> ApiResult<()> {
        let builder = self.request(session, Method::PUT, path)?.query(query);
        self.send(builder).await?;
        Ok(())
    }

    pub async fn delete(
        &self,
        session: &Session,
        path: &str,
        query: &[(&str, String)],
    ) -> ApiResult<()> {
        let builder = self.request(session, Method::DELETE, path)?.query(query);
        self.send(builder).await?;
        Ok(())
    }

    /// Send and turn any non-2xx status into an [`ApiError`].
    pub async fn send(&self, builder: RequestBuilder) -> ApiResult<Response> {
        let response = builder.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let message = extract_error_message(status, &body);
        debug!(status = status.as_u16(), %message, "api error response");

        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(ApiError::Unauthorized(message));
        }
        Err(ApiError::Http {
            status: status.as_u16(),
            message,
        })
    }
}

async fn decode_json<T: DeserializeOwned>(response: Response) -> ApiResult<T> {
    let bytes = response.bytes().await?;
    Ok(serde_json::from_slice(&bytes)?)
}

async fn decode_optional_json<T: DeserializeOwned>(response: Response) -> ApiResult<Option<T>> {
    let bytes = response.bytes().await?;
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(None);
    }
    Ok(Some(serde_json::from_slice(&bytes)?))
}

/// Pick the most useful message out of an error body: the JSON `message`
/// or `error` field, a bare JSON string, short plain text, or a generic
/// status line.
pub fn extract_error_message(status: StatusCode, body: &str) -> String {
    let trimmed = body.trim();

    if let Ok(value) = serde_json::from_str::<serde_json::Value>(trimmed) {
        let from_field = ["message", "error"].iter().find_map(|field| {
            value
                .get(*field)
                .and_then(|v| v.as_str())
                .map(str::trim)
                .filter(|s| !s.is_empty())
        });
        if let Some(message) = from_field {
            return message.to_string();
        }
        if let Some(message) = value.as_str().map(str::trim).filter(|s| !s.is_empty()) {
            return message.to_string();
        }
    } else if !trimmed.is_empty()
        && trimmed.len() <= MAX_PLAIN_ERROR_LEN
        && !trimmed.starts_with('<')
    {
        return trimmed.to_string();
    }

    format!("Request failed with status {}", status.as_u16())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::{Identity, Role};
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn session(token: &str) -> Session {
        Session::new(
            Identity {
                id: 1,
                role: Role::Passenger,
                display_name: None,
            },
            token,
        )
    }

    #[test]
    fn test_url_joining() {
        let transport = HttpTransport::with_client(reqwest::Client::new(), "http://api.test/api/v1/");
        assert_eq!(transport.base_url(), "http://api.test/api/v1");
        assert_eq!(
            transport.url("/notifications/1/read"),
            "http://api.test/api/v1/notifications/1/read"
        );
    }

    #[test]
    fn test_extract_error_message() {
        let status = StatusCode::BAD_REQUEST;
        assert_eq!(
            extract_error_message(status, r#"{"message": "Invalid QR code", "error": "Bad Request"}"#),
            "Invalid QR code"
        );
        assert_eq!(
            extract_error_message(status, r#"{"error": "Bad Request"}"#),
            "Bad Request"
        );
        assert_eq!(extract_error_message(status, r#""plain json string""#), "plain json string");
        assert_eq!(extract_error_message(status, "Ticket expired"), "Ticket expired");
        assert_eq!(
            extract_error_message(StatusCode::BAD_GATEWAY, "<html>oops</html>"),
            "Request failed with status 502"
        );
        assert_eq!(
            extract_error_message(StatusCode::INTERNAL_SERVER_ERROR, ""),
            "Request failed with status 500"
        );
    }

    #[tokio::test]
    async fn test_missing_token_never_hits_network() {
        let server = MockServer::start().await;
        let transport = HttpTransport::with_client(reqwest::Client::new(), &server.uri());

        let result: ApiResult<u64> = transport.get_json(&session("  "), "/anything", &[]).await;
        assert!(matches!(result, Err(ApiError::Unauthorized(_))));
        assert!(server.received_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_bearer_header_and_status_mapping() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/ok"))
            .and(header("authorization", "Bearer tok"))
            .respond_with(ResponseTemplate::new(200).set_body_json(3))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/denied"))
            .respond_with(ResponseTemplate::new(401).set_body_json(serde_json::json!({
                "message": "Token expired"
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/broken"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let transport = HttpTransport::with_client(reqwest::Client::new(), &server.uri());
        let s = session("tok");

        let ok: u64 = transport.get_json(&s, "/ok", &[]).await.unwrap();
        assert_eq!(ok, 3);

        let denied: ApiResult<u64> = transport.get_json(&s, "/denied", &[]).await;
        assert_eq!(denied, Err(ApiError::Unauthorized("Token expired".to_string())));

        let broken: ApiResult<u64> = transport.get_json(&s, "/broken", &[]).await;
        assert_eq!(
            broken,
            Err(ApiError::Http {
                status: 500,
                message: "Request failed with status 500".to_string()
            })
        );
    }

    #[tokio::test]
    async fn test_bad_body_is_decode_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/garbage"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let transport = HttpTransport::with_client(reqwest::Client::new(), &server.uri());
        let result: ApiResult<u64> = transport.get_json(&session("tok"), "/garbage", &[]).await;
        assert_eq!(result.unwrap_err().kind(), crate::error::ErrorKind::Decode);
    }
}
