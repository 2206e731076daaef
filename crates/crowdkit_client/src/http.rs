//! HTTP transports backed by reqwest.

use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult};
use crate::transport::{
    BlockingTransport, Method, Request, Response, Transport, TransportError, TransportErrorKind,
};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};

fn default_headers(config: &ClientConfig) -> ClientResult<HeaderMap> {
    let mut auth = HeaderValue::from_str(&format!("OAuth {}", config.token))
        .map_err(|e| ClientError::InvalidConfig(format!("token is not a valid header: {e}")))?;
    auth.set_sensitive(true);
    let mut headers = HeaderMap::new();
    headers.insert(AUTHORIZATION, auth);
    Ok(headers)
}

fn reqwest_method(method: Method) -> reqwest::Method {
    match method {
        Method::Get => reqwest::Method::GET,
        Method::Post => reqwest::Method::POST,
        Method::Patch => reqwest::Method::PATCH,
        Method::Put => reqwest::Method::PUT,
        Method::Delete => reqwest::Method::DELETE,
    }
}

fn transport_error(err: reqwest::Error) -> TransportError {
    let kind = if err.is_timeout() {
        TransportErrorKind::Timeout
    } else if err.is_connect() {
        TransportErrorKind::Connect
    } else if err.is_builder() {
        TransportErrorKind::Other
    } else {
        TransportErrorKind::Io
    };
    TransportError::new(kind, err.to_string())
}

/// Asynchronous transport over a shared `reqwest::Client`.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    config: ClientConfig,
    client: reqwest::Client,
}

impl ReqwestTransport {
    /// Builds a client with the configured token, user agent and timeout.
    pub fn new(config: &ClientConfig) -> ClientResult<Self> {
        let client = reqwest::Client::builder()
            .default_headers(default_headers(config)?)
            .user_agent(config.user_agent.clone())
            .timeout(config.timeout)
            .build()
            .map_err(|e| ClientError::InvalidConfig(e.to_string()))?;
        Ok(Self {
            config: config.clone(),
            client,
        })
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: &Request) -> Result<Response, TransportError> {
        let mut builder = self
            .client
            .request(reqwest_method(request.method), self.config.url_for(&request.path))
            .query(&request.query);
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await.map_err(transport_error)?;
        let status = response.status().as_u16();
        let bytes = response.bytes().await.map_err(transport_error)?;
        Ok(Response::from_bytes(status, bytes.to_vec()))
    }
}

/// Blocking transport over `reqwest::blocking::Client`.
///
/// Must not be created or used from inside an async runtime.
#[derive(Debug, Clone)]
pub struct ReqwestBlockingTransport {
    config: ClientConfig,
    client: reqwest::blocking::Client,
}

impl ReqwestBlockingTransport {
    /// Builds a client with the configured token, user agent and timeout.
    pub fn new(config: &ClientConfig) -> ClientResult<Self> {
        let client = reqwest::blocking::Client::builder()
            .default_headers(default_headers(config)?)
            .user_agent(config.user_agent.clone())
            .timeout(config.timeout)
            .build()
            .map_err(|e| ClientError::InvalidConfig(e.to_string()))?;
        Ok(Self {
            config: config.clone(),
            client,
        })
    }
}

impl BlockingTransport for ReqwestBlockingTransport {
    fn send(&self, request: &Request) -> Result<Response, TransportError> {
        let mut builder = self
            .client
            .request(reqwest_method(request.method), self.config.url_for(&request.path))
            .query(&request.query);
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().map_err(transport_error)?;
        let status = response.status().as_u16();
        let bytes = response.bytes().map_err(transport_error)?;
        Ok(Response::from_bytes(status, bytes.to_vec()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_becomes_oauth_header() {
        let config = ClientConfig::new("https://api.example.com", "secret");
        let headers = default_headers(&config).unwrap();
        let auth = headers.get(AUTHORIZATION).unwrap();
        assert!(auth.is_sensitive());
        assert_eq!(auth.to_str().unwrap(), "OAuth secret");
    }

    #[test]
    fn token_with_newline_is_rejected() {
        let config = ClientConfig::new("https://api.example.com", "bad\ntoken");
        assert!(matches!(
            default_headers(&config),
            Err(ClientError::InvalidConfig(_))
        ));
    }

    #[tokio::test]
    async fn unreachable_host_is_a_connect_error() {
        let config = ClientConfig::new("http://127.0.0.1:9", "token");
        let transport = ReqwestTransport::new(&config).unwrap();
        let err = transport.send(&Request::get("/v1/tasks")).await.unwrap_err();
        assert!(matches!(
            err.kind,
            TransportErrorKind::Connect | TransportErrorKind::Io
        ));
    }
}
