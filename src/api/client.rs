//! reqwest-backed client for the proxy backend

use async_trait::async_trait;
use reqwest::{Client, Method, Url};
use serde::de::DeserializeOwned;
use tracing::{debug, info};

use super::{Endpoints, FetchError, ProxySource};
use crate::config::Config;
use crate::models::{HealthStatus, ProxyMap};

/// HTTP client bound to one backend base URL
#[derive(Debug, Clone)]
pub struct ProxyApi {
    client: Client,
    base_url: Url,
}

impl ProxyApi {
    /// Build a client from configuration
    pub fn new(config: &Config) -> Result<Self, FetchError> {
        let mut builder = Client::builder().user_agent(&config.http.user_agent);
        if let Some(timeout) = config.http_timeout() {
            builder = builder.timeout(timeout);
        }

        let client = builder.build()?;
        let base_url = Url::parse(config.base_url_str())
            .map_err(|e| FetchError::InvalidUrl(format!("{}: {}", config.base_url, e)))?;
        if base_url.cannot_be_a_base() || !matches!(base_url.scheme(), "http" | "https") {
            return Err(FetchError::InvalidUrl(config.base_url.clone()));
        }

        info!("Proxy API client targeting {}", base_url);
        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &str {
        self.base_url.as_str().trim_end_matches('/')
    }

    /// Append `endpoint` to the base path, keeping any query on the base URL
    fn url(&self, endpoint: &str) -> Result<Url, FetchError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| FetchError::InvalidUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(endpoint.trim_start_matches('/').split('/'));
        Ok(url)
    }

    /// Send a request and decode a JSON body
    async fn request<T: DeserializeOwned>(
        &self,
        method: Method,
        endpoint: &str,
    ) -> Result<T, FetchError> {
        let url = self.url(endpoint)?;
        debug!("{} {}", method, url);

        let response = self.client.request(method, url).send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(FetchError::Status {
                status_code: status.as_u16(),
                message: body,
            });
        }

        serde_json::from_str(&body).map_err(|source| FetchError::Decode {
            endpoint: endpoint.to_string(),
            source,
        })
    }
}

#[async_trait]
impl ProxySource for ProxyApi {
    async fn fetch_proxies(&self) -> Result<ProxyMap, FetchError> {
        let proxies: ProxyMap = self.request(Method::GET, Endpoints::PROXIES).await?;
        debug!("Received {} proxies", proxies.len());
        Ok(proxies)
    }

    async fn update_proxies(&self) -> Result<ProxyMap, FetchError> {
        let proxies: ProxyMap = self.request(Method::POST, Endpoints::UPDATE_PROXIES).await?;
        debug!("Backend regenerated {} proxies", proxies.len());
        Ok(proxies)
    }

    async fn health(&self) -> Result<HealthStatus, FetchError> {
        self.request(Method::GET, Endpoints::HEALTH).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::FetchAction;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::sync::oneshot;

    /// Serve exactly one canned HTTP response and report the request line
    async fn serve_once(status_line: &str, body: &str) -> (String, oneshot::Receiver<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let response = format!(
            "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            status_line,
            body.len(),
            body
        );
        let (tx, rx) = oneshot::channel();

        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 1024];
            while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                let n = socket.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&buf[..n]);
            }
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.ok();

            let text = String::from_utf8_lossy(&request);
            let request_line = text.lines().next().unwrap_or_default().to_string();
            let _ = tx.send(request_line);
        });

        (format!("http://{}", addr), rx)
    }

    fn api_for(base_url: &str) -> ProxyApi {
        let config = Config::default().with_base_url(Some(base_url.to_string()));
        ProxyApi::new(&config).unwrap()
    }

    #[tokio::test]
    async fn test_fetch_proxies_uses_get() {
        let (base, request_line) =
            serve_once("200 OK", r#"{"a":{"link":"l1","IP":"1.2.3.4","Port":8080}}"#).await;
        let api = api_for(&base);

        let proxies = api.fetch(FetchAction::Load).await.unwrap().into_records();
        assert_eq!(proxies.len(), 1);
        assert_eq!(proxies[0].link, "l1");
        assert_eq!(proxies[0].ip, "1.2.3.4");
        assert_eq!(proxies[0].port_str(), "8080");

        assert!(request_line.await.unwrap().starts_with("GET /proxies "));
    }

    #[tokio::test]
    async fn test_update_proxies_uses_post() {
        let (base, request_line) = serve_once("200 OK", "{}").await;
        let api = api_for(&base);

        let proxies = api.fetch(FetchAction::Refresh).await.unwrap();
        assert!(proxies.is_empty());
        assert!(request_line.await.unwrap().starts_with("POST /update-proxies "));
    }

    #[tokio::test]
    async fn test_server_error_maps_to_status() {
        let (base, _) = serve_once("500 Internal Server Error", r#"{"error":"boom"}"#).await;
        let api = api_for(&base);

        match api.fetch_proxies().await {
            Err(FetchError::Status { status_code, message }) => {
                assert_eq!(status_code, 500);
                assert!(message.contains("boom"));
            }
            other => panic!("expected status error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_malformed_body_maps_to_decode() {
        let (base, _) = serve_once("200 OK", "not json").await;
        let api = api_for(&base);

        let err = api.fetch_proxies().await.unwrap_err();
        assert_eq!(err.kind(), "decode");
    }

    #[tokio::test]
    async fn test_connection_refused_maps_to_transport() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let api = api_for(&format!("http://{}", addr));
        let err = api.fetch_proxies().await.unwrap_err();
        assert!(matches!(err, FetchError::Transport(_)));
    }

    #[tokio::test]
    async fn test_health() {
        let (base, request_line) =
            serve_once("200 OK", r#"{"status":"ok","service":"Orv Telegram Proxy"}"#).await;
        let api = api_for(&base);

        let health = api.health().await.unwrap();
        assert!(health.is_ok());
        assert!(request_line.await.unwrap().starts_with("GET /health "));
    }

    #[test]
    fn test_trailing_slash_is_trimmed() {
        let api = api_for("http://127.0.0.1:5000/");
        assert_eq!(api.base_url(), "http://127.0.0.1:5000");
        assert_eq!(
            api.url(Endpoints::PROXIES).unwrap().as_str(),
            "http://127.0.0.1:5000/proxies"
        );
    }

    #[test]
    fn test_endpoint_joins_base_path_and_keeps_query() {
        let api = api_for("http://h/?q=1");
        assert_eq!(api.url(Endpoints::PROXIES).unwrap().as_str(), "http://h/proxies?q=1");

        let api = api_for("https://proxy.example/api/");
        assert_eq!(
            api.url(Endpoints::UPDATE_PROXIES).unwrap().as_str(),
            "https://proxy.example/api/update-proxies"
        );
    }

    #[test]
    fn test_unparseable_base_url_is_rejected_up_front() {
        let config = Config::default().with_base_url(Some("http://host:notaport".to_string()));
        assert!(matches!(ProxyApi::new(&config), Err(FetchError::InvalidUrl(_))));
    }
}
