//! Web server for fileshelf.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use tokio::net::TcpListener;
use tower_http::compression::CompressionLayer;

use crate::config::Config;
use crate::service::FileService;
use crate::storage::UrlSigner;
use crate::{Database, Result, ShelfError};

use super::handlers::AppState;
use super::middleware::{JwtState, RateLimitState};
use super::router::{create_health_router, create_router};

/// Web server for the API.
pub struct WebServer {
    /// Server address.
    addr: SocketAddr,
    /// Application state.
    app_state: Arc<AppState>,
    /// JWT state.
    jwt_state: Arc<JwtState>,
    /// Rate limiter state.
    rate_limit: Arc<RateLimitState>,
    /// Full configuration.
    config: Config,
}

impl WebServer {
    /// Create a new web server.
    pub fn new(
        config: &Config,
        db: Database,
        files: Arc<FileService>,
        signer: UrlSigner,
    ) -> Result<Self> {
        let addr = format!("{}:{}", config.server.host, config.server.port)
            .parse()
            .map_err(|e| ShelfError::Config(format!("invalid listen address: {e}")))?;

        let app_state = AppState::new(
            db,
            files,
            signer,
            &config.web.jwt_secret,
            config.web.jwt_expiry_secs,
        )
        .with_secure_cookies(config.web.secure_cookies)
        .with_max_users(config.quota.max_users);

        Ok(Self {
            addr,
            app_state: Arc::new(app_state),
            jwt_state: Arc::new(JwtState::new(&config.web.jwt_secret)),
            rate_limit: Arc::new(RateLimitState::new(
                config.web.login_rate_limit,
                config.web.api_rate_limit,
            )),
            config: config.clone(),
        })
    }

    /// Get the server address.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Assemble the full router and start background cleanup tasks.
    fn build(self) -> (SocketAddr, Router) {
        self.app_state.files.locks().clone().start_cleanup_task();
        self.rate_limit.clone().start_cleanup_task();

        let router = create_router(
            self.app_state,
            self.jwt_state,
            self.rate_limit,
            &self.config.web,
        )
        .merge(create_health_router())
        .layer(CompressionLayer::new());

        (self.addr, router)
    }

    /// Run the web server.
    pub async fn run(self) -> std::io::Result<()> {
        let (addr, router) = self.build();

        let listener = TcpListener::bind(addr).await?;
        let local_addr = listener.local_addr()?;
        tracing::info!("Web server listening on http://{}", local_addr);

        axum::serve(
            listener,
            router.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await
    }

    /// Run the server and return the actual bound address.
    ///
    /// This is useful for testing when binding to port 0.
    pub async fn run_with_addr(self) -> std::io::Result<SocketAddr> {
        let (addr, router) = self.build();

        let listener = TcpListener::bind(addr).await?;
        let local_addr = listener.local_addr()?;
        tracing::info!("Web server listening on http://{}", local_addr);

        tokio::spawn(async move {
            if let Err(e) = axum::serve(
                listener,
                router.into_make_service_with_connect_info::<SocketAddr>(),
            )
            .await
            {
                tracing::error!("Web server error: {}", e);
            }
        });

        Ok(local_addr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::QuotaConfig;
    use crate::policy::QuotaPolicy;
    use crate::storage::MemoryObjectStore;

    fn create_test_config() -> Config {
        let mut config = Config::default();
        config.server.host = "127.0.0.1".to_string();
        config.server.port = 0; // Use random port
        config.web.jwt_secret = "test-secret-key".to_string();
        config
    }

    async fn create_server(config: &Config) -> WebServer {
        let db = Database::open_in_memory().await.unwrap();
        let signer = UrlSigner::new(&config.web.jwt_secret, "http://127.0.0.1");
        let files = Arc::new(FileService::new(
            Arc::new(MemoryObjectStore::new(signer.clone())),
            QuotaPolicy::new(QuotaConfig::default()),
        ));
        WebServer::new(config, db, files, signer).unwrap()
    }

    #[tokio::test]
    async fn test_web_server_new() {
        let server = create_server(&create_test_config()).await;
        assert_eq!(server.addr().ip().to_string(), "127.0.0.1");
    }

    #[tokio::test]
    async fn test_web_server_invalid_address() {
        let mut config = create_test_config();
        config.server.host = "not an address".to_string();

        let db = Database::open_in_memory().await.unwrap();
        let signer = UrlSigner::new("secret", "http://127.0.0.1");
        let files = Arc::new(FileService::new(
            Arc::new(MemoryObjectStore::new(signer.clone())),
            QuotaPolicy::new(QuotaConfig::default()),
        ));
        let result = WebServer::new(&config, db, files, signer);
        assert!(matches!(result, Err(ShelfError::Config(_))));
    }

    #[tokio::test]
    async fn test_web_server_run() {
        let server = create_server(&create_test_config()).await;
        let addr = server.run_with_addr().await.unwrap();

        let client = reqwest::Client::new();
        let resp = client
            .get(format!("http://{}/health", addr))
            .send()
            .await
            .unwrap();

        assert!(resp.status().is_success());
        assert_eq!(resp.text().await.unwrap(), "OK");
    }
}
