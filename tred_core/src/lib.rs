pub mod entity;
pub mod ids;
pub mod models;
use tokio::sync::OnceCell;

use std::{sync::Arc, time::Duration};

use iroh::Endpoint;
use sea_orm::DatabaseConnection;
use tracing::info;
use zel_core::{prelude::RpcServerBuilder, protocol::RpcClient, IrohBundle};

use crate::service::{
    revalidate::Revalidator,
    treds::{TredsClient, TredsServer, TredsService},
    users::{UsersClient, UsersServer, UsersService},
};

pub mod service;

pub mod error;

pub mod config;

#[cfg(test)]
mod test_utils;

static TRED_CORE: OnceCell<Arc<TredCore>> = OnceCell::const_new();
static ALPN: &[u8] = b"tred::0.1.0";

/// Process-wide node handle, started on first use.
pub async fn core() -> Result<Arc<TredCore>, Box<dyn std::error::Error>> {
    TRED_CORE
        .get_or_try_init(|| async move { TredCore::start().await.map(Arc::new) })
        .await
        .cloned()
}

/// Main runtime handle for Tred.
pub struct TredCore {
    pub config: config::TredConfig,

    /// Server bundle that accepts inbound RPC traffic.
    pub server: IrohBundle,

    /// Client-side endpoint used by the render layer to reach the local server.
    pub client_endpoint: Endpoint,

    pub db: DatabaseConnection,

    /// Paths to refresh after each successful mutation.
    pub revalidator: Revalidator,

    /// Typed clients for the local server.
    pub users: UsersClient,
    pub treds: TredsClient,
}

impl TredCore {
    pub async fn start() -> Result<Self, Box<dyn std::error::Error>> {
        let config = config::get_or_init().await?;
        info!(database = %config.database_path().display(), "starting tred node");
        // ----------------
        // Server endpoint
        // ----------------
        let mut server_builder = IrohBundle::builder(Some(config.secret_key.clone())).await?;
        let server_endpoint = server_builder.endpoint().clone();

        // DB + migrations
        let db = models::open_or_create_db(&config).await?;
        models::migrate_up(&db).await?;

        let revalidator = Revalidator::new();
        let users_service = UsersService::new(db.clone(), revalidator.clone());
        let treds_service = TredsService::new(db.clone(), revalidator.clone(), config.limits);

        // Register RPC servers
        let rpc_server_builder = RpcServerBuilder::new(ALPN, server_endpoint.clone());

        let rpc_server_builder = users_service.register_service(rpc_server_builder);
        let rpc_server_builder = treds_service.register_service(rpc_server_builder);

        let rpc_server = rpc_server_builder.build();

        let server = server_builder.accept(ALPN, rpc_server).finish().await;

        server.wait_online().await;

        // ----------------
        // Client endpoint (render layer)
        // ----------------
        let client_endpoint = Endpoint::builder()
            .secret_key(config.client_secret_key.clone())
            .alpns(vec![ALPN.to_vec()])
            .bind()
            .await?;

        client_endpoint.online().await;

        // Connect client endpoint -> server endpoint
        let conn = client_endpoint
            .connect(server.endpoint.addr(), ALPN)
            .await?;

        let users = UsersClient::new(RpcClient::new(conn.clone()).await?);
        let treds = TredsClient::new(RpcClient::new(conn).await?);

        info!(node_id = %server_endpoint.id(), "tred node online");

        Ok(Self {
            config,
            server,
            client_endpoint,
            db,
            revalidator,
            users,
            treds,
        })
    }

    pub async fn shutdown(self) -> Result<(), Box<dyn std::error::Error>> {
        // Close client endpoint
        self.client_endpoint.close().await;

        // Shutdown server bundle
        self.server.shutdown(Duration::from_secs(5)).await?;

        self.db.close().await?;
        info!("tred node stopped");
        Ok(())
    }
}

pub mod prelude {
    pub use super::ids;
    pub use super::entity;
    pub use super::models;

    pub use super::service;

    pub use super::error;

    pub use super::config;

    pub use zel_core;
}
