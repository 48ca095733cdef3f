use serde::Serialize;

use crate::config::GraphConfig;
use crate::error::GraphError;
use crate::services::{EmailClient, MailboxFolders, PlannerClient, UsersClient};

pub mod http;
pub mod pagination;
pub mod token;

pub use http::{GraphResponse, HttpGateway};
pub use pagination::{drain, drain_as, Page, PageSource};
pub use token::{AccessToken, TokenClaims, TokenProvider};

/// Permissions carried by the current app token.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PermissionReport {
    pub application: Vec<String>,
    pub delegated: Vec<String>,
}

/// Entry point owning the gateway; resource clients borrow it.
pub struct GraphClient {
    gateway: HttpGateway,
}

impl GraphClient {
    pub async fn connect(config: &GraphConfig) -> Result<Self, GraphError> {
        Ok(Self::from_gateway(HttpGateway::connect(config).await?))
    }

    pub fn from_gateway(gateway: HttpGateway) -> Self {
        Self { gateway }
    }

    pub fn gateway(&self) -> &HttpGateway {
        &self.gateway
    }

    pub fn email(&self) -> EmailClient<'_> {
        EmailClient::new(&self.gateway)
    }

    pub fn folders(&self) -> MailboxFolders<'_> {
        MailboxFolders::new(&self.gateway)
    }

    pub fn planner(&self) -> PlannerClient<'_> {
        PlannerClient::new(&self.gateway)
    }

    pub fn users(&self) -> UsersClient<'_> {
        UsersClient::new(&self.gateway)
    }

    pub async fn permissions(&self) -> Result<PermissionReport, GraphError> {
        let claims = self.gateway.tokens().current().await.claims()?;
        Ok(PermissionReport {
            delegated: claims
                .delegated_scopes()
                .into_iter()
                .map(str::to_string)
                .collect(),
            application: claims.roles,
        })
    }
}
