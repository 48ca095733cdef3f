//! App-only Microsoft Graph client: token lifecycle, authenticated requests
//! with a single retry on 401, OData filter construction and `@odata.nextLink`
//! pagination, plus thin mail, folder, planner and directory clients on top.

pub mod client;
pub mod config;
pub mod error;
pub mod output;
pub mod query;
pub mod services;

pub use client::{GraphClient, HttpGateway, TokenProvider};
pub use config::{Credentials, GraphConfig};
pub use error::GraphError;
pub use query::filters::{FilterCriteria, ResultLimit, SubjectPattern};
