use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::client::pagination::drain;
use crate::client::HttpGateway;
use crate::error::GraphError;
use crate::services::require;

const NOT_AVAILABLE: &str = "N/A";

/// Condensed plan row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlanSummary {
    pub id: String,
    pub title: String,
    pub owner: String,
}

impl PlanSummary {
    /// `owner` is a group id string on group plans and an identity set on
    /// user-visible plans; both shapes are accepted.
    pub fn from_plan(plan: &Value) -> Self {
        let owner = match plan.get("owner") {
            Some(Value::String(owner)) => owner.clone(),
            Some(owner) => owner
                .pointer("/user/displayName")
                .and_then(Value::as_str)
                .unwrap_or(NOT_AVAILABLE)
                .to_string(),
            None => NOT_AVAILABLE.to_string(),
        };

        Self {
            id: string_field(plan, "id"),
            title: string_field(plan, "title"),
            owner,
        }
    }
}

fn string_field(value: &Value, key: &str) -> String {
    value
        .get(key)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

pub struct PlannerClient<'a> {
    gateway: &'a HttpGateway,
}

impl<'a> PlannerClient<'a> {
    pub fn new(gateway: &'a HttpGateway) -> Self {
        Self { gateway }
    }

    pub async fn group_plans(&self, group_id: &str) -> Result<Vec<Value>, GraphError> {
        let group_id = require("group id", group_id)?;
        let url = self
            .gateway
            .endpoint(&["groups", group_id, "planner", "plans"])?
            .to_string();
        drain(self.gateway, &url).await
    }

    pub async fn group_plan_summaries(&self, group_id: &str) -> Result<Vec<PlanSummary>, GraphError> {
        Ok(self
            .group_plans(group_id)
            .await?
            .iter()
            .map(PlanSummary::from_plan)
            .collect())
    }

    /// Plans visible to the user, condensed.
    pub async fn user_plans(&self, user_id: &str) -> Result<Vec<PlanSummary>, GraphError> {
        let user_id = require("user id", user_id)?;
        let url = self
            .gateway
            .endpoint(&["users", user_id, "planner", "plans"])?
            .to_string();
        Ok(drain(self.gateway, &url)
            .await?
            .iter()
            .map(PlanSummary::from_plan)
            .collect())
    }

    pub async fn user_tasks(&self, user_id: &str) -> Result<Vec<Value>, GraphError> {
        let user_id = require("user id", user_id)?;
        let url = self
            .gateway
            .endpoint(&["users", user_id, "planner", "tasks"])?
            .to_string();
        let tasks = drain(self.gateway, &url).await?;
        debug!(%user_id, count = tasks.len(), "fetched planner tasks");
        Ok(tasks)
    }

    /// Tasks of a plan, each carrying a `body` taken from its details
    /// `description`. A details lookup that fails leaves `"N/A"` instead of
    /// failing the listing.
    pub async fn plan_tasks_with_details(&self, plan_id: &str) -> Result<Vec<Value>, GraphError> {
        let plan_id = require("plan id", plan_id)?;
        let url = self
            .gateway
            .endpoint(&["planner", "plans", plan_id, "tasks"])?
            .to_string();
        let tasks = drain(self.gateway, &url).await?;

        let mut detailed = Vec::with_capacity(tasks.len());
        for mut task in tasks {
            let body = match task.get("id").and_then(Value::as_str) {
                Some(task_id) => self.task_description(task_id).await,
                None => NOT_AVAILABLE.to_string(),
            };
            if let Value::Object(fields) = &mut task {
                fields.insert("body".to_string(), Value::String(body));
            }
            detailed.push(task);
        }
        Ok(detailed)
    }

    async fn task_description(&self, task_id: &str) -> String {
        let details = match self.gateway.endpoint(&["planner", "tasks", task_id, "details"]) {
            Ok(url) => self.gateway.get_json_response(url.as_str(), false).await,
            Err(error) => Err(error),
        };

        match details {
            Ok(details) => details
                .get("description")
                .and_then(Value::as_str)
                .unwrap_or(NOT_AVAILABLE)
                .to_string(),
            Err(error) => {
                warn!(%task_id, %error, "task details unavailable");
                NOT_AVAILABLE.to_string()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::PlanSummary;

    #[test]
    fn summary_accepts_both_owner_shapes() {
        let group_plan = json!({ "id": "p1", "title": "Launch", "owner": "group-42" });
        assert_eq!(
            PlanSummary::from_plan(&group_plan),
            PlanSummary {
                id: "p1".to_string(),
                title: "Launch".to_string(),
                owner: "group-42".to_string(),
            }
        );

        let user_plan = json!({
            "id": "p2",
            "title": "Roadmap",
            "owner": { "user": { "displayName": "Ada Lovelace" } }
        });
        assert_eq!(PlanSummary::from_plan(&user_plan).owner, "Ada Lovelace");
    }

    #[test]
    fn summary_defaults_missing_owner() {
        let plan = json!({ "id": "p3", "title": "Orphan" });
        assert_eq!(PlanSummary::from_plan(&plan).owner, "N/A");

        let odd = json!({ "id": "p4", "title": "Odd", "owner": { "group": {} } });
        assert_eq!(PlanSummary::from_plan(&odd).owner, "N/A");
    }
}
