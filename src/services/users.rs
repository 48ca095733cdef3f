use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::client::pagination::drain;
use crate::client::HttpGateway;
use crate::error::GraphError;
use crate::services::require;

const MEMBER_QUERY: &[(&str, &str)] = &[
    ("$top", "999"),
    ("$filter", "userType eq 'Member'"),
    (
        "$select",
        "id,displayName,jobTitle,mail,officeLocation,userPrincipalName,accountEnabled,assignedLicenses",
    ),
];

const UNKNOWN_SKU: &str = "Unknown";

const SKU_FRIENDLY_NAMES: &[(&str, &str)] = &[
    ("AAD_PREMIUM", "Microsoft Entra ID P1"),
    ("AAD_PREMIUM_P2", "Microsoft Entra ID P2"),
    ("CCIBOTS_PRIVPREV_VIRAL", "Copilot (Preview)"),
    ("DESKLESSPACK", "Office 365 F3"),
    ("EMS", "Enterprise Mobility + Security E3"),
    ("EMSPREMIUM", "Enterprise Mobility + Security E5"),
    ("ENTERPRISEPACK", "Office 365 E3"),
    ("ENTERPRISEPREMIUM", "Office 365 E5"),
    ("EXCHANGEENTERPRISE", "Exchange Online (Plan 2)"),
    ("EXCHANGESTANDARD", "Exchange Online (Plan 1)"),
    ("FLOW_FREE", "Power Automate Free"),
    ("MICROSOFT_BUSINESS_CENTER", "Microsoft Business Center"),
    ("Microsoft_Teams_Exploratory_Dept", "Teams Exploratory"),
    ("O365_BUSINESS", "Microsoft 365 Apps for Business"),
    ("O365_BUSINESS_ESSENTIALS", "Microsoft 365 Business Basic"),
    ("O365_BUSINESS_PREMIUM", "Microsoft 365 Business Standard"),
    ("PBI_PREMIUM_PER_USER", "Power BI Premium (Per User)"),
    ("POWERAPPS_DEV", "Power Apps Developer"),
    ("POWERAPPS_VIRAL", "Power Apps (Trial)"),
    ("POWER_BI_PRO", "Power BI Pro"),
    ("POWER_BI_STANDARD", "Power BI (Free)"),
    ("Power_Pages_vTrial_for_Makers", "Power Pages (Trial)"),
    ("PROJECT_PLAN3_DEPT", "Project Plan 3 (Departments)"),
    ("RMSBASIC", "Rights Management (Basic)"),
    ("SPB", "Microsoft 365 Business Premium"),
    ("SPE_E3", "Microsoft 365 E3"),
    ("SPE_E5", "Microsoft 365 E5"),
    ("STANDARDPACK", "Office 365 E1"),
    ("Teams_Premium_(for_Departments)", "Teams Premium (Departments)"),
    ("TEAMS_FREE", "Microsoft Teams (Free)"),
    ("VISIOCLIENT", "Visio Plan 2"),
    ("WINDOWS_STORE", "Windows Store"),
];

/// Display name for a SKU part number, `"Unknown"` when not in the table.
pub fn friendly_sku_name(part_number: &str) -> &'static str {
    SKU_FRIENDLY_NAMES
        .iter()
        .find(|(part, _)| *part == part_number)
        .map(|(_, name)| *name)
        .unwrap_or(UNKNOWN_SKU)
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum UserView {
    #[default]
    Full,
    Simple,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    pub display_name: Option<String>,
    pub job_title: Option<String>,
    pub mail: Option<String>,
    pub office_location: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LicenseSku {
    pub sku_id: String,
    pub sku_part_number: String,
    pub friendly_name: String,
}

impl LicenseSku {
    fn from_subscribed(sku: &Value) -> Self {
        let part_number = sku
            .get("skuPartNumber")
            .and_then(Value::as_str)
            .unwrap_or_default();
        Self {
            sku_id: sku
                .get("skuId")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            sku_part_number: part_number.to_string(),
            friendly_name: friendly_sku_name(part_number).to_string(),
        }
    }
}

pub struct UsersClient<'a> {
    gateway: &'a HttpGateway,
}

impl<'a> UsersClient<'a> {
    pub fn new(gateway: &'a HttpGateway) -> Self {
        Self { gateway }
    }

    /// Directory id of the user; `None` when Graph answers 404.
    pub async fn user_id_by_email(&self, email: &str) -> Result<Option<String>, GraphError> {
        let email = require("email", email)?;
        let url = self.gateway.endpoint(&["users", email])?;
        let response = self.gateway.get(url.as_str()).await?;

        match response.status() {
            StatusCode::OK => {
                let user: Value = response.json()?;
                Ok(user.get("id").and_then(Value::as_str).map(str::to_string))
            }
            StatusCode::NOT_FOUND => Ok(None),
            _ => Err(response.error("error fetching user id")),
        }
    }

    /// Every member account in the tenant, all pages.
    pub async fn list_members(&self) -> Result<Vec<Value>, GraphError> {
        let url = self.gateway.endpoint_with_query(&["users"], MEMBER_QUERY)?;
        drain(self.gateway, &url).await
    }

    pub async fn list_user_summaries(&self) -> Result<Vec<UserSummary>, GraphError> {
        let users = self.list_members().await?;
        Ok(users
            .into_iter()
            .map(serde_json::from_value::<UserSummary>)
            .collect::<Result<Vec<_>, _>>()?)
    }

    /// Member listing in the requested shape. `Simple` keeps only
    /// display name, job title, mail and office location.
    pub async fn list_users(&self, view: UserView) -> Result<Vec<Value>, GraphError> {
        match view {
            UserView::Full => self.list_members().await,
            UserView::Simple => self
                .list_user_summaries()
                .await?
                .into_iter()
                .map(|summary| serde_json::to_value(summary).map_err(GraphError::from))
                .collect(),
        }
    }

    /// Display-name search. Graph only serves `$search` on users with
    /// `ConsistencyLevel: eventual`.
    pub async fn search_users(&self, query: &str) -> Result<Vec<Value>, GraphError> {
        let query = require("query", query)?;
        let search = format!("\"displayName:{query}\"");
        let url = self
            .gateway
            .endpoint_with_query(&["users"], &[("$search", search.as_str())])?;

        let response = self
            .gateway
            .get_with_headers(&url, &[("ConsistencyLevel", "eventual")])
            .await?;
        if response.status() != StatusCode::OK {
            return Err(response.error("error searching users"));
        }

        let body: Value = response.json()?;
        Ok(match body.get("value") {
            Some(Value::Array(users)) => users.clone(),
            _ => Vec::new(),
        })
    }

    pub async fn tenant_licenses(&self) -> Result<Vec<LicenseSku>, GraphError> {
        let url = self.gateway.endpoint(&["subscribedSkus"])?;
        let response = self.gateway.get(url.as_str()).await?;
        if response.status() != StatusCode::OK {
            return Err(response.error("error fetching SKUs"));
        }

        let body: Value = response.json()?;
        Ok(body
            .get("value")
            .and_then(Value::as_array)
            .map(|skus| skus.iter().map(LicenseSku::from_subscribed).collect())
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{friendly_sku_name, LicenseSku, UserSummary};

    #[test]
    fn friendly_names_fall_back_to_unknown() {
        assert_eq!(friendly_sku_name("SPB"), "Microsoft 365 Business Premium");
        assert_eq!(friendly_sku_name("EXCHANGESTANDARD"), "Exchange Online (Plan 1)");
        assert_eq!(friendly_sku_name("CONTOSO_CUSTOM"), "Unknown");
        assert_eq!(friendly_sku_name("spb"), "Unknown");
    }

    #[test]
    fn license_rows_come_from_subscribed_skus() {
        let sku = json!({
            "skuId": "cbdc14ab-d96c-4c30-b9f4-6ada7cdc1d46",
            "skuPartNumber": "SPB",
            "consumedUnits": 12
        });
        assert_eq!(
            LicenseSku::from_subscribed(&sku),
            LicenseSku {
                sku_id: "cbdc14ab-d96c-4c30-b9f4-6ada7cdc1d46".to_string(),
                sku_part_number: "SPB".to_string(),
                friendly_name: "Microsoft 365 Business Premium".to_string(),
            }
        );
    }

    #[test]
    fn user_summary_projects_four_fields() {
        let user = json!({
            "id": "u1",
            "displayName": "Grace Hopper",
            "jobTitle": "Rear Admiral",
            "mail": "grace@example.com",
            "officeLocation": null,
            "accountEnabled": true
        });
        let summary: UserSummary = serde_json::from_value(user).expect("decode");
        assert_eq!(summary.display_name.as_deref(), Some("Grace Hopper"));
        assert_eq!(summary.office_location, None);
        assert_eq!(
            serde_json::to_value(&summary).expect("encode"),
            json!({
                "displayName": "Grace Hopper",
                "jobTitle": "Rear Admiral",
                "mail": "grace@example.com",
                "officeLocation": null
            })
        );
    }
}
