use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use super::{session::SelectedSession, user::UserProfile};

/// Payload for `POST /user/complete-subscription`: plan plus every session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompleteSubscriptionRequest {
    pub subscription_plan_id: String,
    pub start_date: NaiveDate,
    pub sessions: Vec<SelectedSession>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_country: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PaymentInfo {
    #[serde(default)]
    pub status: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlanSummary {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub price: Option<f64>,
}

/// A subscription as listed on the admin dashboard.
///
/// The backend has used several field names over time; accessors pick the
/// first populated one.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subscription {
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub mongo_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subscription_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment: Option<PaymentInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_reference: Option<String>,
    #[serde(default, deserialize_with = "lenient_number", skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number", skip_serializing_if = "Option::is_none")]
    pub amount: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number", skip_serializing_if = "Option::is_none")]
    pub subscription_price: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number", skip_serializing_if = "Option::is_none")]
    pub plan_price: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subscription_plan: Option<PlanSummary>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plan: Option<PlanSummary>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<UserProfile>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_first_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_last_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_timezone: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sessions: Vec<SessionRecord>,
}

impl Subscription {
    pub fn subscription_key(&self) -> Option<&str> {
        self.mongo_id
            .as_deref()
            .or(self.id.as_deref())
            .or(self.subscription_id.as_deref())
    }

    pub fn is_paid(&self) -> bool {
        let status = self
            .payment_status
            .as_deref()
            .or_else(|| self.payment.as_ref().and_then(|p| p.status.as_deref()));
        status == Some("paid")
    }

    pub fn effective_price(&self) -> Option<f64> {
        [
            self.price,
            self.amount,
            self.subscription_price,
            self.plan_price,
            self.subscription_plan.as_ref().and_then(|p| p.price),
            self.plan.as_ref().and_then(|p| p.price),
        ]
        .into_iter()
        .flatten()
        .find(|price| price.is_finite())
    }

    pub fn display_first_name(&self) -> Option<&str> {
        self.user
            .as_ref()
            .and_then(|u| u.first_name.as_deref())
            .or(self.user_first_name.as_deref())
            .or(self.first_name.as_deref())
    }

    pub fn display_last_name(&self) -> Option<&str> {
        self.user
            .as_ref()
            .and_then(|u| u.last_name.as_deref())
            .or(self.user_last_name.as_deref())
            .or(self.last_name.as_deref())
    }

    /// Zone the student booked in, when the backend reports one.
    pub fn student_timezone(&self) -> Option<&str> {
        self.user
            .as_ref()
            .and_then(|u| u.timezone.as_deref())
            .or(self.user_timezone.as_deref())
    }
}

/// A booked session inside a subscription detail response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRecord {
    #[serde(rename = "startsAtUTC", default, skip_serializing_if = "Option::is_none")]
    pub starts_at_utc: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub utc_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub utc: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub starts_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_user_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_user_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl SessionRecord {
    /// Canonical instant, preferring `startsAtUTC` over the older field names.
    pub fn utc_instant(&self) -> Option<DateTime<Utc>> {
        [&self.starts_at_utc, &self.utc_time, &self.utc, &self.starts_at]
            .into_iter()
            .flatten()
            .find_map(|raw| DateTime::parse_from_rfc3339(raw).ok())
            .map(|instant| instant.with_timezone(&Utc))
    }

    pub fn user_date(&self) -> Option<&str> {
        self.date.as_deref().or(self.original_user_date.as_deref())
    }

    pub fn user_time(&self) -> Option<&str> {
        self.time.as_deref().or(self.original_user_time.as_deref())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionQuery {
    pub status: Option<String>,
    pub user_email: Option<String>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub display_country: Option<String>,
}

impl SubscriptionQuery {
    pub fn to_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        if let Some(status) = non_empty(&self.status) {
            pairs.push(("status", status));
        }
        if let Some(email) = non_empty(&self.user_email) {
            pairs.push(("userEmail", email));
        }
        if let Some(page) = self.page.filter(|p| *p > 0) {
            pairs.push(("page", page.to_string()));
        }
        if let Some(limit) = self.limit.filter(|l| *l > 0) {
            pairs.push(("limit", limit.to_string()));
        }
        if let Some(country) = non_empty(&self.display_country) {
            pairs.push(("displayCountry", country));
        }
        pairs
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserQuery {
    pub search: Option<String>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

impl UserQuery {
    pub fn to_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        if let Some(search) = non_empty(&self.search) {
            pairs.push(("search", search));
        }
        if let Some(page) = self.page.filter(|p| *p > 0) {
            pairs.push(("page", page.to_string()));
        }
        if let Some(limit) = self.limit.filter(|l| *l > 0) {
            pairs.push(("limit", limit.to_string()));
        }
        pairs
    }
}

fn non_empty(value: &Option<String>) -> Option<String> {
    value.as_ref().filter(|v| !v.is_empty()).cloned()
}

/// Accepts prices sent either as JSON numbers or numeric strings.
fn lenient_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<f64>, D::Error> {
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::Number(n)) => n.as_f64(),
        Some(serde_json::Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    })
}
