use std::time::Duration;

use async_trait::async_trait;
use bayan_core::{
    errors::{BookingError, BookingResult},
    models::{
        AdminProfile, AuthToken, BookedSlot, CompleteSubscriptionRequest, Plan, PlanDraft,
        PlanOrder, ProfileUpdate, Registration, RegistrationProfile, SelectedSession,
        Subscription, SubscriptionQuery, UserProfile, UserQuery,
    },
    timezone::local_to_utc,
};
use chrono::NaiveDate;
use eyre::eyre;
use reqwest::{RequestBuilder, StatusCode};
use serde_json::{Value, json};
use tracing::{debug, info, warn};
use urlencoding::encode;

use crate::{
    api::AppointmentApi,
    config::ClientConfig,
    normalize::{
        decode, decode_list, failure_message, first, first_or_body, list_at, parse_body,
        plans_array, string_at, subscription_id,
    },
};

const ACTIVE_SUBSCRIPTION: &str = "You already have an active subscription to this plan";

/// A response with its body already read.
struct Reply {
    status: StatusCode,
    body: Value,
}

impl Reply {
    fn is_success(&self) -> bool {
        self.status.is_success()
    }

    fn error(&self, fallback: String) -> BookingError {
        BookingError::Api {
            status: self.status.as_u16(),
            message: failure_message(&self.body).unwrap_or(fallback),
        }
    }

    /// The body on success, otherwise `"{action} ({status})"` unless the
    /// server supplied a message.
    fn ok_or(self, action: &str) -> BookingResult<Value> {
        if self.is_success() {
            Ok(self.body)
        } else {
            let fallback = format!("{} ({})", action, self.status.as_u16());
            Err(self.error(fallback))
        }
    }

    fn message_or(&self, default: &str) -> String {
        self.body
            .get("message")
            .and_then(Value::as_str)
            .filter(|m| !m.is_empty())
            .unwrap_or(default)
            .to_string()
    }
}

fn reason(status: StatusCode) -> &'static str {
    status.canonical_reason().unwrap_or("Unknown error")
}

/// reqwest-backed [`AppointmentApi`].
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    config: ClientConfig,
}

impl ApiClient {
    pub fn new(config: ClientConfig) -> BookingResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout))
            .build()
            .map_err(|e| BookingError::Internal(eyre!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { http, config })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.api_url, path)
    }

    async fn send(&self, request: RequestBuilder) -> BookingResult<Reply> {
        let response = request
            .send()
            .await
            .map_err(|e| BookingError::Network(e.to_string()))?;
        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| BookingError::Network(e.to_string()))?;

        debug!("API responded with {}", status);
        Ok(Reply {
            status,
            body: parse_body(&text),
        })
    }

    /// Fill a missing `startsAtUTC` by reading the session in the configured zone.
    fn with_utc(&self, mut session: SelectedSession) -> SelectedSession {
        if session.starts_at_utc.is_none() {
            session.starts_at_utc = local_to_utc(session.date, session.time, self.config.timezone);
        }
        session
    }

    /// Look a zone up on TimeZoneDB directly. Needs `TIMEZONEDB_API_KEY`.
    pub async fn timezonedb_lookup(&self, zone: &str) -> BookingResult<Value> {
        let key = self
            .config
            .timezonedb_api_key
            .as_deref()
            .ok_or_else(|| {
                BookingError::Validation("TimeZoneDB API key not configured".to_string())
            })?;

        let request = self
            .http
            .get(format!("{}/get-time-zone", self.config.timezonedb_url))
            .query(&[("key", key), ("format", "json"), ("by", "zone"), ("zone", zone)]);
        let reply = self.send(request).await?;

        if !reply.is_success() {
            return Err(BookingError::Api {
                status: reply.status.as_u16(),
                message: format!("TimeZoneDB request failed ({})", reply.status.as_u16()),
            });
        }
        Ok(reply.body)
    }
}

#[async_trait]
impl AppointmentApi for ApiClient {
    async fn send_login_otp(&self, email: &str) -> BookingResult<()> {
        let request = self
            .http
            .post(self.url("/auth/login/send-otp"))
            .json(&json!({ "email": email }));
        self.send(request).await?.ok_or("Failed to send login OTP")?;
        info!("Login OTP sent");
        Ok(())
    }

    async fn send_registration_otp(&self, email: &str) -> BookingResult<()> {
        let request = self
            .http
            .post(self.url("/auth/send-otp"))
            .json(&json!({ "email": email }));
        self.send(request).await?.ok_or("Failed to send registration OTP")?;
        info!("Registration OTP sent");
        Ok(())
    }

    async fn verify_otp(&self, email: &str, otp: &str) -> BookingResult<AuthToken> {
        let request = self
            .http
            .post(self.url("/auth/verify-otp"))
            .json(&json!({ "email": email, "otp": otp }));
        let body = self.send(request).await?.ok_or("Failed to verify OTP")?;

        if let Some(token) = string_at(&body, &["/data/token", "/token"]) {
            return Ok(AuthToken::Permanent(token));
        }
        if let Some(temp) = string_at(&body, &["/data/tempToken", "/tempToken"]) {
            return Ok(AuthToken::Temporary(temp));
        }
        Err(BookingError::Authentication(
            "No authentication token received".to_string(),
        ))
    }

    async fn complete_registration(
        &self,
        temp_token: &str,
        profile: &RegistrationProfile,
    ) -> BookingResult<Registration> {
        let request = self
            .http
            .post(self.url("/auth/complete-registration"))
            .bearer_auth(temp_token)
            .json(profile);
        let reply = self.send(request).await?;

        if !matches!(reply.status, StatusCode::OK | StatusCode::CREATED) {
            let fallback = if reply.is_success() {
                "Registration completion failed".to_string()
            } else {
                format!("Failed to complete registration ({})", reply.status.as_u16())
            };
            return Err(reply.error(fallback));
        }

        let token = string_at(&reply.body, &["/data/token", "/token"])
            .unwrap_or_else(|| temp_token.to_string());
        let user = first(&reply.body, &["/data/user", "/user"])
            .and_then(|user| serde_json::from_value(user.clone()).ok());

        Ok(Registration { token, user })
    }

    async fn get_user_profile(&self, jwt: &str) -> BookingResult<UserProfile> {
        let request = self.http.get(self.url("/user/profile")).bearer_auth(jwt);
        let body = self.send(request).await?.ok_or("Failed to get profile")?;
        decode(first_or_body(&body, &["/data/user", "/data"]), "profile")
    }

    async fn update_user_profile(
        &self,
        jwt: &str,
        update: &ProfileUpdate,
    ) -> BookingResult<UserProfile> {
        let request = self
            .http
            .patch(self.url("/user/profile"))
            .bearer_auth(jwt)
            .json(update);
        let body = self.send(request).await?.ok_or("Failed to update profile")?;
        decode(first_or_body(&body, &["/data/user"]), "profile")
    }

    async fn get_country_timezone(&self, country: &str) -> BookingResult<String> {
        let request = self
            .http
            .get(self.url(&format!("/countries/{}/timezone", encode(country))));
        let reply = self.send(request).await?;

        if !reply.is_success() {
            return Err(BookingError::Api {
                status: reply.status.as_u16(),
                message: format!("Failed to get country timezone ({})", reply.status.as_u16()),
            });
        }

        string_at(&reply.body, &["/data/timezone", "/timezone"])
            .ok_or_else(|| BookingError::NotFound("Timezone not found in response".to_string()))
    }

    async fn get_plans(&self) -> BookingResult<Vec<Plan>> {
        let request = self
            .http
            .get(self.url("/plans"))
            .query(&[("limit", "1000"), ("sort", "order")]);
        let body = self.send(request).await?.ok_or("Failed to fetch plans")?;

        let plans = plans_array(&body)
            .ok_or_else(|| BookingError::Internal(eyre!("Invalid plans data structure")))?;
        let plans: Vec<Plan> = decode_list(plans, "plan");
        debug!("Fetched {} plans", plans.len());
        Ok(plans)
    }

    async fn get_booked_slots(&self, date: Option<NaiveDate>) -> Vec<BookedSlot> {
        let mut request = self.http.get(self.url("/sessions/booked"));
        if let Some(date) = date {
            request = request.query(&[("date", date.format("%Y-%m-%d").to_string())]);
        }

        let reply = match self.send(request).await {
            Ok(reply) => reply,
            Err(e) => {
                warn!("Booked slots unavailable: {}", e);
                return Vec::new();
            }
        };

        if !reply.is_success() {
            if reply.status != StatusCode::NOT_FOUND {
                warn!("Booked slots request failed with {}", reply.status);
            }
            return Vec::new();
        }

        list_at(&reply.body, &["/data/bookedSlots", "/bookedSlots"], "booked slot")
    }

    async fn create_complete_subscription(
        &self,
        jwt: &str,
        request: &CompleteSubscriptionRequest,
    ) -> BookingResult<Value> {
        let payload = CompleteSubscriptionRequest {
            sessions: request
                .sessions
                .iter()
                .cloned()
                .map(|session| self.with_utc(session))
                .collect(),
            ..request.clone()
        };

        let http_request = self
            .http
            .post(self.url("/user/complete-subscription"))
            .bearer_auth(jwt)
            .json(&payload);
        let reply = self.send(http_request).await?;

        if !reply.is_success() {
            let message = failure_message(&reply.body);
            if reply.status == StatusCode::CONFLICT
                && message
                    .as_deref()
                    .is_some_and(|m| m.contains("already have an active subscription"))
            {
                return Err(BookingError::Conflict(ACTIVE_SUBSCRIPTION.to_string()));
            }
            return Err(reply.error("Failed to create complete subscription".to_string()));
        }

        info!(
            "Created subscription with {} sessions",
            payload.sessions.len()
        );
        Ok(first_or_body(&reply.body, &["/data/subscription"]).clone())
    }

    async fn create_subscription(
        &self,
        jwt: &str,
        plan_id: &str,
        start_date: NaiveDate,
    ) -> BookingResult<String> {
        let request = self
            .http
            .post(self.url("/user/subscriptions"))
            .bearer_auth(jwt)
            .json(&json!({
                "subscriptionPlanId": plan_id,
                "startDate": start_date.format("%Y-%m-%d").to_string(),
            }));
        let reply = self.send(request).await?;

        if !reply.is_success() {
            let fallback = match reply.status {
                StatusCode::BAD_REQUEST => "Invalid subscription data".to_string(),
                StatusCode::CONFLICT => ACTIVE_SUBSCRIPTION.to_string(),
                StatusCode::UNAUTHORIZED => "Authentication required".to_string(),
                status => format!("HTTP {}: {}", status.as_u16(), reason(status)),
            };
            return Err(reply.error(fallback));
        }

        subscription_id(&reply.body).ok_or_else(|| {
            BookingError::Internal(eyre!("Subscription ID missing in response"))
        })
    }

    async fn create_session(
        &self,
        jwt: &str,
        subscription_id: &str,
        session: &SelectedSession,
    ) -> BookingResult<Value> {
        let session = self.with_utc(session.clone());

        let request = self
            .http
            .post(self.url("/user/sessions"))
            .bearer_auth(jwt)
            .json(&json!({
                "subscriptionId": subscription_id,
                "date": session.date,
                "time": session.time.format("%H:%M").to_string(),
                "notes": session.notes,
                "startsAtUTC": session.starts_at_utc,
            }));
        let reply = self.send(request).await?;

        if !reply.is_success() {
            let fallback = match reply.status {
                StatusCode::BAD_REQUEST => {
                    "Invalid session data - check date, time, and subscription ID".to_string()
                }
                StatusCode::CONFLICT => {
                    "Session conflict - you may already have a session at this time".to_string()
                }
                StatusCode::UNAUTHORIZED => {
                    "Authentication required - please login again".to_string()
                }
                StatusCode::NOT_FOUND => {
                    "Subscription not found - please try selecting a package again".to_string()
                }
                StatusCode::INTERNAL_SERVER_ERROR => {
                    "Server error - please try again later".to_string()
                }
                status => format!("Server returned {}: {}", status.as_u16(), reason(status)),
            };
            return Err(reply.error(fallback));
        }

        Ok(reply.body)
    }

    async fn create_bulk_sessions(
        &self,
        jwt: &str,
        subscription_id: &str,
        sessions: &[SelectedSession],
    ) -> BookingResult<Value> {
        let request = self
            .http
            .post(self.url("/user/sessions/bulk"))
            .bearer_auth(jwt)
            .json(&json!({
                "subscriptionId": subscription_id,
                "sessions": sessions
                    .iter()
                    .cloned()
                    .map(|session| self.with_utc(session))
                    .collect::<Vec<_>>(),
            }));
        let reply = self.send(request).await?;

        if !reply.is_success() {
            let fallback = match reply.status {
                StatusCode::BAD_REQUEST => {
                    "Invalid sessions data - check dates, times, and subscription ID".to_string()
                }
                StatusCode::CONFLICT => {
                    "Session conflicts - some time slots might be already taken".to_string()
                }
                StatusCode::UNAUTHORIZED => {
                    "Authentication required - please login again".to_string()
                }
                StatusCode::NOT_FOUND => {
                    "Subscription not found - please try selecting a package again".to_string()
                }
                StatusCode::INTERNAL_SERVER_ERROR => {
                    "Server error - please try again later".to_string()
                }
                status => format!("Server returned {}: {}", status.as_u16(), reason(status)),
            };
            return Err(reply.error(fallback));
        }

        Ok(reply.body)
    }

    async fn send_confirmation_email(&self, email: &str, enrollment: &Value) -> BookingResult<()> {
        let request = self
            .http
            .post(self.url("/enrollment/confirm"))
            .json(&json!({ "email": email, "enrollmentData": enrollment }));
        let reply = self.send(request).await?;

        match reply.status {
            status if status.is_success() => Ok(()),
            StatusCode::NOT_FOUND => Err(BookingError::NotFound(
                "Email confirmation service not available".to_string(),
            )),
            status => Err(BookingError::Api {
                status: status.as_u16(),
                message: "Failed to send confirmation email".to_string(),
            }),
        }
    }

    async fn admin_login(&self, email: &str, password: &str) -> BookingResult<String> {
        let request = self
            .http
            .post(self.url("/admin/login"))
            .json(&json!({ "email": email, "password": password }));
        let body = self.send(request).await?.ok_or("Admin login failed")?;

        string_at(&body, &["/data/token", "/token"]).ok_or_else(|| {
            BookingError::Authentication("No token returned from admin login".to_string())
        })
    }

    async fn admin_request_password_reset(&self, email: &str) -> BookingResult<()> {
        let request = self
            .http
            .post(self.url("/admin/forgot-password"))
            .json(&json!({ "email": email }));
        self.send(request)
            .await?
            .ok_or("Failed to request password reset")?;
        Ok(())
    }

    async fn admin_confirm_password_reset(
        &self,
        token: &str,
        new_password: &str,
    ) -> BookingResult<()> {
        let request = self
            .http
            .post(self.url("/admin/password-reset/confirm"))
            .json(&json!({ "token": token, "password": new_password }));
        self.send(request)
            .await?
            .ok_or("Failed to confirm password reset")?;
        Ok(())
    }

    async fn admin_reset_password(
        &self,
        email: &str,
        otp: &str,
        new_password: &str,
    ) -> BookingResult<()> {
        let request = self
            .http
            .post(self.url("/admin/reset-password"))
            .json(&json!({ "email": email, "otp": otp, "password": new_password }));
        self.send(request).await?.ok_or("Failed to reset password")?;
        Ok(())
    }

    async fn admin_get_profile(&self, jwt: &str) -> BookingResult<AdminProfile> {
        let request = self.http.get(self.url("/admin/profile")).bearer_auth(jwt);
        let body = self
            .send(request)
            .await?
            .ok_or("Failed to fetch admin profile")?;
        decode(first_or_body(&body, &["/data/admin", "/admin", "/data"]), "admin profile")
    }

    async fn admin_get_subscriptions(
        &self,
        jwt: &str,
        query: &SubscriptionQuery,
    ) -> BookingResult<Vec<Subscription>> {
        let request = self
            .http
            .get(self.url("/admin/complete-subscriptions"))
            .bearer_auth(jwt)
            .query(&query.to_pairs());
        let body = self
            .send(request)
            .await?
            .ok_or("Failed to fetch subscriptions")?;

        Ok(list_at(&body, &["/data/subscriptions", "/subscriptions"], "subscription"))
    }

    async fn admin_get_subscription(
        &self,
        jwt: &str,
        subscription_id: &str,
    ) -> BookingResult<Subscription> {
        let request = self
            .http
            .get(self.url(&format!(
                "/admin/complete-subscriptions/{}",
                encode(subscription_id)
            )))
            .bearer_auth(jwt);
        let body = self
            .send(request)
            .await?
            .ok_or("Failed to fetch subscription")?;
        decode(
            first_or_body(&body, &["/data/subscription", "/subscription"]),
            "subscription",
        )
    }

    async fn admin_get_users(
        &self,
        jwt: &str,
        query: &UserQuery,
    ) -> BookingResult<Vec<UserProfile>> {
        let request = self
            .http
            .get(self.url("/admin/users"))
            .bearer_auth(jwt)
            .query(&query.to_pairs());
        let body = self.send(request).await?.ok_or("Failed to fetch users")?;

        Ok(list_at(&body, &["/data/users", "/users"], "user"))
    }

    async fn admin_delete_user(&self, jwt: &str, user_id: &str) -> BookingResult<String> {
        let request = self
            .http
            .delete(self.url(&format!("/admin/users/{}", encode(user_id))))
            .bearer_auth(jwt);
        let reply = self.send(request).await?;
        let message = reply.message_or("User deleted");
        reply.ok_or("Failed to delete user")?;
        Ok(message)
    }

    async fn admin_delete_subscription(
        &self,
        jwt: &str,
        subscription_id: &str,
    ) -> BookingResult<String> {
        let request = self
            .http
            .delete(self.url(&format!(
                "/admin/complete-subscriptions/{}",
                encode(subscription_id)
            )))
            .bearer_auth(jwt);
        let reply = self.send(request).await?;
        let message = reply.message_or("Subscription deleted");
        reply.ok_or("Failed to delete subscription")?;
        Ok(message)
    }

    async fn admin_confirm_payment(
        &self,
        jwt: &str,
        subscription_id: &str,
        payment_reference: Option<String>,
    ) -> BookingResult<Value> {
        let payload = match payment_reference {
            Some(reference) => json!({ "paymentReference": reference }),
            None => json!({}),
        };
        let request = self
            .http
            .patch(self.url(&format!(
                "/admin/complete-subscriptions/{}/confirm-payment",
                encode(subscription_id)
            )))
            .bearer_auth(jwt)
            .json(&payload);
        let body = self.send(request).await?.ok_or("Failed to confirm payment")?;

        info!("Payment confirmed for subscription {}", subscription_id);
        Ok(first_or_body(&body, &["/data"]).clone())
    }

    async fn admin_get_plans(&self, jwt: &str) -> BookingResult<Vec<Plan>> {
        let request = self
            .http
            .get(self.url("/admin/subscription-plans"))
            .bearer_auth(jwt);
        let body = self.send(request).await?.ok_or("Failed to fetch plans")?;

        Ok(plans_array(&body)
            .map(|plans| decode_list(plans, "plan"))
            .unwrap_or_default())
    }

    async fn admin_create_plan(&self, jwt: &str, draft: &PlanDraft) -> BookingResult<Plan> {
        let request = self
            .http
            .post(self.url("/admin/subscription-plans"))
            .bearer_auth(jwt)
            .json(draft);
        let body = self.send(request).await?.ok_or("Failed to create plan")?;
        decode(first_or_body(&body, &["/data/plan", "/plan"]), "plan")
    }

    async fn admin_update_plan(
        &self,
        jwt: &str,
        plan_id: &str,
        draft: &PlanDraft,
    ) -> BookingResult<Plan> {
        let request = self
            .http
            .put(self.url(&format!("/admin/subscription-plans/{}", encode(plan_id))))
            .bearer_auth(jwt)
            .json(draft);
        let body = self.send(request).await?.ok_or("Failed to update plan")?;
        decode(first_or_body(&body, &["/data/plan", "/plan"]), "plan")
    }

    async fn admin_delete_plan(&self, jwt: &str, plan_id: &str) -> BookingResult<String> {
        let request = self
            .http
            .delete(self.url(&format!("/admin/subscription-plans/{}", encode(plan_id))))
            .bearer_auth(jwt);
        let reply = self.send(request).await?;
        let message = reply.message_or("Plan deleted");
        reply.ok_or("Failed to delete plan")?;
        Ok(message)
    }

    async fn admin_reorder_plans(&self, jwt: &str, orders: &[PlanOrder]) -> BookingResult<String> {
        let request = self
            .http
            .post(self.url("/admin/subscription-plans/reorder"))
            .bearer_auth(jwt)
            .json(&json!({ "plans": orders }));
        let reply = self.send(request).await?;
        let message = reply.message_or("Plans reordered");
        reply.ok_or("Failed to reorder plans")?;
        Ok(message)
    }
}
