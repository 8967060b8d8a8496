//! Admin dashboard state: subscriptions, users and plans behind an admin
//! JWT, with optimistic local updates after each successful call.

use std::collections::HashMap;

use bayan_client::AppointmentApi;
use bayan_core::{
    errors::{BookingError, BookingResult},
    models::{
        AdminProfile, Plan, PlanDraft, PlanOrder, SessionRecord, Subscription, SubscriptionQuery,
        UserProfile, UserQuery,
    },
    timezone::{format_in_zone, parse_timezone},
};
use chrono_tz::Tz;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::order_store::{PlanOrderStore, apply_overrides};

pub const USER_PAGE_LIMIT: u32 = 200;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PaymentFilter {
    #[default]
    All,
    Paid,
    Pending,
}

impl PaymentFilter {
    pub fn matches(self, subscription: &Subscription) -> bool {
        match self {
            PaymentFilter::All => true,
            PaymentFilter::Paid => subscription.is_paid(),
            PaymentFilter::Pending => !subscription.is_paid(),
        }
    }
}

/// A destructive action waiting for the admin to confirm it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PendingAction {
    DeleteUser(String),
    DeleteSubscription(String),
    DeletePlan(String),
    ConfirmPayment {
        subscription_id: String,
        reference: Option<String>,
    },
}

impl PendingAction {
    pub fn prompt(&self) -> String {
        match self {
            PendingAction::DeleteUser(id) => format!("Delete user {id}? This cannot be undone."),
            PendingAction::DeleteSubscription(id) => {
                format!("Delete subscription {id}? This cannot be undone.")
            }
            PendingAction::DeletePlan(id) => format!("Delete plan {id}? This cannot be undone."),
            PendingAction::ConfirmPayment { subscription_id, .. } => {
                format!("Mark subscription {subscription_id} as paid?")
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub total_users: usize,
    pub total_subscriptions: usize,
    pub paid_subscriptions: usize,
    /// Sum of prices over paid subscriptions
    pub revenue: f64,
}

/// One session of an expanded subscription, shown in both zones.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionDisplay {
    pub user_date: Option<String>,
    pub user_time: Option<String>,
    /// Instant in the student's zone, when both are known
    pub student_time: Option<String>,
    /// Instant in the admin's zone
    pub admin_time: Option<String>,
    pub status: Option<String>,
}

impl SessionDisplay {
    fn new(record: &SessionRecord, student_tz: Option<Tz>, admin_tz: Tz) -> Self {
        let instant = record.utc_instant();
        Self {
            user_date: record.user_date().map(str::to_string),
            user_time: record.user_time().map(str::to_string),
            student_time: instant
                .zip(student_tz)
                .map(|(instant, tz)| format_in_zone(instant, tz)),
            admin_time: instant.map(|instant| format_in_zone(instant, admin_tz)),
            status: record.status.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SubscriptionDetail {
    pub subscription: Subscription,
    pub sessions: Vec<SessionDisplay>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReorderOutcome {
    /// Stored locally and accepted by the backend.
    Synced(String),
    /// Stored locally only; carries the warning to show.
    LocalOnly(String),
}

pub struct AdminDashboard<A: AppointmentApi> {
    api: A,
    store: PlanOrderStore,
    token: Option<String>,
    profile: Option<AdminProfile>,
    timezone: Tz,
    subscriptions: Vec<Subscription>,
    users: Vec<UserProfile>,
    plans: Vec<Plan>,
    expanded: HashMap<String, SubscriptionDetail>,
    pending: Option<PendingAction>,
}

impl<A: AppointmentApi> AdminDashboard<A> {
    /// `timezone` is the admin's detected zone until a profile says otherwise.
    pub fn new(api: A, store: PlanOrderStore, timezone: Tz) -> Self {
        Self {
            api,
            store,
            token: None,
            profile: None,
            timezone,
            subscriptions: Vec::new(),
            users: Vec::new(),
            plans: Vec::new(),
            expanded: HashMap::new(),
            pending: None,
        }
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    pub fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }

    pub fn profile(&self) -> Option<&AdminProfile> {
        self.profile.as_ref()
    }

    pub fn timezone(&self) -> Tz {
        self.timezone
    }

    pub fn subscriptions(&self) -> &[Subscription] {
        &self.subscriptions
    }

    pub fn users(&self) -> &[UserProfile] {
        &self.users
    }

    pub fn plans(&self) -> &[Plan] {
        &self.plans
    }

    pub fn pending(&self) -> Option<&PendingAction> {
        self.pending.as_ref()
    }

    pub fn expanded(&self, subscription_id: &str) -> Option<&SubscriptionDetail> {
        self.expanded.get(subscription_id)
    }

    pub async fn login(&mut self, email: &str, password: &str) -> BookingResult<()> {
        let email = email.trim();
        if email.is_empty() || password.is_empty() {
            return Err(BookingError::Validation(
                "Email and password are required".to_string(),
            ));
        }

        let token = self.api.admin_login(email, password).await?;
        info!("Admin {} logged in", email);
        self.token = Some(token);

        if let Err(e) = self.load_profile().await {
            warn!("Admin profile unavailable: {}", e.user_message());
        }
        Ok(())
    }

    pub fn logout(&mut self) {
        self.clear_session();
        self.subscriptions.clear();
        self.users.clear();
        self.plans.clear();
    }

    pub async fn request_password_reset(&self, email: &str) -> BookingResult<()> {
        let email = email.trim();
        if email.is_empty() {
            return Err(BookingError::Validation(
                "Please enter your admin email".to_string(),
            ));
        }
        self.api.admin_request_password_reset(email).await
    }

    /// Finish a reset started from an emailed link.
    pub async fn confirm_password_reset(
        &self,
        reset_token: &str,
        new_password: &str,
    ) -> BookingResult<()> {
        if reset_token.trim().is_empty() || new_password.is_empty() {
            return Err(BookingError::Validation(
                "Reset token and new password required".to_string(),
            ));
        }
        self.api
            .admin_confirm_password_reset(reset_token.trim(), new_password)
            .await
    }

    /// Finish a reset started with an emailed OTP.
    pub async fn reset_password(
        &self,
        email: &str,
        otp: &str,
        new_password: &str,
    ) -> BookingResult<()> {
        let (email, otp) = (email.trim(), otp.trim());
        if email.is_empty() || otp.is_empty() || new_password.is_empty() {
            return Err(BookingError::Validation(
                "Email, OTP and new password required".to_string(),
            ));
        }
        self.api.admin_reset_password(email, otp, new_password).await
    }

    pub async fn load_profile(&mut self) -> BookingResult<&AdminProfile> {
        let jwt = self.jwt()?;
        let result = self.api.admin_get_profile(&jwt).await;
        let profile = self.guard(result)?;

        match profile.timezone.as_deref().map(parse_timezone) {
            Some(Ok(tz)) => self.timezone = tz,
            Some(Err(e)) => warn!("Ignoring admin timezone: {}", e.user_message()),
            None => {}
        }
        Ok(self.profile.insert(profile))
    }

    pub fn set_timezone(&mut self, name: &str) -> BookingResult<Tz> {
        let tz = parse_timezone(name)?;
        self.timezone = tz;
        if let Some(profile) = self.profile.as_mut() {
            profile.timezone = Some(tz.name().to_string());
        }
        Ok(tz)
    }

    pub async fn refresh_subscriptions(
        &mut self,
        query: &SubscriptionQuery,
    ) -> BookingResult<&[Subscription]> {
        let jwt = self.jwt()?;
        let result = self.api.admin_get_subscriptions(&jwt, query).await;
        match self.guard(result) {
            Ok(subscriptions) => {
                debug!("Loaded {} subscriptions", subscriptions.len());
                self.subscriptions = subscriptions;
                Ok(&self.subscriptions)
            }
            Err(e) => {
                self.subscriptions.clear();
                Err(e)
            }
        }
    }

    pub async fn refresh_users(&mut self) -> BookingResult<&[UserProfile]> {
        let jwt = self.jwt()?;
        let query = UserQuery {
            limit: Some(USER_PAGE_LIMIT),
            ..UserQuery::default()
        };
        let result = self.api.admin_get_users(&jwt, &query).await;
        match self.guard(result) {
            Ok(users) => {
                debug!("Loaded {} users", users.len());
                self.users = users;
                Ok(&self.users)
            }
            Err(e) => {
                self.users.clear();
                Err(e)
            }
        }
    }

    /// Reload plans, applying locally stored order overrides.
    pub async fn refresh_plans(&mut self) -> BookingResult<&[Plan]> {
        let jwt = self.jwt()?;
        let result = self.api.admin_get_plans(&jwt).await;
        let mut plans = match self.guard(result) {
            Ok(plans) => plans,
            Err(e) => {
                self.plans.clear();
                return Err(e);
            }
        };

        match self.store.load() {
            Ok(overrides) => apply_overrides(&mut plans, &overrides),
            Err(e) => warn!("Ignoring plan order overrides: {}", e.user_message()),
        }
        debug!("Loaded {} plans", plans.len());
        self.plans = plans;
        Ok(&self.plans)
    }

    pub fn stats(&self) -> DashboardStats {
        let paid: Vec<&Subscription> = self.subscriptions.iter().filter(|s| s.is_paid()).collect();
        DashboardStats {
            total_users: self.users.len(),
            total_subscriptions: self.subscriptions.len(),
            paid_subscriptions: paid.len(),
            revenue: paid.iter().filter_map(|s| s.effective_price()).sum(),
        }
    }

    pub fn filtered_subscriptions(&self, filter: PaymentFilter) -> Vec<&Subscription> {
        self.subscriptions
            .iter()
            .filter(|s| filter.matches(s))
            .collect()
    }

    /// Plans by display order; ties keep their fetched order.
    pub fn sorted_plans(&self) -> Vec<&Plan> {
        let mut plans: Vec<&Plan> = self.plans.iter().collect();
        plans.sort_by_key(|plan| plan.sort_order());
        plans
    }

    /// Move a plan within the sorted list and renumber every plan.
    pub fn move_plan(&mut self, from: usize, to: usize) -> BookingResult<()> {
        let len = self.plans.len();
        if from >= len || to >= len {
            return Err(BookingError::Validation(format!(
                "Plan position out of range (0..{len})"
            )));
        }

        let mut sorted: Vec<Plan> = self.sorted_plans().into_iter().cloned().collect();
        let plan = sorted.remove(from);
        sorted.insert(to, plan);
        for (index, plan) in sorted.iter_mut().enumerate() {
            plan.order = Some(index as i64);
        }
        self.plans = sorted;
        Ok(())
    }

    /// Persist the current order locally, then try the backend.
    pub async fn finish_reorder(&mut self) -> BookingResult<ReorderOutcome> {
        let orders: Vec<PlanOrder> = self
            .sorted_plans()
            .into_iter()
            .enumerate()
            .filter_map(|(index, plan)| {
                plan.plan_id().map(|id| PlanOrder {
                    plan_id: id.to_string(),
                    order: index as i64,
                })
            })
            .collect();

        self.store.save(&orders)?;
        info!("Saved order of {} plans to {}", orders.len(), self.store.path().display());

        let Some(jwt) = self.token.clone() else {
            return Ok(ReorderOutcome::LocalOnly(
                "Order saved locally. Log in to sync it".to_string(),
            ));
        };

        let result = self.api.admin_reorder_plans(&jwt, &orders).await;
        match self.guard(result) {
            Ok(message) => Ok(ReorderOutcome::Synced(message)),
            Err(e) => {
                let warning = format!(
                    "Order saved locally. Backend sync failed: {}",
                    e.user_message()
                );
                warn!("{}", warning);
                Ok(ReorderOutcome::LocalOnly(warning))
            }
        }
    }

    /// Create a plan, or update `existing_id`. New plans without an order go last.
    pub async fn save_plan(
        &mut self,
        draft: PlanDraft,
        existing_id: Option<String>,
    ) -> BookingResult<Plan> {
        let jwt = self.jwt()?;

        if let Some(id) = existing_id {
            let result = self.api.admin_update_plan(&jwt, &id, &draft).await;
            let plan = self.guard(result)?;
            info!("Updated plan {}", id);
            match self.plans.iter_mut().find(|p| p.plan_id() == Some(id.as_str())) {
                Some(slot) => *slot = plan.clone(),
                None => self.plans.push(plan.clone()),
            }
            return Ok(plan);
        }

        let result = self.api.admin_create_plan(&jwt, &draft).await;
        let mut plan = self.guard(result)?;
        if plan.order.is_none() {
            let max = self.plans.iter().filter_map(|p| p.order).max().unwrap_or(-1);
            plan.order = Some(max + 1);
        }
        info!("Created plan {}", plan.name);
        self.plans.push(plan.clone());
        Ok(plan)
    }

    /// Expand a subscription (fetching its sessions) or collapse it.
    pub async fn toggle_subscription(
        &mut self,
        subscription_id: &str,
    ) -> BookingResult<Option<&SubscriptionDetail>> {
        if self.expanded.remove(subscription_id).is_some() {
            return Ok(None);
        }

        let jwt = self.jwt()?;
        let result = self.api.admin_get_subscription(&jwt, subscription_id).await;
        let subscription = self.guard(result)?;

        let student_tz = subscription
            .student_timezone()
            .and_then(|name| parse_timezone(name).ok());
        let sessions = subscription
            .sessions
            .iter()
            .map(|record| SessionDisplay::new(record, student_tz, self.timezone))
            .collect();

        if let Some(row) = self
            .subscriptions
            .iter_mut()
            .find(|s| s.subscription_key() == Some(subscription_id))
        {
            merge_user_names(row, &subscription);
        }

        let detail = SubscriptionDetail {
            subscription,
            sessions,
        };
        let detail = self
            .expanded
            .entry(subscription_id.to_string())
            .or_insert(detail);
        Ok(Some(&*detail))
    }

    pub fn request(&mut self, action: PendingAction) -> String {
        let prompt = action.prompt();
        self.pending = Some(action);
        prompt
    }

    pub fn cancel_pending(&mut self) -> Option<PendingAction> {
        self.pending.take()
    }

    /// Run the pending action; `Ok(None)` when nothing was pending.
    pub async fn confirm_pending(&mut self) -> BookingResult<Option<String>> {
        let Some(action) = self.pending.take() else {
            return Ok(None);
        };
        let jwt = self.jwt()?;

        let message = match action {
            PendingAction::DeleteUser(id) => {
                let result = self.api.admin_delete_user(&jwt, &id).await;
                let message = self.guard(result)?;
                self.users.retain(|u| u.user_id() != Some(id.as_str()));
                message
            }
            PendingAction::DeleteSubscription(id) => {
                let result = self.api.admin_delete_subscription(&jwt, &id).await;
                let message = self.guard(result)?;
                self.subscriptions
                    .retain(|s| s.subscription_key() != Some(id.as_str()));
                self.expanded.remove(&id);
                message
            }
            PendingAction::DeletePlan(id) => {
                let result = self.api.admin_delete_plan(&jwt, &id).await;
                let message = self.guard(result)?;
                self.plans.retain(|p| p.plan_id() != Some(id.as_str()));
                message
            }
            PendingAction::ConfirmPayment {
                subscription_id,
                reference,
            } => {
                self.confirm_payment(&subscription_id, reference).await?;
                "Payment confirmed".to_string()
            }
        };
        info!("{}", message);
        Ok(Some(message))
    }

    /// Confirm a payment and mark the row paid without refetching.
    pub async fn confirm_payment(
        &mut self,
        subscription_id: &str,
        reference: Option<String>,
    ) -> BookingResult<()> {
        let jwt = self.jwt()?;
        let result = self
            .api
            .admin_confirm_payment(&jwt, subscription_id, reference.clone())
            .await;
        let response = self.guard(result)?;

        let confirmed_reference = response
            .pointer("/payment/paymentReference")
            .or_else(|| response.get("paymentReference"))
            .and_then(Value::as_str)
            .map(str::to_string)
            .or(reference);

        if let Some(row) = self
            .subscriptions
            .iter_mut()
            .find(|s| s.subscription_key() == Some(subscription_id))
        {
            row.payment_status = Some("paid".to_string());
            if confirmed_reference.is_some() {
                row.payment_reference = confirmed_reference;
            }
        }
        Ok(())
    }

    fn jwt(&self) -> BookingResult<String> {
        self.token
            .clone()
            .ok_or_else(|| BookingError::Authentication("Admin login required".to_string()))
    }

    /// Drop the token when the backend rejects it.
    fn guard<T>(&mut self, result: BookingResult<T>) -> BookingResult<T> {
        if let Err(e) = &result {
            if e.is_auth_failure() {
                warn!("Admin session rejected: {}", e.user_message());
                self.clear_session();
            }
        }
        result
    }

    fn clear_session(&mut self) {
        self.token = None;
        self.profile = None;
        self.expanded.clear();
        self.pending = None;
    }
}

/// Copy the names a detail response carries onto the list row.
fn merge_user_names(row: &mut Subscription, detail: &Subscription) {
    if let Some(user) = &detail.user {
        let merged = row.user.get_or_insert_with(UserProfile::default);
        let fields = [
            (&mut merged.first_name, &user.first_name),
            (&mut merged.last_name, &user.last_name),
            (&mut merged.email, &user.email),
            (&mut merged.phone, &user.phone),
            (&mut merged.timezone, &user.timezone),
        ];
        for (target, value) in fields {
            if value.is_some() {
                target.clone_from(value);
            }
        }
    }

    let first_name = detail.display_first_name().map(str::to_string);
    let last_name = detail.display_last_name().map(str::to_string);
    if first_name.is_some() {
        row.first_name = first_name;
    }
    if last_name.is_some() {
        row.last_name = last_name;
    }
}
