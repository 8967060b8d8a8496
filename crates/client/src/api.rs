use async_trait::async_trait;
use bayan_core::{
    errors::BookingResult,
    models::{
        AdminProfile, AuthToken, BookedSlot, CompleteSubscriptionRequest, Plan, PlanDraft,
        PlanOrder, ProfileUpdate, Registration, RegistrationProfile, SelectedSession,
        Subscription, SubscriptionQuery, UserProfile, UserQuery,
    },
};
use chrono::NaiveDate;
use mockall::automock;
use serde_json::Value;

/// Every call the enrollment and admin flows make against the booking API.
///
/// Failures carry the message a view should show; see
/// [`bayan_core::errors::BookingError::user_message`].
#[automock]
#[async_trait]
pub trait AppointmentApi: Send + Sync {
    async fn send_login_otp(&self, email: &str) -> BookingResult<()>;

    async fn send_registration_otp(&self, email: &str) -> BookingResult<()>;

    /// A `Temporary` token means the account still has to finish registration.
    async fn verify_otp(&self, email: &str, otp: &str) -> BookingResult<AuthToken>;

    async fn complete_registration(
        &self,
        temp_token: &str,
        profile: &RegistrationProfile,
    ) -> BookingResult<Registration>;

    async fn get_user_profile(&self, jwt: &str) -> BookingResult<UserProfile>;

    async fn update_user_profile(
        &self,
        jwt: &str,
        update: &ProfileUpdate,
    ) -> BookingResult<UserProfile>;

    async fn get_country_timezone(&self, country: &str) -> BookingResult<String>;

    async fn get_plans(&self) -> BookingResult<Vec<Plan>>;

    /// Slots other students hold. Never fails; an unavailable endpoint
    /// yields an empty list.
    async fn get_booked_slots(&self, date: Option<NaiveDate>) -> Vec<BookedSlot>;

    async fn create_complete_subscription(
        &self,
        jwt: &str,
        request: &CompleteSubscriptionRequest,
    ) -> BookingResult<Value>;

    /// Returns the new subscription id.
    async fn create_subscription(
        &self,
        jwt: &str,
        plan_id: &str,
        start_date: NaiveDate,
    ) -> BookingResult<String>;

    async fn create_session(
        &self,
        jwt: &str,
        subscription_id: &str,
        session: &SelectedSession,
    ) -> BookingResult<Value>;

    async fn create_bulk_sessions(
        &self,
        jwt: &str,
        subscription_id: &str,
        sessions: &[SelectedSession],
    ) -> BookingResult<Value>;

    async fn send_confirmation_email(&self, email: &str, enrollment: &Value) -> BookingResult<()>;

    /// Returns the admin JWT.
    async fn admin_login(&self, email: &str, password: &str) -> BookingResult<String>;

    async fn admin_request_password_reset(&self, email: &str) -> BookingResult<()>;

    async fn admin_confirm_password_reset(
        &self,
        token: &str,
        new_password: &str,
    ) -> BookingResult<()>;

    async fn admin_reset_password(
        &self,
        email: &str,
        otp: &str,
        new_password: &str,
    ) -> BookingResult<()>;

    async fn admin_get_profile(&self, jwt: &str) -> BookingResult<AdminProfile>;

    async fn admin_get_subscriptions(
        &self,
        jwt: &str,
        query: &SubscriptionQuery,
    ) -> BookingResult<Vec<Subscription>>;

    async fn admin_get_subscription(
        &self,
        jwt: &str,
        subscription_id: &str,
    ) -> BookingResult<Subscription>;

    async fn admin_get_users(
        &self,
        jwt: &str,
        query: &UserQuery,
    ) -> BookingResult<Vec<UserProfile>>;

    async fn admin_delete_user(&self, jwt: &str, user_id: &str) -> BookingResult<String>;

    async fn admin_delete_subscription(
        &self,
        jwt: &str,
        subscription_id: &str,
    ) -> BookingResult<String>;

    async fn admin_confirm_payment(
        &self,
        jwt: &str,
        subscription_id: &str,
        payment_reference: Option<String>,
    ) -> BookingResult<Value>;

    async fn admin_get_plans(&self, jwt: &str) -> BookingResult<Vec<Plan>>;

    async fn admin_create_plan(&self, jwt: &str, draft: &PlanDraft) -> BookingResult<Plan>;

    async fn admin_update_plan(
        &self,
        jwt: &str,
        plan_id: &str,
        draft: &PlanDraft,
    ) -> BookingResult<Plan>;

    async fn admin_delete_plan(&self, jwt: &str, plan_id: &str) -> BookingResult<String>;

    async fn admin_reorder_plans(&self, jwt: &str, orders: &[PlanOrder]) -> BookingResult<String>;
}
