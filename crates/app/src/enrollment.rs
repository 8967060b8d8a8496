//! The student enrollment flow: email verification, personal details,
//! package choice and session scheduling, ending in one complete
//! subscription request.

use bayan_client::AppointmentApi;
use bayan_core::{
    booking::{DayState, Quota, SessionSelection, SlotView, Toggle, format_week_range, is_bookable},
    errors::{BookingError, BookingResult},
    models::{
        AuthToken, BookedSlot, CompleteSubscriptionRequest, Gender, PersonalInfo, Plan,
        RegistrationProfile, SelectedSession, UserProfile,
    },
    regions::timezone_for_region,
    slots::{Slot, WorkingHours, generate_slots},
    timezone::{OffsetRule, parse_timezone},
};
use chrono::{NaiveDate, Utc};
use chrono_tz::Tz;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::config::AppConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Step {
    Email,
    Otp,
    PersonalInfo,
    Package,
    Schedule,
    Confirmation,
}

/// Where the scheduling timezone came from. Only a `Detected` zone is
/// replaced when the student's country becomes known.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimezoneSource {
    Detected,
    Profile,
    Country,
    Manual,
}

/// Why a submission did not go through.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SubmissionFailure {
    /// The wizard is missing something the request needs.
    #[error("{0}")]
    Incomplete(String),

    #[error("You already have an active subscription to this plan")]
    ActiveSubscription,

    #[error("Selected plan is not available. Please choose another plan.")]
    PlanUnavailable,

    #[error("Payment issue. Please check your payment details.")]
    Payment,

    #[error("Network issue. Please check your connection and try again.")]
    Network,

    #[error("Failed to create subscription: {0}")]
    Other(String),
}

impl SubmissionFailure {
    pub fn classify(err: &BookingError) -> Self {
        let message = err.user_message();
        let lower = message.to_lowercase();

        if lower.contains("already have an active subscription") {
            SubmissionFailure::ActiveSubscription
        } else if lower.contains("plan not found") {
            SubmissionFailure::PlanUnavailable
        } else if lower.contains("insufficient") {
            SubmissionFailure::Payment
        } else if matches!(err, BookingError::Network(_))
            || lower.contains("network")
            || lower.contains("connection")
        {
            SubmissionFailure::Network
        } else {
            SubmissionFailure::Other(message)
        }
    }
}

/// Scheduling defaults the wizard starts from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WizardSettings {
    /// Zone used until a better one is known
    pub detected_timezone: Tz,
    pub hours: WorkingHours,
    pub offset_rule: OffsetRule,
}

impl WizardSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            detected_timezone: config.client.timezone,
            hours: config.working_hours(),
            offset_rule: config.offset_rule,
        }
    }
}

impl Default for WizardSettings {
    fn default() -> Self {
        Self {
            detected_timezone: chrono_tz::UTC,
            hours: WorkingHours::standard(),
            offset_rule: OffsetRule::Heuristic,
        }
    }
}

/// Body of the confirmation email request.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrollmentSummary {
    pub personal_info: PersonalInfo,
    pub package: Plan,
    pub sessions: Vec<SelectedSession>,
    pub timezone: String,
    pub subscription: Value,
}

pub struct EnrollmentWizard<A: AppointmentApi> {
    api: A,
    settings: WizardSettings,
    step: Step,
    returning: bool,
    logged_in: bool,
    token: Option<AuthToken>,
    personal: PersonalInfo,
    plans: Vec<Plan>,
    plan: Option<Plan>,
    selection: SessionSelection,
    timezone: Tz,
    timezone_source: TimezoneSource,
    selected_date: Option<NaiveDate>,
    booked: Vec<BookedSlot>,
    subscription: Option<Value>,
    today: Option<NaiveDate>,
}

impl<A: AppointmentApi> EnrollmentWizard<A> {
    pub fn new(api: A, settings: WizardSettings) -> Self {
        Self {
            api,
            settings,
            step: Step::Email,
            returning: false,
            logged_in: false,
            token: None,
            personal: PersonalInfo::default(),
            plans: Vec::new(),
            plan: None,
            selection: SessionSelection::default(),
            timezone: settings.detected_timezone,
            timezone_source: TimezoneSource::Detected,
            selected_date: None,
            booked: Vec::new(),
            subscription: None,
            today: None,
        }
    }

    /// Pin "today" instead of reading the clock.
    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = Some(today);
        self
    }

    pub fn step(&self) -> Step {
        self.step
    }

    pub fn is_logged_in(&self) -> bool {
        self.logged_in
    }

    pub fn token(&self) -> Option<&AuthToken> {
        self.token.as_ref()
    }

    pub fn personal_info(&self) -> &PersonalInfo {
        &self.personal
    }

    pub fn plans(&self) -> &[Plan] {
        &self.plans
    }

    pub fn selected_plan(&self) -> Option<&Plan> {
        self.plan.as_ref()
    }

    pub fn selection(&self) -> &SessionSelection {
        &self.selection
    }

    pub fn timezone(&self) -> Tz {
        self.timezone
    }

    pub fn timezone_source(&self) -> TimezoneSource {
        self.timezone_source
    }

    pub fn selected_date(&self) -> Option<NaiveDate> {
        self.selected_date
    }

    pub fn booked_slots(&self) -> &[BookedSlot] {
        &self.booked
    }

    pub fn subscription(&self) -> Option<&Value> {
        self.subscription.as_ref()
    }

    /// Today in the scheduling zone.
    pub fn today(&self) -> NaiveDate {
        self.today
            .unwrap_or_else(|| Utc::now().with_timezone(&self.timezone).date_naive())
    }

    /// Send a one-time code. `returning` picks the login flow over registration.
    pub async fn request_otp(&mut self, email: &str, returning: bool) -> BookingResult<()> {
        let email = sanitize_text(email);
        if !is_valid_email(&email) {
            return Err(BookingError::Validation(
                "Please enter a valid email address".to_string(),
            ));
        }

        if returning {
            self.api.send_login_otp(&email).await?;
        } else {
            self.api.send_registration_otp(&email).await?;
        }

        info!("Sent {} code to {}", if returning { "login" } else { "registration" }, email);
        self.personal.email = email;
        self.returning = returning;
        self.step = Step::Otp;
        Ok(())
    }

    /// Check the code and move to the step the token allows.
    pub async fn verify_otp(&mut self, code: &str) -> BookingResult<Step> {
        if self.personal.email.is_empty() {
            return Err(BookingError::Validation(
                "Please request a verification code first".to_string(),
            ));
        }
        let code = code.trim();
        if code.len() != 6 || !code.chars().all(|c| c.is_ascii_digit()) {
            return Err(BookingError::Validation(
                "Please enter a valid 6-digit OTP".to_string(),
            ));
        }

        let email = self.personal.email.clone();
        let token = self.api.verify_otp(&email, code).await?;

        if !self.returning && token.is_temporary() {
            debug!("New account for {}, collecting personal info", email);
            self.token = Some(token);
            self.step = Step::PersonalInfo;
            return Ok(self.step);
        }

        let jwt = token.as_str().to_string();
        self.token = Some(token);
        self.logged_in = true;
        self.step = Step::Package;
        self.load_profile(&jwt).await;
        Ok(self.step)
    }

    /// Validate and store personal details, completing registration for a
    /// new account.
    pub async fn submit_personal_info(&mut self, info: PersonalInfo) -> BookingResult<()> {
        let mut info = sanitize_personal_info(info);
        if info.email.is_empty() {
            info.email = self.personal.email.clone();
        }

        let missing = info.missing_fields();
        if !missing.is_empty() {
            debug!("Personal info missing {:?}", missing);
            return Err(BookingError::Validation(
                "Please fill in all required fields".to_string(),
            ));
        }

        self.personal = info;
        self.timezone_source = TimezoneSource::Detected;
        self.preselect_timezone().await;

        if !self.logged_in {
            self.complete_registration().await?;
        }

        self.step = Step::Package;
        Ok(())
    }

    async fn complete_registration(&mut self) -> BookingResult<()> {
        let Some(temp_token) = self.token.as_ref().map(|t| t.as_str().to_string()) else {
            warn!("No authentication token, continuing without registration");
            self.logged_in = true;
            return Ok(());
        };
        let Some(gender) = self.personal.gender else {
            return Err(BookingError::Validation(
                "Please fill in all required fields".to_string(),
            ));
        };

        let profile = RegistrationProfile {
            first_name: self.personal.first_name.clone(),
            last_name: self.personal.last_name.clone(),
            phone: self.personal.phone.clone(),
            gender,
            country: self.personal.country.clone(),
            timezone: Some(self.timezone.name().to_string()),
        };

        match self.api.complete_registration(&temp_token, &profile).await {
            Ok(registration) => {
                info!("Registration completed for {}", self.personal.email);
                self.token = Some(AuthToken::Permanent(registration.token));
                self.logged_in = true;
                Ok(())
            }
            Err(e) => {
                let message = e.user_message();
                if message.contains("already completed")
                    || message.contains("No authentication token")
                {
                    warn!("Registration already done: {}", message);
                    self.logged_in = true;
                    Ok(())
                } else {
                    Err(BookingError::Validation(format!("Registration failed: {message}")))
                }
            }
        }
    }

    /// Active plans in display order.
    pub async fn load_plans(&mut self) -> BookingResult<&[Plan]> {
        let mut plans: Vec<Plan> = self
            .api
            .get_plans()
            .await?
            .into_iter()
            .filter(|plan| plan.is_active != Some(false))
            .collect();
        plans.sort_by_key(Plan::sort_order);

        debug!("Loaded {} plans", plans.len());
        self.plans = plans;
        Ok(&self.plans)
    }

    pub async fn select_package(&mut self, plan: Plan) -> BookingResult<()> {
        if plan.plan_id().is_none() {
            return Err(BookingError::Validation(
                "Selected plan has no identifier".to_string(),
            ));
        }

        let changed = self.plan.as_ref().and_then(Plan::plan_id) != plan.plan_id();
        if changed {
            self.selection.clear();
            self.selected_date = None;
        }
        self.selection.set_quota(Quota::for_plan(&plan));
        info!(
            "Selected plan {} ({} sessions, {} per week)",
            plan.name,
            self.selection.quota().total,
            self.selection.quota().per_week
        );
        self.plan = Some(plan);

        if self.timezone_source == TimezoneSource::Detected {
            self.preselect_timezone().await;
        }
        self.refresh_booked_slots().await;
        self.step = Step::Schedule;
        Ok(())
    }

    /// Switch the scheduling zone. Existing picks keep their UTC instants and
    /// move to the new zone's dates; picks that overflow a week are dropped.
    pub fn set_timezone(&mut self, name: &str) -> BookingResult<Tz> {
        let tz = parse_timezone(name)?;
        self.switch_timezone(tz, TimezoneSource::Manual);
        Ok(tz)
    }

    pub fn select_date(&mut self, date: NaiveDate) -> BookingResult<Vec<SlotView>> {
        match self.selection.day_state(date, self.today()) {
            DayState::Past => {
                return Err(BookingError::Validation(
                    "Past dates and today cannot be booked".to_string(),
                ));
            }
            DayState::WeekFull => {
                let quota = self.selection.quota();
                return Err(BookingError::Validation(format!(
                    "Week full ({}/{} sessions used) for {}",
                    self.selection.sessions_in_week(date),
                    quota.per_week,
                    format_week_range(date)
                )));
            }
            DayState::Selected | DayState::Available => {}
        }

        self.selected_date = Some(date);
        Ok(self.slot_views())
    }

    /// Slots of the selected date with their booking state.
    pub fn slot_views(&self) -> Vec<SlotView> {
        match self.selected_date {
            Some(date) => {
                let slots = self.slots_for(date);
                self.selection.slot_views(&slots, &self.booked)
            }
            None => Vec::new(),
        }
    }

    pub fn slots_for(&self, date: NaiveDate) -> Vec<Slot> {
        generate_slots(date, &self.settings.hours, self.timezone, self.settings.offset_rule)
    }

    pub fn toggle_slot(&mut self, slot: &Slot) -> BookingResult<Toggle> {
        if self.plan.is_none() {
            return Err(BookingError::Validation("Please select a package first.".to_string()));
        }
        if !self.selection.is_selected(slot) && !is_bookable(slot.local_date(), self.today()) {
            return Err(BookingError::Validation(
                "Past dates and today cannot be booked".to_string(),
            ));
        }

        let toggle = self.selection.toggle(slot.to_session(), &self.booked)?;
        debug!(
            "{:?} {} {} ({}/{})",
            toggle,
            slot.local_date(),
            slot.local_time(),
            self.selection.len(),
            self.selection.quota().total
        );
        Ok(toggle)
    }

    /// Reload booked slots and drop picks that were taken meanwhile.
    pub async fn refresh_booked_slots(&mut self) -> Vec<SelectedSession> {
        self.booked = self.api.get_booked_slots(None).await;
        let dropped = self.selection.reconcile(&self.booked);
        if !dropped.is_empty() {
            warn!("{} selected sessions were booked by someone else", dropped.len());
        }
        dropped
    }

    pub fn can_submit(&self) -> bool {
        self.plan.is_some() && self.selection.is_complete()
    }

    /// Create the subscription with every picked session.
    pub async fn submit(&mut self) -> Result<Value, SubmissionFailure> {
        let jwt = self
            .token
            .as_ref()
            .map(|t| t.as_str().to_string())
            .ok_or_else(|| {
                SubmissionFailure::Incomplete(
                    "Authentication required. Please verify your email first.".to_string(),
                )
            })?;
        let plan = self
            .plan
            .clone()
            .ok_or_else(|| {
                SubmissionFailure::Incomplete("Please select a package first.".to_string())
            })?;
        let plan_id = plan
            .plan_id()
            .map(str::to_string)
            .ok_or_else(|| {
                SubmissionFailure::Incomplete("Please select a package first.".to_string())
            })?;
        if self.personal.country.trim().is_empty() {
            return Err(SubmissionFailure::Incomplete(
                "Country information is required. Please complete your profile.".to_string(),
            ));
        }
        if !self.selection.is_complete() {
            return Err(SubmissionFailure::Incomplete(format!(
                "Please select {} sessions",
                self.selection.quota().total
            )));
        }

        let notes = format!("{} session", plan.name);
        let sessions: Vec<SelectedSession> = self
            .selection
            .sessions()
            .iter()
            .cloned()
            .map(|session| session.with_notes(notes.clone()))
            .collect();

        let request = CompleteSubscriptionRequest {
            subscription_plan_id: plan_id,
            start_date: self.today(),
            sessions: sessions.clone(),
            user_country: Some(self.personal.country.clone()),
        };

        let subscription = match self.api.create_complete_subscription(&jwt, &request).await {
            Ok(subscription) => subscription,
            Err(e) => {
                let failure = SubmissionFailure::classify(&e);
                error!("Subscription failed: {} ({:?})", e, failure);
                return Err(failure);
            }
        };

        info!("Subscription created with {} sessions", sessions.len());
        self.subscription = Some(subscription.clone());
        self.step = Step::Confirmation;

        let summary = EnrollmentSummary {
            personal_info: self.personal.clone(),
            package: plan,
            sessions,
            timezone: self.timezone.name().to_string(),
            subscription: subscription.clone(),
        };
        match serde_json::to_value(&summary) {
            Ok(body) => {
                let sent = self
                    .api
                    .send_confirmation_email(&self.personal.email, &body)
                    .await;
                if let Err(e) = sent {
                    warn!("Confirmation email not sent: {}", e.user_message());
                }
            }
            Err(e) => warn!("Could not encode enrollment summary: {}", e),
        }

        Ok(subscription)
    }

    pub fn back(&mut self) -> Step {
        self.step = match self.step {
            Step::Email | Step::Otp | Step::PersonalInfo => Step::Email,
            Step::Package if self.logged_in => Step::Email,
            Step::Package => Step::PersonalInfo,
            Step::Schedule => Step::Package,
            Step::Confirmation => Step::Confirmation,
        };
        self.step
    }

    /// Start over, keeping only the API handle and settings.
    pub fn reset(&mut self) {
        self.step = Step::Email;
        self.returning = false;
        self.logged_in = false;
        self.token = None;
        self.personal = PersonalInfo::default();
        self.plans.clear();
        self.plan = None;
        self.selection = SessionSelection::default();
        self.timezone = self.settings.detected_timezone;
        self.timezone_source = TimezoneSource::Detected;
        self.selected_date = None;
        self.booked.clear();
        self.subscription = None;
    }

    async fn load_profile(&mut self, jwt: &str) {
        let profile = match self.api.get_user_profile(jwt).await {
            Ok(profile) => profile,
            Err(e) => {
                warn!("Could not load profile: {}", e.user_message());
                return;
            }
        };
        self.apply_profile(&profile);

        match profile.timezone.as_deref().map(parse_timezone) {
            Some(Ok(tz)) => self.switch_timezone(tz, TimezoneSource::Profile),
            Some(Err(e)) => {
                warn!("Ignoring profile timezone: {}", e.user_message());
                self.preselect_timezone().await;
            }
            None => self.preselect_timezone().await,
        }
    }

    fn apply_profile(&mut self, profile: &UserProfile) {
        let fill = |target: &mut String, value: &Option<String>| {
            if let Some(value) = value.as_deref().filter(|v| !v.trim().is_empty()) {
                *target = value.to_string();
            }
        };
        fill(&mut self.personal.first_name, &profile.first_name);
        fill(&mut self.personal.last_name, &profile.last_name);
        fill(&mut self.personal.phone, &profile.phone);
        fill(&mut self.personal.country, &profile.country);
        fill(&mut self.personal.email, &profile.email);
        if let Some(gender) = profile.gender.as_deref().and_then(parse_gender) {
            self.personal.gender = Some(gender);
        }
    }

    async fn preselect_timezone(&mut self) {
        if let Some(tz) = self.country_timezone().await {
            debug!("Timezone {} picked from {}", tz.name(), self.personal.country);
            self.switch_timezone(tz, TimezoneSource::Country);
        }
    }

    fn switch_timezone(&mut self, tz: Tz, source: TimezoneSource) {
        self.timezone = tz;
        self.timezone_source = source;
        for session in self.selection.rezone(tz) {
            warn!(
                "Dropped session {} {} after switching to {}",
                session.date,
                session.time.format("%H:%M"),
                tz.name()
            );
        }
    }

    /// Local table first, then the API.
    async fn country_timezone(&self) -> Option<Tz> {
        let country = self.personal.country.trim();
        if country.is_empty() || country.eq_ignore_ascii_case("other") {
            return None;
        }

        if let Some(tz) = timezone_for_region(country, self.personal.region.as_deref())
            .and_then(|name| parse_timezone(name).ok())
        {
            return Some(tz);
        }

        match self.api.get_country_timezone(country).await {
            Ok(name) => match parse_timezone(&name) {
                Ok(tz) => Some(tz),
                Err(e) => {
                    warn!("Country timezone for {} unusable: {}", country, e.user_message());
                    None
                }
            },
            Err(e) => {
                warn!("Country timezone lookup for {} failed: {}", country, e.user_message());
                None
            }
        }
    }
}

fn parse_gender(raw: &str) -> Option<Gender> {
    match raw.trim().to_lowercase().as_str() {
        "male" => Some(Gender::Male),
        "female" => Some(Gender::Female),
        _ => None,
    }
}

/// Same shape as `^[^\s@]+@[^\s@]+\.[^\s@]+$`.
pub fn is_valid_email(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.contains('@') {
        return false;
    }
    domain
        .char_indices()
        .any(|(i, c)| c == '.' && i > 0 && i + 1 < domain.len())
}

/// Strip markup characters and surrounding whitespace.
pub fn sanitize_text(raw: &str) -> String {
    raw.chars()
        .filter(|c| !matches!(c, '<' | '>' | '\'' | '"'))
        .collect::<String>()
        .trim()
        .to_string()
}

pub fn sanitize_phone(raw: &str) -> String {
    sanitize_text(raw)
        .chars()
        .filter(|c| c.is_ascii_digit() || c.is_whitespace() || matches!(c, '-' | '+' | '(' | ')'))
        .collect()
}

pub fn sanitize_name(raw: &str) -> String {
    sanitize_text(raw)
        .chars()
        .filter(|c| c.is_alphabetic() || c.is_whitespace() || *c == '-')
        .collect()
}

pub fn sanitize_personal_info(info: PersonalInfo) -> PersonalInfo {
    PersonalInfo {
        first_name: sanitize_name(&info.first_name),
        last_name: sanitize_name(&info.last_name),
        gender: info.gender,
        email: sanitize_text(&info.email),
        country: sanitize_text(&info.country),
        region: info
            .region
            .as_deref()
            .map(sanitize_text)
            .filter(|r| !r.is_empty()),
        phone: sanitize_phone(&info.phone),
    }
}
