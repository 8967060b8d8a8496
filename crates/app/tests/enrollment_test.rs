use bayan_app::enrollment::{
    EnrollmentWizard, Step, SubmissionFailure, TimezoneSource, WizardSettings, is_valid_email,
    sanitize_name, sanitize_personal_info, sanitize_phone,
};
use bayan_client::MockAppointmentApi;
use bayan_core::{
    booking::{SlotState, Toggle},
    errors::BookingError,
    models::{AuthToken, BookedSlot, Gender, PersonalInfo, Plan, Registration, UserProfile},
};
use chrono::{NaiveDate, NaiveTime, TimeZone, Utc};
use fake::{Fake, faker::company::en::CompanyName};
use mockall::predicate;
use pretty_assertions::assert_eq;
use rstest::rstest;
use serde_json::json;

const EMAIL: &str = "student@example.com";

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 9, 15).unwrap()
}

fn wizard(api: MockAppointmentApi) -> EnrollmentWizard<MockAppointmentApi> {
    EnrollmentWizard::new(api, WizardSettings::default()).with_today(today())
}

fn plan(name: &str, total: u32, per_week: u32) -> Plan {
    Plan {
        mongo_id: Some("plan-1".to_string()),
        name: name.to_string(),
        sessions_per_month: Some(total),
        sessions_per_week: Some(per_week),
        ..Plan::default()
    }
}

fn personal_info() -> PersonalInfo {
    PersonalInfo {
        first_name: "Mariam".to_string(),
        last_name: "Hassan".to_string(),
        gender: Some(Gender::Female),
        email: String::new(),
        country: "Egypt".to_string(),
        region: None,
        phone: "+20 100 000 0000".to_string(),
    }
}

/// A returning student whose profile pins the UTC zone.
fn returning_student(api: &mut MockAppointmentApi) {
    api.expect_send_login_otp()
        .withf(|email| email == EMAIL)
        .times(1)
        .returning(|_| Ok(()));
    api.expect_verify_otp()
        .withf(|email, otp| email == EMAIL && otp == "123456")
        .times(1)
        .returning(|_, _| Ok(AuthToken::Permanent("jwt-1".to_string())));
    api.expect_get_user_profile()
        .withf(|jwt| jwt == "jwt-1")
        .returning(|_| {
            Ok(UserProfile {
                email: Some(EMAIL.to_string()),
                first_name: Some("Omar".to_string()),
                last_name: Some("Khaled".to_string()),
                gender: Some("male".to_string()),
                country: Some("Egypt".to_string()),
                phone: Some("0100".to_string()),
                timezone: Some("UTC".to_string()),
                ..UserProfile::default()
            })
        });
}

async fn logged_in(mut api: MockAppointmentApi) -> EnrollmentWizard<MockAppointmentApi> {
    returning_student(&mut api);
    let mut wizard = wizard(api);
    wizard.request_otp(EMAIL, true).await.unwrap();
    wizard.verify_otp("123456").await.unwrap();
    wizard
}

#[rstest]
#[case("student@example.com", true)]
#[case("a@b.co", true)]
#[case("no-at-sign.com", false)]
#[case("two@@example.com", false)]
#[case("spaces in@example.com", false)]
#[case("student@localhost", false)]
#[case("student@.com", false)]
fn test_email_validation(#[case] email: &str, #[case] valid: bool) {
    assert_eq!(is_valid_email(email), valid);
}

#[test]
fn test_sanitizers() {
    assert_eq!(sanitize_name(" <b>Nour</b> El-Din "), "bNourb El-Din");
    assert_eq!(sanitize_phone("+1 (555) 010-9999 ext"), "+1 (555) 010-9999 ");
    assert_eq!(sanitize_name("O'Brien"), "OBrien");

    let cleaned = sanitize_personal_info(PersonalInfo {
        country: " Egypt\"> ".to_string(),
        region: Some("   ".to_string()),
        ..personal_info()
    });
    assert_eq!(cleaned.country, "Egypt");
    assert_eq!(cleaned.region, None);
}

#[tokio::test]
async fn test_request_otp_rejects_invalid_email() {
    let mut wizard = wizard(MockAppointmentApi::new());

    let err = wizard.request_otp("not-an-email", false).await.unwrap_err();

    assert_eq!(err.user_message(), "Please enter a valid email address");
    assert_eq!(wizard.step(), Step::Email);
}

#[tokio::test]
async fn test_verify_otp_requires_six_digits() {
    let mut api = MockAppointmentApi::new();
    api.expect_send_registration_otp().returning(|_| Ok(()));
    let mut wizard = wizard(api);
    wizard.request_otp(EMAIL, false).await.unwrap();

    let err = wizard.verify_otp("12ab56").await.unwrap_err();

    assert_eq!(err.user_message(), "Please enter a valid 6-digit OTP");
    assert_eq!(wizard.step(), Step::Otp);
}

#[tokio::test]
async fn test_new_account_registers_with_country_timezone() {
    let mut api = MockAppointmentApi::new();
    api.expect_send_registration_otp()
        .withf(|email| email == EMAIL)
        .returning(|_| Ok(()));
    api.expect_verify_otp()
        .returning(|_, _| Ok(AuthToken::Temporary("temp-1".to_string())));
    api.expect_complete_registration()
        .withf(|temp, profile| {
            temp == "temp-1"
                && profile.first_name == "Mariam"
                && profile.timezone.as_deref() == Some("Africa/Cairo")
        })
        .times(1)
        .returning(|_, _| {
            Ok(Registration {
                token: "jwt-2".to_string(),
                user: None,
            })
        });

    let mut wizard = wizard(api);
    wizard.request_otp(EMAIL, false).await.unwrap();
    assert_eq!(wizard.verify_otp("654321").await.unwrap(), Step::PersonalInfo);
    assert!(!wizard.is_logged_in());

    let missing = PersonalInfo {
        phone: String::new(),
        ..personal_info()
    };
    let err = wizard.submit_personal_info(missing).await.unwrap_err();
    assert_eq!(err.user_message(), "Please fill in all required fields");

    wizard.submit_personal_info(personal_info()).await.unwrap();

    assert_eq!(wizard.step(), Step::Package);
    assert!(wizard.is_logged_in());
    assert_eq!(wizard.token(), Some(&AuthToken::Permanent("jwt-2".to_string())));
    assert_eq!(wizard.personal_info().email, EMAIL);
    assert_eq!(wizard.timezone(), chrono_tz::Africa::Cairo);
    assert_eq!(wizard.timezone_source(), TimezoneSource::Country);
}

#[rstest]
#[case("Registration already completed")]
#[case("No authentication token provided")]
#[tokio::test]
async fn test_registration_already_done_counts_as_success(#[case] message: &'static str) {
    let mut api = MockAppointmentApi::new();
    api.expect_send_registration_otp().returning(|_| Ok(()));
    api.expect_verify_otp()
        .returning(|_, _| Ok(AuthToken::Temporary("temp-1".to_string())));
    api.expect_complete_registration().returning(move |_, _| {
        Err(BookingError::Api {
            status: 400,
            message: message.to_string(),
        })
    });

    let mut wizard = wizard(api);
    wizard.request_otp(EMAIL, false).await.unwrap();
    wizard.verify_otp("654321").await.unwrap();
    wizard.submit_personal_info(personal_info()).await.unwrap();

    assert!(wizard.is_logged_in());
    assert_eq!(wizard.step(), Step::Package);
}

#[tokio::test]
async fn test_registration_failure_is_reported() {
    let mut api = MockAppointmentApi::new();
    api.expect_send_registration_otp().returning(|_| Ok(()));
    api.expect_verify_otp()
        .returning(|_, _| Ok(AuthToken::Temporary("temp-1".to_string())));
    api.expect_complete_registration().returning(|_, _| {
        Err(BookingError::Api {
            status: 500,
            message: "Database unavailable".to_string(),
        })
    });

    let mut wizard = wizard(api);
    wizard.request_otp(EMAIL, false).await.unwrap();
    wizard.verify_otp("654321").await.unwrap();
    let err = wizard.submit_personal_info(personal_info()).await.unwrap_err();

    assert_eq!(err.user_message(), "Registration failed: Database unavailable");
    assert_eq!(wizard.step(), Step::PersonalInfo);
}

#[tokio::test]
async fn test_returning_student_skips_personal_info() {
    let wizard = logged_in(MockAppointmentApi::new()).await;

    assert_eq!(wizard.step(), Step::Package);
    assert!(wizard.is_logged_in());
    assert_eq!(wizard.personal_info().first_name, "Omar");
    assert_eq!(wizard.personal_info().gender, Some(Gender::Male));
    assert_eq!(wizard.timezone(), chrono_tz::UTC);
    assert_eq!(wizard.timezone_source(), TimezoneSource::Profile);
}

#[tokio::test]
async fn test_back_navigation() {
    let mut wizard = logged_in(MockAppointmentApi::new()).await;

    assert_eq!(wizard.back(), Step::Email);

    let mut api = MockAppointmentApi::new();
    api.expect_send_registration_otp().returning(|_| Ok(()));
    api.expect_verify_otp()
        .returning(|_, _| Ok(AuthToken::Temporary("temp-1".to_string())));
    let mut fresh = EnrollmentWizard::new(api, WizardSettings::default());
    fresh.request_otp(EMAIL, false).await.unwrap();
    fresh.verify_otp("111111").await.unwrap();
    assert_eq!(fresh.back(), Step::Email);
}

#[tokio::test]
async fn test_load_plans_hides_inactive_and_sorts() {
    let mut api = MockAppointmentApi::new();
    api.expect_get_plans().returning(|| {
        Ok(vec![
            Plan {
                name: "Unordered".to_string(),
                ..Plan::default()
            },
            Plan {
                name: "Retired".to_string(),
                is_active: Some(false),
                order: Some(0),
                ..Plan::default()
            },
            Plan {
                name: "First".to_string(),
                order: Some(1),
                ..Plan::default()
            },
        ])
    });
    let mut wizard = wizard(api);

    let names: Vec<String> = wizard
        .load_plans()
        .await
        .unwrap()
        .iter()
        .map(|p| p.name.clone())
        .collect();

    assert_eq!(names, vec!["First".to_string(), "Unordered".to_string()]);
}

#[tokio::test]
async fn test_select_package_looks_up_country_timezone() {
    let mut api = MockAppointmentApi::new();
    api.expect_send_registration_otp().returning(|_| Ok(()));
    api.expect_verify_otp()
        .returning(|_, _| Ok(AuthToken::Temporary("temp-1".to_string())));
    api.expect_get_country_timezone()
        .withf(|country| country == "United States")
        .returning(|_| Ok("America/Chicago".to_string()));
    api.expect_complete_registration().returning(|_, _| {
        Ok(Registration {
            token: "jwt-3".to_string(),
            user: None,
        })
    });
    api.expect_get_booked_slots()
        .with(predicate::eq(None))
        .returning(|_| Vec::new());

    let mut wizard = wizard(api);
    wizard.request_otp(EMAIL, false).await.unwrap();
    wizard.verify_otp("654321").await.unwrap();
    wizard
        .submit_personal_info(PersonalInfo {
            country: "United States".to_string(),
            ..personal_info()
        })
        .await
        .unwrap();
    wizard.select_package(plan("Standard", 6, 3)).await.unwrap();

    assert_eq!(wizard.step(), Step::Schedule);
    assert_eq!(wizard.timezone(), chrono_tz::America::Chicago);
    assert_eq!(wizard.selection().quota().total, 6);
    assert_eq!(wizard.selection().quota().per_week, 3);
}

#[tokio::test]
async fn test_select_package_requires_identifier() {
    let mut wizard = wizard(MockAppointmentApi::new());

    let err = wizard
        .select_package(Plan {
            name: "Ghost".to_string(),
            ..Plan::default()
        })
        .await
        .unwrap_err();

    assert_eq!(err.user_message(), "Selected plan has no identifier");
}

#[tokio::test]
async fn test_select_date_rejects_today() {
    let mut api = MockAppointmentApi::new();
    api.expect_get_booked_slots()
        .with(predicate::eq(None))
        .returning(|_| Vec::new());
    let mut wizard = logged_in(api).await;
    wizard.select_package(plan("Starter", 2, 2)).await.unwrap();

    assert!(wizard.select_date(today()).is_err());

    let views = wizard.select_date(today().succ_opt().unwrap()).unwrap();
    assert_eq!(views.len(), 24);
    assert!(views.iter().all(|v| v.state == SlotState::Available));
}

#[tokio::test]
async fn test_booked_slots_show_and_reconcile() {
    let tomorrow = today().succ_opt().unwrap();
    let mut api = MockAppointmentApi::new();
    let mut calls = 0;
    api.expect_get_booked_slots().returning(move |_| {
        calls += 1;
        if calls == 1 {
            Vec::new()
        } else {
            vec![
                BookedSlot::new(tomorrow, NaiveTime::from_hms_opt(5, 0, 0).unwrap())
                    .at(Utc.with_ymd_and_hms(2025, 9, 16, 5, 0, 0).unwrap()),
            ]
        }
    });
    let mut wizard = logged_in(api).await;
    wizard.select_package(plan("Starter", 2, 2)).await.unwrap();

    let views = wizard.select_date(tomorrow).unwrap();
    assert_eq!(wizard.toggle_slot(&views[0].slot).unwrap(), Toggle::Added);

    let dropped = wizard.refresh_booked_slots().await;

    assert_eq!(dropped.len(), 1);
    assert!(wizard.selection().is_empty());
    assert_eq!(wizard.slot_views()[0].state, SlotState::Booked);
    assert!(wizard.toggle_slot(&views[0].slot).is_err());
}

#[tokio::test]
async fn test_submit_full_enrollment() {
    let plan_name: String = CompanyName().fake();
    let expected_notes = format!("{plan_name} session");
    let tomorrow = today().succ_opt().unwrap();

    let mut api = MockAppointmentApi::new();
    api.expect_get_booked_slots()
        .with(predicate::eq(None))
        .returning(|_| Vec::new());
    api.expect_create_complete_subscription()
        .withf(move |jwt, request| {
            jwt == "jwt-1"
                && request.subscription_plan_id == "plan-1"
                && request.start_date == today()
                && request.user_country.as_deref() == Some("Egypt")
                && request.sessions.len() == 2
                && request
                    .sessions
                    .iter()
                    .all(|s| {
                        s.notes.as_deref() == Some(expected_notes.as_str())
                            && s.starts_at_utc.is_some()
                    })
        })
        .times(1)
        .returning(|_, _| Ok(json!({ "id": "sub-1", "status": "pending" })));
    let summary_plan = plan_name.clone();
    api.expect_send_confirmation_email()
        .withf(move |email, body| {
            email == EMAIL && body["package"]["name"] == summary_plan.as_str()
        })
        .times(1)
        .returning(|_, _| {
            Err(BookingError::NotFound(
                "Email confirmation service not available".to_string(),
            ))
        });

    let mut wizard = logged_in(api).await;
    wizard.select_package(plan(&plan_name, 2, 2)).await.unwrap();
    let views = wizard.select_date(tomorrow).unwrap();

    let err = wizard.submit().await.unwrap_err();
    assert_eq!(err, SubmissionFailure::Incomplete("Please select 2 sessions".to_string()));

    wizard.toggle_slot(&views[0].slot).unwrap();
    wizard.toggle_slot(&views[1].slot).unwrap();
    assert!(wizard.can_submit());

    let subscription = wizard.submit().await.unwrap();

    assert_eq!(subscription["id"], "sub-1");
    assert_eq!(wizard.step(), Step::Confirmation);
    assert_eq!(wizard.back(), Step::Confirmation);
}

#[tokio::test]
async fn test_week_full_blocks_other_days() {
    let mut api = MockAppointmentApi::new();
    api.expect_get_booked_slots()
        .with(predicate::eq(None))
        .returning(|_| Vec::new());
    let mut wizard = logged_in(api).await;
    wizard.select_package(plan("Weekly", 4, 1)).await.unwrap();

    let tuesday = NaiveDate::from_ymd_opt(2025, 9, 16).unwrap();
    let views = wizard.select_date(tuesday).unwrap();
    wizard.toggle_slot(&views[0].slot).unwrap();

    assert_eq!(wizard.slot_views()[1].state, SlotState::WeekFull);
    let err = wizard
        .select_date(NaiveDate::from_ymd_opt(2025, 9, 18).unwrap())
        .unwrap_err();
    assert!(err.user_message().starts_with("Week full (1/1 sessions used)"));

    // Next week is open again.
    assert!(wizard.select_date(NaiveDate::from_ymd_opt(2025, 9, 21).unwrap()).is_ok());
}

#[tokio::test]
async fn test_submit_requires_login() {
    let mut wizard = wizard(MockAppointmentApi::new());

    let err = wizard.submit().await.unwrap_err();

    assert_eq!(
        err.to_string(),
        "Authentication required. Please verify your email first."
    );
}

#[rstest]
#[case(
    BookingError::Conflict("You already have an active subscription to this plan".to_string()),
    SubmissionFailure::ActiveSubscription
)]
#[case(
    BookingError::Api { status: 404, message: "Plan not found".to_string() },
    SubmissionFailure::PlanUnavailable
)]
#[case(
    BookingError::Api { status: 402, message: "Insufficient funds".to_string() },
    SubmissionFailure::Payment
)]
#[case(BookingError::Network("timed out".to_string()), SubmissionFailure::Network)]
#[case(
    BookingError::Api { status: 502, message: "Connection reset".to_string() },
    SubmissionFailure::Network
)]
#[case(
    BookingError::Api { status: 500, message: "Boom".to_string() },
    SubmissionFailure::Other("Boom".to_string())
)]
fn test_failure_classification(#[case] err: BookingError, #[case] expected: SubmissionFailure) {
    assert_eq!(SubmissionFailure::classify(&err), expected);
}

#[tokio::test]
async fn test_timezone_switch_moves_picks_to_new_week() {
    let mut api = MockAppointmentApi::new();
    api.expect_get_booked_slots()
        .with(predicate::eq(None))
        .returning(|_| Vec::new());
    let mut wizard = logged_in(api).await;
    wizard.select_package(plan("Weekly", 4, 1)).await.unwrap();

    let saturday = NaiveDate::from_ymd_opt(2025, 9, 20).unwrap();
    let sunday = NaiveDate::from_ymd_opt(2025, 9, 21).unwrap();
    let views = wizard.select_date(saturday).unwrap();
    let last = views
        .iter()
        .find(|view| view.slot.provider_time == NaiveTime::from_hms_opt(19, 30, 0).unwrap())
        .unwrap();
    assert_eq!(wizard.toggle_slot(&last.slot).unwrap(), Toggle::Added);

    wizard.set_timezone("Pacific/Kiritimati").unwrap();

    let picked = &wizard.selection().sessions()[0];
    assert_eq!(picked.date, sunday);
    assert_eq!(picked.time, NaiveTime::from_hms_opt(6, 30, 0).unwrap());
    assert_eq!(picked.starts_at_utc, Some(Utc.with_ymd_and_hms(2025, 9, 20, 16, 30, 0).unwrap()));
    assert_eq!(wizard.selection().sessions_in_week(sunday), 1);
    assert!(wizard.select_date(sunday).is_err());
    assert!(wizard.select_date(saturday).is_ok());
}

#[tokio::test]
async fn test_reset_starts_over() {
    let mut api = MockAppointmentApi::new();
    api.expect_get_booked_slots()
        .with(predicate::eq(None))
        .returning(|_| Vec::new());
    let mut wizard = logged_in(api).await;
    wizard.select_package(plan("Starter", 2, 2)).await.unwrap();
    wizard.set_timezone("Asia/Tokyo").unwrap();

    wizard.reset();

    assert_eq!(wizard.step(), Step::Email);
    assert!(!wizard.is_logged_in());
    assert!(wizard.selected_plan().is_none());
    assert_eq!(wizard.timezone(), chrono_tz::UTC);
    assert_eq!(wizard.timezone_source(), TimezoneSource::Detected);
}
