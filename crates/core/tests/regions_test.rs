use bayan_core::{
    regions::{
        CountryRecord, US_STATES, curated_countries, flag_for, states_for_country,
        timezone_for_region, timezone_for_us_state,
    },
    timezone::parse_timezone,
};
use pretty_assertions::assert_eq;
use rstest::rstest;

#[test]
fn test_us_state_table_is_complete() {
    assert_eq!(US_STATES.len(), 51);
    for state in US_STATES.iter() {
        assert!(parse_timezone(state.timezone).is_ok(), "{} has a bad zone", state.name);
    }
}

#[rstest]
#[case("California", Some("America/Los_Angeles"))]
#[case("ca", Some("America/Los_Angeles"))]
#[case(" tx ", Some("America/Chicago"))]
#[case("newyork", Some("America/New_York"))]
#[case("DISTRICT OF COLUMBIA", Some("America/New_York"))]
#[case("Narnia", None)]
#[case("", None)]
fn test_timezone_for_us_state(#[case] query: &str, #[case] expected: Option<&str>) {
    assert_eq!(timezone_for_us_state(query), expected);
}

#[rstest]
#[case("United States", None, None)]
#[case("United States", Some("Hawaii"), Some("Pacific/Honolulu"))]
#[case("Canada", Some("British Columbia"), Some("America/Vancouver"))]
#[case("Canada", None, Some("America/Toronto"))]
#[case("Australia", Some("WA"), Some("Australia/Perth"))]
#[case("Australia", Some("Atlantis"), Some("Australia/Sydney"))]
#[case("Egypt", None, Some("Africa/Cairo"))]
#[case("UAE", Some("Dubai"), Some("Asia/Dubai"))]
#[case("Brazil", None, None)]
fn test_timezone_for_region(
    #[case] country: &str,
    #[case] region: Option<&str>,
    #[case] expected: Option<&str>,
) {
    assert_eq!(timezone_for_region(country, region), expected);
}

#[test]
fn test_states_for_country() {
    let us = states_for_country("United States");
    assert_eq!(us.len(), 51);
    assert_eq!(us[0].name, "Alabama");
    assert_eq!(us[0].code.as_deref(), Some("AL"));

    assert_eq!(states_for_country("Canada").len(), 13);
    assert_eq!(states_for_country("United Kingdom")[0].code, None);
    assert!(states_for_country("Brazil").is_empty());
}

#[test]
fn test_flag_for() {
    assert_eq!(flag_for("EG"), "🇪🇬");
    assert_eq!(flag_for("us"), "🇺🇸");
}

#[test]
fn test_curated_countries_static_list() {
    let options = curated_countries(&[]);

    assert_eq!(options.len(), 13);
    assert_eq!(options[0].value, "");
    assert_eq!(options[0].label, "Select your country");
    assert_eq!(options[1].label, "🇺🇸 United States");
    assert_eq!(options[12].value, "other");
}

#[test]
fn test_curated_countries_filters_and_orders() {
    let all = vec![
        CountryRecord {
            name: "Brazil".to_string(),
            emoji: Some("🇧🇷".to_string()),
        },
        CountryRecord {
            name: "Egypt".to_string(),
            emoji: Some("🇪🇬".to_string()),
        },
        CountryRecord {
            name: "United States".to_string(),
            emoji: None,
        },
    ];

    let values: Vec<String> = curated_countries(&all).into_iter().map(|o| o.label).collect();

    assert_eq!(
        values,
        vec![
            "Select your country".to_string(),
            "🌍 United States".to_string(),
            "🇪🇬 Egypt".to_string(),
            "🌍 Other".to_string(),
        ]
    );
}
