//! Static country and region tables used to pre-select a viewer timezone.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UsState {
    pub name: &'static str,
    pub code: &'static str,
    pub timezone: &'static str,
}

const fn state(name: &'static str, code: &'static str, timezone: &'static str) -> UsState {
    UsState {
        name,
        code,
        timezone,
    }
}

/// Predominant zone per state; states spanning zones map to the larger one.
pub const US_STATES: [UsState; 51] = [
    state("Alabama", "AL", "America/Chicago"),
    state("Alaska", "AK", "America/Anchorage"),
    state("Arizona", "AZ", "America/Phoenix"),
    state("Arkansas", "AR", "America/Chicago"),
    state("California", "CA", "America/Los_Angeles"),
    state("Colorado", "CO", "America/Denver"),
    state("Connecticut", "CT", "America/New_York"),
    state("Delaware", "DE", "America/New_York"),
    state("District of Columbia", "DC", "America/New_York"),
    state("Florida", "FL", "America/New_York"),
    state("Georgia", "GA", "America/New_York"),
    state("Hawaii", "HI", "Pacific/Honolulu"),
    state("Idaho", "ID", "America/Denver"),
    state("Illinois", "IL", "America/Chicago"),
    state("Indiana", "IN", "America/New_York"),
    state("Iowa", "IA", "America/Chicago"),
    state("Kansas", "KS", "America/Chicago"),
    state("Kentucky", "KY", "America/New_York"),
    state("Louisiana", "LA", "America/Chicago"),
    state("Maine", "ME", "America/New_York"),
    state("Maryland", "MD", "America/New_York"),
    state("Massachusetts", "MA", "America/New_York"),
    state("Michigan", "MI", "America/New_York"),
    state("Minnesota", "MN", "America/Chicago"),
    state("Mississippi", "MS", "America/Chicago"),
    state("Missouri", "MO", "America/Chicago"),
    state("Montana", "MT", "America/Denver"),
    state("Nebraska", "NE", "America/Chicago"),
    state("Nevada", "NV", "America/Los_Angeles"),
    state("New Hampshire", "NH", "America/New_York"),
    state("New Jersey", "NJ", "America/New_York"),
    state("New Mexico", "NM", "America/Denver"),
    state("New York", "NY", "America/New_York"),
    state("North Carolina", "NC", "America/New_York"),
    state("North Dakota", "ND", "America/Chicago"),
    state("Ohio", "OH", "America/New_York"),
    state("Oklahoma", "OK", "America/Chicago"),
    state("Oregon", "OR", "America/Los_Angeles"),
    state("Pennsylvania", "PA", "America/New_York"),
    state("Rhode Island", "RI", "America/New_York"),
    state("South Carolina", "SC", "America/New_York"),
    state("South Dakota", "SD", "America/Chicago"),
    state("Tennessee", "TN", "America/Chicago"),
    state("Texas", "TX", "America/Chicago"),
    state("Utah", "UT", "America/Denver"),
    state("Vermont", "VT", "America/New_York"),
    state("Virginia", "VA", "America/New_York"),
    state("Washington", "WA", "America/Los_Angeles"),
    state("West Virginia", "WV", "America/New_York"),
    state("Wisconsin", "WI", "America/Chicago"),
    state("Wyoming", "WY", "America/Denver"),
];

const CANADA: &[(&str, &str)] = &[
    ("british columbia", "America/Vancouver"),
    ("bc", "America/Vancouver"),
    ("alberta", "America/Edmonton"),
    ("ab", "America/Edmonton"),
    ("saskatchewan", "America/Regina"),
    ("sk", "America/Regina"),
    ("manitoba", "America/Winnipeg"),
    ("mb", "America/Winnipeg"),
    ("ontario", "America/Toronto"),
    ("on", "America/Toronto"),
    ("quebec", "America/Toronto"),
    ("qc", "America/Toronto"),
    ("new brunswick", "America/Moncton"),
    ("nb", "America/Moncton"),
    ("nova scotia", "America/Halifax"),
    ("ns", "America/Halifax"),
    ("prince edward island", "America/Halifax"),
    ("pe", "America/Halifax"),
    ("newfoundland and labrador", "America/St_Johns"),
    ("nl", "America/St_Johns"),
    ("yukon", "America/Whitehorse"),
    ("yt", "America/Whitehorse"),
    ("northwest territories", "America/Yellowknife"),
    ("nt", "America/Yellowknife"),
    ("nunavut", "America/Iqaluit"),
    ("nu", "America/Iqaluit"),
];

const AUSTRALIA: &[(&str, &str)] = &[
    ("new south wales", "Australia/Sydney"),
    ("nsw", "Australia/Sydney"),
    ("victoria", "Australia/Melbourne"),
    ("vic", "Australia/Melbourne"),
    ("queensland", "Australia/Brisbane"),
    ("qld", "Australia/Brisbane"),
    ("south australia", "Australia/Adelaide"),
    ("sa", "Australia/Adelaide"),
    ("western australia", "Australia/Perth"),
    ("wa", "Australia/Perth"),
    ("tasmania", "Australia/Hobart"),
    ("tas", "Australia/Hobart"),
    ("northern territory", "Australia/Darwin"),
    ("nt", "Australia/Darwin"),
    ("australian capital territory", "Australia/Sydney"),
    ("act", "Australia/Sydney"),
];

const SINGLE_ZONE: &[(&str, &str)] = &[
    ("United Kingdom", "Europe/London"),
    ("Egypt", "Africa/Cairo"),
    ("Saudi Arabia", "Asia/Riyadh"),
    ("UAE", "Asia/Dubai"),
    ("Germany", "Europe/Berlin"),
    ("France", "Europe/Paris"),
    ("India", "Asia/Kolkata"),
    ("Pakistan", "Asia/Karachi"),
];

/// Curated countries in display order, with ISO codes for flag emoji.
pub const PREFERRED_COUNTRIES: &[(&str, &str)] = &[
    ("United States", "US"),
    ("United Kingdom", "GB"),
    ("Canada", "CA"),
    ("Egypt", "EG"),
    ("Saudi Arabia", "SA"),
    ("UAE", "AE"),
    ("Germany", "DE"),
    ("France", "FR"),
    ("India", "IN"),
    ("Pakistan", "PK"),
    ("Australia", "AU"),
];

fn squash(raw: &str) -> String {
    raw.chars().filter(|c| !c.is_whitespace()).collect::<String>().to_lowercase()
}

/// Zone for a US state given by name or postal code.
pub fn timezone_for_us_state(name_or_code: &str) -> Option<&'static str> {
    let query = name_or_code.trim().to_lowercase();
    if query.is_empty() {
        return None;
    }
    let squashed = squash(&query);
    US_STATES
        .iter()
        .find(|s| {
            s.code.to_lowercase() == query
                || s.name.to_lowercase() == query
                || squash(s.name) == squashed
        })
        .map(|s| s.timezone)
}

fn lookup(table: &[(&str, &'static str)], key: &str) -> Option<&'static str> {
    table.iter().find(|(name, _)| *name == key).map(|(_, tz)| *tz)
}

/// Primary IANA zone for a `(country, region)` pair in the curated set.
///
/// The United States needs a region; Canada and Australia fall back to
/// their most populous zone.
pub fn timezone_for_region(country: &str, region: Option<&str>) -> Option<&'static str> {
    let country = country.trim();
    let region = region.unwrap_or("").trim();

    match country {
        "United States" => {
            if region.is_empty() {
                None
            } else {
                timezone_for_us_state(region)
            }
        }
        "Canada" => Some(lookup(CANADA, &region.to_lowercase()).unwrap_or("America/Toronto")),
        "Australia" => {
            Some(lookup(AUSTRALIA, &region.to_lowercase()).unwrap_or("Australia/Sydney"))
        }
        other => lookup(SINGLE_ZONE, other),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateOption {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

impl StateOption {
    fn named(name: &str) -> Self {
        Self {
            name: name.to_string(),
            code: None,
        }
    }

    fn coded(name: &str, code: &str) -> Self {
        Self {
            name: name.to_string(),
            code: Some(code.to_string()),
        }
    }
}

/// Regions offered for a curated country; empty for anything else.
pub fn states_for_country(country: &str) -> Vec<StateOption> {
    fn named(names: &[&str]) -> Vec<StateOption> {
        names.iter().map(|n| StateOption::named(n)).collect()
    }

    match country {
        "United States" => US_STATES
            .iter()
            .map(|s| StateOption::coded(s.name, s.code))
            .collect(),
        "Canada" => [
            ("Alberta", "AB"),
            ("British Columbia", "BC"),
            ("Manitoba", "MB"),
            ("New Brunswick", "NB"),
            ("Newfoundland and Labrador", "NL"),
            ("Northwest Territories", "NT"),
            ("Nova Scotia", "NS"),
            ("Nunavut", "NU"),
            ("Ontario", "ON"),
            ("Prince Edward Island", "PE"),
            ("Quebec", "QC"),
            ("Saskatchewan", "SK"),
            ("Yukon", "YT"),
        ]
        .iter()
        .map(|(name, code)| StateOption::coded(name, code))
        .collect(),
        "Australia" => [
            ("New South Wales", "NSW"),
            ("Victoria", "VIC"),
            ("Queensland", "QLD"),
            ("South Australia", "SA"),
            ("Western Australia", "WA"),
            ("Tasmania", "TAS"),
            ("Northern Territory", "NT"),
            ("Australian Capital Territory", "ACT"),
        ]
        .iter()
        .map(|(name, code)| StateOption::coded(name, code))
        .collect(),
        "United Kingdom" => named(&["England", "Scotland", "Wales", "Northern Ireland"]),
        "UAE" => named(&[
            "Abu Dhabi",
            "Dubai",
            "Sharjah",
            "Ajman",
            "Umm Al Quwain",
            "Ras Al Khaimah",
            "Fujairah",
        ]),
        "Saudi Arabia" => named(&[
            "Riyadh",
            "Makkah",
            "Madinah",
            "Eastern Province",
            "Asir",
            "Jazan",
            "Tabuk",
            "Hail",
            "Najran",
            "Al-Bahah",
            "Al-Jawf",
            "Northern Borders",
        ]),
        "Egypt" => named(&[
            "Cairo",
            "Giza",
            "Alexandria",
            "Dakahlia",
            "Sharqia",
            "Qalyubia",
            "Gharbia",
            "Monufia",
            "Kafr El Sheikh",
            "Beheira",
            "Ismailia",
            "Suez",
            "Port Said",
            "Damietta",
        ]),
        "Germany" => named(&[
            "Bavaria",
            "Berlin",
            "Hamburg",
            "Hesse",
            "Lower Saxony",
            "North Rhine-Westphalia",
            "Saxony",
            "Baden-Württemberg",
        ]),
        "France" => named(&[
            "Île-de-France",
            "Provence-Alpes-Côte d'Azur",
            "Auvergne-Rhône-Alpes",
            "Occitanie",
            "Nouvelle-Aquitaine",
            "Grand Est",
            "Hauts-de-France",
        ]),
        "India" => named(&[
            "Maharashtra",
            "Delhi",
            "Karnataka",
            "Tamil Nadu",
            "West Bengal",
            "Uttar Pradesh",
            "Gujarat",
            "Telangana",
        ]),
        "Pakistan" => named(&[
            "Punjab",
            "Sindh",
            "Khyber Pakhtunkhwa",
            "Balochistan",
            "Gilgit-Baltistan",
            "Azad Kashmir",
            "Islamabad Capital Territory",
        ]),
        _ => Vec::new(),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountryOption {
    pub value: String,
    pub label: String,
}

/// A country as delivered by an external country list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountryRecord {
    pub name: String,
    #[serde(default)]
    pub emoji: Option<String>,
}

/// Regional-indicator flag for a two-letter ISO code.
pub fn flag_for(code: &str) -> String {
    code.chars()
        .filter_map(|c| char::from_u32(127397 + c.to_ascii_uppercase() as u32))
        .collect()
}

/// Curated country picker options in preferred order.
///
/// When `all` is non-empty only the curated countries it contains are kept,
/// labelled with its emoji; otherwise the static list with generated flags
/// is used. A placeholder leads and an "Other" entry trails.
pub fn curated_countries(all: &[CountryRecord]) -> Vec<CountryOption> {
    let position = |name: &str| PREFERRED_COUNTRIES.iter().position(|(n, _)| *n == name);

    let mapped: Vec<CountryOption> = if all.is_empty() {
        PREFERRED_COUNTRIES
            .iter()
            .map(|(name, code)| CountryOption {
                value: name.to_string(),
                label: format!("{} {}", flag_for(code), name),
            })
            .collect()
    } else {
        let mut kept: Vec<&CountryRecord> = all
            .iter()
            .filter(|c| position(&c.name).is_some())
            .collect();
        kept.sort_by_key(|c| position(&c.name));
        kept.into_iter()
            .map(|c| CountryOption {
                value: c.name.clone(),
                label: format!("{} {}", c.emoji.as_deref().unwrap_or("🌍"), c.name),
            })
            .collect()
    };

    let mut options = Vec::with_capacity(mapped.len() + 2);
    options.push(CountryOption {
        value: String::new(),
        label: "Select your country".to_string(),
    });
    options.extend(mapped);
    options.push(CountryOption {
        value: "other".to_string(),
        label: "🌍 Other".to_string(),
    });
    options
}
