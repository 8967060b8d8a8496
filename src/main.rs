use bayan_app::{
    AdminDashboard, AppConfig, PlanOrderStore, ReorderOutcome, SlotWindow,
    admin::PaymentFilter,
};
use bayan_client::{ApiClient, AppointmentApi};
use bayan_core::{
    booking::is_booked,
    models::SubscriptionQuery,
    regions::timezone_for_region,
    slots::generate_slots,
    timezone::{format_12h, parse_timezone},
};
use chrono::{NaiveDate, Utc};
use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use dotenv::dotenv;
use tracing::info;
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(author, version, about = "Bayan enrollment and booking client")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Bookable slots for a date in a viewer's timezone
    Slots {
        /// Date in YYYY-MM-DD (default: tomorrow)
        #[arg(long)]
        date: Option<NaiveDate>,
        /// IANA zone (default: BAYAN_TIMEZONE)
        #[arg(long)]
        timezone: Option<String>,
        /// Offer the whole Cairo day instead of working hours
        #[arg(long)]
        full_day: bool,
    },
    /// Active plans in display order
    Plans,
    /// Slots other students already hold
    Booked {
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    /// Timezone for a country and optional state/province
    Timezone {
        country: String,
        #[arg(long)]
        region: Option<String>,
    },
    /// Zone details from TimeZoneDB
    ZoneInfo { zone: String },
    /// Admin dashboard operations (needs BAYAN_ADMIN_TOKEN)
    Admin {
        #[command(subcommand)]
        command: AdminCommand,
    },
}

#[derive(Subcommand, Debug)]
enum AdminCommand {
    /// Users, subscriptions, paid count and revenue
    Stats,
    /// Plans with local order overrides applied
    Plans,
    /// Move a plan between positions and sync the new order
    Reorder { from: usize, to: usize },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize error handling
    color_eyre::install()?;

    // Load environment variables
    dotenv().ok();

    // Load configuration
    let config = AppConfig::from_env()?;

    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_max_level(config.log_level)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let cli = Cli::parse();
    let client = ApiClient::new(config.client.clone())?;
    info!("Using API at {}", config.client.api_url);

    match cli.command {
        Command::Slots {
            date,
            timezone,
            full_day,
        } => {
            let tz = match timezone {
                Some(name) => parse_timezone(&name)?,
                None => config.client.timezone,
            };
            let date = match date {
                Some(date) => date,
                None => Utc::now()
                    .with_timezone(&tz)
                    .date_naive()
                    .succ_opt()
                    .ok_or_else(|| eyre!("Date out of range"))?,
            };
            let hours = if full_day {
                SlotWindow::FullDay.working_hours()
            } else {
                config.working_hours()
            };

            let booked = client.get_booked_slots(Some(date)).await;
            println!("Slots for {} in {}", date, tz.name());
            for slot in generate_slots(date, &hours, tz, config.offset_rule) {
                let taken = is_booked(&slot, &booked);
                println!(
                    "{:>10} {}  (Cairo {}, {}){}",
                    format_12h(slot.local_time()),
                    slot.local_date(),
                    slot.provider_time.format("%H:%M"),
                    slot.starts_at_utc.to_rfc3339(),
                    if taken { "  booked" } else { "" }
                );
            }
        }
        Command::Plans => {
            let mut plans = client.get_plans().await?;
            plans.retain(|p| p.is_active != Some(false));
            plans.sort_by_key(|p| p.sort_order());
            for plan in plans {
                println!(
                    "{:<24} {:>3} sessions/month {:>2}/week  {} {}",
                    plan.name,
                    plan.sessions_per_month.unwrap_or_default(),
                    plan.sessions_per_week.unwrap_or_default(),
                    plan.price.unwrap_or_default(),
                    plan.currency.as_deref().unwrap_or("USD")
                );
            }
        }
        Command::Booked { date } => {
            let booked = client.get_booked_slots(date).await;
            if booked.is_empty() {
                println!("No booked slots");
            }
            for slot in booked {
                let date = slot.date.map_or_else(|| "-".to_string(), |d| d.to_string());
                let time = slot
                    .time
                    .map_or_else(|| "--:--".to_string(), |t| t.format("%H:%M").to_string());
                match slot.starts_at_utc {
                    Some(instant) => println!("{date} {time}  ({})", instant.to_rfc3339()),
                    None => println!("{date} {time}"),
                }
            }
        }
        Command::Timezone { country, region } => {
            let zone = match timezone_for_region(&country, region.as_deref()) {
                Some(zone) => zone.to_string(),
                None => client.get_country_timezone(&country).await?,
            };
            println!("{zone}");
        }
        Command::ZoneInfo { zone } => {
            let details = client.timezonedb_lookup(&zone).await?;
            println!("{}", serde_json::to_string_pretty(&details)?);
        }
        Command::Admin { command } => {
            let token = config
                .admin_token
                .clone()
                .ok_or_else(|| eyre!("BAYAN_ADMIN_TOKEN must be set for admin commands"))?;
            let store = PlanOrderStore::new(&config.plan_order_file);
            let mut dashboard =
                AdminDashboard::new(client, store, config.client.timezone).with_token(token);
            run_admin(&mut dashboard, command).await?;
        }
    }

    Ok(())
}

async fn run_admin<A: AppointmentApi>(
    dashboard: &mut AdminDashboard<A>,
    command: AdminCommand,
) -> Result<()> {
    match command {
        AdminCommand::Stats => {
            let query = SubscriptionQuery {
                limit: Some(200),
                ..SubscriptionQuery::default()
            };
            dashboard.refresh_subscriptions(&query).await?;
            dashboard.refresh_users().await?;
            let stats = dashboard.stats();
            println!("Users:          {}", stats.total_users);
            println!("Subscriptions:  {}", stats.total_subscriptions);
            println!("Paid:           {}", stats.paid_subscriptions);
            let pending = dashboard.filtered_subscriptions(PaymentFilter::Pending).len();
            println!("Pending:        {}", pending);
            println!("Revenue:        {:.2}", stats.revenue);
        }
        AdminCommand::Plans => {
            dashboard.refresh_plans().await?;
            print_plans(dashboard);
        }
        AdminCommand::Reorder { from, to } => {
            dashboard.refresh_plans().await?;
            dashboard.move_plan(from, to)?;
            match dashboard.finish_reorder().await? {
                ReorderOutcome::Synced(message) => println!("{message}"),
                ReorderOutcome::LocalOnly(warning) => eprintln!("{warning}"),
            }
            print_plans(dashboard);
        }
    }
    Ok(())
}

fn print_plans<A: AppointmentApi>(dashboard: &AdminDashboard<A>) {
    for (index, plan) in dashboard.sorted_plans().into_iter().enumerate() {
        println!(
            "{:>2}. {:<24} order={:<4} id={}",
            index,
            plan.name,
            plan.sort_order(),
            plan.plan_id().unwrap_or("-")
        );
    }
}
