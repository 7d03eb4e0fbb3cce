// Utility to populate the database with sample profiles for exercising reminders

use std::{env, process};

use anyhow::Context;
use chrono::{DateTime, Datelike, NaiveDate, Utc};
use fake::faker::address::en::CityName;
use fake::faker::company::en::{CompanyName, Profession};
use fake::faker::internet::en::SafeEmail;
use fake::faker::name::en::Name;
use fake::Fake;
use rand::Rng;

use alumni::configuration::Settings;
use alumni::domain::{parse_ddmmyyyy, EmailAddress, ProfileRecord};
use alumni::profile_store::upsert_profile;
use alumni::startup::get_db_pool;

/// Time zones assigned to generated profiles
const TIME_ZONES: [&str; 5] = [
    "UTC",
    "Asia/Kolkata",
    "America/New_York",
    "Europe/London",
    "Australia/Sydney",
];

/// Generate a random profile, opted into reminders most of the time
fn generate(user_id: i64) -> ProfileRecord {
    let mut rng = rand::thread_rng();
    let birthday = NaiveDate::from_yo_opt(rng.gen_range(1950..2005), rng.gen_range(1..=365));
    let marriage_anniversary = rng
        .gen_bool(0.5)
        .then(|| NaiveDate::from_yo_opt(rng.gen_range(1975..2024), rng.gen_range(1..=365)))
        .flatten();

    ProfileRecord {
        user_id,
        full_name: Some(Name().fake()),
        email_id: Some(SafeEmail().fake()),
        city: Some(CityName().fake()),
        birthday,
        marriage_anniversary,
        timezone: Some(TIME_ZONES[rng.gen_range(0..TIME_ZONES.len())].to_string()),
        receive_email_reminders: rng.gen_bool(0.8),
        current_occupation: Some(Profession().fake()),
        company_name: Some(CompanyName().fake()),
        ..ProfileRecord::default()
    }
}

/// Make a profile celebrate its birthday on the current UTC day
fn celebrate_today(profile: &mut ProfileRecord, now: DateTime<Utc>) {
    let today = now.date_naive();
    // A leap year keeps Feb 29 representable
    profile.birthday = NaiveDate::from_ymd_opt(1992, today.month(), today.day());
    profile.timezone = Some("UTC".to_string());
    profile.receive_email_reminders = true;
}

/// Generate sample profiles and store them in the database
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse command line arguments
    let args: Vec<String> = env::args().collect();
    if args.iter().skip(1).any(|arg| arg.starts_with('-')) {
        usage(&args[0]);
    }

    // Decide the course of action based on the number of arguments
    let profiles = match args.len() {
        // Generate 10 sample profiles, one of them celebrating a birthday today
        1 => {
            let mut profiles: Vec<ProfileRecord> = (1..=10).map(generate).collect();
            celebrate_today(&mut profiles[0], Utc::now());
            profiles
        }

        // Generate the specified number of sample profiles
        2 => {
            let count: i64 = args[1].parse().context("Invalid number of profiles")?;
            (1..=count).map(generate).collect()
        }

        // Generate an opted-in profile with the specified id, email and `DDMMYYYY` birthday
        4 => {
            let user_id: i64 = args[1].parse().context("Invalid user id")?;
            let email = EmailAddress::parse(args[2].clone()).map_err(anyhow::Error::msg)?;
            let birthday = parse_ddmmyyyy(&args[3])
                .with_context(|| format!("`{}` is not a DDMMYYYY date", args[3]))?;
            let mut profile = generate(user_id);
            profile.email_id = Some(email.to_string());
            profile.birthday = Some(birthday);
            profile.receive_email_reminders = true;
            vec![profile]
        }

        // Print usage and exit
        _ => usage(&args[0]),
    };

    let config = Settings::get_config().context("Failed to load configuration")?;
    let db_pool = get_db_pool(&config.database);
    for profile in &profiles {
        upsert_profile(profile, &db_pool).await?;
        println!("{profile:?}");
    }

    Ok(())
}

/// Print usage information and exit
fn usage(prog: &str) -> ! {
    println!("Usage:");
    println!("{prog} [count]");
    println!("{prog} <user_id> <email> <birthday as DDMMYYYY>");
    println!("\nExamples:");
    println!("{prog}");
    println!("{prog} 50");
    println!("{prog} 1 ursula@example.com 21101929");

    process::exit(1);
}
