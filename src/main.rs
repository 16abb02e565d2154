use std::path::PathBuf;

use anyhow::Context;
use chrono::{NaiveDate, Utc};
use clap::{Parser, Subcommand};
use sqlx::postgres::PgPoolOptions;

mod aggregate;
mod db;
mod models;
mod report;

use models::TraitPercentages;

#[derive(Parser)]
#[command(name = "mbti-profile-tracker")]
#[command(about = "Weighted MBTI profile tracker for quiz submissions", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the database schema
    InitDb,
    /// Load realistic seed data
    Seed,
    /// Import submissions from a CSV file
    Import {
        #[arg(long)]
        csv: PathBuf,
    },
    /// Record one submission and recompute the user's profile
    Submit {
        #[arg(long)]
        email: String,
        /// Display name; defaults to the email address
        #[arg(long)]
        name: Option<String>,
        /// Test variant: mbti-8, mbti-24 or mbti-100
        #[arg(long)]
        category: String,
        /// The 4-letter type the quiz itself reported
        #[arg(long)]
        claimed_type: String,
        #[arg(long)]
        e: f64,
        #[arg(long)]
        i: f64,
        #[arg(long)]
        s: f64,
        #[arg(long)]
        n: f64,
        #[arg(long)]
        t: f64,
        #[arg(long)]
        f: f64,
        #[arg(long)]
        j: f64,
        #[arg(long)]
        p: f64,
        /// Date the test was taken; defaults to today
        #[arg(long)]
        taken_on: Option<NaiveDate>,
    },
    /// Show a user's aggregated profile
    Profile {
        #[arg(long)]
        email: String,
    },
    /// Generate a markdown report
    Report {
        #[arg(long)]
        email: Option<String>,
        #[arg(long, default_value_t = 20)]
        recent: i64,
        #[arg(long, default_value = "profile-report.md")]
        out: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let database_url = std::env::var("DATABASE_URL")
        .context("DATABASE_URL must be set to a Postgres instance")?;

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await
        .context("failed to connect to Postgres")?;

    match cli.command {
        Commands::InitDb => {
            db::init_db(&pool).await?;
            println!("Schema ready.");
        }
        Commands::Seed => {
            db::seed(&pool).await?;
            println!("Seed data inserted.");
        }
        Commands::Import { csv } => {
            let imported = db::import_csv(&pool, &csv).await?;
            println!("Imported {imported} submissions from {}.", csv.display());
        }
        Commands::Submit {
            email,
            name,
            category,
            claimed_type,
            e,
            i,
            s,
            n,
            t,
            f,
            j,
            p,
            taken_on,
        } => {
            let category = aggregate::parse_category(&category)?;
            let percentages = TraitPercentages {
                extraversion: e,
                introversion: i,
                sensing: s,
                intuition: n,
                thinking: t,
                feeling: f,
                judging: j,
                perceiving: p,
            };
            let taken_on = taken_on.unwrap_or_else(|| Utc::now().date_naive());
            let display_name = name.unwrap_or_else(|| email.clone());
            let profile = db::record_submission(
                &pool,
                &email,
                &display_name,
                category,
                &claimed_type,
                percentages,
                taken_on,
            )
            .await?;

            println!("Profile for {email} is now {}.", profile.profile_title);
            for entry in profile.breakdown.iter() {
                println!("- counted {} at weight {:.0}", entry.category, entry.base_weight);
            }
        }
        Commands::Profile { email } => {
            let profiles = db::fetch_profiles(&pool, Some(&email)).await?;
            match profiles.first() {
                None => println!("No profile stored for {email}."),
                Some(profile) => {
                    println!("{} ({})", profile.user_name, profile.user_email);
                    println!("Type: {}", profile.profile_title);
                    println!("Traits: {}", report::format_pairs(profile));
                    for entry in profile.breakdown.iter() {
                        println!("- {} at weight {:.0}", entry.category, entry.base_weight);
                    }
                }
            }
        }
        Commands::Report { email, recent, out } => {
            let profiles = db::fetch_profiles(&pool, email.as_deref()).await?;
            let submissions =
                db::fetch_recent_submissions(&pool, email.as_deref(), recent).await?;
            let report = report::build_report(email.as_deref(), &profiles, &submissions);
            std::fs::write(&out, report)?;
            println!("Report written to {}.", out.display());
        }
    }

    Ok(())
}
