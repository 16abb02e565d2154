use anyhow::Context;
use chrono::NaiveDate;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::aggregate;
use crate::models::{
    AggregatedProfile, ProfileRecord, SubmissionLogEntry, TestCategory, TestSubmission,
    TraitPercentages,
};

pub async fn init_db(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

async fn upsert_user(pool: &PgPool, email: &str, display_name: &str) -> anyhow::Result<Uuid> {
    let id: Uuid = sqlx::query(
        r#"
        INSERT INTO mbti_profiles.users (id, email, display_name)
        VALUES ($1, $2, $3)
        ON CONFLICT (email) DO UPDATE
        SET display_name = EXCLUDED.display_name
        RETURNING id
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(email)
    .bind(display_name)
    .fetch_one(pool)
    .await?
    .get("id");
    Ok(id)
}

pub async fn fetch_submissions(
    pool: &PgPool,
    user_id: Uuid,
) -> anyhow::Result<Vec<TestSubmission>> {
    let rows = sqlx::query(
        r#"
        SELECT category, claimed_type, taken_on,
               extraversion, introversion, sensing, intuition,
               thinking, feeling, judging, perceiving
        FROM mbti_profiles.submissions
        WHERE user_id = $1
        "#,
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    let mut submissions = Vec::new();
    for row in rows {
        let category: String = row.get("category");
        submissions.push(TestSubmission {
            user_id,
            category: aggregate::parse_category(&category)
                .context("stored submission has an unknown category")?,
            claimed_type: row.get("claimed_type"),
            percentages: percentages_from_row(&row),
            taken_on: row.get("taken_on"),
        });
    }
    Ok(submissions)
}

/// Validates, folds the submission into the user's stored set, and writes the
/// replaced submission row and the recomputed profile in one transaction.
/// A validation failure returns before anything is written.
pub async fn record_submission(
    pool: &PgPool,
    email: &str,
    display_name: &str,
    category: TestCategory,
    claimed_type: &str,
    percentages: TraitPercentages,
    taken_on: NaiveDate,
) -> anyhow::Result<AggregatedProfile> {
    aggregate::validate_percentages(&percentages)?;

    let user_id = upsert_user(pool, email, display_name).await?;
    let existing = fetch_submissions(pool, user_id).await?;
    let newest = TestSubmission {
        user_id,
        category,
        claimed_type: claimed_type.to_string(),
        percentages,
        taken_on,
    };
    let profile = aggregate::recompute_profile(&existing, &newest)?;

    let mut tx = pool.begin().await?;

    sqlx::query(
        r#"
        INSERT INTO mbti_profiles.submissions
        (id, user_id, category, claimed_type,
         extraversion, introversion, sensing, intuition,
         thinking, feeling, judging, perceiving, taken_on)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
        ON CONFLICT (user_id, category) DO UPDATE
        SET claimed_type = EXCLUDED.claimed_type,
            extraversion = EXCLUDED.extraversion,
            introversion = EXCLUDED.introversion,
            sensing = EXCLUDED.sensing,
            intuition = EXCLUDED.intuition,
            thinking = EXCLUDED.thinking,
            feeling = EXCLUDED.feeling,
            judging = EXCLUDED.judging,
            perceiving = EXCLUDED.perceiving,
            taken_on = EXCLUDED.taken_on
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(user_id)
    .bind(newest.category.as_str())
    .bind(&newest.claimed_type)
    .bind(newest.percentages.extraversion)
    .bind(newest.percentages.introversion)
    .bind(newest.percentages.sensing)
    .bind(newest.percentages.intuition)
    .bind(newest.percentages.thinking)
    .bind(newest.percentages.feeling)
    .bind(newest.percentages.judging)
    .bind(newest.percentages.perceiving)
    .bind(newest.taken_on)
    .execute(&mut *tx)
    .await?;

    let breakdown_json = serde_json::to_string(&profile.breakdown)
        .context("failed to serialize profile breakdown")?;

    sqlx::query(
        r#"
        INSERT INTO mbti_profiles.profiles
        (user_id, mbti_type,
         extraversion, introversion, sensing, intuition,
         thinking, feeling, judging, perceiving,
         profile_title, breakdown, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, now())
        ON CONFLICT (user_id) DO UPDATE
        SET mbti_type = EXCLUDED.mbti_type,
            extraversion = EXCLUDED.extraversion,
            introversion = EXCLUDED.introversion,
            sensing = EXCLUDED.sensing,
            intuition = EXCLUDED.intuition,
            thinking = EXCLUDED.thinking,
            feeling = EXCLUDED.feeling,
            judging = EXCLUDED.judging,
            perceiving = EXCLUDED.perceiving,
            profile_title = EXCLUDED.profile_title,
            breakdown = EXCLUDED.breakdown,
            updated_at = now()
        "#,
    )
    .bind(user_id)
    .bind(&profile.mbti_type)
    .bind(profile.percentages.extraversion)
    .bind(profile.percentages.introversion)
    .bind(profile.percentages.sensing)
    .bind(profile.percentages.intuition)
    .bind(profile.percentages.thinking)
    .bind(profile.percentages.feeling)
    .bind(profile.percentages.judging)
    .bind(profile.percentages.perceiving)
    .bind(&profile.profile_title)
    .bind(&breakdown_json)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(profile)
}

pub async fn fetch_profiles(
    pool: &PgPool,
    email: Option<&str>,
) -> anyhow::Result<Vec<ProfileRecord>> {
    let mut query = String::from(
        "SELECT u.display_name, u.email, p.mbti_type, p.profile_title, p.breakdown, \
         p.extraversion, p.introversion, p.sensing, p.intuition, \
         p.thinking, p.feeling, p.judging, p.perceiving \
         FROM mbti_profiles.profiles p \
         JOIN mbti_profiles.users u ON u.id = p.user_id",
    );
    if email.is_some() {
        query.push_str(" WHERE u.email = $1");
    }
    query.push_str(" ORDER BY u.email");

    let mut rows = sqlx::query(&query);
    if let Some(value) = email {
        rows = rows.bind(value);
    }

    let records = rows.fetch_all(pool).await?;
    let mut profiles = Vec::new();
    for row in records {
        let breakdown_json: String = row.get("breakdown");
        profiles.push(ProfileRecord {
            user_name: row.get("display_name"),
            user_email: row.get("email"),
            mbti_type: row.get("mbti_type"),
            percentages: percentages_from_row(&row),
            breakdown: serde_json::from_str(&breakdown_json)
                .context("stored profile breakdown is not valid JSON")?,
            profile_title: row.get("profile_title"),
        });
    }
    Ok(profiles)
}

pub async fn fetch_recent_submissions(
    pool: &PgPool,
    email: Option<&str>,
    limit: i64,
) -> anyhow::Result<Vec<SubmissionLogEntry>> {
    let mut query = String::from(
        "SELECT u.display_name, u.email, s.category, s.claimed_type, s.taken_on \
         FROM mbti_profiles.submissions s \
         JOIN mbti_profiles.users u ON u.id = s.user_id",
    );
    if email.is_some() {
        query.push_str(" WHERE u.email = $2");
    }
    query.push_str(" ORDER BY s.taken_on DESC LIMIT $1");

    let mut rows = sqlx::query(&query).bind(limit);
    if let Some(value) = email {
        rows = rows.bind(value);
    }

    let records = rows.fetch_all(pool).await?;
    let mut entries = Vec::new();
    for row in records {
        let category: String = row.get("category");
        entries.push(SubmissionLogEntry {
            user_name: row.get("display_name"),
            user_email: row.get("email"),
            category: aggregate::parse_category(&category)
                .context("stored submission has an unknown category")?,
            claimed_type: row.get("claimed_type"),
            taken_on: row.get("taken_on"),
        });
    }
    Ok(entries)
}

pub async fn seed(pool: &PgPool) -> anyhow::Result<()> {
    let submissions = vec![
        (
            "Avery Lee",
            "avery.lee@example.com",
            TestCategory::Mbti100,
            "INTJ",
            [20.0, 30.0, 70.0, 75.0],
            NaiveDate::from_ymd_opt(2026, 1, 28).context("invalid date")?,
        ),
        (
            "Avery Lee",
            "avery.lee@example.com",
            TestCategory::Mbti24,
            "ENFP",
            [60.0, 35.0, 45.0, 40.0],
            NaiveDate::from_ymd_opt(2026, 2, 9).context("invalid date")?,
        ),
        (
            "Jules Moreno",
            "jules.moreno@example.com",
            TestCategory::Mbti8,
            "ESFJ",
            [72.0, 64.0, 38.0, 66.0],
            NaiveDate::from_ymd_opt(2026, 2, 2).context("invalid date")?,
        ),
        (
            "Kiara Patel",
            "kiara.patel@example.com",
            TestCategory::Mbti24,
            "ISTP",
            [35.0, 58.0, 61.0, 42.0],
            NaiveDate::from_ymd_opt(2026, 2, 11).context("invalid date")?,
        ),
    ];

    for (name, email, category, claimed_type, [e, s, t, j], taken_on) in submissions {
        let percentages = TraitPercentages {
            extraversion: e,
            introversion: 100.0 - e,
            sensing: s,
            intuition: 100.0 - s,
            thinking: t,
            feeling: 100.0 - t,
            judging: j,
            perceiving: 100.0 - j,
        };
        record_submission(pool, email, name, category, claimed_type, percentages, taken_on)
            .await?;
    }

    Ok(())
}

pub async fn import_csv(pool: &PgPool, csv_path: &std::path::Path) -> anyhow::Result<usize> {
    #[derive(serde::Deserialize)]
    struct CsvRow {
        full_name: String,
        email: String,
        category: String,
        claimed_type: String,
        extraversion: f64,
        introversion: f64,
        sensing: f64,
        intuition: f64,
        thinking: f64,
        feeling: f64,
        judging: f64,
        perceiving: f64,
        taken_on: NaiveDate,
    }

    let mut reader = csv::Reader::from_path(csv_path)?;
    let mut imported = 0usize;

    for result in reader.deserialize::<CsvRow>() {
        let row = result?;
        let category = aggregate::parse_category(&row.category)?;
        let percentages = TraitPercentages {
            extraversion: row.extraversion,
            introversion: row.introversion,
            sensing: row.sensing,
            intuition: row.intuition,
            thinking: row.thinking,
            feeling: row.feeling,
            judging: row.judging,
            perceiving: row.perceiving,
        };
        record_submission(
            pool,
            &row.email,
            &row.full_name,
            category,
            &row.claimed_type,
            percentages,
            row.taken_on,
        )
        .await
        .with_context(|| format!("failed to import submission for {}", row.email))?;
        imported += 1;
    }

    Ok(imported)
}

fn percentages_from_row(row: &sqlx::postgres::PgRow) -> TraitPercentages {
    TraitPercentages {
        extraversion: row.get("extraversion"),
        introversion: row.get("introversion"),
        sensing: row.get("sensing"),
        intuition: row.get("intuition"),
        thinking: row.get("thinking"),
        feeling: row.get("feeling"),
        judging: row.get("judging"),
        perceiving: row.get("perceiving"),
    }
}
