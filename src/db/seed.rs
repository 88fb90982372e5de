//! Deterministic demo data for an empty database
//!
//! Generated from a fixed RNG seed so every fresh deployment starts with the
//! same users, catalogue and watch history.

use std::collections::HashSet;

use anyhow::Context;
use chrono::{DateTime, Duration, Utc};
use rand::distributions::WeightedIndex;
use rand::prelude::*;
use rand::rngs::StdRng;
use sqlx::PgPool;

pub const SEED: u64 = 42;

const USER_COUNT: usize = 20;
const CONTENT_COUNT: usize = 50;
const WATCH_EVENT_DRAWS: usize = 200;

const COUNTRIES: [&str; 8] = ["US", "GB", "CA", "AU", "DE", "FR", "JP", "BR"];
const SUBSCRIPTIONS: [(&str, f64); 3] = [("free", 0.5), ("basic", 0.3), ("premium", 0.2)];
const GENRES: [&str; 5] = ["action", "drama", "comedy", "thriller", "sci-fi"];

fn titles_for(genre: &str) -> &'static [&'static str] {
    match genre {
        "action" => &[
            "Die Hard",
            "Mad Max: Fury Road",
            "John Wick",
            "The Dark Knight",
            "Gladiator",
            "Top Gun: Maverick",
            "The Raid",
            "Mission: Impossible",
            "Casino Royale",
            "The Avengers",
        ],
        "drama" => &[
            "The Shawshank Redemption",
            "Forrest Gump",
            "The Godfather",
            "Schindler's List",
            "A Beautiful Mind",
            "12 Angry Men",
            "Parasite",
            "Moonlight",
            "Whiplash",
            "The Green Mile",
        ],
        "comedy" => &[
            "Superbad",
            "The Hangover",
            "Bridesmaids",
            "Step Brothers",
            "Anchorman",
            "Mean Girls",
            "Borat",
            "Hot Fuzz",
            "Groundhog Day",
            "The Grand Budapest Hotel",
        ],
        "thriller" => &[
            "Se7en",
            "Gone Girl",
            "Zodiac",
            "Prisoners",
            "Sicario",
            "No Country for Old Men",
            "Nightcrawler",
            "Shutter Island",
            "The Silence of the Lambs",
            "Oldboy",
        ],
        _ => &[
            "Blade Runner 2049",
            "Interstellar",
            "The Matrix",
            "Arrival",
            "Dune",
            "Ex Machina",
            "Alien",
            "Inception",
            "Edge of Tomorrow",
            "2001: A Space Odyssey",
        ],
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SeedUser {
    pub age: i32,
    pub country: String,
    pub subscription_type: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SeedContent {
    pub title: String,
    pub genre: String,
    pub popularity_score: f64,
    pub created_at: DateTime<Utc>,
}

/// Ids refer to rows in insertion order, starting at 1
#[derive(Debug, Clone, PartialEq)]
pub struct SeedWatchEvent {
    pub user_id: i64,
    pub content_id: i64,
    pub watched_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SeedData {
    pub users: Vec<SeedUser>,
    pub content: Vec<SeedContent>,
    pub watch_history: Vec<SeedWatchEvent>,
}

impl SeedData {
    /// Builds the data set for `seed`, with timestamps relative to `now`
    pub fn generate(seed: u64, now: DateTime<Utc>) -> anyhow::Result<Self> {
        let mut rng = StdRng::seed_from_u64(seed);

        let users = generate_users(&mut rng, now)?;
        let content = generate_content(&mut rng, now);
        let watch_history = generate_watch_history(&mut rng, now);

        Ok(Self {
            users,
            content,
            watch_history,
        })
    }
}

fn days_ago(rng: &mut StdRng, now: DateTime<Utc>, max_days: i64) -> DateTime<Utc> {
    now - Duration::days(rng.gen_range(0..max_days))
}

fn generate_users(rng: &mut StdRng, now: DateTime<Utc>) -> anyhow::Result<Vec<SeedUser>> {
    let subscriptions = WeightedIndex::new(SUBSCRIPTIONS.iter().map(|(_, w)| *w))
        .context("invalid subscription weights")?;

    Ok((0..USER_COUNT)
        .map(|_| SeedUser {
            age: rng.gen_range(18..66),
            country: COUNTRIES[rng.gen_range(0..COUNTRIES.len())].to_string(),
            subscription_type: SUBSCRIPTIONS[subscriptions.sample(rng)].0.to_string(),
            created_at: days_ago(rng, now, 365),
        })
        .collect())
}

/// Popularity skewed toward the low end, in `[0.01, 1.0]` at two decimals
fn skewed_popularity(rng: &mut StdRng) -> f64 {
    let u: f64 = rng.gen();
    let raw = u.max(0.001).powi(2).max(0.01);
    (raw * 100.0).round() / 100.0
}

fn generate_content(rng: &mut StdRng, now: DateTime<Utc>) -> Vec<SeedContent> {
    (0..CONTENT_COUNT)
        .map(|i| {
            let genre = GENRES[i % GENRES.len()];
            let titles = titles_for(genre);
            let base = titles[i % titles.len()];
            // Titles repeat once the genre rotation wraps, so number the repeats
            let title = if i >= GENRES.len() {
                format!("{} {}", base, i / GENRES.len() + 1)
            } else {
                base.to_string()
            };

            SeedContent {
                title,
                genre: genre.to_string(),
                popularity_score: skewed_popularity(rng),
                created_at: days_ago(rng, now, 730),
            }
        })
        .collect()
}

/// Index in `1..=n`, biased toward low ids by `exponent`
fn skewed_id(rng: &mut StdRng, n: usize, exponent: f64) -> i64 {
    let u: f64 = rng.gen();
    let id = (u.powf(exponent) * n as f64).ceil() as i64;
    id.clamp(1, n as i64)
}

fn generate_watch_history(rng: &mut StdRng, now: DateTime<Utc>) -> Vec<SeedWatchEvent> {
    let mut seen = HashSet::new();
    let mut events = Vec::new();

    for _ in 0..WATCH_EVENT_DRAWS {
        let user_id = skewed_id(rng, USER_COUNT, 1.5);
        let content_id = skewed_id(rng, CONTENT_COUNT, 1.3);
        if !seen.insert((user_id, content_id)) {
            continue;
        }

        events.push(SeedWatchEvent {
            user_id,
            content_id,
            watched_at: days_ago(rng, now, 180),
        });
    }

    events
}

/// Seeds the database when it holds no users
///
/// Returns whether any data was written. Tables are truncated with their
/// identity sequences reset so the generated ids line up with the rows.
pub async fn seed_if_empty(pool: &PgPool) -> anyhow::Result<bool> {
    let existing: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
        .fetch_one(pool)
        .await
        .context("Failed to count users")?;

    if existing > 0 {
        tracing::info!(users = existing, "Database already seeded, skipping");
        return Ok(false);
    }

    let data = SeedData::generate(SEED, Utc::now())?;
    insert(pool, &data).await?;

    tracing::info!(
        users = data.users.len(),
        content = data.content.len(),
        watch_events = data.watch_history.len(),
        "Seeded database"
    );
    Ok(true)
}

async fn insert(pool: &PgPool, data: &SeedData) -> anyhow::Result<()> {
    let mut tx = pool.begin().await?;

    sqlx::query("TRUNCATE user_watch_history, content, users RESTART IDENTITY CASCADE")
        .execute(&mut *tx)
        .await
        .context("Failed to truncate tables")?;

    for user in &data.users {
        sqlx::query(
            "INSERT INTO users (age, country, subscription_type, created_at) VALUES ($1, $2, $3, $4)",
        )
        .bind(user.age)
        .bind(&user.country)
        .bind(&user.subscription_type)
        .bind(user.created_at)
        .execute(&mut *tx)
        .await
        .context("Failed to insert user")?;
    }

    for item in &data.content {
        sqlx::query(
            "INSERT INTO content (title, genre, popularity_score, created_at) VALUES ($1, $2, $3, $4)",
        )
        .bind(&item.title)
        .bind(&item.genre)
        .bind(item.popularity_score)
        .bind(item.created_at)
        .execute(&mut *tx)
        .await
        .context("Failed to insert content")?;
    }

    for event in &data.watch_history {
        sqlx::query(
            "INSERT INTO user_watch_history (user_id, content_id, watched_at) VALUES ($1, $2, $3)",
        )
        .bind(event.user_id)
        .bind(event.content_id)
        .bind(event.watched_at)
        .execute(&mut *tx)
        .await
        .context("Failed to insert watch event")?;
    }

    tx.commit().await?;
    Ok(())
}
