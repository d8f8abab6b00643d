use rand::Rng;

use crate::db::models::NewWasteLocation;
use crate::db::Store;
use crate::error::Result;
use crate::points::Difficulty;

const CITIES: &[(&str, f64, f64)] = &[
    ("New York, USA", 40.7128, -74.0060),
    ("London, UK", 51.5074, -0.1278),
    ("Tokyo, Japan", 35.6895, 139.6917),
    ("Sydney, Australia", -33.8688, 151.2093),
    ("Paris, France", 48.8566, 2.3522),
    ("Cairo, Egypt", 30.0444, 31.2357),
    ("Mexico City, Mexico", 19.4326, -99.1332),
    ("Berlin, Germany", 52.5200, 13.4050),
    ("Rome, Italy", 41.9028, 12.4964),
    ("Moscow, Russia", 55.7558, 37.6173),
    ("Mumbai, India", 19.0760, 72.8777),
    ("São Paulo, Brazil", -23.5505, -46.6333),
    ("Cape Town, South Africa", -33.9249, 18.4241),
    ("Toronto, Canada", 43.6532, -79.3832),
    ("Singapore", 1.3521, 103.8198),
];

const ADJECTIVES: &[&str] = &[
    "Sunny", "Misty", "Quiet", "Vibrant", "Lively", "Charming", "Bustling", "Serene", "Modern",
    "Historic",
];

const PLACE_TYPES: &[&str] = &[
    "Park", "Square", "Market", "Boulevard", "Street", "District", "Neighborhood", "Plaza",
    "Campus", "Center",
];

const WASTE_TYPES: &[&str] = &["Plastic", "Organic", "Mixed", "Electronic"];

// task numbering starts at 3 so the first generated task is "#3", matching the public demo map
const FIRST_TASK_NUMBER: usize = 3;

pub fn difficulty_for_task(number: usize) -> Difficulty {
    match number % 3 {
        0 => Difficulty::Easy,
        1 => Difficulty::Medium,
        _ => Difficulty::Hard,
    }
}

pub fn generate_demo_tasks<R: Rng>(rng: &mut R, count: usize) -> Vec<NewWasteLocation> {
    (0..count)
        .map(|i| {
            let number = i + FIRST_TASK_NUMBER;
            let (city, lat, lon) = CITIES[rng.random_range(0..CITIES.len())];
            let adjective = ADJECTIVES[rng.random_range(0..ADJECTIVES.len())];
            let place_type = PLACE_TYPES[rng.random_range(0..PLACE_TYPES.len())];
            let waste_type = WASTE_TYPES[rng.random_range(0..WASTE_TYPES.len())];
            let difficulty = difficulty_for_task(number);

            NewWasteLocation {
                latitude: round4(lat + rng.random_range(-0.5..0.5)),
                longitude: round4(lon + rng.random_range(-0.5..0.5)),
                title: format!("Cleanup Task #{number}: {adjective} {place_type} in {city}"),
                description: format!(
                    "Join the cleanup in {city} at the {} {}. Your effort will help protect local communities and the environment.",
                    adjective.to_lowercase(),
                    place_type.to_lowercase()
                ),
                waste_type: waste_type.to_string(),
                difficulty,
                points: difficulty.advertised_points(),
            }
        })
        .collect()
}

fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}

/// Fills an empty task table; leaves existing tasks alone.
pub async fn seed_demo_tasks(store: &Store, count: usize) -> Result<usize> {
    if count == 0 || store.count_waste_locations().await? > 0 {
        return Ok(0);
    }

    let tasks = generate_demo_tasks(&mut rand::rng(), count);
    let inserted = store.insert_waste_locations(tasks).await?;
    tracing::info!("Seeded {} demo collection tasks", inserted);

    Ok(inserted)
}
