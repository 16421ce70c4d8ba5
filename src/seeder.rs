//! Database Seeder
//! Mission: Load the bundled reference data without touching existing rows

use crate::destinations::{Destination, DestinationRepo};
use anyhow::{Context, Result};
use tracing::info;

const DESTINATIONS_JSON: &str = include_str!("../data/destinations.json");

pub fn bundled_destinations() -> Result<Vec<Destination>> {
    serde_json::from_str(DESTINATIONS_JSON).context("parse bundled destinations")
}

#[derive(Clone)]
pub struct SeederService {
    destinations: DestinationRepo,
}

impl SeederService {
    pub fn new(destinations: DestinationRepo) -> Self {
        Self { destinations }
    }

    pub fn seed_destinations(&self) -> Result<usize> {
        let data = bundled_destinations()?;
        let inserted = self.destinations.insert_if_absent(&data)?;
        info!(
            "🌱 Destinations seeded ({} new, {} bundled)",
            inserted,
            data.len()
        );
        Ok(inserted)
    }

    pub fn seed_all(&self) -> Result<()> {
        self.seed_destinations()?;
        Ok(())
    }
}
