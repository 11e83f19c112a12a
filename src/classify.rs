//! Predicted-versus-actual classification.

use serde::{Deserialize, Serialize};
use std::fmt;

pub const DEFAULT_THRESHOLD_MINUTES: f64 = 10.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Category {
    /// The live wait is well below the typical wait for this hour.
    Good,
    Average,
    Bad,
    /// Two-band mode: anything that is not `Good`.
    NotGood,
}

impl Category {
    pub fn headline(self) -> &'static str {
        match self {
            Category::Good => "Good time to go!",
            Category::Average => "Average wait time.",
            Category::Bad => "Bad time to go.",
            Category::NotGood => "No longer a good time to go.",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Category::Good => "GOOD",
            Category::Average => "AVERAGE",
            Category::Bad => "BAD",
            Category::NotGood => "NOT_GOOD",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BandMode {
    Two,
    #[default]
    Three,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Classifier {
    threshold: f64,
    bands: BandMode,
}

impl Classifier {
    pub fn new(threshold: f64, bands: BandMode) -> Self {
        Self { threshold, bands }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn bands(&self) -> BandMode {
        self.bands
    }

    /// Both boundaries (`±threshold`) fall on the average / not-good side.
    pub fn classify(&self, prediction: f64, actual: u32) -> Category {
        let difference = prediction - f64::from(actual);
        if difference > self.threshold {
            return Category::Good;
        }
        match self.bands {
            BandMode::Two => Category::NotGood,
            BandMode::Three if difference >= -self.threshold => Category::Average,
            BandMode::Three => Category::Bad,
        }
    }
}

impl Default for Classifier {
    fn default() -> Self {
        Self::new(DEFAULT_THRESHOLD_MINUTES, BandMode::Three)
    }
}
