//! Built-in content catalog.
//!
//! Milestones, analysis statuses, daily facts, collection cards, and shop
//! items live in `contrib/catalog/default.toml`, embedded at compile time
//! and parsed once on first use.

use crate::streak::Milestone;
use crate::types::Category;
use chrono::NaiveDate;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

const DEFAULT_CATALOG: &str = include_str!("../../../contrib/catalog/default.toml");

static CATALOG: OnceLock<Catalog> = OnceLock::new();

/// Top-level catalog file structure.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Catalog {
    #[serde(default)]
    pub milestones: Vec<MilestoneEntry>,
    #[serde(default)]
    pub statuses: Vec<StatusTitle>,
    #[serde(default)]
    pub facts: Vec<Fact>,
    #[serde(default)]
    pub cards: Vec<Card>,
    #[serde(default)]
    pub shop: Vec<ShopItem>,
}

/// One `[[milestones]]` row.
#[derive(Debug, Clone, Deserialize)]
pub struct MilestoneEntry {
    pub category: Category,
    pub threshold_days: u32,
    pub reward: String,
}

/// A titled result shown after a photo analysis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusTitle {
    pub title: String,
    pub description: String,
}

impl StatusTitle {
    /// Text shared alongside the analysed photo.
    pub fn share_message(&self) -> String {
        format!(
            "My Virgin Status: {}\n{}\nDetected by Virgin Detector App! 🔍",
            self.title, self.description
        )
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Fact {
    pub category: Category,
    pub text: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Badge {
    Dragon,
    Feature,
    Premium,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Animation {
    Sparkle,
    Glow,
    Pulse,
}

/// A collectible card in the gallery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Card {
    pub id: String,
    pub image_uri: String,
    pub date: NaiveDate,
    pub status: String,
    pub category: Category,
    pub streak_days: u32,
    pub animation: Animation,
    pub badge: Badge,
}

impl Card {
    /// Plain-text rendering of the card face, used for export.
    pub fn export_text(&self) -> String {
        format!(
            "{status} [{badge:?}]\nVerified 100% Pure\n{days} Days\n{date}",
            status = self.status,
            badge = self.badge,
            days = self.streak_days,
            date = self.date,
        )
    }

    /// Confirmation shown after the card is saved.
    pub fn saved_message(&self) -> &'static str {
        match self.category {
            Category::Virgin => "Your virgin card has been preserved for eternity!",
            Category::NoFap => "Your NoFap achievement has been saved!",
        }
    }
}

/// A premium feature offered in the shop.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShopItem {
    pub id: String,
    pub title: String,
    pub price: String,
    pub description: String,
    #[serde(default = "default_available")]
    pub available: bool,
}

fn default_available() -> bool {
    true
}

impl ShopItem {
    pub fn action_label(&self) -> &'static str {
        if self.available {
            "Get Now"
        } else {
            "Coming Soon"
        }
    }
}

/// Parse a catalog from TOML source.
pub fn parse_catalog(src: &str) -> Result<Catalog, toml::de::Error> {
    toml::from_str(src)
}

/// The embedded catalog. An unparsable catalog is logged and treated as empty.
pub fn catalog() -> &'static Catalog {
    CATALOG.get_or_init(|| match parse_catalog(DEFAULT_CATALOG) {
        Ok(c) => c,
        Err(e) => {
            tracing::error!(error = %e, "bad embedded catalog TOML");
            Catalog::default()
        }
    })
}

impl Catalog {
    /// Milestones for a category, ordered by threshold, none achieved.
    pub fn milestones_for(&self, category: Category) -> Vec<Milestone> {
        let mut list: Vec<Milestone> = self
            .milestones
            .iter()
            .filter(|m| m.category == category)
            .map(|m| Milestone::new(m.threshold_days, m.reward.clone()))
            .collect();
        list.sort_by_key(|m| m.threshold_days);
        list
    }

    pub fn pick_status<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<&StatusTitle> {
        self.statuses.choose(rng)
    }

    pub fn daily_fact<R: Rng + ?Sized>(&self, category: Category, rng: &mut R) -> Option<&str> {
        let facts: Vec<&Fact> = self.facts.iter().filter(|f| f.category == category).collect();
        facts.choose(rng).copied().map(|f| f.text.as_str())
    }

    pub fn find_card(&self, id: &str) -> Option<&Card> {
        self.cards.iter().find(|c| c.id == id)
    }

    pub fn find_item(&self, id: &str) -> Option<&ShopItem> {
        self.shop.iter().find(|i| i.id == id)
    }
}

/// Shorthand for [`Catalog::milestones_for`] on the embedded catalog.
pub fn milestones_for(category: Category) -> Vec<Milestone> {
    catalog().milestones_for(category)
}
