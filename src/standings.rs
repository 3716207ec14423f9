//! Ranked scoreboard for HUDs and end-of-match screens
//!
//! Rebuilt from the live entities on demand; nothing is persisted.

use serde::Serialize;

use crate::sim::{Entity, PlayerId};

/// A single scoreboard row
#[derive(Debug, Clone, Serialize)]
pub struct StandingEntry {
    pub id: PlayerId,
    pub label: String,
    pub color: String,
    pub score: u32,
    pub lives: u32,
    pub eliminated: bool,
    pub join_order: u64,
}

impl StandingEntry {
    pub fn from_entity(entity: &Entity) -> Self {
        Self {
            id: entity.id(),
            label: entity.player.label.clone(),
            color: entity.player.color.clone(),
            score: entity.score,
            lives: entity.lives,
            eliminated: entity.lifecycle.is_eliminated(),
            join_order: entity.join_order,
        }
    }

    /// Score first, then still in play, then lives left, then earliest join
    fn ranks_above(&self, other: &Self) -> bool {
        (other.score, self.eliminated, other.lives, self.join_order)
            < (self.score, other.eliminated, self.lives, other.join_order)
    }
}

/// Scoreboard, best first
#[derive(Debug, Clone, Serialize, Default)]
pub struct Standings {
    pub entries: Vec<StandingEntry>,
}

impl Standings {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    pub fn from_entities<'a>(entities: impl IntoIterator<Item = &'a Entity>) -> Self {
        let mut standings = Self::new();
        for entity in entities {
            standings.insert(StandingEntry::from_entity(entity));
        }
        standings
    }

    /// Insert a row in rank order; returns its rank (1-indexed)
    pub fn insert(&mut self, entry: StandingEntry) -> usize {
        let pos = self.entries.iter().position(|e| entry.ranks_above(e));
        match pos {
            Some(i) => {
                self.entries.insert(i, entry);
                i + 1
            }
            None => {
                self.entries.push(entry);
                self.entries.len()
            }
        }
    }

    pub fn rank_of(&self, id: PlayerId) -> Option<usize> {
        self.entries.iter().position(|e| e.id == id).map(|i| i + 1)
    }

    pub fn leader(&self) -> Option<&StandingEntry> {
        self.entries.first()
    }

    pub fn iter(&self) -> impl Iterator<Item = &StandingEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
