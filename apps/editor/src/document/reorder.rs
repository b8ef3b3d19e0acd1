//! Reorder Engine — one primitive for every way a section can be moved.
//!
//! Keyboard up/down, pointer drags and explicit index moves all reduce to a
//! `Reorder` request. The result is always renumbered to a dense `1..N` sequence,
//! however stale the incoming orders were.

use std::collections::HashSet;

use serde::Deserialize;

use crate::document::model::Section;
use crate::errors::EditorError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Up,
    Down,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reorder {
    /// Move one section to a position in the current ordering (clamped).
    Move { key: String, new_index: usize },
    /// Full ordering; must be a permutation of the current keys.
    Explicit(Vec<String>),
}

/// Stable sort by `order`; equal orders keep their original array position.
pub fn sorted(sections: &[Section]) -> Vec<Section> {
    let mut working = sections.to_vec();
    working.sort_by_key(|s| s.order);
    working
}

/// Builds the `Move` request for a one-step move.
pub fn step(sections: &[Section], key: &str, direction: Direction) -> Result<Reorder, EditorError> {
    let current = sorted(sections)
        .iter()
        .position(|s| s.key == key)
        .ok_or_else(|| EditorError::NotFound(format!("section '{key}'")))?;
    let new_index = match direction {
        Direction::Up => current.saturating_sub(1),
        Direction::Down => current + 1,
    };
    Ok(Reorder::Move {
        key: key.to_string(),
        new_index,
    })
}

pub fn reorder(sections: &[Section], request: &Reorder) -> Result<Vec<Section>, EditorError> {
    let mut working = sorted(sections);

    match request {
        Reorder::Move { key, new_index } => {
            let from = working
                .iter()
                .position(|s| &s.key == key)
                .ok_or_else(|| EditorError::NotFound(format!("section '{key}'")))?;
            let moved = working.remove(from);
            let to = (*new_index).min(working.len());
            working.insert(to, moved);
        }
        Reorder::Explicit(keys) => {
            working = permute(working, keys)?;
        }
    }

    for (order, section) in (1..).zip(working.iter_mut()) {
        section.order = order;
    }
    Ok(working)
}

fn permute(working: Vec<Section>, keys: &[String]) -> Result<Vec<Section>, EditorError> {
    let unique: HashSet<&str> = keys.iter().map(String::as_str).collect();
    let complete = keys.len() == working.len()
        && unique.len() == keys.len()
        && working.iter().all(|s| unique.contains(s.key.as_str()));
    if !complete {
        return Err(EditorError::Validation(
            "incomplete or foreign keys in section order".to_string(),
        ));
    }

    let mut slots: Vec<Option<Section>> = working.into_iter().map(Some).collect();
    let mut result = Vec::with_capacity(keys.len());
    for key in keys {
        if let Some(section) = slots
            .iter_mut()
            .find(|slot| slot.as_ref().is_some_and(|s| &s.key == key))
            .and_then(Option::take)
        {
            result.push(section);
        }
    }
    Ok(result)
}
