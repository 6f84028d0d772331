//! Learned property order.
//!
//! Remembers, per item kind ("action", "status effect", "timeline item"), which key
//! was seen directly before and after each property. Later maps of the same kind are
//! checked against that order. The memory lives as long as the session that owns it
//! and is shared by every document linted in that session.

use std::collections::{HashMap, HashSet};

use tower_lsp::lsp_types::Location;

#[derive(Debug, Clone, PartialEq)]
pub struct PropertyOrder {
    /// Where the relation was last adjusted.
    pub location: Location,
    pub after: Option<String>,
    pub before: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    After,
    Before,
}

#[derive(Debug, Default, Clone)]
pub struct PropertyOrderMemory {
    kinds: HashMap<String, HashMap<String, PropertyOrder>>,
}

impl PropertyOrderMemory {
    pub fn new() -> PropertyOrderMemory {
        PropertyOrderMemory::default()
    }

    pub fn clear(&mut self) {
        self.kinds.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.kinds.values().all(HashMap::is_empty)
    }

    pub fn get(&self, kind: &str, property: &str) -> Option<&PropertyOrder> {
        self.kinds.get(kind)?.get(property)
    }

    /// Records a property seen for the first time.
    pub fn learn(&mut self, kind: &str, property: &str, order: PropertyOrder) {
        self.kinds
            .entry(kind.to_string())
            .or_default()
            .insert(property.to_string(), order);
    }

    /// Follows the learned chain from `property` in one direction until reaching a
    /// key accepted by `present`.
    pub fn anchor(
        &self,
        kind: &str,
        property: &str,
        direction: Direction,
        present: impl Fn(&str) -> bool,
    ) -> Option<String> {
        let order = self.kinds.get(kind)?;
        let step = |item: &PropertyOrder| match direction {
            Direction::After => item.after.clone(),
            Direction::Before => item.before.clone(),
        };

        let mut visited = HashSet::new();
        let mut current = step(order.get(property)?);
        while let Some(key) = current {
            if present(&key) {
                return Some(key);
            }
            if !visited.insert(key.clone()) {
                return None;
            }
            current = order.get(&key).and_then(step);
        }
        None
    }

    /// Extends the learned relations of a known property with the neighbors it was
    /// just seen with. Existing relations are kept unless their chain runs into a key
    /// the memory knows nothing about.
    pub fn extend(
        &mut self,
        kind: &str,
        property: &str,
        after: Option<&str>,
        before: Option<&str>,
        location: Location,
    ) {
        let new_after = self.relaxed(kind, property, Direction::After, after);
        let new_before = self.relaxed(kind, property, Direction::Before, before);

        let Some(item) = self.kinds.get_mut(kind).and_then(|it| it.get_mut(property)) else {
            return;
        };
        let mut changed = false;
        if let Some(after) = new_after {
            item.after = Some(after);
            changed = true;
        }
        if let Some(before) = new_before {
            item.before = Some(before);
            changed = true;
        }
        if changed {
            item.location = location;
        }
    }

    fn relaxed(
        &self,
        kind: &str,
        property: &str,
        direction: Direction,
        neighbor: Option<&str>,
    ) -> Option<String> {
        let neighbor = neighbor?;
        let order = self.kinds.get(kind)?;
        let step = |item: &PropertyOrder| match direction {
            Direction::After => item.after.clone(),
            Direction::Before => item.before.clone(),
        };

        let Some(mut current) = step(order.get(property)?) else {
            return Some(neighbor.to_string());
        };
        let mut visited = HashSet::new();
        loop {
            if current == neighbor || !visited.insert(current.clone()) {
                return None;
            }
            match order.get(&current) {
                None => return Some(neighbor.to_string()),
                Some(item) => current = step(item)?,
            }
        }
    }
}
