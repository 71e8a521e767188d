//! Duplicate-class filtering against the destination project.
//!
//! The destination project's existing class names come from an
//! external collaborator behind [`ClassRegistry`]. A registry failure
//! degrades to the empty set (filtering becomes a no-op), it never
//! aborts a conversion. Collisions are benign when re-importing
//! overlapping components, so drops are logged, not warned.

use crate::style::router::StyleClass;
use log::debug;
use std::collections::HashSet;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("class registry unavailable: {0}")]
    Unavailable(String),
    #[error("class registry timed out")]
    Timeout,
}

/// Existing-class-name lookup against the destination project.
pub trait ClassRegistry {
    fn existing_class_names(&self) -> Result<HashSet<String>, RegistryError>;
}

/// Registry for conversions with no destination project attached.
#[derive(Debug, Default)]
pub struct EmptyRegistry;

impl ClassRegistry for EmptyRegistry {
    fn existing_class_names(&self) -> Result<HashSet<String>, RegistryError> {
        Ok(HashSet::new())
    }
}

/// Fixed-set registry, used by the CLI and in tests.
#[derive(Debug, Default)]
pub struct StaticRegistry {
    names: HashSet<String>,
}

impl StaticRegistry {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        StaticRegistry {
            names: names.into_iter().map(Into::into).collect(),
        }
    }
}

impl ClassRegistry for StaticRegistry {
    fn existing_class_names(&self) -> Result<HashSet<String>, RegistryError> {
        Ok(self.names.clone())
    }
}

/// Stateful filter spanning a whole conversion run: names emitted by an
/// earlier section count as existing for later sections.
#[derive(Debug, Default)]
pub struct DuplicateFilter {
    seen: HashSet<String>,
}

impl DuplicateFilter {
    pub fn new(existing: HashSet<String>) -> Self {
        DuplicateFilter { seen: existing }
    }

    /// Drop any StyleClass whose name collides with the registry or
    /// with a style already kept this run. First occurrence wins.
    pub fn filter(&mut self, styles: Vec<StyleClass>) -> Vec<StyleClass> {
        let mut kept = Vec::with_capacity(styles.len());
        for style in styles {
            if self.seen.contains(&style.name) {
                debug!("dropping duplicate style class \"{}\"", style.name);
                continue;
            }
            self.seen.insert(style.name.clone());
            kept.push(style);
        }
        kept
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn style(name: &str) -> StyleClass {
        StyleClass {
            name: name.to_string(),
            style_less: "color:red".to_string(),
            variants: BTreeMap::new(),
        }
    }

    #[test]
    fn registry_collision_dropped_suffixed_name_passes() {
        let existing = StaticRegistry::new(["hero"]).existing_class_names().unwrap();
        let mut filter = DuplicateFilter::new(existing);
        let kept = filter.filter(vec![style("hero"), style("hero-2")]);
        let names: Vec<&str> = kept.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["hero-2"]);
    }

    #[test]
    fn first_occurrence_wins_across_calls() {
        let mut filter = DuplicateFilter::new(HashSet::new());
        let first = filter.filter(vec![style("card")]);
        assert_eq!(first.len(), 1);
        let second = filter.filter(vec![style("card"), style("list")]);
        let names: Vec<&str> = second.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["list"]);
    }
}
