//! Known place names and their region hierarchy.

use std::collections::HashSet;

use tracing::debug;

use crate::catalog::CatalogEntry;
use crate::policy::{Place, Policy};

/// An occurrence of a known place in a piece of text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaceMention {
    /// Canonical place name.
    pub place: String,
    /// Top-most region the place belongs to (the place itself if it has no
    /// parent).
    pub root: String,
    /// Byte offset of the last occurrence, used to order mentions by recency.
    pub last_position: usize,
}

#[derive(Debug, Clone, Default)]
pub struct Gazetteer {
    places: Vec<Place>,
}

impl Gazetteer {
    #[must_use]
    pub fn new(places: Vec<Place>) -> Self {
        let mut gazetteer = Self::default();
        for place in places {
            gazetteer.add_place(place);
        }
        gazetteer
    }

    #[must_use]
    pub fn from_policy(policy: &Policy) -> Self {
        Self::new(policy.places.clone())
    }

    /// Add a place. Aliases of an already known place are merged; an existing
    /// parent is kept.
    pub fn add_place(&mut self, place: Place) {
        let name = place.name.trim();
        if name.is_empty() {
            return;
        }
        if let Some(existing) = self.places.iter_mut().find(|p| p.name == name) {
            for alias in place.aliases {
                if !existing.aliases.contains(&alias) {
                    existing.aliases.push(alias);
                }
            }
            if existing.parent.is_none() {
                existing.parent = place.parent;
            }
            return;
        }
        self.places.push(Place {
            name: name.to_string(),
            ..place
        });
    }

    /// Register every catalog destination that is not yet known.
    pub fn extend_with_catalog(&mut self, entries: &[CatalogEntry]) {
        let before = self.places.len();
        for destination in entries.iter().flat_map(|e| e.destinations.iter()) {
            if self.find(destination).is_none() {
                self.add_place(Place::new(destination.clone()));
            }
        }
        debug!(
            "Gazetteer extended with {} catalog destinations",
            self.places.len() - before
        );
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.places.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.places.is_empty()
    }

    /// Look a place up by name or alias.
    #[must_use]
    pub fn find(&self, name: &str) -> Option<&Place> {
        self.places
            .iter()
            .find(|p| p.name == name || p.aliases.iter().any(|a| a == name))
    }

    /// Follow `parent` links to the top-most known region.
    #[must_use]
    pub fn root_of(&self, name: &str) -> String {
        let mut current = name.to_string();
        let mut seen = HashSet::new();
        while seen.insert(current.clone()) {
            match self.find(&current).and_then(|p| p.parent.clone()) {
                Some(parent) => current = parent,
                None => break,
            }
        }
        current
    }

    /// Name and aliases of a place, or just `name` if it is unknown.
    #[must_use]
    pub fn surfaces<'a>(&'a self, name: &'a str) -> Vec<&'a str> {
        self.find(name).map_or_else(
            || vec![name],
            |p| {
                std::iter::once(p.name.as_str())
                    .chain(p.aliases.iter().map(String::as_str))
                    .filter(|s| !s.is_empty())
                    .collect()
            },
        )
    }

    /// Every known place mentioned in `text`, ordered by last occurrence.
    #[must_use]
    pub fn mentions(&self, text: &str) -> Vec<PlaceMention> {
        let mut found: Vec<PlaceMention> = self
            .places
            .iter()
            .filter_map(|place| {
                std::iter::once(&place.name)
                    .chain(place.aliases.iter())
                    .filter(|surface| !surface.is_empty())
                    .filter_map(|surface| text.rfind(surface.as_str()))
                    .max()
                    .map(|last_position| PlaceMention {
                        place: place.name.clone(),
                        root: self.root_of(&place.name),
                        last_position,
                    })
            })
            .collect();
        found.sort_by_key(|m| m.last_position);
        found
    }

    #[must_use]
    pub fn mentions_any(&self, text: &str) -> bool {
        self.places.iter().any(|place| {
            std::iter::once(&place.name)
                .chain(place.aliases.iter())
                .any(|surface| !surface.is_empty() && text.contains(surface.as_str()))
        })
    }
}
