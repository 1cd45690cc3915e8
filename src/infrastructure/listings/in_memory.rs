//! # In-Memory Listing Lookup
//!
//! Property summaries held in a `DashMap`.

use crate::application::ports::{ListingLookup, LookupError, PropertySummary};
use crate::domain::value_objects::PropertyId;
use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Arc;

/// In-memory listing lookup.
///
/// Clones share the same map, so a test can keep a handle and flip
/// availability while the engine holds another.
#[derive(Debug, Clone, Default)]
pub struct InMemoryListingLookup {
    properties: Arc<DashMap<PropertyId, PropertySummary>>,
}

impl InMemoryListingLookup {
    /// Creates an empty lookup.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a lookup seeded with `properties`.
    #[must_use]
    pub fn with_properties(properties: impl IntoIterator<Item = PropertySummary>) -> Self {
        let lookup = Self::new();
        for property in properties {
            lookup.upsert(property);
        }
        lookup
    }

    /// Inserts or replaces a property.
    pub fn upsert(&self, property: PropertySummary) {
        self.properties.insert(property.property_id.clone(), property);
    }

    /// Sets availability; returns false if the property is unknown.
    pub fn set_available(&self, property_id: &PropertyId, available: bool) -> bool {
        match self.properties.get_mut(property_id) {
            Some(mut entry) => {
                entry.is_available = available;
                true
            }
            None => false,
        }
    }

    /// Removes a property.
    pub fn remove(&self, property_id: &PropertyId) -> Option<PropertySummary> {
        self.properties.remove(property_id).map(|(_, summary)| summary)
    }

    /// Returns the number of properties.
    #[must_use]
    pub fn len(&self) -> usize {
        self.properties.len()
    }

    /// Returns true if no properties are known.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }
}

#[async_trait]
impl ListingLookup for InMemoryListingLookup {
    async fn get_property(
        &self,
        property_id: &PropertyId,
    ) -> Result<Option<PropertySummary>, LookupError> {
        Ok(self
            .properties
            .get(property_id)
            .map(|entry| entry.value().clone()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn lookup_and_availability() {
        let lookup =
            InMemoryListingLookup::with_properties([PropertySummary::available("p1", "owner")]);
        let id = PropertyId::new("p1");

        let found = lookup.get_property(&id).await.unwrap().unwrap();
        assert!(found.is_available);
        assert_eq!(found.owner_id.as_str(), "owner");

        assert!(lookup.set_available(&id, false));
        assert!(!lookup.get_property(&id).await.unwrap().unwrap().is_available);
        assert!(!lookup.set_available(&PropertyId::new("p2"), false));
    }

    #[tokio::test]
    async fn unknown_property_is_none() {
        let lookup = InMemoryListingLookup::new();
        assert!(lookup.is_empty());
        assert!(
            lookup
                .get_property(&PropertyId::new("nope"))
                .await
                .unwrap()
                .is_none()
        );
    }

    #[test]
    fn clones_share_state() {
        let lookup = InMemoryListingLookup::new();
        let handle = lookup.clone();
        handle.upsert(PropertySummary::available("p1", "owner"));
        assert_eq!(lookup.len(), 1);
        assert!(lookup.remove(&PropertyId::new("p1")).is_some());
        assert!(handle.is_empty());
    }
}
