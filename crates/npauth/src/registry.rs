//! Auth handler registry
//!
//! Handler ids are small integers starting at 0. The request id handed to
//! the guest is always `handler_id + 1`, so request id 0 never names a
//! live handler.

use std::collections::BTreeMap;
use tracing::{error, warn};

use crate::{AuthError, Result};

/// A registered guest callback
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthHandler {
    /// Guest address of the callback
    pub entry_point: u32,
    /// Opaque guest argument pointer
    pub argument: u32,
}

/// Handlers keyed by id
#[derive(Debug, Default)]
pub struct HandlerRegistry {
    handlers: BTreeMap<u32, AuthHandler>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler, returning its id.
    ///
    /// A handler with the same entry point keeps its id and nothing is
    /// inserted. Otherwise the smallest free id is used. When
    /// `entry_point_valid` is false nothing is stored either, but the free
    /// id is still returned; callers rely on getting a number back.
    pub fn register(&mut self, entry_point: u32, argument: u32, entry_point_valid: bool) -> u32 {
        if let Some(id) = self.find_by_entry_point(entry_point) {
            error!(
                "Same handler({:08x}, {:08x}) already exists: {}",
                entry_point, argument, id
            );
            return id;
        }

        let id = self.next_free_id();
        if entry_point_valid {
            self.handlers.insert(
                id,
                AuthHandler {
                    entry_point,
                    argument,
                },
            );
            warn!("Added handler({:08x}, {:08x}) : {}", entry_point, argument, id);
        } else {
            error!(
                "Handler entry point {:08x} is not a valid address, id {} left unused",
                entry_point, id
            );
        }
        id
    }

    /// Remove a handler
    pub fn unregister(&mut self, id: u32) -> Result<AuthHandler> {
        self.handlers
            .remove(&id)
            .ok_or_else(|| AuthError::NotFound(format!("handler {}", id)))
    }

    pub fn get(&self, id: u32) -> Option<&AuthHandler> {
        self.handlers.get(&id)
    }

    pub fn find_by_entry_point(&self, entry_point: u32) -> Option<u32> {
        self.handlers
            .iter()
            .find(|(_, h)| h.entry_point == entry_point)
            .map(|(&id, _)| id)
    }

    /// Smallest id not currently in use
    pub fn next_free_id(&self) -> u32 {
        let mut id = 0;
        // keys iterate in ascending order, so the first gap is the answer
        for &used in self.handlers.keys() {
            if used != id {
                break;
            }
            id += 1;
        }
        id
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dedup_by_entry_point() {
        let mut registry = HandlerRegistry::new();
        let first = registry.register(0x0880_0100, 0x0900_0000, true);
        let second = registry.register(0x0880_0100, 0x0900_0040, true);

        assert_eq!(first, second);
        assert_eq!(registry.len(), 1);
        // the first argument is kept
        assert_eq!(registry.get(first).unwrap().argument, 0x0900_0000);
    }

    #[test]
    fn test_smallest_free_id() {
        let mut registry = HandlerRegistry::new();
        assert_eq!(registry.register(0x100, 0, true), 0);
        assert_eq!(registry.register(0x200, 0, true), 1);
        assert_eq!(registry.register(0x300, 0, true), 2);

        registry.unregister(1).unwrap();
        assert_eq!(registry.register(0x400, 0, true), 1);
        assert_eq!(registry.register(0x500, 0, true), 3);
    }

    #[test]
    fn test_invalid_entry_point_still_gets_id() {
        let mut registry = HandlerRegistry::new();
        registry.register(0x100, 0, true);

        let id = registry.register(0xDEAD_0000, 0, false);
        assert_eq!(id, 1);
        assert!(registry.get(id).is_none());
        assert_eq!(registry.len(), 1);

        // the unused id is handed out again
        assert_eq!(registry.register(0x200, 0, true), 1);
    }

    #[test]
    fn test_unregister_missing() {
        let mut registry = HandlerRegistry::new();
        assert_eq!(
            registry.unregister(4),
            Err(AuthError::NotFound("handler 4".to_string()))
        );
    }
}
