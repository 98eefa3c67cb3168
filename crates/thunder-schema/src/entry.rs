//! Loading state of a cached item

/// Cache entry state for lazy loading
#[derive(Debug, Clone, PartialEq)]
pub enum CacheEntry<T: Clone> {
    /// Data has been loaded and is available
    Loaded(T),
    /// Data is currently being loaded (prevents duplicate loads)
    Loading,
    /// Data has not been loaded yet
    NotLoaded,
}

impl<T: Clone> CacheEntry<T> {
    pub fn is_loaded(&self) -> bool {
        matches!(self, CacheEntry::Loaded(_))
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, CacheEntry::Loading)
    }

    pub fn is_not_loaded(&self) -> bool {
        matches!(self, CacheEntry::NotLoaded)
    }

    /// Get the loaded value if available
    pub fn get(&self) -> Option<&T> {
        match self {
            CacheEntry::Loaded(data) => Some(data),
            _ => None,
        }
    }
}

impl<T: Clone> Default for CacheEntry<T> {
    fn default() -> Self {
        CacheEntry::NotLoaded
    }
}
