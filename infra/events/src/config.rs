/// Priority given to handlers registered on a ranked bus without an explicit one.
pub const DEFAULT_PRIORITY: i32 = 0;

/// Initial capacity of a per-event handler collection.
/// Most events carry a handful of handlers.
pub const DEFAULT_CAPACITY: usize = 4;

/// Construction-time settings shared by every collection a bus creates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BusConfig {
    default_priority: i32,
    capacity: usize,
}

impl BusConfig {
    /// The settings used when none are given.
    pub const DEFAULT: Self =
        Self { default_priority: DEFAULT_PRIORITY, capacity: DEFAULT_CAPACITY };

    /// Same as [`BusConfig::DEFAULT`].
    #[must_use]
    pub const fn new() -> Self {
        Self::DEFAULT
    }

    /// Priority assigned by a ranked `on` that does not name one.
    #[must_use = "The config must be passed to a bus to take effect."]
    pub const fn with_default_priority(mut self, priority: i32) -> Self {
        self.default_priority = priority;
        self
    }

    /// Capacity reserved when a collection is first created for an event.
    #[must_use = "The config must be passed to a bus to take effect."]
    pub const fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    /// Priority given to handlers registered without one.
    #[must_use]
    pub const fn default_priority(&self) -> i32 {
        self.default_priority
    }

    /// Initial capacity of each collection.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for BusConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}
