//! Device filtering for listing output.
//!
//! This module provides traits and types for filtering discovered devices
//! based on various criteria (name patterns, loopback classification).
//!
//! # Design
//!
//! - **Pure Matchers**: [`LoopbackFilter`] and [`NameRegexFilter`] only answer
//!   "does this device match?" without include/exclude semantics.
//! - **Filter Chain**: [`FilterChain`] combines matchers with correct semantics:
//!   - Exclude filters: AND logic (must pass ALL excludes)
//!   - Include filters: OR logic (pass ANY include, empty = match all)
//!
//! Filters only narrow what is shown. The registry itself, default-device
//! selection and network lookups never see them.

use regex::Regex;

use super::{DeviceRecord, DeviceRegistry};

/// Trait for filtering discovered devices.
///
/// # Thread Safety
///
/// Filters must be `Send + Sync` so a configured chain can be shared freely.
pub trait DeviceFilter: Send + Sync {
    /// Returns `true` if the device matches this filter.
    fn matches(&self, device: &DeviceRecord) -> bool;
}

// ============================================================================
// LoopbackFilter - Pure matcher by loopback classification
// ============================================================================

/// Matches devices classified as loopback during discovery.
///
/// # Examples
///
/// ```
/// use netdevs::network::DeviceRecord;
/// use netdevs::network::filter::{DeviceFilter, LoopbackFilter};
///
/// let lo = DeviceRecord::new("lo", true).unwrap();
/// let eth0 = DeviceRecord::new("eth0", false).unwrap();
///
/// assert!(LoopbackFilter.matches(&lo));
/// assert!(!LoopbackFilter.matches(&eth0));
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct LoopbackFilter;

impl DeviceFilter for LoopbackFilter {
    fn matches(&self, device: &DeviceRecord) -> bool {
        device.is_loopback()
    }
}

// ============================================================================
// FilterChain - Include OR / Exclude AND semantics
// ============================================================================

/// Filter chain with correct include/exclude semantics.
///
/// Evaluation order:
/// 1. **Exclude filters (AND)**: Any match → reject. Device must pass ALL excludes.
/// 2. **Include filters (OR)**: Any match → accept. Device needs to pass ANY include.
///    Empty includes = match all (passthrough).
///
/// # Examples
///
/// ```
/// use netdevs::network::DeviceRecord;
/// use netdevs::network::filter::{DeviceFilter, FilterChain, LoopbackFilter, NameRegexFilter};
///
/// let chain = FilterChain::new()
///     .exclude(LoopbackFilter)
///     .include(NameRegexFilter::new(r"^(eth|wlan)").unwrap());
///
/// let eth = DeviceRecord::new("eth0", false).unwrap();
/// let bridge = DeviceRecord::new("br0", false).unwrap();
/// let lo = DeviceRecord::new("lo", true).unwrap();
///
/// assert!(chain.matches(&eth));      // Included by name
/// assert!(!chain.matches(&bridge));  // Not in include patterns
/// assert!(!chain.matches(&lo));      // Excluded
/// ```
#[derive(Default)]
pub struct FilterChain {
    includes: Vec<Box<dyn DeviceFilter>>,
    excludes: Vec<Box<dyn DeviceFilter>>,
}

impl FilterChain {
    /// Creates an empty filter chain (matches all devices).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an include filter (OR semantics).
    ///
    /// Devices matching ANY include filter will be accepted
    /// (after passing all exclude filters).
    #[must_use]
    pub fn include<F: DeviceFilter + 'static>(mut self, filter: F) -> Self {
        self.includes.push(Box::new(filter));
        self
    }

    /// Adds an exclude filter (AND semantics - must not match ANY).
    ///
    /// Devices matching ANY exclude filter will be rejected,
    /// regardless of include filters.
    #[must_use]
    pub fn exclude<F: DeviceFilter + 'static>(mut self, filter: F) -> Self {
        self.excludes.push(Box::new(filter));
        self
    }

    /// Returns the number of include filters.
    #[must_use]
    pub fn include_count(&self) -> usize {
        self.includes.len()
    }

    /// Returns the number of exclude filters.
    #[must_use]
    pub fn exclude_count(&self) -> usize {
        self.excludes.len()
    }

    /// Returns true if no filters are configured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.includes.is_empty() && self.excludes.is_empty()
    }

    /// Iterates over the devices of `registry` that pass the chain, in
    /// registry order.
    pub fn select<'a>(
        &'a self,
        registry: &'a DeviceRegistry,
    ) -> impl Iterator<Item = &'a DeviceRecord> + 'a {
        registry.iter().filter(|device| self.matches(device))
    }
}

impl DeviceFilter for FilterChain {
    fn matches(&self, device: &DeviceRecord) -> bool {
        // 1. Any exclude match → reject
        if self.excludes.iter().any(|f| f.matches(device)) {
            return false;
        }

        // 2. No includes = all pass; otherwise any include match → accept
        self.includes.is_empty() || self.includes.iter().any(|f| f.matches(device))
    }
}

impl std::fmt::Debug for FilterChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FilterChain")
            .field("include_count", &self.includes.len())
            .field("exclude_count", &self.excludes.len())
            .finish()
    }
}

// ============================================================================
// NameRegexFilter - Pure matcher by name pattern
// ============================================================================

/// Matches devices by name pattern (pure matcher, no include/exclude semantics).
///
/// Use with [`FilterChain`] to apply include/exclude logic.
///
/// # Examples
///
/// ```
/// use netdevs::network::DeviceRecord;
/// use netdevs::network::filter::{DeviceFilter, NameRegexFilter};
///
/// let filter = NameRegexFilter::new(r"^eth").unwrap();
///
/// assert!(filter.matches(&DeviceRecord::new("eth0", false).unwrap()));
/// assert!(!filter.matches(&DeviceRecord::new("wlan0", false).unwrap()));
/// ```
#[derive(Debug)]
pub struct NameRegexFilter {
    pattern: Regex,
}

impl NameRegexFilter {
    /// Creates a name filter with the given regex pattern.
    ///
    /// # Errors
    ///
    /// Returns an error if the regex pattern is invalid.
    pub fn new(pattern: &str) -> Result<Self, regex::Error> {
        Ok(Self {
            pattern: Regex::new(pattern)?,
        })
    }

    /// Returns a reference to the regex pattern.
    #[must_use]
    #[allow(clippy::missing_const_for_fn)] // Regex is not a const type
    pub fn pattern(&self) -> &Regex {
        &self.pattern
    }
}

impl DeviceFilter for NameRegexFilter {
    fn matches(&self, device: &DeviceRecord) -> bool {
        self.pattern.is_match(device.name())
    }
}

// Blanket implementation: any &T where T: DeviceFilter also implements DeviceFilter
impl<T: DeviceFilter + ?Sized> DeviceFilter for &T {
    fn matches(&self, device: &DeviceRecord) -> bool {
        (*self).matches(device)
    }
}

impl DeviceFilter for Box<dyn DeviceFilter> {
    fn matches(&self, device: &DeviceRecord) -> bool {
        self.as_ref().matches(device)
    }
}
