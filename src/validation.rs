//! Shared validation limits and pagination
//!
//! Names are counted in Unicode code points after trimming, so multi-byte
//! scripts get the same 255-character budget as ASCII.

use serde::{Deserialize, Serialize};
use utoipa::IntoParams;

/// Maximum length of fund and owner names (code points, after trimming)
pub const MAX_NAME_LENGTH: usize = 255;

/// Largest unit count a fund, entry or transfer may hold (PostgreSQL INTEGER max)
pub const MAX_UNITS: i64 = i32::MAX as i64;

/// Default page size for list operations
pub const DEFAULT_LIMIT: i64 = 100;

/// Upper bound on page size
pub const MAX_LIMIT: i64 = 1000;

/// Trim a name and check it is non-empty and within [`MAX_NAME_LENGTH`].
///
/// Returns the trimmed name, or `None` if it is invalid.
pub fn normalize_name(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed.chars().count() > MAX_NAME_LENGTH {
        return None;
    }
    Some(trimmed.to_string())
}

/// Check a unit count against `[min, MAX_UNITS]` and narrow it to the stored width.
pub fn checked_units(units: i64, min: i64) -> Option<i32> {
    if units < min || units > MAX_UNITS {
        return None;
    }
    i32::try_from(units).ok()
}

/// Pagination parameters for list operations
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListParams {
    /// Page size (default 100, max 1000)
    pub limit: Option<i64>,
    /// Rows to skip (negative values clamp to 0)
    pub offset: Option<i64>,
}

impl ListParams {
    pub fn new(limit: i64, offset: i64) -> Self {
        Self {
            limit: Some(limit),
            offset: Some(offset),
        }
    }

    /// Apply defaults and bounds.
    pub fn normalize(self) -> PageRequest {
        let limit = match self.limit {
            Some(l) if l > 0 => l.min(MAX_LIMIT),
            _ => DEFAULT_LIMIT,
        };
        let offset = self.offset.unwrap_or(0).max(0);
        PageRequest { limit, offset }
    }
}

/// Normalized pagination window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub limit: i64,
    pub offset: i64,
}

impl PageRequest {
    /// Slice an already-ordered collection (used by the in-memory store).
    pub fn slice<T: Clone>(&self, items: &[T]) -> Vec<T> {
        items
            .iter()
            .skip(self.offset as usize)
            .take(self.limit as usize)
            .cloned()
            .collect()
    }
}

/// One page of a list result
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// Total rows matching the query, independent of the window
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, total: i64, window: PageRequest) -> Self {
        Self {
            items,
            total,
            limit: window.limit,
            offset: window.offset,
        }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            limit: self.limit,
            offset: self.offset,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_name_trims() {
        assert_eq!(normalize_name("  Alice \t"), Some("Alice".to_string()));
        assert_eq!(normalize_name("   "), None);
        assert_eq!(normalize_name(""), None);
    }

    #[test]
    fn test_normalize_name_counts_code_points() {
        // 255 three-byte characters are 765 bytes but still valid
        let cjk = "株".repeat(MAX_NAME_LENGTH);
        assert!(normalize_name(&cjk).is_some());
        let too_long = "株".repeat(MAX_NAME_LENGTH + 1);
        assert!(normalize_name(&too_long).is_none());
    }

    #[test]
    fn test_checked_units_bounds() {
        assert_eq!(checked_units(0, 0), Some(0));
        assert_eq!(checked_units(0, 1), None);
        assert_eq!(checked_units(-1, 0), None);
        assert_eq!(checked_units(MAX_UNITS, 1), Some(i32::MAX));
        assert_eq!(checked_units(MAX_UNITS + 1, 1), None);
    }

    #[test]
    fn test_list_params_defaults() {
        let page = ListParams::default().normalize();
        assert_eq!(page.limit, DEFAULT_LIMIT);
        assert_eq!(page.offset, 0);
    }

    #[test]
    fn test_list_params_clamps() {
        assert_eq!(ListParams::new(5000, -3).normalize(), PageRequest {
            limit: MAX_LIMIT,
            offset: 0
        });
        assert_eq!(ListParams::new(0, 10).normalize().limit, DEFAULT_LIMIT);
        assert_eq!(ListParams::new(-7, 10).normalize().limit, DEFAULT_LIMIT);
        assert_eq!(ListParams::new(25, 50).normalize(), PageRequest {
            limit: 25,
            offset: 50
        });
    }

    #[test]
    fn test_page_slice() {
        let items: Vec<i32> = (0..10).collect();
        let window = ListParams::new(3, 8).normalize();
        assert_eq!(window.slice(&items), vec![8, 9]);
    }
}
