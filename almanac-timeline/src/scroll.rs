//! Scroll proximity and trigger options.

use std::time::Duration;

/// Distance from the bottom, in pixels, at which the next page is requested
pub const DEFAULT_SCROLL_THRESHOLD: f64 = 1000.0;

pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimelineOptions {
    pub scroll_threshold: f64,
    pub debounce: Duration,
}

impl Default for TimelineOptions {
    fn default() -> Self {
        Self {
            scroll_threshold: DEFAULT_SCROLL_THRESHOLD,
            debounce: DEFAULT_DEBOUNCE,
        }
    }
}

/// Viewport position reported by the host on each scroll event
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScrollMetrics {
    pub viewport_height: f64,
    pub scroll_top: f64,
    pub document_height: f64,
}

impl ScrollMetrics {
    pub fn new(viewport_height: f64, scroll_top: f64, document_height: f64) -> Self {
        Self {
            viewport_height,
            scroll_top,
            document_height,
        }
    }

    /// Whether the bottom of the viewport is within `threshold` of the document end
    pub fn near_bottom(&self, threshold: f64) -> bool {
        self.viewport_height + self.scroll_top >= self.document_height - threshold
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_near_bottom() {
        let threshold = DEFAULT_SCROLL_THRESHOLD;
        assert!(ScrollMetrics::new(800.0, 1200.0, 3000.0).near_bottom(threshold));
        assert!(!ScrollMetrics::new(800.0, 1199.0, 3000.0).near_bottom(threshold));
        // Short documents are always near the bottom
        assert!(ScrollMetrics::new(800.0, 0.0, 500.0).near_bottom(threshold));
    }
}
