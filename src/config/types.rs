//! Configuration types
//!
//! `PagerConfig` is the explicit record of every tunable controller option.
//! The page loader itself is supplied separately to the controller builder
//! since it is code, not data.

use super::margin::RootMargin;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

// ============================================================================
// Pager Config
// ============================================================================

/// Options for a pagination controller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PagerConfig {
    /// Items requested per page
    #[serde(default = "default_page_size", alias = "pageSize")]
    pub page_size: u32,

    /// Page index of the first request
    #[serde(default = "default_initial_page", alias = "initialPage")]
    pub initial_page: u32,

    /// Keep requesting pages without visibility or manual triggers
    #[serde(default, alias = "autoAdvance")]
    pub auto_advance: bool,

    /// Look-ahead pixels added to the bottom root margin
    #[serde(default)]
    pub bias: f64,

    /// Options passed through to the visibility observer
    #[serde(default, alias = "observerOptions")]
    pub observer: ObserverOptions,

    /// Expose the debug view in snapshots
    #[serde(default)]
    pub debug: bool,
}

fn default_page_size() -> u32 {
    10
}

fn default_initial_page() -> u32 {
    1
}

impl Default for PagerConfig {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
            initial_page: default_initial_page(),
            auto_advance: false,
            bias: 0.0,
            observer: ObserverOptions::default(),
            debug: false,
        }
    }
}

impl PagerConfig {
    /// Create a config builder
    pub fn builder() -> PagerConfigBuilder {
        PagerConfigBuilder::default()
    }

    /// Check every option is in range
    pub fn validate(&self) -> Result<()> {
        if self.page_size == 0 {
            return Err(Error::invalid_value("page_size", "must be greater than 0"));
        }

        if self.initial_page == 0 {
            return Err(Error::invalid_value(
                "initial_page",
                "pages are 1-based, must be at least 1",
            ));
        }

        if !self.bias.is_finite() || self.bias < 0.0 {
            return Err(Error::invalid_value(
                "bias",
                format!("must be a finite, non-negative number of pixels, got {}", self.bias),
            ));
        }

        self.observer.validate()
    }

    /// Observer options with the look-ahead bias folded into the bottom margin
    pub fn effective_observer(&self) -> ObserverOptions {
        let mut options = self.observer.clone();
        options.root_margin = options.root_margin.extend_bottom(self.bias);
        options
    }
}

/// Builder for [`PagerConfig`]
#[derive(Debug, Default)]
pub struct PagerConfigBuilder {
    config: PagerConfig,
}

impl PagerConfigBuilder {
    /// Set items per page
    #[must_use]
    pub fn page_size(mut self, size: u32) -> Self {
        self.config.page_size = size;
        self
    }

    /// Set the first page index
    #[must_use]
    pub fn initial_page(mut self, page: u32) -> Self {
        self.config.initial_page = page;
        self
    }

    /// Enable or disable the auto-advance loop
    #[must_use]
    pub fn auto_advance(mut self, enabled: bool) -> Self {
        self.config.auto_advance = enabled;
        self
    }

    /// Set look-ahead bias in pixels
    #[must_use]
    pub fn bias(mut self, bias: f64) -> Self {
        self.config.bias = bias;
        self
    }

    /// Set observer options
    #[must_use]
    pub fn observer(mut self, observer: ObserverOptions) -> Self {
        self.config.observer = observer;
        self
    }

    /// Enable the debug view
    #[must_use]
    pub fn debug(mut self, enabled: bool) -> Self {
        self.config.debug = enabled;
        self
    }

    /// Validate and build the config
    pub fn build(self) -> Result<PagerConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

// ============================================================================
// Observer Options
// ============================================================================

/// Options for the sentinel visibility observer
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ObserverOptions {
    /// Identifier of the scroll container (None = the whole viewport)
    #[serde(default)]
    pub root: Option<String>,

    /// Margin grown around the root before intersecting
    #[serde(default, alias = "rootMargin")]
    pub root_margin: RootMargin,

    /// Visible ratio(s) at which the observer reports
    #[serde(default)]
    pub threshold: Threshold,
}

impl ObserverOptions {
    /// Create options observing within a named root
    pub fn with_root(root: impl Into<String>) -> Self {
        Self {
            root: Some(root.into()),
            ..Self::default()
        }
    }

    /// Set root margin
    #[must_use]
    pub fn root_margin(mut self, margin: RootMargin) -> Self {
        self.root_margin = margin;
        self
    }

    /// Set threshold
    #[must_use]
    pub fn threshold(mut self, threshold: impl Into<Threshold>) -> Self {
        self.threshold = threshold.into();
        self
    }

    /// Check margins are finite and ratios lie in `[0, 1]`
    pub fn validate(&self) -> Result<()> {
        if !self.root_margin.is_finite() {
            return Err(Error::invalid_value(
                "observer.root_margin",
                "lengths must be finite",
            ));
        }

        let ratios = self.threshold.ratios();
        if ratios.is_empty() {
            return Err(Error::invalid_value(
                "observer.threshold",
                "at least one ratio is required",
            ));
        }
        if let Some(bad) = ratios.iter().find(|r| !(0.0..=1.0).contains(*r)) {
            return Err(Error::invalid_value(
                "observer.threshold",
                format!("ratios must be within [0, 1], got {bad}"),
            ));
        }

        Ok(())
    }
}

/// One visibility ratio or a list of them
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Threshold {
    /// Report when the visible ratio crosses this value
    Single(f64),
    /// Report at each listed ratio
    Many(Vec<f64>),
}

impl Default for Threshold {
    fn default() -> Self {
        Self::Single(0.0)
    }
}

impl Threshold {
    /// All configured ratios
    pub fn ratios(&self) -> Vec<f64> {
        match self {
            Self::Single(r) => vec![*r],
            Self::Many(rs) => rs.clone(),
        }
    }

    /// Smallest ratio that counts as visible
    pub fn min_ratio(&self) -> f64 {
        self.ratios().into_iter().fold(1.0, f64::min)
    }
}

impl From<f64> for Threshold {
    fn from(ratio: f64) -> Self {
        Self::Single(ratio)
    }
}

impl From<Vec<f64>> for Threshold {
    fn from(ratios: Vec<f64>) -> Self {
        Self::Many(ratios)
    }
}
