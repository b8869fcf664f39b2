//! Controller configuration
//!
//! # Overview
//!
//! The config module provides:
//! - `PagerConfig` - Validated controller options (page size, bias, auto-advance, ...)
//! - `ObserverOptions` - Options passed through to the visibility observer
//! - `RootMargin` - CSS-style margin shorthand (`"0px 0px 100px 0px"`)
//! - YAML/JSON loading with unknown-field rejection

mod margin;
mod parser;
mod types;

pub use margin::{Length, RootMargin};
pub use parser::{load_config, load_config_from_str, ConfigFormat};
pub use types::{ObserverOptions, PagerConfig, PagerConfigBuilder, Threshold};
