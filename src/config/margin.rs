//! Root margin parsing
//!
//! Follows the CSS `margin` shorthand used by viewport observers:
//! one to four lengths, each in `px`, `%`, unit-less pixels or a
//! `calc(P% + Npx)` sum.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A margin length: fixed pixels plus a percentage of the root extent
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Length {
    /// Fixed pixels
    pub px: f64,
    /// Percentage of the root's extent along the same axis
    pub percent: f64,
}

impl Length {
    /// A pixel length
    pub fn px(px: f64) -> Self {
        Self { px, percent: 0.0 }
    }

    /// A percentage length
    pub fn percent(percent: f64) -> Self {
        Self { px: 0.0, percent }
    }

    /// Resolve to pixels against the root extent
    pub fn resolve(&self, extent: f64) -> f64 {
        self.px + extent * self.percent / 100.0
    }

    fn is_finite(&self) -> bool {
        self.px.is_finite() && self.percent.is_finite()
    }
}

impl FromStr for Length {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        let invalid =
            || Error::invalid_value("observer.root_margin", format!("invalid length '{s}'"));
        let parse = |v: &str| v.trim().parse::<f64>().map_err(|_| invalid());

        if let Some(inner) = s.strip_prefix("calc(").and_then(|r| r.strip_suffix(')')) {
            let inner = inner.split_whitespace().collect::<Vec<_>>().join(" ");
            let (lhs, sign, rhs) = if let Some((l, r)) = inner.split_once(" + ") {
                (l, 1.0, r)
            } else if let Some((l, r)) = inner.split_once(" - ") {
                (l, -1.0, r)
            } else {
                return Err(invalid());
            };
            let (a, b) = (lhs.parse::<Length>()?, rhs.parse::<Length>()?);
            return Ok(Self {
                px: a.px + sign * b.px,
                percent: a.percent + sign * b.percent,
            });
        }

        if let Some(v) = s.strip_suffix("px") {
            Ok(Self::px(parse(v)?))
        } else if let Some(v) = s.strip_suffix('%') {
            Ok(Self::percent(parse(v)?))
        } else {
            Ok(Self::px(parse(s)?))
        }
    }
}

impl fmt::Display for Length {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.percent == 0.0 {
            write!(f, "{}px", self.px)
        } else if self.px == 0.0 {
            write!(f, "{}%", self.percent)
        } else if self.px < 0.0 {
            write!(f, "calc({}% - {}px)", self.percent, -self.px)
        } else {
            write!(f, "calc({}% + {}px)", self.percent, self.px)
        }
    }
}

/// Margin grown around the observer root before intersection is computed
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RootMargin {
    /// Growth above the root
    pub top: Length,
    /// Growth to the right of the root
    pub right: Length,
    /// Growth below the root (where look-ahead bias goes)
    pub bottom: Length,
    /// Growth to the left of the root
    pub left: Length,
}

impl RootMargin {
    /// Margin with the same pixel length on every side
    pub fn uniform(px: f64) -> Self {
        let l = Length::px(px);
        Self {
            top: l,
            right: l,
            bottom: l,
            left: l,
        }
    }

    /// Margin that only extends the bottom edge
    pub fn bottom(px: f64) -> Self {
        Self {
            bottom: Length::px(px),
            ..Self::default()
        }
    }

    /// Extend the bottom edge by extra look-ahead pixels
    #[must_use]
    pub fn extend_bottom(mut self, px: f64) -> Self {
        self.bottom.px += px;
        self
    }

    /// Check every side is a finite length
    pub fn is_finite(&self) -> bool {
        self.top.is_finite()
            && self.right.is_finite()
            && self.bottom.is_finite()
            && self.left.is_finite()
    }
}

impl FromStr for RootMargin {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let parts = split_lengths(s)?
            .into_iter()
            .map(str::parse::<Length>)
            .collect::<Result<Vec<_>>>()?;

        // Same expansion rules as the CSS margin shorthand
        let (top, right, bottom, left) = match parts.as_slice() {
            [] => return Ok(Self::default()),
            [a] => (*a, *a, *a, *a),
            [v, h] => (*v, *h, *v, *h),
            [t, h, b] => (*t, *h, *b, *h),
            [t, r, b, l] => (*t, *r, *b, *l),
            _ => {
                return Err(Error::invalid_value(
                    "observer.root_margin",
                    format!("expected 1 to 4 lengths, got {}", parts.len()),
                ))
            }
        };

        Ok(Self {
            top,
            right,
            bottom,
            left,
        })
    }
}

/// Split on whitespace outside parentheses, keeping `calc(...)` whole
fn split_lengths(s: &str) -> Result<Vec<&str>> {
    let unbalanced =
        || Error::invalid_value("observer.root_margin", format!("unbalanced parentheses in '{s}'"));
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = None;

    for (i, c) in s.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => depth = depth.checked_sub(1).ok_or_else(unbalanced)?,
            c if c.is_whitespace() && depth == 0 => {
                if let Some(from) = start.take() {
                    parts.push(&s[from..i]);
                }
                continue;
            }
            _ => {}
        }
        start.get_or_insert(i);
    }

    if depth != 0 {
        return Err(unbalanced());
    }
    if let Some(from) = start {
        parts.push(&s[from..]);
    }
    Ok(parts)
}

impl TryFrom<String> for RootMargin {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<RootMargin> for String {
    fn from(margin: RootMargin) -> Self {
        margin.to_string()
    }
}

impl fmt::Display for RootMargin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} {}",
            self.top, self.right, self.bottom, self.left
        )
    }
}
