//! Parameter spaces: discrete grids and continuous/integer ranges.
//!
//! Both keep parameters in insertion order; that order fixes the
//! enumeration order (first parameter slowest) and the key order of every
//! generated [`ParameterSet`].

use std::collections::HashSet;
use std::sync::Arc;

use rand::Rng;
use serde::{Deserialize, Serialize};
use sweeplab_core::{ParamValue, ParameterSet};

use crate::config::ConfigError;

// ─── Grid ────────────────────────────────────────────────────────────

/// One grid axis: a parameter name and its candidate values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridAxis {
    pub name: String,
    pub values: Vec<ParamValue>,
}

/// Discrete parameter grid `{name: [values]}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParamGrid {
    axes: Vec<GridAxis>,
}

impl ParamGrid {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style: append an axis.
    pub fn with_values<V: Into<ParamValue>>(
        mut self,
        name: impl Into<String>,
        values: impl IntoIterator<Item = V>,
    ) -> Self {
        self.push(name, values);
        self
    }

    pub fn push<V: Into<ParamValue>>(
        &mut self,
        name: impl Into<String>,
        values: impl IntoIterator<Item = V>,
    ) {
        self.axes.push(GridAxis {
            name: name.into(),
            values: values.into_iter().map(Into::into).collect(),
        });
    }

    pub fn axes(&self) -> &[GridAxis] {
        &self.axes
    }

    pub fn is_empty(&self) -> bool {
        self.axes.is_empty()
    }

    /// Size of the Cartesian product, or None if it overflows `u128`.
    pub fn total(&self) -> Option<u128> {
        self.axes
            .iter()
            .try_fold(1u128, |acc, axis| acc.checked_mul(axis.values.len() as u128))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.axes.is_empty() {
            return Err(ConfigError::EmptySpace);
        }
        check_unique(self.axes.iter().map(|a| a.name.as_str()))?;
        if let Some(axis) = self.axes.iter().find(|a| a.values.is_empty()) {
            return Err(ConfigError::EmptyValues(axis.name.clone()));
        }
        Ok(())
    }

    /// Build the set for one value index per axis.
    pub fn assemble(&self, digits: &[usize]) -> ParameterSet {
        self.axes
            .iter()
            .zip(digits)
            .map(|(axis, &d)| (axis.name.clone(), axis.values[d].clone()))
            .collect()
    }

    /// Mixed-radix decode of a flat index; the last axis varies fastest.
    ///
    /// `index` must be below `total()`.
    pub fn decode(&self, mut index: u128) -> ParameterSet {
        let mut digits = vec![0usize; self.axes.len()];
        for (slot, axis) in digits.iter_mut().zip(&self.axes).rev() {
            let radix = axis.values.len() as u128;
            *slot = (index % radix) as usize;
            index /= radix;
        }
        self.assemble(&digits)
    }

    /// One uniformly random value per axis.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> ParameterSet {
        let digits: Vec<usize> = self
            .axes
            .iter()
            .map(|a| rng.gen_range(0..a.values.len()))
            .collect();
        self.assemble(&digits)
    }
}

// ─── Ranges ──────────────────────────────────────────────────────────

/// Inclusive bounds for one random-search parameter.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ParamRange {
    Int { min: i64, max: i64 },
    Float { min: f64, max: f64 },
}

impl ParamRange {
    fn validate(&self, name: &str) -> Result<(), ConfigError> {
        let reason = match *self {
            Self::Int { min, max } if min > max => "min must be <= max",
            Self::Float { min, max } if !(min.is_finite() && max.is_finite()) => {
                "bounds must be finite"
            }
            Self::Float { min, max } if min > max => "min must be <= max",
            // The uniform sampler needs a finite width as well as finite bounds.
            Self::Float { min, max } if !(max - min).is_finite() => "max - min overflows f64",
            _ => return Ok(()),
        };
        Err(ConfigError::InvalidRange {
            name: name.to_string(),
            reason: format!("{self:?}: {reason}"),
        })
    }

    /// Integers are drawn inclusively; floats uniformly in `[min, max]`.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> ParamValue {
        match *self {
            Self::Int { min, max } => ParamValue::Int(rng.gen_range(min..=max)),
            Self::Float { min, max } if min == max => ParamValue::Float(min),
            Self::Float { min, max } => ParamValue::Float(rng.gen_range(min..=max)),
        }
    }
}

/// Random-search space `{name: range}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParamRanges {
    axes: Vec<(String, ParamRange)>,
}

impl ParamRanges {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_int(mut self, name: impl Into<String>, min: i64, max: i64) -> Self {
        self.push(name, ParamRange::Int { min, max });
        self
    }

    pub fn with_float(mut self, name: impl Into<String>, min: f64, max: f64) -> Self {
        self.push(name, ParamRange::Float { min, max });
        self
    }

    pub fn push(&mut self, name: impl Into<String>, range: ParamRange) {
        self.axes.push((name.into(), range));
    }

    pub fn axes(&self) -> &[(String, ParamRange)] {
        &self.axes
    }

    pub fn is_empty(&self) -> bool {
        self.axes.is_empty()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.axes.is_empty() {
            return Err(ConfigError::EmptySpace);
        }
        check_unique(self.axes.iter().map(|(n, _)| n.as_str()))?;
        self.axes.iter().try_for_each(|(name, r)| r.validate(name))
    }

    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> ParameterSet {
        self.axes
            .iter()
            .map(|(name, range)| (name.clone(), range.sample(rng)))
            .collect()
    }
}

// ─── ParamSpace ──────────────────────────────────────────────────────

/// Either a discrete grid or a set of ranges.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamSpace {
    Grid(ParamGrid),
    Ranges(ParamRanges),
}

impl ParamSpace {
    pub fn validate(&self) -> Result<(), ConfigError> {
        match self {
            Self::Grid(g) => g.validate(),
            Self::Ranges(r) => r.validate(),
        }
    }

    /// Whether every value of `name` is numeric; None when `name` is absent.
    pub fn is_numeric(&self, name: &str) -> Option<bool> {
        match self {
            Self::Grid(g) => g
                .axes()
                .iter()
                .find(|a| a.name == name)
                .map(|a| a.values.iter().all(|v| v.as_f64().is_some())),
            Self::Ranges(r) => r.axes().iter().any(|(n, _)| n == name).then_some(true),
        }
    }

    pub fn names(&self) -> Vec<&str> {
        match self {
            Self::Grid(g) => g.axes().iter().map(|a| a.name.as_str()).collect(),
            Self::Ranges(r) => r.axes().iter().map(|(n, _)| n.as_str()).collect(),
        }
    }
}

impl From<ParamGrid> for ParamSpace {
    fn from(grid: ParamGrid) -> Self {
        Self::Grid(grid)
    }
}

impl From<ParamRanges> for ParamSpace {
    fn from(ranges: ParamRanges) -> Self {
        Self::Ranges(ranges)
    }
}

fn check_unique<'a>(names: impl Iterator<Item = &'a str>) -> Result<(), ConfigError> {
    let mut seen = HashSet::new();
    for name in names {
        if !seen.insert(name) {
            return Err(ConfigError::DuplicateParameter(name.to_string()));
        }
    }
    Ok(())
}

// ─── Constraints ─────────────────────────────────────────────────────

/// Predicate a combination must satisfy to be evaluated.
pub type Constraint = Arc<dyn Fn(&ParameterSet) -> bool + Send + Sync>;

/// Require `params[lower] < params[upper]` (numeric). Sets missing either
/// parameter pass.
pub fn less_than(lower: impl Into<String>, upper: impl Into<String>) -> Constraint {
    let (lower, upper) = (lower.into(), upper.into());
    Arc::new(move |params: &ParameterSet| {
        match (params.get_float(&lower), params.get_float(&upper)) {
            (Some(a), Some(b)) => a < b,
            _ => true,
        }
    })
}

/// Parse `"name < other"` against `space`. Both names must be numeric
/// parameters of the space.
pub fn parse_constraint(expr: &str, space: &ParamSpace) -> Result<Constraint, ConfigError> {
    let invalid = |reason: String| ConfigError::InvalidConstraint {
        expr: expr.to_string(),
        reason,
    };
    let (lower, upper) = match expr.split_once('<') {
        Some((a, b)) if !a.trim().is_empty() && !b.trim().is_empty() && !b.contains('<') => {
            (a.trim(), b.trim())
        }
        _ => return Err(invalid("expected 'name < other'".into())),
    };
    for name in [lower, upper] {
        match space.is_numeric(name) {
            Some(true) => {}
            Some(false) => return Err(invalid(format!("parameter '{name}' is not numeric"))),
            None => return Err(invalid(format!("unknown parameter '{name}'"))),
        }
    }
    Ok(less_than(lower, upper))
}
