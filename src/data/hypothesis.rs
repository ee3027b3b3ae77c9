//! Sizing policies attached to cells through constraints.

use crate::cad::ShapeKind;
use crate::mesh_error::BoraError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

/// Element type requested by a hypothesis.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ElementKind {
    /// Point element (vertex).
    V1,
    /// Two-node segment (edge).
    E2,
    /// Three-node triangle (face).
    T3,
    /// Four-node quadrangle (face).
    Q4,
    /// Four-node tetrahedron (solid).
    T4,
}

impl ElementKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ElementKind::V1 => "V1",
            ElementKind::E2 => "E2",
            ElementKind::T3 => "T3",
            ElementKind::Q4 => "Q4",
            ElementKind::T4 => "T4",
        }
    }

    /// Kind of cell this element discretizes.
    pub fn shape_kind(self) -> ShapeKind {
        match self {
            ElementKind::V1 => ShapeKind::Vertex,
            ElementKind::E2 => ShapeKind::Edge,
            ElementKind::T3 | ElementKind::Q4 => ShapeKind::Face,
            ElementKind::T4 => ShapeKind::Solid,
        }
    }

    pub fn dimension(self) -> u8 {
        match self {
            ElementKind::V1 => 0,
            ElementKind::E2 => 1,
            ElementKind::T3 | ElementKind::Q4 => 2,
            ElementKind::T4 => 3,
        }
    }

    /// Element this one implies on a cell of `kind`: `T4 -> T3 -> E2 -> V1`,
    /// `Q4 -> E2 -> V1`. `None` for higher dimensions and non-meshed kinds.
    pub fn implied_for(self, kind: ShapeKind) -> Option<ElementKind> {
        let target = kind.dimension()?;
        if target > self.dimension() {
            return None;
        }
        Some(match (self, target) {
            (e, t) if t == e.dimension() => e,
            (_, 0) => ElementKind::V1,
            (_, 1) => ElementKind::E2,
            (ElementKind::T4, 2) => ElementKind::T3,
            _ => return None,
        })
    }
}

impl FromStr for ElementKind {
    type Err = BoraError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "V1" => Ok(ElementKind::V1),
            "E2" => Ok(ElementKind::E2),
            "T3" => Ok(ElementKind::T3),
            "Q4" => Ok(ElementKind::Q4),
            "T4" => Ok(ElementKind::T4),
            other => Err(BoraError::Configuration(format!(
                "unknown element type `{other}`"
            ))),
        }
    }
}

impl fmt::Display for ElementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Target element, length, and (absolute or relative) deflection.
///
/// Values `<= 0` disable a criterion. Two hypotheses are equal when all their
/// fields are; floats compare by bit pattern (with `-0.0 == 0.0`) so the type
/// can key hash maps.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(try_from = "HypothesisFields")]
pub struct Hypothesis {
    element: ElementKind,
    length: f64,
    deflection: f64,
    relative_deflection: bool,
}

/// Unchecked wire form; deserialized hypotheses go through the constructors.
#[derive(Deserialize)]
struct HypothesisFields {
    element: ElementKind,
    length: f64,
    deflection: f64,
    relative_deflection: bool,
}

impl TryFrom<HypothesisFields> for Hypothesis {
    type Error = BoraError;

    fn try_from(f: HypothesisFields) -> Result<Self, Self::Error> {
        Ok(Hypothesis::with_element(f.element, f.length)?
            .with_deflection(f.deflection)?
            .with_relative_deflection(f.relative_deflection))
    }
}

fn check_finite(what: &str, v: f64) -> Result<f64, BoraError> {
    if v.is_finite() {
        Ok(v + 0.0)
    } else {
        Err(BoraError::Configuration(format!("{what} must be finite, got {v}")))
    }
}

impl Hypothesis {
    /// Hypothesis from an element code such as `"E2"`.
    ///
    /// # Errors
    /// `Configuration` for an unknown code or a non-finite length.
    pub fn new(element: &str, length: f64) -> Result<Self, BoraError> {
        Self::with_element(element.parse()?, length)
    }

    pub fn with_element(element: ElementKind, length: f64) -> Result<Self, BoraError> {
        Ok(Hypothesis {
            element,
            length: check_finite("length", length)?,
            deflection: -1.0,
            relative_deflection: false,
        })
    }

    pub fn with_deflection(mut self, deflection: f64) -> Result<Self, BoraError> {
        self.deflection = check_finite("deflection", deflection)?;
        Ok(self)
    }

    pub fn with_relative_deflection(mut self, relative: bool) -> Self {
        self.relative_deflection = relative;
        self
    }

    #[inline]
    pub fn element(&self) -> ElementKind {
        self.element
    }

    #[inline]
    pub fn length(&self) -> f64 {
        self.length
    }

    #[inline]
    pub fn deflection(&self) -> f64 {
        self.deflection
    }

    #[inline]
    pub fn is_relative_deflection(&self) -> bool {
        self.relative_deflection
    }

    pub fn has_length(&self) -> bool {
        self.length > 0.0
    }

    pub fn has_deflection(&self) -> bool {
        self.deflection > 0.0
    }

    /// Hypothesis a descendant of `kind` receives from this one.
    pub fn inherited(&self, kind: ShapeKind) -> Option<Hypothesis> {
        let element = self.element.implied_for(kind)?;
        Some(Hypothesis {
            element,
            ..self.clone()
        })
    }

    /// Merge two inherited hypotheses for the same cell: each criterion keeps
    /// the finer enabled value. The relative flag follows the deflection that
    /// wins; on a tie the absolute one is kept.
    ///
    /// # Errors
    /// `Configuration` when the elements differ.
    pub fn combine(&self, other: &Hypothesis) -> Result<Hypothesis, BoraError> {
        if self.element != other.element {
            return Err(BoraError::Configuration(format!(
                "cannot combine {} with {}",
                self.element, other.element
            )));
        }
        let deflection = finer(self.deflection, other.deflection);
        let relative_deflection = match (self.has_deflection(), other.has_deflection()) {
            (true, true) if self.deflection < other.deflection => self.relative_deflection,
            (true, true) if other.deflection < self.deflection => other.relative_deflection,
            (true, true) => self.relative_deflection && other.relative_deflection,
            (true, false) => self.relative_deflection,
            (false, true) => other.relative_deflection,
            (false, false) => self.relative_deflection || other.relative_deflection,
        };
        Ok(Hypothesis {
            element: self.element,
            length: finer(self.length, other.length),
            deflection,
            relative_deflection,
        })
    }
}

fn finer(a: f64, b: f64) -> f64 {
    match (a > 0.0, b > 0.0) {
        (true, true) => a.min(b),
        (true, false) => a,
        (false, true) => b,
        (false, false) => a.max(b),
    }
}

impl PartialEq for Hypothesis {
    fn eq(&self, other: &Self) -> bool {
        self.element == other.element
            && self.length.to_bits() == other.length.to_bits()
            && self.deflection.to_bits() == other.deflection.to_bits()
            && self.relative_deflection == other.relative_deflection
    }
}

impl Eq for Hypothesis {}

impl Hash for Hypothesis {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.element.hash(state);
        self.length.to_bits().hash(state);
        self.deflection.to_bits().hash(state);
        self.relative_deflection.hash(state);
    }
}

impl fmt::Display for Hypothesis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} length={}", self.element, self.length)?;
        if self.has_deflection() {
            write!(f, " deflection={}", self.deflection)?;
            if self.relative_deflection {
                f.write_str(" (relative)")?;
            }
        }
        Ok(())
    }
}
