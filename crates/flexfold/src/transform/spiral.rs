//! Spirals: directional bends sized from a diameter, length or turn count.

use std::f64::consts::{PI, TAU};

use flexfold_math::{Point2, Vec2};
use serde::{Deserialize, Serialize};

use super::{DirectionalBend, TransformMeta};
use crate::error::{DeformError, Result};

/// The sizing inputs of a spiral; exactly two of diameter, length and
/// turns/angle must be given.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SpiralParams {
    /// Winding diameter.
    pub diameter: Option<f64>,
    /// Length of sheet consumed by the winding.
    pub length: Option<f64>,
    /// Number of full turns.
    pub turns: Option<f64>,
    /// Total angle in radians; an alternative to `turns`.
    pub angle: Option<f64>,
}

/// A multi-turn bend starting at the segment between two anchors.
#[derive(Debug, Clone)]
pub struct Spiral {
    anchors: [Point2; 2],
    direction: f64,
    diameter: f64,
    length: f64,
    turns: f64,
    bend: DirectionalBend,
}

impl Spiral {
    /// Spiral hinged on `anchors`, winding towards `direction` (radians).
    ///
    /// The bend polygon is the anchors plus their translation by `length`
    /// along `direction`. Windings beyond one turn pass through themselves;
    /// no intersection check is made.
    pub fn new(
        meta: TransformMeta,
        anchors: [Point2; 2],
        direction: f64,
        params: SpiralParams,
    ) -> Result<Self> {
        let name = meta.name.clone();
        let (diameter, length, turns) = resolve(&name, &params)?;
        if !direction.is_finite() {
            return Err(DeformError::geometry(&name, "spiral direction is not finite"));
        }

        let offset = Vec2::new(direction.cos(), direction.sin()) * length;
        let polygon = vec![
            anchors[0],
            anchors[1],
            anchors[1] + offset,
            anchors[0] + offset,
        ];
        let bend = DirectionalBend::new(meta, polygon, turns * TAU)?;
        Ok(Self {
            anchors,
            direction,
            diameter,
            length,
            turns,
            bend,
        })
    }

    pub(crate) fn meta(&self) -> &TransformMeta {
        &self.bend.meta
    }

    /// The directional bend doing the work.
    pub fn bend(&self) -> &DirectionalBend {
        &self.bend
    }

    /// Hinge anchors.
    pub fn anchors(&self) -> [Point2; 2] {
        self.anchors
    }

    /// Winding direction in radians.
    pub fn direction(&self) -> f64 {
        self.direction
    }

    /// Winding diameter.
    ///
    /// Sized so that `length = π · diameter · turns`, i.e.
    /// `diameter = 2 · length / angle` with `angle = 2π · turns`.
    pub fn diameter(&self) -> f64 {
        self.diameter
    }

    /// Sheet length along `direction`.
    pub fn length(&self) -> f64 {
        self.length
    }

    /// Number of turns; negative winds downwards.
    pub fn turns(&self) -> f64 {
        self.turns
    }
}

/// Derive `(diameter, length, turns)` from exactly two inputs.
fn resolve(name: &str, p: &SpiralParams) -> Result<(f64, f64, f64)> {
    if p.turns.is_some() && p.angle.is_some() {
        return Err(DeformError::OverdefinedSpiral {
            name: name.to_string(),
        });
    }
    let turns = p.turns.or(p.angle.map(|a| a / TAU));
    let given = [p.diameter.is_some(), p.length.is_some(), turns.is_some()]
        .iter()
        .filter(|g| **g)
        .count();
    if given > 2 {
        return Err(DeformError::OverdefinedSpiral {
            name: name.to_string(),
        });
    }
    if given < 2 {
        return Err(DeformError::UnderdefinedSpiral {
            name: name.to_string(),
        });
    }

    let positive = |what: &str, v: f64| {
        if v.is_finite() && v > 0.0 {
            Ok(v)
        } else {
            Err(DeformError::geometry(
                name,
                format!("spiral {what} must be positive, got {v}"),
            ))
        }
    };
    let nonzero = |v: f64| {
        if v.is_finite() && v != 0.0 {
            Ok(v)
        } else {
            Err(DeformError::geometry(
                name,
                format!("spiral turns must be non-zero, got {v}"),
            ))
        }
    };

    match (p.diameter, p.length, turns) {
        (Some(d), Some(l), None) => {
            let (d, l) = (positive("diameter", d)?, positive("length", l)?);
            Ok((d, l, l / (PI * d)))
        }
        (Some(d), None, Some(t)) => {
            let (d, t) = (positive("diameter", d)?, nonzero(t)?);
            Ok((d, PI * d * t.abs(), t))
        }
        (None, Some(l), Some(t)) => {
            // Equivalent to 2 * length / angle.
            let (l, t) = (positive("length", l)?, nonzero(t)?);
            Ok((l / (PI * t.abs()), l, t))
        }
        _ => Err(DeformError::UnderdefinedSpiral {
            name: name.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn anchors() -> [Point2; 2] {
        [Point2::new(-40.0, 10.0), Point2::new(-20.0, -10.0)]
    }

    #[test]
    fn test_resolves_each_pair() {
        let by_length = SpiralParams {
            length: Some(70.0),
            turns: Some(1.0),
            ..Default::default()
        };
        let s = Spiral::new(TransformMeta::new("s"), anchors(), 0.0, by_length).unwrap();
        assert_abs_diff_eq!(s.diameter(), 70.0 / PI, epsilon = 1e-12);
        assert_abs_diff_eq!(s.bend().angle(), TAU, epsilon = 1e-12);

        let by_diameter = SpiralParams {
            diameter: Some(10.0),
            angle: Some(PI),
            ..Default::default()
        };
        let s = Spiral::new(TransformMeta::new("s"), anchors(), 0.0, by_diameter).unwrap();
        assert_abs_diff_eq!(s.turns(), 0.5, epsilon = 1e-12);
        assert_abs_diff_eq!(s.length(), 5.0 * PI, epsilon = 1e-12);

        let no_turns = SpiralParams {
            diameter: Some(10.0),
            length: Some(20.0 * PI),
            ..Default::default()
        };
        let s = Spiral::new(TransformMeta::new("s"), anchors(), 0.0, no_turns).unwrap();
        assert_abs_diff_eq!(s.turns(), 2.0, epsilon = 1e-12);
    }

    #[test]
    fn test_diameter_is_twice_length_over_angle() {
        let params = SpiralParams {
            length: Some(30.0),
            angle: Some(3.0 * PI),
            ..Default::default()
        };
        let s = Spiral::new(TransformMeta::new("s"), anchors(), 0.0, params).unwrap();
        assert_abs_diff_eq!(s.diameter(), 2.0 * 30.0 / (3.0 * PI), epsilon = 1e-12);
        assert_abs_diff_eq!(s.turns(), 1.5, epsilon = 1e-12);
        assert_abs_diff_eq!(
            PI * s.diameter() * s.turns(),
            s.length(),
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_over_and_underdefined() {
        let all = SpiralParams {
            diameter: Some(1.0),
            length: Some(2.0),
            turns: Some(1.0),
            angle: None,
        };
        assert!(matches!(
            Spiral::new(TransformMeta::new("s"), anchors(), 0.0, all),
            Err(DeformError::OverdefinedSpiral { .. })
        ));

        let both_turns_and_angle = SpiralParams {
            length: Some(2.0),
            turns: Some(1.0),
            angle: Some(TAU),
            ..Default::default()
        };
        assert!(matches!(
            Spiral::new(TransformMeta::new("s"), anchors(), 0.0, both_turns_and_angle),
            Err(DeformError::OverdefinedSpiral { .. })
        ));

        let one = SpiralParams {
            length: Some(2.0),
            ..Default::default()
        };
        assert!(matches!(
            Spiral::new(TransformMeta::new("s"), anchors(), 0.0, one),
            Err(DeformError::UnderdefinedSpiral { .. })
        ));
    }

    #[test]
    fn test_polygon_follows_direction() {
        let params = SpiralParams {
            length: Some(70.0),
            turns: Some(1.0),
            ..Default::default()
        };
        let s = Spiral::new(TransformMeta::new("s"), anchors(), 0.0, params).unwrap();
        let pts = s.bend().scope().exterior_coords();
        assert_eq!(pts[0], Point2::new(-40.0, 10.0));
        assert_eq!(pts[1], Point2::new(-20.0, -10.0));
        assert_abs_diff_eq!(pts[2].x, 50.0, epsilon = 1e-12);
        assert_abs_diff_eq!(pts[3].x, 30.0, epsilon = 1e-12);
    }
}
