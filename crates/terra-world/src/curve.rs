use serde::Deserialize;

#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
pub struct CurveKey {
    pub time: f32,
    pub value: f32,
}

impl CurveKey {
    #[inline]
    pub const fn new(time: f32, value: f32) -> Self {
        Self { time, value }
    }
}

/// Remaps normalized heights before they are scaled into world units.
///
/// Keys are kept sorted by time; evaluation is piecewise linear and clamps to
/// the first/last key outside the keyed range. Immutable once built so worker
/// threads can share one instance.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(from = "Vec<CurveKey>")]
pub struct HeightCurve {
    keys: Vec<CurveKey>,
}

impl Default for HeightCurve {
    fn default() -> Self {
        Self::linear()
    }
}

impl From<Vec<CurveKey>> for HeightCurve {
    fn from(keys: Vec<CurveKey>) -> Self {
        Self::new(keys)
    }
}

impl HeightCurve {
    pub fn new(mut keys: Vec<CurveKey>) -> Self {
        keys.retain(|k| k.time.is_finite() && k.value.is_finite());
        keys.sort_by(|a, b| a.time.total_cmp(&b.time));
        Self { keys }
    }

    /// Identity over `[0, 1]`.
    pub fn linear() -> Self {
        Self::new(vec![CurveKey::new(0.0, 0.0), CurveKey::new(1.0, 1.0)])
    }

    pub fn keys(&self) -> &[CurveKey] {
        &self.keys
    }

    pub fn evaluate(&self, t: f32) -> f32 {
        let (first, last) = match (self.keys.first(), self.keys.last()) {
            (Some(f), Some(l)) => (f, l),
            _ => return t,
        };
        if t <= first.time {
            return first.value;
        }
        if t >= last.time {
            return last.value;
        }
        // First key strictly after t; guaranteed in 1..len by the clamps above.
        let hi = self.keys.partition_point(|k| k.time <= t);
        let a = self.keys[hi - 1];
        let b = self.keys[hi];
        let span = b.time - a.time;
        if span <= 0.0 {
            return b.value;
        }
        let f = (t - a.time) / span;
        a.value + (b.value - a.value) * f
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn linear_is_identity_inside_unit_range() {
        let c = HeightCurve::linear();
        for t in [0.0, 0.1, 0.5, 0.75, 1.0] {
            assert!((c.evaluate(t) - t).abs() < 1e-6);
        }
    }

    #[test]
    fn clamps_outside_keyed_range() {
        let c = HeightCurve::linear();
        assert_eq!(c.evaluate(-3.0), 0.0);
        assert_eq!(c.evaluate(7.0), 1.0);
    }

    #[test]
    fn flattens_lowlands() {
        let c = HeightCurve::new(vec![
            CurveKey::new(1.0, 1.0),
            CurveKey::new(0.0, 0.0),
            CurveKey::new(0.4, 0.0),
        ]);
        assert_eq!(c.keys()[0].time, 0.0);
        assert_eq!(c.evaluate(0.2), 0.0);
        assert!((c.evaluate(0.7) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn empty_curve_passes_through() {
        let c = HeightCurve::new(Vec::new());
        assert_eq!(c.evaluate(0.33), 0.33);
    }

    #[test]
    fn deserializes_from_key_list() {
        #[derive(Deserialize)]
        struct Wrap {
            curve: HeightCurve,
        }
        let w: Wrap = toml::from_str(
            "curve = [{ time = 1.0, value = 2.0 }, { time = 0.0, value = 0.0 }]",
        )
        .unwrap();
        assert!((w.curve.evaluate(0.5) - 1.0).abs() < 1e-6);
    }
}
