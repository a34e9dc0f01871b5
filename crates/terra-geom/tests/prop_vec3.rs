use proptest::prelude::*;
use terra_geom::{Vec2, Vec3};

fn component() -> impl Strategy<Value = f32> {
    -1_000.0f32..1_000.0
}

fn arb_vec3() -> impl Strategy<Value = Vec3> {
    (component(), component(), component()).prop_map(|(x, y, z)| Vec3::new(x, y, z))
}

/// Corner heights of one grid quad and the spacing of its samples.
fn arb_quad() -> impl Strategy<Value = ([f32; 4], f32)> {
    (prop::array::uniform4(-500.0f32..500.0), 1u32..=12).prop_map(|(h, step)| (h, step as f32))
}

proptest! {
    // Both triangles of a ground quad face up whatever the heights are
    #[test]
    fn ground_quad_normals_point_up((h, step) in arb_quad()) {
        // Rows run toward -Z, matching the tile vertex layout.
        let a = Vec3::new(0.0, h[0], 0.0);
        let b = Vec3::new(step, h[1], 0.0);
        let c = Vec3::new(0.0, h[2], -step);
        let d = Vec3::new(step, h[3], -step);
        for (p, q, r) in [(a, d, c), (d, a, b)] {
            let raw = (q - p).cross(r - p);
            prop_assert!((raw.y - step * step).abs() <= 1e-3 * step * step);
            let n = raw.normalized();
            prop_assert!(n.y > 0.0);
            prop_assert!((n.length() - 1.0).abs() <= 1e-4);
        }
    }

    // The cross product is perpendicular to both inputs
    #[test]
    fn cross_is_perpendicular(a in arb_vec3(), b in arb_vec3()) {
        let c = a.cross(b);
        let tol = 1e-4 * a.length() * b.length() * (a.length() + b.length()) + 1e-3;
        prop_assert!(a.dot(c).abs() <= tol);
        prop_assert!(b.dot(c).abs() <= tol);
    }

    // |a x b| never exceeds |a||b|
    #[test]
    fn cross_length_is_bounded(a in arb_vec3(), b in arb_vec3()) {
        let bound = a.length() * b.length();
        prop_assert!(a.cross(b).length() <= bound * (1.0 + 1e-4) + 1e-3);
    }

    // Summing normals then normalizing stays unit length
    #[test]
    fn accumulated_normals_normalize(ns in prop::collection::vec(arb_vec3(), 1..8)) {
        let mut acc = Vec3::ZERO;
        for n in &ns {
            acc += n.normalized();
        }
        prop_assume!(acc.length() > 1e-3);
        prop_assert!((acc.normalized().length() - 1.0).abs() <= 1e-4);
    }

    // Projection to the ground keeps the planar distance
    #[test]
    fn xz_keeps_planar_length(v in arb_vec3()) {
        let p = v.xz();
        let expected = v.x * v.x + v.z * v.z;
        prop_assert!((p.length_sq() - expected).abs() <= 1e-3 * expected.max(1.0));
    }

    #[test]
    fn vec2_scaling_divides_out(x in component(), y in component(), s in 0.01f32..100.0) {
        let p = Vec2::new(x, y);
        let q = (p * s) / s;
        prop_assert!((q - p).length() <= 1e-3 * p.length().max(1.0));
    }
}

#[test]
fn zero_vector_normalizes_to_itself() {
    assert_eq!(Vec3::ZERO.normalized(), Vec3::ZERO);
}

#[test]
fn negation_cancels() {
    let v = Vec3::new(1.5, -2.0, 8.0);
    assert_eq!(v + (-v), Vec3::ZERO);
}

#[test]
fn xz_drops_height() {
    let v = Vec3::new(3.0, 99.0, -7.5);
    assert_eq!(v.xz(), Vec2::new(3.0, -7.5));
}
