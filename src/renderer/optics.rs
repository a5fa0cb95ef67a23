//! Per-Pixel Optics
//!
//! Pure functions shared by every backend's kernels: ray bending, Fresnel
//! weighting, the per-pixel refractive index stack and the display transform.
//! The WGSL kernels under `shaders/` mirror these one to one (`common.wgsl`).
//!
//! # Refractive index stack
//!
//! Each pixel of a refraction branch carries a [`MediumStack`]: the medium the
//! level's rays travel through (`current`), the medium outside it (`previous`)
//! and the nesting depth. Entering a surface pushes, exiting pops:
//!
//! ```text
//!   ambient ──enter A──▶ (amb, A, 1) ──enter B──▶ (A, B, 2)
//!                                                    │ exit B
//!   (amb, amb, 0) ◀──exit A── (amb, A, 1) ◀─────────┘
//! ```
//!
//! Only two media are remembered; a pop restores `previous` and falls back to
//! the ambient index below it.

use glam::{UVec2, Vec2, Vec3, Vec4};

use crate::renderer::settings::ToneMappingMode;

/// Hit distance recorded for pixels whose ray hit nothing.
pub const HIT_DISTANCE_MISS: f32 = f32::MAX;

/// Base reflectance used for opaque dielectrics that carry no index.
pub const DEFAULT_DIELECTRIC_F0: f32 = 0.04;

// ─── Vector helpers ──────────────────────────────────────────────────────────

#[inline]
#[must_use]
pub fn reflect(incident: Vec3, normal: Vec3) -> Vec3 {
    incident - 2.0 * incident.dot(normal) * normal
}

/// Snell refraction. `normal` must face against `incident`; `eta = n1 / n2`.
/// Returns `None` on total internal reflection.
#[must_use]
pub fn refract(incident: Vec3, normal: Vec3, eta: f32) -> Option<Vec3> {
    let cos_i = (-incident.dot(normal)).clamp(0.0, 1.0);
    let k = 1.0 - eta * eta * (1.0 - cos_i * cos_i);
    if k < 0.0 {
        return None;
    }
    Some((eta * incident + (eta * cos_i - k.sqrt()) * normal).normalize())
}

#[inline]
#[must_use]
pub fn average(v: Vec3) -> f32 {
    (v.x + v.y + v.z) / 3.0
}

// ─── Fresnel ─────────────────────────────────────────────────────────────────

#[inline]
#[must_use]
pub fn dielectric_f0(n1: f32, n2: f32) -> f32 {
    let r = (n1 - n2) / (n1 + n2);
    r * r
}

#[inline]
#[must_use]
pub fn schlick(cos_theta: f32, f0: f32) -> f32 {
    f0 + (1.0 - f0) * (1.0 - cos_theta.clamp(0.0, 1.0)).powi(5)
}

/// Schlick with the grazing peak damped by roughness.
#[inline]
#[must_use]
pub fn schlick_roughness(cos_theta: f32, f0: f32, roughness: f32) -> f32 {
    f0 + ((1.0 - roughness).max(f0) - f0) * (1.0 - cos_theta.clamp(0.0, 1.0)).powi(5)
}

/// Weight of the mirror bounce off a surface seen along `incident`.
///
/// Metals tint the reflection with their albedo; dielectrics use the index
/// against the ambient medium (or [`DEFAULT_DIELECTRIC_F0`] when opaque).
#[must_use]
pub fn reflection_weight(
    incident: Vec3,
    normal: Vec3,
    albedo: Vec3,
    metalness: f32,
    roughness: f32,
    refractive_index: f32,
    ambient_index: f32,
) -> f32 {
    let cos_theta = incident.dot(normal).abs();
    let dielectric = if refractive_index > 0.0 {
        dielectric_f0(ambient_index, refractive_index)
    } else {
        DEFAULT_DIELECTRIC_F0
    };
    let f0 = dielectric + (average(albedo) - dielectric) * metalness;
    schlick_roughness(cos_theta, f0, roughness)
}

// ─── Medium stack ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MediumStack {
    pub previous: f32,
    pub current: f32,
    pub depth: u32,
}

impl MediumStack {
    #[must_use]
    pub fn root(ambient_index: f32) -> Self {
        Self {
            previous: ambient_index,
            current: ambient_index,
            depth: 0,
        }
    }

    #[must_use]
    pub fn entered(self, index: f32) -> Self {
        Self {
            previous: self.current,
            current: index,
            depth: self.depth + 1,
        }
    }

    #[must_use]
    pub fn exited(self, ambient_index: f32) -> Self {
        if self.depth == 0 {
            return Self::root(ambient_index);
        }
        Self {
            previous: ambient_index,
            current: self.previous,
            depth: self.depth - 1,
        }
    }

    #[must_use]
    pub fn pack(self) -> Vec4 {
        Vec4::new(self.previous, self.current, self.depth as f32, 0.0)
    }

    #[must_use]
    pub fn unpack(texel: Vec4) -> Self {
        Self {
            previous: texel.x,
            current: texel.y,
            depth: texel.z.max(0.0).round() as u32,
        }
    }
}

/// Outcome of a ray crossing a transmissive surface.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transmission {
    pub direction: Vec3,
    /// Stack the continuing ray travels in. Unchanged on total internal reflection.
    pub stack: MediumStack,
    pub n1: f32,
    pub n2: f32,
    /// Cosine between the ray and the oriented normal on the incident side.
    pub cos_incident: f32,
    /// Cosine on the transmitted side (equal to `cos_incident` on TIR).
    pub cos_transmitted: f32,
    pub total_internal_reflection: bool,
}

/// Bends `incident` through a surface with outward `normal`.
///
/// Front-facing hits enter the surface's medium; back-facing hits leave it
/// for the stack's previous medium. Returns `None` for surfaces that do not
/// transmit (`refractive_index <= 0`).
#[must_use]
pub fn transmit(
    incident: Vec3,
    normal: Vec3,
    stack: MediumStack,
    refractive_index: f32,
    ambient_index: f32,
) -> Option<Transmission> {
    if refractive_index <= 0.0 {
        return None;
    }
    let entering = incident.dot(normal) < 0.0;
    let oriented = if entering { normal } else { -normal };
    let n1 = stack.current;
    let (n2, next) = if entering {
        (refractive_index, stack.entered(refractive_index))
    } else {
        (stack.previous, stack.exited(ambient_index))
    };
    let cos_incident = (-incident.dot(oriented)).clamp(0.0, 1.0);

    Some(match refract(incident, oriented, n1 / n2) {
        Some(direction) => Transmission {
            direction,
            stack: next,
            n1,
            n2,
            cos_incident,
            cos_transmitted: (-direction.dot(oriented)).clamp(0.0, 1.0),
            total_internal_reflection: false,
        },
        None => Transmission {
            direction: reflect(incident, oriented),
            stack,
            n1,
            n2,
            cos_incident,
            cos_transmitted: cos_incident,
            total_internal_reflection: true,
        },
    })
}

/// Weight of the transmitted branch through a surface.
///
/// `reflectance` is the [`reflection_weight`] of the same surface. On total
/// internal reflection the branch follows the mirror path the reflection
/// branch already carries with that weight, so it only takes the transmissive
/// share of what is left: the two weights never sum past 1.
#[must_use]
pub fn transmission_weight(
    transmission: &Transmission,
    opacity: f32,
    metalness: f32,
    reflectance: f32,
) -> f32 {
    let transmissive = (1.0 - opacity.clamp(0.0, 1.0)) * (1.0 - metalness.clamp(0.0, 1.0));
    if transmission.total_internal_reflection {
        return (1.0 - reflectance.clamp(0.0, 1.0)) * transmissive;
    }
    // Schlick is evaluated on the rarer side of the interface.
    let cos_theta = if transmission.n1 > transmission.n2 {
        transmission.cos_transmitted
    } else {
        transmission.cos_incident
    };
    let fresnel = schlick(cos_theta, dielectric_f0(transmission.n1, transmission.n2));
    (1.0 - fresnel) * transmissive
}

// ─── Sampling ────────────────────────────────────────────────────────────────

/// Stateless per-pixel hash (PCG) mapped to two uniforms in `[0, 1)`.
#[must_use]
pub fn hash2(pixel: UVec2, seed: u32) -> Vec2 {
    fn pcg(v: u32) -> u32 {
        let state = v.wrapping_mul(747_796_405).wrapping_add(2_891_336_453);
        let word = ((state >> ((state >> 28) + 4)) ^ state).wrapping_mul(277_803_737);
        (word >> 22) ^ word
    }
    let a = pcg(pixel.x ^ pcg(pixel.y ^ pcg(seed)));
    let b = pcg(a);
    Vec2::new(
        (a >> 8) as f32 / (1u32 << 24) as f32,
        (b >> 8) as f32 / (1u32 << 24) as f32,
    )
}

/// Perturbs a mirror direction inside a cone that widens with roughness.
///
/// Falls back to the unperturbed direction when the jittered one would
/// leave through the surface.
#[must_use]
pub fn jitter_direction(mirror: Vec3, normal: Vec3, spread: f32, u: Vec2) -> Vec3 {
    if spread <= 0.0 {
        return mirror;
    }
    let tangent = if mirror.y.abs() < 0.999 { Vec3::Y } else { Vec3::X }
        .cross(mirror)
        .normalize();
    let bitangent = mirror.cross(tangent);
    let r = u.x.sqrt() * spread;
    let phi = std::f32::consts::TAU * u.y;
    let jittered = (mirror + tangent * (r * phi.cos()) + bitangent * (r * phi.sin())).normalize();
    if jittered.dot(normal) * mirror.dot(normal) > 0.0 {
        jittered
    } else {
        mirror
    }
}

// ─── Display ─────────────────────────────────────────────────────────────────

#[must_use]
pub fn tone_map(color: Vec3, exposure: f32, mode: ToneMappingMode) -> Vec3 {
    let c = (color * exposure).max(Vec3::ZERO);
    let mapped = match mode {
        ToneMappingMode::Linear => c,
        ToneMappingMode::Reinhard => c / (Vec3::ONE + c),
        ToneMappingMode::ACESFilmic => {
            // Narkowicz fit
            (c * (2.51 * c + 0.03)) / (c * (2.43 * c + 0.59) + 0.14)
        }
    };
    mapped.clamp(Vec3::ZERO, Vec3::ONE)
}

#[must_use]
pub fn linear_to_srgb(c: Vec3) -> Vec3 {
    let f = |x: f32| {
        if x <= 0.003_130_8 {
            x * 12.92
        } else {
            1.055 * x.powf(1.0 / 2.4) - 0.055
        }
    };
    Vec3::new(f(c.x), f(c.y), f(c.z))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-5
    }

    #[test]
    fn normal_incidence_passes_straight_through() {
        let t = transmit(Vec3::NEG_Z, Vec3::Z, MediumStack::root(1.0), 1.5, 1.0).unwrap();
        assert!((t.direction - Vec3::NEG_Z).length() < 1e-5);
        assert_eq!(t.stack, MediumStack { previous: 1.0, current: 1.5, depth: 1 });
        assert!(!t.total_internal_reflection);
    }

    #[test]
    fn exiting_pops_to_previous_medium() {
        let inside = MediumStack::root(1.0).entered(1.5);
        // Back face: ray travels along the outward normal.
        let t = transmit(Vec3::Z, Vec3::Z, inside, 1.5, 1.0).unwrap();
        assert!(approx(t.n1, 1.5) && approx(t.n2, 1.0));
        assert_eq!(t.stack, MediumStack::root(1.0));
    }

    #[test]
    fn grazing_exit_is_total_internal_reflection() {
        let inside = MediumStack::root(1.0).entered(1.5);
        let incident = Vec3::new(0.9, 0.0, 0.3).normalize();
        let t = transmit(incident, Vec3::Z, inside, 1.5, 1.0).unwrap();
        assert!(t.total_internal_reflection);
        assert_eq!(t.stack, inside);
        assert!(t.direction.z < 0.0);
        assert!(approx(transmission_weight(&t, 0.0, 0.0, 0.0), 1.0));
    }

    #[test]
    fn internal_reflection_splits_the_mirror_path_with_the_reflection_branch() {
        let inside = MediumStack::root(1.0).entered(1.5);
        let incident = Vec3::new(0.9, 0.0, 0.3).normalize();
        let t = transmit(incident, Vec3::Z, inside, 1.5, 1.0).unwrap();
        let reflectance = reflection_weight(incident, Vec3::Z, Vec3::ONE, 0.0, 0.0, 1.5, 1.0);
        let transmitted = transmission_weight(&t, 0.0, 0.0, reflectance);
        assert!(reflectance > 0.0 && reflectance < 1.0);
        assert!(approx(reflectance + transmitted, 1.0));
        // A half-opaque surface passes half of the remainder.
        assert!(approx(transmission_weight(&t, 0.5, 0.0, reflectance), 0.5 * (1.0 - reflectance)));
    }

    #[test]
    fn opaque_surfaces_do_not_transmit() {
        assert!(transmit(Vec3::NEG_Z, Vec3::Z, MediumStack::root(1.0), 0.0, 1.0).is_none());
    }

    #[test]
    fn stack_pop_below_root_saturates() {
        assert_eq!(MediumStack::root(1.0).exited(1.0), MediumStack::root(1.0));
    }

    #[test]
    fn nested_enter_enter_exit_exit_balances() {
        let s = MediumStack::root(1.0).entered(1.3).entered(1.8);
        assert_eq!(s, MediumStack { previous: 1.3, current: 1.8, depth: 2 });
        let s = s.exited(1.0);
        assert!(approx(s.current, 1.3));
        assert_eq!(s.exited(1.0), MediumStack::root(1.0));
    }

    #[test]
    fn schlick_normal_incidence_equals_f0() {
        assert!(approx(schlick(1.0, 0.04), 0.04));
        assert!(approx(schlick_roughness(1.0, 0.5, 0.0), 0.5));
        assert!(approx(schlick(0.0, 0.04), 1.0));
    }

    #[test]
    fn metal_reflection_uses_albedo() {
        let w = reflection_weight(Vec3::NEG_Z, Vec3::Z, Vec3::splat(0.5), 1.0, 0.0, 0.0, 1.0);
        assert!(approx(w, 0.5));
    }

    #[test]
    fn glass_transmission_at_normal_incidence() {
        let t = transmit(Vec3::NEG_Z, Vec3::Z, MediumStack::root(1.0), 1.5, 1.0).unwrap();
        // Without TIR the reflectance does not enter the transmitted share.
        assert!(approx(transmission_weight(&t, 0.0, 0.0, 0.5), 1.0 - 0.04));
        assert!(approx(transmission_weight(&t, 1.0, 0.0, 0.0), 0.0));
    }

    #[test]
    fn hash_is_deterministic_and_in_range() {
        let a = hash2(UVec2::new(3, 7), 1);
        assert_eq!(a, hash2(UVec2::new(3, 7), 1));
        assert_ne!(a, hash2(UVec2::new(4, 7), 1));
        assert!(a.cmpge(Vec2::ZERO).all() && a.cmplt(Vec2::ONE).all());
    }

    #[test]
    fn jitter_stays_above_surface() {
        let mirror = Vec3::new(1.0, 0.05, 0.0).normalize();
        for i in 0..64 {
            let d = jitter_direction(mirror, Vec3::Y, 0.8, hash2(UVec2::new(i, 0), 0));
            assert!(d.dot(Vec3::Y) > 0.0);
        }
    }

    #[test]
    fn tone_map_stays_in_unit_range() {
        for mode in [ToneMappingMode::Linear, ToneMappingMode::Reinhard, ToneMappingMode::ACESFilmic] {
            let c = tone_map(Vec3::new(0.0, 1.0, 100.0), 1.0, mode);
            assert!(c.cmpge(Vec3::ZERO).all() && c.cmple(Vec3::ONE).all());
        }
    }
}
