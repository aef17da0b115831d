//! Engine-agnostic material description.
//!
//! Materials carry shading parameters and texture references; the actual
//! texture decode and GPU upload happen in the rendering backend.

use std::hash::{Hash, Hasher};

use rustc_hash::FxHasher;
use serde::{Deserialize, Serialize};

/// Material parameters handed to the rendering layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaterialResource {
    pub name: String,

    /// Linear RGBA base color.
    pub base_color: [f32; 4],

    pub metallic: f32,
    pub roughness: f32,
    pub emissive: [f32; 3],

    /// Optional texture paths, resolved by the rendering backend.
    pub base_color_texture: Option<String>,
    pub normal_texture: Option<String>,
}

impl MaterialResource {
    /// Neutral mid-grey default.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            base_color: [0.6, 0.6, 0.6, 1.0],
            metallic: 0.0,
            roughness: 0.8,
            emissive: [0.0, 0.0, 0.0],
            base_color_texture: None,
            normal_texture: None,
        }
    }

    /// Fallback material for a named request that could not be resolved.
    /// The color is a deterministic function of the name so the same
    /// missing asset always renders the same way.
    pub fn fallback(name: impl Into<String>) -> Self {
        let name = name.into();
        let mut hasher = FxHasher::default();
        name.hash(&mut hasher);
        let hash = hasher.finish();

        let hue = (hash % 360) as f32;
        let [r, g, b] = hue_to_rgb(hue, 0.45, 0.55);

        Self {
            base_color: [r, g, b, 1.0],
            ..Self::new(name)
        }
    }

    pub fn size_bytes(&self) -> usize {
        let mut bytes = std::mem::size_of::<Self>() + self.name.len();
        if let Some(t) = &self.base_color_texture {
            bytes += t.len();
        }
        if let Some(t) = &self.normal_texture {
            bytes += t.len();
        }
        bytes
    }
}

/// HSL to RGB for the fallback palette.
fn hue_to_rgb(hue: f32, saturation: f32, lightness: f32) -> [f32; 3] {
    let c = (1.0 - (2.0 * lightness - 1.0).abs()) * saturation;
    let h = hue / 60.0;
    let x = c * (1.0 - (h % 2.0 - 1.0).abs());
    let (r, g, b) = match h as u32 {
        0 => (c, x, 0.0),
        1 => (x, c, 0.0),
        2 => (0.0, c, x),
        3 => (0.0, x, c),
        4 => (x, 0.0, c),
        _ => (c, 0.0, x),
    };
    let m = lightness - c / 2.0;
    [r + m, g + m, b + m]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fallback_color_is_deterministic() {
        let a = MaterialResource::fallback("stone_wall");
        let b = MaterialResource::fallback("stone_wall");
        let c = MaterialResource::fallback("mossy_stone");

        assert_eq!(a.base_color, b.base_color);
        assert_ne!(a.base_color, c.base_color);
    }

    #[test]
    fn material_round_trips_through_json() {
        let mut material = MaterialResource::new("bark");
        material.base_color_texture = Some("textures/bark.png".to_string());
        material.roughness = 0.95;

        let json = serde_json::to_string(&material).unwrap();
        let parsed: MaterialResource = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, material);
    }
}
