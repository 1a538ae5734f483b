//! Presentation recipes for 2D images
//!
//! Each style is a fixed stack of planes around the image. Parts further back
//! sit at negative local Z so the image itself stays in front.

use std::sync::Arc;

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::graph::{Material, NodeContent};
use crate::texture::Texture;

const HALO_COLOR: [f32; 4] = [1.0, 0.95, 0.8, 0.35];
const GLOW_COLOR: [f32; 4] = [0.6, 0.8, 1.0, 0.25];
const CANVAS_BACKING: [f32; 4] = [0.96, 0.94, 0.9, 1.0];
const CANVAS_BORDER: [f32; 4] = [0.35, 0.25, 0.15, 1.0];

/// How a 2D image is presented in the scene
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImageStyle {
    /// The image plane alone
    #[default]
    Flat,
    /// Emissive image with a soft halo behind it
    Framed,
    /// Image mounted on a backing board with a border
    Canvas,
    /// Emissive image with a glow and a drop shadow
    Floating,
}

/// One plane of a style recipe
#[derive(Debug, Clone, PartialEq)]
pub struct PlanePart {
    /// Suffix of the child node name
    pub role: &'static str,
    pub content: NodeContent,
    /// Local offset from the image center
    pub offset: Vec3,
}

fn plane(role: &'static str, width: f32, height: f32, material: Material, offset: Vec3) -> PlanePart {
    PlanePart {
        role,
        content: NodeContent::Plane {
            width,
            height,
            material,
        },
        offset,
    }
}

/// Build the plane stack for an image of the given size
pub fn recipe(style: ImageStyle, texture: Arc<Texture>, width: f32, height: f32) -> Vec<PlanePart> {
    let emissive_image = |emissive: f32| Material::Textured {
        texture: Arc::clone(&texture),
        emissive,
    };

    match style {
        ImageStyle::Flat => vec![plane("image", width, height, emissive_image(0.0), Vec3::ZERO)],
        ImageStyle::Framed => vec![
            plane("image", width, height, emissive_image(0.4), Vec3::ZERO),
            plane(
                "halo",
                width * 1.15,
                height * 1.15,
                Material::Emissive {
                    color: HALO_COLOR,
                    intensity: 0.8,
                },
                Vec3::new(0.0, 0.0, -0.01),
            ),
        ],
        ImageStyle::Canvas => {
            let border = 0.05 * width.max(height);
            vec![
                plane(
                    "backing",
                    width * 1.1,
                    height * 1.1,
                    Material::Basic {
                        color: CANVAS_BACKING,
                    },
                    Vec3::new(0.0, 0.0, -0.02),
                ),
                plane("image", width, height, emissive_image(0.0), Vec3::ZERO),
                PlanePart {
                    role: "border",
                    content: NodeContent::Ring {
                        width: width * 1.1,
                        height: height * 1.1,
                        thickness: border,
                        material: Material::Basic {
                            color: CANVAS_BORDER,
                        },
                    },
                    offset: Vec3::new(0.0, 0.0, 0.005),
                },
            ]
        }
        ImageStyle::Floating => vec![
            plane("image", width, height, emissive_image(0.6), Vec3::ZERO),
            plane(
                "glow",
                width * 1.2,
                height * 1.2,
                Material::Emissive {
                    color: GLOW_COLOR,
                    intensity: 1.0,
                },
                Vec3::new(0.0, 0.0, -0.01),
            ),
            plane(
                "shadow",
                width,
                height,
                Material::Shadow { opacity: 0.4 },
                Vec3::new(0.08, -0.08, -0.1),
            ),
        ],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::texture::TextureFormat;

    fn texture() -> Arc<Texture> {
        Arc::new(Texture {
            width: 2,
            height: 1,
            data: vec![0; 8],
            format: TextureFormat::Rgba8,
        })
    }

    fn roles(style: ImageStyle) -> Vec<&'static str> {
        recipe(style, texture(), 2.0, 1.0)
            .into_iter()
            .map(|p| p.role)
            .collect()
    }

    #[test]
    fn test_each_style_has_its_own_stack() {
        assert_eq!(roles(ImageStyle::Flat), vec!["image"]);
        assert_eq!(roles(ImageStyle::Framed), vec!["image", "halo"]);
        assert_eq!(roles(ImageStyle::Canvas), vec!["backing", "image", "border"]);
        assert_eq!(roles(ImageStyle::Floating), vec!["image", "glow", "shadow"]);
    }

    #[test]
    fn test_image_plane_keeps_size() {
        let parts = recipe(ImageStyle::Floating, texture(), 2.0, 1.0);
        let image = parts.iter().find(|p| p.role == "image").unwrap();
        assert!(matches!(
            image.content,
            NodeContent::Plane { width, height, .. } if width == 2.0 && height == 1.0
        ));
        let shadow = parts.iter().find(|p| p.role == "shadow").unwrap();
        assert!(shadow.offset.z < 0.0);
    }

    #[test]
    fn test_style_serde_names() {
        assert_eq!(serde_json::to_string(&ImageStyle::Floating).unwrap(), r#""floating""#);
        let style: ImageStyle = serde_json::from_str(r#""canvas""#).unwrap();
        assert_eq!(style, ImageStyle::Canvas);
    }
}
