use glam::{Mat4, Quat, Vec3};

use crate::resource_system::file_formats::proplist::{PropDescriptor, PropKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropCategory {
    Tree,
    Rock,
}

impl PropKind {
    pub const ALL: [PropKind; 5] = [
        PropKind::Pine,
        PropKind::Birch,
        PropKind::Oak,
        PropKind::Boulder,
        PropKind::Stone,
    ];

    pub fn category(self) -> PropCategory {
        match self {
            PropKind::Pine | PropKind::Birch | PropKind::Oak => PropCategory::Tree,
            PropKind::Boulder | PropKind::Stone => PropCategory::Rock,
        }
    }

    pub fn model_path(self) -> &'static str {
        match self {
            PropKind::Pine => "assets/shared/props/pine.json",
            PropKind::Birch => "assets/shared/props/birch.json",
            PropKind::Oak => "assets/shared/props/oak.json",
            PropKind::Boulder => "assets/shared/props/boulder.json",
            PropKind::Stone => "assets/shared/props/stone.json",
        }
    }

    pub fn texture_path(self) -> &'static str {
        match self {
            PropKind::Pine => "assets/shared/props/pine_bark.png",
            PropKind::Birch => "assets/shared/props/birch_bark.png",
            PropKind::Oak => "assets/shared/props/oak_bark.png",
            PropKind::Boulder | PropKind::Stone => "assets/shared/props/granite.png",
        }
    }

    /// Uniform scale applied when the level editor drops a fresh prop.
    pub fn default_scale(self) -> f32 {
        match self {
            PropKind::Pine => 1.2,
            PropKind::Birch => 0.9,
            PropKind::Oak => 1.5,
            PropKind::Boulder => 2.0,
            PropKind::Stone => 0.5,
        }
    }
}

impl PropDescriptor {
    pub fn new(kind: PropKind, position: Vec3) -> Self {
        Self {
            kind,
            position: position.to_array(),
            rotation_y: 0.0,
            scale: kind.default_scale(),
        }
    }

    pub fn transform(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(
            Vec3::splat(self.scale),
            Quat::from_rotation_y(self.rotation_y),
            Vec3::from(self.position),
        )
    }
}

/// A placed tree or rock, resolved from its descriptor.
#[derive(Debug, Clone, PartialEq)]
pub struct Prop {
    pub descriptor: PropDescriptor,
    pub category: PropCategory,
    pub model: &'static str,
    pub texture: &'static str,
    pub transform: Mat4,
}

impl Prop {
    pub fn from_descriptor(descriptor: PropDescriptor) -> Self {
        let kind = descriptor.kind;
        Self {
            category: kind.category(),
            model: kind.model_path(),
            texture: kind.texture_path(),
            transform: descriptor.transform(),
            descriptor,
        }
    }

    pub fn kind(&self) -> PropKind {
        self.descriptor.kind
    }

    pub fn position(&self) -> Vec3 {
        Vec3::from(self.descriptor.position)
    }

    pub fn set_position(&mut self, position: Vec3) {
        self.descriptor.position = position.to_array();
        self.transform = self.descriptor.transform();
    }
}
