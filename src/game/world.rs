use std::fs;
use std::path::Path;

use generational_arena::{Arena, Index};
use glam::{Mat4, Quat, Vec3};
use tracing::{debug, info};

use super::{AnimatedModel, Prop, WorldError};
use crate::animation::AnimationError;
use crate::resource_system::file_formats::proplist::{PropDescriptor, PropKind, PropList};
use crate::resource_system::file_formats::terrainfile;
use crate::terrain::{HeightField, HeightSample};
use crate::utils::ensure_parent_dir_exists;

#[derive(Hash, Eq, PartialEq, Clone, Copy, Debug)]
pub struct PropId(pub Index);

#[derive(Hash, Eq, PartialEq, Clone, Copy, Debug)]
pub struct ActorId(pub Index);

pub struct Terrain {
    /// None when the field was built in memory rather than loaded from a bake
    pub descriptor: Option<terrainfile::Terrain>,
    pub height_field: HeightField,
}
impl Terrain {
    pub fn from_height_field(height_field: HeightField) -> Self {
        Self { descriptor: None, height_field }
    }

    /// Reads a baked terrain descriptor; its file references are relative to the descriptor.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, WorldError> {
        let path = path.as_ref();
        let descriptor: terrainfile::Terrain = serde_json::from_str(&fs::read_to_string(path)?)?;
        let directory = path.parent().unwrap_or(Path::new(""));
        let height_field = HeightField::load(directory.join(&descriptor.height_field))?;
        info!(
            terrain = %path.display(),
            cols = height_field.cols(),
            rows = height_field.rows(),
            "terrain loaded"
        );
        Ok(Self { descriptor: Some(descriptor), height_field })
    }
}

pub struct Actor {
    pub position: Vec3,
    /// radians around +Y
    pub heading: f32,
    pub model: AnimatedModel,
}
impl Actor {
    pub fn transform(&self) -> Mat4 {
        Mat4::from_rotation_translation(Quat::from_rotation_y(self.heading), self.position)
    }
}

/// Everything placed in the level. Owned by the application and passed to update and draw.
#[derive(Default)]
pub struct World {
    terrain: Option<Terrain>,
    props: Arena<Prop>,
    actors: Arena<Actor>,
}

impl World {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_terrain(terrain: Terrain) -> Self {
        Self { terrain: Some(terrain), ..Self::default() }
    }

    pub fn set_terrain(&mut self, terrain: Terrain) {
        self.terrain = Some(terrain);
    }

    pub fn terrain(&self) -> Option<&Terrain> {
        self.terrain.as_ref()
    }

    /// Height and normal under `position`; without terrain every point is off the map.
    pub fn sample_terrain(&self, position: Vec3) -> HeightSample {
        match &self.terrain {
            Some(terrain) => terrain.height_field.sample_height(position),
            None => HeightSample { height: position.y, normal: Vec3::Y, on_map: false },
        }
    }

    /// Drops `position` onto the ground, leaving it untouched off the map.
    pub fn place_on_terrain(&self, position: Vec3) -> Vec3 {
        Vec3::new(position.x, self.sample_terrain(position).height, position.z)
    }

    pub fn add_prop(&mut self, descriptor: PropDescriptor) -> PropId {
        PropId(self.props.insert(Prop::from_descriptor(descriptor)))
    }

    /// Level editor placement: default scale for the kind, standing on the terrain.
    pub fn plant_prop(&mut self, kind: PropKind, position: Vec3) -> PropId {
        let grounded = self.place_on_terrain(position);
        self.add_prop(PropDescriptor::new(kind, grounded))
    }

    pub fn remove_prop(&mut self, id: PropId) -> Option<Prop> {
        self.props.remove(id.0)
    }

    pub fn prop(&self, id: PropId) -> Option<&Prop> {
        self.props.get(id.0)
    }

    pub fn props(&self) -> impl Iterator<Item = (PropId, &Prop)> {
        self.props.iter().map(|(idx, prop)| (PropId(idx), prop))
    }

    pub fn load_props(&mut self, list: PropList) -> Vec<PropId> {
        list.props.into_iter().map(|descriptor| self.add_prop(descriptor)).collect()
    }

    pub fn prop_list(&self) -> PropList {
        PropList {
            props: self.props.iter().map(|(_, prop)| prop.descriptor.clone()).collect(),
        }
    }

    pub fn load_prop_file(&mut self, path: impl AsRef<Path>) -> Result<Vec<PropId>, WorldError> {
        let path = path.as_ref();
        let list: PropList = serde_json::from_str(&fs::read_to_string(path)?)?;
        debug!(path = %path.display(), props = list.props.len(), "prop list loaded");
        Ok(self.load_props(list))
    }

    pub fn save_prop_file(&self, path: impl AsRef<Path>) -> Result<(), WorldError> {
        let path = path.as_ref();
        ensure_parent_dir_exists(path)?;
        fs::write(path, serde_json::to_string_pretty(&self.prop_list())?)?;
        Ok(())
    }

    /// Spawns `model` standing on the terrain at `position`.
    pub fn spawn_actor(&mut self, model: AnimatedModel, position: Vec3, heading: f32) -> ActorId {
        let position = self.place_on_terrain(position);
        ActorId(self.actors.insert(Actor { position, heading, model }))
    }

    pub fn actor(&self, id: ActorId) -> Option<&Actor> {
        self.actors.get(id.0)
    }

    pub fn actor_mut(&mut self, id: ActorId) -> Option<&mut Actor> {
        self.actors.get_mut(id.0)
    }

    /// Moves an actor across the ground; returns false for a stale id.
    pub fn move_actor(&mut self, id: ActorId, position: Vec3) -> bool {
        let grounded = self.place_on_terrain(position);
        match self.actors.get_mut(id.0) {
            Some(actor) => {
                actor.position = grounded;
                true
            }
            None => false,
        }
    }

    /// Advances every playing actor by `dt` seconds with its own transform as skeleton root.
    /// All actors are advanced even if one fails; the first failure is returned.
    pub fn update(&mut self, dt: f32) -> Result<(), AnimationError> {
        let mut first_error = None;
        for (_, actor) in self.actors.iter_mut() {
            if !actor.model.controller().is_playing() {
                continue;
            }
            let root = actor.transform();
            if let Err(err) = actor.model.update(dt, root) {
                first_error.get_or_insert(err);
            }
        }
        first_error.map_or(Ok(()), Err)
    }
}
