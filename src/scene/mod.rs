//! `SceneManager`: per-map player position sets (`SPEC_FULL.md` §4.9).

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::RwLock;

use crate::role::dao::RoleId;

pub type MapId = u32;

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Position {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

#[derive(Debug, Error)]
pub enum SceneError {
    #[error("scene {0} does not exist")]
    NotFound(MapId),
}

struct Scene {
    players: RwLock<HashMap<RoleId, Position>>,
}

impl Scene {
    fn new() -> Self {
        Self {
            players: RwLock::new(HashMap::new()),
        }
    }
}

/// Tracks, for every map id, which roles are present and where. A role
/// appears in at most one scene at a time (`SPEC_FULL.md` §3 invariant).
///
/// Locking order (`SPEC_FULL.md` §5): any caller holding a `SessionManager`
/// lock may additionally take a scene lock, never the reverse. The manager
/// lock guards the `role -> map` index; each `Scene`'s own lock guards only
/// that scene's player set, so enumerating one scene never blocks another.
pub struct SceneManager {
    scenes: RwLock<HashMap<MapId, Arc<Scene>>>,
    role_scene: RwLock<HashMap<RoleId, MapId>>,
}

impl SceneManager {
    #[must_use]
    pub fn new() -> Self {
        Self {
            scenes: RwLock::new(HashMap::new()),
            role_scene: RwLock::new(HashMap::new()),
        }
    }

    /// Creates `map_id` if it doesn't already exist. The only lazy-creation
    /// entry point; `enter_scene` never creates a scene on its own
    /// (`SPEC_FULL.md` §4.9).
    pub async fn get_or_create_scene(&self, map_id: MapId) {
        if self.scenes.read().await.contains_key(&map_id) {
            return;
        }
        let mut scenes = self.scenes.write().await;
        scenes.entry(map_id).or_insert_with(|| Arc::new(Scene::new()));
    }

    /// Atomically leaves any prior scene and enters `map_id`. Fails if
    /// `map_id` was never created via `get_or_create_scene`
    /// (`SPEC_FULL.md` §4.9).
    pub async fn enter_scene(
        &self,
        role_id: RoleId,
        map_id: MapId,
        pos: Position,
    ) -> Result<(), SceneError> {
        let scene = self
            .scenes
            .read()
            .await
            .get(&map_id)
            .cloned()
            .ok_or(SceneError::NotFound(map_id))?;

        let mut role_scene = self.role_scene.write().await;

        if let Some(&prev_map) = role_scene.get(&role_id) {
            if prev_map != map_id {
                if let Some(prev_scene) = self.scenes.read().await.get(&prev_map) {
                    prev_scene.players.write().await.remove(&role_id);
                }
            }
        }

        scene.players.write().await.insert(role_id, pos);
        role_scene.insert(role_id, map_id);
        Ok(())
    }

    pub async fn leave_scene(&self, role_id: RoleId) {
        let mut role_scene = self.role_scene.write().await;
        if let Some(map_id) = role_scene.remove(&role_id) {
            if let Some(scene) = self.scenes.read().await.get(&map_id) {
                scene.players.write().await.remove(&role_id);
            }
        }
    }

    pub async fn get_role_scene(&self, role_id: RoleId) -> Option<MapId> {
        self.role_scene.read().await.get(&role_id).copied()
    }

    pub async fn get_players_in_scene(
        &self,
        map_id: MapId,
    ) -> Result<Vec<(RoleId, Position)>, SceneError> {
        let scene = self
            .scenes
            .read()
            .await
            .get(&map_id)
            .cloned()
            .ok_or(SceneError::NotFound(map_id))?;
        Ok(scene.players.read().await.iter().map(|(k, v)| (*k, *v)).collect())
    }

    #[must_use]
    pub fn unique_role_count(roles: &[RoleId]) -> usize {
        roles.iter().collect::<HashSet<_>>().len()
    }
}

impl Default for SceneManager {
    fn default() -> Self {
        Self::new()
    }
}
