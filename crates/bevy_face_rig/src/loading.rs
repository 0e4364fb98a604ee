//! Avatar switching.
//!
//! A request tears the current model down right away and spawns the new scene hidden. Once the
//! scene instance is ready its [`LoadTicket`] is resolved against the [`AvatarSelection`]: the
//! latest request gets bound to the [`FaceRig`] and shown, anything older is despawned without
//! touching the rig.

use std::fmt;

use bevy::{
    asset::{AssetServer, LoadState, RecursiveDependencyLoadState},
    ecs::{entity::Entity, message::MessageReader, name::Name},
    gltf::GltfAssetLabel,
    log::prelude::*,
    prelude::{
        Commands, Component, Deref, Query, ReflectResource, Res, ResMut, Resource, Visibility,
        With, Without,
    },
    reflect::Reflect,
    scene::{SceneInstance, SceneRoot, SceneSpawner},
    transform::components::Transform,
};
use bevy_face_rig_core::{
    catalog::AvatarCatalog,
    roles::JointRole,
    selection::{AvatarSelection, LoadOutcome, LoadTicket},
};

use crate::{
    face_rig::{FaceRig, RestPose},
    hierarchy::RigHierarchy,
    messages::AvatarRequested,
};

/// Avatars available to [`AvatarRequested`].
#[derive(Resource, Debug, Clone, Deref)]
pub struct AvatarLibrary(pub AvatarCatalog);

/// Human readable load state of the avatar, for status displays.
#[derive(Resource, Debug, Clone, Default, PartialEq, Eq, Reflect)]
#[reflect(Resource)]
pub enum AvatarStatus {
    #[default]
    Empty,
    Loading(String),
    Ready(String),
    Failed(String),
}

impl fmt::Display for AvatarStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "No avatar"),
            Self::Loading(label) => write!(f, "Loading {label}..."),
            Self::Ready(label) => write!(f, "{label}"),
            Self::Failed(label) => write!(f, "Could not load {label}"),
        }
    }
}

/// Which avatar is wanted and which entity currently shows it.
#[derive(Resource, Debug, Default)]
pub struct AvatarLoader {
    selection: AvatarSelection<String>,
    model: Option<Entity>,
}

impl AvatarLoader {
    pub fn current(&self) -> Option<&str> {
        self.selection.current().map(String::as_str)
    }
}

/// A scene spawned for an avatar request that has not finished loading.
#[derive(Component, Debug)]
pub struct AvatarLoad {
    ticket: LoadTicket<String>,
    label: String,
}

/// Scene root of the avatar the rig is bound to.
#[derive(Component, Debug, Clone, PartialEq, Eq, Reflect)]
pub struct FaceRigModel {
    pub avatar: String,
}

/// Starts loading the most recently requested avatar.
pub fn request_avatars(
    mut commands: Commands,
    mut requests: MessageReader<AvatarRequested>,
    library: Option<Res<AvatarLibrary>>,
    asset_server: Res<AssetServer>,
    mut loader: ResMut<AvatarLoader>,
    mut rig: ResMut<FaceRig>,
    mut status: ResMut<AvatarStatus>,
) {
    let Some(request) = requests.read().last() else {
        return;
    };
    let Some(library) = library else {
        warn!("Avatar {:?} requested without an AvatarLibrary", request.id);
        return;
    };

    let entry = library.resolve(&request.id);
    if entry.id != request.id {
        warn!(
            "Unknown avatar {:?}, falling back to {:?}",
            request.id, entry.id
        );
    }
    let Some(ticket) = loader.selection.request(entry.id.clone()) else {
        debug!("Avatar {:?} is already shown", entry.id);
        return;
    };

    if let Some(model) = loader.model.take() {
        commands.entity(model).despawn();
    }
    rig.on_model_replaced();

    let path = library.asset_path(entry);
    info!("Loading avatar {:?} from {path}", entry.id);
    commands.spawn((
        Name::new(format!("Avatar {}", entry.label)),
        SceneRoot(asset_server.load(GltfAssetLabel::Scene(0).from_asset(path))),
        Visibility::Hidden,
        AvatarLoad {
            ticket,
            label: entry.label.clone(),
        },
    ));
    *status = AvatarStatus::Loading(entry.label.clone());
}

/// Marks an [`AvatarLoad`] whose scene finished loading, successfully or not.
#[derive(Component, Debug, Clone, Copy, PartialEq, Eq)]
pub struct AvatarLoadFinished {
    pub succeeded: bool,
}

/// Watches pending avatar scenes until they are spawned or fail to load.
pub fn poll_avatar_loads(
    mut commands: Commands,
    asset_server: Res<AssetServer>,
    scene_spawner: Res<SceneSpawner>,
    loads: Query<
        (Entity, &SceneRoot, Option<&SceneInstance>),
        (With<AvatarLoad>, Without<AvatarLoadFinished>),
    >,
) {
    for (entity, scene, instance) in &loads {
        let failed = matches!(asset_server.get_load_state(&scene.0), Some(LoadState::Failed(_)))
            || matches!(
                asset_server.get_recursive_dependency_load_state(&scene.0),
                Some(RecursiveDependencyLoadState::Failed(_))
            );
        let ready = instance.is_some_and(|instance| scene_spawner.instance_is_ready(**instance));
        if failed || ready {
            commands
                .entity(entity)
                .insert(AvatarLoadFinished { succeeded: !failed });
        }
    }
}

/// Binds the rig to the avatar whose scene became ready and disposes of stale or failed loads.
pub fn finish_avatar_loads(
    mut commands: Commands,
    loads: Query<(Entity, &AvatarLoad, &AvatarLoadFinished)>,
    transforms: Query<&Transform>,
    hierarchy: RigHierarchy,
    mut loader: ResMut<AvatarLoader>,
    mut rig: ResMut<FaceRig>,
    mut status: ResMut<AvatarStatus>,
) {
    for (entity, load, finished) in &loads {
        match loader.selection.resolve(&load.ticket, finished.succeeded) {
            LoadOutcome::Stale => {
                warn!("Discarding stale load of avatar {:?}", load.ticket.key);
                commands.entity(entity).despawn();
            }
            LoadOutcome::Failed => {
                error!("Failed to load avatar {:?}", load.ticket.key);
                commands.entity(entity).despawn();
                *status = AvatarStatus::Failed(load.label.clone());
            }
            LoadOutcome::Current => {
                let tree = hierarchy.build(entity);
                let roles = rig.on_model_loaded(&tree);
                let driven: Vec<Entity> = std::iter::once(entity)
                    .chain(
                        JointRole::ALL
                            .iter()
                            .filter_map(|&role| roles.joint(role))
                            .map(|handle| handle.target),
                    )
                    .collect();
                for target in driven {
                    if let Ok(transform) = transforms.get(target) {
                        commands.entity(target).insert(RestPose(*transform));
                    }
                }

                commands
                    .entity(entity)
                    .remove::<(AvatarLoad, AvatarLoadFinished)>()
                    .insert((
                        Visibility::Inherited,
                        FaceRigModel {
                            avatar: load.ticket.key.clone(),
                        },
                    ));
                loader.model = Some(entity);
                info!("Avatar {:?} ready", load.ticket.key);
                *status = AvatarStatus::Ready(load.label.clone());
            }
        }
    }
}
