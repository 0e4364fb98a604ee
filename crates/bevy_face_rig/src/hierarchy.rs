use std::collections::HashSet;

use bevy::{
    asset::Assets,
    ecs::{entity::Entity, hierarchy::Children, name::Name, system::SystemParam},
    mesh::{Mesh, morph::MorphWeights, skinning::SkinnedMesh},
    prelude::{Query, Res},
};
use bevy_face_rig_core::rig::RigTree;

/// Read access to a spawned character hierarchy, used to build a [`RigTree`] for discovery.
///
/// A node is a joint if any skinned mesh under the same root lists it as a joint. A node
/// carries blend channels if it has [`MorphWeights`] whose mesh names its morph targets.
#[derive(SystemParam)]
pub struct RigHierarchy<'w, 's> {
    nodes: Query<
        'w,
        's,
        (
            Option<&'static Name>,
            Option<&'static Children>,
            Option<&'static MorphWeights>,
        ),
    >,
    skins: Query<'w, 's, &'static SkinnedMesh>,
    descendants: Query<'w, 's, &'static Children>,
    meshes: Res<'w, Assets<Mesh>>,
}

impl RigHierarchy<'_, '_> {
    pub fn build(&self, root: Entity) -> RigTree<Entity> {
        let joints: HashSet<Entity> = std::iter::once(root)
            .chain(self.descendants.iter_descendants(root))
            .filter_map(|entity| self.skins.get(entity).ok())
            .flat_map(|skin| skin.joints.iter().copied())
            .collect();
        self.node(root, &joints)
    }

    fn node(&self, entity: Entity, joints: &HashSet<Entity>) -> RigTree<Entity> {
        let Ok((name, children, weights)) = self.nodes.get(entity) else {
            return RigTree::node(entity, "");
        };
        let mut node = RigTree::node(entity, name.map(Name::as_str).unwrap_or_default());
        node.joint = joints.contains(&entity);
        node.channels = weights.and_then(|weights| self.channel_names(weights));
        if let Some(children) = children {
            node.children = children
                .into_iter()
                .map(|&child| self.node(child, joints))
                .collect();
        }
        node
    }

    fn channel_names(&self, weights: &MorphWeights) -> Option<Vec<String>> {
        let mesh = self.meshes.get(weights.first_mesh()?)?;
        mesh.morph_target_names().map(<[String]>::to_vec)
    }
}

#[cfg(test)]
mod tests {
    use bevy::{
        asset::RenderAssetUsages,
        ecs::{hierarchy::ChildOf, system::RunSystemOnce, world::World},
        mesh::PrimitiveTopology,
        prelude::Handle,
    };
    use bevy_face_rig_core::{
        rig::RigNode,
        roles::{ChannelHandle, ChannelRole, JointHandle, JointPatterns, JointRole, RoleMap},
    };

    use super::*;

    #[test]
    fn builds_a_discoverable_tree_from_a_spawned_character() {
        let mut world = World::new();
        world.init_resource::<Assets<Mesh>>();
        let face_mesh = world.resource_mut::<Assets<Mesh>>().add(
            Mesh::new(PrimitiveTopology::TriangleList, RenderAssetUsages::default())
                .with_morph_target_names(vec!["browInnerUp".into(), "jawOpen".into()]),
        );

        let root = world.spawn(Name::new("Avatar")).id();
        let hips = world.spawn((Name::new("Hips"), ChildOf(root))).id();
        let chest = world.spawn((Name::new("Spine2"), ChildOf(hips))).id();
        let face = world
            .spawn((
                Name::new("Wolf3D_Head"),
                MorphWeights::new(vec![0.; 2], Some(face_mesh)).unwrap(),
                ChildOf(root),
            ))
            .id();
        world.spawn((
            SkinnedMesh {
                inverse_bindposes: Handle::default(),
                joints: vec![hips, chest],
            },
            ChildOf(face),
        ));

        let tree = world
            .run_system_once(move |hierarchy: RigHierarchy| hierarchy.build(root))
            .unwrap();
        assert_eq!(tree.node_count(), 5);
        assert_eq!(tree.id(), root);

        let map = RoleMap::discover(&tree, &JointPatterns::default());
        assert_eq!(
            map.channels(ChannelRole::Mouth),
            &[ChannelHandle {
                target: face,
                index: 1
            }]
        );
        assert_eq!(map.channels(ChannelRole::Brow)[0].index, 0);
        assert_eq!(
            map.joint(JointRole::Chest),
            Some(&JointHandle { target: chest })
        );
    }

    #[test]
    fn unnamed_morph_targets_are_not_channels() {
        let mut world = World::new();
        world.init_resource::<Assets<Mesh>>();
        let mesh = world.resource_mut::<Assets<Mesh>>().add(Mesh::new(
            PrimitiveTopology::TriangleList,
            RenderAssetUsages::default(),
        ));
        let root = world
            .spawn((Name::new("Blob"), MorphWeights::new(vec![0.; 3], Some(mesh)).unwrap()))
            .id();

        let tree = world
            .run_system_once(move |hierarchy: RigHierarchy| hierarchy.build(root))
            .unwrap();
        assert_eq!(tree.channel_names(), None);
        assert!(!tree.is_joint());
    }
}
