use std::{fmt::Debug, hash::Hash};

/// A node of a character hierarchy.
pub trait RigNode {
    /// Identity of the node in its host representation (an `Entity`, an index, ...).
    type Id: Copy + Eq + Hash + Debug;

    fn id(&self) -> Self::Id;

    fn name(&self) -> &str;

    /// Whether the node is a skeletal joint whose local rotation may be driven.
    fn is_joint(&self) -> bool;

    /// Names of the blend channels carried by this node, indexed by slot.
    ///
    /// `None` if the node carries no blend channels at all.
    fn channel_names(&self) -> Option<&[String]>;

    fn children(&self) -> impl Iterator<Item = &Self>;
}

/// Visits `root` and all its descendants depth-first, parents before children, siblings in
/// order.
pub fn walk_depth_first<'a, N: RigNode>(root: &'a N, mut visit: impl FnMut(&'a N)) {
    let mut pending = vec![root];
    while let Some(node) = pending.pop() {
        visit(node);
        let first = pending.len();
        pending.extend(node.children());
        pending[first..].reverse();
    }
}

/// Everything discovery cares about, collected in one walk.
#[derive(Debug)]
pub struct RigInventory<'a, Id> {
    /// Joints in traversal order.
    pub joints: Vec<(Id, &'a str)>,
    /// Nodes carrying blend channels, in traversal order.
    pub channel_carriers: Vec<(Id, &'a [String])>,
}

impl<'a, Id: Copy> RigInventory<'a, Id> {
    pub fn collect<N: RigNode<Id = Id>>(root: &'a N) -> Self {
        let mut inventory = Self {
            joints: Vec::new(),
            channel_carriers: Vec::new(),
        };
        walk_depth_first(root, |node: &'a N| {
            if node.is_joint() {
                inventory.joints.push((node.id(), node.name()));
            }
            if let Some(names) = node.channel_names() {
                inventory.channel_carriers.push((node.id(), names));
            }
        });
        inventory
    }
}

/// Owned character hierarchy.
#[derive(Debug, Clone, PartialEq)]
pub struct RigTree<Id> {
    pub id: Id,
    pub name: String,
    pub joint: bool,
    pub channels: Option<Vec<String>>,
    pub children: Vec<RigTree<Id>>,
}

impl<Id> RigTree<Id> {
    pub fn node(id: Id, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            joint: false,
            channels: None,
            children: Vec::new(),
        }
    }

    pub fn joint(id: Id, name: impl Into<String>) -> Self {
        Self {
            joint: true,
            ..Self::node(id, name)
        }
    }

    pub fn with_channels<S: Into<String>>(mut self, names: impl IntoIterator<Item = S>) -> Self {
        self.channels = Some(names.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_child(mut self, child: RigTree<Id>) -> Self {
        self.children.push(child);
        self
    }

    pub fn with_children(mut self, children: impl IntoIterator<Item = RigTree<Id>>) -> Self {
        self.children.extend(children);
        self
    }

    /// Number of nodes in the tree, including the root.
    pub fn node_count(&self) -> usize {
        1 + self.children.iter().map(RigTree::node_count).sum::<usize>()
    }
}

impl<Id: Copy + Eq + Hash + Debug> RigNode for RigTree<Id> {
    type Id = Id;

    fn id(&self) -> Id {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn is_joint(&self) -> bool {
        self.joint
    }

    fn channel_names(&self) -> Option<&[String]> {
        self.channels.as_deref()
    }

    fn children(&self) -> impl Iterator<Item = &Self> {
        self.children.iter()
    }
}
