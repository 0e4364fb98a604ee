use std::fmt::Debug;

use bevy::{log::prelude::*, reflect::Reflect};
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};

use crate::{
    errors::{ConfigError, ConfigResult},
    rig::{RigInventory, RigNode},
};

/// Blend-channel roles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Reflect)]
pub enum ChannelRole {
    Mouth,
    Eye,
    Smile,
    Brow,
}

impl ChannelRole {
    pub const ALL: [Self; 4] = [Self::Mouth, Self::Eye, Self::Smile, Self::Brow];

    pub fn label(self) -> &'static str {
        match self {
            Self::Mouth => "mouth",
            Self::Eye => "eye",
            Self::Smile => "smile",
            Self::Brow => "brow",
        }
    }
}

/// How many candidates of a role may be registered on a single mesh.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Reflect)]
pub enum MatchMode {
    /// Only the first candidate found drives the role on that mesh.
    Exclusive,
    /// Every candidate found is driven together.
    Additive,
}

/// Ordered candidate names of one role.
#[derive(Debug, Clone, Copy)]
pub struct RoleCandidates {
    pub role: ChannelRole,
    pub mode: MatchMode,
    /// Earlier names take priority over later ones.
    pub names: &'static [&'static str],
}

/// Candidate channel names for every role, covering ARKit, Oculus viseme and a few common
/// hand-made rigging conventions. Order matters for exclusive roles.
pub const CHANNEL_CANDIDATES: [RoleCandidates; 4] = [
    RoleCandidates {
        role: ChannelRole::Mouth,
        mode: MatchMode::Exclusive,
        names: &[
            "jawOpen",
            "mouthOpen",
            "viseme_aa",
            "viseme_OH",
            "MouthOpen",
            "v_aa",
        ],
    },
    RoleCandidates {
        role: ChannelRole::Eye,
        mode: MatchMode::Additive,
        names: &[
            "eyeBlinkLeft",
            "eyeBlinkRight",
            "eyesClosed",
            "blink",
            "EyeBlink_L",
            "EyeBlink_R",
        ],
    },
    RoleCandidates {
        role: ChannelRole::Smile,
        mode: MatchMode::Exclusive,
        names: &[
            "smile",
            "smileWide",
            "mouthSmile",
            "mouthSmileLeft",
            "mouthSmileBig",
            "mouthSmileRight",
        ],
    },
    RoleCandidates {
        role: ChannelRole::Brow,
        mode: MatchMode::Exclusive,
        names: &["browInnerUp", "browUp", "BrowsUp", "browRaise"],
    },
];

/// Joint roles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Reflect)]
pub enum JointRole {
    Chest,
    ShoulderLeft,
    ShoulderRight,
}

impl JointRole {
    pub const ALL: [Self; 3] = [Self::Chest, Self::ShoulderLeft, Self::ShoulderRight];

    pub fn label(self) -> &'static str {
        match self {
            Self::Chest => "chest",
            Self::ShoulderLeft => "shoulder_left",
            Self::ShoulderRight => "shoulder_right",
        }
    }
}

/// One blend-channel slot on one node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChannelHandle<Id> {
    pub target: Id,
    pub index: usize,
}

/// One joint whose local rotation is driven.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct JointHandle<Id> {
    pub target: Id,
}

/// Joint name patterns as written in configuration files.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Reflect, Serialize, Deserialize)]
#[serde(default)]
pub struct JointPatternsSerial {
    pub chest: String,
    pub shoulder_left: String,
    pub shoulder_right: String,
}

impl Default for JointPatternsSerial {
    fn default() -> Self {
        Self {
            chest: "chest|spine2|upperchest".into(),
            shoulder_left: "shoulder.*(L|Left)".into(),
            shoulder_right: "shoulder.*(R|Right)".into(),
        }
    }
}

/// Compiled, case-insensitive joint name patterns.
#[derive(Debug, Clone)]
pub struct JointPatterns {
    chest: Regex,
    shoulder_left: Regex,
    shoulder_right: Regex,
}

impl TryFrom<&JointPatternsSerial> for JointPatterns {
    type Error = ConfigError;

    fn try_from(value: &JointPatternsSerial) -> ConfigResult<Self> {
        Ok(Self {
            chest: compile(JointRole::Chest, &value.chest)?,
            shoulder_left: compile(JointRole::ShoulderLeft, &value.shoulder_left)?,
            shoulder_right: compile(JointRole::ShoulderRight, &value.shoulder_right)?,
        })
    }
}

fn compile(role: JointRole, pattern: &str) -> ConfigResult<Regex> {
    RegexBuilder::new(pattern)
        .case_insensitive(true)
        .build()
        .map_err(|source| ConfigError::JointPattern {
            role: role.label(),
            source,
        })
}

impl Default for JointPatterns {
    fn default() -> Self {
        Self::try_from(&JointPatternsSerial::default())
            .expect("default joint patterns are valid regexes")
    }
}

impl JointPatterns {
    pub fn matches(&self, role: JointRole, name: &str) -> bool {
        let regex = match role {
            JointRole::Chest => &self.chest,
            JointRole::ShoulderLeft => &self.shoulder_left,
            JointRole::ShoulderRight => &self.shoulder_right,
        };
        regex.is_match(name)
    }
}

/// Channels and joints of one loaded asset, grouped by role.
///
/// Built once per load and replaced wholesale on avatar switch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleMap<Id> {
    mouth: Vec<ChannelHandle<Id>>,
    eye: Vec<ChannelHandle<Id>>,
    smile: Vec<ChannelHandle<Id>>,
    brow: Vec<ChannelHandle<Id>>,
    chest: Option<JointHandle<Id>>,
    shoulder_left: Option<JointHandle<Id>>,
    shoulder_right: Option<JointHandle<Id>>,
}

impl<Id> Default for RoleMap<Id> {
    fn default() -> Self {
        Self {
            mouth: Vec::new(),
            eye: Vec::new(),
            smile: Vec::new(),
            brow: Vec::new(),
            chest: None,
            shoulder_left: None,
            shoulder_right: None,
        }
    }
}

impl<Id: Copy + Eq + Debug> RoleMap<Id> {
    /// Discovers the roles of the hierarchy under `root` using the default candidate table.
    pub fn discover<N: RigNode<Id = Id>>(root: &N, patterns: &JointPatterns) -> Self {
        let inventory = RigInventory::collect(root);
        let map = Self::resolve(&inventory, &CHANNEL_CANDIDATES, patterns);
        map.log_summary();
        map
    }

    /// Matches an already collected inventory against a candidate table.
    pub fn resolve(
        inventory: &RigInventory<'_, Id>,
        candidates: &[RoleCandidates],
        patterns: &JointPatterns,
    ) -> Self {
        let mut map = Self::default();

        for &(target, names) in &inventory.channel_carriers {
            for entry in candidates {
                let slots = map.channels_mut(entry.role);
                for candidate in entry.names {
                    let Some(index) = names.iter().position(|name| name == candidate) else {
                        continue;
                    };
                    slots.push(ChannelHandle { target, index });
                    if entry.mode == MatchMode::Exclusive {
                        break;
                    }
                }
            }
        }

        for &(target, name) in &inventory.joints {
            for role in JointRole::ALL {
                let slot = map.joint_mut(role);
                if slot.is_none() && patterns.matches(role, name) {
                    *slot = Some(JointHandle { target });
                }
            }
        }

        map
    }

    pub fn channels(&self, role: ChannelRole) -> &[ChannelHandle<Id>] {
        match role {
            ChannelRole::Mouth => &self.mouth,
            ChannelRole::Eye => &self.eye,
            ChannelRole::Smile => &self.smile,
            ChannelRole::Brow => &self.brow,
        }
    }

    fn channels_mut(&mut self, role: ChannelRole) -> &mut Vec<ChannelHandle<Id>> {
        match role {
            ChannelRole::Mouth => &mut self.mouth,
            ChannelRole::Eye => &mut self.eye,
            ChannelRole::Smile => &mut self.smile,
            ChannelRole::Brow => &mut self.brow,
        }
    }

    pub fn joint(&self, role: JointRole) -> Option<&JointHandle<Id>> {
        match role {
            JointRole::Chest => self.chest.as_ref(),
            JointRole::ShoulderLeft => self.shoulder_left.as_ref(),
            JointRole::ShoulderRight => self.shoulder_right.as_ref(),
        }
    }

    fn joint_mut(&mut self, role: JointRole) -> &mut Option<JointHandle<Id>> {
        match role {
            JointRole::Chest => &mut self.chest,
            JointRole::ShoulderLeft => &mut self.shoulder_left,
            JointRole::ShoulderRight => &mut self.shoulder_right,
        }
    }

    /// Both shoulders, only if the asset has both.
    pub fn shoulders(&self) -> Option<(&JointHandle<Id>, &JointHandle<Id>)> {
        Some((self.shoulder_left.as_ref()?, self.shoulder_right.as_ref()?))
    }

    /// True if no role matched anything.
    pub fn is_empty(&self) -> bool {
        ChannelRole::ALL
            .iter()
            .all(|&role| self.channels(role).is_empty())
            && JointRole::ALL.iter().all(|&role| self.joint(role).is_none())
    }

    fn log_summary(&self) {
        info!(
            "Face rig discovered: mouth={} eye={} smile={} brow={} chest={} shoulders={}/{}",
            self.mouth.len(),
            self.eye.len(),
            self.smile.len(),
            self.brow.len(),
            self.chest.is_some(),
            self.shoulder_left.is_some(),
            self.shoulder_right.is_some(),
        );
        for role in ChannelRole::ALL {
            if self.channels(role).is_empty() {
                debug!("No {} channel found; the role will not be driven", role.label());
            }
        }
        for role in JointRole::ALL {
            if self.joint(role).is_none() {
                debug!("No {} joint found; the role will not be driven", role.label());
            }
        }
    }
}
