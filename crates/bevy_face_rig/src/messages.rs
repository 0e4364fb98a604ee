use std::time::Duration;

use bevy::{ecs::message::Message, math::Vec2};

/// Starts or stops a speech turn.
#[derive(Message, Debug, Clone, PartialEq)]
pub enum TalkRequest {
    /// Speak a line; the turn length is estimated from the text.
    Say(String),
    /// Speak for a known duration, e.g. when the audio length is available.
    For(Duration),
    Stop,
}

/// Pointer position over the avatar view.
#[derive(Message, Debug, Clone, Copy, PartialEq)]
pub struct PointerMoved {
    /// Normalized to `[-1, 1]` on both axes, `+y` pointing down.
    pub position: Vec2,
    /// `false` once the pointer left the view.
    pub active: bool,
}

/// Switches to another avatar of the [`AvatarLibrary`](crate::loading::AvatarLibrary).
///
/// Unknown ids fall back to the first avatar of the catalog.
#[derive(Message, Debug, Clone, PartialEq, Eq)]
pub struct AvatarRequested {
    pub id: String,
}

impl AvatarRequested {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }
}
