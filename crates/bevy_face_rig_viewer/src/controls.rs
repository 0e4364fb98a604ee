use std::time::Duration;

use bevy::{
    prelude::*,
    window::{CursorLeft, CursorMoved, PrimaryWindow},
};
use bevy_face_rig::prelude::*;
use rand::Rng;

const DEMO_LINES: [&str; 5] = [
    "Hi! I'm your assistant. Ask me anything you like.",
    "Sure, I can help with that.",
    "That's a great question. Let me think about it for a second before I answer.",
    "Okay.",
    "I'm not sure I understood. Could you say that again, a little more slowly?",
];

/// Real speech rarely lasts exactly as long as estimated.
const SPEECH_LENGTH_SPREAD: std::ops::Range<f32> = 0.85..1.2;

const AVATAR_KEYS: [KeyCode; 9] = [
    KeyCode::Digit1,
    KeyCode::Digit2,
    KeyCode::Digit3,
    KeyCode::Digit4,
    KeyCode::Digit5,
    KeyCode::Digit6,
    KeyCode::Digit7,
    KeyCode::Digit8,
    KeyCode::Digit9,
];

/// Stand-in for a speech synthesizer: remembers when the current line ends.
#[derive(Resource, Default)]
pub struct SpeechPlayback {
    ends_at: Option<Duration>,
    next_line: usize,
}

pub fn track_pointer(
    mut cursor_moved: MessageReader<CursorMoved>,
    mut cursor_left: MessageReader<CursorLeft>,
    windows: Query<&Window, With<PrimaryWindow>>,
    mut pointer: MessageWriter<PointerMoved>,
) {
    let Ok(window) = windows.single() else {
        return;
    };
    let size = window.size();
    let has_area = size.x > 0. && size.y > 0.;
    if let Some(moved) = cursor_moved.read().last().filter(|_| has_area) {
        pointer.write(PointerMoved {
            position: moved.position / size * 2. - Vec2::ONE,
            active: true,
        });
    }
    if cursor_left.read().count() > 0 {
        pointer.write(PointerMoved {
            position: Vec2::ZERO,
            active: false,
        });
    }
}

pub fn simulate_speech(
    keys: Res<ButtonInput<KeyCode>>,
    time: Res<Time>,
    rig: Res<FaceRig>,
    mut playback: ResMut<SpeechPlayback>,
    mut talk: MessageWriter<TalkRequest>,
) {
    let now = time.elapsed();

    if keys.just_pressed(KeyCode::Space) {
        let line = DEMO_LINES[playback.next_line % DEMO_LINES.len()];
        playback.next_line += 1;
        let length = rig
            .speech_rate()
            .estimate(line)
            .mul_f32(rand::rng().random_range(SPEECH_LENGTH_SPREAD));
        playback.ends_at = Some(now + length);
        info!("Saying {line:?}");
        talk.write(TalkRequest::Say(line.to_string()));
        return;
    }

    let finished = playback.ends_at.is_some_and(|end| now >= end);
    if (finished || keys.just_pressed(KeyCode::KeyS)) && playback.ends_at.take().is_some() {
        talk.write(TalkRequest::Stop);
    }
}

pub fn switch_avatars(
    keys: Res<ButtonInput<KeyCode>>,
    library: Res<AvatarLibrary>,
    loader: Res<AvatarLoader>,
    mut avatars: MessageWriter<AvatarRequested>,
) {
    if keys.just_pressed(KeyCode::Tab) {
        let next = library.next_after(loader.current().unwrap_or_default());
        avatars.write(AvatarRequested::new(next.id.clone()));
    }
    for (key, entry) in AVATAR_KEYS.iter().zip(library.iter()) {
        if keys.just_pressed(*key) {
            avatars.write(AvatarRequested::new(entry.id.clone()));
        }
    }
}
