mod camera;
mod controls;

use std::path::PathBuf;

use bevy::{prelude::*, window::PrimaryWindow};
use bevy_face_rig::prelude::*;
use clap::Parser;

#[derive(Parser)]
struct Cli {
    /// Folder holding the avatar catalog and models.
    #[arg(short, long, default_value = concat!(env!("CARGO_MANIFEST_DIR"), "/assets"))]
    asset_source: PathBuf,
    /// Avatar catalog, relative to the asset folder.
    #[arg(short, long, default_value = "catalog.ron")]
    catalog: PathBuf,
    /// Face rig tuning (`*.facerig.ron`), relative to the asset folder.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Avatar to show first. Defaults to the catalog's default avatar.
    #[arg(long)]
    avatar: Option<String>,
    /// Seed for blink and glance timing.
    #[arg(long)]
    seed: Option<u64>,
}

#[derive(Resource)]
struct StartingAvatar(String);

fn main() -> AppExit {
    let cli = Cli::parse();

    let asset_root = match std::fs::canonicalize(&cli.asset_source) {
        Ok(path) => path,
        Err(err) => {
            eprintln!("Cannot open asset folder {:?}: {err}", cli.asset_source);
            return AppExit::error();
        }
    };
    let catalog = match AvatarCatalog::load(asset_root.join(&cli.catalog)) {
        Ok(catalog) => catalog,
        Err(err) => {
            eprintln!("Cannot load avatar catalog {:?}: {err}", cli.catalog);
            return AppExit::error();
        }
    };
    let mut config = match &cli.config {
        Some(path) => match FaceRigConfig::load(asset_root.join(path)) {
            Ok(config) => config,
            Err(err) => {
                eprintln!("Cannot load face rig config {path:?}: {err}");
                return AppExit::error();
            }
        },
        None => FaceRigConfig::default(),
    };
    if cli.seed.is_some() {
        config.seed = cli.seed;
    }
    let first = cli
        .avatar
        .unwrap_or_else(|| catalog.default_entry().id.clone());

    let mut app = App::new();

    app //
        .add_plugins(
            DefaultPlugins
                .set(AssetPlugin {
                    file_path: asset_root.to_string_lossy().into(),
                    ..Default::default()
                })
                .set(WindowPlugin {
                    primary_window: Some(Window {
                        title: "Face rig".into(),
                        ..Default::default()
                    }),
                    ..Default::default()
                }),
        )
        .add_plugins(FaceRigPlugin::with_config(config))
        .insert_resource(AvatarLibrary(catalog))
        .insert_resource(StartingAvatar(first))
        .init_resource::<controls::SpeechPlayback>()
        .add_systems(Startup, (setup_scene, request_starting_avatar))
        .add_systems(
            Update,
            (
                controls::track_pointer,
                controls::simulate_speech,
                controls::switch_avatars,
            )
                .before(FaceRigSet::Signals),
        )
        .add_systems(Update, (camera::frame_new_avatar, show_status));

    app.run()
}

fn setup_scene(mut commands: Commands) {
    commands.spawn((
        Camera3d::default(),
        Transform::from_xyz(0., 1.5, 0.7).looking_at(Vec3::new(0., 1.5, 0.), Vec3::Y),
        camera::AvatarCamera,
    ));
    commands.spawn((
        DirectionalLight {
            illuminance: 8_000.,
            ..Default::default()
        },
        Transform::from_xyz(1., 2., 2.).looking_at(Vec3::ZERO, Vec3::Y),
    ));
    commands.spawn((
        DirectionalLight {
            illuminance: 2_500.,
            ..Default::default()
        },
        Transform::from_xyz(-2., 1., 1.).looking_at(Vec3::ZERO, Vec3::Y),
    ));
}

fn request_starting_avatar(
    starting: Res<StartingAvatar>,
    mut avatars: MessageWriter<AvatarRequested>,
) {
    avatars.write(AvatarRequested::new(starting.0.clone()));
}

/// Mirrors the avatar status into the window title.
fn show_status(
    status: Res<AvatarStatus>,
    mut windows: Query<&mut Window, With<PrimaryWindow>>,
) {
    if !status.is_changed() {
        return;
    }
    for mut window in &mut windows {
        window.title = format!("Face rig - {}", *status);
    }
}
