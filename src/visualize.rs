//! Bevy viewer: plays a recording next to a second rig and colours each body part
//! by how well it lines up.

use bevy_panorbit_camera::{PanOrbitCamera, PanOrbitCameraPlugin};
use bevy::prelude::*;
use crate::config::{AlignmentSettings, SkeletonConfig};
use crate::parse::ParsedDataset;
use crate::rig::{MarkerSource, RecordedRig};
use crate::session::{AlignmentSession, FeedbackSink, PlaybackControl, TickReport};
use crate::store::{Presentation, ViewOption};
use crate::types::*;
use std::collections::HashMap;
use std::sync::Arc;

///////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

/// Visual points for the store's markers, already scaled to scene units.
#[derive(Debug, Default)]
pub struct GizmoScene {
    points: HashMap<PointHandle, ScenePoint>,
}

#[derive(Debug)]
struct ScenePoint {
    marker: String,
    position: Option<Vec3>,
    visible: bool,
}

impl Presentation for GizmoScene {
    fn create_point(&mut self, handle: PointHandle, marker: &str) {
        self.points.insert(
            handle,
            ScenePoint {
                marker: marker.to_string(),
                position: None,
                visible: false,
            },
        );
    }

    fn destroy_point(&mut self, handle: PointHandle) {
        self.points.remove(&handle);
    }

    fn update_point(&mut self, handle: PointHandle, position: Position, visible: bool) {
        if let Some(point) = self.points.get_mut(&handle) {
            point.position = Some(to_vec3(position));
            point.visible = visible;
        }
    }
}

/// Last colour and correction reported per group.
#[derive(Debug, Default)]
pub struct GroupFeedback {
    colors: HashMap<String, Color>,
    corrections: HashMap<String, Vec3>,
}

impl FeedbackSink for GroupFeedback {
    fn set_group_color(&mut self, group: &str, color: Rgba) {
        self.colors.insert(group.to_string(), to_color(color));
    }

    fn set_group_correction(&mut self, group: &str, correction: Option<Position>) {
        match correction {
            Some(correction) => self.corrections.insert(group.to_string(), to_vec3(correction)),
            None => self.corrections.remove(group),
        };
    }
}

/// Control playback clock; the gate is the only thing that flips `playing`.
#[derive(Debug)]
pub struct ControlClock {
    pub playing: bool,
    pub real_frame: f64,
}

impl PlaybackControl for ControlClock {
    fn set_playing(&mut self, playing: bool) {
        self.playing = playing;
    }
}

///////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

// Load listeners aren't `Send`, so this lives in a non-send resource.
pub struct AppGlobalData {
    pub session: AlignmentSession<RecordedRig>,
    pub scene: GizmoScene,
    pub feedback: GroupFeedback,
    pub clock: ControlClock,
    pub running: bool,
    pub user_real_frame: f64,
    pub fps: f64,
    pub last_report: Option<TickReport>,
    pub debug_text: bool,
}

///////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

pub fn visualize_alignment(
    control: ParsedDataset,
    user: ParsedDataset,
    skeleton: SkeletonConfig,
    settings: AlignmentSettings,
    fps: f64,
) {
    let user = RecordedRig::new(Arc::new(user), 1);
    let mut session = AlignmentSession::new(skeleton, settings, user);
    let mut scene = GizmoScene::default();
    session.load_dataset(control, &mut scene);
    session.set_sync_enabled(true);

    App::new()
        .insert_non_send_resource(AppGlobalData {
            session,
            scene,
            feedback: GroupFeedback::default(),
            clock: ControlClock {
                playing: true,
                real_frame: 0.0,
            },
            running: true,
            user_real_frame: 0.0,
            fps,
            last_report: None,
            debug_text: false,
        })
        .add_plugins(DefaultPlugins)
        .add_plugins(PanOrbitCameraPlugin)
        .add_systems(Startup, setup)
        .add_systems(Update, (update_main, draw_rig, update_debug_text).chain())
        .run();
}

///////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

#[derive(Component)]
struct DebugText;

///////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

fn setup(
    mut commands: Commands,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
) {
    //// Orbit camera
    commands.spawn((
        Camera3dBundle {
            transform: Transform::from_xyz(0., 1.5, 6.).looking_at(Vec3::ZERO, Vec3::Y),
            ..default()
        },
        PanOrbitCamera::default(),
    ));
    // floor
    commands.spawn(PbrBundle {
        mesh: meshes.add(Plane3d::default().mesh().size(5.0, 5.0)),
        material: materials.add(StandardMaterial {
            base_color: Color::rgba(1., 1., 1., 0.5),
            alpha_mode: AlphaMode::Blend,
            double_sided: true,
            cull_mode: None,
            ..default()
        }),
        ..default()
    });

    // instructions
    commands.spawn(
        TextBundle::from_section(
            "Press 'Space' to play or stop\n\
            Press 'Left' or 'Right' to step the recording\n\
            Press 'G' to toggle playback sync\n\
            Press 'V' to switch between humanoid and exoskeleton view\n\
            Press 'D' to toggle debug text\n",
            TextStyle {
                font_size: 15.,
                ..default()
            },
        )
        .with_style(Style {
            position_type: PositionType::Absolute,
            bottom: Val::Px(12.0),
            right: Val::Px(12.0),
            ..default()
        }),
    );

    commands.spawn((
        TextBundle::from_section(
            "",
            TextStyle {
                font_size: 17.,
                color: Color::rgba(1.0, 1.0, 1.0, 0.5),
                ..default()
            },
        )
        .with_style(Style {
            position_type: PositionType::Absolute,
            top: Val::Px(12.0),
            left: Val::Px(12.0),
            ..default()
        }),
        DebugText,
    ));
}

///////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

fn to_vec3(position: Position) -> Vec3 {
    Vec3::new(position.x as f32, position.y as f32, position.z as f32)
}

fn to_color(color: Rgba) -> Color {
    Color::rgba(color.x, color.y, color.z, color.w)
}

/// Maps a running clock onto 1-based frames, wrapping at `frame_count`.
fn wrap_frame(real_frame: f64, frame_count: Frame) -> Frame {
    if frame_count == 0 {
        return 1;
    }
    real_frame.rem_euclid(frame_count as f64).floor() as Frame + 1
}

fn update_main(
    keyboard: Res<ButtonInput<KeyCode>>,
    time: Res<Time>,
    mut appdata: NonSendMut<AppGlobalData>,
) {
    let app = &mut *appdata;

    if keyboard.just_released(KeyCode::Space) {
        app.running = !app.running;
    }
    if keyboard.just_released(KeyCode::KeyG) {
        let enabled = !app.session.gate().is_enabled();
        app.session.set_sync_enabled(enabled);
        // a stopped recording would otherwise stay stopped with sync off
        app.clock.playing = true;
    }
    if keyboard.just_released(KeyCode::KeyV) {
        let view = match app.session.store().view_option() {
            ViewOption::Humanoid => ViewOption::Exoskeleton,
            ViewOption::Exoskeleton => ViewOption::Humanoid,
        };
        app.session.set_view_option(view);
    }
    if keyboard.just_released(KeyCode::KeyD) {
        app.debug_text = !app.debug_text;
    }

    if keyboard.just_released(KeyCode::ArrowRight) {
        app.running = false;
        app.clock.real_frame += 1.0;
    }
    if keyboard.just_released(KeyCode::ArrowLeft) {
        app.running = false;
        app.clock.real_frame -= 1.0;
    }

    if app.running {
        let step = time.delta_seconds_f64() * app.fps;
        app.user_real_frame += step;
        if app.clock.playing {
            app.clock.real_frame += step;
        }
    }

    let user_frames = app.session.user().dataset().frame_count();
    let user_frame = wrap_frame(app.user_real_frame, user_frames);
    app.session.user_mut().seek(user_frame);

    let frame = wrap_frame(app.clock.real_frame, app.session.store().frame_count());
    let report = app
        .session
        .on_frame_advance(frame, &mut app.scene, &mut app.feedback, &mut app.clock);
    app.last_report = Some(report);
}

///////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

fn draw_rig(mut gizmos: Gizmos, appdata: NonSend<AppGlobalData>) {
    let session = &appdata.session;
    let scale = session.store().body_scale();

    //// marker name -> scene position
    let positions: HashMap<&str, Vec3> = appdata
        .scene
        .points
        .values()
        .filter_map(|point| Some((point.marker.as_str(), point.position?)))
        .collect();

    //// group colour per connection
    let mut connection_colors: HashMap<&str, Color> = HashMap::new();
    for group in &session.skeleton().groups {
        let Some(color) = appdata.feedback.colors.get(&group.name) else {
            continue;
        };
        for connection in &group.connections {
            connection_colors.insert(connection.as_str(), *color);
        }
    }

    match session.store().view_option() {
        ViewOption::Exoskeleton => {
            for point in appdata.scene.points.values() {
                if let (true, Some(position)) = (point.visible, point.position) {
                    gizmos.sphere(position, Quat::IDENTITY, 0.02, Color::WHITE);
                }
            }
            for connection in session.skeleton().table.iter() {
                let (Some(head), Some(tail)) = (
                    positions.get(connection.head.as_str()),
                    positions.get(connection.tail.as_str()),
                ) else {
                    continue;
                };
                let color = connection_colors
                    .get(connection.name.as_str())
                    .copied()
                    .unwrap_or(Color::GRAY);
                gizmos.line(*head, *tail, color);
            }
        }
        ViewOption::Humanoid => {
            let frame = appdata.last_report.as_ref().map_or(1, |report| report.frame);
            let (anchors, offset) = session.control_pose(frame);
            let offset = offset.map_or(Vec3::ZERO, |offset| to_vec3(offset * scale));
            for (name, anchor) in anchors {
                let Some(anchor) = anchor else {
                    continue;
                };
                let color = appdata.feedback.colors.get(name).copied().unwrap_or(Color::WHITE);
                gizmos.sphere(to_vec3(anchor * scale) + offset, Quat::IDENTITY, 0.06, color);
            }
        }
    }

    //// user rig in grey, with correction cues from each body part's user-side centre
    let user = session.user();
    for connection in session.skeleton().table.iter() {
        let (Some(head), Some(tail)) = (
            user.position_of(&connection.head),
            user.position_of(&connection.tail),
        ) else {
            continue;
        };
        gizmos.line(to_vec3(head * scale), to_vec3(tail * scale), Color::DARK_GRAY);
    }
    for group in &session.skeleton().groups {
        let Some(correction) = appdata.feedback.corrections.get(&group.name) else {
            continue;
        };
        let Some(start) = group
            .connections
            .first()
            .and_then(|name| session.skeleton().table.get(name))
            .and_then(|connection| user.position_of(&connection.head))
        else {
            continue;
        };
        let start = to_vec3(start * scale);
        gizmos.line(start, start + correction.normalize_or_zero() * 0.1, Color::YELLOW);
    }
}

///////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

fn update_debug_text(mut query: Query<&mut Text, With<DebugText>>, appdata: NonSend<AppGlobalData>) {
    let mut t = String::new();
    if appdata.debug_text {
        if let Some(report) = &appdata.last_report {
            t += &format!(
                "Frame: {}  sync: {}  gate: {:?}\n",
                report.frame,
                appdata.session.gate().is_enabled(),
                report.signal
            );
            t += "=============== BODY PARTS ===============\n";
            for sample in &report.samples {
                match sample.alignment() {
                    Some(alignment) => {
                        t += &format!(
                            "{:.<20} {:>6.3} {:>6.3}\n",
                            sample.group, alignment.similarity, alignment.score
                        )
                    }
                    None => t += &format!("{:.<20} -\n", sample.group),
                }
            }
        }
    }
    for mut text in &mut query {
        text.sections[0].value = t.clone();
    }
}
