use chrono::{DateTime, Duration, Utc};
use clap::Parser;
use serde::Deserialize;
use serde_json::json;
use skyview::{
    backdrop::MediaError,
    config::Config,
    flight::{FlightId, ProcessedFlight},
    geodesy::GeoPoint,
    heading::OrientationEvent,
    recalibration::{ControllerError, ControllerPose, GamepadButton, XrController},
    rotation::RotationSource,
    scene::Frame,
    session::Session,
    subscription::Subscription,
};
use std::{
    fs::File,
    io::{BufWriter, Read, Write},
    path::PathBuf,
};
use tracing::{info, warn};
use uom::si::{angle::degree, f64::Angle};

/// Drives a session from a recorded script and prints one JSON frame per tick.
#[derive(Parser)]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to the JSON script.
    #[arg(short, long)]
    script: PathBuf,

    /// Path to a JSON config. Defaults are used when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Milliseconds between scripted events.
    #[arg(long, default_value_t = 16)]
    step_ms: i64,
}

#[derive(Deserialize)]
struct Script {
    origin: GeoPoint,
    events: Vec<Event>,
}

#[derive(Deserialize)]
#[serde(rename_all = "snake_case")]
enum Event {
    Orientation(OrientationEvent),
    Flights(Vec<ProcessedFlight>),
    Select(FlightId),
    Deselect,
    Recalibrate,
    Camera(CameraEvent),
    Tick(Option<ScriptedController>),
}

#[derive(Deserialize)]
#[serde(rename_all = "snake_case")]
enum CameraEvent {
    Live { tracks: usize },
    Denied,
    Missing,
}

#[derive(Deserialize)]
struct ScriptedController {
    yaw_deg: f64,
    #[serde(default)]
    buttons: Vec<bool>,
    #[serde(default)]
    fail: bool,
}

impl XrController for ScriptedController {
    fn pose(&self) -> Result<ControllerPose, ControllerError> {
        match self.fail {
            true => Err(ControllerError::PoseUnavailable),
            false => Ok(ControllerPose::from_yaw(Angle::new::<degree>(self.yaw_deg))),
        }
    }

    fn buttons(&self) -> Result<Vec<GamepadButton>, ControllerError> {
        Ok(self
            .buttons
            .iter()
            .map(|&pressed| GamepadButton {
                pressed,
                value: if pressed { 1.0 } else { 0.0 },
            })
            .collect())
    }
}

fn frame_json(index: usize, session: &Session, frame: &Frame) -> serde_json::Value {
    let flights: Vec<serde_json::Value> = frame
        .flights
        .iter()
        .map(|node| {
            let world = frame.world_position(&node.local);
            json!({
                "id": node.id,
                "selected": node.selected,
                "local_m": node.local.as_meters(),
                "world_m": [world.x, world.y, world.z],
                "trajectory_m": node.trajectory.iter().map(|p| p.as_meters()).collect::<Vec<_>>(),
            })
        })
        .collect();

    json!({
        "tick": index,
        "calibrated": session.calibration().is_calibrated(),
        "rotation_offset_deg": session.rotation().rotation_offset().into_inner().get::<degree>(),
        "grab": format!("{:?}", session.last_grab()),
        "compass": {
            "visible": frame.compass.visible,
            "yaw_deg": frame.compass.yaw.get::<degree>(),
        },
        "heading": frame.heading.map(|heading| json!({
            "degrees": heading.degrees,
            "label": heading.point.label(),
        })),
        "camera_message": session.backdrop().user_message(),
        "flights": flights,
    })
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "skyview=info".into()),
        )
        .init();

    let args = Args::parse();

    let config = match &args.config {
        Some(path) => Config::from_path(path)?,
        None => Config::default(),
    };

    let mut serialized = String::new();
    File::open(&args.script)?.read_to_string(&mut serialized)?;
    let script: Script = serde_json::from_str(&serialized)?;
    info!(events = script.events.len(), script = ?args.script, "replaying script");

    let mut session = Session::new(script.origin, &config)?;
    session.arm_calibration(Subscription::new("calibration", || {}));

    let start: DateTime<Utc> = Utc::now();
    let step = Duration::milliseconds(args.step_ms);
    let mut output = BufWriter::new(std::io::stdout().lock());
    let mut ticks = 0;

    for (index, event) in script.events.into_iter().enumerate() {
        let at = start + step * index as i32;
        match event {
            Event::Orientation(event) => {
                session.handle_orientation(&event, at);
            }
            Event::Flights(flights) => {
                session.update_flights(flights);
            }
            Event::Select(id) => {
                if !session.select(&id) {
                    warn!(%id, "cannot select unknown flight");
                }
            }
            Event::Deselect => session.deselect(),
            Event::Recalibrate => session.recalibrate(Subscription::new("calibration", || {})),
            Event::Camera(camera) => {
                let stream = match camera {
                    CameraEvent::Live { tracks } => Ok((0..tracks)
                        .map(|_| Subscription::new("camera-track", || {}))
                        .collect()),
                    CameraEvent::Denied => Err(MediaError::PermissionDenied),
                    CameraEvent::Missing => Err(MediaError::NotFound),
                };
                session.backdrop_mut().attach(stream);
            }
            Event::Tick(controller) => {
                let frame = session.tick(controller.as_ref().map(|c| c as &dyn XrController));
                writeln!(output, "{}", frame_json(ticks, &session, &frame))?;
                ticks += 1;
            }
        }
    }

    output.flush()?;
    session.teardown();
    info!(ticks, "replay finished");
    Ok(())
}
