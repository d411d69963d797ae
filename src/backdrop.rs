//! The camera feed shown behind the overlay on handheld devices.
//!
//! The backdrop is opaque to the rest of the crate. It only owns the media
//! track guards and a status that can be shown to the user.

use crate::subscription::Subscription;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MediaError {
    #[error("camera access was denied")]
    PermissionDenied,

    #[error("no camera is available")]
    NotFound,

    #[error("camera could not be started: {0}")]
    Other(String),
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum BackdropStatus {
    #[default]
    Idle,
    Live {
        tracks: usize,
    },
    Unavailable(MediaError),
}

#[derive(Debug, Default)]
pub struct Backdrop {
    status: BackdropStatus,
    tracks: Vec<Subscription>,
}

impl Backdrop {
    pub fn new() -> Self {
        Self::default()
    }

    /// Takes ownership of the tracks of a camera stream, or records why the
    /// stream could not be opened. Tracks from a previous stream are stopped.
    pub fn attach(&mut self, stream: Result<Vec<Subscription>, MediaError>) -> &BackdropStatus {
        self.stop();

        match stream {
            Ok(tracks) => {
                tracing::info!(tracks = tracks.len(), "camera backdrop live");
                self.status = BackdropStatus::Live {
                    tracks: tracks.len(),
                };
                self.tracks = tracks;
            }
            Err(err) => {
                tracing::warn!(error = %err, "camera backdrop unavailable");
                self.status = BackdropStatus::Unavailable(err);
            }
        }

        &self.status
    }

    pub fn status(&self) -> &BackdropStatus {
        &self.status
    }

    /// Message to show the user, if any.
    pub fn user_message(&self) -> Option<String> {
        match &self.status {
            BackdropStatus::Unavailable(err) => {
                Some(format!("Camera unavailable: {err}. Flights are still shown."))
            }
            _ => None,
        }
    }

    /// Stops every track.
    pub fn stop(&mut self) {
        for track in self.tracks.drain(..) {
            track.release();
        }
        if matches!(self.status, BackdropStatus::Live { .. }) {
            self.status = BackdropStatus::Idle;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::subscription::tests::counted;

    #[test]
    fn live_stream_is_stopped() {
        let (video, released) = counted("video");
        let mut backdrop = Backdrop::new();

        assert_eq!(
            backdrop.attach(Ok(vec![video])),
            &BackdropStatus::Live { tracks: 1 }
        );
        assert_eq!(backdrop.user_message(), None);

        backdrop.stop();
        assert_eq!(released.get(), 1);
        assert_eq!(backdrop.status(), &BackdropStatus::Idle);
    }

    #[test]
    fn failure_is_reported_to_the_user() {
        let mut backdrop = Backdrop::new();
        backdrop.attach(Err(MediaError::PermissionDenied));

        let message = backdrop.user_message().unwrap();
        assert!(message.contains("denied"));
    }

    #[test]
    fn reattach_stops_previous_tracks() {
        let (first, first_released) = counted("video");
        let (second, second_released) = counted("video");
        let mut backdrop = Backdrop::new();

        backdrop.attach(Ok(vec![first]));
        backdrop.attach(Ok(vec![second]));
        assert_eq!(first_released.get(), 1);
        assert_eq!(second_released.get(), 0);

        drop(backdrop);
        assert_eq!(second_released.get(), 1);
    }
}
