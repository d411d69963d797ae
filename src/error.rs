use crate::{
    backdrop::MediaError, config::ConfigError, geodesy::GeoError,
    recalibration::ControllerError,
};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Geo(#[from] GeoError),

    #[error(transparent)]
    Controller(#[from] ControllerError),

    #[error(transparent)]
    Media(#[from] MediaError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}
