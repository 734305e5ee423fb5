use thiserror::Error;

#[derive(Debug, Error)]
pub enum PredictError {
    #[error("TLE file read error: {0}")]
    FileRead(#[from] std::io::Error),
    #[error("Invalid TLE format in {file}: {message}")]
    InvalidTle { file: String, message: String },
    #[error("Invalid orbital elements: {0}")]
    Elements(String),
    #[error("Propagation error: {0}")]
    Propagation(String),
    #[error("Satellite {norad_id} not found in {file}")]
    SatelliteNotFound { norad_id: u64, file: String },
}
