//! fh-project: installation file format and validation.

pub mod lint;
pub mod schema;
pub mod validate;

pub use lint::{ConfigWarning, lint_installation};
pub use schema::*;
pub use validate::{ValidationError, validate_installation};

/// Newest installation file version this crate understands.
pub const LATEST_VERSION: u32 = 1;

pub type ProjectResult<T> = Result<T, ProjectError>;

#[derive(thiserror::Error, Debug)]
pub enum ProjectError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub fn load_yaml(path: &std::path::Path) -> ProjectResult<Installation> {
    let content = std::fs::read_to_string(path)?;
    let installation: Installation = serde_yaml::from_str(&content)?;
    validate_installation(&installation)?;
    Ok(installation)
}

pub fn save_yaml(path: &std::path::Path, installation: &Installation) -> ProjectResult<()> {
    validate_installation(installation)?;
    let content = serde_yaml::to_string(installation)?;
    std::fs::write(path, content)?;
    Ok(())
}

pub fn load_json(path: &std::path::Path) -> ProjectResult<Installation> {
    let content = std::fs::read_to_string(path)?;
    let installation: Installation = serde_json::from_str(&content)?;
    validate_installation(&installation)?;
    Ok(installation)
}

pub fn save_json(path: &std::path::Path, installation: &Installation) -> ProjectResult<()> {
    validate_installation(installation)?;
    let content = serde_json::to_string_pretty(installation)?;
    std::fs::write(path, content)?;
    Ok(())
}

/// Load by file extension: `.json` is JSON, everything else YAML.
pub fn load(path: &std::path::Path) -> ProjectResult<Installation> {
    match path.extension().and_then(|e| e.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("json") => load_json(path),
        _ => load_yaml(path),
    }
}
