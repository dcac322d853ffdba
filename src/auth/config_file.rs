use std::path::Path;

use ini::Ini;

use crate::auth::credentials::Credentials;
use crate::error::AppError;

const SECTION: &str = "secret";

/// Read the `[secret]` email/password pair from an INI file.
pub fn read_secrets(path: &Path) -> Result<Credentials, AppError> {
    if !path.is_file() {
        return Err(AppError::Config {
            path: path.to_path_buf(),
            message: "file does not exist".into(),
        });
    }

    let conf = Ini::load_from_file(path).map_err(|e| AppError::Config {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;

    let section = conf.section(Some(SECTION)).ok_or_else(|| AppError::Config {
        path: path.to_path_buf(),
        message: format!("missing [{}] section", SECTION),
    })?;

    let value = |key: &str| -> Result<String, AppError> {
        section
            .get(key)
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string)
            .ok_or_else(|| AppError::Config {
                path: path.to_path_buf(),
                message: format!("missing '{}' in [{}]", key, SECTION),
            })
    };

    Ok(Credentials::new(value("email")?, value("password")?))
}
