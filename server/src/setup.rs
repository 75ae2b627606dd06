use std::env;
use std::env::VarError;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;

/// Get the database URL from the environment variable.
pub fn get_database_url_from_env() -> Result<String, SetupError> {
    env::var("DATABASE_URL").map_err(|e| SetupError::from_env_error(e, "DATABASE_URL"))
}

/// Get the web server TCP listening port from the environment variable
pub fn get_listen_port_from_env() -> Result<u16, SetupError> {
    env::var("LISTEN_PORT")
        .map_err(|e| SetupError::from_env_error(e, "LISTEN_PORT"))
        .and_then(|v| {
            v.parse().map_err(|_| SetupError::EnvVariableInvalid {
                variable_name: "LISTEN_PORT",
                problem: "Not a valid uint16",
            })
        })
}

/// Get the web server TCP listening interface address from the environment variable
pub fn get_listen_address_from_env() -> Result<String, SetupError> {
    env::var("LISTEN_ADDRESS").map_err(|e| SetupError::from_env_error(e, "LISTEN_ADDRESS"))
}

/// Get the directory for storing uploaded venue images from the environment variable
pub fn get_image_directory_from_env() -> Result<PathBuf, SetupError> {
    env::var("IMAGE_DIRECTORY")
        .map_err(|e| SetupError::from_env_error(e, "IMAGE_DIRECTORY"))
        .map(PathBuf::from)
}

/// Get the public base URL of the application from the environment variable. It is used for
/// building the URLs of uploaded images.
pub fn get_public_base_url_from_env() -> Result<url::Url, SetupError> {
    env::var("PUBLIC_BASE_URL")
        .map_err(|e| SetupError::from_env_error(e, "PUBLIC_BASE_URL"))
        .and_then(|v| {
            url::Url::parse(&v).map_err(|_| SetupError::EnvVariableInvalid {
                variable_name: "PUBLIC_BASE_URL",
                problem: "Not a valid URL",
            })
        })
}

#[derive(Debug)]
pub enum SetupError {
    EnvVariableMissing {
        variable_name: &'static str,
    },
    EnvVariableInvalid {
        variable_name: &'static str,
        problem: &'static str,
    },
}

impl SetupError {
    fn from_env_error(error: VarError, variable_name: &'static str) -> Self {
        match error {
            VarError::NotPresent => Self::EnvVariableMissing { variable_name },
            VarError::NotUnicode(_) => Self::EnvVariableInvalid {
                variable_name,
                problem: "no valid unicode",
            },
        }
    }
}

impl Display for SetupError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            SetupError::EnvVariableMissing { variable_name } => {
                write!(f, "Environment variable {} must be defined", variable_name)
            }
            SetupError::EnvVariableInvalid {
                variable_name,
                problem,
            } => write!(
                f,
                "Value of environment variable {} is invalid: {}",
                variable_name, problem
            ),
        }
    }
}

impl std::error::Error for SetupError {}
