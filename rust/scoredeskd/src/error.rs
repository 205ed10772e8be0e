use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("{0}")]
    InvalidParam(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("source error: {0}")]
    Source(String),
}

impl Error {
    pub fn invalid(message: impl Into<String>) -> Self {
        Error::InvalidParam(message.into())
    }

    /// Stable code carried in the IPC error object.
    pub fn code(&self) -> &'static str {
        match self {
            Error::InvalidParam(_) => "bad_params",
            Error::NotFound(_) => "not_found",
            Error::Config(_) => "config_invalid",
            Error::Io(_) => "io_failed",
            Error::Json(_) => "bad_json",
            Error::Database(_) => "db_query_failed",
            Error::Http(_) => "fetch_failed",
            Error::Source(_) => "source_failed",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_stable() {
        assert_eq!(Error::invalid("x").code(), "bad_params");
        assert_eq!(Error::NotFound("r".into()).code(), "not_found");
        let io = Error::from(std::io::Error::new(std::io::ErrorKind::Other, "boom"));
        assert_eq!(io.code(), "io_failed");
        assert_eq!(Error::invalid("page must be >= 1").to_string(), "page must be >= 1");
    }
}
