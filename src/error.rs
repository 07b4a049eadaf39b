#[derive(Debug, thiserror::Error)]
pub enum HydraError {
    #[error("instead of '{package}', you want python3xPackages... (e.g. python311Packages)")]
    Usage { package: String },

    #[error("package {ident} not found at url {url}")]
    NotFound { ident: String, url: String },

    #[error("Request error {0}")]
    Fetch(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
