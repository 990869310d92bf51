use thiserror::Error;

#[derive(Debug, Error)]
pub enum BbError {
    #[error("`bb` not found on PATH: install depot_tools and run 'bb auth-login'")]
    CliNotFound(#[from] which::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("unexpected error from {command}: '{stderr}'")]
    Cli { command: String, stderr: String },

    #[error("{command} exited abnormally: {status}")]
    Exit {
        command: String,
        status: std::process::ExitStatus,
    },

    #[error("unexpected empty result from bb ls of bot '{0}'")]
    EmptyListing(String),

    #[error("unexpected result from bb ls: '{0}'")]
    NoSuccessfulBuild(String),

    #[error("could not find build name for bot '{0}'")]
    MissingBuildName(String),

    #[error("build name '{0}' does not carry the chromium/ci/ prefix")]
    UnexpectedBuildName(String),
}

pub type Result<T> = std::result::Result<T, BbError>;
