use thiserror::Error;

#[derive(Error, Debug)]
pub enum KernelError {
    #[error("channel closed")]
    ChannelClosed,

    #[error("waiting room semaphore closed")]
    WaitingRoomClosed,

    #[error("bootstrap failed: {0}")]
    Bootstrap(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("config error: {0}")]
    Config(#[from] sorsim_config::ConfigError),
}

pub type Result<T> = std::result::Result<T, KernelError>;
