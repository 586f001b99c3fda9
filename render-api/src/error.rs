//! Engine-wide error type. Operations that can plausibly fail return
//! `Result<T>`; the variant tags the failure taxonomy and the payload carries
//! an owned, already-formatted message.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// File not found or unreadable.
    #[error("io: {0}")]
    Io(String),
    /// A model or shader blob was rejected by its decoder.
    #[error("parse: {0}")]
    Parse(String),
    /// Graphics instance/device/swapchain creation failed.
    #[error("device init: {0}")]
    DeviceInit(String),
    /// The allocator refused a buffer or image.
    #[error("out of resources: {0}")]
    OutOfResources(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn io(msg: impl Into<String>) -> Self {
        Error::Io(msg.into())
    }

    pub fn parse(msg: impl Into<String>) -> Self {
        Error::Parse(msg.into())
    }

    pub fn device_init(msg: impl Into<String>) -> Self {
        Error::DeviceInit(msg.into())
    }

    pub fn out_of_resources(msg: impl Into<String>) -> Self {
        Error::OutOfResources(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_keep_their_taxonomy_tag() {
        let err = Error::io("file 'scene.glb' was not found");
        assert_eq!(err.to_string(), "io: file 'scene.glb' was not found");

        let err = Error::parse("not a SPIR-V blob");
        assert!(err.to_string().starts_with("parse:"));
    }
}
