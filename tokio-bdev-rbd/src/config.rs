//! Parsed configuration tuples.
//!
//! Configuration-file parsing is the framework's business; this crate only
//! consumes the ordered list of `(pool name, image name, optional block
//! size)` entries it produces.

pub const DEFAULT_BLOCK_SIZE: u32 = 512;

/// One device entry from the parsed configuration.
#[derive(Debug, Clone)]
pub struct DeviceEntry {
    pub pool_name: String,
    pub image_name: String,
    /// Block size in bytes; must be a nonzero multiple of 512 if given.
    pub block_size: Option<u32>,
}

#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("pool name must be provided")]
    MissingPoolName,
    #[error("image name must be provided")]
    MissingImageName,
    #[error("block size {0} is not a nonzero multiple of 512")]
    InvalidBlockSize(u32),
}

impl DeviceEntry {
    /// Validate the entry and resolve the effective block size.
    pub fn validate(&self) -> Result<u32, ConfigError> {
        if self.pool_name.is_empty() {
            return Err(ConfigError::MissingPoolName);
        }
        if self.image_name.is_empty() {
            return Err(ConfigError::MissingImageName);
        }
        match self.block_size {
            None => Ok(DEFAULT_BLOCK_SIZE),
            Some(bs) if bs == 0 || bs % 512 != 0 => Err(ConfigError::InvalidBlockSize(bs)),
            Some(bs) => Ok(bs),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(block_size: Option<u32>) -> DeviceEntry {
        DeviceEntry {
            pool_name: "rbd".to_owned(),
            image_name: "vol0".to_owned(),
            block_size,
        }
    }

    #[test]
    fn block_size_defaults_to_512() {
        assert_eq!(entry(None).validate(), Ok(512));
    }

    #[test]
    fn block_size_must_be_multiple_of_512() {
        assert_eq!(entry(Some(4096)).validate(), Ok(4096));
        assert_eq!(
            entry(Some(1000)).validate(),
            Err(ConfigError::InvalidBlockSize(1000))
        );
        assert_eq!(
            entry(Some(0)).validate(),
            Err(ConfigError::InvalidBlockSize(0))
        );
    }

    #[test]
    fn names_must_be_present() {
        let mut e = entry(None);
        e.pool_name.clear();
        assert_eq!(e.validate(), Err(ConfigError::MissingPoolName));

        let mut e = entry(None);
        e.image_name.clear();
        assert_eq!(e.validate(), Err(ConfigError::MissingImageName));
    }
}
