//! Pools and device records.

use std::sync::Arc;

/// A named backend connection pool.
///
/// Holds no connection state; it is purely a deduplication key shared by
/// reference across devices with the same pool name.
#[derive(Debug)]
pub struct Pool {
    name: String,
}

impl Pool {
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Deduplicates pools by exact name match.
///
/// Owned by the adapter; dropped (with all pools) at adapter teardown. There
/// is no removal operation.
#[derive(Debug, Default)]
pub struct PoolRegistry {
    pools: Vec<Arc<Pool>>,
}

impl PoolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Idempotent lookup-or-create.
    pub fn get_or_create(&mut self, name: &str) -> Arc<Pool> {
        if let Some(existing) = self.pools.iter().find(|p| p.name == name) {
            return Arc::clone(existing);
        }
        let pool = Arc::new(Pool {
            name: name.to_owned(),
        });
        self.pools.push(Arc::clone(&pool));
        pool
    }

    pub fn len(&self) -> usize {
        self.pools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pools.is_empty()
    }
}

/// One logical disk backed by a remote image. Immutable after registration.
#[derive(Debug)]
pub struct Device {
    name: String,
    product_name: String,
    image_name: String,
    pool: Arc<Pool>,
    block_size: u32,
    block_count: u64,
    size_bytes: u64,
}

impl Device {
    /// `size_bytes` comes from the registration-time backend stat;
    /// `block_size` has already been validated as a nonzero multiple of 512.
    pub(crate) fn new(
        name: String,
        product_name: &str,
        image_name: &str,
        pool: Arc<Pool>,
        block_size: u32,
        size_bytes: u64,
    ) -> Self {
        Device {
            name,
            product_name: product_name.to_owned(),
            image_name: image_name.to_owned(),
            pool,
            block_size,
            block_count: size_bytes / u64::from(block_size),
            size_bytes,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn product_name(&self) -> &str {
        &self.product_name
    }

    pub fn image_name(&self) -> &str {
        &self.image_name
    }

    pub fn pool(&self) -> &Arc<Pool> {
        &self.pool
    }

    pub fn block_size(&self) -> u32 {
        self.block_size
    }

    pub fn block_count(&self) -> u64 {
        self.block_count
    }

    pub fn size_bytes(&self) -> u64 {
        self.size_bytes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_or_create_is_idempotent() {
        let mut registry = PoolRegistry::new();
        let a1 = registry.get_or_create("pool-a");
        let a2 = registry.get_or_create("pool-a");
        let b = registry.get_or_create("pool-b");
        assert!(Arc::ptr_eq(&a1, &a2));
        assert!(!Arc::ptr_eq(&a1, &b));
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn block_count_is_integer_division_of_size() {
        let mut registry = PoolRegistry::new();
        let pool = registry.get_or_create("rbd");

        let dev = Device::new(
            "Rbd0".to_owned(),
            "RBD image",
            "vol0",
            Arc::clone(&pool),
            512,
            10_485_760,
        );
        assert_eq!(dev.block_count(), 20_480);

        let dev = Device::new(
            "Rbd1".to_owned(),
            "RBD image",
            "vol0",
            pool,
            4096,
            10_485_760,
        );
        assert_eq!(dev.block_count(), 2_560);
    }
}
