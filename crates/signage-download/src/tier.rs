//! Device-memory-driven storage tiering (§4.5 "Whole-vs-chunked decision").

/// Chunk size, cache budget, and chunk threshold for a device-memory band.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StorageTier {
    pub chunk_size: u64,
    pub cache_budget: u64,
    pub chunk_threshold: u64,
}

const MB: u64 = 1024 * 1024;
const GB: u64 = 1024 * MB;

const TIERS: [(u64, StorageTier); 5] = [
    (
        GB / 2,
        StorageTier {
            chunk_size: 10 * MB,
            cache_budget: 25 * MB,
            chunk_threshold: 25 * MB,
        },
    ),
    (
        GB,
        StorageTier {
            chunk_size: 20 * MB,
            cache_budget: 50 * MB,
            chunk_threshold: 50 * MB,
        },
    ),
    (
        2 * GB,
        StorageTier {
            chunk_size: 30 * MB,
            cache_budget: 100 * MB,
            chunk_threshold: 75 * MB,
        },
    ),
    (
        4 * GB,
        StorageTier {
            chunk_size: 50 * MB,
            cache_budget: 200 * MB,
            chunk_threshold: 100 * MB,
        },
    ),
    (
        u64::MAX,
        StorageTier {
            chunk_size: 100 * MB,
            cache_budget: 500 * MB,
            chunk_threshold: 200 * MB,
        },
    ),
];

/// Conservative fallback when device memory can't be queried.
pub const FALLBACK_DEVICE_MEMORY_BYTES: u64 = GB;

/// Picks the tier for a device with `device_memory_bytes` of RAM.
pub fn tier_for_device_memory(device_memory_bytes: u64) -> StorageTier {
    TIERS
        .iter()
        .find(|(ceiling, _)| device_memory_bytes <= *ceiling)
        .map(|(_, tier)| *tier)
        .unwrap_or(TIERS[TIERS.len() - 1].1)
}

/// Whether a descriptor of this size should be stored chunked under `tier`.
pub fn should_chunk(size: u64, tier: &StorageTier) -> bool {
    size > tier.chunk_threshold
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn four_gb_device_maps_to_documented_tier() {
        let tier = tier_for_device_memory(4 * GB);
        assert_eq!(tier.chunk_size, 50 * MB);
        assert_eq!(tier.cache_budget, 200 * MB);
        assert_eq!(tier.chunk_threshold, 100 * MB);
    }

    #[test]
    fn above_four_gb_uses_largest_tier() {
        let tier = tier_for_device_memory(16 * GB);
        assert_eq!(tier.chunk_size, 100 * MB);
    }

    #[test]
    fn small_file_under_threshold_is_whole() {
        let tier = tier_for_device_memory(4 * GB);
        assert!(!should_chunk(41_500, &tier));
    }

    #[test]
    fn large_file_over_threshold_is_chunked() {
        let tier = tier_for_device_memory(4 * GB);
        assert!(should_chunk(1_048_576_000, &tier));
    }
}
