//! Aggregate catalog statistics.

use crate::asset::{Asset, ContentKind};
use serde::{Deserialize, Serialize};

/// Overview counters over the whole catalog.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogStats {
    pub total_assets: u64,
    pub total_bytes: u64,
    pub total_tags: u64,
    pub images: u64,
    pub videos: u64,
    pub audio: u64,
    pub documents: u64,
    pub other: u64,
}

impl CatalogStats {
    /// Compute statistics from a full asset listing and the tag count.
    pub fn compute<'a, I>(assets: I, total_tags: usize) -> Self
    where
        I: IntoIterator<Item = &'a Asset>,
    {
        let mut stats = Self {
            total_tags: total_tags as u64,
            ..Self::default()
        };
        for asset in assets {
            stats.total_assets += 1;
            stats.total_bytes = stats.total_bytes.saturating_add(asset.size_bytes);
            match asset.kind() {
                ContentKind::Image => stats.images += 1,
                ContentKind::Video => stats.videos += 1,
                ContentKind::Audio => stats.audio += 1,
                ContentKind::Document => stats.documents += 1,
                ContentKind::Other => stats.other += 1,
            }
        }
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asset::NewAsset;

    #[test]
    fn test_compute_counts_kinds_and_bytes() {
        let assets: Vec<Asset> = [
            ("a.png", "image/png", 100),
            ("b.mp4", "video/mp4", 2000),
            ("c.pdf", "application/pdf", 30),
            ("d.bin", "application/octet-stream", 4),
        ]
        .into_iter()
        .map(|(name, ct, size)| NewAsset::from_upload(name, ct, size).unwrap().into_asset())
        .collect();

        let stats = CatalogStats::compute(&assets, 3);
        assert_eq!(stats.total_assets, 4);
        assert_eq!(stats.total_bytes, 2134);
        assert_eq!(stats.total_tags, 3);
        assert_eq!(stats.images, 1);
        assert_eq!(stats.videos, 1);
        assert_eq!(stats.documents, 1);
        assert_eq!(stats.other, 1);
        assert_eq!(stats.audio, 0);
    }
}
