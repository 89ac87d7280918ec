//! Shared fixtures for unit and integration tests

use std::io::Write;
use xz2::write::XzEncoder;

/// Three-entry sample archive: `A/Auto` (article), `A/Automobile`
/// (redirect to 0) and `B/Auto` (article), one XZ cluster holding
/// `<h1>Auto</h1>` and `Auto`.
pub const SAMPLE_ARCHIVE: &[u8] = include_bytes!(concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/test_fixtures/sample.zim"
));

/// XZ-compress `data` the way archive writers do
pub fn xz_compress(data: &[u8]) -> Vec<u8> {
    let mut encoder = XzEncoder::new(Vec::new(), 6);
    encoder.write_all(data).expect("in-memory write");
    encoder.finish().expect("in-memory finish")
}

/// Blob `index` of [`build_cluster`]: `index` repeated `index * 10` times
pub fn cluster_blob(index: usize) -> Vec<u8> {
    vec![index as u8; index * 10]
}

/// Encode a cluster of `nb_blobs` blobs made by [`cluster_blob`]
pub fn build_cluster(compressed: bool, extended: bool, nb_blobs: usize) -> Vec<u8> {
    let blobs: Vec<Vec<u8>> = (0..nb_blobs).map(cluster_blob).collect();
    encode_cluster(compressed, extended, &blobs)
}

/// Encode a cluster holding `blobs`
pub fn encode_cluster(compressed: bool, extended: bool, blobs: &[Vec<u8>]) -> Vec<u8> {
    let width = if extended { 8 } else { 4 };
    let mut offsets = vec![((blobs.len() + 1) * width) as u64];
    for blob in blobs {
        let last = offsets[offsets.len() - 1];
        offsets.push(last + blob.len() as u64);
    }

    let mut payload = Vec::new();
    for offset in offsets {
        if extended {
            payload.extend_from_slice(&offset.to_le_bytes());
        } else {
            payload.extend_from_slice(&(offset as u32).to_le_bytes());
        }
    }
    for blob in blobs {
        payload.extend_from_slice(blob);
    }

    let extended_flag: u8 = if extended { 0x10 } else { 0 };
    let compression: u8 = if compressed { 4 } else { 0 };
    let info = extended_flag | compression;
    let mut cluster = vec![info];
    if compressed {
        cluster.extend_from_slice(&xz_compress(&payload));
    } else {
        cluster.extend_from_slice(&payload);
    }
    cluster
}
