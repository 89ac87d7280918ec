//! Synthetic archive builder shared by integration tests

#![allow(dead_code, clippy::expect_used, clippy::unwrap_used, clippy::panic)]

use binrw::{BinWrite, BinWriterExt};
use std::io::Cursor;
use std::path::{Path, PathBuf};
use zimkit_format::ZIM_MAGIC;

#[path = "../../src/test_utils.rs"]
mod fixtures;

pub use fixtures::encode_cluster;

/// Mimetypes written into every synthetic archive
pub const MIMETYPES: [&str; 2] = ["text/html", "text/plain"];

/// Path of a file under `test_fixtures/`
pub fn fixture_path(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("test_fixtures")
        .join(name)
}

/// Bytes of the bundled three-entry sample archive
pub fn sample_archive() -> Vec<u8> {
    let path = fixture_path("sample.zim");
    std::fs::read(&path).unwrap_or_else(|e| panic!("Failed to read {}: {}", path.display(), e))
}

/// Route library logs to the test output
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::TRACE)
        .with_test_writer()
        .try_init();
}

#[derive(BinWrite)]
#[bw(little)]
struct RawHeader {
    magic_number: u32,
    major_version: u16,
    minor_version: u16,
    uuid: [u8; 16],
    article_count: u32,
    cluster_count: u32,
    url_ptr_pos: u64,
    title_ptr_pos: u64,
    cluster_ptr_pos: u64,
    mime_list_pos: u64,
    main_page: u32,
    layout_page: u32,
    checksum_pos: u64,
}

const HEADER_SIZE: usize = 80;

#[derive(Debug, Clone)]
enum Content {
    Blob { mimetype: u16, data: Vec<u8> },
    Redirect { namespace: u8, url: String },
}

#[derive(Debug, Clone)]
struct Entry {
    namespace: u8,
    url: String,
    title: String,
    content: Content,
}

impl Entry {
    fn title_key(&self) -> (u8, &str) {
        let title = if self.title.is_empty() {
            &self.url
        } else {
            &self.title
        };
        (self.namespace, title)
    }
}

/// Builder for small well-formed archives
#[derive(Debug, Clone)]
pub struct ArchiveBuilder {
    entries: Vec<Entry>,
    compressed: bool,
    extended: bool,
    blobs_per_cluster: usize,
    main_page: Option<(char, String)>,
}

impl Default for ArchiveBuilder {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            compressed: true,
            extended: false,
            blobs_per_cluster: 2,
            main_page: None,
        }
    }
}

impl ArchiveBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an article served as `text/html`
    #[must_use]
    pub fn article(self, namespace: char, url: &str, title: &str, data: &[u8]) -> Self {
        self.article_with_mimetype(namespace, url, title, 0, data)
    }

    /// Add an article with an explicit mimetype index
    #[must_use]
    pub fn article_with_mimetype(
        mut self,
        namespace: char,
        url: &str,
        title: &str,
        mimetype: u16,
        data: &[u8],
    ) -> Self {
        self.entries.push(Entry {
            namespace: namespace as u8,
            url: url.to_string(),
            title: title.to_string(),
            content: Content::Blob {
                mimetype,
                data: data.to_vec(),
            },
        });
        self
    }

    /// Add a redirect to `target_namespace/target_url`
    #[must_use]
    pub fn redirect(
        mut self,
        namespace: char,
        url: &str,
        title: &str,
        target_namespace: char,
        target_url: &str,
    ) -> Self {
        self.entries.push(Entry {
            namespace: namespace as u8,
            url: url.to_string(),
            title: title.to_string(),
            content: Content::Redirect {
                namespace: target_namespace as u8,
                url: target_url.to_string(),
            },
        });
        self
    }

    #[must_use]
    pub fn compressed(mut self, compressed: bool) -> Self {
        self.compressed = compressed;
        self
    }

    #[must_use]
    pub fn extended(mut self, extended: bool) -> Self {
        self.extended = extended;
        self
    }

    #[must_use]
    pub fn blobs_per_cluster(mut self, count: usize) -> Self {
        self.blobs_per_cluster = count.max(1);
        self
    }

    #[must_use]
    pub fn main_page(mut self, namespace: char, url: &str) -> Self {
        self.main_page = Some((namespace, url.to_string()));
        self
    }

    /// Sorted `(namespace, url)` keys, i.e. the URL index order
    pub fn sorted_keys(&self) -> Vec<(char, String)> {
        self.sorted_entries()
            .iter()
            .map(|e| (char::from(e.namespace), e.url.clone()))
            .collect()
    }

    fn sorted_entries(&self) -> Vec<Entry> {
        let mut entries = self.entries.clone();
        entries.sort_by(|a, b| {
            (a.namespace, a.url.as_bytes()).cmp(&(b.namespace, b.url.as_bytes()))
        });
        entries
    }

    /// Serialize the archive, trailing MD5 included
    pub fn build(&self) -> Vec<u8> {
        let entries = self.sorted_entries();
        let url_index = |namespace: u8, url: &str| {
            entries
                .iter()
                .position(|e| e.namespace == namespace && e.url == url)
                .unwrap_or_else(|| panic!("unknown entry {}/{}", char::from(namespace), url))
        };

        let mut title_order: Vec<usize> = (0..entries.len()).collect();
        title_order.sort_by(|&a, &b| {
            let (ns_a, title_a) = entries[a].title_key();
            let (ns_b, title_b) = entries[b].title_key();
            (ns_a, title_a.as_bytes()).cmp(&(ns_b, title_b.as_bytes()))
        });

        // Pack blobs into clusters in URL order.
        let mut clusters: Vec<Vec<Vec<u8>>> = Vec::new();
        let mut locations = vec![None; entries.len()];
        for (index, entry) in entries.iter().enumerate() {
            if let Content::Blob { data, .. } = &entry.content {
                if clusters.last().is_none_or(|c| c.len() >= self.blobs_per_cluster) {
                    clusters.push(Vec::new());
                }
                let cluster_number = clusters.len() - 1;
                let blobs = clusters.last_mut().unwrap();
                locations[index] = Some((cluster_number as u32, blobs.len() as u32));
                blobs.push(data.clone());
            }
        }

        let mut mime_list = Vec::new();
        for mimetype in MIMETYPES {
            mime_list.extend_from_slice(mimetype.as_bytes());
            mime_list.push(0);
        }
        mime_list.push(0);

        let dirents: Vec<Vec<u8>> = entries
            .iter()
            .enumerate()
            .map(|(index, entry)| {
                let mut out = Vec::new();
                match &entry.content {
                    Content::Blob { mimetype, .. } => {
                        let (cluster, blob) = locations[index].unwrap();
                        out.extend_from_slice(&mimetype.to_le_bytes());
                        out.extend_from_slice(&[0, entry.namespace]);
                        out.extend_from_slice(&0u32.to_le_bytes());
                        out.extend_from_slice(&cluster.to_le_bytes());
                        out.extend_from_slice(&blob.to_le_bytes());
                    }
                    Content::Redirect { namespace, url } => {
                        let target = url_index(*namespace, url.as_str()) as u32;
                        out.extend_from_slice(&0xFFFFu16.to_le_bytes());
                        out.extend_from_slice(&[0, entry.namespace]);
                        out.extend_from_slice(&0u32.to_le_bytes());
                        out.extend_from_slice(&target.to_le_bytes());
                    }
                }
                out.extend_from_slice(entry.url.as_bytes());
                out.push(0);
                out.extend_from_slice(entry.title.as_bytes());
                out.push(0);
                out
            })
            .collect();

        let encoded_clusters: Vec<Vec<u8>> = clusters
            .iter()
            .map(|blobs| encode_cluster(self.compressed, self.extended, blobs))
            .collect();

        let mime_list_pos = HEADER_SIZE;
        let url_ptr_pos = mime_list_pos + mime_list.len();
        let title_ptr_pos = url_ptr_pos + 8 * entries.len();
        let dirents_pos = title_ptr_pos + 4 * entries.len();
        let cluster_ptr_pos = dirents_pos + dirents.iter().map(Vec::len).sum::<usize>();
        let clusters_pos = cluster_ptr_pos + 8 * encoded_clusters.len();
        let checksum_pos = clusters_pos + encoded_clusters.iter().map(Vec::len).sum::<usize>();

        let main_page = self
            .main_page
            .as_ref()
            .map_or(0xFFFF_FFFF, |(ns, url)| url_index(*ns as u8, url.as_str()) as u32);

        let header = RawHeader {
            magic_number: ZIM_MAGIC,
            major_version: 5,
            minor_version: 0,
            uuid: *b"zimkit-synthetic",
            article_count: entries.len() as u32,
            cluster_count: encoded_clusters.len() as u32,
            url_ptr_pos: url_ptr_pos as u64,
            title_ptr_pos: title_ptr_pos as u64,
            cluster_ptr_pos: cluster_ptr_pos as u64,
            mime_list_pos: mime_list_pos as u64,
            main_page,
            layout_page: 0xFFFF_FFFF,
            checksum_pos: checksum_pos as u64,
        };

        let mut cursor = Cursor::new(Vec::new());
        cursor.write_le(&header).expect("header write");
        let mut out = cursor.into_inner();
        assert_eq!(out.len(), HEADER_SIZE);

        out.extend_from_slice(&mime_list);

        let mut offset = dirents_pos;
        for dirent in &dirents {
            out.extend_from_slice(&(offset as u64).to_le_bytes());
            offset += dirent.len();
        }
        for &url_index in &title_order {
            out.extend_from_slice(&(url_index as u32).to_le_bytes());
        }
        for dirent in &dirents {
            out.extend_from_slice(dirent);
        }

        let mut offset = clusters_pos;
        for cluster in &encoded_clusters {
            out.extend_from_slice(&(offset as u64).to_le_bytes());
            offset += cluster.len();
        }
        for cluster in &encoded_clusters {
            out.extend_from_slice(cluster);
        }
        assert_eq!(out.len(), checksum_pos);

        let digest = md5::compute(&out).0;
        out.extend_from_slice(&digest);
        out
    }
}
