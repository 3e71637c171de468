//! Content-addressed payload storage. Small bodies are kept inline in
//! Postgres; bodies over the inline threshold are gzip-compressed and
//! spilled to disk, keyed by their content hash.

use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use flate2::write::GzEncoder;
use flate2::Compression;
use sha2::{Digest, Sha256};

use saleradar_common::domain::{PayloadBlob, RawSignalId};
use saleradar_db::SignalRepo;

pub struct PayloadStore {
    repo: SignalRepo,
    spill_dir: PathBuf,
    inline_threshold_bytes: usize,
}

pub fn content_hash(body: &[u8]) -> String {
    let digest = Sha256::digest(body);
    hex::encode(digest)
}

impl PayloadStore {
    pub fn new(repo: SignalRepo, spill_dir: impl Into<PathBuf>, inline_threshold_bytes: usize) -> Self {
        Self {
            repo,
            spill_dir: spill_dir.into(),
            inline_threshold_bytes,
        }
    }

    /// Stores `body` if its content hash hasn't been seen before, returning
    /// the (possibly pre-existing) blob. Content-addressing makes this
    /// naturally idempotent: re-fetching unchanged content never writes a
    /// second copy.
    pub async fn put(&self, body: &[u8], content_type: &str) -> Result<PayloadBlob> {
        let hash = content_hash(body);
        if let Some(existing) = self.repo.find_blob_by_hash(&hash).await? {
            return Ok(existing);
        }

        if body.len() <= self.inline_threshold_bytes {
            return self
                .repo
                .insert_blob(&hash, content_type, body.len() as i64, Some(body), None, false)
                .await;
        }

        let compressed = gzip_compress(body)?;
        let path = self.spill_path(&hash);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("creating payload directory {}", parent.display()))?;
        }
        std::fs::write(&path, &compressed)
            .with_context(|| format!("writing spilled payload to {}", path.display()))?;

        self.repo
            .insert_blob(
                &hash,
                content_type,
                body.len() as i64,
                None,
                Some(path.to_string_lossy().as_ref()),
                true,
            )
            .await
    }

    /// Bytes kept on the owning row itself (e.g. `messages.body_text`)
    /// instead of the full body — enough for a readable preview without
    /// carrying the whole payload through every downstream table.
    pub fn inline_preview(&self, body: &[u8]) -> String {
        let cut = self.inline_threshold_bytes.min(body.len());
        String::from_utf8_lossy(&body[..cut]).into_owned()
    }

    /// Re-hydrates the full body for a previously stored `RawSignal`, for
    /// callers (the Extractor) that need more than the inline preview.
    pub async fn load_for_signal(&self, raw_signal_id: RawSignalId) -> Result<Vec<u8>> {
        let signal = self
            .repo
            .find_by_id(raw_signal_id)
            .await?
            .with_context(|| format!("raw_signal {raw_signal_id} not found"))?;
        let blob = self
            .repo
            .find_blob_by_id(signal.payload_blob_id)
            .await?
            .with_context(|| format!("payload_blob {} not found", signal.payload_blob_id))?;
        self.read(&blob)
    }

    pub fn read(&self, blob: &PayloadBlob) -> Result<Vec<u8>> {
        if let Some(inline) = &blob.inline_body {
            return Ok(inline.clone());
        }
        let path = blob
            .spill_path
            .as_ref()
            .context("blob has neither inline body nor spill path")?;
        let raw = std::fs::read(path).with_context(|| format!("reading spilled payload {path}"))?;
        if blob.compressed {
            gzip_decompress(&raw)
        } else {
            Ok(raw)
        }
    }

    fn spill_path(&self, hash: &str) -> PathBuf {
        // Two levels of hash-prefix sharding keep any single directory small.
        Path::new(&self.spill_dir)
            .join(&hash[0..2])
            .join(&hash[2..4])
            .join(format!("{hash}.gz"))
    }
}

fn gzip_compress(body: &[u8]) -> Result<Vec<u8>> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(body)?;
    encoder.finish().context("gzip compression failed")
}

fn gzip_decompress(body: &[u8]) -> Result<Vec<u8>> {
    use std::io::Read;
    let mut decoder = flate2::read::GzDecoder::new(body);
    let mut out = Vec::new();
    decoder.read_to_end(&mut out)?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_hash_is_deterministic() {
        assert_eq!(content_hash(b"hello"), content_hash(b"hello"));
        assert_ne!(content_hash(b"hello"), content_hash(b"world"));
    }

    #[test]
    fn gzip_round_trips() {
        let original = b"the quick brown fox jumps over the lazy dog".repeat(100);
        let compressed = gzip_compress(&original).unwrap();
        assert!(compressed.len() < original.len());
        let restored = gzip_decompress(&compressed).unwrap();
        assert_eq!(restored, original);
    }
}
