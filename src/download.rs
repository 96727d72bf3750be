//! File acquisition: fetch an add-on package by URL into the download directory.

use std::fs::File;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use serde::Serialize;
use sha2::{Digest, Sha256};
use tracing::info;

#[derive(Debug, Clone, Serialize)]
pub struct Acquired {
    pub title: String,
    pub path: PathBuf,
    pub bytes: u64,
    /// "sha256:<hex>"
    pub checksum: String,
}

pub trait FileAcquirer: Send + Sync {
    fn acquire(&self, url: &str, title: &str) -> Result<Acquired>;
}

pub struct HttpAcquirer {
    dir: PathBuf,
    timeout: Option<Duration>,
}

impl HttpAcquirer {
    pub fn new(dir: impl Into<PathBuf>, timeout: Option<Duration>) -> Self {
        Self {
            dir: dir.into(),
            timeout,
        }
    }

    pub fn destination(&self, title: &str) -> PathBuf {
        self.dir.join(format!("{}.apk", file_stem(title)))
    }
}

impl FileAcquirer for HttpAcquirer {
    fn acquire(&self, url: &str, title: &str) -> Result<Acquired> {
        if url.trim().is_empty() {
            bail!("no download link for {}", title);
        }

        let mut builder = reqwest::blocking::Client::builder();
        if let Some(timeout) = self.timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().context("building HTTP client")?;

        let mut resp = client
            .get(url)
            .send()
            .with_context(|| format!("GET {}", url))?
            .error_for_status()
            .with_context(|| format!("{} returned error status", url))?;

        std::fs::create_dir_all(&self.dir)
            .with_context(|| format!("creating {}", self.dir.display()))?;

        let path = self.destination(title);
        let tmp_path = path.with_extension("apk.part");
        let (bytes, checksum) = write_hashed(&mut resp, &tmp_path)
            .with_context(|| format!("writing {}", tmp_path.display()))?;
        std::fs::rename(&tmp_path, &path).with_context(|| {
            format!("renaming {} to {}", tmp_path.display(), path.display())
        })?;

        info!(title, path = %path.display(), bytes, %checksum, "download complete");

        Ok(Acquired {
            title: title.to_string(),
            path,
            bytes,
            checksum,
        })
    }
}

/// Copy `src` into a new file at `path`, hashing as it goes.
fn write_hashed(src: &mut impl Read, path: &Path) -> io::Result<(u64, String)> {
    let mut file = File::create(path)?;
    let mut hasher = Sha256::new();
    let mut buf = [0u8; 64 * 1024];
    let mut total = 0u64;

    loop {
        let n = match src.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        hasher.update(&buf[..n]);
        file.write_all(&buf[..n])?;
        total += n as u64;
    }
    file.flush()?;

    Ok((total, format!("sha256:{:x}", hasher.finalize())))
}

/// Keep titles usable as file names on any filesystem.
fn file_stem(title: &str) -> String {
    let stem: String = title
        .trim()
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();
    if stem.is_empty() || stem.chars().all(|c| c == '.') {
        "download".to_string()
    } else {
        stem
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn destination_sanitizes_title() {
        let acquirer = HttpAcquirer::new("/tmp/dl", None);
        assert_eq!(
            acquirer.destination("Magisk Stable"),
            PathBuf::from("/tmp/dl/Magisk Stable.apk")
        );
        assert_eq!(
            acquirer.destination("../etc/passwd"),
            PathBuf::from("/tmp/dl/.._etc_passwd.apk")
        );
        assert_eq!(acquirer.destination(".."), PathBuf::from("/tmp/dl/download.apk"));
    }

    #[test]
    fn write_hashed_counts_and_hashes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.bin");
        let (bytes, checksum) = write_hashed(&mut &b"abc"[..], &path).unwrap();

        assert_eq!(bytes, 3);
        assert_eq!(
            checksum,
            "sha256:ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
        assert_eq!(std::fs::read(&path).unwrap(), b"abc");
    }

    #[test]
    fn empty_link_is_rejected_before_any_request() {
        let dir = tempfile::tempdir().unwrap();
        let acquirer = HttpAcquirer::new(dir.path().join("dl"), None);
        let err = acquirer.acquire("  ", "Magisk Stub").unwrap_err();
        assert!(err.to_string().contains("Magisk Stub"));
        assert!(!dir.path().join("dl").exists());
    }
}
