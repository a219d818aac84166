use anyhow::{Context, Result, anyhow};
use flate2::Compression;
use flate2::write::GzEncoder;
use std::fmt;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileSize {
    pub path: PathBuf,
    pub raw: usize,
    pub gzip: usize,
}

/// Sizes of several artifacts, each compared against the first one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SizeReport {
    pub files: Vec<FileSize>,
}

impl SizeReport {
    /// `(raw, gzip)` byte differences of every file against the first
    pub fn deltas(&self) -> Vec<(i64, i64)> {
        let Some(baseline) = self.files.first() else {
            return Vec::new();
        };
        self.files
            .iter()
            .map(|file| {
                (
                    signed(file.raw) - signed(baseline.raw),
                    signed(file.gzip) - signed(baseline.gzip),
                )
            })
            .collect()
    }
}

fn signed(size: usize) -> i64 {
    i64::try_from(size).unwrap_or(i64::MAX)
}

impl fmt::Display for SizeReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{:>8} {:>8} Filename", "raw", "gz")?;
        for (file, (raw_delta, gzip_delta)) in self.files.iter().zip(self.deltas()) {
            write!(f, "{:>8} {:>8} {}", file.raw, file.gzip, file.path.display())?;
            if raw_delta != 0 || gzip_delta != 0 {
                write!(f, " ({:+} / {:+})", raw_delta, gzip_delta)?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

fn gzip_size(content: &[u8]) -> Result<usize> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::best());
    encoder.write_all(content)?;
    Ok(encoder.finish()?.len())
}

fn measure(path: &Path) -> Result<FileSize> {
    let content = fs::read(path).with_context(|| format!("Failed to read {:?}", path))?;
    Ok(FileSize {
        path: path.to_path_buf(),
        raw: content.len(),
        gzip: gzip_size(&content).with_context(|| format!("Failed to gzip {:?}", path))?,
    })
}

/// Measure raw and gzipped sizes of `files`.
pub fn compare_size(files: &[PathBuf]) -> Result<SizeReport> {
    if files.is_empty() {
        return Err(anyhow!("No files to compare"));
    }
    let files = files
        .iter()
        .map(|path| measure(path))
        .collect::<Result<Vec<_>>>()?;
    Ok(SizeReport { files })
}
