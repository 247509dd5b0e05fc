//! OPC (Open Packaging Conventions) container handling.
//!
//! An `.xlsx` file is a ZIP archive whose parts are addressed by name. The
//! container checks for `[Content_Types].xml` on open and enforces
//! [`ContainerLimits`] on every part it inflates, so a hostile archive
//! cannot exhaust memory.

use std::io::{Read, Seek};

use thiserror::Error;
use zip::ZipArchive;
use zip::result::ZipError;

use crate::error_codes;

const CONTENT_TYPES_PART: &str = "[Content_Types].xml";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContainerLimits {
    pub max_entries: usize,
    pub max_part_uncompressed_bytes: u64,
    pub max_total_uncompressed_bytes: u64,
}

impl Default for ContainerLimits {
    fn default() -> Self {
        Self {
            max_entries: 10_000,
            max_part_uncompressed_bytes: 100 * 1024 * 1024,
            max_total_uncompressed_bytes: 500 * 1024 * 1024,
        }
    }
}

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ContainerError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("ZIP error in '{part}': {reason}")]
    Zip { part: String, reason: String },
    #[error("not a ZIP container")]
    NotZipContainer,
    #[error("not an OPC package (missing [Content_Types].xml)")]
    NotOpcPackage,
    #[error("archive has too many entries: {entries} (limit: {max_entries})")]
    TooManyEntries { entries: usize, max_entries: usize },
    #[error("part '{part}' is too large: {size} bytes (limit: {limit} bytes)")]
    PartTooLarge { part: String, size: u64, limit: u64 },
    #[error("total uncompressed size exceeds limit of {limit} bytes")]
    TotalTooLarge { limit: u64 },
    #[error("missing part '{part}'")]
    MissingPart { part: String },
}

impl ContainerError {
    pub fn code(&self) -> &'static str {
        match self {
            ContainerError::Io(_) => error_codes::CONTAINER_IO,
            ContainerError::Zip { .. } | ContainerError::MissingPart { .. } => {
                error_codes::CONTAINER_ZIP
            }
            ContainerError::NotZipContainer => error_codes::CONTAINER_NOT_ZIP,
            ContainerError::NotOpcPackage => error_codes::CONTAINER_NOT_OPC,
            ContainerError::TooManyEntries { .. } => error_codes::CONTAINER_TOO_MANY_ENTRIES,
            ContainerError::PartTooLarge { .. } => error_codes::CONTAINER_PART_TOO_LARGE,
            ContainerError::TotalTooLarge { .. } => error_codes::CONTAINER_TOTAL_TOO_LARGE,
        }
    }
}

pub(crate) trait ReadSeek: Read + Seek {}
impl<T: Read + Seek> ReadSeek for T {}

/// An opened OPC package with a running budget of inflated bytes.
pub struct OpcContainer {
    archive: ZipArchive<Box<dyn ReadSeek>>,
    limits: ContainerLimits,
    inflated: u64,
}

impl std::fmt::Debug for OpcContainer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpcContainer")
            .field("entries", &self.archive.len())
            .field("limits", &self.limits)
            .field("inflated", &self.inflated)
            .finish()
    }
}

impl OpcContainer {
    pub fn open<R: Read + Seek + 'static>(reader: R) -> Result<OpcContainer, ContainerError> {
        Self::open_with_limits(reader, ContainerLimits::default())
    }

    pub fn open_with_limits<R: Read + Seek + 'static>(
        reader: R,
        limits: ContainerLimits,
    ) -> Result<OpcContainer, ContainerError> {
        let reader: Box<dyn ReadSeek> = Box::new(reader);
        let mut archive = ZipArchive::new(reader).map_err(|err| match err {
            ZipError::InvalidArchive(_) | ZipError::UnsupportedArchive(_) => {
                ContainerError::NotZipContainer
            }
            ZipError::Io(e) => ContainerError::Io(e),
            other => ContainerError::Zip {
                part: String::new(),
                reason: other.to_string(),
            },
        })?;

        if archive.len() > limits.max_entries {
            return Err(ContainerError::TooManyEntries {
                entries: archive.len(),
                max_entries: limits.max_entries,
            });
        }

        if archive.by_name(CONTENT_TYPES_PART).is_err() {
            return Err(ContainerError::NotOpcPackage);
        }

        Ok(OpcContainer {
            archive,
            limits,
            inflated: 0,
        })
    }

    /// Inflate a part, charging its declared size against the limits first.
    pub fn read_part(&mut self, name: &str) -> Result<Vec<u8>, ContainerError> {
        let mut file = self.archive.by_name(name).map_err(|err| match err {
            ZipError::FileNotFound => ContainerError::MissingPart {
                part: name.to_string(),
            },
            other => ContainerError::Zip {
                part: name.to_string(),
                reason: other.to_string(),
            },
        })?;

        let size = file.size();
        if size > self.limits.max_part_uncompressed_bytes {
            return Err(ContainerError::PartTooLarge {
                part: name.to_string(),
                size,
                limit: self.limits.max_part_uncompressed_bytes,
            });
        }
        let total = self.inflated.saturating_add(size);
        if total > self.limits.max_total_uncompressed_bytes {
            return Err(ContainerError::TotalTooLarge {
                limit: self.limits.max_total_uncompressed_bytes,
            });
        }

        let mut buf = Vec::with_capacity(size.min(1 << 20) as usize);
        file.read_to_end(&mut buf)
            .map_err(|err| ContainerError::Zip {
                part: name.to_string(),
                reason: err.to_string(),
            })?;
        self.inflated = total;
        Ok(buf)
    }

    /// Like [`read_part`](Self::read_part) but a missing part is `Ok(None)`.
    pub fn read_optional_part(&mut self, name: &str) -> Result<Option<Vec<u8>>, ContainerError> {
        match self.read_part(name) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(ContainerError::MissingPart { .. }) => Ok(None),
            Err(err) => Err(err),
        }
    }

    pub fn part_names(&self) -> impl Iterator<Item = &str> {
        self.archive.file_names()
    }

    pub fn len(&self) -> usize {
        self.archive.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn limits(&self) -> &ContainerLimits {
        &self.limits
    }
}
