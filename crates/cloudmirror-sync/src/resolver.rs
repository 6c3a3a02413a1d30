//! Conflict renaming
//!
//! A file never overwrites an existing destination entry. When its name is
//! taken, by a file or by a folder, it is uploaded as
//! `stem_YYYYMMDD_HHMMSS.ext` instead. If that name is taken as well, a
//! counter is appended to the stem: `stem_YYYYMMDD_HHMMSS_2.ext`,
//! `stem_YYYYMMDD_HHMMSS_3.ext` and so on.
//!
//! Folders are never renamed; the walker reuses an existing folder of the
//! same name.

use std::sync::Arc;

use chrono::{Local, NaiveDateTime};

use cloudmirror_core::domain::EntryKind;

/// Timestamp inserted into renamed files, second resolution
const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// Source of the wall-clock time used in renamed files
pub type Clock = Arc<dyn Fn() -> NaiveDateTime + Send + Sync>;

/// What currently holds a name in a destination folder
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Occupancy {
    Free,
    OccupiedByFolder,
    OccupiedByFile,
}

impl Occupancy {
    pub fn of(existing: Option<EntryKind>) -> Self {
        match existing {
            None => Occupancy::Free,
            Some(EntryKind::Folder) => Occupancy::OccupiedByFolder,
            Some(EntryKind::File) => Occupancy::OccupiedByFile,
        }
    }

    pub fn is_free(self) -> bool {
        self == Occupancy::Free
    }
}

impl std::fmt::Display for Occupancy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Occupancy::Free => write!(f, "free"),
            Occupancy::OccupiedByFolder => write!(f, "folder"),
            Occupancy::OccupiedByFile => write!(f, "file"),
        }
    }
}

/// Generates replacement names for files whose name is taken
#[derive(Clone)]
pub struct ConflictResolver {
    clock: Clock,
}

impl ConflictResolver {
    /// Resolver stamping names with the local wall-clock time
    pub fn new() -> Self {
        Self::with_clock(Arc::new(|| Local::now().naive_local()))
    }

    pub fn with_clock(clock: Clock) -> Self {
        Self { clock }
    }

    /// Appends the current timestamp to the stem of `name`
    ///
    /// Given "doc.txt" at 2024-03-05 14:07:09, produces
    /// "doc_20240305_140709.txt".
    pub fn timestamped(&self, name: &str) -> String {
        let (stem, ext) = split_extension(name);
        let stamp = (self.clock)().format(TIMESTAMP_FORMAT);
        format!("{stem}_{stamp}{ext}")
    }

    /// Replacement names to try, in order
    ///
    /// The first is [`timestamped`](Self::timestamped); the rest add
    /// `_2`, `_3`, ... to its stem. The sequence never ends, so callers stop
    /// at the first free candidate. The clock is read once per call.
    pub fn candidates(&self, name: &str) -> impl Iterator<Item = String> {
        let (stem, ext) = split_extension(name);
        let stamp = (self.clock)().format(TIMESTAMP_FORMAT).to_string();
        let base = format!("{stem}_{stamp}");
        let ext = ext.to_string();

        let first = format!("{base}{ext}");
        std::iter::once(first).chain((2u64..).map(move |n| format!("{base}_{n}{ext}")))
    }
}

impl Default for ConflictResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ConflictResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConflictResolver").finish_non_exhaustive()
    }
}

/// Splits `name` into stem and extension at the last dot
///
/// Leading dots belong to the stem, so ".bashrc" has no extension. The
/// extension keeps its dot; "a." splits into ("a", ".").
pub fn split_extension(name: &str) -> (&str, &str) {
    match name.rfind('.') {
        Some(dot) if name[..dot].chars().any(|c| c != '.') => (&name[..dot], &name[dot..]),
        _ => (name, ""),
    }
}
