use crate::cache::{Clock, DEFAULT_TTL, MemoryBank, SystemClock};
use crate::types::{FileMetadataRecord, is_excel_name};
use log::{debug, info, warn};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use walkdir::WalkDir;

pub const DEFAULT_DATA_DIR: &str = "data";

const LIST_OP: &str = "list_excel_files";
const METADATA_OP: &str = "get_excel_files_metadata";

#[derive(Debug, Error)]
pub enum ScanError {
    #[error("directory '{}' does not exist", .0.display())]
    Missing(PathBuf),
    #[error("cannot read '{}': {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

#[must_use]
pub fn cache_key(operation: &str, directory: &Path) -> String {
    format!("{operation}:{}", directory.display())
}

/// Memory bank for the scanner: one map per operation, one ttl and clock.
pub struct ScanCache<C = SystemClock> {
    files: MemoryBank<Vec<String>, C>,
    metadata: MemoryBank<Vec<FileMetadataRecord>, C>,
}

impl ScanCache<SystemClock> {
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self::with_clock(ttl, SystemClock)
    }
}

impl Default for ScanCache<SystemClock> {
    fn default() -> Self {
        Self::new(DEFAULT_TTL)
    }
}

impl<C: Clock + Clone> ScanCache<C> {
    #[must_use]
    pub fn with_clock(ttl: Duration, clock: C) -> Self {
        ScanCache {
            files: MemoryBank::with_clock(ttl, clock.clone()),
            metadata: MemoryBank::with_clock(ttl, clock),
        }
    }
}

impl<C: Clock> ScanCache<C> {
    #[must_use]
    pub fn ttl(&self) -> Duration {
        self.files.ttl()
    }

    pub fn len(&self) -> usize {
        self.files.len() + self.metadata.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Lists Excel files and their metadata, read-through a shared memory bank.
pub struct ExcelScanner<C: Clock = SystemClock> {
    cache: Arc<ScanCache<C>>,
}

impl<C: Clock> Clone for ExcelScanner<C> {
    fn clone(&self) -> Self {
        ExcelScanner {
            cache: Arc::clone(&self.cache),
        }
    }
}

impl<C: Clock> ExcelScanner<C> {
    #[must_use]
    pub fn new(cache: Arc<ScanCache<C>>) -> Self {
        ExcelScanner { cache }
    }

    #[must_use]
    pub fn cache(&self) -> &ScanCache<C> {
        &self.cache
    }

    /// Base names of the Excel files directly under `directory`.
    ///
    /// A missing or unreadable directory yields an empty list and is not cached.
    #[must_use]
    pub fn list_excel_files(&self, directory: &Path) -> Vec<String> {
        match self.cached_names(directory, scan_excel_names) {
            Ok(names) => names,
            Err(ScanError::Missing(path)) => {
                debug!("no data directory at {}", path.display());
                Vec::new()
            }
            Err(e) => {
                warn!("listing failed: {e}");
                Vec::new()
            }
        }
    }

    /// Size and modification time for every listed Excel file.
    ///
    /// Files that cannot be stat'd (removed since listing, permissions) are
    /// left out of the result.
    #[must_use]
    pub fn get_excel_files_metadata(&self, directory: &Path) -> Vec<FileMetadataRecord> {
        let key = cache_key(METADATA_OP, directory);
        let result = self
            .cache
            .metadata
            .read_through(&key, || self.collect_metadata(directory));

        match result {
            Ok(records) => records,
            Err(ScanError::Missing(_)) => Vec::new(),
            Err(e) => {
                warn!("metadata scan failed: {e}");
                Vec::new()
            }
        }
    }

    fn cached_names<F>(&self, directory: &Path, scan: F) -> Result<Vec<String>, ScanError>
    where
        F: FnOnce(&Path) -> Result<Vec<String>, ScanError>,
    {
        let key = cache_key(LIST_OP, directory);
        self.cache.files.read_through(&key, || scan(directory))
    }

    fn collect_metadata(&self, directory: &Path) -> Result<Vec<FileMetadataRecord>, ScanError> {
        let names = self.cached_names(directory, scan_excel_names)?;
        let mut records = Vec::with_capacity(names.len());

        for name in names {
            match stat_file(directory, name) {
                Ok(record) => records.push(record),
                Err(e) => debug!("skipping file: {e}"),
            }
        }

        Ok(records)
    }
}

impl Default for ExcelScanner<SystemClock> {
    fn default() -> Self {
        ExcelScanner::new(Arc::new(ScanCache::default()))
    }
}

/// Uncached directory listing, in filesystem enumeration order.
///
/// Names that are not valid UTF-8 are left out so every listed name can be
/// stat'd again by joining it to `directory`.
pub fn scan_excel_names(directory: &Path) -> Result<Vec<String>, ScanError> {
    match fs::metadata(directory) {
        Ok(m) if m.is_dir() => {}
        Ok(_) => return Err(ScanError::Missing(directory.to_path_buf())),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            return Err(ScanError::Missing(directory.to_path_buf()));
        }
        Err(source) => {
            return Err(ScanError::Io {
                path: directory.to_path_buf(),
                source,
            });
        }
    }

    let mut names = Vec::new();
    let walker = WalkDir::new(directory)
        .min_depth(1)
        .max_depth(1)
        .follow_links(true);

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            // The directory itself could not be read
            Err(e) if e.depth() == 0 => {
                return Err(ScanError::Io {
                    path: directory.to_path_buf(),
                    source: e.into(),
                });
            }
            Err(e) => {
                debug!("skipping entry: {e}");
                continue;
            }
        };

        if !entry.file_type().is_file() {
            continue;
        }
        let Some(name) = entry.file_name().to_str() else {
            debug!("skipping non UTF-8 name: {}", entry.path().display());
            continue;
        };
        if is_excel_name(name) {
            names.push(name.to_string());
        }
    }

    info!(
        "scanned {}: {} Excel file(s)",
        directory.display(),
        names.len()
    );
    Ok(names)
}

/// Size and mtime from one stat call.
pub fn stat_file(directory: &Path, name: String) -> Result<FileMetadataRecord, ScanError> {
    let path = directory.join(&name);
    let metadata = fs::metadata(&path).map_err(|source| ScanError::Io { path, source })?;
    Ok(FileMetadataRecord::from_metadata(name, &metadata))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::ManualClock;
    use std::cell::Cell;
    use tempfile::TempDir;

    fn write_file(dir: &Path, name: &str, len: usize) {
        fs::write(dir.join(name), vec![b'x'; len]).unwrap();
    }

    fn scanner_with_clock() -> (ExcelScanner<Arc<ManualClock>>, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new());
        let cache = ScanCache::with_clock(Duration::from_secs(10), Arc::clone(&clock));
        (ExcelScanner::new(Arc::new(cache)), clock)
    }

    fn sorted(mut v: Vec<String>) -> Vec<String> {
        v.sort();
        v
    }

    #[test]
    fn test_missing_directory_is_empty() {
        let tmp = TempDir::new().unwrap();
        let scanner: ExcelScanner = ExcelScanner::default();
        let missing = tmp.path().join("nope");

        assert!(scanner.list_excel_files(&missing).is_empty());
        assert!(scanner.get_excel_files_metadata(&missing).is_empty());
        // Nothing cached for a missing directory
        assert!(scanner.cache().is_empty());
    }

    #[test]
    fn test_file_path_is_not_a_directory() {
        let tmp = TempDir::new().unwrap();
        write_file(tmp.path(), "a.xlsx", 10);
        let scanner: ExcelScanner = ExcelScanner::default();

        assert!(scanner.list_excel_files(&tmp.path().join("a.xlsx")).is_empty());
    }

    #[test]
    fn test_lists_only_excel_files() {
        let tmp = TempDir::new().unwrap();
        write_file(tmp.path(), "a.xlsx", 100);
        write_file(tmp.path(), "b.txt", 5);
        write_file(tmp.path(), "C.XLS", 7);
        fs::create_dir(tmp.path().join("folder.xlsx")).unwrap();
        fs::create_dir(tmp.path().join("nested")).unwrap();
        write_file(&tmp.path().join("nested"), "deep.xlsx", 1);

        let scanner: ExcelScanner = ExcelScanner::default();
        let files = sorted(scanner.list_excel_files(tmp.path()));

        assert_eq!(files, vec!["C.XLS".to_string(), "a.xlsx".to_string()]);
    }

    #[test]
    fn test_metadata_scenario() {
        let tmp = TempDir::new().unwrap();
        write_file(tmp.path(), "a.xlsx", 100);
        write_file(tmp.path(), "b.txt", 3);
        let scanner: ExcelScanner = ExcelScanner::default();

        assert_eq!(scanner.list_excel_files(tmp.path()), vec!["a.xlsx"]);

        let meta = scanner.get_excel_files_metadata(tmp.path());
        assert_eq!(meta.len(), 1);
        assert_eq!(meta[0].name, "a.xlsx");
        assert_eq!(meta[0].size_bytes, 100);

        let mtime: chrono::DateTime<chrono::Local> = fs::metadata(tmp.path().join("a.xlsx"))
            .unwrap()
            .modified()
            .unwrap()
            .into();
        assert_eq!(meta[0].modified_at, mtime);
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_non_utf8_names_are_not_listed() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let tmp = TempDir::new().unwrap();
        write_file(tmp.path(), "ok.xlsx", 4);
        fs::write(tmp.path().join(OsStr::from_bytes(b"ventas_\xff.xlsx")), b"x").unwrap();
        let scanner: ExcelScanner = ExcelScanner::default();

        let listed = scanner.list_excel_files(tmp.path());
        assert_eq!(listed, vec!["ok.xlsx"]);

        // every listed name has a metadata record
        let meta = scanner.get_excel_files_metadata(tmp.path());
        assert_eq!(meta.len(), listed.len());
        assert_eq!(meta[0].name, "ok.xlsx");
    }

    #[test]
    fn test_failed_listing_is_not_cached() {
        let tmp = TempDir::new().unwrap();
        write_file(tmp.path(), "a.xlsx", 1);
        let (scanner, _clock) = scanner_with_clock();
        let calls = Cell::new(0);

        let unreadable = |dir: &Path| -> Result<Vec<String>, ScanError> {
            calls.set(calls.get() + 1);
            Err(ScanError::Io {
                path: dir.to_path_buf(),
                source: io::Error::from(io::ErrorKind::PermissionDenied),
            })
        };
        assert!(scanner.cached_names(tmp.path(), unreadable).is_err());
        assert!(scanner.cached_names(tmp.path(), unreadable).is_err());
        assert_eq!(calls.get(), 2);
        assert!(scanner.cache().is_empty());

        // the next real scan still sees the file
        assert_eq!(scanner.list_excel_files(tmp.path()), vec!["a.xlsx"]);
    }

    #[cfg(unix)]
    #[test]
    fn test_unreadable_directory_is_an_error() {
        use std::os::unix::fs::PermissionsExt;

        let tmp = TempDir::new().unwrap();
        let locked = tmp.path().join("locked");
        fs::create_dir(&locked).unwrap();
        write_file(&locked, "a.xlsx", 1);
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();

        // root ignores the mode bits
        let readable = fs::read_dir(&locked).is_ok();
        let result = scan_excel_names(&locked);
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();

        if !readable {
            assert!(matches!(result, Err(ScanError::Io { .. })));
        }
    }

    #[test]
    fn test_listing_cached_within_ttl() {
        let tmp = TempDir::new().unwrap();
        write_file(tmp.path(), "a.xlsx", 1);
        let (scanner, clock) = scanner_with_clock();

        let first = scanner.list_excel_files(tmp.path());
        write_file(tmp.path(), "b.xlsx", 1);
        clock.advance(Duration::from_secs(9));
        let second = scanner.list_excel_files(tmp.path());

        assert_eq!(first, second);
        assert_eq!(second, vec!["a.xlsx"]);
    }

    #[test]
    fn test_listing_refreshed_after_ttl() {
        let tmp = TempDir::new().unwrap();
        write_file(tmp.path(), "a.xlsx", 1);
        let (scanner, clock) = scanner_with_clock();

        assert_eq!(scanner.list_excel_files(tmp.path()).len(), 1);
        write_file(tmp.path(), "b.xlsx", 1);
        clock.advance(Duration::from_secs(10));

        assert_eq!(
            sorted(scanner.list_excel_files(tmp.path())),
            vec!["a.xlsx".to_string(), "b.xlsx".to_string()]
        );
    }

    #[test]
    fn test_metadata_skips_file_deleted_after_listing() {
        let tmp = TempDir::new().unwrap();
        write_file(tmp.path(), "keep.xlsx", 10);
        write_file(tmp.path(), "gone.xlsx", 20);
        let (scanner, _clock) = scanner_with_clock();

        // Listing is cached with both names, then one disappears
        assert_eq!(scanner.list_excel_files(tmp.path()).len(), 2);
        fs::remove_file(tmp.path().join("gone.xlsx")).unwrap();

        let meta = scanner.get_excel_files_metadata(tmp.path());
        assert_eq!(meta.len(), 1);
        assert_eq!(meta[0].name, "keep.xlsx");
        assert_eq!(meta[0].size_bytes, 10);
    }

    #[test]
    fn test_metadata_cached_within_ttl() {
        let tmp = TempDir::new().unwrap();
        write_file(tmp.path(), "a.xlsx", 10);
        let (scanner, clock) = scanner_with_clock();

        let first = scanner.get_excel_files_metadata(tmp.path());
        write_file(tmp.path(), "a.xlsx", 99);
        clock.advance(Duration::from_secs(5));
        assert_eq!(scanner.get_excel_files_metadata(tmp.path()), first);

        clock.advance(Duration::from_secs(5));
        assert_eq!(scanner.get_excel_files_metadata(tmp.path())[0].size_bytes, 99);
    }

    #[test]
    fn test_cache_keys_per_operation_and_directory() {
        let dir = Path::new("data");
        assert_eq!(cache_key(LIST_OP, dir), "list_excel_files:data");
        assert_eq!(cache_key(METADATA_OP, dir), "get_excel_files_metadata:data");

        let tmp = TempDir::new().unwrap();
        write_file(tmp.path(), "a.xlsx", 1);
        let scanner: ExcelScanner = ExcelScanner::default();
        let _ = scanner.get_excel_files_metadata(tmp.path());
        // metadata entry plus the listing it reads through
        assert_eq!(scanner.cache().len(), 2);
        assert_eq!(scanner.cache().ttl(), DEFAULT_TTL);
    }

    #[test]
    fn test_stat_file_missing() {
        let tmp = TempDir::new().unwrap();
        let err = stat_file(tmp.path(), "ghost.xlsx".to_string()).unwrap_err();
        assert!(matches!(err, ScanError::Io { .. }));
        assert!(err.to_string().contains("ghost.xlsx"));
    }
}
