use super::*;
use std::fs::Metadata;
#[cfg(unix)]
use std::os::unix::fs::MetadataExt;

const DEFAULT_DIR_READ_TIMEOUT: Duration = Duration::from_secs(5);

/// Recursive byte size of a path. Implementations never fail: whatever
/// cannot be read is left out and the result is a lower bound.
pub trait SizeMeasure: Send + Sync {
    fn measure(&self, path: &Path) -> u64;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(super) struct SizeComputation {
    pub(super) bytes: u64,
    pub(super) files: u64,
    pub(super) dirs: u64,
    pub(super) skipped: u64,
    pub(super) truncated: bool,
}

#[cfg(unix)]
pub(super) type DirIdentity = (u64, u64);
#[cfg(not(unix))]
pub(super) type DirIdentity = PathBuf;

#[cfg(unix)]
fn dir_identity(_path: &Path, meta: &Metadata) -> Option<DirIdentity> {
    Some((meta.dev(), meta.ino()))
}

#[cfg(not(unix))]
fn dir_identity(path: &Path, _meta: &Metadata) -> Option<DirIdentity> {
    fs::canonicalize(path).ok()
}

/// One directory read: file bytes plus the subdirectories to descend into.
#[derive(Debug, Default)]
pub(super) struct DirListing {
    pub(super) bytes: u64,
    pub(super) files: u64,
    pub(super) skipped: u64,
    pub(super) unreadable: bool,
    /// `None` identity: the directory could not be identified and is skipped.
    pub(super) subdirs: Vec<(PathBuf, Option<DirIdentity>)>,
}

pub(super) type DirReader = fn(&Path, bool) -> DirListing;

pub(super) fn read_directory(dir: &Path, follow_directory_symlinks: bool) -> DirListing {
    let mut listing = DirListing::default();
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(_) => {
            listing.unreadable = true;
            return listing;
        }
    };

    for entry in entries {
        let Ok(entry) = entry else {
            listing.skipped += 1;
            continue;
        };
        let entry_path = entry.path();
        let meta = match fs::symlink_metadata(&entry_path) {
            Ok(meta) => meta,
            Err(_) => {
                listing.skipped += 1;
                continue;
            }
        };

        if meta.is_file() {
            listing.bytes = listing.bytes.saturating_add(meta.len());
            listing.files += 1;
            continue;
        }

        let dir_meta = if meta.is_dir() {
            meta
        } else if meta.file_type().is_symlink() && follow_directory_symlinks {
            match fs::metadata(&entry_path) {
                Ok(target) if target.is_dir() => target,
                // File links are not counted; the target is sized where it lives.
                Ok(_) => continue,
                Err(_) => {
                    listing.skipped += 1;
                    continue;
                }
            }
        } else {
            continue;
        };

        let identity = dir_identity(&entry_path, &dir_meta);
        listing.subdirs.push((entry_path, identity));
    }
    listing
}

#[derive(Debug)]
enum RootEntry {
    Unreadable,
    Ignored,
    File(u64),
    Dir(Option<DirIdentity>),
}

fn stat_root(path: &Path, follow_directory_symlinks: bool) -> RootEntry {
    let meta = match fs::symlink_metadata(path) {
        Ok(meta) => meta,
        Err(_) => return RootEntry::Unreadable,
    };
    let meta = if meta.file_type().is_symlink() {
        if !follow_directory_symlinks {
            return RootEntry::Ignored;
        }
        match fs::metadata(path) {
            Ok(target) if target.is_dir() => target,
            Ok(_) => return RootEntry::Ignored,
            Err(_) => return RootEntry::Unreadable,
        }
    } else {
        meta
    };

    if meta.is_file() {
        RootEntry::File(meta.len())
    } else if meta.is_dir() {
        RootEntry::Dir(dir_identity(path, &meta))
    } else {
        RootEntry::Ignored
    }
}

enum IoRequest {
    Root(PathBuf),
    Dir(PathBuf),
}

enum IoReply {
    Root(RootEntry),
    Dir(DirListing),
}

fn serve(request: IoRequest, follow_directory_symlinks: bool, reader: DirReader) -> IoReply {
    match request {
        IoRequest::Root(path) => IoReply::Root(stat_root(&path, follow_directory_symlinks)),
        IoRequest::Dir(path) => IoReply::Dir(reader(&path, follow_directory_symlinks)),
    }
}

struct IoLane {
    requests: mpsc::Sender<IoRequest>,
    replies: mpsc::Receiver<IoReply>,
}

/// Filesystem calls of one walk. With a timeout they run on a helper thread;
/// a call that does not answer in time is given up together with its thread
/// and the next call starts a fresh helper.
struct WalkIo {
    follow_directory_symlinks: bool,
    reader: DirReader,
    timeout: Option<Duration>,
    lane: Option<IoLane>,
}

impl WalkIo {
    fn call(&mut self, request: IoRequest, deadline: Option<Instant>) -> Option<IoReply> {
        let Some(timeout) = self.timeout else {
            return Some(serve(request, self.follow_directory_symlinks, self.reader));
        };
        if self.lane.is_none() {
            self.lane = self.spawn_lane();
        }
        let Some(lane) = self.lane.as_ref() else {
            return Some(serve(request, self.follow_directory_symlinks, self.reader));
        };

        let wait = deadline.map_or(timeout, |deadline| {
            timeout.min(deadline.saturating_duration_since(Instant::now()))
        });
        if lane.requests.send(request).is_err() {
            self.lane = None;
            return None;
        }
        match lane.replies.recv_timeout(wait) {
            Ok(reply) => Some(reply),
            Err(_) => {
                self.lane = None;
                None
            }
        }
    }

    fn spawn_lane(&mut self) -> Option<IoLane> {
        let (request_sender, request_receiver) = mpsc::channel::<IoRequest>();
        let (reply_sender, reply_receiver) = mpsc::channel::<IoReply>();
        let follow_directory_symlinks = self.follow_directory_symlinks;
        let reader = self.reader;

        let spawned = std::thread::Builder::new()
            .name("appscope-size-io".to_string())
            .spawn(move || {
                for request in request_receiver {
                    let reply = serve(request, follow_directory_symlinks, reader);
                    if reply_sender.send(reply).is_err() {
                        break;
                    }
                }
            });
        match spawned {
            Ok(_) => Some(IoLane {
                requests: request_sender,
                replies: reply_receiver,
            }),
            Err(error) => {
                tracing::warn!(event = "size_io_thread_unavailable", error = error.to_string());
                self.timeout = None;
                None
            }
        }
    }
}

/// Breadth-first filesystem walker.
#[derive(Clone)]
pub struct FsSizeMeasure {
    follow_directory_symlinks: bool,
    budget: Option<Duration>,
    dir_read_timeout: Option<Duration>,
    reader: DirReader,
}

impl std::fmt::Debug for FsSizeMeasure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FsSizeMeasure")
            .field("follow_directory_symlinks", &self.follow_directory_symlinks)
            .field("budget", &self.budget)
            .field("dir_read_timeout", &self.dir_read_timeout)
            .finish()
    }
}

impl Default for FsSizeMeasure {
    fn default() -> Self {
        Self::new(true, None)
    }
}

impl FsSizeMeasure {
    pub fn new(follow_directory_symlinks: bool, budget: Option<Duration>) -> Self {
        Self {
            follow_directory_symlinks,
            budget,
            dir_read_timeout: Some(DEFAULT_DIR_READ_TIMEOUT),
            reader: read_directory,
        }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(config.follow_directory_symlinks, config.walk_budget())
            .with_dir_read_timeout(Some(config.dir_read_timeout()))
    }

    /// `None` reads inline on the calling thread.
    pub fn with_dir_read_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.dir_read_timeout = timeout;
        self
    }

    #[cfg(test)]
    pub(super) fn with_reader(mut self, reader: DirReader) -> Self {
        self.reader = reader;
        self
    }

    pub(super) fn compute(&self, path: &Path) -> SizeComputation {
        let mut result = SizeComputation::default();
        let mut io = WalkIo {
            follow_directory_symlinks: self.follow_directory_symlinks,
            reader: self.reader,
            timeout: self.dir_read_timeout,
            lane: None,
        };

        let root_identity = match io.call(IoRequest::Root(path.to_path_buf()), None) {
            Some(IoReply::Root(RootEntry::Dir(identity))) => identity,
            Some(IoReply::Root(RootEntry::File(len))) => {
                result.bytes = len;
                result.files = 1;
                return result;
            }
            Some(IoReply::Root(RootEntry::Ignored)) => return result,
            _ => {
                result.skipped += 1;
                return result;
            }
        };

        let deadline = self.budget.map(|budget| Instant::now() + budget);
        let mut visited: HashSet<DirIdentity> = HashSet::new();
        if let Some(identity) = root_identity {
            visited.insert(identity);
        }
        let mut queue = VecDeque::new();
        queue.push_back(path.to_path_buf());

        while let Some(dir) = queue.pop_front() {
            if deadline.is_some_and(|deadline| Instant::now() >= deadline) {
                result.truncated = true;
                break;
            }
            result.dirs += 1;

            let listing = match io.call(IoRequest::Dir(dir), deadline) {
                Some(IoReply::Dir(listing)) => listing,
                _ => {
                    if deadline.is_some_and(|deadline| Instant::now() >= deadline) {
                        result.truncated = true;
                        break;
                    }
                    result.skipped += 1;
                    continue;
                }
            };
            if listing.unreadable {
                result.skipped += 1;
                continue;
            }

            result.bytes = result.bytes.saturating_add(listing.bytes);
            result.files += listing.files;
            result.skipped += listing.skipped;
            for (subdir, identity) in listing.subdirs {
                match identity {
                    Some(identity) => {
                        if visited.insert(identity) {
                            queue.push_back(subdir);
                        }
                    }
                    None => result.skipped += 1,
                }
            }
        }

        result
    }
}

impl SizeMeasure for FsSizeMeasure {
    fn measure(&self, path: &Path) -> u64 {
        let started_at = Instant::now();
        let computation = self.compute(path);
        if computation.skipped > 0 || computation.truncated {
            tracing::debug!(
                event = "size_walk_degraded",
                path = %sanitize_path(path),
                bytes = computation.bytes,
                files = computation.files,
                dirs = computation.dirs,
                skipped = computation.skipped,
                truncated = computation.truncated,
                elapsed_ms = started_at.elapsed().as_millis() as u64
            );
        }
        computation.bytes
    }
}

#[cfg(test)]
#[path = "../../tests/app_manager/size_tests.rs"]
mod size_tests;
