/*!
 * Workspace Store
 * Persists unit source files under a single workspace directory
 */

use crate::core::{SupervisorError, SupervisorResult, UnitId};
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// On-disk home for unit sources, one file per unit id
#[derive(Debug, Clone)]
pub struct WorkspaceStore {
    root: PathBuf,
    extension: String,
}

impl WorkspaceStore {
    /// Open (and create if missing) a workspace rooted at `root`
    pub fn open<P: Into<PathBuf>>(root: P, extension: &str) -> SupervisorResult<Self> {
        let root = root.into();
        fs::create_dir_all(&root).map_err(|e| io_failure("create workspace", &root, e))?;

        // Children run with the workspace as cwd, so keep the path absolute
        let root = fs::canonicalize(&root).map_err(|e| io_failure("resolve workspace", &root, e))?;

        info!(workspace = %root.display(), "Workspace store opened");
        Ok(Self {
            root,
            extension: extension.to_string(),
        })
    }

    /// Workspace directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Deterministic source location for an id
    pub fn path_for(&self, id: &UnitId) -> PathBuf {
        self.root.join(format!("{}.{}", id, self.extension))
    }

    /// Persist source bytes for `id` and return the final path
    ///
    /// Content goes to a temporary sibling first and is renamed into place,
    /// so a reader never sees a partially written file.
    pub fn save(&self, id: &UnitId, source: &[u8]) -> SupervisorResult<PathBuf> {
        let path = self.path_for(id);
        let tmp = self.root.join(format!(".{}.{}.tmp", id, self.extension));

        let write = || -> std::io::Result<()> {
            let mut file = fs::File::create(&tmp)?;
            file.write_all(source)?;
            file.sync_all()?;
            fs::rename(&tmp, &path)
        };

        if let Err(e) = write() {
            let _ = fs::remove_file(&tmp);
            return Err(io_failure("save source", &path, e));
        }

        debug!(unit_id = %id, path = %path.display(), bytes = source.len(), "Source saved");
        Ok(path)
    }

    /// Delete the source for `id`; a missing file is not an error
    pub fn remove(&self, id: &UnitId) -> SupervisorResult<()> {
        let path = self.path_for(id);
        match fs::remove_file(&path) {
            Ok(()) => {
                debug!(unit_id = %id, path = %path.display(), "Source removed");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(io_failure("remove source", &path, e)),
        }
    }
}

fn io_failure(action: &str, path: &Path, err: std::io::Error) -> SupervisorError {
    SupervisorError::IoFailure(format!("{} {}: {}", action, path.display(), err))
}
