use std::fs::{self, File};
use std::io::{Result, Write};
use std::path::{Path, PathBuf};

const TEMP_PREFIX: &str = ".tmp-";

/// Scratch file living next to its destination, removed on drop unless
/// it has been persisted.
pub struct TmpFile {
    file: File,
    path: PathBuf,
    persisted: bool,
}

impl TmpFile {
    pub fn create_in(temp_dir: impl AsRef<Path>) -> Result<Self> {
        let filename: String = std::iter::repeat_with(fastrand::alphanumeric)
            .take(10)
            .collect();
        let path = temp_dir
            .as_ref()
            .join(format!("{TEMP_PREFIX}{filename}"));
        let file = File::create(&path)?;
        Ok(Self {
            file,
            path,
            persisted: false,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Flush to disk and move the file over `dest`.
    pub fn persist(mut self, dest: impl AsRef<Path>) -> Result<()> {
        self.file.sync_data()?;
        fs::rename(&self.path, dest.as_ref())?;
        self.persisted = true;
        Ok(())
    }
}

impl std::io::Write for &TmpFile {
    fn write(&mut self, buf: &[u8]) -> Result<usize> {
        (&self.file).write(buf)
    }

    fn flush(&mut self) -> Result<()> {
        (&self.file).flush()
    }
}

impl Drop for TmpFile {
    fn drop(&mut self) {
        if !self.persisted {
            let _ = fs::remove_file(&self.path);
        }
    }
}

fn parent_dir(dest: &Path) -> Result<&Path> {
    dest.parent().ok_or_else(|| {
        std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            "`dest` must have a parent directory",
        )
    })
}

/// Write `data` to a temporary sibling of `dest` and rename it into place,
/// so readers never observe a partially written file.
pub fn write_atomic(dest: impl AsRef<Path>, data: &[u8]) -> Result<()> {
    let dest = dest.as_ref();
    let tmp = TmpFile::create_in(parent_dir(dest)?)?;
    (&tmp).write_all(data)?;
    (&tmp).flush()?;
    tmp.persist(dest)
}

/// Same as [`write_atomic`] but lets `fill` write into the temporary path
/// itself. Nothing is left behind if `fill` fails.
pub fn write_atomic_with(
    dest: impl AsRef<Path>,
    fill: impl FnOnce(&Path) -> Result<()>,
) -> Result<()> {
    let dest = dest.as_ref();
    let tmp = TmpFile::create_in(parent_dir(dest)?)?;
    fill(tmp.path())?;
    tmp.persist(dest)
}
