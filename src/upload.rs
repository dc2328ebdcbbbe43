use std::fs;
use std::io::Result;
use std::path::Path;

/// Payload of an uploaded file.
pub trait Upload {
    /// Write the whole payload to `path`, replacing any existing file.
    fn write_to(&self, path: &Path) -> Result<()>;
}

impl Upload for [u8] {
    fn write_to(&self, path: &Path) -> Result<()> {
        fs::write(path, self)
    }
}

impl Upload for Vec<u8> {
    fn write_to(&self, path: &Path) -> Result<()> {
        self.as_slice().write_to(path)
    }
}

impl<U: Upload + ?Sized> Upload for &U {
    fn write_to(&self, path: &Path) -> Result<()> {
        (**self).write_to(path)
    }
}
