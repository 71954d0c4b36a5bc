use std::fs;
use std::io::{BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use tracing::{debug, warn};

use crate::blog_post::BlogPost;
use crate::error::{Error, Result};

/// Keeps every post in a single JSON array on disk.
#[derive(Clone, Debug)]
pub struct PostStorage {
    path: PathBuf,
}

impl PostStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads the full post list.
    ///
    /// A missing file, or one that is not JSON at all, is replaced with an
    /// empty list. Well-formed JSON that does not hold posts is an error and
    /// the file is left alone.
    pub fn load_posts(&self) -> Result<Vec<BlogPost>> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(source) if source.kind() == ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "posts file missing, creating it");
                self.save_posts(&[])?;
                return Ok(Vec::new());
            }
            Err(source) => {
                return Err(Error::Io {
                    path: self.path.clone(),
                    source,
                })
            }
        };

        match serde_json::from_str(&raw) {
            Ok(posts) => Ok(posts),
            Err(err) if err.is_syntax() || err.is_eof() => {
                warn!(path = %self.path.display(), error = %err, "posts file unreadable, resetting it");
                self.save_posts(&[])?;
                Ok(Vec::new())
            }
            Err(err) => Err(Error::Json(err)),
        }
    }

    /// Overwrites the file with `posts`, indented by four spaces.
    pub fn save_posts(&self, posts: &[BlogPost]) -> Result<()> {
        let io_err = |source| Error::Io {
            path: self.path.clone(),
            source,
        };

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| Error::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let file = fs::File::create(&self.path).map_err(io_err)?;
        let mut writer = BufWriter::new(file);
        let mut serializer =
            serde_json::Serializer::with_formatter(&mut writer, PrettyFormatter::with_indent(b"    "));
        posts.serialize(&mut serializer).map_err(|err| {
            if err.is_io() {
                io_err(err.into())
            } else {
                Error::Json(err)
            }
        })?;
        writer.flush().map_err(io_err)?;
        debug!(path = %self.path.display(), count = posts.len(), "saved posts");
        Ok(())
    }
}
