//! Archive member access
//!
//! The batch pipeline needs three things from a container: the member list,
//! a membership test and the full byte stream of one member. `MemberSource`
//! captures that contract; `TarArchive` implements it for POSIX tar.

use std::collections::HashMap;
use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

/// Read access to the named members of one archive
pub trait MemberSource {
    /// Member names in archive order
    fn member_names(&self) -> Vec<String>;

    /// Whether `name` is a readable member
    fn contains(&self, name: &str) -> bool;

    /// Copy the full content of `name` into `writer`, returning bytes copied
    fn copy_member(&mut self, name: &str, writer: &mut dyn Write) -> io::Result<u64>;
}

/// Location of one regular-file member inside the tar stream
#[derive(Debug, Clone, Copy)]
struct MemberLocation {
    data_offset: u64,
    size: u64,
}

/// Tar archive opened for random member reads
///
/// Opening walks the headers once and records where each regular file's data
/// starts; later reads seek straight to it.
#[derive(Debug)]
pub struct TarArchive {
    path: PathBuf,
    file: File,
    names: Vec<String>,
    index: HashMap<String, MemberLocation>,
}

impl TarArchive {
    /// Open `path` and index its regular-file members
    pub fn open(path: &Path) -> io::Result<Self> {
        let file = File::open(path)?;
        let mut archive = tar::Archive::new(file);

        let mut names = Vec::new();
        let mut index = HashMap::new();

        // Headers only: member data is skipped by seeking, not read
        for entry in archive.entries_with_seek()? {
            let entry = entry?;
            if !entry.header().entry_type().is_file() {
                continue;
            }

            let name = entry.path()?.to_string_lossy().into_owned();
            let location = MemberLocation {
                data_offset: entry.raw_file_position(),
                size: entry.size(),
            };

            // A repeated name refers to its last occurrence, as tar extraction would
            if index.insert(name.clone(), location).is_none() {
                names.push(name);
            }
        }

        tracing::debug!(
            archive = %path.display(),
            members = names.len(),
            "Indexed archive members"
        );

        Ok(Self {
            path: path.to_path_buf(),
            file: archive.into_inner(),
            names,
            index,
        })
    }
}

impl MemberSource for TarArchive {
    fn member_names(&self) -> Vec<String> {
        self.names.clone()
    }

    fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    fn copy_member(&mut self, name: &str, writer: &mut dyn Write) -> io::Result<u64> {
        let location = *self.index.get(name).ok_or_else(|| {
            io::Error::new(io::ErrorKind::NotFound, format!("{} is not a member", name))
        })?;

        self.file.seek(SeekFrom::Start(location.data_offset))?;
        let copied = io::copy(&mut (&mut self.file).take(location.size), writer)?;

        if copied != location.size {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!(
                    "{} truncated in {}: {} of {} bytes",
                    name,
                    self.path.display(),
                    copied,
                    location.size
                ),
            ));
        }

        Ok(copied)
    }
}
