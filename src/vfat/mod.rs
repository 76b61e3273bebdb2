//! The FAT32 volume and file layer (FS-vol/FS-file, spec.md §2 C4/C5).

mod cache;
mod dirent;
mod ebpb;
mod fat;
mod file;
mod metadata;
mod volume;

pub use fat::{Cluster, Status};
pub use file::{Handle, OpenFiles, MAX_OPEN_FILES};
pub use metadata::{Attributes, Date, Metadata, Time};
pub use volume::Volume;
