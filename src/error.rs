use core::fmt;

/// Transport-agnostic error type shared by the SD block device and the FAT32
/// volume/file layer.
///
/// `Eof` is a normal terminal result for reads, not a fault; every other
/// variant denotes a failed operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// The physical layer reported an I/O failure not covered below.
    Io,
    /// A bounded busy-poll or data-token wait exceeded its deadline.
    CardTimeout,
    /// The card rejected a command or a written block (CRC/write error).
    CardRejected,
    /// An MBR or VBR signature did not match `0xAA55`.
    BadSignature,
    /// No FAT32 (type `0x0B`) partition entry was found.
    UnsupportedPartition,
    /// The volume's logical sector size is not 512 bytes.
    UnsupportedSectorSize,
    /// No directory entry matched the requested name.
    NotFound,
    /// The open-file table has no free slot.
    TooManyOpen,
    /// The handle index is out of range or its slot is not occupied.
    InvalidHandle,
    /// The read cursor was already at (or the read consumed up to) the
    /// file's end.
    Eof,
    /// The requested write would extend the file past its current
    /// allocation; this engine never allocates new clusters.
    WouldGrow,
    /// A FAT chain walk terminated before reaching the requested cluster
    /// offset.
    ChainTruncated,
    /// A caller-supplied argument violated a documented precondition
    /// (e.g. an 8.3 name with invalid characters, a seek past EOF).
    BadArgument,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            Error::Io => "I/O error",
            Error::CardTimeout => "SD card operation timed out",
            Error::CardRejected => "SD card rejected the command or block",
            Error::BadSignature => "bad MBR/VBR signature",
            Error::UnsupportedPartition => "no FAT32 partition found",
            Error::UnsupportedSectorSize => "sector size is not 512 bytes",
            Error::NotFound => "entry not found",
            Error::TooManyOpen => "no free file handle",
            Error::InvalidHandle => "invalid file handle",
            Error::Eof => "end of file",
            Error::WouldGrow => "write would extend file past its allocation",
            Error::ChainTruncated => "FAT chain ended before requested cluster",
            Error::BadArgument => "invalid argument",
        };
        f.write_str(msg)
    }
}

#[cfg(feature = "std")]
impl std::error::Error for Error {}

pub type Result<T> = core::result::Result<T, Error>;
