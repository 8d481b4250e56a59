use std::fmt::{self, Display, Formatter};
use std::io;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Return-code style error taxonomy, mirroring the original library's
/// `NOMEMCARD`/`OUTOFBLOCKS`/... integer codes as named variants.
#[derive(Debug)]
pub enum Error {
    /// The card is not in a valid state; every operation short-circuits
    /// with this once `Card::load` or `Card::format` has failed.
    NoMemCard,
    /// A precondition failed in a way with no more specific code (e.g. a
    /// BAT chain walk produced an invalid next-block).
    Fail,
    OpenFail,
    WriteFail,
    OutOfBlocks,
    OutOfDirEntries,
    TitlePresent,
    InvalidFileSize,
    LengthFail,
    GcsFail,
    SavFail,
    DeleteFail,
    Io(io::Error),
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        use Error as E;

        match self {
            E::NoMemCard => write!(f, "memory card is not valid"),
            E::Fail => write!(f, "operation failed"),
            E::OpenFail => write!(f, "failed to open file"),
            E::WriteFail => write!(f, "failed to write file"),
            E::OutOfBlocks => write!(f, "not enough free blocks on the memory card"),
            E::OutOfDirEntries => write!(f, "directory is full"),
            E::TitlePresent => write!(f, "a save with this game code and filename already exists"),
            E::InvalidFileSize => write!(f, "save has an invalid block count"),
            E::LengthFail => write!(f, "envelope length does not match its block count"),
            E::GcsFail => write!(f, "GCS envelope has an invalid magic header"),
            E::SavFail => write!(f, "SAV envelope has an invalid magic header"),
            E::DeleteFail => write!(f, "failed to remove save"),
            E::Io(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for Error {}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        Error::Io(err)
    }
}
