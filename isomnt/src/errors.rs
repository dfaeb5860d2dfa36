use isomnt_hal::HalError;
use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, IsomntError>;

#[derive(Error, Debug)]
pub enum IsomntError {
    #[error("root privileges required")]
    NotRoot,

    #[error(".iso image doesn't exist: {}", .0.display())]
    ImageMissing(PathBuf),

    #[error("Not a valid .iso image: {}", .0.display())]
    NotAnIsoImage(PathBuf),

    #[error("Target mountpoint doesn't exist: {}", .0.display())]
    TargetMissing(PathBuf),

    #[error("A mountpoint exists: {}", .0.display())]
    AlreadyMounted(PathBuf),

    #[error("Nothing is mounted: {}", .0.display())]
    NothingMounted(PathBuf),

    #[error(
        "Target mountpoint {} uses an invalid filesystem type ({}), only ISO9660 is supported",
        target.display(),
        describe_magic(*magic)
    )]
    UnsupportedFilesystem { target: PathBuf, magic: Option<i64> },

    #[error(transparent)]
    Hal(#[from] HalError),
}

fn describe_magic(magic: Option<i64>) -> String {
    match magic {
        Some(magic) => format!("found {magic:#x}"),
        None => "statfs failed".to_string(),
    }
}

impl IsomntError {
    /// Violated preconditions are plain diagnostics; everything else came from the kernel.
    pub fn is_precondition(&self) -> bool {
        !matches!(self, IsomntError::Hal(_))
    }
}

/// Print a failure the way the command reports it: preconditions on stdout,
/// kernel errors (with context) on stderr.
pub fn report(err: &anyhow::Error) {
    match err.downcast_ref::<IsomntError>() {
        Some(e) if e.is_precondition() => println!("{e}"),
        _ => eprintln!("{err:#}"),
    }
}
