use std::fs;
use std::io;
use std::path::Path;
use tracing::debug;

/// One step of the escalating content comparison. Cheaper stages run first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Size,
    PartialHash,
    FullHash,
}

pub const STAGES: [Stage; 3] = [Stage::Size, Stage::PartialHash, Stage::FullHash];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    Identical,
    Differs(Stage),
}

impl Stage {
    fn matches(self, a: &Path, b: &Path) -> io::Result<bool> {
        match self {
            Stage::Size => Ok(fs::metadata(a)?.len() == fs::metadata(b)?.len()),
            Stage::PartialHash => Ok(super::partial_hash(a)? == super::partial_hash(b)?),
            Stage::FullHash => Ok(super::full_hash(a)? == super::full_hash(b)?),
        }
    }
}

/// Runs the stages in order and stops at the first mismatch.
pub fn compare_contents(a: &Path, b: &Path) -> io::Result<Comparison> {
    for stage in STAGES {
        if !stage.matches(a, b)? {
            debug!(
                "{} and {} differ at {:?}",
                a.display(),
                b.display(),
                stage
            );
            return Ok(Comparison::Differs(stage));
        }
    }
    Ok(Comparison::Identical)
}
