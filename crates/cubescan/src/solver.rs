//! External cube-solver interface.

use std::path::PathBuf;
use std::process::Command;

#[derive(thiserror::Error, Debug)]
pub enum SolverError {
    #[error("failed to launch solver {program}: {source}")]
    Launch {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("solver rejected the cube state: {0}")]
    Rejected(String),
}

/// Turns a 54-symbol facelet string (U,R,F,D,L,B, row-major) into a move sequence.
pub trait Solver {
    fn solve(&self, facelets: &str) -> Result<String, SolverError>;
}

/// Runs an external program with the facelet string as its only argument.
///
/// Trimmed stdout is the solution; a non-zero exit status is a rejection
/// carrying the program's stderr.
#[derive(Clone, Debug)]
pub struct CommandSolver {
    program: PathBuf,
}

impl CommandSolver {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl Solver for CommandSolver {
    fn solve(&self, facelets: &str) -> Result<String, SolverError> {
        let output = Command::new(&self.program)
            .arg(facelets)
            .output()
            .map_err(|source| SolverError::Launch {
                program: self.program.display().to_string(),
                source,
            })?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            let reason = if stderr.is_empty() {
                output.status.to_string()
            } else {
                stderr
            };
            return Err(SolverError::Rejected(reason));
        }
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}
