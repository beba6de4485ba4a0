//! Compiler adapter: builds the driver plus library sources for one buffer size.

use std::ffi::OsString;
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Command;

use sha2::Digest;

use crate::error::ToolchainError;

/// Default C compiler program.
pub const DEFAULT_CC: &str = "gcc";
/// Symbol defined on the command line to select the buffer size.
pub const BUFFER_SIZE_SYMBOL: &str = "BUFFER_SIZE";

/// One compile-time configuration of the library under test.
///
/// The buffer size is passed through uninterpreted; negative and zero values
/// are legitimate probes of the library's own defensive handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BuildConfiguration {
    pub buffer_size: i64,
}

impl BuildConfiguration {
    #[must_use]
    pub const fn new(buffer_size: i64) -> Self {
        Self { buffer_size }
    }
}

impl fmt::Display for BuildConfiguration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{BUFFER_SIZE_SYMBOL}={}", self.buffer_size)
    }
}

/// Inputs to a single compilation.
#[derive(Debug, Clone)]
pub struct BuildRequest<'a> {
    pub configuration: BuildConfiguration,
    pub driver: &'a Path,
    pub sources: &'a [PathBuf],
    /// Directory holding the library header, passed as `-I`.
    pub include_dir: Option<&'a Path>,
    pub output: &'a Path,
}

/// A runnable binary produced for exactly one configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledArtifact {
    path: PathBuf,
    configuration: BuildConfiguration,
    sha256: String,
}

impl CompiledArtifact {
    /// Fingerprint the file at `path` as an artifact built for `configuration`.
    ///
    /// # Errors
    ///
    /// Returns [`ToolchainError::Io`] if the file cannot be read.
    pub fn from_path(
        path: impl Into<PathBuf>,
        configuration: BuildConfiguration,
    ) -> Result<Self, ToolchainError> {
        let path = path.into();
        let bytes = std::fs::read(&path)
            .map_err(|err| ToolchainError::io_at("read artifact", &path, err))?;
        Ok(Self {
            sha256: hex_lower(&sha2::Sha256::digest(&bytes)),
            path,
            configuration,
        })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub const fn configuration(&self) -> BuildConfiguration {
        self.configuration
    }

    /// Lowercase hex SHA-256 of the artifact bytes at build time.
    #[must_use]
    pub fn sha256(&self) -> &str {
        &self.sha256
    }
}

/// What the compiler made of a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompileOutcome {
    Built(CompiledArtifact),
    /// The compiler ran and refused; `diagnostic` is its captured output.
    Rejected { diagnostic: String },
}

/// Capability: turn sources plus a configuration into an artifact.
pub trait Compiler {
    /// Human-readable tool name for logs.
    fn name(&self) -> &str;

    /// Compile the request.
    ///
    /// # Errors
    ///
    /// Only when the compiler cannot be run at all. A rejected build is
    /// [`CompileOutcome::Rejected`].
    fn compile(&self, request: &BuildRequest<'_>) -> Result<CompileOutcome, ToolchainError>;
}

/// `cc`-style compiler driven with warnings-as-errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CcCompiler {
    pub program: String,
    pub flags: Vec<String>,
    pub define_symbol: String,
}

impl Default for CcCompiler {
    fn default() -> Self {
        Self::new(DEFAULT_CC)
    }
}

impl CcCompiler {
    #[must_use]
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            flags: ["-Wall", "-Wextra", "-Werror"]
                .into_iter()
                .map(String::from)
                .collect(),
            define_symbol: BUFFER_SIZE_SYMBOL.to_string(),
        }
    }

    /// Arguments passed to the program, in order.
    #[must_use]
    pub fn command_line(&self, request: &BuildRequest<'_>) -> Vec<OsString> {
        let mut args: Vec<OsString> = self.flags.iter().map(OsString::from).collect();
        args.push("-D".into());
        args.push(
            format!(
                "{}={}",
                self.define_symbol, request.configuration.buffer_size
            )
            .into(),
        );
        if let Some(dir) = request.include_dir {
            args.push("-I".into());
            args.push(dir.as_os_str().to_owned());
        }
        args.push(request.driver.as_os_str().to_owned());
        args.extend(request.sources.iter().map(|src| src.as_os_str().to_owned()));
        args.push("-o".into());
        args.push(request.output.as_os_str().to_owned());
        args
    }
}

impl Compiler for CcCompiler {
    fn name(&self) -> &str {
        &self.program
    }

    fn compile(&self, request: &BuildRequest<'_>) -> Result<CompileOutcome, ToolchainError> {
        let output = Command::new(&self.program)
            .args(self.command_line(request))
            .output()
            .map_err(|err| ToolchainError::from_spawn(&self.program, err))?;

        if !output.status.success() {
            let stream = if output.stderr.is_empty() {
                &output.stdout
            } else {
                &output.stderr
            };
            let mut diagnostic = String::from_utf8_lossy(stream).trim_end().to_string();
            if diagnostic.is_empty() {
                diagnostic = format!("`{}` exited with {}", self.program, output.status);
            }
            return Ok(CompileOutcome::Rejected { diagnostic });
        }

        if !request.output.exists() {
            return Ok(CompileOutcome::Rejected {
                diagnostic: format!(
                    "`{}` reported success but produced no artifact at '{}'",
                    self.program,
                    request.output.display()
                ),
            });
        }

        CompiledArtifact::from_path(request.output, request.configuration)
            .map(CompileOutcome::Built)
    }
}

fn hex_lower(bytes: &[u8]) -> String {
    use std::fmt::Write;
    let mut out = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        let _ = write!(&mut out, "{b:02x}");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request<'a>(
        sources: &'a [PathBuf],
        include: Option<&'a Path>,
        buffer_size: i64,
    ) -> BuildRequest<'a> {
        BuildRequest {
            configuration: BuildConfiguration::new(buffer_size),
            driver: Path::new("test_main.c"),
            sources,
            include_dir: include,
            output: Path::new("gnl_test"),
        }
    }

    #[test]
    fn command_line_matches_warnings_as_errors_build() {
        let sources = vec![
            PathBuf::from("get_next_line.c"),
            PathBuf::from("get_next_line_utils.c"),
        ];
        let args = CcCompiler::default().command_line(&request(&sources, None, 42));
        let args: Vec<String> = args
            .iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect();
        assert_eq!(
            args,
            [
                "-Wall",
                "-Wextra",
                "-Werror",
                "-D",
                "BUFFER_SIZE=42",
                "test_main.c",
                "get_next_line.c",
                "get_next_line_utils.c",
                "-o",
                "gnl_test"
            ]
        );
    }

    #[test]
    fn negative_buffer_size_is_passed_through() {
        let args = CcCompiler::default().command_line(&request(&[], None, -1));
        assert!(args.iter().any(|a| a == "BUFFER_SIZE=-1"));
    }

    #[test]
    fn include_dir_precedes_sources() {
        let sources = vec![PathBuf::from("lib/get_next_line.c")];
        let req = request(&sources, Some(Path::new("lib")), 5);
        let args = CcCompiler::default().command_line(&req);
        let pos_i = args.iter().position(|a| a == "-I").unwrap();
        assert_eq!(args[pos_i + 1], "lib");
        let pos_src = args.iter().position(|a| a == "lib/get_next_line.c").unwrap();
        assert!(pos_i < pos_src);
    }

    #[test]
    fn configuration_display_uses_define_syntax() {
        assert_eq!(BuildConfiguration::new(1000).to_string(), "BUFFER_SIZE=1000");
    }

    #[test]
    fn artifact_fingerprint_is_sha256() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bin");
        std::fs::write(&path, b"abc").unwrap();
        let artifact = CompiledArtifact::from_path(&path, BuildConfiguration::new(1)).unwrap();
        assert_eq!(
            artifact.sha256(),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
        assert_eq!(artifact.configuration().buffer_size, 1);
    }

    #[test]
    fn missing_compiler_is_tool_missing() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("gnl_test");
        let compiler = CcCompiler::new("gnl-no-such-cc");
        let req = BuildRequest {
            output: &out,
            ..request(&[], None, 42)
        };
        let err = compiler.compile(&req).unwrap_err();
        assert!(err.is_tool_missing());
    }

    #[cfg(unix)]
    #[test]
    fn failing_compiler_is_rejected_not_error() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("gnl_test");
        let compiler = CcCompiler::new("false");
        let req = BuildRequest {
            output: &out,
            ..request(&[], None, 42)
        };
        match compiler.compile(&req).unwrap() {
            CompileOutcome::Rejected { diagnostic } => assert!(diagnostic.contains("false")),
            CompileOutcome::Built(_) => panic!("`false` must not build an artifact"),
        }
        assert!(!out.exists());
    }

    #[cfg(unix)]
    #[test]
    fn success_without_artifact_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("gnl_test");
        let compiler = CcCompiler::new("true");
        let req = BuildRequest {
            output: &out,
            ..request(&[], None, 42)
        };
        assert!(matches!(
            compiler.compile(&req).unwrap(),
            CompileOutcome::Rejected { .. }
        ));
    }
}
