//! Build session: owns the transient driver, artifact and audit report.

use std::path::{Path, PathBuf};

use gnl_toolchain::{
    BuildConfiguration, BuildRequest, CompileOutcome, CompiledArtifact, Compiler,
    DriverSynthesizer,
};

use crate::config::HarnessConfig;
use crate::error::HarnessError;

/// Rebuilds the artifact for each case and removes transient files at the end.
///
/// An artifact is only handed out for the configuration it was last built
/// with, and a failed build leaves no artifact behind.
#[derive(Debug)]
pub struct BuildSession {
    driver: DriverSynthesizer,
    driver_path: PathBuf,
    artifact_path: PathBuf,
    report_path: PathBuf,
    sources: Vec<PathBuf>,
    include_dir: Option<PathBuf>,
    current: Option<CompiledArtifact>,
}

impl BuildSession {
    #[must_use]
    pub fn new(config: &HarnessConfig) -> Self {
        Self {
            driver: config.driver(),
            driver_path: config.driver_path(),
            artifact_path: config.artifact_path(),
            report_path: config.report_path(),
            sources: config.source_paths(),
            include_dir: config.include_dir().map(Path::to_path_buf),
            current: None,
        }
    }

    #[must_use]
    pub fn artifact_path(&self) -> &Path {
        &self.artifact_path
    }

    #[must_use]
    pub fn driver_path(&self) -> &Path {
        &self.driver_path
    }

    /// Regenerate the driver and rebuild for `configuration`.
    ///
    /// # Errors
    ///
    /// The driver cannot be written, the previous artifact cannot be removed,
    /// or the compiler cannot be run. A rejected build is
    /// [`CompileOutcome::Rejected`].
    pub fn prepare<C: Compiler + ?Sized>(
        &mut self,
        compiler: &C,
        configuration: BuildConfiguration,
    ) -> Result<CompileOutcome, HarnessError> {
        self.current = None;
        self.driver.write_to(&self.driver_path)?;
        remove_if_present(&self.artifact_path).map_err(|err| {
            HarnessError::io(
                format!(
                    "failed to remove previous artifact '{}'",
                    self.artifact_path.display()
                ),
                err,
            )
        })?;

        let outcome = compiler.compile(&BuildRequest {
            configuration,
            driver: &self.driver_path,
            sources: &self.sources,
            include_dir: self.include_dir.as_deref(),
            output: &self.artifact_path,
        })?;
        if let CompileOutcome::Built(artifact) = &outcome {
            self.current = Some(artifact.clone());
        }
        Ok(outcome)
    }

    /// The artifact built for `configuration`, if it is the latest build and
    /// still on disk.
    #[must_use]
    pub fn artifact_for(&self, configuration: BuildConfiguration) -> Option<&CompiledArtifact> {
        self.current
            .as_ref()
            .filter(|artifact| artifact.configuration() == configuration)
            .filter(|artifact| artifact.path().exists())
    }

    /// Remove driver, artifact and report. Missing files are fine; other
    /// failures are returned so the caller can report them.
    pub fn cleanup(&mut self) -> Vec<(PathBuf, std::io::Error)> {
        self.current = None;
        [&self.driver_path, &self.artifact_path, &self.report_path]
            .into_iter()
            .filter_map(|path| {
                remove_if_present(path)
                    .err()
                    .map(|err| (path.clone(), err))
            })
            .collect()
    }
}

impl Drop for BuildSession {
    fn drop(&mut self) {
        let _ = self.cleanup();
    }
}

fn remove_if_present(path: &Path) -> std::io::Result<()> {
    match std::fs::remove_file(path) {
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
        other => other,
    }
}
