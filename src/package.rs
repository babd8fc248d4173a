//! Move package compilation via the `sui` CLI.
//!
//! `sui move build --dump-bytecode-as-base64` prints the modules and
//! dependency ids that `unsafe_publish` expects.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, info};

#[derive(Debug, thiserror::Error)]
pub enum PackageError {
    #[error("failed to run {bin}: {source}")]
    Spawn {
        bin: String,
        #[source]
        source: std::io::Error,
    },

    #[error("sui move build failed for {path}: {stderr}")]
    Build { path: PathBuf, stderr: String },

    #[error("sui move build timed out after {0:?}")]
    Timeout(Duration),

    #[error("unexpected build output: {0}")]
    Output(#[from] serde_json::Error),
}

/// Base64 bytecode ready for publishing.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
pub struct CompiledPackage {
    pub modules: Vec<String>,
    pub dependencies: Vec<String>,
}

impl CompiledPackage {
    /// Parse the JSON the build prints. Build chatter before the JSON is skipped.
    pub fn from_build_output(stdout: &str) -> Result<Self, PackageError> {
        let json = stdout.find('{').map(|i| &stdout[i..]).unwrap_or(stdout);
        Ok(serde_json::from_str(json.trim())?)
    }
}

pub async fn compile(sui_bin: &str, path: &Path, timeout: Duration) -> Result<CompiledPackage, PackageError> {
    info!(path = %path.display(), "building Move package");
    let build = Command::new(sui_bin)
        .args(["move", "build", "--dump-bytecode-as-base64", "--path"])
        .arg(path)
        .kill_on_drop(true)
        .output();

    let output = match tokio::time::timeout(timeout, build).await {
        Ok(Ok(output)) => output,
        Ok(Err(source)) => {
            return Err(PackageError::Spawn {
                bin: sui_bin.to_string(),
                source,
            })
        }
        Err(_) => return Err(PackageError::Timeout(timeout)),
    };

    if !output.status.success() {
        return Err(PackageError::Build {
            path: path.to_path_buf(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }

    let package = CompiledPackage::from_build_output(&String::from_utf8_lossy(&output.stdout))?;
    debug!(
        modules = package.modules.len(),
        dependencies = package.dependencies.len(),
        "package compiled"
    );
    Ok(package)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_build_json_after_chatter() {
        let out = "INCLUDING DEPENDENCY Sui\nBUILDING mizu\n{\"modules\":[\"oRzrCw\"],\"dependencies\":[\"0x1\",\"0x2\"],\"digest\":[1,2]}\n";
        let p = CompiledPackage::from_build_output(out).unwrap();
        assert_eq!(p.modules, vec!["oRzrCw"]);
        assert_eq!(p.dependencies, vec!["0x1", "0x2"]);
    }

    #[test]
    fn rejects_output_without_json() {
        assert!(matches!(
            CompiledPackage::from_build_output("error: no such package"),
            Err(PackageError::Output(_))
        ));
    }

    #[tokio::test]
    async fn missing_binary_is_a_spawn_error() {
        let err = compile("mizu-no-such-sui-binary", Path::new("."), Duration::from_secs(5))
            .await
            .unwrap_err();
        assert!(matches!(err, PackageError::Spawn { .. }));
    }
}
