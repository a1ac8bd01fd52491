//! Release version patching
//!
//! Stamps a release tag into the installer and packaging files before a
//! build. Given tag `2.14.1-beta`, the version is `2.14.1`:
//!
//! - installer script: `#define AppVersion "2.14.1"` and
//!   `#define AppInfoVersion "2.14.1-beta"`
//! - setup script: the first `version=` line
//! - plugin start file: the first `self.version = ` line
//! - installer helper scripts: every referenced `*-py3-none-any.whl` file name

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{CliError, Result};

const WHEEL_SUFFIX: &str = "-py3-none-any.whl";

/// A validated release tag
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseTag {
    tag: String,
    version: String,
}

impl ReleaseTag {
    /// Accepts tags starting with `<major>.<minor>.<patch>`
    pub fn parse(tag: &str) -> Result<Self> {
        let pattern = Regex::new(r"^([0-9]+)\.([0-9]+)\.([0-9]+)")
            .map_err(|e| CliError::InvalidInput(e.to_string()))?;
        if !pattern.is_match(tag) {
            return Err(CliError::invalid_input(format!("Invalid tag provided: {}", tag)));
        }
        let version = tag.split('-').next().unwrap_or(tag).to_string();
        Ok(Self {
            tag: tag.to_string(),
            version,
        })
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// Tag without any pre-release suffix
    pub fn version(&self) -> &str {
        &self.version
    }
}

/// Files to patch, relative to the repository root
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PatchTargets {
    pub installer_script: PathBuf,
    pub setup_script: PathBuf,
    pub plugin_start_file: PathBuf,
    pub wheel_scripts: Vec<PathBuf>,
}

impl Default for PatchTargets {
    fn default() -> Self {
        Self {
            installer_script: PathBuf::from("speckle-sharp-ci-tools/arcgis.iss"),
            setup_script: PathBuf::from("setup.py"),
            plugin_start_file: PathBuf::from("speckle_toolbox/esri/toolboxes/speckle/speckle_arcgis.py"),
            wheel_scripts: vec![
                PathBuf::from("speckle_arcgis_installer/conda_clone_activate.py"),
                PathBuf::from("speckle_arcgis_installer/toolbox_install_manual.py"),
            ],
        }
    }
}

impl PatchTargets {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            CliError::file_error(format!("Failed to read targets file '{}': {}", path.display(), e))
        })?;
        Ok(toml::from_str(&content)?)
    }
}

/// A file that was rewritten
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PatchedFile {
    pub path: PathBuf,
    pub lines_changed: usize,
}

/// Rewrite lines for which `patch` returns a replacement, keeping line endings
fn rewrite_lines<F>(content: &str, mut patch: F) -> (String, usize)
where
    F: FnMut(&str) -> Option<String>,
{
    let mut out = String::with_capacity(content.len());
    let mut changed = 0;
    for line in content.split_inclusive('\n') {
        let (body, ending) = match line.strip_suffix("\r\n") {
            Some(body) => (body, "\r\n"),
            None => match line.strip_suffix('\n') {
                Some(body) => (body, "\n"),
                None => (line, ""),
            },
        };
        match patch(body) {
            Some(replacement) => {
                if replacement != body {
                    changed += 1;
                }
                out.push_str(&replacement);
            }
            None => out.push_str(body),
        }
        out.push_str(ending);
    }
    (out, changed)
}

pub fn patch_installer_script(content: &str, tag: &ReleaseTag) -> (String, usize) {
    rewrite_lines(content, |line| {
        if line.contains("#define AppVersion ") {
            Some(format!("#define AppVersion \"{}\"", tag.version()))
        } else if line.contains("#define AppInfoVersion ") {
            Some(format!("#define AppInfoVersion \"{}\"", tag.tag()))
        } else {
            None
        }
    })
}

pub fn patch_setup_script(content: &str, tag: &ReleaseTag) -> (String, usize) {
    let mut done = false;
    rewrite_lines(content, |line| {
        if done || !line.contains("version=") {
            return None;
        }
        done = true;
        Some(format!("\t\t\tversion=\"{}\",", tag.version()))
    })
}

pub fn patch_plugin_start(content: &str, tag: &ReleaseTag) -> (String, usize) {
    let mut done = false;
    rewrite_lines(content, |line| {
        if done {
            return None;
        }
        let (indent, _) = line.split_once("self.version = ")?;
        done = true;
        Some(format!("{}self.version = \"{}\"", indent, tag.version()))
    })
}

pub fn patch_wheel_references(content: &str, tag: &ReleaseTag) -> (String, usize) {
    rewrite_lines(content, |line| {
        if line.contains(".sort") {
            return None;
        }
        let (before, after) = line.split_once(WHEEL_SUFFIX)?;
        let (name, _old_version) = before.rsplit_once('-')?;
        Some(format!("{}-{}{}{}", name, tag.version(), WHEEL_SUFFIX, after))
    })
}

/// Patch every target under `root`. All files are read before any is written,
/// so a missing file leaves the tree untouched.
pub fn patch_release(root: &Path, targets: &PatchTargets, tag: &ReleaseTag) -> Result<Vec<PatchedFile>> {
    type Patcher = fn(&str, &ReleaseTag) -> (String, usize);

    let mut jobs: Vec<(PathBuf, Patcher)> = vec![
        (root.join(&targets.installer_script), patch_installer_script),
        (root.join(&targets.setup_script), patch_setup_script),
        (root.join(&targets.plugin_start_file), patch_plugin_start),
    ];
    jobs.extend(
        targets
            .wheel_scripts
            .iter()
            .map(|p| (root.join(p), patch_wheel_references as Patcher)),
    );

    let mut patched = Vec::with_capacity(jobs.len());
    let mut outputs = Vec::with_capacity(jobs.len());
    for (path, patcher) in &jobs {
        let content = std::fs::read_to_string(path).map_err(|e| {
            CliError::file_error(format!("Failed to read '{}': {}", path.display(), e))
        })?;
        let (new_content, lines_changed) = patcher(&content, tag);
        outputs.push(new_content);
        patched.push(PatchedFile {
            path: path.clone(),
            lines_changed,
        });
    }

    for (file, content) in patched.iter().zip(outputs) {
        std::fs::write(&file.path, content).map_err(|e| {
            CliError::file_error(format!("Failed to write '{}': {}", file.path.display(), e))
        })?;
        tracing::info!(path = %file.path.display(), lines = file.lines_changed, "Patched file");
    }

    Ok(patched)
}
