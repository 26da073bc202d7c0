//! Location of installed Elm packages
//!
//! The Elm toolchain keeps downloaded packages in a per-user cache:
//! - `$ELM_HOME` when set
//! - Windows: `%APPDATA%\elm`
//! - elsewhere: `~/.elm`
//!
//! Packages for a given compiler live at
//! `<root>/<elm-version>/packages/<author>/<name>/<version>`.

use std::path::{Path, PathBuf};

pub const ELM_HOME_ENV: &str = "ELM_HOME";

/// Configuration handed to the manifest loader.
#[derive(Debug, Clone, Default)]
pub struct LoaderConfig {
    /// Overrides the platform package-cache root (`--elm-home`, tests)
    pub package_root_override: Option<PathBuf>,
}

impl LoaderConfig {
    pub fn with_package_root(root: impl Into<PathBuf>) -> Self {
        Self {
            package_root_override: Some(root.into()),
        }
    }

    /// Reads `ELM_HOME`, falling back to the platform default at resolution time.
    pub fn from_env() -> Self {
        Self {
            package_root_override: std::env::var_os(ELM_HOME_ENV)
                .filter(|v| !v.is_empty())
                .map(PathBuf::from),
        }
    }

    /// The package-cache root, or `None` when the platform gives no home directory.
    pub fn package_root(&self) -> Option<PathBuf> {
        if let Some(root) = &self.package_root_override {
            return Some(root.clone());
        }
        platform_package_root()
    }
}

#[cfg(windows)]
fn platform_package_root() -> Option<PathBuf> {
    std::env::var_os("APPDATA")
        .map(PathBuf::from)
        .or_else(dirs::config_dir)
        .map(|dir| dir.join("elm"))
}

#[cfg(not(windows))]
fn platform_package_root() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".elm"))
}

/// Directory of one installed package version. Existence is not checked.
pub fn package_path(root: &Path, elm_version: &str, package: &str, version: &str) -> PathBuf {
    let mut path = root.join(elm_version).join("packages");
    for segment in package.split('/') {
        path.push(segment);
    }
    path.push(version);
    path
}

/// Lower bound of a constraint such as `"1.0.0 <= v < 2.0.0"`; exact versions
/// are returned unchanged.
pub fn lower_bound(constraint: &str) -> &str {
    constraint.split_whitespace().next().unwrap_or(constraint)
}

/// A `major.minor.patch` version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Version(u64, u64, u64);

impl Version {
    pub fn parse(text: &str) -> Option<Self> {
        let mut parts = text.split('.').map(|p| p.parse::<u64>().ok());
        let version = Version(parts.next()??, parts.next()??, parts.next()??);
        parts.next().is_none().then_some(version)
    }
}

/// `<lower> <op> v <op> <upper>` where each `<op>` is `<` or `<=`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VersionRange {
    lower: Version,
    lower_inclusive: bool,
    upper: Version,
    upper_inclusive: bool,
}

impl VersionRange {
    pub fn parse(constraint: &str) -> Option<Self> {
        let tokens: Vec<&str> = constraint.split_whitespace().collect();
        let [lower, lower_op, "v", upper_op, upper] = tokens.as_slice() else {
            return None;
        };
        let inclusive = |op: &str| match op {
            "<=" => Some(true),
            "<" => Some(false),
            _ => None,
        };
        Some(Self {
            lower: Version::parse(*lower)?,
            lower_inclusive: inclusive(*lower_op)?,
            upper: Version::parse(*upper)?,
            upper_inclusive: inclusive(*upper_op)?,
        })
    }

    pub fn contains(&self, version: Version) -> bool {
        let above = if self.lower_inclusive { version >= self.lower } else { version > self.lower };
        let below = if self.upper_inclusive { version <= self.upper } else { version < self.upper };
        above && below
    }
}

/// Compiler version whose package directory a project reads from.
///
/// Packages declare a range (`"0.19.0 <= v < 0.20.0"`) while the compiler
/// installs under its own exact version, so the highest installed version
/// inside the range wins. Falls back to the lower bound when none is installed.
pub fn compiler_version(constraint: &str, installed: &[String]) -> String {
    let Some(range) = VersionRange::parse(constraint) else {
        return lower_bound(constraint).to_string();
    };
    installed
        .iter()
        .filter_map(|name| Version::parse(name).map(|v| (v, name)))
        .filter(|(v, _)| range.contains(*v))
        .max_by_key(|(v, _)| *v)
        .map(|(_, name)| name.clone())
        .unwrap_or_else(|| lower_bound(constraint).to_string())
}
