// src/config/loader.rs

use std::fs;
use std::path::{Path, PathBuf};

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::Result;

/// Load a configuration file from a given path and return the raw `RawConfigFile`.
///
/// This only performs TOML deserialization; it does **not** perform semantic
/// validation. Use [`load_and_validate`] for that.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawConfigFile> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;

    let config: RawConfigFile = toml::from_str(&contents)?;

    Ok(config)
}

/// Load a configuration file from path, validate it, and resolve every
/// relative path in it against the directory containing the file.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<ConfigFile> {
    let path = path.as_ref();
    let raw_config = load_from_path(path)?;
    let config = ConfigFile::try_from(raw_config)?;
    Ok(resolve_relative_paths(config, &config_base_dir(path)))
}

/// Directory relative config paths are anchored to.
///
/// A bare file name like `Barliman.toml` has an empty parent; that means the
/// current working directory.
pub fn config_base_dir(config_path: &Path) -> PathBuf {
    match config_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
    }
}

pub fn resolve_relative_paths(mut cfg: ConfigFile, base: &Path) -> ConfigFile {
    let anchor = |p: &mut PathBuf| {
        if p.is_relative() {
            *p = base.join(&*p);
        }
    };

    let interp = &mut cfg.interpreter;
    anchor(&mut interp.mk_vicare);
    anchor(&mut interp.mk);
    anchor(&mut interp.interp);
    if let Some(path) = interp.path.as_mut() {
        // A bare name like `scheme` is left for PATH lookup.
        if path.components().count() > 1 {
            anchor(path);
        }
    }
    if let Some(dir) = cfg.config.scratch_dir.as_mut() {
        anchor(dir);
    }

    cfg
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relative_paths_are_anchored_to_the_config_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Barliman.toml");
        fs::write(
            &path,
            "[config]\nscratch_dir = \"tmp\"\n[interpreter]\npath = \"bin/scheme\"\ninterp = \"/abs/interp.scm\"\n",
        )
        .unwrap();

        let cfg = load_and_validate(&path).unwrap();
        assert_eq!(cfg.interpreter.mk, dir.path().join("mk/mk.scm"));
        assert_eq!(cfg.interpreter.interp, PathBuf::from("/abs/interp.scm"));
        assert_eq!(cfg.interpreter.path, Some(dir.path().join("bin/scheme")));
        assert_eq!(cfg.config.scratch_dir, Some(dir.path().join("tmp")));
    }

    #[test]
    fn bare_interpreter_name_is_left_alone() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Barliman.toml");
        fs::write(&path, "[interpreter]\npath = \"scheme\"\n").unwrap();

        let cfg = load_and_validate(&path).unwrap();
        assert_eq!(cfg.interpreter.path, Some(PathBuf::from("scheme")));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let err = load_and_validate("/definitely/not/here/Barliman.toml").unwrap_err();
        assert!(matches!(err, crate::errors::BarlimanError::IoError(_)));
    }
}
