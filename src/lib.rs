use std::path::{Path, PathBuf};

use anyhow::{Context as _, Result};
use tracing::info;

mod check;
mod data;
mod engine;
mod feed;
mod helpers;
mod html;
mod locales;
mod markdown;
mod meta;
mod serve;

pub mod config;
pub mod entity;
pub mod error;
pub mod routes;
pub mod site;
pub mod wordpress;

pub use config::Config;
pub use site::{Reply, Site};

/// The root config file of a streetpress site.
pub static ROOT_FILE: &str = "streetpress.toml";

pub static STREETPRESS_BANNER: &str = r"
     _                 _
 ___| |_ _ __ ___  ___| |_ _ __  _ __ ___  ___ ___
/ __| __| '__/ _ \/ _ \ __| '_ \| '__/ _ \/ __/ __|
\__ \ |_| | |  __/  __/ |_| |_) | | |  __/\__ \__ \
|___/\__|_|  \___|\___|\__| .__/|_|  \___||___/___/
                          |_|
";

/// Serve the site of `source` until ctrl-c.
pub async fn run_serve(source: &str, port: u16, open_browser: bool) -> Result<()> {
    let (source, config) = locate_root(source)?;
    let site = Site::new(&source, config)?;
    serve::run_serve(site, &source, port, open_browser).await
}

/// Check the WordPress endpoints of the site.
pub async fn run_check(source: &str) -> Result<bool> {
    let (_, config) = locate_root(source)?;
    check::check_wordpress(&config).await
}

/// Render a single route, such as `/music?page=2`, into stdout.
pub async fn run_render(route: &str, source: &str) -> Result<Reply> {
    let (source, config) = locate_root(source)?;
    let site = Site::new(&source, config)?;
    let (path, query) = match route.split_once('?') {
        Some((path, query)) => (path, Some(query)),
        None => (route, None),
    };
    Ok(site.handle(path, query).await)
}

/// Locate the folder containing the root `streetpress.toml`, walking up the parents.
pub fn locate_root(source: impl AsRef<Path>) -> Result<(PathBuf, Config)> {
    let source = std::fs::canonicalize(source.as_ref())
        .with_context(|| format!("Invalid source `{}`", source.as_ref().display()))?;
    let mut path = source.as_path();
    loop {
        if path.join(ROOT_FILE).is_file() {
            info!("Found `{ROOT_FILE}` in {}", path.display());
            let config = Config::parse_from_toml(path)?;
            return Ok((path.to_path_buf(), config));
        }
        match path.parent() {
            Some(parent) => path = parent,
            None => return Err(error::ConfigError::RootNotFound.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    #[test]
    fn test_locate_root() {
        let root = std::env::temp_dir().join("streetpress-test-root");
        let _ = fs::remove_dir_all(&root);
        fs::create_dir_all(root.join("pages").join("nested")).unwrap();
        fs::write(
            root.join(ROOT_FILE),
            "[site]\nurl = \"https://the49thstreet.com\"\nname = \"49th Street\"\n",
        )
        .unwrap();

        let (found, config) = locate_root(root.join("pages").join("nested")).unwrap();
        assert_eq!(found, fs::canonicalize(&root).unwrap());
        assert_eq!(config.site.name, "49th Street");
    }

    #[test]
    fn test_locate_root_invalid_toml() {
        let root = std::env::temp_dir().join("streetpress-test-invalid-root");
        let _ = fs::remove_dir_all(&root);
        fs::create_dir_all(&root).unwrap();
        fs::write(root.join(ROOT_FILE), "[site]\nname = 1\n").unwrap();
        assert!(locate_root(&root).is_err());
    }
}
