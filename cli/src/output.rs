//! Output formatting for resolved modules and cached version listings.
//!
//! Each result has a human-readable form and a JSON form for scripting.

use camino::Utf8Path;
use modfetch::ResolvedModule;
use modfetch::cache::CacheHit;
use serde::Serialize;

/// Format a resolved module for human-readable output.
///
/// # Examples
///
/// ```
/// use modfetch::test_utils::CacheFixture;
/// use modfetch::{ModuleReference, Resolver};
/// use modfetch::acquire::SystemCommandExecutor;
/// use modfetch::config::FetchConfig;
/// use modfetch::gomod::FsManifestLoader;
/// use modfetch_cli::output::format_module_human;
///
/// let cache = CacheFixture::new();
/// cache.add_module("example.com/mod", "v1.0.0");
/// let config = FetchConfig::new(cache.root());
/// let module = Resolver::new(&config, &SystemCommandExecutor, &FsManifestLoader)
///     .locate(&ModuleReference::parse("example.com/mod")?, None)?;
///
/// let output = format_module_human(&module);
/// assert!(output.starts_with("example.com/mod@v1.0.0\n"));
/// assert!(output.contains("class-type: no"));
/// # Ok::<(), modfetch::FetchError>(())
/// ```
#[must_use]
pub fn format_module_human(module: &ResolvedModule) -> String {
    let class_type = if module.is_class_type() { "yes" } else { "no" };
    format!(
        "{}@{}\n  directory:  {}\n  class-type: {class_type}\n  source:     {}",
        module.path(),
        module.version(),
        module.dir(),
        module.resolution().as_str(),
    )
}

/// Format a resolved module as JSON.
#[must_use]
pub fn format_module_json(module: &ResolvedModule) -> String {
    let json_data = ResolvedModuleJson::from(module);
    serde_json::to_string_pretty(&json_data).unwrap_or_else(|_| "{}".to_owned())
}

/// Format the cached versions of `module` for human-readable output.
#[must_use]
pub fn format_versions_human(module: &str, hits: &[CacheHit]) -> String {
    if hits.is_empty() {
        return format!("No cached versions of {module}.");
    }

    let mut output = format!("Cached versions of {module}:\n");
    for hit in hits {
        output.push_str(&format!("  {:<12} {}\n", hit.version, hit.dir));
    }
    output.truncate(output.trim_end().len());
    output
}

/// Format the cached versions of `module` as JSON.
#[must_use]
pub fn format_versions_json(module: &str, hits: &[CacheHit]) -> String {
    let json_data = VersionListJson {
        module,
        versions: hits
            .iter()
            .map(|hit| VersionEntry {
                version: &hit.version,
                dir: &hit.dir,
            })
            .collect(),
    };
    serde_json::to_string_pretty(&json_data).unwrap_or_else(|_| "{}".to_owned())
}

/// JSON-serializable representation of a resolved module.
#[derive(Debug, Serialize)]
pub struct ResolvedModuleJson<'a> {
    /// Module path.
    pub path: &'a str,
    /// Concrete cached version.
    pub version: &'a str,
    /// Cache directory.
    pub dir: &'a Utf8Path,
    /// Whether the module is class-type.
    pub class_type: bool,
    /// How the module was found: `cached`, `reported` or `rechecked`.
    pub source: &'static str,
}

impl<'a> From<&'a ResolvedModule> for ResolvedModuleJson<'a> {
    fn from(module: &'a ResolvedModule) -> Self {
        Self {
            path: module.path(),
            version: module.version(),
            dir: module.dir(),
            class_type: module.is_class_type(),
            source: module.resolution().as_str(),
        }
    }
}

/// JSON-serializable listing of cached versions.
#[derive(Debug, Serialize)]
pub struct VersionListJson<'a> {
    /// Module path that was listed.
    pub module: &'a str,
    /// Cached versions in ascending order.
    pub versions: Vec<VersionEntry<'a>>,
}

/// One cached version.
#[derive(Debug, Serialize)]
pub struct VersionEntry<'a> {
    /// The version.
    pub version: &'a str,
    /// Its cache directory.
    pub dir: &'a Utf8Path,
}

#[cfg(test)]
mod tests {
    use super::*;
    use camino::Utf8PathBuf;
    use modfetch::test_utils::CacheFixture;
    use modfetch::acquire::SystemCommandExecutor;
    use modfetch::config::FetchConfig;
    use modfetch::gomod::FsManifestLoader;
    use modfetch::{ModuleReference, Resolver, ToolEnv};
    use rstest::rstest;
    use serde_json::Value;

    fn hit(version: &str) -> CacheHit {
        CacheHit {
            dir: Utf8PathBuf::from(format!("/cache/example.com/mod@{version}")),
            version: version.to_owned(),
        }
    }

    fn class_module(cache: &CacheFixture) -> ResolvedModule {
        cache.add_class_module("example.com/game", "v1.0.0");
        let config = FetchConfig::new(cache.root());
        let env = ToolEnv::with_default_runtime("v1.2.0");
        Resolver::new(&config, &SystemCommandExecutor, &FsManifestLoader)
            .locate(
                &ModuleReference::parse("example.com/game").expect("valid reference"),
                Some(&env),
            )
            .expect("cached module")
    }

    #[test]
    fn human_module_output_lists_every_field() {
        let cache = CacheFixture::new();
        let module = class_module(&cache);

        let output = format_module_human(&module);

        assert_eq!(
            output,
            format!(
                "example.com/game@v1.0.0\n  directory:  {}\n  \
                 class-type: yes\n  source:     cached",
                module.dir()
            )
        );
    }

    #[test]
    fn json_module_output_has_expected_fields() {
        let cache = CacheFixture::new();
        let module = class_module(&cache);

        let json: Value =
            serde_json::from_str(&format_module_json(&module)).expect("valid JSON");

        assert_eq!(json["path"], "example.com/game");
        assert_eq!(json["version"], "v1.0.0");
        assert_eq!(json["dir"], module.dir().as_str());
        assert_eq!(json["class_type"], true);
        assert_eq!(json["source"], "cached");
    }

    #[test]
    fn human_versions_reports_empty_cache() {
        assert_eq!(
            format_versions_human("example.com/mod", &[]),
            "No cached versions of example.com/mod."
        );
    }

    #[test]
    fn human_versions_lists_each_version() {
        let output = format_versions_human("example.com/mod", &[hit("v1.0.0"), hit("v1.10.0")]);

        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(
            lines,
            [
                "Cached versions of example.com/mod:",
                "  v1.0.0       /cache/example.com/mod@v1.0.0",
                "  v1.10.0      /cache/example.com/mod@v1.10.0",
            ]
        );
    }

    #[rstest]
    #[case::empty(Vec::new(), 0)]
    #[case::two(vec![hit("v1.0.0"), hit("v2.0.0")], 2)]
    fn json_versions_preserves_order(#[case] hits: Vec<CacheHit>, #[case] expected: usize) {
        let output = format_versions_json("example.com/mod", &hits);
        let json: Value = serde_json::from_str(&output).expect("valid JSON");

        assert_eq!(json["module"], "example.com/mod");
        let versions = json["versions"].as_array().expect("versions array");
        assert_eq!(versions.len(), expected);
        for (entry, hit) in versions.iter().zip(&hits) {
            assert_eq!(entry["version"], hit.version.as_str());
            assert_eq!(entry["dir"], hit.dir.as_str());
        }
    }
}
