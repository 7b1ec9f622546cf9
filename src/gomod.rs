//! Filesystem manifest loader for `go.mod` and `gop.mod`.
//!
//! `go.mod` is the legacy manifest every module may carry. `gop.mod` is the
//! class manifest; a `project` directive in it makes the module class-type.
//! Only what classification and canonicalisation need is parsed: the module
//! line and `require` entries of `go.mod`, and the directive names of
//! `gop.mod`.

use crate::error::{FetchError, Result};
use crate::manifest::{LoadMode, ManifestDescriptor, ManifestLoader, ToolEnv};
use camino::{Utf8Path, Utf8PathBuf};
use log::{debug, trace};
use std::io::{self, Write};
use tempfile::NamedTempFile;

/// File name of the legacy module manifest.
pub const GO_MOD: &str = "go.mod";

/// File name of the class manifest.
pub const CLASS_MANIFEST: &str = "gop.mod";

const PROJECT_DIRECTIVE: &str = "project";

/// Loads manifests straight from module directories.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsManifestLoader;

impl FsManifestLoader {
    /// Create a loader.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl ManifestLoader for FsManifestLoader {
    fn load(&self, dir: &Utf8Path, mode: LoadMode) -> Result<Box<dyn ManifestDescriptor>> {
        let go_mod = read_optional(dir, GO_MOD)?
            .map(|text| GoMod::parse(&text).map_err(|reason| FetchError::manifest(dir, reason)))
            .transpose()?;

        let class_type = match mode {
            LoadMode::Legacy => false,
            LoadMode::Full => {
                read_optional(dir, CLASS_MANIFEST)?.is_some_and(|text| declares_project(&text))
            }
        };

        debug!(
            "loaded manifest in {dir} ({mode:?}): go.mod {}, class-type {class_type}",
            if go_mod.is_some() { "present" } else { "absent" },
        );

        Ok(Box::new(FsManifest {
            dir: dir.to_owned(),
            mode,
            go_mod,
            class_type,
        }))
    }
}

/// A manifest loaded by [`FsManifestLoader`].
#[derive(Debug, Clone)]
struct FsManifest {
    dir: Utf8PathBuf,
    mode: LoadMode,
    go_mod: Option<GoMod>,
    class_type: bool,
}

impl ManifestDescriptor for FsManifest {
    fn is_class_type(&self) -> bool {
        self.class_type
    }

    fn is_canonical(&self, env: &ToolEnv) -> bool {
        if !self.class_type {
            return true;
        }
        self.go_mod
            .as_ref()
            .and_then(|go_mod| go_mod.required_version(env.runtime_module()))
            == Some(env.runtime_version())
    }

    fn update_canonical_form(&self, env: &ToolEnv, create_if_absent: bool) -> Result<()> {
        if self.mode == LoadMode::Legacy {
            return Err(FetchError::manifest(
                &self.dir,
                "manifest loaded in legacy mode cannot be rewritten",
            ));
        }
        if self.is_canonical(env) {
            return Ok(());
        }

        let Some(go_mod) = &self.go_mod else {
            return Err(FetchError::manifest(
                &self.dir,
                format!("class-type module has no {GO_MOD}"),
            ));
        };

        if go_mod.required_version(env.runtime_module()).is_none() && !create_if_absent {
            trace!("{} not required in {}; leaving it", env.runtime_module(), self.dir);
            return Ok(());
        }

        let text = go_mod.with_requirement(env.runtime_module(), env.runtime_version());
        write_atomically(&self.dir, GO_MOD, &text)?;
        debug!(
            "required {} {} in {} ({})",
            env.runtime_module(),
            env.runtime_version(),
            go_mod.module.as_deref().unwrap_or("unnamed module"),
            self.dir.join(GO_MOD),
        );
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Requirement {
    path: String,
    version: String,
    line: usize,
    in_block: bool,
}

/// The parts of a `go.mod` file canonicalisation needs, plus its original
/// lines so untouched content is written back verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
struct GoMod {
    lines: Vec<String>,
    module: Option<String>,
    requires: Vec<Requirement>,
}

impl GoMod {
    fn parse(text: &str) -> std::result::Result<Self, String> {
        let lines: Vec<String> = text.lines().map(str::to_owned).collect();
        let mut module = None;
        let mut requires = Vec::new();
        let mut block: Option<&str> = None;

        for (index, line) in lines.iter().enumerate() {
            let code = strip_comment(line).trim();
            if code.is_empty() {
                continue;
            }

            if let Some(directive) = block {
                if code == ")" {
                    block = None;
                } else if directive == "require" {
                    requires.push(parse_requirement(code, index, true)?);
                }
                continue;
            }

            let (directive, tail) = code.split_once(char::is_whitespace).unwrap_or((code, ""));
            let rest = tail.trim();
            if rest == "(" {
                block = Some(directive);
                continue;
            }
            match directive {
                "module" => module = Some(unquote(rest).to_owned()),
                "require" => requires.push(parse_requirement(rest, index, false)?),
                _ => {}
            }
        }

        if let Some(directive) = block {
            return Err(format!("unterminated {directive} block in {GO_MOD}"));
        }

        Ok(Self {
            lines,
            module,
            requires,
        })
    }

    fn required_version(&self, path: &str) -> Option<&str> {
        self.requires
            .iter()
            .find(|req| req.path == path)
            .map(|req| req.version.as_str())
    }

    /// Render the file with `path` required at `version`, replacing an
    /// existing requirement in place or appending a new one.
    fn with_requirement(&self, path: &str, version: &str) -> String {
        let mut lines = self.lines.clone();
        match self.requires.iter().find(|req| req.path == path) {
            Some(req) => {
                if let Some(line) = lines.get_mut(req.line) {
                    *line = rewrite_requirement_line(line, req, version);
                }
            }
            None => {
                if lines.last().is_some_and(|last| !last.trim().is_empty()) {
                    lines.push(String::new());
                }
                lines.push(format!("require {path} {version}"));
            }
        }
        let mut text = lines.join("\n");
        text.push('\n');
        text
    }
}

fn parse_requirement(
    spec: &str,
    line: usize,
    in_block: bool,
) -> std::result::Result<Requirement, String> {
    let mut fields = spec.split_whitespace();
    match (fields.next(), fields.next()) {
        (Some(path), Some(version)) => Ok(Requirement {
            path: unquote(path).to_owned(),
            version: version.to_owned(),
            line,
            in_block,
        }),
        _ => Err(format!(
            "malformed require on line {}: `{spec}`",
            line + 1
        )),
    }
}

fn rewrite_requirement_line(line: &str, req: &Requirement, version: &str) -> String {
    let indent: String = line.chars().take_while(|c| c.is_whitespace()).collect();
    let keyword = if req.in_block { "" } else { "require " };
    let comment = line
        .split_once("//")
        .map(|(_, comment)| format!(" //{comment}"))
        .unwrap_or_default();
    format!("{indent}{keyword}{} {version}{comment}", req.path)
}

fn strip_comment(line: &str) -> &str {
    line.split_once("//").map_or(line, |(code, _)| code)
}

fn unquote(value: &str) -> &str {
    value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .unwrap_or(value)
}

fn declares_project(text: &str) -> bool {
    text.lines().any(|line| {
        strip_comment(line)
            .split_whitespace()
            .next()
            .is_some_and(|directive| directive == PROJECT_DIRECTIVE)
    })
}

fn read_optional(dir: &Utf8Path, name: &str) -> Result<Option<String>> {
    let path = dir.join(name);
    match std::fs::read_to_string(&path) {
        Ok(text) => Ok(Some(text)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(FetchError::manifest(dir, format!("reading {path}: {e}"))),
    }
}

/// Replace `dir/name` with `contents` via a temporary file in the same
/// directory, keeping the original file's permissions.
fn write_atomically(dir: &Utf8Path, name: &str, contents: &str) -> Result<()> {
    let target = dir.join(name);
    let write_err = |e: io::Error| FetchError::manifest(dir, format!("writing {target}: {e}"));

    let mut temp = NamedTempFile::new_in(dir).map_err(write_err)?;
    temp.write_all(contents.as_bytes()).map_err(write_err)?;
    if let Ok(meta) = std::fs::metadata(&target) {
        temp.as_file()
            .set_permissions(meta.permissions())
            .map_err(write_err)?;
    }
    temp.persist(&target).map_err(|e| write_err(e.error))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::{fixture, rstest};
    use tempfile::TempDir;

    const RUNTIME: &str = crate::manifest::DEFAULT_RUNTIME_MODULE;

    struct ModuleDir {
        _temp: TempDir,
        dir: Utf8PathBuf,
    }

    impl ModuleDir {
        fn write(&self, name: &str, contents: &str) -> &Self {
            std::fs::write(self.dir.join(name), contents).expect("write manifest");
            self
        }

        fn read(&self, name: &str) -> String {
            std::fs::read_to_string(self.dir.join(name)).expect("read manifest")
        }

        fn load(&self, mode: LoadMode) -> Box<dyn ManifestDescriptor> {
            FsManifestLoader::new()
                .load(&self.dir, mode)
                .expect("manifest loads")
        }
    }

    #[fixture]
    fn module_dir() -> ModuleDir {
        let temp = TempDir::new().expect("temp dir");
        let dir = Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).expect("utf-8 temp dir");
        ModuleDir { _temp: temp, dir }
    }

    fn env(version: &str) -> ToolEnv {
        ToolEnv::with_default_runtime(version)
    }

    #[test]
    fn parses_single_and_block_requirements() {
        let go_mod = GoMod::parse(
            "module \"example.com/m\"\n\ngo 1.21\n\n\
             require golang.org/x/mod v0.14.0\n\n\
             require (\n\tgithub.com/goplus/gop v1.1.0 // indirect\n\
             \tgithub.com/qiniu/x v1.13.2\n)\n",
        )
        .expect("parses");

        assert_eq!(go_mod.module.as_deref(), Some("example.com/m"));
        assert_eq!(go_mod.required_version("golang.org/x/mod"), Some("v0.14.0"));
        assert_eq!(go_mod.required_version(RUNTIME), Some("v1.1.0"));
        assert_eq!(go_mod.required_version("github.com/qiniu/x"), Some("v1.13.2"));
        assert_eq!(go_mod.required_version("absent"), None);
    }

    #[rstest]
    #[case::missing_version("module m\nrequire a/b\n")]
    #[case::unterminated_block("module m\nrequire (\n\ta/b v1.0.0\n")]
    fn rejects_malformed_go_mod(#[case] text: &str) {
        assert!(GoMod::parse(text).is_err());
    }

    #[test]
    fn ignores_requirements_in_other_blocks() {
        let go_mod =
            GoMod::parse("module m\nreplace (\n\ta/b => ./b\n)\nexclude (\n\tc/d v1.0.0\n)\n")
                .expect("parses");
        assert!(go_mod.requires.is_empty());
    }

    #[test]
    fn rewrites_block_requirement_in_place() {
        let go_mod = GoMod::parse(
            "module m\n\nrequire (\n\tgithub.com/goplus/gop v1.1.0 // pinned\n\ta/b v1.0.0\n)\n",
        )
        .expect("parses");
        let text = go_mod.with_requirement(RUNTIME, "v1.2.0");
        assert_eq!(
            text,
            "module m\n\nrequire (\n\tgithub.com/goplus/gop v1.2.0 // pinned\n\ta/b v1.0.0\n)\n"
        );
    }

    #[test]
    fn appends_missing_requirement() {
        let go_mod = GoMod::parse("module m\n\ngo 1.21").expect("parses");
        let text = go_mod.with_requirement(RUNTIME, "v1.2.0");
        assert_eq!(text, "module m\n\ngo 1.21\n\nrequire github.com/goplus/gop v1.2.0\n");
    }

    #[rstest]
    fn project_directive_marks_class_type(module_dir: ModuleDir) {
        module_dir
            .write(GO_MOD, "module example.com/game\n")
            .write(CLASS_MANIFEST, "gop 1.2\n\nproject .gmx Game github.com/goplus/spx\n");

        assert!(module_dir.load(LoadMode::Full).is_class_type());
    }

    #[rstest]
    #[case::no_class_manifest(None)]
    #[case::no_project(Some("gop 1.2\n"))]
    #[case::commented_out(Some("// project .gmx Game x\n"))]
    fn other_manifests_are_not_class_type(module_dir: ModuleDir, #[case] gop_mod: Option<&str>) {
        module_dir.write(GO_MOD, "module example.com/m\n");
        if let Some(text) = gop_mod {
            module_dir.write(CLASS_MANIFEST, text);
        }

        assert!(!module_dir.load(LoadMode::Full).is_class_type());
    }

    #[rstest]
    fn legacy_mode_ignores_class_manifest(module_dir: ModuleDir) {
        module_dir
            .write(GO_MOD, "module example.com/game\n")
            .write(CLASS_MANIFEST, "project .gmx Game github.com/goplus/spx\n");

        let manifest = module_dir.load(LoadMode::Legacy);

        assert!(!manifest.is_class_type());
        let err = manifest
            .update_canonical_form(&env("v1.2.0"), true)
            .expect_err("legacy manifests are read-only");
        assert!(matches!(err, FetchError::Manifest { .. }));
    }

    #[rstest]
    fn module_without_manifests_loads(module_dir: ModuleDir) {
        let manifest = module_dir.load(LoadMode::Full);
        assert!(!manifest.is_class_type());
        assert!(manifest.is_canonical(&env("v1.2.0")));
    }

    #[rstest]
    fn malformed_go_mod_is_manifest_error(module_dir: ModuleDir) {
        module_dir.write(GO_MOD, "module m\nrequire broken\n");
        let err = FsManifestLoader::new()
            .load(&module_dir.dir, LoadMode::Full)
            .err()
            .expect("malformed go.mod");
        assert!(matches!(err, FetchError::Manifest { .. }));
    }

    #[rstest]
    fn class_module_is_canonicalised_once(module_dir: ModuleDir) {
        module_dir
            .write(GO_MOD, "module example.com/game\n\nrequire github.com/goplus/gop v1.1.0\n")
            .write(CLASS_MANIFEST, "project .gmx Game github.com/goplus/spx\n");
        let env = env("v1.2.0");

        let manifest = module_dir.load(LoadMode::Full);
        assert!(!manifest.is_canonical(&env));
        manifest
            .update_canonical_form(&env, true)
            .expect("rewrite succeeds");

        assert_eq!(
            module_dir.read(GO_MOD),
            "module example.com/game\n\nrequire github.com/goplus/gop v1.2.0\n"
        );
        assert!(module_dir.load(LoadMode::Full).is_canonical(&env));
    }

    #[rstest]
    fn absent_requirement_needs_create_flag(module_dir: ModuleDir) {
        module_dir
            .write(GO_MOD, "module example.com/game\n")
            .write(CLASS_MANIFEST, "project .gmx Game github.com/goplus/spx\n");
        let env = env("v1.2.0");

        module_dir
            .load(LoadMode::Full)
            .update_canonical_form(&env, false)
            .expect("no-op");
        assert_eq!(module_dir.read(GO_MOD), "module example.com/game\n");

        module_dir
            .load(LoadMode::Full)
            .update_canonical_form(&env, true)
            .expect("rewrite succeeds");
        assert!(module_dir.read(GO_MOD).contains("require github.com/goplus/gop v1.2.0"));
    }

    #[rstest]
    fn class_module_without_go_mod_cannot_be_canonicalised(module_dir: ModuleDir) {
        module_dir.write(CLASS_MANIFEST, "project .gmx Game github.com/goplus/spx\n");

        let err = module_dir
            .load(LoadMode::Full)
            .update_canonical_form(&env("v1.2.0"), true)
            .expect_err("nothing to rewrite");

        assert!(matches!(err, FetchError::Manifest { .. }));
    }

    #[cfg(unix)]
    #[rstest]
    fn rewrite_keeps_file_permissions(module_dir: ModuleDir) {
        use std::fs::Permissions;
        use std::os::unix::fs::PermissionsExt;

        module_dir
            .write(GO_MOD, "module example.com/game\n")
            .write(CLASS_MANIFEST, "project .gmx Game github.com/goplus/spx\n");
        let go_mod = module_dir.dir.join(GO_MOD);
        std::fs::set_permissions(&go_mod, Permissions::from_mode(0o444)).expect("chmod");

        module_dir
            .load(LoadMode::Full)
            .update_canonical_form(&env("v1.2.0"), true)
            .expect("rewrite succeeds");

        let mode = std::fs::metadata(&go_mod).expect("metadata").permissions().mode();
        assert_eq!(mode & 0o777, 0o444);
    }
}
