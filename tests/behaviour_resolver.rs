//! Behaviour-driven tests for the resolve-or-fetch protocol.
//!
//! These scenarios drive [`Resolver::get`] against a temporary module cache
//! with a stubbed go command standing in for real downloads.

use modfetch::config::{FetchConfig, FetchPolicy, Protocol};
use modfetch::gomod::{FsManifestLoader, GO_MOD};
use modfetch::test_utils::{
    CacheFixture, ExpectedCall, SeededModule, StubExecutor, failure_output, report_output,
    success_output,
};
use modfetch::{FetchError, GetOptions, ModuleReference, ResolvedModule, Resolver, ToolEnv};
use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};
use std::cell::{Cell, RefCell};

const FAILURE_STDERR: &str =
    "go: example.com/mod@latest: no matching versions for query \"latest\"\n";

#[derive(Default)]
struct ResolverWorld {
    cache: CacheFixture,
    policy: RefCell<FetchPolicy>,
    env: RefCell<Option<ToolEnv>>,
    calls: RefCell<Vec<ExpectedCall>>,
    result: RefCell<Option<modfetch::Result<ResolvedModule>>>,
    progress: RefCell<String>,
    invocations: RefCell<Vec<String>>,
    pending_calls: Cell<usize>,
}

impl ResolverWorld {
    fn expect_call(
        &self,
        subcommand: &str,
        target: &str,
        output: std::process::Output,
    ) -> ExpectedCall {
        ExpectedCall::new("go", [subcommand, target], Ok(output))
    }

    fn resolved(&self) -> ResolvedModule {
        match self.result.borrow().as_ref() {
            Some(Ok(module)) => module.clone(),
            Some(Err(err)) => panic!("expected a resolved module, got {err}"),
            None => panic!("no resolution attempted"),
        }
    }

    fn error(&self) -> FetchError {
        match self.result.borrow().as_ref() {
            Some(Err(err)) => err.clone(),
            Some(Ok(module)) => panic!("expected failure, resolved {}", module.reference()),
            None => panic!("no resolution attempted"),
        }
    }

    fn resolve(&self, input: &str, options: GetOptions) {
        let reference = ModuleReference::parse(input).expect("valid reference");
        let config = FetchConfig::new(self.cache.root()).with_policy(self.policy.borrow().clone());
        let executor = StubExecutor::new(self.calls.take());
        let loader = FsManifestLoader::new();
        let mut progress = Vec::new();

        let env = self.env.borrow();
        let result = Resolver::new(&config, &executor, &loader).get(
            &reference,
            env.as_ref(),
            options,
            &mut progress,
        );

        self.invocations.replace(executor.invocations());
        self.pending_calls.set(executor.remaining());
        self.progress
            .replace(String::from_utf8(progress).expect("utf-8 progress"));
        self.result.replace(Some(result));
    }
}

#[fixture]
fn world() -> ResolverWorld {
    ResolverWorld::default()
}

// ---------------------------------------------------------------------------
// Given
// ---------------------------------------------------------------------------

#[given("the module cache holds plain module {path} at {version}")]
fn given_plain_module(world: &ResolverWorld, path: String, version: String) {
    world.cache.add_module(&path, &version);
}

#[given("the module cache holds class module {path} at {version}")]
fn given_class_module(world: &ResolverWorld, path: String, version: String) {
    world.cache.add_class_module(&path, &version);
}

#[given("a tool environment requiring runtime {version}")]
fn given_tool_env(world: &ResolverWorld, version: String) {
    world.env.replace(Some(ToolEnv::with_default_runtime(version)));
}

#[given("the get protocol")]
fn given_get_protocol(world: &ResolverWorld) {
    world.policy.replace(FetchPolicy::for_protocol(Protocol::Get));
}

fn given_download(
    world: &ResolverWorld,
    subcommand: &str,
    target: &str,
    module: SeededModule,
    path: &str,
    version: &str,
) {
    let report = format!("go: downloading {path} {version}\n");
    let call = world
        .expect_call(subcommand, target, report_output(&report))
        .creating(module);
    world.calls.borrow_mut().push(call);
}

#[given("running go {subcommand} {target} downloads plain module {path} at {version}")]
fn given_plain_download(
    world: &ResolverWorld,
    subcommand: String,
    target: String,
    path: String,
    version: String,
) {
    let module = world.cache.plain(&path, &version);
    given_download(world, &subcommand, &target, module, &path, &version);
}

#[given("running go {subcommand} {target} downloads class module {path} at {version}")]
fn given_class_download(
    world: &ResolverWorld,
    subcommand: String,
    target: String,
    path: String,
    version: String,
) {
    let module = world.cache.class(&path, &version);
    given_download(world, &subcommand, &target, module, &path, &version);
}

#[given("running go {subcommand} {target} fails with no report")]
fn given_failed_run(world: &ResolverWorld, subcommand: String, target: String) {
    let call = world.expect_call(&subcommand, &target, failure_output(FAILURE_STDERR));
    world.calls.borrow_mut().push(call);
}

#[given("running go {subcommand} {target} succeeds without downloading")]
fn given_silent_run(world: &ResolverWorld, subcommand: String, target: String) {
    let call = world.expect_call(&subcommand, &target, success_output());
    world.calls.borrow_mut().push(call);
}

// ---------------------------------------------------------------------------
// When
// ---------------------------------------------------------------------------

#[when("{reference} is resolved")]
fn when_resolved(world: &ResolverWorld, reference: String) {
    world.resolve(&reference, GetOptions::default());
}

#[when("{reference} is resolved without the cache")]
fn when_resolved_without_cache(world: &ResolverWorld, reference: String) {
    world.resolve(&reference, GetOptions { no_cache: true });
}

// ---------------------------------------------------------------------------
// Then
// ---------------------------------------------------------------------------

#[then("the resolved version is {version}")]
fn then_version(world: &ResolverWorld, version: String) {
    assert_eq!(world.resolved().version(), version);
}

#[then("the module was found {how}")]
fn then_resolution(world: &ResolverWorld, how: String) {
    assert_eq!(world.resolved().resolution().as_str(), how);
}

#[then("the module is class-type")]
fn then_class_type(world: &ResolverWorld) {
    assert!(world.resolved().is_class_type());
}

#[then("the module is not class-type")]
fn then_not_class_type(world: &ResolverWorld) {
    assert!(!world.resolved().is_class_type());
}

#[then("the go command was not run")]
fn then_not_run(world: &ResolverWorld) {
    assert!(
        world.invocations.borrow().is_empty(),
        "unexpected invocations: {:?}",
        world.invocations.borrow()
    );
}

#[then("every expected go command ran")]
fn then_all_ran(world: &ResolverWorld) {
    assert_eq!(world.pending_calls.get(), 0, "expected calls left unconsumed");
}

#[then("progress reports downloading {path} {version}")]
fn then_progress(world: &ResolverWorld, path: String, version: String) {
    let expected = format!("modfetch: downloading {path} {version}\n");
    assert!(
        world.progress.borrow().contains(&expected),
        "progress was {:?}",
        world.progress.borrow()
    );
}

#[then("the module's go.mod requires runtime {version}")]
fn then_runtime_required(world: &ResolverWorld, version: String) {
    let module = world.resolved();
    let go_mod = std::fs::read_to_string(module.dir().join(GO_MOD)).expect("read go.mod");
    let expected = format!("require {} {version}", modfetch::manifest::DEFAULT_RUNTIME_MODULE);
    assert!(go_mod.contains(&expected), "go.mod was {go_mod:?}");
}

#[then("the module directory is read-only again")]
fn then_read_only(world: &ResolverWorld) {
    let module = world.resolved();
    let permissions = std::fs::metadata(module.dir())
        .expect("module dir metadata")
        .permissions();
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        assert_eq!(permissions.mode() & 0o777, 0o555);
    }
    #[cfg(not(unix))]
    assert!(permissions.readonly());
}

#[then("resolution fails with the command's stderr")]
fn then_fails_with_stderr(world: &ResolverWorld) {
    let FetchError::SubprocessFailure { stderr, .. } = world.error() else {
        panic!("expected a subprocess failure, got {}", world.error());
    };
    assert_eq!(stderr, FAILURE_STDERR.as_bytes());
}

#[then("resolution fails because the module is not found")]
fn then_not_found(world: &ResolverWorld) {
    assert!(world.error().is_not_found());
}

// ---------------------------------------------------------------------------
// Scenario bindings
// ---------------------------------------------------------------------------

#[scenario(path = "tests/features/resolver.feature", index = 0)]
fn scenario_cached_module(world: ResolverWorld) {
    let _ = world;
}

#[scenario(path = "tests/features/resolver.feature", index = 1)]
fn scenario_highest_cached_version(world: ResolverWorld) {
    let _ = world;
}

#[scenario(path = "tests/features/resolver.feature", index = 2)]
fn scenario_download_class_module(world: ResolverWorld) {
    let _ = world;
}

#[scenario(path = "tests/features/resolver.feature", index = 3)]
fn scenario_failed_download(world: ResolverWorld) {
    let _ = world;
}

#[scenario(path = "tests/features/resolver.feature", index = 4)]
fn scenario_silent_download(world: ResolverWorld) {
    let _ = world;
}

#[scenario(path = "tests/features/resolver.feature", index = 5)]
fn scenario_no_cache(world: ResolverWorld) {
    let _ = world;
}

#[scenario(path = "tests/features/resolver.feature", index = 6)]
fn scenario_get_protocol(world: ResolverWorld) {
    let _ = world;
}

#[scenario(path = "tests/features/resolver.feature", index = 7)]
fn scenario_cached_class_module(world: ResolverWorld) {
    let _ = world;
}
