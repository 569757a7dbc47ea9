use dependency_owners_core::{
    DependencyLoader, DependencyOwnersError, DependencyOwnersOptions, DependencyOwnersService,
    LoaderError, LoaderRef, LoaderResult, OwnershipReport, ResolveError,
};
use serde_json::json;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

struct Fixture {
    dir: TempDir,
}

impl Fixture {
    fn new() -> Self {
        Self {
            dir: tempfile::tempdir().expect("temp dir"),
        }
    }

    fn with_scenario_files() -> Self {
        let fixture = Self::new();
        fixture.write_json(
            "dependency-owners.json",
            &json!({ "alice": ["dep1"], "bob": ["dep2"] }),
        );
        fixture.write_json(
            "package.json",
            &json!({
                "dependencies": { "dep1": "^1.0.0", "dep2": "^2.0.0", "dep3": "^3.0.0" }
            }),
        );
        fixture
    }

    fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    fn write_json(&self, name: &str, value: &serde_json::Value) -> PathBuf {
        let path = self.path(name);
        std::fs::write(&path, serde_json::to_string(value).expect("serialize fixture"))
            .expect("write fixture");
        path
    }

    fn service(&self) -> DependencyOwnersService {
        DependencyOwnersService::new(self.dir.path())
    }

    fn options(&self) -> DependencyOwnersOptions {
        DependencyOwnersOptions::new()
            .dependency_file(self.path("package.json"))
            .config_file(self.path("dependency-owners.json"))
    }
}

fn as_json(report: &OwnershipReport) -> serde_json::Value {
    serde_json::to_value(report).expect("serialize report")
}

fn scenario_a_report() -> serde_json::Value {
    json!({ "dep1": ["alice"], "dep2": ["bob"], "dep3": [] })
}

struct FixedLoader(Vec<&'static str>);

impl DependencyLoader for FixedLoader {
    fn can_load(&self, _file: &Path) -> LoaderResult<bool> {
        Ok(true)
    }

    fn load(&self, _file: &Path) -> LoaderResult<Vec<String>> {
        Ok(self.0.iter().map(|name| name.to_string()).collect())
    }
}

#[test]
fn returns_owners_for_manifest_dependencies() {
    let fixture = Fixture::with_scenario_files();

    let report = fixture
        .service()
        .compute_ownership(&fixture.options().loader("@dependency-owners/package-json-loader"))
        .expect("lookup should succeed");

    assert_eq!(as_json(&report), scenario_a_report());
    assert_eq!(report.dependencies(), vec!["dep1", "dep2", "dep3"]);
}

#[test]
fn default_loader_and_default_paths_use_working_directory() {
    let fixture = Fixture::with_scenario_files();

    let report = fixture
        .service()
        .compute_ownership(&DependencyOwnersOptions::new())
        .expect("lookup should succeed");

    assert_eq!(as_json(&report), scenario_a_report());
}

#[test]
fn loader_value_matches_manifest_result() {
    let fixture = Fixture::with_scenario_files();

    let report = fixture
        .service()
        .compute_ownership(
            &fixture
                .options()
                .loader(LoaderRef::value(FixedLoader(vec!["dep1", "dep2", "dep3"]))),
        )
        .expect("lookup should succeed");

    assert_eq!(as_json(&report), scenario_a_report());
}

#[test]
fn allowlist_restricts_report() {
    let fixture = Fixture::with_scenario_files();

    let report = fixture
        .service()
        .compute_ownership(&fixture.options().dependencies(["dep1"]))
        .expect("lookup should succeed");

    assert_eq!(as_json(&report), json!({ "dep1": ["alice"] }));
}

#[test]
fn fails_when_no_loader_handles_dependency_file() {
    let fixture = Fixture::with_scenario_files();
    let unknown = fixture.write_json(
        "unknown.json",
        &json!({ "dependencies": { "dep1": "^1.0.0" } }),
    );

    let err = fixture
        .service()
        .compute_ownership(&fixture.options().dependency_file(&unknown))
        .expect_err("unknown file must fail");

    assert!(matches!(err, DependencyOwnersError::NoLoaderFound { .. }));
    assert_eq!(
        err.to_string(),
        format!("no loader found for file: {}", unknown.display())
    );
}

#[test]
fn missing_ownership_map_surfaces_not_found_with_path() {
    let fixture = Fixture::new();
    fixture.write_json("package.json", &json!({ "dependencies": { "dep1": "^1.0.0" } }));
    let config_file = fixture.path("dependency-owners.json");

    let err = fixture
        .service()
        .compute_ownership(&fixture.options())
        .expect_err("missing ownership map must fail");

    match &err {
        DependencyOwnersError::OwnershipMap(input) => {
            assert_eq!(input.io_kind(), Some(io::ErrorKind::NotFound));
            assert_eq!(input.path(), config_file.as_path());
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(err.to_string().contains(&config_file.display().to_string()));
}

#[test]
fn malformed_ownership_map_is_reported() {
    let fixture = Fixture::with_scenario_files();
    std::fs::write(fixture.path("dependency-owners.json"), "{ alice: [dep1] }")
        .expect("write fixture");

    let err = fixture
        .service()
        .compute_ownership(&fixture.options())
        .expect_err("malformed ownership map must fail");
    assert!(matches!(err, DependencyOwnersError::OwnershipMap(_)));
}

#[test]
fn non_list_owner_values_are_ignored() {
    let fixture = Fixture::with_scenario_files();
    fixture.write_json(
        "dependency-owners.json",
        &json!({ "alice": ["dep1"], "carol": "dep3", "dave": null, "bob": ["dep2", "dep3"] }),
    );

    let report = fixture
        .service()
        .compute_ownership(&fixture.options())
        .expect("lookup should succeed");

    assert_eq!(
        as_json(&report),
        json!({ "dep1": ["alice"], "dep2": ["bob"], "dep3": ["bob"] })
    );
}

#[test]
fn unknown_reference_fails_import() {
    let fixture = Fixture::with_scenario_files();

    let err = fixture
        .service()
        .compute_ownership(&fixture.options().loader("./missing-loader.json"))
        .expect_err("unknown loader must fail");

    assert!(matches!(
        err,
        DependencyOwnersError::Resolve(ResolveError::ImportFailed { .. })
    ));
    assert_eq!(
        err.to_string(),
        "failed to import loader: ./missing-loader.json"
    );
}

#[test]
fn invalid_plugin_manifest_names_reference_and_contract() {
    let fixture = Fixture::with_scenario_files();
    let loader_path = fixture.write_json(
        "custom-loader.json",
        &json!({ "invalidFunc": { "command": "true" } }),
    );
    let reference = loader_path.display().to_string();

    let err = fixture
        .service()
        .compute_ownership(&fixture.options().loader(reference.as_str()))
        .expect_err("invalid loader must fail");

    assert!(matches!(
        err,
        DependencyOwnersError::Resolve(ResolveError::InvalidLoader { .. })
    ));
    let message = err.to_string();
    assert!(message.starts_with(&format!("invalid loader: {reference}.")));
    assert!(message.contains("'canLoad' and 'load'"));
}

#[test]
fn failing_probe_propagates_unchanged() {
    struct BrokenProbe;

    impl DependencyLoader for BrokenProbe {
        fn can_load(&self, file: &Path) -> LoaderResult<bool> {
            Err(LoaderError::Plugin {
                reference: "broken".to_string(),
                entrypoint: "canLoad",
                message: format!("cannot stat {}", file.display()),
            })
        }

        fn load(&self, _file: &Path) -> LoaderResult<Vec<String>> {
            Ok(Vec::new())
        }
    }

    let fixture = Fixture::with_scenario_files();
    let err = fixture
        .service()
        .compute_ownership(&fixture.options().loader(LoaderRef::value(BrokenProbe)))
        .expect_err("probe failure must fail");

    assert!(matches!(
        err,
        DependencyOwnersError::Resolve(ResolveError::Probe(LoaderError::Plugin { .. }))
    ));
}

#[test]
fn repeated_lookups_are_independent() {
    let fixture = Fixture::with_scenario_files();
    let service = fixture.service();
    let options = fixture.options().loader("package-json");

    let first = service.compute_ownership(&options).expect("first lookup");
    fixture.write_json(
        "dependency-owners.json",
        &json!({ "carol": ["dep1", "dep2", "dep3"] }),
    );
    let second = service.compute_ownership(&options).expect("second lookup");

    assert_eq!(as_json(&first), scenario_a_report());
    assert_eq!(
        as_json(&second),
        json!({ "dep1": ["carol"], "dep2": ["carol"], "dep3": ["carol"] })
    );
}

#[test]
fn shared_loader_value_is_usable_across_threads() {
    let fixture = Fixture::with_scenario_files();
    let loader: Arc<dyn DependencyLoader> = Arc::new(FixedLoader(vec!["dep2"]));
    let options = fixture.options().loader(loader);
    let cwd = fixture.dir.path().to_path_buf();

    let handle = std::thread::spawn(move || {
        DependencyOwnersService::new(cwd)
            .compute_ownership(&options)
            .map(|report| serde_json::to_value(&report).expect("serialize report"))
    });
    let report = handle
        .join()
        .expect("worker should not panic")
        .expect("lookup should succeed");

    assert_eq!(report, json!({ "dep2": ["bob"] }));
}

#[cfg(unix)]
mod plugins {
    use super::{as_json, scenario_a_report, Fixture};
    use dependency_owners_core::{
        DependencyOwnersError, LoaderError, LoaderRef, LoaderResolver, ResolveError,
    };
    use serde_json::json;
    use std::os::unix::fs::PermissionsExt;
    use std::path::Path;

    fn shell(script: &str) -> serde_json::Value {
        json!({ "command": "sh", "args": ["-c", script] })
    }

    fn load_script() -> serde_json::Value {
        shell(r#"echo '["dep1", {"name": "dep2", "version": "1.2.3"}, "dep3"]'"#)
    }

    #[test]
    fn plugin_manifest_by_absolute_path() {
        let fixture = Fixture::with_scenario_files();
        let manifest = fixture.write_json(
            "custom-loader.json",
            &json!({ "canLoad": shell("echo true"), "load": load_script() }),
        );

        let report = fixture
            .service()
            .compute_ownership(&fixture.options().loader(manifest.display().to_string()))
            .expect("lookup should succeed");

        assert_eq!(as_json(&report), scenario_a_report());
    }

    #[test]
    fn plugin_manifest_relative_to_working_directory_with_default_export() {
        let fixture = Fixture::with_scenario_files();
        fixture.write_json(
            "custom-loader.json",
            &json!({
                "default": { "canLoad": shell("echo true"), "load": load_script() },
                "load": shell("exit 3")
            }),
        );

        let report = fixture
            .service()
            .compute_ownership(&fixture.options().loader("custom-loader.json"))
            .expect("lookup should succeed");

        assert_eq!(as_json(&report), scenario_a_report());
    }

    #[test]
    fn plugin_receives_dependency_file_path() {
        let fixture = Fixture::with_scenario_files();
        // `sh -c script file`: the appended file path lands in $0.
        fixture.write_json(
            "custom-loader.json",
            &json!({
                "canLoad": shell(r#"case "$0" in *.lock) echo true ;; *) echo false ;; esac"#),
                "load": load_script()
            }),
        );

        let err = fixture
            .service()
            .compute_ownership(&fixture.options().loader("custom-loader.json"))
            .expect_err("plugin should decline package.json");
        assert!(matches!(err, DependencyOwnersError::NoLoaderFound { .. }));

        let lock_file = fixture.path("deps.lock");
        std::fs::write(&lock_file, "").expect("write lock file");
        let report = fixture
            .service()
            .compute_ownership(
                &fixture
                    .options()
                    .dependency_file(&lock_file)
                    .loader("custom-loader.json"),
            )
            .expect("plugin should accept lock file");
        assert_eq!(as_json(&report), scenario_a_report());
    }

    #[test]
    fn relative_plugin_programs_resolve_next_to_manifest() {
        let fixture = Fixture::with_scenario_files();
        let plugin_dir = fixture.path("plugins");
        std::fs::create_dir_all(&plugin_dir).expect("create plugin dir");
        let probe = plugin_dir.join("probe.sh");
        std::fs::write(&probe, "#!/bin/sh\necho true\n").expect("write probe");
        let mut permissions = std::fs::metadata(&probe).expect("probe metadata").permissions();
        permissions.set_mode(0o755);
        std::fs::set_permissions(&probe, permissions).expect("chmod probe");
        std::fs::write(
            plugin_dir.join("loader.json"),
            serde_json::to_string(&json!({ "canLoad": "./probe.sh", "load": load_script() }))
                .expect("serialize manifest"),
        )
        .expect("write manifest");

        let report = fixture
            .service()
            .compute_ownership(&fixture.options().loader("plugins/loader.json"))
            .expect("lookup should succeed");
        assert_eq!(as_json(&report), scenario_a_report());
    }

    #[test]
    fn plugin_failures_are_loader_faults() {
        let fixture = Fixture::with_scenario_files();
        fixture.write_json(
            "failing-probe.json",
            &json!({ "canLoad": shell("echo boom >&2; exit 2"), "load": load_script() }),
        );
        fixture.write_json(
            "bad-output.json",
            &json!({ "canLoad": shell("echo true"), "load": shell("echo not-json") }),
        );

        let err = fixture
            .service()
            .compute_ownership(&fixture.options().loader("failing-probe.json"))
            .expect_err("failing probe must fail");
        assert!(matches!(
            err,
            DependencyOwnersError::Resolve(ResolveError::Probe(LoaderError::Plugin { .. }))
        ));
        assert!(err.to_string().contains("boom"));

        let err = fixture
            .service()
            .compute_ownership(&fixture.options().loader("bad-output.json"))
            .expect_err("unparsable load output must fail");
        assert!(matches!(
            err,
            DependencyOwnersError::Load(LoaderError::Plugin { entrypoint: "load", .. })
        ));
    }

    #[test]
    fn resolving_same_reference_twice_behaves_identically() {
        let fixture = Fixture::with_scenario_files();
        fixture.write_json(
            "custom-loader.json",
            &json!({ "canLoad": shell("echo true"), "load": load_script() }),
        );
        let resolver = LoaderResolver::new(fixture.dir.path());
        let reference = LoaderRef::from("custom-loader.json");
        let file = fixture.path("package.json");

        let first = resolver
            .resolve(&reference, &file)
            .expect("first resolve")
            .expect("first loader handles file");
        let second = resolver
            .resolve(&reference, &file)
            .expect("second resolve")
            .expect("second loader handles file");

        assert_eq!(
            first.load(Path::new(&file)).expect("first load"),
            second.load(Path::new(&file)).expect("second load")
        );
    }
}
