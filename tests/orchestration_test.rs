mod helpers;

use std::fs;
use std::sync::Arc;

use helpers::{
    BASE_PULL_SECRET, FakeCluster, REGISTRY, install_args, installer_error, work_dir,
};
use odfdr_installer::InstallerError;
use odfdr_installer::executor::{CommandExecutor, RealCommandExecutor};
use odfdr_installer::installer::StepFailure;
use odfdr_installer::run_install;

fn run(fake: &Arc<FakeCluster>, work_dir: &camino::Utf8PathBuf) -> anyhow::Result<()> {
    let executor: Arc<dyn CommandExecutor> = fake.clone();
    run_install(&install_args(work_dir), executor)
}

#[test]
fn adds_registry_credential_and_applies_manifests() {
    let (_dir, path) = work_dir();
    let fake = Arc::new(FakeCluster::new(BASE_PULL_SECRET));

    run(&fake, &path).expect("run should succeed");

    assert_eq!(
        fake.subcommands(),
        vec!["login", "get", "registry", "set", "get", "apply", "apply"]
    );

    let secret = fake.secret_json();
    let auths = secret["auths"].as_object().unwrap();
    assert_eq!(auths.len(), 2);
    assert!(auths.contains_key("registry.redhat.io"));
    assert_eq!(auths[REGISTRY]["auth"], "xyz");

    for name in [
        "ocp-pull-secret.json",
        "ocp-append-pull-secret.json",
        "ocp-new-pull-secret.json",
        "ocp-icsp.yaml",
        "ocp-catalogsource.yaml",
    ] {
        assert!(path.join(name).exists(), "missing scratch file {}", name);
    }
    let snapshot = fs::read_to_string(path.join("ocp-pull-secret.json")).unwrap();
    assert_eq!(snapshot, BASE_PULL_SECRET);
}

#[test]
fn manifests_are_applied_mirroring_policy_first() {
    let (_dir, path) = work_dir();
    let fake = Arc::new(FakeCluster::new(BASE_PULL_SECRET));

    run(&fake, &path).unwrap();

    let applied: Vec<String> = fake
        .calls()
        .into_iter()
        .filter(|args| args[0] == "apply")
        .map(|args| args[2].clone())
        .collect();
    assert_eq!(
        applied,
        vec![
            path.join("ocp-icsp.yaml").to_string(),
            path.join("ocp-catalogsource.yaml").to_string(),
        ]
    );
    let rendered = fs::read_to_string(path.join("ocp-icsp.yaml")).unwrap();
    assert_eq!(rendered, odfdr_installer::manifest::IMAGE_CONTENT_SOURCE_POLICY);
}

#[test]
fn every_call_uses_the_session_kubeconfig() {
    let (_dir, path) = work_dir();
    let fake = Arc::new(FakeCluster::new(BASE_PULL_SECRET));

    run(&fake, &path).unwrap();

    let envs = fake.envs.lock().unwrap();
    let first = envs[0].clone();
    assert_eq!(first.len(), 1);
    assert_eq!(first[0].0, "KUBECONFIG");
    assert!(first[0].1.contains("ocp-kubeconfig-"));
    assert!(envs.iter().all(|env| *env == first));
}

#[test]
fn already_configured_cluster_is_left_untouched() {
    let (_dir, path) = work_dir();
    let configured = r#"{"auths":{"quay.io/rhceph-dev":{"auth":"old"}}}"#;
    let fake = Arc::new(FakeCluster::new(configured));

    run(&fake, &path).unwrap();

    assert_eq!(fake.subcommands(), vec!["login", "get", "apply", "apply"]);
    assert_eq!(fake.secret_json()["auths"].as_object().unwrap().len(), 1);
    assert_eq!(fake.secret_json()["auths"][REGISTRY]["auth"], "old");
    assert!(!path.join("ocp-new-pull-secret.json").exists());
}

#[test]
fn empty_registry_login_aborts_before_writing() {
    let (_dir, path) = work_dir();
    let fake = Arc::new(FakeCluster::new(BASE_PULL_SECRET).with_registry_output(r#"{"auths":{}}"#));

    let err = run(&fake, &path).unwrap_err();

    match installer_error(&err) {
        Some(InstallerError::MergeCountMismatch {
            expected, actual, ..
        }) => {
            assert_eq!(*expected, 2);
            assert_eq!(*actual, 1);
        }
        other => panic!("expected MergeCountMismatch, got {:?}", other),
    }
    assert_eq!(fake.subcommands(), vec!["login", "get", "registry"]);
    assert_eq!(fake.secret.lock().unwrap().as_slice(), BASE_PULL_SECRET.as_bytes());
    assert!(format!("{:#}", err).contains("ocp-append-pull-secret.json"));
}

#[test]
fn registry_login_for_wrong_key_aborts_before_writing() {
    let (_dir, path) = work_dir();
    let fake = Arc::new(
        FakeCluster::new(BASE_PULL_SECRET).with_registry_output(r#"{"auths":{"quay.io":{"auth":"xyz"}}}"#),
    );

    let err = run(&fake, &path).unwrap_err();

    assert!(matches!(
        installer_error(&err),
        Some(InstallerError::RegistryKeyMismatch { produced, .. }) if produced == &["quay.io".to_string()]
    ));
    assert_eq!(fake.subcommands(), vec!["login", "get", "registry"]);
    assert_eq!(fake.secret.lock().unwrap().as_slice(), BASE_PULL_SECRET.as_bytes());
    assert!(!path.join("ocp-new-pull-secret.json").exists());
}

#[test]
fn malformed_pull_secret_skips_registry_login() {
    let (_dir, path) = work_dir();
    let fake = Arc::new(FakeCluster::new(r#"{"registries":{}}"#));

    let err = run(&fake, &path).unwrap_err();

    assert!(matches!(
        installer_error(&err),
        Some(InstallerError::MalformedDocument { .. })
    ));
    assert_eq!(fake.subcommands(), vec!["login", "get"]);
}

#[test]
fn login_failure_is_auth_error_and_stops_the_run() {
    let (_dir, path) = work_dir();
    let fake = Arc::new(FakeCluster::new(BASE_PULL_SECRET).failing_when(|args| args[0] == "login"));

    let err = run(&fake, &path).unwrap_err();

    assert!(matches!(installer_error(&err), Some(InstallerError::Auth { .. })));
    assert_eq!(fake.subcommands(), vec!["login"]);
    assert!(!format!("{:#}", err).contains("cluster-password"));
    assert_eq!(
        err.downcast_ref::<StepFailure>(),
        Some(&StepFailure {
            step: "login",
            cluster: Some("ocp".to_string()),
        })
    );
    assert!(err.to_string().starts_with("login step failed"));
}

#[test]
fn registry_login_failure_is_acquisition_error() {
    let (_dir, path) = work_dir();
    let fake =
        Arc::new(FakeCluster::new(BASE_PULL_SECRET).failing_when(|args| args[0] == "registry"));

    let err = run(&fake, &path).unwrap_err();

    assert!(matches!(
        installer_error(&err),
        Some(InstallerError::CredentialAcquisitionFailed { .. })
    ));
    assert!(!format!("{:#}", err).contains("rhceph-password"));
    assert!(!fake.subcommands().contains(&"set".to_string()));
}

#[test]
fn catalog_source_failure_keeps_earlier_steps() {
    let (_dir, path) = work_dir();
    let fake = Arc::new(
        FakeCluster::new(BASE_PULL_SECRET)
            .failing_when(|args| args[0] == "apply" && args[2].ends_with("catalogsource.yaml")),
    );

    let err = run(&fake, &path).unwrap_err();

    match installer_error(&err) {
        Some(InstallerError::Apply { manifest, cluster, .. }) => {
            assert_eq!(manifest, "CatalogSource");
            assert_eq!(cluster, "ocp");
        }
        other => panic!("expected Apply error, got {:?}", other),
    }
    assert_eq!(fake.subcommands().iter().filter(|s| *s == "apply").count(), 2);
    assert_eq!(fake.secret_json()["auths"].as_object().unwrap().len(), 2);
}

#[test]
fn unpersisted_update_is_detected() {
    let (_dir, path) = work_dir();
    let fake = Arc::new(FakeCluster::new(BASE_PULL_SECRET).ignoring_writes());

    let err = run(&fake, &path).unwrap_err();

    assert!(matches!(installer_error(&err), Some(InstallerError::NotPersisted { .. })));
    assert!(!fake.subcommands().contains(&"apply".to_string()));
}

#[test]
fn missing_oc_fails_before_any_cluster_call() {
    let (_dir, path) = work_dir();
    let fake = Arc::new(FakeCluster::new(BASE_PULL_SECRET).without_command("oc"));

    let err = run(&fake, &path).unwrap_err();

    assert!(matches!(installer_error(&err), Some(InstallerError::Precondition(_))));
    assert!(fake.calls().is_empty());
    let failure = err.downcast_ref::<StepFailure>().unwrap();
    assert_eq!(failure.step, "preflight");
    assert_eq!(failure.cluster, None);
}

#[test]
fn unparsable_url_fails_before_login() {
    let (_dir, path) = work_dir();
    let fake = Arc::new(FakeCluster::new(BASE_PULL_SECRET));
    let mut args = install_args(&path);
    args.url = "localhost:6443".to_string();

    let executor: Arc<dyn CommandExecutor> = fake.clone();
    let err = run_install(&args, executor).unwrap_err();

    assert!(matches!(installer_error(&err), Some(InstallerError::ClusterName { .. })));
    assert!(fake.calls().is_empty());
}

#[test]
fn dry_run_writes_nothing() {
    let (_dir, path) = work_dir();
    let mut args = install_args(&path);
    args.dry_run = true;

    let executor: Arc<dyn CommandExecutor> = Arc::new(RealCommandExecutor { dry_run: true });
    run_install(&args, executor).expect("dry run should succeed");

    assert_eq!(fs::read_dir(&path).unwrap().count(), 0);
}
