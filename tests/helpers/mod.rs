use std::fs;
use std::sync::Mutex;

use anyhow::Result;
use camino::Utf8PathBuf;
use odfdr_installer::InstallerError;
use odfdr_installer::cli::{InstallArgs, LogLevel};
use odfdr_installer::executor::{CommandExecutor, CommandSpec, ExecutionResult};

pub const REGISTRY: &str = "quay.io/rhceph-dev";
#[allow(dead_code)]
pub const URL: &str = "api.ocp.example.com:6443";

/// Pull secret holding only the Red Hat registry.
#[allow(dead_code)]
pub const BASE_PULL_SECRET: &str = r#"{"auths":{"registry.redhat.io":{"auth":"cmVkaGF0"}}}"#;

/// Output of a successful `oc registry login`.
#[allow(dead_code)]
pub const RHCEPH_CREDENTIAL: &str = r#"{"auths":{"quay.io/rhceph-dev":{"auth":"xyz"}}}"#;

type FailPredicate = Box<dyn Fn(&[String]) -> bool + Send + Sync>;

/// In-memory stand-in for `oc` talking to a single cluster.
///
/// Serves and stores the pull secret, writes the registry-login file and
/// records every invocation.
#[allow(dead_code)]
pub struct FakeCluster {
    pub secret: Mutex<Vec<u8>>,
    pub registry_output: Vec<u8>,
    pub calls: Mutex<Vec<Vec<String>>>,
    pub envs: Mutex<Vec<Vec<(String, String)>>>,
    pub missing_commands: Vec<String>,
    pub ignore_writes: bool,
    fail_when: Option<FailPredicate>,
}

#[allow(dead_code)]
impl FakeCluster {
    pub fn new(secret: &str) -> Self {
        Self {
            secret: Mutex::new(secret.as_bytes().to_vec()),
            registry_output: RHCEPH_CREDENTIAL.as_bytes().to_vec(),
            calls: Mutex::new(Vec::new()),
            envs: Mutex::new(Vec::new()),
            missing_commands: Vec::new(),
            ignore_writes: false,
            fail_when: None,
        }
    }

    pub fn with_registry_output(mut self, output: &str) -> Self {
        self.registry_output = output.as_bytes().to_vec();
        self
    }

    pub fn failing_when(mut self, predicate: impl Fn(&[String]) -> bool + Send + Sync + 'static) -> Self {
        self.fail_when = Some(Box::new(predicate));
        self
    }

    pub fn without_command(mut self, command: &str) -> Self {
        self.missing_commands.push(command.to_string());
        self
    }

    pub fn ignoring_writes(mut self) -> Self {
        self.ignore_writes = true;
        self
    }

    /// `oc` subcommands in call order (e.g. `["login", "get", "apply"]`).
    pub fn subcommands(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .map(|args| args.first().cloned().unwrap_or_default())
            .collect()
    }

    pub fn calls(&self) -> Vec<Vec<String>> {
        self.calls.lock().unwrap().clone()
    }

    pub fn secret_json(&self) -> serde_json::Value {
        serde_json::from_slice(&self.secret.lock().unwrap()).unwrap()
    }
}

impl CommandExecutor for FakeCluster {
    fn execute(&self, spec: &CommandSpec) -> Result<ExecutionResult> {
        assert_eq!(spec.command, "oc");
        self.calls.lock().unwrap().push(spec.args.clone());
        self.envs.lock().unwrap().push(spec.env.clone());

        if let Some(fail) = &self.fail_when {
            if fail(spec.args.as_slice()) {
                anyhow::bail!("simulated failure: oc {}", spec.display());
            }
        }

        let mut result = ExecutionResult::default();
        match spec.args.first().map(String::as_str) {
            Some("get") => {
                result.stdout = Some(self.secret.lock().unwrap().clone());
            }
            Some("set") => {
                let path = spec
                    .args
                    .iter()
                    .find_map(|a| a.strip_prefix("--from-file=.dockerconfigjson="))
                    .expect("set data without --from-file");
                if !self.ignore_writes {
                    *self.secret.lock().unwrap() = fs::read(path)?;
                }
            }
            Some("registry") => {
                let path = spec
                    .args
                    .iter()
                    .find_map(|a| a.strip_prefix("--to="))
                    .expect("registry login without --to");
                fs::write(path, &self.registry_output)?;
            }
            _ => {}
        }
        Ok(result)
    }

    fn ensure_available(&self, command: &str) -> Result<()> {
        if self.missing_commands.iter().any(|c| c == command) {
            return Err(InstallerError::CommandNotFound {
                command: command.to_string(),
            }
            .into());
        }
        Ok(())
    }
}

/// Creates a temporary work directory.
#[allow(dead_code)]
pub fn work_dir() -> (tempfile::TempDir, Utf8PathBuf) {
    let dir = tempfile::tempdir().expect("failed to create temp dir");
    let path = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).expect("non UTF-8 temp dir");
    (dir, path)
}

/// Command-line arguments of a normal run writing into `work_dir`.
#[allow(dead_code)]
pub fn install_args(work_dir: &Utf8PathBuf) -> InstallArgs {
    InstallArgs {
        url: URL.to_string(),
        username: "kubeadmin".to_string(),
        password: "cluster-password".to_string(),
        rhceph_password: "user:rhceph-password".to_string(),
        work_dir: work_dir.clone(),
        log_level: LogLevel::Error,
        dry_run: false,
    }
}

/// Finds the typed installer error anywhere in an error chain.
#[allow(dead_code)]
pub fn installer_error(err: &anyhow::Error) -> Option<&InstallerError> {
    err.chain().find_map(|e| e.downcast_ref::<InstallerError>())
}
