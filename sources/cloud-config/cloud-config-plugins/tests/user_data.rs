use cloud_config_plugins::user_data::load_document;
use cloud_config_plugins::{
    DispatchReport, Dispatcher, ErrorPolicy, ExecutionResult, PluginRegistry, SkipReason,
};
use osutils::{ChronyExecutor, Executor, ExecutorConfig};
use std::cell::RefCell;
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use tempfile::TempDir;

#[derive(Default)]
struct RecordingExecutor {
    calls: RefCell<Vec<Vec<String>>>,
}

impl Executor for RecordingExecutor {
    fn set_ntp_servers(&self, servers: &[String]) -> osutils::Result<()> {
        self.calls.borrow_mut().push(servers.to_vec());
        Ok(())
    }
}

fn hosts(hosts: &[&str]) -> Vec<String> {
    hosts.iter().map(ToString::to_string).collect()
}

fn test_data<P: AsRef<Path>>(name: P) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("data")
        .join(name)
}

fn run(name: &str, executor: Rc<dyn Executor>, policy: ErrorPolicy) -> DispatchReport {
    let document = load_document(test_data(name)).unwrap().unwrap();
    Dispatcher::new(PluginRegistry::with_default_plugins(), executor, policy)
        .dispatch(&document)
        .unwrap()
}

#[test]
fn ntp_user_data() {
    let executor = Rc::new(RecordingExecutor::default());
    let report = run("ntp.yaml", executor.clone(), ErrorPolicy::Abort);

    assert_eq!(report.result, ExecutionResult::NoRebootRequired);
    assert_eq!(report.applied, vec!["ntp"]);
    let skipped: Vec<&str> = report.skipped.iter().map(|s| s.directive.as_str()).collect();
    assert_eq!(skipped, vec!["hostname", "runcmd"]);
    assert!(report
        .skipped
        .iter()
        .all(|s| s.reason == SkipReason::Unknown));
    assert_eq!(
        *executor.calls.borrow(),
        vec![hosts(&["10.0.0.1", "time.example.com", "0.pool.ntp.org"])]
    );
}

#[test]
fn no_ntp_directive() {
    let executor = Rc::new(RecordingExecutor::default());
    let report = run("no-ntp.yaml", executor.clone(), ErrorPolicy::Abort);
    assert!(report.applied.is_empty());
    assert!(executor.calls.borrow().is_empty());
}

#[test]
fn malformed_ntp_continues() {
    let executor = Rc::new(RecordingExecutor::default());
    let report = run("bad-ntp.yaml", executor.clone(), ErrorPolicy::Continue);
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].directive, "ntp");
    assert_eq!(report.skipped[0].directive, "users");
    assert!(executor.calls.borrow().is_empty());
}

#[test]
fn chrony_end_to_end() {
    let dir = TempDir::new().unwrap();
    let chrony_conf = dir.path().join("chrony.conf");
    let executor = Rc::new(ChronyExecutor::new(&ExecutorConfig {
        chrony_conf: chrony_conf.clone(),
        restart_time_service: false,
        ..ExecutorConfig::default()
    }));

    let report = run("ntp.yaml", executor, ErrorPolicy::Abort);
    assert!(report.failed.is_empty());

    let conf = fs::read_to_string(chrony_conf).unwrap();
    let servers: Vec<&str> = conf.lines().filter(|l| l.starts_with("server ")).collect();
    assert_eq!(
        servers,
        vec![
            "server 10.0.0.1 iburst",
            "server time.example.com iburst",
            "server 0.pool.ntp.org iburst"
        ]
    );
}

#[test]
fn host_names_cannot_add_chrony_directives() {
    let dir = TempDir::new().unwrap();
    let chrony_conf = dir.path().join("chrony.conf");
    let old = "server old.example.com iburst\n";
    fs::write(&chrony_conf, old).unwrap();
    let executor = Rc::new(ChronyExecutor::new(&ExecutorConfig {
        chrony_conf: chrony_conf.clone(),
        restart_time_service: false,
        ..ExecutorConfig::default()
    }));

    let report = run("injected-ntp.yaml", executor, ErrorPolicy::Continue);
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].directive, "ntp");
    assert!(report.failed[0].error.contains("whitespace"));
    assert_eq!(fs::read_to_string(chrony_conf).unwrap(), old);
}
