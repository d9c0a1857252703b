//! Orchestrator Integration Tests
//!
//! Tests for startup sequencing, stack lookup and status aggregation.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use serde_json::{json, Value};
use tempfile::TempDir;

use dreadnot::{
    Config, Deployment, Orchestrator, OrchestratorError, Stack, StackConfig, StackContext,
    StackFactory, StartupError,
};

/// Behaviour of a fake stack, keyed by stack name
#[derive(Clone, Default)]
struct Script {
    delay_ms: u64,
    fail_init: bool,
    fail_details: bool,
    fail_status: bool,
}

struct FakeStack {
    name: String,
    script: Script,
    context: StackContext,
    finished_inits: Arc<AtomicUsize>,
}

#[async_trait]
impl Stack for FakeStack {
    fn name(&self) -> &str {
        &self.name
    }

    async fn init(&self) -> Result<()> {
        tokio::time::sleep(Duration::from_millis(self.script.delay_ms)).await;
        self.finished_inits.fetch_add(1, Ordering::SeqCst);
        if self.script.fail_init {
            anyhow::bail!("{} refused to start", self.name);
        }
        self.context
            .events
            .publish("stack.ready", json!({ "stack": self.name }));
        Ok(())
    }

    async fn details(&self) -> Result<Value> {
        tokio::time::sleep(Duration::from_millis(self.script.delay_ms)).await;
        if self.script.fail_details {
            anyhow::bail!("{} details unavailable", self.name);
        }
        Ok(json!({ "name": self.name }))
    }

    async fn running_status(&self) -> Result<Value> {
        tokio::time::sleep(Duration::from_millis(self.script.delay_ms)).await;
        if self.script.fail_status {
            anyhow::bail!("{} status unavailable", self.name);
        }
        Ok(json!({ "name": self.name, "running": false }))
    }
}

#[derive(Default)]
struct FakeFactory {
    scripts: BTreeMap<String, Script>,
    finished_inits: Arc<AtomicUsize>,
}

impl StackFactory for FakeFactory {
    fn create(&self, name: &str, context: &StackContext) -> Arc<dyn Stack> {
        Arc::new(FakeStack {
            name: name.to_string(),
            script: self.scripts.get(name).cloned().unwrap_or_default(),
            context: context.clone(),
            finished_inits: Arc::clone(&self.finished_inits),
        })
    }
}

fn config(temp: &TempDir, names: &[&str]) -> Config {
    Config {
        env: "test".to_string(),
        data_root: temp.path().join("data"),
        stacks: names
            .iter()
            .map(|n| (n.to_string(), StackConfig::default()))
            .collect(),
        ..Default::default()
    }
}

fn orchestrator(temp: &TempDir, scripts: &[(&str, Script)]) -> (Orchestrator, Arc<AtomicUsize>) {
    let names: Vec<&str> = scripts.iter().map(|(n, _)| *n).collect();
    let factory = FakeFactory {
        scripts: scripts
            .iter()
            .map(|(n, s)| (n.to_string(), s.clone()))
            .collect(),
        finished_inits: Arc::new(AtomicUsize::new(0)),
    };
    let finished = Arc::clone(&factory.finished_inits);
    (
        Orchestrator::new(config(temp, &names), Arc::new(factory)),
        finished,
    )
}

#[tokio::test]
async fn test_example_scenario() {
    let temp = TempDir::new().unwrap();
    let (orch, _) = orchestrator(&temp, &[("a", Script::default()), ("b", Script::default())]);

    orch.init().await.unwrap();
    assert_eq!(orch.get_stack("a").unwrap().name(), "a");
    assert_eq!(orch.get_stack("b").unwrap().name(), "b");

    let dep1 = Deployment::new("a", "ord1", "alice");
    let dep2 = Deployment::new("b", "ord1", "bob");

    assert!(orch.lock(&["a"], &dep1).is_ok());
    let conflict = orch.lock(&["a", "b"], &dep2).unwrap_err();
    assert_eq!(conflict.holder, dep1);

    orch.unlock(&["a"]);
    assert!(orch.lock(&["a", "b"], &dep2).is_ok());
    assert_eq!(orch.locks().len(), 2);
}

#[tokio::test]
async fn test_lookup_only_after_init() {
    let temp = TempDir::new().unwrap();
    let (orch, _) = orchestrator(&temp, &[("a", Script::default()), ("b", Script::default())]);

    assert!(matches!(orch.get_stack("a"), Err(OrchestratorError::NotFound(_))));

    orch.init().await.unwrap();
    for name in ["a", "b"] {
        assert!(orch.get_stack(name).is_ok());
    }
    assert!(matches!(
        orch.get_stack("c"),
        Err(OrchestratorError::NotFound(name)) if name == "c"
    ));
}

#[tokio::test]
async fn test_init_fails_when_any_stack_fails() {
    let temp = TempDir::new().unwrap();
    let failing = Script {
        fail_init: true,
        ..Default::default()
    };
    let slow = Script {
        delay_ms: 50,
        ..Default::default()
    };
    let (orch, finished) = orchestrator(&temp, &[("a", failing), ("b", slow)]);

    let err = orch.init().await.unwrap_err();
    match err {
        StartupError::StackInit { stack, .. } => assert_eq!(stack, "a"),
        other => panic!("unexpected error: {}", other),
    }

    // The slow sibling was not cancelled
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(finished.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_init_fails_when_data_root_is_a_file() {
    let temp = TempDir::new().unwrap();
    let (orch, finished) = orchestrator(&temp, &[("a", Script::default())]);
    std::fs::write(temp.path().join("data"), "not a directory").unwrap();

    assert!(matches!(
        orch.init().await,
        Err(StartupError::DataDir { .. })
    ));
    assert_eq!(finished.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_init_fails_on_unreadable_warning() {
    let temp = TempDir::new().unwrap();
    let (orch, finished) = orchestrator(&temp, &[("a", Script::default())]);
    std::fs::create_dir_all(temp.path().join("data").join("warning.txt")).unwrap();

    assert!(matches!(
        orch.init().await,
        Err(StartupError::WarningLoad(_))
    ));
    assert_eq!(finished.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_init_loads_trimmed_warning() {
    let temp = TempDir::new().unwrap();
    let (orch, _) = orchestrator(&temp, &[("a", Script::default())]);
    std::fs::create_dir_all(temp.path().join("data")).unwrap();
    std::fs::write(temp.path().join("data").join("warning.txt"), "  frozen\n").unwrap();

    orch.init().await.unwrap();
    assert_eq!(orch.warning(), "frozen");
}

#[tokio::test]
async fn test_stack_events_are_forwarded() {
    let temp = TempDir::new().unwrap();
    let (orch, _) = orchestrator(&temp, &[("a", Script::default())]);
    let mut events = orch.events().subscribe_channel("stack.ready");

    orch.init().await.unwrap();

    let event = events.try_recv().unwrap();
    assert_eq!(event.payload, json!({ "stack": "a" }));
}

#[tokio::test]
async fn test_aggregation_uses_configured_order() {
    let temp = TempDir::new().unwrap();
    // Earlier names finish last
    let (orch, _) = orchestrator(
        &temp,
        &[
            ("a", Script { delay_ms: 30, ..Default::default() }),
            ("b", Script { delay_ms: 15, ..Default::default() }),
            ("c", Script::default()),
        ],
    );
    orch.init().await.unwrap();

    let details = orch.details().await.unwrap();
    assert_eq!(details.name, "test");
    let names: Vec<&Value> = details.stacks.iter().map(|s| &s["name"]).collect();
    assert_eq!(names, vec!["a", "b", "c"]);

    let status = orch.running_status().await.unwrap();
    let names: Vec<&Value> = status.iter().map(|s| &s["name"]).collect();
    assert_eq!(names, vec!["a", "b", "c"]);
}

#[tokio::test]
async fn test_aggregation_fails_entirely_on_one_failure() {
    let temp = TempDir::new().unwrap();
    let (orch, _) = orchestrator(
        &temp,
        &[
            ("a", Script::default()),
            ("b", Script { fail_details: true, ..Default::default() }),
            ("c", Script::default()),
        ],
    );
    orch.init().await.unwrap();

    match orch.details().await {
        Err(OrchestratorError::Stack { stack, source }) => {
            assert_eq!(stack, "b");
            assert!(source.to_string().contains("details unavailable"));
        }
        other => panic!("expected stack failure, got {:?}", other.map(|d| d.stacks.len())),
    }

    // Status is unaffected
    assert_eq!(orch.running_status().await.unwrap().len(), 3);
}

#[tokio::test]
async fn test_running_status_fails_entirely_on_one_failure() {
    let temp = TempDir::new().unwrap();
    let (orch, _) = orchestrator(
        &temp,
        &[
            ("a", Script { delay_ms: 30, ..Default::default() }),
            ("b", Script { fail_status: true, ..Default::default() }),
            ("c", Script::default()),
        ],
    );
    orch.init().await.unwrap();

    match orch.running_status().await {
        Err(OrchestratorError::Stack { stack, source }) => {
            assert_eq!(stack, "b");
            assert!(source.to_string().contains("status unavailable"));
        }
        other => panic!("expected stack failure, got {:?}", other.map(|s| s.len())),
    }

    // Details are unaffected
    assert_eq!(orch.details().await.unwrap().stacks.len(), 3);
}

#[tokio::test]
async fn test_aggregation_follows_config_file_order() {
    let temp = TempDir::new().unwrap();
    let yaml = r#"
env: test
stacks:
  zeta: {}
  alpha: {}
  mid: {}
"#;
    let mut config = Config::from_yaml(yaml).unwrap();
    config.data_root = temp.path().join("data");
    let orch = Orchestrator::new(config, Arc::new(FakeFactory::default()));
    orch.init().await.unwrap();

    let details = orch.details().await.unwrap();
    let names: Vec<&Value> = details.stacks.iter().map(|s| &s["name"]).collect();
    assert_eq!(names, vec!["zeta", "alpha", "mid"]);

    let status = orch.running_status().await.unwrap();
    let names: Vec<&Value> = status.iter().map(|s| &s["name"]).collect();
    assert_eq!(names, vec!["zeta", "alpha", "mid"]);
}
