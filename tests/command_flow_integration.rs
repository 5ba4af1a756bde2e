//! End-to-end command flows over the real libSQL store.
//!
//! Each test drives the dispatcher with chat messages the way a channel
//! would, against an on-disk database and a scripted cluster:
//! - logs before any binding
//! - set-app, then get-app and logs through the stored binding
//! - multi-container and missing-app failures leave the store untouched
//! - bindings survive a restart

use std::sync::Arc;

use pretty_assertions::assert_eq;
use tempfile::TempDir;

use opsbot::agent::{DispatchOutcome, Dispatcher, welcome_text};
use opsbot::channels::{IncomingMessage, RecordingSink, SentMessage};
use opsbot::cluster::fake::ClusterCall;
use opsbot::cluster::{FakeCluster, Locator, MultipleMatchPolicy, PodRecord};
use opsbot::db::{Binding, BindingStore, LibSqlBindingStore};
use opsbot::error::CommandErrorKind;

struct Harness {
    _dir: TempDir,
    store: Arc<LibSqlBindingStore>,
    cluster: FakeCluster,
    dispatcher: Dispatcher,
    sink: RecordingSink,
}

async fn harness(cluster: FakeCluster) -> Harness {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(
        LibSqlBindingStore::new_local(&dir.path().join("opsbot.db"))
            .await
            .unwrap(),
    );
    store.init_schema().await.unwrap();

    let dispatcher = Dispatcher::new(store.clone(), Locator::new(Arc::new(cluster.clone())));
    Harness {
        _dir: dir,
        store,
        cluster,
        dispatcher,
        sink: RecordingSink::new(),
    }
}

impl Harness {
    async fn say(&self, user: &str, text: &str) -> DispatchOutcome {
        let msg = IncomingMessage::new("C1", user, text);
        self.dispatcher
            .handle(&msg, Arc::new(self.sink.clone()))
            .await
            .unwrap()
    }

    fn last_reply(&self) -> String {
        self.sink.last_text().unwrap_or_default()
    }
}

#[tokio::test]
async fn logs_without_binding() {
    let h = harness(FakeCluster::new()).await;

    let outcome = h.say("U1", "@bot logs").await;

    assert_eq!(
        outcome,
        DispatchOutcome::Failed {
            command: "logs".to_string(),
            kind: CommandErrorKind::NotFound,
        }
    );
    assert_eq!(
        h.sink.sent(),
        vec![SentMessage {
            channel: "C1".to_string(),
            text: "No app has been set for <@U1>".to_string(),
        }]
    );
    assert!(h.cluster.calls().is_empty());
}

#[tokio::test]
async fn set_then_get_then_logs() {
    let cluster = FakeCluster::new()
        .with_pods("myapp", "default", vec![PodRecord::new("pod-123", 1)])
        .with_logs("pod-123", "started\nlistening on :8080\n");
    let h = harness(cluster).await;

    h.say("U1", "@bot set-app <@U1> myapp default").await;
    assert_eq!(
        h.last_reply(),
        "Successfully set app for <@U1> to myapp (currently at pod pod-123)"
    );
    assert_eq!(
        h.store.get_binding("<@U1>").await.unwrap(),
        Some(Binding {
            user: "<@U1>".to_string(),
            application: "myapp".to_string(),
            namespace: "default".to_string(),
        })
    );

    h.say("U1", "@bot get-app").await;
    assert_eq!(
        h.last_reply(),
        "Current app for <@U1> is myapp (currently at pod-123)"
    );

    h.say("U1", "@bot logs").await;
    assert_eq!(h.last_reply(), "started\nlistening on :8080\n");
    assert_eq!(
        h.cluster.calls().last(),
        Some(&ClusterCall::Logs {
            instance_id: "pod-123".to_string(),
            namespace: "default".to_string(),
        })
    );
}

#[tokio::test]
async fn describe_follows_a_rollout() {
    let cluster = FakeCluster::new()
        .with_pods("api", "prod", vec![PodRecord::new("api-old", 1)])
        .with_description("api-new", "Name: api-new\nStatus: Running");
    let h = harness(cluster).await;

    h.say("U2", "@bot set-app <@U2> api prod").await;
    h.cluster
        .set_pods("api", "prod", vec![PodRecord::new("api-new", 1)]);

    h.say("U2", "@bot describe").await;
    assert_eq!(h.last_reply(), "Name: api-new\nStatus: Running");
}

#[tokio::test]
async fn one_user_can_bind_another() {
    let cluster =
        FakeCluster::new().with_pods("worker", "jobs", vec![PodRecord::new("worker-7", 1)]);
    let h = harness(cluster).await;

    h.say("U1", "@bot set-app <@U9> worker jobs").await;
    h.say("U1", "@bot get-app <@U9>").await;
    assert_eq!(
        h.last_reply(),
        "Current app for <@U9> is worker (currently at worker-7)"
    );

    // The sender has no binding of their own.
    h.say("U1", "@bot get-app").await;
    assert_eq!(h.last_reply(), "No app has been set for <@U1>");
}

#[tokio::test]
async fn failed_set_keeps_previous_binding() {
    let cluster = FakeCluster::new()
        .with_pods("myapp", "default", vec![PodRecord::new("pod-123", 1)])
        .with_pods("sidecar", "default", vec![PodRecord::new("sidecar-1", 2)]);
    let h = harness(cluster).await;

    h.say("U1", "@bot set-app <@U1> myapp default").await;

    let outcome = h.say("U1", "@bot set-app <@U1> sidecar default").await;
    assert_eq!(
        outcome,
        DispatchOutcome::Failed {
            command: "set-app".to_string(),
            kind: CommandErrorKind::Constraint,
        }
    );
    assert_eq!(h.last_reply(), "Application sidecar has multiple containers");

    let outcome = h.say("U1", "@bot set-app <@U1> ghost default").await;
    assert_eq!(
        outcome,
        DispatchOutcome::Failed {
            command: "set-app".to_string(),
            kind: CommandErrorKind::NotFound,
        }
    );
    assert_eq!(h.last_reply(), "ghost not found in default");

    let binding = h.store.get_binding("<@U1>").await.unwrap().unwrap();
    assert_eq!(binding.application, "myapp");
}

#[tokio::test]
async fn malformed_set_app_replies_with_usage() {
    let h = harness(FakeCluster::new()).await;

    h.say("U1", "@bot set-app myapp").await;
    assert_eq!(
        h.last_reply(),
        "Unable to understand, please message with set-app <@user> <application> <namespace>"
    );
    assert!(h.store.get_binding("<@U1>").await.unwrap().is_none());
}

#[tokio::test]
async fn mention_alone_gets_welcome() {
    let h = harness(FakeCluster::new()).await;

    let outcome = h.say("U1", "<@UBOT>").await;

    assert_eq!(outcome, DispatchOutcome::Welcome);
    let reply = h.last_reply();
    assert_eq!(reply, welcome_text("U1", "<@UBOT>"));
    assert!(reply.contains("<@U1>"));
}

#[tokio::test]
async fn reject_policy_refuses_ambiguous_app() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(
        LibSqlBindingStore::new_local(&dir.path().join("opsbot.db"))
            .await
            .unwrap(),
    );
    store.init_schema().await.unwrap();
    let cluster = FakeCluster::new().with_pods(
        "web",
        "default",
        vec![PodRecord::new("web-a", 1), PodRecord::new("web-b", 1)],
    );
    let locator = Locator::new(Arc::new(cluster)).with_policy(MultipleMatchPolicy::Reject);
    let dispatcher = Dispatcher::new(store.clone(), locator);
    let sink = RecordingSink::new();

    let msg = IncomingMessage::new("C1", "U1", "@bot set-app <@U1> web default");
    dispatcher.handle(&msg, Arc::new(sink.clone())).await.unwrap();

    assert_eq!(
        sink.last_text().as_deref(),
        Some("web matches 2 pods in default")
    );
    assert!(store.get_binding("<@U1>").await.unwrap().is_none());
}

#[tokio::test]
async fn bindings_survive_restart() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("opsbot.db");
    let cluster =
        FakeCluster::new().with_pods("myapp", "default", vec![PodRecord::new("pod-123", 1)]);

    {
        let store = Arc::new(LibSqlBindingStore::new_local(&path).await.unwrap());
        store.init_schema().await.unwrap();
        let dispatcher = Dispatcher::new(store, Locator::new(Arc::new(cluster.clone())));
        let msg = IncomingMessage::new("C1", "U1", "@bot set-app <@U1> myapp default");
        dispatcher
            .handle(&msg, Arc::new(RecordingSink::new()))
            .await
            .unwrap();
    }

    let store = Arc::new(LibSqlBindingStore::new_local(&path).await.unwrap());
    store.init_schema().await.unwrap();
    let dispatcher = Dispatcher::new(store, Locator::new(Arc::new(cluster)));
    let sink = RecordingSink::new();
    let msg = IncomingMessage::new("C1", "U1", "@bot get-app");
    dispatcher.handle(&msg, Arc::new(sink.clone())).await.unwrap();

    assert_eq!(
        sink.last_text().as_deref(),
        Some("Current app for <@U1> is myapp (currently at pod-123)")
    );
}
