//! Chat command handlers.
//!
//! Each command reads the binding store and/or asks the locator for the
//! current pod, then returns the reply text. Failures are
//! [`CommandError`]s whose `Display` is the reply.

use std::sync::Arc;

use async_trait::async_trait;

use crate::channels::Conversation;
use crate::cluster::{Locator, ResolvedInstance};
use crate::db::{Binding, BindingStore};
use crate::error::CommandError;

pub const SET_APP_USAGE: &str =
    "Unable to understand, please message with set-app <@user> <application> <namespace>";

/// Help text greeting `user` and showing commands addressed to `me`.
pub fn welcome_text(user: &str, me: &str) -> String {
    format!(
        "
Hi there <@{user}>. I'm your friendly neighbourhood DevOps bot.
Use _{me} set-app @user application namespace_ to set the current app for a user
Use _{me} get-app @user_ to get the current app (or leave user out for the current user)
Use _{me} logs_ to get the logs for the app that is set for the current user
Use _{me} describe_ to get the description for the app that is set for the current user
"
    )
}

/// A named chat command.
#[async_trait]
pub trait Command: Send + Sync {
    /// Canonical name, matched against the second token of a message.
    fn name(&self) -> &'static str;

    /// Additional names accepted for this command.
    fn aliases(&self) -> &'static [&'static str] {
        &[]
    }

    async fn execute(&self, conv: &Conversation, args: &[String]) -> Result<String, CommandError>;
}

/// Handles shared by the built-in commands.
pub struct CommandContext {
    pub store: Arc<dyn BindingStore>,
    pub locator: Locator,
}

impl CommandContext {
    pub fn new(store: Arc<dyn BindingStore>, locator: Locator) -> Self {
        Self { store, locator }
    }

    /// Binding for `user` plus the pod it currently points at.
    async fn find_pod(
        &self,
        user: &str,
    ) -> Result<Option<(Binding, ResolvedInstance)>, CommandError> {
        let Some(binding) = self.store.get_binding(user).await? else {
            return Ok(None);
        };
        let instance = self
            .locator
            .resolve(&binding.application, &binding.namespace)
            .await?;
        Ok(Some((binding, instance)))
    }

    async fn require_pod(&self, user: &str) -> Result<(Binding, ResolvedInstance), CommandError> {
        self.find_pod(user)
            .await?
            .ok_or_else(|| CommandError::no_binding(user))
    }
}

/// First argument, or the sender as a mention.
fn target_user(conv: &Conversation, args: &[String]) -> String {
    args.first().cloned().unwrap_or_else(|| conv.mention())
}

/// `logs [@user]`: raw pod logs for the user's binding.
pub struct LogsCommand {
    ctx: Arc<CommandContext>,
}

impl LogsCommand {
    pub fn new(ctx: Arc<CommandContext>) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl Command for LogsCommand {
    fn name(&self) -> &'static str {
        "logs"
    }

    async fn execute(&self, conv: &Conversation, args: &[String]) -> Result<String, CommandError> {
        let user = target_user(conv, args);
        let (binding, instance) = self.ctx.require_pod(&user).await?;
        let logs = self
            .ctx
            .locator
            .cluster()
            .fetch_logs(&instance.instance_id, &binding.namespace)
            .await?;
        Ok(logs)
    }
}

/// `describe [@user]`: raw pod description for the user's binding.
pub struct DescribeCommand {
    ctx: Arc<CommandContext>,
}

impl DescribeCommand {
    pub fn new(ctx: Arc<CommandContext>) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl Command for DescribeCommand {
    fn name(&self) -> &'static str {
        "describe"
    }

    async fn execute(&self, conv: &Conversation, args: &[String]) -> Result<String, CommandError> {
        let user = target_user(conv, args);
        let (binding, instance) = self.ctx.require_pod(&user).await?;
        let description = self
            .ctx
            .locator
            .cluster()
            .fetch_description(&instance.instance_id, &binding.namespace)
            .await?;
        Ok(description)
    }
}

/// `get-app [@user]`: show the binding and its current pod.
pub struct GetAppCommand {
    ctx: Arc<CommandContext>,
}

impl GetAppCommand {
    pub fn new(ctx: Arc<CommandContext>) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl Command for GetAppCommand {
    fn name(&self) -> &'static str {
        "get-app"
    }

    fn aliases(&self) -> &'static [&'static str] {
        &["get-binding"]
    }

    async fn execute(&self, conv: &Conversation, args: &[String]) -> Result<String, CommandError> {
        let user = target_user(conv, args);
        let (binding, instance) = self.ctx.require_pod(&user).await?;
        Ok(format!(
            "Current app for {} is {} (currently at {})",
            user, binding.application, instance.instance_id
        ))
    }
}

/// `set-app @user application namespace`: bind a user to an app.
pub struct SetAppCommand {
    ctx: Arc<CommandContext>,
}

impl SetAppCommand {
    pub fn new(ctx: Arc<CommandContext>) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl Command for SetAppCommand {
    fn name(&self) -> &'static str {
        "set-app"
    }

    fn aliases(&self) -> &'static [&'static str] {
        &["set-binding"]
    }

    async fn execute(&self, _conv: &Conversation, args: &[String]) -> Result<String, CommandError> {
        let [user, application, namespace, ..] = args else {
            return Err(CommandError::Usage(SET_APP_USAGE.to_string()));
        };

        let instance = self.ctx.locator.resolve(application, namespace).await?;
        if instance.container_count > 1 {
            return Err(CommandError::Constraint(format!(
                "Application {application} has multiple containers"
            )));
        }

        self.ctx
            .store
            .put_binding(user, application, namespace)
            .await?;

        Ok(format!(
            "Successfully set app for {} to {} (currently at pod {})",
            user, application, instance.instance_id
        ))
    }
}

/// The four built-in commands sharing one context.
pub fn builtin_commands(ctx: Arc<CommandContext>) -> Vec<Arc<dyn Command>> {
    vec![
        Arc::new(LogsCommand::new(Arc::clone(&ctx))),
        Arc::new(DescribeCommand::new(Arc::clone(&ctx))),
        Arc::new(GetAppCommand::new(Arc::clone(&ctx))),
        Arc::new(SetAppCommand::new(ctx)),
    ]
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::channels::RecordingSink;
    use crate::cluster::fake::ClusterCall;
    use crate::cluster::{FakeCluster, PodRecord};
    use crate::db::InMemoryBindingStore;
    use crate::error::CommandErrorKind;

    struct Harness {
        store: Arc<InMemoryBindingStore>,
        cluster: FakeCluster,
        ctx: Arc<CommandContext>,
        conv: Conversation,
    }

    fn harness(cluster: FakeCluster) -> Harness {
        let store = Arc::new(InMemoryBindingStore::new());
        let ctx = Arc::new(CommandContext::new(
            store.clone(),
            Locator::new(Arc::new(cluster.clone())),
        ));
        let conv = Conversation::new(Arc::new(RecordingSink::new()), "C1", "U1");
        Harness {
            store,
            cluster,
            ctx,
            conv,
        }
    }

    fn args(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn welcome_substitutes_user_and_mention() {
        let text = welcome_text("U1", "<@UBOT>");
        assert!(text.contains("Hi there <@U1>."));
        assert!(text.contains("Use _<@UBOT> logs_"));
        assert!(!text.contains('{'));
    }

    #[test]
    fn welcome_leaves_placeholder_like_input_alone() {
        let text = welcome_text("{me}", "{user}");
        assert!(text.contains("Hi there <@{me}>."));
        assert!(text.contains("Use _{user} logs_"));
        assert_eq!(text.matches("{me}").count(), 1);
    }

    #[tokio::test]
    async fn logs_without_binding_names_sender() {
        let h = harness(FakeCluster::new());
        let err = LogsCommand::new(h.ctx.clone())
            .execute(&h.conv, &[])
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "No app has been set for <@U1>");
        assert!(h.cluster.calls().is_empty());
    }

    #[tokio::test]
    async fn logs_for_other_user_uses_their_binding() {
        let cluster = FakeCluster::new()
            .with_pods("api", "staging", vec![PodRecord::new("api-1", 1)])
            .with_logs("api-1", "GET /health 200\n");
        let h = harness(cluster);
        h.store.put_binding("<@U2>", "api", "staging").await.unwrap();

        let out = LogsCommand::new(h.ctx.clone())
            .execute(&h.conv, &args(&["<@U2>"]))
            .await
            .unwrap();
        assert_eq!(out, "GET /health 200\n");
        assert_eq!(
            h.cluster.calls().last(),
            Some(&ClusterCall::Logs {
                instance_id: "api-1".to_string(),
                namespace: "staging".to_string(),
            })
        );
    }

    #[tokio::test]
    async fn describe_returns_output_verbatim() {
        let cluster = FakeCluster::new()
            .with_pods("api", "staging", vec![PodRecord::new("api-1", 1)])
            .with_description("api-1", "Name: api-1\nStatus: Running\n");
        let h = harness(cluster);
        h.store.put_binding("<@U1>", "api", "staging").await.unwrap();

        let out = DescribeCommand::new(h.ctx.clone())
            .execute(&h.conv, &[])
            .await
            .unwrap();
        assert_eq!(out, "Name: api-1\nStatus: Running\n");
    }

    #[tokio::test]
    async fn bound_app_with_no_pods_is_not_found() {
        let h = harness(FakeCluster::new());
        h.store.put_binding("<@U1>", "api", "staging").await.unwrap();

        let err = DescribeCommand::new(h.ctx.clone())
            .execute(&h.conv, &[])
            .await
            .unwrap_err();
        assert_eq!(err.kind(), CommandErrorKind::NotFound);
        assert_eq!(err.to_string(), "api not found in staging");
    }

    #[tokio::test]
    async fn get_app_reports_current_pod() {
        let cluster =
            FakeCluster::new().with_pods("myapp", "default", vec![PodRecord::new("pod-123", 1)]);
        let h = harness(cluster);
        h.store.put_binding("<@U1>", "myapp", "default").await.unwrap();

        let out = GetAppCommand::new(h.ctx.clone())
            .execute(&h.conv, &[])
            .await
            .unwrap();
        assert_eq!(out, "Current app for <@U1> is myapp (currently at pod-123)");

        h.cluster
            .set_pods("myapp", "default", vec![PodRecord::new("pod-456", 1)]);
        let out = GetAppCommand::new(h.ctx.clone())
            .execute(&h.conv, &[])
            .await
            .unwrap();
        assert_eq!(out, "Current app for <@U1> is myapp (currently at pod-456)");
    }

    #[tokio::test]
    async fn set_app_needs_three_arguments() {
        let h = harness(FakeCluster::new());
        let err = SetAppCommand::new(h.ctx.clone())
            .execute(&h.conv, &args(&["<@U1>", "myapp"]))
            .await
            .unwrap_err();

        assert_eq!(err.kind(), CommandErrorKind::Usage);
        assert_eq!(err.to_string(), SET_APP_USAGE);
        assert!(h.cluster.calls().is_empty());
        assert!(h.store.is_empty().await);
    }

    #[tokio::test]
    async fn set_app_rejects_multi_container_pod() {
        let cluster =
            FakeCluster::new().with_pods("myapp", "default", vec![PodRecord::new("pod-123", 2)]);
        let h = harness(cluster);

        let err = SetAppCommand::new(h.ctx.clone())
            .execute(&h.conv, &args(&["<@U1>", "myapp", "default"]))
            .await
            .unwrap_err();

        assert_eq!(err.kind(), CommandErrorKind::Constraint);
        assert_eq!(err.to_string(), "Application myapp has multiple containers");
        assert!(h.store.is_empty().await);
    }

    #[tokio::test]
    async fn set_app_with_missing_app_writes_nothing() {
        let h = harness(FakeCluster::new());
        h.store.put_binding("<@U1>", "api", "staging").await.unwrap();

        let err = SetAppCommand::new(h.ctx.clone())
            .execute(&h.conv, &args(&["<@U1>", "myapp", "default"]))
            .await
            .unwrap_err();

        assert_eq!(err.to_string(), "myapp not found in default");
        let binding = h.store.get_binding("<@U1>").await.unwrap().unwrap();
        assert_eq!(binding.application, "api");
    }

    #[tokio::test]
    async fn set_app_writes_binding() {
        let cluster =
            FakeCluster::new().with_pods("myapp", "default", vec![PodRecord::new("pod-123", 1)]);
        let h = harness(cluster);

        let out = SetAppCommand::new(h.ctx.clone())
            .execute(&h.conv, &args(&["<@U2>", "myapp", "default", "ignored"]))
            .await
            .unwrap();

        assert_eq!(
            out,
            "Successfully set app for <@U2> to myapp (currently at pod pod-123)"
        );
        let binding = h.store.get_binding("<@U2>").await.unwrap().unwrap();
        assert_eq!(binding.application, "myapp");
        assert_eq!(binding.namespace, "default");
    }

    #[test]
    fn builtins_have_unique_names() {
        let h = harness(FakeCluster::new());
        let mut names: Vec<&str> = builtin_commands(h.ctx.clone())
            .iter()
            .flat_map(|c| std::iter::once(c.name()).chain(c.aliases().iter().copied()))
            .collect();
        names.sort_unstable();
        assert_eq!(
            names,
            vec!["describe", "get-app", "get-binding", "logs", "set-app", "set-binding"]
        );
    }
}
