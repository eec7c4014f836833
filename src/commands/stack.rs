//! The stack push verb
//!
//! One push: resolve layered properties, read the template, converge the
//! stack, wait for the provider to settle, then persist outputs for the
//! next pipeline stage.

use anyhow::{bail, Context as AnyhowContext, Result};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use crate::cli::PushArgs;
use crate::config::PushSettings;
use crate::engine::poller::CancelableSleep;
use crate::engine::{
    build_tags, converge, derive_stack_name, CompletionPoller, ConvergenceOutcome,
    OutputCollector, PollPolicy, StackDescriptor,
};
use crate::props::sources::{BuildMetadata, EnvOverrides, PreviousOutputs, VariableBroker};
use crate::props::{self, PropertySource};
use crate::provider::http::HttpProviderClient;
use crate::provider::{FunctionApi, StackApi};
use crate::ui;
use crate::Context;

pub const TEMPLATE_FILE: &str = "cft.template";

pub fn run(_ctx: &Context, args: &PushArgs) -> Result<()> {
    let root = PathBuf::from(&args.directory);
    let settings = PushSettings::load(&root)?;
    let token = settings.auth_token()?;
    let client = HttpProviderClient::new(&settings.endpoint, token);

    push(&client, &client, &settings, &root, args, PollPolicy::default())
}

/// Push against explicit provider seams; `run` wires in the HTTP client.
fn push(
    stack_api: &dyn StackApi,
    function_api: &dyn FunctionApi,
    settings: &PushSettings,
    root: &Path,
    args: &PushArgs,
    policy: PollPolicy,
) -> Result<()> {
    let variables: HashMap<String, String> = args.variables.iter().cloned().collect();
    let metadata = BuildMetadata::new(variables, &args.environment);
    let coordinates = metadata.artifact_coordinates();

    let previous = PreviousOutputs::new(root.join(crate::engine::outputs::OUTPUT_FILE));
    let overrides = EnvOverrides::new(root, &args.environment);
    let broker = settings.broker_enabled().then(|| {
        VariableBroker::new(
            function_api,
            &settings.variable_broker_function,
            &settings.region,
        )
    });

    let mut sources: Vec<&dyn PropertySource> = vec![&previous, &overrides, &metadata];
    if let Some(broker) = &broker {
        sources.push(broker);
    }
    let properties = props::resolve(&sources)?;

    let template_path = root.join(TEMPLATE_FILE);
    let template = fs::read_to_string(&template_path)
        .with_context(|| format!("No template found at {}", template_path.display()))?;

    let name = derive_stack_name(&settings.project, &args.environment, &settings.region);
    let descriptor = StackDescriptor {
        name: name.clone(),
        region: settings.region.clone(),
        tags: build_tags(&name, &args.environment, settings, coordinates.as_deref()),
        parameters: props::parameters_for(&template, &properties),
        body: template,
    };

    ui::header(&format!("Pushing stack {name}"));
    match converge(stack_api, &descriptor) {
        ConvergenceOutcome::Failed { error } => bail!("Stack push failed: {error}"),
        outcome if outcome.needs_wait() => {
            log::debug!("Convergence outcome: {outcome:?}");
            ui::info("Stack triggered...");
            wait_for_settlement(stack_api, &name, args.timeout, policy)?;
        }
        _ => {
            // Remote state unchanged; nothing to wait for
        }
    }

    let collector = OutputCollector::new(stack_api);
    let output = collector.collect(&name)?;
    collector.write(root, &output)?;

    ui::success(&format!("Stack {name} pushed"));
    Ok(())
}

/// Poll until terminal state, bounded by the task timeout.
///
/// The watchdog thread is the push's only other thread; it exists solely
/// to turn the timeout into a cancellation of the poller's sleep.
fn wait_for_settlement(
    api: &dyn StackApi,
    stack_name: &str,
    timeout_minutes: u64,
    policy: PollPolicy,
) -> Result<()> {
    let (cancel_tx, cancel_rx) = mpsc::channel();
    thread::spawn(move || {
        thread::sleep(Duration::from_secs(timeout_minutes * 60));
        let _ = cancel_tx.send(());
    });

    let poller = CompletionPoller::new(api, policy, CancelableSleep::new(cancel_rx));
    poller.wait(&[stack_name])
}
