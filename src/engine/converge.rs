//! Create-or-update convergence for a single stack

use crate::config::PushSettings;
use crate::props::PropertyLayer;
use crate::provider::{Parameter, ProviderError, StackApi, StackRequest, Tag};
use crate::ui;

/// Templates may define identity/access resources, so both IAM
/// acknowledgements go on every create and update call. Omitting them gets
/// the call rejected outright.
const CAPABILITIES: [&str; 2] = ["CAPABILITY_IAM", "CAPABILITY_NAMED_IAM"];

/// Everything a single stack submission needs.
#[derive(Debug, Clone)]
pub struct StackDescriptor {
    pub name: String,
    pub region: String,
    pub tags: Vec<Tag>,
    pub parameters: PropertyLayer,
    pub body: String,
}

/// How the provider answered the create/update attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConvergenceOutcome {
    /// Stack did not exist; create accepted
    Created,
    /// Stack existed; update accepted
    Updated,
    /// Stack existed and the template changes nothing; no waiting needed
    NoOpNoChanges,
    /// Provider rejected the submission; the push must abort
    Failed { error: String },
}

impl ConvergenceOutcome {
    /// Whether the provider is now transitioning the stack.
    pub fn needs_wait(&self) -> bool {
        matches!(self, Self::Created | Self::Updated)
    }
}

/// Derive the remote stack name from project and environment.
///
/// Lowercased, spaces to hyphens, with the region appended when not already
/// present so the same project/environment pair never collides across
/// regions. Idempotent.
pub fn derive_stack_name(project: &str, environment: &str, region: &str) -> String {
    let name = format!(
        "{}-{}",
        project.replace(' ', "-"),
        environment.replace(' ', "-")
    )
    .to_lowercase();

    if name.contains(region) {
        name
    } else {
        format!("{name}-{region}")
    }
}

/// Deterministic tag set for a stack submission.
///
/// Artifact coordinates are optional: their absence drops only the
/// `{company}_gav` tag, never the push.
pub fn build_tags(
    stack_name: &str,
    environment: &str,
    settings: &PushSettings,
    artifact_coordinates: Option<&str>,
) -> Vec<Tag> {
    let mut tags = vec![
        Tag::new("Name", stack_name),
        Tag::new(&settings.app_tag_key, stack_name),
        Tag::new(format!("{}_env", settings.app_tag_key), environment),
        Tag::new(&settings.sbu_tag_key, &settings.sbu),
    ];
    if let Some(gav) = artifact_coordinates {
        tags.push(Tag::new(format!("{}_gav", settings.company), gav));
    }
    tags
}

fn to_request(descriptor: &StackDescriptor) -> StackRequest {
    StackRequest {
        stack_name: descriptor.name.clone(),
        template_body: descriptor.body.clone(),
        parameters: descriptor
            .parameters
            .iter()
            .map(|(key, value)| Parameter {
                parameter_key: key.clone(),
                parameter_value: value.clone(),
            })
            .collect(),
        tags: descriptor.tags.clone(),
        capabilities: CAPABILITIES.iter().map(ToString::to_string).collect(),
    }
}

/// Converge the remote stack toward the descriptor.
///
/// Create first; when the name is taken, update with the same body, tags,
/// and parameters. A benign "nothing changed" rejection is a no-op, not a
/// failure. Anything else is fatal and never retried — a malformed template
/// or bad parameter set cannot succeed on a second attempt.
pub fn converge(api: &dyn StackApi, descriptor: &StackDescriptor) -> ConvergenceOutcome {
    log::debug!("Converging {} in {}", descriptor.name, descriptor.region);
    let request = to_request(descriptor);

    match api.create_stack(&request) {
        Ok(()) => ConvergenceOutcome::Created,
        Err(ProviderError::AlreadyExists(_)) => {
            log::debug!("Stack already exists: {}", descriptor.name);
            match api.update_stack(&request) {
                Ok(()) => ConvergenceOutcome::Updated,
                Err(err) if err.class() == crate::provider::ErrorClass::Benign => {
                    log::debug!("Stack has no updates: {}", descriptor.name);
                    ui::info("No updates to apply, skipping push...");
                    ConvergenceOutcome::NoOpNoChanges
                }
                Err(err) => {
                    ui::error(&err.to_string());
                    ConvergenceOutcome::Failed {
                        error: err.to_string(),
                    }
                }
            }
        }
        Err(err) => {
            ui::error(&err.to_string());
            ConvergenceOutcome::Failed {
                error: err.to_string(),
            }
        }
    }
}
