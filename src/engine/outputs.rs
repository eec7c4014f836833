//! Output collection after terminal success
//!
//! Enumerates provisioned sub-resources and persists one `aws.stack.*`
//! entry per logical/physical pair for the next pipeline stage to merge
//! back in as its lowest-precedence property layer.

use anyhow::{Context, Result};
use std::path::Path;

use crate::props::{file, PropertyLayer};
use crate::provider::StackApi;
use crate::ui;

pub const OUTPUT_FILE: &str = "stackoutput.properties";

const TASK_DEFINITION_TYPE: &str = "AWS::ECS::TaskDefinition";

pub struct OutputCollector<'a> {
    api: &'a dyn StackApi,
}

impl<'a> OutputCollector<'a> {
    pub fn new(api: &'a dyn StackApi) -> Self {
        Self { api }
    }

    /// Read back the stack's sub-resources as a flat output record.
    pub fn collect(&self, stack_name: &str) -> Result<PropertyLayer> {
        let resources = self
            .api
            .describe_stack_resources(stack_name)
            .with_context(|| format!("Could not enumerate resources of {stack_name}"))?;

        let mut output = PropertyLayer::new();
        for resource in &resources {
            ui::info(&resource.physical_resource_id);
            ui::info(&resource.resource_type);
            output.insert(
                format!("aws.stack.{}", resource.logical_resource_id),
                resource.physical_resource_id.clone(),
            );
        }

        for resource in &resources {
            if resource.resource_type == TASK_DEFINITION_TYPE {
                if let Some(task) = normalize_task_definition(&resource.physical_resource_id) {
                    log::debug!("Task definition {}", task);
                    output.insert(
                        format!("aws.task.{}", resource.logical_resource_id),
                        task,
                    );
                }
            }
        }

        Ok(output)
    }

    /// Overwrite the well-known output file. This is the only durable state
    /// the push owns between runs.
    pub fn write(&self, root: &Path, output: &PropertyLayer) -> Result<()> {
        file::store(&root.join(OUTPUT_FILE), output)
    }
}

/// Reduce a task-definition ARN to `family-revision`.
///
/// `arn:aws:ecs:...:task-definition/family:7` becomes `family-7`: the path
/// prefix is stripped and the revision colon replaced so downstream stages
/// can use the id in resource names.
fn normalize_task_definition(physical_id: &str) -> Option<String> {
    let tail = physical_id.split('/').nth(1)?;
    Some(tail.replace(':', "-"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::test_support::MockStackApi;
    use crate::provider::StackResourceRecord;

    fn record(logical: &str, physical: &str, kind: &str) -> StackResourceRecord {
        StackResourceRecord {
            logical_resource_id: logical.to_string(),
            physical_resource_id: physical.to_string(),
            resource_type: kind.to_string(),
        }
    }

    #[test]
    fn records_one_entry_per_sub_resource() {
        let api = MockStackApi::new().with_resources(vec![
            record("Queue", "my-queue", "AWS::SQS::Queue"),
            record("Table", "my-table", "AWS::DynamoDB::Table"),
        ]);

        let output = OutputCollector::new(&api).collect("s").unwrap();
        assert_eq!(output.get("aws.stack.Queue").unwrap(), "my-queue");
        assert_eq!(output.get("aws.stack.Table").unwrap(), "my-table");
    }

    #[test]
    fn normalizes_task_definition_ids() {
        assert_eq!(
            normalize_task_definition("arn:aws:ecs:us-east-1:123:task-definition/family:7")
                .unwrap(),
            "family-7"
        );
        assert!(normalize_task_definition("no-path-component").is_none());
    }

    #[test]
    fn task_definitions_get_a_normalized_entry() {
        let api = MockStackApi::new().with_resources(vec![record(
            "Task",
            "arn:aws:ecs:us-east-1:123:task-definition/family:7",
            TASK_DEFINITION_TYPE,
        )]);

        let output = OutputCollector::new(&api).collect("s").unwrap();
        assert_eq!(output.get("aws.task.Task").unwrap(), "family-7");
        assert_eq!(
            output.get("aws.stack.Task").unwrap(),
            "arn:aws:ecs:us-east-1:123:task-definition/family:7"
        );
    }

    #[test]
    fn written_outputs_reload_as_a_property_layer() {
        let api = MockStackApi::new()
            .with_resources(vec![record("Db", "db-1234", "AWS::RDS::DBInstance")]);
        let collector = OutputCollector::new(&api);
        let dir = tempfile::tempdir().unwrap();

        let output = collector.collect("s").unwrap();
        collector.write(dir.path(), &output).unwrap();

        let reloaded = file::load(&dir.path().join(OUTPUT_FILE)).unwrap().unwrap();
        assert_eq!(reloaded, output);
    }
}
