//! Test data builders for creating backend records

use etl_studio::types::{
    OperatorType, PipelineEdge, PipelineNode, PipelineRun, PipelineVersion, StepRun,
};
use serde_json::Value;

/// Builder for backend pipeline versions
pub struct VersionBuilder {
    id: i64,
    pipeline_id: i64,
    version: u32,
    nodes: Vec<PipelineNode>,
    edges: Vec<PipelineEdge>,
    is_published: bool,
}

impl VersionBuilder {
    pub fn new(id: i64) -> Self {
        Self {
            id,
            pipeline_id: 1,
            version: id as u32,
            nodes: Vec::new(),
            edges: Vec::new(),
            is_published: false,
        }
    }

    pub fn pipeline(mut self, pipeline_id: i64) -> Self {
        self.pipeline_id = pipeline_id;
        self
    }

    pub fn number(mut self, version: u32) -> Self {
        self.version = version;
        self
    }

    pub fn node(mut self, id: &str, operator_type: OperatorType) -> Self {
        self.nodes.push(PipelineNode::new(id, id.to_uppercase(), operator_type));
        self
    }

    pub fn classed_node(mut self, id: &str, class: &str, config: Value) -> Self {
        self.nodes.push(
            PipelineNode::new(id, id.to_uppercase(), OperatorType::Transform)
                .with_class(class)
                .with_config(config),
        );
        self
    }

    pub fn edge(mut self, from: &str, to: &str) -> Self {
        self.edges.push(PipelineEdge::new(from, to));
        self
    }

    pub fn published(mut self) -> Self {
        self.is_published = true;
        self
    }

    pub fn build(self) -> PipelineVersion {
        PipelineVersion {
            id: self.id,
            pipeline_id: self.pipeline_id,
            version: self.version,
            nodes: self.nodes,
            edges: self.edges,
            is_published: self.is_published,
            version_notes: None,
            created_at: None,
        }
    }
}

/// Linear extract -> transform -> load version
pub fn etl_chain(id: i64) -> PipelineVersion {
    VersionBuilder::new(id)
        .node("extract", OperatorType::Extract)
        .node("clean", OperatorType::Transform)
        .node("load", OperatorType::Load)
        .edge("extract", "clean")
        .edge("clean", "load")
        .build()
}

/// Builder for step runs
pub struct StepBuilder {
    step: StepRun,
}

impl StepBuilder {
    pub fn new(node_id: &str, status: &str) -> Self {
        Self {
            step: StepRun::new(node_id, status),
        }
    }

    pub fn records(mut self, records_in: u64, records_out: u64) -> Self {
        self.step.records_in = Some(records_in);
        self.step.records_out = Some(records_out);
        self
    }

    pub fn duration(mut self, seconds: f64) -> Self {
        self.step.duration_seconds = Some(seconds);
        self
    }

    pub fn error(mut self, message: &str) -> Self {
        self.step.error_message = Some(message.to_string());
        self
    }

    pub fn build(self) -> StepRun {
        self.step
    }
}

/// A run over `version` with the given steps
pub fn run_of(id: i64, status: &str, version: PipelineVersion, steps: Vec<StepRun>) -> PipelineRun {
    PipelineRun {
        id,
        pipeline_id: version.pipeline_id,
        job_id: Some(format!("job-{id}")),
        status: status.to_string(),
        version: Some(version),
        step_runs: steps,
        started_at: None,
        finished_at: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_builder() {
        let version = VersionBuilder::new(3)
            .number(2)
            .node("a", OperatorType::Extract)
            .published()
            .build();

        assert_eq!(version.id, 3);
        assert_eq!(version.version, 2);
        assert_eq!(version.nodes.len(), 1);
        assert!(version.is_published);
    }
}
