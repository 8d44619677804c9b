use std::collections::{BTreeMap, HashMap};

use crate::banzai::document::{NodeId, ReferenceNode};
use crate::banzai::types::{ProjectId, Record, ReferenceType};

use super::{ParserEnv, ReferenceParser};

/// Commits are looked up by SHA inside their project: `data-project` when the
/// node names one, else the project associated with the node's document.
pub struct CommitParser;

impl ReferenceParser for CommitParser {
    fn reference_type(&self) -> ReferenceType {
        ReferenceType::Commit
    }

    fn records_for_nodes(
        &self,
        nodes: &[&ReferenceNode],
        env: &ParserEnv<'_>,
    ) -> HashMap<NodeId, Record> {
        let located: Vec<(NodeId, ProjectId, &str)> = nodes
            .iter()
            .filter_map(|node| {
                let sha = node.attr("data-commit")?;
                let project = node
                    .id_attr("data-project")
                    .or_else(|| env.context.project_for_node(node).map(|p| p.id))?;
                Some((node.id(), project, sha))
            })
            .collect();

        let mut shas_by_project: BTreeMap<ProjectId, Vec<String>> = BTreeMap::new();
        for (_, project, sha) in &located {
            let shas = shas_by_project.entry(*project).or_default();
            if !shas.iter().any(|s| s == sha) {
                shas.push(sha.to_string());
            }
        }

        let mut found: HashMap<(ProjectId, String), Record> = HashMap::new();
        for (project, shas) in &shas_by_project {
            for commit in env.services.store.find_commits(*project, shas) {
                found.insert((*project, commit.sha.clone()), Record::Commit(commit));
            }
        }

        located
            .into_iter()
            .filter_map(|(id, project, sha)| {
                let record = found.get(&(project, sha.to_string()))?;
                Some((id, record.clone()))
            })
            .collect()
    }
}
