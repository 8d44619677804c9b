use std::collections::HashMap;

use crate::banzai::document::{NodeId, ReferenceNode};
use crate::banzai::types::{Record, ReferenceType};

use super::{ParserEnv, ReferenceParser};

/// `@` mentions. A node names a user (`data-user`), a group (`data-group`)
/// or, for project-wide mentions, only a project (`data-project`).
pub struct UserParser;

enum Mention {
    User(u64),
    Group(u64),
    Project(u64),
}

fn mention(node: &ReferenceNode) -> Option<Mention> {
    node.id_attr("data-user")
        .map(Mention::User)
        .or_else(|| node.id_attr("data-group").map(Mention::Group))
        .or_else(|| node.id_attr("data-project").map(Mention::Project))
}

impl ReferenceParser for UserParser {
    fn reference_type(&self) -> ReferenceType {
        ReferenceType::User
    }

    fn records_for_nodes(
        &self,
        nodes: &[&ReferenceNode],
        env: &ParserEnv<'_>,
    ) -> HashMap<NodeId, Record> {
        let store = &env.services.store;

        let (mut user_ids, mut group_ids, mut project_ids) = (Vec::new(), Vec::new(), Vec::new());
        for node in nodes {
            match mention(node) {
                Some(Mention::User(id)) => user_ids.push(id),
                Some(Mention::Group(id)) => group_ids.push(id),
                Some(Mention::Project(id)) => project_ids.push(id),
                None => {}
            }
        }
        for ids in [&mut user_ids, &mut group_ids, &mut project_ids] {
            ids.sort_unstable();
            ids.dedup();
        }

        let users: HashMap<u64, Record> = if user_ids.is_empty() {
            HashMap::new()
        } else {
            store
                .find_records(ReferenceType::User, &user_ids)
                .into_iter()
                .filter_map(|r| r.id().map(|id| (id, r)))
                .collect()
        };

        let (mut groups, mut projects) = (HashMap::new(), HashMap::new());
        if !(group_ids.is_empty() && project_ids.is_empty()) {
            for record in store.find_namespaces(&group_ids, &project_ids) {
                match &record {
                    Record::Group(g) => {
                        groups.insert(g.id, record.clone());
                    }
                    Record::Project(p) => {
                        projects.insert(p.id, record.clone());
                    }
                    _ => {}
                }
            }
        }

        nodes
            .iter()
            .filter_map(|node| {
                let record = match mention(node)? {
                    Mention::User(id) => users.get(&id),
                    Mention::Group(id) => groups.get(&id),
                    Mention::Project(id) => projects.get(&id),
                }?;
                Some((node.id(), record.clone()))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{nodes, services};
    use super::*;
    use crate::banzai::context::{RenderContext, RenderOptions};
    use std::collections::HashSet;

    const HTML: &str = concat!(
        r#"<a class="gfm" data-reference-type="user" data-user="1">@ann</a>"#,
        r#"<a class="gfm" data-reference-type="user" data-user="4">@hidden</a>"#,
        r#"<a class="gfm" data-reference-type="user" data-group="11">@secret-group</a>"#,
        r#"<a class="gfm" data-reference-type="user" data-project="100">@all</a>"#,
    );

    #[test]
    fn resolves_users_groups_and_projects() {
        let (store, services) = services();
        let context = RenderContext::new(None, None, RenderOptions::default());
        let nodes = nodes(HTML);
        let refs: Vec<&ReferenceNode> = nodes.iter().collect();

        let records = UserParser.records_for_nodes(&refs, &ParserEnv::new(&context, &services));

        assert_eq!(records.len(), 4);
        assert!(matches!(records[&nodes[2].id()], Record::Group(_)));
        assert!(matches!(records[&nodes[3].id()], Record::Project(_)));
        assert_eq!(store.batch_calls(), 2);
    }

    #[test]
    fn private_profiles_and_groups_are_hidden_from_strangers() {
        let (store, services) = services();
        let context = RenderContext::new(None, None, RenderOptions::default());
        let nodes = nodes(HTML);
        let refs: Vec<&ReferenceNode> = nodes.iter().collect();
        let bob = store.user("bob");

        let visible =
            UserParser.nodes_visible_to_user(bob.as_ref(), &refs, &ParserEnv::new(&context, &services));

        assert_eq!(visible, HashSet::from([nodes[0].id(), nodes[3].id()]));
    }
}
