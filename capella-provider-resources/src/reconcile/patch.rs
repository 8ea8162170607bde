use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};

pub static ORGANIZATION_ROLES_PATH: &str = "/organizationRoles";
pub static DEFAULT_RESOURCE_TYPE: &str = "project";

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PatchOp {
    Add,
    Remove,
}

impl Display for PatchOp {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            PatchOp::Add => write!(f, "add"),
            PatchOp::Remove => write!(f, "remove"),
        }
    }
}

/// A sub-resource grant as sent to the users endpoint.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ResourceGrant {
    pub id: String,
    #[serde(rename = "type")]
    pub resource_type: String,
    pub roles: Vec<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(untagged)]
pub enum PatchValue {
    Roles(Vec<String>),
    Resource(ResourceGrant),
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct PatchEntry {
    pub op: PatchOp,
    pub path: String,
    pub value: PatchValue,
}

impl PatchEntry {
    fn roles(op: PatchOp, path: String, roles: Vec<String>) -> Self {
        PatchEntry { op, path, value: PatchValue::Roles(roles) }
    }

    fn resource(op: PatchOp, grant: ResourceGrant) -> Self {
        PatchEntry {
            op,
            path: format!("/resources/{}", grant.id),
            value: PatchValue::Resource(grant),
        }
    }
}

/// One keyed sub-resource of a user, with an optional type tag.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SubResource {
    pub id: String,
    pub resource_type: Option<String>,
    pub roles: Vec<String>,
}

impl From<&SubResource> for ResourceGrant {
    fn from(resource: &SubResource) -> Self {
        ResourceGrant {
            id: resource.id.clone(),
            resource_type: resource
                .resource_type
                .clone()
                .filter(|t| !t.is_empty())
                .unwrap_or_else(|| DEFAULT_RESOURCE_TYPE.to_string()),
            roles: dedup(&resource.roles),
        }
    }
}

/// Role assignments of one entity, either planned or last stored.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct UserRoles {
    pub organization_roles: Vec<String>,
    pub resources: Vec<SubResource>,
}

impl UserRoles {
    fn resource(&self, id: &str) -> Option<&SubResource> {
        self.resources.iter().find(|r| r.id == id)
    }
}

/// Items of `left` missing from `right`, in `left` order, without repeats.
fn difference(left: &[String], right: &[String]) -> Vec<String> {
    dedup(left)
        .into_iter()
        .filter(|item| !right.contains(item))
        .collect()
}

fn dedup(items: &[String]) -> Vec<String> {
    items.iter().fold(Vec::with_capacity(items.len()), |mut acc, item| {
        if !acc.contains(item) {
            acc.push(item.clone());
        }
        acc
    })
}

fn role_changes(path: String, stored: &[String], desired: &[String]) -> Vec<PatchEntry> {
    let added = difference(desired, stored);
    let removed = difference(stored, desired);

    let mut entries = Vec::with_capacity(2);
    if !added.is_empty() {
        entries.push(PatchEntry::roles(PatchOp::Add, path.clone(), added));
    }
    if !removed.is_empty() {
        entries.push(PatchEntry::roles(PatchOp::Remove, path, removed));
    }
    entries
}

/// Build the ordered edit script that turns `stored` into `desired`.
///
/// Entries come out as organization role adds, organization role removes,
/// role changes of sub-resources present on both sides, whole sub-resource
/// adds and finally whole sub-resource removes. Within one path an add is
/// always emitted before a remove. Sub-resources match by id only.
///
/// # Arguments
/// * `stored` - The last known remote roles
/// * `desired` - The planned roles
///
/// # Returns
/// The patch entries, empty when both sides hold the same roles
pub fn build_patch(stored: &UserRoles, desired: &UserRoles) -> Vec<PatchEntry> {
    let organization = role_changes(
        ORGANIZATION_ROLES_PATH.to_string(),
        &stored.organization_roles,
        &desired.organization_roles,
    );

    let shared = desired
        .resources
        .iter()
        .filter_map(|wanted| stored.resource(&wanted.id).map(|existing| (existing, wanted)))
        .flat_map(|(existing, wanted)| {
            role_changes(
                format!("/resources/{}/roles", wanted.id),
                &existing.roles,
                &wanted.roles,
            )
        });

    let added = desired
        .resources
        .iter()
        .filter(|wanted| stored.resource(&wanted.id).is_none())
        .map(|wanted| PatchEntry::resource(PatchOp::Add, wanted.into()));

    let removed = stored
        .resources
        .iter()
        .filter(|existing| desired.resource(&existing.id).is_none())
        .map(|existing| PatchEntry::resource(PatchOp::Remove, existing.into()));

    organization
        .into_iter()
        .chain(shared)
        .chain(added)
        .chain(removed)
        .collect()
}

/// Keep a previously stored ordering when the remote list holds the same
/// members, so a refresh does not report drift for a reordered response.
pub fn reconcile_order(prior: &[String], remote: &[String]) -> Vec<String> {
    let same_members = prior.len() == remote.len()
        && prior.iter().all(|item| remote.contains(item))
        && remote.iter().all(|item| prior.contains(item));

    if same_members { prior.to_vec() } else { remote.to_vec() }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn roles(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn project(id: &str, items: &[&str]) -> SubResource {
        SubResource { id: id.to_string(), resource_type: None, roles: roles(items) }
    }

    fn user(organization_roles: &[&str], resources: Vec<SubResource>) -> UserRoles {
        UserRoles { organization_roles: roles(organization_roles), resources }
    }

    /// Apply a patch to a snapshot, for checking that patches converge.
    fn apply(stored: &UserRoles, patch: &[PatchEntry]) -> UserRoles {
        let mut next = stored.clone();
        for entry in patch {
            match (&entry.op, &entry.value) {
                (PatchOp::Add, PatchValue::Roles(values)) if entry.path == ORGANIZATION_ROLES_PATH => {
                    next.organization_roles.extend(values.iter().cloned())
                }
                (PatchOp::Remove, PatchValue::Roles(values)) if entry.path == ORGANIZATION_ROLES_PATH => {
                    next.organization_roles.retain(|r| !values.contains(r))
                }
                (op, PatchValue::Roles(values)) => {
                    let id = entry.path.trim_start_matches("/resources/").trim_end_matches("/roles");
                    let resource = next.resources.iter_mut().find(|r| r.id == id).unwrap();
                    match op {
                        PatchOp::Add => resource.roles.extend(values.iter().cloned()),
                        PatchOp::Remove => resource.roles.retain(|r| !values.contains(r)),
                    }
                }
                (PatchOp::Add, PatchValue::Resource(grant)) => next.resources.push(SubResource {
                    id: grant.id.clone(),
                    resource_type: Some(grant.resource_type.clone()),
                    roles: grant.roles.clone(),
                }),
                (PatchOp::Remove, PatchValue::Resource(grant)) => next.resources.retain(|r| r.id != grant.id),
            }
        }
        next
    }

    fn set_equal(left: &[String], right: &[String]) -> bool {
        left.iter().all(|i| right.contains(i)) && right.iter().all(|i| left.contains(i))
    }

    #[test]
    fn identical_snapshots_produce_no_entries() {
        let state = user(&["organizationMember"], vec![project("100", &["projectViewer"])]);

        assert!(build_patch(&state, &state).is_empty());
    }

    #[test]
    fn reordered_roles_produce_no_entries() {
        let stored = user(&["a", "b"], vec![project("100", &["x", "y"])]);
        let desired = user(&["b", "a"], vec![project("100", &["y", "x"])]);

        assert!(build_patch(&stored, &desired).is_empty());
    }

    #[test]
    fn adds_organization_role() {
        let patch = build_patch(&user(&["member"], vec![]), &user(&["member", "owner"], vec![]));

        assert_eq!(
            patch,
            vec![PatchEntry::roles(PatchOp::Add, "/organizationRoles".into(), roles(&["owner"]))],
        );
    }

    #[test]
    fn replaces_organization_role_with_add_first() {
        let patch = build_patch(&user(&["member"], vec![]), &user(&["owner"], vec![]));

        assert_eq!(
            patch,
            vec![
                PatchEntry::roles(PatchOp::Add, "/organizationRoles".into(), roles(&["owner"])),
                PatchEntry::roles(PatchOp::Remove, "/organizationRoles".into(), roles(&["member"])),
            ],
        );
    }

    #[test]
    fn adds_whole_sub_resource_with_default_type() {
        let stored = user(&["member"], vec![project("100", &["viewer"])]);
        let desired = user(
            &["member"],
            vec![project("100", &["viewer"]), project("200", &["viewer", "dataReaderWriter"])],
        );

        let patch = build_patch(&stored, &desired);

        assert_eq!(patch.len(), 1);
        assert_eq!(
            serde_json::to_value(&patch[0]).unwrap(),
            json!({
                "op": "add",
                "path": "/resources/200",
                "value": {"id": "200", "type": "project", "roles": ["viewer", "dataReaderWriter"]},
            }),
        );
    }

    #[test]
    fn orders_categories() {
        let stored = user(
            &["member", "billing"],
            vec![project("1", &["viewer"]), project("3", &["owner"])],
        );
        let desired = user(
            &["member", "owner"],
            vec![project("1", &["writer"]), project("2", &["viewer"])],
        );

        let paths: Vec<(PatchOp, String)> = build_patch(&stored, &desired)
            .into_iter()
            .map(|e| (e.op, e.path))
            .collect();

        assert_eq!(
            paths,
            vec![
                (PatchOp::Add, "/organizationRoles".to_string()),
                (PatchOp::Remove, "/organizationRoles".to_string()),
                (PatchOp::Add, "/resources/1/roles".to_string()),
                (PatchOp::Remove, "/resources/1/roles".to_string()),
                (PatchOp::Add, "/resources/2".to_string()),
                (PatchOp::Remove, "/resources/3".to_string()),
            ],
        );
    }

    #[test]
    fn type_tag_is_ignored_when_matching() {
        let stored = user(&[], vec![SubResource {
            id: "1".into(),
            resource_type: Some("project".into()),
            roles: roles(&["viewer"]),
        }]);
        let desired = user(&[], vec![project("1", &["viewer"])]);

        assert!(build_patch(&stored, &desired).is_empty());
    }

    #[test]
    fn removed_sub_resource_carries_stored_record() {
        let stored = user(&[], vec![project("9", &["viewer", "viewer"])]);

        let patch = build_patch(&stored, &user(&[], vec![]));

        assert_eq!(
            patch[0].value,
            PatchValue::Resource(ResourceGrant {
                id: "9".into(),
                resource_type: "project".into(),
                roles: roles(&["viewer"]),
            }),
        );
    }

    #[test]
    fn applying_patch_converges_to_desired() {
        let cases = vec![
            (user(&["member"], vec![]), user(&["owner"], vec![project("1", &["a"])])),
            (
                user(&["a", "b"], vec![project("1", &["x"]), project("2", &["y"])]),
                user(&["b", "c"], vec![project("2", &["y", "z"]), project("3", &["x"])]),
            ),
            (user(&["a"], vec![project("1", &["x", "y"])]), user(&[], vec![])),
        ];

        for (stored, desired) in cases {
            let result = apply(&stored, &build_patch(&stored, &desired));

            assert!(set_equal(&result.organization_roles, &desired.organization_roles));
            assert_eq!(result.resources.len(), desired.resources.len());
            for wanted in &desired.resources {
                let got = result.resources.iter().find(|r| r.id == wanted.id).unwrap();
                assert!(set_equal(&got.roles, &wanted.roles));
            }
        }
    }

    #[test]
    fn adds_precede_removes_on_each_path() {
        let stored = user(&["a", "b"], vec![project("1", &["x", "y"])]);
        let desired = user(&["c"], vec![project("1", &["z"])]);

        let patch = build_patch(&stored, &desired);
        for (i, entry) in patch.iter().enumerate() {
            if entry.op == PatchOp::Remove {
                assert!(!patch[i..].iter().any(|e| e.op == PatchOp::Add && e.path == entry.path));
            }
        }
    }

    #[test]
    fn reconcile_order_keeps_prior_for_same_members() {
        let prior = roles(&["a", "b", "c"]);

        assert_eq!(reconcile_order(&prior, &roles(&["c", "a", "b"])), prior);
        assert_eq!(reconcile_order(&prior, &roles(&["a", "d"])), roles(&["a", "d"]));
    }
}
