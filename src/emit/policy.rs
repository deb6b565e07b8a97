//! Policy stage: the access-control artifact.

use crate::emit::{Artifact, EmitContext, EmitterStage, StageKind};
use crate::error::Result;
use crate::schema::EntityDefinition;
use std::path::PathBuf;

pub(crate) const TEMPLATE_NAME: &str = "policy.rs.tera";

pub(crate) const TEMPLATE: &str = r##"//! Generated by entigen — access policy for {{ entity.label }}.
//! Do not edit by hand; regenerate instead.

/// Actions the policy can decide on.
pub const ACTIONS: &[&str] = &["view", "create", "edit", "delete"];

/// Roles granted access{% if entity.policy.enabled %}; empty means owner-only{% else %} (policy disabled: everything is allowed){% endif %}.
pub const ROLES: &[&str] = &[{% for role in entity.policy.roles %}"{{ role }}"{% if not loop.last %}, {% endif %}{% endfor %}];
{% if entity.api.security %}
/// Security expression shared with the API surface.
pub const SECURITY: &str = "{{ entity.api.security }}";
{% endif %}
pub struct {{ entity.name }}Policy;

impl {{ entity.name }}Policy {
    /// Decide whether a subject holding `roles` may perform `action`.
    pub fn allows(roles: &[String], action: &str) -> bool {
        if !ACTIONS.contains(&action) {
            return false;
        }
{% if entity.policy.enabled %}        ROLES.iter().any(|granted| roles.iter().any(|held| held == granted))
{% else %}        let _ = roles;
        true
{% endif %}    }
}
"##;

/// Emits `src/policies/<entity>_policy.rs`.
pub struct PolicyStage;

impl EmitterStage for PolicyStage {
    fn kind(&self) -> StageKind {
        StageKind::Policy
    }

    fn plan(&self, entity: &EntityDefinition, cx: &EmitContext<'_>) -> Vec<PathBuf> {
        vec![cx.path(format!("src/policies/{}_policy.rs", entity.snake_name()))]
    }

    fn emit(&self, entity: &EntityDefinition, cx: &EmitContext<'_>) -> Result<Vec<Artifact>> {
        let path = cx.path(format!("src/policies/{}_policy.rs", entity.snake_name()));
        let contents = cx.render(TEMPLATE_NAME, entity)?;
        Ok(vec![Artifact { path, contents }])
    }
}
