//! Page-template stage: list and detail page templates for the UI layer.
//!
//! The emitted files are themselves templates for the host application's
//! renderer; its placeholders use `<% %>`/`<%= %>` markers so they pass
//! through this generator verbatim.

use crate::emit::{Artifact, EmitContext, EmitterStage, StageKind};
use crate::error::Result;
use crate::schema::EntityDefinition;
use std::path::PathBuf;

pub(crate) const INDEX_TEMPLATE_NAME: &str = "page_index.html.tera";
pub(crate) const DETAIL_TEMPLATE_NAME: &str = "page_detail.html.tera";

pub(crate) const INDEX_TEMPLATE: &str = r##"<!-- Generated by entigen: {{ entity.plural_label }} index -->
<section class="entity-index" data-entity="{{ entity.snake_name }}">
  <header>
    {% if entity.icon %}<i class="icon icon-{{ entity.icon }}"></i>
    {% endif %}<h1>{{ entity.plural_label }}</h1>
  </header>
  <table>
    <thead>
      <tr>
{% for p in list_props %}        <th{% if p.sortable %} data-sortable="true"{% endif %}>{{ p.label }}</th>
{% endfor %}      </tr>
    </thead>
    <tbody>
      <% for row in rows %>
      <tr>
{% for p in list_props %}        <td><%= row.{{ p.name }} %></td>
{% endfor %}      </tr>
      <% endfor %>
    </tbody>
  </table>
</section>
"##;

pub(crate) const DETAIL_TEMPLATE: &str = r##"<!-- Generated by entigen: {{ entity.label }} detail -->
<article class="entity-detail" data-entity="{{ entity.snake_name }}">
  <h1>{{ entity.label }} <%= row.id %></h1>
  <dl>
{% for p in detail_props %}    <dt>{{ p.label }}</dt>
    <dd><%= row.{{ p.name }} %></dd>
{% endfor %}  </dl>
</article>
"##;

/// Emits `templates/<entity>/index.html` and `templates/<entity>/detail.html`.
pub struct PageTemplateStage;

impl PageTemplateStage {
    fn paths(entity: &EntityDefinition, cx: &EmitContext<'_>) -> (PathBuf, PathBuf) {
        let snake = entity.snake_name();
        (
            cx.path(format!("templates/{snake}/index.html")),
            cx.path(format!("templates/{snake}/detail.html")),
        )
    }
}

impl EmitterStage for PageTemplateStage {
    fn kind(&self) -> StageKind {
        StageKind::PageTemplate
    }

    fn plan(&self, entity: &EntityDefinition, cx: &EmitContext<'_>) -> Vec<PathBuf> {
        let (index, detail) = Self::paths(entity, cx);
        vec![index, detail]
    }

    fn emit(&self, entity: &EntityDefinition, cx: &EmitContext<'_>) -> Result<Vec<Artifact>> {
        let (index, detail) = Self::paths(entity, cx);
        Ok(vec![
            Artifact {
                path: index,
                contents: cx.render(INDEX_TEMPLATE_NAME, entity)?,
            },
            Artifact {
                path: detail,
                contents: cx.render(DETAIL_TEMPLATE_NAME, entity)?,
            },
        ])
    }
}
