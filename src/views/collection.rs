// ============================================================================
// COLLECTION VIEW - Tabla + formulario genéricos para cualquier `Resource`
// ============================================================================

use crate::models::{FieldKind, Resource};
use crate::state::form_state::{EditFormState, FormMode, ModalState};
use crate::utils::encoding::encode_path_segment;
use crate::utils::format::{escape_html, format_price};
use crate::viewmodels::resource_viewmodel::ResourceSynchronizer;
use crate::views::common::{render_confirm_modal, render_optional_error};

/// Etiqueta visible de un campo
fn field_label(name: &str) -> &str {
    match name {
        "name" => "Nombre",
        "category" => "Categoría",
        "price" => "Precio",
        "stock" => "Stock",
        "location" => "Ubicación",
        "latitude" => "Latitud",
        "longitude" => "Longitud",
        other => other,
    }
}

fn cell_value(name: &str, raw: &str) -> String {
    if name == "price" {
        if let Ok(value) = raw.parse::<f64>() {
            return format_price(value);
        }
    }
    escape_html(raw)
}

/// Tabla de ítems. `link_prefix` convierte el id en enlace (p. ej. `#/almacenes/`).
pub fn render_table<R: Resource>(items: &[R], link_prefix: Option<&str>) -> String {
    if items.is_empty() {
        return r#"<p class="empty">No hay registros.</p>"#.to_string();
    }
    let header: String = R::fields()
        .iter()
        .map(|f| format!("<th>{}</th>", field_label(f.name)))
        .collect();

    let rows: String = items
        .iter()
        .map(|item| {
            let id = escape_html(item.id().as_str());
            let form = item.to_form();
            let cells: String = R::fields()
                .iter()
                .map(|f| {
                    let raw = form.get(f.name).map(String::as_str).unwrap_or("");
                    format!("<td>{}</td>", cell_value(f.name, raw))
                })
                .collect();
            let id_cell = match link_prefix {
                Some(prefix) => {
                    let href = escape_html(&encode_path_segment(item.id().as_str()));
                    format!(r#"<a href="{}{}">{}</a>"#, prefix, href, id)
                }
                None => id.clone(),
            };
            format!(
                r#"<tr data-id="{id}"><td>{id_cell}</td>{cells}<td class="actions"><button data-action="edit" data-id="{id}">Editar</button><button data-action="delete" data-id="{id}">Eliminar</button></td></tr>"#,
                id = id,
                id_cell = id_cell,
                cells = cells,
            )
        })
        .collect();

    format!(
        r#"<table class="table"><thead><tr><th>ID</th>{}<th></th></tr></thead><tbody>{}</tbody></table>"#,
        header, rows
    )
}

/// Formulario de creación/edición dentro de un modal
pub fn render_form<R: Resource>(form: &EditFormState) -> String {
    let Some(mode) = form.mode() else {
        return String::new();
    };
    let saving = form.modal() == ModalState::Saving;
    let disabled = if saving { " disabled" } else { "" };
    let draft = form.draft();

    let (title, id_block) = match mode {
        FormMode::Create => {
            let checked = if draft.auto_generate_id { " checked" } else { "" };
            let id_disabled = if draft.auto_generate_id || saving { " disabled" } else { "" };
            (
                format!("Nuevo registro de {}", R::LABEL),
                format!(
                    r#"<label><input type="checkbox" data-field="autoId"{}{}> Generar ID automáticamente</label><label for="field-id">ID</label><input id="field-id" data-field="id" value="{}"{}>"#,
                    checked,
                    disabled,
                    escape_html(&draft.id),
                    id_disabled
                ),
            )
        }
        FormMode::Edit(id) => (
            format!("Editar {}", escape_html(id.as_str())),
            String::new(),
        ),
    };

    let inputs: String = R::fields()
        .iter()
        .map(|f| {
            let kind = match f.kind {
                FieldKind::Text => "text",
                FieldKind::Number | FieldKind::Integer => "number",
            };
            let value = draft.fields.get(f.name).map(String::as_str).unwrap_or("");
            format!(
                r#"<label for="field-{name}">{label}{req}</label><input id="field-{name}" type="{kind}" data-field="{name}" value="{value}"{disabled}>"#,
                name = f.name,
                label = field_label(f.name),
                req = if f.required { " *" } else { "" },
                kind = kind,
                value = escape_html(value),
                disabled = disabled,
            )
        })
        .collect();

    format!(
        r#"<div class="modal-backdrop"><form class="modal edit-form" data-action="submit-form"><h3>{title}</h3>{id_block}{inputs}{error}<div class="modal-actions"><button type="button" data-action="close-form"{disabled}>Cancelar</button><button type="submit" class="btn-confirm"{disabled}>{label}</button></div></form></div>"#,
        title = title,
        id_block = id_block,
        inputs = inputs,
        error = render_optional_error(form.error()),
        disabled = disabled,
        label = if saving { "Guardando..." } else { "Guardar" },
    )
}

/// Página de gestión completa de una colección
pub fn render_collection_page<R: Resource>(
    title: &str,
    sync: &ResourceSynchronizer<R>,
    filter: &str,
    link_prefix: Option<&str>,
) -> String {
    let items = sync.filtered(filter);
    let loading = if sync.is_loading() {
        r#"<p class="loading">Cargando...</p>"#
    } else {
        ""
    };
    let suspended = if sync.is_suspended() { " disabled" } else { "" };
    let delete_modal = match sync.pending_delete() {
        Some(id) => {
            let state = if sync.is_deleting() { ModalState::Saving } else { ModalState::Open };
            let modal = render_confirm_modal(
                "Eliminar registro",
                &format!("¿Seguro que deseas eliminar el registro {}?", id),
                "Eliminar",
                state,
            );
            // Un borrado fallido deja la confirmación abierta con su error
            format!("{}{}", modal, render_optional_error(sync.delete_error().as_ref()))
        }
        None => String::new(),
    };

    format!(
        r#"<section class="collection"><h2>{title}</h2><div class="toolbar"><input class="filter" id="filter" data-field="filter" placeholder="Filtrar por ID" value="{filter}"><button data-action="new"{suspended}>Nuevo</button></div>{error}{loading}{table}{form}{delete_modal}</section>"#,
        title = escape_html(title),
        filter = escape_html(filter),
        suspended = suspended,
        error = render_optional_error(sync.error().as_ref()),
        loading = loading,
        table = render_table(&items, link_prefix),
        form = render_form::<R>(&sync.form()),
        delete_modal = delete_modal,
    )
}
