use crate::models::{ConfigField, MasterConfig};
use crate::state::form_state::ModalState;
use crate::utils::format::escape_html;
use crate::viewmodels::settings_viewmodel::SettingsViewModel;
use crate::views::common::{render_confirm_modal, render_error, render_loading};

fn field_label(field: ConfigField) -> &'static str {
    match field {
        ConfigField::Percentage => "Stock (%)",
        ConfigField::MinDistance => "Distancia mínima (metros)",
    }
}

fn render_inputs(draft: &MasterConfig, disabled: bool) -> String {
    ConfigField::ALL
        .iter()
        .map(|field| {
            format!(
                r#"<div><label class="label" for="setting-{name}">{label}</label><input class="input" id="setting-{name}" data-setting="{name}" value="{value}"{disabled}></div>"#,
                name = field.name(),
                label = field_label(*field),
                value = escape_html(field.value(draft)),
                disabled = if disabled { " disabled" } else { "" },
            )
        })
        .collect()
}

/// Página de configuración. `confirming` abre el modal de confirmación.
pub fn render_settings(vm: &SettingsViewModel, confirming: bool) -> String {
    if vm.is_loading() && vm.saved().is_none() {
        return render_loading("Cargando configuración...");
    }
    if vm.saved().is_none() {
        if let Some(error) = vm.error() {
            // Sin datos que mostrar: solo el error con reintento
            return format!(r#"<div class="form-settings"><h1>Configuración</h1>{}</div>"#, render_error(&error));
        }
    }

    let modal_state = match (confirming, vm.is_saving()) {
        (_, true) => ModalState::Saving,
        (true, false) => ModalState::Open,
        (false, false) => ModalState::Closed,
    };
    format!(
        r#"<div class="form-settings"><h1>Configuración</h1>{inputs}{error}<button class="btn-update" data-action="confirm-settings"{disabled}>Actualizar</button>{modal}</div>"#,
        inputs = render_inputs(&vm.draft(), vm.is_saving()),
        error = vm.error().map(|e| render_error(&e)).unwrap_or_default(),
        disabled = if vm.is_dirty() && !vm.is_saving() { "" } else { " disabled" },
        modal = render_confirm_modal(
            "Actualizar configuración",
            "¿Seguro? Cambiará la configuración usada para crear nuevos almacenes",
            "Actualizar",
            modal_state,
        ),
    )
}
