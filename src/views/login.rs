// ============================================================================
// LOGIN VIEW
// ============================================================================

use crate::error::AppError;
use crate::utils::format::escape_html;

/// Formulario de login. `signing_in` deshabilita el envío.
pub fn render_login(email: &str, signing_in: bool, error: Option<&AppError>) -> String {
    let message = match error {
        Some(AppError::Validation { field, reason }) => {
            format!(r#"<p class="login-error" role="alert">{}: {}</p>"#, escape_html(field), escape_html(reason))
        }
        Some(e) => format!(r#"<p class="login-error" role="alert">{}</p>"#, escape_html(&e.to_string())),
        None => String::new(),
    };
    let disabled = if signing_in { " disabled" } else { "" };
    let label = if signing_in { "Ingresando..." } else { "Ingresar" };

    format!(
        concat!(
            r#"<div class="login-screen"><form class="login-container" data-action="login">"#,
            r#"<h2>Iniciar sesión</h2>"#,
            r#"<label for="email">Email</label>"#,
            r#"<input id="email" name="email" type="email" autocomplete="username" value="{email}"{disabled}>"#,
            r#"<label for="password">Contraseña</label>"#,
            r#"<input id="password" name="password" type="password" autocomplete="current-password"{disabled}>"#,
            r#"{message}<button type="submit" class="btn-login"{disabled}>{label}</button>"#,
            r#"</form></div>"#
        ),
        email = escape_html(email),
        disabled = disabled,
        message = message,
        label = label,
    )
}
