use crate::models::{Product, Store};
use crate::utils::format::{escape_html, format_price};
use crate::viewmodels::warehouse_viewmodel::WarehouseViewModel;
use crate::views::common::{render_loading, render_map, render_optional_error};

fn render_product_rows(products: &[Product]) -> String {
    if products.is_empty() {
        return r#"<p class="empty">No hay productos en este almacén.</p>"#.to_string();
    }
    let rows: String = products
        .iter()
        .map(|p| {
            format!(
                "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>",
                escape_html(p.id.as_str()),
                escape_html(&p.name),
                escape_html(&p.category),
                format_price(p.price),
                p.stock
            )
        })
        .collect();
    format!(
        r#"<table class="table"><thead><tr><th>ID</th><th>Nombre</th><th>Categoría</th><th>Precio</th><th>Stock</th></tr></thead><tbody>{}</tbody></table>"#,
        rows
    )
}

/// Detalle de un almacén: datos, mapa y productos
pub fn render_store(vm: &WarehouseViewModel, store: Option<&Store>) -> String {
    let id = vm.store_id().map(|id| id.to_string()).unwrap_or_default();
    let (name, location) = match store {
        Some(s) => (s.name.as_str(), s.location.as_str()),
        None => ("", ""),
    };
    let body = if vm.is_loading() {
        render_loading("Cargando productos del almacén...")
    } else {
        render_product_rows(&vm.products())
    };
    format!(
        r#"<div class="warehouse-detail-container"><h2>Almacén {id}</h2><div class="warehouse-info"><h3>{name}</h3><p>{location}</p><p><strong>Total de productos:</strong> {total}</p></div><div class="map-container-wrapper"><h4>Ubicación</h4>{map}</div>{error}{body}</div>"#,
        id = escape_html(&id),
        name = escape_html(name),
        location = escape_html(location),
        total = vm.total_products(),
        map = render_map(&vm.map_for(store)),
        error = render_optional_error(vm.error().as_ref()),
        body = body,
    )
}

pub fn render_virtual_warehouse(vm: &WarehouseViewModel) -> String {
    if vm.is_loading() && vm.virtual_warehouse().is_none() {
        return render_loading("Cargando información del almacén virtual...");
    }
    let Some(warehouse) = vm.virtual_warehouse() else {
        return format!(
            r#"<div class="virtual-warehouse-container">{}</div>"#,
            render_optional_error(vm.error().as_ref())
        );
    };
    format!(
        r#"<div class="virtual-warehouse-container"><div class="warehouse-info-card"><h3>{name}</h3><p><strong>ID:</strong> {id}</p><p><strong>Total de productos:</strong> {total}</p></div>{error}<h3>Productos en inventario</h3>{rows}</div>"#,
        name = escape_html(warehouse.display_name()),
        id = warehouse.id.as_ref().map(|id| escape_html(id.as_str())).unwrap_or_default(),
        total = warehouse.total_products(),
        error = render_optional_error(vm.error().as_ref()),
        rows = render_product_rows(&warehouse.products),
    )
}
