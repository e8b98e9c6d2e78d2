use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::models::product::Product;
use crate::models::resource::{
    field, parse_optional_number, FieldSpec, FormFields, ItemId, Resource,
};

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

/// Almacén (tienda). `location` es texto libre; las coordenadas son opcionales.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Store {
    pub id: ItemId,
    pub name: String,
    #[serde(default)]
    pub location: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coordinates: Option<Coordinates>,
}

const STORE_FIELDS: &[FieldSpec] = &[
    FieldSpec::text("name"),
    FieldSpec::text("location"),
    FieldSpec::number("latitude").optional(),
    FieldSpec::number("longitude").optional(),
];

impl Resource for Store {
    const COLLECTION_PATH: &'static str = "/almacenes";
    const LABEL: &'static str = "almacenes";

    fn id(&self) -> &ItemId {
        &self.id
    }

    fn fields() -> &'static [FieldSpec] {
        STORE_FIELDS
    }

    fn to_form(&self) -> FormFields {
        let mut fields = FormFields::new();
        fields.insert("name".into(), self.name.clone());
        fields.insert("location".into(), self.location.clone());
        if let Some(coords) = self.coordinates {
            fields.insert("latitude".into(), coords.latitude.to_string());
            fields.insert("longitude".into(), coords.longitude.to_string());
        }
        fields
    }

    fn from_form(id: ItemId, fields: &FormFields) -> Result<Self, AppError> {
        let latitude = parse_optional_number(fields, "latitude")?;
        let longitude = parse_optional_number(fields, "longitude")?;
        let coordinates = match (latitude, longitude) {
            (Some(latitude), Some(longitude)) => {
                if !(-90.0..=90.0).contains(&latitude) {
                    return Err(AppError::validation("latitude", "fuera de rango"));
                }
                if !(-180.0..=180.0).contains(&longitude) {
                    return Err(AppError::validation("longitude", "fuera de rango"));
                }
                Some(Coordinates { latitude, longitude })
            }
            (None, None) => None,
            (Some(_), None) => {
                return Err(AppError::validation("longitude", "requerida junto con la latitud"))
            }
            (None, Some(_)) => {
                return Err(AppError::validation("latitude", "requerida junto con la longitud"))
            }
        };
        Ok(Self {
            id,
            name: field(fields, "name").to_string(),
            location: field(fields, "location").to_string(),
            coordinates,
        })
    }
}

impl Store {
    /// Ruta de los productos del almacén
    pub fn products_path(id: &ItemId) -> String {
        format!("{}/productos", Store::item_path(id))
    }
}

/// Vista agregada del almacén virtual
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VirtualWarehouse {
    #[serde(default)]
    pub id: Option<ItemId>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub products: Vec<Product>,
}

impl VirtualWarehouse {
    pub const PATH: &'static str = "/almacen-virtual";

    pub fn display_name(&self) -> &str {
        self.name.as_deref().filter(|n| !n.is_empty()).unwrap_or("Almacén sin nombre")
    }

    pub fn total_products(&self) -> usize {
        self.products.len()
    }
}
