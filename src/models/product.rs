use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::models::resource::{
    field, parse_integer, parse_number, FieldSpec, FormFields, ItemId, Resource,
};

/// Producto del maestro de datos
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: ItemId,
    pub name: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub price: f64,
    #[serde(default)]
    pub stock: i64,
}

const PRODUCT_FIELDS: &[FieldSpec] = &[
    FieldSpec::text("name"),
    FieldSpec::text("category"),
    FieldSpec::number("price"),
    FieldSpec::integer("stock"),
];

impl Resource for Product {
    const COLLECTION_PATH: &'static str = "/master-data/products";
    const LABEL: &'static str = "productos";

    fn id(&self) -> &ItemId {
        &self.id
    }

    fn fields() -> &'static [FieldSpec] {
        PRODUCT_FIELDS
    }

    fn to_form(&self) -> FormFields {
        let mut fields = FormFields::new();
        fields.insert("name".into(), self.name.clone());
        fields.insert("category".into(), self.category.clone());
        fields.insert("price".into(), self.price.to_string());
        fields.insert("stock".into(), self.stock.to_string());
        fields
    }

    fn from_form(id: ItemId, fields: &FormFields) -> Result<Self, AppError> {
        Ok(Self {
            id,
            name: field(fields, "name").to_string(),
            category: field(fields, "category").to_string(),
            price: parse_number(fields, "price")?,
            stock: parse_integer(fields, "stock")?,
        })
    }
}
