// ============================================================================
// RESOURCE - Contrato genérico de los ítems sincronizados (Product, Store)
// ============================================================================

use std::collections::BTreeMap;
use std::fmt;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::AppError;
use crate::utils::encoding::encode_path_segment;

/// Identificador de ítem. El backend lo envía como número o como texto;
/// la identidad se compara siempre como texto.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ItemId(String);

impl ItemId {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into().trim().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn as_number(&self) -> Option<u64> {
        if self.0.is_empty() || !self.0.chars().all(|c| c.is_ascii_digit()) {
            return None;
        }
        self.0.parse().ok()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ItemId {
    fn from(raw: &str) -> Self {
        ItemId::new(raw)
    }
}

impl From<u64> for ItemId {
    fn from(raw: u64) -> Self {
        ItemId(raw.to_string())
    }
}

impl Serialize for ItemId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self.as_number() {
            Some(n) => serializer.serialize_u64(n),
            None => serializer.serialize_str(&self.0),
        }
    }
}

impl<'de> Deserialize<'de> for ItemId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match serde_json::Value::deserialize(deserializer)? {
            serde_json::Value::String(s) => Ok(ItemId::new(s)),
            serde_json::Value::Number(n) => Ok(ItemId(n.to_string())),
            other => Err(serde::de::Error::custom(format!("id inválido: {}", other))),
        }
    }
}

/// Tipo de un campo del formulario
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    Number,
    Integer,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub kind: FieldKind,
    pub required: bool,
}

impl FieldSpec {
    pub const fn text(name: &'static str) -> Self {
        Self { name, kind: FieldKind::Text, required: true }
    }

    pub const fn number(name: &'static str) -> Self {
        Self { name, kind: FieldKind::Number, required: true }
    }

    pub const fn integer(name: &'static str) -> Self {
        Self { name, kind: FieldKind::Integer, required: true }
    }

    pub const fn optional(self) -> Self {
        Self { required: false, ..self }
    }
}

/// Campos del formulario tal como los escribe el usuario
pub type FormFields = BTreeMap<String, String>;

/// Leer un campo recortado ("" si no existe)
pub fn field<'a>(fields: &'a FormFields, name: &str) -> &'a str {
    fields.get(name).map(|v| v.trim()).unwrap_or("")
}

pub fn parse_number(fields: &FormFields, name: &str) -> Result<f64, AppError> {
    let raw = field(fields, name);
    raw.parse::<f64>()
        .ok()
        .filter(|n| n.is_finite())
        .ok_or_else(|| AppError::validation(name, format!("'{}' no es un número", raw)))
}

pub fn parse_integer(fields: &FormFields, name: &str) -> Result<i64, AppError> {
    let raw = field(fields, name);
    raw.parse::<i64>()
        .map_err(|_| AppError::validation(name, format!("'{}' no es un entero", raw)))
}

pub fn parse_optional_number(fields: &FormFields, name: &str) -> Result<Option<f64>, AppError> {
    if field(fields, name).is_empty() {
        return Ok(None);
    }
    parse_number(fields, name).map(Some)
}

/// Valida requeridos no vacíos y que los numéricos parseen
pub fn validate_fields(specs: &[FieldSpec], fields: &FormFields) -> Result<(), AppError> {
    for spec in specs {
        let raw = field(fields, spec.name);
        if raw.is_empty() {
            if spec.required {
                return Err(AppError::validation(spec.name, "es obligatorio"));
            }
            continue;
        }
        match spec.kind {
            FieldKind::Text => {}
            FieldKind::Number => {
                parse_number(fields, spec.name)?;
            }
            FieldKind::Integer => {
                parse_integer(fields, spec.name)?;
            }
        }
    }
    Ok(())
}

/// Ítem de una colección remota
pub trait Resource: Clone + fmt::Debug + Serialize + DeserializeOwned + 'static {
    /// Ruta de la colección relativa a la base de la API (`/master-data/products`)
    const COLLECTION_PATH: &'static str;

    /// Nombre legible para logs
    const LABEL: &'static str;

    fn id(&self) -> &ItemId;

    /// Esquema del formulario, sin incluir `id`
    fn fields() -> &'static [FieldSpec];

    /// Poblar el formulario a partir del ítem (modo edición)
    fn to_form(&self) -> FormFields;

    /// Construir el ítem desde un formulario ya validado
    fn from_form(id: ItemId, fields: &FormFields) -> Result<Self, AppError>;

    /// Ruta del ítem; el id va codificado como segmento
    fn item_path(id: &ItemId) -> String {
        format!("{}/{}", Self::COLLECTION_PATH, encode_path_segment(id.as_str()))
    }
}
