use serde::{Deserialize, Deserializer, Serialize};

/// Configuración maestra: porcentaje de stock y distancia mínima entre almacenes.
/// El backend devuelve números o textos; se guardan como texto para el formulario.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MasterConfig {
    #[serde(default, deserialize_with = "lenient_string")]
    pub percentage: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub min_distance: String,
}

impl MasterConfig {
    pub const PATH: &'static str = "/master-data/config";
}

/// Campos actualizables, en el orden en que se envían
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConfigField {
    Percentage,
    MinDistance,
}

impl ConfigField {
    pub const ALL: [ConfigField; 2] = [ConfigField::Percentage, ConfigField::MinDistance];

    /// Nombre en el formulario
    pub fn name(&self) -> &'static str {
        match self {
            ConfigField::Percentage => "percentage",
            ConfigField::MinDistance => "minDistance",
        }
    }

    /// `PUT /master-data/config/{segment}?{param}=N`
    pub fn path(&self, value: &str) -> String {
        let (segment, param) = match self {
            ConfigField::Percentage => ("percentage", "percentage"),
            ConfigField::MinDistance => ("min-distance", "minDistance"),
        };
        format!("{}/{}?{}={}", MasterConfig::PATH, segment, param, value)
    }

    pub fn value<'a>(&self, config: &'a MasterConfig) -> &'a str {
        match self {
            ConfigField::Percentage => &config.percentage,
            ConfigField::MinDistance => &config.min_distance,
        }
    }
}

fn lenient_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => s,
        serde_json::Value::Number(n) => n.to_string(),
        _ => String::new(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_numbers_strings_and_nulls() {
        let config: MasterConfig =
            serde_json::from_str(r#"{"percentage": 10, "minDistance": "50"}"#).unwrap();
        assert_eq!(config.percentage, "10");
        assert_eq!(config.min_distance, "50");

        let empty: MasterConfig = serde_json::from_str(r#"{"percentage": null}"#).unwrap();
        assert_eq!(empty, MasterConfig::default());
    }

    #[test]
    fn field_paths_match_backend_routes() {
        assert_eq!(
            ConfigField::Percentage.path("15"),
            "/master-data/config/percentage?percentage=15"
        );
        assert_eq!(
            ConfigField::MinDistance.path("50"),
            "/master-data/config/min-distance?minDistance=50"
        );
    }
}
