use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Rol del usuario. La comparación ignora mayúsculas, `_` y `-`
/// (el backend mezcla "superadmin" y "SUPER_ADMIN").
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Role {
    #[default]
    User,
    Admin,
    SuperAdmin,
}

impl Role {
    /// Parseo normalizado; valores desconocidos caen en `User` (mínimo privilegio)
    pub fn parse(raw: &str) -> Self {
        let normalized: String = raw
            .chars()
            .filter(|c| !matches!(c, '_' | '-' | ' '))
            .flat_map(char::to_lowercase)
            .collect();
        let normalized = normalized.strip_prefix("role").unwrap_or(&normalized);
        match normalized {
            "superadmin" => Role::SuperAdmin,
            "admin" => Role::Admin,
            _ => Role::User,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Admin => "admin",
            Role::SuperAdmin => "superadmin",
        }
    }

    /// Solo superadmin ve la configuración maestra
    pub fn can_manage_settings(&self) -> bool {
        *self == Role::SuperAdmin
    }

    pub fn can_manage_inventory(&self) -> bool {
        *self >= Role::Admin
    }
}

impl Serialize for Role {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Role {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(Role::parse(&raw))
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

/// Perfil persistido bajo la clave `userData`
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub uid: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub role: Role,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_expiry: Option<DateTime<Utc>>,
}

/// Sesión activa: identidad + token
#[derive(Clone, Debug, PartialEq)]
pub struct Session {
    pub user_id: String,
    pub email: String,
    pub display_name: Option<String>,
    pub role: Role,
    pub token: String,
    pub token_expiry: Option<DateTime<Utc>>,
}

impl Session {
    pub fn from_parts(token: String, profile: UserProfile) -> Self {
        Self {
            user_id: profile.uid,
            email: profile.email,
            display_name: profile.display_name,
            role: profile.role,
            token,
            token_expiry: profile.token_expiry,
        }
    }

    pub fn profile(&self) -> UserProfile {
        UserProfile {
            uid: self.user_id.clone(),
            email: self.email.clone(),
            display_name: self.display_name.clone(),
            role: self.role,
            token_expiry: self.token_expiry,
        }
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.token_expiry.map(|exp| exp <= now).unwrap_or(false)
    }

    /// Nombre para la barra de navegación
    pub fn label(&self) -> String {
        let name = self.display_name.as_deref().filter(|n| !n.is_empty()).unwrap_or(&self.email);
        format!("{} ({})", name, self.role.as_str())
    }
}

/// Usuario devuelto por el proveedor de identidad
#[derive(Clone, Debug, PartialEq)]
pub struct IdentityUser {
    pub uid: String,
    pub email: String,
    pub display_name: Option<String>,
    pub token: String,
    pub token_expiry: Option<DateTime<Utc>>,
}
