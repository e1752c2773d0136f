//! Staff directory entries (the `users` worksheet).

use strum::{Display, EnumString};

/// Access role stored in the sheet. Unknown values round-trip through
/// `Other` so a typo in the sheet locks one user out, not the parser.
#[derive(Debug, Clone, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum Role {
    Admin,
    Housekeeper,
    Technician,
    #[strum(default)]
    Other(String),
}

impl Role {
    pub const KNOWN: [&'static str; 3] = ["admin", "housekeeper", "technician"];

    pub fn is_known(&self) -> bool {
        !matches!(self, Self::Other(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub telegram_id: i64,
    pub name: String,
    pub role: Role,
}

impl User {
    /// Parses a worksheet row: `telegram_id | name | role`.
    /// Returns `None` for rows without a numeric id.
    pub fn from_row(row: &[String]) -> Option<Self> {
        let telegram_id = row.first()?.trim().parse::<i64>().ok()?;
        let name = row.get(1).map(|s| s.trim().to_string()).unwrap_or_default();
        let role = row
            .get(2)
            .map(|s| s.trim().to_lowercase())
            .unwrap_or_default()
            .parse::<Role>()
            .unwrap_or(Role::Other(String::new()));
        Some(Self { telegram_id, name, role })
    }

    pub fn to_row(&self) -> Vec<String> {
        vec![self.telegram_id.to_string(), self.name.clone(), self.role.to_string()]
    }
}
