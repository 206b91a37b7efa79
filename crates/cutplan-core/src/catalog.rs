use serde::{Deserialize, Serialize};

/// Catalog entry for an extruded profile
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileInfo {
    pub code: String,
    #[serde(default)]
    pub description: String,
    /// Default stock bar length for this profile
    pub max_length: f64,
}

/// Read-only lookup of profile codes.
///
/// The optimizer consults it for the output description and for the stock
/// length of any request that does not carry one.
pub trait ProfileCatalog {
    fn lookup(&self, code: &str) -> Option<ProfileInfo>;
}

impl<T: ProfileCatalog + ?Sized> ProfileCatalog for &T {
    fn lookup(&self, code: &str) -> Option<ProfileInfo> {
        (**self).lookup(code)
    }
}

/// In-memory catalog, typically shipped inside the request document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StaticCatalog {
    profiles: Vec<ProfileInfo>,
}

impl StaticCatalog {
    pub fn new(profiles: Vec<ProfileInfo>) -> Self {
        Self { profiles }
    }

    /// Adds an entry, replacing any existing one with the same code.
    pub fn insert(&mut self, info: ProfileInfo) {
        match self.profiles.iter_mut().find(|p| p.code == info.code) {
            Some(existing) => *existing = info,
            None => self.profiles.push(info),
        }
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }
}

impl ProfileCatalog for StaticCatalog {
    fn lookup(&self, code: &str) -> Option<ProfileInfo> {
        self.profiles.iter().find(|p| p.code == code).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_replaces_existing_code() {
        let mut catalog = StaticCatalog::default();
        catalog.insert(ProfileInfo {
            code: "P40".into(),
            description: "40x40".into(),
            max_length: 6000.0,
        });
        catalog.insert(ProfileInfo {
            code: "P40".into(),
            description: "40x40 anodised".into(),
            max_length: 6500.0,
        });

        assert_eq!(catalog.len(), 1);
        let info = catalog.lookup("P40").unwrap();
        assert_eq!(info.max_length, 6500.0);
        assert_eq!(info.description, "40x40 anodised");
        assert!(catalog.lookup("P50").is_none());
    }

    #[test]
    fn deserializes_from_plain_list() {
        let catalog: StaticCatalog = serde_json::from_str(
            r#"[{"code": "T60", "description": "Tube 60", "max_length": 7000}]"#,
        )
        .unwrap();

        assert_eq!(catalog.lookup("T60").unwrap().max_length, 7000.0);
    }
}
