// Design catalog: human design names -> renderer asset ids, per product family.
// Keys are a versioned contract with stored replay logs. Never remap an existing key.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{ConfiguratorError, Result};

/// Design assigned to a position when nothing else was requested.
pub const DEFAULT_DESIGN: &str = "Ico";

/// Catalog namespace. `Pendant` holds single-unit designs, `System` multi-unit bases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Namespace {
    Pendant,
    System,
}

impl Namespace {
    /// Namespace a cable resolves its design in.
    pub fn for_cable(is_system: bool) -> Self {
        if is_system {
            Namespace::System
        } else {
            Namespace::Pendant
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Namespace::Pendant => "pendant",
            Namespace::System => "system",
        }
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A multi-unit system topology ("Prism", "Nexus", ...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemType {
    /// Renderer base geometry used for this topology.
    pub base_geometry: String,
}

/// Immutable mapping from design names to renderer asset identifiers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DesignCatalog {
    pendant: BTreeMap<String, String>,
    system: BTreeMap<String, String>,
    #[serde(default)]
    system_types: BTreeMap<String, SystemType>,
}

impl DesignCatalog {
    pub fn new(
        pendant: BTreeMap<String, String>,
        system: BTreeMap<String, String>,
        system_types: BTreeMap<String, SystemType>,
    ) -> Self {
        DesignCatalog {
            pendant,
            system,
            system_types,
        }
    }

    /// Load a catalog from JSON (`{"pendant": {...}, "system": {...}, "systemTypes": {...}}`).
    pub fn from_json(json: &str) -> Result<Self> {
        let catalog: DesignCatalog = serde_json::from_str(json)?;
        catalog.validate()?;
        Ok(catalog)
    }

    /// A usable catalog must carry [`DEFAULT_DESIGN`], since padding and resets fall back to it.
    pub fn validate(&self) -> Result<()> {
        if !self.pendant.contains_key(DEFAULT_DESIGN) {
            return Err(ConfiguratorError::InvalidConfig(format!(
                "catalog is missing the default pendant design '{}'",
                DEFAULT_DESIGN
            )));
        }
        Ok(())
    }

    fn table(&self, namespace: Namespace) -> &BTreeMap<String, String> {
        match namespace {
            Namespace::Pendant => &self.pendant,
            Namespace::System => &self.system,
        }
    }

    /// Resolve a design name to its renderer asset id.
    pub fn resolve(&self, namespace: Namespace, design: &str) -> Result<&str> {
        self.table(namespace)
            .get(design)
            .map(String::as_str)
            .ok_or_else(|| ConfiguratorError::DesignNotFound {
                namespace,
                design: design.to_string(),
            })
    }

    /// Asset id of [`DEFAULT_DESIGN`].
    pub fn default_design_id(&self) -> Result<&str> {
        self.resolve(Namespace::Pendant, DEFAULT_DESIGN)
    }

    pub fn contains(&self, namespace: Namespace, design: &str) -> bool {
        self.table(namespace).contains_key(design)
    }

    pub fn system_type(&self, name: &str) -> Result<&SystemType> {
        self.system_types
            .get(name)
            .ok_or_else(|| ConfiguratorError::UnknownSystemType(name.to_string()))
    }

    /// Design names and asset ids of a namespace, sorted by name.
    pub fn designs(&self, namespace: Namespace) -> impl Iterator<Item = (&str, &str)> {
        self.table(namespace)
            .iter()
            .map(|(name, id)| (name.as_str(), id.as_str()))
    }

    pub fn system_types(&self) -> impl Iterator<Item = (&str, &SystemType)> {
        self.system_types.iter().map(|(name, ty)| (name.as_str(), ty))
    }
}

impl Default for DesignCatalog {
    /// Built-in product line.
    fn default() -> Self {
        let pendant = [
            ("Amber", "product_0"),
            ("Bumble", "product_1"),
            ("Coral", "product_2"),
            ("Fina", "product_3"),
            ("Ico", "product_4"),
            ("Nest", "product_5"),
        ];
        let system = [
            ("Prism", "system_base_0"),
            ("Nexus", "system_base_1"),
            ("Halo", "system_base_2"),
        ];
        let system_types = [
            ("Prism", "prism_base"),
            ("Nexus", "nexus_base"),
            ("Halo", "halo_base"),
        ];

        DesignCatalog {
            pendant: pendant
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            system: system
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            system_types: system_types
                .iter()
                .map(|(k, base)| {
                    (
                        k.to_string(),
                        SystemType {
                            base_geometry: base.to_string(),
                        },
                    )
                })
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_lookup_keys_are_stable() {
        let catalog = DesignCatalog::default();
        assert_eq!(catalog.resolve(Namespace::Pendant, "Ico"), Ok("product_4"));
        assert_eq!(catalog.resolve(Namespace::Pendant, "Bumble"), Ok("product_1"));
        assert_eq!(catalog.resolve(Namespace::Pendant, "Fina"), Ok("product_3"));
        assert_eq!(catalog.resolve(Namespace::System, "Prism"), Ok("system_base_0"));
        assert_eq!(catalog.resolve(Namespace::System, "Nexus"), Ok("system_base_1"));
    }

    #[test]
    fn namespaces_are_disjoint() {
        let catalog = DesignCatalog::default();
        assert!(catalog.resolve(Namespace::System, "Ico").is_err());
        assert!(catalog.resolve(Namespace::Pendant, "Prism").is_err());
    }

    #[test]
    fn miss_names_key_and_namespace() {
        let catalog = DesignCatalog::default();
        let err = catalog.resolve(Namespace::Pendant, "Orbit").unwrap_err();
        assert_eq!(
            err,
            ConfiguratorError::DesignNotFound {
                namespace: Namespace::Pendant,
                design: "Orbit".to_string()
            }
        );
    }

    #[test]
    fn system_types_resolve() {
        let catalog = DesignCatalog::default();
        assert_eq!(catalog.system_type("Nexus").unwrap().base_geometry, "nexus_base");
        assert!(matches!(
            catalog.system_type("Tower"),
            Err(ConfiguratorError::UnknownSystemType(_))
        ));
    }

    #[test]
    fn catalog_from_json() {
        let json = r#"{
            "pendant": {"Ico": "product_4", "Drop": "product_9"},
            "system": {"Prism": "system_base_0"},
            "systemTypes": {"Prism": {"baseGeometry": "prism_base"}}
        }"#;
        let catalog = DesignCatalog::from_json(json).unwrap();
        assert_eq!(catalog.resolve(Namespace::Pendant, "Drop"), Ok("product_9"));
        assert_eq!(catalog.designs(Namespace::Pendant).count(), 2);
    }

    #[test]
    fn catalog_without_default_design_is_rejected() {
        let json = r#"{"pendant": {"Drop": "product_9"}, "system": {}}"#;
        assert!(matches!(
            DesignCatalog::from_json(json),
            Err(ConfiguratorError::InvalidConfig(_))
        ));
    }

    #[test]
    fn designs_are_sorted_by_name() {
        let catalog = DesignCatalog::default();
        let names: Vec<&str> = catalog.designs(Namespace::System).map(|(n, _)| n).collect();
        assert_eq!(names, vec!["Halo", "Nexus", "Prism"]);
    }
}
