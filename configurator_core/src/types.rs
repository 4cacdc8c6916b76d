// Strong typing over strings. Closed option sets are enums; patches are typed records.
// Serde names follow the page's camelCase so JSON crosses the JS boundary unchanged.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::catalog::{DesignCatalog, Namespace, DEFAULT_DESIGN};
use crate::error::{ConfiguratorError, Result};

/// Largest cable count a single fixture can carry.
pub const MAX_LIGHT_AMOUNT: u32 = 64;

/// Reject amounts outside `1..=MAX_LIGHT_AMOUNT`.
pub fn check_light_amount(light_amount: u32) -> Result<()> {
    if light_amount == 0 {
        return Err(ConfiguratorError::InvalidConfig(
            "lightAmount must be positive".to_string(),
        ));
    }
    if light_amount > MAX_LIGHT_AMOUNT {
        return Err(ConfiguratorError::InvalidConfig(format!(
            "lightAmount {} exceeds the maximum of {}",
            light_amount, MAX_LIGHT_AMOUNT
        )));
    }
    Ok(())
}

/// Fixture mounting. Determines the conventional cable count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LightType {
    Wall,
    Ceiling,
    Floor,
}

impl LightType {
    /// Conventional cable count. `None` for ceiling, where the user picks the amount.
    pub fn default_amount(&self) -> Option<u32> {
        match self {
            LightType::Wall => Some(1),
            LightType::Ceiling => None,
            LightType::Floor => Some(3),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LightType::Wall => "wall",
            LightType::Ceiling => "ceiling",
            LightType::Floor => "floor",
        }
    }
}

impl FromStr for LightType {
    type Err = ConfiguratorError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "wall" => Ok(LightType::Wall),
            "ceiling" => Ok(LightType::Ceiling),
            "floor" => Ok(LightType::Floor),
            other => Err(ConfiguratorError::InvalidConfig(format!(
                "unknown light type '{}'",
                other
            ))),
        }
    }
}

/// Cable sheath color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CableColor {
    Black,
    White,
}

impl CableColor {
    pub fn as_str(&self) -> &'static str {
        match self {
            CableColor::Black => "black",
            CableColor::White => "white",
        }
    }
}

/// Symbolic cable length tier. Not literal millimeters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CableLength {
    #[serde(rename = "2mm")]
    Short,
    #[serde(rename = "3mm")]
    Medium,
    #[serde(rename = "5mm")]
    Long,
}

impl CableLength {
    pub fn as_str(&self) -> &'static str {
        match self {
            CableLength::Short => "2mm",
            CableLength::Medium => "3mm",
            CableLength::Long => "5mm",
        }
    }
}

/// One physical drop position and what hangs from it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CableAssignment {
    pub is_system: bool,
    pub design: String,
    /// Cached catalog lookup of `design`. Must never drift from it.
    pub design_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_type: Option<String>,
}

impl CableAssignment {
    /// Single pendant with its asset id resolved from the catalog.
    pub fn pendant(catalog: &DesignCatalog, design: &str) -> Result<Self> {
        Ok(CableAssignment {
            is_system: false,
            design: design.to_string(),
            design_id: catalog.resolve(Namespace::Pendant, design)?.to_string(),
            system_type: None,
        })
    }

    /// Multi-unit system base of the given topology.
    pub fn system(catalog: &DesignCatalog, design: &str, system_type: &str) -> Result<Self> {
        catalog.system_type(system_type)?;
        Ok(CableAssignment {
            is_system: true,
            design: design.to_string(),
            design_id: catalog.resolve(Namespace::System, design)?.to_string(),
            system_type: Some(system_type.to_string()),
        })
    }

    pub fn namespace(&self) -> Namespace {
        Namespace::for_cable(self.is_system)
    }

    /// Check `design_id` and `system_type` against the catalog.
    pub fn validate(&self, catalog: &DesignCatalog) -> Result<()> {
        let expected = catalog.resolve(self.namespace(), &self.design)?;
        if expected != self.design_id {
            return Err(ConfiguratorError::InvalidConfig(format!(
                "designId '{}' does not match {} design '{}' ({})",
                self.design_id,
                self.namespace(),
                self.design,
                expected
            )));
        }
        match (&self.system_type, self.is_system) {
            (Some(system_type), true) => {
                catalog.system_type(system_type)?;
            }
            (None, true) => {
                return Err(ConfiguratorError::InvalidConfig(format!(
                    "system cable '{}' has no systemType",
                    self.design
                )))
            }
            (Some(system_type), false) => {
                return Err(ConfiguratorError::InvalidConfig(format!(
                    "pendant cable '{}' carries systemType '{}'",
                    self.design, system_type
                )))
            }
            (None, false) => {}
        }
        Ok(())
    }
}

/// Full configurator state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Configuration {
    pub light_type: LightType,
    pub light_amount: u32,
    pub base_type: String,
    pub base_color: String,
    pub cable_color: CableColor,
    pub cable_length: CableLength,
    #[serde(default)]
    pub cables: Vec<CableAssignment>,
}

impl Configuration {
    /// State at configurator mount.
    pub fn with_catalog(catalog: &DesignCatalog) -> Result<Self> {
        Ok(Configuration {
            light_type: LightType::Wall,
            light_amount: 1,
            base_type: "round".to_string(),
            base_color: "black".to_string(),
            cable_color: CableColor::Black,
            cable_length: CableLength::Short,
            cables: vec![CableAssignment::pendant(catalog, DEFAULT_DESIGN)?],
        })
    }

    /// Check every invariant against the catalog.
    pub fn validate(&self, catalog: &DesignCatalog) -> Result<()> {
        check_light_amount(self.light_amount)?;
        if self.base_type.is_empty() {
            return Err(ConfiguratorError::InvalidConfig("baseType is empty".to_string()));
        }
        if self.base_color.is_empty() {
            return Err(ConfiguratorError::InvalidConfig("baseColor is empty".to_string()));
        }
        if self.cables.len() != self.light_amount as usize {
            return Err(ConfiguratorError::InvalidConfig(format!(
                "{} cables for lightAmount {}",
                self.cables.len(),
                self.light_amount
            )));
        }
        self.cables.iter().try_for_each(|cable| cable.validate(catalog))
    }
}

/// Configurator options passed from JS.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ConfiguratorOptions {
    /// Catalog override. Defaults to the built-in product line.
    pub catalog: DesignCatalog,
    /// Starting state. Defaults to [`Configuration::with_catalog`].
    pub initial: Option<Configuration>,
}

impl ConfiguratorOptions {
    /// Parse options. An empty string means defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        if json.trim().is_empty() {
            return Ok(ConfiguratorOptions::default());
        }
        let options: ConfiguratorOptions = serde_json::from_str(json)?;
        options.catalog.validate()?;
        Ok(options)
    }
}

/// Partial update for [`Configuration`]. Absent fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct ConfigPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub light_type: Option<LightType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub light_amount: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cable_color: Option<CableColor>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cable_length: Option<CableLength>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cables: Option<Vec<CableAssignment>>,
}

impl ConfigPatch {
    /// Whether this patch changes the cable count drivers.
    pub fn touches_topology(&self) -> bool {
        self.light_type.is_some() || self.light_amount.is_some()
    }
}

/// Partial update for one [`CableAssignment`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct CablePatch {
    pub is_system: Option<bool>,
    pub design: Option<String>,
    pub design_id: Option<String>,
    /// `Some(None)` clears the system type.
    #[serde(with = "double_option")]
    pub system_type: Option<Option<String>>,
}

/// Requested design for one position when (re)generating cables.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DesignSelection {
    pub design: Option<String>,
    pub design_id: Option<String>,
}

impl DesignSelection {
    pub fn named(design: &str) -> Self {
        DesignSelection {
            design: Some(design.to_string()),
            design_id: None,
        }
    }
}

impl From<&CableAssignment> for DesignSelection {
    fn from(cable: &CableAssignment) -> Self {
        DesignSelection {
            design: Some(cable.design.clone()),
            design_id: Some(cable.design_id.clone()),
        }
    }
}

// Distinguishes an absent key from an explicit `null`.
mod double_option {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S>(value: &Option<Option<String>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(inner) => inner.serialize(serializer),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Option<String>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Option::<String>::deserialize(deserializer).map(Some)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_amounts_per_light_type() {
        assert_eq!(LightType::Wall.default_amount(), Some(1));
        assert_eq!(LightType::Floor.default_amount(), Some(3));
        assert_eq!(LightType::Ceiling.default_amount(), None);
    }

    #[test]
    fn configuration_json_uses_page_names() {
        let catalog = DesignCatalog::default();
        let config = Configuration::with_catalog(&catalog).unwrap();
        let json = serde_json::to_value(&config).unwrap();
        assert_eq!(json["lightType"], "wall");
        assert_eq!(json["cableLength"], "2mm");
        assert_eq!(json["cables"][0]["designId"], "product_4");
        assert!(json["cables"][0].get("systemType").is_none());
    }

    #[test]
    fn default_configuration_is_valid() {
        let catalog = DesignCatalog::default();
        let config = Configuration::with_catalog(&catalog).unwrap();
        assert!(config.validate(&catalog).is_ok());
    }

    #[test]
    fn drifted_design_id_is_invalid() {
        let catalog = DesignCatalog::default();
        let mut config = Configuration::with_catalog(&catalog).unwrap();
        config.cables[0].design_id = "product_1".to_string();
        assert!(matches!(
            config.validate(&catalog),
            Err(ConfiguratorError::InvalidConfig(_))
        ));
    }

    #[test]
    fn cable_count_mismatch_is_invalid() {
        let catalog = DesignCatalog::default();
        let mut config = Configuration::with_catalog(&catalog).unwrap();
        config.light_amount = 2;
        assert!(config.validate(&catalog).is_err());
    }

    #[test]
    fn light_amount_is_bounded() {
        assert!(check_light_amount(1).is_ok());
        assert!(check_light_amount(MAX_LIGHT_AMOUNT).is_ok());
        assert!(check_light_amount(0).is_err());
        assert!(matches!(
            check_light_amount(MAX_LIGHT_AMOUNT + 1),
            Err(ConfiguratorError::InvalidConfig(_))
        ));

        let catalog = DesignCatalog::default();
        let mut config = Configuration::with_catalog(&catalog).unwrap();
        config.light_amount = u32::MAX;
        assert!(config.validate(&catalog).is_err());
    }

    #[test]
    fn system_cable_requires_known_system_type() {
        let catalog = DesignCatalog::default();
        let cable = CableAssignment::system(&catalog, "Nexus", "Nexus").unwrap();
        assert!(cable.validate(&catalog).is_ok());

        let mut orphan = cable.clone();
        orphan.system_type = None;
        assert!(orphan.validate(&catalog).is_err());

        assert!(matches!(
            CableAssignment::system(&catalog, "Nexus", "Tower"),
            Err(ConfiguratorError::UnknownSystemType(_))
        ));
    }

    #[test]
    fn light_type_from_wire_name() {
        assert_eq!("floor".parse::<LightType>(), Ok(LightType::Floor));
        assert!("attic".parse::<LightType>().is_err());
    }

    #[test]
    fn options_default_when_empty() {
        let options = ConfiguratorOptions::from_json("").unwrap();
        assert!(options.initial.is_none());
        assert_eq!(options.catalog, DesignCatalog::default());

        let options = ConfiguratorOptions::from_json(r#"{"initial": null}"#).unwrap();
        assert!(options.initial.is_none());
    }

    #[test]
    fn options_catalog_must_carry_default_design() {
        let json = r#"{"catalog": {"pendant": {"Drop": "product_9"}, "system": {}}}"#;
        match ConfiguratorOptions::from_json(json) {
            Err(ConfiguratorError::InvalidConfig(msg)) => assert!(msg.contains(DEFAULT_DESIGN)),
            other => panic!("expected InvalidConfig, got {:?}", other),
        }
    }

    #[test]
    fn patch_rejects_unknown_keys() {
        let result: std::result::Result<ConfigPatch, _> =
            serde_json::from_str(r#"{"cableColour": "white"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn cable_patch_distinguishes_null_from_absent() {
        let absent: CablePatch = serde_json::from_str(r#"{"design": "Fina"}"#).unwrap();
        assert_eq!(absent.system_type, None);

        let cleared: CablePatch = serde_json::from_str(r#"{"systemType": null}"#).unwrap();
        assert_eq!(cleared.system_type, Some(None));
    }
}
