// Configuration store. Every update is a pure transform returning a new value;
// the store only swaps in a result once it is fully built.

use tracing::debug;

use crate::cables::generate_cables;
use crate::catalog::DesignCatalog;
use crate::error::{ConfiguratorError, Result};
use crate::types::{
    CableAssignment, CablePatch, ConfigPatch, Configuration, ConfiguratorOptions,
    DesignSelection, LightType,
};

/// Shallow-merge `patch` into `config`. Cables are only replaced when the patch carries them.
pub fn update_config(config: &Configuration, patch: &ConfigPatch) -> Configuration {
    let mut next = config.clone();
    if let Some(light_type) = patch.light_type {
        next.light_type = light_type;
    }
    if let Some(light_amount) = patch.light_amount {
        next.light_amount = light_amount;
    }
    if let Some(base_type) = &patch.base_type {
        next.base_type = base_type.clone();
    }
    if let Some(base_color) = &patch.base_color {
        next.base_color = base_color.clone();
    }
    if let Some(cable_color) = patch.cable_color {
        next.cable_color = cable_color;
    }
    if let Some(cable_length) = patch.cable_length {
        next.cable_length = cable_length;
    }
    if let Some(cables) = &patch.cables {
        next.cables = cables.clone();
    }
    next
}

/// Shallow-merge `changes` into the cable at `index`; every other position is untouched.
///
/// Does not resolve `design_id`. Use [`assign_design`] to keep it consistent.
pub fn update_cable(
    config: &Configuration,
    index: usize,
    changes: &CablePatch,
) -> Result<Configuration> {
    let len = config.cables.len();
    let mut next = config.clone();
    let cable = next
        .cables
        .get_mut(index)
        .ok_or(ConfiguratorError::CableIndexOutOfRange { index, len })?;

    if let Some(is_system) = changes.is_system {
        cable.is_system = is_system;
    }
    if let Some(design) = &changes.design {
        cable.design = design.clone();
    }
    if let Some(design_id) = &changes.design_id {
        cable.design_id = design_id.clone();
    }
    if let Some(system_type) = &changes.system_type {
        cable.system_type = system_type.clone();
    }
    Ok(next)
}

/// Put `design` at `index`, resolving its asset id. A `system_type` makes it a system base.
pub fn assign_design(
    config: &Configuration,
    index: usize,
    catalog: &DesignCatalog,
    design: &str,
    system_type: Option<&str>,
) -> Result<Configuration> {
    let cable = match system_type {
        Some(system_type) => CableAssignment::system(catalog, design, system_type)?,
        None => CableAssignment::pendant(catalog, design)?,
    };
    update_cable(
        config,
        index,
        &CablePatch {
            is_system: Some(cable.is_system),
            design: Some(cable.design),
            design_id: Some(cable.design_id),
            system_type: Some(cable.system_type),
        },
    )
}

/// Rebuild the cable list for the current type and amount, keeping pendant designs in place.
pub fn regenerate_cables(config: &Configuration, catalog: &DesignCatalog) -> Result<Configuration> {
    // System bases have no pendant equivalent; those positions fall back to the default.
    let designs: Vec<DesignSelection> = config
        .cables
        .iter()
        .map(|cable| {
            if cable.is_system {
                DesignSelection::default()
            } else {
                DesignSelection::from(cable)
            }
        })
        .collect();

    let mut next = config.clone();
    next.cables = generate_cables(config.light_type, config.light_amount, &designs, catalog)?;
    Ok(next)
}

/// Switch light type, adopting its conventional amount, and rebuild cables.
pub fn change_light_type(
    config: &Configuration,
    light_type: LightType,
    catalog: &DesignCatalog,
) -> Result<Configuration> {
    let patch = ConfigPatch {
        light_type: Some(light_type),
        light_amount: Some(light_type.default_amount().unwrap_or(config.light_amount)),
        ..ConfigPatch::default()
    };
    regenerate_cables(&update_config(config, &patch), catalog)
}

/// Set the cable count and rebuild cables.
pub fn change_light_amount(
    config: &Configuration,
    light_amount: u32,
    catalog: &DesignCatalog,
) -> Result<Configuration> {
    let patch = ConfigPatch {
        light_amount: Some(light_amount),
        ..ConfigPatch::default()
    };
    regenerate_cables(&update_config(config, &patch), catalog)
}

/// Outcome of [`ConfigStore::apply`].
#[derive(Debug, Clone)]
pub struct Change {
    pub previous: Configuration,
    pub cables_regenerated: bool,
}

/// Holds the current configuration and the catalog it is validated against.
#[derive(Debug, Clone)]
pub struct ConfigStore {
    catalog: DesignCatalog,
    current: Configuration,
}

impl ConfigStore {
    pub fn new(catalog: DesignCatalog, initial: Configuration) -> Result<Self> {
        catalog.validate()?;
        initial.validate(&catalog)?;
        Ok(ConfigStore {
            catalog,
            current: initial,
        })
    }

    pub fn from_options(options: ConfiguratorOptions) -> Result<Self> {
        match options.initial {
            Some(initial) => Self::new(options.catalog, initial),
            None => Self::with_catalog(options.catalog),
        }
    }

    /// Store with the default state for `catalog`.
    pub fn with_catalog(catalog: DesignCatalog) -> Result<Self> {
        catalog.validate()?;
        let initial = Configuration::with_catalog(&catalog)?;
        Self::new(catalog, initial)
    }

    pub fn current(&self) -> &Configuration {
        &self.current
    }

    pub fn catalog(&self) -> &DesignCatalog {
        &self.catalog
    }

    /// Merge a patch. A light type without an amount brings its conventional amount.
    /// When light type or amount moves without cables supplied, the cable list is
    /// regenerated. The result must validate before it replaces the current value.
    pub fn apply(&mut self, patch: &ConfigPatch) -> Result<Change> {
        let mut patch = patch.clone();
        if let (Some(light_type), None) = (patch.light_type, patch.light_amount) {
            patch.light_amount = light_type.default_amount();
        }
        let merged = update_config(&self.current, &patch);
        let regenerate = patch.touches_topology() && patch.cables.is_none();
        let next = if regenerate {
            regenerate_cables(&merged, &self.catalog)?
        } else {
            merged
        };
        self.commit(next, regenerate)
    }

    pub fn set_light_type(&mut self, light_type: LightType) -> Result<Change> {
        let next = change_light_type(&self.current, light_type, &self.catalog)?;
        self.commit(next, true)
    }

    pub fn set_light_amount(&mut self, light_amount: u32) -> Result<Change> {
        let next = change_light_amount(&self.current, light_amount, &self.catalog)?;
        self.commit(next, true)
    }

    pub fn assign_design(
        &mut self,
        index: usize,
        design: &str,
        system_type: Option<&str>,
    ) -> Result<Change> {
        let next = assign_design(&self.current, index, &self.catalog, design, system_type)?;
        self.commit(next, false)
    }

    fn commit(&mut self, next: Configuration, cables_regenerated: bool) -> Result<Change> {
        next.validate(&self.catalog)?;
        debug!(
            light_type = next.light_type.as_str(),
            light_amount = next.light_amount,
            cables_regenerated,
            "configuration updated"
        );
        let previous = std::mem::replace(&mut self.current, next);
        Ok(Change {
            previous,
            cables_regenerated,
        })
    }
}
