use crate::assembly::AssemblyError;
use eyre::eyre;
use log::debug;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A named field of a problem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldInfo {
    pub name: String,
    pub id: usize,
    pub num_components: usize,
    /// Polynomial order of the Lagrange space.
    pub order: usize,
    /// Mesh region the field is restricted to, `None` for the whole domain.
    pub block: Option<String>,
    pub component_names: Vec<String>,
}

impl FieldInfo {
    fn new(id: usize, name: &str, num_components: usize, order: usize, block: Option<&str>) -> Self {
        let component_names = if num_components > 1 {
            (0..num_components).map(|c| c.to_string()).collect()
        } else {
            Vec::new()
        };
        Self {
            name: name.to_string(),
            id,
            num_components,
            order,
            block: block.map(str::to_string),
            component_names,
        }
    }
}

/// Registry of fields keyed by id.
///
/// Fields are numbered in the discretization by increasing id, see [`Fields::index_of`].
#[derive(Debug, Clone, Default)]
pub struct Fields {
    infos: BTreeMap<usize, FieldInfo>,
    ids: FxHashMap<String, usize>,
}

impl Fields {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a field, failing if `id` is taken.
    pub fn add(&mut self, id: usize, name: &str, num_components: usize, order: usize) -> eyre::Result<()> {
        if self.infos.contains_key(&id) {
            return Err(AssemblyError::FieldIdExists {
                name: name.to_string(),
                id,
            }
            .into());
        }
        self.set(id, name, num_components, order)
    }

    /// Adds a field or replaces the field with the same `id`.
    pub fn set(&mut self, id: usize, name: &str, num_components: usize, order: usize) -> eyre::Result<()> {
        self.insert(FieldInfo::new(id, name, num_components, order, None))
    }

    /// Adds a field restricted to the cells of `block`.
    pub fn add_restricted(
        &mut self,
        id: usize,
        name: &str,
        num_components: usize,
        order: usize,
        block: &str,
    ) -> eyre::Result<()> {
        if self.infos.contains_key(&id) {
            return Err(AssemblyError::FieldIdExists {
                name: name.to_string(),
                id,
            }
            .into());
        }
        self.insert(FieldInfo::new(id, name, num_components, order, Some(block)))
    }

    fn insert(&mut self, info: FieldInfo) -> eyre::Result<()> {
        if info.order != 1 {
            return Err(eyre!(
                "Field '{}' requests order {}, only first order Lagrange spaces are supported.",
                info.name,
                info.order
            ));
        }
        if info.num_components == 0 {
            return Err(eyre!("Field '{}' must have at least one component.", info.name));
        }
        debug!(
            "Field '{}' with ID = {} ({} components, order {})",
            info.name, info.id, info.num_components, info.order
        );
        if let Some(old) = self.infos.get(&info.id) {
            self.ids.remove(&old.name);
        }
        self.ids.insert(info.name.clone(), info.id);
        self.infos.insert(info.id, info);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.infos.len()
    }

    pub fn is_empty(&self) -> bool {
        self.infos.is_empty()
    }

    pub fn get(&self, id: usize) -> Result<&FieldInfo, AssemblyError> {
        self.infos.get(&id).ok_or(AssemblyError::UnknownFieldId(id))
    }

    fn get_mut(&mut self, id: usize) -> Result<&mut FieldInfo, AssemblyError> {
        self.infos.get_mut(&id).ok_or(AssemblyError::UnknownFieldId(id))
    }

    pub fn id(&self, name: &str) -> Result<usize, AssemblyError> {
        self.ids
            .get(name)
            .copied()
            .ok_or_else(|| AssemblyError::UnknownField(name.to_string()))
    }

    pub fn has_id(&self, id: usize) -> bool {
        self.infos.contains_key(&id)
    }

    pub fn has_name(&self, name: &str) -> bool {
        self.ids.contains_key(name)
    }

    /// Position of field `id` in the discretization.
    pub fn index_of(&self, id: usize) -> Result<usize, AssemblyError> {
        self.infos
            .keys()
            .position(|&k| k == id)
            .ok_or(AssemblyError::UnknownFieldId(id))
    }

    /// Fields ordered by id, which is their order in the discretization.
    pub fn iter(&self) -> impl Iterator<Item = &FieldInfo> {
        self.infos.values()
    }

    pub fn names(&self) -> Vec<String> {
        self.iter().map(|info| info.name.clone()).collect()
    }

    /// Name of component `component` of field `id`, empty for single-component fields.
    pub fn component_name(&self, id: usize, component: usize) -> eyre::Result<&str> {
        let info = self.get(id)?;
        if info.num_components == 1 {
            return Ok("");
        }
        info.component_names
            .get(component)
            .map(String::as_str)
            .ok_or_else(|| eyre!("Field '{}' has no component {}.", info.name, component))
    }

    pub fn set_component_name(&mut self, id: usize, component: usize, name: &str) -> eyre::Result<()> {
        let info = self.get_mut(id)?;
        if info.num_components == 1 {
            return Err(eyre!(
                "Unable to set component name for single-component field '{}'.",
                info.name
            ));
        }
        match info.component_names.get_mut(component) {
            Some(slot) => {
                *slot = name.to_string();
                Ok(())
            }
            None => Err(eyre!("Field '{}' has no component {}.", info.name, component)),
        }
    }
}
