use crate::assembly::AssemblyData;
use crate::dependency::{DependencyError, DependencyGraph};
use crate::functional::ValueFunctional;
use log::debug;
use rustc_hash::FxHashMap;
use std::any::{type_name, Any};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::marker::PhantomData;

/// Identity of a registered functional, used as the node type of the dependency graph.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FunctionalId(usize);

impl FunctionalId {
    pub fn index(&self) -> usize {
        self.0
    }
}

/// Typed reference to a value slot in a [`ValueStore`].
pub struct ValueHandle<V> {
    index: usize,
    marker: PhantomData<fn() -> V>,
}

impl<V> Clone for ValueHandle<V> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<V> Copy for ValueHandle<V> {}

impl<V> fmt::Debug for ValueHandle<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ValueHandle<{}>({})", type_name::<V>(), self.index)
    }
}

struct ValueSlot {
    name: String,
    value: Box<dyn Any>,
    declared: bool,
    /// Set from outside the functionals; never has a supplier.
    parameter: bool,
}

/// Storage for the named intermediate values exchanged between functionals.
///
/// Slots are created when a value is first declared or requested, and are reused for every
/// evaluation afterwards.
#[derive(Default)]
pub struct ValueStore {
    slots: Vec<ValueSlot>,
    by_name: FxHashMap<String, usize>,
}

impl fmt::Debug for ValueStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.slots.iter().map(|slot| (&slot.name, slot.declared)))
            .finish()
    }
}

impl ValueStore {
    fn slot_for<V: Default + 'static>(&mut self, name: &str) -> Result<usize, DependencyError> {
        if let Some(&index) = self.by_name.get(name) {
            if !self.slots[index].value.is::<V>() {
                return Err(DependencyError::ValueTypeMismatch(name.to_string()));
            }
            Ok(index)
        } else {
            let index = self.slots.len();
            self.slots.push(ValueSlot {
                name: name.to_string(),
                value: Box::new(V::default()),
                declared: false,
                parameter: false,
            });
            self.by_name.insert(name.to_string(), index);
            Ok(index)
        }
    }

    /// Declares the value `name`, making the caller its supplier.
    pub fn declare<V: Default + 'static>(&mut self, name: &str) -> Result<ValueHandle<V>, DependencyError> {
        let index = self.slot_for::<V>(name)?;
        let slot = &mut self.slots[index];
        if slot.declared {
            return Err(DependencyError::ValueAlreadyDeclared(name.to_string()));
        }
        slot.declared = true;
        Ok(ValueHandle {
            index,
            marker: PhantomData,
        })
    }

    /// Declares `name` as a parameter: a value set by the caller rather than by a functional.
    pub fn declare_parameter<V: Default + 'static>(&mut self, name: &str) -> Result<ValueHandle<V>, DependencyError> {
        let handle = self.declare(name)?;
        self.slots[handle.index].parameter = true;
        Ok(handle)
    }

    /// Looks up the value `name`.
    ///
    /// If nobody has declared the value yet, an undeclared slot holding `V::default()` is created
    /// so that consumers may be set up before their suppliers.
    pub fn lookup<V: Default + 'static>(&mut self, name: &str) -> Result<ValueHandle<V>, DependencyError> {
        let index = self.slot_for::<V>(name)?;
        Ok(ValueHandle {
            index,
            marker: PhantomData,
        })
    }

    pub fn is_declared(&self, name: &str) -> bool {
        self.by_name
            .get(name)
            .map(|&index| self.slots[index].declared)
            .unwrap_or(false)
    }

    pub fn is_parameter(&self, name: &str) -> bool {
        self.by_name
            .get(name)
            .map(|&index| self.slots[index].parameter)
            .unwrap_or(false)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    /// Names of values that were requested but never declared.
    pub fn undeclared(&self) -> impl Iterator<Item = &str> {
        self.slots
            .iter()
            .filter(|slot| !slot.declared)
            .map(|slot| slot.name.as_str())
    }

    pub fn get<V: 'static>(&self, handle: ValueHandle<V>) -> &V {
        self.slots[handle.index]
            .value
            .downcast_ref()
            .expect("handle type is checked when the handle is created")
    }

    pub fn get_mut<V: 'static>(&mut self, handle: ValueHandle<V>) -> &mut V {
        self.slots[handle.index]
            .value
            .downcast_mut()
            .expect("handle type is checked when the handle is created")
    }

    pub fn set<V: 'static>(&mut self, handle: ValueHandle<V>, value: V) {
        *self.get_mut(handle) = value;
    }
}

/// Bookkeeping for one registered functional.
#[derive(Debug, Clone, Default)]
pub struct FunctionalInfo {
    pub name: String,
    pub region: String,
    pub provides: BTreeSet<String>,
    pub depends_on: BTreeSet<String>,
}

/// Owns the value storage and the value-providing functionals, and derives the order in which
/// they must run.
///
/// Integrand functionals (residual and Jacobian statements) are registered here as well so that
/// their dependencies are known, but their evaluators live in the weak form.
pub struct DependencyEvaluator<T> {
    values: ValueStore,
    infos: Vec<FunctionalInfo>,
    evaluators: Vec<Option<Box<dyn ValueFunctional<T>>>>,
    functionals_by_name: BTreeMap<String, FunctionalId>,
}

impl<T> Default for DependencyEvaluator<T> {
    fn default() -> Self {
        Self {
            values: ValueStore::default(),
            infos: Vec::new(),
            evaluators: Vec::new(),
            functionals_by_name: BTreeMap::new(),
        }
    }
}

impl<T> fmt::Debug for DependencyEvaluator<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DependencyEvaluator")
            .field("values", &self.values)
            .field("functionals", &self.infos)
            .finish()
    }
}

impl<T> DependencyEvaluator<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn declare_value<V: Default + 'static>(&mut self, name: &str) -> Result<ValueHandle<V>, DependencyError> {
        self.values.declare(name)
    }

    pub fn get_value<V: Default + 'static>(&mut self, name: &str) -> Result<ValueHandle<V>, DependencyError> {
        self.values.lookup(name)
    }

    pub fn declare_parameter<V: Default + 'static>(&mut self, name: &str) -> Result<ValueHandle<V>, DependencyError> {
        self.values.declare_parameter(name)
    }

    pub fn set_parameter<V: 'static>(&mut self, handle: ValueHandle<V>, value: V) {
        self.values.set(handle, value);
    }

    pub fn values(&self) -> &ValueStore {
        &self.values
    }

    pub(crate) fn values_mut(&mut self) -> &mut ValueStore {
        &mut self.values
    }

    /// Registers a value-providing functional under `info.name`.
    pub fn add_functional(
        &mut self,
        info: FunctionalInfo,
        functional: Box<dyn ValueFunctional<T>>,
    ) -> Result<FunctionalId, DependencyError> {
        if self.functionals_by_name.contains_key(&info.name) {
            return Err(DependencyError::FunctionalExists(info.name));
        }
        let id = self.push(info, Some(functional));
        self.functionals_by_name
            .insert(self.infos[id.0].name.clone(), id);
        Ok(id)
    }

    /// Registers an integrand so that its dependencies take part in sorting.
    pub fn add_integrand(&mut self, info: FunctionalInfo) -> FunctionalId {
        self.push(info, None)
    }

    fn push(&mut self, info: FunctionalInfo, functional: Option<Box<dyn ValueFunctional<T>>>) -> FunctionalId {
        let id = FunctionalId(self.infos.len());
        debug!(
            "Registered functional '{}' (provides {:?}, depends on {:?})",
            info.name, info.provides, info.depends_on
        );
        self.infos.push(info);
        self.evaluators.push(functional);
        id
    }

    pub fn get_functional(&self, name: &str) -> Result<&dyn ValueFunctional<T>, DependencyError> {
        self.functionals_by_name
            .get(name)
            .and_then(|id| self.evaluators[id.0].as_deref())
            .ok_or_else(|| DependencyError::FunctionalNotFound(name.to_string()))
    }

    pub fn functional_id(&self, name: &str) -> Option<FunctionalId> {
        self.functionals_by_name.get(name).copied()
    }

    pub fn info(&self, id: FunctionalId) -> &FunctionalInfo {
        &self.infos[id.0]
    }

    pub fn is_value_functional(&self, id: FunctionalId) -> bool {
        self.evaluators[id.0].is_some()
    }

    pub fn num_functionals(&self) -> usize {
        self.infos.len()
    }

    /// Maps every provided value name to the functional supplying it.
    pub fn get_suppliers(&self) -> Result<BTreeMap<String, FunctionalId>, DependencyError> {
        let mut suppliers = BTreeMap::new();
        for id in self.functionals_by_name.values() {
            for value in &self.infos[id.0].provides {
                if suppliers.insert(value.clone(), *id).is_some() {
                    return Err(DependencyError::DuplicateSupplier(value.clone()));
                }
            }
        }
        Ok(suppliers)
    }

    /// Builds the graph with an edge from every value functional to the suppliers of the values
    /// it depends on.
    pub fn build_dependency_graph(
        &self,
        suppliers: &BTreeMap<String, FunctionalId>,
    ) -> Result<DependencyGraph<FunctionalId>, DependencyError> {
        let mut graph = DependencyGraph::new();
        for id in self.functionals_by_name.values() {
            graph.add_node(*id);
            self.add_dependency_edges(&mut graph, *id, suppliers)?;
        }
        Ok(graph)
    }

    /// Adds edges from `id` to the suppliers of its dependencies.
    ///
    /// Parameters have no supplier and add no edge.
    pub fn add_dependency_edges(
        &self,
        graph: &mut DependencyGraph<FunctionalId>,
        id: FunctionalId,
        suppliers: &BTreeMap<String, FunctionalId>,
    ) -> Result<(), DependencyError> {
        let info = &self.infos[id.0];
        for value in info
            .depends_on
            .iter()
            .filter(|value| !self.values.is_parameter(value))
        {
            let supplier = suppliers
                .get(value)
                .ok_or_else(|| DependencyError::UnresolvedDependency {
                    functional: info.name.clone(),
                    value: value.clone(),
                })?;
            graph.add_edge(id, *supplier);
        }
        Ok(())
    }

    /// Runs the value functional `id`, storing what it provides.
    ///
    /// Integrand ids are ignored.
    pub fn evaluate(&mut self, id: FunctionalId, asmbl: &AssemblyData<T>) {
        if let Some(functional) = &self.evaluators[id.0] {
            functional.evaluate(asmbl, &mut self.values);
        }
    }
}
