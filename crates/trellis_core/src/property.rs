//! Property store
//!
//! Properties are declared once through a [`PropertyBuilder`] and registered
//! into the process-wide [`PropertyRegistry`], keyed by `(owner, name)`.
//! Registration freezes the descriptor (it is leaked to `'static`), so typed
//! [`Property`] handles resolve to their descriptor without any lookup on
//! access.
//!
//! Each node owns a sparse [`PropertyBag`]. A missing entry resolves to the
//! nearest ancestor's local value for ambient properties, otherwise to the
//! descriptor default (see [`resolve_value`]).
//!
//! `PropertyBag::set_value` runs the store pipeline:
//!
//! 1. convert hook (kind check + user normalisation, may reject)
//! 2. equality check against the current effective value (no-op if equal)
//! 3. changing hook (may veto)
//! 4. mutation
//! 5. changed hook
//!
//! Invalidation and observer notification are the caller's job since they
//! need the surrounding tree.

use std::fmt;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{OnceLock, RwLock};

use indexmap::IndexMap;
use rustc_hash::FxHashMap;

use crate::error::{Result, TrellisError};
use crate::invalidation::InvalidateMode;
use crate::value::{PropertyType, PropertyValue, ValueKind};
use crate::NodeId;

/// Convert hook: normalise or reject a candidate value
pub type ConvertHook =
    Box<dyn Fn(PropertyValue) -> std::result::Result<PropertyValue, String> + Send + Sync>;

/// Changing hook: return `false` to veto a change `(node, old, new)`
pub type ChangingHook = Box<dyn Fn(NodeId, &PropertyValue, &PropertyValue) -> bool + Send + Sync>;

/// Changed hook: observe a committed change `(node, old, new)`
pub type ChangedHook = Box<dyn Fn(NodeId, &PropertyValue, &PropertyValue) + Send + Sync>;

static NEXT_PROPERTY_ID: AtomicU32 = AtomicU32::new(0);

/// Unique identifier of a registered property
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PropertyId(u32);

impl PropertyId {
    pub fn index(self) -> u32 {
        self.0
    }
}

/// Frozen declaration of a property
pub struct PropertyDescriptor {
    id: PropertyId,
    owner: &'static str,
    name: &'static str,
    kind: ValueKind,
    default: PropertyValue,
    invalidates: InvalidateMode,
    ambient: bool,
    convert: Option<ConvertHook>,
    changing: Option<ChangingHook>,
    changed: Option<ChangedHook>,
}

impl PropertyDescriptor {
    pub fn id(&self) -> PropertyId {
        self.id
    }

    /// Declaring node type
    pub fn owner(&self) -> &'static str {
        self.owner
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// `Owner.Name`
    pub fn full_name(&self) -> String {
        format!("{}.{}", self.owner, self.name)
    }

    pub fn kind(&self) -> ValueKind {
        self.kind
    }

    pub fn default_value(&self) -> &PropertyValue {
        &self.default
    }

    pub fn invalidates(&self) -> InvalidateMode {
        self.invalidates
    }

    /// Unset values inherit from the nearest ancestor
    pub fn is_ambient(&self) -> bool {
        self.ambient
    }

    /// Kind check followed by the convert hook
    pub fn coerce(&self, value: PropertyValue) -> Result<PropertyValue> {
        if value.kind() != self.kind {
            return Err(TrellisError::InvalidPropertyValue {
                property: self.full_name(),
                reason: format!("expected {:?}, got {:?}", self.kind, value.kind()),
            });
        }
        match &self.convert {
            Some(convert) => convert(value).map_err(|reason| TrellisError::InvalidPropertyValue {
                property: self.full_name(),
                reason,
            }),
            None => Ok(value),
        }
    }

    fn allows_change(&self, node: NodeId, old: &PropertyValue, new: &PropertyValue) -> bool {
        self.changing
            .as_ref()
            .map_or(true, |changing| changing(node, old, new))
    }

    fn notify_changed(&self, node: NodeId, old: &PropertyValue, new: &PropertyValue) {
        if let Some(changed) = &self.changed {
            changed(node, old, new);
        }
    }
}

impl fmt::Debug for PropertyDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PropertyDescriptor")
            .field("id", &self.id)
            .field("owner", &self.owner)
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("default", &self.default)
            .field("invalidates", &self.invalidates)
            .field("ambient", &self.ambient)
            .finish_non_exhaustive()
    }
}

/// Builder for a typed property declaration
pub struct PropertyBuilder<T: PropertyType> {
    owner: &'static str,
    name: &'static str,
    default: T,
    invalidates: InvalidateMode,
    ambient: bool,
    convert: Option<ConvertHook>,
    changing: Option<ChangingHook>,
    changed: Option<ChangedHook>,
}

impl<T: PropertyType> PropertyBuilder<T> {
    /// Invalidation applied when the value changes
    pub fn invalidates(mut self, mode: InvalidateMode) -> Self {
        self.invalidates = mode;
        self
    }

    /// Inherit the value from the nearest ancestor when unset
    pub fn ambient(mut self) -> Self {
        self.ambient = true;
        self
    }

    /// Normalise or reject candidate values
    pub fn convert<F>(mut self, convert: F) -> Self
    where
        F: Fn(T) -> std::result::Result<T, String> + Send + Sync + 'static,
    {
        self.convert = Some(Box::new(move |value| {
            let typed = T::from_value(&value)
                .ok_or_else(|| format!("expected {:?}, got {:?}", T::KIND, value.kind()))?;
            convert(typed).map(T::into_value)
        }));
        self
    }

    /// Veto changes by returning `false`
    pub fn changing<F>(mut self, changing: F) -> Self
    where
        F: Fn(NodeId, &T, &T) -> bool + Send + Sync + 'static,
    {
        self.changing = Some(Box::new(move |node, old, new| {
            match (T::from_value(old), T::from_value(new)) {
                (Some(old), Some(new)) => changing(node, &old, &new),
                _ => false,
            }
        }));
        self
    }

    /// Observe committed changes
    pub fn changed<F>(mut self, changed: F) -> Self
    where
        F: Fn(NodeId, &T, &T) + Send + Sync + 'static,
    {
        self.changed = Some(Box::new(move |node, old, new| {
            if let (Some(old), Some(new)) = (T::from_value(old), T::from_value(new)) {
                changed(node, &old, &new);
            }
        }));
        self
    }

    /// Register into the global registry
    ///
    /// # Panics
    ///
    /// Panics if `(owner, name)` is already registered.
    pub fn register(self) -> Property<T> {
        self.register_in(PropertyRegistry::global())
    }

    /// Register into a specific registry
    ///
    /// # Panics
    ///
    /// Panics if `(owner, name)` is already registered in `registry`.
    pub fn register_in(self, registry: &PropertyRegistry) -> Property<T> {
        let descriptor = PropertyDescriptor {
            id: PropertyId(NEXT_PROPERTY_ID.fetch_add(1, Ordering::Relaxed)),
            owner: self.owner,
            name: self.name,
            kind: T::KIND,
            default: self.default.into_value(),
            invalidates: self.invalidates,
            ambient: self.ambient,
            convert: self.convert,
            changing: self.changing,
            changed: self.changed,
        };
        Property {
            descriptor: registry.insert(descriptor),
            _marker: PhantomData,
        }
    }
}

/// Typed handle to a registered property
pub struct Property<T> {
    descriptor: &'static PropertyDescriptor,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Clone for Property<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Property<T> {}

impl<T> fmt::Debug for Property<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Property({}.{})", self.descriptor.owner, self.descriptor.name)
    }
}

impl<T: PropertyType> Property<T> {
    /// Start declaring a property owned by `owner`
    pub fn builder(owner: &'static str, name: &'static str, default: T) -> PropertyBuilder<T> {
        PropertyBuilder {
            owner,
            name,
            default,
            invalidates: InvalidateMode::empty(),
            ambient: false,
            convert: None,
            changing: None,
            changed: None,
        }
    }

    pub fn descriptor(&self) -> &'static PropertyDescriptor {
        self.descriptor
    }

    pub fn id(&self) -> PropertyId {
        self.descriptor.id
    }

    pub fn default_value(&self) -> T {
        T::from_value(&self.descriptor.default)
            .unwrap_or_else(|| unreachable!("default of {} has its declared kind", self.descriptor.full_name()))
    }

    /// Typed view of a value produced by the store for this property
    pub fn decode(&self, value: &PropertyValue) -> Result<T> {
        T::from_value(value).ok_or_else(|| {
            TrellisError::unsupported(
                "property decode",
                format!(
                    "{} holds {:?}, expected {:?}",
                    self.descriptor.full_name(),
                    value.kind(),
                    T::KIND
                ),
            )
        })
    }
}

/// Registry of frozen descriptors keyed by id, with an `(owner, name)` index
pub struct PropertyRegistry {
    entries: RwLock<RegistryEntries>,
}

#[derive(Default)]
struct RegistryEntries {
    /// Registration order
    by_id: IndexMap<PropertyId, &'static PropertyDescriptor>,
    /// owner -> name -> id
    by_name: FxHashMap<&'static str, FxHashMap<&'static str, PropertyId>>,
}

static GLOBAL_REGISTRY: OnceLock<PropertyRegistry> = OnceLock::new();

impl PropertyRegistry {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(RegistryEntries::default()),
        }
    }

    /// Process-wide registry used by [`PropertyBuilder::register`]
    pub fn global() -> &'static PropertyRegistry {
        GLOBAL_REGISTRY.get_or_init(PropertyRegistry::new)
    }

    fn insert(&self, descriptor: PropertyDescriptor) -> &'static PropertyDescriptor {
        let (owner, name) = (descriptor.owner, descriptor.name);
        let mut entries = self.entries.write().unwrap();
        let names = entries.by_name.entry(owner).or_default();
        if names.contains_key(name) {
            panic!("property {owner}.{name} registered twice");
        }
        let frozen: &'static PropertyDescriptor = Box::leak(Box::new(descriptor));
        names.insert(name, frozen.id);
        entries.by_id.insert(frozen.id, frozen);
        tracing::trace!(property = %frozen.full_name(), id = frozen.id.0, "registered property");
        frozen
    }

    /// Find a descriptor by its declaring type and name
    pub fn lookup(&self, owner: &str, name: &str) -> Option<&'static PropertyDescriptor> {
        let entries = self.entries.read().unwrap();
        let id = entries.by_name.get(owner)?.get(name)?;
        entries.by_id.get(id).copied()
    }

    /// Find a descriptor by id
    pub fn get(&self, id: PropertyId) -> Option<&'static PropertyDescriptor> {
        self.entries.read().unwrap().by_id.get(&id).copied()
    }

    /// All descriptors declared by `owner`, in registration order
    pub fn owned_by(&self, owner: &str) -> Vec<&'static PropertyDescriptor> {
        let entries = self.entries.read().unwrap();
        entries
            .by_id
            .values()
            .filter(|d| d.owner == owner)
            .copied()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.read().unwrap().by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for PropertyRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Options for a single store write
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SetOptions {
    /// Skip invalidation (bulk construction before the first layout pass)
    pub suppress_invalidation: bool,
}

impl SetOptions {
    /// Write without invalidating
    pub fn quiet() -> Self {
        Self {
            suppress_invalidation: true,
        }
    }
}

/// A committed change of a node's effective value
#[derive(Clone, Debug, PartialEq)]
pub struct PropertyChange {
    pub property: PropertyId,
    pub old: PropertyValue,
    pub new: PropertyValue,
}

/// Sparse per-node property values
#[derive(Clone, Debug, Default)]
pub struct PropertyBag {
    values: FxHashMap<PropertyId, PropertyValue>,
}

impl PropertyBag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_local(&self, id: PropertyId) -> Option<&PropertyValue> {
        self.values.get(&id)
    }

    pub fn contains(&self, id: PropertyId) -> bool {
        self.values.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = PropertyId> + '_ {
        self.values.keys().copied()
    }

    /// Run the store pipeline for a write.
    ///
    /// `current` is the node's effective value before the write. Returns
    /// `Ok(None)` when the write was a no-op or vetoed. On a convert rejection
    /// the bag is left untouched.
    pub fn set_value(
        &mut self,
        node: NodeId,
        descriptor: &PropertyDescriptor,
        value: PropertyValue,
        current: &PropertyValue,
    ) -> Result<Option<PropertyChange>> {
        let value = descriptor.coerce(value)?;
        if value.same_as(current) {
            // an explicit write pins the value even when it matches what the node inherits
            self.values.entry(descriptor.id).or_insert(value);
            return Ok(None);
        }
        if !descriptor.allows_change(node, current, &value) {
            tracing::debug!(
                property = %descriptor.full_name(),
                ?node,
                "property change vetoed"
            );
            return Ok(None);
        }
        self.values.insert(descriptor.id, value.clone());
        descriptor.notify_changed(node, current, &value);
        Ok(Some(PropertyChange {
            property: descriptor.id,
            old: current.clone(),
            new: value,
        }))
    }

    /// Remove a local value.
    ///
    /// `fallback` is the value the node resolves to once the local entry is
    /// gone. Returns a change only when the effective value differs.
    pub fn clear_value(
        &mut self,
        node: NodeId,
        descriptor: &PropertyDescriptor,
        fallback: &PropertyValue,
    ) -> Option<PropertyChange> {
        let old = self.values.get(&descriptor.id)?;
        if old.same_as(fallback) {
            self.values.remove(&descriptor.id);
            return None;
        }
        if !descriptor.allows_change(node, old, fallback) {
            return None;
        }
        let old = self.values.remove(&descriptor.id)?;
        descriptor.notify_changed(node, &old, fallback);
        Some(PropertyChange {
            property: descriptor.id,
            old,
            new: fallback.clone(),
        })
    }
}

/// Read-only view of a tree used for value resolution
pub trait PropertySource {
    fn local_value(&self, node: NodeId, id: PropertyId) -> Option<&PropertyValue>;

    fn parent_of(&self, node: NodeId) -> Option<NodeId>;
}

/// Effective value of `descriptor` on `node`.
///
/// Local value first; for ambient properties the nearest ancestor with a local
/// value; otherwise the declared default.
pub fn resolve_value<'a, S: PropertySource + ?Sized>(
    source: &'a S,
    node: NodeId,
    descriptor: &'a PropertyDescriptor,
) -> &'a PropertyValue {
    if let Some(value) = source.local_value(node, descriptor.id) {
        return value;
    }
    if descriptor.ambient {
        if let Some(parent) = source.parent_of(node) {
            return resolve_value(source, parent, descriptor);
        }
    }
    &descriptor.default
}

#[cfg(test)]
mod tests {
    use super::*;
    use slotmap::SlotMap;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Arc;

    struct Chain {
        parents: SlotMap<NodeId, (Option<NodeId>, PropertyBag)>,
    }

    impl PropertySource for Chain {
        fn local_value(&self, node: NodeId, id: PropertyId) -> Option<&PropertyValue> {
            self.parents.get(node).and_then(|(_, bag)| bag.get_local(id))
        }

        fn parent_of(&self, node: NodeId) -> Option<NodeId> {
            self.parents.get(node).and_then(|(parent, _)| *parent)
        }
    }

    fn registry() -> PropertyRegistry {
        PropertyRegistry::new()
    }

    #[test]
    fn test_convert_rejects_and_keeps_previous_value() {
        let reg = registry();
        let width = Property::<f32>::builder("Test", "Width", f32::NAN)
            .convert(|v| {
                if v.is_nan() || v >= 0.0 {
                    Ok(v)
                } else {
                    Err("must be non-negative".into())
                }
            })
            .register_in(&reg);

        let mut nodes: SlotMap<NodeId, ()> = SlotMap::with_key();
        let node = nodes.insert(());
        let mut bag = PropertyBag::new();

        let change = bag
            .set_value(node, width.descriptor(), PropertyValue::Float(10.0), &PropertyValue::Float(f32::NAN))
            .unwrap();
        assert!(change.is_some());

        let err = bag
            .set_value(node, width.descriptor(), PropertyValue::Float(-1.0), &PropertyValue::Float(10.0))
            .unwrap_err();
        assert!(matches!(err, TrellisError::InvalidPropertyValue { .. }));
        assert_eq!(bag.get_local(width.id()), Some(&PropertyValue::Float(10.0)));
    }

    #[test]
    fn test_wrong_kind_is_rejected() {
        let reg = registry();
        let flag = Property::<bool>::builder("Test", "Flag", false).register_in(&reg);
        let mut nodes: SlotMap<NodeId, ()> = SlotMap::with_key();
        let node = nodes.insert(());
        let mut bag = PropertyBag::new();

        let err = bag
            .set_value(node, flag.descriptor(), PropertyValue::Int(1), &PropertyValue::Bool(false))
            .unwrap_err();
        assert!(matches!(err, TrellisError::InvalidPropertyValue { .. }));
        assert!(bag.is_empty());
    }

    #[test]
    fn test_equal_value_is_noop() {
        let reg = registry();
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_clone = calls.clone();
        let count = Property::<i32>::builder("Test", "Count", 0)
            .changed(move |_, _, _| {
                calls_clone.fetch_add(1, Ordering::SeqCst);
            })
            .register_in(&reg);
        let mut nodes: SlotMap<NodeId, ()> = SlotMap::with_key();
        let node = nodes.insert(());
        let mut bag = PropertyBag::new();

        let change = bag
            .set_value(node, count.descriptor(), PropertyValue::Int(0), &PropertyValue::Int(0))
            .unwrap();
        assert!(change.is_none());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(bag.get_local(count.id()), Some(&PropertyValue::Int(0)));

        bag.set_value(node, count.descriptor(), PropertyValue::Int(3), &PropertyValue::Int(0))
            .unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_changing_hook_vetoes() {
        let reg = registry();
        let level = Property::<i32>::builder("Test", "Level", 0)
            .changing(|_, _, new| *new <= 10)
            .register_in(&reg);
        let mut nodes: SlotMap<NodeId, ()> = SlotMap::with_key();
        let node = nodes.insert(());
        let mut bag = PropertyBag::new();

        let change = bag
            .set_value(node, level.descriptor(), PropertyValue::Int(11), &PropertyValue::Int(0))
            .unwrap();
        assert!(change.is_none());
        assert!(!bag.contains(level.id()));
    }

    #[test]
    fn test_ambient_resolution_walks_ancestors() {
        let reg = registry();
        let scale = Property::<f32>::builder("Test", "Scale", 1.0)
            .ambient()
            .register_in(&reg);
        let plain = Property::<f32>::builder("Test", "Plain", 1.0).register_in(&reg);

        let mut chain = Chain {
            parents: SlotMap::with_key(),
        };
        let root = chain.parents.insert((None, PropertyBag::new()));
        let mid = chain.parents.insert((Some(root), PropertyBag::new()));
        let leaf = chain.parents.insert((Some(mid), PropertyBag::new()));

        let (_, root_bag) = chain.parents.get_mut(root).unwrap();
        root_bag
            .set_value(root, scale.descriptor(), PropertyValue::Float(2.0), &PropertyValue::Float(1.0))
            .unwrap();
        root_bag
            .set_value(root, plain.descriptor(), PropertyValue::Float(2.0), &PropertyValue::Float(1.0))
            .unwrap();

        assert_eq!(resolve_value(&chain, leaf, scale.descriptor()), &PropertyValue::Float(2.0));
        assert_eq!(resolve_value(&chain, leaf, plain.descriptor()), &PropertyValue::Float(1.0));
    }

    #[test]
    fn test_clear_value_reports_effective_change() {
        let reg = registry();
        let opacity = Property::<f32>::builder("Test", "Opacity", 1.0).register_in(&reg);
        let mut nodes: SlotMap<NodeId, ()> = SlotMap::with_key();
        let node = nodes.insert(());
        let mut bag = PropertyBag::new();

        bag.set_value(node, opacity.descriptor(), PropertyValue::Float(0.5), &PropertyValue::Float(1.0))
            .unwrap();
        let change = bag
            .clear_value(node, opacity.descriptor(), &PropertyValue::Float(1.0))
            .unwrap();
        assert_eq!(change.old, PropertyValue::Float(0.5));
        assert_eq!(change.new, PropertyValue::Float(1.0));
        assert!(bag.is_empty());
        assert!(bag.clear_value(node, opacity.descriptor(), &PropertyValue::Float(1.0)).is_none());
    }

    #[test]
    fn test_registry_lookup_and_duplicates() {
        let reg = registry();
        let a = Property::<bool>::builder("Panel", "A", false).register_in(&reg);
        Property::<bool>::builder("Panel", "B", true).register_in(&reg);
        Property::<bool>::builder("Other", "A", true).register_in(&reg);

        assert_eq!(reg.len(), 3);
        assert_eq!(reg.lookup("Panel", "A").map(|d| d.id()), Some(a.id()));
        assert_eq!(reg.get(a.id()).map(|d| d.name()), Some("A"));
        assert_eq!(reg.owned_by("Panel").len(), 2);

        let dup = std::panic::catch_unwind(|| {
            let reg = PropertyRegistry::new();
            Property::<bool>::builder("Panel", "A", false).register_in(&reg);
            Property::<bool>::builder("Panel", "A", false).register_in(&reg);
        });
        assert!(dup.is_err());
    }
}
