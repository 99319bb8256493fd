//! The scene: authoritative ordered element store.
//!
//! A scene owns every element of a drawing, deleted ones included, plus two
//! derived projections over the non-deleted subset (ordered positions and an
//! id map). Both projections are recomputed from scratch after every
//! structural change.

use crate::element::{Element, ElementId, NonDeleted, OrderedElement};
use crate::environment::Environment;
use crate::fractional_index::{FractionalIndex, generate_key_between};
use crate::mutation::{self, ElementCache, ElementUpdate, OpaqueFieldPolicy};
use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::rc::{Rc, Weak};
use thiserror::Error;

/// Scene contract violations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SceneError {
    #[error("Invalid insertion index: {0}")]
    InvalidIndex(f64),
    #[error("Update callback is already registered")]
    DuplicateSubscriber,
    #[error("Update callback is not registered")]
    UnknownSubscriber,
    #[error("Element {0} is not in the scene")]
    UnknownElement(ElementId),
    #[error("Element {0} is already in the scene")]
    DuplicateElement(ElementId),
}

/// Change callback. The `Rc` identity is what detects double registration.
pub type UpdateCallback = Rc<dyn Fn()>;

type CallbackList = RefCell<Vec<(u64, UpdateCallback)>>;

/// Handle returned by [`Scene::on_update`]. Removing through the handle
/// needs no access to the scene, so a callback may remove itself or another
/// callback while a broadcast is running.
#[derive(Clone)]
pub struct Subscription {
    id: u64,
    callbacks: Weak<CallbackList>,
}

impl Subscription {
    /// Remove the callback. Fails if it was already removed or the scene is
    /// gone.
    pub fn unsubscribe(&self) -> Result<(), SceneError> {
        let callbacks = self.callbacks.upgrade().ok_or(SceneError::UnknownSubscriber)?;
        let mut callbacks = callbacks.borrow_mut();
        let position = callbacks
            .iter()
            .position(|(id, _)| *id == self.id)
            .ok_or(SceneError::UnknownSubscriber)?;
        callbacks.remove(position);
        Ok(())
    }
}

impl PartialEq for Subscription {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id && Weak::ptr_eq(&self.callbacks, &other.callbacks)
    }
}

impl Eq for Subscription {}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Subscription").field(&self.id).finish()
    }
}

pub struct Scene {
    elements: Vec<OrderedElement>,
    /// Positions in `elements` of non-deleted elements, in order.
    non_deleted: Vec<usize>,
    non_deleted_map: HashMap<ElementId, usize>,
    callbacks: Rc<CallbackList>,
    next_subscription: u64,
    scene_nonce: Option<u32>,
    env: Environment,
    policy: OpaqueFieldPolicy,
}

impl Default for Scene {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Scene {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scene")
            .field("elements", &self.elements.len())
            .field("non_deleted", &self.non_deleted.len())
            .field("callbacks", &self.callbacks.borrow().len())
            .field("scene_nonce", &self.scene_nonce)
            .finish()
    }
}

impl Scene {
    /// An empty scene using the system clock and entropy.
    pub fn new() -> Self {
        Self::with_environment(Environment::system())
    }

    pub fn with_environment(env: Environment) -> Self {
        Self {
            elements: Vec::new(),
            non_deleted: Vec::new(),
            non_deleted_map: HashMap::new(),
            callbacks: Rc::default(),
            next_subscription: 0,
            scene_nonce: None,
            env,
            policy: OpaqueFieldPolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: OpaqueFieldPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Clock and randomness used for element construction and bookkeeping.
    pub fn environment_mut(&mut self) -> &mut Environment {
        &mut self.env
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn get_elements_including_deleted(&self) -> &[OrderedElement] {
        &self.elements
    }

    pub fn get_non_deleted_elements(&self) -> Vec<NonDeleted<'_>> {
        self.non_deleted
            .iter()
            .filter_map(|&position| NonDeleted::new(&self.elements[position]))
            .collect()
    }

    pub fn get_non_deleted_elements_map(&self) -> NonDeletedElementsMap<'_> {
        NonDeletedElementsMap { scene: self }
    }

    pub fn get_non_deleted_element(&self, id: &ElementId) -> Option<NonDeleted<'_>> {
        self.get_non_deleted_elements_map().get(id)
    }

    pub fn get_element(&self, id: &ElementId) -> Option<&OrderedElement> {
        self.elements.iter().find(|element| element.id() == id)
    }

    /// Position of the element in the ordered sequence, deleted ones counted.
    pub fn get_element_index(&self, id: &ElementId) -> Option<usize> {
        self.elements.iter().position(|element| element.id() == id)
    }

    /// Opaque token that changes whenever the scene broadcasts an update.
    pub fn get_scene_nonce(&self) -> Option<u32> {
        self.scene_nonce
    }

    /// Insert at the containing frame's position, or append. A frame id
    /// that names no element in the scene is an error.
    pub fn insert_element(&mut self, element: Element) -> Result<(), SceneError> {
        let position = match element.frame_id() {
            Some(frame_id) => self
                .get_element_index(frame_id)
                .ok_or_else(|| SceneError::UnknownElement(frame_id.clone()))?,
            None => self.elements.len(),
        };
        self.insert_element_at(element, position)
    }

    /// Insert at a position supplied by the interaction layer. The position
    /// must be finite and non-negative; fractional positions truncate.
    pub fn insert_element_at_index(&mut self, element: Element, index: f64) -> Result<(), SceneError> {
        if !index.is_finite() || index < 0.0 {
            return Err(SceneError::InvalidIndex(index));
        }
        self.insert_element_at(element, index.trunc() as usize)
    }

    /// Insert at `position`, clamped to the end. An element without an
    /// order key, or whose key does not fit between its new neighbours, is
    /// re-keyed the same way [`Scene::replace_all_elements`] repairs keys.
    pub fn insert_element_at(&mut self, mut element: Element, position: usize) -> Result<(), SceneError> {
        if self.get_element_index(element.id()).is_some() {
            return Err(SceneError::DuplicateElement(element.id().clone()));
        }

        let position = position.min(self.elements.len());
        let lower = position.checked_sub(1).map(|p| self.elements[p].index());
        let upper = self.elements.get(position).map(|e| e.index());
        let fits = match &element.index {
            Some(index) => lower.is_none_or(|lower| index > lower) && upper.is_none_or(|upper| index < upper),
            None => false,
        };
        if !fits {
            let key = key_between(lower, upper);
            self.assign_index(&mut element, key);
        }

        match OrderedElement::new(element) {
            Some(ordered) => self.elements.insert(position, ordered),
            None => log::warn!("Dropping element without an order key"),
        }
        self.recompute_projections();
        self.trigger_update();
        Ok(())
    }

    /// Give an element a new order key. Elements that already had one go
    /// through the mutation engine so the change is versioned.
    fn assign_index(&mut self, element: &mut Element, key: FractionalIndex) {
        if element.index.is_some() {
            mutation::mutate_element(
                element,
                ElementUpdate::new().with_index(key),
                &mut self.env,
                &mut (),
                self.policy,
            );
        } else {
            element.index = Some(key);
        }
    }

    /// Replace the whole sequence.
    ///
    /// Order keys are repaired so they strictly increase: elements without a
    /// key get one directly, elements whose key is out of order are re-keyed
    /// through the mutation engine.
    pub fn replace_all_elements(&mut self, next_elements: Vec<Element>) -> Result<(), SceneError> {
        let mut seen = HashSet::with_capacity(next_elements.len());
        for element in &next_elements {
            if !seen.insert(element.id().clone()) {
                return Err(SceneError::DuplicateElement(element.id().clone()));
            }
        }

        let mut next_elements = next_elements;
        let mut previous: Option<FractionalIndex> = None;
        for i in 0..next_elements.len() {
            let in_order = match (&next_elements[i].index, &previous) {
                (Some(index), Some(previous)) => index > previous,
                (Some(_), None) => true,
                (None, _) => false,
            };
            if !in_order {
                let upper = next_elements[i + 1..]
                    .iter()
                    .filter_map(|element| element.index.as_ref())
                    .find(|index| previous.as_ref().is_none_or(|previous| *index > previous));
                let key = key_between(previous.as_ref(), upper);

                self.assign_index(&mut next_elements[i], key);
            }
            previous = next_elements[i].index.clone();
        }

        self.elements = next_elements
            .into_iter()
            .filter_map(OrderedElement::new)
            .collect();
        log::debug!("Replaced scene contents with {} elements", self.elements.len());
        self.recompute_projections();
        self.trigger_update();
        Ok(())
    }

    /// Mutate an element and broadcast once if its version changed.
    pub fn mutate_element(
        &mut self,
        id: &ElementId,
        updates: ElementUpdate,
        caches: &mut dyn ElementCache,
    ) -> Result<&OrderedElement, SceneError> {
        let position = self
            .get_element_index(id)
            .ok_or_else(|| SceneError::UnknownElement(id.clone()))?;

        let ordered = &mut self.elements[position];
        let previous_version = ordered.version();
        let was_deleted = ordered.is_deleted();

        let element = mutation::mutate_element(ordered.element_mut(), updates, &mut self.env, caches, self.policy);
        let version = element.version();
        let deleted = element.is_deleted();

        if deleted != was_deleted {
            self.recompute_projections();
        }
        if version != previous_version {
            self.trigger_update();
        }
        Ok(&self.elements[position])
    }

    /// Register a change callback. Registering the same callback twice fails.
    pub fn on_update(&mut self, callback: UpdateCallback) -> Result<Subscription, SceneError> {
        let mut callbacks = self.callbacks.borrow_mut();
        if callbacks.iter().any(|(_, existing)| Rc::ptr_eq(existing, &callback)) {
            return Err(SceneError::DuplicateSubscriber);
        }
        let id = self.next_subscription;
        self.next_subscription += 1;
        callbacks.push((id, callback));
        Ok(Subscription {
            id,
            callbacks: Rc::downgrade(&self.callbacks),
        })
    }

    /// Remove a callback. Fails if it was already removed.
    pub fn unsubscribe(&self, subscription: &Subscription) -> Result<(), SceneError> {
        if !Weak::ptr_eq(&subscription.callbacks, &Rc::downgrade(&self.callbacks)) {
            return Err(SceneError::UnknownSubscriber);
        }
        subscription.unsubscribe()
    }

    /// Refresh the scene nonce and call every callback registered when the
    /// broadcast starts. Removals made during the broadcast apply to the next
    /// one.
    pub fn trigger_update(&mut self) {
        self.scene_nonce = Some(self.env.random_integer());
        let snapshot: Vec<UpdateCallback> = self.callbacks.borrow().iter().map(|(_, cb)| Rc::clone(cb)).collect();
        for callback in snapshot {
            callback();
        }
    }

    /// Drop all elements, projections and subscribers.
    pub fn destroy(&mut self) {
        self.elements.clear();
        self.non_deleted.clear();
        self.non_deleted_map.clear();
        self.callbacks.borrow_mut().clear();
    }

    fn recompute_projections(&mut self) {
        self.non_deleted.clear();
        self.non_deleted_map.clear();
        for (position, element) in self.elements.iter().enumerate() {
            if !element.is_deleted() {
                self.non_deleted.push(position);
                self.non_deleted_map.insert(element.id().clone(), position);
            }
        }
    }
}

/// A key between two neighbours, or after `lower` when the neighbours are
/// themselves out of order.
fn key_between(lower: Option<&FractionalIndex>, upper: Option<&FractionalIndex>) -> FractionalIndex {
    generate_key_between(lower, upper)
        .or_else(|_| generate_key_between(lower, None))
        .unwrap_or_else(|_| FractionalIndex::first())
}

/// Read-only id map over a scene's non-deleted elements.
#[derive(Clone, Copy)]
pub struct NonDeletedElementsMap<'a> {
    scene: &'a Scene,
}

impl<'a> NonDeletedElementsMap<'a> {
    pub fn get(&self, id: &ElementId) -> Option<NonDeleted<'a>> {
        let position = *self.scene.non_deleted_map.get(id)?;
        NonDeleted::new(&self.scene.elements[position])
    }

    pub fn contains_key(&self, id: &ElementId) -> bool {
        self.scene.non_deleted_map.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.scene.non_deleted_map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scene.non_deleted_map.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &'a ElementId> + 'a {
        self.scene.non_deleted_map.keys()
    }
}
