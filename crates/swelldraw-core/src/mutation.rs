//! Mutation engine.
//!
//! [`mutate_element`] is the only way element fields change after
//! construction. It skips values equal to the current ones, and when anything
//! did change it bumps `version`, regenerates `version_nonce` and restamps
//! `updated`. It never notifies anyone; [`Scene::mutate_element`] adds that.
//!
//! [`Scene::mutate_element`]: crate::scene::Scene::mutate_element

use crate::element::{Element, ElementId, FillStyle, GroupId, StrokeStyle};
use crate::environment::Environment;
use crate::fractional_index::FractionalIndex;

/// A per-element derived cache that must forget an element when its
/// generated shape goes stale.
pub trait ElementCache {
    fn evict(&mut self, id: &ElementId);
    fn clear(&mut self);
}

/// No dependent cache.
impl ElementCache for () {
    fn evict(&mut self, _id: &ElementId) {}
    fn clear(&mut self) {}
}

/// How `custom_data` updates are compared with the current value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OpaqueFieldPolicy {
    /// Any object value counts as a change, since its contents may have
    /// been edited in place. A `null` equal to the current `null` is skipped.
    #[default]
    AlwaysChanged,
    /// Compare JSON values structurally.
    Structural,
}

/// A partial element update. `None` leaves a field alone.
///
/// `id` and `updated` are not updatable.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ElementUpdate {
    pub x: Option<f64>,
    pub y: Option<f64>,
    pub width: Option<f64>,
    pub height: Option<f64>,
    pub stroke_color: Option<String>,
    pub background_color: Option<String>,
    pub fill_style: Option<FillStyle>,
    pub stroke_width: Option<f64>,
    pub stroke_style: Option<StrokeStyle>,
    pub roughness: Option<f64>,
    pub opacity: Option<f64>,
    pub seed: Option<u32>,
    /// Explicit version instead of `version + 1`.
    pub version: Option<u32>,
    /// Explicit nonce instead of a fresh random one.
    pub version_nonce: Option<u32>,
    pub index: Option<FractionalIndex>,
    pub is_deleted: Option<bool>,
    pub group_ids: Option<Vec<GroupId>>,
    pub frame_id: Option<Option<ElementId>>,
    pub link: Option<Option<String>>,
    pub locked: Option<bool>,
    pub custom_data: Option<Option<serde_json::Value>>,
}

impl ElementUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Whether applying this update could change the generated shape.
    pub fn touches_shape_style(&self) -> bool {
        self.stroke_color.is_some()
            || self.background_color.is_some()
            || self.fill_style.is_some()
            || self.stroke_width.is_some()
            || self.stroke_style.is_some()
            || self.roughness.is_some()
            || self.seed.is_some()
    }

    pub fn with_position(mut self, x: f64, y: f64) -> Self {
        self.x = Some(x);
        self.y = Some(y);
        self
    }

    pub fn with_x(mut self, x: f64) -> Self {
        self.x = Some(x);
        self
    }

    pub fn with_y(mut self, y: f64) -> Self {
        self.y = Some(y);
        self
    }

    pub fn with_size(mut self, width: f64, height: f64) -> Self {
        self.width = Some(width);
        self.height = Some(height);
        self
    }

    pub fn with_width(mut self, width: f64) -> Self {
        self.width = Some(width);
        self
    }

    pub fn with_height(mut self, height: f64) -> Self {
        self.height = Some(height);
        self
    }

    pub fn with_stroke_color(mut self, color: impl Into<String>) -> Self {
        self.stroke_color = Some(color.into());
        self
    }

    pub fn with_background_color(mut self, color: impl Into<String>) -> Self {
        self.background_color = Some(color.into());
        self
    }

    pub fn with_fill_style(mut self, fill_style: FillStyle) -> Self {
        self.fill_style = Some(fill_style);
        self
    }

    pub fn with_stroke_width(mut self, stroke_width: f64) -> Self {
        self.stroke_width = Some(stroke_width);
        self
    }

    pub fn with_stroke_style(mut self, stroke_style: StrokeStyle) -> Self {
        self.stroke_style = Some(stroke_style);
        self
    }

    pub fn with_roughness(mut self, roughness: f64) -> Self {
        self.roughness = Some(roughness);
        self
    }

    pub fn with_opacity(mut self, opacity: f64) -> Self {
        self.opacity = Some(opacity);
        self
    }

    pub fn with_seed(mut self, seed: u32) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_version(mut self, version: u32) -> Self {
        self.version = Some(version);
        self
    }

    pub fn with_version_nonce(mut self, version_nonce: u32) -> Self {
        self.version_nonce = Some(version_nonce);
        self
    }

    pub fn with_index(mut self, index: FractionalIndex) -> Self {
        self.index = Some(index);
        self
    }

    pub fn with_deleted(mut self, is_deleted: bool) -> Self {
        self.is_deleted = Some(is_deleted);
        self
    }

    pub fn with_group_ids(mut self, group_ids: Vec<GroupId>) -> Self {
        self.group_ids = Some(group_ids);
        self
    }

    pub fn with_frame_id(mut self, frame_id: Option<ElementId>) -> Self {
        self.frame_id = Some(frame_id);
        self
    }

    pub fn with_link(mut self, link: Option<String>) -> Self {
        self.link = Some(link);
        self
    }

    pub fn with_locked(mut self, locked: bool) -> Self {
        self.locked = Some(locked);
        self
    }

    pub fn with_custom_data(mut self, custom_data: Option<serde_json::Value>) -> Self {
        self.custom_data = Some(custom_data);
        self
    }
}

/// Store `value` if it differs from the current one. NaN always differs.
fn apply<T: PartialEq>(slot: &mut T, value: Option<T>) -> bool {
    match value {
        Some(value) if *slot != value => {
            *slot = value;
            true
        }
        _ => false,
    }
}

fn apply_opaque(
    slot: &mut Option<serde_json::Value>,
    value: Option<Option<serde_json::Value>>,
    policy: OpaqueFieldPolicy,
) -> bool {
    match (policy, value) {
        (_, None) => false,
        (OpaqueFieldPolicy::AlwaysChanged, Some(None)) => apply(slot, Some(None)),
        (OpaqueFieldPolicy::AlwaysChanged, Some(value)) => {
            *slot = value;
            true
        }
        (OpaqueFieldPolicy::Structural, Some(value)) => apply(slot, Some(value)),
    }
}

/// Apply `updates` to `element` in place and return it.
///
/// When nothing changed the element is left exactly as it was. Otherwise the
/// version bookkeeping is updated, and if `width` or `height` changed the
/// element is evicted from `caches`.
pub fn mutate_element<'a>(
    element: &'a mut Element,
    updates: ElementUpdate,
    env: &mut Environment,
    caches: &mut dyn ElementCache,
    policy: OpaqueFieldPolicy,
) -> &'a mut Element {
    let ElementUpdate {
        x,
        y,
        width,
        height,
        stroke_color,
        background_color,
        fill_style,
        stroke_width,
        stroke_style,
        roughness,
        opacity,
        seed,
        version,
        version_nonce,
        index,
        is_deleted,
        group_ids,
        frame_id,
        link,
        locked,
        custom_data,
    } = updates;

    let geometry_changed = [
        apply(&mut element.width, width),
        apply(&mut element.height, height),
    ]
    .contains(&true);

    let changed = [
        geometry_changed,
        apply(&mut element.x, x),
        apply(&mut element.y, y),
        apply(&mut element.stroke_color, stroke_color),
        apply(&mut element.background_color, background_color),
        apply(&mut element.fill_style, fill_style),
        apply(&mut element.stroke_width, stroke_width),
        apply(&mut element.stroke_style, stroke_style),
        apply(&mut element.roughness, roughness),
        apply(&mut element.opacity, opacity),
        apply(&mut element.seed, seed),
        apply(&mut element.version, version),
        apply(&mut element.version_nonce, version_nonce),
        apply(&mut element.index, index.map(Some)),
        apply(&mut element.is_deleted, is_deleted),
        apply(&mut element.group_ids, group_ids),
        apply(&mut element.frame_id, frame_id),
        apply(&mut element.link, link),
        apply(&mut element.locked, locked),
        apply_opaque(&mut element.custom_data, custom_data, policy),
    ]
    .contains(&true);

    if !changed {
        return element;
    }

    if geometry_changed {
        caches.evict(&element.id);
    }

    element.version = match version {
        Some(version) => version,
        None => element.version.saturating_add(1),
    };
    element.version_nonce = match version_nonce {
        Some(nonce) => nonce,
        None => env.random_integer(),
    };
    element.updated = env.now();

    log::trace!("Mutated element {} to version {}", element.id, element.version);
    element
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::{ElementType, NewElement};
    use crate::environment::{Clock, SeededRandom};
    use serde_json::json;
    use std::cell::Cell;
    use std::rc::Rc;

    #[derive(Default)]
    struct EvictionLog {
        evicted: Vec<ElementId>,
        cleared: usize,
    }

    impl ElementCache for EvictionLog {
        fn evict(&mut self, id: &ElementId) {
            self.evicted.push(id.clone());
        }

        fn clear(&mut self) {
            self.cleared += 1;
        }
    }

    struct TickingClock(Rc<Cell<i64>>);

    impl Clock for TickingClock {
        fn now(&self) -> i64 {
            let now = self.0.get() + 10;
            self.0.set(now);
            now
        }
    }

    fn rectangle(env: &mut Environment) -> Element {
        NewElement::new(ElementType::Rectangle, 0.0, 0.0)
            .with_id("r1")
            .with_size(100.0, 50.0)
            .with_group_ids(vec!["g1".into()])
            .build(env)
    }

    fn mutate(element: &mut Element, updates: ElementUpdate, env: &mut Environment, log: &mut EvictionLog) {
        mutate_element(element, updates, env, log, OpaqueFieldPolicy::default());
    }

    #[test]
    fn test_unchanged_values_leave_bookkeeping_alone() {
        let mut env = Environment::deterministic(1);
        let mut element = rectangle(&mut env);
        let before = element.clone();
        let mut log = EvictionLog::default();

        let updates = ElementUpdate::new()
            .with_position(0.0, 0.0)
            .with_size(100.0, 50.0)
            .with_stroke_color(before.stroke_color().to_string())
            .with_group_ids(vec!["g1".into()])
            .with_frame_id(None)
            .with_custom_data(None);
        mutate(&mut element, updates, &mut env, &mut log);

        assert_eq!(element, before);
        assert!(log.evicted.is_empty());
    }

    #[test]
    fn test_accepted_mutation_bumps_version_by_one() {
        let mut env = Environment::deterministic(1);
        let mut element = rectangle(&mut env);
        let nonce = element.version_nonce();
        let mut log = EvictionLog::default();

        mutate(&mut element, ElementUpdate::new().with_x(5.0), &mut env, &mut log);
        assert_eq!(element.x(), 5.0);
        assert_eq!(element.version(), 2);
        assert_ne!(element.version_nonce(), nonce);
    }

    #[test]
    fn test_geometry_change_evicts_and_other_fields_do_not() {
        let mut env = Environment::deterministic(1);
        let mut element = rectangle(&mut env);
        let mut log = EvictionLog::default();

        mutate(&mut element, ElementUpdate::new().with_x(10.0).with_stroke_color("#f00"), &mut env, &mut log);
        assert!(log.evicted.is_empty());

        mutate(&mut element, ElementUpdate::new().with_width(120.0), &mut env, &mut log);
        assert_eq!(log.evicted, vec![ElementId::from("r1")]);

        mutate(&mut element, ElementUpdate::new().with_height(60.0), &mut env, &mut log);
        assert_eq!(log.evicted.len(), 2);
        assert_eq!(log.cleared, 0);
    }

    #[test]
    fn test_sequential_mutations_are_versioned_and_timestamped() {
        let ticks = Rc::new(Cell::new(0));
        let mut env = Environment::new(TickingClock(ticks.clone()), SeededRandom::new(4));
        let mut element = rectangle(&mut env);
        let initial = element.version();
        let mut log = EvictionLog::default();

        mutate(&mut element, ElementUpdate::new().with_stroke_color("#1971c2"), &mut env, &mut log);
        let first = element.updated();
        mutate(&mut element, ElementUpdate::new().with_x(42.0), &mut env, &mut log);

        assert_eq!(element.version(), initial + 2);
        assert!(element.updated() >= first);
    }

    #[test]
    fn test_explicit_version_and_nonce_override() {
        let mut env = Environment::deterministic(1);
        let mut element = rectangle(&mut env);
        let mut log = EvictionLog::default();

        let updates = ElementUpdate::new().with_y(3.0).with_version(10).with_version_nonce(99);
        mutate(&mut element, updates, &mut env, &mut log);
        assert_eq!(element.version(), 10);
        assert_eq!(element.version_nonce(), 99);
    }

    #[test]
    fn test_custom_data_policy() {
        let mut env = Environment::deterministic(1);
        let mut element = rectangle(&mut env);
        let mut log = EvictionLog::default();

        let data = json!({ "tag": "a" });
        mutate(&mut element, ElementUpdate::new().with_custom_data(Some(data.clone())), &mut env, &mut log);
        assert_eq!(element.version(), 2);

        // Same object value still counts under the default policy.
        mutate(&mut element, ElementUpdate::new().with_custom_data(Some(data.clone())), &mut env, &mut log);
        assert_eq!(element.version(), 3);

        mutate_element(
            &mut element,
            ElementUpdate::new().with_custom_data(Some(data)),
            &mut env,
            &mut log,
            OpaqueFieldPolicy::Structural,
        );
        assert_eq!(element.version(), 3);
    }

    #[test]
    fn test_group_ids_compare_element_wise() {
        let mut env = Environment::deterministic(1);
        let mut element = rectangle(&mut env);
        let mut log = EvictionLog::default();

        mutate(&mut element, ElementUpdate::new().with_group_ids(vec!["g1".into()]), &mut env, &mut log);
        assert_eq!(element.version(), 1);

        mutate(
            &mut element,
            ElementUpdate::new().with_group_ids(vec!["g2".into(), "g1".into()]),
            &mut env,
            &mut log,
        );
        assert_eq!(element.version(), 2);
        assert_eq!(element.group_ids(), ["g2".to_string(), "g1".to_string()]);
    }

    #[test]
    fn test_style_update_classification() {
        assert!(ElementUpdate::new().with_fill_style(FillStyle::Hachure).touches_shape_style());
        assert!(!ElementUpdate::new().with_opacity(50.0).touches_shape_style());
        assert!(ElementUpdate::new().is_empty());
    }
}
