//! Obstacle collection
//!
//! Gathers everything on one layer a track of a given net must stay clear
//! of, inflates it by the applicable clearance, and indexes the result for
//! broad-phase lookups. The set is an immutable snapshot; when any input
//! changes a new set is built and the old one is dropped.

use rstar::primitives::{GeomWithData, Rectangle};
use rstar::{RTree, AABB};
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::rc::Rc;

use crate::board::{ComponentId, CopperKind, DocumentModel, ItemRef, NetId};
use crate::geometry::{intersects, BBox, KernelOptions, Nm, PolygonSet};
use crate::layers::LayerId;

type IndexedBox = GeomWithData<Rectangle<[i64; 2]>, usize>;

fn rect_of(bbox: BBox) -> Rectangle<[i64; 2]> {
    Rectangle::from_corners([bbox.min.x, bbox.min.y], [bbox.max.x, bbox.max.y])
}

fn envelope_of(bbox: BBox) -> AABB<[i64; 2]> {
    AABB::from_corners([bbox.min.x, bbox.min.y], [bbox.max.x, bbox.max.y])
}

/// One inflated piece of foreign geometry.
#[derive(Debug, Clone, PartialEq)]
pub struct Obstacle {
    pub source: ItemRef,
    pub kind: CopperKind,
    pub net: Option<NetId>,
    pub component: Option<ComponentId>,
    /// Clearance the outline was grown by.
    pub margin: Nm,
    pub area: PolygonSet,
}

/// Items the router itself is standing on: left out of the obstacle set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Exclusions {
    pub items: BTreeSet<ItemRef>,
    /// Components party to the connection; their courtyards are ignored.
    pub components: BTreeSet<ComponentId>,
}

impl Exclusions {
    pub fn item(mut self, item: ItemRef) -> Self {
        self.items.insert(item);
        self
    }

    pub fn component(mut self, component: ComponentId) -> Self {
        self.components.insert(component);
        self
    }
}

/// Obstacles a particular validation may pass through, typically the
/// connectable item under the cursor and the net it carries.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Allowance {
    pub items: Vec<ItemRef>,
    pub net: Option<NetId>,
}

impl Allowance {
    pub fn permits(&self, obstacle: &Obstacle) -> bool {
        self.items.contains(&obstacle.source) || (self.net.is_some() && obstacle.net == self.net)
    }
}

/// Inflated obstacles for one layer and one routed net.
pub struct ObstacleSet {
    layer: LayerId,
    net: Option<NetId>,
    obstacles: Vec<Obstacle>,
    index: RTree<IndexedBox>,
}

impl fmt::Debug for ObstacleSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObstacleSet")
            .field("layer", &self.layer)
            .field("net", &self.net)
            .field("obstacles", &self.obstacles.len())
            .finish()
    }
}

impl ObstacleSet {
    pub fn new(layer: LayerId, net: Option<NetId>, obstacles: Vec<Obstacle>) -> Self {
        let boxes: Vec<IndexedBox> = obstacles
            .iter()
            .enumerate()
            .filter_map(|(i, o)| o.area.bbox().map(|b| GeomWithData::new(rect_of(b), i)))
            .collect();
        Self {
            layer,
            net,
            obstacles,
            index: RTree::bulk_load(boxes),
        }
    }

    pub fn empty(layer: LayerId, net: Option<NetId>) -> Self {
        Self::new(layer, net, Vec::new())
    }

    pub fn layer(&self) -> LayerId {
        self.layer
    }

    pub fn net(&self) -> Option<NetId> {
        self.net
    }

    pub fn len(&self) -> usize {
        self.obstacles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.obstacles.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Obstacle> {
        self.obstacles.iter()
    }

    /// Lowest-indexed obstacle overlapping `area`, skipping allowed ones.
    pub fn first_collision(&self, area: &PolygonSet, allow: &Allowance) -> Option<&Obstacle> {
        let mut candidates: Vec<usize> = area
            .pieces()
            .iter()
            .filter_map(|piece| piece.bbox())
            .flat_map(|b| {
                self.index
                    .locate_in_envelope_intersecting(&envelope_of(b))
                    .map(|hit| hit.data)
            })
            .collect();
        candidates.sort_unstable();
        candidates.dedup();
        candidates
            .into_iter()
            .map(|i| &self.obstacles[i])
            .filter(|o| !allow.permits(o))
            .find(|o| intersects(&o.area, area))
    }

    pub fn collides(&self, area: &PolygonSet, allow: &Allowance) -> bool {
        self.first_collision(area, allow).is_some()
    }
}

pub struct ObstacleCollector;

impl ObstacleCollector {
    /// Collect and inflate everything on `layer` that a track of `net` must
    /// avoid.
    pub fn build<D: DocumentModel + ?Sized>(
        doc: &D,
        layer: LayerId,
        net: Option<NetId>,
        excluding: &Exclusions,
        options: &KernelOptions,
    ) -> ObstacleSet {
        let own_clearance = doc.clearance(net, layer);
        let mut obstacles = Vec::new();
        for item in doc.copper_on_layer(layer) {
            if excluding.items.contains(&item.source) {
                continue;
            }
            let margin = match item.kind {
                CopperKind::Courtyard => {
                    if item.component.is_some_and(|c| excluding.components.contains(&c)) {
                        continue;
                    }
                    own_clearance
                }
                CopperKind::Keepout => own_clearance,
                CopperKind::Track | CopperKind::Via | CopperKind::Pad | CopperKind::Pour => {
                    if item.net.is_some() && item.net == net {
                        continue;
                    }
                    own_clearance.max(doc.clearance(item.net, layer))
                }
            };
            let area = item.shape.inflated(margin, options);
            if area.is_empty() {
                continue;
            }
            obstacles.push(Obstacle {
                source: item.source,
                kind: item.kind,
                net: item.net,
                component: item.component,
                margin,
                area,
            });
        }
        tracing::debug!(
            "Collected {} obstacles on {} for net {:?}",
            obstacles.len(),
            layer,
            net
        );
        ObstacleSet::new(layer, net, obstacles)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct CacheKey {
    layer: LayerId,
    net: Option<NetId>,
    revision: u64,
    excluding: Exclusions,
}

/// Holds the most recent [`ObstacleSet`] per layer and rebuilds it when the
/// net, board revision or exclusions change.
#[derive(Debug, Default)]
pub struct ObstacleCache {
    current: HashMap<LayerId, (CacheKey, Rc<ObstacleSet>)>,
    builds: usize,
}

impl ObstacleCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get<D: DocumentModel + ?Sized>(
        &mut self,
        doc: &D,
        layer: LayerId,
        net: Option<NetId>,
        excluding: &Exclusions,
        options: &KernelOptions,
    ) -> Rc<ObstacleSet> {
        let key = CacheKey {
            layer,
            net,
            revision: doc.revision(),
            excluding: excluding.clone(),
        };
        if let Some((cached, set)) = self.current.get(&layer) {
            if *cached == key {
                return Rc::clone(set);
            }
        }
        let set = Rc::new(ObstacleCollector::build(doc, layer, net, excluding, options));
        self.builds += 1;
        self.current.insert(layer, (key, Rc::clone(&set)));
        set
    }

    /// Number of rebuilds so far.
    pub fn builds(&self) -> usize {
        self.builds
    }
}
