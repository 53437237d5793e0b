//! Router state machine
//!
//! One synchronous [`Router::update`] per input event. While a gesture is
//! in progress the router owns a [`RoutingSession`]; every event produces a
//! fresh session value and an [`Effects`] report for the host to render.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::board::{DocumentModel, ModelError, NetId};
use crate::candidate::CandidatePath;
use crate::commit::{commit, CommitHandles};
use crate::config::RouterConfig;
use crate::geometry::Coord;
use crate::layers::LayerId;
use crate::obstacles::{ObstacleCache, ObstacleSet};
use crate::propose::{propose, RouteMode};
use crate::session::RoutingSession;
use crate::validate::{validate, Collision, ValidationRules};

/// Why an action was refused. Never fatal: the session carries on.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RouteError {
    #[error("Path collides with existing geometry")]
    GeometryRejected(Option<Collision>),
    #[error("Refusing to merge net {absorbed} into {kept}")]
    IncompatibleNetMerge { kept: NetId, absorbed: NetId },
    #[error("Target is the start point")]
    DegenerateTarget,
    #[error("Routing canceled")]
    CancelRequested,
    #[error("Cannot change layer from {0}")]
    LayerSwitchUnavailable(LayerId),
    #[error("Board rejected the change: {0}")]
    Model(#[from] ModelError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Button {
    #[default]
    Primary,
    Secondary,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RouterKey {
    ToggleBend,
    FlipDogleg,
    CycleAngleSet,
    /// Request (or withdraw) a via at the next free-point commit.
    InsertVia,
    SwitchLayer,
    Cancel,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouterEvent {
    Begin { at: Coord },
    Motion { at: Coord },
    Click { at: Coord, button: Button },
    Key(RouterKey),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Idle,
    Routing,
    /// Routing with bend mode on.
    Bending,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", content = "handles", rename_all = "snake_case")]
pub enum Outcome {
    /// Nothing to do in the current state.
    Ignored,
    Started,
    Updated,
    /// Committed a leg; routing continues from its far end.
    Committed(CommitHandles),
    /// Landed on an existing item; every leg of the gesture.
    Finished(Vec<CommitHandles>),
    Refused,
    Canceled,
}

/// What the host needs after one event.
#[derive(Debug, Clone, PartialEq)]
pub struct Effects {
    pub phase: Phase,
    pub outcome: Outcome,
    /// Last path that passed validation.
    pub tentative: CandidatePath,
    /// Path proposed for the current cursor, valid or not.
    pub candidate: CandidatePath,
    pub valid: bool,
    pub layer: LayerId,
    pub notice: Option<RouteError>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RouterState {
    Idle,
    Routing(RoutingSession),
}

pub struct Router {
    config: RouterConfig,
    rules: ValidationRules,
    state: RouterState,
    cache: ObstacleCache,
    layer: LayerId,
    mode: RouteMode,
}

impl Router {
    pub fn new(config: RouterConfig) -> Self {
        let layer = config.layers.ids().next().unwrap_or(LayerId::FRONT);
        Self {
            rules: ValidationRules::from(&config),
            mode: config.initial_mode(),
            state: RouterState::Idle,
            cache: ObstacleCache::new(),
            layer,
            config,
        }
    }

    pub fn config(&self) -> &RouterConfig {
        &self.config
    }

    pub fn state(&self) -> &RouterState {
        &self.state
    }

    pub fn session(&self) -> Option<&RoutingSession> {
        match &self.state {
            RouterState::Idle => None,
            RouterState::Routing(s) => Some(s),
        }
    }

    pub fn phase(&self) -> Phase {
        match &self.state {
            RouterState::Idle => Phase::Idle,
            RouterState::Routing(s) if s.mode.bend => Phase::Bending,
            RouterState::Routing(_) => Phase::Routing,
        }
    }

    /// Layer new gestures start on.
    pub fn active_layer(&self) -> LayerId {
        self.session().map_or(self.layer, |s| s.layer)
    }

    pub fn set_active_layer(&mut self, layer: LayerId) {
        if self.config.layers.is_copper(layer) {
            self.layer = layer;
        }
    }

    pub fn obstacle_builds(&self) -> usize {
        self.cache.builds()
    }

    pub fn update<D: DocumentModel + ?Sized>(&mut self, doc: &mut D, event: RouterEvent) -> Effects {
        let state = std::mem::replace(&mut self.state, RouterState::Idle);
        let (state, outcome, notice) = match state {
            RouterState::Idle => self.idle(doc, event),
            RouterState::Routing(session) => self.routing(doc, session, event),
        };
        self.state = state;
        self.effects(outcome, notice)
    }

    fn idle<D: DocumentModel + ?Sized>(
        &mut self,
        doc: &mut D,
        event: RouterEvent,
    ) -> (RouterState, Outcome, Option<RouteError>) {
        match event {
            RouterEvent::Begin { at }
            | RouterEvent::Click { at, button: Button::Primary } => {
                let origin = doc.hit_test(at, self.layer);
                tracing::info!("Routing from {:?} at {} on {}", origin.item(), origin.position(), self.layer);
                let session = RoutingSession::begin(origin, self.layer, self.mode, doc.mark());
                let session = self.aim(&*doc, session, at);
                (RouterState::Routing(session), Outcome::Started, None)
            }
            _ => (RouterState::Idle, Outcome::Ignored, None),
        }
    }

    fn routing<D: DocumentModel + ?Sized>(
        &mut self,
        doc: &mut D,
        session: RoutingSession,
        event: RouterEvent,
    ) -> (RouterState, Outcome, Option<RouteError>) {
        match event {
            RouterEvent::Begin { .. } => (RouterState::Routing(session), Outcome::Ignored, None),
            RouterEvent::Motion { at } => {
                let session = self.aim(&*doc, session, at);
                (RouterState::Routing(session), Outcome::Updated, None)
            }
            RouterEvent::Click { button: Button::Secondary, .. } | RouterEvent::Key(RouterKey::Cancel) => {
                self.cancel(doc, session)
            }
            RouterEvent::Click { at, button: Button::Primary } => self.click(doc, session, at),
            RouterEvent::Key(key) => self.key(&*doc, session, key),
        }
    }

    fn key<D: DocumentModel + ?Sized>(
        &mut self,
        doc: &D,
        session: RoutingSession,
        key: RouterKey,
    ) -> (RouterState, Outcome, Option<RouteError>) {
        let mut next = session.clone();
        match key {
            RouterKey::ToggleBend => next.mode = next.mode.toggle_bend(),
            RouterKey::FlipDogleg => next.mode = next.mode.flip(),
            RouterKey::CycleAngleSet => next.mode = next.mode.cycle_angles(),
            RouterKey::InsertVia => {
                if self.config.layers.next_copper(next.layer).is_none() {
                    let notice = RouteError::LayerSwitchUnavailable(next.layer);
                    return (RouterState::Routing(session), Outcome::Refused, Some(notice));
                }
                next.pending_via = !next.pending_via;
            }
            RouterKey::SwitchLayer => {
                let to = self.config.layers.next_copper(next.layer);
                match to {
                    Some(layer) if next.can_switch_layer() => {
                        tracing::debug!("Switching layer {} -> {}", next.layer, layer);
                        next.layer = layer;
                        next.pending_via = false;
                        next.known_good = CandidatePath::empty();
                    }
                    _ => {
                        let notice = RouteError::LayerSwitchUnavailable(next.layer);
                        return (RouterState::Routing(session), Outcome::Refused, Some(notice));
                    }
                }
            }
            RouterKey::Cancel => return (RouterState::Routing(session), Outcome::Ignored, None),
        }
        self.mode = RouteMode { flipped: false, ..next.mode };
        let cursor = next.cursor;
        let next = self.aim(doc, next, cursor);
        (RouterState::Routing(next), Outcome::Updated, None)
    }

    fn click<D: DocumentModel + ?Sized>(
        &mut self,
        doc: &mut D,
        session: RoutingSession,
        at: Coord,
    ) -> (RouterState, Outcome, Option<RouteError>) {
        let session = self.aim(&*doc, session, at);
        if session.candidate.is_empty() {
            return (RouterState::Routing(session), Outcome::Refused, Some(RouteError::DegenerateTarget));
        }
        if !session.valid {
            let collision = self.first_collision(&*doc, &session);
            return (
                RouterState::Routing(session),
                Outcome::Refused,
                Some(RouteError::GeometryRejected(collision)),
            );
        }

        let target = session.target.clone();
        tracing::debug!("Committing {} segments to {:?}", session.candidate.segment_count(), target.item());
        let result = commit(doc, &session, &session.candidate, &target, &self.config);

        match result {
            Ok(handles) if target.is_existing() => {
                let mut legs = session.committed.clone();
                legs.push(handles);
                doc.settle(session.mark);
                tracing::info!("Routing finished after {} legs", legs.len());
                (RouterState::Idle, Outcome::Finished(legs), None)
            }
            Ok(handles) => {
                let layer = session.candidate.via().map_or(session.layer, |v| v.to);
                let next = session.continued(handles.clone(), layer);
                let next = self.aim(&*doc, next, at);
                (RouterState::Routing(next), Outcome::Committed(handles), None)
            }
            Err(e) => (RouterState::Routing(session), Outcome::Refused, Some(e)),
        }
    }

    fn cancel<D: DocumentModel + ?Sized>(
        &mut self,
        doc: &mut D,
        session: RoutingSession,
    ) -> (RouterState, Outcome, Option<RouteError>) {
        doc.rollback_to(session.mark);
        tracing::info!("Routing canceled, {} legs rolled back", session.committed.len());
        (RouterState::Idle, Outcome::Canceled, Some(RouteError::CancelRequested))
    }

    /// Re-target `session` at `cursor`: hit test, propose, validate.
    fn aim<D: DocumentModel + ?Sized>(&mut self, doc: &D, session: RoutingSession, cursor: Coord) -> RoutingSession {
        let mut next = session;
        next.cursor = cursor;
        next.target = next.aim(doc.hit_test(cursor, next.layer), cursor);

        let mut candidate = propose(next.start.position(), next.target.position(), &next.mode, next.layer);
        if next.pending_via && !next.target.is_existing() {
            if let Some(to) = self.config.layers.next_copper(next.layer) {
                candidate = candidate.with_via(to);
            }
        }

        let sets = self.obstacles(doc, &next, &candidate);
        let refs: Vec<&ObstacleSet> = sets.iter().map(|s| s.as_ref()).collect();
        let verdict = validate(&candidate, &refs, &next.known_good, &self.rules, &next.allowance());
        next.valid = verdict.accepted;
        next.known_good = verdict.known_good;
        next.candidate = candidate;
        next
    }

    fn obstacles<D: DocumentModel + ?Sized>(
        &mut self,
        doc: &D,
        session: &RoutingSession,
        candidate: &CandidatePath,
    ) -> Vec<std::rc::Rc<ObstacleSet>> {
        let excluding = session.exclusions();
        let kernel = self.rules.kernel;
        candidate
            .copper_layers()
            .into_iter()
            .map(|layer| self.cache.get(doc, layer, session.net, &excluding, &kernel))
            .collect()
    }

    fn first_collision<D: DocumentModel + ?Sized>(&mut self, doc: &D, session: &RoutingSession) -> Option<Collision> {
        let sets = self.obstacles(doc, session, &session.candidate);
        let refs: Vec<&ObstacleSet> = sets.iter().map(|s| s.as_ref()).collect();
        validate(&session.candidate, &refs, &session.known_good, &self.rules, &session.allowance()).collision
    }

    fn effects(&self, outcome: Outcome, notice: Option<RouteError>) -> Effects {
        match self.session() {
            Some(s) => Effects {
                phase: self.phase(),
                outcome,
                tentative: s.known_good.clone(),
                candidate: s.candidate.clone(),
                valid: s.valid,
                layer: s.layer,
                notice,
            },
            None => Effects {
                phase: Phase::Idle,
                outcome,
                tentative: CandidatePath::empty(),
                candidate: CandidatePath::empty(),
                valid: true,
                layer: self.layer,
                notice,
            },
        }
    }
}

impl Default for Router {
    fn default() -> Self {
        Self::new(RouterConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::Board;

    fn click(at: Coord) -> RouterEvent {
        RouterEvent::Click { at, button: Button::Primary }
    }

    #[test]
    fn test_phase_follows_gesture() {
        let mut board = Board::new("phases");
        let mut router = Router::default();
        assert_eq!(router.phase(), Phase::Idle);

        let effects = router.update(&mut board, RouterEvent::Begin { at: Coord::from_mm(0.0, 0.0) });
        assert_eq!(effects.phase, Phase::Routing);
        let effects = router.update(&mut board, RouterEvent::Key(RouterKey::ToggleBend));
        assert_eq!(effects.phase, Phase::Bending);

        let effects = router.update(&mut board, click(Coord::from_mm(10.0, 5.0)));
        assert!(matches!(effects.outcome, Outcome::Committed(_)));
        assert_eq!(effects.phase, Phase::Bending);
        assert!(matches!(router.state(), RouterState::Routing(_)));
        assert_eq!(board.tracks().count(), 2);

        let effects = router.update(&mut board, RouterEvent::Key(RouterKey::Cancel));
        assert_eq!(effects.outcome, Outcome::Canceled);
        assert_eq!(effects.phase, Phase::Idle);
        assert!(router.session().is_none());
        assert_eq!(board.tracks().count(), 0);
    }

    #[test]
    fn test_mode_carries_into_next_gesture() {
        let mut board = Board::new("modes");
        let mut router = Router::default();

        router.update(&mut board, RouterEvent::Begin { at: Coord::from_mm(0.0, 0.0) });
        router.update(&mut board, RouterEvent::Key(RouterKey::ToggleBend));
        router.update(&mut board, RouterEvent::Key(RouterKey::FlipDogleg));
        assert_eq!(router.session().map(|s| s.mode.flipped), Some(true));
        router.update(&mut board, RouterEvent::Key(RouterKey::Cancel));

        let effects = router.update(&mut board, RouterEvent::Begin { at: Coord::from_mm(5.0, 5.0) });
        assert_eq!(effects.phase, Phase::Bending);
        assert_eq!(router.session().map(|s| s.mode.flipped), Some(false));
    }

    #[test]
    fn test_events_ignored_while_idle() {
        let mut board = Board::new("idle");
        let mut router = Router::default();
        for event in [
            RouterEvent::Motion { at: Coord::from_mm(1.0, 1.0) },
            RouterEvent::Key(RouterKey::InsertVia),
            RouterEvent::Click { at: Coord::from_mm(1.0, 1.0), button: Button::Secondary },
        ] {
            let effects = router.update(&mut board, event);
            assert_eq!(effects.outcome, Outcome::Ignored);
            assert_eq!(effects.phase, Phase::Idle);
        }
        assert_eq!(board.revision(), 0);
    }
}
