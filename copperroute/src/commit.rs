//! Commit writer
//!
//! Turns a confirmed candidate into junctions, tracks and an optional via.
//! All mutations of one commit happen between a journal mark and either
//! success or a rollback to that mark, so a refused commit leaves the
//! board untouched.

use serde::Serialize;

use crate::board::{DocumentModel, Endpoint, ItemRef, JunctionId, NetId, PadId, Terminal, TrackId, ViaId};
use crate::candidate::CandidatePath;
use crate::config::{MergePolicy, RouterConfig};
use crate::router::RouteError;
use crate::session::RoutingSession;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct NetMerge {
    pub kept: NetId,
    pub absorbed: NetId,
}

/// Everything one commit put on the board.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommitHandles {
    pub net: NetId,
    /// Junction created under a free-point start.
    pub anchor: Option<JunctionId>,
    /// Interior junctions, then the far junction when the path ended in
    /// empty space without a via.
    pub junctions: Vec<JunctionId>,
    pub tracks: Vec<TrackId>,
    pub via: Option<ViaId>,
    /// Previously unconnected pads now carrying `net`.
    pub assigned_pads: Vec<PadId>,
    pub merged: Option<NetMerge>,
    /// Where routing continues from.
    pub far_end: Endpoint,
}

impl CommitHandles {
    /// Items this commit created.
    pub fn items(&self) -> Vec<ItemRef> {
        self.anchor
            .iter()
            .chain(&self.junctions)
            .map(|&j| ItemRef::Junction(j))
            .chain(self.tracks.iter().map(|&t| ItemRef::Track(t)))
            .chain(self.via.iter().map(|&v| ItemRef::Via(v)))
            .collect()
    }
}

/// Net the committed copper will carry, and the merge that requires.
///
/// Two different nets merge into the numerically smaller id, so the result
/// does not depend on routing direction.
pub fn resolve_net<D: DocumentModel + ?Sized>(
    doc: &D,
    start: Option<NetId>,
    target: Option<NetId>,
    policy: &MergePolicy,
) -> Result<(Option<NetId>, Option<NetMerge>), RouteError> {
    match (start, target) {
        (Some(a), Some(b)) if a != b => {
            let kept = a.min(b);
            let absorbed = a.max(b);
            let power = [a, b]
                .iter()
                .any(|&n| doc.net(n).is_some_and(|net| net.is_power()));
            if !policy.allow_merge || (policy.protect_power_nets && power) {
                return Err(RouteError::IncompatibleNetMerge { kept, absorbed });
            }
            Ok((Some(kept), Some(NetMerge { kept, absorbed })))
        }
        (Some(a), _) => Ok((Some(a), None)),
        (None, b) => Ok((b, None)),
    }
}

/// Write `confirmed` to the board, ending at `target`.
///
/// On error every mutation made by this call is rolled back.
pub fn commit<D: DocumentModel + ?Sized>(
    doc: &mut D,
    session: &RoutingSession,
    confirmed: &CandidatePath,
    target: &Endpoint,
    config: &RouterConfig,
) -> Result<CommitHandles, RouteError> {
    if confirmed.is_empty() {
        return Err(RouteError::DegenerateTarget);
    }
    let mark = doc.mark();
    match write(doc, session, confirmed, target, config) {
        Ok(handles) => {
            tracing::info!(
                "Committed {} tracks on {} ending at {}",
                handles.tracks.len(),
                handles.net,
                handles.far_end.position()
            );
            Ok(handles)
        }
        Err(e) => {
            doc.rollback_to(mark);
            tracing::debug!("Commit refused: {}", e);
            Err(e)
        }
    }
}

fn write<D: DocumentModel + ?Sized>(
    doc: &mut D,
    session: &RoutingSession,
    confirmed: &CandidatePath,
    target: &Endpoint,
    config: &RouterConfig,
) -> Result<CommitHandles, RouteError> {
    let start_net = session.net.or_else(|| session.start.net());
    let (resolved, merged) = resolve_net(doc, start_net, target.net(), &config.merge)?;
    let net = match resolved {
        Some(net) => net,
        None => doc.allocate_net(),
    };
    if let Some(m) = merged {
        doc.merge_nets(m.kept, m.absorbed)?;
    }

    let layers = confirmed.layers();
    let first_layer = layers.first().copied().ok_or(RouteError::DegenerateTarget)?;
    let last_layer = layers.last().copied().unwrap_or(first_layer);
    let mut assigned_pads = Vec::new();

    let mut anchor = None;
    let start = match &session.start {
        Endpoint::FreePoint { at } => {
            let id = doc.insert_junction(*at, net, first_layer)?;
            anchor = Some(id);
            Terminal::Junction(id)
        }
        Endpoint::Pad { pad, net: None, .. } => {
            doc.assign_pad_net(*pad, net)?;
            assigned_pads.push(*pad);
            Terminal::Pad(*pad)
        }
        existing => existing.terminal().ok_or(RouteError::DegenerateTarget)?,
    };

    let mut junctions = Vec::new();
    let mut chain = vec![start];
    for (i, &point) in confirmed.interior().iter().enumerate() {
        let id = doc.insert_junction(point, net, layers[i])?;
        junctions.push(id);
        chain.push(Terminal::Junction(id));
    }

    let end = confirmed.end().ok_or(RouteError::DegenerateTarget)?;
    let mut via = None;
    let far_end = match target {
        Endpoint::FreePoint { .. } => match confirmed.via() {
            Some(plan) => {
                let id = doc.insert_via(plan.at, net, (plan.from, plan.to), &config.via)?;
                via = Some(id);
                chain.push(Terminal::Via(id));
                Endpoint::Via { via: id, at: plan.at, net }
            }
            None => {
                let id = doc.insert_junction(end, net, last_layer)?;
                junctions.push(id);
                chain.push(Terminal::Junction(id));
                Endpoint::Junction { junction: id, at: end, net }
            }
        },
        Endpoint::Pad { pad, net: None, .. } => {
            doc.assign_pad_net(*pad, net)?;
            assigned_pads.push(*pad);
            chain.push(Terminal::Pad(*pad));
            target.clone()
        }
        existing => {
            chain.push(existing.terminal().ok_or(RouteError::DegenerateTarget)?);
            existing.clone()
        }
    };

    let mut tracks = Vec::with_capacity(layers.len());
    for (pair, &layer) in chain.windows(2).zip(layers) {
        tracks.push(doc.insert_track(pair[0], pair[1], net, layer, config.track_width)?);
    }

    Ok(CommitHandles {
        net,
        anchor,
        junctions,
        tracks,
        via,
        assigned_pads,
        merged,
        far_end: with_net(far_end, net),
    })
}

/// Endpoint as it reads after the commit retagged it.
fn with_net(endpoint: Endpoint, resolved: NetId) -> Endpoint {
    match endpoint {
        Endpoint::Pad { pad, component, at, through, .. } => Endpoint::Pad {
            pad,
            component,
            at,
            net: Some(resolved),
            through,
        },
        Endpoint::Junction { junction, at, .. } => Endpoint::Junction { junction, at, net: resolved },
        Endpoint::Via { via, at, .. } => Endpoint::Via { via, at, net: resolved },
        free @ Endpoint::FreePoint { .. } => free,
    }
}
