use serde::{Deserialize, Serialize};

use super::NetId;
use crate::geometry::{mm, Nm};
use crate::layers::LayerId;

/// One clearance override. Unset fields match anything.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClearanceRule {
    #[serde(default)]
    pub net: Option<NetId>,
    #[serde(default)]
    pub layer: Option<LayerId>,
    pub clearance: Nm,
}

impl ClearanceRule {
    fn matches(&self, net: Option<NetId>, layer: LayerId) -> bool {
        let net_ok = match self.net {
            Some(n) => net == Some(n),
            None => true,
        };
        let layer_ok = self.layer.map_or(true, |l| l == layer);
        net_ok && layer_ok
    }

    /// net+layer beats net beats layer.
    fn specificity(&self) -> u8 {
        (self.net.is_some() as u8) * 2 + self.layer.is_some() as u8
    }
}

/// Clearance lookup. Total: falls back to `default` when nothing matches.
///
/// Among matching rules the most specific wins; ties go to the rule listed
/// first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClearanceRules {
    pub default: Nm,
    #[serde(default)]
    pub rules: Vec<ClearanceRule>,
}

impl Default for ClearanceRules {
    fn default() -> Self {
        Self {
            default: mm(0.2),
            rules: Vec::new(),
        }
    }
}

impl ClearanceRules {
    pub fn resolve(&self, net: Option<NetId>, layer: LayerId) -> Nm {
        let mut best: Option<&ClearanceRule> = None;
        for rule in self.rules.iter().filter(|r| r.matches(net, layer)) {
            if best.map_or(true, |b| rule.specificity() > b.specificity()) {
                best = Some(rule);
            }
        }
        best.map_or(self.default, |r| r.clearance)
    }

    /// Net references after `absorb` was merged into `keep`.
    pub(crate) fn retarget(&mut self, absorb: NetId, keep: NetId) {
        for rule in &mut self.rules {
            if rule.net == Some(absorb) {
                rule.net = Some(keep);
            }
        }
    }
}
