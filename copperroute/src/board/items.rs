use serde::{Deserialize, Serialize};

use super::{ComponentId, JunctionId, KeepoutId, NetId, PadId, PourId, Terminal, TrackId, ViaId};
use crate::geometry::{Coord, Nm, Polygon, Shape};
use crate::layers::LayerId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NetClass {
    #[default]
    Signal,
    /// Power or ground distribution; protected from merges by default.
    Power,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Net {
    pub id: NetId,
    pub name: String,
    #[serde(default)]
    pub class: NetClass,
}

impl Net {
    pub fn new(id: NetId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            class: NetClass::Signal,
        }
    }

    pub fn with_class(mut self, class: NetClass) -> Self {
        self.class = class;
        self
    }

    /// Power net by class or by a recognisable supply/ground name.
    pub fn is_power(&self) -> bool {
        self.class == NetClass::Power || looks_like_power(&self.name)
    }
}

fn looks_like_power(name: &str) -> bool {
    let upper = name.trim_start_matches(['+', '-', '/']).to_uppercase();
    const KEYWORDS: [&str; 14] = [
        "VCC", "VDD", "VSS", "VEE", "GND", "AGND", "DGND", "PGND", "VBAT", "VBUS", "VIN",
        "VCORE", "VREF", "VDDIO",
    ];
    if KEYWORDS.iter().any(|k| upper == *k || upper.starts_with(&format!("{k}_"))) {
        return true;
    }
    // Rail names: 3V3, 1V8, 5V, 12V, 3.3V
    let digits_then_v = upper
        .find('V')
        .filter(|&i| i > 0)
        .map(|i| {
            let (head, tail) = upper.split_at(i);
            head.chars().all(|c| c.is_ascii_digit() || c == '.')
                && tail[1..].chars().all(|c| c.is_ascii_digit())
        })
        .unwrap_or(false);
    digits_then_v
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Component {
    pub id: ComponentId,
    pub reference: String,
    /// Courtyard outline in board coordinates, on `layer`.
    #[serde(default)]
    pub courtyard: Option<Polygon>,
    pub layer: LayerId,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pad {
    pub id: PadId,
    pub component: ComponentId,
    pub number: String,
    /// Land in board coordinates.
    pub land: Shape,
    pub layers: Vec<LayerId>,
    #[serde(default)]
    pub net: Option<NetId>,
    /// Plated through hole (present on every copper layer).
    #[serde(default)]
    pub through: bool,
}

impl Pad {
    pub fn position(&self) -> Coord {
        self.land.center()
    }

    pub fn on_layer(&self, layer: LayerId) -> bool {
        self.through || self.layers.contains(&layer)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Junction {
    pub id: JunctionId,
    pub position: Coord,
    pub net: NetId,
    pub layer: LayerId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Track {
    pub id: TrackId,
    pub from: Terminal,
    pub to: Terminal,
    pub net: NetId,
    pub layer: LayerId,
    pub width: Nm,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Via {
    pub id: ViaId,
    pub position: Coord,
    pub net: NetId,
    /// Outermost layers connected, in stackup order.
    pub span: (LayerId, LayerId),
    pub diameter: Nm,
    pub drill: Nm,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Keepout {
    pub id: KeepoutId,
    pub layers: Vec<LayerId>,
    pub outline: Polygon,
}

/// Filled copper area (zone fill) of one net on one layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CopperPour {
    pub id: PourId,
    pub net: Option<NetId>,
    pub layer: LayerId,
    pub outline: Polygon,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_power_net_detection() {
        for name in ["GND", "+3V3", "VCC", "1V8", "12V", "3.3V", "VDD_CORE", "vbus"] {
            assert!(Net::new(NetId(1), name).is_power(), "{name} should be power");
        }
        for name in ["SDA", "Net-(U1-Pad3)", "CLK", "V", "LED_V1"] {
            assert!(!Net::new(NetId(1), name).is_power(), "{name} should be signal");
        }
    }

    #[test]
    fn test_explicit_power_class() {
        let net = Net::new(NetId(4), "RAIL_A").with_class(NetClass::Power);
        assert!(net.is_power());
    }
}
