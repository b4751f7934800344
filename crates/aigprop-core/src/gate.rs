//! Gate categories of an And-Inverter Graph.
//!
//! [`GateType`] is a closed enumeration. The propagation engine maps each
//! non-input variant to its own aggregation/update capabilities through a
//! binding table, so adding a category means extending this enum and
//! supplying a binding for it.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::GraphError;

/// Category of a circuit node.
///
/// Numeric codes follow the circuit dataset convention used by the
/// descriptor producers: `0 = PI`, `1 = AND`, `2 = NOT`, `3 = XOR`.
/// Serializes as a snake_case name; deserializes from a name or a code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", try_from = "GateRepr")]
pub enum GateType {
    /// External circuit input; no fan-in, always at forward level 0.
    PrimaryInput,
    /// Two-input conjunction.
    And,
    /// Inversion; one input in well-formed AIGs.
    Not,
    /// Exclusive or. Experimental extension, unbound by default.
    Xor,
}

impl GateType {
    /// All gate types in code order.
    pub const ALL: [GateType; 4] = [
        GateType::PrimaryInput,
        GateType::And,
        GateType::Not,
        GateType::Xor,
    ];

    /// Returns the dataset code for this gate type.
    pub fn code(self) -> u8 {
        match self {
            GateType::PrimaryInput => 0,
            GateType::And => 1,
            GateType::Not => 2,
            GateType::Xor => 3,
        }
    }

    /// Parses a dataset gate code.
    pub fn from_code(code: u8) -> Result<Self, GraphError> {
        GateType::ALL
            .into_iter()
            .find(|g| g.code() == code)
            .ok_or(GraphError::UnknownGateCode { code })
    }

    /// Parses a serialized (`primary_input`) or short (`pi`) gate name.
    pub fn from_name(name: &str) -> Result<Self, GraphError> {
        match name {
            "primary_input" => Ok(GateType::PrimaryInput),
            _ => GateType::ALL
                .into_iter()
                .find(|g| g.name() == name)
                .ok_or_else(|| GraphError::UnknownGateName {
                    name: name.to_string(),
                }),
        }
    }

    /// Returns `true` for primary inputs.
    pub fn is_input(self) -> bool {
        matches!(self, GateType::PrimaryInput)
    }

    /// Short lowercase name, also used in logs and trace entries.
    pub fn name(self) -> &'static str {
        match self {
            GateType::PrimaryInput => "pi",
            GateType::And => "and",
            GateType::Not => "not",
            GateType::Xor => "xor",
        }
    }
}

/// Wire forms accepted for a gate: dataset code or name.
#[derive(Deserialize)]
#[serde(untagged)]
enum GateRepr {
    Code(u8),
    Name(String),
}

impl TryFrom<GateRepr> for GateType {
    type Error = GraphError;

    fn try_from(repr: GateRepr) -> Result<Self, GraphError> {
        match repr {
            GateRepr::Code(code) => GateType::from_code(code),
            GateRepr::Name(name) => GateType::from_name(&name),
        }
    }
}

impl fmt::Display for GateType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
