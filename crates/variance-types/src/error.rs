use thiserror::Error;

use crate::{ClassId, ReasonCode, TypeVarId};

/// Construction-time failures of a type tree or class signature.
///
/// These are fatal to the tree they describe: no subtype check should run on a tree that
/// produced one. Each error maps onto the [`ReasonCode`] reported to hosts.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TypeError {
    #[error("cyclic bound: type parameter `{param}` is bounded by itself")]
    CyclicBound { param: String },
    #[error("unknown class {0:?}")]
    UnknownClass(ClassId),
    #[error("unknown type parameter {0:?}")]
    UnknownTypeParam(TypeVarId),
    #[error("`{class}` expects {expected} type argument(s) but {found} were supplied")]
    ArityMismatch {
        class: String,
        expected: usize,
        found: usize,
    },
    #[error("a wildcard is only allowed as a type argument")]
    MisplacedWildcard,
    #[error("capture failed: lower bound `{lower}` is not a subtype of upper bound `{upper}`")]
    CaptureBoundViolation { lower: String, upper: String },
}

impl TypeError {
    pub fn reason(&self) -> ReasonCode {
        match self {
            TypeError::CyclicBound { .. } => ReasonCode::CyclicBound,
            TypeError::CaptureBoundViolation { .. } => ReasonCode::CaptureFailure,
            TypeError::UnknownClass(_)
            | TypeError::UnknownTypeParam(_)
            | TypeError::ArityMismatch { .. }
            | TypeError::MisplacedWildcard => ReasonCode::IllFormedType,
        }
    }
}
