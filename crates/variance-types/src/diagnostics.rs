use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::{Type, TypeError};

/// Why a check was rejected or flagged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReasonCode {
    /// No subtyping rule relates the two types.
    NoRelation,
    /// A non-`null` write through an `? extends` (or `?`) capture.
    ExtendsWriteViolation,
    /// A read through `? super` that only yields the upper bound.
    SuperReadWidened,
    /// A member that both consumes and produces its value, accessed through a strict capture range.
    InvariantPositionUnderWildcard,
    /// The check only succeeded because a raw type skipped argument verification.
    RawUncheckedMatch,
    /// Runtime store of a value the array's creation-time element type does not admit.
    ArrayStoreViolation,
    /// A bound graph with no fixed point.
    CyclicBound,
    /// Capture produced a variable whose lower bound exceeds its upper bound.
    CaptureFailure,
    /// A wildcard used as an explicit type argument of a generic method.
    WildcardTypeArgument,
    /// Array creation with a non-reifiable element type.
    GenericArrayCreation,
    /// Runtime type test against a non-reifiable type.
    NonReifiableInstanceOf,
    /// Runtime cast of an erased array to an incompatible array type.
    ClassCastFault,
    /// The receiver has no member with the requested name.
    UnknownMember,
    /// Unknown class, arity mismatch or misplaced wildcard.
    IllFormedType,
}

impl ReasonCode {
    /// Stable identifier used in rendered diagnostics.
    pub fn code(self) -> &'static str {
        match self {
            ReasonCode::NoRelation => "VAR_NO_RELATION",
            ReasonCode::ExtendsWriteViolation => "VAR_EXTENDS_WRITE",
            ReasonCode::SuperReadWidened => "VAR_SUPER_READ_WIDENED",
            ReasonCode::InvariantPositionUnderWildcard => "VAR_INVARIANT_UNDER_WILDCARD",
            ReasonCode::RawUncheckedMatch => "VAR_RAW_UNCHECKED",
            ReasonCode::ArrayStoreViolation => "VAR_ARRAY_STORE",
            ReasonCode::CyclicBound => "VAR_CYCLIC_BOUND",
            ReasonCode::CaptureFailure => "VAR_CAPTURE_FAILURE",
            ReasonCode::WildcardTypeArgument => "VAR_WILDCARD_TYPE_ARG",
            ReasonCode::GenericArrayCreation => "VAR_GENERIC_ARRAY",
            ReasonCode::NonReifiableInstanceOf => "VAR_NON_REIFIABLE_INSTANCEOF",
            ReasonCode::ClassCastFault => "VAR_CLASS_CAST",
            ReasonCode::UnknownMember => "VAR_UNKNOWN_MEMBER",
            ReasonCode::IllFormedType => "VAR_ILL_FORMED",
        }
    }

    /// Whether a host policy may downgrade or silence this reason.
    pub fn is_configurable(self) -> bool {
        matches!(
            self,
            ReasonCode::RawUncheckedMatch | ReasonCode::SuperReadWidened
        )
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Error,
    Warning,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub reason: ReasonCode,
    pub message: String,
}

impl Diagnostic {
    pub fn error(reason: ReasonCode, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            reason,
            message: message.into(),
        }
    }

    pub fn warning(reason: ReasonCode, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            reason,
            message: message.into(),
        }
    }

    pub fn code(&self) -> &'static str {
        self.reason.code()
    }
}

impl From<TypeError> for Diagnostic {
    fn from(err: TypeError) -> Self {
        Diagnostic::error(err.reason(), err.to_string())
    }
}

/// Outcome of a check.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Verdict {
    /// The operation is accepted; `ty` is its static result type.
    Accept { ty: Type, warnings: Vec<Diagnostic> },
    Reject(Diagnostic),
}

impl Verdict {
    pub fn accept(ty: Type) -> Self {
        Verdict::Accept {
            ty,
            warnings: Vec::new(),
        }
    }

    pub fn reject(reason: ReasonCode, message: impl Into<String>) -> Self {
        Verdict::Reject(Diagnostic::error(reason, message))
    }

    /// Attach a warning to an accepted verdict. Rejections are returned unchanged.
    pub fn with_warning(mut self, warning: Diagnostic) -> Self {
        if let Verdict::Accept { warnings, .. } = &mut self {
            warnings.push(warning);
        }
        self
    }

    pub fn is_accept(&self) -> bool {
        matches!(self, Verdict::Accept { .. })
    }

    pub fn is_reject(&self) -> bool {
        matches!(self, Verdict::Reject(_))
    }

    pub fn ty(&self) -> Option<&Type> {
        match self {
            Verdict::Accept { ty, .. } => Some(ty),
            Verdict::Reject(_) => None,
        }
    }

    /// Reason of a rejection.
    pub fn rejection(&self) -> Option<ReasonCode> {
        match self {
            Verdict::Reject(diag) => Some(diag.reason),
            Verdict::Accept { .. } => None,
        }
    }

    pub fn warnings(&self) -> &[Diagnostic] {
        match self {
            Verdict::Accept { warnings, .. } => warnings,
            Verdict::Reject(_) => &[],
        }
    }

    pub fn has_warning(&self, reason: ReasonCode) -> bool {
        self.warnings().iter().any(|w| w.reason == reason)
    }

    /// Chain a dependent check, carrying warnings collected so far into its result.
    pub fn and_then(self, next: impl FnOnce(Type) -> Verdict) -> Verdict {
        match self {
            Verdict::Accept { ty, warnings } => match next(ty) {
                Verdict::Accept {
                    ty,
                    warnings: later,
                } => {
                    let mut all = warnings;
                    all.extend(later);
                    Verdict::Accept { ty, warnings: all }
                }
                reject => reject,
            },
            reject => reject,
        }
    }
}

impl From<TypeError> for Verdict {
    fn from(err: TypeError) -> Self {
        Verdict::Reject(err.into())
    }
}

/// How a host treats a configurable finding.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    /// Drop the finding.
    Allow,
    /// Keep the finding as a warning on an accepted verdict.
    #[default]
    Warn,
    /// Turn the finding into a rejection.
    Deny,
}

/// Host policy for the two findings that are not always hard rejects.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
#[schemars(deny_unknown_fields)]
pub struct Policy {
    /// Treatment of matches that only succeed through a raw type or an unchecked cast.
    #[serde(default)]
    pub raw_unchecked: Level,
    /// Treatment of reads through `? super` that widen to the upper bound.
    #[serde(default)]
    pub super_read_widened: Level,
}

impl Policy {
    /// Every configurable finding becomes a rejection.
    pub fn strict() -> Self {
        Self {
            raw_unchecked: Level::Deny,
            super_read_widened: Level::Deny,
        }
    }

    pub fn level(&self, reason: ReasonCode) -> Level {
        match reason {
            ReasonCode::RawUncheckedMatch => self.raw_unchecked,
            ReasonCode::SuperReadWidened => self.super_read_widened,
            _ => Level::Deny,
        }
    }

    /// Apply the policy to a verdict produced by any check in this crate.
    pub fn apply(&self, verdict: Verdict) -> Verdict {
        let Verdict::Accept { ty, warnings } = verdict else {
            return verdict;
        };

        let mut kept = Vec::with_capacity(warnings.len());
        for warning in warnings {
            match self.level(warning.reason) {
                Level::Allow => {}
                Level::Warn => kept.push(warning),
                Level::Deny => {
                    tracing::debug!(
                        target: crate::TRACE_TARGET,
                        code = warning.code(),
                        "policy promoted warning to rejection"
                    );
                    return Verdict::Reject(Diagnostic {
                        severity: Severity::Error,
                        ..warning
                    });
                }
            }
        }

        Verdict::Accept { ty, warnings: kept }
    }
}
