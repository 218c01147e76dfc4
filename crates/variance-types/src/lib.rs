//! Variance and subtyping verifier for a nominally-typed language with generic classes,
//! bounded type parameters and use-site wildcards.
//!
//! The crate decides whether assignments, member accesses, generic calls and array operations are
//! type-safe, and reports the rule that was violated when they are not. Inputs are already
//! resolved type trees registered in a [`TypeStore`]; outputs are [`Verdict`]s.
//!
//! Checks never mutate the store. Capture conversion allocates its synthetic variables inside a
//! per-check [`TyContext`], so independent checks can run concurrently against a shared store.

use std::collections::HashMap;
use std::fmt;

mod access;
mod array;
mod call;
mod context;
mod conversion;
mod diagnostics;
mod error;
mod format;
mod store;
mod subtype;

pub use access::{check_access, check_member_access, lookup_member, ResolvedMember};
pub use array::{create_array, create_generic_array, is_reifiable, store_check, ArrayInstance};
pub use call::{check_generic_call, MethodDef};
pub use context::TyContext;
pub use conversion::{check_assignment, check_cast, check_instance_of};
pub use diagnostics::{Diagnostic, Level, Policy, ReasonCode, Severity, Verdict};
pub use error::TypeError;
pub use format::format_type;
pub use store::{check_well_formed, TypeStore};
pub use subtype::{
    erase, instantiate_as_supertype, is_subtype, relate, supertypes, Relation,
    DEFAULT_MAX_RELATION_DEPTH,
};

/// Tracing target used by every event emitted from this crate.
pub const TRACE_TARGET: &str = "variance.types";

#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClassId(u32);

impl ClassId {
    pub(crate) fn from_index(index: usize) -> Self {
        Self(u32::try_from(index).unwrap_or(u32::MAX))
    }

    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for ClassId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ClassId({})", self.0)
    }
}

/// Identifier of a declared or synthetic type variable.
///
/// Declared variables index into the [`TypeStore`]. Capture variables carry a marker bit and
/// index into the [`TyContext`] that allocated them; they are never valid outside that context.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeVarId(u32);

impl TypeVarId {
    const CONTEXT_LOCAL_BIT: u32 = 1 << 31;

    pub(crate) fn from_index(index: usize) -> Self {
        Self(u32::try_from(index).unwrap_or(u32::MAX) & !Self::CONTEXT_LOCAL_BIT)
    }

    pub(crate) fn index(self) -> usize {
        (self.0 & !Self::CONTEXT_LOCAL_BIT) as usize
    }

    pub(crate) fn new_context_local(index: u32) -> Self {
        Self(Self::CONTEXT_LOCAL_BIT | index)
    }

    /// Whether this variable was synthesized by capture conversion.
    pub fn is_capture(self) -> bool {
        (self.0 & Self::CONTEXT_LOCAL_BIT) != 0
    }
}

impl fmt::Debug for TypeVarId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_capture() {
            write!(f, "TypeVarId(cap {})", self.index())
        } else {
            write!(f, "TypeVarId({})", self.0)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveType {
    Boolean,
    Byte,
    Short,
    Char,
    Int,
    Long,
    Float,
    Double,
}

impl PrimitiveType {
    pub fn name(self) -> &'static str {
        match self {
            PrimitiveType::Boolean => "boolean",
            PrimitiveType::Byte => "byte",
            PrimitiveType::Short => "short",
            PrimitiveType::Char => "char",
            PrimitiveType::Int => "int",
            PrimitiveType::Long => "long",
            PrimitiveType::Float => "float",
            PrimitiveType::Double => "double",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ClassType {
    pub def: ClassId,
    pub args: Vec<Type>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum WildcardBound {
    Unbounded,
    Extends(Box<Type>),
    Super(Box<Type>),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Type {
    /// Universal supertype.
    Top,
    /// Bottom of the reference types: the type of `null`.
    Null,
    /// Result of a member that produces no value.
    Void,
    Primitive(PrimitiveType),
    /// A parameterized (or non-generic) nominal type.
    Class(ClassType),
    /// Erased use of a generic class.
    Raw(ClassId),
    TypeVar(TypeVarId),
    /// Only legal as a type argument of [`Type::Class`].
    Wildcard(WildcardBound),
    Array(Box<Type>),
}

impl Type {
    pub fn class(def: ClassId, args: Vec<Type>) -> Self {
        Type::Class(ClassType { def, args })
    }

    pub fn array(element: Type) -> Self {
        Type::Array(Box::new(element))
    }

    pub fn wildcard() -> Self {
        Type::Wildcard(WildcardBound::Unbounded)
    }

    pub fn extends(bound: Type) -> Self {
        Type::Wildcard(WildcardBound::Extends(Box::new(bound)))
    }

    pub fn super_of(bound: Type) -> Self {
        Type::Wildcard(WildcardBound::Super(Box::new(bound)))
    }

    pub fn is_primitive(&self) -> bool {
        matches!(self, Type::Primitive(_))
    }

    pub fn is_reference(&self) -> bool {
        !matches!(self, Type::Primitive(_) | Type::Void | Type::Wildcard(_))
    }

    pub fn is_wildcard(&self) -> bool {
        matches!(self, Type::Wildcard(_))
    }

    /// Whether any type variable occurs in this type.
    pub fn mentions_type_var(&self) -> bool {
        match self {
            Type::TypeVar(_) => true,
            Type::Class(ClassType { args, .. }) => args.iter().any(Type::mentions_type_var),
            Type::Wildcard(WildcardBound::Extends(bound))
            | Type::Wildcard(WildcardBound::Super(bound)) => bound.mentions_type_var(),
            Type::Array(elem) => elem.mentions_type_var(),
            _ => false,
        }
    }

    /// Whether a capture variable occurs in this type.
    pub fn mentions_capture(&self) -> bool {
        match self {
            Type::TypeVar(id) => id.is_capture(),
            Type::Class(ClassType { args, .. }) => args.iter().any(Type::mentions_capture),
            Type::Wildcard(WildcardBound::Extends(bound))
            | Type::Wildcard(WildcardBound::Super(bound)) => bound.mentions_capture(),
            Type::Array(elem) => elem.mentions_capture(),
            _ => false,
        }
    }
}

/// A declared or captured type variable.
///
/// `upper_bound` defaults to [`Type::Top`] and `lower_bound` to [`Type::Null`]. Only capture
/// variables produced from `? super B` carry a non-`Null` lower bound.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeParamDef {
    pub name: String,
    pub upper_bound: Type,
    pub lower_bound: Type,
}

impl TypeParamDef {
    pub fn new(name: impl Into<String>, upper_bound: Type) -> Self {
        Self {
            name: name.into(),
            upper_bound,
            lower_bound: Type::Null,
        }
    }

    pub fn has_lower_bound(&self) -> bool {
        self.lower_bound != Type::Null
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassKind {
    Class,
    Interface,
}

/// Variance role of a member with respect to the value it exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MemberRole {
    /// The value flows out (a getter).
    Producer,
    /// The value flows in (a setter).
    Consumer,
    /// The value flows in and back out (an identity store).
    Invariant,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberDef {
    pub name: String,
    pub role: MemberRole,
    /// Declared value type, written in terms of the owning class's type parameters.
    pub ty: Type,
}

impl MemberDef {
    pub fn producer(name: impl Into<String>, ty: Type) -> Self {
        Self {
            name: name.into(),
            role: MemberRole::Producer,
            ty,
        }
    }

    pub fn consumer(name: impl Into<String>, ty: Type) -> Self {
        Self {
            name: name.into(),
            role: MemberRole::Consumer,
            ty,
        }
    }

    pub fn invariant(name: impl Into<String>, ty: Type) -> Self {
        Self {
            name: name.into(),
            role: MemberRole::Invariant,
            ty,
        }
    }

    /// Classify a single-parameter method shape into a member role.
    ///
    /// Returns `None` when the shape does not expose a value (`void m()`) or when the parameter
    /// and the return type are different generic types, in which case the host must tag the
    /// member explicitly.
    pub fn from_signature(
        name: impl Into<String>,
        param: Option<Type>,
        return_type: Type,
    ) -> Option<Self> {
        match (param, return_type) {
            (None, Type::Void) => None,
            (None, ret) => Some(Self::producer(name, ret)),
            (Some(param), Type::Void) => Some(Self::consumer(name, param)),
            (Some(param), ret) if param == ret => Some(Self::invariant(name, param)),
            (Some(param), ret) if !ret.mentions_type_var() => Some(Self::consumer(name, param)),
            (Some(param), ret) if !param.mentions_type_var() => Some(Self::producer(name, ret)),
            _ => None,
        }
    }
}

/// Signature of a nominal class: its type parameters, parent links and members.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassDef {
    pub name: String,
    pub kind: ClassKind,
    pub type_params: Vec<TypeVarId>,
    pub super_class: Option<Type>,
    pub interfaces: Vec<Type>,
    pub members: Vec<MemberDef>,
}

impl ClassDef {
    pub fn new(name: impl Into<String>, type_params: Vec<TypeVarId>) -> Self {
        Self {
            name: name.into(),
            kind: ClassKind::Class,
            type_params,
            super_class: None,
            interfaces: Vec::new(),
            members: Vec::new(),
        }
    }

    pub fn is_generic(&self) -> bool {
        !self.type_params.is_empty()
    }

    pub fn member(&self, name: &str) -> Option<&MemberDef> {
        self.members.iter().find(|m| m.name == name)
    }

    /// Direct supertypes in declaration order: superclass first, then interfaces.
    pub fn direct_supertypes(&self) -> impl Iterator<Item = &Type> {
        self.super_class.iter().chain(self.interfaces.iter())
    }
}

/// Read-only view of the declared classes and type parameters.
pub trait TypeEnv {
    fn class(&self, id: ClassId) -> Option<&ClassDef>;
    fn type_param(&self, id: TypeVarId) -> Option<&TypeParamDef>;
    fn lookup_class(&self, name: &str) -> Option<ClassId>;

    /// Recursion budget for a single subtype query.
    fn max_relation_depth(&self) -> usize {
        DEFAULT_MAX_RELATION_DEPTH
    }

    /// Capture variable slots in use. A [`TyContext`] layered on top allocates after them.
    fn capture_slots(&self) -> usize {
        0
    }
}

/// Replace type variables according to `subst`.
///
/// Substitution is purely structural and never looks at bounds, so it terminates on every finite
/// type tree.
pub fn substitute(ty: &Type, subst: &HashMap<TypeVarId, Type>) -> Type {
    if subst.is_empty() {
        return ty.clone();
    }
    match ty {
        Type::TypeVar(id) => subst.get(id).cloned().unwrap_or_else(|| ty.clone()),
        Type::Class(ClassType { def, args }) => Type::class(
            *def,
            args.iter().map(|arg| substitute(arg, subst)).collect(),
        ),
        Type::Wildcard(WildcardBound::Unbounded) => ty.clone(),
        Type::Wildcard(WildcardBound::Extends(bound)) => {
            Type::extends(substitute(bound, subst))
        }
        Type::Wildcard(WildcardBound::Super(bound)) => Type::super_of(substitute(bound, subst)),
        Type::Array(elem) => Type::array(substitute(elem, subst)),
        Type::Top | Type::Null | Type::Void | Type::Primitive(_) | Type::Raw(_) => ty.clone(),
    }
}

/// Substitution mapping a class's formal type parameters to `args`.
///
/// Missing arguments map to [`Type::Top`] so malformed input still yields a stable shape.
pub fn class_substitution(class_def: &ClassDef, args: &[Type]) -> HashMap<TypeVarId, Type> {
    class_def
        .type_params
        .iter()
        .copied()
        .enumerate()
        .map(|(idx, formal)| (formal, args.get(idx).cloned().unwrap_or(Type::Top)))
        .collect()
}
