use std::fmt;

use crate::{
    class_substitution, format_type, is_subtype, substitute, ClassDef, ClassId, ClassType, Type,
    TypeEnv, TypeError, TypeParamDef, TypeVarId, WildcardBound,
};

/// Per-check typing context.
///
/// Capture conversion allocates its synthetic variables here instead of in the shared
/// [`crate::TypeStore`], so a check never mutates global state and two checks running in parallel
/// can never hand out the same capture variable. Create one context per checked expression and
/// drop it afterwards.
pub struct TyContext<'env> {
    base: &'env dyn TypeEnv,
    // Capture slots already taken by `base` when it is itself a context.
    offset: usize,
    locals: Vec<TypeParamDef>,
}

impl fmt::Debug for TyContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TyContext")
            .field("offset", &self.offset)
            .field("locals", &self.locals)
            .finish_non_exhaustive()
    }
}

impl<'env> TyContext<'env> {
    pub fn new(base: &'env dyn TypeEnv) -> Self {
        Self {
            base,
            offset: base.capture_slots(),
            locals: Vec::new(),
        }
    }

    /// Clear all context-local allocations.
    ///
    /// Capture variables handed out before the reset must not be used afterwards.
    pub fn reset(&mut self) {
        self.locals.clear();
    }

    /// Number of capture variables allocated by this context so far.
    pub fn capture_count(&self) -> usize {
        self.locals.len()
    }

    fn add_capture_type_param(&mut self) -> TypeVarId {
        let idx = u32::try_from(self.offset + self.locals.len()).unwrap_or(u32::MAX >> 1);
        let id = TypeVarId::new_context_local(idx);
        self.locals.push(TypeParamDef::new(format!("CAP#{idx}"), Type::Top));
        id
    }

    fn define_capture(&mut self, id: TypeVarId, upper_bound: Type, lower_bound: Type) {
        let Some(slot) = id.index().checked_sub(self.offset) else {
            return;
        };
        if let Some(def) = self.locals.get_mut(slot) {
            def.upper_bound = upper_bound;
            def.lower_bound = lower_bound;
        }
    }

    /// Capture conversion of a parameterized type containing wildcards.
    ///
    /// Every wildcard argument is replaced by a fresh variable:
    ///
    /// - `?` gets the declared bound of its parameter (`Top` by default) and a `Null` lower bound
    /// - `? extends B` gets `B` (or the declared bound, when that one is tighter)
    /// - `? super B` gets the declared bound and lower bound `B`
    ///
    /// Declared bounds are substituted with the captured arguments, so `EnumLike<?>` with
    /// `E extends EnumLike<E>` captures to `EnumLike<CAP#0>` with `CAP#0 <: EnumLike<CAP#0>`.
    /// Types without wildcard arguments are returned unchanged.
    pub fn capture_conversion(&mut self, ty: &Type) -> Result<Type, TypeError> {
        let Type::Class(ClassType { def, args }) = ty else {
            return Ok(ty.clone());
        };
        if !args.iter().any(Type::is_wildcard) {
            return Ok(ty.clone());
        }

        let base = self.base;
        let class_def = base.class(*def).ok_or(TypeError::UnknownClass(*def))?;
        if class_def.type_params.len() != args.len() {
            return Err(TypeError::ArityMismatch {
                class: class_def.name.clone(),
                expected: class_def.type_params.len(),
                found: args.len(),
            });
        }

        // Allocate every capture variable first so bounds can refer to any of them.
        let mut new_args = Vec::with_capacity(args.len());
        let mut pending = Vec::new();
        for (idx, arg) in args.iter().enumerate() {
            match arg {
                Type::Wildcard(bound) => {
                    let cap = self.add_capture_type_param();
                    pending.push((idx, cap, bound));
                    new_args.push(Type::TypeVar(cap));
                }
                other => new_args.push(other.clone()),
            }
        }

        let subst = class_substitution(class_def, &new_args);
        let mut defined = Vec::with_capacity(pending.len());
        for (idx, cap, bound) in pending {
            let declared = declared_bound(base, class_def, idx)
                .map(|bound| substitute(&bound, &subst))
                .unwrap_or(Type::Top);

            let (upper, lower) = match bound {
                WildcardBound::Unbounded => (declared, Type::Null),
                WildcardBound::Extends(bound) => {
                    (self.tighter_bound(declared, (**bound).clone()), Type::Null)
                }
                WildcardBound::Super(bound) => (declared, (**bound).clone()),
            };
            self.define_capture(cap, upper.clone(), lower.clone());
            defined.push((cap, upper, lower));
        }

        // Bounds may mention captures defined later in the argument list.
        for (cap, upper, lower) in defined {
            if lower != Type::Null && !is_subtype(&*self, &lower, &upper) {
                return Err(TypeError::CaptureBoundViolation {
                    lower: format_type(&*self, &lower),
                    upper: format_type(&*self, &upper),
                });
            }

            tracing::trace!(
                target: crate::TRACE_TARGET,
                capture = %format_type(&*self, &Type::TypeVar(cap)),
                upper = %format_type(&*self, &upper),
                lower = %format_type(&*self, &lower),
                "allocated capture variable"
            );
        }

        Ok(Type::class(*def, new_args))
    }

    // Without intersection types the capture keeps whichever bound is more specific.
    fn tighter_bound(&self, declared: Type, wildcard: Type) -> Type {
        if declared == Type::Top || is_subtype(self, &wildcard, &declared) {
            wildcard
        } else if is_subtype(self, &declared, &wildcard) {
            declared
        } else {
            wildcard
        }
    }

    /// Upward projection: replace capture variables so no synthetic variable escapes the check.
    ///
    /// At the top level (and as an array element) a capture becomes its upper bound; as a type
    /// argument it becomes the wildcard it was captured from (`? super L` when it has a lower
    /// bound, `? extends U` otherwise, `?` when `U` is `Top`).
    pub fn project_upward(&self, ty: &Type) -> Type {
        self.project(ty, false, &mut Vec::new())
    }

    fn project(&self, ty: &Type, as_argument: bool, visiting: &mut Vec<TypeVarId>) -> Type {
        match ty {
            Type::TypeVar(id) if id.is_capture() => {
                let Some(def) = self.type_param(*id) else {
                    return if as_argument { Type::wildcard() } else { Type::Top };
                };
                if visiting.contains(id) {
                    return if as_argument { Type::wildcard() } else { Type::Top };
                }

                visiting.push(*id);
                let projected = if !as_argument {
                    self.project(&def.upper_bound, false, visiting)
                } else if def.has_lower_bound() {
                    Type::super_of(self.project(&def.lower_bound, false, visiting))
                } else if def.upper_bound == Type::Top {
                    Type::wildcard()
                } else {
                    Type::extends(self.project(&def.upper_bound, false, visiting))
                };
                visiting.pop();
                projected
            }
            Type::Class(ClassType { def, args }) => Type::class(
                *def,
                args.iter()
                    .map(|arg| self.project(arg, true, visiting))
                    .collect(),
            ),
            Type::Array(elem) => Type::array(self.project(elem, false, visiting)),
            Type::Wildcard(WildcardBound::Extends(bound)) => {
                Type::extends(self.project(bound, false, visiting))
            }
            Type::Wildcard(WildcardBound::Super(bound)) => {
                Type::super_of(self.project(bound, false, visiting))
            }
            other => other.clone(),
        }
    }
}

fn declared_bound(env: &dyn TypeEnv, class_def: &ClassDef, idx: usize) -> Option<Type> {
    let formal = class_def.type_params.get(idx)?;
    env.type_param(*formal).map(|def| def.upper_bound.clone())
}

impl TypeEnv for TyContext<'_> {
    fn class(&self, id: ClassId) -> Option<&ClassDef> {
        self.base.class(id)
    }

    fn type_param(&self, id: TypeVarId) -> Option<&TypeParamDef> {
        if id.is_capture() {
            if let Some(slot) = id.index().checked_sub(self.offset) {
                return self.locals.get(slot);
            }
        }
        self.base.type_param(id)
    }

    fn lookup_class(&self, name: &str) -> Option<ClassId> {
        self.base.lookup_class(name)
    }

    fn max_relation_depth(&self) -> usize {
        self.base.max_relation_depth()
    }

    fn capture_slots(&self) -> usize {
        self.offset + self.locals.len()
    }
}
