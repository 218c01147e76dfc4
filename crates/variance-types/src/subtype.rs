use std::collections::{HashSet, VecDeque};

use crate::{
    class_substitution, substitute, ClassId, ClassType, TyContext, Type, TypeEnv, WildcardBound,
};

/// Recursion budget used when the environment does not configure one.
pub const DEFAULT_MAX_RELATION_DEPTH: usize = 64;

/// Result of relating two types.
///
/// Ordered from worst to best so combining results is `min`/`max`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Relation {
    Unrelated,
    /// Related only because a raw type skipped argument verification.
    Unchecked,
    Subtype,
}

impl Relation {
    pub fn holds(self) -> bool {
        self != Relation::Unrelated
    }

    /// Both relations must hold.
    pub fn and(self, other: Relation) -> Relation {
        self.min(other)
    }

    /// Either relation may hold.
    pub fn or(self, other: Relation) -> Relation {
        self.max(other)
    }
}

/// `sub <: sup`, counting raw (unchecked) matches as success.
pub fn is_subtype(env: &dyn TypeEnv, sub: &Type, sup: &Type) -> bool {
    relate(env, sub, sup).holds()
}

/// Relate `sub` to `sup`, distinguishing clean matches from raw unchecked ones.
pub fn relate(env: &dyn TypeEnv, sub: &Type, sup: &Type) -> Relation {
    let mut relater = Relater {
        env,
        depth: 0,
        max_depth: env.max_relation_depth(),
        exhausted: false,
    };
    let relation = relater.relate(sub, sup);
    if relater.exhausted {
        tracing::warn!(
            target: crate::TRACE_TARGET,
            max_depth = relater.max_depth,
            "subtype query exceeded its depth budget; treating the types as unrelated"
        );
    }
    tracing::trace!(target: crate::TRACE_TARGET, ?sub, ?sup, ?relation, "relate");
    relation
}

struct Relater<'a> {
    env: &'a dyn TypeEnv,
    depth: usize,
    max_depth: usize,
    exhausted: bool,
}

impl Relater<'_> {
    fn relate(&mut self, sub: &Type, sup: &Type) -> Relation {
        if sub == sup {
            return Relation::Subtype;
        }
        if self.depth >= self.max_depth {
            self.exhausted = true;
            return Relation::Unrelated;
        }

        self.depth += 1;
        let relation = self.relate_inner(sub, sup);
        self.depth -= 1;
        relation
    }

    fn relate_inner(&mut self, sub: &Type, sup: &Type) -> Relation {
        match (sub, sup) {
            // Wildcards are not types on their own; containment handles them.
            (Type::Wildcard(_), _) | (_, Type::Wildcard(_)) => Relation::Unrelated,
            (Type::Void, _) | (_, Type::Void) => Relation::Unrelated,
            (Type::Null, Type::Primitive(_)) => Relation::Unrelated,
            (Type::Null, _) => Relation::Subtype,
            (_, Type::Top) => Relation::Subtype,
            (Type::TypeVar(_), _) | (_, Type::TypeVar(_)) => self.relate_type_vars(sub, sup),
            (Type::Array(a), Type::Array(b)) => self.relate_arrays(a, b),
            (Type::Class(_) | Type::Raw(_), Type::Class(target)) => {
                self.relate_to_class(sub, target)
            }
            (Type::Class(_) | Type::Raw(_), Type::Raw(target)) => {
                match instantiate_as_supertype(self.env, sub, *target) {
                    Some(_) => Relation::Subtype,
                    None => Relation::Unrelated,
                }
            }
            _ => Relation::Unrelated,
        }
    }

    fn relate_type_vars(&mut self, sub: &Type, sup: &Type) -> Relation {
        let mut best = Relation::Unrelated;

        // `T <: S` if `upper(T) <: S`.
        if let Type::TypeVar(id) = sub {
            if let Some(def) = self.env.type_param(*id) {
                let upper = def.upper_bound.clone();
                best = self.relate(&upper, sup);
                if best == Relation::Subtype {
                    return best;
                }
            }
        }

        // `S <: T` if `S <: lower(T)`. A `Null` lower bound admits nothing beyond `null`, which
        // rule 1 already handled.
        if let Type::TypeVar(id) = sup {
            if let Some(def) = self.env.type_param(*id) {
                if def.has_lower_bound() {
                    let lower = def.lower_bound.clone();
                    best = best.or(self.relate(sub, &lower));
                }
            }
        }

        best
    }

    // Covariant arrays are their own rule: generics are invariant, arrays are not, and the
    // unsoundness is paid for by the runtime store check.
    fn relate_arrays(&mut self, a: &Type, b: &Type) -> Relation {
        let exact_only = |ty: &Type| matches!(ty, Type::TypeVar(_) | Type::Primitive(_));
        if exact_only(a) || exact_only(b) {
            return if a == b {
                Relation::Subtype
            } else {
                Relation::Unrelated
            };
        }
        self.relate(a, b)
    }

    fn relate_to_class(&mut self, sub: &Type, target: &ClassType) -> Relation {
        if let Type::Class(ClassType { args, .. }) = sub {
            if args.iter().any(Type::is_wildcard) {
                return self.relate_captured_to_class(sub, target);
            }
        }

        let Some(view) = instantiate_as_supertype(self.env, sub, target.def) else {
            return Relation::Unrelated;
        };

        match view {
            Type::Raw(_) => {
                if target.args.iter().all(is_unbounded_wildcard) {
                    Relation::Subtype
                } else {
                    Relation::Unchecked
                }
            }
            Type::Class(ClassType { args, .. }) => self.contains_all(&args, &target.args),
            _ => Relation::Unrelated,
        }
    }

    // Parent clauses may nest a parameter (`Wrap<T> extends Holder<List<T>>`), so wildcard
    // arguments are captured before walking up; a nested capture stays invariant.
    fn relate_captured_to_class(&mut self, sub: &Type, target: &ClassType) -> Relation {
        let mut ctx = TyContext::new(self.env);
        let Ok(captured) = ctx.capture_conversion(sub) else {
            return Relation::Unrelated;
        };

        let mut nested = Relater {
            env: &ctx,
            depth: self.depth,
            max_depth: self.max_depth,
            exhausted: false,
        };
        let relation = nested.relate_to_class(&captured, target);
        self.exhausted |= nested.exhausted;
        relation
    }

    fn contains_all(&mut self, sub_args: &[Type], sup_args: &[Type]) -> Relation {
        if sub_args.len() != sup_args.len() {
            return Relation::Unrelated;
        }
        let mut relation = Relation::Subtype;
        for (sub_arg, sup_arg) in sub_args.iter().zip(sup_args) {
            relation = relation.and(self.contains(sup_arg, sub_arg));
            if relation == Relation::Unrelated {
                break;
            }
        }
        relation
    }

    /// Whether the argument `sup_arg` contains `sub_arg`.
    fn contains(&mut self, sup_arg: &Type, sub_arg: &Type) -> Relation {
        match sup_arg {
            Type::Wildcard(WildcardBound::Unbounded) => Relation::Subtype,
            Type::Wildcard(WildcardBound::Extends(bound)) => match sub_arg {
                Type::Wildcard(WildcardBound::Extends(inner)) => self.relate(inner, bound),
                // `?` and `? super X` only promise `Top`.
                Type::Wildcard(_) => self.relate(&Type::Top, bound),
                exact => self.relate(exact, bound),
            },
            Type::Wildcard(WildcardBound::Super(bound)) => match sub_arg {
                Type::Wildcard(WildcardBound::Super(inner)) => self.relate(bound, inner),
                Type::Wildcard(_) => Relation::Unrelated,
                exact => self.relate(bound, exact),
            },
            // Generic arguments are invariant.
            exact => {
                if exact == sub_arg {
                    Relation::Subtype
                } else {
                    Relation::Unrelated
                }
            }
        }
    }
}

fn is_unbounded_wildcard(ty: &Type) -> bool {
    matches!(ty, Type::Wildcard(WildcardBound::Unbounded))
}

/// All nominal supertypes of `ty` (including itself) in breadth-first order, with type argument
/// substitution applied along the way.
///
/// Raw starting points, and raw `extends`/`implements` clauses, yield erased ([`Type::Raw`])
/// supertypes: nothing about the arguments can be recovered from an erased type. Cyclic class
/// hierarchies terminate because every instantiation is visited once.
pub fn supertypes(env: &dyn TypeEnv, ty: &Type) -> Vec<Type> {
    let mut out = Vec::new();
    if !matches!(ty, Type::Class(_) | Type::Raw(_)) {
        return out;
    }

    let mut queue: VecDeque<Type> = VecDeque::new();
    let mut seen: HashSet<Type> = HashSet::new();
    queue.push_back(ty.clone());

    while let Some(current) = queue.pop_front() {
        if !seen.insert(current.clone()) {
            continue;
        }

        let (def, args, raw) = match &current {
            Type::Class(ClassType { def, args }) => (*def, args.as_slice(), false),
            Type::Raw(def) => (*def, &[][..], true),
            _ => continue,
        };

        let Some(class_def) = env.class(def) else {
            out.push(current);
            continue;
        };
        let raw = raw || (args.is_empty() && class_def.is_generic());

        if raw {
            for sup in class_def.direct_supertypes() {
                if let Some(erased) = erase_class(env, sup) {
                    queue.push_back(erased);
                }
            }
        } else {
            let subst = class_substitution(class_def, args);
            for sup in class_def.direct_supertypes() {
                let sup = substitute(sup, &subst);
                if matches!(sup, Type::Class(_) | Type::Raw(_)) {
                    queue.push_back(sup);
                }
            }
        }

        out.push(current);
    }

    out
}

/// `ty` viewed as an instantiation of `target`, e.g. `ArrayList<String>` as `List<String>`.
///
/// Returns a [`Type::Raw`] when the path to `target` goes through an erased type.
pub fn instantiate_as_supertype(env: &dyn TypeEnv, ty: &Type, target: ClassId) -> Option<Type> {
    supertypes(env, ty).into_iter().find(|sup| match sup {
        Type::Class(ClassType { def, .. }) | Type::Raw(def) => *def == target,
        _ => false,
    })
}

fn erase_class(env: &dyn TypeEnv, ty: &Type) -> Option<Type> {
    match erase(env, ty) {
        erased @ (Type::Class(_) | Type::Raw(_)) => Some(erased),
        _ => None,
    }
}

/// Type erasure: type variables become their erased upper bound and parameterized classes
/// become raw.
pub fn erase(env: &dyn TypeEnv, ty: &Type) -> Type {
    fn inner(env: &dyn TypeEnv, ty: &Type, budget: usize) -> Type {
        if budget == 0 {
            return Type::Top;
        }
        match ty {
            Type::TypeVar(id) => match env.type_param(*id) {
                Some(def) => inner(env, &def.upper_bound, budget - 1),
                None => Type::Top,
            },
            Type::Class(ClassType { def, args }) if !args.is_empty() => Type::Raw(*def),
            Type::Array(elem) => Type::array(inner(env, elem, budget - 1)),
            Type::Wildcard(WildcardBound::Extends(bound)) => inner(env, bound, budget - 1),
            Type::Wildcard(_) => Type::Top,
            other => other.clone(),
        }
    }

    inner(env, ty, env.max_relation_depth())
}
