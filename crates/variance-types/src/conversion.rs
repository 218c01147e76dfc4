use crate::{
    erase, format_type, instantiate_as_supertype, is_reifiable, is_subtype, relate, ClassKind,
    ClassType, Diagnostic, PrimitiveType, ReasonCode, Relation, Type, TypeEnv, Verdict,
    WildcardBound,
};

/// Assignment compatibility: `to x = <expr of type from>`.
pub fn check_assignment(env: &dyn TypeEnv, from: &Type, to: &Type) -> Verdict {
    match relate(env, from, to) {
        Relation::Subtype => Verdict::accept(to.clone()),
        Relation::Unchecked => Verdict::accept(to.clone()).with_warning(Diagnostic::warning(
            ReasonCode::RawUncheckedMatch,
            format!(
                "unchecked conversion from `{}` to `{}`",
                format_type(env, from),
                format_type(env, to)
            ),
        )),
        Relation::Unrelated => Verdict::reject(
            ReasonCode::NoRelation,
            format!(
                "`{}` is not assignable to `{}`",
                format_type(env, from),
                format_type(env, to)
            ),
        ),
    }
}

/// Static check of `(to) <expr of type from>`.
///
/// Upcasts are accepted. Downcasts are accepted when the runtime can check them (reifiable
/// target) and accepted with a [`ReasonCode::RawUncheckedMatch`] warning otherwise, unless the
/// type arguments are provably different. Casts between unrelated types are rejected.
pub fn check_cast(env: &dyn TypeEnv, from: &Type, to: &Type) -> Verdict {
    match relate(env, from, to) {
        Relation::Subtype => return Verdict::accept(to.clone()),
        Relation::Unchecked => {
            return Verdict::accept(to.clone()).with_warning(unchecked_cast(env, from, to))
        }
        Relation::Unrelated => {}
    }

    if from.is_primitive() || to.is_primitive() || !from.is_reference() || !to.is_reference() {
        return inconvertible(env, from, to);
    }

    let erased_from = erase(env, from);
    let erased_to = erase(env, to);
    let narrowing = is_subtype(env, &erased_to, &erased_from)
        || involves_interface(env, &erased_from, &erased_to);
    if !narrowing || provably_distinct(env, from, to) {
        return inconvertible(env, from, to);
    }

    if is_reifiable(env, to) || determined_by_source(env, from, to) {
        return Verdict::accept(to.clone());
    }
    Verdict::accept(to.clone()).with_warning(unchecked_cast(env, from, to))
}

/// Static check of `<expr of type ty> instanceof target`.
///
/// The target must be reifiable; `x instanceof Holder<Integer>` is rejected with
/// [`ReasonCode::NonReifiableInstanceOf`] while `Holder<?>` and raw `Holder` are fine.
pub fn check_instance_of(env: &dyn TypeEnv, ty: &Type, target: &Type) -> Verdict {
    if ty.is_primitive() || target.is_primitive() {
        return Verdict::reject(
            ReasonCode::NoRelation,
            format!(
                "`instanceof` needs reference types, found `{}` and `{}`",
                format_type(env, ty),
                format_type(env, target)
            ),
        );
    }
    if !is_reifiable(env, target) {
        return Verdict::reject(
            ReasonCode::NonReifiableInstanceOf,
            format!(
                "cannot test against the parameterized type `{}`; use `{}` instead",
                format_type(env, target),
                format_type(env, &erase(env, target))
            ),
        );
    }

    check_cast(env, ty, target)
        .and_then(|_| Verdict::accept(Type::Primitive(PrimitiveType::Boolean)))
}

fn unchecked_cast(env: &dyn TypeEnv, from: &Type, to: &Type) -> Diagnostic {
    Diagnostic::warning(
        ReasonCode::RawUncheckedMatch,
        format!(
            "unchecked cast from `{}` to `{}`",
            format_type(env, from),
            format_type(env, to)
        ),
    )
}

fn inconvertible(env: &dyn TypeEnv, from: &Type, to: &Type) -> Verdict {
    Verdict::reject(
        ReasonCode::NoRelation,
        format!(
            "inconvertible types: `{}` cannot be cast to `{}`",
            format_type(env, from),
            format_type(env, to)
        ),
    )
}

fn involves_interface(env: &dyn TypeEnv, a: &Type, b: &Type) -> bool {
    let is_interface = |ty: &Type| match ty {
        Type::Class(ClassType { def, .. }) | Type::Raw(def) => env
            .class(*def)
            .is_some_and(|class_def| class_def.kind == ClassKind::Interface),
        _ => false,
    };
    is_interface(a) || is_interface(b)
}

// `List<String>` can never be an `ArrayList<Integer>`: viewed at the source class, the target's
// concrete arguments disagree with the source's.
fn provably_distinct(env: &dyn TypeEnv, from: &Type, to: &Type) -> bool {
    let Type::Class(source) = from else {
        return false;
    };
    let Some(Type::Class(view)) = instantiate_as_supertype(env, to, source.def) else {
        return false;
    };
    let concrete = |ty: &Type| !matches!(ty, Type::Wildcard(_) | Type::TypeVar(_));
    source
        .args
        .iter()
        .zip(&view.args)
        .any(|(a, b)| concrete(a) && concrete(b) && a != b)
}

// `(Box<T>) holder` where `holder: Holder<T>` and `Box<T> extends Holder<T>`: every argument of
// the target already occurs in the source, so checking the erased class is enough.
fn determined_by_source(env: &dyn TypeEnv, from: &Type, to: &Type) -> bool {
    let (Type::Class(source), Type::Class(target)) = (from, to) else {
        return false;
    };
    if instantiate_as_supertype(env, to, source.def).as_ref() != Some(from) {
        return false;
    }
    target.args.iter().all(|arg| {
        matches!(arg, Type::Wildcard(WildcardBound::Unbounded)) || source.args.contains(arg)
    })
}
