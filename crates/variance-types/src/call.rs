use std::collections::HashMap;

use crate::{
    check_well_formed, format_type, relate, substitute, Diagnostic, ReasonCode, Relation,
    TyContext, Type, TypeEnv, TypeVarId, Verdict,
};

/// Signature of a generic method.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodDef {
    pub name: String,
    /// Method-level type parameters, registered in the store like class parameters.
    pub type_params: Vec<TypeVarId>,
    pub params: Vec<Type>,
    pub return_type: Type,
}

impl MethodDef {
    pub fn new(
        name: impl Into<String>,
        type_params: Vec<TypeVarId>,
        params: Vec<Type>,
        return_type: Type,
    ) -> Self {
        Self {
            name: name.into(),
            type_params,
            params,
            return_type,
        }
    }
}

/// Check `method.<type_args>(args)`.
///
/// Type arguments are explicit; each must be a proper type (never a wildcard) within its
/// declared bound. Argument types are captured and related to the substituted parameter types.
/// The result is the substituted return type, projected so no capture variable escapes.
pub fn check_generic_call(
    ctx: &mut TyContext<'_>,
    method: &MethodDef,
    type_args: &[Type],
    args: &[Type],
) -> Verdict {
    let _span =
        tracing::debug_span!(target: crate::TRACE_TARGET, "generic_call", method = %method.name)
            .entered();

    if type_args.len() != method.type_params.len() {
        return Verdict::reject(
            ReasonCode::IllFormedType,
            format!(
                "`{}` takes {} type argument(s) but {} were supplied",
                method.name,
                method.type_params.len(),
                type_args.len()
            ),
        );
    }
    for type_arg in type_args {
        if type_arg.is_wildcard() {
            return Verdict::reject(
                ReasonCode::WildcardTypeArgument,
                format!(
                    "wildcard `{}` is not allowed as an explicit type argument of `{}`",
                    format_type(&*ctx, type_arg),
                    method.name
                ),
            );
        }
        if !type_arg.is_reference() || *type_arg == Type::Null {
            return Verdict::reject(
                ReasonCode::IllFormedType,
                format!(
                    "`{}` cannot be used as a type argument",
                    format_type(&*ctx, type_arg)
                ),
            );
        }
        if let Err(err) = check_well_formed(&*ctx, type_arg) {
            return err.into();
        }
    }

    let subst: HashMap<TypeVarId, Type> = method
        .type_params
        .iter()
        .copied()
        .zip(type_args.iter().cloned())
        .collect();

    let mut verdict = Verdict::accept(Type::Void);
    for (formal, type_arg) in method.type_params.iter().zip(type_args) {
        let Some(def) = ctx.type_param(*formal) else {
            return Verdict::reject(
                ReasonCode::IllFormedType,
                format!("unknown type parameter {formal:?} on `{}`", method.name),
            );
        };
        let name = def.name.clone();
        let bound = substitute(&def.upper_bound, &subst);
        match relate(&*ctx, type_arg, &bound) {
            Relation::Subtype => {}
            Relation::Unchecked => {
                verdict = verdict.with_warning(unchecked(&*ctx, type_arg, &bound));
            }
            Relation::Unrelated => {
                return Verdict::reject(
                    ReasonCode::NoRelation,
                    format!(
                        "type argument `{}` is not within bound `{}` of `{name}`",
                        format_type(&*ctx, type_arg),
                        format_type(&*ctx, &bound)
                    ),
                );
            }
        }
    }

    if args.len() != method.params.len() {
        return Verdict::reject(
            ReasonCode::NoRelation,
            format!(
                "`{}` expects {} argument(s) but {} were supplied",
                method.name,
                method.params.len(),
                args.len()
            ),
        );
    }

    for (idx, (arg, param)) in args.iter().zip(&method.params).enumerate() {
        let expected = substitute(param, &subst);
        let arg = match ctx.capture_conversion(arg) {
            Ok(arg) => arg,
            Err(err) => return err.into(),
        };
        match relate(&*ctx, &arg, &expected) {
            Relation::Subtype => {}
            Relation::Unchecked => {
                verdict = verdict.with_warning(unchecked(&*ctx, &arg, &expected));
            }
            Relation::Unrelated => {
                return Verdict::reject(
                    ReasonCode::NoRelation,
                    format!(
                        "argument {} of `{}`: `{}` is not compatible with `{}`",
                        idx + 1,
                        method.name,
                        format_type(&*ctx, &ctx.project_upward(&arg)),
                        format_type(&*ctx, &expected)
                    ),
                );
            }
        }
    }

    let result = ctx.project_upward(&substitute(&method.return_type, &subst));
    verdict.and_then(|_| Verdict::accept(result))
}

fn unchecked(env: &dyn TypeEnv, from: &Type, to: &Type) -> Diagnostic {
    Diagnostic::warning(
        ReasonCode::RawUncheckedMatch,
        format!(
            "unchecked conversion from `{}` to `{}`",
            format_type(env, from),
            format_type(env, to)
        ),
    )
}
