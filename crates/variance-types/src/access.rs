use crate::{
    class_substitution, erase, format_type, relate, substitute, supertypes, ClassType,
    Diagnostic, MemberRole, ReasonCode, Relation, TyContext, Type, TypeEnv, Verdict,
};

/// A member found on a receiver, with the receiver's type arguments substituted in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedMember {
    pub name: String,
    pub role: MemberRole,
    /// Value type of the member as seen from the receiver.
    pub ty: Type,
    /// The member was reached through an erased (raw) type; `ty` is erased.
    pub raw: bool,
    /// The declared member type mentions a type parameter of its class.
    pub generic: bool,
}

/// Look `name` up on `receiver` and its supertypes (nearest declaration wins).
///
/// Parent links are followed with argument substitution, so a member declared on
/// `Holder<T>` and reached from `Box<Integer> extends Holder<Integer>` has `T := Integer`.
pub fn lookup_member(env: &dyn TypeEnv, receiver: &Type, name: &str) -> Option<ResolvedMember> {
    for sup in supertypes(env, receiver) {
        let (def, args, raw) = match &sup {
            Type::Class(ClassType { def, args }) => (*def, args.as_slice(), false),
            Type::Raw(def) => (*def, &[][..], true),
            _ => continue,
        };
        let Some(class_def) = env.class(def) else {
            continue;
        };
        let Some(member) = class_def.member(name) else {
            continue;
        };

        let raw = raw || (args.is_empty() && class_def.is_generic());
        let ty = if raw {
            erase(env, &member.ty)
        } else {
            substitute(&member.ty, &class_substitution(class_def, args))
        };
        return Some(ResolvedMember {
            name: member.name.clone(),
            role: member.role,
            ty,
            raw,
            generic: member.ty.mentions_type_var(),
        });
    }
    None
}

/// Check a member access on `receiver`: look the member up, capture the receiver once, and
/// enforce producer/consumer rules against the captured type.
///
/// `arg` is the static type of the written value for consumer and invariant members.
pub fn check_member_access(
    ctx: &mut TyContext<'_>,
    receiver: &Type,
    member: &str,
    arg: Option<&Type>,
) -> Verdict {
    let _span = tracing::debug_span!(target: crate::TRACE_TARGET, "member_access", member).entered();

    let receiver = receiver_view(&*ctx, receiver);
    match &receiver {
        Type::Class(_) | Type::Raw(_) => {}
        Type::Null => {
            return Verdict::reject(
                ReasonCode::NoRelation,
                format!("cannot access `{member}` on null"),
            )
        }
        other => {
            return Verdict::reject(
                ReasonCode::UnknownMember,
                format!("`{}` has no members", format_type(&*ctx, other)),
            )
        }
    }

    let captured = match ctx.capture_conversion(&receiver) {
        Ok(captured) => captured,
        Err(err) => return err.into(),
    };

    let Some(resolved) = lookup_member(&*ctx, &captured, member) else {
        return Verdict::reject(
            ReasonCode::UnknownMember,
            format!(
                "`{}` has no member named `{member}`",
                format_type(&*ctx, &receiver)
            ),
        );
    };

    let verdict = check_access(&*ctx, resolved.role, &resolved.ty, arg);
    if resolved.raw && resolved.generic && resolved.role != MemberRole::Producer {
        return verdict.with_warning(Diagnostic::warning(
            ReasonCode::RawUncheckedMatch,
            format!(
                "unchecked call to `{member}` as a member of the raw type `{}`",
                format_type(&*ctx, &receiver)
            ),
        ));
    }
    verdict
}

// Type variable receivers are accessed through their bound.
fn receiver_view(env: &dyn TypeEnv, receiver: &Type) -> Type {
    let mut current = receiver.clone();
    for _ in 0..env.max_relation_depth() {
        let Type::TypeVar(id) = &current else {
            return current;
        };
        current = match env.type_param(*id) {
            Some(def) => def.upper_bound.clone(),
            None => return Type::Top,
        };
    }
    Type::Top
}

/// Producer/consumer check of a single access.
///
/// `declared` is the member's value type after substituting the captured receiver, typically a
/// capture variable:
///
/// - producer: the result is the variable's upper bound; a `? super` capture only yields its
///   upper bound and is flagged [`ReasonCode::SuperReadWidened`]
/// - consumer: `arg` must be `null` or a subtype of the lower bound; with a `Null` lower bound
///   (`? extends`, `?`) anything else is [`ReasonCode::ExtendsWriteViolation`]
/// - invariant: the capture's bounds must coincide, otherwise
///   [`ReasonCode::InvariantPositionUnderWildcard`]
///
/// Results never mention capture variables.
pub fn check_access(
    ctx: &TyContext<'_>,
    role: MemberRole,
    declared: &Type,
    arg: Option<&Type>,
) -> Verdict {
    tracing::trace!(
        target: crate::TRACE_TARGET,
        ?role,
        declared = %format_type(ctx, declared),
        "check_access"
    );
    match role {
        MemberRole::Producer => read(ctx, declared),
        MemberRole::Consumer => write(ctx, declared, arg),
        MemberRole::Invariant => read_write(ctx, declared, arg),
    }
}

fn read(ctx: &TyContext<'_>, declared: &Type) -> Verdict {
    let Type::TypeVar(id) = declared else {
        return Verdict::accept(ctx.project_upward(declared));
    };
    if !id.is_capture() {
        return Verdict::accept(declared.clone());
    }
    let Some(def) = ctx.type_param(*id) else {
        return Verdict::reject(
            ReasonCode::IllFormedType,
            format!("unknown capture variable {id:?}"),
        );
    };

    let result = ctx.project_upward(&def.upper_bound);
    let verdict = Verdict::accept(result.clone());
    if def.has_lower_bound() && def.upper_bound != def.lower_bound {
        return verdict.with_warning(Diagnostic::warning(
            ReasonCode::SuperReadWidened,
            format!(
                "reading through `? super {}` only yields `{}`",
                format_type(ctx, &def.lower_bound),
                format_type(ctx, &result)
            ),
        ));
    }
    verdict
}

fn write(ctx: &TyContext<'_>, declared: &Type, arg: Option<&Type>) -> Verdict {
    let Some(arg) = arg else {
        return Verdict::reject(
            ReasonCode::NoRelation,
            format!(
                "writing a `{}` requires an argument",
                format_type(ctx, declared)
            ),
        );
    };

    if let Type::TypeVar(id) = declared {
        if let Some(def) = ctx.type_param(*id).filter(|_| id.is_capture()) {
            if *arg == Type::Null {
                return Verdict::accept(Type::Void);
            }
            if !def.has_lower_bound() {
                let origin = if def.upper_bound == Type::Top {
                    "?".to_string()
                } else {
                    format!("? extends {}", format_type(ctx, &def.upper_bound))
                };
                return Verdict::reject(
                    ReasonCode::ExtendsWriteViolation,
                    format!(
                        "cannot write `{}` into `{}`: only null can be written through `{origin}`",
                        format_type(ctx, arg),
                        def.name
                    ),
                );
            }
            return written(
                ctx,
                relate(ctx, arg, &def.lower_bound),
                arg,
                &def.lower_bound,
            );
        }
    }

    written(ctx, relate(ctx, arg, declared), arg, declared)
}

fn written(ctx: &TyContext<'_>, relation: Relation, arg: &Type, slot: &Type) -> Verdict {
    match relation {
        Relation::Subtype => Verdict::accept(Type::Void),
        Relation::Unchecked => Verdict::accept(Type::Void).with_warning(Diagnostic::warning(
            ReasonCode::RawUncheckedMatch,
            format!(
                "unchecked conversion from `{}` to `{}`",
                format_type(ctx, arg),
                format_type(ctx, slot)
            ),
        )),
        Relation::Unrelated => Verdict::reject(
            ReasonCode::NoRelation,
            format!(
                "`{}` cannot be written where `{}` is expected",
                format_type(ctx, arg),
                format_type(ctx, slot)
            ),
        ),
    }
}

fn read_write(ctx: &TyContext<'_>, declared: &Type, arg: Option<&Type>) -> Verdict {
    if let Type::TypeVar(id) = declared {
        if let Some(def) = ctx.type_param(*id).filter(|_| id.is_capture()) {
            if def.upper_bound != def.lower_bound {
                return Verdict::reject(
                    ReasonCode::InvariantPositionUnderWildcard,
                    format!(
                        "`{}` is both read and written, but its bounds `{}` .. `{}` do not pin a single type",
                        def.name,
                        format_type(ctx, &def.lower_bound),
                        format_type(ctx, &def.upper_bound)
                    ),
                );
            }
        }
    }

    let stored = match arg {
        Some(_) => write(ctx, declared, arg),
        None => Verdict::accept(Type::Void),
    };
    stored.and_then(|_| read(ctx, declared))
}
