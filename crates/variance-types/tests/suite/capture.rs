use pretty_assertions::assert_eq;
use variance_types::{
    format_type, is_subtype, ClassDef, ClassType, ReasonCode, TyContext, Type, TypeEnv,
    TypeError, TypeParamDef, TypeVarId, Verdict,
};

use super::Fixture;

fn captured_args(ty: &Type) -> Vec<TypeVarId> {
    let Type::Class(ClassType { args, .. }) = ty else {
        panic!("expected a class type, got {ty:?}");
    };
    args.iter()
        .map(|arg| match arg {
            Type::TypeVar(id) => *id,
            other => panic!("expected a capture variable, got {other:?}"),
        })
        .collect()
}

#[test]
fn each_wildcard_gets_its_own_variable() {
    let mut fx = Fixture::new();
    let a = fx.env.add_type_param("A", Type::Top);
    let b = fx.env.add_type_param("B", Type::Top);
    let pair = fx
        .env
        .add_class(ClassDef::new("org.example.Pair", vec![a, b]));

    let mut ctx = TyContext::new(&fx.env);
    let captured = ctx
        .capture_conversion(&Type::class(pair, vec![Type::wildcard(), Type::wildcard()]))
        .unwrap();
    let caps = captured_args(&captured);

    assert_eq!(caps.len(), 2);
    assert_ne!(caps[0], caps[1]);
    assert!(caps.iter().all(|cap| cap.is_capture()));
    assert_eq!(format_type(&ctx, &captured), "Pair<CAP#0, CAP#1>");

    let first = Type::TypeVar(caps[0]);
    let second = Type::TypeVar(caps[1]);
    assert!(!is_subtype(&ctx, &first, &second));
    assert!(!is_subtype(&ctx, &second, &first));
    assert!(is_subtype(&ctx, &first, &Type::Top));
}

#[test]
fn capturing_twice_yields_fresh_variables() {
    let fx = Fixture::new();
    let any = fx.list_of(Type::wildcard());

    let mut ctx = TyContext::new(&fx.env);
    let first = ctx.capture_conversion(&any).unwrap();
    let second = ctx.capture_conversion(&any).unwrap();
    assert_ne!(first, second);
    assert_eq!(ctx.capture_count(), 2);
    assert!(!is_subtype(&ctx, &first, &second));
}

#[test]
fn bounds_follow_the_wildcard_kind() {
    let fx = Fixture::new();
    let mut ctx = TyContext::new(&fx.env);

    let ext = ctx
        .capture_conversion(&fx.list_of(Type::extends(fx.number.clone())))
        .unwrap();
    let ext = ctx.type_param(captured_args(&ext)[0]).unwrap().clone();
    assert_eq!(ext.upper_bound, fx.number);
    assert_eq!(ext.lower_bound, Type::Null);

    let sup = ctx
        .capture_conversion(&fx.list_of(Type::super_of(fx.integer.clone())))
        .unwrap();
    let sup = ctx.type_param(captured_args(&sup)[0]).unwrap().clone();
    assert_eq!(sup.upper_bound, Type::Top);
    assert_eq!(sup.lower_bound, fx.integer);

    let any = ctx.capture_conversion(&fx.list_of(Type::wildcard())).unwrap();
    let any = ctx.type_param(captured_args(&any)[0]).unwrap().clone();
    assert_eq!(any.upper_bound, Type::Top);
    assert_eq!(any.lower_bound, Type::Null);
}

#[test]
fn declared_bounds_tighten_captures() {
    let mut fx = Fixture::new();
    let t = fx.env.add_type_param("T", fx.number.clone());
    let boxed = fx.env.add_class(ClassDef::new("org.example.NumberBox", vec![t]));

    let mut ctx = TyContext::new(&fx.env);
    let any = ctx
        .capture_conversion(&Type::class(boxed, vec![Type::wildcard()]))
        .unwrap();
    let cap = ctx.type_param(captured_args(&any)[0]).unwrap().clone();
    assert_eq!(cap.upper_bound, fx.number);

    let ext = ctx
        .capture_conversion(&Type::class(boxed, vec![Type::extends(fx.integer.clone())]))
        .unwrap();
    let cap = ctx.type_param(captured_args(&ext)[0]).unwrap().clone();
    assert_eq!(cap.upper_bound, fx.integer);

    let sup = ctx
        .capture_conversion(&Type::class(boxed, vec![Type::super_of(fx.integer.clone())]))
        .unwrap();
    let cap = ctx.type_param(captured_args(&sup)[0]).unwrap().clone();
    assert_eq!(cap.upper_bound, fx.number);
    assert_eq!(cap.lower_bound, fx.integer);
}

#[test]
fn lower_bound_outside_the_declared_bound_fails() {
    let mut fx = Fixture::new();
    let t = fx.env.add_type_param("T", fx.number.clone());
    let boxed = fx.env.add_class(ClassDef::new("org.example.NumberBox", vec![t]));

    let mut ctx = TyContext::new(&fx.env);
    let err = ctx
        .capture_conversion(&Type::class(boxed, vec![Type::super_of(fx.string.clone())]))
        .unwrap_err();
    assert_eq!(
        err,
        TypeError::CaptureBoundViolation {
            lower: "String".to_string(),
            upper: "Number".to_string(),
        }
    );
    assert_eq!(Verdict::from(err).rejection(), Some(ReasonCode::CaptureFailure));
}

#[test]
fn bounds_may_refer_to_later_captures() {
    // class Pair<A extends B, B>
    let mut fx = Fixture::new();
    let a = fx.env.add_type_param("A", Type::Top);
    let b = fx.env.add_type_param("B", Type::Top);
    fx.env
        .define_type_param(a, TypeParamDef::new("A", Type::TypeVar(b)))
        .unwrap();
    let pair = fx
        .env
        .add_class(ClassDef::new("org.example.Pair", vec![a, b]));

    let mut ctx = TyContext::new(&fx.env);
    let captured = ctx
        .capture_conversion(&Type::class(
            pair,
            vec![
                Type::super_of(fx.integer.clone()),
                Type::super_of(fx.number.clone()),
            ],
        ))
        .unwrap();
    let caps = captured_args(&captured);
    let first = ctx.type_param(caps[0]).unwrap().clone();
    assert_eq!(first.upper_bound, Type::TypeVar(caps[1]));
    assert_eq!(first.lower_bound, fx.integer);
    assert_eq!(ctx.type_param(caps[1]).unwrap().lower_bound, fx.number);

    // A real violation against a later capture is still reported.
    let err = ctx
        .capture_conversion(&Type::class(
            pair,
            vec![
                Type::super_of(fx.string.clone()),
                Type::super_of(fx.number.clone()),
            ],
        ))
        .unwrap_err();
    assert_eq!(err.reason(), ReasonCode::CaptureFailure);
}

#[test]
fn f_bounded_capture_refers_to_itself() {
    let mut fx = Fixture::new();
    let enum_like = fx.env.intern_class_id("org.example.EnumLike");
    let e = fx.env.add_type_param("E", Type::Top);
    fx.env
        .define_type_param(
            e,
            TypeParamDef::new("E", Type::class(enum_like, vec![Type::TypeVar(e)])),
        )
        .unwrap();
    fx.env
        .define_class(enum_like, ClassDef::new("org.example.EnumLike", vec![e]));

    let mut ctx = TyContext::new(&fx.env);
    let captured = ctx
        .capture_conversion(&Type::class(enum_like, vec![Type::wildcard()]))
        .unwrap();
    let cap = captured_args(&captured)[0];
    assert_eq!(
        ctx.type_param(cap).unwrap().upper_bound,
        Type::class(enum_like, vec![Type::TypeVar(cap)])
    );
    assert!(is_subtype(&ctx, &Type::TypeVar(cap), &captured));
    assert_eq!(
        ctx.project_upward(&Type::TypeVar(cap)),
        Type::class(enum_like, vec![Type::wildcard()])
    );
}

#[test]
fn projection_removes_every_capture() {
    let fx = Fixture::new();
    let mut ctx = TyContext::new(&fx.env);

    let nested = fx.list_of(Type::extends(fx.list_of(Type::super_of(fx.integer.clone()))));
    let captured = ctx.capture_conversion(&nested).unwrap();
    assert!(captured.mentions_capture());

    let projected = ctx.project_upward(&captured);
    assert!(!projected.mentions_capture());
    assert_eq!(projected, nested);
    assert_eq!(
        format_type(&ctx, &projected),
        "List<? extends List<? super Integer>>"
    );
}

#[test]
fn non_generic_and_raw_types_are_not_captured() {
    let fx = Fixture::new();
    let mut ctx = TyContext::new(&fx.env);
    assert_eq!(ctx.capture_conversion(&fx.integer), Ok(fx.integer.clone()));
    assert_eq!(
        ctx.capture_conversion(&Type::Raw(fx.list)),
        Ok(Type::Raw(fx.list))
    );
    assert_eq!(ctx.capture_count(), 0);
}
