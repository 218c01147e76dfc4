use pretty_assertions::assert_eq;
use variance_types::{
    check_access, check_member_access, lookup_member, Level, MemberRole, Policy, ReasonCode,
    Severity, TyContext, Type, Verdict,
};

use super::Fixture;

fn read(fx: &Fixture, receiver: &Type, member: &str) -> Verdict {
    let mut ctx = TyContext::new(&fx.env);
    check_member_access(&mut ctx, receiver, member, None)
}

fn write(fx: &Fixture, receiver: &Type, member: &str, arg: &Type) -> Verdict {
    let mut ctx = TyContext::new(&fx.env);
    check_member_access(&mut ctx, receiver, member, Some(arg))
}

#[test]
fn get_put_rule_for_integers() {
    let fx = Fixture::new();
    let containing = fx.containing_of(fx.integer.clone());
    let extends_c = fx.containing_of(Type::extends(fx.number.clone()));
    let super_c = fx.containing_of(Type::super_of(fx.integer.clone()));

    assert_eq!(read(&fx, &containing, "give").ty(), Some(&fx.integer));
    assert_eq!(
        write(&fx, &containing, "take", &fx.integer).ty(),
        Some(&Type::Void)
    );

    let given = read(&fx, &extends_c, "give");
    assert_eq!(given.ty(), Some(&fx.number));
    assert!(given.warnings().is_empty());
    assert_eq!(
        write(&fx, &extends_c, "take", &fx.integer).rejection(),
        Some(ReasonCode::ExtendsWriteViolation)
    );

    let given = read(&fx, &super_c, "give");
    assert_eq!(given.ty(), Some(&Type::Top));
    assert!(given.has_warning(ReasonCode::SuperReadWidened));
    assert!(write(&fx, &super_c, "take", &fx.integer).is_accept());
}

#[test]
fn get_put_rule_for_a_class_tree() {
    let fx = Fixture::new();
    let super_of_bottom = fx.containing_of(Type::super_of(fx.bottom.clone()));
    let extends_of_top = fx.containing_of(Type::extends(fx.top.clone()));

    // `? super Bottom` takes `null` or a `Bottom`, and gives back `Object`.
    assert!(write(&fx, &super_of_bottom, "take", &fx.bottom).is_accept());
    assert!(write(&fx, &super_of_bottom, "take", &Type::Null).is_accept());
    assert_eq!(
        write(&fx, &super_of_bottom, "take", &fx.middle).rejection(),
        Some(ReasonCode::NoRelation)
    );
    assert_eq!(
        write(&fx, &super_of_bottom, "take", &fx.other_bottom).rejection(),
        Some(ReasonCode::NoRelation)
    );
    assert_eq!(read(&fx, &super_of_bottom, "give").ty(), Some(&Type::Top));

    // `? extends Top` gives a `Top` and takes only `null`.
    assert_eq!(read(&fx, &extends_of_top, "give").ty(), Some(&fx.top));
    assert!(write(&fx, &extends_of_top, "take", &Type::Null).is_accept());
    for arg in [Type::Top, fx.top.clone(), fx.middle.clone(), fx.bottom.clone()] {
        assert_eq!(
            write(&fx, &extends_of_top, "take", &arg).rejection(),
            Some(ReasonCode::ExtendsWriteViolation),
            "writing {arg:?} through `? extends Top`"
        );
    }
}

#[test]
fn unbounded_wildcard_reads_object_and_writes_only_null() {
    let fx = Fixture::new();
    let any = fx.list_of(Type::wildcard());

    let given = read(&fx, &any, "get");
    assert_eq!(given.ty(), Some(&Type::Top));
    assert!(given.warnings().is_empty());
    assert!(write(&fx, &any, "add", &Type::Null).is_accept());
    assert_eq!(
        write(&fx, &any, "add", &fx.integer).rejection(),
        Some(ReasonCode::ExtendsWriteViolation)
    );
}

#[test]
fn add_all_is_covariant_in_its_argument() {
    let fx = Fixture::new();
    let nums = fx.array_list_of(fx.number.clone());

    assert!(write(&fx, &nums, "addAll", &fx.list_of(fx.integer.clone())).is_accept());
    assert!(write(&fx, &nums, "addAll", &fx.list_of(fx.double.clone())).is_accept());
    assert!(write(
        &fx,
        &nums,
        "addAll",
        &fx.list_of(Type::extends(fx.integer.clone()))
    )
    .is_accept());

    let ints = fx.array_list_of(fx.integer.clone());
    assert_eq!(
        write(&fx, &ints, "addAll", &fx.list_of(fx.number.clone())).rejection(),
        Some(ReasonCode::NoRelation)
    );
}

#[test]
fn invariant_members_need_a_pinned_capture() {
    let fx = Fixture::new();

    let ints = fx.list_of(fx.integer.clone());
    let set = write(&fx, &ints, "set", &fx.integer);
    assert_eq!(set.ty(), Some(&fx.integer));

    let extends_number = fx.list_of(Type::extends(fx.number.clone()));
    assert_eq!(
        write(&fx, &extends_number, "set", &fx.integer).rejection(),
        Some(ReasonCode::InvariantPositionUnderWildcard)
    );

    let super_object = fx.list_of(Type::super_of(Type::Top));
    let set = write(&fx, &super_object, "set", &fx.string);
    assert_eq!(set.ty(), Some(&Type::Top));
    assert!(set.warnings().is_empty());
}

#[test]
fn values_do_not_flow_between_two_captures_of_the_same_type() {
    // list.set(i, tmp.get(j)) with `list` and `tmp` both `List<?>`.
    let fx = Fixture::new();
    let any = fx.list_of(Type::wildcard());

    let mut ctx = TyContext::new(&fx.env);
    let got = check_member_access(&mut ctx, &any, "get", None);
    let got_ty = got.ty().cloned().unwrap();
    assert_eq!(got_ty, Type::Top);

    let set = check_member_access(&mut ctx, &any, "set", Some(&got_ty));
    assert_eq!(
        set.rejection(),
        Some(ReasonCode::InvariantPositionUnderWildcard)
    );

    // Even the unprojected capture of one receiver is not writable into another.
    let list = ctx.capture_conversion(&any).unwrap();
    let tmp = ctx.capture_conversion(&any).unwrap();
    let slot = lookup_member(&ctx, &list, "add").unwrap().ty;
    let value = lookup_member(&ctx, &tmp, "get").unwrap().ty;
    assert_ne!(slot, value);
    assert_eq!(
        check_access(&ctx, MemberRole::Consumer, &slot, Some(&value)).rejection(),
        Some(ReasonCode::ExtendsWriteViolation)
    );
}

#[test]
fn inherited_members_are_substituted() {
    let fx = Fixture::new();
    let containing = fx.containing_of(fx.bottom.clone());

    let found = lookup_member(&fx.env, &containing, "value").unwrap();
    assert_eq!(found.role, MemberRole::Invariant);
    assert_eq!(found.ty, fx.bottom);

    let ints = fx.array_list_of(fx.integer.clone());
    assert_eq!(read(&fx, &ints, "get").ty(), Some(&fx.integer));
    assert!(write(&fx, &ints, "add", &fx.integer).is_accept());
    assert_eq!(
        write(&fx, &ints, "add", &fx.double).rejection(),
        Some(ReasonCode::NoRelation)
    );
}

#[test]
fn raw_receivers_erase_and_warn_on_writes() {
    let fx = Fixture::new();
    let raw = Type::Raw(fx.list);

    let got = read(&fx, &raw, "get");
    assert_eq!(got.ty(), Some(&Type::Top));
    assert!(got.warnings().is_empty());

    let added = write(&fx, &raw, "add", &fx.string);
    assert!(added.is_accept());
    assert!(added.has_warning(ReasonCode::RawUncheckedMatch));
}

#[test]
fn unknown_members_and_bad_receivers() {
    let fx = Fixture::new();
    assert_eq!(
        read(&fx, &fx.list_of(fx.integer.clone()), "size").rejection(),
        Some(ReasonCode::UnknownMember)
    );
    assert_eq!(
        read(&fx, &Type::array(fx.integer.clone()), "get").rejection(),
        Some(ReasonCode::UnknownMember)
    );
    assert_eq!(
        read(&fx, &Type::Null, "get").rejection(),
        Some(ReasonCode::NoRelation)
    );
}

#[test]
fn policy_decides_how_configurable_findings_surface() {
    let fx = Fixture::new();
    let super_c = fx.containing_of(Type::super_of(fx.integer.clone()));
    let widened = read(&fx, &super_c, "give");

    let allow = Policy {
        super_read_widened: Level::Allow,
        ..Policy::default()
    };
    let allowed = allow.apply(widened.clone());
    assert_eq!(allowed.ty(), Some(&Type::Top));
    assert!(allowed.warnings().is_empty());

    assert_eq!(Policy::default().apply(widened.clone()), widened);

    let Verdict::Reject(diag) = Policy::strict().apply(widened) else {
        panic!("strict policy should reject widened reads");
    };
    assert_eq!(diag.reason, ReasonCode::SuperReadWidened);
    assert_eq!(diag.severity, Severity::Error);

    // Hard rejections are never softened.
    let extends_c = fx.containing_of(Type::extends(fx.number.clone()));
    let rejected = write(&fx, &extends_c, "take", &fx.integer);
    let relaxed = Policy {
        raw_unchecked: Level::Allow,
        super_read_widened: Level::Allow,
    };
    assert_eq!(relaxed.apply(rejected.clone()), rejected);
}
