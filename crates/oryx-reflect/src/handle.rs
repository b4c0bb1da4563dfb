//! Reflected member handles
//!
//! The stateful wrapper around at most one member: a per-handle override
//! flag ("skip language-level access checks") plus a lazily populated
//! access-check cache. Handles are shared freely across threads; both
//! fields are read without exclusive locking. A stale read merely forces a
//! redundant slow check, never a false grant, because the cache is only
//! ever written with a value that was independently verified for that
//! exact (caller, target) pair.

use std::sync::atomic::{AtomicBool, Ordering};

use crossbeam::atomic::AtomicCell;
use oryx_types::{MemberDef, MemberKind, TypeId};

use crate::context::{AccessContext, ExposureEvent};
use crate::decision::{decide_suppress, SuppressVerdict};
use crate::error::AccessError;

/// What a handle wraps
#[derive(Debug, Clone)]
pub enum Reflected {
    /// Non-member reflective object; carries no visibility risk
    Plain,
    /// A field
    Field(MemberDef),
    /// A method
    Method(MemberDef),
    /// A constructor
    Constructor(MemberDef),
}

impl Reflected {
    /// The wrapped member, if any
    pub fn member(&self) -> Option<&MemberDef> {
        match self {
            Reflected::Plain => None,
            Reflected::Field(m) | Reflected::Method(m) | Reflected::Constructor(m) => Some(m),
        }
    }

    /// Kind of the wrapped member, if any
    pub fn kind(&self) -> Option<MemberKind> {
        match self {
            Reflected::Plain => None,
            Reflected::Field(_) => Some(MemberKind::Field),
            Reflected::Method(_) => Some(MemberKind::Method),
            Reflected::Constructor(_) => Some(MemberKind::Constructor),
        }
    }
}

/// Memoized previous-success record for the fast-path access check
///
/// The pair form is used only for protected members used on a target other
/// than the declaring type; everywhere else the caller alone determines the
/// verdict. Entries are whole values, replaced, never mutated in place.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AccessCache {
    Empty,
    Caller(TypeId),
    CallerAndTarget(TypeId, TypeId),
}

/// A reflected member handle
///
/// Created bound to at most one member, with the override flag down and an
/// empty cache; lives as long as the reflection metadata that owns it.
#[derive(Debug)]
pub struct ReflectedMember {
    reflected: Reflected,
    override_flag: AtomicBool,
    cache: AtomicCell<AccessCache>,
}

impl ReflectedMember {
    /// Wrap a reflected object
    pub fn new(reflected: Reflected) -> Self {
        ReflectedMember {
            reflected,
            override_flag: AtomicBool::new(false),
            cache: AtomicCell::new(AccessCache::Empty),
        }
    }

    /// Handle wrapping no member
    pub fn plain() -> Self {
        Self::new(Reflected::Plain)
    }

    /// Handle for a field
    pub fn field(member: MemberDef) -> Self {
        Self::new(Reflected::Field(member))
    }

    /// Handle for a method
    pub fn method(member: MemberDef) -> Self {
        Self::new(Reflected::Method(member))
    }

    /// Handle for a constructor
    pub fn constructor(member: MemberDef) -> Self {
        Self::new(Reflected::Constructor(member))
    }

    /// The wrapped reflected object
    pub fn reflected(&self) -> &Reflected {
        &self.reflected
    }

    /// The wrapped member, if any
    pub fn member(&self) -> Option<&MemberDef> {
        self.reflected.member()
    }

    /// Raw value of the override flag
    ///
    /// Prefer [`can_access`](Self::can_access): the flag being down says
    /// nothing about whether the caller could access the member anyway.
    pub fn is_override(&self) -> bool {
        self.override_flag.load(Ordering::Acquire)
    }

    fn store_override(&self, flag: bool) {
        self.override_flag.store(flag, Ordering::Release);
    }

    fn describe(&self, cx: &AccessContext<'_>) -> String {
        match (self.reflected.kind(), self.member()) {
            (Some(kind), Some(member)) => format!(
                "{} {}.{}",
                kind,
                cx.types.describe(member.declaring),
                member.name
            ),
            _ => "reflective object".to_string(),
        }
    }

    /// Set the override flag, widening access when `flag` is true
    ///
    /// Consults the permission gate first; with `flag == true` the current
    /// caller is resolved and the suppression policy checked. On denial the
    /// flag is left untouched.
    pub fn set_accessible(&self, cx: &AccessContext<'_>, flag: bool) -> Result<(), AccessError> {
        cx.gate.check_suppress()?;
        if flag {
            let caller = cx.caller.current_caller();
            self.check_can_suppress(cx, caller)?;
        }
        self.store_override(flag);
        Ok(())
    }

    /// Try to raise the override flag, reporting denial as `false`
    ///
    /// No-op returning `true` when the flag is already up. Only the
    /// permission gate's own error passes through; a policy denial never
    /// does.
    pub fn try_set_accessible(&self, cx: &AccessContext<'_>) -> Result<bool, AccessError> {
        cx.gate.check_suppress()?;
        if self.is_override() {
            return Ok(true);
        }
        let caller = cx.caller.current_caller();
        match self.check_can_suppress(cx, caller) {
            Ok(()) => {
                self.store_override(true);
                Ok(true)
            }
            Err(AccessError::Inaccessible { .. }) => Ok(false),
            Err(other) => Err(other),
        }
    }

    /// Test whether the current caller may access this member on `receiver`
    ///
    /// `receiver` is the runtime type of the instance the member would be
    /// used on; it must be absent for static members and constructors and
    /// present (and assignable to the declaring type) for instance members.
    /// That shape validation happens before the override short-circuit.
    pub fn can_access(
        &self,
        cx: &AccessContext<'_>,
        receiver: Option<TypeId>,
    ) -> Result<bool, AccessError> {
        let (member, kind) = match &self.reflected {
            Reflected::Plain => return Ok(self.is_override()),
            Reflected::Field(m) => (m, MemberKind::Field),
            Reflected::Method(m) => (m, MemberKind::Method),
            Reflected::Constructor(m) => (m, MemberKind::Constructor),
        };

        let instance_member = !member.modifiers.is_static && kind != MemberKind::Constructor;
        if instance_member {
            match receiver {
                None => {
                    return Err(AccessError::InvalidArgument {
                        reason: format!("no receiver for {}", self.describe(cx)),
                    });
                }
                Some(r) if !cx.types.is_subclass_of(r, member.declaring) => {
                    return Err(AccessError::InvalidArgument {
                        reason: format!(
                            "receiver {} is not an instance of {}",
                            cx.types.describe(r),
                            cx.types.describe(member.declaring)
                        ),
                    });
                }
                Some(_) => {}
            }
        } else if receiver.is_some() {
            return Err(AccessError::InvalidArgument {
                reason: format!("receiver given for {}", self.describe(cx)),
            });
        }

        if self.is_override() {
            return Ok(true);
        }

        let caller = cx.caller.current_caller();
        let target = match kind {
            MemberKind::Constructor => Some(member.declaring),
            _ if member.modifiers.is_static => None,
            _ => receiver,
        };
        Ok(cx.rules.verify_member_access(
            cx.types,
            cx.units,
            caller,
            member.declaring,
            target,
            member.modifiers,
        ))
    }

    /// Fast-path access check used by the invocation machinery
    ///
    /// A cache hit skips the slow rules entirely. A successful slow check
    /// replaces the cache wholesale; a denial fails with
    /// [`AccessError::IllegalAccess`] and never touches it.
    pub fn check_access(
        &self,
        cx: &AccessContext<'_>,
        caller: TypeId,
        target: Option<TypeId>,
    ) -> Result<(), AccessError> {
        let member = match self.member() {
            Some(m) => m,
            None => return Ok(()),
        };
        if caller == member.declaring {
            return Ok(());
        }

        let pair_form = matches!(
            target,
            Some(t) if member.modifiers.is_protected() && t != member.declaring
        );
        match self.cache.load() {
            AccessCache::CallerAndTarget(c, t) if pair_form => {
                if target == Some(t) && c == caller {
                    return Ok(());
                }
            }
            AccessCache::Caller(c) if !pair_form => {
                if c == caller {
                    return Ok(());
                }
            }
            _ => {}
        }

        self.slow_check_access(cx, member, caller, target, pair_form)
    }

    // Kept out of line; the cache is only written here, and only on success.
    fn slow_check_access(
        &self,
        cx: &AccessContext<'_>,
        member: &MemberDef,
        caller: TypeId,
        target: Option<TypeId>,
        pair_form: bool,
    ) -> Result<(), AccessError> {
        let allowed = cx.rules.verify_member_access(
            cx.types,
            cx.units,
            caller,
            member.declaring,
            target,
            member.modifiers,
        );
        if !allowed {
            return Err(AccessError::IllegalAccess {
                member: self.describe(cx),
                caller: cx.types.describe(caller),
            });
        }

        let entry = match target {
            Some(t) if pair_form => AccessCache::CallerAndTarget(caller, t),
            _ => AccessCache::Caller(caller),
        };
        self.cache.store(entry);
        Ok(())
    }

    /// Per-kind suppression check; gate and caller resolution already done
    fn check_can_suppress(
        &self,
        cx: &AccessContext<'_>,
        caller: TypeId,
    ) -> Result<(), AccessError> {
        let member = match &self.reflected {
            Reflected::Plain => return Ok(()),
            Reflected::Constructor(m) if cx.types.class_type() == Some(m.declaring) => {
                return Err(AccessError::Inaccessible {
                    member: self.describe(cx),
                    reason: "the class-object constructor is never made accessible".to_string(),
                });
            }
            Reflected::Field(m) | Reflected::Method(m) | Reflected::Constructor(m) => m,
        };

        match decide_suppress(cx.types, cx.units, caller, member.declaring, member.modifiers) {
            SuppressVerdict::Allow { widened } => {
                if let (Some(via), Some(sink)) = (widened, cx.diagnostics) {
                    let caller_unit = cx.types.unit_of(caller);
                    let declaring = cx.types.get(member.declaring);
                    if let (Some(caller_unit), Some(declaring)) = (caller_unit, declaring) {
                        sink.exposure_widened(&ExposureEvent {
                            caller_unit,
                            declaring_unit: declaring.unit,
                            package: &declaring.package,
                            member: &member.name,
                            via,
                        });
                    }
                }
                Ok(())
            }
            SuppressVerdict::Deny(reason) => Err(AccessError::Inaccessible {
                member: self.describe(cx),
                reason: reason.render(cx.units),
            }),
        }
    }
}

/// Set the override flag on a batch of handles
///
/// The permission gate runs once and the caller is resolved once for the
/// whole batch. All-or-nothing: every handle is checked before any flag is
/// stored, so a single denial leaves the entire batch untouched.
pub fn set_accessible_all(
    handles: &[&ReflectedMember],
    cx: &AccessContext<'_>,
    flag: bool,
) -> Result<(), AccessError> {
    cx.gate.check_suppress()?;
    if flag {
        let caller = cx.caller.current_caller();
        for handle in handles {
            handle.check_can_suppress(cx, caller)?;
        }
    }
    for handle in handles {
        handle.store_override(flag);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{AccessRules, DiagnosticsSink, FixedCaller, PermissionGate};
    use crate::decision::{ExposureKind, StandardRules};
    use oryx_types::{
        Modifiers, TypeDef, TypeTable, Unit, UnitId, UnitRegistry, Visibility,
    };
    use std::sync::atomic::AtomicUsize;
    use std::sync::Mutex;

    struct World {
        types: TypeTable,
        units: UnitRegistry,
        app: UnitId,
        lib: UnitId,
        app_type: TypeId,
        lib_peer: TypeId,
        api_type: TypeId,
        hidden_type: TypeId,
        api_sub: TypeId,
        api_sub_sub: TypeId,
        open_type: TypeId,
        class_type: TypeId,
    }

    fn world() -> World {
        let mut units = UnitRegistry::new();
        let app = units.add_unit(Unit::named("app")).unwrap();
        let lib = units
            .add_unit(
                Unit::named("lib")
                    .exports("lib/api")
                    .exports("lib/lang")
                    .opens("lib/open")
                    .with_package("lib/internal"),
            )
            .unwrap();

        let mut types = TypeTable::new();
        let app_type = types.add_type(TypeDef::new("app.Main", app, "app").public());
        let lib_peer = types.add_type(TypeDef::new("lib.Tool", lib, "lib/internal"));
        let api_type = types.add_type(TypeDef::new("lib.api.Service", lib, "lib/api").public());
        let hidden_type =
            types.add_type(TypeDef::new("lib.internal.Secret", lib, "lib/internal").public());
        let api_sub =
            types.add_type(TypeDef::new("app.Extended", app, "app").public().extends(api_type));
        let api_sub_sub =
            types.add_type(TypeDef::new("app.Narrow", app, "app").public().extends(api_sub));
        let open_type = types.add_type(TypeDef::new("lib.open.Impl", lib, "lib/open"));
        let class_type =
            types.add_type(TypeDef::new("oryx.lang.Class", lib, "lib/lang").public());
        types.set_class_type(class_type);

        World {
            types,
            units,
            app,
            lib,
            app_type,
            lib_peer,
            api_type,
            hidden_type,
            api_sub,
            api_sub_sub,
            open_type,
            class_type,
        }
    }

    fn cx<'a>(w: &'a World, caller: &'a FixedCaller) -> AccessContext<'a> {
        AccessContext::new(&w.types, &w.units, caller)
    }

    fn private_field(w: &World) -> ReflectedMember {
        ReflectedMember::field(MemberDef::new(
            "secret",
            w.hidden_type,
            Modifiers::new(Visibility::Private),
        ))
    }

    fn public_method(w: &World) -> ReflectedMember {
        ReflectedMember::method(MemberDef::new(
            "call",
            w.api_type,
            Modifiers::new(Visibility::Public),
        ))
    }

    struct DenyGate;

    impl PermissionGate for DenyGate {
        fn check_suppress(&self) -> Result<(), AccessError> {
            Err(AccessError::PermissionDenied {
                reason: "suppress-checks capability".to_string(),
            })
        }
    }

    #[derive(Default)]
    struct CountingRules {
        calls: AtomicUsize,
    }

    impl CountingRules {
        fn count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl AccessRules for CountingRules {
        fn verify_member_access(
            &self,
            types: &TypeTable,
            units: &UnitRegistry,
            caller: TypeId,
            declaring: TypeId,
            target: Option<TypeId>,
            modifiers: Modifiers,
        ) -> bool {
            self.calls.fetch_add(1, Ordering::SeqCst);
            StandardRules.verify_member_access(types, units, caller, declaring, target, modifiers)
        }
    }

    #[derive(Default)]
    struct RecordingSink {
        events: Mutex<Vec<(String, ExposureKind)>>,
    }

    impl DiagnosticsSink for RecordingSink {
        fn exposure_widened(&self, event: &ExposureEvent<'_>) {
            self.events
                .lock()
                .unwrap()
                .push((event.member.to_string(), event.via));
        }
    }

    #[test]
    fn test_set_accessible_same_unit() {
        let w = world();
        let caller = FixedCaller(w.lib_peer);
        let cx = cx(&w, &caller);
        let handle = private_field(&w);

        handle.set_accessible(&cx, true).unwrap();
        assert!(handle.is_override());
    }

    #[test]
    fn test_set_accessible_denied_leaves_flag_down() {
        let w = world();
        let caller = FixedCaller(w.app_type);
        let cx = cx(&w, &caller);
        let handle = private_field(&w);

        let err = handle.set_accessible(&cx, true).unwrap_err();
        match err {
            AccessError::Inaccessible { member, reason } => {
                assert!(member.contains("secret"), "unexpected member: {}", member);
                assert!(reason.contains("opens lib/internal"), "unexpected: {}", reason);
            }
            other => panic!("expected Inaccessible, got {:?}", other),
        }
        assert!(!handle.is_override());
    }

    #[test]
    fn test_set_accessible_false_needs_no_policy() {
        let w = world();
        let caller = FixedCaller(w.app_type);
        let cx = cx(&w, &caller);
        let handle = private_field(&w);

        // lowering the flag is always allowed, regardless of policy
        handle.set_accessible(&cx, false).unwrap();
        assert!(!handle.is_override());
    }

    #[test]
    fn test_set_accessible_false_clears_override() {
        let w = world();
        let caller = FixedCaller(w.lib_peer);
        let cx = cx(&w, &caller);
        let handle = private_field(&w);

        handle.set_accessible(&cx, true).unwrap();
        handle.set_accessible(&cx, false).unwrap();
        assert!(!handle.is_override());
    }

    #[test]
    fn test_try_set_accessible_matches_set_accessible() {
        let w = world();
        let caller = FixedCaller(w.app_type);
        let cx = cx(&w, &caller);

        // exported package, public member: both succeed
        let allowed = public_method(&w);
        assert!(allowed.try_set_accessible(&cx).unwrap());
        let allowed2 = public_method(&w);
        assert!(allowed2.set_accessible(&cx, true).is_ok());

        // closed package, private member: try reports false, set errors
        let denied = private_field(&w);
        assert!(!denied.try_set_accessible(&cx).unwrap());
        let denied2 = private_field(&w);
        assert!(matches!(
            denied2.set_accessible(&cx, true),
            Err(AccessError::Inaccessible { .. })
        ));
    }

    #[test]
    fn test_try_set_accessible_noop_when_already_overridden() {
        let w = world();
        let lib_caller = FixedCaller(w.lib_peer);
        let handle = private_field(&w);
        handle.set_accessible(&cx(&w, &lib_caller), true).unwrap();

        // policy would deny this caller, but the flag is already up
        let app_caller = FixedCaller(w.app_type);
        assert!(handle.try_set_accessible(&cx(&w, &app_caller)).unwrap());
    }

    #[test]
    fn test_plain_handle_suppression_always_granted() {
        let w = world();
        let caller = FixedCaller(w.app_type);
        let cx = cx(&w, &caller);
        let handle = ReflectedMember::plain();

        assert!(!handle.can_access(&cx, None).unwrap());
        assert!(handle.try_set_accessible(&cx).unwrap());
        assert!(handle.is_override());
        assert!(handle.can_access(&cx, None).unwrap());
    }

    #[test]
    fn test_class_constructor_never_suppressible() {
        let w = world();
        // even a same-unit caller is refused
        let caller = FixedCaller(w.lib_peer);
        let cx = cx(&w, &caller);
        let handle = ReflectedMember::constructor(MemberDef::new(
            "<init>",
            w.class_type,
            Modifiers::new(Visibility::Public),
        ));

        assert!(!handle.try_set_accessible(&cx).unwrap());
        assert!(matches!(
            handle.set_accessible(&cx, true),
            Err(AccessError::Inaccessible { .. })
        ));
        assert!(!handle.is_override());
    }

    #[test]
    fn test_permission_gate_denial_propagates() {
        let w = world();
        let caller = FixedCaller(w.lib_peer);
        let gate = DenyGate;
        let cx = cx(&w, &caller).with_gate(&gate);
        let handle = private_field(&w);

        assert!(matches!(
            handle.set_accessible(&cx, true),
            Err(AccessError::PermissionDenied { .. })
        ));
        assert!(matches!(
            handle.try_set_accessible(&cx),
            Err(AccessError::PermissionDenied { .. })
        ));
        assert!(!handle.is_override());
    }

    #[test]
    fn test_batch_set_accessible_is_all_or_nothing() {
        let w = world();
        let caller = FixedCaller(w.app_type);
        let cx = cx(&w, &caller);

        let allowed = public_method(&w);
        let denied = private_field(&w);
        let also_allowed = public_method(&w);

        let err = set_accessible_all(&[&allowed, &denied, &also_allowed], &cx, true);
        assert!(matches!(err, Err(AccessError::Inaccessible { .. })));
        assert!(!allowed.is_override());
        assert!(!denied.is_override());
        assert!(!also_allowed.is_override());
    }

    #[test]
    fn test_batch_set_accessible_applies_all_on_success() {
        let w = world();
        let caller = FixedCaller(w.app_type);
        let cx = cx(&w, &caller);

        let first = public_method(&w);
        let second = ReflectedMember::plain();
        set_accessible_all(&[&first, &second], &cx, true).unwrap();
        assert!(first.is_override());
        assert!(second.is_override());

        set_accessible_all(&[&first, &second], &cx, false).unwrap();
        assert!(!first.is_override());
        assert!(!second.is_override());
    }

    #[test]
    fn test_can_access_static_member_rejects_receiver() {
        let w = world();
        let caller = FixedCaller(w.app_type);
        let cx = cx(&w, &caller);
        let handle = ReflectedMember::method(MemberDef::new(
            "create",
            w.api_type,
            Modifiers::new(Visibility::Public).with_static(),
        ));

        assert!(handle.can_access(&cx, None).unwrap());
        assert!(matches!(
            handle.can_access(&cx, Some(w.api_sub)),
            Err(AccessError::InvalidArgument { .. })
        ));
    }

    #[test]
    fn test_can_access_constructor_rejects_receiver() {
        let w = world();
        let caller = FixedCaller(w.app_type);
        let cx = cx(&w, &caller);
        let handle = ReflectedMember::constructor(MemberDef::new(
            "<init>",
            w.api_type,
            Modifiers::new(Visibility::Public),
        ));

        assert!(handle.can_access(&cx, None).unwrap());
        assert!(matches!(
            handle.can_access(&cx, Some(w.api_type)),
            Err(AccessError::InvalidArgument { .. })
        ));
    }

    #[test]
    fn test_can_access_instance_member_requires_receiver() {
        let w = world();
        let caller = FixedCaller(w.app_type);
        let cx = cx(&w, &caller);
        let handle = public_method(&w);

        assert!(matches!(
            handle.can_access(&cx, None),
            Err(AccessError::InvalidArgument { .. })
        ));
        assert!(handle.can_access(&cx, Some(w.api_sub)).unwrap());
    }

    #[test]
    fn test_can_access_validates_receiver_before_override() {
        let w = world();
        let lib_caller = FixedCaller(w.lib_peer);
        let handle = public_method(&w);
        handle.set_accessible(&cx(&w, &lib_caller), true).unwrap();

        // override is up, but a mismatched receiver must still be rejected
        let caller = FixedCaller(w.app_type);
        let cx = cx(&w, &caller);
        assert!(matches!(
            handle.can_access(&cx, Some(w.app_type)),
            Err(AccessError::InvalidArgument { .. })
        ));
        assert!(handle.can_access(&cx, Some(w.api_sub)).unwrap());
    }

    #[test]
    fn test_can_access_override_short_circuits_policy() {
        let w = world();
        let handle = ReflectedMember::field(MemberDef::new(
            "secret",
            w.hidden_type,
            Modifiers::new(Visibility::Private).with_static(),
        ));

        let caller = FixedCaller(w.app_type);
        let cx_app = cx(&w, &caller);
        assert!(!handle.can_access(&cx_app, None).unwrap());

        let lib_caller = FixedCaller(w.lib_peer);
        handle.set_accessible(&cx(&w, &lib_caller), true).unwrap();
        assert!(handle.can_access(&cx_app, None).unwrap());
    }

    #[test]
    fn test_check_access_declaring_caller_skips_rules() {
        let w = world();
        let caller = FixedCaller(w.api_type);
        let rules = CountingRules::default();
        let cx = cx(&w, &caller).with_rules(&rules);
        let handle = private_field(&w);

        handle.check_access(&cx, w.hidden_type, None).unwrap();
        assert_eq!(rules.count(), 0);
    }

    #[test]
    fn test_check_access_caches_success() {
        let w = world();
        let caller = FixedCaller(w.app_type);
        let rules = CountingRules::default();
        let cx = cx(&w, &caller).with_rules(&rules);
        let handle = ReflectedMember::method(MemberDef::new(
            "create",
            w.api_type,
            Modifiers::new(Visibility::Public).with_static(),
        ));

        handle.check_access(&cx, w.app_type, None).unwrap();
        handle.check_access(&cx, w.app_type, None).unwrap();
        handle.check_access(&cx, w.app_type, None).unwrap();
        assert_eq!(rules.count(), 1);

        // a different caller is a cache miss and re-verifies
        handle.check_access(&cx, w.api_sub, None).unwrap();
        assert_eq!(rules.count(), 2);
    }

    #[test]
    fn test_check_access_failure_never_touches_cache() {
        let w = world();
        let caller = FixedCaller(w.app_type);
        let rules = CountingRules::default();
        let cx = cx(&w, &caller).with_rules(&rules);
        let handle = ReflectedMember::field(MemberDef::new(
            "secret",
            w.hidden_type,
            Modifiers::new(Visibility::Private).with_static(),
        ));

        assert!(matches!(
            handle.check_access(&cx, w.app_type, None),
            Err(AccessError::IllegalAccess { .. })
        ));
        assert!(matches!(
            handle.check_access(&cx, w.app_type, None),
            Err(AccessError::IllegalAccess { .. })
        ));
        // no caching of denials: the slow path ran both times
        assert_eq!(rules.count(), 2);
    }

    #[test]
    fn test_check_access_protected_caches_caller_target_pair() {
        let w = world();
        let caller = FixedCaller(w.api_sub);
        let rules = CountingRules::default();
        let cx = cx(&w, &caller).with_rules(&rules);
        let handle = ReflectedMember::field(MemberDef::new(
            "state",
            w.api_type,
            Modifiers::new(Visibility::Protected),
        ));

        handle.check_access(&cx, w.api_sub, Some(w.api_sub)).unwrap();
        handle.check_access(&cx, w.api_sub, Some(w.api_sub)).unwrap();
        assert_eq!(rules.count(), 1);

        // same caller, different target: the pair no longer matches
        handle
            .check_access(&cx, w.api_sub, Some(w.api_sub_sub))
            .unwrap();
        assert_eq!(rules.count(), 2);

        // and the replaced entry now serves the new pair
        handle
            .check_access(&cx, w.api_sub, Some(w.api_sub_sub))
            .unwrap();
        assert_eq!(rules.count(), 2);
    }

    #[test]
    fn test_check_access_plain_handle_is_noop() {
        let w = world();
        let caller = FixedCaller(w.app_type);
        let rules = CountingRules::default();
        let cx = cx(&w, &caller).with_rules(&rules);
        let handle = ReflectedMember::plain();

        handle.check_access(&cx, w.app_type, None).unwrap();
        assert_eq!(rules.count(), 0);
    }

    #[test]
    fn test_diagnostics_sink_sees_only_widened_grants() {
        let w = world();
        let caller = FixedCaller(w.app_type);
        let sink = RecordingSink::default();
        let cx = cx(&w, &caller).with_diagnostics(&sink);

        // statically open package: granted, but not widened
        let open_member = ReflectedMember::field(MemberDef::new(
            "impl_detail",
            w.open_type,
            Modifiers::new(Visibility::Private),
        ));
        open_member.set_accessible(&cx, true).unwrap();
        assert!(sink.events.lock().unwrap().is_empty());

        // closed package: denied, nothing recorded
        let hidden_member = private_field(&w);
        assert!(hidden_member.set_accessible(&cx, true).is_err());
        assert!(sink.events.lock().unwrap().is_empty());

        // after a dynamic opens, the grant succeeds and is audited
        w.units.add_opens(w.lib, "lib/internal", Some(w.app)).unwrap();
        hidden_member.set_accessible(&cx, true).unwrap();
        let events = sink.events.lock().unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0], ("secret".to_string(), ExposureKind::Opens));
    }
}
