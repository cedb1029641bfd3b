//! End-to-end scenarios through the realm.

use test_case::test_case;
use warden::{Realm, RealmError, RemovalPolicy};
use warden_config::WardenConfig;
use warden_rbac::{AccessPolicy, AuthzError, Capability, Role, StandardPolicies};
use warden_session::{AuthError, Credential, Principal, SessionEnd};
use warden_store::{Attributes, MutationError, RefTarget, References, StoreError};
use warden_types::{CollectionName, PrincipalId, RecordKey};

#[allow(dead_code)]
#[derive(Debug, Clone, PartialEq, Eq)]
enum Entity {
    Department {
        name: String,
    },
    Employee {
        name: String,
        salary: i64,
        department: Option<RecordKey>,
        supervisor: Option<PrincipalId>,
    },
}

impl Entity {
    fn in_department(&self, unit: &str) -> bool {
        matches!(self, Entity::Employee { department: Some(d), .. } if d.as_str() == unit)
    }
}

impl Attributes for Entity {
    fn validate(&self) -> Result<(), MutationError> {
        match self {
            Entity::Employee { salary, .. } if *salary < 0 => {
                Err(MutationError::new("salary cannot be negative"))
            }
            _ => Ok(()),
        }
    }
}

impl References for Entity {
    fn references(&self, target: RefTarget<'_>) -> bool {
        match self {
            Entity::Department { .. } => false,
            Entity::Employee {
                department,
                supervisor,
                ..
            } => {
                department
                    .as_ref()
                    .is_some_and(|d| target.is_record_in("departments", d))
                    || supervisor.as_ref().is_some_and(|s| target.is_principal(s))
            }
        }
    }

    fn detach(&mut self, target: RefTarget<'_>) -> Option<String> {
        let Entity::Employee {
            department,
            supervisor,
            ..
        } = self
        else {
            return None;
        };
        if let Some(d) = department.take_if(|d| target.is_record_in("departments", d)) {
            return Some(format!("removed from department {d}"));
        }
        let s = supervisor.take_if(|s| target.is_principal(s))?;
        Some(format!("supervisor {s} removed"))
    }
}

fn id(raw: &str) -> PrincipalId {
    PrincipalId::parse(raw).unwrap()
}

fn key(raw: &str) -> RecordKey {
    RecordKey::parse(raw).unwrap()
}

fn collection(raw: &str) -> CollectionName {
    CollectionName::parse(raw).unwrap()
}

fn employee(name: &str, department: Option<&str>, supervisor: Option<&str>) -> Entity {
    Entity::Employee {
        name: name.to_string(),
        salary: 1000,
        department: department.map(key),
        supervisor: supervisor.map(id),
    }
}

/// Realm with admin, a staff member, an HR manager and two collections.
fn realm() -> Realm<Entity> {
    let mut realm = Realm::new("test", StandardPolicies::hierarchical()).without_audit();
    realm
        .bootstrap(Principal::new(
            id("admin"),
            "System Admin",
            Role::Admin,
            Credential::from_secret("admin123"),
        ))
        .unwrap();
    realm.login(&id("admin"), "admin123").unwrap();
    realm
        .provision_principal(Principal::new(
            id("john"),
            "John Smith",
            Role::Staff,
            Credential::from_secret("john123"),
        ))
        .unwrap();
    realm
        .provision_principal(
            Principal::new(
                id("anna"),
                "Anna Lee",
                Role::Manager,
                Credential::from_secret("anna123"),
            )
            .with_unit("hr"),
        )
        .unwrap();
    realm.open_collection(collection("departments")).unwrap();
    realm.open_collection(collection("employees")).unwrap();
    realm
}

fn login(realm: &mut Realm<Entity>, who: &str) {
    realm.logout();
    realm.login(&id(who), &format!("{who}123")).unwrap();
}

// ============================================================================
// Authorization
// ============================================================================

#[test]
fn staff_is_denied_where_admin_is_allowed() {
    let mut realm = realm();
    let newcomer = || {
        Principal::new(
            id("kim"),
            "Kim",
            Role::Guest,
            Credential::from_secret("kim123"),
        )
    };

    login(&mut realm, "john");
    let denied = realm.provision_principal(newcomer());
    assert_eq!(
        denied,
        Err(RealmError::Authz(AuthzError::InsufficientRole {
            principal: id("john"),
            role: Role::Staff,
            capability: Capability::ManagePrincipals,
        }))
    );

    login(&mut realm, "admin");
    assert!(realm.provision_principal(newcomer()).is_ok());
}

#[test_case(Capability::CreateRecord)]
#[test_case(Capability::ReadRecord)]
#[test_case(Capability::UpdateRecord)]
#[test_case(Capability::DeleteRecord)]
#[test_case(Capability::ViewAll)]
#[test_case(Capability::ViewHistory)]
#[test_case(Capability::ManagePrincipals)]
fn nothing_is_allowed_without_a_session(capability: Capability) {
    let mut realm = realm();
    realm.logout();

    assert!(matches!(
        realm.authorize(&capability),
        Err(RealmError::Authz(AuthzError::NotAuthenticated { .. }))
    ));
}

#[test]
fn unauthenticated_callers_learn_nothing_about_collections() {
    let mut realm = realm();
    realm.logout();

    let result = realm.get(&collection("nowhere"), &key("x"));

    assert!(matches!(
        result,
        Err(RealmError::Authz(AuthzError::NotAuthenticated { .. }))
    ));
}

#[test]
fn unknown_collection_is_reported_after_authorization() {
    let realm = realm();

    assert_eq!(
        realm.get(&collection("nowhere"), &key("x")).unwrap_err(),
        RealmError::UnknownCollection(collection("nowhere"))
    );
}

#[test]
fn logout_is_idempotent() {
    let mut realm = realm();

    assert!(matches!(realm.logout(), SessionEnd::Ended(_)));
    assert_eq!(realm.logout(), SessionEnd::NoActiveSession);
    assert!(realm.current().is_none());
}

#[test]
fn custom_capability_goes_through_authorize() {
    let vet = Role::Custom("vet".into());
    let treat = Capability::Custom("add_health_record".into());
    let policy = StandardPolicies::hierarchical().with_role(vet.clone(), vec![treat.clone()]);
    let mut realm: Realm<Entity> = Realm::new("zoo", policy).without_audit();
    realm
        .bootstrap(Principal::new(
            id("admin"),
            "Admin",
            Role::Admin,
            Credential::from_secret("admin123"),
        ))
        .unwrap();
    realm.login(&id("admin"), "admin123").unwrap();
    realm
        .provision_principal(Principal::new(
            id("vet"),
            "Vet",
            vet,
            Credential::from_secret("vet123"),
        ))
        .unwrap();

    assert!(matches!(
        realm.authorize(&treat),
        Err(RealmError::Authz(AuthzError::InsufficientRole { .. }))
    ));

    login(&mut realm, "vet");
    assert_eq!(realm.authorize(&treat).unwrap().id(), &id("vet"));
}

// ============================================================================
// Records and history
// ============================================================================

#[test]
fn history_names_each_actor() {
    let mut realm = realm();
    let employees = collection("employees");
    realm
        .create(&employees, key("e-1"), employee("Bob", None, None))
        .unwrap();

    login(&mut realm, "john");
    realm
        .update(&employees, &key("e-1"), |e| {
            if let Entity::Employee { salary, .. } = e {
                *salary += 500;
            }
            Ok("raise of 500".to_string())
        })
        .unwrap();

    login(&mut realm, "admin");
    let history = realm.history(&employees, &key("e-1")).unwrap();
    let actors: Vec<&str> = history.iter().map(|h| h.actor().as_str()).collect();
    assert_eq!(actors, vec!["admin", "john"]);
    assert_eq!(history[1].description(), "raise of 500");
}

#[test]
fn staff_cannot_delete_and_record_survives() {
    let mut realm = realm();
    let employees = collection("employees");
    realm
        .create(&employees, key("e-1"), employee("Bob", None, None))
        .unwrap();

    login(&mut realm, "john");
    let result = realm.delete(&employees, &key("e-1"), RemovalPolicy::Standalone);

    assert!(matches!(
        result,
        Err(RealmError::Authz(AuthzError::InsufficientRole { .. }))
    ));
    assert!(realm.get(&employees, &key("e-1")).unwrap().is_some());
}

#[test]
fn invalid_update_is_rejected_and_leaves_history() {
    let mut realm = realm();
    let employees = collection("employees");
    realm
        .create(&employees, key("e-1"), employee("Bob", None, None))
        .unwrap();

    let result = realm.update(&employees, &key("e-1"), |e| {
        if let Entity::Employee { salary, .. } = e {
            *salary = -1;
        }
        Ok("pay cut".to_string())
    });

    assert!(matches!(
        result,
        Err(RealmError::Store(StoreError::InvalidMutation { .. }))
    ));
    assert_eq!(realm.history(&employees, &key("e-1")).unwrap().len(), 1);
}

#[test]
fn list_filters_in_insertion_order() {
    let mut realm = realm();
    let employees = collection("employees");
    for (k, dept) in [("e-3", "hr"), ("e-1", "it"), ("e-2", "hr")] {
        realm
            .create(&employees, key(k), employee(k, Some(dept), None))
            .unwrap();
    }

    let keys: Vec<&str> = realm
        .list(&employees, |r| r.attributes().in_department("hr"))
        .unwrap()
        .map(|r| r.key().as_str())
        .collect();

    assert_eq!(keys, vec!["e-3", "e-2"]);
}

// ============================================================================
// Scoped operations
// ============================================================================

fn in_own_department(principal: &Principal, record: &warden_store::Record<Entity>) -> bool {
    principal
        .unit()
        .is_some_and(|unit| record.attributes().in_department(unit))
}

#[test]
fn manager_may_only_update_their_own_department() {
    let mut realm = realm();
    let employees = collection("employees");
    realm
        .create(&employees, key("e-hr"), employee("Hana", Some("hr"), None))
        .unwrap();
    realm
        .create(&employees, key("e-it"), employee("Ivan", Some("it"), None))
        .unwrap();

    login(&mut realm, "anna");
    let raise = |e: &mut Entity| {
        if let Entity::Employee { salary, .. } = e {
            *salary += 100;
        }
        Ok("raise of 100".to_string())
    };

    assert!(
        realm
            .update_scoped(&employees, &key("e-hr"), in_own_department, raise)
            .is_ok()
    );
    assert_eq!(
        realm
            .update_scoped(&employees, &key("e-it"), in_own_department, raise)
            .unwrap_err(),
        RealmError::Authz(AuthzError::ScopeViolation {
            principal: id("anna"),
            capability: Capability::UpdateRecord,
        })
    );
    assert!(matches!(
        realm.update_scoped(&employees, &key("e-missing"), in_own_department, raise),
        Err(RealmError::Store(StoreError::NotFound { .. }))
    ));
}

#[test]
fn scoped_delete_checks_the_record() {
    let mut realm = realm();
    let employees = collection("employees");
    realm
        .create(&employees, key("e-it"), employee("Ivan", Some("it"), None))
        .unwrap();

    login(&mut realm, "anna");
    let result = realm.delete_scoped(
        &employees,
        &key("e-it"),
        RemovalPolicy::Standalone,
        in_own_department,
    );

    assert!(matches!(
        result,
        Err(RealmError::Authz(AuthzError::ScopeViolation { .. }))
    ));
}

// ============================================================================
// Cross-collection removal
// ============================================================================

#[test]
fn deleting_a_department_cascades_to_employees() {
    let mut realm = realm();
    let departments = collection("departments");
    let employees = collection("employees");
    realm
        .create(
            &departments,
            key("hr"),
            Entity::Department {
                name: "Human Resources".into(),
            },
        )
        .unwrap();
    realm
        .create(&employees, key("e-1"), employee("Bob", Some("hr"), None))
        .unwrap();

    let refused = realm.delete(&departments, &key("hr"), RemovalPolicy::Restrict);
    assert!(matches!(
        refused,
        Err(RealmError::Store(StoreError::HasDependents { count: 1, .. }))
    ));

    realm
        .delete(&departments, &key("hr"), RemovalPolicy::Cascade)
        .unwrap();

    let bob = realm.get(&employees, &key("e-1")).unwrap().unwrap();
    assert_eq!(bob.attributes(), &employee("Bob", None, None));
    assert_eq!(bob.history().len(), 2);
    assert_eq!(bob.history()[1].actor(), &id("admin"));
}

#[test]
fn removing_a_principal_detaches_references() {
    let mut realm = realm();
    let employees = collection("employees");
    realm
        .create(&employees, key("e-1"), employee("Bob", None, Some("anna")))
        .unwrap();

    assert_eq!(
        realm.remove_principal(&id("anna"), RemovalPolicy::Restrict),
        Err(RealmError::PrincipalInUse {
            principal: id("anna"),
            count: 1
        })
    );

    let removed = realm
        .remove_principal(&id("anna"), RemovalPolicy::Cascade)
        .unwrap();

    assert_eq!(removed.id(), &id("anna"));
    let bob = realm.get(&employees, &key("e-1")).unwrap().unwrap();
    assert_eq!(bob.attributes(), &employee("Bob", None, None));
    assert!(matches!(
        realm.login(&id("anna"), "anna123"),
        Err(RealmError::Auth(AuthError::UnknownPrincipal { .. }))
    ));
}

// ============================================================================
// Principal administration
// ============================================================================

#[test]
fn principal_cannot_remove_or_deactivate_itself() {
    let mut realm = realm();

    assert_eq!(
        realm.set_principal_active(&id("admin"), false),
        Err(RealmError::SelfTarget {
            principal: id("admin")
        })
    );
    assert!(matches!(
        realm.remove_principal(&id("admin"), RemovalPolicy::Cascade),
        Err(RealmError::SelfTarget { .. })
    ));
}

#[test]
fn deactivated_principal_cannot_log_in() {
    let mut realm = realm();
    realm.set_principal_active(&id("john"), false).unwrap();
    realm.logout();

    assert_eq!(
        realm.login(&id("john"), "john123"),
        Err(RealmError::Auth(AuthError::Inactive {
            principal: id("john")
        }))
    );

    realm.login(&id("admin"), "admin123").unwrap();
    realm.set_principal_active(&id("john"), true).unwrap();
    login(&mut realm, "john");
    assert_eq!(realm.current().map(Principal::id), Some(&id("john")));
}

#[test]
fn record_keyed_like_a_principal_does_not_block_its_removal() {
    let mut realm = realm();
    let departments = collection("departments");
    let employees = collection("employees");
    realm
        .create(
            &departments,
            key("john"),
            Entity::Department {
                name: "John's team".into(),
            },
        )
        .unwrap();
    realm
        .create(&employees, key("e-1"), employee("Bob", Some("john"), None))
        .unwrap();

    realm
        .remove_principal(&id("john"), RemovalPolicy::Restrict)
        .unwrap();
    realm
        .remove_principal(&id("anna"), RemovalPolicy::Cascade)
        .unwrap();

    let bob = realm.get(&employees, &key("e-1")).unwrap().unwrap();
    assert_eq!(bob.attributes(), &employee("Bob", Some("john"), None));
    assert_eq!(bob.history().len(), 1);
}

#[test]
fn deleting_a_record_detaches_only_record_references() {
    let mut realm = realm();
    let departments = collection("departments");
    let employees = collection("employees");
    realm
        .create(
            &departments,
            key("anna"),
            Entity::Department {
                name: "Anna's team".into(),
            },
        )
        .unwrap();
    realm
        .create(&employees, key("e-1"), employee("Bob", None, Some("anna")))
        .unwrap();

    realm
        .delete(&departments, &key("anna"), RemovalPolicy::Restrict)
        .unwrap();

    let bob = realm.get(&employees, &key("e-1")).unwrap().unwrap();
    assert_eq!(bob.attributes(), &employee("Bob", None, Some("anna")));
}

#[test]
fn principal_cannot_change_its_own_role() {
    let mut realm = realm();

    assert_eq!(
        realm.set_principal_role(&id("admin"), Role::Guest),
        Err(RealmError::SelfTarget {
            principal: id("admin")
        })
    );
    assert_eq!(realm.current().map(Principal::role), Some(&Role::Admin));
    assert!(realm.open_collection(collection("more")).is_ok());
}

#[test]
fn principal_changes_apply_to_the_live_session() {
    let mut realm = realm();
    realm
        .set_principal_unit(&id("admin"), Some("ops".to_string()))
        .unwrap();
    assert_eq!(realm.current().and_then(Principal::unit), Some("ops"));

    realm.set_principal_role(&id("john"), Role::Manager).unwrap();
    login(&mut realm, "john");
    assert_eq!(realm.current().map(Principal::role), Some(&Role::Manager));

    login(&mut realm, "admin");
    realm.set_principal_role(&id("john"), Role::Guest).unwrap();
    realm.logout();
    realm.login(&id("john"), "john123").unwrap();
    assert!(matches!(
        realm.open_collection(collection("more")),
        Err(RealmError::Authz(AuthzError::InsufficientRole { .. }))
    ));
}

#[test]
fn managers_cannot_grant_admin() {
    let policy = AccessPolicy::new()
        .with_role(Role::Admin, StandardPolicies::admin_capabilities())
        .with_role(
            Role::Manager,
            StandardPolicies::manager_capabilities()
                .union(&vec![Capability::ManagePrincipals].into()),
        );
    let mut realm: Realm<Entity> = Realm::new("test", policy).without_audit();
    realm
        .bootstrap(Principal::new(
            id("anna"),
            "Anna",
            Role::Manager,
            Credential::from_secret("anna123"),
        ))
        .unwrap();
    realm.login(&id("anna"), "anna123").unwrap();

    let result = realm.provision_principal(Principal::new(
        id("eve"),
        "Eve",
        Role::Admin,
        Credential::from_secret("eve123"),
    ));

    assert_eq!(
        result,
        Err(RealmError::Escalation {
            principal: id("anna"),
            role: Role::Admin
        })
    );
    assert!(
        realm
            .provision_principal(Principal::new(
                id("sam"),
                "Sam",
                Role::Staff,
                Credential::from_secret("sam123"),
            ))
            .is_ok()
    );
}

#[test]
fn managers_cannot_administer_admins() {
    let policy = AccessPolicy::new()
        .with_role(Role::Admin, StandardPolicies::admin_capabilities())
        .with_role(
            Role::Manager,
            StandardPolicies::manager_capabilities()
                .union(&vec![Capability::ManagePrincipals].into()),
        );
    let mut realm: Realm<Entity> = Realm::new("test", policy).without_audit();
    realm
        .bootstrap(Principal::new(
            id("root"),
            "Root",
            Role::Admin,
            Credential::from_secret("root123"),
        ))
        .unwrap();
    login(&mut realm, "root");
    for (who, role) in [("anna", Role::Manager), ("sam", Role::Staff)] {
        realm
            .provision_principal(Principal::new(
                id(who),
                who,
                role,
                Credential::from_secret(&format!("{who}123")),
            ))
            .unwrap();
    }
    login(&mut realm, "anna");

    let outranked = Err(RealmError::Outranked {
        principal: id("anna"),
        target: id("root"),
        role: Role::Admin,
    });
    assert_eq!(realm.set_principal_role(&id("root"), Role::Guest), outranked);
    assert_eq!(realm.set_principal_active(&id("root"), false), outranked);
    assert_eq!(
        realm.set_principal_unit(&id("root"), Some("hr".to_string())),
        outranked
    );
    assert_eq!(
        realm
            .remove_principal(&id("root"), RemovalPolicy::Standalone)
            .map(|p| p.id().clone()),
        outranked.map(|()| id("root"))
    );

    realm.set_principal_role(&id("sam"), Role::Guest).unwrap();
    realm.set_principal_active(&id("sam"), false).unwrap();

    login(&mut realm, "root");
    let root = realm.principals().unwrap().find(|p| p.id() == &id("root")).unwrap();
    assert_eq!(root.role(), &Role::Admin);
    assert!(root.is_active());
}

#[test]
fn bootstrap_only_works_once() {
    let mut realm = realm();

    assert_eq!(
        realm.bootstrap(Principal::new(
            id("other"),
            "Other",
            Role::Admin,
            Credential::from_secret("x"),
        )),
        Err(RealmError::AlreadyBootstrapped)
    );
}

// ============================================================================
// Configuration
// ============================================================================

#[test]
fn realm_from_default_config() {
    let config = WardenConfig::default();
    let mut realm: Realm<Entity> = Realm::from_config(&config).unwrap().without_audit();

    assert_eq!(realm.name(), "warden");
    assert!(realm.current().is_none());
    realm.login(&id("admin"), "admin123").unwrap();

    let names: Vec<&str> = realm.collections().map(CollectionName::as_str).collect();
    assert_eq!(names, vec!["accounts"]);
    assert_eq!(realm.principals().unwrap().count(), 1);
}
